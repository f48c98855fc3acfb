//! Private per-actor round state

use crate::core::types::{ActorId, Round};
use crate::entity::action::{ActionStatus, Outcome, ScheduledAction};
use crate::entity::message::DeliveredMessage;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One entry of an actor's action history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRecord {
    pub action: String,
    pub reasoning: String,
    pub scheduled_round: Round,
    pub duration: u32,
    /// Status at the moment the action was resolved
    pub status: ActionStatus,
    #[serde(default)]
    pub outcome: Option<Outcome>,
    pub random_seed: f64,
}

impl ActionRecord {
    pub fn from_resolved(action: &ScheduledAction) -> Self {
        Self {
            action: action.action.clone(),
            reasoning: action.reasoning.clone(),
            scheduled_round: action.target_round,
            duration: action.duration,
            status: action.status,
            outcome: action.outcome.clone(),
            random_seed: action.random_seed,
        }
    }
}

/// What one actor privately knows after a round
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorRoundState {
    pub actor_id: ActorId,
    pub round_number: Round,
    pub world_state_summary: String,
    pub observations: String,
    #[serde(default)]
    pub available_actions: Vec<String>,
    #[serde(default)]
    pub disabled_actions: Vec<String>,
    #[serde(default)]
    pub resources: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub constraints: Vec<String>,
    /// Messages delivered in this round only
    #[serde(default)]
    pub messages_received: Vec<DeliveredMessage>,
    /// Append-only history of resolved actions, in round order
    #[serde(default)]
    pub my_actions: Vec<ActionRecord>,
    #[serde(default)]
    pub direct_impacts: Option<String>,
    #[serde(default)]
    pub indirect_impacts: Option<String>,
}

impl ActorRoundState {
    /// State for an actor that has not been through any round yet
    pub fn initial(actor_id: ActorId, round: Round) -> Self {
        Self {
            actor_id,
            round_number: round,
            world_state_summary: "Initial state".into(),
            observations: "Beginning of simulation".into(),
            available_actions: Vec::new(),
            disabled_actions: Vec::new(),
            resources: BTreeMap::new(),
            constraints: Vec::new(),
            messages_received: Vec::new(),
            my_actions: Vec::new(),
            direct_impacts: None,
            indirect_impacts: None,
        }
    }

    /// Copy this state forward into `round` with no new deliveries
    pub fn carried_forward(&self, round: Round) -> Self {
        Self {
            round_number: round,
            messages_received: Vec::new(),
            ..self.clone()
        }
    }
}
