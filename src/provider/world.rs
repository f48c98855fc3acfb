//! World update provider boundary

use crate::core::error::{Result, SimError};
use crate::core::types::{ActorId, Round};
use crate::entity::action::ScheduledAction;
use crate::entity::actor::ActorSummary;
use crate::entity::record::ActionResult;
use crate::entity::simulation::Simulation;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// A due action as the world update sees it (no private reasoning)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DueAction {
    pub actor_id: ActorId,
    pub actor_identifier: String,
    pub action: String,
    pub duration: u32,
    pub random_seed: f64,
}

/// A multi-round action still underway, reasoning stripped
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OngoingAction {
    pub actor_id: ActorId,
    pub actor_identifier: String,
    pub action: String,
    pub started_round: Round,
    pub completes_round: Round,
}

/// Input for one round's world update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldRequest {
    pub round: Round,
    pub question: String,
    pub time_unit: String,
    pub total_duration: u32,
    pub due_actions: Vec<DueAction>,
    pub roster: Vec<ActorSummary>,
    /// Multi-round actions still underway, for context
    pub in_flight: Vec<OngoingAction>,
    pub prior_summary: Option<String>,
}

impl WorldRequest {
    pub fn build(sim: &Simulation, round: Round, due: &[ScheduledAction]) -> Self {
        let identifier = |id: ActorId| {
            sim.actor(id)
                .map(|actor| actor.identifier.clone())
                .unwrap_or_else(|_| "Unknown".into())
        };

        let due_actions = due
            .iter()
            .map(|a| DueAction {
                actor_id: a.actor_id,
                actor_identifier: identifier(a.actor_id),
                action: a.action.clone(),
                duration: a.duration,
                random_seed: a.random_seed,
            })
            .collect();

        let in_flight = sim
            .active_actions
            .iter()
            .filter(|a| a.in_flight_at(round))
            .map(|a| OngoingAction {
                actor_id: a.actor_id,
                actor_identifier: identifier(a.actor_id),
                action: a.action.clone(),
                started_round: a.started_round,
                completes_round: a.completes_round,
            })
            .collect();

        Self {
            round,
            question: sim.question.clone(),
            time_unit: sim.time_unit.clone(),
            total_duration: sim.simulation_duration,
            due_actions,
            roster: sim.roster(),
            in_flight,
            prior_summary: sim.latest_record().map(|r| r.world_state_summary.clone()),
        }
    }
}

/// Private perception changes for one actor
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActorUpdate {
    pub actor_id: ActorId,
    #[serde(default)]
    pub observations: String,
    #[serde(default)]
    pub available_actions: Vec<String>,
    #[serde(default)]
    pub disabled_actions: Vec<String>,
    #[serde(default)]
    pub resources: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub constraints: Vec<String>,
    #[serde(default)]
    pub direct_impacts: Option<String>,
    #[serde(default)]
    pub indirect_impacts: Option<String>,
}

/// Typed world update output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldUpdate {
    pub world_state_summary: String,
    #[serde(default)]
    pub key_changes: Vec<String>,
    #[serde(default)]
    pub emergent_developments: Vec<String>,
    #[serde(default)]
    pub action_results: Vec<ActionResult>,
    #[serde(default)]
    pub actor_updates: Vec<ActorUpdate>,
    pub continue_simulation: bool,
    #[serde(default)]
    pub continuation_reasoning: String,
}

impl WorldUpdate {
    /// The engine's own resolution of a round with nothing due
    pub fn quiet_round() -> Self {
        Self {
            world_state_summary: "No actions occurred this round.".into(),
            key_changes: Vec::new(),
            emergent_developments: Vec::new(),
            action_results: Vec::new(),
            actor_updates: Vec::new(),
            continue_simulation: true,
            continuation_reasoning: "Waiting for actor decisions.".into(),
        }
    }

    /// Structural checks; failures are `Malformed` so the call is retried
    pub fn validate(&self) -> Result<()> {
        if self.world_state_summary.trim().is_empty() {
            return Err(SimError::Malformed("world state summary is empty".into()));
        }

        let mut seen = HashSet::new();
        for result in &self.action_results {
            if !seen.insert(result.actor_id) {
                return Err(SimError::Malformed(format!(
                    "duplicate action result for actor {}",
                    result.actor_id
                )));
            }
            if !result.random_seed.is_finite() {
                return Err(SimError::Malformed(format!(
                    "non-numeric seed for actor {}",
                    result.actor_id
                )));
            }
        }

        let mut seen = HashSet::new();
        for update in &self.actor_updates {
            if !seen.insert(update.actor_id) {
                return Err(SimError::Malformed(format!(
                    "duplicate state update for actor {}",
                    update.actor_id
                )));
            }
        }
        Ok(())
    }
}

/// Resolves a round's due actions into outcomes and a new world state
#[async_trait]
pub trait WorldUpdateProvider: Send + Sync {
    async fn resolve(&self, request: &WorldRequest) -> Result<WorldUpdate>;
}
