//! Public round transcript

use crate::core::types::{ActorId, Round};
use crate::entity::action::{Outcome, OutcomeKind, OutcomeQuality};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Resolution of one due action, as reported by the world update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionResult {
    pub actor_id: ActorId,
    pub action: String,
    /// Threshold the provider derived from context, if it reported one
    #[serde(default)]
    pub success_threshold: Option<f64>,
    pub random_seed: f64,
    pub outcome: OutcomeKind,
    #[serde(default)]
    pub outcome_quality: OutcomeQuality,
    #[serde(default)]
    pub explanation: String,
}

impl ActionResult {
    pub fn to_outcome(&self) -> Outcome {
        Outcome {
            outcome: self.outcome,
            outcome_quality: self.outcome_quality,
            explanation: self.explanation.clone(),
        }
    }
}

/// One entry of the public transcript; immutable once appended
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundRecord {
    pub round_number: Round,
    pub world_state_summary: String,
    pub key_changes: Vec<String>,
    pub emergent_developments: Vec<String>,
    pub action_results: Vec<ActionResult>,
    pub continue_simulation: bool,
    #[serde(default)]
    pub continuation_reasoning: String,
    pub timestamp: DateTime<Utc>,
}
