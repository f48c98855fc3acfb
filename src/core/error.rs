use crate::core::types::{ActorId, Round, SimulationId};
use crate::simulation::lifecycle::SimulationStatus;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Decision failed for actor {actor}: {reason}")]
    Decision { actor: ActorId, reason: String },

    #[error("World update failed for round {round}: {reason}")]
    Resolution { round: Round, reason: String },

    #[error("Simulation not found: {0}")]
    SimulationNotFound(SimulationId),

    #[error("Actor not found: {0}")]
    ActorNotFound(ActorId),

    #[error("No scheduled action for actor {actor} in round {round}")]
    ActionNotFound { round: Round, actor: ActorId },

    #[error("Round not found: {0}")]
    RoundNotFound(Round),

    #[error("No state recorded for actor {actor} in round {round}")]
    StateNotFound { actor: ActorId, round: Round },

    #[error("Illegal status transition: {from} -> {to}")]
    InvalidTransition {
        from: SimulationStatus,
        to: SimulationStatus,
    },

    #[error("Cannot {operation} while simulation is {status}")]
    InvalidState {
        status: SimulationStatus,
        operation: &'static str,
    },

    #[error("Malformed provider output: {0}")]
    Malformed(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Background task failed: {0}")]
    TaskFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl SimError {
    /// Errors a provider call may recover from on another attempt
    pub fn is_retryable(&self) -> bool {
        matches!(self, SimError::Malformed(_) | SimError::Llm(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            SimError::SimulationNotFound(_)
                | SimError::ActorNotFound(_)
                | SimError::ActionNotFound { .. }
                | SimError::RoundNotFound(_)
                | SimError::StateNotFound { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, SimError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(SimError::Malformed("x".into()).is_retryable());
        assert!(SimError::Llm("timeout".into()).is_retryable());
        assert!(!SimError::Validation("x".into()).is_retryable());
        assert!(!SimError::RoundNotFound(3).is_retryable());
    }

    #[test]
    fn test_not_found_family() {
        assert!(SimError::ActorNotFound(ActorId::new()).is_not_found());
        assert!(SimError::ActionNotFound {
            round: 1,
            actor: ActorId::new()
        }
        .is_not_found());
        assert!(!SimError::Store("disk".into()).is_not_found());
    }

    #[test]
    fn test_invalid_state_message() {
        let err = SimError::InvalidState {
            status: SimulationStatus::Created,
            operation: "process a round",
        };
        assert_eq!(
            err.to_string(),
            "Cannot process a round while simulation is created"
        );
    }
}
