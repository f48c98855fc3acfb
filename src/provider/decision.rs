//! Actor decision provider boundary

use crate::core::error::{Result, SimError};
use crate::core::types::{ActorId, Round};
use crate::entity::action::{draw_seed, validate_seed, validate_window, ScheduledAction};
use crate::entity::actor::{Actor, ActorSummary};
use crate::entity::simulation::Simulation;
use crate::entity::state::ActorRoundState;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// An action the actor wants to take
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionProposal {
    pub action: String,
    pub reasoning: String,
    pub execute_round: Round,
    #[serde(default = "default_duration")]
    pub duration: u32,
    /// Drawn at scheduling time when absent
    #[serde(default)]
    pub random_seed: Option<f64>,
}

fn default_duration() -> u32 {
    1
}

/// A message the actor wants delivered next round
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageProposal {
    /// Recipient id or identifier
    pub to: String,
    pub content: String,
    #[serde(default)]
    pub reasoning: String,
}

/// Everything one actor decided in one call
///
/// A single-action reply is just a decision with one action and no messages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    #[serde(default)]
    pub actions: Vec<ActionProposal>,
    #[serde(default)]
    pub messages: Vec<MessageProposal>,
}

/// Length limits applied at the provider boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextLimits {
    pub max_action_chars: usize,
    pub max_message_chars: usize,
}

impl Default for TextLimits {
    fn default() -> Self {
        Self {
            max_action_chars: 100,
            max_message_chars: 200,
        }
    }
}

impl ActionProposal {
    pub fn new(action: impl Into<String>, execute_round: Round, duration: u32) -> Self {
        Self {
            action: action.into(),
            reasoning: String::new(),
            execute_round,
            duration,
            random_seed: None,
        }
    }

    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = reasoning.into();
        self
    }

    pub fn with_seed(mut self, seed: f64) -> Self {
        self.random_seed = Some(seed);
        self
    }

    pub fn validate(&self, limits: TextLimits) -> Result<()> {
        if self.action.trim().is_empty() {
            return Err(SimError::Validation("action text cannot be empty".into()));
        }
        let chars = self.action.chars().count();
        if chars > limits.max_action_chars {
            return Err(SimError::Validation(format!(
                "action must be at most {} characters (got {})",
                limits.max_action_chars, chars
            )));
        }
        validate_window(self.execute_round, self.duration)?;
        if let Some(seed) = self.random_seed {
            validate_seed(seed)?;
        }
        Ok(())
    }

    /// Turn an accepted proposal into a queue entry
    pub fn into_scheduled(self, actor: ActorId, current_round: Round) -> Result<ScheduledAction> {
        let seed = self.random_seed.unwrap_or_else(draw_seed);
        ScheduledAction::new(
            actor,
            self.action,
            self.reasoning,
            self.execute_round,
            self.duration,
            seed,
            current_round,
        )
    }
}

impl MessageProposal {
    pub fn new(to: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            content: content.into(),
            reasoning: String::new(),
        }
    }

    pub fn validate(&self, limits: TextLimits) -> Result<()> {
        if self.to.trim().is_empty() {
            return Err(SimError::Validation("message recipient cannot be empty".into()));
        }
        let chars = self.content.chars().count();
        if chars > limits.max_message_chars {
            return Err(SimError::Validation(format!(
                "message must be at most {} characters (got {})",
                limits.max_message_chars, chars
            )));
        }
        Ok(())
    }
}

impl Decision {
    pub fn single(action: ActionProposal) -> Self {
        Self {
            actions: vec![action],
            messages: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty() && self.messages.is_empty()
    }

    /// Structural validation of provider output
    ///
    /// Failures are reported as `Malformed` so the call is retried.
    pub fn validate(&self, limits: TextLimits) -> Result<()> {
        for (i, action) in self.actions.iter().enumerate() {
            action
                .validate(limits)
                .map_err(|e| SimError::Malformed(format!("action {}: {}", i, e)))?;
        }
        for (i, message) in self.messages.iter().enumerate() {
            message
                .validate(limits)
                .map_err(|e| SimError::Malformed(format!("message {}: {}", i, e)))?;
        }
        Ok(())
    }
}

/// Shared, public context for every decision in a round
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldContext {
    pub question: String,
    pub time_unit: String,
    pub current_round: Round,
    pub total_duration: u32,
    pub prior_summary: Option<String>,
    pub roster: Vec<ActorSummary>,
}

impl WorldContext {
    pub fn for_round(sim: &Simulation, round: Round) -> Self {
        Self {
            question: sim.question.clone(),
            time_unit: sim.time_unit.clone(),
            current_round: round,
            total_duration: sim.simulation_duration,
            prior_summary: sim.latest_record().map(|r| r.world_state_summary.clone()),
            roster: sim.roster(),
        }
    }

    /// Everyone except `actor`, for addressing messages
    pub fn others(&self, actor: ActorId) -> impl Iterator<Item = &ActorSummary> {
        self.roster.iter().filter(move |a| a.actor_id != actor)
    }
}

/// Turns an actor's private history and public context into a decision
#[async_trait]
pub trait ActorDecisionProvider: Send + Sync {
    async fn decide(
        &self,
        actor: &Actor,
        history: &ActorRoundState,
        world: &WorldContext,
    ) -> Result<Decision>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_length_counts_chars() {
        let limits = TextLimits::default();
        let exactly = "é".repeat(100);
        assert!(ActionProposal::new(exactly, 0, 1).validate(limits).is_ok());
        let over = "a".repeat(101);
        assert!(ActionProposal::new(over, 0, 1).validate(limits).is_err());
    }

    #[test]
    fn test_message_length_limit() {
        let limits = TextLimits::default();
        assert!(MessageProposal::new("Mayor", "x".repeat(200)).validate(limits).is_ok());
        assert!(MessageProposal::new("Mayor", "x".repeat(201)).validate(limits).is_err());
        assert!(MessageProposal::new(" ", "hi").validate(limits).is_err());
    }

    #[test]
    fn test_decision_validation_is_retryable() {
        let decision = Decision::single(ActionProposal::new("Strike", 0, 0));
        let err = decision.validate(TextLimits::default()).unwrap_err();
        assert!(err.is_retryable());
    }

    #[test]
    fn test_overflowing_duration_rejected() {
        let proposal = ActionProposal::new("Forever strike", 1, u32::MAX);
        assert!(matches!(
            proposal.validate(TextLimits::default()),
            Err(SimError::Validation(_))
        ));
    }

    #[test]
    fn test_into_scheduled_draws_seed() {
        let actor = ActorId::new();
        let scheduled = ActionProposal::new("Picket", 3, 2)
            .with_reasoning("pressure")
            .into_scheduled(actor, 1)
            .unwrap();
        assert_eq!(scheduled.target_round, 3);
        assert_eq!(scheduled.scheduled_at_round, 1);
        assert!((0.0..1.0).contains(&scheduled.random_seed));
    }

    #[test]
    fn test_into_scheduled_keeps_given_seed() {
        let scheduled = ActionProposal::new("Picket", 0, 1)
            .with_seed(0.25)
            .into_scheduled(ActorId::new(), 0)
            .unwrap();
        assert_eq!(scheduled.random_seed, 0.25);
    }
}
