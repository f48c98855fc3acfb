//! Scheduled and in-flight actions

use crate::core::error::{Result, SimError};
use crate::core::types::{ActorId, Round};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of a queued action
///
/// Actions are never deleted from the queue, only moved forward through
/// these states, so the queue doubles as an audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    Pending,
    Executing,
    Completed,
    Cancelled,
}

impl ActionStatus {
    pub fn can_transition_to(self, next: ActionStatus) -> bool {
        use ActionStatus::*;
        matches!(
            (self, next),
            (Pending, Executing) | (Pending, Completed) | (Pending, Cancelled) | (Executing, Completed)
        )
    }

    pub fn is_live(self) -> bool {
        !matches!(self, ActionStatus::Cancelled)
    }
}

impl fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ActionStatus::Pending => "pending",
            ActionStatus::Executing => "executing",
            ActionStatus::Completed => "completed",
            ActionStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// Binary result reported by the world update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutcomeKind {
    Success,
    Failure,
}

/// How strongly the outcome landed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeQuality {
    Strong,
    Modest,
    Weak,
    Catastrophic,
}

impl Default for OutcomeQuality {
    fn default() -> Self {
        Self::Modest
    }
}

/// Resolved outcome of an action, stored exactly as the provider reported it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    pub outcome: OutcomeKind,
    pub outcome_quality: OutcomeQuality,
    pub explanation: String,
}

/// An accepted action waiting for (or past) its target round
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledAction {
    pub actor_id: ActorId,
    pub action: String,
    /// Private to the actor; never shown to the world update
    pub reasoning: String,
    pub target_round: Round,
    pub duration: u32,
    /// Uniform draw in [0, 1) compared against the provider's success threshold
    pub random_seed: f64,
    pub scheduled_at_round: Round,
    pub status: ActionStatus,
    #[serde(default)]
    pub outcome: Option<Outcome>,
}

impl ScheduledAction {
    pub fn new(
        actor_id: ActorId,
        action: impl Into<String>,
        reasoning: impl Into<String>,
        target_round: Round,
        duration: u32,
        random_seed: f64,
        scheduled_at_round: Round,
    ) -> Result<Self> {
        let action = action.into();
        if action.trim().is_empty() {
            return Err(SimError::Validation("action text cannot be empty".into()));
        }
        validate_window(target_round, duration)?;
        validate_seed(random_seed)?;

        Ok(Self {
            actor_id,
            action,
            reasoning: reasoning.into(),
            target_round,
            duration,
            random_seed,
            scheduled_at_round,
            status: ActionStatus::Pending,
            outcome: None,
        })
    }

    pub fn is_multi_round(&self) -> bool {
        self.duration > 1
    }

    /// Round at which this action finishes if it starts at `started_round`
    pub fn completes_round(&self, started_round: Round) -> Round {
        started_round.saturating_add(self.duration)
    }
}

/// A multi-round action in progress
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveAction {
    pub actor_id: ActorId,
    pub action: String,
    pub reasoning: String,
    pub started_round: Round,
    pub duration: u32,
    pub completes_round: Round,
    pub random_seed: f64,
}

impl ActiveAction {
    pub fn from_scheduled(action: &ScheduledAction, started_round: Round) -> Self {
        Self {
            actor_id: action.actor_id,
            action: action.action.clone(),
            reasoning: action.reasoning.clone(),
            started_round,
            duration: action.duration,
            completes_round: action.completes_round(started_round),
            random_seed: action.random_seed,
        }
    }

    /// True strictly between the start and completion rounds
    pub fn in_flight_at(&self, round: Round) -> bool {
        self.started_round < round && round < self.completes_round
    }
}

/// Duration must be at least 1 and the completion round must fit in a `Round`
pub fn validate_window(target_round: Round, duration: u32) -> Result<()> {
    if duration < 1 {
        return Err(SimError::Validation("duration must be at least 1".into()));
    }
    if target_round.checked_add(duration).is_none() {
        return Err(SimError::Validation(format!(
            "duration {} starting at round {} runs past the last round",
            duration, target_round
        )));
    }
    Ok(())
}

pub fn validate_seed(seed: f64) -> Result<()> {
    if (0.0..1.0).contains(&seed) {
        Ok(())
    } else {
        Err(SimError::Validation(format!(
            "random seed {} is outside [0, 1)",
            seed
        )))
    }
}

/// Fresh uniform seed for outcome resolution
pub fn draw_seed() -> f64 {
    rand::random::<f64>()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_transitions() {
        use ActionStatus::*;
        assert!(Pending.can_transition_to(Executing));
        assert!(Pending.can_transition_to(Completed));
        assert!(Executing.can_transition_to(Completed));
        assert!(!Completed.can_transition_to(Pending));
        assert!(!Executing.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Completed));
    }

    #[test]
    fn test_zero_duration_rejected() {
        let result = ScheduledAction::new(ActorId::new(), "Lobby", "", 0, 0, 0.5, 0);
        assert!(matches!(result, Err(SimError::Validation(_))));
    }

    #[test]
    fn test_unbounded_duration_rejected() {
        let result = ScheduledAction::new(ActorId::new(), "Forever strike", "", 1, u32::MAX, 0.5, 0);
        assert!(matches!(result, Err(SimError::Validation(_))));
        assert!(ScheduledAction::new(ActorId::new(), "Long strike", "", 0, u32::MAX, 0.5, 0).is_ok());
    }

    #[test]
    fn test_seed_bounds() {
        assert!(validate_seed(0.0).is_ok());
        assert!(validate_seed(0.999).is_ok());
        assert!(validate_seed(1.0).is_err());
        assert!(validate_seed(-0.1).is_err());
        assert!(validate_seed(f64::NAN).is_err());
    }

    #[test]
    fn test_drawn_seed_in_range() {
        for _ in 0..100 {
            assert!(validate_seed(draw_seed()).is_ok());
        }
    }

    #[test]
    fn test_active_action_window() {
        let scheduled = ScheduledAction::new(ActorId::new(), "Build factory", "", 2, 3, 0.4, 1).unwrap();
        let active = ActiveAction::from_scheduled(&scheduled, 2);
        assert_eq!(active.completes_round, 5);
        assert!(!active.in_flight_at(2));
        assert!(active.in_flight_at(3));
        assert!(active.in_flight_at(4));
        assert!(!active.in_flight_at(5));
    }

    #[test]
    fn test_outcome_serialization() {
        let outcome = Outcome {
            outcome: OutcomeKind::Success,
            outcome_quality: OutcomeQuality::Catastrophic,
            explanation: String::new(),
        };
        let json = serde_json::to_string(&outcome).unwrap();
        assert!(json.contains("\"SUCCESS\""));
        assert!(json.contains("\"catastrophic\""));
    }
}
