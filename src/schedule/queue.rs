//! Round-indexed action queue

use crate::core::error::{Result, SimError};
use crate::core::types::{ActorId, Round};
use crate::entity::action::{ActionStatus, Outcome, ScheduledAction};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Pending and historical actions bucketed by target round
///
/// Each bucket keeps insertion order. At most one live (non-cancelled)
/// action exists per actor per round; `schedule` enforces this.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionQueue {
    buckets: BTreeMap<Round, Vec<ScheduledAction>>,
}

impl ActionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an action to the bucket for its target round
    pub fn schedule(&mut self, action: ScheduledAction, current_round: Round) -> Result<()> {
        if action.target_round < current_round {
            return Err(SimError::Validation(format!(
                "action cannot target a past round (target {}, current {})",
                action.target_round, current_round
            )));
        }
        if self.live_action(action.target_round, action.actor_id).is_some() {
            return Err(SimError::Validation(format!(
                "actor {} already has an action scheduled for round {}",
                action.actor_id, action.target_round
            )));
        }

        tracing::debug!(
            actor = %action.actor_id,
            round = action.target_round,
            duration = action.duration,
            "scheduled action"
        );
        self.buckets
            .entry(action.target_round)
            .or_default()
            .push(action);
        Ok(())
    }

    /// All actions targeting `round`, in the order they were scheduled
    pub fn due(&self, round: Round) -> &[ScheduledAction] {
        self.buckets.get(&round).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Due actions still waiting to be resolved
    pub fn pending(&self, round: Round) -> impl Iterator<Item = &ScheduledAction> {
        self.due(round)
            .iter()
            .filter(|a| a.status == ActionStatus::Pending)
    }

    /// The live action for an actor in a round, if any
    pub fn live_action(&self, round: Round, actor: ActorId) -> Option<&ScheduledAction> {
        self.due(round)
            .iter()
            .find(|a| a.actor_id == actor && a.status.is_live())
    }

    pub fn has_pending(&self, round: Round, actor: ActorId) -> bool {
        self.pending(round).any(|a| a.actor_id == actor)
    }

    /// Transition the actor's live action in `round`
    ///
    /// An outcome, when given, replaces the stored one; `None` keeps it.
    pub fn set_status(
        &mut self,
        round: Round,
        actor: ActorId,
        status: ActionStatus,
        outcome: Option<Outcome>,
    ) -> Result<()> {
        let action = self
            .buckets
            .get_mut(&round)
            .and_then(|bucket| {
                bucket
                    .iter_mut()
                    .find(|a| a.actor_id == actor && a.status.is_live())
            })
            .ok_or(SimError::ActionNotFound { round, actor })?;

        if !action.status.can_transition_to(status) {
            return Err(SimError::Validation(format!(
                "cannot move action from {} to {}",
                action.status, status
            )));
        }

        tracing::debug!(%actor, round, from = %action.status, to = %status, "action status");
        action.status = status;
        if outcome.is_some() {
            action.outcome = outcome;
        }
        Ok(())
    }

    /// Cancel a pending action before it executes
    pub fn cancel(&mut self, round: Round, actor: ActorId) -> Result<()> {
        self.set_status(round, actor, ActionStatus::Cancelled, None)
    }

    /// Every action ever scheduled by an actor, in round order
    pub fn for_actor(&self, actor: ActorId) -> impl Iterator<Item = &ScheduledAction> {
        self.buckets
            .values()
            .flat_map(|bucket| bucket.iter())
            .filter(move |a| a.actor_id == actor)
    }

    pub fn len(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::action::{OutcomeKind, OutcomeQuality};
    use proptest::prelude::*;

    fn action(actor: ActorId, round: Round) -> ScheduledAction {
        ScheduledAction::new(actor, "Negotiate", "private", round, 1, 0.5, 0).unwrap()
    }

    fn success() -> Outcome {
        Outcome {
            outcome: OutcomeKind::Success,
            outcome_quality: OutcomeQuality::Strong,
            explanation: "Deal struck".into(),
        }
    }

    #[test]
    fn test_rejects_past_round() {
        let mut queue = ActionQueue::new();
        let result = queue.schedule(action(ActorId::new(), 2), 3);
        assert!(matches!(result, Err(SimError::Validation(msg)) if msg.contains("past round")));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_current_round_allowed() {
        let mut queue = ActionQueue::new();
        queue.schedule(action(ActorId::new(), 3), 3).unwrap();
        assert_eq!(queue.due(3).len(), 1);
        assert!(queue.due(4).is_empty());
    }

    #[test]
    fn test_one_live_action_per_actor_per_round() {
        let mut queue = ActionQueue::new();
        let actor = ActorId::new();
        queue.schedule(action(actor, 1), 0).unwrap();
        assert!(queue.schedule(action(actor, 1), 0).is_err());

        queue.cancel(1, actor).unwrap();
        queue.schedule(action(actor, 1), 0).unwrap();
        assert_eq!(queue.due(1).len(), 2);
        assert_eq!(queue.pending(1).count(), 1);
    }

    #[test]
    fn test_set_status_records_outcome() {
        let mut queue = ActionQueue::new();
        let actor = ActorId::new();
        queue.schedule(action(actor, 0), 0).unwrap();

        queue
            .set_status(0, actor, ActionStatus::Completed, Some(success()))
            .unwrap();

        let stored = &queue.due(0)[0];
        assert_eq!(stored.status, ActionStatus::Completed);
        assert_eq!(stored.outcome, Some(success()));
    }

    #[test]
    fn test_set_status_keeps_outcome_when_none() {
        let mut queue = ActionQueue::new();
        let actor = ActorId::new();
        queue.schedule(action(actor, 0), 0).unwrap();
        queue
            .set_status(0, actor, ActionStatus::Executing, Some(success()))
            .unwrap();
        queue
            .set_status(0, actor, ActionStatus::Completed, None)
            .unwrap();
        assert_eq!(queue.due(0)[0].outcome, Some(success()));
    }

    #[test]
    fn test_set_status_unknown_actor() {
        let mut queue = ActionQueue::new();
        queue.schedule(action(ActorId::new(), 0), 0).unwrap();
        let result = queue.set_status(0, ActorId::new(), ActionStatus::Completed, None);
        assert!(matches!(result, Err(SimError::ActionNotFound { round: 0, .. })));
    }

    #[test]
    fn test_illegal_transition_rejected() {
        let mut queue = ActionQueue::new();
        let actor = ActorId::new();
        queue.schedule(action(actor, 0), 0).unwrap();
        queue.set_status(0, actor, ActionStatus::Completed, None).unwrap();
        assert!(queue.cancel(0, actor).is_err());
    }

    #[test]
    fn test_serializes_as_round_map() {
        let mut queue = ActionQueue::new();
        queue.schedule(action(ActorId::new(), 2), 0).unwrap();
        let json = serde_json::to_value(&queue).unwrap();
        assert!(json.get("2").is_some());
    }

    proptest! {
        #[test]
        fn prop_due_preserves_schedule_order(rounds in proptest::collection::vec(0u32..5, 1..40)) {
            let mut queue = ActionQueue::new();
            let mut expected: BTreeMap<Round, Vec<ActorId>> = BTreeMap::new();
            for round in rounds {
                let actor = ActorId::new();
                queue.schedule(action(actor, round), 0).unwrap();
                expected.entry(round).or_default().push(actor);
            }
            for (round, actors) in expected {
                let due: Vec<ActorId> = queue.due(round).iter().map(|a| a.actor_id).collect();
                prop_assert_eq!(due, actors);
            }
        }
    }
}
