//! Tracker for multi-round actions in flight

use crate::core::types::{ActorId, Round};
use crate::entity::action::{ActiveAction, ScheduledAction};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActiveActionTracker {
    actions: Vec<ActiveAction>,
}

impl ActiveActionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking a multi-round action
    ///
    /// Returns false for single-round actions and for an (actor, started_round)
    /// pair that is already tracked.
    pub fn promote(&mut self, action: &ScheduledAction, started_round: Round) -> bool {
        if !action.is_multi_round() {
            return false;
        }
        if self.get(action.actor_id, started_round).is_some() {
            return false;
        }

        let active = ActiveAction::from_scheduled(action, started_round);
        tracing::debug!(
            actor = %active.actor_id,
            started = started_round,
            completes = active.completes_round,
            "promoted multi-round action"
        );
        self.actions.push(active);
        true
    }

    pub fn get(&self, actor: ActorId, started_round: Round) -> Option<&ActiveAction> {
        self.actions
            .iter()
            .find(|a| a.actor_id == actor && a.started_round == started_round)
    }

    pub fn due_for_completion(&self, round: Round) -> impl Iterator<Item = &ActiveAction> {
        self.actions
            .iter()
            .filter(move |a| a.completes_round == round)
    }

    /// Stop tracking an action; no-op if it was already removed
    pub fn complete(&mut self, actor: ActorId, started_round: Round) -> Option<ActiveAction> {
        let idx = self
            .actions
            .iter()
            .position(|a| a.actor_id == actor && a.started_round == started_round)?;
        Some(self.actions.remove(idx))
    }

    /// The action keeping `actor` busy during `round`, if any
    pub fn in_flight_for(&self, actor: ActorId, round: Round) -> Option<&ActiveAction> {
        self.actions
            .iter()
            .find(|a| a.actor_id == actor && a.in_flight_at(round))
    }

    pub fn iter(&self) -> impl Iterator<Item = &ActiveAction> {
        self.actions.iter()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}
