//! The Simulation aggregate root

use crate::core::error::{Result, SimError};
use crate::core::types::{ActorId, Round, SimulationId};
use crate::entity::action::ScheduledAction;
use crate::entity::actor::{Actor, ActorSummary, Enrichment};
use crate::entity::record::RoundRecord;
use crate::entity::state::ActorRoundState;
use crate::schedule::{ActionQueue, ActiveActionTracker, Mailbox};
use crate::simulation::lifecycle::SimulationStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-round private states: round -> actor -> state
pub type ActorStates = BTreeMap<Round, BTreeMap<ActorId, ActorRoundState>>;

/// Complete simulation document
///
/// Every sub-entity is embedded; nothing outside the aggregate references
/// an action, message or state by identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Simulation {
    pub simulation_id: SimulationId,
    pub question: String,
    pub time_unit: String,
    pub simulation_duration: u32,
    pub current_round: Round,
    pub status: SimulationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    pub actors: Vec<Actor>,
    /// Public transcript, append-only
    pub rounds: Vec<RoundRecord>,
    pub actor_states: ActorStates,
    pub action_schedule: ActionQueue,
    pub active_actions: ActiveActionTracker,
    pub mailbox: Mailbox,
}

/// Lightweight listing entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationSummary {
    pub simulation_id: SimulationId,
    pub question: String,
    pub status: SimulationStatus,
    pub current_round: Round,
    pub actors_count: usize,
    pub created_at: DateTime<Utc>,
}

impl Simulation {
    /// A new simulation awaiting its roster
    pub fn new(question: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            simulation_id: SimulationId::new(),
            question: question.into(),
            time_unit: String::new(),
            simulation_duration: 0,
            current_round: 0,
            status: SimulationStatus::GeneratingActors,
            created_at: now,
            updated_at: now,
            actors: Vec::new(),
            rounds: Vec::new(),
            actor_states: BTreeMap::new(),
            action_schedule: ActionQueue::new(),
            active_actions: ActiveActionTracker::new(),
            mailbox: Mailbox::new(),
        }
    }

    /// Accept the generated roster and move to `created`
    pub fn install_roster(
        &mut self,
        time_unit: impl Into<String>,
        simulation_duration: u32,
        actors: Vec<Actor>,
    ) -> Result<()> {
        if actors.is_empty() {
            return Err(SimError::Validation("roster must contain at least one actor".into()));
        }
        let mut seen = std::collections::HashSet::new();
        if let Some(dup) = actors.iter().find(|a| !seen.insert(a.actor_id)) {
            return Err(SimError::Validation(format!(
                "duplicate actor id {} in roster",
                dup.actor_id
            )));
        }

        self.status.transition(SimulationStatus::Created)?;
        self.time_unit = time_unit.into();
        self.simulation_duration = simulation_duration;
        self.actors = actors;
        self.touch();
        Ok(())
    }

    pub fn mark_failed(&mut self) -> Result<()> {
        self.status.transition(SimulationStatus::Failed)?;
        self.touch();
        Ok(())
    }

    pub fn begin_enrichment(&mut self) -> Result<()> {
        self.status.ensure_can_enrich()?;
        self.status.transition(SimulationStatus::Enriching)?;
        self.touch();
        Ok(())
    }

    pub fn enrich_actor(&mut self, actor: ActorId, enrichment: Enrichment) -> Result<()> {
        self.actor_mut(actor)?.apply_enrichment(enrichment)?;
        self.touch();
        Ok(())
    }

    /// Close an enrichment pass: `enriched` if every actor is, else back to `created`
    pub fn finish_enrichment(&mut self) -> Result<SimulationStatus> {
        let next = if self.all_enriched() {
            SimulationStatus::Enriched
        } else {
            SimulationStatus::Created
        };
        self.status.transition(next)?;
        self.touch();
        Ok(next)
    }

    pub fn all_enriched(&self) -> bool {
        self.actors.iter().all(|a| a.enriched)
    }

    pub fn actor(&self, id: ActorId) -> Result<&Actor> {
        self.actors
            .iter()
            .find(|a| a.actor_id == id)
            .ok_or(SimError::ActorNotFound(id))
    }

    fn actor_mut(&mut self, id: ActorId) -> Result<&mut Actor> {
        self.actors
            .iter_mut()
            .find(|a| a.actor_id == id)
            .ok_or(SimError::ActorNotFound(id))
    }

    /// Resolve an actor named by id or identifier
    pub fn resolve_actor(&self, reference: &str) -> Option<&Actor> {
        self.actors.iter().find(|a| a.answers_to(reference))
    }

    pub fn roster(&self) -> Vec<ActorSummary> {
        self.actors.iter().map(Actor::summary).collect()
    }

    /// Queue an action, enforcing the lifecycle and past-round guards
    pub fn schedule_action(&mut self, action: ScheduledAction) -> Result<()> {
        self.status.ensure_can_schedule()?;
        self.actor(action.actor_id)?;
        self.action_schedule.schedule(action, self.current_round)?;
        self.touch();
        Ok(())
    }

    pub fn state_for(&self, actor: ActorId, round: Round) -> Option<&ActorRoundState> {
        self.actor_states.get(&round).and_then(|states| states.get(&actor))
    }

    /// The state an actor carries into `round`: last round's, or a fresh one
    pub fn history_for(&self, actor: ActorId, round: Round) -> ActorRoundState {
        round
            .checked_sub(1)
            .and_then(|prev| self.state_for(actor, prev))
            .cloned()
            .unwrap_or_else(|| ActorRoundState::initial(actor, round))
    }

    pub fn latest_record(&self) -> Option<&RoundRecord> {
        self.rounds.last()
    }

    pub fn summary(&self) -> SimulationSummary {
        SimulationSummary {
            simulation_id: self.simulation_id,
            question: self.question.clone(),
            status: self.status,
            current_round: self.current_round,
            actors_count: self.actors.len(),
            created_at: self.created_at,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
