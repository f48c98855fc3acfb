//! Service façade over the store, providers and round processor

use crate::core::config::EngineConfig;
use crate::core::error::{Result, SimError};
use crate::core::types::{ActorId, Round, SimulationId};
use crate::entity::action::ScheduledAction;
use crate::entity::record::RoundRecord;
use crate::entity::simulation::{Simulation, SimulationSummary};
use crate::entity::state::ActorRoundState;
use crate::provider::decision::{
    ActionProposal, ActorDecisionProvider, Decision, TextLimits, WorldContext,
};
use crate::provider::retry::RetryPolicy;
use crate::provider::roster::{ActorEnricher, RosterGenerator};
use crate::provider::world::WorldUpdateProvider;
use crate::simulation::enrichment::{EnrichmentPass, EnrichmentReport};
use crate::simulation::processor::{RoundProcessor, RoundReport};
use crate::store::SimulationStore;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// The four external reasoning collaborators
#[derive(Clone)]
pub struct Providers {
    pub roster: Arc<dyn RosterGenerator>,
    pub enricher: Arc<dyn ActorEnricher>,
    pub decisions: Arc<dyn ActorDecisionProvider>,
    pub world: Arc<dyn WorldUpdateProvider>,
}

/// Entry point for hosting processes
///
/// Every mutating operation on a simulation holds that simulation's lock for
/// its whole load-modify-save cycle, so round processing is serialized per
/// simulation while different simulations run independently.
pub struct SimulationService {
    store: Arc<dyn SimulationStore>,
    providers: Providers,
    processor: RoundProcessor,
    config: EngineConfig,
    locks: Mutex<HashMap<SimulationId, Arc<Mutex<()>>>>,
}

impl SimulationService {
    pub fn new(store: Arc<dyn SimulationStore>, providers: Providers, config: EngineConfig) -> Self {
        let processor = RoundProcessor::new(
            providers.decisions.clone(),
            providers.world.clone(),
            config.clone(),
        );
        Self {
            store,
            providers,
            processor,
            config,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    async fn lock(&self, id: SimulationId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks.entry(id).or_default().clone()
        };
        lock.lock_owned().await
    }

    /// Lock then load; a missing document releases its lock entry
    async fn load_locked(&self, id: SimulationId) -> Result<(OwnedMutexGuard<()>, Simulation)> {
        let guard = self.lock(id).await;
        match self.store.load(id).await {
            Ok(sim) => Ok((guard, sim)),
            Err(err) => {
                if err.is_not_found() {
                    drop(guard);
                    self.locks.lock().await.remove(&id);
                }
                Err(err)
            }
        }
    }

    /// Number of simulations with a lock entry
    pub async fn lock_count(&self) -> usize {
        self.locks.lock().await.len()
    }

    /// Create a simulation and generate its roster
    ///
    /// A roster failure leaves the document stored in `failed` rather than
    /// returning an error, so the caller can still inspect it.
    pub async fn create(&self, question: &str) -> Result<Simulation> {
        let question = question.trim();
        if question.is_empty() {
            return Err(SimError::Validation("question cannot be empty".into()));
        }

        let mut sim = Simulation::new(question);
        let _guard = self.lock(sim.simulation_id).await;
        self.store.insert(&sim).await?;
        tracing::info!(simulation = %sim.simulation_id, "generating actors");

        let generator = self.providers.roster.as_ref();
        let generated = RetryPolicy::for_decisions(&self.config)
            .run("roster", move || async move {
                let roster = generator.generate(question).await?;
                roster.validate()?;
                Ok(roster)
            })
            .await;

        let installed = generated.and_then(|roster| {
            sim.install_roster(roster.time_unit, roster.simulation_duration, roster.actors)
        });
        match installed {
            Ok(()) => tracing::info!(
                simulation = %sim.simulation_id,
                actors = sim.actors.len(),
                "roster installed"
            ),
            Err(err) => {
                tracing::error!(simulation = %sim.simulation_id, error = %err, "roster generation failed");
                sim.mark_failed()?;
            }
        }

        self.store.save(&sim).await?;
        Ok(sim)
    }

    pub async fn enrich(&self, id: SimulationId) -> Result<EnrichmentReport> {
        let (_guard, mut sim) = self.load_locked(id).await?;
        EnrichmentPass::new(
            self.providers.enricher.as_ref(),
            self.store.as_ref(),
            RetryPolicy::for_decisions(&self.config),
        )
        .run(&mut sim)
        .await
    }

    /// Queue an action for an actor; the seed is drawn if the proposal has none
    pub async fn schedule_action(
        &self,
        id: SimulationId,
        actor: ActorId,
        proposal: ActionProposal,
    ) -> Result<ScheduledAction> {
        let (_guard, mut sim) = self.load_locked(id).await?;

        proposal.validate(TextLimits {
            max_action_chars: self.config.max_action_chars,
            max_message_chars: self.config.max_message_chars,
        })?;
        let action = proposal.into_scheduled(actor, sim.current_round)?;
        sim.schedule_action(action.clone())?;
        self.store.save(&sim).await?;
        Ok(action)
    }

    pub async fn cancel_action(&self, id: SimulationId, round: Round, actor: ActorId) -> Result<()> {
        let (_guard, mut sim) = self.load_locked(id).await?;
        sim.status.ensure_can_schedule()?;
        sim.action_schedule.cancel(round, actor)?;
        sim.touch();
        self.store.save(&sim).await
    }

    /// Ask the decision provider what an actor would do now, without queuing it
    pub async fn propose_decision(&self, id: SimulationId, actor: ActorId) -> Result<Decision> {
        let sim = self.store.load(id).await?;
        let round = sim.current_round;
        let actor = sim.actor(actor)?;
        let history = sim.history_for(actor.actor_id, round);
        let world = WorldContext::for_round(&sim, round);
        self.processor.decide(actor, &history, &world).await
    }

    /// Process the current round and persist the result
    ///
    /// Nothing is saved when the round fails.
    pub async fn process_round(&self, id: SimulationId) -> Result<RoundReport> {
        let (_guard, mut sim) = self.load_locked(id).await?;
        let report = self.processor.process(&mut sim).await?;
        self.store.save(&sim).await?;
        Ok(report)
    }

    pub async fn simulation(&self, id: SimulationId) -> Result<Simulation> {
        self.store.load(id).await
    }

    pub async fn list(&self, limit: usize) -> Result<Vec<SimulationSummary>> {
        self.store.list(limit).await
    }

    pub async fn rounds(&self, id: SimulationId) -> Result<Vec<RoundRecord>> {
        Ok(self.store.load(id).await?.rounds)
    }

    pub async fn round(&self, id: SimulationId, round: Round) -> Result<RoundRecord> {
        self.store
            .load(id)
            .await?
            .rounds
            .into_iter()
            .find(|r| r.round_number == round)
            .ok_or(SimError::RoundNotFound(round))
    }

    /// An actor's private state; the latest processed round when `round` is None
    pub async fn actor_state(
        &self,
        id: SimulationId,
        actor: ActorId,
        round: Option<Round>,
    ) -> Result<ActorRoundState> {
        let sim = self.store.load(id).await?;
        sim.actor(actor)?;
        let round = match round {
            Some(round) => round,
            None => sim
                .current_round
                .checked_sub(1)
                .ok_or(SimError::StateNotFound { actor, round: 0 })?,
        };
        sim.state_for(actor, round)
            .cloned()
            .ok_or(SimError::StateNotFound { actor, round })
    }

    pub async fn scheduled_actions(&self, id: SimulationId, round: Round) -> Result<Vec<ScheduledAction>> {
        Ok(self.store.load(id).await?.action_schedule.due(round).to_vec())
    }

    pub async fn delete(&self, id: SimulationId) -> Result<()> {
        let deleted = {
            let _guard = self.lock(id).await;
            self.store.delete(id).await
        };
        self.locks.lock().await.remove(&id);
        deleted?;
        tracing::info!(simulation = %id, "deleted");
        Ok(())
    }
}
