//! Enrichment pass over a simulation's roster

use crate::core::error::{Result, SimError};
use crate::core::types::{ActorId, SimulationId};
use crate::entity::actor::Actor;
use crate::entity::simulation::Simulation;
use crate::provider::retry::RetryPolicy;
use crate::provider::roster::ActorEnricher;
use crate::simulation::lifecycle::SimulationStatus;
use crate::store::SimulationStore;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentReport {
    pub simulation_id: SimulationId,
    pub enriched: Vec<ActorId>,
    pub failed: Vec<ActorId>,
    pub status: SimulationStatus,
}

/// Enriches every actor still lacking research, saving after each one
///
/// Individual actor failures are tolerated; the simulation ends in `enriched`
/// only if every actor is enriched, otherwise it reverts to `created` and the
/// pass may be run again without losing finished actors. A store failure is
/// unrecoverable and moves the simulation to `failed`.
pub struct EnrichmentPass<'a> {
    enricher: &'a dyn ActorEnricher,
    store: &'a dyn SimulationStore,
    policy: RetryPolicy,
}

impl<'a> EnrichmentPass<'a> {
    pub fn new(
        enricher: &'a dyn ActorEnricher,
        store: &'a dyn SimulationStore,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            enricher,
            store,
            policy,
        }
    }

    pub async fn run(&self, sim: &mut Simulation) -> Result<EnrichmentReport> {
        let mut report = EnrichmentReport {
            simulation_id: sim.simulation_id,
            enriched: Vec::new(),
            failed: Vec::new(),
            status: sim.status,
        };

        let already_done = matches!(
            sim.status,
            SimulationStatus::Enriched | SimulationStatus::Running | SimulationStatus::Completed
        );
        if already_done && sim.all_enriched() {
            tracing::debug!(simulation = %sim.simulation_id, "already enriched");
            return Ok(report);
        }

        sim.begin_enrichment()?;
        self.store.save(sim).await?;

        let pending: Vec<Actor> = sim.actors.iter().filter(|a| !a.enriched).cloned().collect();
        tracing::info!(
            simulation = %sim.simulation_id,
            actors = pending.len(),
            "enriching actors"
        );

        for actor in &pending {
            let enricher = self.enricher;
            let question = sim.question.as_str();
            let result = self
                .policy
                .run("enrichment", move || async move {
                    enricher.enrich(actor, question).await
                })
                .await;

            match result {
                Ok(enrichment) => {
                    sim.enrich_actor(actor.actor_id, enrichment)?;
                    if let Err(err) = self.store.save(sim).await {
                        return Err(self.abort(sim, err).await);
                    }
                    report.enriched.push(actor.actor_id);
                }
                Err(err) => {
                    tracing::warn!(
                        actor = %actor.actor_id,
                        identifier = %actor.identifier,
                        error = %err,
                        "enrichment failed"
                    );
                    report.failed.push(actor.actor_id);
                }
            }
        }

        report.status = sim.finish_enrichment()?;
        if let Err(err) = self.store.save(sim).await {
            return Err(self.abort(sim, err).await);
        }

        tracing::info!(
            simulation = %sim.simulation_id,
            enriched = report.enriched.len(),
            failed = report.failed.len(),
            status = %report.status,
            "enrichment finished"
        );
        Ok(report)
    }

    async fn abort(&self, sim: &mut Simulation, err: SimError) -> SimError {
        tracing::error!(simulation = %sim.simulation_id, error = %err, "enrichment aborted");
        if sim.status != SimulationStatus::Enriching {
            // the pass already closed; its status stands
            return err;
        }
        if sim.mark_failed().is_ok() {
            if let Err(save_err) = self.store.save(sim).await {
                tracing::error!(simulation = %sim.simulation_id, error = %save_err, "could not record failure");
            }
        }
        err
    }
}
