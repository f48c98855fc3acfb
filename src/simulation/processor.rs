//! Round processor
//!
//! One call to [`RoundProcessor::process`] advances a simulation by one round:
//!
//! ```text
//! Idle -> GatheringActions -> AwaitingWorldUpdate -> Reconciling -> Persisted
//!                                    |                    |
//!                                    +------> Failed <----+
//! ```
//!
//! All work happens on a copy of the aggregate. The caller's simulation is
//! replaced only once reconciliation has succeeded, so a failed round leaves
//! it exactly as it was.

use crate::core::config::EngineConfig;
use crate::core::error::{Result, SimError};
use crate::core::types::{ActorId, Round, SimulationId};
use crate::entity::action::{ActionStatus, OutcomeKind, OutcomeQuality, ScheduledAction};
use crate::entity::actor::Actor;
use crate::entity::message::{DeliveredMessage, PendingMessage};
use crate::entity::record::{ActionResult, RoundRecord};
use crate::entity::simulation::Simulation;
use crate::entity::state::{ActionRecord, ActorRoundState};
use crate::provider::decision::{ActorDecisionProvider, Decision, TextLimits, WorldContext};
use crate::provider::retry::RetryPolicy;
use crate::provider::world::{ActorUpdate, WorldRequest, WorldUpdate, WorldUpdateProvider};
use crate::simulation::lifecycle::SimulationStatus;
use chrono::Utc;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundPhase {
    Idle,
    GatheringActions,
    AwaitingWorldUpdate,
    Reconciling,
    Persisted,
    Failed,
}

impl fmt::Display for RoundPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RoundPhase::Idle => "idle",
            RoundPhase::GatheringActions => "gathering_actions",
            RoundPhase::AwaitingWorldUpdate => "awaiting_world_update",
            RoundPhase::Reconciling => "reconciling",
            RoundPhase::Persisted => "persisted",
            RoundPhase::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// What a processed round did
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundReport {
    pub simulation_id: SimulationId,
    pub round: Round,
    pub status: SimulationStatus,
    pub actions_scheduled: usize,
    pub actions_resolved: usize,
    pub actions_completed: usize,
    pub messages_sent: usize,
    pub messages_delivered: usize,
    pub messages_dropped: usize,
    /// Actors whose decision call failed and were skipped
    pub decision_failures: Vec<ActorId>,
    /// True when nothing was due and the engine resolved the round itself
    pub quiet: bool,
    pub continue_simulation: bool,
}

impl RoundReport {
    fn new(sim: &Simulation, round: Round) -> Self {
        Self {
            simulation_id: sim.simulation_id,
            round,
            status: sim.status,
            actions_scheduled: 0,
            actions_resolved: 0,
            actions_completed: 0,
            messages_sent: 0,
            messages_delivered: 0,
            messages_dropped: 0,
            decision_failures: Vec::new(),
            quiet: false,
            continue_simulation: true,
        }
    }
}

pub struct RoundProcessor {
    decisions: Arc<dyn ActorDecisionProvider>,
    world: Arc<dyn WorldUpdateProvider>,
    config: EngineConfig,
}

impl RoundProcessor {
    pub fn new(
        decisions: Arc<dyn ActorDecisionProvider>,
        world: Arc<dyn WorldUpdateProvider>,
        config: EngineConfig,
    ) -> Self {
        Self {
            decisions,
            world,
            config,
        }
    }

    fn limits(&self) -> TextLimits {
        TextLimits {
            max_action_chars: self.config.max_action_chars,
            max_message_chars: self.config.max_message_chars,
        }
    }

    /// Process `sim.current_round`; on error `sim` is untouched
    pub async fn process(&self, sim: &mut Simulation) -> Result<RoundReport> {
        sim.status.ensure_can_process_round()?;

        let round = sim.current_round;
        let mut working = sim.clone();
        let mut report = RoundReport::new(&working, round);
        let mut phase = RoundPhase::Idle;

        tracing::info!(simulation = %sim.simulation_id, round, "processing round");

        match self.run(&mut working, &mut report, &mut phase).await {
            Ok(()) => {
                report.status = working.status;
                *sim = working;
                tracing::info!(
                    simulation = %sim.simulation_id,
                    round,
                    status = %sim.status,
                    resolved = report.actions_resolved,
                    "round persisted"
                );
                Ok(report)
            }
            Err(err) => {
                let failed_in = phase;
                enter(&mut phase, RoundPhase::Failed, round);
                tracing::error!(
                    simulation = %sim.simulation_id,
                    round,
                    phase = %failed_in,
                    error = %err,
                    "round failed"
                );
                Err(err)
            }
        }
    }

    async fn run(
        &self,
        sim: &mut Simulation,
        report: &mut RoundReport,
        phase: &mut RoundPhase,
    ) -> Result<()> {
        let round = report.round;

        enter(phase, RoundPhase::GatheringActions, round);
        self.gather(sim, round, report).await;

        enter(phase, RoundPhase::AwaitingWorldUpdate, round);
        let due: Vec<ScheduledAction> = sim.action_schedule.pending(round).cloned().collect();
        let update = if due.is_empty() {
            report.quiet = true;
            WorldUpdate::quiet_round()
        } else {
            let request = WorldRequest::build(sim, round, &due);
            self.resolve(&request).await?
        };

        enter(phase, RoundPhase::Reconciling, round);
        reconcile(sim, round, &due, update, report)?;

        enter(phase, RoundPhase::Persisted, round);
        Ok(())
    }

    /// Ask idle actors for decisions and merge them into the queue and mailbox
    async fn gather(&self, sim: &mut Simulation, round: Round, report: &mut RoundReport) {
        if !self.config.gather_decisions {
            return;
        }

        let world = WorldContext::for_round(sim, round);
        let candidates: Vec<(Actor, ActorRoundState)> = sim
            .actors
            .iter()
            .filter(|a| {
                sim.action_schedule.live_action(round, a.actor_id).is_none()
                    && sim.active_actions.in_flight_for(a.actor_id, round).is_none()
            })
            .map(|a| (a.clone(), sim.history_for(a.actor_id, round)))
            .collect();

        // owned candidates: a borrowed tuple here makes the round future unspawnable
        let world = &world;
        let calls = candidates.into_iter().map(move |(actor, history)| async move {
            let result = self.decide(&actor, &history, world).await;
            (actor.actor_id, result)
        });
        let outcomes: Vec<(ActorId, Result<Decision>)> = stream::iter(calls)
            .buffered(self.config.decision_concurrency.max(1))
            .collect()
            .await;

        for (actor, result) in outcomes {
            match result {
                Ok(decision) => self.merge_decision(sim, actor, round, decision, report),
                Err(err) => {
                    tracing::warn!(%actor, round, error = %err, "skipping actor for this round");
                    report.decision_failures.push(actor);
                }
            }
        }
    }

    /// One actor's validated decision, under the decision retry budget
    pub async fn decide(
        &self,
        actor: &Actor,
        history: &ActorRoundState,
        world: &WorldContext,
    ) -> Result<Decision> {
        let policy = RetryPolicy::for_decisions(&self.config);
        let limits = self.limits();
        let provider = self.decisions.as_ref();

        policy
            .run("decision", move || async move {
                let decision = provider.decide(actor, history, world).await?;
                decision.validate(limits)?;
                Ok(decision)
            })
            .await
            .map_err(|e| SimError::Decision {
                actor: actor.actor_id,
                reason: e.to_string(),
            })
    }

    fn merge_decision(
        &self,
        sim: &mut Simulation,
        actor: ActorId,
        round: Round,
        decision: Decision,
        report: &mut RoundReport,
    ) {
        for proposal in decision.actions {
            let accepted = proposal
                .into_scheduled(actor, round)
                .and_then(|action| sim.schedule_action(action));
            match accepted {
                Ok(()) => report.actions_scheduled += 1,
                Err(err) => tracing::warn!(%actor, round, error = %err, "rejected proposed action"),
            }
        }

        for message in decision.messages {
            sim.mailbox
                .send(PendingMessage::new(actor, message.to, message.content, round));
            report.messages_sent += 1;
        }
    }

    async fn resolve(&self, request: &WorldRequest) -> Result<WorldUpdate> {
        let policy = RetryPolicy::for_world_updates(&self.config);
        let provider = self.world.as_ref();

        policy
            .run("world_update", move || async move {
                let update = provider.resolve(request).await?;
                update.validate()?;
                Ok(update)
            })
            .await
            .map_err(|e| SimError::Resolution {
                round: request.round,
                reason: e.to_string(),
            })
    }
}

fn enter(phase: &mut RoundPhase, next: RoundPhase, round: Round) {
    tracing::debug!(round, from = %phase, to = %next, "round phase");
    *phase = next;
}

fn missing_outcome(action: &ScheduledAction) -> ActionResult {
    ActionResult {
        actor_id: action.actor_id,
        action: action.action.clone(),
        success_threshold: None,
        random_seed: action.random_seed,
        outcome: OutcomeKind::Failure,
        outcome_quality: OutcomeQuality::Weak,
        explanation: "no outcome reported".into(),
    }
}

/// Merge a validated world update into the aggregate
fn reconcile(
    sim: &mut Simulation,
    round: Round,
    due: &[ScheduledAction],
    update: WorldUpdate,
    report: &mut RoundReport,
) -> Result<()> {
    // Outcomes, one per due action, in due order
    let mut reported: HashMap<ActorId, ActionResult> = update
        .action_results
        .into_iter()
        .map(|r| (r.actor_id, r))
        .collect();

    let mut results = Vec::with_capacity(due.len());
    for action in due {
        let result = match reported.remove(&action.actor_id) {
            Some(result) => result,
            None => {
                tracing::warn!(actor = %action.actor_id, round, "world update omitted an outcome");
                missing_outcome(action)
            }
        };
        results.push(result);
    }
    for stray in reported.keys() {
        tracing::warn!(actor = %stray, round, "dropping outcome for actor with no due action");
    }

    // Status updates and this round's history entries
    let mut resolved: HashMap<ActorId, ActionRecord> = HashMap::new();
    for (action, result) in due.iter().zip(&results) {
        let status = if action.is_multi_round() {
            ActionStatus::Executing
        } else {
            ActionStatus::Completed
        };
        sim.action_schedule
            .set_status(round, action.actor_id, status, Some(result.to_outcome()))?;

        if let Some(updated) = sim.action_schedule.live_action(round, action.actor_id) {
            resolved.insert(action.actor_id, ActionRecord::from_resolved(updated));
        }
        report.actions_resolved += 1;
    }

    // Multi-round actions finishing this round
    let finishing: Vec<(ActorId, Round)> = sim
        .active_actions
        .due_for_completion(round)
        .map(|a| (a.actor_id, a.started_round))
        .collect();
    for (actor, started) in finishing {
        if sim.active_actions.complete(actor, started).is_some() {
            match sim
                .action_schedule
                .set_status(started, actor, ActionStatus::Completed, None)
            {
                Ok(()) => report.actions_completed += 1,
                Err(err) => {
                    tracing::warn!(%actor, started, error = %err, "could not mark action completed")
                }
            }
        }
    }

    for action in due.iter().filter(|a| a.is_multi_round()) {
        sim.active_actions.promote(action, round);
    }

    // Mail for this round
    let mut inbox: HashMap<ActorId, Vec<DeliveredMessage>> = HashMap::new();
    for (recipient, messages) in sim.mailbox.deliverable(round) {
        let Some(target) = sim.resolve_actor(recipient) else {
            tracing::warn!(recipient, round, count = messages.len(), "dropping mail for unknown actor");
            report.messages_dropped += messages.len();
            continue;
        };
        let target = target.actor_id;
        for message in messages {
            let from_actor_identifier = sim
                .actor(message.sender)
                .map(|a| a.identifier.clone())
                .unwrap_or_else(|_| "Unknown".into());
            inbox.entry(target).or_default().push(DeliveredMessage {
                from_actor_id: message.sender,
                from_actor_identifier,
                content: message.content.clone(),
                sent_round: message.sent_round,
            });
            report.messages_delivered += 1;
        }
    }
    sim.mailbox.purge(round);

    // One private state per roster actor
    let mut updates: HashMap<ActorId, ActorUpdate> = HashMap::new();
    for actor_update in update.actor_updates {
        if sim.actor(actor_update.actor_id).is_ok() {
            updates.insert(actor_update.actor_id, actor_update);
        } else {
            tracing::warn!(actor = %actor_update.actor_id, round, "dropping state update for unknown actor");
        }
    }

    let mut states = BTreeMap::new();
    for actor in &sim.actors {
        let id = actor.actor_id;
        let previous = sim.history_for(id, round);
        let mut state = match updates.remove(&id) {
            Some(u) => ActorRoundState {
                actor_id: id,
                round_number: round,
                world_state_summary: update.world_state_summary.clone(),
                observations: u.observations,
                available_actions: u.available_actions,
                disabled_actions: u.disabled_actions,
                resources: u.resources,
                constraints: u.constraints,
                messages_received: Vec::new(),
                my_actions: previous.my_actions,
                direct_impacts: u.direct_impacts,
                indirect_impacts: u.indirect_impacts,
            },
            None => {
                let mut carried = previous.carried_forward(round);
                if !report.quiet {
                    carried.world_state_summary = update.world_state_summary.clone();
                }
                carried
            }
        };
        if let Some(record) = resolved.remove(&id) {
            state.my_actions.push(record);
        }
        state.messages_received = inbox.remove(&id).unwrap_or_default();
        states.insert(id, state);
    }
    sim.actor_states.insert(round, states);

    sim.rounds.push(RoundRecord {
        round_number: round,
        world_state_summary: update.world_state_summary,
        key_changes: update.key_changes,
        emergent_developments: update.emergent_developments,
        action_results: results,
        continue_simulation: update.continue_simulation,
        continuation_reasoning: update.continuation_reasoning,
        timestamp: Utc::now(),
    });

    sim.current_round = round + 1;
    if sim.status == SimulationStatus::Enriched || sim.status == SimulationStatus::Running {
        sim.status.transition(SimulationStatus::Running)?;
    }
    if !update.continue_simulation {
        sim.status.transition(SimulationStatus::Completed)?;
    }
    report.continue_simulation = update.continue_simulation;
    sim.touch();
    Ok(())
}
