//! Scripted providers and harness shared by the integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use world_sim::core::config::EngineConfig;
use world_sim::core::error::{Result, SimError};
use world_sim::core::types::{ActorId, Round};
use world_sim::entity::action::{OutcomeKind, OutcomeQuality};
use world_sim::entity::actor::{Actor, Enrichment};
use world_sim::entity::record::ActionResult;
use world_sim::entity::simulation::Simulation;
use world_sim::entity::state::ActorRoundState;
use world_sim::provider::decision::{ActorDecisionProvider, Decision, WorldContext};
use world_sim::provider::roster::{ActorEnricher, Roster, RosterGenerator};
use world_sim::provider::world::{ActorUpdate, WorldRequest, WorldUpdate, WorldUpdateProvider};
use world_sim::simulation::{Providers, SimulationService};
use world_sim::store::MemoryStore;

pub const CAST: [(&str, &str); 3] = [
    ("Mayor", "City executive"),
    ("Union", "Transit workers"),
    ("Press", "Local newspaper"),
];

/// Returns a fresh copy of `CAST`, or fails every time
pub struct FixedRoster {
    pub fail: bool,
}

#[async_trait]
impl RosterGenerator for FixedRoster {
    async fn generate(&self, _question: &str) -> Result<Roster> {
        if self.fail {
            return Err(SimError::Llm("roster service unavailable".into()));
        }
        Ok(Roster {
            time_unit: "week".into(),
            simulation_duration: 8,
            actors: CAST.iter().map(|(id, role)| Actor::new(*id, *role)).collect(),
        })
    }
}

/// Enriches everyone except identifiers listed in `failing`
#[derive(Default)]
pub struct StaticEnricher {
    pub failing: Mutex<HashSet<String>>,
}

impl StaticEnricher {
    pub fn failing_for(identifiers: &[&str]) -> Self {
        Self {
            failing: Mutex::new(identifiers.iter().map(|s| s.to_string()).collect()),
        }
    }

    pub fn heal(&self) {
        self.failing.lock().unwrap().clear();
    }
}

#[async_trait]
impl ActorEnricher for StaticEnricher {
    async fn enrich(&self, actor: &Actor, _question: &str) -> Result<Enrichment> {
        if self.failing.lock().unwrap().contains(&actor.identifier) {
            return Err(SimError::Llm(format!("no sources for {}", actor.identifier)));
        }
        Ok(Enrichment {
            memory: format!("{} history", actor.identifier),
            intrinsic_characteristics: format!("{} resources", actor.identifier),
            predispositions: format!("{} habits", actor.identifier),
        })
    }
}

/// Decisions planned per (identifier, round); unplanned calls decide nothing
#[derive(Default)]
pub struct ScriptedDecisions {
    script: Mutex<HashMap<(String, Round), Decision>>,
    failing: Mutex<HashSet<String>>,
    calls: Mutex<Vec<(String, Round)>>,
}

impl ScriptedDecisions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn plan(&self, identifier: &str, round: Round, decision: Decision) {
        self.script
            .lock()
            .unwrap()
            .insert((identifier.to_string(), round), decision);
    }

    pub fn fail_for(&self, identifier: &str) {
        self.failing.lock().unwrap().insert(identifier.to_string());
    }

    /// Rounds in which `identifier` was asked to decide
    pub fn rounds_asked(&self, identifier: &str) -> Vec<Round> {
        let mut rounds: Vec<Round> = self
            .calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(who, _)| who == identifier)
            .map(|(_, round)| *round)
            .collect();
        rounds.dedup();
        rounds
    }
}

#[async_trait]
impl ActorDecisionProvider for ScriptedDecisions {
    async fn decide(
        &self,
        actor: &Actor,
        _history: &ActorRoundState,
        world: &WorldContext,
    ) -> Result<Decision> {
        self.calls
            .lock()
            .unwrap()
            .push((actor.identifier.clone(), world.current_round));
        if self.failing.lock().unwrap().contains(&actor.identifier) {
            return Err(SimError::Malformed("unparseable decision".into()));
        }
        Ok(self
            .script
            .lock()
            .unwrap()
            .remove(&(actor.identifier.clone(), world.current_round))
            .unwrap_or_default())
    }
}

/// Resolves every due action; success when the seed beats 0.5
#[derive(Default)]
pub struct ScriptedWorld {
    requests: Mutex<Vec<WorldRequest>>,
    fail_rounds: Mutex<HashSet<Round>>,
    stop_at: Mutex<Option<Round>>,
    omit_outcomes: Mutex<bool>,
}

impl ScriptedWorld {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_round(&self, round: Round) {
        self.fail_rounds.lock().unwrap().insert(round);
    }

    pub fn heal(&self) {
        self.fail_rounds.lock().unwrap().clear();
    }

    pub fn stop_at(&self, round: Round) {
        *self.stop_at.lock().unwrap() = Some(round);
    }

    pub fn omit_outcomes(&self) {
        *self.omit_outcomes.lock().unwrap() = true;
    }

    pub fn requests(&self) -> Vec<WorldRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl WorldUpdateProvider for ScriptedWorld {
    async fn resolve(&self, request: &WorldRequest) -> Result<WorldUpdate> {
        self.requests.lock().unwrap().push(request.clone());
        if self.fail_rounds.lock().unwrap().contains(&request.round) {
            return Err(SimError::Malformed("truncated world update".into()));
        }

        let action_results = if *self.omit_outcomes.lock().unwrap() {
            Vec::new()
        } else {
            request
                .due_actions
                .iter()
                .map(|d| ActionResult {
                    actor_id: d.actor_id,
                    action: d.action.clone(),
                    success_threshold: Some(0.5),
                    random_seed: d.random_seed,
                    outcome: if d.random_seed > 0.5 {
                        OutcomeKind::Success
                    } else {
                        OutcomeKind::Failure
                    },
                    outcome_quality: OutcomeQuality::Modest,
                    explanation: "scripted".into(),
                })
                .collect()
        };

        let actor_updates = request
            .due_actions
            .iter()
            .map(|d| ActorUpdate {
                actor_id: d.actor_id,
                observations: format!("Saw {} in round {}", d.action, request.round),
                ..ActorUpdate::default()
            })
            .collect();

        let stop = *self.stop_at.lock().unwrap() == Some(request.round);
        Ok(WorldUpdate {
            world_state_summary: format!(
                "Round {} saw {} action(s)",
                request.round,
                request.due_actions.len()
            ),
            key_changes: Vec::new(),
            emergent_developments: Vec::new(),
            action_results,
            actor_updates,
            continue_simulation: !stop,
            continuation_reasoning: if stop { "resolved".into() } else { "ongoing".into() },
        })
    }
}

pub fn fast_config() -> EngineConfig {
    EngineConfig {
        decision_retry_delay_ms: 0,
        world_retry_delay_ms: 0,
        ..EngineConfig::default()
    }
}

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub enricher: Arc<StaticEnricher>,
    pub decisions: Arc<ScriptedDecisions>,
    pub world: Arc<ScriptedWorld>,
    pub service: SimulationService,
}

impl Harness {
    pub fn new() -> Self {
        Self::with(FixedRoster { fail: false }, StaticEnricher::default())
    }

    pub fn with(roster: FixedRoster, enricher: StaticEnricher) -> Self {
        let store = Arc::new(MemoryStore::new());
        let enricher = Arc::new(enricher);
        let decisions = Arc::new(ScriptedDecisions::new());
        let world = Arc::new(ScriptedWorld::new());
        let providers = Providers {
            roster: Arc::new(roster),
            enricher: enricher.clone(),
            decisions: decisions.clone(),
            world: world.clone(),
        };
        let service = SimulationService::new(store.clone(), providers, fast_config());
        Self {
            store,
            enricher,
            decisions,
            world,
            service,
        }
    }

    /// A created and fully enriched simulation
    pub async fn ready(&self) -> Simulation {
        let sim = self
            .service
            .create("Will the transit strike end this month?")
            .await
            .unwrap();
        self.service.enrich(sim.simulation_id).await.unwrap();
        self.service.simulation(sim.simulation_id).await.unwrap()
    }
}

pub fn actor_id(sim: &Simulation, identifier: &str) -> ActorId {
    sim.resolve_actor(identifier).unwrap().actor_id
}
