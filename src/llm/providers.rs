//! Provider implementations backed by an LLM

use crate::core::config::{LlmConfig, ProviderRole};
use crate::core::error::Result;
use crate::entity::actor::{Actor, Enrichment};
use crate::entity::state::ActorRoundState;
use crate::llm::client::LlmClient;
use crate::llm::context::{enrichment_prompt, roster_prompt, world_prompt, DecisionContext};
use crate::llm::parser::{parse_reply, RawDecision, RawEnrichment, RawRoster, RawWorldUpdate};
use crate::provider::decision::{ActorDecisionProvider, Decision, TextLimits, WorldContext};
use crate::provider::roster::{ActorEnricher, Roster, RosterGenerator};
use crate::provider::world::{WorldRequest, WorldUpdate, WorldUpdateProvider};
use crate::simulation::service::Providers;
use async_trait::async_trait;
use std::sync::Arc;

pub struct LlmRosterGenerator {
    client: LlmClient,
}

impl LlmRosterGenerator {
    pub fn new(client: LlmClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RosterGenerator for LlmRosterGenerator {
    async fn generate(&self, question: &str) -> Result<Roster> {
        let reply = self
            .client
            .complete(ROSTER_SYSTEM_PROMPT, &roster_prompt(question))
            .await?;
        parse_reply::<RawRoster>(&reply)?.into_roster()
    }
}

pub struct LlmEnricher {
    client: LlmClient,
}

impl LlmEnricher {
    pub fn new(client: LlmClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ActorEnricher for LlmEnricher {
    async fn enrich(&self, actor: &Actor, question: &str) -> Result<Enrichment> {
        let reply = self
            .client
            .complete(ENRICHMENT_SYSTEM_PROMPT, &enrichment_prompt(actor, question))
            .await?;
        parse_reply::<RawEnrichment>(&reply)?.into_enrichment()
    }
}

pub struct LlmDecisionProvider {
    client: LlmClient,
    limits: TextLimits,
}

impl LlmDecisionProvider {
    pub fn new(client: LlmClient, limits: TextLimits) -> Self {
        Self { client, limits }
    }
}

#[async_trait]
impl ActorDecisionProvider for LlmDecisionProvider {
    async fn decide(
        &self,
        actor: &Actor,
        history: &ActorRoundState,
        world: &WorldContext,
    ) -> Result<Decision> {
        let prompt = DecisionContext {
            actor,
            history,
            world,
            limits: self.limits,
        }
        .render();
        let reply = self.client.complete(DECISION_SYSTEM_PROMPT, &prompt).await?;
        let decision = parse_reply::<RawDecision>(&reply)?.into_decision(world.current_round);
        tracing::debug!(
            actor = %actor.identifier,
            actions = decision.actions.len(),
            messages = decision.messages.len(),
            "parsed decision"
        );
        Ok(decision)
    }
}

pub struct LlmWorldProvider {
    client: LlmClient,
}

impl LlmWorldProvider {
    pub fn new(client: LlmClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl WorldUpdateProvider for LlmWorldProvider {
    async fn resolve(&self, request: &WorldRequest) -> Result<WorldUpdate> {
        let reply = self
            .client
            .complete(WORLD_SYSTEM_PROMPT, &world_prompt(request))
            .await?;
        parse_reply::<RawWorldUpdate>(&reply)?.into_update(request)
    }
}

/// All four providers, each with its role's model
pub fn llm_providers(config: &LlmConfig, limits: TextLimits) -> Providers {
    Providers {
        roster: Arc::new(LlmRosterGenerator::new(LlmClient::for_role(
            config,
            ProviderRole::Roster,
        ))),
        enricher: Arc::new(LlmEnricher::new(LlmClient::for_role(
            config,
            ProviderRole::Enrichment,
        ))),
        decisions: Arc::new(LlmDecisionProvider::new(
            LlmClient::for_role(config, ProviderRole::Decision),
            limits,
        )),
        world: Arc::new(LlmWorldProvider::new(LlmClient::for_role(
            config,
            ProviderRole::World,
        ))),
    }
}

const ROSTER_SYSTEM_PROMPT: &str = r#"You design the cast of a social simulation.
Given a question, decide which actors (people, groups, organizations, sectors or
places) make decisions that shape the outcome, at what granularity each should be
modeled, and which other actors each will interact with.

Keep the cast between 3 and 15 actors and make sure they form a connected network.
Pick the time unit that fits the dynamics (hour, day, week, month or year) and a
duration measured in that unit.

You may reason first, then output JSON in a ```json block:
{
  "time_unit": "hour|day|week|month|year",
  "simulation_duration": 12,
  "actors": [
    {
      "identifier": "Single_Term_Identifier",
      "research_query": "query used to research this actor",
      "granularity": "Individual|Group|Organization|Sector|Geographic|Other",
      "scale_notes": "population size, scope",
      "role_in_simulation": "why this actor is needed",
      "key_interactions": ["Other_Identifier"]
    }
  ]
}
Identifiers in key_interactions must match actor identifiers."#;

const ENRICHMENT_SYSTEM_PROMPT: &str = r#"You build detailed profiles for simulation actors.
Cover the actor's history and past decisions (memory), its capabilities, resources
and limits (intrinsic characteristics), and its values, habits and typical
responses (predispositions).

Output JSON in a ```json block:
{
  "memory": "historical context",
  "intrinsic_characteristics": "capabilities and constraints",
  "predispositions": "behavioral patterns"
}"#;

const DECISION_SYSTEM_PROMPT: &str = r#"You are one actor in a world simulation.
You see your own profile, your full action history with outcomes and your past
private reasoning, the current world state, and messages sent to you.

Each round you may take zero to three ACTIONS (what you do in the world) and send
zero to five MESSAGES (private notes to one other actor, delivered next round).
Actions can be scheduled for this round or a later one, and can span several rounds.
Your reasoning is private: no other actor and not the world sees it.

Output JSON in a ```json block:
{
  "actions": [
    {"action": "concise action", "reasoning": "private", "execute_round": 0, "duration": 1}
  ],
  "messages": [
    {"to_actor_id": "Other_Identifier", "content": "message", "reasoning": "private"}
  ]
}"#;

const WORLD_SYSTEM_PROMPT: &str = r#"You are the world engine of a social simulation.
Apply careful causal reasoning to the actions taken this round and report how the
world changes.

Each action has a random_seed in [0, 1). Pick a success threshold from its difficulty
and context: routine 0.1-0.3, moderate 0.3-0.6, hard 0.6-0.8, very risky 0.8-0.95.
The action succeeds when random_seed > threshold; the margin sets the quality
(strong, modest, weak, catastrophic).

Output ONLY JSON, no surrounding text:
{
  "world_state_update": {
    "summary": "what happened this round",
    "key_changes": ["change"],
    "emergent_developments": ["development"]
  },
  "action_results": [
    {
      "actor_id": "Actor_Identifier",
      "action": "their action",
      "success_threshold": 0.45,
      "random_seed": 0.73,
      "outcome": "SUCCESS|FAILURE",
      "outcome_quality": "strong|modest|weak|catastrophic",
      "explanation": "why"
    }
  ],
  "actor_updates": [
    {
      "actor_id": "Actor_Identifier",
      "observations": "what they perceive",
      "direct_impacts": "how they were directly affected",
      "indirect_impacts": "systemic effects on them",
      "state_changes": {
        "enabled_actions": [],
        "disabled_actions": [],
        "resources": {},
        "constraints": []
      }
    }
  ],
  "continue_simulation": true,
  "continuation_reasoning": "why"
}
Be concise; a complete, valid JSON object matters more than detail."#;
