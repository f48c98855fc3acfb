//! Parse LLM replies into validated provider results
//!
//! Replies are free text that should contain one JSON object. The object is
//! pulled out, lightly repaired if needed, deserialized into a raw shape that
//! mirrors what the prompt asks for, then converted into the typed result.
//! Every failure here is `Malformed`, so the caller's retry budget applies.

use crate::core::error::{Result, SimError};
use crate::core::types::Round;
use crate::entity::action::{OutcomeKind, OutcomeQuality};
use crate::entity::actor::{Actor, Enrichment};
use crate::entity::record::ActionResult;
use crate::provider::decision::{ActionProposal, Decision, MessageProposal};
use crate::provider::roster::Roster;
use crate::provider::world::{ActorUpdate, WorldRequest, WorldUpdate};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::BTreeMap;

/// Extract the JSON object from a reply
///
/// A ```json fenced block wins; otherwise the span from the first `{` to the
/// last `}`. If that does not parse, trailing commas are dropped and missing
/// closers appended.
pub fn extract_json(response: &str) -> Result<String> {
    let candidate = fenced_block(response)
        .or_else(|| braced_span(response))
        .ok_or_else(|| SimError::Malformed("No JSON found in response".into()))?;

    if serde_json::from_str::<serde_json::Value>(candidate).is_ok() {
        return Ok(candidate.to_string());
    }

    let repaired = repair(candidate);
    match serde_json::from_str::<serde_json::Value>(&repaired) {
        Ok(_) => {
            tracing::debug!("repaired malformed JSON reply");
            Ok(repaired)
        }
        Err(e) => Err(SimError::Malformed(format!("invalid JSON: {}", e))),
    }
}

fn fenced_block(response: &str) -> Option<&str> {
    let start = response.find("```json")? + "```json".len();
    let rest = &response[start..];
    let end = rest.find("```").unwrap_or(rest.len());
    let block = rest[..end].trim();
    block.starts_with('{').then_some(block)
}

fn braced_span(response: &str) -> Option<&str> {
    let start = response.find('{')?;
    match response.rfind('}') {
        Some(end) if end > start => Some(&response[start..=end]),
        // truncated reply, let repair close it
        _ => Some(&response[start..]),
    }
}

/// Drop trailing commas and close unterminated strings, arrays and objects
fn repair(json: &str) -> String {
    let mut out = String::with_capacity(json.len() + 8);
    let mut closers: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for c in json.chars() {
        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '{' => closers.push('}'),
            '[' => closers.push(']'),
            '}' | ']' => {
                strip_trailing_comma(&mut out);
                closers.pop();
            }
            _ => {}
        }
        out.push(c);
    }

    if in_string {
        out.push('"');
    }
    strip_trailing_comma(&mut out);
    while let Some(closer) = closers.pop() {
        out.push(closer);
    }
    out
}

fn strip_trailing_comma(out: &mut String) {
    let trimmed = out.trim_end().len();
    if out[..trimmed].ends_with(',') {
        out.truncate(trimmed - 1);
    }
}

/// Extract and deserialize a reply into `T`
pub fn parse_reply<T: DeserializeOwned>(response: &str) -> Result<T> {
    let json = extract_json(response)?;
    serde_json::from_str(&json).map_err(|e| SimError::Malformed(format!("unexpected shape: {}", e)))
}

// === Roster ===

#[derive(Debug, Deserialize)]
pub struct RawRoster {
    pub time_unit: String,
    pub simulation_duration: u32,
    pub actors: Vec<RawActor>,
}

#[derive(Debug, Deserialize)]
pub struct RawActor {
    pub identifier: String,
    #[serde(default)]
    pub research_query: String,
    #[serde(default)]
    pub granularity: String,
    #[serde(default)]
    pub scale_notes: String,
    #[serde(default)]
    pub role_in_simulation: String,
    #[serde(default)]
    pub key_interactions: Vec<String>,
}

impl RawRoster {
    pub fn into_roster(self) -> Result<Roster> {
        let actors = self
            .actors
            .into_iter()
            .map(|raw| {
                let mut actor = Actor::new(raw.identifier.trim(), raw.role_in_simulation)
                    .with_interactions(raw.key_interactions)
                    .with_granularity(raw.granularity)
                    .with_research_query(raw.research_query);
                actor.scale_notes = raw.scale_notes;
                actor
            })
            .collect();

        let roster = Roster {
            time_unit: self.time_unit.trim().to_lowercase(),
            simulation_duration: self.simulation_duration,
            actors,
        };
        roster.validate()?;
        Ok(roster)
    }
}

// === Enrichment ===

#[derive(Debug, Deserialize)]
pub struct RawEnrichment {
    pub memory: String,
    pub intrinsic_characteristics: String,
    pub predispositions: String,
}

impl RawEnrichment {
    pub fn into_enrichment(self) -> Result<Enrichment> {
        let fields = [
            ("memory", &self.memory),
            ("intrinsic_characteristics", &self.intrinsic_characteristics),
            ("predispositions", &self.predispositions),
        ];
        if let Some((name, _)) = fields.iter().find(|(_, v)| v.trim().is_empty()) {
            return Err(SimError::Malformed(format!("enrichment field {} is empty", name)));
        }
        Ok(Enrichment {
            memory: self.memory,
            intrinsic_characteristics: self.intrinsic_characteristics,
            predispositions: self.predispositions,
        })
    }
}

// === Decisions ===

/// Either the batch shape or the older single-action shape
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum RawDecision {
    Single(RawAction),
    Batch {
        #[serde(default)]
        actions: Vec<RawAction>,
        #[serde(default)]
        messages: Vec<RawMessage>,
    },
}

#[derive(Debug, Deserialize)]
pub struct RawAction {
    pub action: String,
    #[serde(default)]
    pub reasoning: String,
    #[serde(default)]
    pub execute_round: Option<i64>,
    #[serde(default)]
    pub duration: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct RawMessage {
    #[serde(alias = "to")]
    pub to_actor_id: String,
    pub content: String,
    #[serde(default)]
    pub reasoning: String,
}

impl RawAction {
    /// Missing or past rounds mean "now"; missing or non-positive durations mean 1
    fn into_proposal(self, current_round: Round) -> ActionProposal {
        let execute_round = self
            .execute_round
            .and_then(|r| Round::try_from(r).ok())
            .map_or(current_round, |r| r.max(current_round));
        let duration = self
            .duration
            .and_then(|d| u32::try_from(d).ok())
            .filter(|d| *d >= 1)
            .unwrap_or(1);
        ActionProposal::new(self.action.trim(), execute_round, duration).with_reasoning(self.reasoning)
    }
}

impl RawDecision {
    pub fn into_decision(self, current_round: Round) -> Decision {
        match self {
            RawDecision::Single(action) => Decision::single(action.into_proposal(current_round)),
            RawDecision::Batch { actions, messages } => Decision {
                actions: actions
                    .into_iter()
                    .map(|a| a.into_proposal(current_round))
                    .collect(),
                messages: messages
                    .into_iter()
                    .map(|m| MessageProposal {
                        to: m.to_actor_id,
                        content: m.content,
                        reasoning: m.reasoning,
                    })
                    .collect(),
            },
        }
    }
}

// === World update ===

#[derive(Debug, Deserialize)]
pub struct RawWorldUpdate {
    pub world_state_update: RawWorldState,
    #[serde(default)]
    pub action_results: Vec<RawActionResult>,
    #[serde(default)]
    pub actor_updates: Vec<RawActorUpdate>,
    #[serde(default = "default_true")]
    pub continue_simulation: bool,
    #[serde(default)]
    pub continuation_reasoning: String,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct RawWorldState {
    pub summary: String,
    #[serde(default)]
    pub key_changes: Vec<String>,
    #[serde(default)]
    pub emergent_developments: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct RawActionResult {
    pub actor_id: String,
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub success_threshold: Option<f64>,
    #[serde(default)]
    pub random_seed: Option<f64>,
    pub outcome: String,
    #[serde(default)]
    pub outcome_quality: Option<String>,
    #[serde(default)]
    pub explanation: String,
}

#[derive(Debug, Deserialize)]
pub struct RawActorUpdate {
    pub actor_id: String,
    #[serde(default)]
    pub observations: String,
    #[serde(default)]
    pub direct_impacts: Option<String>,
    #[serde(default)]
    pub indirect_impacts: Option<String>,
    #[serde(default)]
    pub state_changes: RawStateChanges,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawStateChanges {
    #[serde(default)]
    pub enabled_actions: Vec<String>,
    #[serde(default)]
    pub disabled_actions: Vec<String>,
    #[serde(default)]
    pub resources: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub constraints: Vec<String>,
}

fn parse_outcome(raw: &str) -> Result<OutcomeKind> {
    match raw.trim().to_ascii_uppercase().as_str() {
        "SUCCESS" => Ok(OutcomeKind::Success),
        "FAILURE" => Ok(OutcomeKind::Failure),
        other => Err(SimError::Malformed(format!("unknown outcome {:?}", other))),
    }
}

fn parse_quality(raw: Option<&str>) -> OutcomeQuality {
    match raw.map(|q| q.trim().to_ascii_lowercase()).as_deref() {
        Some("strong") => OutcomeQuality::Strong,
        Some("weak") => OutcomeQuality::Weak,
        Some("catastrophic") => OutcomeQuality::Catastrophic,
        _ => OutcomeQuality::Modest,
    }
}

impl RawWorldUpdate {
    /// Resolve actor references against the request and build the typed update
    ///
    /// Entries naming nobody in the roster are dropped. The seed recorded for a
    /// due action is always the one the engine drew.
    pub fn into_update(self, request: &WorldRequest) -> Result<WorldUpdate> {
        let resolve = |reference: &str| {
            let reference = reference.trim();
            request
                .roster
                .iter()
                .find(|a| {
                    a.actor_id.to_string() == reference
                        || a.identifier.trim().eq_ignore_ascii_case(reference)
                })
                .map(|a| a.actor_id)
        };

        let mut action_results = Vec::new();
        for raw in self.action_results {
            let Some(actor_id) = resolve(&raw.actor_id) else {
                tracing::warn!(actor = %raw.actor_id, "outcome names an unknown actor");
                continue;
            };
            let due = request.due_actions.iter().find(|d| d.actor_id == actor_id);
            let random_seed = due
                .map(|d| d.random_seed)
                .or(raw.random_seed)
                .unwrap_or_default();
            let action = match (raw.action.trim().is_empty(), due) {
                (true, Some(d)) => d.action.clone(),
                _ => raw.action,
            };
            action_results.push(ActionResult {
                actor_id,
                action,
                success_threshold: raw.success_threshold,
                random_seed,
                outcome: parse_outcome(&raw.outcome)?,
                outcome_quality: parse_quality(raw.outcome_quality.as_deref()),
                explanation: raw.explanation,
            });
        }

        let mut actor_updates = Vec::new();
        for raw in self.actor_updates {
            let Some(actor_id) = resolve(&raw.actor_id) else {
                tracing::warn!(actor = %raw.actor_id, "state update names an unknown actor");
                continue;
            };
            actor_updates.push(ActorUpdate {
                actor_id,
                observations: raw.observations,
                available_actions: raw.state_changes.enabled_actions,
                disabled_actions: raw.state_changes.disabled_actions,
                resources: raw.state_changes.resources,
                constraints: raw.state_changes.constraints,
                direct_impacts: raw.direct_impacts,
                indirect_impacts: raw.indirect_impacts,
            });
        }

        let update = WorldUpdate {
            world_state_summary: self.world_state_update.summary,
            key_changes: self.world_state_update.key_changes,
            emergent_developments: self.world_state_update.emergent_developments,
            action_results,
            actor_updates,
            continue_simulation: self.continue_simulation,
            continuation_reasoning: self.continuation_reasoning,
        };
        update.validate()?;
        Ok(update)
    }
}
