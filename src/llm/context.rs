//! Render typed provider context into prompt text
//!
//! Each prompt is built from the same typed inputs the engine hands to the
//! provider traits, so nothing outside those types can leak into a prompt.
//! An actor's reasoning appears only in that actor's own decision prompt.

use crate::entity::actor::Actor;
use crate::entity::state::{ActionRecord, ActorRoundState};
use crate::provider::decision::{TextLimits, WorldContext};
use crate::provider::world::WorldRequest;
use std::fmt::Write;

const NONE: &str = "None";

fn list_or_none(items: &[String]) -> String {
    if items.is_empty() {
        NONE.to_string()
    } else {
        items
            .iter()
            .map(|i| format!("- {}", i))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn text_or_none(text: Option<&str>) -> &str {
    match text {
        Some(t) if !t.trim().is_empty() => t,
        _ => NONE,
    }
}

pub fn roster_prompt(question: &str) -> String {
    format!(
        "QUESTION:\n{}\n\nIdentify the actors needed to simulate this question over time, \
         choose a time unit and a duration in that unit, then output the JSON object.",
        question
    )
}

pub fn enrichment_prompt(actor: &Actor, question: &str) -> String {
    format!(
        "SCENARIO: {}\n\nACTOR: {}\nRESEARCH QUERY: {}\nROLE: {}\nGRANULARITY: {}\nSCALE: {}\n\n\
         Build this actor's profile and output the JSON object.",
        question,
        actor.identifier,
        text_or_none(Some(&actor.research_query)),
        actor.role_in_simulation,
        text_or_none(Some(&actor.granularity)),
        text_or_none(Some(&actor.scale_notes)),
    )
}

/// One line per past action, with the actor's own reasoning and the outcome
pub fn format_action_history(actions: &[ActionRecord]) -> String {
    if actions.is_empty() {
        return "No previous actions".to_string();
    }

    let mut out = String::new();
    for record in actions {
        let outcome = match &record.outcome {
            Some(o) => format!(
                "{:?} ({:?}): {}",
                o.outcome, o.outcome_quality, o.explanation
            ),
            None => record.status.to_string(),
        };
        let _ = writeln!(
            out,
            "Round {} [{} round(s)]: {}\n  Reasoning: {}\n  Outcome: {}",
            record.scheduled_round,
            record.duration,
            record.action,
            text_or_none(Some(&record.reasoning)),
            outcome
        );
    }
    out.trim_end().to_string()
}

/// Everything one actor sees when deciding
pub struct DecisionContext<'a> {
    pub actor: &'a Actor,
    pub history: &'a ActorRoundState,
    pub world: &'a WorldContext,
    pub limits: TextLimits,
}

impl<'a> DecisionContext<'a> {
    pub fn render(&self) -> String {
        let actor = self.actor;
        let history = self.history;
        let world = self.world;

        let others: Vec<String> = world
            .others(actor.actor_id)
            .map(|a| format!("{} ({}): {}", a.identifier, a.granularity, a.role))
            .collect();

        let messages: Vec<String> = history
            .messages_received
            .iter()
            .map(|m| format!("From {} (round {}): {}", m.from_actor_identifier, m.sent_round, m.content))
            .collect();

        let resources = if history.resources.is_empty() {
            NONE.to_string()
        } else {
            serde_json::to_string_pretty(&history.resources).unwrap_or_else(|_| NONE.to_string())
        };

        format!(
            "SIMULATION\nQuestion: {question}\nTime unit: {unit}\nCurrent round: {round} / {total}\n\n\
             YOUR IDENTITY\nIdentifier: {identifier}\nRole: {role}\nGranularity: {granularity}\n\n\
             YOUR MEMORY\n{memory}\n\nYOUR CHARACTERISTICS\n{characteristics}\n\n\
             YOUR PREDISPOSITIONS\n{predispositions}\n\nOTHER ACTORS\n{others}\n\n\
             CURRENT WORLD STATE\n{world_state}\n\nYOUR OBSERVATIONS\n{observations}\n\n\
             YOUR ACTION HISTORY\n{action_history}\n\nAVAILABLE ACTIONS\n{available}\n\n\
             DISABLED ACTIONS\n{disabled}\n\nYOUR RESOURCES\n{resources}\n\n\
             CONSTRAINTS\n{constraints}\n\nMESSAGES RECEIVED\n{messages}\n\n\
             DIRECT IMPACTS\n{direct}\n\nINDIRECT IMPACTS\n{indirect}\n\n\
             Decide your actions and messages. Actions must be at most {max_action} characters, \
             messages at most {max_message}. execute_round must be {round} or later.",
            question = world.question,
            unit = world.time_unit,
            round = world.current_round,
            total = world.total_duration,
            identifier = actor.identifier,
            role = actor.role_in_simulation,
            granularity = text_or_none(Some(&actor.granularity)),
            memory = text_or_none(actor.memory.as_deref()),
            characteristics = text_or_none(actor.intrinsic_characteristics.as_deref()),
            predispositions = text_or_none(actor.predispositions.as_deref()),
            others = list_or_none(&others),
            world_state = world
                .prior_summary
                .as_deref()
                .unwrap_or(&history.world_state_summary),
            observations = history.observations,
            action_history = format_action_history(&history.my_actions),
            available = list_or_none(&history.available_actions),
            disabled = list_or_none(&history.disabled_actions),
            resources = resources,
            constraints = list_or_none(&history.constraints),
            messages = list_or_none(&messages),
            direct = text_or_none(history.direct_impacts.as_deref()),
            indirect = text_or_none(history.indirect_impacts.as_deref()),
            max_action = self.limits.max_action_chars,
            max_message = self.limits.max_message_chars,
        )
    }
}

/// World update prompt; due actions carry their seeds but never reasoning
pub fn world_prompt(request: &WorldRequest) -> String {
    let actors: Vec<String> = request
        .roster
        .iter()
        .map(|a| format!("{} ({}): {}", a.identifier, a.granularity, a.role))
        .collect();

    let actions: Vec<String> = request
        .due_actions
        .iter()
        .map(|d| {
            format!(
                "{}: {} (duration {}, random_seed {:.3})",
                d.actor_identifier, d.action, d.duration, d.random_seed
            )
        })
        .collect();

    let underway: Vec<String> = request
        .in_flight
        .iter()
        .map(|a| {
            format!(
                "{}: {} (started round {}, completes round {})",
                a.actor_identifier, a.action, a.started_round, a.completes_round
            )
        })
        .collect();

    format!(
        "SCENARIO: {}\n\nTIME UNIT: {}\nCURRENT TIME: {} / {}\n\nACTORS:\n{}\n\n\
         PREVIOUS ROUND:\n{}\n\nCURRENT ACTIONS:\n{}\n\nONGOING ACTIONS:\n{}\n\n\
         Resolve every current action against its random_seed, update the world, \
         give each affected actor its observations, and output the JSON object.",
        request.question,
        request.time_unit,
        request.round,
        request.total_duration,
        list_or_none(&actors),
        text_or_none(request.prior_summary.as_deref()),
        list_or_none(&actions),
        list_or_none(&underway),
    )
}
