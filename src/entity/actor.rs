//! Actors: static identity plus research-derived enrichment

use crate::core::error::{Result, SimError};
use crate::core::types::ActorId;
use serde::{Deserialize, Serialize};

/// A participant in the simulation
///
/// Identity fields are fixed at roster generation. The three enrichment
/// fields are populated once, after which the actor is immutable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Actor {
    pub actor_id: ActorId,
    /// Display name other actors use to address this one
    pub identifier: String,
    pub role_in_simulation: String,
    /// Who this actor is expected to interact with, and how
    #[serde(default)]
    pub key_interactions: Vec<String>,
    /// Query used to research the actor during enrichment
    #[serde(default)]
    pub research_query: String,
    /// Level of aggregation (individual, organization, population group...)
    #[serde(default)]
    pub granularity: String,
    #[serde(default)]
    pub scale_notes: String,

    #[serde(default)]
    pub memory: Option<String>,
    #[serde(default)]
    pub intrinsic_characteristics: Option<String>,
    #[serde(default)]
    pub predispositions: Option<String>,
    #[serde(default)]
    pub enriched: bool,
}

/// Profile produced by the enrichment collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enrichment {
    pub memory: String,
    pub intrinsic_characteristics: String,
    pub predispositions: String,
}

/// Public view of an actor, safe to show to other actors and the world update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorSummary {
    pub actor_id: ActorId,
    pub identifier: String,
    pub role: String,
    pub granularity: String,
}

impl Actor {
    pub fn new(identifier: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            actor_id: ActorId::new(),
            identifier: identifier.into(),
            role_in_simulation: role.into(),
            key_interactions: Vec::new(),
            research_query: String::new(),
            granularity: String::new(),
            scale_notes: String::new(),
            memory: None,
            intrinsic_characteristics: None,
            predispositions: None,
            enriched: false,
        }
    }

    pub fn with_interactions(mut self, interactions: Vec<String>) -> Self {
        self.key_interactions = interactions;
        self
    }

    pub fn with_granularity(mut self, granularity: impl Into<String>) -> Self {
        self.granularity = granularity.into();
        self
    }

    pub fn with_research_query(mut self, query: impl Into<String>) -> Self {
        self.research_query = query.into();
        self
    }

    /// Populate the enrichment fields; rejected once the actor is enriched
    pub fn apply_enrichment(&mut self, enrichment: Enrichment) -> Result<()> {
        if self.enriched {
            return Err(SimError::Validation(format!(
                "actor {} is already enriched",
                self.identifier
            )));
        }
        self.memory = Some(enrichment.memory);
        self.intrinsic_characteristics = Some(enrichment.intrinsic_characteristics);
        self.predispositions = Some(enrichment.predispositions);
        self.enriched = true;
        Ok(())
    }

    /// True if `reference` names this actor by id or (case-insensitive) identifier
    pub fn answers_to(&self, reference: &str) -> bool {
        let reference = reference.trim();
        self.actor_id.to_string() == reference
            || self.identifier.trim().eq_ignore_ascii_case(reference)
    }

    pub fn summary(&self) -> ActorSummary {
        ActorSummary {
            actor_id: self.actor_id,
            identifier: self.identifier.clone(),
            role: self.role_in_simulation.clone(),
            granularity: self.granularity.clone(),
        }
    }
}
