//! Roster generation and enrichment collaborators

use crate::core::error::{Result, SimError};
use crate::entity::actor::{Actor, Enrichment};
use async_trait::async_trait;

/// Initial cast and time frame for a question
#[derive(Debug, Clone, PartialEq)]
pub struct Roster {
    pub time_unit: String,
    pub simulation_duration: u32,
    pub actors: Vec<Actor>,
}

impl Roster {
    pub fn validate(&self) -> Result<()> {
        if self.time_unit.trim().is_empty() {
            return Err(SimError::Malformed("roster time unit is empty".into()));
        }
        if self.simulation_duration == 0 {
            return Err(SimError::Malformed("simulation duration must be positive".into()));
        }
        if self.actors.is_empty() {
            return Err(SimError::Malformed("roster contains no actors".into()));
        }
        if let Some(actor) = self.actors.iter().find(|a| a.identifier.trim().is_empty()) {
            return Err(SimError::Malformed(format!(
                "actor {} has no identifier",
                actor.actor_id
            )));
        }
        Ok(())
    }
}

/// Produces the actors for a scenario question; consumed once, before round 0
#[async_trait]
pub trait RosterGenerator: Send + Sync {
    async fn generate(&self, question: &str) -> Result<Roster>;
}

/// Researches one actor's memory, characteristics and predispositions
#[async_trait]
pub trait ActorEnricher: Send + Sync {
    async fn enrich(&self, actor: &Actor, question: &str) -> Result<Enrichment>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roster_validation() {
        let good = Roster {
            time_unit: "month".into(),
            simulation_duration: 6,
            actors: vec![Actor::new("Regulator", "Oversight")],
        };
        assert!(good.validate().is_ok());

        let no_actors = Roster {
            actors: Vec::new(),
            ..good.clone()
        };
        assert!(no_actors.validate().is_err());

        let nameless = Roster {
            actors: vec![Actor::new("", "Oversight")],
            ..good
        };
        assert!(nameless.validate().is_err());
    }
}
