//! Simulation lifecycle state machine
//!
//! ```text
//! generating_actors -> created -> enriching -> enriched -> running -> completed
//!        |                ^           |                     |  ^
//!        v                +-----------+ (partial)           +--+ (each round)
//!      failed  <----------------------+ (unrecoverable)
//! ```

use crate::core::error::{Result, SimError};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimulationStatus {
    Created,
    GeneratingActors,
    Enriching,
    Enriched,
    Running,
    Completed,
    Failed,
}

impl SimulationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SimulationStatus::Created => "created",
            SimulationStatus::GeneratingActors => "generating_actors",
            SimulationStatus::Enriching => "enriching",
            SimulationStatus::Enriched => "enriched",
            SimulationStatus::Running => "running",
            SimulationStatus::Completed => "completed",
            SimulationStatus::Failed => "failed",
        }
    }

    pub fn can_transition_to(self, next: SimulationStatus) -> bool {
        use SimulationStatus::*;
        matches!(
            (self, next),
            (GeneratingActors, Created)
                | (GeneratingActors, Failed)
                | (Created, Enriching)
                | (Enriching, Enriched)
                | (Enriching, Created)
                | (Enriching, Failed)
                | (Enriched, Running)
                | (Running, Running)
                | (Running, Completed)
        )
    }

    /// Move to `next`, leaving `self` untouched on an illegal transition
    pub fn transition(&mut self, next: SimulationStatus) -> Result<()> {
        if !self.can_transition_to(next) {
            return Err(SimError::InvalidTransition {
                from: *self,
                to: next,
            });
        }
        *self = next;
        Ok(())
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, SimulationStatus::Completed | SimulationStatus::Failed)
    }

    pub fn ensure_can_process_round(self) -> Result<()> {
        match self {
            SimulationStatus::Enriched | SimulationStatus::Running => Ok(()),
            status => Err(SimError::InvalidState {
                status,
                operation: "process a round",
            }),
        }
    }

    pub fn ensure_can_schedule(self) -> Result<()> {
        if self.is_terminal() {
            return Err(SimError::InvalidState {
                status: self,
                operation: "schedule an action",
            });
        }
        Ok(())
    }

    /// Enrichment starts only from `created`; in particular never while `enriching`
    pub fn ensure_can_enrich(self) -> Result<()> {
        match self {
            SimulationStatus::Created => Ok(()),
            status => Err(SimError::InvalidState {
                status,
                operation: "start enrichment",
            }),
        }
    }
}

impl fmt::Display for SimulationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}
