//! Simulation lifecycle, round processing and the service façade

pub mod enrichment;
pub mod lifecycle;
pub mod processor;
pub mod service;
pub mod tasks;

pub use enrichment::{EnrichmentPass, EnrichmentReport};
pub use lifecycle::SimulationStatus;
pub use processor::{RoundPhase, RoundProcessor, RoundReport};
pub use service::{Providers, SimulationService};
pub use tasks::{RoundTasks, RoundTicket, TaskStatus};
