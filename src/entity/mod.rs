//! Entity model: the Simulation aggregate and everything embedded in it

pub mod action;
pub mod actor;
pub mod message;
pub mod record;
pub mod simulation;
pub mod state;

pub use action::{
    ActionStatus, ActiveAction, Outcome, OutcomeKind, OutcomeQuality, ScheduledAction,
};
pub use actor::{Actor, ActorSummary, Enrichment};
pub use message::{DeliveredMessage, PendingMessage};
pub use record::{ActionResult, RoundRecord};
pub use simulation::{Simulation, SimulationSummary};
pub use state::{ActionRecord, ActorRoundState};
