//! Boundary to the external reasoning services
//!
//! The engine only consumes these traits. Implementations turn context into
//! typed, validated results; unvalidated provider output never reaches the
//! entity model.

pub mod decision;
pub mod retry;
pub mod roster;
pub mod world;

pub use decision::{
    ActionProposal, ActorDecisionProvider, Decision, MessageProposal, TextLimits, WorldContext,
};
pub use retry::RetryPolicy;
pub use roster::{ActorEnricher, Roster, RosterGenerator};
pub use world::{
    ActorUpdate, DueAction, OngoingAction, WorldRequest, WorldUpdate, WorldUpdateProvider,
};
