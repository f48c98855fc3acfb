//! World Sim - round-based social simulation engine
//!
//! Actors decide, the world resolves, and every round is committed as one
//! document write. Reasoning is delegated to external providers behind the
//! traits in [`provider`]; [`llm`] implements them over an HTTP LLM API.

pub mod core;
pub mod entity;
pub mod llm;
pub mod provider;
pub mod schedule;
pub mod simulation;
pub mod store;
