//! LLM-backed implementations of the provider traits

pub mod client;
pub mod context;
pub mod parser;
pub mod providers;

pub use client::LlmClient;
pub use providers::{
    llm_providers, LlmDecisionProvider, LlmEnricher, LlmRosterGenerator, LlmWorldProvider,
};
