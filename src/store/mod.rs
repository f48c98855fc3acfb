//! Persistence for Simulation documents
//!
//! The store only reads and writes whole aggregates. A round's effects are
//! committed by one `save` of the reconciled document.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use crate::core::error::Result;
use crate::core::types::SimulationId;
use crate::entity::simulation::{Simulation, SimulationSummary};
use async_trait::async_trait;

#[async_trait]
pub trait SimulationStore: Send + Sync {
    /// Store a new document; fails if the id is already taken
    async fn insert(&self, sim: &Simulation) -> Result<()>;

    async fn load(&self, id: SimulationId) -> Result<Simulation>;

    /// Overwrite an existing document
    async fn save(&self, sim: &Simulation) -> Result<()>;

    /// Summaries, newest first, at most `limit`
    async fn list(&self, limit: usize) -> Result<Vec<SimulationSummary>>;

    async fn delete(&self, id: SimulationId) -> Result<()>;
}

/// Newest-first ordering shared by the store implementations
pub(crate) fn newest_first(mut summaries: Vec<SimulationSummary>, limit: usize) -> Vec<SimulationSummary> {
    summaries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    summaries.truncate(limit);
    summaries
}
