use super::{newest_first, SimulationStore};
use crate::core::error::{Result, SimError};
use crate::core::types::SimulationId;
use crate::entity::simulation::{Simulation, SimulationSummary};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// In-process store, used by tests and short-lived runs
#[derive(Debug, Default)]
pub struct MemoryStore {
    docs: RwLock<HashMap<SimulationId, Simulation>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.docs.read().await.len()
    }
}

#[async_trait]
impl SimulationStore for MemoryStore {
    async fn insert(&self, sim: &Simulation) -> Result<()> {
        let mut docs = self.docs.write().await;
        if docs.contains_key(&sim.simulation_id) {
            return Err(SimError::Store(format!(
                "simulation {} already exists",
                sim.simulation_id
            )));
        }
        docs.insert(sim.simulation_id, sim.clone());
        Ok(())
    }

    async fn load(&self, id: SimulationId) -> Result<Simulation> {
        self.docs
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(SimError::SimulationNotFound(id))
    }

    async fn save(&self, sim: &Simulation) -> Result<()> {
        let mut docs = self.docs.write().await;
        match docs.get_mut(&sim.simulation_id) {
            Some(doc) => {
                *doc = sim.clone();
                Ok(())
            }
            None => Err(SimError::SimulationNotFound(sim.simulation_id)),
        }
    }

    async fn list(&self, limit: usize) -> Result<Vec<SimulationSummary>> {
        let summaries = self.docs.read().await.values().map(Simulation::summary).collect();
        Ok(newest_first(summaries, limit))
    }

    async fn delete(&self, id: SimulationId) -> Result<()> {
        self.docs
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or(SimError::SimulationNotFound(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_insert_load_delete() {
        let store = MemoryStore::new();
        let sim = Simulation::new("Will the merger close?");
        let id = sim.simulation_id;

        store.insert(&sim).await.unwrap();
        assert!(store.insert(&sim).await.is_err());
        assert_eq!(store.load(id).await.unwrap(), sim);

        store.delete(id).await.unwrap();
        assert!(store.load(id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_save_requires_existing() {
        let store = MemoryStore::new();
        let sim = Simulation::new("q");
        assert!(matches!(
            store.save(&sim).await,
            Err(SimError::SimulationNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_limit() {
        let store = MemoryStore::new();
        for i in 0..5 {
            store.insert(&Simulation::new(format!("q{}", i))).await.unwrap();
        }
        assert_eq!(store.list(3).await.unwrap().len(), 3);
        assert_eq!(store.list(10).await.unwrap().len(), 5);
    }
}
