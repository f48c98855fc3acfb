use super::{newest_first, SimulationStore};
use crate::core::error::{Result, SimError};
use crate::core::types::SimulationId;
use crate::entity::simulation::{Simulation, SimulationSummary};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;

/// One pretty-printed JSON document per simulation under `root`
///
/// Writes go to a temp file that is renamed over the target, so a reader
/// never sees a half-written document.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Open a store, creating the directory if needed
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).await?;
        tracing::debug!(root = %root.display(), "opened file store");
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, id: SimulationId) -> PathBuf {
        self.root.join(format!("{}.json", id))
    }

    async fn write(&self, sim: &Simulation) -> Result<()> {
        let target = self.path_for(sim.simulation_id);
        let tmp = self.root.join(format!(".{}.tmp", sim.simulation_id));
        let json = serde_json::to_vec_pretty(sim)?;
        fs::write(&tmp, json).await?;
        fs::rename(&tmp, &target).await?;
        Ok(())
    }

    async fn exists(&self, id: SimulationId) -> Result<bool> {
        Ok(fs::try_exists(self.path_for(id)).await?)
    }
}

#[async_trait]
impl SimulationStore for FileStore {
    async fn insert(&self, sim: &Simulation) -> Result<()> {
        if self.exists(sim.simulation_id).await? {
            return Err(SimError::Store(format!(
                "simulation {} already exists",
                sim.simulation_id
            )));
        }
        self.write(sim).await
    }

    async fn load(&self, id: SimulationId) -> Result<Simulation> {
        let bytes = match fs::read(self.path_for(id)).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(SimError::SimulationNotFound(id))
            }
            Err(e) => return Err(e.into()),
        };
        serde_json::from_slice(&bytes)
            .map_err(|e| SimError::Store(format!("corrupt document {}: {}", id, e)))
    }

    async fn save(&self, sim: &Simulation) -> Result<()> {
        if !self.exists(sim.simulation_id).await? {
            return Err(SimError::SimulationNotFound(sim.simulation_id));
        }
        self.write(sim).await
    }

    async fn list(&self, limit: usize) -> Result<Vec<SimulationSummary>> {
        let mut summaries = Vec::new();
        let mut entries = fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let bytes = fs::read(&path).await?;
            match serde_json::from_slice::<Simulation>(&bytes) {
                Ok(sim) => summaries.push(sim.summary()),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping unreadable document")
                }
            }
        }
        Ok(newest_first(summaries, limit))
    }

    async fn delete(&self, id: SimulationId) -> Result<()> {
        match fs::remove_file(self.path_for(id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(SimError::SimulationNotFound(id)),
            Err(e) => Err(e.into()),
        }
    }
}
