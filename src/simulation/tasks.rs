//! Background round processing with pollable completion

use crate::core::error::{Result, SimError};
use crate::core::types::SimulationId;
use crate::simulation::processor::RoundReport;
use crate::simulation::service::SimulationService;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{watch, RwLock};
use uuid::Uuid;

/// Handle for one submitted round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoundTicket {
    pub id: Uuid,
    pub simulation_id: SimulationId,
}

impl fmt::Display for RoundTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.id, self.simulation_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TaskStatus {
    Queued,
    Running,
    Succeeded { report: RoundReport },
    Failed { message: String },
}

impl TaskStatus {
    pub fn is_finished(&self) -> bool {
        matches!(self, TaskStatus::Succeeded { .. } | TaskStatus::Failed { .. })
    }
}

/// Runs rounds on the tokio runtime, off the caller's path
///
/// Submissions for one simulation queue behind its service lock, so they
/// execute one at a time in submission order.
pub struct RoundTasks {
    service: Arc<SimulationService>,
    tasks: RwLock<HashMap<RoundTicket, watch::Receiver<TaskStatus>>>,
}

impl RoundTasks {
    pub fn new(service: Arc<SimulationService>) -> Self {
        Self {
            service,
            tasks: RwLock::new(HashMap::new()),
        }
    }

    pub async fn submit(&self, simulation_id: SimulationId) -> RoundTicket {
        let ticket = RoundTicket {
            id: Uuid::new_v4(),
            simulation_id,
        };
        let (tx, rx) = watch::channel(TaskStatus::Queued);
        self.tasks.write().await.insert(ticket, rx);

        let service = self.service.clone();
        tokio::spawn(async move {
            tx.send_replace(TaskStatus::Running);
            let status = match service.process_round(simulation_id).await {
                Ok(report) => TaskStatus::Succeeded { report },
                Err(err) => TaskStatus::Failed {
                    message: err.to_string(),
                },
            };
            tracing::debug!(%ticket, finished = ?status, "round task done");
            tx.send_replace(status);
        });

        tracing::info!(%ticket, "round submitted");
        ticket
    }

    pub async fn status(&self, ticket: RoundTicket) -> Result<TaskStatus> {
        self.tasks
            .read()
            .await
            .get(&ticket)
            .map(|rx| rx.borrow().clone())
            .ok_or_else(|| SimError::TaskFailed(format!("unknown task {}", ticket)))
    }

    /// Wait until the round has succeeded or failed
    pub async fn wait(&self, ticket: RoundTicket) -> Result<TaskStatus> {
        let mut rx = self
            .tasks
            .read()
            .await
            .get(&ticket)
            .cloned()
            .ok_or_else(|| SimError::TaskFailed(format!("unknown task {}", ticket)))?;

        let status = rx
            .wait_for(TaskStatus::is_finished)
            .await
            .map_err(|_| SimError::TaskFailed(format!("task {} ended without a result", ticket)))?
            .clone();
        Ok(status)
    }

    /// Drop bookkeeping for finished tasks; returns how many were removed
    pub async fn prune(&self) -> usize {
        let mut tasks = self.tasks.write().await;
        let before = tasks.len();
        tasks.retain(|_, rx| !rx.borrow().is_finished());
        before - tasks.len()
    }
}
