//! One background task per run, with cancellation.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{error, info, instrument, warn};

use crate::orchestrator::{Orchestrator, OrchestratorError};
use crate::records::{RunId, RunView};

type TaskTable = Arc<Mutex<HashMap<RunId, JoinHandle<()>>>>;

/// Owns the background step loops.
#[derive(Debug, Clone)]
pub struct RunSupervisor {
    orchestrator: Arc<Orchestrator>,
    step_delay: Duration,
    tasks: TaskTable,
}

impl RunSupervisor {
    /// Creates a supervisor pausing `step_delay` between steps of each run.
    #[instrument(skip(orchestrator))]
    pub fn new(orchestrator: Arc<Orchestrator>, step_delay: Duration) -> Self {
        Self {
            orchestrator,
            step_delay,
            tasks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// The orchestrator the tasks drive.
    pub fn orchestrator(&self) -> &Arc<Orchestrator> {
        &self.orchestrator
    }

    /// Starts running `run_id` to completion in the background.
    ///
    /// Returns `false` if a task for the run is already active.
    #[instrument(skip(self))]
    pub fn launch(&self, run_id: RunId) -> bool {
        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        if tasks.get(&run_id).is_some_and(|task| !task.is_finished()) {
            warn!("Run task already active");
            return false;
        }

        let orchestrator = Arc::clone(&self.orchestrator);
        let table = Arc::clone(&self.tasks);
        let delay = self.step_delay;
        let handle = tokio::spawn(async move {
            match orchestrator.run_to_completion(run_id, delay).await {
                Ok(Some(view)) => {
                    info!(%run_id, status = %view.run.status(), "Background run finished")
                }
                Ok(None) => warn!(%run_id, "Background run not found"),
                Err(e) => error!(%run_id, error = %e, "Background run stopped"),
            }
            table
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(&run_id);
        });

        tasks.insert(run_id, handle);
        info!(active = tasks.len(), "Run task launched");
        true
    }

    /// Returns `true` while a task for the run is running.
    pub fn is_active(&self, run_id: RunId) -> bool {
        self.tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&run_id)
            .is_some_and(|task| !task.is_finished())
    }

    /// Runs with an active task.
    pub fn active_runs(&self) -> Vec<RunId> {
        self.tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(_, task)| !task.is_finished())
            .map(|(run_id, _)| *run_id)
            .collect()
    }

    /// Stops the run's task, if any, and marks the run aborted.
    ///
    /// Returns `None` for an unknown run; finished runs are returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError`] if the store fails.
    #[instrument(skip(self))]
    pub async fn cancel(&self, run_id: RunId) -> Result<Option<RunView>, OrchestratorError> {
        let task = self
            .tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&run_id);

        if let Some(task) = task {
            task.abort();
            if let Err(e) = task.await {
                if !e.is_cancelled() {
                    error!(error = %e, "Run task panicked");
                }
            }
            info!("Run task cancelled");
        }

        self.orchestrator.abort_run(run_id).await
    }
}
