use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::Metrics;
use backend_domain::current_millis;

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("task capacity exceeded")]
    CapacityExceeded,
}

#[derive(Debug, Error)]
pub enum TaskError {
    #[error("task exceeded its max duration and was killed")]
    TimedOut,
    #[error("task failed: {0}")]
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct SupervisorLimits {
    pub max_concurrent: usize,
    pub max_per_user: Option<usize>,
    pub max_duration: Duration,
    pub warning_time: Duration,
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskEntry {
    pub task_id: Uuid,
    pub label: String,
    pub user_tag: Option<String>,
    pub started_at: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SupervisorStats {
    pub running: usize,
    pub max_concurrent: usize,
}

/// Bounded, monitored executor. Rejects immediately at capacity instead of
/// queuing; every running task is registered in a shared table so
/// introspection never has to ask the task itself.
pub struct TaskSupervisor {
    limits: SupervisorLimits,
    running: Arc<RwLock<HashMap<Uuid, TaskEntry>>>,
    metrics: Arc<Metrics>,
}

pub struct TaskHandle<T> {
    pub task_id: Uuid,
    monitor: JoinHandle<Result<T, TaskError>>,
}

impl<T> TaskHandle<T> {
    pub async fn outcome(self) -> Result<T, TaskError> {
        match self.monitor.await {
            Ok(result) => result,
            Err(err) => Err(TaskError::Failed(err.to_string())),
        }
    }
}

impl TaskSupervisor {
    pub fn new(limits: SupervisorLimits, metrics: Arc<Metrics>) -> Self {
        Self {
            limits,
            running: Arc::new(RwLock::new(HashMap::new())),
            metrics,
        }
    }

    /// Starts a monitored task. Fails fast with `CapacityExceeded` when the
    /// global ceiling, or the per-tag ceiling, is already full.
    pub async fn start_task<F, T>(
        &self,
        label: &str,
        user_tag: Option<&str>,
        future: F,
    ) -> Result<TaskHandle<T>, SupervisorError>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let entry = {
            let mut running = self.running.write().await;
            if running.len() >= self.limits.max_concurrent {
                self.metrics.record_capacity_rejection();
                return Err(SupervisorError::CapacityExceeded);
            }
            if let (Some(cap), Some(tag)) = (self.limits.max_per_user, user_tag) {
                let owned = running
                    .values()
                    .filter(|entry| entry.user_tag.as_deref() == Some(tag))
                    .count();
                if owned >= cap {
                    self.metrics.record_capacity_rejection();
                    return Err(SupervisorError::CapacityExceeded);
                }
            }
            let entry = TaskEntry {
                task_id: Uuid::new_v4(),
                label: label.to_string(),
                user_tag: user_tag.map(str::to_string),
                started_at: current_millis(),
            };
            running.insert(entry.task_id, entry.clone());
            entry
        };

        let task_id = entry.task_id;
        let inner = tokio::spawn(future);
        let monitor = tokio::spawn(Self::monitor(
            Arc::clone(&self.running),
            Arc::clone(&self.metrics),
            self.limits.clone(),
            entry,
            inner,
        ));
        Ok(TaskHandle { task_id, monitor })
    }

    /// Races task completion against the warning and hard-kill timers.
    async fn monitor<T>(
        running: Arc<RwLock<HashMap<Uuid, TaskEntry>>>,
        metrics: Arc<Metrics>,
        limits: SupervisorLimits,
        entry: TaskEntry,
        mut inner: JoinHandle<T>,
    ) -> Result<T, TaskError> {
        let time_after_warning = limits
            .max_duration
            .checked_sub(limits.warning_time)
            .unwrap_or(Duration::ZERO);

        let joined = tokio::select! {
            joined = &mut inner => Some(joined),
            _ = tokio::time::sleep(limits.warning_time) => None,
        };

        let joined = match joined {
            Some(joined) => joined,
            None => {
                warn!(
                    "task {} ({}) still running after {:?}",
                    entry.task_id, entry.label, limits.warning_time
                );
                tokio::select! {
                    joined = &mut inner => joined,
                    _ = tokio::time::sleep(time_after_warning) => {
                        inner.abort();
                        Self::deregister(&running, &entry.task_id).await;
                        metrics.record_task_timeout();
                        warn!(
                            "task {} ({}) killed after {:?}",
                            entry.task_id, entry.label, limits.max_duration
                        );
                        return Err(TaskError::TimedOut);
                    }
                }
            }
        };

        Self::deregister(&running, &entry.task_id).await;
        let duration_ms = current_millis() - entry.started_at;
        match joined {
            Ok(value) => {
                metrics.record_task_completed();
                debug!(
                    "task {} ({}) completed in {}ms",
                    entry.task_id, entry.label, duration_ms
                );
                Ok(value)
            }
            Err(err) => {
                metrics.record_task_failed();
                info!(
                    "task {} ({}) failed after {}ms: {}",
                    entry.task_id, entry.label, duration_ms, err
                );
                Err(TaskError::Failed(err.to_string()))
            }
        }
    }

    async fn deregister(running: &RwLock<HashMap<Uuid, TaskEntry>>, task_id: &Uuid) {
        running.write().await.remove(task_id);
    }

    pub async fn running_tasks(&self) -> Vec<TaskEntry> {
        let mut entries: Vec<TaskEntry> = self.running.read().await.values().cloned().collect();
        entries.sort_by_key(|entry| entry.started_at);
        entries
    }

    pub async fn stats(&self) -> SupervisorStats {
        SupervisorStats {
            running: self.running.read().await.len(),
            max_concurrent: self.limits.max_concurrent,
        }
    }
}
