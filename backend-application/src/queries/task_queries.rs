use serde::Serialize;

use crate::supervisor::{SupervisorStats, TaskEntry};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct TaskOverview {
    pub stats: SupervisorStats,
    pub tasks: Vec<TaskEntry>,
}

pub async fn task_overview(state: &AppState) -> TaskOverview {
    TaskOverview {
        stats: state.supervisor.stats().await,
        tasks: state.supervisor.running_tasks().await,
    }
}
