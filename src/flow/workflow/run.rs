// SPDX-License-Identifier: MIT

//! Run records: status, audit log, state snapshot

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::engine::StateMap;
use crate::flow::workflow::state::WorkflowState;

/// Severity of an execution log entry. Advisory only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warning,
    Error,
}

/// Lifecycle of a run: `running` until it becomes `completed` or `failed`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

/// Single log entry during execution
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ExecutionLog {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
}

/// One execution of a graph
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct WorkflowRun {
    pub run_id: String,
    pub graph_id: String,
    pub state: WorkflowState,
    pub status: RunStatus,
    pub logs: Vec<ExecutionLog>,
    /// Node executions performed so far
    pub steps: usize,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

impl WorkflowRun {
    /// A fresh `running` record
    pub fn start(run_id: String, graph_id: String, state: StateMap) -> Self {
        Self {
            run_id,
            graph_id,
            state: WorkflowState::new(state),
            status: RunStatus::Running,
            logs: Vec::new(),
            steps: 0,
            started_at: Utc::now(),
            completed_at: None,
            error: None,
        }
    }

    /// Append an audit entry and mirror it to the process log
    pub fn log(&mut self, level: LogLevel, message: impl Into<String>) {
        let message = message.into();
        match level {
            LogLevel::Info => log::info!("[{}] {}", self.run_id, message),
            LogLevel::Warning => log::warn!("[{}] {}", self.run_id, message),
            LogLevel::Error => log::error!("[{}] {}", self.run_id, message),
        }
        self.logs.push(ExecutionLog {
            timestamp: Utc::now(),
            level,
            message,
        });
    }

    pub fn complete(&mut self) {
        self.status = RunStatus::Completed;
        self.completed_at = Some(Utc::now());
        let steps = self.steps;
        self.log(
            LogLevel::Info,
            format!("Workflow completed in {} steps", steps),
        );
    }

    pub fn fail(&mut self, error: impl fmt::Display) {
        let message = error.to_string();
        self.status = RunStatus::Failed;
        self.completed_at = Some(Utc::now());
        self.log(LogLevel::Error, format!("Workflow failed: {}", message));
        self.error = Some(message);
    }

    pub fn is_terminal(&self) -> bool {
        self.status != RunStatus::Running
    }

    /// Wall-clock duration, once the run has finished
    pub fn execution_time_seconds(&self) -> Option<f64> {
        self.completed_at
            .map(|end| (end - self.started_at).num_microseconds().unwrap_or(0) as f64 / 1e6)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Running => write!(f, "running"),
            RunStatus::Completed => write!(f, "completed"),
            RunStatus::Failed => write!(f, "failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn new_run() -> WorkflowRun {
        WorkflowRun::start("r-1".into(), "g-1".into(), StateMap::new())
    }

    #[test]
    fn test_start_is_running() {
        let run = new_run();
        assert_eq!(run.status, RunStatus::Running);
        assert!(!run.is_terminal());
        assert!(run.execution_time_seconds().is_none());
    }

    #[test]
    fn test_complete() {
        let mut run = new_run();
        run.steps = 3;
        run.complete();

        assert_eq!(run.status, RunStatus::Completed);
        assert!(run.is_terminal());
        assert!(run.execution_time_seconds().unwrap() >= 0.0);
        let last = run.logs.last().unwrap();
        assert_eq!(last.level, LogLevel::Info);
        assert_eq!(last.message, "Workflow completed in 3 steps");
    }

    #[test]
    fn test_fail_records_error() {
        let mut run = new_run();
        run.fail("Node 'x' not found");

        assert_eq!(run.status, RunStatus::Failed);
        assert_eq!(run.error.as_deref(), Some("Node 'x' not found"));
        let last = run.logs.last().unwrap();
        assert_eq!(last.level, LogLevel::Error);
        assert!(last.message.contains("Node 'x' not found"));
    }

    #[test]
    fn test_serialized_shape() {
        let run = new_run();
        let value = serde_json::to_value(&run).unwrap();
        assert_eq!(value["status"], json!("running"));
        assert_eq!(value["state"], json!({}));
        assert_eq!(value["completed_at"], json!(null));
    }
}
