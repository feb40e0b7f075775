//! Task status reader.

use std::fmt;

use mdb_api::{EntityType, ManagementApi, Scope, TaskQuery, TaskType};
use thiserror::Error;
use tracing::debug;

/// Identifies the background task an operation waits on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationDescriptor {
    pub scope: Scope,
    pub entity_id: String,
    pub entity_type: EntityType,
    pub kind: TaskType,
}

impl OperationDescriptor {
    pub fn query(&self) -> TaskQuery {
        TaskQuery {
            scope: self.scope.clone(),
            entity_id: self.entity_id.clone(),
            entity_type: self.entity_type,
            task_type: self.kind,
        }
    }
}

impl fmt::Display for OperationDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} on {} {}", self.kind, self.entity_type, self.entity_id)
    }
}

/// Observed state of a background task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskStatus {
    InProgress,
    Succeeded,
    /// Terminal failure with the remote side's detail, if it sent one.
    Failed(Option<String>),
    /// Any other non-terminal state (`QUEUED`, ...).
    Pending(String),
}

impl TaskStatus {
    pub fn from_wire(state: &str, detail: Option<String>) -> Self {
        match state {
            "IN_PROGRESS" => TaskStatus::InProgress,
            "SUCCEEDED" => TaskStatus::Succeeded,
            "FAILED" => TaskStatus::Failed(detail),
            other => TaskStatus::Pending(other.to_string()),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Succeeded | TaskStatus::Failed(_))
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskStatus::InProgress => f.write_str("IN_PROGRESS"),
            TaskStatus::Succeeded => f.write_str("SUCCEEDED"),
            TaskStatus::Failed(_) => f.write_str("FAILED"),
            TaskStatus::Pending(s) => f.write_str(s),
        }
    }
}

/// The task status could not be obtained right now.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct TaskReadError {
    pub message: String,
}

impl TaskReadError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Read the latest task matching the descriptor.
///
/// Performs exactly one remote call and never retries. A missing task, a task
/// for other coordinates, or a transport failure are all read errors.
pub async fn read_task_status(
    api: &dyn ManagementApi,
    descriptor: &OperationDescriptor,
) -> Result<TaskStatus, TaskReadError> {
    let tasks = api
        .list_tasks(&descriptor.query(), 1)
        .await
        .map_err(|e| TaskReadError::new(format!("unable to read status of {}: {}", descriptor, e)))?;

    let Some(task) = tasks.into_iter().next() else {
        return Err(TaskReadError::new(format!("no task found for {}", descriptor)));
    };

    if task.entity_id != descriptor.entity_id || task.task_type != descriptor.kind.as_str() {
        return Err(TaskReadError::new(format!(
            "latest task {} is {} on {}, expected {}",
            task.id, task.task_type, task.entity_id, descriptor
        )));
    }

    let status = TaskStatus::from_wire(&task.state, task.detail);
    debug!(task_id = %task.id, status = %status, "Read task status for {}", descriptor);
    Ok(status)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_wire() {
        assert_eq!(TaskStatus::from_wire("IN_PROGRESS", None), TaskStatus::InProgress);
        assert_eq!(TaskStatus::from_wire("SUCCEEDED", None), TaskStatus::Succeeded);
        assert_eq!(
            TaskStatus::from_wire("FAILED", Some("quota".to_string())),
            TaskStatus::Failed(Some("quota".to_string()))
        );
        let queued = TaskStatus::from_wire("QUEUED", None);
        assert_eq!(queued, TaskStatus::Pending("QUEUED".to_string()));
        assert!(!queued.is_terminal());
        assert!(TaskStatus::Failed(None).is_terminal());
    }

    #[test]
    fn test_descriptor_display() {
        let d = OperationDescriptor {
            scope: Scope::new("a", "p"),
            entity_id: "c-1".to_string(),
            entity_type: EntityType::Cluster,
            kind: TaskType::EditCluster,
        };
        assert_eq!(d.to_string(), "EDIT_CLUSTER on CLUSTER c-1");
        assert_eq!(d.query().task_type, TaskType::EditCluster);
    }
}
