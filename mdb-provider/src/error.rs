//! Provider error types.

use std::time::Duration;

use mdb_api::{ApiError, TaskType};
use thiserror::Error;

/// Terminal failures of a lifecycle operation.
///
/// Every variant renders as a short category plus a diagnostic, see
/// [`ProviderError::report`].
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The mutation was refused before any background work started.
    #[error("{operation} rejected: {detail}")]
    Rejected {
        operation: String,
        detail: String,
        #[source]
        source: Option<ApiError>,
    },

    /// The remote side marked the task as failed.
    #[error("{kind} failed for {entity_id}: {message}")]
    OperationFailed {
        kind: TaskType,
        entity_id: String,
        message: String,
    },

    /// Task status could not be read within the failure budget.
    #[error("{kind} status unavailable for {entity_id}: {message}")]
    StatusUnavailable {
        kind: TaskType,
        entity_id: String,
        message: String,
    },

    /// The task was still running when the maximum wait elapsed.
    #[error("{kind} timed out for {entity_id} after {elapsed:?}: {last}")]
    TimedOut {
        kind: TaskType,
        entity_id: String,
        elapsed: Duration,
        last: String,
    },

    /// The task succeeded but the confirming read did not.
    #[error("{kind} succeeded for {entity_id} but the final state could not be read: {detail}")]
    PostSuccessRead {
        kind: TaskType,
        entity_id: String,
        detail: String,
    },

    /// Polling was interrupted by the caller.
    #[error("{kind} cancelled for {entity_id}: {last}")]
    Cancelled {
        kind: TaskType,
        entity_id: String,
        last: String,
    },

    /// Remote state contradicts what the finished task reported.
    #[error("inconsistent remote state: {0}")]
    Inconsistent(String),

    /// A plain refresh failed.
    #[error("read failed: {0}")]
    Read(#[from] ApiError),
}

/// Operator-facing rendering of an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorReport {
    pub summary: String,
    pub detail: String,
}

impl ProviderError {
    /// Build a rejection caused by local validation.
    pub fn invalid(operation: impl Into<String>, detail: impl Into<String>) -> Self {
        ProviderError::Rejected {
            operation: operation.into(),
            detail: detail.into(),
            source: None,
        }
    }

    /// Build a rejection caused by the remote side refusing the request.
    pub fn rejected(operation: impl Into<String>, source: ApiError) -> Self {
        ProviderError::Rejected {
            operation: operation.into(),
            detail: source.to_string(),
            source: Some(source),
        }
    }

    /// Short category name.
    pub fn category(&self) -> &'static str {
        match self {
            ProviderError::Rejected { .. } => "rejected",
            ProviderError::OperationFailed { .. } => "operation failed",
            ProviderError::StatusUnavailable { .. } => "status unavailable",
            ProviderError::TimedOut { .. } => "timed out",
            ProviderError::PostSuccessRead { .. } => "confirmation read failed",
            ProviderError::Cancelled { .. } => "cancelled",
            ProviderError::Inconsistent(_) => "inconsistent state",
            ProviderError::Read(_) => "read failed",
        }
    }

    /// Whether the remote side may still finish the operation on its own.
    pub fn remote_outcome_unknown(&self) -> bool {
        matches!(
            self,
            ProviderError::TimedOut { .. }
                | ProviderError::StatusUnavailable { .. }
                | ProviderError::Cancelled { .. }
        )
    }

    /// Summary/detail pair for presentation.
    pub fn report(&self) -> ErrorReport {
        let summary = match self {
            ProviderError::Rejected { operation, .. } => format!("Unable to {}", operation),
            ProviderError::OperationFailed { kind, .. } => format!("{} failed", kind),
            ProviderError::StatusUnavailable { kind, .. } => {
                format!("Unable to track {}", kind)
            }
            ProviderError::TimedOut { kind, .. } => format!("{} timed out", kind),
            ProviderError::PostSuccessRead { kind, .. } => {
                format!("{} succeeded, final state unknown", kind)
            }
            ProviderError::Cancelled { kind, .. } => format!("{} cancelled", kind),
            ProviderError::Inconsistent(_) => "Inconsistent remote state".to_string(),
            ProviderError::Read(_) => "Unable to read resource".to_string(),
        };
        ErrorReport {
            summary,
            detail: self.to_string(),
        }
    }
}

/// Result type for provider operations.
pub type Result<T> = std::result::Result<T, ProviderError>;
