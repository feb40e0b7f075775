//! Failure classification for task status reads.

use super::driver::{PollError, Probe};
use super::policy::FailureBudget;
use super::task::{TaskReadError, TaskStatus};

/// Turn one status read into a driver decision.
///
/// Priority:
/// 1. read failed: retry while the budget lasts, then fatal
/// 2. `FAILED`: fatal, never retried
/// 3. `SUCCEEDED`: done
/// 4. anything else: retry
pub fn classify(read: Result<TaskStatus, TaskReadError>, budget: &FailureBudget) -> Probe {
    let status = match read {
        Ok(status) => {
            budget.record_success();
            status
        }
        Err(e) => {
            return if budget.record_failure() {
                Probe::Fatal(PollError::StatusUnavailable(e.message))
            } else {
                Probe::Retry(format!(
                    "task status unavailable ({} more tolerated): {}",
                    budget.remaining(),
                    e.message
                ))
            };
        }
    };

    match status {
        TaskStatus::Failed(detail) => Probe::Fatal(PollError::OperationFailed(
            detail.unwrap_or_else(|| "the operation failed".to_string()),
        )),
        TaskStatus::Succeeded => Probe::Done,
        TaskStatus::InProgress => Probe::Retry("task state IN_PROGRESS".to_string()),
        TaskStatus::Pending(state) => Probe::Retry(format!("task state {}", state)),
    }
}
