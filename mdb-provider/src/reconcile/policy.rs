//! Retry policy and failure budget.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use mdb_api::TaskType;

/// Consecutive task-status read failures tolerated before giving up.
///
/// Counts tolerated failures, not attempts: with a budget of 2 the third
/// failure in a row is fatal.
pub const DEFAULT_FAILURE_BUDGET: u32 = 2;

/// Fixed-interval polling bounded by a maximum total wait.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub interval: Duration,
    pub max_elapsed: Duration,
}

impl RetryPolicy {
    pub const fn new(interval: Duration, max_elapsed: Duration) -> Self {
        Self {
            interval,
            max_elapsed,
        }
    }

    /// Default policy for a kind of background operation.
    pub fn for_task(kind: TaskType) -> Self {
        const fn secs(s: u64) -> Duration {
            Duration::from_secs(s)
        }
        const fn mins(m: u64) -> Duration {
            Duration::from_secs(m * 60)
        }

        match kind {
            TaskType::EditAllowList => Self::new(secs(5), mins(10)),

            TaskType::CreateCluster
            | TaskType::EditCluster
            | TaskType::DeleteCluster
            | TaskType::PauseCluster
            | TaskType::ResumeCluster => Self::new(secs(10), mins(60)),

            TaskType::CreateBackup | TaskType::DeleteBackup => Self::new(secs(10), mins(30)),

            // Bulk namespace and replication work
            TaskType::EnableDbPitr
            | TaskType::UpdateDbPitr
            | TaskType::DisableDbPitr
            | TaskType::CreateDr
            | TaskType::EditDr
            | TaskType::DeleteDr
            | TaskType::CreateReadReplica
            | TaskType::EditReadReplica
            | TaskType::DeleteReadReplica => Self::new(secs(10), mins(60)),

            TaskType::CreatePrivateServiceEndpoint
            | TaskType::EditPrivateServiceEndpoint
            | TaskType::DeletePrivateServiceEndpoint
            | TaskType::CreateVpc
            | TaskType::DeleteVpc => Self::new(secs(10), mins(30)),

            TaskType::AssociateMetricsExporter
            | TaskType::RemoveMetricsExporter
            | TaskType::EnableDbAuditLogging
            | TaskType::EditDbAuditLogging
            | TaskType::DisableDbAuditLogging => Self::new(secs(5), mins(30)),
        }
    }
}

/// Counts consecutive status read failures within one reconciliation.
///
/// A budget of `n` tolerates `n` consecutive failures; the next one is fatal.
/// Any successful read resets the count.
#[derive(Debug)]
pub struct FailureBudget {
    limit: u32,
    consecutive: AtomicU32,
}

impl FailureBudget {
    pub fn new(limit: u32) -> Self {
        Self {
            limit,
            consecutive: AtomicU32::new(0),
        }
    }

    /// Record a failed read. Returns true when the budget is exhausted.
    pub fn record_failure(&self) -> bool {
        let failures = self.consecutive.fetch_add(1, Ordering::SeqCst) + 1;
        failures > self.limit
    }

    pub fn record_success(&self) {
        self.consecutive.store(0, Ordering::SeqCst);
    }

    /// Failures still tolerated before the next one escalates.
    pub fn remaining(&self) -> u32 {
        self.limit
            .saturating_sub(self.consecutive.load(Ordering::SeqCst))
    }
}

impl Default for FailureBudget {
    fn default() -> Self {
        Self::new(DEFAULT_FAILURE_BUDGET)
    }
}
