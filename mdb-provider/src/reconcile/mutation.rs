//! Mutation reconciler: submit, poll, confirm.

use std::future::Future;

use mdb_api::{ApiError, EntityType, Scope, TaskType};
use tracing::{info, warn};

use super::classify::classify;
use super::driver::{DriverError, PollError, run_until_terminal};
use super::policy::{FailureBudget, RetryPolicy};
use super::task::{OperationDescriptor, read_task_status};
use crate::context::OpContext;
use crate::error::{ProviderError, Result};

/// A background operation kind together with how long to wait for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    pub scope: Scope,
    pub entity_type: EntityType,
    pub kind: TaskType,
    pub policy: RetryPolicy,
    pub failure_budget: u32,
}

impl Operation {
    pub fn descriptor(&self, entity_id: impl Into<String>) -> OperationDescriptor {
        OperationDescriptor {
            scope: self.scope.clone(),
            entity_id: entity_id.into(),
            entity_type: self.entity_type,
            kind: self.kind,
        }
    }

    fn label(&self) -> String {
        self.kind.as_str().to_ascii_lowercase().replace('_', " ")
    }
}

/// What a mutation hands back once the request was accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submitted<H> {
    /// Entity the background task runs against.
    pub entity_id: String,
    /// Whatever the read step needs to find the result.
    pub handle: H,
}

impl<H> Submitted<H> {
    pub fn new(entity_id: impl Into<String>, handle: H) -> Self {
        Self {
            entity_id: entity_id.into(),
            handle,
        }
    }
}

impl Submitted<String> {
    /// The task entity and the read target are the same id.
    pub fn entity(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            entity_id: id.clone(),
            handle: id,
        }
    }
}

/// Submit a mutation, wait for its task to finish, then read the result.
///
/// `mutation` returns the entity the task runs against (for a create this is
/// only known from the response) plus a handle for the read step. `read`
/// receives the handle and is invoked at most once, only after the task
/// succeeded.
///
/// Outcomes:
/// - mutation error: [`ProviderError::Rejected`], no status reads
/// - task `FAILED`: [`ProviderError::OperationFailed`]
/// - status reads exhausted the failure budget: [`ProviderError::StatusUnavailable`]
/// - still running at the deadline: [`ProviderError::TimedOut`]
/// - caller cancelled: [`ProviderError::Cancelled`]; the submit, every status
///   read and the final read are all abandoned on cancellation
/// - read failed after success: [`ProviderError::PostSuccessRead`]
pub async fn reconcile<M, MFut, H, R, RFut, T>(
    cx: &OpContext,
    op: Operation,
    mutation: M,
    read: R,
) -> Result<T>
where
    M: FnOnce() -> MFut,
    MFut: Future<Output = std::result::Result<Submitted<H>, ApiError>>,
    R: FnOnce(H) -> RFut,
    RFut: Future<Output = Result<T>>,
{
    let label = op.label();

    let submitted = tokio::select! {
        biased;
        _ = cx.cancel().cancelled() => {
            let err = ProviderError::Cancelled {
                kind: op.kind,
                entity_id: "unknown".to_string(),
                last: "cancelled while the request was in flight".to_string(),
            };
            warn!(error = %err, "Mutation abandoned");
            cx.audit().failed(&label, "unknown", err.category(), &err.to_string());
            return Err(err);
        }
        submitted = mutation() => submitted,
    };

    let Submitted { entity_id, handle } = match submitted {
        Ok(submitted) => submitted,
        Err(e) => {
            warn!(kind = %op.kind, error = %e, "Mutation rejected");
            cx.audit().rejected(&label, e.detail());
            return Err(ProviderError::rejected(label, e));
        }
    };

    let descriptor = op.descriptor(entity_id);
    info!(kind = %op.kind, entity_id = %descriptor.entity_id, "Submitted, polling task status");
    cx.audit().submitted(&label, &descriptor.entity_id);

    let budget = FailureBudget::new(op.failure_budget);
    let outcome = {
        let api = cx.api();
        let descriptor = &descriptor;
        let budget = &budget;
        run_until_terminal(&op.policy, cx.cancel(), move || async move {
            classify(read_task_status(api, descriptor).await, budget)
        })
        .await
    };

    let OperationDescriptor {
        entity_id, kind, ..
    } = descriptor;

    let err = match outcome {
        Ok(attempts) => {
            info!(kind = %kind, entity_id = %entity_id, attempts, "Task succeeded, reading final state");
            let confirmed = tokio::select! {
                biased;
                _ = cx.cancel().cancelled() => None,
                r = read(handle) => Some(r),
            };
            return match confirmed {
                Some(Ok(state)) => {
                    cx.audit().succeeded(&label, &entity_id, attempts);
                    Ok(state)
                }
                None => {
                    let err = ProviderError::Cancelled {
                        kind,
                        entity_id,
                        last: "task SUCCEEDED, cancelled during the final read".to_string(),
                    };
                    warn!(error = %err, "Final read abandoned");
                    Err(err)
                }
                Some(Err(e)) => {
                    let err = ProviderError::PostSuccessRead {
                        kind,
                        entity_id,
                        detail: e.to_string(),
                    };
                    warn!(error = %err, "Final read failed");
                    Err(err)
                }
            };
        }
        Err(DriverError::Fatal(PollError::OperationFailed(message))) => {
            ProviderError::OperationFailed {
                kind,
                entity_id,
                message,
            }
        }
        Err(DriverError::Fatal(PollError::StatusUnavailable(message))) => {
            ProviderError::StatusUnavailable {
                kind,
                entity_id,
                message,
            }
        }
        Err(DriverError::DeadlineExceeded { elapsed, last, .. }) => ProviderError::TimedOut {
            kind,
            entity_id,
            elapsed,
            last: last.unwrap_or_else(|| "no status observed".to_string()),
        },
        Err(DriverError::Cancelled { last, .. }) => ProviderError::Cancelled {
            kind,
            entity_id,
            last: last.unwrap_or_else(|| "no status observed".to_string()),
        },
    };

    warn!(error = %err, "Operation did not complete");
    if let ProviderError::OperationFailed { entity_id, .. }
    | ProviderError::StatusUnavailable { entity_id, .. }
    | ProviderError::TimedOut { entity_id, .. }
    | ProviderError::Cancelled { entity_id, .. } = &err
    {
        cx.audit()
            .failed(&label, entity_id, err.category(), &err.to_string());
    }
    Err(err)
}
