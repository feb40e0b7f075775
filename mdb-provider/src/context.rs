//! Per-call operation context.

use std::sync::Arc;

use mdb_api::{EntityType, ManagementApi, Scope, TaskType};
use tokio_util::sync::CancellationToken;

use crate::audit::ProviderAuditLogger;
use crate::reconcile::{DEFAULT_FAILURE_BUDGET, Operation, RetryPolicy};

/// Everything a lifecycle operation needs, passed explicitly on every call.
///
/// Cheap to clone; independent operations may share the API client and run
/// concurrently.
#[derive(Clone)]
pub struct OpContext {
    api: Arc<dyn ManagementApi>,
    scope: Scope,
    cancel: CancellationToken,
    audit: Arc<ProviderAuditLogger>,
    policy_override: Option<RetryPolicy>,
    failure_budget: u32,
}

impl OpContext {
    pub fn new(api: Arc<dyn ManagementApi>, scope: Scope) -> Self {
        Self {
            api,
            scope,
            cancel: CancellationToken::new(),
            audit: Arc::new(ProviderAuditLogger::default()),
            policy_override: None,
            failure_budget: DEFAULT_FAILURE_BUDGET,
        }
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_audit(mut self, audit: Arc<ProviderAuditLogger>) -> Self {
        self.audit = audit;
        self
    }

    /// Use this policy for every operation instead of the per-kind defaults.
    pub fn with_policy_override(mut self, policy: RetryPolicy) -> Self {
        self.policy_override = Some(policy);
        self
    }

    pub fn with_failure_budget(mut self, budget: u32) -> Self {
        self.failure_budget = budget;
        self
    }

    pub fn api(&self) -> &dyn ManagementApi {
        self.api.as_ref()
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn cancel(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn audit(&self) -> &ProviderAuditLogger {
        &self.audit
    }

    /// Describe a background operation in this context's scope.
    pub fn operation(&self, entity_type: EntityType, kind: TaskType) -> Operation {
        Operation {
            scope: self.scope.clone(),
            entity_type,
            kind,
            policy: self
                .policy_override
                .clone()
                .unwrap_or_else(|| RetryPolicy::for_task(kind)),
            failure_budget: self.failure_budget,
        }
    }
}
