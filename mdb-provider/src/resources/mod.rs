//! Lifecycle operations for each resource type.
//!
//! Every resource exposes the same four entry points the host runtime calls:
//! create, read, update and delete. Mutations go through
//! [`crate::reconcile::reconcile`]; reads are the per-resource read adapters
//! and return `Ok(None)` when the entity no longer exists.

pub mod allow_list;
pub mod audit_log;
pub mod backup;
pub mod cluster;
pub mod dr;
pub mod metrics_exporter;
pub mod pitr;
pub mod private_endpoint;
pub mod read_replica;
pub mod vpc;

use std::future::Future;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::info;

use crate::context::OpContext;
use crate::error::{ProviderError, Result};
use crate::reconcile::{Operation, Submitted, reconcile};

pub use allow_list::AllowListResource;
pub use audit_log::AuditLogResource;
pub use backup::BackupResource;
pub use cluster::ClusterResource;
pub use dr::DrResource;
pub use metrics_exporter::MetricsExporterResource;
pub use pitr::PitrResource;
pub use private_endpoint::PrivateEndpointResource;
pub use read_replica::ReadReplicaResource;
pub use vpc::VpcResource;

/// Trait for resource lifecycle handlers.
#[async_trait]
pub trait Resource: Send + Sync {
    /// Desired configuration supplied by the caller.
    type Spec: DeserializeOwned + Send + Sync;
    /// Reconciled state returned to the caller.
    type State: Serialize + Send + Sync;

    /// Name used in logs and on the command line.
    const NAME: &'static str;

    /// Create the resource and wait until it is ready.
    async fn create(&self, cx: &OpContext, spec: &Self::Spec) -> Result<Self::State>;

    /// Refresh state. `None` means the resource is gone.
    async fn read(&self, cx: &OpContext, id: &str) -> Result<Option<Self::State>>;

    /// Converge the resource to `spec`.
    async fn update(&self, cx: &OpContext, id: &str, spec: &Self::Spec) -> Result<Self::State>;

    /// Delete the resource and wait until it is gone. Deleting a resource
    /// that no longer exists succeeds.
    async fn delete(&self, cx: &OpContext, id: &str) -> Result<()>;
}

/// Map a not-found API error to `None`.
pub(crate) fn found<T>(result: mdb_api::Result<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Unwrap a read that must find the entity after a successful task.
pub(crate) fn required<T>(state: Option<T>, what: &str, id: &str) -> Result<T> {
    state.ok_or_else(|| ProviderError::Inconsistent(format!("{} {} not found", what, id)))
}

/// Keep the caller's ordering when the remote side returns the same set.
pub(crate) fn preserve_order<T: Ord + Clone>(desired: &[T], remote: Vec<T>) -> Vec<T> {
    if same_set(desired, &remote) {
        desired.to_vec()
    } else {
        remote
    }
}

/// Order-insensitive equality.
pub(crate) fn same_set<T: Ord + Clone>(a: &[T], b: &[T]) -> bool {
    let mut a = a.to_vec();
    let mut b = b.to_vec();
    a.sort();
    b.sort();
    a == b
}

/// Split a `{parent}/{child}` composite id.
pub(crate) fn split_id<'a>(id: &'a str, what: &str) -> Result<(&'a str, &'a str)> {
    match id.split_once('/') {
        Some((parent, child)) if !parent.is_empty() && !child.is_empty() => Ok((parent, child)),
        _ => Err(ProviderError::invalid(
            format!("address {}", what),
            format!("expected id of the form <cluster_id>/<{}_id>, got {:?}", what, id),
        )),
    }
}

/// Submit a delete and wait until `read` no longer finds the entity.
///
/// An entity that is already gone, either before the request or because the
/// delete itself answers not found, counts as deleted.
pub(crate) async fn delete_and_confirm<F, Fut, T>(
    cx: &OpContext,
    op: Operation,
    path: String,
    entity_id: &str,
    read: F,
) -> Result<()>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Option<T>>>,
{
    let api = cx.api();
    let path_ref = &path;
    let result = reconcile(
        cx,
        op,
        move || async move {
            api.delete(path_ref).await?;
            Ok::<_, mdb_api::ApiError>(Submitted::new(entity_id, ()))
        },
        move |_| async move {
            match read().await? {
                None => Ok::<_, ProviderError>(()),
                Some(_) => Err(ProviderError::Inconsistent(format!(
                    "{} still present after delete",
                    path_ref
                ))),
            }
        },
    )
    .await;

    match result {
        Err(ProviderError::Rejected {
            source: Some(ref e),
            ..
        }) if e.is_not_found() => {
            info!(path = %path, "Already deleted");
            cx.audit().already_deleted(&path, entity_id);
            Ok(())
        }
        other => other,
    }
}
