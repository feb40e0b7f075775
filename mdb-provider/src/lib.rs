//! mdb-provider: reconciles managed-database resources against the
//! management API.
//!
//! Each resource type implements [`Resource`]. Mutations are submitted, their
//! background task is polled until it settles, and an authoritative read
//! produces the final state (see [`reconcile`]).

pub mod audit;
pub mod context;
pub mod error;
pub mod reconcile;
pub mod resources;

pub use audit::ProviderAuditLogger;
pub use context::OpContext;
pub use error::{ErrorReport, ProviderError, Result};
pub use reconcile::{
    DEFAULT_FAILURE_BUDGET, OperationDescriptor, RetryPolicy, TaskStatus, read_task_status,
};
pub use resources::Resource;
