//! Asynchronous mutation reconciliation.
//!
//! A mutation is submitted, the remote task is polled until it reaches a
//! terminal state, and an authoritative read produces the final state:
//!
//! ```text
//! SUBMITTED -> POLLING -> { SUCCEEDED_CONFIRMED, FAILED, TIMED_OUT }
//! ```
//!
//! - [`task`] reads the latest task status for an operation
//! - [`driver`] repeats a probe on a fixed interval until a deadline
//! - [`classify`] turns a status read into a driver decision
//! - [`mutation`] composes the three around a mutation and a read

pub mod classify;
pub mod driver;
pub mod mutation;
pub mod policy;
pub mod task;

pub use classify::classify;
pub use driver::{DriverError, PollError, Probe, run_until_terminal};
pub use mutation::{Operation, Submitted, reconcile};
pub use policy::{DEFAULT_FAILURE_BUDGET, FailureBudget, RetryPolicy};
pub use task::{OperationDescriptor, TaskReadError, TaskStatus, read_task_status};
