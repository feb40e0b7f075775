//! mdb-api: client library for the managed-database management API.
//!
//! The [`ManagementApi`] trait is the seam the reconciliation engine talks to.
//! [`HttpClient`] implements it over HTTPS with a bearer API key; tests swap in
//! an in-memory implementation.
//!
//! # Example
//! ```ignore
//! use mdb_api::{ClientConfig, ClusterData, HttpClient, Scope, get_json};
//!
//! let client = HttpClient::new(&ClientConfig::new("cloud.example.com", api_key))?;
//! let scope = Scope::new(account_id, project_id);
//! let cluster: ClusterData = get_json(&client, &scope.cluster(&cluster_id)).await?;
//! ```

pub mod client;
pub mod error;
pub mod models;
pub mod paths;

pub use client::{
    ClientConfig, HttpClient, ManagementApi, decode, encode, get_json, post_json, put_json,
};
pub use error::{ApiError, Result};
pub use models::*;
pub use paths::Scope;
