//! Shared test utilities for mdb-provider integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use mdb_api::{ApiError, ManagementApi, Scope, Task, TaskQuery, TaskType};
use mdb_provider::{OpContext, ProviderAuditLogger, RetryPolicy};
use serde_json::{Value, json};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    Get,
    Post,
    Put,
    Delete,
}

/// One scripted answer of the task endpoint.
#[derive(Debug, Clone)]
pub enum Step {
    State(&'static str),
    Failed(&'static str),
    /// The status read itself fails.
    Unavailable,
}

type Responses = HashMap<(Verb, String), VecDeque<mdb_api::Result<Value>>>;

/// In-memory management API answering from scripts.
///
/// Each route and task answers with its queued responses in order; the last
/// one repeats. Unscripted routes answer not found, unscripted tasks answer
/// with an empty task list.
#[derive(Default)]
pub struct FakeApi {
    responses: Mutex<Responses>,
    tasks: Mutex<HashMap<(String, TaskType), VecDeque<Step>>>,
    calls: Mutex<Vec<(Verb, String)>>,
    task_reads: AtomicUsize,
}

fn next<T: Clone>(queue: Option<&mut VecDeque<T>>) -> Option<T> {
    let queue = queue?;
    if queue.len() > 1 {
        queue.pop_front()
    } else {
        queue.front().cloned()
    }
}

impl FakeApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn on(&self, verb: Verb, path: impl Into<String>, result: mdb_api::Result<Value>) {
        self.responses
            .lock()
            .unwrap()
            .entry((verb, path.into()))
            .or_default()
            .push_back(result);
    }

    pub fn ok(&self, verb: Verb, path: impl Into<String>, value: Value) {
        self.on(verb, path, Ok(value));
    }

    pub fn fail(&self, verb: Verb, path: impl Into<String>, status: u16, detail: &str) {
        self.on(
            verb,
            path,
            Err(ApiError::Status {
                status,
                detail: detail.to_string(),
            }),
        );
    }

    pub fn script(&self, entity_id: &str, kind: TaskType, steps: &[Step]) {
        self.tasks
            .lock()
            .unwrap()
            .insert((entity_id.to_string(), kind), steps.iter().cloned().collect());
    }

    pub fn count(&self, verb: Verb, path: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(v, p)| *v == verb && p == path)
            .count()
    }

    /// Number of mutating calls of any kind.
    pub fn mutations(&self) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(v, _)| *v != Verb::Get)
            .count()
    }

    pub fn task_reads(&self) -> usize {
        self.task_reads.load(Ordering::SeqCst)
    }

    fn respond(&self, verb: Verb, path: &str) -> mdb_api::Result<Value> {
        self.calls.lock().unwrap().push((verb, path.to_string()));
        let mut responses = self.responses.lock().unwrap();
        next(responses.get_mut(&(verb, path.to_string())))
            .unwrap_or_else(|| Err(ApiError::NotFound(format!("{}: not found", path))))
    }
}

#[async_trait]
impl ManagementApi for FakeApi {
    async fn get(&self, path: &str) -> mdb_api::Result<Value> {
        self.respond(Verb::Get, path)
    }

    async fn post(&self, path: &str, _body: Value) -> mdb_api::Result<Value> {
        self.respond(Verb::Post, path)
    }

    async fn put(&self, path: &str, _body: Value) -> mdb_api::Result<Value> {
        self.respond(Verb::Put, path)
    }

    async fn delete(&self, path: &str) -> mdb_api::Result<()> {
        self.respond(Verb::Delete, path).map(|_| ())
    }

    async fn list_tasks(&self, query: &TaskQuery, _limit: u32) -> mdb_api::Result<Vec<Task>> {
        let n = self.task_reads.fetch_add(1, Ordering::SeqCst) + 1;
        let step = {
            let mut tasks = self.tasks.lock().unwrap();
            next(tasks.get_mut(&(query.entity_id.clone(), query.task_type)))
        };

        let (state, detail) = match step {
            None => return Ok(vec![]),
            Some(Step::Unavailable) => {
                return Err(ApiError::Status {
                    status: 503,
                    detail: "service unavailable".to_string(),
                });
            }
            Some(Step::State(state)) => (state, None),
            Some(Step::Failed(detail)) => ("FAILED", Some(detail.to_string())),
        };

        Ok(vec![Task {
            id: format!("task-{}", n),
            entity_id: query.entity_id.clone(),
            entity_type: query.entity_type.as_str().to_string(),
            task_type: query.task_type.as_str().to_string(),
            state: state.to_string(),
            created_on: None,
            completed_on: None,
            detail,
        }])
    }
}

pub fn scope() -> Scope {
    Scope::new("acc-1", "proj-1")
}

/// Context on the fake with per-kind default policies.
pub fn context(api: &Arc<FakeApi>) -> OpContext {
    OpContext::new(api.clone(), scope()).with_audit(Arc::new(ProviderAuditLogger::new_noop()))
}

/// Context on the fake with one policy for every operation.
pub fn context_with_policy(api: &Arc<FakeApi>, policy: RetryPolicy) -> OpContext {
    context(api).with_policy_override(policy)
}

// =============================================================================
// Payloads
// =============================================================================

pub fn cluster_spec_json(num_nodes: u32) -> Value {
    json!({
        "name": "orders",
        "cloud_info": {"code": "AWS", "region": "us-east-1"},
        "cluster_info": {
            "cluster_tier": "PAID",
            "num_nodes": num_nodes,
            "node_info": {"num_cores": 4, "memory_mb": 16384, "disk_size_gb": 100},
            "fault_tolerance": "ZONE"
        },
        "software_info": {"track_id": null},
        "cluster_region_info": []
    })
}

pub fn cluster_json(id: &str, state: &str, num_nodes: u32) -> Value {
    json!({
        "spec": cluster_spec_json(num_nodes),
        "info": {
            "id": id,
            "state": state,
            "software_version": "2.20.1",
            "endpoints": [{"region": "us-east-1", "host": format!("{}.db.example.com", id)}]
        }
    })
}

pub fn allow_list_json(id: &str, cidrs: &[&str]) -> Value {
    json!({
        "spec": {"name": format!("list-{}", id), "description": "", "allow_list": cidrs},
        "info": {"id": id, "cluster_ids": []}
    })
}
