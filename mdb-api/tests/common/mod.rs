//! Shared test utilities for mdb-api integration tests.

use std::collections::HashMap;
use std::net::SocketAddr;

use axum::extract::{Path, Query};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use mdb_api::{ClientConfig, HttpClient};
use serde_json::{Value, json};
use tokio::net::TcpListener;

pub const API_KEY: &str = "test-key";

/// Fake management API served on an ephemeral port.
pub struct TestServer {
    pub addr: SocketAddr,
    shutdown_tx: tokio::sync::oneshot::Sender<()>,
}

impl TestServer {
    /// Spawn the fake API with the canned routes below.
    pub async fn spawn() -> Self {
        let router = Router::new()
            .route(
                "/api/public/v1/accounts/{account}/projects/{project}/tasks",
                get(list_tasks),
            )
            .route(
                "/api/public/v1/accounts/{account}/projects/{project}/clusters/{id}",
                get(get_cluster),
            )
            .route(
                "/api/public/v1/accounts/{account}/projects/{project}/allow-lists",
                post(create_allow_list),
            )
            .route(
                "/api/public/v1/accounts/{account}/projects/{project}/backups/{id}",
                axum::routing::delete(delete_backup),
            );

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
        tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .expect("Server error");
        });

        Self { addr, shutdown_tx }
    }

    /// Client configured against this server.
    pub fn client(&self) -> HttpClient {
        self.client_with_key(API_KEY)
    }

    pub fn client_with_key(&self, key: &str) -> HttpClient {
        let mut config = ClientConfig::new(self.addr.to_string(), key);
        config.use_secure = false;
        HttpClient::new(&config).expect("Failed to build client")
    }

    pub fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
    }
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(|v| v == format!("Bearer {}", API_KEY))
        .unwrap_or(false)
}

fn error(status: StatusCode, detail: &str) -> Response {
    (
        status,
        Json(json!({"error": {"status": status.as_u16(), "detail": detail}})),
    )
        .into_response()
}

async fn list_tasks(
    headers: HeaderMap,
    Path((_account, _project)): Path<(String, String)>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if !authorized(&headers) {
        return error(StatusCode::UNAUTHORIZED, "invalid api key");
    }
    let entity_id = params.get("entity_id").cloned().unwrap_or_default();
    let task_type = params.get("task_type").cloned().unwrap_or_default();
    if entity_id == "no-tasks" {
        return Json(json!({"data": []})).into_response();
    }
    Json(json!({
        "data": [{
            "id": "task-1",
            "entity_id": entity_id,
            "entity_type": params.get("entity_type").cloned().unwrap_or_default(),
            "task_type": task_type,
            "state": "IN_PROGRESS",
            "created_on": "2026-01-01T00:00:00Z"
        }]
    }))
    .into_response()
}

async fn get_cluster(
    headers: HeaderMap,
    Path((_account, _project, id)): Path<(String, String, String)>,
) -> Response {
    if !authorized(&headers) {
        return error(StatusCode::UNAUTHORIZED, "invalid api key");
    }
    if id == "missing" {
        return error(StatusCode::NOT_FOUND, "cluster missing not found");
    }
    if id == "broken" {
        return (StatusCode::BAD_GATEWAY, "upstream unavailable").into_response();
    }
    Json(json!({
        "data": {
            "spec": {
                "name": "orders",
                "cloud_info": {"code": "AWS", "region": "us-west-2"},
                "cluster_info": {
                    "cluster_tier": "PAID",
                    "num_nodes": 3,
                    "node_info": {"num_cores": 4, "memory_mb": 16384, "disk_size_gb": 100},
                    "fault_tolerance": "ZONE"
                }
            },
            "info": {"id": id, "state": "ACTIVE"}
        }
    }))
    .into_response()
}

async fn create_allow_list(headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if !authorized(&headers) {
        return error(StatusCode::UNAUTHORIZED, "invalid api key");
    }
    let empty = body["allow_list"]
        .as_array()
        .map(|a| a.is_empty())
        .unwrap_or(true);
    if empty {
        return error(StatusCode::BAD_REQUEST, "allow_list must not be empty");
    }
    Json(json!({
        "data": {
            "spec": body,
            "info": {"id": "al-1", "cluster_ids": []}
        }
    }))
    .into_response()
}

async fn delete_backup(headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return error(StatusCode::UNAUTHORIZED, "invalid api key");
    }
    StatusCode::NO_CONTENT.into_response()
}
