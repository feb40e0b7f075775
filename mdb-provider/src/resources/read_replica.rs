//! Read replicas of a primary cluster, managed as one set.
//!
//! The resource id is the primary cluster id. A primary without replica
//! specs reads as absent.

use async_trait::async_trait;
use mdb_api::{
    ApiError, ClusterEndpoint, EntityType, ReadReplicaSpec, ReadReplicasData,
    ReadReplicasRequest, TaskType, get_json, post_json, put_json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{Resource, delete_and_confirm, found, preserve_order, required, same_set};
use crate::context::OpContext;
use crate::error::{ProviderError, Result};
use crate::reconcile::{Submitted, reconcile};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadReplicasConfig {
    pub primary_cluster_id: String,
    pub read_replica_specs: Vec<ReadReplicaSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadReplicasState {
    pub id: String,
    pub primary_cluster_id: String,
    pub read_replica_specs: Vec<ReadReplicaSpec>,
    pub endpoints: Vec<ClusterEndpoint>,
}

impl ReadReplicasState {
    fn aligned_with(mut self, config: &ReadReplicasConfig) -> Self {
        self.read_replica_specs =
            preserve_order(&config.read_replica_specs, self.read_replica_specs);
        self
    }
}

pub fn validate(config: &ReadReplicasConfig) -> std::result::Result<(), String> {
    if config.read_replica_specs.is_empty() {
        return Err("at least one read replica spec is required".to_string());
    }
    if let Some(spec) = config.read_replica_specs.iter().find(|s| s.num_nodes == 0) {
        return Err(format!("replica in {} needs at least one node", spec.region));
    }
    Ok(())
}

async fn read_state(cx: &OpContext, primary: &str) -> Result<Option<ReadReplicasState>> {
    let data = found(get_json::<ReadReplicasData>(cx.api(), &cx.scope().read_replicas(primary)).await)?;
    Ok(data
        .filter(|d| !d.read_replica_specs.is_empty())
        .map(|d| ReadReplicasState {
            id: d.primary_cluster_id.clone(),
            primary_cluster_id: d.primary_cluster_id,
            read_replica_specs: d.read_replica_specs,
            endpoints: d.endpoints,
        }))
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ReadReplicaResource;

impl ReadReplicaResource {
    async fn submit(
        &self,
        cx: &OpContext,
        config: &ReadReplicasConfig,
        kind: TaskType,
    ) -> Result<ReadReplicasState> {
        let api = cx.api();
        let primary = config.primary_cluster_id.as_str();
        let path = &cx.scope().read_replicas(primary);
        let request = &ReadReplicasRequest {
            read_replica_specs: config.read_replica_specs.clone(),
        };

        let state = reconcile(
            cx,
            cx.operation(EntityType::Cluster, kind),
            move || async move {
                if kind == TaskType::CreateReadReplica {
                    post_json::<_, Value>(api, path, request).await?;
                } else {
                    put_json::<_, Value>(api, path, request).await?;
                }
                Ok::<_, ApiError>(Submitted::entity(primary))
            },
            move |id: String| async move { required(read_state(cx, &id).await?, "read replicas of", &id) },
        )
        .await?;
        Ok(state.aligned_with(config))
    }
}

#[async_trait]
impl Resource for ReadReplicaResource {
    type Spec = ReadReplicasConfig;
    type State = ReadReplicasState;

    const NAME: &'static str = "read-replicas";

    async fn create(&self, cx: &OpContext, config: &ReadReplicasConfig) -> Result<ReadReplicasState> {
        validate(config).map_err(|e| ProviderError::invalid("create read replica", e))?;
        self.submit(cx, config, TaskType::CreateReadReplica).await
    }

    async fn read(&self, cx: &OpContext, id: &str) -> Result<Option<ReadReplicasState>> {
        read_state(cx, id).await
    }

    async fn update(
        &self,
        cx: &OpContext,
        id: &str,
        config: &ReadReplicasConfig,
    ) -> Result<ReadReplicasState> {
        validate(config).map_err(|e| ProviderError::invalid("edit read replica", e))?;
        if config.primary_cluster_id != id {
            return Err(ProviderError::invalid(
                "edit read replica",
                "the primary cluster cannot change",
            ));
        }

        let current = required(read_state(cx, id).await?, "read replicas of", id)?;
        if same_set(&current.read_replica_specs, &config.read_replica_specs) {
            return Ok(current.aligned_with(config));
        }
        self.submit(cx, config, TaskType::EditReadReplica).await
    }

    async fn delete(&self, cx: &OpContext, id: &str) -> Result<()> {
        delete_and_confirm(
            cx,
            cx.operation(EntityType::Cluster, TaskType::DeleteReadReplica),
            cx.scope().read_replicas(id),
            id,
            move || async move { read_state(cx, id).await },
        )
        .await
    }
}
