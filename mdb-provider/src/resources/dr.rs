//! Disaster recovery configs replicating databases from a source cluster to a
//! target cluster. Tasks run against the source cluster; the resource id is
//! `{source_cluster_id}/{dr_id}`.

use async_trait::async_trait;
use mdb_api::{ApiError, DrData, DrSpec, EntityType, TaskType, get_json, post_json, put_json};
use serde::{Deserialize, Serialize};

use super::{Resource, delete_and_confirm, found, preserve_order, required, same_set, split_id};
use crate::context::OpContext;
use crate::error::{ProviderError, Result};
use crate::reconcile::{Submitted, reconcile};

const WHAT: &str = "dr";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrConfig {
    pub source_cluster_id: String,
    #[serde(flatten)]
    pub spec: DrSpec,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrState {
    pub id: String,
    pub dr_id: String,
    pub source_cluster_id: String,
    #[serde(flatten)]
    pub spec: DrSpec,
    pub state: String,
}

impl DrState {
    fn from_remote(data: DrData) -> Self {
        Self {
            id: format!("{}/{}", data.info.source_cluster_id, data.info.id),
            dr_id: data.info.id,
            source_cluster_id: data.info.source_cluster_id,
            spec: data.spec,
            state: data.info.state,
        }
    }

    fn aligned_with(mut self, config: &DrConfig) -> Self {
        self.spec.databases = preserve_order(&config.spec.databases, self.spec.databases);
        self
    }
}

pub fn validate(config: &DrConfig) -> std::result::Result<(), String> {
    if config.spec.databases.is_empty() {
        return Err("at least one database must be replicated".to_string());
    }
    if config.spec.target_cluster_id == config.source_cluster_id {
        return Err("source and target cluster must differ".to_string());
    }
    Ok(())
}

async fn read_state(cx: &OpContext, cluster_id: &str, dr_id: &str) -> Result<Option<DrState>> {
    let path = cx.scope().dr_config(cluster_id, dr_id);
    let data = found(get_json::<DrData>(cx.api(), &path).await)?;
    Ok(data.map(DrState::from_remote))
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DrResource;

#[async_trait]
impl Resource for DrResource {
    type Spec = DrConfig;
    type State = DrState;

    const NAME: &'static str = "dr-config";

    async fn create(&self, cx: &OpContext, config: &DrConfig) -> Result<DrState> {
        validate(config).map_err(|e| ProviderError::invalid("create dr", e))?;

        let api = cx.api();
        let source = config.source_cluster_id.as_str();
        let path = &cx.scope().dr_configs(source);
        let spec = &config.spec;

        let state = reconcile(
            cx,
            cx.operation(EntityType::Cluster, TaskType::CreateDr),
            move || async move {
                let created: DrData = post_json(api, path, spec).await?;
                Ok::<_, ApiError>(Submitted::new(source, created.info.id))
            },
            move |dr_id: String| async move {
                required(read_state(cx, source, &dr_id).await?, "DR config", &dr_id)
            },
        )
        .await?;
        Ok(state.aligned_with(config))
    }

    async fn read(&self, cx: &OpContext, id: &str) -> Result<Option<DrState>> {
        let (cluster_id, dr_id) = split_id(id, WHAT)?;
        read_state(cx, cluster_id, dr_id).await
    }

    async fn update(&self, cx: &OpContext, id: &str, config: &DrConfig) -> Result<DrState> {
        validate(config).map_err(|e| ProviderError::invalid("edit dr", e))?;
        let (cluster_id, dr_id) = split_id(id, WHAT)?;
        let current = required(read_state(cx, cluster_id, dr_id).await?, "DR config", id)?;

        if current.source_cluster_id != config.source_cluster_id
            || current.spec.target_cluster_id != config.spec.target_cluster_id
        {
            return Err(ProviderError::invalid(
                "edit dr",
                "source and target cluster cannot change; create a new DR config instead",
            ));
        }
        if current.spec.name == config.spec.name
            && same_set(&current.spec.databases, &config.spec.databases)
        {
            return Ok(current.aligned_with(config));
        }

        let api = cx.api();
        let path = &cx.scope().dr_config(cluster_id, dr_id);
        let spec = &config.spec;

        let state = reconcile(
            cx,
            cx.operation(EntityType::Cluster, TaskType::EditDr),
            move || async move {
                put_json::<_, DrData>(api, path, spec).await?;
                Ok::<_, ApiError>(Submitted::new(cluster_id, ()))
            },
            move |()| async move { required(read_state(cx, cluster_id, dr_id).await?, "DR config", id) },
        )
        .await?;
        Ok(state.aligned_with(config))
    }

    async fn delete(&self, cx: &OpContext, id: &str) -> Result<()> {
        let (cluster_id, dr_id) = split_id(id, WHAT)?;
        delete_and_confirm(
            cx,
            cx.operation(EntityType::Cluster, TaskType::DeleteDr),
            cx.scope().dr_config(cluster_id, dr_id),
            cluster_id,
            move || async move { read_state(cx, cluster_id, dr_id).await },
        )
        .await
    }
}
