//! Cluster resource - database clusters and their allow-list associations.

use async_trait::async_trait;
use mdb_api::{
    AllowListData, ApiError, ClusterData, ClusterEndpoint, ClusterSpec, CreateClusterRequest,
    EntityType, TaskType, get_json, post_json, put_json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{Resource, delete_and_confirm, found, preserve_order, required, same_set};
use crate::context::OpContext;
use crate::error::{ProviderError, Result};
use crate::reconcile::{Submitted, reconcile};

const PAUSED: &str = "PAUSED";

/// Whether the cluster should be serving or paused.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DesiredState {
    #[default]
    Active,
    Paused,
}

/// Desired cluster configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterConfig {
    #[serde(flatten)]
    pub spec: ClusterSpec,
    #[serde(default)]
    pub allow_list_ids: Vec<String>,
    #[serde(default)]
    pub desired_state: DesiredState,
}

/// Flattened view of a cluster and its associated allow lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterState {
    pub id: String,
    #[serde(flatten)]
    pub spec: ClusterSpec,
    pub allow_list_ids: Vec<String>,
    pub state: String,
    pub software_version: Option<String>,
    pub endpoints: Vec<ClusterEndpoint>,
}

impl ClusterState {
    fn from_remote(data: ClusterData, allow_lists: Vec<AllowListData>) -> Self {
        Self {
            id: data.info.id,
            spec: data.spec,
            allow_list_ids: allow_lists.into_iter().map(|a| a.info.id).collect(),
            state: data.info.state,
            software_version: data.info.software_version,
            endpoints: data.info.endpoints,
        }
    }

    pub fn is_paused(&self) -> bool {
        self.state == PAUSED
    }

    /// Keep the caller's ordering of region and allow-list sets.
    fn aligned_with(mut self, config: &ClusterConfig) -> Self {
        self.allow_list_ids = preserve_order(&config.allow_list_ids, self.allow_list_ids);
        self.spec.cluster_region_info = preserve_order(
            &config.spec.cluster_region_info,
            self.spec.cluster_region_info,
        );
        self
    }
}

/// Check a desired configuration before anything is sent.
pub fn validate(config: &ClusterConfig) -> std::result::Result<(), String> {
    let spec = &config.spec;
    if spec.name.trim().is_empty() {
        return Err("cluster name must not be empty".to_string());
    }
    if spec.cluster_info.num_nodes == 0 {
        return Err("num_nodes must be at least 1".to_string());
    }
    if !spec.cluster_region_info.is_empty() {
        let total: u32 = spec.cluster_region_info.iter().map(|r| r.num_nodes).sum();
        if total != spec.cluster_info.num_nodes {
            return Err(format!(
                "region node counts add up to {} but num_nodes is {}",
                total, spec.cluster_info.num_nodes
            ));
        }
    }
    Ok(())
}

/// Spec comparison that ignores region ordering.
fn spec_differs(current: &ClusterSpec, desired: &ClusterSpec) -> bool {
    let mut current = current.clone();
    current.cluster_region_info =
        preserve_order(&desired.cluster_region_info, current.cluster_region_info);
    current != *desired
}

async fn read_state(cx: &OpContext, id: &str) -> Result<Option<ClusterState>> {
    let api = cx.api();
    let scope = cx.scope();

    let Some(data) = found(get_json::<ClusterData>(api, &scope.cluster(id)).await)? else {
        return Ok(None);
    };
    let allow_lists = found(
        get_json::<Vec<AllowListData>>(api, &scope.cluster_allow_lists(id)).await,
    )?
    .unwrap_or_default();

    Ok(Some(ClusterState::from_remote(data, allow_lists)))
}

async fn read_required(cx: &OpContext, id: &str) -> Result<ClusterState> {
    required(read_state(cx, id).await?, "cluster", id)
}

/// Cluster lifecycle handler.
#[derive(Debug, Default, Clone, Copy)]
pub struct ClusterResource;

impl ClusterResource {
    async fn set_paused(&self, cx: &OpContext, id: &str, paused: bool) -> Result<ClusterState> {
        let api = cx.api();
        let scope = cx.scope();
        let (kind, path) = if paused {
            (TaskType::PauseCluster, scope.cluster_pause(id))
        } else {
            (TaskType::ResumeCluster, scope.cluster_resume(id))
        };
        let path = &path;

        reconcile(
            cx,
            cx.operation(EntityType::Cluster, kind),
            move || async move {
                api.post(path, serde_json::json!({})).await?;
                Ok::<_, ApiError>(Submitted::entity(id))
            },
            move |id: String| async move { read_required(cx, &id).await },
        )
        .await
    }

    async fn edit_spec(&self, cx: &OpContext, id: &str, spec: &ClusterSpec) -> Result<ClusterState> {
        let api = cx.api();
        let path = &cx.scope().cluster(id);

        reconcile(
            cx,
            cx.operation(EntityType::Cluster, TaskType::EditCluster),
            move || async move {
                put_json::<_, ClusterData>(api, path, spec).await?;
                Ok::<_, ApiError>(Submitted::entity(id))
            },
            move |id: String| async move { read_required(cx, &id).await },
        )
        .await
    }

    async fn edit_allow_lists(
        &self,
        cx: &OpContext,
        id: &str,
        allow_list_ids: &[String],
    ) -> Result<ClusterState> {
        let api = cx.api();
        let path = &cx.scope().cluster_allow_lists(id);

        reconcile(
            cx,
            cx.operation(EntityType::Cluster, TaskType::EditAllowList),
            move || async move {
                api.put(path, serde_json::to_value(allow_list_ids)?).await?;
                Ok::<_, ApiError>(Submitted::entity(id))
            },
            move |id: String| async move { read_required(cx, &id).await },
        )
        .await
    }
}

#[async_trait]
impl Resource for ClusterResource {
    type Spec = ClusterConfig;
    type State = ClusterState;

    const NAME: &'static str = "cluster";

    async fn create(&self, cx: &OpContext, config: &ClusterConfig) -> Result<ClusterState> {
        validate(config).map_err(|e| ProviderError::invalid("create cluster", e))?;
        info!(name = %config.spec.name, "Creating cluster");

        let api = cx.api();
        let path = &cx.scope().clusters();
        let request = &CreateClusterRequest {
            cluster_spec: config.spec.clone(),
            allow_list_ids: config.allow_list_ids.clone(),
        };

        let mut state = reconcile(
            cx,
            cx.operation(EntityType::Cluster, TaskType::CreateCluster),
            move || async move {
                let created: ClusterData = post_json(api, path, request).await?;
                Ok::<_, ApiError>(Submitted::entity(created.info.id))
            },
            move |id: String| async move { read_required(cx, &id).await },
        )
        .await?;

        if config.desired_state == DesiredState::Paused && !state.is_paused() {
            state = self.set_paused(cx, &state.id.clone(), true).await?;
        }
        Ok(state.aligned_with(config))
    }

    async fn read(&self, cx: &OpContext, id: &str) -> Result<Option<ClusterState>> {
        read_state(cx, id).await
    }

    async fn update(&self, cx: &OpContext, id: &str, config: &ClusterConfig) -> Result<ClusterState> {
        validate(config).map_err(|e| ProviderError::invalid("update cluster", e))?;

        let mut state = read_state(cx, id)
            .await?
            .ok_or_else(|| ProviderError::invalid("update cluster", format!("cluster {} not found", id)))?;
        let pause = config.desired_state == DesiredState::Paused;

        // A paused cluster cannot be edited
        if !pause && state.is_paused() {
            info!(cluster_id = %id, "Resuming cluster");
            state = self.set_paused(cx, id, false).await?;
        }

        if spec_differs(&state.spec, &config.spec) {
            info!(cluster_id = %id, "Editing cluster spec");
            state = self.edit_spec(cx, id, &config.spec).await?;
        }

        if !same_set(&state.allow_list_ids, &config.allow_list_ids) {
            info!(cluster_id = %id, "Editing allow list associations");
            state = self.edit_allow_lists(cx, id, &config.allow_list_ids).await?;
        }

        if pause && !state.is_paused() {
            info!(cluster_id = %id, "Pausing cluster");
            state = self.set_paused(cx, id, true).await?;
        }

        Ok(state.aligned_with(config))
    }

    async fn delete(&self, cx: &OpContext, id: &str) -> Result<()> {
        delete_and_confirm(
            cx,
            cx.operation(EntityType::Cluster, TaskType::DeleteCluster),
            cx.scope().cluster(id),
            id,
            move || async move { read_state(cx, id).await },
        )
        .await
    }
}
