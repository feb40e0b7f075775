//! Point-in-time recovery configs, one per database namespace.
//!
//! The create response does not carry the new config's id, so the final read
//! lists the cluster's configs and matches on the namespace. The resulting id
//! is the composite `{cluster_id}/{config_id}`.

use async_trait::async_trait;
use mdb_api::{
    ApiError, CreatePitrConfigsRequest, EntityType, PitrConfigData, PitrConfigSpec, TaskType,
    UpdatePitrConfigRequest, get_json, post_json, put_json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{Resource, delete_and_confirm, found, required, split_id};
use crate::context::OpContext;
use crate::error::{ProviderError, Result};
use crate::reconcile::{Submitted, reconcile};

const WHAT: &str = "pitr_config";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PitrConfig {
    pub cluster_id: String,
    #[serde(flatten)]
    pub spec: PitrConfigSpec,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PitrState {
    pub id: String,
    pub cluster_id: String,
    pub config_id: String,
    #[serde(flatten)]
    pub spec: PitrConfigSpec,
    pub state: String,
    pub earliest_recovery_time_millis: Option<i64>,
}

impl PitrState {
    fn from_remote(cluster_id: &str, data: PitrConfigData) -> Self {
        Self {
            id: format!("{}/{}", cluster_id, data.id),
            cluster_id: cluster_id.to_string(),
            config_id: data.id,
            spec: data.spec,
            state: data.state,
            earliest_recovery_time_millis: data.earliest_recovery_time_millis,
        }
    }
}

async fn read_state(cx: &OpContext, cluster_id: &str, config_id: &str) -> Result<Option<PitrState>> {
    let path = cx.scope().pitr_config(cluster_id, config_id);
    let data = found(get_json::<PitrConfigData>(cx.api(), &path).await)?;
    Ok(data.map(|d| PitrState::from_remote(cluster_id, d)))
}

/// Find the config covering `spec`'s namespace.
async fn discover(cx: &OpContext, cluster_id: &str, spec: &PitrConfigSpec) -> Result<PitrState> {
    let path = cx.scope().pitr_configs(cluster_id);
    let configs = found(get_json::<Vec<PitrConfigData>>(cx.api(), &path).await)?.unwrap_or_default();

    configs
        .into_iter()
        .find(|c| {
            c.spec.namespace_name == spec.namespace_name
                && c.spec.namespace_type.eq_ignore_ascii_case(&spec.namespace_type)
        })
        .map(|c| PitrState::from_remote(cluster_id, c))
        .ok_or_else(|| {
            ProviderError::Inconsistent(format!(
                "no PITR config for {} namespace {} on cluster {}",
                spec.namespace_type, spec.namespace_name, cluster_id
            ))
        })
}

#[derive(Debug, Default, Clone, Copy)]
pub struct PitrResource;

#[async_trait]
impl Resource for PitrResource {
    type Spec = PitrConfig;
    type State = PitrState;

    const NAME: &'static str = "pitr-config";

    async fn create(&self, cx: &OpContext, config: &PitrConfig) -> Result<PitrState> {
        if config.spec.retention_period_in_days == 0 {
            return Err(ProviderError::invalid(
                "enable db pitr",
                "retention_period_in_days must be at least 1",
            ));
        }

        let api = cx.api();
        let cluster_id = config.cluster_id.as_str();
        let path = &cx.scope().pitr_configs(cluster_id);
        let request = &CreatePitrConfigsRequest {
            pitr_config_specs: vec![config.spec.clone()],
        };

        reconcile(
            cx,
            cx.operation(EntityType::Cluster, TaskType::EnableDbPitr),
            move || async move {
                post_json::<_, Value>(api, path, request).await?;
                Ok::<_, ApiError>(Submitted::entity(cluster_id))
            },
            move |cluster_id: String| async move { discover(cx, &cluster_id, &config.spec).await },
        )
        .await
    }

    async fn read(&self, cx: &OpContext, id: &str) -> Result<Option<PitrState>> {
        let (cluster_id, config_id) = split_id(id, WHAT)?;
        read_state(cx, cluster_id, config_id).await
    }

    async fn update(&self, cx: &OpContext, id: &str, config: &PitrConfig) -> Result<PitrState> {
        let (cluster_id, config_id) = split_id(id, WHAT)?;
        let current = required(read_state(cx, cluster_id, config_id).await?, "PITR config", id)?;

        if current.cluster_id != config.cluster_id
            || current.spec.namespace_name != config.spec.namespace_name
            || !current
                .spec
                .namespace_type
                .eq_ignore_ascii_case(&config.spec.namespace_type)
        {
            return Err(ProviderError::invalid(
                "update db pitr",
                "only retention_period_in_days can change; the cluster and namespace are fixed",
            ));
        }
        if current.spec.retention_period_in_days == config.spec.retention_period_in_days {
            return Ok(current);
        }

        let api = cx.api();
        let path = &cx.scope().pitr_config(cluster_id, config_id);
        let request = &UpdatePitrConfigRequest {
            retention_period_in_days: config.spec.retention_period_in_days,
        };

        reconcile(
            cx,
            cx.operation(EntityType::Cluster, TaskType::UpdateDbPitr),
            move || async move {
                put_json::<_, Value>(api, path, request).await?;
                Ok::<_, ApiError>(Submitted::new(cluster_id, ()))
            },
            move |()| async move {
                required(read_state(cx, cluster_id, config_id).await?, "PITR config", id)
            },
        )
        .await
    }

    async fn delete(&self, cx: &OpContext, id: &str) -> Result<()> {
        let (cluster_id, config_id) = split_id(id, WHAT)?;
        delete_and_confirm(
            cx,
            cx.operation(EntityType::Cluster, TaskType::DisableDbPitr),
            cx.scope().pitr_config(cluster_id, config_id),
            cluster_id,
            move || async move { read_state(cx, cluster_id, config_id).await },
        )
        .await
    }
}
