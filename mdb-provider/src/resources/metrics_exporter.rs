//! Association between a cluster and a metrics exporter integration.
//! The resource id is the cluster id.

use async_trait::async_trait;
use mdb_api::{
    ApiError, EntityType, MetricsExporterData, MetricsExporterRequest, TaskType, get_json, put_json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{Resource, delete_and_confirm, found, required};
use crate::context::OpContext;
use crate::error::{ProviderError, Result};
use crate::reconcile::{Submitted, reconcile};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsExporterConfig {
    pub cluster_id: String,
    pub exporter_config_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsExporterState {
    pub id: String,
    pub cluster_id: String,
    pub exporter_config_id: String,
    pub state: String,
}

async fn read_state(cx: &OpContext, cluster_id: &str) -> Result<Option<MetricsExporterState>> {
    let path = cx.scope().metrics_exporter(cluster_id);
    let data = found(get_json::<MetricsExporterData>(cx.api(), &path).await)?;
    Ok(data.map(|d| MetricsExporterState {
        id: cluster_id.to_string(),
        cluster_id: cluster_id.to_string(),
        exporter_config_id: d.exporter_config_id,
        state: d.state,
    }))
}

#[derive(Debug, Default, Clone, Copy)]
pub struct MetricsExporterResource;

impl MetricsExporterResource {
    async fn associate(
        &self,
        cx: &OpContext,
        config: &MetricsExporterConfig,
    ) -> Result<MetricsExporterState> {
        let api = cx.api();
        let cluster_id = config.cluster_id.as_str();
        let path = &cx.scope().metrics_exporter(cluster_id);
        let request = &MetricsExporterRequest {
            exporter_config_id: config.exporter_config_id.clone(),
        };

        reconcile(
            cx,
            cx.operation(EntityType::Cluster, TaskType::AssociateMetricsExporter),
            move || async move {
                put_json::<_, Value>(api, path, request).await?;
                Ok::<_, ApiError>(Submitted::entity(cluster_id))
            },
            move |id: String| async move {
                required(read_state(cx, &id).await?, "metrics exporter of", &id)
            },
        )
        .await
    }
}

#[async_trait]
impl Resource for MetricsExporterResource {
    type Spec = MetricsExporterConfig;
    type State = MetricsExporterState;

    const NAME: &'static str = "metrics-exporter";

    async fn create(
        &self,
        cx: &OpContext,
        config: &MetricsExporterConfig,
    ) -> Result<MetricsExporterState> {
        if config.exporter_config_id.trim().is_empty() {
            return Err(ProviderError::invalid(
                "associate metrics exporter",
                "exporter_config_id must not be empty",
            ));
        }
        self.associate(cx, config).await
    }

    async fn read(&self, cx: &OpContext, id: &str) -> Result<Option<MetricsExporterState>> {
        read_state(cx, id).await
    }

    async fn update(
        &self,
        cx: &OpContext,
        id: &str,
        config: &MetricsExporterConfig,
    ) -> Result<MetricsExporterState> {
        if config.cluster_id != id {
            return Err(ProviderError::invalid(
                "associate metrics exporter",
                "the cluster cannot change",
            ));
        }
        let current = required(read_state(cx, id).await?, "metrics exporter of", id)?;
        if current.exporter_config_id == config.exporter_config_id {
            return Ok(current);
        }
        self.associate(cx, config).await
    }

    async fn delete(&self, cx: &OpContext, id: &str) -> Result<()> {
        delete_and_confirm(
            cx,
            cx.operation(EntityType::Cluster, TaskType::RemoveMetricsExporter),
            cx.scope().metrics_exporter(id),
            id,
            move || async move { read_state(cx, id).await },
        )
        .await
    }
}
