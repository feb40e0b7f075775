//! Database audit log export. Id: `{cluster_id}/{exporter_id}`.

use async_trait::async_trait;
use mdb_api::{
    ApiError, AuditLogExporterData, AuditLogExporterSpec, EntityType, TaskType, get_json,
    post_json, put_json,
};
use serde::{Deserialize, Serialize};

use super::{Resource, delete_and_confirm, found, preserve_order, required, split_id};
use crate::context::OpContext;
use crate::error::{ProviderError, Result};
use crate::reconcile::{Submitted, reconcile};

const WHAT: &str = "exporter";

const LOG_LEVELS: &[&str] = &[
    "DEBUG1", "DEBUG2", "DEBUG3", "DEBUG4", "DEBUG5", "INFO", "NOTICE", "WARNING", "LOG",
];

const STATEMENT_CLASSES: &[&str] = &["READ", "WRITE", "FUNCTION", "ROLE", "DDL", "MISC"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditLogConfig {
    pub cluster_id: String,
    #[serde(flatten)]
    pub spec: AuditLogExporterSpec,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditLogState {
    pub id: String,
    pub exporter_id: String,
    pub cluster_id: String,
    #[serde(flatten)]
    pub spec: AuditLogExporterSpec,
    pub state: String,
}

impl AuditLogState {
    fn from_remote(data: AuditLogExporterData) -> Self {
        Self {
            id: format!("{}/{}", data.cluster_id, data.id),
            exporter_id: data.id,
            cluster_id: data.cluster_id,
            spec: data.spec,
            state: data.state,
        }
    }

    fn aligned_with(mut self, config: &AuditLogConfig) -> Self {
        self.spec.ysql_config.statement_classes = preserve_order(
            &config.spec.ysql_config.statement_classes,
            self.spec.ysql_config.statement_classes,
        );
        self
    }
}

pub fn validate(spec: &AuditLogExporterSpec) -> std::result::Result<(), String> {
    let ysql = &spec.ysql_config;
    if !LOG_LEVELS.contains(&ysql.log_level.as_str()) {
        return Err(format!("unknown log level {:?}", ysql.log_level));
    }
    if ysql.statement_classes.is_empty() {
        return Err("at least one statement class is required".to_string());
    }
    if let Some(bad) = ysql
        .statement_classes
        .iter()
        .find(|c| !STATEMENT_CLASSES.contains(&c.as_str()))
    {
        return Err(format!("unknown statement class {:?}", bad));
    }
    Ok(())
}

async fn read_state(
    cx: &OpContext,
    cluster_id: &str,
    exporter_id: &str,
) -> Result<Option<AuditLogState>> {
    let path = cx.scope().audit_log_exporter(cluster_id, exporter_id);
    let data = found(get_json::<AuditLogExporterData>(cx.api(), &path).await)?;
    Ok(data.map(AuditLogState::from_remote))
}

#[derive(Debug, Default, Clone, Copy)]
pub struct AuditLogResource;

#[async_trait]
impl Resource for AuditLogResource {
    type Spec = AuditLogConfig;
    type State = AuditLogState;

    const NAME: &'static str = "db-audit-logging";

    async fn create(&self, cx: &OpContext, config: &AuditLogConfig) -> Result<AuditLogState> {
        validate(&config.spec).map_err(|e| ProviderError::invalid("enable db audit logging", e))?;

        let api = cx.api();
        let cluster_id = config.cluster_id.as_str();
        let path = &cx.scope().audit_log_exporters(cluster_id);
        let spec = &config.spec;

        let state = reconcile(
            cx,
            cx.operation(EntityType::Cluster, TaskType::EnableDbAuditLogging),
            move || async move {
                let created: AuditLogExporterData = post_json(api, path, spec).await?;
                Ok::<_, ApiError>(Submitted::new(cluster_id, created.id))
            },
            move |exporter_id: String| async move {
                let state = read_state(cx, cluster_id, &exporter_id).await?;
                required(state, "audit log exporter", &exporter_id)
            },
        )
        .await?;
        Ok(state.aligned_with(config))
    }

    async fn read(&self, cx: &OpContext, id: &str) -> Result<Option<AuditLogState>> {
        let (cluster_id, exporter_id) = split_id(id, WHAT)?;
        read_state(cx, cluster_id, exporter_id).await
    }

    async fn update(&self, cx: &OpContext, id: &str, config: &AuditLogConfig) -> Result<AuditLogState> {
        validate(&config.spec).map_err(|e| ProviderError::invalid("edit db audit logging", e))?;
        let (cluster_id, exporter_id) = split_id(id, WHAT)?;
        if config.cluster_id != cluster_id {
            return Err(ProviderError::invalid(
                "edit db audit logging",
                "the cluster cannot change",
            ));
        }

        let current = required(
            read_state(cx, cluster_id, exporter_id).await?,
            "audit log exporter",
            id,
        )?
        .aligned_with(config);
        if current.spec == config.spec {
            return Ok(current);
        }

        let api = cx.api();
        let path = &cx.scope().audit_log_exporter(cluster_id, exporter_id);
        let spec = &config.spec;

        let state = reconcile(
            cx,
            cx.operation(EntityType::Cluster, TaskType::EditDbAuditLogging),
            move || async move {
                put_json::<_, AuditLogExporterData>(api, path, spec).await?;
                Ok::<_, ApiError>(Submitted::new(cluster_id, ()))
            },
            move |()| async move {
                required(
                    read_state(cx, cluster_id, exporter_id).await?,
                    "audit log exporter",
                    id,
                )
            },
        )
        .await?;
        Ok(state.aligned_with(config))
    }

    async fn delete(&self, cx: &OpContext, id: &str) -> Result<()> {
        let (cluster_id, exporter_id) = split_id(id, WHAT)?;
        delete_and_confirm(
            cx,
            cx.operation(EntityType::Cluster, TaskType::DisableDbAuditLogging),
            cx.scope().audit_log_exporter(cluster_id, exporter_id),
            cluster_id,
            move || async move { read_state(cx, cluster_id, exporter_id).await },
        )
        .await
    }
}
