//! Backup resource - on-demand cluster backups. Backups are immutable.

use async_trait::async_trait;
use mdb_api::{ApiError, BackupData, BackupSpec, EntityType, TaskType, get_json, post_json};
use serde::{Deserialize, Serialize};

use super::{Resource, delete_and_confirm, found, required};
use crate::context::OpContext;
use crate::error::{ProviderError, Result};
use crate::reconcile::{Submitted, reconcile};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupState {
    pub id: String,
    #[serde(flatten)]
    pub spec: BackupSpec,
    pub state: String,
    pub size_in_bytes: Option<u64>,
    pub created_on: Option<String>,
}

impl From<BackupData> for BackupState {
    fn from(data: BackupData) -> Self {
        Self {
            id: data.info.id,
            spec: data.spec,
            state: data.info.state,
            size_in_bytes: data.info.size_in_bytes,
            created_on: data.info.created_on,
        }
    }
}

async fn read_state(cx: &OpContext, id: &str) -> Result<Option<BackupState>> {
    let data = found(get_json::<BackupData>(cx.api(), &cx.scope().backup(id)).await)?;
    Ok(data.map(BackupState::from))
}

#[derive(Debug, Default, Clone, Copy)]
pub struct BackupResource;

#[async_trait]
impl Resource for BackupResource {
    type Spec = BackupSpec;
    type State = BackupState;

    const NAME: &'static str = "backup";

    async fn create(&self, cx: &OpContext, spec: &BackupSpec) -> Result<BackupState> {
        if spec.retention_period_in_days == 0 {
            return Err(ProviderError::invalid(
                "create backup",
                "retention_period_in_days must be at least 1",
            ));
        }

        let api = cx.api();
        let path = &cx.scope().backups();

        reconcile(
            cx,
            cx.operation(EntityType::Backup, TaskType::CreateBackup),
            move || async move {
                let created: BackupData = post_json(api, path, spec).await?;
                Ok::<_, ApiError>(Submitted::entity(created.info.id))
            },
            move |id: String| async move { required(read_state(cx, &id).await?, "backup", &id) },
        )
        .await
    }

    async fn read(&self, cx: &OpContext, id: &str) -> Result<Option<BackupState>> {
        read_state(cx, id).await
    }

    async fn update(&self, cx: &OpContext, id: &str, spec: &BackupSpec) -> Result<BackupState> {
        let current = required(read_state(cx, id).await?, "backup", id)?;
        if current.spec != *spec {
            return Err(ProviderError::invalid(
                "update backup",
                "backups are immutable; create a new backup instead",
            ));
        }
        Ok(current)
    }

    async fn delete(&self, cx: &OpContext, id: &str) -> Result<()> {
        delete_and_confirm(
            cx,
            cx.operation(EntityType::Backup, TaskType::DeleteBackup),
            cx.scope().backup(id),
            id,
            move || async move { read_state(cx, id).await },
        )
        .await
    }
}
