//! Dedicated VPCs for clusters. VPCs are immutable.

use async_trait::async_trait;
use mdb_api::{ApiError, EntityType, TaskType, VpcData, VpcSpec, get_json, post_json};
use serde::{Deserialize, Serialize};

use super::{Resource, delete_and_confirm, found, required};
use crate::context::OpContext;
use crate::error::{ProviderError, Result};
use crate::reconcile::{Submitted, reconcile};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VpcState {
    pub id: String,
    #[serde(flatten)]
    pub spec: VpcSpec,
    pub state: String,
    pub cluster_ids: Vec<String>,
}

impl From<VpcData> for VpcState {
    fn from(data: VpcData) -> Self {
        Self {
            id: data.info.id,
            spec: data.spec,
            state: data.info.state,
            cluster_ids: data.info.cluster_ids,
        }
    }
}

/// A VPC is sized either globally or per region, not both.
pub fn validate(spec: &VpcSpec) -> std::result::Result<(), String> {
    if spec.name.trim().is_empty() {
        return Err("VPC name must not be empty".to_string());
    }
    match (&spec.global_cidr, spec.region_specs.is_empty()) {
        (Some(_), false) => Err("set either global_cidr or region_specs, not both".to_string()),
        (None, true) => Err("one of global_cidr or region_specs is required".to_string()),
        _ => Ok(()),
    }
}

async fn read_state(cx: &OpContext, id: &str) -> Result<Option<VpcState>> {
    let data = found(get_json::<VpcData>(cx.api(), &cx.scope().vpc(id)).await)?;
    Ok(data.map(VpcState::from))
}

#[derive(Debug, Default, Clone, Copy)]
pub struct VpcResource;

#[async_trait]
impl Resource for VpcResource {
    type Spec = VpcSpec;
    type State = VpcState;

    const NAME: &'static str = "vpc";

    async fn create(&self, cx: &OpContext, spec: &VpcSpec) -> Result<VpcState> {
        validate(spec).map_err(|e| ProviderError::invalid("create vpc", e))?;

        let api = cx.api();
        let path = &cx.scope().vpcs();

        reconcile(
            cx,
            cx.operation(EntityType::SingleTenantVpc, TaskType::CreateVpc),
            move || async move {
                let created: VpcData = post_json(api, path, spec).await?;
                Ok::<_, ApiError>(Submitted::entity(created.info.id))
            },
            move |id: String| async move { required(read_state(cx, &id).await?, "VPC", &id) },
        )
        .await
    }

    async fn read(&self, cx: &OpContext, id: &str) -> Result<Option<VpcState>> {
        read_state(cx, id).await
    }

    async fn update(&self, cx: &OpContext, id: &str, spec: &VpcSpec) -> Result<VpcState> {
        let current = required(read_state(cx, id).await?, "VPC", id)?;
        if current.spec != *spec {
            return Err(ProviderError::invalid(
                "update vpc",
                "VPCs are immutable; create a new VPC instead",
            ));
        }
        Ok(current)
    }

    async fn delete(&self, cx: &OpContext, id: &str) -> Result<()> {
        delete_and_confirm(
            cx,
            cx.operation(EntityType::SingleTenantVpc, TaskType::DeleteVpc),
            cx.scope().vpc(id),
            id,
            move || async move { read_state(cx, id).await },
        )
        .await
    }
}
