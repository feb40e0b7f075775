//! Private service endpoints exposing a cluster region to security principals
//! in the customer's cloud account. Id: `{cluster_id}/{endpoint_id}`.

use async_trait::async_trait;
use mdb_api::{
    ApiError, EntityType, PrivateEndpointData, PrivateEndpointSpec, TaskType, get_json, post_json,
    put_json,
};
use serde::{Deserialize, Serialize};

use super::{Resource, delete_and_confirm, found, preserve_order, required, same_set, split_id};
use crate::context::OpContext;
use crate::error::{ProviderError, Result};
use crate::reconcile::{Submitted, reconcile};

const WHAT: &str = "endpoint";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivateEndpointConfig {
    pub cluster_id: String,
    #[serde(flatten)]
    pub spec: PrivateEndpointSpec,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivateEndpointState {
    pub id: String,
    pub endpoint_id: String,
    pub cluster_id: String,
    #[serde(flatten)]
    pub spec: PrivateEndpointSpec,
    pub state: String,
    pub service_name: Option<String>,
}

impl PrivateEndpointState {
    fn from_remote(cluster_id: &str, data: PrivateEndpointData) -> Self {
        Self {
            id: format!("{}/{}", cluster_id, data.id),
            endpoint_id: data.id,
            cluster_id: cluster_id.to_string(),
            spec: data.spec,
            state: data.state,
            service_name: data.service_name,
        }
    }

    fn aligned_with(mut self, config: &PrivateEndpointConfig) -> Self {
        self.spec.security_principals = preserve_order(
            &config.spec.security_principals,
            self.spec.security_principals,
        );
        self
    }
}

async fn read_state(
    cx: &OpContext,
    cluster_id: &str,
    endpoint_id: &str,
) -> Result<Option<PrivateEndpointState>> {
    let path = cx.scope().private_endpoint(cluster_id, endpoint_id);
    let data = found(get_json::<PrivateEndpointData>(cx.api(), &path).await)?;
    Ok(data.map(|d| PrivateEndpointState::from_remote(cluster_id, d)))
}

#[derive(Debug, Default, Clone, Copy)]
pub struct PrivateEndpointResource;

#[async_trait]
impl Resource for PrivateEndpointResource {
    type Spec = PrivateEndpointConfig;
    type State = PrivateEndpointState;

    const NAME: &'static str = "private-endpoint";

    async fn create(
        &self,
        cx: &OpContext,
        config: &PrivateEndpointConfig,
    ) -> Result<PrivateEndpointState> {
        if config.spec.security_principals.is_empty() {
            return Err(ProviderError::invalid(
                "create private service endpoint",
                "at least one security principal is required",
            ));
        }

        let api = cx.api();
        let cluster_id = config.cluster_id.as_str();
        let path = &cx.scope().private_endpoints(cluster_id);
        let spec = &config.spec;

        let state = reconcile(
            cx,
            cx.operation(EntityType::Cluster, TaskType::CreatePrivateServiceEndpoint),
            move || async move {
                let created: PrivateEndpointData = post_json(api, path, spec).await?;
                Ok::<_, ApiError>(Submitted::new(cluster_id, created.id))
            },
            move |endpoint_id: String| async move {
                let state = read_state(cx, cluster_id, &endpoint_id).await?;
                required(state, "private endpoint", &endpoint_id)
            },
        )
        .await?;
        Ok(state.aligned_with(config))
    }

    async fn read(&self, cx: &OpContext, id: &str) -> Result<Option<PrivateEndpointState>> {
        let (cluster_id, endpoint_id) = split_id(id, WHAT)?;
        read_state(cx, cluster_id, endpoint_id).await
    }

    async fn update(
        &self,
        cx: &OpContext,
        id: &str,
        config: &PrivateEndpointConfig,
    ) -> Result<PrivateEndpointState> {
        let (cluster_id, endpoint_id) = split_id(id, WHAT)?;
        let current = required(
            read_state(cx, cluster_id, endpoint_id).await?,
            "private endpoint",
            id,
        )?;

        if current.cluster_id != config.cluster_id
            || current.spec.cluster_region_info_id != config.spec.cluster_region_info_id
        {
            return Err(ProviderError::invalid(
                "edit private service endpoint",
                "the cluster region of an endpoint cannot change",
            ));
        }
        if same_set(
            &current.spec.security_principals,
            &config.spec.security_principals,
        ) {
            return Ok(current.aligned_with(config));
        }

        let api = cx.api();
        let path = &cx.scope().private_endpoint(cluster_id, endpoint_id);
        let spec = &config.spec;

        let state = reconcile(
            cx,
            cx.operation(EntityType::Cluster, TaskType::EditPrivateServiceEndpoint),
            move || async move {
                put_json::<_, PrivateEndpointData>(api, path, spec).await?;
                Ok::<_, ApiError>(Submitted::new(cluster_id, ()))
            },
            move |()| async move {
                required(
                    read_state(cx, cluster_id, endpoint_id).await?,
                    "private endpoint",
                    id,
                )
            },
        )
        .await?;
        Ok(state.aligned_with(config))
    }

    async fn delete(&self, cx: &OpContext, id: &str) -> Result<()> {
        let (cluster_id, endpoint_id) = split_id(id, WHAT)?;
        delete_and_confirm(
            cx,
            cx.operation(EntityType::Cluster, TaskType::DeletePrivateServiceEndpoint),
            cx.scope().private_endpoint(cluster_id, endpoint_id),
            cluster_id,
            move || async move { read_state(cx, cluster_id, endpoint_id).await },
        )
        .await
    }
}
