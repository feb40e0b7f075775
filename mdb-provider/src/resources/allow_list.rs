//! Allow list resource - named sets of CIDR blocks.
//!
//! Allow lists are created and deleted synchronously; no background task is
//! involved, so none of these operations poll.

use std::net::IpAddr;

use async_trait::async_trait;
use mdb_api::{AllowListData, AllowListSpec, get_json, post_json};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{Resource, found, preserve_order, required, same_set};
use crate::context::OpContext;
use crate::error::{ProviderError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowListState {
    pub id: String,
    #[serde(flatten)]
    pub spec: AllowListSpec,
    pub cluster_ids: Vec<String>,
}

impl AllowListState {
    fn from_remote(data: AllowListData, desired: Option<&AllowListSpec>) -> Self {
        let mut spec = data.spec;
        if let Some(desired) = desired {
            spec.allow_list = preserve_order(&desired.allow_list, spec.allow_list);
        }
        Self {
            id: data.info.id,
            spec,
            cluster_ids: data.info.cluster_ids,
        }
    }
}

/// Parse `addr/prefix`, the prefix bounded by the address family.
fn valid_cidr(cidr: &str) -> bool {
    let Some((addr, prefix)) = cidr.split_once('/') else {
        return false;
    };
    let (Ok(addr), Ok(prefix)) = (addr.parse::<IpAddr>(), prefix.parse::<u8>()) else {
        return false;
    };
    match addr {
        IpAddr::V4(_) => prefix <= 32,
        IpAddr::V6(_) => prefix <= 128,
    }
}

pub fn validate(spec: &AllowListSpec) -> std::result::Result<(), String> {
    if spec.name.trim().is_empty() {
        return Err("allow list name must not be empty".to_string());
    }
    if spec.allow_list.is_empty() {
        return Err("allow list must contain at least one CIDR block".to_string());
    }
    if let Some(bad) = spec.allow_list.iter().find(|c| !valid_cidr(c)) {
        return Err(format!("{:?} is not a CIDR block", bad));
    }
    Ok(())
}

#[derive(Debug, Default, Clone, Copy)]
pub struct AllowListResource;

#[async_trait]
impl Resource for AllowListResource {
    type Spec = AllowListSpec;
    type State = AllowListState;

    const NAME: &'static str = "allow-list";

    async fn create(&self, cx: &OpContext, spec: &AllowListSpec) -> Result<AllowListState> {
        validate(spec).map_err(|e| ProviderError::invalid("create allow list", e))?;

        let created: AllowListData = post_json(cx.api(), &cx.scope().allow_lists(), spec)
            .await
            .map_err(|e| {
                cx.audit().rejected("create allow list", e.detail());
                ProviderError::rejected("create allow list", e)
            })?;

        info!(allow_list_id = %created.info.id, "Allow list created");
        Ok(AllowListState::from_remote(created, Some(spec)))
    }

    async fn read(&self, cx: &OpContext, id: &str) -> Result<Option<AllowListState>> {
        let data = found(get_json::<AllowListData>(cx.api(), &cx.scope().allow_list(id)).await)?;
        Ok(data.map(|d| AllowListState::from_remote(d, None)))
    }

    async fn update(&self, cx: &OpContext, id: &str, spec: &AllowListSpec) -> Result<AllowListState> {
        let current = required(self.read(cx, id).await?, "allow list", id)?;
        let unchanged = current.spec.name == spec.name
            && current.spec.description == spec.description
            && same_set(&current.spec.allow_list, &spec.allow_list);
        if !unchanged {
            return Err(ProviderError::invalid(
                "update allow list",
                "allow lists are immutable; create a new allow list instead",
            ));
        }

        let mut current = current;
        current.spec.allow_list = preserve_order(&spec.allow_list, current.spec.allow_list);
        Ok(current)
    }

    async fn delete(&self, cx: &OpContext, id: &str) -> Result<()> {
        match cx.api().delete(&cx.scope().allow_list(id)).await {
            Ok(()) => {
                info!(allow_list_id = %id, "Allow list deleted");
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                cx.audit().already_deleted(Self::NAME, id);
                Ok(())
            }
            Err(e) => {
                cx.audit().rejected("delete allow list", e.detail());
                Err(ProviderError::rejected("delete allow list", e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(cidrs: &[&str]) -> AllowListSpec {
        AllowListSpec {
            name: "office".to_string(),
            description: String::new(),
            allow_list: cidrs.iter().map(|c| c.to_string()).collect(),
        }
    }

    #[test]
    fn test_valid_cidr() {
        assert!(valid_cidr("10.0.0.0/8"));
        assert!(valid_cidr("0.0.0.0/0"));
        assert!(valid_cidr("2001:db8::/32"));
        assert!(!valid_cidr("10.0.0.0/33"));
        assert!(!valid_cidr("10.0.0.0"));
        assert!(!valid_cidr("example.com/24"));
    }

    #[test]
    fn test_validate() {
        assert!(validate(&spec(&["10.0.0.0/8"])).is_ok());
        assert!(validate(&spec(&[])).is_err());
        assert!(validate(&spec(&["10.0.0.0/8", "nope"])).unwrap_err().contains("nope"));
    }
}
