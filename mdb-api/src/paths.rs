//! Endpoint paths, relative to the API root (`/api/public/v1`).

use serde::{Deserialize, Serialize};

/// Account and project every request is addressed to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Scope {
    pub account_id: String,
    pub project_id: String,
}

impl Scope {
    pub fn new(account_id: impl Into<String>, project_id: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            project_id: project_id.into(),
        }
    }

    fn base(&self) -> String {
        format!(
            "accounts/{}/projects/{}",
            self.account_id, self.project_id
        )
    }

    // =========================================================================
    // Tasks
    // =========================================================================

    pub fn tasks(&self) -> String {
        format!("{}/tasks", self.base())
    }

    // =========================================================================
    // Clusters
    // =========================================================================

    pub fn clusters(&self) -> String {
        format!("{}/clusters", self.base())
    }

    pub fn cluster(&self, cluster_id: &str) -> String {
        format!("{}/clusters/{}", self.base(), cluster_id)
    }

    pub fn cluster_pause(&self, cluster_id: &str) -> String {
        format!("{}/pause", self.cluster(cluster_id))
    }

    pub fn cluster_resume(&self, cluster_id: &str) -> String {
        format!("{}/resume", self.cluster(cluster_id))
    }

    pub fn cluster_allow_lists(&self, cluster_id: &str) -> String {
        format!("{}/allow-lists", self.cluster(cluster_id))
    }

    pub fn read_replicas(&self, cluster_id: &str) -> String {
        format!("{}/read-replicas", self.cluster(cluster_id))
    }

    pub fn metrics_exporter(&self, cluster_id: &str) -> String {
        format!("{}/metrics-exporter", self.cluster(cluster_id))
    }

    pub fn pitr_configs(&self, cluster_id: &str) -> String {
        format!("{}/pitr-configs", self.cluster(cluster_id))
    }

    pub fn pitr_config(&self, cluster_id: &str, config_id: &str) -> String {
        format!("{}/{}", self.pitr_configs(cluster_id), config_id)
    }

    pub fn dr_configs(&self, cluster_id: &str) -> String {
        format!("{}/disaster-recovery", self.cluster(cluster_id))
    }

    pub fn dr_config(&self, cluster_id: &str, dr_id: &str) -> String {
        format!("{}/{}", self.dr_configs(cluster_id), dr_id)
    }

    pub fn private_endpoints(&self, cluster_id: &str) -> String {
        format!("{}/private-service-endpoints", self.cluster(cluster_id))
    }

    pub fn private_endpoint(&self, cluster_id: &str, endpoint_id: &str) -> String {
        format!("{}/{}", self.private_endpoints(cluster_id), endpoint_id)
    }

    pub fn audit_log_exporters(&self, cluster_id: &str) -> String {
        format!("{}/db-audit-log-exporters", self.cluster(cluster_id))
    }

    pub fn audit_log_exporter(&self, cluster_id: &str, exporter_id: &str) -> String {
        format!("{}/{}", self.audit_log_exporters(cluster_id), exporter_id)
    }

    // =========================================================================
    // Project-level resources
    // =========================================================================

    pub fn backups(&self) -> String {
        format!("{}/backups", self.base())
    }

    pub fn backup(&self, backup_id: &str) -> String {
        format!("{}/backups/{}", self.base(), backup_id)
    }

    pub fn allow_lists(&self) -> String {
        format!("{}/allow-lists", self.base())
    }

    pub fn allow_list(&self, allow_list_id: &str) -> String {
        format!("{}/allow-lists/{}", self.base(), allow_list_id)
    }

    pub fn vpcs(&self) -> String {
        format!("{}/vpcs", self.base())
    }

    pub fn vpc(&self, vpc_id: &str) -> String {
        format!("{}/vpcs/{}", self.base(), vpc_id)
    }
}
