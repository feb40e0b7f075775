//! Wire models of the management API.
//!
//! Success payloads arrive wrapped as `{"data": ...}`; the client unwraps the
//! envelope, so these types describe the inner `data` value only.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::paths::Scope;

// =============================================================================
// Tasks
// =============================================================================

/// Kind of entity a background task runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityType {
    Cluster,
    Backup,
    SingleTenantVpc,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Cluster => "CLUSTER",
            EntityType::Backup => "BACKUP",
            EntityType::SingleTenantVpc => "SINGLE_TENANT_VPC",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EntityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "CLUSTER" => Ok(EntityType::Cluster),
            "BACKUP" => Ok(EntityType::Backup),
            "SINGLE_TENANT_VPC" | "VPC" => Ok(EntityType::SingleTenantVpc),
            other => Err(format!("unknown entity type: {}", other)),
        }
    }
}

/// Kind of background operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskType {
    CreateCluster,
    EditCluster,
    DeleteCluster,
    PauseCluster,
    ResumeCluster,
    EditAllowList,
    CreateBackup,
    DeleteBackup,
    EnableDbPitr,
    UpdateDbPitr,
    DisableDbPitr,
    CreateDr,
    EditDr,
    DeleteDr,
    CreatePrivateServiceEndpoint,
    EditPrivateServiceEndpoint,
    DeletePrivateServiceEndpoint,
    CreateVpc,
    DeleteVpc,
    CreateReadReplica,
    EditReadReplica,
    DeleteReadReplica,
    AssociateMetricsExporter,
    RemoveMetricsExporter,
    EnableDbAuditLogging,
    EditDbAuditLogging,
    DisableDbAuditLogging,
}

impl TaskType {
    pub const ALL: [TaskType; 27] = [
        TaskType::CreateCluster,
        TaskType::EditCluster,
        TaskType::DeleteCluster,
        TaskType::PauseCluster,
        TaskType::ResumeCluster,
        TaskType::EditAllowList,
        TaskType::CreateBackup,
        TaskType::DeleteBackup,
        TaskType::EnableDbPitr,
        TaskType::UpdateDbPitr,
        TaskType::DisableDbPitr,
        TaskType::CreateDr,
        TaskType::EditDr,
        TaskType::DeleteDr,
        TaskType::CreatePrivateServiceEndpoint,
        TaskType::EditPrivateServiceEndpoint,
        TaskType::DeletePrivateServiceEndpoint,
        TaskType::CreateVpc,
        TaskType::DeleteVpc,
        TaskType::CreateReadReplica,
        TaskType::EditReadReplica,
        TaskType::DeleteReadReplica,
        TaskType::AssociateMetricsExporter,
        TaskType::RemoveMetricsExporter,
        TaskType::EnableDbAuditLogging,
        TaskType::EditDbAuditLogging,
        TaskType::DisableDbAuditLogging,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::CreateCluster => "CREATE_CLUSTER",
            TaskType::EditCluster => "EDIT_CLUSTER",
            TaskType::DeleteCluster => "DELETE_CLUSTER",
            TaskType::PauseCluster => "PAUSE_CLUSTER",
            TaskType::ResumeCluster => "RESUME_CLUSTER",
            TaskType::EditAllowList => "EDIT_ALLOW_LIST",
            TaskType::CreateBackup => "CREATE_BACKUP",
            TaskType::DeleteBackup => "DELETE_BACKUP",
            TaskType::EnableDbPitr => "ENABLE_DB_PITR",
            TaskType::UpdateDbPitr => "UPDATE_DB_PITR",
            TaskType::DisableDbPitr => "DISABLE_DB_PITR",
            TaskType::CreateDr => "CREATE_DR",
            TaskType::EditDr => "EDIT_DR",
            TaskType::DeleteDr => "DELETE_DR",
            TaskType::CreatePrivateServiceEndpoint => "CREATE_PRIVATE_SERVICE_ENDPOINT",
            TaskType::EditPrivateServiceEndpoint => "EDIT_PRIVATE_SERVICE_ENDPOINT",
            TaskType::DeletePrivateServiceEndpoint => "DELETE_PRIVATE_SERVICE_ENDPOINT",
            TaskType::CreateVpc => "CREATE_VPC",
            TaskType::DeleteVpc => "DELETE_VPC",
            TaskType::CreateReadReplica => "CREATE_READ_REPLICA",
            TaskType::EditReadReplica => "EDIT_READ_REPLICA",
            TaskType::DeleteReadReplica => "DELETE_READ_REPLICA",
            TaskType::AssociateMetricsExporter => "ASSOCIATE_METRICS_EXPORTER",
            TaskType::RemoveMetricsExporter => "REMOVE_METRICS_EXPORTER",
            TaskType::EnableDbAuditLogging => "ENABLE_DB_AUDIT_LOGGING",
            TaskType::EditDbAuditLogging => "EDIT_DB_AUDIT_LOGGING",
            TaskType::DisableDbAuditLogging => "DISABLE_DB_AUDIT_LOGGING",
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TaskType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.to_ascii_uppercase().replace('-', "_");
        TaskType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == wanted)
            .ok_or_else(|| format!("unknown task type: {}", s))
    }
}

/// Coordinates of the task to look up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskQuery {
    pub scope: Scope,
    pub entity_id: String,
    pub entity_type: EntityType,
    pub task_type: TaskType,
}

/// A background task as reported by the remote side, newest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub entity_id: String,
    pub entity_type: String,
    pub task_type: String,
    /// `IN_PROGRESS`, `SUCCEEDED`, `FAILED` or another non-terminal value.
    pub state: String,
    #[serde(default)]
    pub created_on: Option<String>,
    #[serde(default)]
    pub completed_on: Option<String>,
    /// Human-readable failure detail, set when `state` is `FAILED`.
    #[serde(default)]
    pub detail: Option<String>,
}

// =============================================================================
// Clusters
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloudInfo {
    pub code: String,
    pub region: String,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeInfo {
    pub num_cores: u32,
    pub memory_mb: u64,
    pub disk_size_gb: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterSizing {
    pub cluster_tier: String,
    pub num_nodes: u32,
    pub node_info: NodeInfo,
    pub fault_tolerance: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SoftwareInfo {
    #[serde(default)]
    pub track_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClusterRegionInfo {
    pub region: String,
    pub num_nodes: u32,
    #[serde(default)]
    pub vpc_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterSpec {
    pub name: String,
    pub cloud_info: CloudInfo,
    pub cluster_info: ClusterSizing,
    #[serde(default)]
    pub software_info: SoftwareInfo,
    #[serde(default)]
    pub cluster_region_info: Vec<ClusterRegionInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterEndpoint {
    pub region: String,
    pub host: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterInfo {
    pub id: String,
    /// e.g. `ACTIVE`, `PAUSED`, `CREATING`.
    pub state: String,
    #[serde(default)]
    pub software_version: Option<String>,
    #[serde(default)]
    pub endpoints: Vec<ClusterEndpoint>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterData {
    pub spec: ClusterSpec,
    pub info: ClusterInfo,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateClusterRequest {
    pub cluster_spec: ClusterSpec,
    #[serde(default)]
    pub allow_list_ids: Vec<String>,
}

// =============================================================================
// Backups
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupSpec {
    pub cluster_id: String,
    #[serde(default)]
    pub description: Option<String>,
    pub retention_period_in_days: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupInfo {
    pub id: String,
    pub state: String,
    #[serde(default)]
    pub size_in_bytes: Option<u64>,
    #[serde(default)]
    pub created_on: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupData {
    pub spec: BackupSpec,
    pub info: BackupInfo,
}

// =============================================================================
// Allow lists
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowListSpec {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub allow_list: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowListInfo {
    pub id: String,
    #[serde(default)]
    pub cluster_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowListData {
    pub spec: AllowListSpec,
    pub info: AllowListInfo,
}

// =============================================================================
// Point-in-time recovery
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PitrConfigSpec {
    pub namespace_name: String,
    /// `YSQL` or `YCQL`.
    pub namespace_type: String,
    pub retention_period_in_days: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatePitrConfigsRequest {
    pub pitr_config_specs: Vec<PitrConfigSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdatePitrConfigRequest {
    pub retention_period_in_days: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PitrConfigData {
    pub id: String,
    pub spec: PitrConfigSpec,
    pub state: String,
    #[serde(default)]
    pub earliest_recovery_time_millis: Option<i64>,
}

// =============================================================================
// Disaster recovery
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrSpec {
    pub name: String,
    pub target_cluster_id: String,
    pub databases: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrInfo {
    pub id: String,
    pub source_cluster_id: String,
    pub state: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrData {
    pub spec: DrSpec,
    pub info: DrInfo,
}

// =============================================================================
// Private service endpoints
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivateEndpointSpec {
    pub cluster_region_info_id: String,
    pub security_principals: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivateEndpointData {
    pub id: String,
    pub spec: PrivateEndpointSpec,
    pub state: String,
    #[serde(default)]
    pub service_name: Option<String>,
}

// =============================================================================
// VPCs
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VpcRegionSpec {
    pub region: String,
    #[serde(default)]
    pub cidr: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VpcSpec {
    pub name: String,
    pub cloud: String,
    #[serde(default)]
    pub global_cidr: Option<String>,
    #[serde(default)]
    pub region_specs: Vec<VpcRegionSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VpcInfo {
    pub id: String,
    pub state: String,
    #[serde(default)]
    pub cluster_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VpcData {
    pub spec: VpcSpec,
    pub info: VpcInfo,
}

// =============================================================================
// Read replicas
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ReadReplicaSpec {
    pub region: String,
    pub num_nodes: u32,
    pub node_info: NodeInfo,
    #[serde(default)]
    pub vpc_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadReplicasRequest {
    pub read_replica_specs: Vec<ReadReplicaSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadReplicasData {
    pub primary_cluster_id: String,
    pub read_replica_specs: Vec<ReadReplicaSpec>,
    #[serde(default)]
    pub endpoints: Vec<ClusterEndpoint>,
}

// =============================================================================
// Telemetry and logging
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsExporterRequest {
    pub exporter_config_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsExporterData {
    pub exporter_config_id: String,
    pub state: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditLogYsqlConfig {
    pub log_level: String,
    pub statement_classes: Vec<String>,
    #[serde(default)]
    pub log_catalog: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditLogExporterSpec {
    pub integration_id: String,
    pub ysql_config: AuditLogYsqlConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditLogExporterData {
    pub id: String,
    pub cluster_id: String,
    pub spec: AuditLogExporterSpec,
    pub state: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_type_parse_accepts_kebab_and_lower_case() {
        assert_eq!(
            "edit-allow-list".parse::<TaskType>().unwrap(),
            TaskType::EditAllowList
        );
        assert_eq!(
            "CREATE_PRIVATE_SERVICE_ENDPOINT".parse::<TaskType>().unwrap(),
            TaskType::CreatePrivateServiceEndpoint
        );
        assert!("REBOOT_CLUSTER".parse::<TaskType>().is_err());
    }

    #[test]
    fn test_wire_names_match_serde() {
        for t in TaskType::ALL {
            let json = serde_json::to_value(t).unwrap();
            assert_eq!(json.as_str(), Some(t.as_str()));
        }
        let json = serde_json::to_value(EntityType::SingleTenantVpc).unwrap();
        assert_eq!(json.as_str(), Some("SINGLE_TENANT_VPC"));
    }

    #[test]
    fn test_task_tolerates_missing_timestamps() {
        let task: Task = serde_json::from_value(serde_json::json!({
            "id": "t1",
            "entity_id": "c1",
            "entity_type": "CLUSTER",
            "task_type": "CREATE_CLUSTER",
            "state": "IN_PROGRESS"
        }))
        .unwrap();
        assert_eq!(task.state, "IN_PROGRESS");
        assert!(task.completed_on.is_none());
    }
}
