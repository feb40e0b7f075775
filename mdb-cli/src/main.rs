//! mdb: operate managed-database resources from the command line.
//!
//! Each invocation runs one lifecycle operation and waits for the remote side
//! to finish it. The resulting state is printed as JSON on stdout; logs go to
//! stderr.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use mdb_api::{ClientConfig, EntityType, HttpClient, Scope, TaskType};
use mdb_provider::resources::{
    AllowListResource, AuditLogResource, BackupResource, ClusterResource, DrResource,
    MetricsExporterResource, PitrResource, PrivateEndpointResource, ReadReplicaResource, Resource,
    VpcResource,
};
use mdb_provider::{
    DEFAULT_FAILURE_BUDGET, OpContext, OperationDescriptor, ProviderAuditLogger, ProviderError,
    RetryPolicy, read_task_status,
};
use serde::Serialize;
use tabled::{Table, Tabled};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;
const DEFAULT_MAX_WAIT_SECS: u64 = 3600;

#[derive(Parser, Debug)]
#[command(name = "mdb", version)]
#[command(about = "Manage database clusters through the management API", long_about = None)]
struct Cli {
    /// Management API host, optionally with port
    #[arg(long, env = "MDB_HOST")]
    host: String,

    /// API key sent as a bearer token
    #[arg(long, env = "MDB_API_KEY", hide_env_values = true)]
    api_key: String,

    /// Account ID
    #[arg(long, env = "MDB_ACCOUNT_ID")]
    account_id: String,

    /// Project ID
    #[arg(long, env = "MDB_PROJECT_ID")]
    project_id: String,

    /// Use plain http (local testing only)
    #[arg(long)]
    insecure: bool,

    /// Per-request timeout in seconds
    #[arg(long, default_value = "60")]
    request_timeout: u64,

    /// Seconds between task status checks, for every operation
    #[arg(long)]
    poll_interval: Option<u64>,

    /// Maximum seconds to wait for an operation, for every operation
    #[arg(long)]
    max_wait: Option<u64>,

    /// Consecutive failed status checks tolerated
    #[arg(long, default_value_t = DEFAULT_FAILURE_BUDGET)]
    failure_budget: u32,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Database clusters
    Cluster {
        #[command(subcommand)]
        action: Action,
    },
    /// On-demand backups
    Backup {
        #[command(subcommand)]
        action: Action,
    },
    /// IP allow lists
    AllowList {
        #[command(subcommand)]
        action: Action,
    },
    /// Point-in-time recovery configs (id: <cluster_id>/<config_id>)
    PitrConfig {
        #[command(subcommand)]
        action: Action,
    },
    /// Disaster recovery configs (id: <source_cluster_id>/<dr_id>)
    DrConfig {
        #[command(subcommand)]
        action: Action,
    },
    /// Private service endpoints (id: <cluster_id>/<endpoint_id>)
    PrivateEndpoint {
        #[command(subcommand)]
        action: Action,
    },
    /// Dedicated VPCs
    Vpc {
        #[command(subcommand)]
        action: Action,
    },
    /// Read replicas of a primary cluster (id: <primary_cluster_id>)
    ReadReplicas {
        #[command(subcommand)]
        action: Action,
    },
    /// Metrics exporter association (id: <cluster_id>)
    MetricsExporter {
        #[command(subcommand)]
        action: Action,
    },
    /// Database audit log export (id: <cluster_id>/<exporter_id>)
    DbAuditLogging {
        #[command(subcommand)]
        action: Action,
    },
    /// Background tasks
    Task {
        #[command(subcommand)]
        action: TaskAction,
    },
}

#[derive(Subcommand, Debug)]
enum Action {
    /// Create the resource and wait until it is ready
    Create {
        /// JSON file with the desired configuration
        #[arg(long)]
        spec: PathBuf,
    },
    /// Print the current state
    Read {
        /// Resource ID
        id: String,
    },
    /// Converge the resource to a new configuration
    Update {
        /// Resource ID
        id: String,

        /// JSON file with the desired configuration
        #[arg(long)]
        spec: PathBuf,
    },
    /// Delete the resource and wait until it is gone
    Delete {
        /// Resource ID
        id: String,
    },
}

#[derive(Subcommand, Debug)]
enum TaskAction {
    /// Show the latest task of an operation
    Status {
        /// Entity the task runs against
        #[arg(long)]
        entity_id: String,

        /// CLUSTER, BACKUP or SINGLE_TENANT_VPC
        #[arg(long)]
        entity_type: EntityType,

        /// Operation kind, e.g. CREATE_CLUSTER
        #[arg(long)]
        kind: TaskType,
    },
}

#[derive(Tabled)]
struct TaskRow {
    #[tabled(rename = "ENTITY")]
    entity: String,
    #[tabled(rename = "TYPE")]
    entity_type: String,
    #[tabled(rename = "KIND")]
    kind: String,
    #[tabled(rename = "STATUS")]
    status: String,
}

impl Cli {
    /// Policy applied to every operation when overridden on the command line.
    fn policy_override(&self) -> Option<RetryPolicy> {
        if self.poll_interval.is_none() && self.max_wait.is_none() {
            return None;
        }
        Some(RetryPolicy::new(
            Duration::from_secs(self.poll_interval.unwrap_or(DEFAULT_POLL_INTERVAL_SECS)),
            Duration::from_secs(self.max_wait.unwrap_or(DEFAULT_MAX_WAIT_SECS)),
        ))
    }

    fn client_config(&self) -> ClientConfig {
        ClientConfig {
            use_secure: !self.insecure,
            request_timeout: Duration::from_secs(self.request_timeout),
            ..ClientConfig::new(&self.host, &self.api_key)
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "mdb=info,mdb_provider=info,mdb_api=info,reqwest=warn,hyper=warn".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match execute(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report(&e);
            ExitCode::FAILURE
        }
    }
}

fn report(e: &anyhow::Error) {
    match e.downcast_ref::<ProviderError>() {
        Some(err) => {
            eprintln!("error: {}: {}", err.category(), err);
            if err.remote_outcome_unknown() {
                eprintln!(
                    "note: the operation may still complete remotely; check it with `mdb task status`"
                );
            }
        }
        None => eprintln!("error: {:#}", e),
    }
}

async fn execute(cli: Cli) -> Result<()> {
    let client = HttpClient::new(&cli.client_config()).context("Failed to configure API client")?;
    let scope = Scope::new(&cli.account_id, &cli.project_id);

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            warn!("Received SIGINT, cancelling");
            trigger.cancel();
        }
    });

    let mut cx = OpContext::new(Arc::new(client), scope)
        .with_cancel(cancel)
        .with_audit(Arc::new(ProviderAuditLogger::new("mdb")))
        .with_failure_budget(cli.failure_budget);
    if let Some(policy) = cli.policy_override() {
        info!(interval = ?policy.interval, max_wait = ?policy.max_elapsed, "Using policy override");
        cx = cx.with_policy_override(policy);
    }

    match cli.command {
        Commands::Cluster { action } => run(ClusterResource, &cx, action).await,
        Commands::Backup { action } => run(BackupResource, &cx, action).await,
        Commands::AllowList { action } => run(AllowListResource, &cx, action).await,
        Commands::PitrConfig { action } => run(PitrResource, &cx, action).await,
        Commands::DrConfig { action } => run(DrResource, &cx, action).await,
        Commands::PrivateEndpoint { action } => run(PrivateEndpointResource, &cx, action).await,
        Commands::Vpc { action } => run(VpcResource, &cx, action).await,
        Commands::ReadReplicas { action } => run(ReadReplicaResource, &cx, action).await,
        Commands::MetricsExporter { action } => run(MetricsExporterResource, &cx, action).await,
        Commands::DbAuditLogging { action } => run(AuditLogResource, &cx, action).await,
        Commands::Task { action } => task(&cx, action).await,
    }
}

async fn run<R: Resource>(resource: R, cx: &OpContext, action: Action) -> Result<()> {
    match action {
        Action::Create { spec } => {
            let spec: R::Spec = load_spec(&spec)?;
            let state = resource.create(cx, &spec).await?;
            print_json(&state)
        }
        Action::Read { id } => match resource.read(cx, &id).await? {
            Some(state) => print_json(&state),
            None => bail!("{} {} not found", R::NAME, id),
        },
        Action::Update { id, spec } => {
            let spec: R::Spec = load_spec(&spec)?;
            let state = resource.update(cx, &id, &spec).await?;
            print_json(&state)
        }
        Action::Delete { id } => {
            resource.delete(cx, &id).await?;
            info!("Deleted {} {}", R::NAME, id);
            Ok(())
        }
    }
}

async fn task(cx: &OpContext, action: TaskAction) -> Result<()> {
    let TaskAction::Status {
        entity_id,
        entity_type,
        kind,
    } = action;

    let descriptor = OperationDescriptor {
        scope: cx.scope().clone(),
        entity_id,
        entity_type,
        kind,
    };
    let status = read_task_status(cx.api(), &descriptor).await?;

    let row = TaskRow {
        entity: descriptor.entity_id,
        entity_type: descriptor.entity_type.to_string(),
        kind: descriptor.kind.to_string(),
        status: status.to_string(),
    };
    println!("{}", Table::new(vec![row]));
    Ok(())
}

fn load_spec<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Invalid spec in {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
