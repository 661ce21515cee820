//! Gantry - drive one verified control-plane mutation from the command line

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};

use gantry::control_plane::{ControlPlaneClientImpl, DEFAULT_NAMESPACE};
use gantry::mutation::{
    cluster_secret_count, create_snapshot, restore_snapshot, rotate_certificates,
    rotate_encryption_keys, wait_for_ready, RestoreScope,
};
use gantry_common::{kube_utils, telemetry};

/// Gantry - verified mutations against a managed cluster's control plane
#[derive(Parser, Debug)]
#[command(name = "gantry", version, about, long_about = None)]
struct Cli {
    /// Path to a kubeconfig for the management cluster
    ///
    /// Falls back to in-cluster config when omitted.
    #[arg(long, env = "KUBECONFIG", global = true)]
    kubeconfig: Option<PathBuf>,

    /// Namespace holding the control-plane resource
    #[arg(long, default_value = DEFAULT_NAMESPACE, global = true)]
    namespace: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Take an on-demand etcd snapshot and verify every creation phase
    SnapshotCreate {
        /// Name of the control-plane resource (the cluster under test)
        #[arg(long)]
        name: String,

        /// Budget for each phase wait, in seconds
        #[arg(long, default_value = "600")]
        timeout_secs: u64,
    },

    /// Restore a named etcd snapshot and verify every restore phase
    SnapshotRestore {
        /// Name of the control-plane resource
        #[arg(long)]
        name: String,

        /// Name of the snapshot to restore
        #[arg(long)]
        snapshot: String,

        /// Restore scope: none, kubernetes-version, or all
        #[arg(long, default_value = "none")]
        scope: String,

        /// Budget for each phase wait, in seconds
        #[arg(long, default_value = "600")]
        timeout_secs: u64,
    },

    /// Rotate cluster certificates and wait for the rotation counter
    RotateCertificates {
        /// Name of the control-plane resource
        #[arg(long)]
        name: String,

        /// Limit rotation to these services (repeatable; empty = all)
        #[arg(long = "service")]
        services: Vec<String>,

        /// Wait budget, in seconds
        #[arg(long, default_value = "600")]
        timeout_secs: u64,
    },

    /// Rotate secrets-encryption keys and verify all seven phases
    RotateEncryptionKeys {
        /// Name of the control-plane resource
        #[arg(long)]
        name: String,

        /// Secret count used to size the wait budget
        ///
        /// Counted from the cluster when omitted.
        #[arg(long)]
        secrets: Option<u64>,
    },

    /// Wait for the control plane to report steady state
    WaitReady {
        /// Name of the control-plane resource
        #[arg(long)]
        name: String,

        /// Wait budget, in seconds
        #[arg(long, default_value = "600")]
        timeout_secs: u64,

        /// Dump the final decoded status as YAML
        #[arg(long)]
        dump_status: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init_logging().map_err(|e| anyhow::anyhow!("{}", e))?;

    let cli = Cli::parse();

    let kube_client = kube_utils::create_client(cli.kubeconfig.as_deref())
        .await
        .map_err(|e| anyhow::anyhow!("failed to create kube client: {}", e))?;
    let client = ControlPlaneClientImpl::discover(kube_client.clone(), &cli.namespace)
        .await
        .map_err(|e| anyhow::anyhow!("control-plane resource not available: {}", e))?;

    match cli.command {
        Commands::SnapshotCreate { name, timeout_secs } => {
            let generation =
                create_snapshot(&client, &name, Duration::from_secs(timeout_secs)).await?;
            println!("snapshot created (generation {})", generation);
        }
        Commands::SnapshotRestore {
            name,
            snapshot,
            scope,
            timeout_secs,
        } => {
            let scope: RestoreScope = scope.parse()?;
            let generation = restore_snapshot(
                &client,
                &name,
                &snapshot,
                scope,
                Duration::from_secs(timeout_secs),
            )
            .await?;
            println!("snapshot restored (generation {})", generation);
        }
        Commands::RotateCertificates {
            name,
            services,
            timeout_secs,
        } => {
            let generation = rotate_certificates(
                &client,
                &name,
                &services,
                Duration::from_secs(timeout_secs),
            )
            .await?;
            println!("certificates rotated (generation {})", generation);
        }
        Commands::RotateEncryptionKeys { name, secrets } => {
            let secrets = match secrets {
                Some(count) => count,
                None => cluster_secret_count(&kube_client).await?,
            };
            let generation = rotate_encryption_keys(&client, &name, secrets).await?;
            println!("encryption keys rotated (generation {})", generation);
        }
        Commands::WaitReady {
            name,
            timeout_secs,
            dump_status,
        } => {
            use gantry::control_plane::{decode_status, ControlPlaneClient};

            wait_for_ready(&client, &name, Duration::from_secs(timeout_secs)).await?;
            if dump_status {
                let obj = client.get(&name).await?;
                let status = decode_status(&obj)?;
                println!("{}", serde_yaml::to_string(&status)?);
            } else {
                println!("control plane ready");
            }
        }
    }

    Ok(())
}
