//! On-demand etcd snapshot creation and restore

use std::str::FromStr;
use std::time::Duration;

use serde_json::json;
use tracing::info;

use crate::control_plane::{decode_status, spec_generation, ControlPlaneClient, ControlPlaneStatus};
use crate::mutation::{confirm_phase_sequence, next_generation, wait_for_ready};
use crate::phase::{SnapshotCreatePhase, SnapshotRestorePhase};
use gantry_common::Error;

fn create_phase(status: &ControlPlaneStatus) -> Option<&str> {
    status.etcd_snapshot_create_phase.as_deref()
}

fn create_echo(status: &ControlPlaneStatus) -> Option<i64> {
    status.etcd_snapshot_create.map(|e| e.generation)
}

fn restore_phase(status: &ControlPlaneStatus) -> Option<&str> {
    status.etcd_snapshot_restore_phase.as_deref()
}

fn restore_echo(status: &ControlPlaneStatus) -> Option<i64> {
    status.etcd_snapshot_restore.map(|e| e.generation)
}

/// How much cluster configuration a restore rolls back alongside etcd data
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RestoreScope {
    /// Restore etcd data only
    #[default]
    EtcdOnly,
    /// Restore etcd data and the Kubernetes version
    KubernetesVersion,
    /// Restore etcd data, the Kubernetes version, and the cluster config
    All,
}

impl RestoreScope {
    /// The desired-state spelling of this scope
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EtcdOnly => "none",
            Self::KubernetesVersion => "kubernetesVersion",
            Self::All => "all",
        }
    }
}

impl FromStr for RestoreScope {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s {
            "none" | "etcd" => Ok(Self::EtcdOnly),
            "kubernetesVersion" | "kubernetes-version" => Ok(Self::KubernetesVersion),
            "all" => Ok(Self::All),
            other => Err(Error::validation(format!(
                "unknown restore scope {:?}, expected none, kubernetes-version, or all",
                other
            ))),
        }
    }
}

/// Take an on-demand etcd snapshot and confirm every phase of its creation.
///
/// Returns the generation stamped on the request, which also identifies
/// the snapshot in the control plane's snapshot listing.
pub async fn create_snapshot(
    client: &dyn ControlPlaneClient,
    name: &str,
    timeout: Duration,
) -> Result<i64, Error> {
    let current = client.get(name).await?;
    let status = decode_status(&current)?;
    let generation = next_generation(
        spec_generation(&current, "etcdSnapshotCreate"),
        create_echo(&status),
    );

    info!(resource = %name, generation, "requesting etcd snapshot");
    client
        .merge_patch(
            name,
            json!({ "spec": { "etcdSnapshotCreate": { "generation": generation } } }),
        )
        .await?;

    confirm_phase_sequence::<SnapshotCreatePhase>(
        client,
        name,
        generation,
        timeout,
        create_phase,
        create_echo,
    )
    .await?;

    wait_for_ready(client, name, timeout).await?;
    info!(resource = %name, generation, "etcd snapshot complete");
    Ok(generation)
}

/// Restore a named etcd snapshot and confirm every phase of the restore.
///
/// The snapshot name must refer to a snapshot the control plane knows;
/// `scope` controls how much cluster configuration rolls back with it.
pub async fn restore_snapshot(
    client: &dyn ControlPlaneClient,
    name: &str,
    snapshot: &str,
    scope: RestoreScope,
    timeout: Duration,
) -> Result<i64, Error> {
    if snapshot.is_empty() {
        return Err(Error::validation_for_field(
            "spec.etcdSnapshotRestore.name",
            "snapshot name must not be empty",
        ));
    }

    let current = client.get(name).await?;
    let status = decode_status(&current)?;
    let generation = next_generation(
        spec_generation(&current, "etcdSnapshotRestore"),
        restore_echo(&status),
    );

    info!(
        resource = %name,
        snapshot = %snapshot,
        scope = scope.as_str(),
        generation,
        "requesting etcd snapshot restore"
    );
    client
        .merge_patch(
            name,
            json!({
                "spec": {
                    "etcdSnapshotRestore": {
                        "generation": generation,
                        "name": snapshot,
                        "restoreRKEConfig": scope.as_str(),
                    }
                }
            }),
        )
        .await?;

    confirm_phase_sequence::<SnapshotRestorePhase>(
        client,
        name,
        generation,
        timeout,
        restore_phase,
        restore_echo,
    )
    .await?;

    wait_for_ready(client, name, timeout).await?;
    info!(resource = %name, generation, "etcd snapshot restore complete");
    Ok(generation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control_plane::MockControlPlaneClient;
    use crate::mutation::testutil::*;
    use crate::phase::PhaseSequence;
    use mockall::Sequence;

    const TIMEOUT: Duration = Duration::from_secs(60);

    #[tokio::test]
    async fn create_walks_every_phase_then_readiness() {
        let mut client = MockControlPlaneClient::new();

        client.expect_get().times(1).returning(|_| {
            Ok(cp_object(serde_json::json!({})))
        });
        client
            .expect_merge_patch()
            .withf(|name, patch| {
                name == "test-cluster"
                    && patch["spec"]["etcdSnapshotCreate"]["generation"] == 1
            })
            .times(1)
            .returning(|_, _| Ok(()));

        let mut seq = Sequence::new();
        for phase in SnapshotCreatePhase::SEQUENCE {
            let phase_name = phase.name();
            client
                .expect_watch()
                .times(1)
                .in_sequence(&mut seq)
                .return_once(move |_, _| {
                    Ok(stream_of(vec![status_event(serde_json::json!({
                        "etcdSnapshotCreatePhase": phase_name,
                        "etcdSnapshotCreate": { "generation": 1 }
                    }))]))
                });
        }
        client
            .expect_watch()
            .times(1)
            .in_sequence(&mut seq)
            .return_once(|_, _| Ok(stream_of(vec![ready_event()])));

        let generation = create_snapshot(&client, "test-cluster", TIMEOUT)
            .await
            .unwrap();
        assert_eq!(generation, 1);
    }

    #[tokio::test]
    async fn create_bumps_generation_past_spec_and_echo() {
        let mut client = MockControlPlaneClient::new();

        client.expect_get().times(1).returning(|_| {
            Ok(serde_json::from_value(serde_json::json!({
                "apiVersion": "rke.cattle.io/v1",
                "kind": "RKEControlPlane",
                "metadata": { "name": "test-cluster" },
                "spec": { "etcdSnapshotCreate": { "generation": 2 } },
                "status": { "etcdSnapshotCreate": { "generation": 2 } },
            }))
            .unwrap())
        });
        client
            .expect_merge_patch()
            .withf(|_, patch| patch["spec"]["etcdSnapshotCreate"]["generation"] == 3)
            .times(1)
            .returning(|_, _| Ok(()));
        client.expect_watch().returning(|_, _| {
            Ok(stream_of(vec![
                status_event(serde_json::json!({
                    "etcdSnapshotCreatePhase": "Finished",
                    "etcdSnapshotCreate": { "generation": 3 },
                    "ready": true,
                })),
            ]))
        });

        let generation = create_snapshot(&client, "test-cluster", TIMEOUT)
            .await
            .unwrap();
        assert_eq!(generation, 3);
    }

    #[tokio::test]
    async fn create_aborts_when_a_phase_wait_times_out() {
        let mut client = MockControlPlaneClient::new();

        client
            .expect_get()
            .returning(|_| Ok(cp_object(serde_json::json!({}))));
        client.expect_merge_patch().returning(|_, _| Ok(()));

        let mut seq = Sequence::new();
        client
            .expect_watch()
            .times(1)
            .in_sequence(&mut seq)
            .return_once(|_, _| {
                Ok(stream_of(vec![status_event(serde_json::json!({
                    "etcdSnapshotCreatePhase": "Started",
                    "etcdSnapshotCreate": { "generation": 1 }
                }))]))
            });
        // Shutdown never shows up; the stream closes at the watch timeout.
        client
            .expect_watch()
            .times(1)
            .in_sequence(&mut seq)
            .return_once(|_, _| Ok(stream_of(vec![])));

        let err = create_snapshot(&client, "test-cluster", TIMEOUT)
            .await
            .unwrap_err();
        assert!(err.is_timeout());
    }

    #[tokio::test]
    async fn restore_requires_a_snapshot_name() {
        let client = MockControlPlaneClient::new();
        let err = restore_snapshot(&client, "test-cluster", "", RestoreScope::All, TIMEOUT)
            .await
            .unwrap_err();
        match err {
            Error::Validation { field, .. } => {
                assert_eq!(field.as_deref(), Some("spec.etcdSnapshotRestore.name"));
            }
            other => panic!("expected Validation error, got: {}", other),
        }
    }

    #[tokio::test]
    async fn restore_submits_scope_and_walks_phases() {
        let mut client = MockControlPlaneClient::new();

        client
            .expect_get()
            .times(1)
            .returning(|_| Ok(cp_object(serde_json::json!({}))));
        client
            .expect_merge_patch()
            .withf(|_, patch| {
                let restore = &patch["spec"]["etcdSnapshotRestore"];
                restore["generation"] == 1
                    && restore["name"] == "on-demand-snap-1"
                    && restore["restoreRKEConfig"] == "all"
            })
            .times(1)
            .returning(|_, _| Ok(()));

        let mut seq = Sequence::new();
        for phase in SnapshotRestorePhase::SEQUENCE {
            let phase_name = phase.name();
            client
                .expect_watch()
                .times(1)
                .in_sequence(&mut seq)
                .return_once(move |_, _| {
                    Ok(stream_of(vec![status_event(serde_json::json!({
                        "etcdSnapshotRestorePhase": phase_name,
                        "etcdSnapshotRestore": { "generation": 1 }
                    }))]))
                });
        }
        client
            .expect_watch()
            .times(1)
            .in_sequence(&mut seq)
            .return_once(|_, _| Ok(stream_of(vec![ready_event()])));

        let generation = restore_snapshot(
            &client,
            "test-cluster",
            "on-demand-snap-1",
            RestoreScope::All,
            TIMEOUT,
        )
        .await
        .unwrap();
        assert_eq!(generation, 1);
    }

    #[tokio::test]
    async fn restore_surfaces_phase_failure() {
        let mut client = MockControlPlaneClient::new();

        client
            .expect_get()
            .returning(|_| Ok(cp_object(serde_json::json!({}))));
        client.expect_merge_patch().returning(|_, _| Ok(()));
        client.expect_watch().times(1).return_once(|_, _| {
            Ok(stream_of(vec![status_event(serde_json::json!({
                "etcdSnapshotRestorePhase": "Failed",
                "etcdSnapshotRestore": { "generation": 1 }
            }))]))
        });

        let err = restore_snapshot(
            &client,
            "test-cluster",
            "on-demand-snap-1",
            RestoreScope::EtcdOnly,
            TIMEOUT,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::PhaseFailed { .. }));
        assert!(err.to_string().contains("etcd snapshot restore"));
    }

    #[test]
    fn restore_scope_spellings() {
        assert_eq!(RestoreScope::EtcdOnly.as_str(), "none");
        assert_eq!(RestoreScope::KubernetesVersion.as_str(), "kubernetesVersion");
        assert_eq!(RestoreScope::All.as_str(), "all");

        assert_eq!("etcd".parse::<RestoreScope>().unwrap(), RestoreScope::EtcdOnly);
        assert_eq!(
            "kubernetes-version".parse::<RestoreScope>().unwrap(),
            RestoreScope::KubernetesVersion
        );
        assert_eq!("all".parse::<RestoreScope>().unwrap(), RestoreScope::All);
        assert!("everything".parse::<RestoreScope>().is_err());
    }
}
