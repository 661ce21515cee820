//! End-to-end stories for verified control-plane mutations
//!
//! Each test drives a full mutation against a live downstream cluster and
//! relies on the drivers' own phase confirmation for its assertions: a
//! skipped phase, a Failed sentinel, or a stalled control plane surfaces
//! as a driver error and fails the test.

use std::time::Duration;

use gantry::mutation::{
    cluster_secret_count, create_snapshot, restore_snapshot, rotate_certificates,
    rotate_encryption_keys, wait_for_ready, RestoreScope,
};
use gantry::DEFAULT_PHASE_TIMEOUT as PHASE_TIMEOUT;

use super::helpers::{control_plane_name, management_cluster};

/// Story: an on-demand snapshot passes through every creation phase and
/// the cluster returns to steady state.
#[tokio::test]
#[ignore = "requires a management cluster - run with: cargo test --test e2e -- --ignored"]
async fn story_snapshot_create_walks_all_phases() {
    let (_, control_plane) = management_cluster().await;
    let name = control_plane_name();

    let generation = create_snapshot(&control_plane, &name, PHASE_TIMEOUT)
        .await
        .expect("snapshot creation should complete");
    assert!(generation >= 1);

    // The driver already confirmed readiness; a second wait must be
    // satisfied immediately from current state.
    wait_for_ready(&control_plane, &name, Duration::from_secs(60))
        .await
        .expect("cluster should still be ready after snapshot");
}

/// Story: a snapshot taken moments ago can be restored, and the restore
/// passes through every phase including the etcd data rewrite.
#[tokio::test]
#[ignore = "requires a management cluster - run with: cargo test --test e2e -- --ignored"]
async fn story_snapshot_restore_round_trip() {
    let (_, control_plane) = management_cluster().await;
    let name = control_plane_name();

    create_snapshot(&control_plane, &name, PHASE_TIMEOUT)
        .await
        .expect("snapshot creation should complete");

    let snapshot = std::env::var("GANTRY_SNAPSHOT_NAME")
        .expect("set GANTRY_SNAPSHOT_NAME to the snapshot to restore");
    restore_snapshot(
        &control_plane,
        &name,
        &snapshot,
        RestoreScope::EtcdOnly,
        PHASE_TIMEOUT,
    )
    .await
    .expect("snapshot restore should complete");
}

/// Story: rotating certificates bumps the rotation counter and leaves the
/// cluster ready.
#[tokio::test]
#[ignore = "requires a management cluster - run with: cargo test --test e2e -- --ignored"]
async fn story_certificate_rotation_bumps_counter() {
    let (_, control_plane) = management_cluster().await;
    let name = control_plane_name();

    let first = rotate_certificates(&control_plane, &name, &[], PHASE_TIMEOUT)
        .await
        .expect("first rotation should complete");
    let second = rotate_certificates(&control_plane, &name, &[], PHASE_TIMEOUT)
        .await
        .expect("second rotation should complete");

    assert!(
        second > first,
        "each rotation must use a strictly greater generation"
    );
}

/// Story: encryption-key rotation sizes its budget from the cluster's
/// secret count and confirms all seven phases.
#[tokio::test]
#[ignore = "requires a management cluster - run with: cargo test --test e2e -- --ignored"]
async fn story_encryption_key_rotation_scales_budget() {
    let (client, control_plane) = management_cluster().await;
    let name = control_plane_name();

    let secrets = cluster_secret_count(&client)
        .await
        .expect("secret count should be listable");

    rotate_encryption_keys(&control_plane, &name, secrets)
        .await
        .expect("encryption key rotation should complete");
}
