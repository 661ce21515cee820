//! Encryption-key rotation
//!
//! The longest-running mutation: after rotating the key, the control plane
//! rewrites every stored secret under it, rate-limited to a handful of
//! secrets per second. The wait budget therefore scales with the number of
//! secrets in the cluster instead of using a fixed constant.

use std::time::Duration;

use k8s_openapi::api::core::v1::Secret;
use kube::api::{Api, ListParams};
use serde_json::json;
use tracing::info;

use crate::control_plane::{decode_status, spec_generation, ControlPlaneClient, ControlPlaneStatus};
use crate::mutation::{confirm_phase_sequence, next_generation, wait_for_ready};
use crate::phase::EncryptionKeyRotationPhase;
use gantry_common::Error;

/// Observed re-encryption throughput of the control plane
pub const REENCRYPT_SECRETS_PER_SECOND: u64 = 5;

/// Budget floor covering the restart phases regardless of data volume
pub const BASE_ROTATION_TIMEOUT: Duration = Duration::from_secs(600);

fn rotation_phase(status: &ControlPlaneStatus) -> Option<&str> {
    status.rotate_encryption_keys_phase.as_deref()
}

fn rotation_echo(status: &ControlPlaneStatus) -> Option<i64> {
    status.rotate_encryption_keys.map(|e| e.generation)
}

/// Wait budget for one phase of a rotation over `secret_count` secrets
pub fn reencrypt_budget(secret_count: u64) -> Duration {
    BASE_ROTATION_TIMEOUT + Duration::from_secs(secret_count / REENCRYPT_SECRETS_PER_SECOND)
}

/// Count the secrets the rotation will have to rewrite.
///
/// Metadata-only list; secret payloads never leave the server.
pub async fn cluster_secret_count(client: &kube::Client) -> Result<u64, Error> {
    let secrets: Api<Secret> = Api::all(client.clone());
    let listing = secrets.list_metadata(&ListParams::default()).await?;
    Ok(listing.items.len() as u64)
}

/// Rotate the cluster's secrets-encryption keys and confirm all seven
/// phases of the rotation.
///
/// `secret_count` sizes the per-phase wait budget; pass the output of
/// [`cluster_secret_count`] or a caller-side estimate. Returns the
/// generation stamped on the request.
pub async fn rotate_encryption_keys(
    client: &dyn ControlPlaneClient,
    name: &str,
    secret_count: u64,
) -> Result<i64, Error> {
    let timeout = reencrypt_budget(secret_count);

    let current = client.get(name).await?;
    let status = decode_status(&current)?;
    let generation = next_generation(
        spec_generation(&current, "rotateEncryptionKeys"),
        rotation_echo(&status),
    );

    info!(
        resource = %name,
        generation,
        secret_count,
        budget_secs = timeout.as_secs(),
        "requesting encryption key rotation"
    );
    client
        .merge_patch(
            name,
            json!({ "spec": { "rotateEncryptionKeys": { "generation": generation } } }),
        )
        .await?;

    confirm_phase_sequence::<EncryptionKeyRotationPhase>(
        client,
        name,
        generation,
        timeout,
        rotation_phase,
        rotation_echo,
    )
    .await?;

    wait_for_ready(client, name, timeout).await?;
    info!(resource = %name, generation, "encryption key rotation complete");
    Ok(generation)
}
