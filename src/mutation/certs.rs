//! Certificate rotation
//!
//! Unlike the snapshot and encryption mutations, certificate rotation has
//! no phase sequence: the control plane signals completion by echoing the
//! requested generation into a rotation counter in status.

use std::time::Duration;

use serde_json::json;
use tracing::info;

use crate::control_plane::{decode_status, spec_generation, ControlPlaneClient};
use crate::mutation::{next_generation, wait_for_ready};
use crate::watch::{event_object, watch_wait};
use gantry_common::Error;

/// Rotate cluster certificates and wait for the control plane to confirm.
///
/// `services` limits rotation to the named components; an empty slice
/// rotates certificates for everything. Returns the generation stamped on
/// the request.
pub async fn rotate_certificates(
    client: &dyn ControlPlaneClient,
    name: &str,
    services: &[String],
    timeout: Duration,
) -> Result<i64, Error> {
    let current = client.get(name).await?;
    let status = decode_status(&current)?;
    let generation = next_generation(
        spec_generation(&current, "rotateCertificates"),
        status.certificate_rotation_generation,
    );

    info!(
        resource = %name,
        generation,
        services = ?services,
        "requesting certificate rotation"
    );
    client
        .merge_patch(
            name,
            json!({
                "spec": {
                    "rotateCertificates": {
                        "generation": generation,
                        "services": services,
                    }
                }
            }),
        )
        .await?;

    let stream = client.watch(name, timeout).await?;
    watch_wait(stream, name, |event| {
        let Some(obj) = event_object(event) else {
            return Ok(false);
        };
        Ok(decode_status(obj)?.certificate_rotation_generation == Some(generation))
    })
    .await?;

    wait_for_ready(client, name, timeout).await?;
    info!(resource = %name, generation, "certificate rotation complete");
    Ok(generation)
}
