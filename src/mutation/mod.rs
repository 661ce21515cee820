//! Drivers for generation-versioned control-plane mutations
//!
//! Each driver follows the same shape: read the resource, write a new
//! generation (plus kind-specific parameters) into the desired state, then
//! confirm the mutation's canonical phases one at a time over fresh watch
//! subscriptions, finishing with a wait for the resource's readiness
//! condition. Any failed wait aborts the whole mutation; retry policy, if
//! any, belongs to the caller.

mod certs;
mod encryption;
mod snapshot;

pub use certs::rotate_certificates;
pub use encryption::{cluster_secret_count, reencrypt_budget, rotate_encryption_keys};
pub use snapshot::{create_snapshot, restore_snapshot, RestoreScope};

use std::time::Duration;

use kube::api::DynamicObject;
use kube::core::WatchEvent;
use tracing::{debug, info};

use crate::control_plane::{
    decode_status, ControlPlaneClient, ControlPlaneStatus, CONTROL_PLANE_KIND,
};
use crate::phase::{phase_at_least, PhaseSequence};
use crate::watch::{event_object, watch_wait};
use gantry_common::Error;

/// Next request generation, strictly greater than anything the resource
/// has seen: both the generation still sitting in the desired state and
/// the one last echoed by the control plane.
pub(crate) fn next_generation(spec_gen: Option<i64>, echo_gen: Option<i64>) -> i64 {
    spec_gen.unwrap_or(0).max(echo_gen.unwrap_or(0)) + 1
}

/// Build the per-event check for one phase wait.
///
/// Events whose echoed generation does not match the request are ignored;
/// they belong to an earlier mutation still draining out of the status.
/// An event with a matching echo but an unrecognizable phase name is a
/// decode error.
pub(crate) fn phase_predicate<P: PhaseSequence>(
    target: P,
    generation: i64,
    phase_of: fn(&ControlPlaneStatus) -> Option<&str>,
    echo_of: fn(&ControlPlaneStatus) -> Option<i64>,
) -> impl FnMut(&WatchEvent<DynamicObject>) -> Result<bool, Error> {
    move |event| {
        let Some(obj) = event_object(event) else {
            return Ok(false);
        };
        let status = decode_status(obj)?;

        if let Some(echo) = echo_of(&status) {
            if echo != generation {
                return Ok(false);
            }
        }

        let Some(phase_name) = phase_of(&status) else {
            return Ok(false);
        };
        let observed = P::parse(phase_name).ok_or_else(|| {
            Error::decode_for(
                CONTROL_PLANE_KIND,
                format!("unknown {} phase {:?}", P::MUTATION, phase_name),
            )
        })?;

        phase_at_least(observed, target)
    }
}

/// Confirm every phase of a mutation's canonical sequence, in order.
///
/// Each phase gets its own subscription: watches opened at different times
/// share no ordering guarantees, so every wait starts from the resource's
/// current state and independently confirms its target was reached or
/// passed. Checking only the final phase would let a skipped or stalled
/// intermediate step go unnoticed.
pub(crate) async fn confirm_phase_sequence<P: PhaseSequence>(
    client: &dyn ControlPlaneClient,
    name: &str,
    generation: i64,
    timeout: Duration,
    phase_of: fn(&ControlPlaneStatus) -> Option<&str>,
    echo_of: fn(&ControlPlaneStatus) -> Option<i64>,
) -> Result<(), Error> {
    for target in P::SEQUENCE {
        debug!(
            resource = %name,
            mutation = P::MUTATION,
            phase = target.name(),
            "waiting for phase"
        );
        let stream = client.watch(name, timeout).await?;
        watch_wait(
            stream,
            name,
            phase_predicate(*target, generation, phase_of, echo_of),
        )
        .await?;
        info!(
            resource = %name,
            mutation = P::MUTATION,
            phase = target.name(),
            "phase confirmed"
        );
    }
    Ok(())
}

/// Wait until the control plane reports steady state again.
///
/// Mutations restart control-plane components as part of their phase
/// sequence; the terminal phase alone does not mean the cluster settled.
pub async fn wait_for_ready(
    client: &dyn ControlPlaneClient,
    name: &str,
    timeout: Duration,
) -> Result<(), Error> {
    debug!(resource = %name, "waiting for readiness");
    let stream = client.watch(name, timeout).await?;
    watch_wait(stream, name, |event| {
        let Some(obj) = event_object(event) else {
            return Ok(false);
        };
        Ok(decode_status(obj)?.is_ready())
    })
    .await?;
    info!(resource = %name, "control plane ready");
    Ok(())
}
