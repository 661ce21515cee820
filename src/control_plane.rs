//! Control-plane resource access and typed status decoding
//!
//! The watched resource belongs to the management API, not to this crate,
//! so it is accessed as a `DynamicObject` through a discovery-built
//! `ApiResource`. Status payloads are decoded into typed structs with
//! serde; a payload that does not fit the expected shape is a typed decode
//! error, never a cast or a crash.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use kube::api::{Api, DynamicObject, Patch, PatchParams, WatchParams};
use kube::discovery::ApiResource;
use kube::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[cfg(test)]
use mockall::automock;

use crate::watch::WatchEventStream;
use gantry_common::{kube_utils, Error};

/// API group of the control-plane resource
pub const CONTROL_PLANE_GROUP: &str = "rke.cattle.io";

/// Kind of the control-plane resource
pub const CONTROL_PLANE_KIND: &str = "RKEControlPlane";

/// Namespace the management API keeps control-plane resources in
pub const DEFAULT_NAMESPACE: &str = "fleet-default";

/// Trait abstracting control-plane resource operations
///
/// Mutation drivers speak to the management cluster exclusively through
/// this trait, so tests can script watch streams and inspect submitted
/// patches without a live API server.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ControlPlaneClient: Send + Sync {
    /// Fetch the current control-plane resource
    async fn get(&self, name: &str) -> Result<DynamicObject, Error>;

    /// Merge a desired-state patch into the resource
    async fn merge_patch(&self, name: &str, patch: serde_json::Value) -> Result<(), Error>;

    /// Open a fresh watch on the resource, bounded by `timeout`.
    ///
    /// The subscription starts from the resource's current state, so a
    /// condition that was already reached before the watch opened is still
    /// observed. Each call is independent; no history carries over from a
    /// previous subscription.
    async fn watch(&self, name: &str, timeout: Duration) -> Result<WatchEventStream, Error>;
}

/// Real client over a kube connection, resolved via API discovery
pub struct ControlPlaneClientImpl {
    client: Client,
    resource: ApiResource,
    namespace: String,
}

impl ControlPlaneClientImpl {
    /// Discover the control-plane resource version and build a client
    pub async fn discover(client: Client, namespace: &str) -> Result<Self, Error> {
        let resource = kube_utils::build_api_resource_with_discovery(
            &client,
            CONTROL_PLANE_GROUP,
            CONTROL_PLANE_KIND,
        )
        .await?;
        Ok(Self {
            client,
            resource,
            namespace: namespace.to_string(),
        })
    }

    fn api(&self) -> Api<DynamicObject> {
        Api::namespaced_with(self.client.clone(), &self.namespace, &self.resource)
    }
}

#[async_trait]
impl ControlPlaneClient for ControlPlaneClientImpl {
    async fn get(&self, name: &str) -> Result<DynamicObject, Error> {
        Ok(self.api().get(name).await?)
    }

    async fn merge_patch(&self, name: &str, patch: serde_json::Value) -> Result<(), Error> {
        self.api()
            .patch(name, &PatchParams::default(), &Patch::Merge(&patch))
            .await?;
        Ok(())
    }

    async fn watch(&self, name: &str, timeout: Duration) -> Result<WatchEventStream, Error> {
        // resourceVersion "0" makes the server lead with synthetic Added
        // events for current state before streaming changes.
        let params = WatchParams::default()
            .fields(&format!("metadata.name={}", name))
            .timeout(timeout.as_secs().min(u32::MAX as u64) as u32);

        debug!(
            resource = %name,
            namespace = %self.namespace,
            timeout_secs = timeout.as_secs(),
            "opening watch"
        );

        let stream = self.api().watch(&params, "0").await?;
        Ok(stream.boxed())
    }
}

// =============================================================================
// Status decoding
// =============================================================================

/// Generation echoed back by the control plane once it starts processing
/// a mutation request
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GenerationEcho {
    /// The generation of the request being processed
    #[serde(default)]
    pub generation: i64,
}

/// A standard status condition
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Condition type (e.g. "Ready")
    #[serde(rename = "type")]
    pub type_: String,
    /// "True", "False", or "Unknown"
    pub status: String,
    /// Machine-readable reason, if set
    #[serde(default)]
    pub reason: Option<String>,
    /// Human-readable message, if set
    #[serde(default)]
    pub message: Option<String>,
}

/// The subset of control-plane status the harness consumes.
///
/// Written exclusively by the remote control plane; read-only here.
/// Unknown fields are ignored so the struct tracks only what the waits
/// actually assert on.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ControlPlaneStatus {
    /// Phase of an in-flight snapshot creation
    #[serde(default)]
    pub etcd_snapshot_create_phase: Option<String>,

    /// Phase of an in-flight snapshot restore
    #[serde(default)]
    pub etcd_snapshot_restore_phase: Option<String>,

    /// Phase of an in-flight encryption-key rotation
    #[serde(default)]
    pub rotate_encryption_keys_phase: Option<String>,

    /// Generation of the last certificate rotation the control plane
    /// finished processing
    #[serde(default)]
    pub certificate_rotation_generation: Option<i64>,

    /// Echo of the snapshot-create request being processed
    #[serde(default)]
    pub etcd_snapshot_create: Option<GenerationEcho>,

    /// Echo of the snapshot-restore request being processed
    #[serde(default)]
    pub etcd_snapshot_restore: Option<GenerationEcho>,

    /// Echo of the encryption-key-rotation request being processed
    #[serde(default)]
    pub rotate_encryption_keys: Option<GenerationEcho>,

    /// Overall readiness as reported by the control plane
    #[serde(default)]
    pub ready: bool,

    /// Status conditions
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

impl ControlPlaneStatus {
    /// Whether the control plane reports steady state
    pub fn is_ready(&self) -> bool {
        self.ready
            || self
                .conditions
                .iter()
                .any(|c| c.type_ == "Ready" && c.status == "True")
    }
}

/// Decode the status subtree of a control-plane object.
///
/// A resource with no status yet decodes to the default (nothing in
/// flight, not ready); a status that does not fit the expected shape is a
/// decode error.
pub fn decode_status(obj: &DynamicObject) -> Result<ControlPlaneStatus, Error> {
    match obj.data.get("status") {
        None => Ok(ControlPlaneStatus::default()),
        Some(status) => serde_json::from_value(status.clone())
            .map_err(|e| Error::decode_for(CONTROL_PLANE_KIND, e.to_string())),
    }
}

/// Read an integer generation out of the resource's desired state
pub fn spec_generation(obj: &DynamicObject, field: &str) -> Option<i64> {
    obj.data
        .pointer(&format!("/spec/{}/generation", field))
        .and_then(serde_json::Value::as_i64)
}
