//! Shared setup for end-to-end tests

use gantry::control_plane::{ControlPlaneClientImpl, DEFAULT_NAMESPACE};
use gantry_common::kube_utils;

/// Name of the control-plane resource under test, from the environment
pub fn control_plane_name() -> String {
    std::env::var("GANTRY_CONTROL_PLANE")
        .expect("set GANTRY_CONTROL_PLANE to the control-plane resource under test")
}

/// Connect to the management cluster named by the environment.
///
/// Returns both the raw kube client (for secret counting) and the
/// control-plane client the drivers use.
pub async fn management_cluster() -> (kube::Client, ControlPlaneClientImpl) {
    let kubeconfig = std::env::var("KUBECONFIG").ok().map(std::path::PathBuf::from);
    let namespace =
        std::env::var("GANTRY_NAMESPACE").unwrap_or_else(|_| DEFAULT_NAMESPACE.to_string());

    let client = kube_utils::create_client(kubeconfig.as_deref())
        .await
        .expect("failed to connect to management cluster");
    let control_plane = ControlPlaneClientImpl::discover(client.clone(), &namespace)
        .await
        .expect("control-plane resource not served by this cluster");

    (client, control_plane)
}
