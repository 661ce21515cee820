//! Error types for the gantry harness
//!
//! Errors are structured with fields to aid debugging in CI logs. Each
//! variant carries the context a failed test run needs: resource names,
//! mutation kinds, and underlying causes.

use thiserror::Error;

/// Main error type for gantry operations
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Kubernetes API error
    #[error("kubernetes error: {source}")]
    Kube {
        /// The underlying kube-rs error
        #[from]
        source: kube::Error,
    },

    /// The watch stream closed before the awaited condition was observed
    #[error("timeout waiting on condition for {resource}")]
    WatchTimeout {
        /// Name of the watched resource
        resource: String,
    },

    /// The watch stream itself reported an error event
    #[error("watch stream error for {resource}: {message}")]
    WatchStream {
        /// Name of the watched resource
        resource: String,
        /// Error detail reported by the API server
        message: String,
    },

    /// The control plane entered the Failed phase during a mutation
    #[error("{mutation} failed: {detail}")]
    PhaseFailed {
        /// Mutation kind that failed (e.g. "etcd snapshot creation")
        mutation: String,
        /// What was observed, including the phase the wait was targeting
        detail: String,
    },

    /// A status payload could not be interpreted as the expected type
    #[error("decode error: {message}")]
    Decode {
        /// Description of what failed to decode
        message: String,
        /// The resource kind being decoded (if known)
        kind: Option<String>,
    },

    /// Caller misuse detected before anything was submitted
    #[error("validation error: {message}")]
    Validation {
        /// Description of what's invalid
        message: String,
        /// The invalid field path (e.g. "spec.etcdSnapshotRestore.name")
        field: Option<String>,
    },
}

impl Error {
    /// Create a timeout error for a watched resource
    pub fn watch_timeout(resource: impl Into<String>) -> Self {
        Self::WatchTimeout {
            resource: resource.into(),
        }
    }

    /// Create a stream error for a watched resource
    pub fn watch_stream(resource: impl Into<String>, message: impl Into<String>) -> Self {
        Self::WatchStream {
            resource: resource.into(),
            message: message.into(),
        }
    }

    /// Create a phase-failure error for a mutation kind
    pub fn phase_failed(mutation: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::PhaseFailed {
            mutation: mutation.into(),
            detail: detail.into(),
        }
    }

    /// Create a decode error with the given message
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
            kind: None,
        }
    }

    /// Create a decode error for a specific resource kind
    pub fn decode_for(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
            kind: Some(kind.into()),
        }
    }

    /// Create a validation error with the given message
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            field: None,
        }
    }

    /// Create a validation error with a field path
    pub fn validation_for_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Whether a larger timeout budget could plausibly make this error go away
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::WatchTimeout { .. })
    }
}
