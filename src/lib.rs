//! Gantry - event-driven verification harness for managed-cluster mutations
//!
//! Gantry drives long-running, generation-versioned mutations against a
//! cluster's control-plane resource (etcd snapshot creation and restore,
//! certificate rotation, encryption-key rotation) and verifies that the
//! control plane walks through every expected phase, by consuming the
//! resource's watch stream rather than polling.
//!
//! # Architecture
//!
//! Every verification is an instantiation of one generic blocking loop:
//! a bounded watch subscription feeds events to a caller-supplied predicate
//! until the predicate reports done, fails, or the subscription times out.
//! Mutation drivers write a new generation into the resource's desired
//! state, then confirm each phase of the mutation's canonical sequence with
//! a fresh subscription per phase, so a skipped or stalled intermediate
//! step cannot hide behind a check of the final phase alone.
//!
//! # Modules
//!
//! - [`watch`] - bounded watch subscriptions and the wait coordinator
//! - [`phase`] - canonical phase sequences and reached-or-passed checks
//! - [`control_plane`] - client seam and typed status decoding
//! - [`mutation`] - drivers for the four supported mutations

#![deny(missing_docs)]

pub mod control_plane;
pub mod mutation;
pub mod phase;
pub mod watch;

pub use gantry_common::{Error, Result};

use std::time::Duration;

// =============================================================================
// Default Configuration Constants
// =============================================================================

/// Default budget for a single phase wait on snapshot and certificate
/// mutations. Individual phases of those mutations complete well within
/// this on a healthy cluster.
pub const DEFAULT_PHASE_TIMEOUT: Duration = Duration::from_secs(600);

/// Default budget for the final steady-state wait after a mutation
pub const DEFAULT_READY_TIMEOUT: Duration = Duration::from_secs(600);
