//! Canonical phase sequences for control-plane mutations
//!
//! Each long-running mutation walks the control plane through a fixed,
//! ordered sequence of named phases, reported one at a time in the
//! resource's status. The sequences here are the source of truth the
//! waiters compare observations against; the `Failed` sentinel sits
//! outside every sequence and may be entered from any phase.

use gantry_common::Error;

/// A mutation's canonical phase ordering.
///
/// `SEQUENCE` lists the forward phases in the order the control plane is
/// expected to report them, terminal phase last. The `FAILED` sentinel is
/// not part of the sequence; observing it ends any wait as a hard error.
pub trait PhaseSequence: Copy + PartialEq + Eq + std::fmt::Debug + Sized + 'static {
    /// Forward phases in canonical order, excluding the failure sentinel
    const SEQUENCE: &'static [Self];

    /// Sentinel the control plane enters when it aborts the mutation
    const FAILED: Self;

    /// Human-facing mutation name used in errors and logs
    const MUTATION: &'static str;

    /// Parse a phase from its status-field spelling
    fn parse(name: &str) -> Option<Self>;

    /// The status-field spelling of this phase
    fn name(&self) -> &'static str;

    /// Position of this phase within the canonical sequence.
    ///
    /// Panics if the phase is not part of the sequence (the `Failed`
    /// sentinel, or a sequence definition bug). Callers must reject the
    /// sentinel before asking for an index; hitting this is a programming
    /// error, not a runtime condition.
    fn index(self) -> usize {
        Self::SEQUENCE
            .iter()
            .position(|p| *p == self)
            .unwrap_or_else(|| {
                panic!(
                    "phase {:?} is not part of the canonical {} sequence",
                    self,
                    Self::MUTATION
                )
            })
    }
}

/// Check whether an observed phase has reached or passed the target phase.
///
/// Returns an error immediately when the observed phase is the `Failed`
/// sentinel; that is a terminal outcome, not "not yet done". A repeated
/// observation of the same phase stays not-done until the index advances.
/// An observation behind the target is reported as not-done even when it
/// sits behind a previously observed phase: watch caches can serve a
/// stale snapshot briefly, and treating that as an error would fail waits
/// that are in fact still progressing.
pub fn phase_at_least<P: PhaseSequence>(observed: P, target: P) -> Result<bool, Error> {
    if observed == P::FAILED {
        return Err(Error::phase_failed(
            P::MUTATION,
            format!(
                "control plane entered Failed while waiting for {}",
                target.name()
            ),
        ));
    }
    Ok(observed.index() >= target.index())
}

// =============================================================================
// Etcd snapshot creation
// =============================================================================

/// Phases of an on-demand etcd snapshot creation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SnapshotCreatePhase {
    /// The control plane acknowledged the request
    Started,
    /// Etcd is quiesced for a consistent snapshot
    Shutdown,
    /// Etcd is being brought back up
    RestartCluster,
    /// The snapshot exists and the cluster is resuming normal operation
    Finished,
    /// The snapshot attempt was aborted
    Failed,
}

impl PhaseSequence for SnapshotCreatePhase {
    const SEQUENCE: &'static [Self] = &[
        Self::Started,
        Self::Shutdown,
        Self::RestartCluster,
        Self::Finished,
    ];
    const FAILED: Self = Self::Failed;
    const MUTATION: &'static str = "etcd snapshot creation";

    fn parse(name: &str) -> Option<Self> {
        match name {
            "Started" => Some(Self::Started),
            "Shutdown" => Some(Self::Shutdown),
            "RestartCluster" => Some(Self::RestartCluster),
            "Finished" => Some(Self::Finished),
            "Failed" => Some(Self::Failed),
            _ => None,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Started => "Started",
            Self::Shutdown => "Shutdown",
            Self::RestartCluster => "RestartCluster",
            Self::Finished => "Finished",
            Self::Failed => "Failed",
        }
    }
}

// =============================================================================
// Etcd snapshot restore
// =============================================================================

/// Phases of an etcd snapshot restore
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SnapshotRestorePhase {
    /// The control plane acknowledged the request
    Started,
    /// Etcd is stopped ahead of the restore
    Shutdown,
    /// Snapshot data is being written back into etcd
    Restore,
    /// The cluster is restarting onto the restored data
    RestartCluster,
    /// The restore completed
    Finished,
    /// The restore was aborted
    Failed,
}

impl PhaseSequence for SnapshotRestorePhase {
    const SEQUENCE: &'static [Self] = &[
        Self::Started,
        Self::Shutdown,
        Self::Restore,
        Self::RestartCluster,
        Self::Finished,
    ];
    const FAILED: Self = Self::Failed;
    const MUTATION: &'static str = "etcd snapshot restore";

    fn parse(name: &str) -> Option<Self> {
        match name {
            "Started" => Some(Self::Started),
            "Shutdown" => Some(Self::Shutdown),
            "Restore" => Some(Self::Restore),
            "RestartCluster" => Some(Self::RestartCluster),
            "Finished" => Some(Self::Finished),
            "Failed" => Some(Self::Failed),
            _ => None,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Started => "Started",
            Self::Shutdown => "Shutdown",
            Self::Restore => "Restore",
            Self::RestartCluster => "RestartCluster",
            Self::Finished => "Finished",
            Self::Failed => "Failed",
        }
    }
}

// =============================================================================
// Encryption key rotation
// =============================================================================

/// Phases of an encryption-key rotation.
///
/// Each rotate/reencrypt step is followed by a coordinated restart of the
/// control-plane components, so the sequence interleaves work phases with
/// restart phases.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EncryptionKeyRotationPhase {
    /// A new key is staged alongside the current one
    Prepare,
    /// Components restart to pick up the staged key
    PostPrepareRestart,
    /// The new key becomes the write key
    Rotate,
    /// Components restart onto the rotated key
    PostRotateRestart,
    /// Stored secrets are rewritten under the new key
    Reencrypt,
    /// Final restart after re-encryption
    PostReencryptRestart,
    /// Rotation complete
    Done,
    /// Rotation aborted
    Failed,
}

impl PhaseSequence for EncryptionKeyRotationPhase {
    const SEQUENCE: &'static [Self] = &[
        Self::Prepare,
        Self::PostPrepareRestart,
        Self::Rotate,
        Self::PostRotateRestart,
        Self::Reencrypt,
        Self::PostReencryptRestart,
        Self::Done,
    ];
    const FAILED: Self = Self::Failed;
    const MUTATION: &'static str = "encryption key rotation";

    fn parse(name: &str) -> Option<Self> {
        match name {
            "Prepare" => Some(Self::Prepare),
            "PostPrepareRestart" => Some(Self::PostPrepareRestart),
            "Rotate" => Some(Self::Rotate),
            "PostRotateRestart" => Some(Self::PostRotateRestart),
            "Reencrypt" => Some(Self::Reencrypt),
            "PostReencryptRestart" => Some(Self::PostReencryptRestart),
            "Done" => Some(Self::Done),
            "Failed" => Some(Self::Failed),
            _ => None,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Prepare => "Prepare",
            Self::PostPrepareRestart => "PostPrepareRestart",
            Self::Rotate => "Rotate",
            Self::PostRotateRestart => "PostRotateRestart",
            Self::Reencrypt => "Reencrypt",
            Self::PostReencryptRestart => "PostReencryptRestart",
            Self::Done => "Done",
            Self::Failed => "Failed",
        }
    }
}
