//! Recoverable runtime errors

use crate::session::ProbeHandle;

/// Everything that can go wrong at runtime without being a programming bug.
///
/// Collisions are not errors; a rejected move is reported through
/// [`MoveOutcome::RolledBack`](crate::session::MoveOutcome::RolledBack).
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    /// (Parse) A manual coordinate entry could not be read as a number
    #[error("(Parse) could not read {field} from {input:?}")]
    Parse { field: &'static str, input: String },
    /// (UnknownTransform) No transform with this name is registered
    #[error("(UnknownTransform) no coordinate transform named {0:?}")]
    UnknownTransform(String),
    /// (UnknownProbe) The handle does not refer to a live probe
    #[error("(UnknownProbe) no probe with handle {0}")]
    UnknownProbe(ProbeHandle),
    /// (NoActiveProbe) A command was sent to the active probe while there is none
    #[error("(NoActiveProbe) the session has no active probe")]
    NoActiveProbe,
    /// (UnknownProbeKind) A persisted probe id does not match any kind
    #[error("(UnknownProbeKind) no probe kind with id {0}")]
    UnknownProbeKind(i32),
    /// (ExternalControl) A manipulator owns this probe, local input is refused
    #[error("(ExternalControl) probe {0} is driven by a manipulator")]
    ExternalControl(ProbeHandle),
    /// (VolumeNotReady) The label volume has not been provided yet
    #[error("(VolumeNotReady) the label volume is still loading")]
    VolumeNotReady,
    /// (Serialization) JSON encoding or decoding failed
    #[error("(Serialization) {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PartialEq for ProbeError {
    fn eq(&self, other: &Self) -> bool {
        use ProbeError::*;
        match (self, other) {
            (Parse { field: a, input: x }, Parse { field: b, input: y }) => a == b && x == y,
            (UnknownTransform(a), UnknownTransform(b)) => a == b,
            (UnknownProbe(a), UnknownProbe(b)) => a == b,
            (UnknownProbeKind(a), UnknownProbeKind(b)) => a == b,
            (ExternalControl(a), ExternalControl(b)) => a == b,
            (NoActiveProbe, NoActiveProbe) | (VolumeNotReady, VolumeNotReady) => true,
            // serde_json errors carry no equality
            (Serialization(a), Serialization(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
