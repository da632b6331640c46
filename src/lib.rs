//! **Probe insertion geometry** for planning electrode and pipette placements in a
//! brain atlas: coordinate transforms between the canonical atlas and stereotaxic
//! spaces, a ray-march that finds where a probe's shaft meets the brain surface,
//! and collision checks that reject poses penetrating other probes or rig equipment.
//!
//! The entry point is [`Session`]: it owns every probe, applies
//! [`MoveCommand`]s and runs each update through
//! `apply → resolve → validate → surface → report`.
//!
//! # Features
//! #### Default
//! - **f64**: use f64 as Real
//!
//! #### Optional
//! - **f32**: use f32 as Real, this conflicts with f64
//!
//! # Logging
//! Uses the [`log`](https://docs.rs/log) facade and installs no logger:
//! `warn` for missed boundary rays, `debug` for ignored or rejected moves,
//! `info` for session lifecycle.

#![forbid(unsafe_code)]
#![deny(unused)]
#![warn(clippy::missing_const_for_fn, clippy::approx_constant, clippy::all)]

pub mod collision;
pub mod controller;
pub mod errors;
pub mod float_types;
pub mod input;
pub mod insertion;
pub mod manipulator;
pub mod pose;
pub mod probe_kind;
pub mod record;
pub mod session;
pub mod settings;
pub mod space;
pub mod surface;
pub mod traits;
pub mod transform;
pub mod volume;

#[cfg(any(all(feature = "f64", feature = "f32"), not(any(feature = "f64", feature = "f32"))))]
compile_error!("Either 'f64' or 'f32' feature must be specified, but not both");

pub use controller::{DragAxis, MoveAxis, MoveCommand, PoseTarget};
pub use errors::ProbeError;
pub use insertion::{AngleConvention, ProbeInsertion};
pub use pose::{PoseResolver, ResolvedPose};
pub use probe_kind::{ProbeKind, ShankGeometry};
pub use session::{MoveOutcome, ProbeHandle, Session};
pub use settings::Settings;
pub use space::CoordinateSpace;
pub use surface::{SearchMode, SurfaceFinder, SurfaceResult};
pub use traits::{CoordinateTransform, LabelVolume};
pub use transform::{AffineTransform, IdentityTransform, RotationTransform, TransformSet};
pub use volume::{DenseLabelVolume, VolumeGate};
