//! Scalar type, the geometry backends matching it, and the crate tolerance.
//!
//! The `f64` and `f32` features pick [`Real`] and the matching parry/rapier
//! builds together, so collider shapes and atlas coordinates share one scalar.

#[cfg(feature = "f64")]
pub use parry3d_f64 as parry3d;
#[cfg(feature = "f64")]
pub use rapier3d_f64 as rapier3d;
#[cfg(feature = "f64")]
pub type Real = f64;

#[cfg(feature = "f32")]
pub use parry3d;
#[cfg(feature = "f32")]
pub use rapier3d;
#[cfg(feature = "f32")]
pub type Real = f32;

use core::str::FromStr;
use std::sync::OnceLock;

static TOLERANCE_CELL: OnceLock<Real> = OnceLock::new();

#[cfg(feature = "f64")]
const DEFAULT_TOLERANCE: Real = 1e-6;
#[cfg(feature = "f32")]
const DEFAULT_TOLERANCE: Real = 1e-4;

/// Distance in mm below which two colliders count as touching rather than
/// penetrating. Flush faces report a contact distance of about zero and must
/// not block a move.
///
/// Fixed on first use: the build-time `PROBEPLAN_TOLERANCE` env var if it parses,
/// otherwise 1e-6 (`f64`) or 1e-4 (`f32`). Never smaller than `Real::EPSILON`.
pub fn tolerance() -> Real {
    *TOLERANCE_CELL.get_or_init(|| {
        option_env!("PROBEPLAN_TOLERANCE")
            .and_then(|raw| Real::from_str(raw).ok())
            .map_or(DEFAULT_TOLERANCE, |value| value.max(Real::EPSILON))
    })
}

/// Override the tolerance before the first collision check; later calls are ignored.
pub fn set_tolerance(value: Real) {
    let _ = TOLERANCE_CELL.set(value.max(Real::EPSILON));
}

#[cfg(feature = "f64")]
pub use core::f64::consts::{FRAC_PI_2, PI};
#[cfg(feature = "f32")]
pub use core::f32::consts::{FRAC_PI_2, PI};

/// Lengths are millimetres throughout.
pub const MM: Real = 1.0;
pub const UM: Real = 0.001 * MM;

/// Wrap an angle in degrees into `(-180, 180]`.
pub fn wrap_degrees(deg: Real) -> Real {
    let wrapped = (deg + 180.0).rem_euclid(360.0) - 180.0;
    if wrapped <= -180.0 { wrapped + 360.0 } else { wrapped }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_degrees_stays_in_half_open_range() {
        assert_eq!(wrap_degrees(0.0), 0.0);
        assert_eq!(wrap_degrees(180.0), 180.0);
        assert_eq!(wrap_degrees(-180.0), 180.0);
        assert!((wrap_degrees(370.0) - 10.0).abs() < 1e-4);
        assert!((wrap_degrees(-190.0) - 170.0).abs() < 1e-4);
    }

    #[test]
    fn tolerance_is_positive_and_fixed() {
        let first = tolerance();
        assert!(first >= Real::EPSILON);
        set_tolerance(1.0);
        assert_eq!(tolerance(), first);
    }
}
