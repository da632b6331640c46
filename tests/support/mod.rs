//! Test support library
//! Small atlases, threshold volumes and float comparisons shared by the integration tests.
#![allow(dead_code)]

use nalgebra::{Point3, Vector3};
use probeplan::{
    CoordinateSpace, DenseLabelVolume, Session, Settings, float_types::Real,
};
use std::sync::Arc;

/// Quick helper to compare floating-point results with an acceptable tolerance.
pub fn approx_eq(a: Real, b: Real, eps: Real) -> bool {
    (a - b).abs() < eps
}

pub fn approx_vec(a: &Vector3<Real>, b: &Vector3<Real>, eps: Real) -> bool {
    (a - b).norm() < eps
}

pub fn approx_point(a: &Point3<Real>, b: &Point3<Real>, eps: Real) -> bool {
    (a - b).norm() < eps
}

pub fn ccf() -> Arc<CoordinateSpace> {
    Arc::new(CoordinateSpace::ccf_25um())
}

/// A 2 × 2 × 4 mm atlas at 25 µm with atlas `(0, 0, 0)` on the world origin.
pub fn small_space() -> Arc<CoordinateSpace> {
    Arc::new(CoordinateSpace::new(
        "small",
        [80, 80, 160],
        Vector3::new(0.025, 0.025, 0.025),
        Point3::origin(),
    ))
}

/// Tissue everywhere at or below `surface_dv` mm (DV index grows downward).
pub fn flat_brain(space: &CoordinateSpace, surface_dv: Real) -> DenseLabelVolume {
    let first = (surface_dv / space.resolution().z).round() as usize;
    DenseLabelVolume::from_fn(space.dimensions(), |_, _, iz| if iz >= first { 1 } else { 0 })
}

/// Tissue below a plane rising `slope` mm of DV per mm of AP and of ML from `base_dv`.
pub fn sloped_brain(space: &CoordinateSpace, base_dv: Real, slope: Real) -> DenseLabelVolume {
    let res = space.resolution();
    DenseLabelVolume::from_fn(space.dimensions(), |ix, iy, iz| {
        let surface = base_dv + slope * (ix as Real * res.x + iy as Real * res.y);
        if iz as Real >= (surface / res.z).round() { 1 } else { 0 }
    })
}

/// Session over [`small_space`] with a brain surface at DV 2 mm already loaded.
pub fn session_with_brain() -> Session {
    let space = small_space();
    let volume = flat_brain(&space, 2.0);
    let mut session = Session::new(space, Settings::default());
    session.provide_volume(Arc::new(volume));
    session
}
