use crate::float_types::Real;
use nalgebra::Vector3;
use std::fmt::Debug;

/// A mapping between canonical atlas space (AP, ML, DV in mm) and a
/// user- or hardware-facing "transformed" space.
///
/// Implementors only provide the direction maps and the reference coordinate;
/// the point/vector distinction and the axis-change helpers come for free.
pub trait CoordinateTransform: Debug + Send + Sync {
    /// Registry name, e.g. `"Dorr2008"`.
    fn name(&self) -> &str;

    /// Short prefix used when labelling axes, e.g. `"d08"`.
    fn prefix(&self) -> &str;

    /// Canonical coordinate of the transformed-space origin.
    fn reference(&self) -> Vector3<Real>;

    /// Rotation/scale part of the map, transformed → canonical.
    fn direction_to_canonical(&self, v: Vector3<Real>) -> Vector3<Real>;

    /// Rotation/scale part of the map, canonical → transformed.
    fn direction_from_canonical(&self, v: Vector3<Real>) -> Vector3<Real>;

    /// Per-axis sign relating canonical axes to transformed axes.
    fn axis_signs(&self) -> Vector3<Real> {
        Vector3::new(1.0, 1.0, 1.0)
    }

    /// Map a transformed-space value into canonical space.
    ///
    /// Points are un-scaled and then shifted back by the reference coordinate;
    /// directions only go through the rotation/scale part.
    fn to_canonical(&self, v: Vector3<Real>, is_point: bool) -> Vector3<Real> {
        let direction = self.direction_to_canonical(v);
        if is_point {
            direction + self.reference()
        } else {
            direction
        }
    }

    /// Exact inverse of [`to_canonical`](CoordinateTransform::to_canonical).
    fn from_canonical(&self, v: Vector3<Real>, is_point: bool) -> Vector3<Real> {
        if is_point {
            self.direction_from_canonical(v - self.reference())
        } else {
            self.direction_from_canonical(v)
        }
    }

    /// Flip a transformed-space vector onto canonical axis directions.
    /// Sign flips only, no scale or rotation.
    fn axis_change_to_canonical(&self, v: Vector3<Real>) -> Vector3<Real> {
        v.component_mul(&self.axis_signs())
    }

    /// Flip a canonical-axis vector onto transformed-space axis directions.
    fn axis_change_from_canonical(&self, v: Vector3<Real>) -> Vector3<Real> {
        // sign flips are their own inverse
        v.component_mul(&self.axis_signs())
    }
}

/// Discrete per-voxel tissue labels. `label > 0` is tissue, anything else is outside.
pub trait LabelVolume: Send + Sync {
    /// Voxel counts along the (AP, ML, DV) index axes.
    fn dimensions(&self) -> [usize; 3];

    /// Label stored at an index. Out-of-range indices read as `0`.
    fn label_at(&self, ix: i64, iy: i64, iz: i64) -> i32;

    /// Label of the voxel nearest to a fractional index.
    fn label_nearest(&self, index: &Vector3<Real>) -> i32 {
        if !(index.x.is_finite() && index.y.is_finite() && index.z.is_finite()) {
            return 0;
        }
        self.label_at(
            index.x.round() as i64,
            index.y.round() as i64,
            index.z.round() as i64,
        )
    }
}
