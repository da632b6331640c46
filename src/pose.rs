//! Turning a [`ProbeInsertion`] into a rigid world transform.

use crate::float_types::Real;
use crate::insertion::ProbeInsertion;
use crate::probe_kind::ShankGeometry;
use nalgebra::{Isometry3, Matrix3, Point3, Rotation3, Translation3, UnitQuaternion, Vector3};

/// Depth requested along the shaft but not yet folded into the position.
///
/// Only [`PoseResolver::resolve`] drains it, so it is applied exactly once.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PendingDepth(Real);

impl PendingDepth {
    pub const fn new(depth: Real) -> Self {
        Self(depth)
    }

    pub fn add(&mut self, depth: Real) {
        self.0 += depth;
    }

    /// Replace the pending depth, dropping whatever was queued.
    pub fn set(&mut self, depth: Real) {
        self.0 = depth;
    }

    pub const fn get(&self) -> Real {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0.0
    }

    fn take(&mut self) -> Real {
        std::mem::take(&mut self.0)
    }
}

/// A probe's rigid transform in canonical world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedPose {
    pub tip: Point3<Real>,
    pub rotation: UnitQuaternion<Real>,
    /// Unit vector from the tip up the shank.
    pub up: Vector3<Real>,
    pub forward: Vector3<Real>,
    pub right: Vector3<Real>,
}

impl ResolvedPose {
    pub fn isometry(&self) -> Isometry3<Real> {
        Isometry3::from_parts(Translation3::from(self.tip.coords), self.rotation)
    }

    /// A probe-local point carried into world space.
    pub fn local_to_world(&self, local: &Vector3<Real>) -> Point3<Real> {
        self.tip + self.right * local.x + self.up * local.y + self.forward * local.z
    }

    /// World tip of every shank.
    pub fn shank_tips(&self, geometry: &ShankGeometry) -> Vec<Point3<Real>> {
        geometry
            .shank_offsets
            .iter()
            .map(|offset| self.local_to_world(offset))
            .collect()
    }

    /// The point `distance` mm up the shank from the tip.
    pub fn point_along_shank(&self, distance: Real) -> Point3<Real> {
        self.tip + self.up * distance
    }
}

/// Applies the fixed kinematic chain: translate, phi about up, theta about the
/// lateral axis, spin about the shank, then pending depth along `-up`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PoseResolver;

impl PoseResolver {
    /// Orientation in the transformed frame laid on world axes.
    /// Columns are the probe's right, up and forward axes.
    pub fn local_rotation(phi: Real, theta: Real, spin: Real) -> Rotation3<Real> {
        Rotation3::from_axis_angle(&Vector3::y_axis(), phi.to_radians())
            * Rotation3::from_axis_angle(&Vector3::x_axis(), theta.to_radians())
            * Rotation3::from_axis_angle(&Vector3::y_axis(), spin.to_radians())
    }

    /// Resolve the insertion, first folding any pending depth into `ap/ml/dv`.
    ///
    /// The insertion is left holding the folded position and the pending depth
    /// is zeroed, so a second call with nothing pending yields the same pose.
    pub fn resolve(insertion: &mut ProbeInsertion, pending: &mut PendingDepth) -> ResolvedPose {
        insertion.clamp_theta();
        let local = Self::local_rotation(insertion.phi, insertion.theta(), insertion.spin);

        let depth = pending.take();
        if depth != 0.0 {
            let down = -local.matrix().column(1).into_owned();
            let step = insertion.world_to_transformed_axis_change(&down) * depth;
            insertion.set_apmldv(insertion.apmldv() + step);
        }

        Self::pose_of(insertion, &local)
    }

    /// Pose of an insertion without touching any pending depth.
    pub fn peek(insertion: &ProbeInsertion) -> ResolvedPose {
        let theta = crate::insertion::clamp_theta(insertion.theta());
        let local = Self::local_rotation(insertion.phi, theta, insertion.spin);
        Self::pose_of(insertion, &local)
    }

    fn pose_of(insertion: &ProbeInsertion, local: &Rotation3<Real>) -> ResolvedPose {
        let tip = insertion.position_world();
        let m = local.matrix();
        let carry = |laid: Vector3<Real>| -> Vector3<Real> {
            let space = insertion.space();
            let transformed = insertion.world_to_transformed_axis_change(&laid);
            space.atlas_to_world_vector(&insertion.transform().to_canonical(transformed, false))
        };

        // anisotropic scales shear the frame; re-orthonormalise keeping up exact
        let up = carry(m.column(1).into_owned()).normalize();
        let f = carry(m.column(2).into_owned());
        let forward = (f - up * up.dot(&f)).normalize();
        let right = up.cross(&forward);

        let basis = Matrix3::from_columns(&[right, up, forward]);
        let rotation =
            UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(basis));

        ResolvedPose {
            tip,
            rotation,
            up,
            forward,
            right,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_rotation_theta_tilts_up_toward_forward() {
        let r = PoseResolver::local_rotation(0.0, -90.0, 0.0);
        let up = r * Vector3::y();
        assert!((up - Vector3::new(0.0, 0.0, -1.0)).norm() < 1e-12);
    }

    #[test]
    fn pending_depth_take_zeroes() {
        let mut d = PendingDepth::new(1.5);
        d.add(0.5);
        assert_eq!(d.take(), 2.0);
        assert!(d.is_zero());
    }
}
