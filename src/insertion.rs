//! The pose of one probe: position in a transformed space plus three angles.

use crate::float_types::{Real, wrap_degrees};
use crate::probe_kind::ProbeKind;
use crate::space::CoordinateSpace;
use crate::traits::CoordinateTransform;
use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Valid range of the downward tilt, in degrees.
pub const THETA_MIN: Real = -90.0;
pub const THETA_MAX: Real = 0.0;

pub fn clamp_theta(theta: Real) -> Real {
    if theta.is_nan() {
        return THETA_MAX;
    }
    theta.clamp(THETA_MIN, THETA_MAX)
}

/// How angles are presented to and read from the user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AngleConvention {
    /// phi/theta/spin exactly as stored.
    #[default]
    Native,
    /// International Brain Laboratory convention: `phi_ibl = -phi - 90`.
    Ibl,
}

impl AngleConvention {
    /// Stored `(phi, theta, spin)` → this convention.
    pub fn from_native(self, angles: Vector3<Real>) -> Vector3<Real> {
        match self {
            AngleConvention::Native => angles,
            AngleConvention::Ibl => Vector3::new(-angles.x - 90.0, angles.y, angles.z),
        }
    }

    /// This convention → stored `(phi, theta, spin)`.
    pub fn to_native(self, angles: Vector3<Real>) -> Vector3<Real> {
        match self {
            AngleConvention::Native => angles,
            // the phi map is an involution
            AngleConvention::Ibl => Vector3::new(-angles.x - 90.0, angles.y, angles.z),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProbeInsertion {
    pub ap: Real,
    pub ml: Real,
    pub dv: Real,
    pub phi: Real,
    theta: Real,
    pub spin: Real,
    kind: ProbeKind,
    space: Arc<CoordinateSpace>,
    transform: Arc<dyn CoordinateTransform>,
}

impl ProbeInsertion {
    pub fn new(
        apmldv: Vector3<Real>,
        angles: Vector3<Real>,
        kind: ProbeKind,
        space: Arc<CoordinateSpace>,
        transform: Arc<dyn CoordinateTransform>,
    ) -> Self {
        Self {
            ap: apmldv.x,
            ml: apmldv.y,
            dv: apmldv.z,
            phi: angles.x,
            theta: clamp_theta(angles.y),
            spin: angles.z,
            kind,
            space,
            transform,
        }
    }

    /// At the transform's reference coordinate, pointing straight down.
    pub fn at_reference(
        kind: ProbeKind,
        space: Arc<CoordinateSpace>,
        transform: Arc<dyn CoordinateTransform>,
    ) -> Self {
        let origin = transform.from_canonical(transform.reference(), true);
        Self::new(origin, Vector3::zeros(), kind, space, transform)
    }

    pub const fn kind(&self) -> ProbeKind {
        self.kind
    }

    pub fn space(&self) -> &CoordinateSpace {
        &self.space
    }

    pub fn space_arc(&self) -> &Arc<CoordinateSpace> {
        &self.space
    }

    pub fn transform(&self) -> &dyn CoordinateTransform {
        self.transform.as_ref()
    }

    pub fn transform_arc(&self) -> &Arc<dyn CoordinateTransform> {
        &self.transform
    }

    pub fn apmldv(&self) -> Vector3<Real> {
        Vector3::new(self.ap, self.ml, self.dv)
    }

    pub fn set_apmldv(&mut self, apmldv: Vector3<Real>) {
        self.ap = apmldv.x;
        self.ml = apmldv.y;
        self.dv = apmldv.z;
    }

    pub const fn theta(&self) -> Real {
        self.theta
    }

    pub fn set_theta(&mut self, theta: Real) {
        self.theta = clamp_theta(theta);
    }

    /// `(phi, theta, spin)` in degrees.
    pub fn angles(&self) -> Vector3<Real> {
        Vector3::new(self.phi, self.theta, self.spin)
    }

    pub fn set_angles(&mut self, angles: Vector3<Real>) {
        self.phi = angles.x;
        self.set_theta(angles.y);
        self.spin = angles.z;
    }

    pub fn angles_in(&self, convention: AngleConvention) -> Vector3<Real> {
        convention.from_native(self.angles())
    }

    /// Re-apply the theta limits in place.
    pub fn clamp_theta(&mut self) {
        self.theta = clamp_theta(self.theta);
    }

    /// phi for display, wrapped to (-180, 180].
    pub fn wrapped_phi(&self) -> Real {
        wrap_degrees(self.phi)
    }

    pub fn wrapped_spin(&self) -> Real {
        wrap_degrees(self.spin)
    }

    /// Tip position in canonical atlas millimetres.
    pub fn position_canonical(&self) -> Vector3<Real> {
        self.transform.to_canonical(self.apmldv(), true)
    }

    pub fn position_world(&self) -> Point3<Real> {
        self.space.atlas_to_world(&self.position_canonical())
    }

    /// A world point expressed in this insertion's transformed space.
    pub fn world_to_transformed(&self, world: &Point3<Real>) -> Vector3<Real> {
        self.transform
            .from_canonical(self.space.world_to_atlas(world), true)
    }

    /// A world direction laid onto transformed axes (sign flips only, no scale).
    pub fn world_to_transformed_axis_change(&self, world: &Vector3<Real>) -> Vector3<Real> {
        self.transform
            .axis_change_from_canonical(self.space.world_to_atlas_vector(world))
    }

    /// Re-express the same physical tip position in another transform.
    pub fn retarget(&mut self, transform: Arc<dyn CoordinateTransform>) {
        let canonical = self.position_canonical();
        self.transform = transform;
        self.set_apmldv(self.transform.from_canonical(canonical, true));
    }

    /// Same pose values, same kind, same transform.
    pub fn same_pose(&self, other: &ProbeInsertion) -> bool {
        self.apmldv() == other.apmldv()
            && self.angles() == other.angles()
            && self.transform.name() == other.transform.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::{AffineTransform, IdentityTransform};

    fn ccf() -> Arc<CoordinateSpace> {
        Arc::new(CoordinateSpace::ccf_25um())
    }

    #[test]
    fn theta_is_clamped_on_construction_and_set() {
        let mut ins = ProbeInsertion::new(
            Vector3::zeros(),
            Vector3::new(0.0, 45.0, 0.0),
            ProbeKind::Neuropixels1,
            ccf(),
            Arc::new(IdentityTransform),
        );
        assert_eq!(ins.theta(), 0.0);
        ins.set_theta(-120.0);
        assert_eq!(ins.theta(), -90.0);
        ins.set_theta(Real::NAN);
        assert_eq!(ins.theta(), 0.0);
    }

    #[test]
    fn ibl_phi_convention() {
        let native = Vector3::new(30.0, -20.0, 5.0);
        let ibl = AngleConvention::Ibl.from_native(native);
        assert_eq!(ibl, Vector3::new(-120.0, -20.0, 5.0));
        assert_eq!(AngleConvention::Ibl.to_native(ibl), native);
    }

    #[test]
    fn at_reference_sits_on_transform_origin() {
        let ins = ProbeInsertion::at_reference(
            ProbeKind::Neuropixels1,
            ccf(),
            Arc::new(AffineTransform::intuitive()),
        );
        assert!(ins.apmldv().norm() < 1e-12);
        assert!((ins.position_canonical() - crate::transform::BREGMA).norm() < 1e-12);
    }

    #[test]
    fn retarget_keeps_physical_position() {
        let mut ins = ProbeInsertion::new(
            Vector3::new(1.0, -0.5, 2.0),
            Vector3::zeros(),
            ProbeKind::Neuropixels1,
            ccf(),
            Arc::new(AffineTransform::intuitive()),
        );
        let before = ins.position_world();
        ins.retarget(Arc::new(AffineTransform::qiu2018()));
        assert!((ins.position_world() - before).norm() < 1e-9);
        assert_eq!(ins.transform().name(), "Qiu2018");
    }

    #[test]
    fn display_angles_wrap() {
        let ins = ProbeInsertion::new(
            Vector3::zeros(),
            Vector3::new(270.0, -10.0, -540.0),
            ProbeKind::Neuropixels1,
            ccf(),
            Arc::new(IdentityTransform),
        );
        assert_eq!(ins.wrapped_phi(), -90.0);
        assert_eq!(ins.wrapped_spin(), 180.0);
        assert_eq!(ins.phi, 270.0);
    }
}
