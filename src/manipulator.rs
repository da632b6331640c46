//! Turning raw manipulator readings into absolute poses.

use crate::controller::PoseTarget;
use crate::float_types::Real;
use crate::traits::CoordinateTransform;
use crate::transform::RotationTransform;
use nalgebra::{Vector3, Vector4};

/// One reading delivered by the manipulator link.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionEcho {
    pub manipulator_id: String,
    /// `(x, y, z, depth)` in the manipulator's own frame, mm.
    pub position: Vector4<Real>,
}

impl PositionEcho {
    pub fn new(manipulator_id: impl Into<String>, position: Vector4<Real>) -> Self {
        Self {
            manipulator_id: manipulator_id.into(),
            position,
        }
    }
}

/// How a physical manipulator maps onto a probe.
#[derive(Debug, Clone)]
pub struct ManipulatorBinding {
    pub manipulator_id: String,
    /// Manipulator reading that corresponds to the probe's transformed origin.
    /// Latched from the first echo when unset.
    zero_offset: Option<Vector4<Real>>,
    /// Distance from the zero coordinate down to the brain surface.
    pub brain_surface_offset: Real,
    /// Apply the surface offset along the shaft instead of along DV.
    pub drop_with_depth: bool,
    pub frame: RotationTransform,
}

impl ManipulatorBinding {
    pub fn new(manipulator_id: impl Into<String>, frame: RotationTransform) -> Self {
        Self {
            manipulator_id: manipulator_id.into(),
            zero_offset: None,
            brain_surface_offset: 0.0,
            drop_with_depth: true,
            frame,
        }
    }

    pub const fn zero_offset(&self) -> Option<Vector4<Real>> {
        self.zero_offset
    }

    /// Set a new zero. NaN components keep the previous value (or 0 if none).
    pub fn set_zero_offset(&mut self, offset: Vector4<Real>) {
        let previous = self.zero_offset.unwrap_or_else(Vector4::zeros);
        self.zero_offset = Some(offset.zip_map(&previous, |new, old| if new.is_nan() { old } else { new }));
    }

    /// Forget the zero so the next echo latches a fresh one.
    pub fn reset_zero(&mut self) {
        self.zero_offset = None;
    }

    /// Convert a reading into the probe's target position and depth.
    ///
    /// The manipulator frame yields a canonical offset from the zero coordinate;
    /// it is returned as a `probe_transform` direction.
    pub fn echo_to_target(
        &mut self,
        position: Vector4<Real>,
        probe_transform: &dyn CoordinateTransform,
    ) -> PoseTarget {
        let zero = *self.zero_offset.get_or_insert(position);
        let relative = position - zero;

        let mut canonical = self
            .frame
            .to_canonical(Vector3::new(relative.x, relative.y, relative.z), false);
        let mut depth = relative.w;
        if self.drop_with_depth {
            depth += self.brain_surface_offset;
        } else {
            canonical.z += self.brain_surface_offset;
        }

        PoseTarget::position(probe_transform.from_canonical(canonical, false)).with_depth(depth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::{AffineTransform, IdentityTransform};

    #[test]
    fn first_echo_latches_zero() {
        let mut binding = ManipulatorBinding::new("m1", RotationTransform::three_axis_left(0.0, 0.0));
        let first = binding.echo_to_target(Vector4::new(10.0, 20.0, 30.0, 5.0), &IdentityTransform);
        assert_eq!(first.apmldv, Some(Vector3::zeros()));
        assert_eq!(first.depth, 0.0);

        let next = binding.echo_to_target(Vector4::new(11.0, 20.0, 30.0, 6.0), &IdentityTransform);
        assert!((next.apmldv.unwrap() - Vector3::new(1.0, 0.0, 0.0)).norm() < 1e-12);
        assert_eq!(next.depth, 1.0);
    }

    #[test]
    fn nan_zero_components_keep_previous() {
        let mut binding = ManipulatorBinding::new("m1", RotationTransform::three_axis_left(0.0, 0.0));
        binding.set_zero_offset(Vector4::new(1.0, 2.0, 3.0, 4.0));
        binding.set_zero_offset(Vector4::new(Real::NAN, 5.0, Real::NAN, 6.0));
        assert_eq!(binding.zero_offset(), Some(Vector4::new(1.0, 5.0, 3.0, 6.0)));
    }

    #[test]
    fn surface_offset_goes_to_dv_when_not_dropping_with_depth() {
        let mut binding = ManipulatorBinding::new("m1", RotationTransform::three_axis_left(0.0, 0.0));
        binding.brain_surface_offset = 0.5;
        binding.drop_with_depth = false;
        binding.set_zero_offset(Vector4::zeros());
        let target = binding.echo_to_target(Vector4::new(0.0, 0.0, 1.0, 2.0), &IdentityTransform);
        assert!((target.apmldv.unwrap() - Vector3::new(0.0, 0.0, 1.5)).norm() < 1e-12);
        assert_eq!(target.depth, 2.0);
    }

    #[test]
    fn reset_zero_latches_again() {
        let mut binding = ManipulatorBinding::new("m1", RotationTransform::three_axis_left(0.0, 0.0));
        binding.echo_to_target(Vector4::new(1.0, 1.0, 1.0, 1.0), &IdentityTransform);
        binding.reset_zero();
        assert_eq!(binding.zero_offset(), None);
        let target = binding.echo_to_target(Vector4::new(4.0, 4.0, 4.0, 4.0), &IdentityTransform);
        assert_eq!(binding.zero_offset(), Some(Vector4::new(4.0, 4.0, 4.0, 4.0)));
        assert_eq!(target.apmldv, Some(Vector3::zeros()));
    }

    #[test]
    fn echo_offset_is_laid_onto_the_probe_transform() {
        let mut binding = ManipulatorBinding::new("m1", RotationTransform::three_axis_left(0.0, 0.0));
        binding.set_zero_offset(Vector4::zeros());
        let intuitive = AffineTransform::intuitive();
        let target = binding.echo_to_target(Vector4::new(1.0, 0.0, 0.0, 0.0), &intuitive);
        let apmldv = target.apmldv.unwrap();
        // intuitive AP runs against canonical AP
        assert!((apmldv - Vector3::new(-1.0, 0.0, 0.0)).norm() < 1e-12);
        assert!((intuitive.to_canonical(apmldv, false) - Vector3::x()).norm() < 1e-12);
    }
}
