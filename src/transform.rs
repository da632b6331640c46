//! Concrete coordinate transforms and the startup registry that holds them.

use crate::errors::ProbeError;
use crate::float_types::Real;
use crate::traits::CoordinateTransform;
use nalgebra::{Rotation3, Vector3};
use std::sync::Arc;

/// Bregma in canonical atlas millimetres (AP, ML, DV).
pub const BREGMA: Vector3<Real> = Vector3::new(5.2, 5.7, 0.332);

fn euler_degrees(angles: &Vector3<Real>) -> Rotation3<Real> {
    Rotation3::from_euler_angles(
        angles.x.to_radians(),
        angles.y.to_radians(),
        angles.z.to_radians(),
    )
}

/// Canonical atlas space itself.
#[derive(Debug, Clone, Default)]
pub struct IdentityTransform;

impl CoordinateTransform for IdentityTransform {
    fn name(&self) -> &str {
        "CCF"
    }

    fn prefix(&self) -> &str {
        "ccf"
    }

    fn reference(&self) -> Vector3<Real> {
        Vector3::zeros()
    }

    fn direction_to_canonical(&self, v: Vector3<Real>) -> Vector3<Real> {
        v
    }

    fn direction_from_canonical(&self, v: Vector3<Real>) -> Vector3<Real> {
        v
    }
}

/// Anisotropic scale plus a fixed rotation about a reference coordinate.
///
/// Going *from* canonical the rotation is applied first and the scale second:
/// `t = s ⊙ (R · (c - reference))`. The reverse undoes the scale, then the rotation.
#[derive(Debug, Clone)]
pub struct AffineTransform {
    name: String,
    prefix: String,
    scaling: Vector3<Real>,
    inverse_scaling: Vector3<Real>,
    rotation: Rotation3<Real>,
    reference: Vector3<Real>,
}

impl AffineTransform {
    /// `rotation_degrees` are Euler angles about the (AP, ML, DV) axes.
    ///
    /// # Panics
    /// A zero scale component cannot be inverted; that is a construction bug.
    pub fn new(
        name: impl Into<String>,
        prefix: impl Into<String>,
        scaling: Vector3<Real>,
        rotation_degrees: Vector3<Real>,
        reference: Vector3<Real>,
    ) -> Self {
        let name = name.into();
        assert!(
            scaling.iter().all(|s| s.is_finite() && *s != 0.0),
            "affine transform {name:?} has a degenerate scale {scaling:?}"
        );
        Self {
            prefix: prefix.into(),
            inverse_scaling: scaling.map(|s| 1.0 / s),
            scaling,
            rotation: euler_degrees(&rotation_degrees),
            reference,
            name,
        }
    }

    /// Dorr 2008 MRI atlas, pitched 5° relative to CCF.
    pub fn dorr2008() -> Self {
        Self::new(
            "Dorr2008",
            "d08",
            Vector3::new(-1.087, 1.0, -0.952),
            Vector3::new(0.0, -5.0, 0.0),
            BREGMA,
        )
    }

    /// Dorr 2008 scaling as used by IBL, without the pitch.
    pub fn dorr2008_ibl() -> Self {
        Self::new(
            "Dorr2008IBL",
            "d08i",
            Vector3::new(-1.087, 1.0, -0.952),
            Vector3::zeros(),
            BREGMA,
        )
    }

    /// Qiu 2018 in-vivo MRI atlas.
    pub fn qiu2018() -> Self {
        Self::new(
            "Qiu2018",
            "q18",
            Vector3::new(-1.031, 0.952, -0.885),
            Vector3::new(0.0, -5.0, 0.0),
            BREGMA,
        )
    }

    /// Bregma-relative CCF with anterior and dorsal positive.
    pub fn intuitive() -> Self {
        Self::new(
            "Intuitive",
            "int",
            Vector3::new(-1.0, 1.0, -1.0),
            Vector3::zeros(),
            BREGMA,
        )
    }

    pub const fn scaling(&self) -> &Vector3<Real> {
        &self.scaling
    }

    pub const fn rotation(&self) -> &Rotation3<Real> {
        &self.rotation
    }

    /// Same scale and rotation about a different reference coordinate.
    pub fn with_reference(mut self, reference: Vector3<Real>) -> Self {
        self.reference = reference;
        self
    }
}

impl CoordinateTransform for AffineTransform {
    fn name(&self) -> &str {
        &self.name
    }

    fn prefix(&self) -> &str {
        &self.prefix
    }

    fn reference(&self) -> Vector3<Real> {
        self.reference
    }

    fn direction_to_canonical(&self, v: Vector3<Real>) -> Vector3<Real> {
        self.rotation.inverse_transform_vector(&v.component_mul(&self.inverse_scaling))
    }

    fn direction_from_canonical(&self, v: Vector3<Real>) -> Vector3<Real> {
        (self.rotation * v).component_mul(&self.scaling)
    }

    fn axis_signs(&self) -> Vector3<Real> {
        self.scaling.map(Real::signum)
    }
}

/// Pure rotation, used for manipulator frames mounted at a yaw/pitch.
#[derive(Debug, Clone)]
pub struct RotationTransform {
    name: String,
    rotation: Rotation3<Real>,
}

impl RotationTransform {
    /// Rotation of `yaw` degrees about DV followed by `pitch` degrees about ML.
    pub fn new(name: impl Into<String>, yaw: Real, pitch: Real) -> Self {
        let rotation = Rotation3::from_axis_angle(&Vector3::y_axis(), pitch.to_radians())
            * Rotation3::from_axis_angle(&Vector3::z_axis(), yaw.to_radians());
        Self {
            name: name.into(),
            rotation,
        }
    }

    /// Three-axis manipulator mounted on the left of the rig.
    pub fn three_axis_left(yaw: Real, pitch: Real) -> Self {
        Self::new("ThreeAxisLeft", yaw, pitch)
    }

    pub const fn rotation(&self) -> &Rotation3<Real> {
        &self.rotation
    }

    /// A rotation has no scale vector.
    ///
    /// # Panics
    /// Always. Asking a rotation-only frame for its scale is a programming error.
    pub fn scaling(&self) -> Vector3<Real> {
        panic!("{} is a rotation-only transform and has no scaling", self.name)
    }
}

impl CoordinateTransform for RotationTransform {
    fn name(&self) -> &str {
        &self.name
    }

    fn prefix(&self) -> &str {
        "rot"
    }

    fn reference(&self) -> Vector3<Real> {
        Vector3::zeros()
    }

    fn direction_to_canonical(&self, v: Vector3<Real>) -> Vector3<Real> {
        self.rotation * v
    }

    fn direction_from_canonical(&self, v: Vector3<Real>) -> Vector3<Real> {
        self.rotation.inverse_transform_vector(&v)
    }
}

/// The fixed set of transforms built at startup plus the user's active choice.
#[derive(Debug, Clone)]
pub struct TransformSet {
    transforms: Vec<Arc<dyn CoordinateTransform>>,
    active: usize,
}

impl Default for TransformSet {
    fn default() -> Self {
        Self::standard()
    }
}

impl TransformSet {
    /// CCF plus every named stereotaxic preset. CCF starts active.
    pub fn standard() -> Self {
        Self {
            transforms: vec![
                Arc::new(IdentityTransform),
                Arc::new(AffineTransform::dorr2008()),
                Arc::new(AffineTransform::dorr2008_ibl()),
                Arc::new(AffineTransform::qiu2018()),
                Arc::new(AffineTransform::intuitive()),
            ],
            active: 0,
        }
    }

    /// Register another transform. A transform with the same name is replaced.
    pub fn register(&mut self, transform: Arc<dyn CoordinateTransform>) {
        match self.position(transform.name()) {
            Some(i) => self.transforms[i] = transform,
            None => self.transforms.push(transform),
        }
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn CoordinateTransform>, ProbeError> {
        self.position(name)
            .map(|i| Arc::clone(&self.transforms[i]))
            .ok_or_else(|| ProbeError::UnknownTransform(name.to_string()))
    }

    pub fn active(&self) -> Arc<dyn CoordinateTransform> {
        Arc::clone(&self.transforms[self.active])
    }

    pub fn set_active(&mut self, name: &str) -> Result<Arc<dyn CoordinateTransform>, ProbeError> {
        let i = self
            .position(name)
            .ok_or_else(|| ProbeError::UnknownTransform(name.to_string()))?;
        self.active = i;
        Ok(self.active())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.transforms.iter().map(|t| t.name())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn CoordinateTransform>> {
        self.transforms.iter()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.transforms.iter().position(|t| t.name() == name)
    }
}
