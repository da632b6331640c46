//! The reference volume: voxel grid, atlas millimetres and world space.
//!
//! Three frames are involved:
//! - **index**: fractional voxel coordinates `(ap, ml, dv)` of the label volume,
//! - **atlas**: canonical millimetres `(ap, ml, dv)`, `index * resolution`,
//! - **world**: renderable space with `x = -ML`, `y = -DV` (up), `z = +AP`,
//!   anchored so atlas `(0, 0, 0)` sits at [`CoordinateSpace::origin`].

use crate::float_types::{Real, parry3d::bounding_volume::Aabb};
use nalgebra::{Point3, Vector3};

/// Immutable description of one loaded atlas. Shared across probes through an `Arc`.
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinateSpace {
    name: String,
    dimensions: [usize; 3],
    resolution: Vector3<Real>,
    origin: Point3<Real>,
}

impl CoordinateSpace {
    /// Panics if any resolution component is not strictly positive.
    pub fn new(
        name: impl Into<String>,
        dimensions: [usize; 3],
        resolution: Vector3<Real>,
        origin: Point3<Real>,
    ) -> Self {
        assert!(
            resolution.iter().all(|r| *r > 0.0),
            "coordinate space resolution must be positive, got {resolution:?}"
        );
        Self {
            name: name.into(),
            dimensions,
            resolution,
            origin,
        }
    }

    /// Allen CCF at 25 µm: 528 × 456 × 320 voxels (AP × ML × DV).
    pub fn ccf_25um() -> Self {
        Self::new(
            "CCF",
            [528, 456, 320],
            Vector3::new(0.025, 0.025, 0.025),
            Point3::new(5.7, 4.0, -6.6),
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub const fn dimensions(&self) -> [usize; 3] {
        self.dimensions
    }

    pub const fn resolution(&self) -> &Vector3<Real> {
        &self.resolution
    }

    /// World position of atlas `(0, 0, 0)`.
    pub const fn origin(&self) -> &Point3<Real> {
        &self.origin
    }

    /// Physical size of the volume in atlas millimetres.
    pub fn extent_mm(&self) -> Vector3<Real> {
        Vector3::new(
            self.dimensions[0] as Real,
            self.dimensions[1] as Real,
            self.dimensions[2] as Real,
        )
        .component_mul(&self.resolution)
    }

    pub fn atlas_to_world(&self, atlas: &Vector3<Real>) -> Point3<Real> {
        self.origin + self.atlas_to_world_vector(atlas)
    }

    pub fn world_to_atlas(&self, world: &Point3<Real>) -> Vector3<Real> {
        self.world_to_atlas_vector(&(world - self.origin))
    }

    /// Direction version of [`atlas_to_world`](Self::atlas_to_world): no origin shift.
    pub fn atlas_to_world_vector(&self, atlas: &Vector3<Real>) -> Vector3<Real> {
        Vector3::new(-atlas.y, -atlas.z, atlas.x)
    }

    pub fn world_to_atlas_vector(&self, world: &Vector3<Real>) -> Vector3<Real> {
        Vector3::new(world.z, -world.x, -world.y)
    }

    pub fn index_to_atlas(&self, index: &Vector3<Real>) -> Vector3<Real> {
        index.component_mul(&self.resolution)
    }

    pub fn atlas_to_index(&self, atlas: &Vector3<Real>) -> Vector3<Real> {
        atlas.component_div(&self.resolution)
    }

    pub fn index_to_world(&self, index: &Vector3<Real>) -> Point3<Real> {
        self.atlas_to_world(&self.index_to_atlas(index))
    }

    pub fn world_to_index(&self, world: &Point3<Real>) -> Vector3<Real> {
        self.atlas_to_index(&self.world_to_atlas(world))
    }

    /// True if the rounded index lies on the voxel grid.
    pub fn contains_index(&self, index: &Vector3<Real>) -> bool {
        (0..3).all(|axis| {
            let i = index[axis].round();
            i.is_finite() && i >= 0.0 && (i as usize) < self.dimensions[axis]
        })
    }

    /// Voxel holding a world point, if the point is inside the volume.
    pub fn nearest_voxel(&self, world: &Point3<Real>) -> Option<[usize; 3]> {
        let index = self.world_to_index(world);
        if !self.contains_index(&index) {
            return None;
        }
        Some([
            index.x.round() as usize,
            index.y.round() as usize,
            index.z.round() as usize,
        ])
    }

    /// World-space bounding box of the whole volume.
    pub fn world_bounds(&self) -> Aabb {
        let a = self.atlas_to_world(&Vector3::zeros());
        let b = self.atlas_to_world(&self.extent_mm());
        Aabb::new(a.inf(&b), a.sup(&b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn atlas_origin_lands_on_world_origin_offset() {
        let space = CoordinateSpace::ccf_25um();
        let world = space.atlas_to_world(&Vector3::zeros());
        assert_eq!(world, Point3::new(5.7, 4.0, -6.6));
    }

    #[test]
    fn world_axes_follow_atlas_convention() {
        let space = CoordinateSpace::ccf_25um();
        // +DV (ventral) is world down
        let down = space.atlas_to_world_vector(&Vector3::new(0.0, 0.0, 1.0));
        assert_eq!(down, Vector3::new(0.0, -1.0, 0.0));
        let back = space.world_to_atlas_vector(&down);
        assert_eq!(back, Vector3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn extent_and_bounds_match_grid() {
        let space = CoordinateSpace::ccf_25um();
        let extent = space.extent_mm();
        assert!((extent.x - 13.2).abs() < 1e-9);
        assert!((extent.y - 11.4).abs() < 1e-9);
        assert!((extent.z - 8.0).abs() < 1e-9);

        let bounds = space.world_bounds();
        let size = bounds.maxs - bounds.mins;
        assert!((size.x - 11.4).abs() < 1e-9);
        assert!((size.y - 8.0).abs() < 1e-9);
        assert!((size.z - 13.2).abs() < 1e-9);
    }

    #[test]
    fn nearest_voxel_rejects_points_outside() {
        let space = CoordinateSpace::ccf_25um();
        let inside = space.index_to_world(&Vector3::new(10.0, 20.0, 30.0));
        assert_eq!(space.nearest_voxel(&inside), Some([10, 20, 30]));

        let outside = space.index_to_world(&Vector3::new(-5.0, 20.0, 30.0));
        assert_eq!(space.nearest_voxel(&outside), None);
    }
}
