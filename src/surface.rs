//! Brain-surface crossing and insertion depth by ray-marching the label volume.
//!
//! Two fixed-length rays along the probe axis are cast against the volume's
//! bounding box to bracket the shaft, then the span between the hits is
//! sampled in small steps until the first tissue voxel is met.

use crate::float_types::{
    Real,
    parry3d::query::{Ray, RayCast},
};
use crate::pose::ResolvedPose;
use crate::probe_kind::ShankGeometry;
use crate::settings::SurfaceSearch;
use crate::space::CoordinateSpace;
use crate::traits::LabelVolume;
use log::{debug, warn};
use nalgebra::{Point3, Vector3};

/// Where the shaft meets tissue, if it does.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceResult {
    pub in_brain: bool,
    /// World-space crossing point. All components are NaN when not in brain.
    pub surface: Point3<Real>,
    /// Negative while the tip is above the surface, positive once driven past it.
    pub signed_depth: Real,
}

impl SurfaceResult {
    pub fn outside() -> Self {
        Self {
            in_brain: false,
            surface: Point3::new(Real::NAN, Real::NAN, Real::NAN),
            signed_depth: Real::NAN,
        }
    }

    pub fn inside(tip: &Point3<Real>, surface: Point3<Real>, up: &Vector3<Real>) -> Self {
        let offset = *tip - surface;
        let sign = offset.dot(&-up).signum();
        Self {
            in_brain: true,
            surface,
            signed_depth: sign * offset.norm(),
        }
    }
}

/// Whether the caller knows the tip already sits inside tissue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SearchMode {
    /// Scan down from above the shaft for the first tissue voxel.
    #[default]
    FromOutside,
    /// The tip is in tissue; march up the shaft until leaving it.
    CrossedThrough,
}

pub struct SurfaceFinder<'a, V: LabelVolume + ?Sized> {
    space: &'a CoordinateSpace,
    volume: &'a V,
    search: &'a SurfaceSearch,
}

impl<'a, V: LabelVolume + ?Sized> SurfaceFinder<'a, V> {
    pub const fn new(space: &'a CoordinateSpace, volume: &'a V, search: &'a SurfaceSearch) -> Self {
        Self {
            space,
            volume,
            search,
        }
    }

    /// Label of the voxel nearest a world point.
    pub fn label_at_world(&self, world: &Point3<Real>) -> i32 {
        self.volume.label_nearest(&self.space.world_to_index(world))
    }

    fn in_tissue(&self, world: &Point3<Real>) -> bool {
        self.label_at_world(world) > 0
    }

    /// Find the surface crossing for a probe whose tip is at `tip` with unit `up` axis.
    pub fn find(&self, tip: &Point3<Real>, up: &Vector3<Real>, mode: SearchMode) -> SurfaceResult {
        match mode {
            SearchMode::FromOutside => self.scan_from_outside(tip, up),
            SearchMode::CrossedThrough => {
                if self.in_tissue(tip) {
                    self.march_out(tip, up)
                } else {
                    debug!("crossed-through search started outside tissue, scanning from above");
                    self.scan_from_outside(tip, up)
                }
            }
        }
    }

    /// One crossing per shank, in `geometry.shank_offsets` order. The first entry
    /// belongs to the shank at the probe tip.
    pub fn find_for_shanks(
        &self,
        pose: &ResolvedPose,
        geometry: &ShankGeometry,
        mode: SearchMode,
    ) -> Vec<SurfaceResult> {
        pose.shank_tips(geometry)
            .iter()
            .map(|tip| self.find(tip, &pose.up, mode))
            .collect()
    }

    /// Boundary points where the shaft line enters and leaves the volume's box.
    /// `(entry, exit)`: entry is the high end, exit the low end.
    fn bracket(&self, tip: &Point3<Real>, up: &Vector3<Real>) -> Option<(Point3<Real>, Point3<Real>)> {
        let bounds = self.space.world_bounds();
        let s = self.search;

        let low = Ray::new(*tip + up * s.tip_offset - up * s.ray_offset, *up);
        let exit = bounds
            .cast_local_ray(&low, s.ray_length, true)
            .map(|toi| low.point_at(toi));
        if exit.is_none() {
            warn!("no lower boundary hit for shaft at {tip}");
        }

        let high = Ray::new(*tip + up * s.top_offset + up * s.ray_offset, -up);
        let entry = bounds
            .cast_local_ray(&high, s.ray_length, true)
            .map(|toi| high.point_at(toi));
        if entry.is_none() {
            warn!("no upper boundary hit for shaft at {tip}");
        }

        entry.zip(exit)
    }

    fn scan_from_outside(&self, tip: &Point3<Real>, up: &Vector3<Real>) -> SurfaceResult {
        let Some((entry, exit)) = self.bracket(tip, up) else {
            return SurfaceResult::outside();
        };

        if self.in_tissue(&entry) && self.in_tissue(tip) {
            // tissue reaches the top of the box, look for where the shaft leaves it instead
            return self.march_out(tip, up);
        }

        let step = self.search.interpolation_step;
        let steps = (1.0 / step).ceil() as usize;
        for i in 0..=steps {
            let t = (i as Real * step).min(1.0);
            let p = entry + (exit - entry) * t;
            if self.in_tissue(&p) {
                return SurfaceResult::inside(tip, p, up);
            }
        }

        debug!("shaft through {tip} never meets tissue");
        SurfaceResult::outside()
    }

    /// From a tip inside tissue, walk up the shaft to the last tissue sample.
    fn march_out(&self, tip: &Point3<Real>, up: &Vector3<Real>) -> SurfaceResult {
        let res = self.space.resolution();
        let stride = res.x.min(res.y).min(res.z) * 0.5;
        let limit = self.space.extent_mm().norm();

        let mut last_inside = *tip;
        let mut travelled = 0.0;
        while travelled <= limit {
            travelled += stride;
            let p = *tip + up * travelled;
            if !self.in_tissue(&p) {
                return SurfaceResult::inside(tip, last_inside, up);
            }
            last_inside = p;
        }

        warn!("shaft at {tip} never leaves tissue");
        SurfaceResult::outside()
    }

    /// Drop-to-surface helper: march down from `search_distance` above `start`
    /// and return the first tissue point. The search start is pushed twice as
    /// high if it already sits in tissue so the shaft enters at least once.
    pub fn find_surface_below(
        &self,
        start: &Point3<Real>,
        up: &Vector3<Real>,
        search_distance: Real,
    ) -> Option<Point3<Real>> {
        let mut top = *start + up * search_distance;
        if self.in_tissue(&top) {
            top = *start + up * (2.0 * search_distance);
        }

        let step = self.search.drop_step;
        let steps = (1.0 / step).ceil() as usize;
        (0..=steps)
            .map(|i| top + (*start - top) * (i as Real * step).min(1.0))
            .find(|p| self.in_tissue(p))
    }
}
