//! Probe types and their physical shank layout.

use crate::errors::ProbeError;
use crate::float_types::{Real, UM};
use crate::pose::ResolvedPose;
use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

/// Every supported probe model. The integer ids are stable and used for persistence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProbeKind {
    Placeholder,
    Neuropixels1,
    Neuropixels21,
    Neuropixels24,
    Ucla128K,
    Ucla256F,
    Pipette25,
    Pipette50,
    Pipette100,
    Pipette200,
}

impl ProbeKind {
    pub const ALL: [ProbeKind; 10] = [
        ProbeKind::Placeholder,
        ProbeKind::Neuropixels1,
        ProbeKind::Neuropixels21,
        ProbeKind::Neuropixels24,
        ProbeKind::Ucla128K,
        ProbeKind::Ucla256F,
        ProbeKind::Pipette25,
        ProbeKind::Pipette50,
        ProbeKind::Pipette100,
        ProbeKind::Pipette200,
    ];

    pub const fn id(self) -> i32 {
        match self {
            ProbeKind::Placeholder => -1,
            ProbeKind::Neuropixels1 => 0,
            ProbeKind::Neuropixels21 => 21,
            ProbeKind::Neuropixels24 => 24,
            ProbeKind::Ucla128K => 128,
            ProbeKind::Ucla256F => 256,
            ProbeKind::Pipette25 => 25,
            ProbeKind::Pipette50 => 50,
            ProbeKind::Pipette100 => 100,
            ProbeKind::Pipette200 => 200,
        }
    }

    pub fn from_id(id: i32) -> Result<Self, ProbeError> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.id() == id)
            .ok_or(ProbeError::UnknownProbeKind(id))
    }

    pub const fn name(self) -> &'static str {
        match self {
            ProbeKind::Placeholder => "Placeholder",
            ProbeKind::Neuropixels1 => "Neuropixels 1.0",
            ProbeKind::Neuropixels21 => "Neuropixels 2.0 (single shank)",
            ProbeKind::Neuropixels24 => "Neuropixels 2.0 (four shank)",
            ProbeKind::Ucla128K => "UCLA 128K",
            ProbeKind::Ucla256F => "UCLA 256F",
            ProbeKind::Pipette25 => "Pipette 25um",
            ProbeKind::Pipette50 => "Pipette 50um",
            ProbeKind::Pipette100 => "Pipette 100um",
            ProbeKind::Pipette200 => "Pipette 200um",
        }
    }

    /// Physical layout of this probe's shanks and base.
    pub fn geometry(self) -> ShankGeometry {
        match self {
            ProbeKind::Placeholder => ShankGeometry::single(10.0, 70.0 * UM, 24.0 * UM, None),
            ProbeKind::Neuropixels1 => ShankGeometry::single(
                10.0,
                70.0 * UM,
                24.0 * UM,
                Some(Vector3::new(0.45, 1.5, 0.15)),
            ),
            ProbeKind::Neuropixels21 => ShankGeometry::single(
                10.0,
                70.0 * UM,
                24.0 * UM,
                Some(Vector3::new(0.45, 1.0, 0.15)),
            ),
            ProbeKind::Neuropixels24 => ShankGeometry::evenly_spaced(
                4,
                0.25,
                10.0,
                70.0 * UM,
                24.0 * UM,
                Some(Vector3::new(0.6, 1.0, 0.15)),
            ),
            ProbeKind::Ucla128K => ShankGeometry::evenly_spaced(
                4,
                0.2,
                7.0,
                80.0 * UM,
                30.0 * UM,
                Some(Vector3::new(0.5, 1.0, 0.15)),
            ),
            ProbeKind::Ucla256F => ShankGeometry::evenly_spaced(
                2,
                0.5,
                7.0,
                80.0 * UM,
                30.0 * UM,
                Some(Vector3::new(0.5, 1.0, 0.15)),
            ),
            ProbeKind::Pipette25 => ShankGeometry::pipette(25.0 * UM),
            ProbeKind::Pipette50 => ShankGeometry::pipette(50.0 * UM),
            ProbeKind::Pipette100 => ShankGeometry::pipette(100.0 * UM),
            ProbeKind::Pipette200 => ShankGeometry::pipette(200.0 * UM),
        }
    }
}

/// Declarative shank layout in probe-local millimetres.
///
/// Probe-local axes: `+y` runs up the shank from the tip, `+x` is the probe's
/// right, `+z` its forward face. Each offset is the tip of one shank relative to
/// the probe tip; the first shank sits at the tip itself.
#[derive(Debug, Clone, PartialEq)]
pub struct ShankGeometry {
    pub shank_offsets: Vec<Vector3<Real>>,
    pub shank_length: Real,
    pub shank_width: Real,
    pub shank_thickness: Real,
    /// Half extents of the base above the shanks, if the probe has one.
    pub body: Option<Vector3<Real>>,
}

impl ShankGeometry {
    pub fn single(length: Real, width: Real, thickness: Real, body: Option<Vector3<Real>>) -> Self {
        Self {
            shank_offsets: vec![Vector3::zeros()],
            shank_length: length,
            shank_width: width,
            shank_thickness: thickness,
            body,
        }
    }

    /// `count` shanks along local `+x`, `spacing` mm apart.
    pub fn evenly_spaced(
        count: usize,
        spacing: Real,
        length: Real,
        width: Real,
        thickness: Real,
        body: Option<Vector3<Real>>,
    ) -> Self {
        Self {
            shank_offsets: (0..count)
                .map(|i| Vector3::new(spacing * i as Real, 0.0, 0.0))
                .collect(),
            shank_length: length,
            shank_width: width,
            shank_thickness: thickness,
            body,
        }
    }

    fn pipette(diameter: Real) -> Self {
        Self::single(10.0, diameter, diameter, None)
    }

    pub fn shank_count(&self) -> usize {
        self.shank_offsets.len()
    }

    /// Probe-local centre of the shank row, used for centring slices and the base.
    pub fn center_offset(&self) -> Vector3<Real> {
        if self.shank_offsets.is_empty() {
            return Vector3::zeros();
        }
        self.shank_offsets.iter().sum::<Vector3<Real>>() / self.shank_offsets.len() as Real
    }

    /// Half extents of one shank box.
    pub fn shank_half_extents(&self) -> Vector3<Real> {
        Vector3::new(
            self.shank_width * 0.5,
            self.shank_length * 0.5,
            self.shank_thickness * 0.5,
        )
    }

    /// Probe-local centre of the base box, resting on top of the shanks.
    pub fn body_center(&self) -> Option<Vector3<Real>> {
        self.body.map(|half| {
            let mut c = self.center_offset();
            c.y += self.shank_length + half.y;
            c
        })
    }
}

/// The active sensing segment of a shank, in mm up from the tip.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecordingRegion {
    start: Real,
    size: Real,
    shank_length: Real,
}

impl RecordingRegion {
    /// The region is clamped onto the shank; `size` is capped at `shank_length`.
    pub fn new(start: Real, size: Real, shank_length: Real) -> Self {
        let size = size.clamp(0.0, shank_length);
        Self {
            start: start.clamp(0.0, shank_length - size),
            size,
            shank_length,
        }
    }

    /// Default region for a probe kind: the bottom of the shank, up to 3.84 mm.
    pub fn for_geometry(geometry: &ShankGeometry) -> Self {
        Self::new(0.0, 3.84, geometry.shank_length)
    }

    pub const fn start(&self) -> Real {
        self.start
    }

    pub const fn size(&self) -> Real {
        self.size
    }

    pub fn end(&self) -> Real {
        self.start + self.size
    }

    /// Move the region along the shank, keeping it within `[0, shank_length]`.
    pub fn shift(&mut self, delta: Real) {
        self.start = (self.start + delta).clamp(0.0, self.shank_length - self.size);
    }

    pub fn resize(&mut self, size: Real) {
        *self = Self::new(self.start, size, self.shank_length);
    }

    /// World endpoints `(bottom, top)` of the region for a resolved pose.
    pub fn world_span(&self, pose: &ResolvedPose) -> (Point3<Real>, Point3<Real>) {
        (pose.point_along_shank(self.start), pose.point_along_shank(self.end()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_round_trip() {
        for kind in ProbeKind::ALL {
            assert_eq!(ProbeKind::from_id(kind.id()).unwrap(), kind);
        }
        assert_eq!(ProbeKind::from_id(7).unwrap_err(), ProbeError::UnknownProbeKind(7));
    }

    #[test]
    fn four_shank_spacing() {
        let g = ProbeKind::Neuropixels24.geometry();
        assert_eq!(g.shank_count(), 4);
        assert!((g.shank_offsets[3].x - 0.75).abs() < 1e-12);
        assert!((g.center_offset().x - 0.375).abs() < 1e-12);
    }

    #[test]
    fn recording_region_stays_on_shank() {
        let mut region = RecordingRegion::new(0.0, 2.0, 10.0);
        region.shift(9.0);
        assert_eq!(region.start(), 8.0);
        assert_eq!(region.end(), 10.0);
        region.shift(-20.0);
        assert_eq!(region.start(), 0.0);

        let capped = RecordingRegion::new(5.0, 20.0, 10.0);
        assert_eq!(capped.size(), 10.0);
        assert_eq!(capped.start(), 0.0);
    }

    #[test]
    fn resizing_keeps_the_region_on_the_shank() {
        let mut region = RecordingRegion::new(7.0, 2.0, 10.0);
        region.resize(4.0);
        assert_eq!(region.size(), 4.0);
        assert_eq!(region.start(), 6.0);
        assert_eq!(region.end(), 10.0);

        region.resize(-1.0);
        assert_eq!(region.size(), 0.0);
        assert_eq!(region.start(), 6.0);
    }
}
