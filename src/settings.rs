//! Every tunable the core reads, loadable from JSON with per-field defaults.

use crate::errors::ProbeError;
use crate::float_types::Real;
use crate::insertion::AngleConvention;
use serde::{Deserialize, Serialize};

/// Which increment tier a movement uses, picked by modifier keys.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpeedTier {
    Slow,
    #[default]
    Normal,
    Fast,
}

/// One value per speed tier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tiered {
    pub slow: Real,
    pub normal: Real,
    pub fast: Real,
}

impl Tiered {
    pub const fn new(slow: Real, normal: Real, fast: Real) -> Self {
        Self { slow, normal, fast }
    }

    pub const fn get(&self, tier: SpeedTier) -> Real {
        match tier {
            SpeedTier::Slow => self.slow,
            SpeedTier::Normal => self.normal,
            SpeedTier::Fast => self.fast,
        }
    }
}

/// Keyboard increments. Tap values are absolute, hold values are per second.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StepTable {
    /// mm per tap
    pub move_tap: Tiered,
    /// mm per second
    pub move_hold: Tiered,
    /// degrees per tap
    pub rotate_tap: Tiered,
    /// degrees per second
    pub rotate_hold: Tiered,
}

impl Default for StepTable {
    fn default() -> Self {
        Self {
            move_tap: Tiered::new(0.001, 0.010, 0.100),
            move_hold: Tiered::new(0.010, 0.100, 1.000),
            rotate_tap: Tiered::new(0.1, 1.0, 10.0),
            rotate_hold: Tiered::new(2.5, 5.0, 25.0),
        }
    }
}

/// Cursor-to-pose gains for drag gestures, per world unit of cursor travel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DragGains {
    pub translation: Real,
    /// Depth per unit of vertical cursor travel, applied incrementally.
    pub depth: Real,
    /// Degrees of theta per unit of vertical travel.
    pub theta: Real,
    /// Degrees of phi per unit of horizontal travel.
    pub phi: Real,
}

impl Default for DragGains {
    fn default() -> Self {
        Self {
            translation: 1.0,
            depth: -1.5,
            theta: 3.0,
            phi: -3.0,
        }
    }
}

/// Ray-march parameters, all in mm except the two normalised steps.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceSearch {
    /// Start of the lower ray above the tip.
    pub tip_offset: Real,
    /// Start of the upper ray above the tip.
    pub top_offset: Real,
    /// How far each ray origin is pushed back along its own direction.
    pub ray_offset: Real,
    pub ray_length: Real,
    /// Fraction of the bracketed span advanced per sample.
    pub interpolation_step: Real,
    pub drop_search_distance: Real,
    /// How far below the tip a drop search starts when no crossing is known.
    pub drop_start_offset: Real,
    /// Fraction of the drop search span advanced per sample.
    pub drop_step: Real,
}

impl Default for SurfaceSearch {
    fn default() -> Self {
        Self {
            tip_offset: 0.2,
            top_offset: 10.2,
            ray_offset: 20.0,
            ray_length: 40.0,
            interpolation_step: 0.002,
            drop_search_distance: 10.2,
            drop_start_offset: 5.0,
            drop_step: 0.0005,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Reject moves that make the active probe penetrate another collider.
    pub detect_collisions: bool,
    pub step: StepTable,
    /// Seconds a key must be held before hold increments start.
    pub key_hold_delay: Real,
    pub drag: DragGains,
    pub surface: SurfaceSearch,
    pub angle_convention: AngleConvention,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            detect_collisions: true,
            step: StepTable::default(),
            key_hold_delay: 0.300,
            drag: DragGains::default(),
            surface: SurfaceSearch::default(),
            angle_convention: AngleConvention::Native,
        }
    }
}

impl Settings {
    pub fn from_json(json: &str) -> Result<Self, ProbeError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, ProbeError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
