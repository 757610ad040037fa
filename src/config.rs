//! Simulation and table configuration
//!
//! Every section has sensible defaults, so a config file only needs the
//! values it wants to change.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::{BALL_DECELERATION, BALL_RADIUS, TABLE_SURFACE};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Stepping tolerances and tunables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimParams {
    /// Remaining macro-step time below which sub-stepping stops (s)
    pub time_floor: f64,
    /// Events this close to the earliest one count as simultaneous (s)
    pub event_epsilon: f64,
    /// Extra ball-ball time-of-impact solves after the first linear one.
    /// One is typically enough at table speeds; more trade cost for accuracy.
    pub toi_refinement_passes: u32,
    /// Upper bound on sub-steps per macro step
    pub max_substeps: u32,
    /// Fall acceleration for balls dropping into a pocket (m/s²)
    pub gravity: f64,
}

impl Default for SimParams {
    fn default() -> Self {
        Self {
            time_floor: 1e-9,
            event_epsilon: 1e-9,
            toi_refinement_passes: 1,
            max_substeps: 256,
            gravity: 9.81,
        }
    }
}

/// Dimensions of a six-pocket table (meters)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableSpec {
    /// Playing length between short cushion noses (x)
    pub length: f64,
    /// Playing width between long cushion noses (z)
    pub width: f64,
    pub surface_height: f64,
    pub cushion_height: f64,
    /// Distance from a corner to where the cushion starts
    pub corner_mouth: f64,
    /// Half the gap in a long rail at a side pocket
    pub side_mouth: f64,
    /// Length scale of the angled jaw walls
    pub jaw_depth: f64,
    /// How far side jaws lean toward the pocket (0 = straight back)
    pub side_jaw_slant: f64,
    /// Corner pocket centers sit this far outside the corner, per axis
    pub corner_pocket_offset: f64,
    /// Side pocket centers sit this far outside the long rail
    pub side_pocket_offset: f64,
    pub corner_pocket_radius: f64,
    pub side_pocket_radius: f64,
    /// How far below the surface a ball center must drop to be removed
    pub pocket_depth: f64,
}

impl Default for TableSpec {
    fn default() -> Self {
        Self {
            length: 2.54,
            width: 1.27,
            surface_height: TABLE_SURFACE,
            cushion_height: 0.036,
            corner_mouth: 0.06,
            side_mouth: 0.065,
            jaw_depth: 0.05,
            side_jaw_slant: 0.3,
            corner_pocket_offset: 0.01,
            side_pocket_offset: 0.02,
            corner_pocket_radius: 0.065,
            side_pocket_radius: 0.07,
            pocket_depth: 0.05,
        }
    }
}

/// Ball shape and rolling resistance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BallSpec {
    /// Half-extents along x, y, z; collision uses the largest
    pub extents: [f64; 3],
    pub deceleration: f64,
}

impl Default for BallSpec {
    fn default() -> Self {
        Self {
            extents: [BALL_RADIUS; 3],
            deceleration: BALL_DECELERATION,
        }
    }
}

impl BallSpec {
    /// Bounding-sphere radius
    pub fn radius(&self) -> f64 {
        self.extents.iter().fold(0.0, |r, e| r.max(e.abs()))
    }
}

/// The opening cue strike
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShotSpec {
    /// Cue ball speed (m/s)
    pub speed: f64,
    /// Aim angle in the table plane, degrees from +x toward +z
    pub angle_degrees: f64,
}

impl Default for ShotSpec {
    fn default() -> Self {
        Self {
            speed: 6.0,
            angle_degrees: 0.0,
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub sim: SimParams,
    pub table: TableSpec,
    pub ball: BallSpec,
    pub shot: ShotSpec,
    /// Seed for rack jitter
    pub seed: u64,
}

impl Config {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json(&json)?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }
}
