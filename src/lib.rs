//! Cue CCD - continuous-collision billiard table physics
//!
//! Core modules:
//! - `sim`: Deterministic simulation (bodies, table geometry, time-of-impact
//!   queries, event-ordered stepping, pocket capture)
//! - `config`: Data-driven simulation and table parameters
//!
//! Coordinates: `y` is up, the table surface is the `x`/`z` plane. All units
//! are SI (meters, seconds).

pub mod config;
pub mod sim;

pub use config::{BallSpec, Config, ConfigError, ShotSpec, SimParams, TableSpec};

use glam::DVec3;

/// Simulation constants
pub mod consts {
    /// Fixed simulation timestep (120 Hz macro steps)
    pub const SIM_DT: f64 = 1.0 / 120.0;

    /// Planar speed below which a body is considered at rest (m/s)
    pub const REST_SPEED: f64 = 1e-6;
    /// Tolerance for coplanarity, inside-polygon and edge dedup tests (m)
    pub const GEOMETRY_EPSILON: f64 = 1e-7;
    /// Minimum closing speed along a wall normal for an impact to count
    pub const APPROACH_EPSILON: f64 = 1e-9;

    /// Pool ball radius (57.15 mm diameter)
    pub const BALL_RADIUS: f64 = 0.028575;
    /// Rolling-friction deceleration on cloth (m/s²)
    pub const BALL_DECELERATION: f64 = 0.15;
    /// Height of the playing surface
    pub const TABLE_SURFACE: f64 = 0.0;
}

/// Drop the vertical component of a vector
#[inline]
pub fn planar(v: DVec3) -> DVec3 {
    DVec3::new(v.x, 0.0, v.z)
}
