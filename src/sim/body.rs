//! Ball bodies and their analytic law of motion
//!
//! A body rolls in a straight line under constant deceleration until it
//! stops. `state_at` answers where it will be without mutating anything;
//! `advance` commits that answer.

use glam::{DQuat, DVec3};
use serde::{Deserialize, Serialize};

use crate::consts::REST_SPEED;
use crate::planar;

/// Stable body identifier (iteration order follows ids)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BodyId(pub u32);

impl std::fmt::Display for BodyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What kind of ball this is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BallKind {
    /// The cue ball (pocketing it is a scratch)
    Cue,
    /// A numbered object ball
    Object(u8),
}

/// State copied at the start of a macro step for display interpolation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub center: DVec3,
    pub orientation: DQuat,
    pub velocity: DVec3,
}

/// Result of evaluating the motion law at some elapsed time
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Motion {
    pub position: DVec3,
    pub velocity: DVec3,
    /// Time at which the body came to rest, if it did within the queried span
    pub stop_time: Option<f64>,
}

/// A ball on the table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Body {
    id: BodyId,
    kind: BallKind,
    center: DVec3,
    velocity: DVec3,
    radius: f64,
    deceleration: f64,
    /// Cosmetic angular speed (rad/s) about `spin_axis`
    spin: f64,
    spin_axis: DVec3,
    orientation: DQuat,
    previous: Snapshot,
    /// Pocket index once the body has dropped into one
    captured: Option<usize>,
}

impl Body {
    /// Create a resting body. The collision radius is the largest of the
    /// three axis extents (bounding sphere of the ellipsoid).
    pub fn new(
        id: BodyId,
        kind: BallKind,
        center: DVec3,
        extents: DVec3,
        deceleration: f64,
    ) -> Self {
        let orientation = DQuat::IDENTITY;
        Self {
            id,
            kind,
            center,
            velocity: DVec3::ZERO,
            radius: extents.abs().max_element(),
            deceleration: deceleration.max(0.0),
            spin: 0.0,
            spin_axis: DVec3::Y,
            orientation,
            previous: Snapshot {
                center,
                orientation,
                velocity: DVec3::ZERO,
            },
            captured: None,
        }
    }

    pub fn id(&self) -> BodyId {
        self.id
    }

    pub fn kind(&self) -> BallKind {
        self.kind
    }

    pub fn center(&self) -> DVec3 {
        self.center
    }

    pub fn velocity(&self) -> DVec3 {
        self.velocity
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn deceleration(&self) -> f64 {
        self.deceleration
    }

    pub fn orientation(&self) -> DQuat {
        self.orientation
    }

    /// State at the start of the most recent macro step
    pub fn previous_snapshot(&self) -> &Snapshot {
        &self.previous
    }

    pub fn spin(&self) -> (f64, DVec3) {
        (self.spin, self.spin_axis)
    }

    pub fn captured(&self) -> Option<usize> {
        self.captured
    }

    /// Planar speed
    #[inline]
    pub fn speed(&self) -> f64 {
        planar(self.velocity).length()
    }

    pub fn is_at_rest(&self) -> bool {
        self.speed() <= REST_SPEED
    }

    /// Evaluate the motion law `t` seconds ahead without mutating the body
    pub fn state_at(&self, t: f64) -> Motion {
        let rolling = planar(self.velocity);
        let vertical = DVec3::new(0.0, self.velocity.y, 0.0);
        let s0 = rolling.length();

        if s0 <= REST_SPEED {
            return Motion {
                position: self.center,
                velocity: vertical,
                stop_time: None,
            };
        }

        let direction = rolling / s0;
        let a = self.deceleration;

        if a > 0.0 && a * t >= s0 {
            let stop_time = s0 / a;
            return Motion {
                position: self.center + direction * (0.5 * s0 * stop_time),
                velocity: vertical,
                stop_time: Some(stop_time),
            };
        }

        Motion {
            position: self.center + rolling * t - direction * (0.5 * a * t * t),
            velocity: rolling - direction * (a * t) + vertical,
            stop_time: None,
        }
    }

    /// Time needed to roll `distance` along the current line of travel.
    ///
    /// Distances past the stopping point resolve to the stop time.
    pub fn time_to_travel(&self, distance: f64) -> Option<f64> {
        let s0 = self.speed();
        if s0 <= REST_SPEED {
            return None;
        }
        let distance = distance.max(0.0);
        let a = self.deceleration;
        if a <= 0.0 {
            return Some(distance / s0);
        }
        let disc = s0 * s0 - 2.0 * a * distance;
        if disc <= 0.0 {
            return Some(s0 / a);
        }
        Some((s0 - disc.sqrt()) / a)
    }

    /// Commit `t` seconds of motion. Only the first sub-step of a macro
    /// step passes `snapshot = true`.
    pub fn advance(&mut self, t: f64, snapshot: bool) {
        if snapshot {
            self.snapshot();
        }

        let motion = self.state_at(t);
        self.center = motion.position;
        self.velocity = motion.velocity;
        if self.is_at_rest() {
            self.velocity = DVec3::new(0.0, self.velocity.y, 0.0);
        }

        if self.spin != 0.0 && t > 0.0 {
            let turn = DQuat::from_axis_angle(self.spin_axis, self.spin * t);
            self.orientation = (turn * self.orientation).normalize();
        }
    }

    /// Copy the current state into the interpolation snapshot
    pub fn snapshot(&mut self) {
        self.previous = Snapshot {
            center: self.center,
            orientation: self.orientation,
            velocity: self.velocity,
        };
    }

    /// Cue strike: set the rolling velocity and stop any spin
    pub fn strike(&mut self, velocity: DVec3) {
        self.velocity = planar(velocity) + DVec3::new(0.0, self.velocity.y, 0.0);
        self.spin = 0.0;
    }

    /// Set the cosmetic spin. A zero-length axis keeps the previous axis.
    pub fn set_spin(&mut self, rate: f64, axis: DVec3) {
        self.spin = rate;
        if let Some(axis) = axis.try_normalize() {
            self.spin_axis = axis;
        }
    }

    /// Overwrite translation with a resolved collision outcome
    pub(crate) fn resolve(&mut self, position: DVec3, velocity: DVec3) {
        self.center = position;
        self.velocity = velocity;
    }

    pub(crate) fn set_center(&mut self, center: DVec3) {
        self.center = center;
    }

    pub(crate) fn set_vertical_velocity(&mut self, vy: f64) {
        self.velocity.y = vy;
    }

    /// Latch the body into a pocket; from here it only drops
    pub(crate) fn capture(&mut self, pocket: usize) {
        self.captured = Some(pocket);
        self.velocity = DVec3::new(0.0, self.velocity.y, 0.0);
    }
}
