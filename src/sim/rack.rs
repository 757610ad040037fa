//! Racking balls for the opening break
//!
//! The cue ball goes on the head spot, fifteen object balls in a triangle on
//! the foot spot. A small seeded jitter keeps the rack from being perfectly
//! tight, the way a real rack never is.

use glam::DVec3;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::body::{BallKind, BodyId};
use super::world::World;
use crate::config::{BallSpec, TableSpec};

/// Rows in a fifteen-ball triangle
const RACK_ROWS: usize = 5;
/// Nominal gap between neighbouring racked balls (m)
const RACK_GAP: f64 = 0.0005;

/// Ids of the racked balls
#[derive(Debug, Clone)]
pub struct Rack {
    pub cue: BodyId,
    pub objects: Vec<BodyId>,
}

/// Head spot (cue ball) and foot spot (apex ball), one quarter of the table
/// length from either short cushion
pub fn spots(table: &TableSpec) -> (DVec3, DVec3) {
    let quarter = table.length / 4.0;
    (
        DVec3::new(-quarter, 0.0, 0.0),
        DVec3::new(quarter, 0.0, 0.0),
    )
}

/// Place the cue ball and a fifteen-ball triangle
pub fn rack(world: &mut World, ball: &BallSpec, table: &TableSpec, seed: u64) -> Rack {
    let mut rng = Pcg32::seed_from_u64(seed);
    let radius = ball.radius();
    let extents = DVec3::from_array(ball.extents);
    let rest_height = table.surface_height + radius;
    let (head, foot) = spots(table);

    let cue = world.spawn(
        BallKind::Cue,
        head + DVec3::Y * rest_height,
        extents,
        ball.deceleration,
    );

    // Triangular lattice with neighbours RACK_GAP apart; each ball then
    // wanders less than half that gap so neighbours never touch
    let spacing = 2.0 * radius + RACK_GAP;
    let row_spacing = spacing * (3.0f64).sqrt() / 2.0;
    let wander = RACK_GAP / 4.0;
    let mut objects = Vec::with_capacity(15);
    let mut number = 1u8;
    for row in 0..RACK_ROWS {
        for slot in 0..=row {
            let x = foot.x + row as f64 * row_spacing + rng.random_range(-wander..wander);
            let z = (slot as f64 - row as f64 / 2.0) * spacing + rng.random_range(-wander..wander);
            let id = world.spawn(
                BallKind::Object(number),
                DVec3::new(x, rest_height, z),
                extents,
                ball.deceleration,
            );
            objects.push(id);
            number += 1;
        }
    }

    log::debug!("Racked {} object balls (seed {})", objects.len(), seed);
    Rack { cue, objects }
}

/// Planar cue velocity for a shot at `speed` along `angle_degrees` (from +x
/// toward +z)
pub fn shot_velocity(speed: f64, angle_degrees: f64) -> DVec3 {
    let angle = angle_degrees.to_radians();
    DVec3::new(angle.cos(), 0.0, angle.sin()) * speed
}
