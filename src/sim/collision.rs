//! Time-of-impact queries and collision response
//!
//! The hard part of the table: given a ball's analytic trajectory and one
//! piece of geometry, find the earliest impact inside a horizon and the
//! post-impact state. Every query is pure and returns a value; the stepper
//! alone applies results.

use glam::DVec3;

use super::body::{Body, BodyId};
use super::geometry::{Edge, Wall};
use crate::consts::{APPROACH_EPSILON, REST_SPEED};
use crate::planar;

/// What a body runs into at the end of a sub-step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Contact {
    /// Nothing; the body coasts for the whole horizon
    None,
    Wall(usize),
    Edge(usize),
    Ball(BodyId),
}

impl Contact {
    #[inline]
    pub fn is_contact(&self) -> bool {
        !matches!(self, Contact::None)
    }
}

/// The other body's side of a ball-ball impact
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairedOutcome {
    pub body: BodyId,
    pub position: DVec3,
    pub velocity: DVec3,
}

/// Outcome of a collision query for one body
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionEvent {
    pub body: BodyId,
    /// Time until the event; equals the horizon when nothing is hit
    pub elapsed: f64,
    pub position: DVec3,
    pub velocity: DVec3,
    /// When the body comes to rest within this segment, if it does
    pub stop_time: Option<f64>,
    pub contact: Contact,
    pub paired: Option<PairedOutcome>,
}

impl CollisionEvent {
    /// Unobstructed motion for the whole horizon
    pub fn coast(body: &Body, dt: f64) -> Self {
        let motion = body.state_at(dt);
        Self {
            body: body.id(),
            elapsed: dt,
            position: motion.position,
            velocity: motion.velocity,
            stop_time: motion.stop_time,
            contact: Contact::None,
            paired: None,
        }
    }
}

/// Reflect velocity off a surface
///
/// Standard reflection: v' = v - 2(v·n)n
#[inline]
pub fn reflect(velocity: DVec3, normal: DVec3) -> DVec3 {
    velocity - 2.0 * velocity.dot(normal) * normal
}

/// Sweep a ball against a cushion polygon.
///
/// The wall plane is pushed out by the ball radius so the ball can be
/// treated as its center point. The crossing is found by interpolating the
/// signed heights at the start and at the projected end of the horizon;
/// the time to reach it comes from inverting the deceleration law, so speed
/// loss up to the impact is distance-proportional.
pub fn wall_collision(body: &Body, index: usize, wall: &Wall, dt: f64) -> Option<CollisionEvent> {
    let normal = wall.normal();
    if planar(body.velocity()).dot(normal) >= -APPROACH_EPSILON {
        return None;
    }

    let radius = body.radius();
    let start = body.center();
    let end = body.state_at(dt).position;

    let h0 = wall.signed_distance(start) - radius;
    let h1 = wall.signed_distance(end) - radius;
    if h1 > 0.0 {
        return None;
    }
    // Center already behind the cushion face: the ball is past this wall
    if h0 < -radius {
        return None;
    }

    let fraction = if h0 <= 0.0 { 0.0 } else { h0 / (h0 - h1) };
    let contact_center = start + (end - start) * fraction;

    let foot = contact_center - normal * wall.signed_distance(contact_center);
    if !wall.contains(foot) {
        return None;
    }

    let travelled = planar(contact_center - start).length();
    let elapsed = body.time_to_travel(travelled)?.min(dt);
    let at_impact = body.state_at(elapsed);

    Some(CollisionEvent {
        body: body.id(),
        elapsed,
        position: contact_center,
        velocity: reflect(at_impact.velocity, normal),
        stop_time: None,
        contact: Contact::Wall(index),
        paired: None,
    })
}

/// Sweep a ball past a vertical corner edge.
///
/// In the table plane this is closest approach of the travel line to a
/// point. On a hit, a cushion plane tangent to the ball at the contact is
/// synthesized and resolved exactly like a flat wall.
pub fn edge_collision(body: &Body, index: usize, edge: &Edge, dt: f64) -> Option<CollisionEvent> {
    let rolling = planar(body.velocity());
    let speed = rolling.length();
    if speed <= REST_SPEED {
        return None;
    }
    let direction = rolling / speed;
    let radius = body.radius();

    let start = body.center();
    let to_edge = planar(edge.bottom - start);
    let along = to_edge.dot(direction);
    // Closest approach must lie ahead
    if along <= 0.0 {
        return None;
    }
    let lateral_sq = (to_edge.length_squared() - along * along).max(0.0);
    if lateral_sq > radius * radius {
        return None;
    }

    let travel = planar(body.state_at(dt).position - start).length();
    let reach = (along - (radius * radius - lateral_sq).sqrt()).max(0.0);
    if reach > travel {
        return None;
    }

    let contact_center = start + direction * reach;
    if !edge.spans(contact_center.y) {
        return None;
    }

    let normal = planar(contact_center - edge.bottom).try_normalize()?;
    let plane = Wall::tangent_quad(edge, normal, radius);
    wall_collision(body, index, &plane, dt).map(|event| CollisionEvent {
        contact: Contact::Edge(index),
        ..event
    })
}

/// Linear time of impact for two spheres, relative to their current states
fn linear_toi(dp: DVec3, dv: DVec3, reach: f64, horizon: f64) -> Option<f64> {
    let a = dv.length_squared();
    let b = 2.0 * dp.dot(dv);
    let c = dp.length_squared() - reach * reach;

    // Separating or relatively still
    if a <= REST_SPEED * REST_SPEED || b >= 0.0 {
        return None;
    }
    let disc = b * b - 4.0 * a * c;
    if disc < 0.0 {
        return None;
    }
    let root = (-b - disc.sqrt()) / (2.0 * a);
    let t = if root < 0.0 {
        // Already overlapping and closing: resolve now
        if c <= 0.0 { 0.0 } else { return None }
    } else {
        root
    };
    (t <= horizon).then_some(t)
}

/// Sweep two balls against each other.
///
/// Both trajectories decelerate, so the linear solution is refined: advance
/// both hypothetical states to the candidate time and re-solve from there.
/// `refinement_passes` extra passes are made after the first solve; one is
/// typically enough at table speeds. If either ball stops before the
/// candidate time the query reports nothing and a later, shorter query
/// catches any real contact.
pub fn ball_collision(
    a: &Body,
    b: &Body,
    dt: f64,
    refinement_passes: u32,
) -> Option<CollisionEvent> {
    let reach = a.radius() + b.radius();
    let mut elapsed = 0.0;
    let mut state_a = a.state_at(0.0);
    let mut state_b = b.state_at(0.0);

    for _ in 0..=refinement_passes {
        let dp = state_b.position - state_a.position;
        let dv = planar(state_b.velocity) - planar(state_a.velocity);
        let Some(step) = linear_toi(dp, dv, reach, dt - elapsed) else {
            // No further contact predicted: accept the refined time only if
            // we already found one and have closed the gap
            if elapsed > 0.0 && dp.length() <= reach * (1.0 + 1e-9) {
                break;
            }
            return None;
        };
        if step <= 0.0 {
            break;
        }

        let candidate = elapsed + step;
        let next_a = a.state_at(candidate);
        let next_b = b.state_at(candidate);
        if next_a.stop_time.is_some() || next_b.stop_time.is_some() {
            return None;
        }
        elapsed = candidate;
        state_a = next_a;
        state_b = next_b;
    }

    let axis = (state_b.position - state_a.position).try_normalize()?;
    let (va, vb) = elastic_exchange(
        state_a.velocity,
        state_b.velocity,
        axis,
        a.radius(),
        b.radius(),
    );

    Some(CollisionEvent {
        body: a.id(),
        elapsed,
        position: state_a.position,
        velocity: va,
        stop_time: None,
        contact: Contact::Ball(b.id()),
        paired: Some(PairedOutcome {
            body: b.id(),
            position: state_b.position,
            velocity: vb,
        }),
    })
}

/// Central elastic impulse along `axis` (from a toward b) for two
/// equal-density spheres. Tangential components are untouched; equal radii
/// simply swap their normal components.
pub fn elastic_exchange(va: DVec3, vb: DVec3, axis: DVec3, ra: f64, rb: f64) -> (DVec3, DVec3) {
    let ma = ra.powi(3);
    let mb = rb.powi(3);
    let total = ma + mb;

    let ua = va.dot(axis);
    let ub = vb.dot(axis);
    let wa = ((ma - mb) * ua + 2.0 * mb * ub) / total;
    let wb = ((mb - ma) * ub + 2.0 * ma * ua) / total;

    (va + axis * (wa - ua), vb + axis * (wb - ub))
}
