//! The live set of bodies on a fixed table
//!
//! Broad phase is brute force: every wall, every edge and every other body
//! is queried for each body. The table has a handful of cushions and at
//! most sixteen balls, so there is nothing to partition.

use glam::DVec3;
use serde::Serialize;
use thiserror::Error;

use super::body::{BallKind, Body, BodyId};
use super::collision::{CollisionEvent, ball_collision, edge_collision, wall_collision};
use super::geometry::Table;
use crate::config::SimParams;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SimError {
    #[error("no body with id {0}")]
    UnknownBody(BodyId),
}

/// Bodies, table geometry and stepping parameters
#[derive(Debug, Clone, Serialize)]
pub struct World {
    table: Table,
    params: SimParams,
    /// Sorted by id for deterministic iteration
    bodies: Vec<Body>,
    next_id: u32,
}

impl World {
    pub fn new(table: Table, params: SimParams) -> Self {
        Self {
            table,
            params,
            bodies: Vec::new(),
            next_id: 1,
        }
    }

    /// Place a resting ball on the table
    pub fn spawn(
        &mut self,
        kind: BallKind,
        center: DVec3,
        extents: DVec3,
        deceleration: f64,
    ) -> BodyId {
        let id = BodyId(self.next_id);
        self.next_id += 1;
        self.bodies.push(Body::new(id, kind, center, extents, deceleration));
        id
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn params(&self) -> &SimParams {
        &self.params
    }

    pub fn bodies(&self) -> &[Body] {
        &self.bodies
    }

    pub(crate) fn bodies_mut(&mut self) -> &mut [Body] {
        &mut self.bodies
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    pub fn body(&self, id: BodyId) -> Option<&Body> {
        self.index_of(id).map(|i| &self.bodies[i])
    }

    fn index_of(&self, id: BodyId) -> Option<usize> {
        self.bodies.binary_search_by_key(&id, Body::id).ok()
    }

    fn body_mut(&mut self, id: BodyId) -> Result<&mut Body, SimError> {
        let index = self.index_of(id).ok_or(SimError::UnknownBody(id))?;
        Ok(&mut self.bodies[index])
    }

    pub fn remove(&mut self, id: BodyId) -> Option<Body> {
        self.index_of(id).map(|i| self.bodies.remove(i))
    }

    /// Whether every body has stopped rolling and nothing is still
    /// dropping into a pocket
    pub fn is_at_rest(&self) -> bool {
        self.bodies
            .iter()
            .all(|body| body.is_at_rest() && body.captured().is_none())
    }

    /// Cue strike: set a body's velocity and zero its angular rate
    pub fn strike(&mut self, id: BodyId, velocity: DVec3) -> Result<(), SimError> {
        self.body_mut(id)?.strike(velocity);
        log::debug!("Strike {} with velocity {:?}", id, velocity);
        Ok(())
    }

    /// Set a body's cosmetic spin
    pub fn set_spin(&mut self, id: BodyId, rate: f64, axis: DVec3) -> Result<(), SimError> {
        self.body_mut(id)?.set_spin(rate, axis);
        Ok(())
    }

    /// Earliest event for the body at `index` within `dt`.
    ///
    /// Candidates are checked walls first, then edges, then bodies by id;
    /// a later candidate must be strictly earlier to win.
    pub fn earliest_collision(&self, index: usize, dt: f64) -> CollisionEvent {
        let body = &self.bodies[index];
        let mut best = CollisionEvent::coast(body, dt);

        let mut consider = |event: Option<CollisionEvent>| {
            if let Some(event) = event {
                if event.elapsed < best.elapsed {
                    best = event;
                }
            }
        };

        for (i, wall) in self.table.walls().iter().enumerate() {
            consider(wall_collision(body, i, wall, dt));
        }
        for (i, edge) in self.table.edges().iter().enumerate() {
            consider(edge_collision(body, i, edge, dt));
        }
        for (j, other) in self.bodies.iter().enumerate() {
            if j != index {
                consider(ball_collision(body, other, dt, self.params.toi_refinement_passes));
            }
        }

        best
    }

    /// Apply a resolved event to its body, and to the partner of a
    /// ball-ball impact
    pub(crate) fn apply(&mut self, event: &CollisionEvent) {
        if let Ok(body) = self.body_mut(event.body) {
            body.resolve(event.position, event.velocity);
        }
        if let Some(paired) = event.paired {
            if let Ok(other) = self.body_mut(paired.body) {
                other.resolve(paired.position, paired.velocity);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::collision::Contact;
    use crate::sim::geometry::WallSpec;

    const R: f64 = 0.5;

    /// Square box [-5, 5]² with walls facing inward
    fn boxed_world() -> World {
        let h = 2.0;
        let side = |a: (f64, f64), b: (f64, f64)| WallSpec {
            vertices: vec![
                DVec3::new(a.0, 0.0, a.1),
                DVec3::new(b.0, 0.0, b.1),
                DVec3::new(b.0, h, b.1),
                DVec3::new(a.0, h, a.1),
            ],
            facing: DVec3::new(0.0, 1.0, 0.0),
        };
        let walls = vec![
            side((-5.0, -5.0), (5.0, -5.0)),
            side((5.0, -5.0), (5.0, 5.0)),
            side((5.0, 5.0), (-5.0, 5.0)),
            side((-5.0, 5.0), (-5.0, -5.0)),
        ];
        let table = Table::new(walls, Vec::new(), 0.0).unwrap();
        World::new(table, SimParams::default())
    }

    fn spawn(world: &mut World, x: f64, z: f64) -> BodyId {
        world.spawn(BallKind::Object(1), DVec3::new(x, R, z), DVec3::splat(R), 0.0)
    }

    #[test]
    fn test_coasts_when_nothing_in_reach() {
        let mut world = boxed_world();
        let id = spawn(&mut world, 0.0, 0.0);
        world.strike(id, DVec3::new(1.0, 0.0, 0.0)).unwrap();

        let event = world.earliest_collision(0, 1.0);
        assert_eq!(event.contact, Contact::None);
        assert_eq!(event.elapsed, 1.0);
        assert!((event.position.x - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_picks_ball_before_wall() {
        let mut world = boxed_world();
        let a = spawn(&mut world, 0.0, 0.0);
        let b = spawn(&mut world, 2.0, 0.0);
        world.strike(a, DVec3::new(1.0, 0.0, 0.0)).unwrap();

        let event = world.earliest_collision(0, 10.0);
        assert_eq!(event.contact, Contact::Ball(b));
        assert!((event.elapsed - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_picks_wall_when_ball_is_off_line() {
        let mut world = boxed_world();
        let a = spawn(&mut world, 0.0, 0.0);
        spawn(&mut world, 0.0, 3.0);
        world.strike(a, DVec3::new(2.0, 0.0, 0.0)).unwrap();

        let event = world.earliest_collision(0, 10.0);
        assert_eq!(event.contact, Contact::Wall(1));
        // Surface reaches x = 5 after 4.5 units
        assert!((event.elapsed - 2.25).abs() < 1e-9);
    }

    #[test]
    fn test_corner_resolves_through_edge() {
        // Single cushion in the plane x = 1 covering z in [0, 5], facing -x.
        // A ball rolling along +z just inside the cushion line never meets
        // the face but clips the cushion's end at z = 0.
        let walls = vec![WallSpec {
            vertices: vec![
                DVec3::new(1.0, 0.0, 0.0),
                DVec3::new(1.0, 0.0, 5.0),
                DVec3::new(1.0, 2.0, 5.0),
                DVec3::new(1.0, 2.0, 0.0),
            ],
            facing: DVec3::new(0.0, 1.0, 2.0),
        }];
        let table = Table::new(walls, Vec::new(), 0.0).unwrap();
        let mut world = World::new(table, SimParams::default());
        let id = world.spawn(BallKind::Cue, DVec3::new(0.7, R, -3.0), DVec3::splat(R), 0.0);
        world.strike(id, DVec3::new(0.0, 0.0, 1.0)).unwrap();

        let event = world.earliest_collision(0, 10.0);
        // The cushion's z = 0 end is the second edge derived from it
        assert_eq!(event.contact, Contact::Edge(1));
        // Lateral offset 0.3: contact after 3 - sqrt(0.25 - 0.09) = 2.6
        assert!((event.elapsed - 2.6).abs() < 1e-9);
        // Tangent plane normal is (-0.6, 0, -0.8): thrown back and away
        assert!((event.velocity - DVec3::new(-0.96, 0.0, -0.28)).length() < 1e-9);
    }

    #[test]
    fn test_apply_updates_both_partners() {
        let mut world = boxed_world();
        let a = spawn(&mut world, 0.0, 0.0);
        let b = spawn(&mut world, 2.0, 0.0);
        world.strike(a, DVec3::new(1.0, 0.0, 0.0)).unwrap();

        let event = world.earliest_collision(0, 10.0);
        world.apply(&event);
        assert!(world.body(a).unwrap().is_at_rest());
        assert!((world.body(b).unwrap().velocity().x - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_body() {
        let mut world = boxed_world();
        assert_eq!(
            world.strike(BodyId(42), DVec3::X),
            Err(SimError::UnknownBody(BodyId(42)))
        );
        assert!(world.remove(BodyId(42)).is_none());
    }
}
