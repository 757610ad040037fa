//! Event-ordered stepping of one macro time step
//!
//! A macro step is cut into sub-steps that each end at the next earliest
//! impact anywhere on the table. Every body coasts to that instant along its
//! own trajectory, then the single winning event is applied. Nothing is ever
//! discretized at a fixed rate, so no speed can tunnel through a cushion.

use super::body::BodyId;
use super::collision::Contact;
use super::pocket::{CaptureEvent, filter_pockets};
use super::world::World;

/// A contact resolved during a macro step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedContact {
    pub body: BodyId,
    pub contact: Contact,
    /// Time into the macro step at which it was resolved
    pub at: f64,
}

/// What happened inside one macro step
#[derive(Debug, Clone, Default)]
pub struct StepTrace {
    /// Length of every sub-step, in order; sums to the macro step
    pub substeps: Vec<f64>,
    pub contacts: Vec<ResolvedContact>,
    /// Bodies that rolled to a stop during the step
    pub came_to_rest: Vec<BodyId>,
}

impl StepTrace {
    /// Total time consumed
    pub fn elapsed(&self) -> f64 {
        self.substeps.iter().sum()
    }
}

/// Advance the world by `dt`, resolve pockets, and report captured balls
pub fn advance_macro_step(world: &mut World, dt: f64) -> Vec<CaptureEvent> {
    let trace = integrate(world, dt);
    log::trace!(
        "Macro step {:.5}s: {} sub-steps, {} contacts",
        dt,
        trace.substeps.len(),
        trace.contacts.len()
    );
    filter_pockets(world, dt)
}

/// Event-ordered sub-stepping over `dt` without the pocket pass
pub fn integrate(world: &mut World, dt: f64) -> StepTrace {
    let params = world.params().clone();
    let mut trace = StepTrace::default();
    let mut remaining = dt.max(0.0);
    let mut first = true;

    while remaining > params.time_floor {
        if trace.substeps.len() >= params.max_substeps as usize {
            log::warn!(
                "Sub-step cap {} reached with {:.3e}s left; coasting the rest",
                params.max_substeps,
                remaining
            );
            break;
        }

        let events: Vec<_> = (0..world.len())
            .map(|i| world.earliest_collision(i, remaining))
            .collect();

        let earliest = events
            .iter()
            .map(|e| e.elapsed)
            .fold(remaining, f64::min)
            .max(0.0);

        // One canonical event per sub-step: the first body, in id order,
        // whose contact lands on the earliest time
        let winner = events
            .iter()
            .find(|e| e.contact.is_contact() && e.elapsed <= earliest + params.event_epsilon);

        for (body, event) in world.bodies_mut().iter_mut().zip(&events) {
            body.advance(earliest, first);
            if let Some(stop) = event.stop_time {
                if stop <= earliest {
                    trace.came_to_rest.push(body.id());
                    log::debug!("Body {} came to rest", body.id());
                }
            }
        }
        first = false;

        if let Some(event) = winner {
            world.apply(event);
            let at = dt - remaining + earliest;
            log::trace!("{} hit {:?} at {:.6}s", event.body, event.contact, at);
            trace.contacts.push(ResolvedContact {
                body: event.body,
                contact: event.contact,
                at,
            });
        }

        trace.substeps.push(earliest);
        remaining -= earliest;
    }

    // Sub-floor remainder (or the rest after hitting the cap) coasts freely
    if remaining > 0.0 || first {
        for body in world.bodies_mut() {
            body.advance(remaining.max(0.0), first);
        }
        trace.substeps.push(remaining.max(0.0));
    }

    trace
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BallSpec, SimParams, TableSpec};
    use crate::consts::SIM_DT;
    use crate::sim::body::BallKind;
    use crate::sim::geometry::{Pocket, Table, WallSpec};
    use glam::DVec3;

    const R: f64 = 0.5;

    fn boxed_world(pockets: Vec<Pocket>) -> World {
        let side = |a: (f64, f64), b: (f64, f64)| WallSpec {
            vertices: vec![
                DVec3::new(a.0, 0.0, a.1),
                DVec3::new(b.0, 0.0, b.1),
                DVec3::new(b.0, 2.0, b.1),
                DVec3::new(a.0, 2.0, a.1),
            ],
            facing: DVec3::new(0.0, 1.0, 0.0),
        };
        let walls = vec![
            side((-5.0, -5.0), (5.0, -5.0)),
            side((5.0, -5.0), (5.0, 5.0)),
            side((5.0, 5.0), (-5.0, 5.0)),
            side((-5.0, 5.0), (-5.0, -5.0)),
        ];
        let table = Table::new(walls, pockets, 0.0).unwrap();
        World::new(table, SimParams::default())
    }

    fn spawn(world: &mut World, x: f64, z: f64, deceleration: f64) -> BodyId {
        world.spawn(BallKind::Object(1), DVec3::new(x, R, z), DVec3::splat(R), deceleration)
    }

    #[test]
    fn test_substeps_sum_to_macro_step() {
        let mut world = boxed_world(Vec::new());
        let a = spawn(&mut world, 0.0, 0.0, 0.1);
        let b = spawn(&mut world, 2.0, 0.3, 0.1);
        world.strike(a, DVec3::new(30.0, 0.0, 7.0)).unwrap();
        world.strike(b, DVec3::new(-20.0, 0.0, 11.0)).unwrap();

        let trace = integrate(&mut world, 1.0);
        assert!(trace.contacts.len() > 3, "expected several bounces");
        assert!((trace.elapsed() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_fast_ball_stays_inside_box() {
        let mut world = boxed_world(Vec::new());
        let a = spawn(&mut world, 0.0, 0.0, 0.0);
        world.strike(a, DVec3::new(500.0, 0.0, 130.0)).unwrap();

        for _ in 0..60 {
            advance_macro_step(&mut world, SIM_DT);
            let c = world.body(a).unwrap().center();
            assert!(c.x.abs() <= 4.5 + 1e-6 && c.z.abs() <= 4.5 + 1e-6, "escaped to {c:?}");
        }
        // No friction: speed survives every bounce
        let v = world.body(a).unwrap().velocity();
        assert!((v.length() - DVec3::new(500.0, 0.0, 130.0).length()).abs() < 1e-6);
    }

    #[test]
    fn test_head_on_exchange_through_stepper() {
        let mut world = boxed_world(Vec::new());
        let a = spawn(&mut world, -2.0, 0.0, 0.0);
        let b = spawn(&mut world, 2.0, 0.0, 0.0);
        world.strike(a, DVec3::new(3.0, 0.0, 0.0)).unwrap();
        world.strike(b, DVec3::new(-1.0, 0.0, 0.0)).unwrap();

        // Gap of 3 closes at 4 m/s
        let trace = integrate(&mut world, 1.0);
        assert_eq!(trace.contacts.len(), 1);
        assert!((trace.contacts[0].at - 0.75).abs() < 1e-9);
        assert!((world.body(a).unwrap().velocity().x + 1.0).abs() < 1e-9);
        assert!((world.body(b).unwrap().velocity().x - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_snapshot_holds_macro_step_start() {
        let mut world = boxed_world(Vec::new());
        let a = spawn(&mut world, 0.0, 0.0, 0.0);
        world.strike(a, DVec3::new(10.0, 0.0, 0.0)).unwrap();

        let trace = integrate(&mut world, 1.0);
        assert!(trace.substeps.len() > 1);
        let body = world.body(a).unwrap();
        assert_eq!(body.previous_snapshot().center, DVec3::new(0.0, R, 0.0));
        assert_eq!(body.previous_snapshot().velocity, DVec3::new(10.0, 0.0, 0.0));
    }

    #[test]
    fn test_ball_rolls_to_rest() {
        let mut world = boxed_world(Vec::new());
        let a = spawn(&mut world, 0.0, 0.0, 1.0);
        world.strike(a, DVec3::new(1.0, 0.0, 0.0)).unwrap();

        let trace = integrate(&mut world, 2.0);
        assert_eq!(trace.came_to_rest, vec![a]);
        assert!(world.is_at_rest());
        assert!((world.body(a).unwrap().center().x - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_newton_cradle_passes_momentum_down_the_line() {
        let mut world = boxed_world(Vec::new());
        let cue = spawn(&mut world, -3.0, 0.0, 0.0);
        let middle = spawn(&mut world, 0.0, 0.0, 0.0);
        let last = spawn(&mut world, 2.0 * R, 0.0, 0.0);
        world.strike(cue, DVec3::new(2.0, 0.0, 0.0)).unwrap();

        // First impact at t = 1, the touching pair resolves right after
        let trace = integrate(&mut world, 1.5);
        assert_eq!(trace.contacts.len(), 2);
        assert!(world.body(cue).unwrap().is_at_rest());
        assert!(world.body(middle).unwrap().is_at_rest());
        assert!((world.body(last).unwrap().velocity().x - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_step_still_snapshots() {
        let mut world = boxed_world(Vec::new());
        let a = spawn(&mut world, 0.0, 0.0, 0.0);
        world.strike(a, DVec3::new(1.0, 0.0, 0.0)).unwrap();
        integrate(&mut world, 0.5);

        let trace = integrate(&mut world, 0.0);
        assert_eq!(trace.elapsed(), 0.0);
        let body = world.body(a).unwrap();
        assert_eq!(body.previous_snapshot().center, body.center());
    }

    #[test]
    fn test_pocketed_ball_is_reported() {
        let pocket = Pocket::new(DVec3::new(3.0, 0.0, 0.0), 0.6, -1.0);
        let mut world = boxed_world(vec![pocket]);
        let a = spawn(&mut world, 0.0, 0.0, 0.0);
        world.strike(a, DVec3::new(3.0, 0.0, 0.0)).unwrap();

        let mut captures = Vec::new();
        for _ in 0..240 {
            captures.extend(advance_macro_step(&mut world, SIM_DT));
        }
        assert_eq!(captures.len(), 1);
        assert_eq!(captures[0].body, a);
        assert!(world.body(a).is_none());
    }

    #[test]
    fn test_fast_ball_is_held_by_the_pocket_it_enters() {
        // At 3 m/s the ball would cross this disc long before dropping 0.6
        let pocket = Pocket::new(DVec3::ZERO, 0.2, -0.1);
        let mut world = boxed_world(vec![pocket]);
        let a = spawn(&mut world, -1.0, 0.0, 0.0);
        world.strike(a, DVec3::new(3.0, 0.0, 0.0)).unwrap();

        let mut captures = Vec::new();
        for _ in 0..600 {
            captures.extend(advance_macro_step(&mut world, SIM_DT));
            if let Some(body) = world.body(a).filter(|b| b.captured().is_some()) {
                assert!(body.center().x.abs() <= 0.2 + 1e-9, "rolled on to {:?}", body.center());
            }
        }
        assert_eq!(captures.len(), 1);
        assert_eq!(captures[0].body, a);
        assert!(world.is_empty());
    }

    #[test]
    fn test_corner_pocket_takes_diagonal_shot() {
        let spec = TableSpec::default();
        let table = Table::standard(&spec).unwrap();
        let mut world = World::new(table, SimParams::default());
        let radius = BallSpec::default().radius();
        let corner = DVec3::new(
            spec.length / 2.0 + spec.corner_pocket_offset,
            0.0,
            spec.width / 2.0 + spec.corner_pocket_offset,
        );
        // Straight down the diagonal into the +x/+z corner
        let start = DVec3::new(corner.x - 0.4, spec.surface_height + radius, corner.z - 0.4);
        let id = world.spawn(BallKind::Object(9), start, DVec3::splat(radius), 0.15);
        world.strike(id, DVec3::new(3.0, 0.0, 3.0)).unwrap();

        let mut captures = Vec::new();
        for _ in 0..600 {
            captures.extend(advance_macro_step(&mut world, SIM_DT));
        }
        assert_eq!(captures.len(), 1);
        assert_eq!(captures[0].body, id);
        assert_eq!(captures[0].pocket, 3);
        assert!(world.is_empty());
    }

    #[test]
    fn test_determinism() {
        let run = || {
            let mut world = boxed_world(Vec::new());
            let ids: Vec<_> = (0..5)
                .map(|i| spawn(&mut world, -3.0 + 1.5 * i as f64, 0.2 * i as f64, 0.2))
                .collect();
            world.strike(ids[0], DVec3::new(8.0, 0.0, 1.0)).unwrap();
            world.strike(ids[4], DVec3::new(-3.0, 0.0, -6.0)).unwrap();
            for _ in 0..120 {
                advance_macro_step(&mut world, SIM_DT);
            }
            world.bodies().iter().map(|b| b.center()).collect::<Vec<_>>()
        };
        assert_eq!(run(), run());
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn macro_step_consumes_exactly_dt(
                vx in -40.0f64..40.0, vz in -40.0f64..40.0,
                wx in -40.0f64..40.0, wz in -40.0f64..40.0,
                dt in 0.001f64..0.5,
            ) {
                let mut world = boxed_world(Vec::new());
                let a = spawn(&mut world, -1.0, 0.0, 0.3);
                let b = spawn(&mut world, 1.5, 1.0, 0.3);
                world.strike(a, DVec3::new(vx, 0.0, vz)).unwrap();
                world.strike(b, DVec3::new(wx, 0.0, wz)).unwrap();

                let trace = integrate(&mut world, dt);
                prop_assert!((trace.elapsed() - dt).abs() < 1e-9);
                for body in world.bodies() {
                    let c = body.center();
                    prop_assert!(c.x.abs() <= 4.5 + 1e-6 && c.z.abs() <= 4.5 + 1e-6);
                }
            }
        }
    }
}
