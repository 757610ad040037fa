//! Post-step pocket pass
//!
//! Runs once after each macro step: balls over a pocket drop, fallen balls
//! leave the table, everything else is pinned back to the cloth.

use glam::DVec3;
use serde::{Deserialize, Serialize};

use super::body::{BallKind, BodyId};
use super::geometry::PocketStatus;
use super::world::World;

/// A ball removed from play by a pocket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureEvent {
    pub body: BodyId,
    pub kind: BallKind,
    pub pocket: usize,
}

/// Drop, remove and clamp bodies after a macro step of length `dt`
pub fn filter_pockets(world: &mut World, dt: f64) -> Vec<CaptureEvent> {
    let gravity = world.params().gravity;
    let pockets = world.table().pockets().to_vec();
    let surface = world.table().surface_height();
    let mut removable = Vec::new();

    for body in world.bodies_mut() {
        if body.captured().is_none() {
            let center = body.center();
            if let Some(index) = pockets
                .iter()
                .position(|p| p.classify(center) != PocketStatus::Outside)
            {
                body.capture(index);
                log::debug!("Body {} dropping into pocket {}", body.id(), index);
            }
        }

        match body.captured() {
            Some(index) => {
                // Captured balls drop straight down
                let vy = body.velocity().y - gravity * dt;
                body.resolve(body.center() + DVec3::Y * (vy * dt), DVec3::Y * vy);

                // Height alone decides removal once latched
                if body.center().y < pockets[index].fall_height {
                    removable.push(CaptureEvent {
                        body: body.id(),
                        kind: body.kind(),
                        pocket: index,
                    });
                }
            }
            None => {
                let center = body.center();
                body.set_center(DVec3::new(center.x, surface + body.radius(), center.z));
                body.set_vertical_velocity(0.0);
            }
        }
    }

    for event in &removable {
        world.remove(event.body);
        log::info!("{:?} {} captured by pocket {}", event.kind, event.body, event.pocket);
    }
    removable
}
