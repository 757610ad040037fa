//! Deterministic simulation module
//!
//! Everything that moves a ball lives here. The module is pure and
//! deterministic:
//! - Analytic motion, no fixed-rate integration inside a step
//! - Seeded RNG only (racking)
//! - Stable iteration order (by body id)
//! - No I/O

pub mod body;
pub mod collision;
pub mod geometry;
pub mod pocket;
pub mod rack;
pub mod tick;
pub mod world;

pub use body::{BallKind, Body, BodyId, Motion, Snapshot};
pub use collision::{
    CollisionEvent, Contact, PairedOutcome, ball_collision, edge_collision, elastic_exchange,
    reflect, wall_collision,
};
pub use geometry::{Edge, GeometryError, Pocket, PocketStatus, Table, Wall, WallSpec};
pub use pocket::{CaptureEvent, filter_pockets};
pub use rack::{Rack, rack, shot_velocity, spots};
pub use tick::{ResolvedContact, StepTrace, advance_macro_step, integrate};
pub use world::{SimError, World};
