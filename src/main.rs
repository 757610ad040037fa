//! Headless break-shot driver
//!
//! Racks a table, strikes the cue ball and steps until everything stops,
//! then prints the final ball states as JSON.
//!
//! Usage: `cue-ccd [config.json]`

use std::error::Error;

use cue_ccd::Config;
use cue_ccd::consts::SIM_DT;
use cue_ccd::sim::{Table, World, advance_macro_step, rack, shot_velocity};

/// Give up on a shot that has not settled after this long (s)
const MAX_SHOT_SECONDS: f64 = 60.0;

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    log::info!("Cue CCD starting...");

    let config = match std::env::args().nth(1) {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    let table = Table::standard(&config.table)?;
    log::info!(
        "Table: {} walls, {} edges, {} pockets",
        table.walls().len(),
        table.edges().len(),
        table.pockets().len()
    );

    let mut world = World::new(table, config.sim.clone());
    let racked = rack(&mut world, &config.ball, &config.table, config.seed);
    world.strike(
        racked.cue,
        shot_velocity(config.shot.speed, config.shot.angle_degrees),
    )?;

    let max_steps = (MAX_SHOT_SECONDS / SIM_DT).ceil() as u64;
    let mut steps = 0u64;
    let mut pocketed = Vec::new();
    while !world.is_at_rest() && steps < max_steps {
        pocketed.extend(advance_macro_step(&mut world, SIM_DT));
        steps += 1;
    }

    if world.is_at_rest() {
        log::info!("Table at rest after {:.2}s", steps as f64 * SIM_DT);
    } else {
        log::warn!("Shot still running after {MAX_SHOT_SECONDS}s; stopping");
    }
    for capture in &pocketed {
        log::info!("Pocketed {:?} in pocket {}", capture.kind, capture.pocket);
    }

    let report = serde_json::json!({
        "seconds": steps as f64 * SIM_DT,
        "pocketed": pocketed,
        "balls": world.bodies(),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
