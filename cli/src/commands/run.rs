use std::time::Duration;

use anyhow::Context;
use kinetic2d_core::config::{DEFAULT_POSITION_ITERATIONS, DEFAULT_VELOCITY_ITERATIONS};
use kinetic2d_core::{Vec2, World};

/// Step a scene for a fixed number of frames and print a solver report.
pub fn run(
    scene_path: &str,
    steps: u32,
    dt: f32,
    warm_starting: bool,
    allow_sleep: bool,
    dump: Option<&str>,
) -> anyhow::Result<()> {
    let json = std::fs::read_to_string(scene_path)
        .with_context(|| format!("reading scene file {scene_path}"))?;
    let mut world = World::new(Vec2::new(0.0, -10.0));
    world
        .load_json(&json)
        .with_context(|| format!("loading scene {scene_path}"))?;

    println!(
        "loaded {} bodies, {} joints from {scene_path}",
        world.body_count(),
        world.joint_count()
    );

    let mut collision = Duration::ZERO;
    let mut init = Duration::ZERO;
    let mut velocity = Duration::ZERO;
    let mut position = Duration::ZERO;
    let mut position_iterations = 0usize;
    let mut contacts_peak = 0usize;
    let mut broken = Vec::new();

    for frame in 0..steps {
        let stats = world.step(
            dt,
            DEFAULT_VELOCITY_ITERATIONS,
            DEFAULT_POSITION_ITERATIONS,
            warm_starting,
            allow_sleep,
        );
        collision += stats.collision;
        init += stats.init;
        velocity += stats.velocity_solver;
        position += stats.position_solver;
        position_iterations += stats.position_iterations;
        contacts_peak = contacts_peak.max(stats.contacts);
        for id in &stats.broken_joints {
            log::info!("joint {id} broke on frame {frame}");
            broken.push(*id);
        }
    }

    println!("{steps} steps at dt={dt}");
    println!("  collision: {collision:?}");
    println!("  init:      {init:?}");
    println!("  velocity:  {velocity:?}");
    println!("  position:  {position:?}");
    println!(
        "  mean position iterations: {:.2}",
        position_iterations as f64 / steps.max(1) as f64
    );
    println!("  peak contacts: {contacts_peak}");
    if !broken.is_empty() {
        println!("  broken joints: {broken:?}");
    }

    if let Some(path) = dump {
        let out = world.to_json().context("serializing final scene")?;
        std::fs::write(path, out).with_context(|| format!("writing {path}"))?;
        println!("final scene written to {path}");
    }
    Ok(())
}
