use anyhow::Context;
use kinetic2d_core::{Vec2, World};

/// Load a scene and serialize it back, reporting what it contains. Catches
/// malformed JSON, unknown kinds, and dangling joint references.
pub fn run(scene_path: &str) -> anyhow::Result<()> {
    let json = std::fs::read_to_string(scene_path)
        .with_context(|| format!("reading scene file {scene_path}"))?;
    let mut world = World::new(Vec2::ZERO);
    world
        .load_json(&json)
        .with_context(|| format!("loading scene {scene_path}"))?;
    world.to_json().context("re-serializing scene")?;
    println!(
        "{scene_path}: ok ({} bodies, {} joints)",
        world.body_count(),
        world.joint_count()
    );
    Ok(())
}
