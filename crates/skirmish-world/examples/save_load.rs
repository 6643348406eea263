//! Save/load example: a small skirmish written to disk and read back.
//!
//! Sets up a user data directory with a map, spawns a few units, saves the
//! world, loads it into a fresh one and prints what came back.
//!
//! Run with: `RUST_LOG=debug cargo run -p skirmish-world --example save_load`

use std::path::Path;
use std::sync::Arc;

use skirmish_persist::{ColorRgba, GameVariant};
use skirmish_world::ai::guard::GUARD_INNER;
use skirmish_world::skirmish::SkirmishSlot;
use skirmish_world::{
    DefinitionStore, GameSession, GameType, LoadedMap, ObjectDefinition, RadarPriority,
    SaveConfig, SaveGame, SessionError, World,
};
use tracing_subscriber::EnvFilter;

/// Prints what a real game would start.
struct PrintingSession;

impl GameSession for PrintingSession {
    fn start_single_player(&mut self, map_path: &Path) -> Result<LoadedMap, SessionError> {
        println!("starting single player on {}", map_path.display());
        Ok(LoadedMap::default())
    }

    fn start_skirmish(
        &mut self,
        map_path: &Path,
        settings: &skirmish_world::skirmish::SkirmishGameSettings,
    ) -> Result<LoadedMap, SessionError> {
        println!(
            "starting skirmish on {} with {} players (seed {})",
            map_path.display(),
            settings.slots.len(),
            settings.seed
        );
        Ok(LoadedMap::default())
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let dir = tempfile::tempdir()?;
    let map_path = dir.path().join("Save/00000001.map");
    std::fs::create_dir_all(dir.path().join("Save"))?;
    std::fs::write(&map_path, b"a very small map")?;

    let mut definitions = DefinitionStore::new();
    definitions.insert(ObjectDefinition::new("Tank").with_radar_priority(RadarPriority::Unit))?;
    definitions.insert(
        ObjectDefinition::new("Ranger")
            .with_radar_priority(RadarPriority::Unit)
            .with_ai(),
    )?;
    let definitions = Arc::new(definitions);

    let save_game = SaveGame::new(
        SaveConfig::new(GameVariant::ZeroHour, dir.path()),
        Arc::clone(&definitions),
    );

    // --- Build a world ---

    let mut world = World::new(definitions);
    world.map.map_path1 = "Save\\00000001.map".into();
    world.map.game_type = GameType::Skirmish;
    world.map.skirmish.seed = 1234;
    world.map.skirmish.slots.push(SkirmishSlot {
        player_name: "Player".into(),
        faction: "FactionAmerica".into(),
        ..SkirmishSlot::default()
    });
    world.game_state.display_name = "Example".into();

    let blue = ColorRgba::new(0, 0, 255, 255);
    let tank = world.spawn("Tank", blue)?;
    let ranger = world.spawn("Ranger", blue)?;
    if let Some(ai) = world.object_mut(ranger).and_then(|object| object.ai.as_mut()) {
        let guard = ai.guard()?;
        guard.machine.base.transition(GUARD_INNER)?;
        guard.machine.guard_object_id = tank;
    }

    // --- Save and load ---

    let save_path = dir.path().join("Save/example.sav");
    save_game.save(&mut world, &save_path)?;
    println!("saved {} bytes", std::fs::metadata(&save_path)?.len());

    let loaded = save_game.load(&save_path, &mut PrintingSession)?;
    for (id, object) in loaded.logic.objects.iter() {
        println!(
            "{id}: {} health {} on radar: {}",
            object.definition_name(),
            object.health,
            loaded.radar.contains(id)
        );
    }

    Ok(())
}
