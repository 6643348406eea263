//! Shared test helpers for integration tests and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]`, like the
//! persist crate's helpers.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use glam::{Affine3A, IVec3, Vec3};
use skirmish_persist::{ColorRgba, GameVariant, ObjectId};
use tempfile::TempDir;

use crate::ai::guard::GUARD_INNER;
use crate::config::SaveConfig;
use crate::definition::{DefinitionStore, ObjectDefinition, RadarPriority};
use crate::game_logic::BuildableStatus;
use crate::save_file::SaveGame;
use crate::session::{GameSession, LoadedMap, SessionError};
use crate::skirmish::SkirmishGameSettings;
use crate::trigger::PolygonTrigger;
use crate::world::World;

/// Relative path of the map every fixture world is played on.
pub const MAP_PATH: &str = "Save\\00000001.map";

pub const MAP_BYTES: &[u8] = b"EAR\0fixture map bytes";

// ===========================================================================
// Definitions
// ===========================================================================

/// `Tank`, `Infantry` (with AI), `Barracks` (holds 10) and `Tree` (not on
/// radar).
pub fn definitions() -> Arc<DefinitionStore> {
    let mut store = DefinitionStore::new();
    for definition in [
        ObjectDefinition::new("Tank").with_radar_priority(RadarPriority::Unit),
        ObjectDefinition::new("Infantry")
            .with_radar_priority(RadarPriority::Unit)
            .with_ai(),
        ObjectDefinition::new("Barracks")
            .with_radar_priority(RadarPriority::Structure)
            .with_contain(10),
        ObjectDefinition::new("Tree"),
    ] {
        if let Err(err) = store.insert(definition) {
            panic!("fixture definitions collide: {err}");
        }
    }
    Arc::new(store)
}

pub fn triggers() -> Vec<PolygonTrigger> {
    vec![
        PolygonTrigger::new(
            1,
            "PlayerBase",
            vec![IVec3::new(0, 0, 0), IVec3::new(400, 0, 0), IVec3::new(400, 400, 0)],
        ),
        PolygonTrigger::new(7, "EnemyBase", vec![IVec3::new(-50, 10, 3)]),
    ]
}

// ===========================================================================
// Sessions
// ===========================================================================

/// Reports a fixed set of triggers and records what it was asked to start.
#[derive(Debug, Default, Clone)]
pub struct StaticMapSession {
    pub triggers: Vec<PolygonTrigger>,
    pub started: usize,
    pub last_map: Option<PathBuf>,
    pub skirmish: Option<SkirmishGameSettings>,
}

impl StaticMapSession {
    pub fn new(triggers: Vec<PolygonTrigger>) -> Self {
        Self {
            triggers,
            ..Self::default()
        }
    }

    fn start(&mut self, map_path: &Path) -> Result<LoadedMap, SessionError> {
        if !map_path.is_file() {
            return Err(SessionError::MapUnavailable {
                path: map_path.to_path_buf(),
            });
        }
        self.started += 1;
        self.last_map = Some(map_path.to_path_buf());
        Ok(LoadedMap {
            polygon_triggers: self.triggers.clone(),
        })
    }
}

impl GameSession for StaticMapSession {
    fn start_single_player(&mut self, map_path: &Path) -> Result<LoadedMap, SessionError> {
        self.start(map_path)
    }

    fn start_skirmish(
        &mut self,
        map_path: &Path,
        settings: &SkirmishGameSettings,
    ) -> Result<LoadedMap, SessionError> {
        self.skirmish = Some(settings.clone());
        self.start(map_path)
    }
}

// ===========================================================================
// Save fixture
// ===========================================================================

/// A temporary user data root holding [`MAP_PATH`], and a [`SaveGame`]
/// over it. The directory lives as long as the fixture.
pub struct SaveFixture {
    pub dir: TempDir,
    pub save_game: SaveGame,
}

impl SaveFixture {
    pub fn new(game: GameVariant) -> Self {
        let dir = match tempfile::tempdir() {
            Ok(dir) => dir,
            Err(err) => panic!("cannot create fixture directory: {err}"),
        };
        write_map(dir.path(), MAP_PATH, MAP_BYTES);
        let config = SaveConfig::new(game, dir.path());
        Self {
            save_game: SaveGame::new(config, definitions()),
            dir,
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// An empty world on the fixture map.
    pub fn world(&self) -> World {
        let mut world = World::new(Arc::clone(self.save_game.definitions()));
        world.map.map_path1 = MAP_PATH.into();
        world.map.map_path2 = "maps/fixture/fixture.map".into();
        world.logic.polygon_triggers = triggers();
        world
    }

    /// A session that knows the fixture triggers.
    pub fn session(&self) -> StaticMapSession {
        StaticMapSession::new(triggers())
    }
}

/// Write `bytes` to `root/relative`, where `relative` may use backslashes.
pub fn write_map(root: &Path, relative: &str, bytes: &[u8]) {
    let path = root.join(relative.replace('\\', "/"));
    if let Some(parent) = path.parent()
        && let Err(err) = std::fs::create_dir_all(parent)
    {
        panic!("cannot create {}: {err}", parent.display());
    }
    if let Err(err) = std::fs::write(&path, bytes) {
        panic!("cannot write {}: {err}", path.display());
    }
}

// ===========================================================================
// Populated worlds
// ===========================================================================

fn spawn(world: &mut World, definition: &str) -> ObjectId {
    match world.spawn(definition, ColorRgba::new(200, 30, 30, 255)) {
        Ok(id) => id,
        Err(err) => panic!("cannot spawn {definition}: {err}"),
    }
}

/// Fill `world` with `units` objects cycling through every fixture
/// definition. Infantry guard the first tank from inside its guard area;
/// the barracks garrison the infantry spawned before them.
pub fn populate(world: &mut World, units: usize) {
    world.logic.current_frame = 1_800;
    world.logic.rank_level_limit = 3;
    world.logic.campaign.campaign_name = "USA".into();
    world.logic.campaign.rank_points = 40;
    world
        .logic
        .tech_tree_overrides
        .insert("Barracks".into(), BuildableStatus::No);
    world
        .logic
        .command_button_overrides
        .push("3CommandSetTank".into());
    world.game_state.display_name = "Fixture".into();
    if let Some(trigger) = world.logic.polygon_triggers.first_mut() {
        trigger.is_active = false;
    }

    let mut first_tank = None;
    let mut infantry = Vec::new();
    for index in 0..units {
        let definition = ["Tank", "Infantry", "Barracks", "Tree"][index % 4];
        let id = spawn(world, definition);
        let Some(object) = world.object_mut(id) else {
            continue;
        };
        object.transform = Affine3A::from_translation(Vec3::new(index as f32 * 10.0, 5.0, 0.0));
        object.health = object.max_health - (index % 7) as f32;
        object.model_condition_flags.set(index % 96, true);
        object.team_id = (index % 2) as u32;
        object.name = format!("{definition}{index}");

        match definition {
            "Tank" => {
                first_tank.get_or_insert(id);
            }
            "Infantry" => {
                if let Some(ai) = &mut object.ai
                    && let Ok(guard) = ai.guard()
                {
                    let _ = guard.machine.base.transition(GUARD_INNER);
                    guard.machine.guard_object_id = first_tank.unwrap_or(ObjectId::NONE);
                    guard.machine.guard_position = Vec3::new(20.0, 20.0, 0.0);
                    guard.machine.guard_polygon_trigger_name = "PlayerBase".into();
                }
                infantry.push(id);
            }
            "Barracks" => {
                if let Some(contain) = &mut object.contain {
                    contain.contained = std::mem::take(&mut infantry);
                }
            }
            _ => {}
        }
    }
}
