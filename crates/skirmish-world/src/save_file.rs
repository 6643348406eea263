//! The `.sav` container: named chunks, each a length-prefixed segment,
//! closed by an end-of-file marker.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use skirmish_persist::file::{read_file, write_file_atomic};
use skirmish_persist::{ObjectId, PersistError, Persistable, StatePersister};
use tracing::{debug, info, warn};

use crate::config::{ConfigError, SaveConfig};
use crate::definition::{DefinitionError, DefinitionStore};
use crate::factory::{DefaultObjectFactory, ObjectFactory};
use crate::game_state_map::{GameType, MapStorage};
use crate::session::{GameSession, SessionError};
use crate::world::World;

/// Chunk name that ends the file.
pub const END_OF_FILE: &str = "SG_EOF";

#[derive(Debug, thiserror::Error)]
pub enum SaveGameError {
    #[error("save file is unreadable or incompatible: {source}")]
    Unreadable {
        path: Option<PathBuf>,
        #[source]
        source: PersistError,
    },

    #[error("failed to write save file {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: PersistError,
    },

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Definitions(#[from] DefinitionError),
}

impl From<PersistError> for SaveGameError {
    fn from(source: PersistError) -> Self {
        Self::Unreadable { path: None, source }
    }
}

impl SaveGameError {
    /// The underlying persistence error, if this is one.
    pub fn persist_error(&self) -> Option<&PersistError> {
        match self {
            Self::Unreadable { source, .. } | Self::WriteFailed { source, .. } => Some(source),
            _ => None,
        }
    }

    fn at_path(self, path: &Path) -> Self {
        match self {
            Self::Unreadable { path: None, source } => Self::Unreadable {
                path: Some(path.to_path_buf()),
                source,
            },
            other => other,
        }
    }
}

// ---------------------------------------------------------------------------
// Chunks
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Chunk {
    GameState,
    Campaign,
    GameStateMap,
    GameLogic,
    Radar,
}

impl Chunk {
    const ALL: [Chunk; 5] = [
        Chunk::GameState,
        Chunk::Campaign,
        Chunk::GameStateMap,
        Chunk::GameLogic,
        Chunk::Radar,
    ];

    fn name(self) -> &'static str {
        match self {
            Chunk::GameState => "CHUNK_GameState",
            Chunk::Campaign => "CHUNK_Campaign",
            Chunk::GameStateMap => "CHUNK_GameStateMap",
            Chunk::GameLogic => "CHUNK_GameLogic",
            Chunk::Radar => "CHUNK_Radar",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|chunk| chunk.name() == name)
    }

    fn index(self) -> usize {
        self as usize
    }
}

fn persist_chunk(world: &mut World, chunk: Chunk, p: &mut StatePersister) -> Result<(), PersistError> {
    p.begin_segment(chunk.name())?;
    match chunk {
        Chunk::GameState => world.game_state.persist(p)?,
        Chunk::Campaign => world.logic.campaign.persist(p)?,
        Chunk::GameStateMap => world.map.persist(p)?,
        Chunk::GameLogic => world.logic.persist(p)?,
        Chunk::Radar => world.radar.persist(p)?,
    }
    p.end_segment()
}

// ---------------------------------------------------------------------------
// SaveGame
// ---------------------------------------------------------------------------

/// Saves and loads whole worlds.
#[derive(Debug, Clone)]
pub struct SaveGame {
    config: SaveConfig,
    definitions: Arc<DefinitionStore>,
}

impl SaveGame {
    pub fn new(config: SaveConfig, definitions: Arc<DefinitionStore>) -> Self {
        Self {
            config,
            definitions,
        }
    }

    /// Build from a configuration file and an object definition file.
    pub fn from_files(config: &Path, definitions: &Path) -> Result<Self, SaveGameError> {
        let config = SaveConfig::from_file(config)?;
        let definitions = DefinitionStore::from_file(definitions)?;
        Ok(Self::new(config, Arc::new(definitions)))
    }

    pub fn config(&self) -> &SaveConfig {
        &self.config
    }

    pub fn definitions(&self) -> &Arc<DefinitionStore> {
        &self.definitions
    }

    fn map_storage(&self) -> MapStorage {
        MapStorage {
            user_data_root: self.config.user_data_root.clone(),
            verify: self.config.verify_embedded_map,
        }
    }

    /// Save `world` to `path`. The file is replaced only once the whole
    /// save has been encoded and flushed.
    pub fn save(&self, world: &mut World, path: &Path) -> Result<(), SaveGameError> {
        info!(path = %path.display(), objects = world.logic.objects.len(), "saving game");

        let write_failed = |source| SaveGameError::WriteFailed {
            path: path.to_path_buf(),
            source,
        };
        let bytes = self.write_to_bytes(world).map_err(write_failed)?;
        write_file_atomic(path, &bytes).map_err(write_failed)?;

        info!(path = %path.display(), bytes = bytes.len(), "game saved");
        Ok(())
    }

    /// Encode `world` in memory.
    pub fn write_to_bytes(&self, world: &mut World) -> Result<Vec<u8>, PersistError> {
        world.map.storage = self.map_storage();
        world.map.next_object_id = world
            .logic
            .objects
            .next_free_id()
            .map_or(u32::MAX, |id| id.0);

        let mut p = StatePersister::writer(self.config.game);
        for chunk in Chunk::ALL {
            let mut name = chunk.name().to_string();
            p.persist_ascii_string("ChunkName", &mut name)?;
            persist_chunk(world, chunk, &mut p)?;
            debug!(chunk = chunk.name(), end = p.position(), "wrote chunk");
        }
        let mut end = END_OF_FILE.to_string();
        p.persist_ascii_string("ChunkName", &mut end)?;
        p.into_bytes()
    }

    /// Load the save at `path`, starting its game through `session`.
    pub fn load(&self, path: &Path, session: &mut dyn GameSession) -> Result<World, SaveGameError> {
        self.load_with_factory(path, Box::new(DefaultObjectFactory), session)
    }

    /// [`Self::load`] building objects with `factory`.
    pub fn load_with_factory(
        &self,
        path: &Path,
        factory: Box<dyn ObjectFactory>,
        session: &mut dyn GameSession,
    ) -> Result<World, SaveGameError> {
        info!(path = %path.display(), "loading game");
        let bytes = read_file(path).map_err(|err| SaveGameError::from(err).at_path(path))?;
        let world = self
            .read_with_factory(bytes, factory, session)
            .map_err(|err| err.at_path(path))?;
        info!(
            path = %path.display(),
            objects = world.logic.objects.len(),
            "game loaded"
        );
        Ok(world)
    }

    /// Decode a world from `bytes`. Nothing is returned unless every chunk
    /// loaded and every object reference resolved.
    pub fn read_from_bytes(
        &self,
        bytes: Vec<u8>,
        session: &mut dyn GameSession,
    ) -> Result<World, SaveGameError> {
        self.read_with_factory(bytes, Box::new(DefaultObjectFactory), session)
    }

    fn read_with_factory(
        &self,
        bytes: Vec<u8>,
        factory: Box<dyn ObjectFactory>,
        session: &mut dyn GameSession,
    ) -> Result<World, SaveGameError> {
        let mut world = World::with_factory(Arc::clone(&self.definitions), factory);
        world.map.storage = self.map_storage();

        let mut p = StatePersister::reader(self.config.game, bytes);
        let mut seen = [false; Chunk::ALL.len()];

        loop {
            let mut name = String::new();
            p.persist_ascii_string("ChunkName", &mut name)?;
            if name == END_OF_FILE {
                break;
            }

            let Some(chunk) = Chunk::from_name(&name) else {
                let len = p.begin_segment(&name)?;
                warn!(chunk = %name, bytes = len, "skipping unknown chunk");
                p.end_segment()?;
                continue;
            };
            if seen[chunk.index()] {
                return Err(PersistError::invalid_state(name, "chunk appears twice").into());
            }
            if chunk == Chunk::GameLogic && !seen[Chunk::GameStateMap.index()] {
                return Err(PersistError::invalid_state(
                    name,
                    "game logic precedes the map it runs on",
                )
                .into());
            }

            persist_chunk(&mut world, chunk, &mut p)?;
            seen[chunk.index()] = true;
            debug!(chunk = chunk.name(), end = p.position(), "read chunk");

            if chunk == Chunk::GameStateMap {
                start_session(&mut world, session)?;
            }
        }

        if let Some(missing) = Chunk::ALL.into_iter().find(|chunk| !seen[chunk.index()]) {
            return Err(PersistError::invalid_state(missing.name(), "chunk is missing").into());
        }

        let references = p.finish_read()?;
        references.verify(|id| world.logic.objects.contains(id))?;
        world
            .logic
            .objects
            .reserve_below(ObjectId(world.map.next_object_id));
        Ok(world)
    }
}

fn start_session(world: &mut World, session: &mut dyn GameSession) -> Result<(), SaveGameError> {
    let map_path = world.map.map_file_path()?;
    let loaded = match world.map.game_type {
        GameType::Skirmish => session.start_skirmish(&map_path, &world.map.skirmish)?,
        GameType::SinglePlayer | GameType::Multiplayer => session.start_single_player(&map_path)?,
    };
    debug!(
        map = %map_path.display(),
        triggers = loaded.polygon_triggers.len(),
        "session started"
    );
    world.logic.polygon_triggers = loaded.polygon_triggers;
    Ok(())
}
