//! The game-setup collaborator invoked while a save is loading.

use std::path::{Path, PathBuf};

use crate::skirmish::SkirmishGameSettings;
use crate::trigger::PolygonTrigger;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("map {path} could not be opened")]
    MapUnavailable { path: PathBuf },

    #[error("session refused to start: {0}")]
    Rejected(String),
}

/// Static data of the map a session started on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadedMap {
    /// Triggers in map order. Their runtime state is restored from the
    /// game logic chunk.
    pub polygon_triggers: Vec<PolygonTrigger>,
}

/// Starts the game a save belongs to, once its map has been materialized.
pub trait GameSession {
    fn start_single_player(&mut self, map_path: &Path) -> Result<LoadedMap, SessionError>;

    fn start_skirmish(
        &mut self,
        map_path: &Path,
        settings: &SkirmishGameSettings,
    ) -> Result<LoadedMap, SessionError>;
}

/// A session for tools and tests: starts nothing and reports an empty map.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSession;

impl GameSession for NullSession {
    fn start_single_player(&mut self, _map_path: &Path) -> Result<LoadedMap, SessionError> {
        Ok(LoadedMap::default())
    }

    fn start_skirmish(
        &mut self,
        _map_path: &Path,
        _settings: &SkirmishGameSettings,
    ) -> Result<LoadedMap, SessionError> {
        Ok(LoadedMap::default())
    }
}
