//! Skirmish World -- the persisted state of an RTS match and its save file.
//!
//! A [`World`] bundles the save header, the embedded map, the game logic
//! (objects, campaign, triggers, overrides) and the radar. [`SaveGame`]
//! writes it as a sequence of named chunks and reads it back, restarting
//! the match through a [`GameSession`] once the map chunk is in.
//!
//! # Modules
//!
//! - [`game_logic`] -- live objects keyed by id, with a per-save definition
//!   table.
//! - [`object`], [`ai`], [`contain`] -- one object and the modules it may
//!   carry.
//! - [`game_state_map`] -- the embedded map file.
//! - [`radar`], [`campaign`], [`game_state`], [`skirmish`] -- the remaining
//!   chunks.
//! - [`save_file`] -- the chunk container.
//! - [`config`], [`definition`] -- RON/TOML/JSON configuration and object
//!   definitions.

pub mod ai;
pub mod campaign;
pub mod config;
pub mod contain;
pub mod definition;
pub mod factory;
pub mod game_logic;
pub mod game_state;
pub mod game_state_map;
pub mod object;
pub mod radar;
pub mod save_file;
pub mod session;
pub mod skirmish;
pub mod trigger;
pub mod world;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use config::{ConfigError, SaveConfig};
pub use definition::{DefinitionError, DefinitionStore, ObjectDefinition, RadarPriority};
pub use factory::{DefaultObjectFactory, ObjectFactory};
pub use game_logic::{GameLogic, SpawnError};
pub use game_state_map::{GameStateMap, GameType};
pub use object::GameObject;
pub use radar::Radar;
pub use save_file::{SaveGame, SaveGameError};
pub use session::{GameSession, LoadedMap, NullSession, SessionError};
pub use world::World;
