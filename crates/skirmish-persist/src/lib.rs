//! Skirmish Persist -- versioned binary save/load for simulation state.
//!
//! One persist routine per type serves both directions: a
//! [`StatePersister`] in write mode appends each field to a buffer, in read
//! mode it overwrites each field from the buffer. Keeping a single call
//! sequence is what keeps save and load in agreement.
//!
//! # Layers
//!
//! - [`codec`] -- little-endian fixed-width primitives, vectors, matrices
//!   and colors.
//! - [`framing`] -- length-prefixed segments that readers can skip, plus
//!   counted lists and wire-invisible object scopes.
//! - [`StatePersister::persist_version`] -- per-unit version bytes; a stored
//!   version above the routine's maximum is rejected before any field.
//! - [`type_table`] -- per-save name to `u16` id mapping.
//! - [`object_id`] -- entity ids, the id-indexed registry, and the tracker
//!   that checks every reference read during a load.
//! - [`state_machine`] -- keyed state families persisted as "active key,
//!   then active state".
//!
//! # Errors
//!
//! Every failure is a [`PersistError`]; [`PersistError::kind`] separates
//! foreign or corrupt saves ([`ErrorKind::Format`]) from truncation,
//! dangling references, API misuse and I/O.

pub mod bitset;
pub mod codec;
pub mod enums;
pub mod error;
pub mod file;
pub mod framing;
pub mod game;
pub mod object_id;
pub mod persister;
pub mod state_machine;
pub mod type_table;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use bitset::BitSet;
pub use codec::{ColorRgba, ColorRgbaF, Primitive};
pub use enums::PersistEnum;
pub use error::{ErrorKind, PersistError};
pub use game::GameVariant;
pub use object_id::{ObjectId, ObjectRegistry, PendingReference, ReferenceTracker};
pub use persister::{PersistMode, Persistable, StatePersister, read_from_bytes, write_to_bytes};
pub use state_machine::{State, StateKey, StateMachine, StateTransition};
pub use type_table::TypeTable;
