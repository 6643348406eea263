//! Error taxonomy for save and load operations.
//!
//! Every error is fatal to the save or load in progress. [`ErrorKind`]
//! groups the variants so callers can tell a foreign or corrupt save apart
//! from a damaged file, a dangling reference, or a bug in a persist routine.

use std::path::PathBuf;

use crate::object_id::ObjectId;
use crate::persister::PersistMode;
use crate::state_machine::StateKey;

/// Broad classification of a [`PersistError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The stream is well-formed bytes but not a save this build understands.
    Format,
    /// The stream ended in the middle of a value.
    Truncated,
    /// An object id was persisted with no live entity behind it.
    UnresolvedReference,
    /// A persist routine misused the framing API.
    Usage,
    /// Reading or writing the underlying file failed.
    Io,
}

/// Errors raised while persisting state in either direction.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("unexpected end of stream reading {field}: needed {needed} bytes, {available} available")]
    Truncated {
        field: String,
        needed: usize,
        available: usize,
    },

    #[error("{field}: stored version {stored} is newer than supported version {max}")]
    FutureVersion { field: String, stored: u8, max: u8 },

    #[error("invalid state at {field}: {reason}")]
    InvalidState { field: String, reason: String },

    #[error("invalid value at {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("{field}: read past the end of segment `{segment}` ({declared} bytes declared)")]
    SegmentOverrun {
        field: String,
        segment: String,
        declared: u32,
    },

    #[error("type table has no entry for id {0}")]
    UnknownTypeId(u16),

    #[error("type table entry `{name}` (id {id}) is duplicated")]
    DuplicateTypeEntry { name: String, id: u16 },

    #[error("state key {key} at {field} is not registered")]
    UnknownStateKey { field: String, key: StateKey },

    #[error("state key {0} is already registered")]
    DuplicateStateKey(StateKey),

    #[error("object id {0} is already registered")]
    DuplicateObject(ObjectId),

    #[error("object reference {id} at {field} does not resolve to a live object")]
    UnresolvedObject { field: String, id: ObjectId },

    #[error("expected an open {expected} frame, found {found}")]
    FrameMismatch {
        expected: &'static str,
        found: String,
    },

    #[error("{0} frame(s) still open at end of stream")]
    UnclosedFrames(usize),

    #[error("cannot encode {field}: {reason}")]
    Unencodable { field: String, reason: String },

    #[error("{operation} is only valid in {expected:?} mode")]
    WrongMode {
        operation: &'static str,
        expected: PersistMode,
    },

    #[error("failed to read/write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("embedded resource written to {path} does not match the saved bytes")]
    EmbeddedResourceMismatch { path: PathBuf },
}

impl PersistError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::FutureVersion { .. }
            | Self::InvalidState { .. }
            | Self::InvalidValue { .. }
            | Self::SegmentOverrun { .. }
            | Self::UnknownTypeId(_)
            | Self::DuplicateTypeEntry { .. }
            | Self::UnknownStateKey { .. }
            | Self::DuplicateObject(_) => ErrorKind::Format,
            Self::Truncated { .. } => ErrorKind::Truncated,
            Self::UnresolvedObject { .. } => ErrorKind::UnresolvedReference,
            Self::FrameMismatch { .. }
            | Self::UnclosedFrames(_)
            | Self::Unencodable { .. }
            | Self::WrongMode { .. }
            | Self::DuplicateStateKey(_) => ErrorKind::Usage,
            Self::Io { .. } | Self::EmbeddedResourceMismatch { .. } => ErrorKind::Io,
        }
    }

    /// Whether the save itself is foreign, corrupt, or from a newer build.
    pub fn is_format_violation(&self) -> bool {
        self.kind() == ErrorKind::Format
    }

    /// Shorthand for an [`PersistError::InvalidState`] at `field`.
    pub fn invalid_state(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidState {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Wrap an I/O error with the path it happened on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
