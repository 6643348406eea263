//! Shared test helpers for integration tests and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]` so the helpers
//! are available to unit tests here and, through the `test-utils` feature,
//! to the other crates in the workspace.

use crate::error::PersistError;
use crate::game::GameVariant;
use crate::persister::{Persistable, StatePersister, read_from_bytes, write_to_bytes};

/// Hand-assembles a little-endian stream, for feeding readers bytes no
/// writer in this crate would produce.
#[derive(Debug, Default, Clone)]
pub struct StreamBuilder {
    bytes: Vec<u8>,
    open_segments: Vec<usize>,
}

impl StreamBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn u8(mut self, v: u8) -> Self {
        self.bytes.push(v);
        self
    }

    pub fn bool(self, v: bool) -> Self {
        self.u8(v as u8)
    }

    pub fn u16(mut self, v: u16) -> Self {
        self.bytes.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn u32(mut self, v: u32) -> Self {
        self.bytes.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn i32(mut self, v: i32) -> Self {
        self.bytes.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn f32(mut self, v: f32) -> Self {
        self.bytes.extend_from_slice(&v.to_le_bytes());
        self
    }

    /// `u8` length then the bytes.
    pub fn ascii(mut self, s: &str) -> Self {
        self.bytes.push(s.len() as u8);
        self.bytes.extend_from_slice(s.as_bytes());
        self
    }

    pub fn raw(mut self, bytes: &[u8]) -> Self {
        self.bytes.extend_from_slice(bytes);
        self
    }

    pub fn zeros(mut self, count: usize) -> Self {
        self.bytes.resize(self.bytes.len() + count, 0);
        self
    }

    /// Open a segment whose length is filled in by [`Self::end_segment`].
    pub fn begin_segment(mut self) -> Self {
        self.bytes.extend_from_slice(&[0; 4]);
        self.open_segments.push(self.bytes.len());
        self
    }

    pub fn end_segment(mut self) -> Self {
        if let Some(start) = self.open_segments.pop() {
            let len = (self.bytes.len() - start) as u32;
            self.bytes[start - 4..start].copy_from_slice(&len.to_le_bytes());
        }
        self
    }

    pub fn build(self) -> Vec<u8> {
        assert!(self.open_segments.is_empty(), "unclosed segment in StreamBuilder");
        self.bytes
    }
}

/// Write `value`, read the bytes into `target`, and return the bytes.
pub fn round_trip<P: Persistable>(
    game: GameVariant,
    value: &mut P,
    target: &mut P,
) -> Result<Vec<u8>, PersistError> {
    let bytes = write_to_bytes(game, value)?;
    read_from_bytes(game, bytes.clone(), target)?;
    Ok(bytes)
}

/// A reader over `bytes` for the base game.
pub fn reader(bytes: Vec<u8>) -> StatePersister {
    StatePersister::reader(GameVariant::Generals, bytes)
}
