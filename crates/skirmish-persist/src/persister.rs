//! The mode-symmetric state persister.
//!
//! A [`StatePersister`] is created for one save or one load. Persist
//! routines call the same sequence of `persist_*` operations in both
//! directions; in [`PersistMode::Write`] each call appends the field to the
//! buffer, in [`PersistMode::Read`] it overwrites the field from the buffer.
//!
//! ```
//! use skirmish_persist::{GameVariant, Persistable, PersistError, StatePersister};
//!
//! #[derive(Default)]
//! struct Counter {
//!     frame: u32,
//!     label: String,
//! }
//!
//! impl Persistable for Counter {
//!     fn persist(&mut self, p: &mut StatePersister) -> Result<(), PersistError> {
//!         p.persist_version(1)?;
//!         p.persist_u32("Frame", &mut self.frame)?;
//!         p.persist_ascii_string("Label", &mut self.label)
//!     }
//! }
//!
//! let mut saved = Counter { frame: 42, label: "alpha".into() };
//! let bytes = skirmish_persist::write_to_bytes(GameVariant::Generals, &mut saved).unwrap();
//!
//! let mut loaded = Counter::default();
//! skirmish_persist::read_from_bytes(GameVariant::Generals, bytes, &mut loaded).unwrap();
//! assert_eq!(loaded.frame, 42);
//! assert_eq!(loaded.label, "alpha");
//! ```

use std::fmt::Debug;

use glam::{Affine3A, Mat4, Vec2, Vec3};
use tracing::warn;

use crate::bitset::BitSet;
use crate::codec::{ColorRgba, ColorRgbaF, ColorRgbaInt, Primitive};
use crate::enums::PersistEnum;
use crate::error::PersistError;
use crate::framing::Frame;
use crate::game::GameVariant;
use crate::object_id::{ObjectId, ReferenceTracker};

/// Direction of a persist operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistMode {
    /// Fields are filled from the stream.
    Read,
    /// Fields are appended to the stream.
    Write,
}

/// Anything that can be saved and loaded through a [`StatePersister`].
///
/// `persist` runs for both save and load and must issue the same sequence
/// of calls either way. Branch on [`StatePersister::mode`] only where the
/// direction genuinely matters, e.g. constructing children on read.
pub trait Persistable {
    fn persist(&mut self, persister: &mut StatePersister) -> Result<(), PersistError>;
}

/// Per-operation persistence context.
#[derive(Debug)]
pub struct StatePersister {
    mode: PersistMode,
    game: GameVariant,
    buffer: Vec<u8>,
    /// Read cursor. Always equals `buffer.len()` in write mode.
    position: usize,
    pub(crate) frames: Vec<Frame>,
    references: ReferenceTracker,
}

macro_rules! primitive_methods {
    ($($(#[$doc:meta])* $method:ident: $ty:ty;)+) => {
        $(
            $(#[$doc])*
            pub fn $method(&mut self, name: &str, value: &mut $ty) -> Result<(), PersistError> {
                self.persist_value(name, value)
            }
        )+
    };
}

impl StatePersister {
    /// Start a save.
    pub fn writer(game: GameVariant) -> Self {
        Self {
            mode: PersistMode::Write,
            game,
            buffer: Vec::new(),
            position: 0,
            frames: Vec::new(),
            references: ReferenceTracker::new(),
        }
    }

    /// Start a load over `bytes`.
    pub fn reader(game: GameVariant, bytes: Vec<u8>) -> Self {
        Self {
            mode: PersistMode::Read,
            game,
            buffer: bytes,
            position: 0,
            frames: Vec::new(),
            references: ReferenceTracker::new(),
        }
    }

    pub fn mode(&self) -> PersistMode {
        self.mode
    }

    pub fn is_reading(&self) -> bool {
        self.mode == PersistMode::Read
    }

    pub fn is_writing(&self) -> bool {
        self.mode == PersistMode::Write
    }

    /// The engine family this stream belongs to.
    pub fn game(&self) -> GameVariant {
        self.game
    }

    /// Byte offset of the cursor from the start of the stream.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Unread bytes left in the whole stream (zero in write mode).
    pub fn remaining(&self) -> usize {
        self.buffer.len() - self.position
    }

    /// References recorded so far by [`Self::persist_object_id`] in read mode.
    pub fn references(&self) -> &ReferenceTracker {
        &self.references
    }

    /// Finish a save and take the encoded bytes.
    pub fn into_bytes(self) -> Result<Vec<u8>, PersistError> {
        if self.is_reading() {
            return Err(PersistError::WrongMode {
                operation: "into_bytes",
                expected: PersistMode::Write,
            });
        }
        if !self.frames.is_empty() {
            return Err(PersistError::UnclosedFrames(self.frames.len()));
        }
        Ok(self.buffer)
    }

    /// Finish a load and hand back the references that still need checking
    /// against the rebuilt world.
    pub fn finish_read(self) -> Result<ReferenceTracker, PersistError> {
        if self.is_writing() {
            return Err(PersistError::WrongMode {
                operation: "finish_read",
                expected: PersistMode::Read,
            });
        }
        if !self.frames.is_empty() {
            return Err(PersistError::UnclosedFrames(self.frames.len()));
        }
        if self.remaining() > 0 {
            warn!(trailing = self.remaining(), "ignoring bytes after end of stream");
        }
        Ok(self.references)
    }

    // -----------------------------------------------------------------------
    // Cursor
    // -----------------------------------------------------------------------

    /// Dotted diagnostic path of `field` within the open frames.
    pub fn field_path(&self, field: &str) -> String {
        let mut path = String::new();
        for name in self.frames.iter().map(Frame::name).chain([field]) {
            if name.is_empty() {
                continue;
            }
            if !path.is_empty() {
                path.push('.');
            }
            path.push_str(name);
        }
        path
    }

    /// Offset the cursor may not pass: the end of the innermost segment, or
    /// the end of the stream.
    pub(crate) fn read_limit(&self) -> usize {
        self.innermost_segment()
            .map(|frame| frame.segment_end())
            .unwrap_or(self.buffer.len())
    }

    pub(crate) fn innermost_segment(&self) -> Option<&Frame> {
        self.frames.iter().rev().find(|f| f.is_segment())
    }

    /// Consume `len` bytes in read mode.
    pub(crate) fn read_bytes(&mut self, field: &str, len: usize) -> Result<&[u8], PersistError> {
        let end = self.position + len;
        if let Some(segment) = self.innermost_segment()
            && end > segment.segment_end()
        {
            return Err(PersistError::SegmentOverrun {
                field: self.field_path(field),
                segment: segment.name().to_string(),
                declared: segment.declared_len(),
            });
        }
        if end > self.buffer.len() {
            return Err(PersistError::Truncated {
                field: self.field_path(field),
                needed: len,
                available: self.remaining(),
            });
        }
        let start = self.position;
        self.position = end;
        Ok(&self.buffer[start..end])
    }

    pub(crate) fn write_bytes(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
        self.position = self.buffer.len();
    }

    /// Overwrite already-written bytes at `offset` (segment back-patching).
    pub(crate) fn patch_bytes(&mut self, offset: usize, bytes: &[u8]) {
        self.buffer[offset..offset + bytes.len()].copy_from_slice(bytes);
    }

    pub(crate) fn seek(&mut self, position: usize) {
        self.position = position;
    }

    // -----------------------------------------------------------------------
    // Primitives
    // -----------------------------------------------------------------------

    /// Persist any fixed-width [`Primitive`].
    pub fn persist_value<T: Primitive>(
        &mut self,
        name: &str,
        value: &mut T,
    ) -> Result<(), PersistError> {
        match self.mode {
            PersistMode::Write => {
                (*value).encode(&mut self.buffer);
                self.position = self.buffer.len();
            }
            PersistMode::Read => {
                let decoded = T::decode(self.read_bytes(name, T::WIDTH)?);
                *value = decoded.ok_or_else(|| PersistError::InvalidValue {
                    field: self.field_path(name),
                    reason: format!("not a valid {}", std::any::type_name::<T>()),
                })?;
            }
        }
        Ok(())
    }

    primitive_methods! {
        /// One byte, `0` or `1`.
        persist_bool: bool;
        persist_u8: u8;
        persist_u16: u16;
        persist_u32: u32;
        persist_u64: u64;
        persist_i8: i8;
        persist_i16: i16;
        persist_i32: i32;
        persist_i64: i64;
        persist_f32: f32;
        persist_f64: f64;
        persist_vec2: Vec2;
        persist_vec3: Vec3;
        /// A 3x4 affine transform: basis columns then translation.
        persist_matrix4x3: Affine3A;
        persist_matrix4x4: Mat4;
        /// Four bytes, R G B A.
        persist_color_rgba: ColorRgba;
        persist_color_rgba_f: ColorRgbaF;
    }

    /// A byte color stored as four `u32` components.
    pub fn persist_color_rgba_int(
        &mut self,
        name: &str,
        value: &mut ColorRgba,
    ) -> Result<(), PersistError> {
        let mut wide = ColorRgbaInt(*value);
        self.persist_value(name, &mut wide)?;
        *value = wide.0;
        Ok(())
    }

    /// An enum stored as its `u32` discriminant.
    pub fn persist_enum<E: PersistEnum>(&mut self, name: &str, value: &mut E) -> Result<(), PersistError> {
        let mut raw = value.to_raw();
        self.persist_u32(name, &mut raw)?;
        if self.is_reading() {
            *value = E::from_raw(raw).ok_or_else(|| PersistError::InvalidValue {
                field: self.field_path(name),
                reason: format!(
                    "unknown discriminant {raw} for {}",
                    std::any::type_name::<E>()
                ),
            })?;
        }
        Ok(())
    }

    /// A reference to another entity. Non-null ids read back are recorded
    /// for verification once the load has rebuilt every entity.
    pub fn persist_object_id(&mut self, name: &str, value: &mut ObjectId) -> Result<(), PersistError> {
        self.persist_u32(name, &mut value.0)?;
        if self.is_reading() && value.is_some() {
            let field = self.field_path(name);
            self.references.record(field, *value);
        }
        Ok(())
    }

    /// Raw bytes whose length the caller already knows.
    pub fn persist_span(&mut self, name: &str, bytes: &mut [u8]) -> Result<(), PersistError> {
        match self.mode {
            PersistMode::Write => self.write_bytes(bytes),
            PersistMode::Read => {
                let stored = self.read_bytes(name, bytes.len())?;
                bytes.copy_from_slice(stored);
            }
        }
        Ok(())
    }

    /// `u8` length followed by ASCII bytes.
    pub fn persist_ascii_string(&mut self, name: &str, value: &mut String) -> Result<(), PersistError> {
        match self.mode {
            PersistMode::Write => {
                if !value.is_ascii() {
                    return Err(self.unencodable(name, "string is not ASCII"));
                }
                let mut len = u8::try_from(value.len())
                    .map_err(|_| self.unencodable(name, "string longer than 255 bytes"))?;
                self.persist_u8(name, &mut len)?;
                self.write_bytes(value.as_bytes());
            }
            PersistMode::Read => {
                let mut len = 0u8;
                self.persist_u8(name, &mut len)?;
                let bytes = self.read_bytes(name, len as usize)?.to_vec();
                if !bytes.is_ascii() {
                    return Err(PersistError::InvalidValue {
                        field: self.field_path(name),
                        reason: "string contains non-ASCII bytes".into(),
                    });
                }
                *value = String::from_utf8_lossy(&bytes).into_owned();
            }
        }
        Ok(())
    }

    /// `u8` count of UTF-16 code units followed by the units.
    pub fn persist_unicode_string(&mut self, name: &str, value: &mut String) -> Result<(), PersistError> {
        match self.mode {
            PersistMode::Write => {
                let units: Vec<u16> = value.encode_utf16().collect();
                let mut len = u8::try_from(units.len())
                    .map_err(|_| self.unencodable(name, "string longer than 255 UTF-16 units"))?;
                self.persist_u8(name, &mut len)?;
                for mut unit in units {
                    self.persist_u16(name, &mut unit)?;
                }
            }
            PersistMode::Read => {
                let mut len = 0u8;
                self.persist_u8(name, &mut len)?;
                let units: Vec<u16> = self
                    .read_bytes(name, len as usize * 2)?
                    .chunks_exact(2)
                    .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
                    .collect();
                *value = String::from_utf16(&units).map_err(|_| PersistError::InvalidValue {
                    field: self.field_path(name),
                    reason: "string is not valid UTF-16".into(),
                })?;
            }
        }
        Ok(())
    }

    /// `u16` byte length followed by UTF-8 bytes.
    pub fn persist_utf8_string(&mut self, name: &str, value: &mut String) -> Result<(), PersistError> {
        match self.mode {
            PersistMode::Write => {
                let mut len = u16::try_from(value.len())
                    .map_err(|_| self.unencodable(name, "string longer than 65535 bytes"))?;
                self.persist_u16(name, &mut len)?;
                self.write_bytes(value.as_bytes());
            }
            PersistMode::Read => {
                let mut len = 0u16;
                self.persist_u16(name, &mut len)?;
                let bytes = self.read_bytes(name, len as usize)?.to_vec();
                *value = String::from_utf8(bytes).map_err(|_| PersistError::InvalidValue {
                    field: self.field_path(name),
                    reason: "string is not valid UTF-8".into(),
                })?;
            }
        }
        Ok(())
    }

    /// `u32` count of set bits, then the index of each set bit.
    pub fn persist_bit_set(&mut self, name: &str, value: &mut BitSet) -> Result<(), PersistError> {
        let mut count = value.count_ones() as u32;
        self.persist_u32(name, &mut count)?;
        match self.mode {
            PersistMode::Write => {
                for index in value.iter_ones() {
                    let mut index = index as u32;
                    self.persist_u32(name, &mut index)?;
                }
            }
            PersistMode::Read => {
                value.clear();
                for _ in 0..count {
                    let mut index = 0u32;
                    self.persist_u32(name, &mut index)?;
                    if !value.set(index as usize, true) {
                        return Err(PersistError::InvalidValue {
                            field: self.field_path(name),
                            reason: format!("bit {index} out of range for {} bits", value.len()),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Versions, placeholders
    // -----------------------------------------------------------------------

    /// Declare the highest version this routine understands and return the
    /// stored version (always `max` when writing).
    pub fn persist_version(&mut self, max: u8) -> Result<u8, PersistError> {
        let mut version = max;
        self.persist_u8("Version", &mut version)?;
        if version > max {
            return Err(PersistError::FutureVersion {
                field: self.field_path("Version"),
                stored: version,
                max,
            });
        }
        Ok(version)
    }

    /// A placeholder of fixed value. Writes `expected`; on read, anything
    /// else is an [`PersistError::InvalidState`].
    pub fn persist_reserved<T>(&mut self, name: &str, expected: T) -> Result<(), PersistError>
    where
        T: Primitive + PartialEq + Debug,
    {
        let mut stored = expected;
        self.persist_value(name, &mut stored)?;
        if stored != expected {
            return Err(PersistError::invalid_state(
                self.field_path(name),
                format!("expected {expected:?}, found {stored:?}"),
            ));
        }
        Ok(())
    }

    /// Bytes whose meaning is not modelled. Writes zeros; reads skip.
    pub fn skip_unknown_bytes(&mut self, count: usize) -> Result<(), PersistError> {
        match self.mode {
            PersistMode::Write => {
                self.buffer.resize(self.buffer.len() + count, 0);
                self.position = self.buffer.len();
            }
            PersistMode::Read => {
                self.read_bytes("<unknown>", count)?;
            }
        }
        Ok(())
    }

    pub(crate) fn unencodable(&self, name: &str, reason: &str) -> PersistError {
        PersistError::Unencodable {
            field: self.field_path(name),
            reason: reason.to_string(),
        }
    }
}

/// Save `value` into a fresh buffer.
pub fn write_to_bytes<P: Persistable + ?Sized>(
    game: GameVariant,
    value: &mut P,
) -> Result<Vec<u8>, PersistError> {
    let mut persister = StatePersister::writer(game);
    value.persist(&mut persister)?;
    persister.into_bytes()
}

/// Load `value` from `bytes`, returning the references it recorded.
pub fn read_from_bytes<P: Persistable + ?Sized>(
    game: GameVariant,
    bytes: Vec<u8>,
    value: &mut P,
) -> Result<ReferenceTracker, PersistError> {
    let mut persister = StatePersister::reader(game, bytes);
    value.persist(&mut persister)?;
    persister.finish_read()
}
