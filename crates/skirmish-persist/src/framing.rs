//! Segments, arrays, and object scopes.
//!
//! Frames nest strictly. Segments carry a `u32` byte length so readers can
//! skip what they do not understand; arrays and objects have no wire form of
//! their own and exist to keep begin/end calls symmetric and to name fields
//! in diagnostics.

use tracing::{debug, trace};

use crate::error::PersistError;
use crate::persister::{PersistMode, Persistable, StatePersister};

/// An open frame on the persister's nesting stack.
#[derive(Debug, Clone)]
pub(crate) enum Frame {
    Segment {
        name: String,
        /// Offset of the first byte after the length prefix.
        start: usize,
        /// Declared length (read mode only).
        declared: u32,
    },
    Array {
        name: String,
    },
    Object {
        name: String,
    },
}

impl Frame {
    pub(crate) fn name(&self) -> &str {
        match self {
            Frame::Segment { name, .. } | Frame::Array { name } | Frame::Object { name } => name,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Frame::Segment { .. } => "segment",
            Frame::Array { .. } => "array",
            Frame::Object { .. } => "object",
        }
    }

    pub(crate) fn is_segment(&self) -> bool {
        matches!(self, Frame::Segment { .. })
    }

    pub(crate) fn segment_end(&self) -> usize {
        match self {
            Frame::Segment { start, declared, .. } => start + *declared as usize,
            _ => usize::MAX,
        }
    }

    pub(crate) fn declared_len(&self) -> u32 {
        match self {
            Frame::Segment { declared, .. } => *declared,
            _ => 0,
        }
    }

    fn describe(&self) -> String {
        format!("{} `{}`", self.kind(), self.name())
    }
}

/// Width of the element count written by the list helpers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CountWidth {
    U16,
    U32,
}

impl StatePersister {
    fn pop_frame(&mut self, expected: &'static str) -> Result<Frame, PersistError> {
        match self.frames.pop() {
            Some(frame) if frame.kind() == expected => Ok(frame),
            Some(frame) => Err(PersistError::FrameMismatch {
                expected,
                found: frame.describe(),
            }),
            None => Err(PersistError::FrameMismatch {
                expected,
                found: "no open frame".into(),
            }),
        }
    }

    // -----------------------------------------------------------------------
    // Segments
    // -----------------------------------------------------------------------

    /// Open a length-prefixed segment.
    ///
    /// Write mode reserves the prefix and returns `0`; the real length is
    /// patched in by [`Self::end_segment`]. Read mode returns the declared
    /// length.
    pub fn begin_segment(&mut self, name: &str) -> Result<u32, PersistError> {
        let mut declared = 0u32;
        self.persist_u32(name, &mut declared)?;
        let start = self.position();

        if self.is_reading() {
            let end = start + declared as usize;
            if let Some(parent) = self.innermost_segment()
                && end > parent.segment_end()
            {
                return Err(PersistError::SegmentOverrun {
                    field: self.field_path(name),
                    segment: parent.name().to_string(),
                    declared: parent.declared_len(),
                });
            }
            if end > start + self.remaining() {
                return Err(PersistError::Truncated {
                    field: self.field_path(name),
                    needed: declared as usize,
                    available: self.remaining(),
                });
            }
        }

        trace!(segment = name, declared, offset = start, "begin segment");
        self.frames.push(Frame::Segment {
            name: name.to_string(),
            start,
            declared,
        });
        Ok(declared)
    }

    /// Close the innermost segment.
    ///
    /// Write mode back-patches the length. Read mode skips any bytes the
    /// routine did not consume so the cursor lands on the segment's end.
    pub fn end_segment(&mut self) -> Result<(), PersistError> {
        let (name, start, declared) = match self.pop_frame("segment")? {
            Frame::Segment {
                name,
                start,
                declared,
            } => (name, start, declared),
            other => {
                return Err(PersistError::FrameMismatch {
                    expected: "segment",
                    found: other.describe(),
                });
            }
        };

        match self.mode() {
            PersistMode::Write => {
                let written = self.position() - start;
                let length = u32::try_from(written)
                    .map_err(|_| self.unencodable(&name, "segment longer than 4 GiB"))?;
                self.patch_bytes(start - 4, &length.to_le_bytes());
                trace!(segment = %name, length, "end segment");
            }
            PersistMode::Read => {
                let end = start + declared as usize;
                let position = self.position();
                if position > end {
                    return Err(PersistError::SegmentOverrun {
                        field: self.field_path(&name),
                        segment: name,
                        declared,
                    });
                }
                if position < end {
                    debug!(
                        segment = %name,
                        skipped = end - position,
                        "skipping unread bytes at end of segment"
                    );
                    self.seek(end);
                }
            }
        }
        Ok(())
    }

    /// Bytes left unread in the innermost segment. Read mode only.
    pub fn segment_remaining(&self) -> Result<u32, PersistError> {
        if self.is_writing() {
            return Err(PersistError::WrongMode {
                operation: "segment_remaining",
                expected: PersistMode::Read,
            });
        }
        let segment = self
            .innermost_segment()
            .ok_or_else(|| PersistError::FrameMismatch {
                expected: "segment",
                found: "no open segment".into(),
            })?;
        Ok(segment.segment_end().saturating_sub(self.position()) as u32)
    }

    // -----------------------------------------------------------------------
    // Arrays and objects
    // -----------------------------------------------------------------------

    pub fn begin_array(&mut self, name: &str) -> Result<(), PersistError> {
        self.frames.push(Frame::Array {
            name: name.to_string(),
        });
        Ok(())
    }

    pub fn end_array(&mut self) -> Result<(), PersistError> {
        self.pop_frame("array").map(|_| ())
    }

    pub fn begin_object(&mut self, name: &str) -> Result<(), PersistError> {
        self.frames.push(Frame::Object {
            name: name.to_string(),
        });
        Ok(())
    }

    pub fn end_object(&mut self) -> Result<(), PersistError> {
        self.pop_frame("object").map(|_| ())
    }

    /// Persist a nested value inside an object scope named `name`.
    pub fn persist_object<P: Persistable + ?Sized>(
        &mut self,
        name: &str,
        value: &mut P,
    ) -> Result<(), PersistError> {
        self.begin_object(name)?;
        value.persist(self)?;
        self.end_object()
    }

    // -----------------------------------------------------------------------
    // Counted collections
    // -----------------------------------------------------------------------

    /// A `u16` element count followed by each element.
    ///
    /// On read the list is cleared and refilled with `T::default()` values
    /// that `persist_item` then loads.
    pub fn persist_list_with_u16_count<T, F>(
        &mut self,
        name: &str,
        items: &mut Vec<T>,
        persist_item: F,
    ) -> Result<(), PersistError>
    where
        T: Default,
        F: FnMut(&mut StatePersister, &mut T) -> Result<(), PersistError>,
    {
        self.persist_list(name, CountWidth::U16, items, persist_item)
    }

    /// A `u32` element count followed by each element.
    pub fn persist_list_with_u32_count<T, F>(
        &mut self,
        name: &str,
        items: &mut Vec<T>,
        persist_item: F,
    ) -> Result<(), PersistError>
    where
        T: Default,
        F: FnMut(&mut StatePersister, &mut T) -> Result<(), PersistError>,
    {
        self.persist_list(name, CountWidth::U32, items, persist_item)
    }

    fn persist_list<T, F>(
        &mut self,
        name: &str,
        width: CountWidth,
        items: &mut Vec<T>,
        mut persist_item: F,
    ) -> Result<(), PersistError>
    where
        T: Default,
        F: FnMut(&mut StatePersister, &mut T) -> Result<(), PersistError>,
    {
        self.begin_array(name)?;
        let count = self.persist_count(width, items.len())?;
        if self.is_reading() {
            items.clear();
            // A corrupt count must not drive a huge allocation.
            items.reserve(count.min(self.read_limit().saturating_sub(self.position())));
            for _ in 0..count {
                let mut item = T::default();
                persist_item(self, &mut item)?;
                items.push(item);
            }
        } else {
            for item in items.iter_mut() {
                persist_item(self, item)?;
            }
        }
        self.end_array()
    }

    /// The element count, named `Count` inside the list's frame.
    fn persist_count(&mut self, width: CountWidth, len: usize) -> Result<usize, PersistError> {
        let field = "Count";
        let writing = self.is_writing();
        match width {
            CountWidth::U16 => {
                let mut count = if writing {
                    u16::try_from(len)
                        .map_err(|_| self.unencodable(field, "more than 65535 elements"))?
                } else {
                    0
                };
                self.persist_u16(field, &mut count)?;
                Ok(count as usize)
            }
            CountWidth::U32 => {
                let mut count = if writing {
                    u32::try_from(len)
                        .map_err(|_| self.unencodable(field, "more than u32::MAX elements"))?
                } else {
                    0
                };
                self.persist_u32(field, &mut count)?;
                Ok(count as usize)
            }
        }
    }

    /// A fixed-size collection: `u32` length, then each element. The stored
    /// length must match the in-memory length on read.
    pub fn persist_array_with_u32_length<T, F>(
        &mut self,
        name: &str,
        items: &mut [T],
        mut persist_item: F,
    ) -> Result<(), PersistError>
    where
        F: FnMut(&mut StatePersister, &mut T) -> Result<(), PersistError>,
    {
        self.begin_array(name)?;
        let count = self.persist_count(CountWidth::U32, items.len())?;
        if count != items.len() {
            return Err(PersistError::invalid_state(
                self.field_path("Count"),
                format!("stored length {count} does not match {} in memory", items.len()),
            ));
        }
        for item in items.iter_mut() {
            persist_item(self, item)?;
        }
        self.end_array()
    }
}
