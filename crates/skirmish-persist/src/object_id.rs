//! Object identity and the registry of live entities.
//!
//! Cross-entity references are persisted as plain [`ObjectId`] integers.
//! On load they are recorded by the [`ReferenceTracker`] and checked against
//! the registry once every entity has been constructed, so entities can be
//! read in any order.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::PersistError;

/// Identifies a live entity within one simulation. `ObjectId(0)` means
/// "no reference".
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct ObjectId(pub u32);

impl ObjectId {
    /// The null reference.
    pub const NONE: ObjectId = ObjectId(0);

    pub fn is_none(self) -> bool {
        self == Self::NONE
    }

    pub fn is_some(self) -> bool {
        !self.is_none()
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// ObjectRegistry
// ---------------------------------------------------------------------------

/// Id-keyed registry of live entities.
///
/// Iteration is in ascending id order, which is also the order entities are
/// persisted. Ids come from the stream on load, so storage is keyed rather
/// than indexed by id.
#[derive(Debug, Clone)]
pub struct ObjectRegistry<T> {
    entries: BTreeMap<ObjectId, T>,
    /// One past the highest id ever inserted. Exceeds `u32::MAX` once the
    /// id space is used up.
    high_water: u64,
}

impl<T> Default for ObjectRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ObjectRegistry<T> {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            high_water: 1,
        }
    }

    /// Register `value` under `id`. Rejects the null id and ids already in use.
    pub fn insert(&mut self, id: ObjectId, value: T) -> Result<(), PersistError> {
        if id.is_none() {
            return Err(PersistError::invalid_state(
                "ObjectRegistry",
                "object id 0 is reserved for the null reference",
            ));
        }
        if self.contains(id) {
            return Err(PersistError::DuplicateObject(id));
        }
        self.entries.insert(id, value);
        self.high_water = self.high_water.max(u64::from(id.0) + 1);
        Ok(())
    }

    pub fn remove(&mut self, id: ObjectId) -> Option<T> {
        self.entries.remove(&id)
    }

    pub fn get(&self, id: ObjectId) -> Option<&T> {
        self.entries.get(&id)
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut T> {
        self.entries.get_mut(&id)
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Resolve a persisted reference. The null id resolves to `None`; any
    /// other id must name a live entity.
    pub fn resolve(&self, field: &str, id: ObjectId) -> Result<Option<&T>, PersistError> {
        if id.is_none() {
            return Ok(None);
        }
        self.get(id)
            .map(Some)
            .ok_or_else(|| PersistError::UnresolvedObject {
                field: field.to_string(),
                id,
            })
    }

    /// Number of live entities.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.high_water = 1;
    }

    /// The smallest id greater than every id ever stored, or `None` once
    /// `u32::MAX` has been handed out.
    pub fn next_free_id(&self) -> Option<ObjectId> {
        u32::try_from(self.high_water).ok().map(ObjectId)
    }

    /// Never hand out an id below `next`, even if it was never stored here.
    pub fn reserve_below(&mut self, next: ObjectId) {
        self.high_water = self.high_water.max(u64::from(next.0));
    }

    /// Live entities in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = (ObjectId, &T)> {
        self.entries.iter().map(|(id, v)| (*id, v))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (ObjectId, &mut T)> {
        self.entries.iter_mut().map(|(id, v)| (*id, v))
    }

    pub fn ids(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.entries.keys().copied()
    }
}

// ---------------------------------------------------------------------------
// ReferenceTracker
// ---------------------------------------------------------------------------

/// A reference read during a load, waiting to be checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingReference {
    /// Diagnostic path of the field that held the reference.
    pub field: String,
    pub id: ObjectId,
}

/// Collects every non-null object reference read during a load.
#[derive(Debug, Default, Clone)]
pub struct ReferenceTracker {
    pending: Vec<PendingReference>,
}

impl ReferenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, field: String, id: ObjectId) {
        if id.is_some() {
            self.pending.push(PendingReference { field, id });
        }
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PendingReference> {
        self.pending.iter()
    }

    /// Check every recorded reference against `is_live`. Fails on the first
    /// reference in read order that names no live entity.
    pub fn verify(&self, is_live: impl Fn(ObjectId) -> bool) -> Result<(), PersistError> {
        match self.pending.iter().find(|r| !is_live(r.id)) {
            Some(dangling) => Err(PersistError::UnresolvedObject {
                field: dangling.field.clone(),
                id: dangling.id,
            }),
            None => Ok(()),
        }
    }
}
