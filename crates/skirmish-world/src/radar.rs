//! Radar contents: which objects show as blips, and recent radar events.

use glam::Vec3;
use skirmish_persist::{ColorRgba, ObjectId, PersistError, Persistable, StatePersister, persist_enum};
use tracing::trace;

use crate::object::GameObject;

persist_enum! {
    #[derive(Default)]
    pub enum RadarEventType {
        #[default]
        Invalid = 0,
        Construction = 1,
        Upgrade = 2,
        UnderAttack = 3,
        Information = 4,
        StealUnitDiscovered = 8,
        UnitLost = 10,
    }
}

// ---------------------------------------------------------------------------
// Items
// ---------------------------------------------------------------------------

/// One blip.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RadarItem {
    pub object_id: ObjectId,
    pub color: ColorRgba,
}

impl Persistable for RadarItem {
    fn persist(&mut self, p: &mut StatePersister) -> Result<(), PersistError> {
        p.persist_version(1)?;
        p.persist_object_id("ObjectId", &mut self.object_id)?;
        p.persist_color_rgba("Color", &mut self.color)
    }
}

/// Blips keyed by object id, kept in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RadarItemCollection {
    items: Vec<RadarItem>,
}

impl RadarItemCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a blip. Returns `false` if the object already has one.
    pub fn insert(&mut self, item: RadarItem) -> bool {
        if self.contains(item.object_id) {
            return false;
        }
        self.items.push(item);
        true
    }

    pub fn remove(&mut self, id: ObjectId) -> Option<RadarItem> {
        let index = self.items.iter().position(|item| item.object_id == id)?;
        Some(self.items.remove(index))
    }

    pub fn get(&self, id: ObjectId) -> Option<&RadarItem> {
        self.items.iter().find(|item| item.object_id == id)
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RadarItem> {
        self.items.iter()
    }
}

impl Persistable for RadarItemCollection {
    fn persist(&mut self, p: &mut StatePersister) -> Result<(), PersistError> {
        p.persist_version(1)?;

        let mut count = u16::try_from(self.items.len()).map_err(|_| PersistError::Unencodable {
            field: p.field_path("Count"),
            reason: format!("{} radar items exceed a u16 count", self.items.len()),
        })?;
        p.persist_u16("Count", &mut count)?;

        p.begin_array("Items")?;
        if p.is_reading() {
            self.items.clear();
            for _ in 0..count {
                let mut item = RadarItem::default();
                p.persist_object("Item", &mut item)?;
                if !self.insert(item) {
                    return Err(PersistError::DuplicateObject(item.object_id));
                }
            }
        } else {
            for item in &mut self.items {
                p.persist_object("Item", item)?;
            }
        }
        p.end_array()
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RadarEvent {
    pub event_type: RadarEventType,
    pub unknown1: bool,
    pub unknown2: u32,
    pub unknown3: u32,
    pub unknown4: u32,
    pub color1: ColorRgba,
    pub color2: ColorRgba,
    pub position: Vec3,
    pub unknown5: u32,
    pub unknown6: u32,
    pub unknown7: bool,
}

impl Persistable for RadarEvent {
    fn persist(&mut self, p: &mut StatePersister) -> Result<(), PersistError> {
        p.persist_enum("Type", &mut self.event_type)?;
        p.persist_bool("Unknown1", &mut self.unknown1)?;
        p.persist_u32("Unknown2", &mut self.unknown2)?;
        p.persist_u32("Unknown3", &mut self.unknown3)?;
        p.persist_u32("Unknown4", &mut self.unknown4)?;
        p.persist_color_rgba_int("Color1", &mut self.color1)?;
        p.persist_color_rgba_int("Color2", &mut self.color2)?;
        p.persist_vec3("Position", &mut self.position)?;
        p.persist_u32("Unknown5", &mut self.unknown5)?;
        p.persist_u32("Unknown6", &mut self.unknown6)?;
        p.persist_bool("Unknown7", &mut self.unknown7)
    }
}

// ---------------------------------------------------------------------------
// Radar
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Radar {
    pub unknown1: bool,
    pub visible: RadarItemCollection,
    pub hidden: RadarItemCollection,
    pub events: Vec<RadarEvent>,
    pub unknown2: u32,
    pub unknown3: u32,
}

impl Radar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track `object` if its definition shows on radar. Returns whether a
    /// blip was added.
    pub fn add_object(&mut self, object: &GameObject, color: ColorRgba, visible: bool) -> bool {
        if !object.definition.radar_priority.shows_on_radar() {
            return false;
        }
        let item = RadarItem {
            object_id: object.id,
            color,
        };
        let added = if visible {
            self.visible.insert(item)
        } else {
            self.hidden.insert(item)
        };
        trace!(id = %object.id, visible, added, "radar add");
        added
    }

    /// Drop `id` from both collections.
    pub fn remove_object(&mut self, id: ObjectId) {
        self.visible.remove(id);
        self.hidden.remove(id);
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.visible.contains(id) || self.hidden.contains(id)
    }
}

impl Persistable for Radar {
    fn persist(&mut self, p: &mut StatePersister) -> Result<(), PersistError> {
        p.persist_version(1)?;

        p.skip_unknown_bytes(1)?;

        p.persist_bool("Unknown1", &mut self.unknown1)?;
        p.persist_object("VisibleItems", &mut self.visible)?;
        p.persist_object("HiddenItems", &mut self.hidden)?;
        p.persist_list_with_u16_count("RadarEvents", &mut self.events, |p, event| {
            p.persist_object("RadarEvent", event)
        })?;
        p.persist_u32("Unknown2", &mut self.unknown2)?;
        p.persist_u32("Unknown3", &mut self.unknown3)
    }
}
