use glam::Affine3A;
use skirmish_persist::{BitSet, ObjectId, PersistError, Persistable, StatePersister};

use crate::object::MODEL_CONDITION_COUNT;

pub const FIRE_POINT_COUNT: usize = 32;

/// An occupant entry whose second field has no known meaning.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContainEntry {
    pub object_id: ObjectId,
    pub unknown10: i32,
}

/// Container module for transports and garrisons.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenContain {
    pub contained: Vec<ObjectId>,
    pub frame_something: u32,
    pub frame_something2: u32,
    pub model_condition_flags: BitSet,
    pub fire_points: [Affine3A; FIRE_POINT_COUNT],
    pub next_fire_point_index: u32,
    pub num_fire_points: u32,
    pub has_no_fire_points: bool,
    pub entries: Vec<ContainEntry>,
    pub unknown8: i32,
}

impl Default for OpenContain {
    fn default() -> Self {
        Self {
            contained: Vec::new(),
            frame_something: 0,
            frame_something2: 0,
            model_condition_flags: BitSet::new(MODEL_CONDITION_COUNT),
            fire_points: [Affine3A::IDENTITY; FIRE_POINT_COUNT],
            next_fire_point_index: 0,
            num_fire_points: 0,
            has_no_fire_points: true,
            entries: Vec::new(),
            unknown8: 0,
        }
    }
}

impl Persistable for OpenContain {
    fn persist(&mut self, p: &mut StatePersister) -> Result<(), PersistError> {
        p.persist_version(1)?;

        p.persist_list_with_u32_count("Contained", &mut self.contained, |p, id| {
            p.persist_object_id("ObjectId", id)
        })?;

        p.skip_unknown_bytes(2)?;
        p.persist_u32("FrameSomething", &mut self.frame_something)?;
        p.persist_u32("FrameSomething2", &mut self.frame_something2)?;
        p.skip_unknown_bytes(8)?;

        p.persist_bit_set("ModelConditionFlags", &mut self.model_condition_flags)?;

        p.begin_array("FirePoints")?;
        for transform in self.fire_points.iter_mut() {
            p.persist_matrix4x3("FirePoint", transform)?;
        }
        p.end_array()?;

        p.persist_reserved("Unknown6", -1i32)?;
        p.persist_u32("NextFirePointIndex", &mut self.next_fire_point_index)?;
        p.persist_u32("NumFirePoints", &mut self.num_fire_points)?;
        p.persist_bool("HasNoFirePoints", &mut self.has_no_fire_points)?;
        p.skip_unknown_bytes(13)?;

        p.persist_list_with_u16_count("Entries", &mut self.entries, |p, entry| {
            p.begin_object("Entry")?;
            p.persist_object_id("ObjectId", &mut entry.object_id)?;
            p.persist_i32("Unknown10", &mut entry.unknown10)?;
            p.end_object()
        })?;

        p.persist_i32("Unknown8", &mut self.unknown8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use skirmish_persist::test_utils::round_trip;
    use skirmish_persist::{GameVariant, read_from_bytes, write_to_bytes};

    fn occupied() -> OpenContain {
        let mut contain = OpenContain {
            contained: vec![ObjectId(3), ObjectId(9)],
            frame_something: 120,
            num_fire_points: 2,
            has_no_fire_points: false,
            entries: vec![ContainEntry {
                object_id: ObjectId(3),
                unknown10: -4,
            }],
            ..OpenContain::default()
        };
        contain.fire_points[1] = Affine3A::from_translation(Vec3::new(1.0, 2.0, 3.0));
        contain.model_condition_flags.set(12, true);
        contain
    }

    #[test]
    fn round_trip_preserves_occupants() {
        let mut contain = occupied();
        let mut loaded = OpenContain::default();
        round_trip(GameVariant::ZeroHour, &mut contain, &mut loaded).unwrap();
        assert_eq!(loaded, contain);
    }

    #[test]
    fn occupants_are_reported_as_references() {
        let mut contain = occupied();
        let bytes = write_to_bytes(GameVariant::Generals, &mut contain).unwrap();
        let refs = read_from_bytes(GameVariant::Generals, bytes, &mut OpenContain::default()).unwrap();
        let ids: Vec<_> = refs.iter().map(|r| r.id.0).collect();
        assert_eq!(ids, vec![3, 9, 3]);
    }

    #[test]
    fn reserved_marker_mismatch_fails() {
        let mut contain = OpenContain::default();
        let mut bytes = write_to_bytes(GameVariant::Generals, &mut contain).unwrap();
        // version(1) + count(4) + skip(2) + frames(8) + skip(8) + flags(4) + 32 * 48
        let unknown6 = 1 + 4 + 2 + 8 + 8 + 4 + FIRE_POINT_COUNT * 48;
        bytes[unknown6..unknown6 + 4].copy_from_slice(&0i32.to_le_bytes());
        let err = read_from_bytes(GameVariant::Generals, bytes, &mut OpenContain::default()).unwrap_err();
        assert!(matches!(err, PersistError::InvalidState { ref field, .. } if field == "Unknown6"));
    }
}
