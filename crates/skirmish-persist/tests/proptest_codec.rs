//! Property-based tests for the persister.
//!
//! Generates random records and random byte streams, then checks that
//! writes read back exactly and that readers never panic on foreign input.

use glam::{Affine3A, Vec3};
use proptest::prelude::*;
use skirmish_persist::test_utils::*;
use skirmish_persist::*;

// ===========================================================================
// A record touching every framing construct
// ===========================================================================

#[derive(Debug, Clone, Default, PartialEq)]
struct Waypoint {
    label: String,
    position: Vec3,
    owner: ObjectId,
}

impl Persistable for Waypoint {
    fn persist(&mut self, p: &mut StatePersister) -> Result<(), PersistError> {
        p.persist_version(1)?;
        p.persist_ascii_string("Label", &mut self.label)?;
        p.persist_vec3("Position", &mut self.position)?;
        p.persist_object_id("Owner", &mut self.owner)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Record {
    frame: u32,
    speed: f32,
    display: String,
    transform: Affine3A,
    waypoints: Vec<Waypoint>,
    extra: Vec<u8>,
}

impl Persistable for Record {
    fn persist(&mut self, p: &mut StatePersister) -> Result<(), PersistError> {
        p.persist_version(2)?;
        p.persist_u32("Frame", &mut self.frame)?;
        p.persist_f32("Speed", &mut self.speed)?;
        p.persist_unicode_string("Display", &mut self.display)?;
        p.persist_matrix4x3("Transform", &mut self.transform)?;
        p.persist_list_with_u16_count("Waypoints", &mut self.waypoints, |p, w| {
            p.persist_object("Waypoint", w)
        })?;

        p.begin_segment("Extra")?;
        if p.is_reading() {
            self.extra = vec![0; p.segment_remaining()? as usize];
        }
        p.persist_span("Bytes", &mut self.extra)?;
        p.end_segment()
    }
}

// ===========================================================================
// Generators
// ===========================================================================

fn arb_vec3() -> impl Strategy<Value = Vec3> {
    (-1.0e6f32..1.0e6, -1.0e6f32..1.0e6, -1.0e6f32..1.0e6).prop_map(|(x, y, z)| Vec3::new(x, y, z))
}

fn arb_waypoint() -> impl Strategy<Value = Waypoint> {
    ("[A-Za-z0-9_]{0,40}", arb_vec3(), any::<u32>()).prop_map(|(label, position, owner)| Waypoint {
        label,
        position,
        owner: ObjectId(owner),
    })
}

fn arb_record() -> impl Strategy<Value = Record> {
    (
        any::<u32>(),
        -1.0e6f32..1.0e6,
        "\\PC{0,60}",
        proptest::collection::vec(-1.0e3f32..1.0e3, 12),
        proptest::collection::vec(arb_waypoint(), 0..20),
        proptest::collection::vec(any::<u8>(), 0..64),
    )
        .prop_filter("display must fit in 255 UTF-16 units", |t| {
            t.2.encode_utf16().count() <= 255
        })
        .prop_map(|(frame, speed, display, m, waypoints, extra)| {
            let mut cols = [0.0f32; 12];
            cols.copy_from_slice(&m);
            Record {
                frame,
                speed,
                display,
                transform: Affine3A::from_cols_array(&cols),
                waypoints,
                extra,
            }
        })
}

// ===========================================================================
// Properties
// ===========================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Whatever is written reads back identically, for every engine variant.
    #[test]
    fn record_round_trips(mut record in arb_record(), game in 0..5usize) {
        let game = GameVariant::ALL[game];
        let mut loaded = Record::default();
        round_trip(game, &mut record, &mut loaded).unwrap();
        prop_assert_eq!(loaded, record);
    }

    /// Every non-null owner read back is reported to the reference tracker.
    #[test]
    fn references_are_tracked(mut record in arb_record()) {
        let bytes = write_to_bytes(GameVariant::Generals, &mut record).unwrap();
        let refs = read_from_bytes(GameVariant::Generals, bytes, &mut Record::default()).unwrap();
        let expected = record.waypoints.iter().filter(|w| w.owner.is_some()).count();
        prop_assert_eq!(refs.len(), expected);
    }

    /// Cutting a valid stream short always fails, and never panics.
    #[test]
    fn truncated_stream_is_an_error(mut record in arb_record(), cut in any::<prop::sample::Index>()) {
        let bytes = write_to_bytes(GameVariant::Generals, &mut record).unwrap();
        let cut = cut.index(bytes.len());
        let result = read_from_bytes(GameVariant::Generals, bytes[..cut].to_vec(), &mut Record::default());
        prop_assert!(result.is_err());
    }

    /// Random bytes either load or fail with an error; they never panic.
    #[test]
    fn garbage_never_panics(bytes in proptest::collection::vec(any::<u8>(), 0..512)) {
        let _ = read_from_bytes(GameVariant::Bfme, bytes.clone(), &mut Record::default());
        let _ = read_from_bytes(GameVariant::Generals, bytes, &mut TypeTable::new());
    }

    /// Same names always map to the same dense ids, in first-seen order.
    #[test]
    fn type_table_ids_are_stable(names in proptest::collection::vec("[A-Z][a-z]{0,6}", 1..40)) {
        let mut table = TypeTable::new();
        let ids: Vec<u16> = names.iter().map(|n| table.get_or_assign_id(n).unwrap()).collect();
        for (name, id) in names.iter().zip(&ids) {
            prop_assert_eq!(table.id(name), Some(*id));
            prop_assert_eq!(table.name(*id).unwrap(), name.as_str());
        }
        let distinct: std::collections::BTreeSet<_> = names.iter().collect();
        prop_assert_eq!(table.len(), distinct.len());
        prop_assert!(table.iter().enumerate().all(|(i, (id, _))| i == id as usize));
    }
}
