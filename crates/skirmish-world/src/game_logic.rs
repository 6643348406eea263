//! The simulation's top-level persisted state: every live object, the
//! campaign, trigger state and the tech-tree and command-button overrides.

use std::collections::BTreeMap;
use std::sync::Arc;

use skirmish_persist::{
    ObjectId, ObjectRegistry, PersistError, Persistable, StatePersister, TypeTable, persist_enum,
};
use tracing::trace;

use crate::campaign::CampaignManager;
use crate::definition::DefinitionStore;
use crate::factory::{DefaultObjectFactory, ObjectFactory};
use crate::object::GameObject;
use crate::trigger::PolygonTrigger;

persist_enum! {
    #[derive(Default)]
    pub enum BuildableStatus {
        #[default]
        Yes = 0,
        IgnorePrerequisites = 1,
        No = 2,
        OnlyByAi = 3,
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SpawnError {
    #[error("no object definition named '{0}'")]
    UnknownDefinition(String),

    #[error("every object id has been handed out")]
    IdsExhausted,

    #[error(transparent)]
    Registry(#[from] PersistError),
}

#[derive(Debug)]
pub struct GameLogic {
    pub current_frame: u32,
    pub objects: ObjectRegistry<GameObject>,
    /// Per-save definition ids. Rebuilt on every save.
    pub definition_table: TypeTable,
    pub campaign: CampaignManager,
    /// Runtime state of the map's triggers, in map order. Supplied by the
    /// session when a load starts the map.
    pub polygon_triggers: Vec<PolygonTrigger>,
    pub rank_level_limit: u32,
    pub tech_tree_overrides: BTreeMap<String, BuildableStatus>,
    /// Command set names prefixed with their button index.
    pub command_button_overrides: Vec<String>,
    definitions: Arc<DefinitionStore>,
    factory: Box<dyn ObjectFactory>,
}

impl GameLogic {
    pub fn new(definitions: Arc<DefinitionStore>) -> Self {
        Self::with_factory(definitions, Box::new(DefaultObjectFactory))
    }

    pub fn with_factory(definitions: Arc<DefinitionStore>, factory: Box<dyn ObjectFactory>) -> Self {
        Self {
            current_frame: 0,
            objects: ObjectRegistry::new(),
            definition_table: TypeTable::new(),
            campaign: CampaignManager::default(),
            polygon_triggers: Vec::new(),
            rank_level_limit: 0,
            tech_tree_overrides: BTreeMap::new(),
            command_button_overrides: Vec::new(),
            definitions,
            factory,
        }
    }

    pub fn definitions(&self) -> &Arc<DefinitionStore> {
        &self.definitions
    }

    /// Build an object from the named definition under the next free id.
    pub fn spawn(&mut self, definition: &str) -> Result<ObjectId, SpawnError> {
        let definition = self
            .definitions
            .get(definition)
            .ok_or_else(|| SpawnError::UnknownDefinition(definition.to_string()))?;
        let mut object = self.factory.create(definition);
        let id = self.objects.next_free_id().ok_or(SpawnError::IdsExhausted)?;
        object.id = id;
        self.objects.insert(id, object)?;
        Ok(id)
    }

    pub fn remove(&mut self, id: ObjectId) -> Option<GameObject> {
        self.objects.remove(id)
    }

    /// Assign table ids to the definitions of live objects, in ascending
    /// object id order.
    fn rebuild_definition_table(&mut self) -> Result<(), PersistError> {
        self.definition_table.clear();
        for (_, object) in self.objects.iter() {
            self.definition_table
                .get_or_assign_id(object.definition_name())?;
        }
        Ok(())
    }

    fn persist_objects(&mut self, p: &mut StatePersister) -> Result<(), PersistError> {
        let mut count = self.objects.len() as u32;
        p.persist_u32("ObjectsCount", &mut count)?;

        p.begin_array("Objects")?;
        if p.is_reading() {
            self.objects.clear();
            for _ in 0..count {
                p.begin_object("")?;

                let mut definition_id = 0u16;
                p.persist_u16("ObjectDefinitionId", &mut definition_id)?;
                let name = self.definition_table.name(definition_id)?.to_string();
                let definition = self.definitions.get(&name).ok_or_else(|| {
                    PersistError::InvalidValue {
                        field: p.field_path("ObjectDefinitionId"),
                        reason: format!("no object definition named '{name}'"),
                    }
                })?;
                let mut object = self.factory.create(definition);

                p.begin_segment(&name)?;
                p.persist_object("Object", &mut object)?;
                p.end_segment()?;

                trace!(id = %object.id, definition = %name, "loaded object");
                self.objects.insert(object.id, object)?;
                p.end_object()?;
            }
        } else {
            for (_, object) in self.objects.iter_mut() {
                p.begin_object("")?;

                let name = object.definition.name.clone();
                let mut definition_id = self.definition_table.id(&name).ok_or_else(|| {
                    PersistError::invalid_state("ObjectDefinitionId", format!("'{name}' has no table id"))
                })?;
                p.persist_u16("ObjectDefinitionId", &mut definition_id)?;

                p.begin_segment(&name)?;
                p.persist_object("Object", object)?;
                p.end_segment()?;

                p.end_object()?;
            }
        }
        p.end_array()
    }

    fn persist_polygon_triggers(&mut self, p: &mut StatePersister) -> Result<(), PersistError> {
        p.persist_array_with_u32_length("PolygonTriggers", &mut self.polygon_triggers, |p, trigger| {
            p.begin_object("")?;
            let mut id = trigger.unique_id;
            p.persist_u32("Id", &mut id)?;
            if id != trigger.unique_id {
                return Err(PersistError::invalid_state(
                    p.field_path("Id"),
                    format!("stored trigger id {id} does not match map trigger {}", trigger.unique_id),
                ));
            }
            p.persist_object("Value", trigger)?;
            p.end_object()
        })
    }

    fn persist_tech_tree_overrides(&mut self, p: &mut StatePersister) -> Result<(), PersistError> {
        p.begin_array("TechTreeOverrides")?;
        if p.is_reading() {
            self.tech_tree_overrides.clear();
            loop {
                p.begin_object("")?;
                let mut name = String::new();
                p.persist_ascii_string("ObjectDefinitionName", &mut name)?;
                if name.is_empty() {
                    p.end_object()?;
                    break;
                }
                let mut status = BuildableStatus::default();
                p.persist_enum("BuildableStatus", &mut status)?;
                p.end_object()?;
                if self.tech_tree_overrides.insert(name, status).is_some() {
                    return Err(PersistError::invalid_state(
                        p.field_path("ObjectDefinitionName"),
                        "duplicate tech tree override",
                    ));
                }
            }
        } else {
            for (name, status) in self.tech_tree_overrides.iter_mut() {
                if name.is_empty() {
                    return Err(PersistError::Unencodable {
                        field: p.field_path("ObjectDefinitionName"),
                        reason: "empty name is the list terminator".into(),
                    });
                }
                p.begin_object("")?;
                let mut name = name.clone();
                p.persist_ascii_string("ObjectDefinitionName", &mut name)?;
                p.persist_enum("BuildableStatus", status)?;
                p.end_object()?;
            }
            p.begin_object("")?;
            p.persist_ascii_string("ObjectDefinitionName", &mut String::new())?;
            p.end_object()?;
        }
        p.end_array()
    }

    fn persist_command_button_overrides(&mut self, p: &mut StatePersister) -> Result<(), PersistError> {
        p.begin_array("CommandButtonOverrides")?;
        if p.is_reading() {
            self.command_button_overrides.clear();
            loop {
                let mut name = String::new();
                p.persist_ascii_string("CommandSetName", &mut name)?;
                if name.is_empty() {
                    break;
                }
                self.command_button_overrides.push(name);
                p.skip_unknown_bytes(1)?;
            }
        } else {
            for name in self.command_button_overrides.iter_mut() {
                if name.is_empty() {
                    return Err(PersistError::Unencodable {
                        field: p.field_path("CommandSetName"),
                        reason: "empty name is the list terminator".into(),
                    });
                }
                p.persist_ascii_string("CommandSetName", name)?;
                p.skip_unknown_bytes(1)?;
            }
            p.persist_ascii_string("CommandSetName", &mut String::new())?;
        }
        p.end_array()
    }
}

impl Persistable for GameLogic {
    fn persist(&mut self, p: &mut StatePersister) -> Result<(), PersistError> {
        p.persist_version(9)?;

        p.persist_u32("CurrentFrame", &mut self.current_frame)?;

        if p.is_writing() {
            self.rebuild_definition_table()?;
        }
        p.persist_object("ObjectDefinitions", &mut self.definition_table)?;

        self.persist_objects(p)?;

        p.persist_object("CampaignManager", &mut self.campaign)?;

        p.persist_reserved("Unknown1", true)?;
        p.skip_unknown_bytes(2)?;
        p.persist_reserved("Unknown1_1", true)?;

        self.persist_polygon_triggers(p)?;

        p.persist_u32("RankLevelLimit", &mut self.rank_level_limit)?;
        p.skip_unknown_bytes(4)?;

        self.persist_tech_tree_overrides(p)?;

        p.persist_reserved("UnknownBool1", true)?;
        p.persist_reserved("UnknownBool2", true)?;
        p.persist_reserved("UnknownBool3", true)?;
        p.persist_reserved("Unknown3", u32::MAX)?;

        self.persist_command_button_overrides(p)?;

        p.skip_unknown_bytes(4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::IVec3;
    use skirmish_persist::test_utils::StreamBuilder;
    use skirmish_persist::{ErrorKind, GameVariant, PersistEnum, read_from_bytes, write_to_bytes};

    use crate::definition::ObjectDefinition;

    fn definitions() -> Arc<DefinitionStore> {
        let mut store = DefinitionStore::new();
        store.insert(ObjectDefinition::new("Tank").with_ai()).unwrap();
        store.insert(ObjectDefinition::new("Dozer")).unwrap();
        store.insert(ObjectDefinition::new("Bunker").with_contain(5)).unwrap();
        Arc::new(store)
    }

    fn populated() -> GameLogic {
        let mut logic = GameLogic::new(definitions());
        logic.current_frame = 900;
        logic.spawn("Tank").unwrap();
        logic.spawn("Dozer").unwrap();
        logic.spawn("Tank").unwrap();
        logic.spawn("Bunker").unwrap();
        logic.rank_level_limit = 3;
        logic.polygon_triggers = vec![PolygonTrigger::new(5, "Base", vec![IVec3::ONE])];
        logic
            .tech_tree_overrides
            .insert("Dozer".into(), BuildableStatus::No);
        logic
            .tech_tree_overrides
            .insert("Barracks".into(), BuildableStatus::OnlyByAi);
        logic.command_button_overrides = vec!["3Command_Tank".into()];
        logic
    }

    fn fresh() -> GameLogic {
        let mut logic = GameLogic::new(definitions());
        logic.polygon_triggers = vec![PolygonTrigger::new(5, "Base", Vec::new())];
        logic
    }

    #[test]
    fn table_assigned_in_object_order() {
        let mut logic = populated();
        write_to_bytes(GameVariant::Generals, &mut logic).unwrap();
        let names: Vec<_> = logic.definition_table.iter().collect();
        assert_eq!(names, vec![(0, "Tank"), (1, "Dozer"), (2, "Bunker")]);
    }

    #[test]
    fn spawn_stops_when_ids_run_out() {
        let mut logic = GameLogic::new(definitions());
        logic.objects.reserve_below(ObjectId(u32::MAX));
        assert_eq!(logic.spawn("Dozer").unwrap(), ObjectId(u32::MAX));
        assert!(matches!(logic.spawn("Dozer"), Err(SpawnError::IdsExhausted)));
        assert_eq!(logic.objects.len(), 1);
    }

    #[test]
    fn removed_objects_are_not_saved() {
        let mut logic = populated();
        logic.remove(ObjectId(2));
        let bytes = write_to_bytes(GameVariant::Generals, &mut logic).unwrap();

        let mut loaded = fresh();
        read_from_bytes(GameVariant::Generals, bytes, &mut loaded).unwrap();
        assert_eq!(loaded.objects.ids().collect::<Vec<_>>(), vec![ObjectId(1), ObjectId(3), ObjectId(4)]);
        assert_eq!(loaded.definition_table.len(), 2);
    }

    #[test]
    fn full_round_trip() {
        let mut logic = populated();
        logic.objects.get_mut(ObjectId(3)).unwrap().name = "Lead".into();
        logic.campaign.mission_name = "Skirmish".into();
        let bytes = write_to_bytes(GameVariant::ZeroHour, &mut logic).unwrap();

        let mut loaded = fresh();
        read_from_bytes(GameVariant::ZeroHour, bytes, &mut loaded).unwrap();

        assert_eq!(loaded.current_frame, 900);
        assert_eq!(loaded.objects.len(), 4);
        for (id, object) in logic.objects.iter() {
            assert_eq!(loaded.objects.get(id), Some(object));
        }
        assert_eq!(loaded.polygon_triggers, logic.polygon_triggers);
        assert_eq!(loaded.tech_tree_overrides, logic.tech_tree_overrides);
        assert_eq!(loaded.command_button_overrides, logic.command_button_overrides);
        assert_eq!(loaded.campaign, logic.campaign);
        assert_eq!(loaded.rank_level_limit, 3);
    }

    #[test]
    fn tech_tree_overrides_are_written_in_name_order() {
        let mut logic = GameLogic::new(definitions());
        logic.tech_tree_overrides.insert("Zeta".into(), BuildableStatus::No);
        logic.tech_tree_overrides.insert("Alpha".into(), BuildableStatus::Yes);
        let bytes = write_to_bytes(GameVariant::Generals, &mut logic).unwrap();
        let alpha = bytes.windows(5).position(|w| w == b"Alpha").unwrap();
        let zeta = bytes.windows(4).position(|w| w == b"Zeta").unwrap();
        assert!(alpha < zeta);
    }

    #[test]
    fn repeated_tech_tree_override_is_rejected() {
        let mut logic = GameLogic::new(definitions());
        logic.tech_tree_overrides.insert("Dozer".into(), BuildableStatus::No);
        let bytes = write_to_bytes(GameVariant::Generals, &mut logic).unwrap();

        let entry = bytes.windows(6).position(|w| w == b"\x05Dozer").unwrap();
        let mut repeated = bytes[..entry + 6].to_vec();
        repeated.extend_from_slice(&BuildableStatus::No.to_raw().to_le_bytes());
        repeated.extend_from_slice(b"\x05Dozer");
        repeated.extend_from_slice(&BuildableStatus::OnlyByAi.to_raw().to_le_bytes());
        repeated.extend_from_slice(&bytes[entry + 10..]);

        let err = read_from_bytes(GameVariant::Generals, repeated, &mut GameLogic::new(definitions()))
            .unwrap_err();
        assert!(matches!(
            err,
            PersistError::InvalidState { ref field, .. } if field.ends_with("ObjectDefinitionName")
        ));
    }

    #[test]
    fn trigger_id_mismatch_is_rejected() {
        let mut logic = populated();
        let bytes = write_to_bytes(GameVariant::Generals, &mut logic).unwrap();

        let mut loaded = GameLogic::new(definitions());
        loaded.polygon_triggers = vec![PolygonTrigger::new(6, "Other", Vec::new())];
        let err = read_from_bytes(GameVariant::Generals, bytes, &mut loaded).unwrap_err();
        assert!(matches!(err, PersistError::InvalidState { .. }));
    }

    #[test]
    fn trigger_count_must_match_map() {
        let mut logic = populated();
        let bytes = write_to_bytes(GameVariant::Generals, &mut logic).unwrap();
        let err = read_from_bytes(GameVariant::Generals, bytes, &mut GameLogic::new(definitions())).unwrap_err();
        assert!(err.is_format_violation());
    }

    #[test]
    fn empty_override_name_cannot_be_written() {
        let mut logic = GameLogic::new(definitions());
        logic.command_button_overrides.push(String::new());
        let err = write_to_bytes(GameVariant::Generals, &mut logic).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Usage);
    }

    fn logic_header() -> StreamBuilder {
        StreamBuilder::new().u8(9).u32(0)
    }

    #[test]
    fn unknown_definition_id_is_format_violation() {
        let bytes = logic_header()
            .u8(1)
            .u32(1)
            .ascii("Tank")
            .u16(0)
            .u32(1)
            .u16(3)
            .build();
        let err = read_from_bytes(GameVariant::Generals, bytes, &mut fresh()).unwrap_err();
        assert!(matches!(err, PersistError::UnknownTypeId(3)));
    }

    #[test]
    fn definition_missing_from_store_is_format_violation() {
        let bytes = logic_header()
            .u8(1)
            .u32(1)
            .ascii("Humvee")
            .u16(0)
            .u32(1)
            .u16(0)
            .build();
        let err = read_from_bytes(GameVariant::Generals, bytes, &mut fresh()).unwrap_err();
        assert!(matches!(err, PersistError::InvalidValue { ref reason, .. } if reason.contains("Humvee")));
    }

    #[test]
    fn reserved_sentinel_mismatch_fails_fast() {
        let mut logic = GameLogic::new(definitions());
        let mut bytes = write_to_bytes(GameVariant::Generals, &mut logic).unwrap();
        // version, frame, table(version + count), count, campaign(1 + 1 + 1 + 4 + 4 + 4)
        let unknown1 = 1 + 4 + 5 + 4 + 15;
        assert_eq!(bytes[unknown1], 1);
        bytes[unknown1] = 0;
        let err = read_from_bytes(GameVariant::Generals, bytes, &mut GameLogic::new(definitions())).unwrap_err();
        assert!(matches!(err, PersistError::InvalidState { ref field, .. } if field == "Unknown1"));
    }
}
