use std::sync::Arc;

use glam::Affine3A;
use skirmish_persist::{BitSet, ObjectId, PersistError, Persistable, StatePersister};

use crate::ai::AiUpdate;
use crate::contain::OpenContain;
use crate::definition::ObjectDefinition;

/// Number of model condition flags an object carries.
pub const MODEL_CONDITION_COUNT: usize = 96;

/// A live simulation entity.
#[derive(Debug, Clone, PartialEq)]
pub struct GameObject {
    pub id: ObjectId,
    pub definition: Arc<ObjectDefinition>,
    pub transform: Affine3A,
    pub health: f32,
    pub max_health: f32,
    pub model_condition_flags: BitSet,
    pub team_id: u32,
    pub name: String,
    pub ai: Option<AiUpdate>,
    /// Present exactly when the definition has a contain module.
    pub contain: Option<OpenContain>,
}

impl GameObject {
    /// A fresh object with the modules its definition calls for.
    pub fn new(id: ObjectId, definition: Arc<ObjectDefinition>) -> Self {
        Self {
            id,
            transform: Affine3A::IDENTITY,
            health: definition.max_health,
            max_health: definition.max_health,
            model_condition_flags: BitSet::new(MODEL_CONDITION_COUNT),
            team_id: 0,
            name: String::new(),
            ai: definition.has_ai.then(AiUpdate::default),
            contain: definition.contain.map(|_| OpenContain::default()),
            definition,
        }
    }

    pub fn definition_name(&self) -> &str {
        &self.definition.name
    }
}

impl Persistable for GameObject {
    fn persist(&mut self, p: &mut StatePersister) -> Result<(), PersistError> {
        p.persist_version(1)?;

        // The object's own id, not a reference to another object.
        p.persist_u32("ObjectId", &mut self.id.0)?;
        p.persist_matrix4x3("Transform", &mut self.transform)?;
        p.persist_f32("Health", &mut self.health)?;
        p.persist_f32("MaxHealth", &mut self.max_health)?;
        p.persist_bit_set("ModelConditionFlags", &mut self.model_condition_flags)?;
        p.persist_u32("TeamId", &mut self.team_id)?;
        p.persist_ascii_string("Name", &mut self.name)?;

        let mut has_ai = self.ai.is_some();
        p.persist_bool("HasAi", &mut has_ai)?;
        if p.is_reading() {
            match (has_ai, self.ai.is_some()) {
                (true, false) => self.ai = Some(AiUpdate::default()),
                (false, true) => self.ai = None,
                _ => {}
            }
        }
        if let Some(ai) = &mut self.ai {
            p.persist_object("Ai", ai)?;
        }

        if let Some(contain) = &mut self.contain {
            p.persist_object("OpenContain", contain)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Quat, Vec3};
    use skirmish_persist::test_utils::round_trip;
    use skirmish_persist::{GameVariant, read_from_bytes, write_to_bytes};

    fn tank() -> Arc<ObjectDefinition> {
        Arc::new(ObjectDefinition::new("Tank").with_ai())
    }

    #[test]
    fn new_object_follows_definition() {
        let obj = GameObject::new(ObjectId(1), tank());
        assert!(obj.ai.is_some());
        assert!(obj.contain.is_none());
        assert_eq!(obj.health, 100.0);

        let bunker = GameObject::new(ObjectId(2), Arc::new(ObjectDefinition::new("Bunker").with_contain(4)));
        assert!(bunker.ai.is_none());
        assert!(bunker.contain.is_some());
    }

    #[test]
    fn fields_round_trip() {
        let mut obj = GameObject::new(ObjectId(7), tank());
        obj.transform = Affine3A::from_rotation_translation(
            Quat::from_rotation_z(0.5),
            Vec3::new(100.0, 40.0, 2.0),
        );
        obj.health = 35.5;
        obj.team_id = 3;
        obj.name = "Alpha".into();
        obj.model_condition_flags.set(40, true);
        obj.ai.as_mut().unwrap().guard().unwrap().unknown_bool1 = false;

        let mut loaded = GameObject::new(ObjectId::NONE, tank());
        round_trip(GameVariant::Generals, &mut obj, &mut loaded).unwrap();
        assert_eq!(loaded, obj);
    }

    #[test]
    fn own_id_is_not_a_reference() {
        let mut obj = GameObject::new(ObjectId(7), tank());
        let bytes = write_to_bytes(GameVariant::Generals, &mut obj).unwrap();
        let refs = read_from_bytes(GameVariant::Generals, bytes, &mut GameObject::new(ObjectId::NONE, tank())).unwrap();
        assert!(refs.is_empty());
    }

    #[test]
    fn stored_ai_flag_wins_over_definition() {
        let plain = Arc::new(ObjectDefinition::new("Tank"));
        let mut obj = GameObject::new(ObjectId(2), tank());
        let mut loaded = GameObject::new(ObjectId::NONE, plain);
        round_trip(GameVariant::Generals, &mut obj, &mut loaded).unwrap();
        assert!(loaded.ai.is_some());
    }
}
