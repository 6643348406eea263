use std::sync::Arc;

use skirmish_persist::{ColorRgba, ObjectId};

use crate::definition::DefinitionStore;
use crate::factory::ObjectFactory;
use crate::game_logic::{GameLogic, SpawnError};
use crate::game_state::SaveGameState;
use crate::game_state_map::GameStateMap;
use crate::object::GameObject;
use crate::radar::Radar;

/// Everything a save file captures.
#[derive(Debug)]
pub struct World {
    pub game_state: SaveGameState,
    pub map: GameStateMap,
    pub logic: GameLogic,
    pub radar: Radar,
}

impl World {
    pub fn new(definitions: Arc<DefinitionStore>) -> Self {
        Self::from_logic(GameLogic::new(definitions))
    }

    pub fn with_factory(definitions: Arc<DefinitionStore>, factory: Box<dyn ObjectFactory>) -> Self {
        Self::from_logic(GameLogic::with_factory(definitions, factory))
    }

    fn from_logic(logic: GameLogic) -> Self {
        Self {
            game_state: SaveGameState::default(),
            map: GameStateMap::default(),
            logic,
            radar: Radar::new(),
        }
    }

    /// Spawn an object and give it a visible radar blip if its definition
    /// shows on radar.
    pub fn spawn(&mut self, definition: &str, color: ColorRgba) -> Result<ObjectId, SpawnError> {
        let id = self.logic.spawn(definition)?;
        if let Some(object) = self.logic.objects.get(id) {
            self.radar.add_object(object, color, true);
        }
        Ok(id)
    }

    /// Remove an object from the simulation and the radar.
    pub fn despawn(&mut self, id: ObjectId) -> Option<GameObject> {
        self.radar.remove_object(id);
        self.logic.remove(id)
    }

    pub fn object(&self, id: ObjectId) -> Option<&GameObject> {
        self.logic.objects.get(id)
    }

    pub fn object_mut(&mut self, id: ObjectId) -> Option<&mut GameObject> {
        self.logic.objects.get_mut(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{ObjectDefinition, RadarPriority};

    fn definitions() -> Arc<DefinitionStore> {
        let mut store = DefinitionStore::new();
        store
            .insert(ObjectDefinition::new("Tank").with_radar_priority(RadarPriority::Unit))
            .unwrap();
        store.insert(ObjectDefinition::new("Tree")).unwrap();
        Arc::new(store)
    }

    #[test]
    fn spawn_registers_radar_blips_by_priority() {
        let mut world = World::new(definitions());
        let tank = world.spawn("Tank", ColorRgba::new(0, 0, 255, 255)).unwrap();
        let tree = world.spawn("Tree", ColorRgba::default()).unwrap();
        assert!(world.radar.contains(tank));
        assert!(!world.radar.contains(tree));
        assert_eq!(world.object(tank).unwrap().definition_name(), "Tank");
    }

    #[test]
    fn despawn_clears_radar() {
        let mut world = World::new(definitions());
        let tank = world.spawn("Tank", ColorRgba::default()).unwrap();
        assert!(world.despawn(tank).is_some());
        assert!(!world.radar.contains(tank));
        assert!(world.object(tank).is_none());
        assert!(world.despawn(tank).is_none());
    }

    #[test]
    fn unknown_definition_spawns_nothing() {
        let mut world = World::new(definitions());
        assert!(matches!(
            world.spawn("Dragon", ColorRgba::default()),
            Err(SpawnError::UnknownDefinition(name)) if name == "Dragon"
        ));
        assert!(world.logic.objects.is_empty());
    }
}
