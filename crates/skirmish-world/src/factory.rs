use std::fmt;
use std::sync::Arc;

use skirmish_persist::ObjectId;

use crate::definition::ObjectDefinition;
use crate::object::GameObject;

/// Builds game objects from definitions, both when spawning and when a load
/// needs an entity to read into.
pub trait ObjectFactory: fmt::Debug {
    fn create(&mut self, definition: &Arc<ObjectDefinition>) -> GameObject;
}

/// Builds a [`GameObject`] with the modules its definition asks for. The id
/// is left null for the caller (or the save stream) to assign.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultObjectFactory;

impl ObjectFactory for DefaultObjectFactory {
    fn create(&mut self, definition: &Arc<ObjectDefinition>) -> GameObject {
        GameObject::new(ObjectId::NONE, Arc::clone(definition))
    }
}
