//! Static object definitions, loaded once and shared by every object built
//! from them.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::{ConfigError, deserialize_file};

#[derive(Debug, thiserror::Error)]
pub enum DefinitionError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("object definition '{0}' is defined more than once")]
    Duplicate(String),
}

/// How an object competes for space on the radar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RadarPriority {
    #[default]
    Invalid,
    NotOnRadar,
    Structure,
    Unit,
    LocalUnitOnly,
}

impl RadarPriority {
    pub fn shows_on_radar(self) -> bool {
        !matches!(self, RadarPriority::Invalid | RadarPriority::NotOnRadar)
    }
}

/// Transport/garrison capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainDefinition {
    pub contain_max: u32,
}

fn default_max_health() -> f32 {
    100.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectDefinition {
    pub name: String,
    #[serde(default = "default_max_health")]
    pub max_health: f32,
    #[serde(default)]
    pub radar_priority: RadarPriority,
    /// Objects with AI get an [`crate::ai::AiUpdate`] when built.
    #[serde(default)]
    pub has_ai: bool,
    #[serde(default)]
    pub contain: Option<ContainDefinition>,
}

impl ObjectDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            max_health: default_max_health(),
            radar_priority: RadarPriority::default(),
            has_ai: false,
            contain: None,
        }
    }

    pub fn with_radar_priority(mut self, priority: RadarPriority) -> Self {
        self.radar_priority = priority;
        self
    }

    pub fn with_ai(mut self) -> Self {
        self.has_ai = true;
        self
    }

    pub fn with_contain(mut self, contain_max: u32) -> Self {
        self.contain = Some(ContainDefinition { contain_max });
        self
    }
}

#[derive(Debug, Deserialize)]
struct DefinitionFile {
    #[serde(default)]
    objects: Vec<ObjectDefinition>,
}

/// Name-indexed object definitions.
#[derive(Debug, Clone, Default)]
pub struct DefinitionStore {
    by_name: HashMap<String, Arc<ObjectDefinition>>,
}

impl DefinitionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, definition: ObjectDefinition) -> Result<Arc<ObjectDefinition>, DefinitionError> {
        if self.by_name.contains_key(&definition.name) {
            return Err(DefinitionError::Duplicate(definition.name));
        }
        let definition = Arc::new(definition);
        self.by_name
            .insert(definition.name.clone(), Arc::clone(&definition));
        Ok(definition)
    }

    pub fn get(&self, name: &str) -> Option<&Arc<ObjectDefinition>> {
        self.by_name.get(name)
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Load `objects = [...]` from a RON, TOML or JSON file.
    pub fn from_file(path: &Path) -> Result<Self, DefinitionError> {
        let file: DefinitionFile = deserialize_file(path)?;
        let mut store = Self::new();
        for definition in file.objects {
            store.insert(definition)?;
        }
        Ok(store)
    }
}
