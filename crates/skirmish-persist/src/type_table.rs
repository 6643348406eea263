use std::collections::HashMap;

use crate::error::PersistError;
use crate::persister::{Persistable, StatePersister};

/// Dense mapping between definition names and compact `u16` ids.
///
/// Ids are handed out in first-seen order starting at zero. The table is
/// persisted ahead of the records that refer to it so a reader can resolve
/// ids back to names without any knowledge of the writer's definitions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeTable {
    names: Vec<String>,
    name_to_id: HashMap<String, u16>,
}

impl TypeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up `name`, assigning the next id if it has none yet.
    pub fn get_or_assign_id(&mut self, name: &str) -> Result<u16, PersistError> {
        if let Some(&id) = self.name_to_id.get(name) {
            return Ok(id);
        }
        let id = u16::try_from(self.names.len()).map_err(|_| PersistError::Unencodable {
            field: "ObjectDefinitions".into(),
            reason: "more than 65536 distinct definitions".into(),
        })?;
        self.names.push(name.to_string());
        self.name_to_id.insert(name.to_string(), id);
        Ok(id)
    }

    /// Id previously assigned to `name`.
    pub fn id(&self, name: &str) -> Option<u16> {
        self.name_to_id.get(name).copied()
    }

    /// Name behind `id`.
    pub fn name(&self, id: u16) -> Result<&str, PersistError> {
        self.names
            .get(id as usize)
            .map(String::as_str)
            .ok_or(PersistError::UnknownTypeId(id))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn clear(&mut self) {
        self.names.clear();
        self.name_to_id.clear();
    }

    /// `(id, name)` pairs in id order.
    pub fn iter(&self) -> impl Iterator<Item = (u16, &str)> {
        self.names
            .iter()
            .enumerate()
            .map(|(id, name)| (id as u16, name.as_str()))
    }
}

#[derive(Debug, Default)]
struct Entry {
    name: String,
    id: u16,
}

impl Persistable for TypeTable {
    fn persist(&mut self, p: &mut StatePersister) -> Result<(), PersistError> {
        p.persist_version(1)?;

        let mut entries: Vec<Entry> = self
            .iter()
            .map(|(id, name)| Entry {
                name: name.to_string(),
                id,
            })
            .collect();

        p.persist_list_with_u32_count("Entries", &mut entries, |p, entry| {
            p.begin_object("Entry")?;
            p.persist_ascii_string("Name", &mut entry.name)?;
            p.persist_u16("Id", &mut entry.id)?;
            p.end_object()
        })?;

        if p.is_reading() {
            self.rebuild(entries)?;
        }
        Ok(())
    }
}

impl TypeTable {
    /// Replace the table with stored entries. Ids need not arrive in order
    /// but must form a dense range with no repeated name or id.
    fn rebuild(&mut self, entries: Vec<Entry>) -> Result<(), PersistError> {
        let count = entries.len();
        let mut names: Vec<Option<String>> = vec![None; count];
        let mut name_to_id = HashMap::with_capacity(count);

        for Entry { name, id } in entries {
            let slot = names
                .get_mut(id as usize)
                .ok_or_else(|| PersistError::invalid_state(
                    "ObjectDefinitions.Entries.Id",
                    format!("id {id} outside dense range 0..{count}"),
                ))?;
            if slot.is_some() || name_to_id.contains_key(&name) {
                return Err(PersistError::DuplicateTypeEntry { name, id });
            }
            *slot = Some(name.clone());
            name_to_id.insert(name, id);
        }

        self.names = names.into_iter().flatten().collect();
        self.name_to_id = name_to_id;
        Ok(())
    }
}
