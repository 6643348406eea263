use skirmish_persist::{PersistError, Persistable, StatePersister, persist_enum};

persist_enum! {
    #[derive(Default)]
    pub enum SaveFileType {
        #[default]
        Normal = 0,
        Mission = 1,
    }
}

/// Wall-clock time a save was made, field for field as the engine keeps it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaveTimestamp {
    pub year: u16,
    pub month: u16,
    pub day_of_week: u16,
    pub day: u16,
    pub hour: u16,
    pub minute: u16,
    pub second: u16,
    pub millisecond: u16,
}

impl Persistable for SaveTimestamp {
    fn persist(&mut self, p: &mut StatePersister) -> Result<(), PersistError> {
        p.persist_u16("Year", &mut self.year)?;
        p.persist_u16("Month", &mut self.month)?;
        p.persist_u16("DayOfWeek", &mut self.day_of_week)?;
        p.persist_u16("Day", &mut self.day)?;
        p.persist_u16("Hour", &mut self.hour)?;
        p.persist_u16("Minute", &mut self.minute)?;
        p.persist_u16("Second", &mut self.second)?;
        p.persist_u16("Millisecond", &mut self.millisecond)
    }
}

/// Save-file header shown in the load menu.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveGameState {
    pub save_file_type: SaveFileType,
    pub mission_map_name: String,
    pub timestamp: SaveTimestamp,
    pub display_name: String,
    pub map_leaf_name: String,
    pub pristine_map_name: String,
}

impl Persistable for SaveGameState {
    fn persist(&mut self, p: &mut StatePersister) -> Result<(), PersistError> {
        let version = p.persist_version(2)?;

        p.persist_enum("SaveFileType", &mut self.save_file_type)?;
        p.persist_ascii_string("MissionMapName", &mut self.mission_map_name)?;
        p.persist_object("Timestamp", &mut self.timestamp)?;
        p.persist_unicode_string("DisplayName", &mut self.display_name)?;
        p.persist_ascii_string("MapLeafName", &mut self.map_leaf_name)?;

        if version >= 2 {
            p.persist_ascii_string("PristineMapName", &mut self.pristine_map_name)?;
        }
        Ok(())
    }
}
