use skirmish_persist::{PersistError, Persistable, StatePersister};

/// One player slot in a skirmish lobby.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SkirmishSlot {
    pub player_name: String,
    pub faction: String,
    pub team: i32,
    pub color: i32,
    pub start_position: i32,
}

impl Persistable for SkirmishSlot {
    fn persist(&mut self, p: &mut StatePersister) -> Result<(), PersistError> {
        p.persist_unicode_string("PlayerName", &mut self.player_name)?;
        p.persist_ascii_string("Faction", &mut self.faction)?;
        p.persist_i32("Team", &mut self.team)?;
        p.persist_i32("Color", &mut self.color)?;
        p.persist_i32("StartPosition", &mut self.start_position)
    }
}

/// Lobby settings needed to restart a skirmish on load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SkirmishGameSettings {
    pub map_name: String,
    pub seed: u32,
    pub starting_cash: u32,
    pub slots: Vec<SkirmishSlot>,
}

impl Persistable for SkirmishGameSettings {
    fn persist(&mut self, p: &mut StatePersister) -> Result<(), PersistError> {
        p.persist_version(1)?;
        p.persist_ascii_string("MapName", &mut self.map_name)?;
        p.persist_u32("Seed", &mut self.seed)?;
        p.persist_u32("StartingCash", &mut self.starting_cash)?;
        p.persist_list_with_u16_count("Slots", &mut self.slots, |p, slot| {
            p.persist_object("Slot", slot)
        })
    }
}
