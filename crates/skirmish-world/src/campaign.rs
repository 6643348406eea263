use skirmish_persist::{PersistError, Persistable, StatePersister, persist_enum};

persist_enum! {
    #[derive(Default)]
    pub enum Difficulty {
        Easy = 0,
        #[default]
        Normal = 1,
        Hard = 2,
    }
}

/// Campaign progress. Saved both as its own chunk and inside the game
/// logic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CampaignManager {
    pub campaign_name: String,
    pub mission_name: String,
    pub unknown1: u32,
    pub difficulty: Difficulty,
    pub rank_points: u32,
}

impl Persistable for CampaignManager {
    fn persist(&mut self, p: &mut StatePersister) -> Result<(), PersistError> {
        let version = p.persist_version(5)?;

        p.persist_ascii_string("CampaignName", &mut self.campaign_name)?;
        p.persist_ascii_string("MissionName", &mut self.mission_name)?;
        p.persist_u32("Unknown1", &mut self.unknown1)?;
        p.persist_enum("Difficulty", &mut self.difficulty)?;

        if version >= 5 {
            p.persist_u32("RankPoints", &mut self.rank_points)?;
        }
        Ok(())
    }
}
