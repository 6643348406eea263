use glam::IVec3;
use skirmish_persist::{PersistError, Persistable, StatePersister};

/// A named map area. The shape comes from the map; only the runtime state
/// (points and activation) is saved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolygonTrigger {
    pub unique_id: u32,
    pub name: String,
    pub points: Vec<IVec3>,
    pub is_active: bool,
}

impl PolygonTrigger {
    pub fn new(unique_id: u32, name: impl Into<String>, points: Vec<IVec3>) -> Self {
        Self {
            unique_id,
            name: name.into(),
            points,
            is_active: true,
        }
    }
}

impl Persistable for PolygonTrigger {
    fn persist(&mut self, p: &mut StatePersister) -> Result<(), PersistError> {
        p.persist_version(1)?;
        p.persist_list_with_u32_count("Points", &mut self.points, |p, point| {
            p.begin_object("Point")?;
            p.persist_i32("X", &mut point.x)?;
            p.persist_i32("Y", &mut point.y)?;
            p.persist_i32("Z", &mut point.z)?;
            p.end_object()
        })?;
        p.persist_bool("IsActive", &mut self.is_active)
    }
}
