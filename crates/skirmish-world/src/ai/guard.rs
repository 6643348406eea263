//! The guard behavior: an AI state that owns its own nested machine.

use glam::Vec3;
use skirmish_persist::{
    ObjectId, PersistError, Persistable, State, StateKey, StateMachine, StatePersister,
};

pub const GUARD_IDLE: StateKey = StateKey(5001);
pub const GUARD_INNER: StateKey = StateKey(5002);
pub const GUARD_MOVE: StateKey = StateKey(5003);

/// Sub-states of [`GuardStateMachine`].
#[derive(Debug, Clone, PartialEq)]
pub enum GuardSubState {
    Idle { unknown_int: u32 },
    Inner,
    Move { unknown_int: u32 },
}

impl Persistable for GuardSubState {
    fn persist(&mut self, p: &mut StatePersister) -> Result<(), PersistError> {
        p.persist_version(1)?;
        match self {
            GuardSubState::Idle { unknown_int } | GuardSubState::Move { unknown_int } => {
                p.persist_u32("UnknownInt", unknown_int)
            }
            GuardSubState::Inner => Ok(()),
        }
    }
}

impl State for GuardSubState {}

#[derive(Debug, Clone, PartialEq)]
pub struct GuardStateMachine {
    pub base: StateMachine<GuardSubState>,
    pub guard_object_id: ObjectId,
    pub guard_object_id2: ObjectId,
    pub guard_position: Vec3,
    pub guard_polygon_trigger_name: String,
}

impl Default for GuardStateMachine {
    fn default() -> Self {
        let base = StateMachine::from_states([
            (GUARD_IDLE, GuardSubState::Idle { unknown_int: 0 }),
            (GUARD_INNER, GuardSubState::Inner),
            (GUARD_MOVE, GuardSubState::Move { unknown_int: 0 }),
        ]);
        Self {
            base,
            guard_object_id: ObjectId::NONE,
            guard_object_id2: ObjectId::NONE,
            guard_position: Vec3::ZERO,
            guard_polygon_trigger_name: String::new(),
        }
    }
}

impl Persistable for GuardStateMachine {
    fn persist(&mut self, p: &mut StatePersister) -> Result<(), PersistError> {
        p.persist_version(2)?;

        p.persist_object("Base", &mut self.base)?;

        p.persist_object_id("GuardObjectId", &mut self.guard_object_id)?;
        p.persist_object_id("GuardObjectId2", &mut self.guard_object_id2)?;
        p.persist_vec3("GuardPosition", &mut self.guard_position)?;
        p.persist_ascii_string("GuardPolygonTriggerName", &mut self.guard_polygon_trigger_name)
    }
}

/// AI state that guards an object, position or trigger area.
#[derive(Debug, Clone, PartialEq)]
pub struct GuardState {
    pub unknown_bool1: bool,
    pub machine: GuardStateMachine,
}

impl Default for GuardState {
    fn default() -> Self {
        Self {
            unknown_bool1: true,
            machine: GuardStateMachine::default(),
        }
    }
}

impl Persistable for GuardState {
    fn persist(&mut self, p: &mut StatePersister) -> Result<(), PersistError> {
        p.persist_version(1)?;
        p.persist_bool("UnknownBool1", &mut self.unknown_bool1)?;
        p.persist_object("StateMachine", &mut self.machine)
    }
}
