//! AI behavior state. Only the persisted shape is modelled here; the
//! behaviors themselves live with the simulation.

pub mod guard;

use skirmish_persist::{PersistError, Persistable, State, StateKey, StateMachine, StatePersister};

pub use guard::{GuardState, GuardStateMachine, GuardSubState};

pub const AI_IDLE: StateKey = StateKey(0);
pub const AI_GUARD: StateKey = StateKey(15);

/// Top-level AI states of a unit.
#[derive(Debug, Clone, PartialEq)]
pub enum AiState {
    Idle,
    Guard(Box<GuardState>),
}

impl Persistable for AiState {
    fn persist(&mut self, p: &mut StatePersister) -> Result<(), PersistError> {
        match self {
            AiState::Idle => p.persist_version(1).map(|_| ()),
            AiState::Guard(guard) => guard.persist(p),
        }
    }
}

impl State for AiState {}

/// The AI module attached to objects whose definition has AI.
#[derive(Debug, Clone, PartialEq)]
pub struct AiUpdate {
    pub state_machine: StateMachine<AiState>,
}

impl Default for AiUpdate {
    fn default() -> Self {
        Self {
            state_machine: StateMachine::from_states([
                (AI_IDLE, AiState::Idle),
                (AI_GUARD, AiState::Guard(Box::default())),
            ]),
        }
    }
}

impl AiUpdate {
    /// Switch to guarding and hand back the guard state for setup.
    pub fn guard(&mut self) -> Result<&mut GuardState, PersistError> {
        self.state_machine.transition(AI_GUARD)?;
        match self.state_machine.current_mut() {
            AiState::Guard(guard) => Ok(guard),
            AiState::Idle => Err(PersistError::invalid_state(
                "Ai.StateMachine",
                "guard key is registered to a non-guard state",
            )),
        }
    }
}

impl Persistable for AiUpdate {
    fn persist(&mut self, p: &mut StatePersister) -> Result<(), PersistError> {
        p.persist_version(1)?;
        p.persist_object("StateMachine", &mut self.state_machine)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skirmish_persist::GameVariant;
    use skirmish_persist::test_utils::round_trip;

    #[test]
    fn idle_is_the_initial_state() {
        let ai = AiUpdate::default();
        assert_eq!(ai.state_machine.current_key(), AI_IDLE);
        assert_eq!(ai.state_machine.keys().collect::<Vec<_>>(), vec![AI_IDLE, AI_GUARD]);
    }

    #[test]
    fn idle_round_trip_is_three_headers() {
        let mut ai = AiUpdate::default();
        let mut loaded = AiUpdate::default();
        let bytes = round_trip(GameVariant::Generals, &mut ai, &mut loaded).unwrap();
        // module version, machine version, key, state version
        assert_eq!(bytes, vec![1, 1, 0, 0, 0, 0, 1]);
        assert_eq!(loaded, ai);
    }

    #[test]
    fn guard_state_survives() {
        let mut ai = AiUpdate::default();
        ai.guard().unwrap().machine.guard_polygon_trigger_name = "Ridge".into();

        let mut loaded = AiUpdate::default();
        round_trip(GameVariant::Bfme, &mut ai, &mut loaded).unwrap();
        assert_eq!(loaded.state_machine.current_key(), AI_GUARD);
        match loaded.state_machine.current() {
            AiState::Guard(guard) => assert_eq!(guard.machine.guard_polygon_trigger_name, "Ridge"),
            other => panic!("unexpected state: {other:?}"),
        }
    }
}
