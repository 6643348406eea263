//! Keyed state machines whose active state survives a save.
//!
//! A state family is a closed enum implementing [`State`]. Each variant is
//! registered under a [`StateKey`] that never changes between builds, so the
//! stream only needs the key of the active state followed by that state's
//! own persisted fields.

use std::fmt;

use crate::error::PersistError;
use crate::persister::{Persistable, StatePersister};

/// Stable on-disk identifier of a state within its machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StateKey(pub u32);

impl fmt::Display for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a state asks its machine to do after an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateTransition {
    Stay,
    To(StateKey),
}

/// One member of a state family.
pub trait State: Persistable {
    fn update(&mut self) -> StateTransition {
        StateTransition::Stay
    }
}

/// A set of registered states with exactly one active.
#[derive(Debug, Clone, PartialEq)]
pub struct StateMachine<S> {
    states: Vec<(StateKey, S)>,
    current: usize,
}

impl<S: State> StateMachine<S> {
    /// A machine whose only (and active) state is `initial`.
    pub fn new(key: StateKey, initial: S) -> Self {
        Self {
            states: vec![(key, initial)],
            current: 0,
        }
    }

    /// A machine over a fixed family; the first state starts active. Keys
    /// must be distinct.
    pub fn from_states<const N: usize>(states: [(StateKey, S); N]) -> Self {
        const { assert!(N > 0, "a state machine needs at least one state") };
        debug_assert!(
            states
                .iter()
                .enumerate()
                .all(|(i, (key, _))| states[..i].iter().all(|(other, _)| other != key)),
            "duplicate state key"
        );
        Self {
            states: Vec::from(states),
            current: 0,
        }
    }

    /// Add a state under `key`. Each key may be registered once.
    pub fn register(&mut self, key: StateKey, state: S) -> Result<(), PersistError> {
        if self.index_of(key).is_some() {
            return Err(PersistError::DuplicateStateKey(key));
        }
        self.states.push((key, state));
        Ok(())
    }

    /// Builder form of [`Self::register`].
    pub fn with_state(mut self, key: StateKey, state: S) -> Result<Self, PersistError> {
        self.register(key, state)?;
        Ok(self)
    }

    fn index_of(&self, key: StateKey) -> Option<usize> {
        self.states.iter().position(|(k, _)| *k == key)
    }

    /// Make `key` the active state.
    pub fn transition(&mut self, key: StateKey) -> Result<(), PersistError> {
        self.current = self.index_of(key).ok_or(PersistError::UnknownStateKey {
            field: "transition".into(),
            key,
        })?;
        Ok(())
    }

    pub fn current_key(&self) -> StateKey {
        self.states[self.current].0
    }

    pub fn current(&self) -> &S {
        &self.states[self.current].1
    }

    pub fn current_mut(&mut self) -> &mut S {
        &mut self.states[self.current].1
    }

    pub fn state(&self, key: StateKey) -> Option<&S> {
        self.index_of(key).map(|i| &self.states[i].1)
    }

    pub fn state_mut(&mut self, key: StateKey) -> Option<&mut S> {
        self.index_of(key).map(|i| &mut self.states[i].1)
    }

    /// Registered keys in registration order.
    pub fn keys(&self) -> impl Iterator<Item = StateKey> + '_ {
        self.states.iter().map(|(k, _)| *k)
    }

    /// Run the active state's update and follow the transition it returns.
    pub fn update(&mut self) -> Result<StateTransition, PersistError> {
        let transition = self.current_mut().update();
        if let StateTransition::To(key) = transition {
            self.transition(key)?;
        }
        Ok(transition)
    }
}

impl<S: State> Persistable for StateMachine<S> {
    fn persist(&mut self, p: &mut StatePersister) -> Result<(), PersistError> {
        p.persist_version(1)?;

        let mut key = self.current_key().0;
        p.persist_u32("CurrentStateId", &mut key)?;
        if p.is_reading() {
            let key = StateKey(key);
            self.current = self.index_of(key).ok_or_else(|| PersistError::UnknownStateKey {
                field: p.field_path("CurrentStateId"),
                key,
            })?;
        }

        p.persist_object("State", self.current_mut())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::game::GameVariant;
    use crate::persister::{read_from_bytes, write_to_bytes};

    const WAIT: StateKey = StateKey(1);
    const COUNT: StateKey = StateKey(2);

    #[derive(Debug, Clone, PartialEq)]
    enum Lamp {
        Wait,
        Count { ticks: u32 },
    }

    impl Persistable for Lamp {
        fn persist(&mut self, p: &mut StatePersister) -> Result<(), PersistError> {
            p.persist_version(1)?;
            match self {
                Lamp::Wait => Ok(()),
                Lamp::Count { ticks } => p.persist_u32("Ticks", ticks),
            }
        }
    }

    impl State for Lamp {
        fn update(&mut self) -> StateTransition {
            match self {
                Lamp::Wait => StateTransition::To(COUNT),
                Lamp::Count { ticks } => {
                    *ticks += 1;
                    StateTransition::Stay
                }
            }
        }
    }

    fn lamp() -> StateMachine<Lamp> {
        StateMachine::new(WAIT, Lamp::Wait)
            .with_state(COUNT, Lamp::Count { ticks: 0 })
            .unwrap()
    }

    #[test]
    fn duplicate_key_is_rejected() {
        let err = lamp().register(WAIT, Lamp::Wait).unwrap_err();
        assert!(matches!(err, PersistError::DuplicateStateKey(StateKey(1))));
        assert_eq!(err.kind(), ErrorKind::Usage);
    }

    #[test]
    fn fixed_family_starts_in_its_first_state() {
        let machine = StateMachine::from_states([(WAIT, Lamp::Wait), (COUNT, Lamp::Count { ticks: 0 })]);
        assert_eq!(machine, lamp());
        assert_eq!(machine.current_key(), WAIT);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "duplicate state key")]
    fn fixed_family_with_repeated_key_panics_in_debug() {
        StateMachine::from_states([(WAIT, Lamp::Wait), (WAIT, Lamp::Count { ticks: 0 })]);
    }

    #[test]
    fn update_follows_transitions() {
        let mut machine = lamp();
        assert_eq!(machine.update().unwrap(), StateTransition::To(COUNT));
        assert_eq!(machine.current_key(), COUNT);
        machine.update().unwrap();
        machine.update().unwrap();
        assert_eq!(machine.current(), &Lamp::Count { ticks: 2 });
        assert_eq!(machine.keys().collect::<Vec<_>>(), vec![WAIT, COUNT]);
    }

    #[test]
    fn active_state_round_trips() {
        let mut machine = lamp();
        machine.transition(COUNT).unwrap();
        *machine.current_mut() = Lamp::Count { ticks: 17 };

        let bytes = write_to_bytes(GameVariant::Generals, &mut machine).unwrap();
        // version, key, state version, ticks
        assert_eq!(bytes.len(), 1 + 4 + 1 + 4);

        let mut loaded = lamp();
        read_from_bytes(GameVariant::Generals, bytes, &mut loaded).unwrap();
        assert_eq!(loaded.current_key(), COUNT);
        assert_eq!(loaded.current(), &Lamp::Count { ticks: 17 });
    }

    #[test]
    fn unregistered_key_is_format_violation() {
        let mut bytes = vec![1];
        bytes.extend_from_slice(&99u32.to_le_bytes());
        bytes.push(1);

        let err = read_from_bytes(GameVariant::Generals, bytes, &mut lamp()).unwrap_err();
        match &err {
            PersistError::UnknownStateKey { field, key } => {
                assert_eq!(field, "CurrentStateId");
                assert_eq!(*key, StateKey(99));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(err.is_format_violation());
    }

    #[test]
    fn transition_to_unknown_key_fails() {
        assert!(lamp().transition(StateKey(7)).is_err());
    }
}
