//! In-process accepted-state store.
//!
//! Entries are never evicted, so memory grows with the number of distinct
//! credentials seen for the lifetime of the process. Only valid for a single
//! instance; sharing state across instances needs an external keyed store with
//! the same per-key atomic update.
use crate::guard::Decision;
use nowplaying_relay_core::AcceptedState;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

type Slot = Arc<Mutex<Option<AcceptedState>>>;

#[derive(Default)]
pub struct StateStore {
    slots: Mutex<HashMap<String, Slot>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    // A panicked writer cannot leave a half-written AcceptedState behind.
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, credential: &str) -> Slot {
        let mut slots = lock(&self.slots);
        if let Some(slot) = slots.get(credential) {
            return Arc::clone(slot);
        }
        let slot = Slot::default();
        slots.insert(credential.to_string(), Arc::clone(&slot));
        slot
    }

    fn existing_slot(&self, credential: &str) -> Option<Slot> {
        lock(&self.slots).get(credential).cloned()
    }

    pub fn get(&self, credential: &str) -> Option<AcceptedState> {
        let slot = self.existing_slot(credential)?;
        let state = lock(&slot).clone();
        state
    }

    pub fn set(&self, credential: &str, state: AcceptedState) {
        let slot = self.slot(credential);
        *lock(&slot) = Some(state);
    }

    // Serialized per credential; other credentials only share the map lookup.
    pub fn update<F>(&self, credential: &str, decide: F) -> Decision
    where
        F: FnOnce(Option<&AcceptedState>) -> Decision,
    {
        let slot = self.slot(credential);
        let mut current = lock(&slot);
        let decision = decide(current.as_ref());
        if let Decision::Accept(state) = &decision {
            *current = Some(state.clone());
        }
        decision
    }

    pub fn len(&self) -> usize {
        lock(&self.slots).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
