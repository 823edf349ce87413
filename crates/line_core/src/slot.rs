//! Occupancy slots, generic across cups and employees.
//!
//! A slot holds at most one occupant. `busy` is independent of occupancy and
//! is raised by whichever task runs an irreversible sequence on the slot; while
//! it is set the occupant cannot be released.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Slot<O> {
    occupant: Option<O>,
    busy: bool,
    /// Dormant slots exist physically but are ignored until activated.
    active: bool,
}

impl<O> Default for Slot<O> {
    fn default() -> Self {
        Self {
            occupant: None,
            busy: false,
            active: true,
        }
    }
}

impl<O> Slot<O> {
    pub fn dormant() -> Self {
        Self {
            active: false,
            ..Self::default()
        }
    }

    pub fn is_occupied(&self) -> bool {
        self.occupant.is_some()
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn can_release(&self) -> bool {
        !self.busy
    }

    /// Free for a new occupant: active, empty and not claimed by a task.
    pub fn is_available(&self) -> bool {
        self.active && !self.is_occupied() && !self.busy
    }

    pub fn occupant(&self) -> Option<&O> {
        self.occupant.as_ref()
    }

    /// Binds `occupant`. Fails without side effects if the slot is occupied.
    pub fn try_snap(&mut self, occupant: O) -> bool {
        if self.is_occupied() {
            return false;
        }
        self.occupant = Some(occupant);
        true
    }

    /// Detaches the occupant. Returns `None` while busy or when empty.
    pub fn release(&mut self) -> Option<O> {
        if self.busy {
            return None;
        }
        self.occupant.take()
    }

    pub(crate) fn set_busy(&mut self, busy: bool) {
        self.busy = busy;
    }

    pub(crate) fn activate(&mut self) {
        self.active = true;
    }
}

/// First-fit lookup in declaration order.
pub fn first_available<O>(slots: &[Slot<O>]) -> Option<usize> {
    slots.iter().position(Slot::is_available)
}
