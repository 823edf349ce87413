use serde::{Deserialize, Serialize};

use super::{Activatable, EmployeeWorkable, StationIo, UpgradeHandler};
use crate::cup::CupState;
use crate::work::WorkStyle;
use crate::{CupId, Event};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Disposal {
    pub slot: usize,
    pub cup_id: CupId,
    pub remaining: f32,
}

/// Destroys whatever is dropped into it after `trash_dispose_duration`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Trashcan {
    disposals: Vec<Disposal>,
}

impl Trashcan {
    pub fn pending(&self) -> usize {
        self.disposals.len()
    }
}

impl Activatable for Trashcan {
    fn activate(&mut self, _io: &mut StationIo<'_>) -> bool {
        false
    }

    fn is_processing(&self) -> bool {
        !self.disposals.is_empty()
    }

    fn advance(&mut self, io: &mut StationIo<'_>, dt: f32) -> u32 {
        self.disposals.retain_mut(|disposal| {
            disposal.remaining -= dt;
            if disposal.remaining > 0.0 {
                return true;
            }
            if io.consume(disposal.slot).is_some() {
                io.counters.cups_discarded += 1;
                io.emit(Event::CupDiscarded {
                    station_id: io.station_id.clone(),
                    cup_id: disposal.cup_id.clone(),
                });
            }
            false
        });
        0
    }

    fn on_cup_inserted(&mut self, io: &mut StationIo<'_>, slot: usize) {
        let Some(cup_id) = io.occupant(slot).cloned() else {
            return;
        };
        io.set_busy(slot, true);
        if let Some(cup) = io.cups.get_mut(&cup_id) {
            cup.set_grabbable(false);
        }
        self.disposals.push(Disposal {
            slot,
            cup_id,
            remaining: io.constants.trash_dispose_duration,
        });
    }
}

impl UpgradeHandler for Trashcan {}

impl EmployeeWorkable for Trashcan {
    fn cup_complete(&self, _cup: &CupState) -> bool {
        false
    }

    fn work_style(&self) -> WorkStyle {
        WorkStyle::None
    }
}
