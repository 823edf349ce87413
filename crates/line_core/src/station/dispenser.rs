use serde::{Deserialize, Serialize};

use super::{Activatable, EmployeeWorkable, StationIo, UpgradeHandler};
use crate::cup::CupState;
use crate::work::WorkStyle;
use crate::{CupId, Event};

/// Creates a fresh cup in the first free slot, then cools down.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CupDispenser {
    cooldown: f32,
}

impl CupDispenser {
    pub fn cooldown_remaining(&self) -> f32 {
        self.cooldown
    }
}

impl Activatable for CupDispenser {
    fn activate(&mut self, io: &mut StationIo<'_>) -> bool {
        if self.is_processing() {
            return false;
        }
        let Some(slot) = crate::slot::first_available(io.slots.as_slice()) else {
            tracing::debug!(station = %io.station_id, "no free slot to dispense into");
            return false;
        };

        let cup_id = CupId(format!("cup_{:04}", io.counters.next_cup_id));
        io.counters.next_cup_id += 1;
        io.cups
            .insert(cup_id.clone(), CupState::new(cup_id.clone(), io.constants));
        io.emit(Event::CupDispensed {
            station_id: io.station_id.clone(),
            cup_id: cup_id.clone(),
        });
        io.snap_into(slot, &cup_id);

        self.cooldown = io.constants.dispenser_cooldown;
        true
    }

    fn is_processing(&self) -> bool {
        self.cooldown > 0.0
    }

    fn advance(&mut self, _io: &mut StationIo<'_>, dt: f32) -> u32 {
        if self.cooldown <= 0.0 {
            return 0;
        }
        self.cooldown -= dt;
        if self.cooldown > 0.0 {
            return 0;
        }
        self.cooldown = 0.0;
        1
    }
}

impl UpgradeHandler for CupDispenser {}

impl EmployeeWorkable for CupDispenser {
    fn cup_complete(&self, _cup: &CupState) -> bool {
        false
    }

    fn work_style(&self) -> WorkStyle {
        WorkStyle::None
    }
}
