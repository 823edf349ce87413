use serde::{Deserialize, Serialize};

use super::{round_to_count, Activatable, EmployeeWorkable, StationIo, UpgradeHandler};
use crate::cup::CupState;
use crate::work::WorkStyle;
use crate::Event;

const UPGRADE_BOBA_PER_CLICK: &str = "BobaPerClick";

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
enum BobaPhase {
    #[default]
    Idle,
    Emitting {
        remaining: u32,
        timer: f32,
    },
    Cooldown {
        remaining: f32,
    },
}

/// Emits a batch of boba, one unit every `boba_time_between_emit` seconds,
/// then refuses new presses for `boba_time_between_trigger`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BobaMachine {
    batch: u32,
    phase: BobaPhase,
}

impl Default for BobaMachine {
    fn default() -> Self {
        Self {
            batch: 1,
            phase: BobaPhase::Idle,
        }
    }
}

impl BobaMachine {
    pub fn batch_size(&self) -> u32 {
        self.batch
    }

    /// A unit lands in the first non-busy cup that still has room.
    fn emit_one(io: &mut StationIo<'_>) {
        let target = (0..io.slots.len())
            .find(|&slot| !io.is_busy(slot) && io.cup(slot).is_some_and(|c| !c.is_boba_full()));
        let Some(slot) = target else {
            io.emit(Event::BobaSpilled {
                station_id: io.station_id.clone(),
            });
            return;
        };
        let station_id = io.station_id.clone();
        let Some(cup) = io.cup_mut(slot) else {
            return;
        };
        cup.add_boba();
        let event = Event::BobaAdded {
            station_id,
            cup_id: cup.id.clone(),
            boba_count: cup.boba_count,
        };
        io.emit(event);
    }
}

impl Activatable for BobaMachine {
    fn activate(&mut self, io: &mut StationIo<'_>) -> bool {
        if self.is_processing() {
            return false;
        }
        Self::emit_one(io);
        self.phase = BobaPhase::Emitting {
            remaining: self.batch.saturating_sub(1),
            timer: io.constants.boba_time_between_emit,
        };
        true
    }

    fn is_processing(&self) -> bool {
        self.phase != BobaPhase::Idle
    }

    fn advance(&mut self, io: &mut StationIo<'_>, dt: f32) -> u32 {
        match self.phase {
            BobaPhase::Idle => 0,
            BobaPhase::Emitting { remaining, timer } => {
                let timer = timer - dt;
                self.phase = if timer > 0.0 {
                    BobaPhase::Emitting { remaining, timer }
                } else if remaining > 0 {
                    Self::emit_one(io);
                    BobaPhase::Emitting {
                        remaining: remaining - 1,
                        timer: io.constants.boba_time_between_emit,
                    }
                } else {
                    BobaPhase::Cooldown {
                        remaining: io.constants.boba_time_between_trigger,
                    }
                };
                0
            }
            BobaPhase::Cooldown { remaining } => {
                let remaining = remaining - dt;
                if remaining > 0.0 {
                    self.phase = BobaPhase::Cooldown { remaining };
                    0
                } else {
                    self.phase = BobaPhase::Idle;
                    1
                }
            }
        }
    }
}

impl UpgradeHandler for BobaMachine {
    fn handles_upgrade(&self, upgrade_id: &str) -> bool {
        upgrade_id == UPGRADE_BOBA_PER_CLICK
    }

    fn apply_upgrade_value(&mut self, upgrade_id: &str, value: f32) {
        if upgrade_id == UPGRADE_BOBA_PER_CLICK {
            self.batch = round_to_count(value).max(1);
            tracing::debug!(batch = self.batch, "boba batch size updated");
        }
    }
}

impl EmployeeWorkable for BobaMachine {
    fn cup_complete(&self, cup: &CupState) -> bool {
        cup.is_boba_full()
    }

    fn work_style(&self) -> WorkStyle {
        WorkStyle::RepeatPress
    }
}
