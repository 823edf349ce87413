use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Activatable, EmployeeWorkable, StationIo, UpgradeHandler};
use crate::cup::CupState;
use crate::work::WorkStyle;
use crate::Event;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
enum ScanPhase {
    /// A complete cup is being checked before it is sold.
    Validating { slot: usize, remaining: f32 },
    /// Pause before looking at the next slot.
    Between { remaining: f32 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DeliveryScan {
    next_slot: usize,
    phase: ScanPhase,
}

/// Walks its slots in order on each press: complete cups are sold and
/// consumed, anything else is ejected back onto the line.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeliveryTray {
    scan: Option<DeliveryScan>,
}

impl DeliveryTray {
    pub fn is_scanning(&self) -> bool {
        self.scan.is_some()
    }

    /// Looks at `slot` and returns the phase to wait in, or `None` past the end.
    fn visit(slot: usize, io: &mut StationIo<'_>) -> Option<ScanPhase> {
        let target = io.slots.get(slot)?;
        let between = ScanPhase::Between {
            remaining: io.constants.delivery_time_between_cups,
        };
        if !target.is_active() || target.is_busy() {
            return Some(ScanPhase::Between { remaining: 0.0 });
        }
        let Some(cup) = io.cup(slot) else {
            return Some(between);
        };
        let cup_id = cup.id.clone();

        if cup.is_complete() {
            io.set_busy(slot, true);
            if let Some(cup) = io.cup_mut(slot) {
                cup.set_grabbable(false);
            }
            return Some(ScanPhase::Validating {
                slot,
                remaining: io.constants.delivery_validation_delay,
            });
        }

        debug!(station = %io.station_id, cup = %cup_id, "incomplete cup rejected");
        io.emit(Event::DeliveryRejected {
            station_id: io.station_id.clone(),
            cup_id,
        });
        io.eject(slot);
        Some(between)
    }

    fn sell(slot: usize, io: &mut StationIo<'_>) {
        let Some(cup) = io.consume(slot) else {
            return;
        };
        io.counters.cups_sold += 1;
        io.emit(Event::ContainerSold {
            station_id: io.station_id.clone(),
            cup,
        });
    }
}

impl Activatable for DeliveryTray {
    fn activate(&mut self, _io: &mut StationIo<'_>) -> bool {
        if self.scan.is_some() {
            return false;
        }
        self.scan = Some(DeliveryScan {
            next_slot: 0,
            phase: ScanPhase::Between { remaining: 0.0 },
        });
        true
    }

    fn is_processing(&self) -> bool {
        self.scan.is_some()
    }

    fn advance(&mut self, io: &mut StationIo<'_>, dt: f32) -> u32 {
        let Some(scan) = self.scan.as_mut() else {
            return 0;
        };
        match scan.phase {
            ScanPhase::Validating { slot, remaining } => {
                let remaining = remaining - dt;
                if remaining > 0.0 {
                    scan.phase = ScanPhase::Validating { slot, remaining };
                } else {
                    Self::sell(slot, io);
                    scan.phase = ScanPhase::Between {
                        remaining: io.constants.delivery_time_between_cups,
                    };
                }
                0
            }
            ScanPhase::Between { remaining } => {
                let remaining = remaining - dt;
                if remaining > 0.0 {
                    scan.phase = ScanPhase::Between { remaining };
                    return 0;
                }
                let slot = scan.next_slot;
                scan.next_slot += 1;
                if let Some(phase) = Self::visit(slot, io) {
                    scan.phase = phase;
                    0
                } else {
                    self.scan = None;
                    1
                }
            }
        }
    }
}

impl UpgradeHandler for DeliveryTray {}

impl EmployeeWorkable for DeliveryTray {
    fn cup_complete(&self, cup: &CupState) -> bool {
        cup.is_complete()
    }

    fn work_style(&self) -> WorkStyle {
        WorkStyle::None
    }
}
