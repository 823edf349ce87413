//! Cup sealer: one claw-and-rotate sequence per unsealed cup.
//!
//! Each sequence claims its slot (`busy`) and makes the cup non-grabbable for
//! the whole run. Phase durations are read when the phase starts, so a speed
//! upgrade bought mid-sequence shortens the phases that follow it.

use serde::{Deserialize, Serialize};

use super::{Activatable, EmployeeWorkable, StationIo, UpgradeHandler};
use crate::cup::CupState;
use crate::work::WorkStyle;
use crate::{Constants, CupId, Event};

const UPGRADE_CLAW_ARM_SPEED: &str = "ClawArmSpeed";
const UPGRADE_ROT_SPEED: &str = "RotSpeed";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SealPhase {
    ClampLower,
    ClampGrip,
    Lift,
    Rotate,
    Lower,
    ReleaseOpen,
    ReleaseReturn,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SealTask {
    pub slot: usize,
    pub cup_id: CupId,
    pub phase: SealPhase,
    pub remaining: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CupSealer {
    has_claws: bool,
    claw_speed: f32,
    rotation_speed: f32,
    tasks: Vec<SealTask>,
}

impl CupSealer {
    pub fn new(has_claws: bool) -> Self {
        Self {
            has_claws,
            claw_speed: 1.0,
            rotation_speed: 1.0,
            tasks: Vec::new(),
        }
    }

    pub fn is_sealing(&self) -> bool {
        !self.tasks.is_empty()
    }

    pub fn tasks(&self) -> &[SealTask] {
        &self.tasks
    }

    fn duration(&self, phase: SealPhase, constants: &Constants) -> f32 {
        let claw = constants.sealer_claw_duration / self.claw_speed;
        match phase {
            SealPhase::ClampLower | SealPhase::ReleaseOpen => claw / 2.0,
            SealPhase::ClampGrip
            | SealPhase::Lift
            | SealPhase::Lower
            | SealPhase::ReleaseReturn => claw,
            SealPhase::Rotate => constants.sealer_rotation_duration / self.rotation_speed,
        }
    }

    fn first_phase(&self) -> SealPhase {
        if self.has_claws {
            SealPhase::ClampLower
        } else {
            SealPhase::Lift
        }
    }

    /// `None` once the sequence is over.
    fn next_phase(&self, phase: SealPhase) -> Option<SealPhase> {
        match phase {
            SealPhase::ClampLower => Some(SealPhase::ClampGrip),
            SealPhase::ClampGrip => Some(SealPhase::Lift),
            SealPhase::Lift => Some(SealPhase::Rotate),
            SealPhase::Rotate => Some(SealPhase::Lower),
            SealPhase::Lower if self.has_claws => Some(SealPhase::ReleaseOpen),
            SealPhase::ReleaseOpen => Some(SealPhase::ReleaseReturn),
            SealPhase::Lower | SealPhase::ReleaseReturn => None,
        }
    }

    /// Side effects that happen as `phase` finishes.
    fn finish_phase(phase: SealPhase, task: &SealTask, io: &mut StationIo<'_>) {
        match phase {
            SealPhase::Rotate => {
                if let Some(cup) = io.cups.get_mut(&task.cup_id) {
                    cup.seal();
                }
                io.emit(Event::CupSealed {
                    station_id: io.station_id.clone(),
                    cup_id: task.cup_id.clone(),
                });
            }
            SealPhase::ReleaseOpen => {
                if let Some(cup) = io.cups.get_mut(&task.cup_id) {
                    cup.set_grabbable(true);
                }
            }
            _ => {}
        }
    }
}

impl Activatable for CupSealer {
    fn activate(&mut self, io: &mut StationIo<'_>) -> bool {
        if self.is_sealing() {
            return false;
        }
        for slot in 0..io.slots.len() {
            if io.is_busy(slot) {
                continue;
            }
            let Some(cup_id) = io.occupant(slot).cloned() else {
                continue;
            };
            if io.cups.get(&cup_id).is_some_and(CupState::is_sealed) {
                continue;
            }
            io.set_busy(slot, true);
            if let Some(cup) = io.cups.get_mut(&cup_id) {
                cup.set_grabbable(false);
            }
            let phase = self.first_phase();
            self.tasks.push(SealTask {
                slot,
                cup_id,
                phase,
                remaining: self.duration(phase, io.constants),
            });
        }
        self.is_sealing()
    }

    fn is_processing(&self) -> bool {
        self.is_sealing()
    }

    fn advance(&mut self, io: &mut StationIo<'_>, dt: f32) -> u32 {
        if self.tasks.is_empty() {
            return 0;
        }
        let mut tasks = std::mem::take(&mut self.tasks);
        tasks.retain_mut(|task| {
            task.remaining -= dt;
            if task.remaining > 0.0 {
                return true;
            }
            Self::finish_phase(task.phase, task, io);
            match self.next_phase(task.phase) {
                Some(next) => {
                    task.phase = next;
                    task.remaining = self.duration(next, io.constants);
                    true
                }
                None => {
                    if let Some(cup) = io.cups.get_mut(&task.cup_id) {
                        cup.set_grabbable(true);
                    }
                    io.set_busy(task.slot, false);
                    false
                }
            }
        });
        self.tasks = tasks;
        // The machine takes new pulls only once every slot has finished.
        u32::from(self.tasks.is_empty())
    }
}

impl UpgradeHandler for CupSealer {
    fn handles_upgrade(&self, upgrade_id: &str) -> bool {
        upgrade_id == UPGRADE_CLAW_ARM_SPEED || upgrade_id == UPGRADE_ROT_SPEED
    }

    fn apply_upgrade_value(&mut self, upgrade_id: &str, value: f32) {
        if value <= 0.0 {
            return;
        }
        match upgrade_id {
            UPGRADE_CLAW_ARM_SPEED => self.claw_speed = value,
            UPGRADE_ROT_SPEED => self.rotation_speed = value,
            _ => {}
        }
    }
}

impl EmployeeWorkable for CupSealer {
    fn cup_complete(&self, cup: &CupState) -> bool {
        cup.is_sealed()
    }

    fn work_style(&self) -> WorkStyle {
        WorkStyle::SinglePull
    }
}
