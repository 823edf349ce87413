use serde::{Deserialize, Serialize};

use super::{Activatable, EmployeeWorkable, StationIo, UpgradeHandler};
use crate::cup::CupState;
use crate::work::WorkStyle;
use crate::Constants;

const UPGRADE_TEA_POUR_SPEED: &str = "TeaPourSpeed";

/// Pours into every occupied slot for as long as the trigger holds it active.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeaMachine {
    pour_rate: f32,
    pouring: bool,
}

impl TeaMachine {
    pub fn new(constants: &Constants) -> Self {
        Self {
            pour_rate: constants.tea_base_pour_rate,
            pouring: false,
        }
    }

    pub fn is_pouring(&self) -> bool {
        self.pouring
    }

    /// Tea units per second.
    pub fn pour_rate(&self) -> f32 {
        self.pour_rate
    }
}

impl Activatable for TeaMachine {
    fn activate(&mut self, _io: &mut StationIo<'_>) -> bool {
        if self.pouring {
            return false;
        }
        self.pouring = true;
        true
    }

    fn deactivate(&mut self, _io: &mut StationIo<'_>) -> bool {
        std::mem::replace(&mut self.pouring, false)
    }

    fn is_processing(&self) -> bool {
        self.pouring
    }

    fn advance(&mut self, io: &mut StationIo<'_>, dt: f32) -> u32 {
        if !self.pouring {
            return 0;
        }
        let amount = self.pour_rate * dt;
        for slot in 0..io.slots.len() {
            // Sealed cups ignore the pour on their own.
            if let Some(cup) = io.cup_mut(slot) {
                cup.add_tea(amount);
            }
        }
        0
    }
}

impl UpgradeHandler for TeaMachine {
    fn handles_upgrade(&self, upgrade_id: &str) -> bool {
        upgrade_id == UPGRADE_TEA_POUR_SPEED
    }

    fn apply_upgrade_value(&mut self, upgrade_id: &str, value: f32) {
        if upgrade_id == UPGRADE_TEA_POUR_SPEED && value > 0.0 {
            self.pour_rate = value;
        }
    }
}

impl EmployeeWorkable for TeaMachine {
    fn cup_complete(&self, cup: &CupState) -> bool {
        cup.is_tea_full()
    }

    fn work_style(&self) -> WorkStyle {
        WorkStyle::HoldUntilComplete
    }
}
