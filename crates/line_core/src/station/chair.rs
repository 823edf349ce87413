use serde::{Deserialize, Serialize};

use super::{Activatable, EmployeeWorkable, StationIo, UpgradeHandler};
use crate::cup::CupState;
use crate::work::WorkStyle;

/// Rest spot. Has no payload; the seated worker's loop heals fatigue.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct EmployeeChair;

impl Activatable for EmployeeChair {
    fn activate(&mut self, _io: &mut StationIo<'_>) -> bool {
        false
    }

    fn is_processing(&self) -> bool {
        false
    }

    fn advance(&mut self, _io: &mut StationIo<'_>, _dt: f32) -> u32 {
        0
    }
}

impl UpgradeHandler for EmployeeChair {}

impl EmployeeWorkable for EmployeeChair {
    fn cup_complete(&self, _cup: &CupState) -> bool {
        false
    }

    fn work_style(&self) -> WorkStyle {
        WorkStyle::Rest
    }
}
