//! Employee fatigue model.
//!
//! Fatigue is an integer level in `0..=max_fatigue`. Reaching the max puts
//! the employee to sleep; only an explicit wake clears it, and waking leaves
//! the employee partially rested rather than fresh.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{Constants, EmployeeDef, EmployeeId, StationId};

/// Activation success probability indexed by fatigue level.
const SUCCESS_BY_FATIGUE: [f32; 5] = [1.0, 0.85, 0.65, 0.5, 0.3];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmployeeState {
    pub id: EmployeeId,
    pub name: String,
    pub base_speed: f32,
    pub fatigue: u32,
    pub max_fatigue: u32,
    pub asleep: bool,
    pub cups_completed_since_check: u32,
    /// Redrawn every time the completion counter resets.
    pub cups_until_check: u32,
    pub current_station: Option<StationId>,
}

/// What `on_cup_completed` did to the employee.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionOutcome {
    Counted,
    /// Threshold reached; the fatigue roll missed.
    Checked,
    FatigueIncreased { fell_asleep: bool },
}

impl EmployeeState {
    pub fn spawn(def: &EmployeeDef, constants: &Constants, rng: &mut impl Rng) -> Self {
        Self {
            id: def.id.clone(),
            name: def.name.clone(),
            base_speed: def.base_speed,
            fatigue: 0,
            max_fatigue: constants.max_fatigue,
            asleep: false,
            cups_completed_since_check: 0,
            cups_until_check: draw_check_threshold(constants, rng),
            current_station: None,
        }
    }

    /// `base_speed × clamp(1 − fatigue × penalty, min, 1)`, or 0 while asleep.
    pub fn effective_work_speed(&self, constants: &Constants) -> f32 {
        if self.asleep {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let penalty = self.fatigue as f32 * constants.fatigue_speed_penalty;
        self.base_speed * (1.0 - penalty).clamp(constants.min_speed_factor, 1.0)
    }

    pub fn success_probability(&self) -> f32 {
        SUCCESS_BY_FATIGUE
            .get(self.fatigue as usize)
            .copied()
            .unwrap_or(1.0)
    }

    pub fn is_awake(&self) -> bool {
        !self.asleep
    }

    /// Raises fatigue by one. Returns true if this put the employee to sleep.
    pub fn increase_fatigue(&mut self) -> bool {
        self.fatigue = (self.fatigue + 1).min(self.max_fatigue);
        if self.fatigue >= self.max_fatigue && !self.asleep {
            self.asleep = true;
            return true;
        }
        false
    }

    /// Does not wake a sleeping employee.
    pub fn heal_fatigue(&mut self, amount: u32) {
        self.fatigue = self.fatigue.saturating_sub(amount);
    }

    /// Returns false if the employee was already awake.
    pub fn wake_up(&mut self, constants: &Constants) -> bool {
        if !self.asleep {
            return false;
        }
        self.asleep = false;
        self.fatigue = constants.rested_fatigue.min(self.max_fatigue);
        true
    }

    /// Counts a finished cup. Every `cups_until_check` cups a 1-in-N roll
    /// decides whether fatigue goes up; the counter resets either way.
    pub fn on_cup_completed(
        &mut self,
        constants: &Constants,
        rng: &mut impl Rng,
    ) -> CompletionOutcome {
        self.cups_completed_since_check += 1;
        if self.cups_completed_since_check < self.cups_until_check {
            return CompletionOutcome::Counted;
        }

        self.cups_completed_since_check = 0;
        self.cups_until_check = draw_check_threshold(constants, rng);

        let one_in = constants.fatigue_roll_one_in.max(1);
        if rng.gen_range(0..one_in) == 0 {
            let fell_asleep = self.increase_fatigue();
            CompletionOutcome::FatigueIncreased { fell_asleep }
        } else {
            CompletionOutcome::Checked
        }
    }
}

fn draw_check_threshold(constants: &Constants, rng: &mut impl Rng) -> u32 {
    let min = constants.cups_until_check_min.max(1);
    let max = constants.cups_until_check_max.max(min);
    rng.gen_range(min..=max)
}
