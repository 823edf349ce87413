//! Cup fill/seal state.
//!
//! Tea and boba only ever go up, sealing is one-way, and a sealed cup
//! ignores further tea.

use serde::{Deserialize, Serialize};

use crate::{Constants, CupId, StationId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CupLocation {
    /// Physics-driven: on the floor, a conveyor, or flying after an eject.
    Loose,
    InSlot { station_id: StationId, slot: usize },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CupState {
    pub id: CupId,
    pub tea_fill: f32,
    pub tea_capacity: f32,
    pub boba_count: u32,
    pub boba_capacity: u32,
    pub sealed: bool,
    /// Consulted by the input boundary only.
    pub grabbable: bool,
    pub physics_enabled: bool,
    pub base_price: u32,
    pub location: CupLocation,
}

impl CupState {
    pub fn new(id: CupId, constants: &Constants) -> Self {
        Self {
            id,
            tea_fill: 0.0,
            tea_capacity: constants.cup_tea_capacity,
            boba_count: 0,
            boba_capacity: constants.cup_boba_capacity,
            sealed: false,
            grabbable: true,
            physics_enabled: true,
            base_price: constants.cup_base_price,
            location: CupLocation::Loose,
        }
    }

    pub fn is_tea_full(&self) -> bool {
        self.tea_fill >= self.tea_capacity
    }

    pub fn is_boba_full(&self) -> bool {
        self.boba_count >= self.boba_capacity
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Ready to sell: full of tea, full of boba, sealed.
    pub fn is_complete(&self) -> bool {
        self.is_tea_full() && self.is_boba_full() && self.sealed
    }

    pub fn is_snapped(&self) -> bool {
        matches!(self.location, CupLocation::InSlot { .. })
    }

    /// Clamped into `[0, tea_capacity]`. Negative amounts and sealed cups are ignored.
    pub fn add_tea(&mut self, amount: f32) {
        if self.sealed || amount <= 0.0 {
            return;
        }
        self.tea_fill = (self.tea_fill + amount).clamp(0.0, self.tea_capacity);
    }

    /// Callers stop once the cup is `BobaFull`.
    pub fn add_boba(&mut self) {
        self.boba_count += 1;
    }

    pub fn seal(&mut self) {
        self.sealed = true;
    }

    pub fn set_grabbable(&mut self, grabbable: bool) {
        self.grabbable = grabbable;
    }

    pub fn toggle_physics(&mut self, enabled: bool) {
        self.physics_enabled = enabled;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::base_content;

    fn new_cup() -> CupState {
        CupState::new(CupId("cup_0001".to_string()), &base_content().constants)
    }

    #[test]
    fn tea_fill_is_clamped_to_capacity() {
        let mut cup = new_cup();
        cup.add_tea(4.0);
        cup.add_tea(4.0);
        cup.add_tea(4.0);
        assert!((cup.tea_fill - cup.tea_capacity).abs() < 1e-5);
        assert!(cup.is_tea_full());
    }

    #[test]
    fn tea_fill_never_decreases() {
        let mut cup = new_cup();
        let mut last = cup.tea_fill;
        for amount in [0.5, 0.0, -3.0, 2.5, 100.0, 1.0] {
            cup.add_tea(amount);
            assert!(cup.tea_fill >= last);
            assert!(cup.tea_fill <= cup.tea_capacity);
            last = cup.tea_fill;
        }
    }

    #[test]
    fn sealed_cup_ignores_tea() {
        let mut cup = new_cup();
        cup.add_tea(3.0);
        cup.seal();
        cup.add_tea(3.0);
        assert!((cup.tea_fill - 3.0).abs() < 1e-5);
    }

    #[test]
    fn seal_is_idempotent() {
        let mut cup = new_cup();
        cup.seal();
        cup.seal();
        assert!(cup.is_sealed());
    }

    #[test]
    fn complete_needs_all_three() {
        let mut cup = new_cup();
        cup.add_tea(cup.tea_capacity);
        for _ in 0..cup.boba_capacity {
            cup.add_boba();
        }
        assert!(cup.is_tea_full() && cup.is_boba_full());
        assert!(!cup.is_complete());

        cup.seal();
        assert!(cup.is_complete());
    }

    #[test]
    fn sealed_before_filling_is_never_complete() {
        let mut cup = new_cup();
        for _ in 0..cup.boba_capacity {
            cup.add_boba();
        }
        cup.seal();
        cup.add_tea(cup.tea_capacity);
        assert!(!cup.is_tea_full());
        assert!(!cup.is_complete());
    }
}
