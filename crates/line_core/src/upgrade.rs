//! Per-station upgrade levels.

use serde::{Deserialize, Serialize};

use crate::{StationType, UpgradeDef, UpgradeId};

/// Upgrade ids every station type understands.
pub const UPGRADE_AUTO_EJECT: &str = "AutoEject";
pub const UPGRADE_CUP_SLOTS: &str = "CupSlots";

/// Level of one upgrade on one station instance.
///
/// Snapshots the definition's stack values so the state answers
/// `current_value` / `is_maxed` without a content lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpgradeState {
    pub upgrade_id: UpgradeId,
    pub level: u32,
    pub base_cost: u32,
    pub stack_values: Vec<f32>,
}

impl UpgradeState {
    pub fn new(def: &UpgradeDef) -> Self {
        Self {
            upgrade_id: def.id.clone(),
            level: 0,
            base_cost: def.base_cost,
            stack_values: def.stack_values.clone(),
        }
    }

    pub fn max_level(&self) -> u32 {
        u32::try_from(self.stack_values.len()).unwrap_or(u32::MAX)
    }

    pub fn is_maxed(&self) -> bool {
        self.level >= self.max_level()
    }

    /// `stack_values[level - 1]`, or 0 before the first purchase.
    pub fn current_value(&self) -> f32 {
        match self.level {
            0 => 0.0,
            level => self
                .stack_values
                .get(level as usize - 1)
                .copied()
                .unwrap_or(0.0),
        }
    }

    /// Price of the next level.
    pub fn next_cost(&self) -> u32 {
        self.base_cost.saturating_mul(self.level + 1)
    }

    /// Raises the level by one. Returns false when already maxed.
    pub(crate) fn apply(&mut self) -> bool {
        if self.is_maxed() {
            return false;
        }
        self.level += 1;
        true
    }
}

/// Why `apply_upgrade` refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpgradeRejection {
    UnknownUpgrade,
    WrongStationType {
        expected: StationType,
        actual: StationType,
    },
    Unhandled,
    Maxed {
        level: u32,
    },
}

impl std::fmt::Display for UpgradeRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownUpgrade => f.write_str("upgrade not defined in content"),
            Self::WrongStationType { expected, actual } => {
                write!(f, "upgrade targets {expected:?}, station is {actual:?}")
            }
            Self::Unhandled => f.write_str("station has no handler for this upgrade"),
            Self::Maxed { level } => write!(f, "already maxed at level {level}"),
        }
    }
}

impl std::error::Error for UpgradeRejection {}

#[cfg(test)]
mod tests {
    use super::*;

    fn def(values: Vec<f32>) -> UpgradeDef {
        UpgradeDef {
            id: UpgradeId("BobaPerClick".to_string()),
            name: "More Boba".to_string(),
            description: String::new(),
            station_type: Some(StationType::BobaMachine),
            base_cost: 10,
            stack_values: values,
        }
    }

    #[test]
    fn level_caps_at_stack_length() {
        let mut state = UpgradeState::new(&def(vec![2.0, 4.0, 6.0]));
        assert!(state.apply());
        assert!(state.apply());
        assert!(state.apply());
        assert!(!state.apply());
        assert_eq!(state.level, 3);
        assert!(state.is_maxed());
        assert!((state.current_value() - 6.0).abs() < 1e-5);
    }

    #[test]
    fn current_value_zero_before_first_level() {
        let state = UpgradeState::new(&def(vec![2.0, 4.0]));
        assert!(state.current_value().abs() < 1e-5);
        assert!(!state.is_maxed());
    }

    #[test]
    fn cost_scales_with_level() {
        let upgrade = def(vec![1.0, 2.0, 3.0]);
        let mut state = UpgradeState::new(&upgrade);
        assert_eq!(state.next_cost(), 10);
        state.apply();
        assert_eq!(state.next_cost(), 20);
        assert_eq!(upgrade.cost(2), 30);
    }

    #[test]
    fn empty_stack_is_maxed_from_the_start() {
        let mut state = UpgradeState::new(&def(vec![]));
        assert!(state.is_maxed());
        assert!(!state.apply());
        assert_eq!(state.level, 0);
    }
}
