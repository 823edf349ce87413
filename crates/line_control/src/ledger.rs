//! Wallet fed by `ContainerSold` events.

use line_core::{CupState, Event, EventEnvelope};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Applied to a sale in configuration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SaleModifier {
    /// With probability `chance`, value = round(value × `multiplier`).
    Crit { chance: f32, multiplier: f32 },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EconomyConfig {
    #[serde(default)]
    pub starting_balance: u64,
    #[serde(default)]
    pub sale_modifiers: Vec<SaleModifier>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleLedger {
    balance: u64,
    modifiers: Vec<SaleModifier>,
    pub sales: u64,
    pub crits: u64,
    pub earned_total: u64,
    pub spent_total: u64,
}

impl SaleLedger {
    pub fn new(config: &EconomyConfig) -> Self {
        Self {
            balance: config.starting_balance,
            modifiers: config.sale_modifiers.clone(),
            sales: 0,
            crits: 0,
            earned_total: 0,
            spent_total: 0,
        }
    }

    pub fn balance(&self) -> u64 {
        self.balance
    }

    /// Prices one cup. Each crit modifier consumes one roll when its chance is positive.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn sale_value(&mut self, cup: &CupState, rng: &mut impl Rng) -> u64 {
        let mut value = u64::from(cup.base_price);
        let mut crits = 0;
        for modifier in &self.modifiers {
            let SaleModifier::Crit { chance, multiplier } = *modifier;
            if chance <= 0.0 {
                continue;
            }
            let rolled: f32 = rng.gen();
            if rolled < chance {
                value = (value as f64 * f64::from(multiplier)).round().max(0.0) as u64;
                crits += 1;
                debug!(cup = %cup.id, value, "critical sale");
            }
        }
        self.crits += crits;
        value
    }

    /// Credits every sale in `events`. Returns the amount earned.
    pub fn record_events(&mut self, events: &[EventEnvelope], rng: &mut impl Rng) -> u64 {
        let mut earned = 0;
        for envelope in events {
            if let Event::ContainerSold { cup, .. } = &envelope.event {
                let value = self.sale_value(cup, rng);
                self.sales += 1;
                earned += value;
            }
        }
        self.balance += earned;
        self.earned_total += earned;
        earned
    }

    pub fn can_afford(&self, cost: u64) -> bool {
        self.balance >= cost
    }

    /// Deducts `cost` if the balance covers it.
    pub fn try_purchase(&mut self, cost: u64) -> bool {
        if !self.can_afford(cost) {
            return false;
        }
        self.balance -= cost;
        self.spent_total += cost;
        true
    }
}
