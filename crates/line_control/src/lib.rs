//! Everything that drives a line from outside the engine: command sources and
//! the sale economy.

mod autopilot;
mod ledger;

pub use autopilot::LineAutopilot;
pub use ledger::{EconomyConfig, SaleLedger, SaleModifier};

use line_core::{CommandEnvelope, LineContent, LineState};

pub trait CommandSource {
    fn generate_commands(
        &mut self,
        state: &LineState,
        content: &LineContent,
        next_command_id: &mut u64,
    ) -> Vec<CommandEnvelope>;
}
