//! `line_core`: deterministic station coordination tick.
//!
//! No IO, no network. All randomness via the passed-in Rng.

mod commands;
pub mod cup;
pub mod employee;
mod engine;
pub mod metrics;
pub mod slot;
pub mod station;
pub mod trigger;
mod types;
pub mod upgrade;
pub mod work;

pub use commands::CommandRejection;
pub use cup::{CupLocation, CupState};
pub use employee::EmployeeState;
pub use engine::tick;
pub use metrics::{compute_metrics, MetricsFileWriter, MetricsSnapshot};
pub use slot::Slot;
pub use station::{can_employee_work, StationKind, StationState};
pub use trigger::{TriggerKind, TriggerState};
pub use types::*;
pub use upgrade::{UpgradeRejection, UpgradeState};
pub use work::{WorkLoop, WorkPhase, WorkStyle};

pub(crate) fn emit(counters: &mut Counters, tick: u64, event: Event) -> EventEnvelope {
    let id = EventId(format!("evt_{:06}", counters.next_event_id));
    counters.next_event_id += 1;
    EventEnvelope { id, tick, event }
}

#[cfg(any(test, feature = "test-support"))]
pub mod test_fixtures;

#[cfg(test)]
mod tests;
