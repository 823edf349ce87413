use rand::Rng;

use crate::commands::apply_commands;
use crate::station::{tick_stations, LineCtx};
use crate::{CommandEnvelope, EventEnvelope, EventLevel, LineContent, LineState};

/// Advance the line by one tick of `constants.tick_seconds`.
///
/// Order of operations:
/// 1. Apply commands scheduled for this tick, in slice order.
/// 2. For every station in ascending id order: step the employee work loop,
///    advance the trigger, the payload, intake approaches and auto-eject.
/// 3. Increment tick counter.
///
/// Returns all events produced this tick.
pub fn tick(
    state: &mut LineState,
    commands: &[CommandEnvelope],
    content: &LineContent,
    rng: &mut impl Rng,
    event_level: EventLevel,
) -> Vec<EventEnvelope> {
    let mut events = Vec::new();
    let LineState {
        meta,
        stations,
        cups,
        employees,
        counters,
    } = state;

    let mut ctx = LineCtx {
        cups,
        employees,
        counters,
        content,
        events: &mut events,
        tick: meta.tick,
        event_level,
    };
    apply_commands(stations, &mut ctx, commands);
    tick_stations(stations, &mut ctx, rng);

    meta.tick += 1;
    events
}
