//! Conveyor intake: pulls a loose cup standing in front of a station into a
//! free slot.
//!
//! The target slot is claimed (`busy`) for the whole approach. The approach
//! gives up when the cup ends up too far away or takes too long, and the cup
//! goes back to unmanaged physics.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{snap_cup, LineCtx, StationState};
use crate::cup::{CupLocation, CupState};
use crate::{CupId, Event};

/// Distance at which the approach counts as arrived.
const ARRIVAL_DISTANCE: f32 = 0.01;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntakeTask {
    pub cup_id: CupId,
    pub slot: usize,
    pub distance: f32,
    pub elapsed: f32,
}

enum IntakeStep {
    Moving,
    Arrived,
    Aborted(&'static str),
}

/// Only physics-driven cups that this station would still work on, and only
/// while a slot is free.
pub(crate) fn can_accept_cup(station: &StationState, cup: &CupState) -> bool {
    cup.physics_enabled
        && !cup.is_snapped()
        && !station.cup_complete(cup)
        && station.get_available_slot().is_some()
}

pub(crate) fn start_intake(
    station: &mut StationState,
    ctx: &mut LineCtx<'_>,
    cup_id: &CupId,
    distance: f32,
) -> bool {
    let Some(slot) = station.get_available_slot() else {
        return false;
    };
    let Some(cup) = ctx.cups.get_mut(cup_id) else {
        return false;
    };
    station.cup_slots[slot].set_busy(true);
    cup.toggle_physics(false);
    cup.set_grabbable(false);
    station.intakes.push(IntakeTask {
        cup_id: cup_id.clone(),
        slot,
        distance,
        elapsed: 0.0,
    });
    ctx.emit(Event::IntakeStarted {
        station_id: station.id.clone(),
        slot,
        cup_id: cup_id.clone(),
    });
    true
}

pub(crate) fn advance_intakes(station: &mut StationState, ctx: &mut LineCtx<'_>, dt: f32) {
    if station.intakes.is_empty() {
        return;
    }
    let constants = ctx.constants();
    let (speed, max_distance, max_time) = (
        constants.intake_speed,
        constants.intake_max_distance,
        constants.intake_max_time,
    );

    let tasks = std::mem::take(&mut station.intakes);
    for mut task in tasks {
        let step = if task.distance <= ARRIVAL_DISTANCE {
            IntakeStep::Arrived
        } else if task.distance > max_distance {
            IntakeStep::Aborted("too far")
        } else {
            task.elapsed += dt;
            if task.elapsed > max_time {
                IntakeStep::Aborted("timeout")
            } else {
                task.distance = (task.distance - speed * dt).max(0.0);
                IntakeStep::Moving
            }
        };

        match step {
            IntakeStep::Moving => station.intakes.push(task),
            IntakeStep::Arrived => finish_intake(station, ctx, &task),
            IntakeStep::Aborted(reason) => {
                station.cup_slots[task.slot].set_busy(false);
                release_to_physics(station, ctx, &task.cup_id, reason);
            }
        }
    }
}

fn finish_intake(station: &mut StationState, ctx: &mut LineCtx<'_>, task: &IntakeTask) {
    station.cup_slots[task.slot].set_busy(false);
    if let Some(cup) = ctx.cups.get_mut(&task.cup_id) {
        cup.set_grabbable(true);
    }
    if !snap_cup(station, ctx, task.slot, &task.cup_id) {
        release_to_physics(station, ctx, &task.cup_id, "slot taken");
    }
}

fn release_to_physics(
    station: &StationState,
    ctx: &mut LineCtx<'_>,
    cup_id: &CupId,
    reason: &'static str,
) {
    let Some(cup) = ctx.cups.get_mut(cup_id) else {
        return;
    };
    if cup.is_snapped() {
        return;
    }
    cup.location = CupLocation::Loose;
    cup.toggle_physics(true);
    cup.set_grabbable(true);
    debug!(station = %station.id, cup = %cup_id, reason, "intake aborted");
    ctx.emit(Event::IntakeAborted {
        station_id: station.id.clone(),
        cup_id: cup_id.clone(),
        reason: reason.to_string(),
    });
}
