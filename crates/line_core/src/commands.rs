use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use crate::cup::CupLocation;
use crate::station::{
    can_accept_cup, dispatch_signal, on_cup_state_changed, release_cup, seat_employee,
    snap_cup, start_intake, unseat_employee, LineCtx, StationState,
};
use crate::trigger::{TriggerSignal, TriggerState};
use crate::upgrade::UpgradeRejection;
use crate::{Command, CommandEnvelope, CupId, EmployeeId, Event, EventLevel, StationId};

/// Why a command was dropped. Rejections never abort the tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandRejection {
    UnknownStation(StationId),
    UnknownCup(CupId),
    UnknownEmployee(EmployeeId),
    NoTrigger,
    CupNotGrabbable,
    SlotBusy,
    NoFreeSlot,
    CannotAccept,
    NoEmployeeSlot,
    EmployeeNotAssigned,
    EmployeeAwake,
    Upgrade(UpgradeRejection),
}

impl std::fmt::Display for CommandRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownStation(id) => write!(f, "unknown station {id}"),
            Self::UnknownCup(id) => write!(f, "unknown cup {id}"),
            Self::UnknownEmployee(id) => write!(f, "unknown employee {id}"),
            Self::NoTrigger => f.write_str("station has no trigger"),
            Self::CupNotGrabbable => f.write_str("cup is not grabbable"),
            Self::SlotBusy => f.write_str("slot is busy"),
            Self::NoFreeSlot => f.write_str("no free slot, cup left loose"),
            Self::CannotAccept => f.write_str("station cannot accept this cup"),
            Self::NoEmployeeSlot => f.write_str("no free employee slot"),
            Self::EmployeeNotAssigned => f.write_str("employee is not assigned"),
            Self::EmployeeAwake => f.write_str("employee is already awake"),
            Self::Upgrade(reason) => write!(f, "upgrade rejected: {reason}"),
        }
    }
}

impl std::error::Error for CommandRejection {}

type Stations = BTreeMap<StationId, StationState>;

pub(crate) fn apply_commands(
    stations: &mut Stations,
    ctx: &mut LineCtx<'_>,
    commands: &[CommandEnvelope],
) {
    for envelope in commands {
        if envelope.execute_at_tick != ctx.tick {
            continue;
        }
        let Err(reason) = apply_command(stations, ctx, &envelope.command) else {
            continue;
        };
        debug!(command = %envelope.id, %reason, "command rejected");
        if ctx.event_level == EventLevel::Debug {
            ctx.emit(Event::CommandRejected {
                command_id: envelope.id.clone(),
                reason: reason.to_string(),
            });
        }
    }
}

fn apply_command(
    stations: &mut Stations,
    ctx: &mut LineCtx<'_>,
    command: &Command,
) -> Result<(), CommandRejection> {
    match command {
        Command::BeginInteraction { station_id } => {
            handle_trigger_input(stations, ctx, station_id, TriggerState::begin_interaction)
        }
        Command::ContinuousInput { station_id, delta } => {
            handle_trigger_input(stations, ctx, station_id, |trigger| {
                trigger.continuous_input(*delta);
                None
            })
        }
        Command::EndInteraction { station_id } => {
            handle_trigger_input(stations, ctx, station_id, TriggerState::end_interaction)
        }
        Command::MoveCup { cup_id, to } => handle_move_cup(stations, ctx, cup_id, to.as_ref()),
        Command::OfferCup {
            cup_id,
            station_id,
            distance,
        } => handle_offer_cup(stations, ctx, cup_id, station_id, *distance),
        Command::PlaceEmployee {
            employee_id,
            station_id,
        } => handle_place_employee(stations, ctx, employee_id, station_id),
        Command::PickUpEmployee { employee_id } => {
            handle_pick_up_employee(stations, ctx, employee_id)
        }
        Command::WakeEmployee { employee_id } => handle_wake_employee(stations, ctx, employee_id),
        Command::ApplyUpgrade {
            station_id,
            upgrade_id,
        } => {
            let station = station_mut(stations, station_id)?;
            crate::station::apply_upgrade(station, ctx, upgrade_id)
                .map(|_| ())
                .map_err(CommandRejection::Upgrade)
        }
    }
}

fn station_mut<'a>(
    stations: &'a mut Stations,
    station_id: &StationId,
) -> Result<&'a mut StationState, CommandRejection> {
    stations
        .get_mut(station_id)
        .ok_or_else(|| CommandRejection::UnknownStation(station_id.clone()))
}

fn handle_trigger_input(
    stations: &mut Stations,
    ctx: &mut LineCtx<'_>,
    station_id: &StationId,
    input: impl FnOnce(&mut TriggerState) -> Option<TriggerSignal>,
) -> Result<(), CommandRejection> {
    let station = station_mut(stations, station_id)?;
    let Some(trigger) = station.trigger.as_mut() else {
        warn!(station = %station_id, "input for station without trigger");
        return Err(CommandRejection::NoTrigger);
    };
    if let Some(signal) = input(trigger) {
        dispatch_signal(station, ctx, signal);
    }
    Ok(())
}

/// Drag-and-drop. The cup leaves its slot first; if the target has no room
/// it stays loose with physics on.
fn handle_move_cup(
    stations: &mut Stations,
    ctx: &mut LineCtx<'_>,
    cup_id: &CupId,
    to: Option<&StationId>,
) -> Result<(), CommandRejection> {
    let cup = ctx
        .cups
        .get(cup_id)
        .ok_or_else(|| CommandRejection::UnknownCup(cup_id.clone()))?;
    if !cup.grabbable {
        return Err(CommandRejection::CupNotGrabbable);
    }
    if let Some(target) = to {
        if !stations.contains_key(target) {
            return Err(CommandRejection::UnknownStation(target.clone()));
        }
    }

    if let CupLocation::InSlot { station_id, slot } = cup.location.clone() {
        let from = station_mut(stations, &station_id)?;
        if release_cup(from, ctx, slot).is_none() {
            return Err(CommandRejection::SlotBusy);
        }
    }

    let Some(target) = to else {
        return Ok(());
    };
    let station = station_mut(stations, target)?;
    let Some(slot) = station.get_available_slot() else {
        return Err(CommandRejection::NoFreeSlot);
    };
    if snap_cup(station, ctx, slot, cup_id) {
        Ok(())
    } else {
        Err(CommandRejection::NoFreeSlot)
    }
}

fn handle_offer_cup(
    stations: &mut Stations,
    ctx: &mut LineCtx<'_>,
    cup_id: &CupId,
    station_id: &StationId,
    distance: f32,
) -> Result<(), CommandRejection> {
    let station = station_mut(stations, station_id)?;
    let cup = ctx
        .cups
        .get(cup_id)
        .ok_or_else(|| CommandRejection::UnknownCup(cup_id.clone()))?;
    if !can_accept_cup(station, cup) {
        return Err(CommandRejection::CannotAccept);
    }
    if start_intake(station, ctx, cup_id, distance) {
        Ok(())
    } else {
        Err(CommandRejection::NoFreeSlot)
    }
}

/// Moving an already-seated employee first takes them off their old station.
fn handle_place_employee(
    stations: &mut Stations,
    ctx: &mut LineCtx<'_>,
    employee_id: &EmployeeId,
    station_id: &StationId,
) -> Result<(), CommandRejection> {
    let employee = ctx
        .employees
        .get(employee_id)
        .ok_or_else(|| CommandRejection::UnknownEmployee(employee_id.clone()))?;
    let previous = employee.current_station.clone();

    let target = station_mut(stations, station_id)?;
    if crate::slot::first_available(&target.employee_slots).is_none() {
        return Err(CommandRejection::NoEmployeeSlot);
    }

    if let Some(previous) = previous {
        if let Some(old) = stations.get_mut(&previous) {
            unseat_employee(old, ctx, employee_id);
        }
    }

    let target = station_mut(stations, station_id)?;
    seat_employee(target, ctx, employee_id)
        .map(|_| ())
        .ok_or(CommandRejection::NoEmployeeSlot)
}

fn handle_pick_up_employee(
    stations: &mut Stations,
    ctx: &mut LineCtx<'_>,
    employee_id: &EmployeeId,
) -> Result<(), CommandRejection> {
    let employee = ctx
        .employees
        .get(employee_id)
        .ok_or_else(|| CommandRejection::UnknownEmployee(employee_id.clone()))?;
    let station_id = employee
        .current_station
        .clone()
        .ok_or(CommandRejection::EmployeeNotAssigned)?;
    let station = station_mut(stations, &station_id)?;
    if unseat_employee(station, ctx, employee_id) {
        Ok(())
    } else {
        Err(CommandRejection::EmployeeNotAssigned)
    }
}

fn handle_wake_employee(
    stations: &mut Stations,
    ctx: &mut LineCtx<'_>,
    employee_id: &EmployeeId,
) -> Result<(), CommandRejection> {
    let constants = &ctx.content.constants;
    let employee = ctx
        .employees
        .get_mut(employee_id)
        .ok_or_else(|| CommandRejection::UnknownEmployee(employee_id.clone()))?;
    if !employee.wake_up(constants) {
        return Err(CommandRejection::EmployeeAwake);
    }
    let fatigue = employee.fatigue;
    let station_id = employee.current_station.clone();

    info!(employee = %employee_id, fatigue, "employee woke up");
    ctx.emit(Event::EmployeeWoke {
        employee_id: employee_id.clone(),
        fatigue,
    });
    if let Some(station) = station_id.and_then(|id| stations.get_mut(&id)) {
        on_cup_state_changed(station, ctx);
    }
    Ok(())
}
