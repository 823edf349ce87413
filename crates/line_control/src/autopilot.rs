use std::collections::{BTreeMap, BTreeSet};

use line_core::slot::first_available;
use line_core::upgrade::UPGRADE_AUTO_EJECT;
use line_core::{
    Command, CommandEnvelope, CommandId, CupLocation, CupState, EventEnvelope, LineContent,
    LineState, Slot, StationId, StationState, StationType,
};
use rand::Rng;
use tracing::{debug, info};

use crate::ledger::{EconomyConfig, SaleLedger};
use crate::CommandSource;

/// Plays the player role on a line:
/// 1. Wake sleeping employees.
/// 2. Seat idle employees on unstaffed work stations.
/// 3. Operate the triggers of stations nobody is working.
/// 4. Carry each cup to the station that does its next step.
/// 5. Buy the cheapest affordable upgrade.
pub struct LineAutopilot {
    ledger: SaleLedger,
    pub max_cups_in_flight: usize,
    pub buy_upgrades: bool,
    held_levers: BTreeSet<StationId>,
    pulled_cords: BTreeSet<StationId>,
}

/// Stations an idle employee is sent to, most valuable first.
const STAFFING_ORDER: [StationType; 3] = [
    StationType::CupSealer,
    StationType::TeaMachine,
    StationType::BobaMachine,
];

impl LineAutopilot {
    pub fn new(economy: &EconomyConfig) -> Self {
        Self {
            ledger: SaleLedger::new(economy),
            max_cups_in_flight: 3,
            buy_upgrades: true,
            held_levers: BTreeSet::new(),
            pulled_cords: BTreeSet::new(),
        }
    }

    pub fn ledger(&self) -> &SaleLedger {
        &self.ledger
    }

    /// Feeds one tick's events to the wallet. Returns the amount earned.
    pub fn observe(&mut self, events: &[EventEnvelope], rng: &mut impl Rng) -> u64 {
        self.ledger.record_events(events, rng)
    }
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

/// Commands being assembled for one tick, plus what they will change.
struct Plan<'a> {
    state: &'a LineState,
    next_id: &'a mut u64,
    commands: Vec<CommandEnvelope>,
    /// Slots promised to cups moved earlier in this plan.
    reserved: BTreeMap<StationId, usize>,
    /// Stations that receive an employee in this plan.
    staffed: BTreeSet<StationId>,
}

impl<'a> Plan<'a> {
    fn new(state: &'a LineState, next_id: &'a mut u64) -> Self {
        Self {
            state,
            next_id,
            commands: Vec::new(),
            reserved: BTreeMap::new(),
            staffed: BTreeSet::new(),
        }
    }

    fn push(&mut self, command: Command) {
        let tick = self.state.meta.tick;
        let id = CommandId(format!("cmd_{:06}", *self.next_id));
        *self.next_id += 1;
        self.commands.push(CommandEnvelope {
            id,
            issued_tick: tick,
            execute_at_tick: tick,
            command,
        });
    }

    fn press(&mut self, station_id: &StationId) {
        self.push(Command::BeginInteraction {
            station_id: station_id.clone(),
        });
        self.push(Command::EndInteraction {
            station_id: station_id.clone(),
        });
    }

    fn free_slots(&self, station: &StationState) -> usize {
        let open = station
            .cup_slots
            .iter()
            .filter(|slot| slot.is_available())
            .count();
        open.saturating_sub(self.reserved.get(&station.id).copied().unwrap_or(0))
    }

    /// Unstaffed before this plan and not receiving anyone in it.
    fn player_operated(&self, station: &StationState) -> bool {
        station.active_employee.is_none() && !self.staffed.contains(&station.id)
    }
}

/// Where the cup has to go next. Sealed-but-unfinished cups can never
/// complete, so they go to the trash.
fn next_stage(cup: &CupState) -> StationType {
    if cup.is_complete() {
        StationType::DeliveryTray
    } else if cup.is_sealed() {
        StationType::Trashcan
    } else if !cup.is_tea_full() {
        StationType::TeaMachine
    } else if !cup.is_boba_full() {
        StationType::BobaMachine
    } else {
        StationType::CupSealer
    }
}

/// True if a non-busy slot holds a cup this station still has to work on.
fn has_work(station: &StationState, state: &LineState) -> bool {
    station.cup_slots.iter().any(|slot| {
        !slot.is_busy()
            && slot
                .occupant()
                .and_then(|id| state.cups.get(id))
                .is_some_and(|cup| !station.cup_complete(cup))
    })
}

fn has_idle_cup(station: &StationState) -> bool {
    station
        .cup_slots
        .iter()
        .any(|slot| slot.is_occupied() && !slot.is_busy())
}

fn wake_sleepers(plan: &mut Plan<'_>) {
    let sleepers: Vec<_> = plan
        .state
        .employees
        .values()
        .filter(|e| e.asleep)
        .map(|e| e.id.clone())
        .collect();
    for employee_id in sleepers {
        plan.push(Command::WakeEmployee { employee_id });
    }
}

fn staff_stations(plan: &mut Plan<'_>, held: &BTreeSet<StationId>) {
    let state = plan.state;
    let idle: Vec<_> = state
        .employees
        .values()
        .filter(|e| e.current_station.is_none() && e.is_awake())
        .map(|e| e.id.clone())
        .collect();

    for employee_id in idle {
        let target = STAFFING_ORDER.iter().find_map(|wanted| {
            state.stations.values().find(|station| {
                station.station_type == *wanted
                    && plan.player_operated(station)
                    && !held.contains(&station.id)
                    && first_available(&station.employee_slots).is_some()
            })
        });
        let Some(station) = target else {
            break;
        };
        let station_id = station.id.clone();
        debug!(employee = %employee_id, station = %station_id, "seating employee");
        plan.staffed.insert(station_id.clone());
        plan.push(Command::PlaceEmployee {
            employee_id,
            station_id,
        });
    }
}

/// Lever stations are held until no cup needs tea.
fn operate_lever(
    plan: &mut Plan<'_>,
    held: &mut BTreeSet<StationId>,
    station: &StationState,
    content: &LineContent,
) {
    let wanted = plan.player_operated(station) && has_work(station, plan.state);
    if held.contains(&station.id) {
        if !wanted {
            held.remove(&station.id);
            plan.push(Command::EndInteraction {
                station_id: station.id.clone(),
            });
        }
        return;
    }
    if wanted {
        let c = &content.constants;
        held.insert(station.id.clone());
        plan.push(Command::BeginInteraction {
            station_id: station.id.clone(),
        });
        plan.push(Command::ContinuousInput {
            station_id: station.id.clone(),
            delta: c.lever_max_angle / c.lever_pull_sensitivity,
        });
    }
}

/// One full pull in a single tick, let go on the next.
fn operate_ripcord(
    plan: &mut Plan<'_>,
    pulled: &mut BTreeSet<StationId>,
    station: &StationState,
    content: &LineContent,
) {
    if pulled.remove(&station.id) {
        plan.push(Command::EndInteraction {
            station_id: station.id.clone(),
        });
        return;
    }
    if plan.player_operated(station) && !station.is_processing() && has_work(station, plan.state)
    {
        pulled.insert(station.id.clone());
        plan.push(Command::BeginInteraction {
            station_id: station.id.clone(),
        });
        plan.push(Command::ContinuousInput {
            station_id: station.id.clone(),
            delta: content.constants.ripcord_max_pull,
        });
    }
}

fn route_cups(plan: &mut Plan<'_>) {
    let state = plan.state;
    for cup in state.cups.values() {
        if !cup.grabbable {
            continue;
        }
        if let CupLocation::InSlot { station_id, slot } = &cup.location {
            let Some(station) = state.stations.get(station_id) else {
                continue;
            };
            let busy = station.cup_slots.get(*slot).is_none_or(Slot::is_busy);
            if busy || station.work.is_some() || station.station_type == next_stage(cup) {
                continue;
            }
        }

        let stage = next_stage(cup);
        let target = state
            .stations
            .values()
            .find(|s| s.station_type == stage && plan.free_slots(s) > 0)
            .map(|s| s.id.clone());
        let Some(target) = target else {
            continue;
        };
        *plan.reserved.entry(target.clone()).or_insert(0) += 1;
        plan.push(Command::MoveCup {
            cup_id: cup.id.clone(),
            to: Some(target),
        });
    }
}

/// Auto-eject on the tray would push finished cups off before they sell.
fn worth_buying(station: &StationState, upgrade_id: &str) -> bool {
    !(station.station_type == StationType::DeliveryTray && upgrade_id == UPGRADE_AUTO_EJECT)
}

fn buy_upgrade(plan: &mut Plan<'_>, ledger: &mut SaleLedger) {
    let state = plan.state;
    let cheapest = state
        .stations
        .values()
        .flat_map(|station| {
            station
                .upgrade_states()
                .iter()
                .filter(move |u| !u.is_maxed() && worth_buying(station, &u.upgrade_id.0))
                .map(move |u| (u64::from(u.next_cost()), station, u))
        })
        .min_by_key(|(cost, _, _)| *cost);
    let Some((cost, station, upgrade)) = cheapest else {
        return;
    };
    if !ledger.try_purchase(cost) {
        return;
    }
    info!(
        station = %station.id,
        upgrade = %upgrade.upgrade_id,
        cost,
        balance = ledger.balance(),
        "buying upgrade"
    );
    plan.push(Command::ApplyUpgrade {
        station_id: station.id.clone(),
        upgrade_id: upgrade.upgrade_id.clone(),
    });
}

// ---------------------------------------------------------------------------
// LineAutopilot
// ---------------------------------------------------------------------------

impl CommandSource for LineAutopilot {
    fn generate_commands(
        &mut self,
        state: &LineState,
        content: &LineContent,
        next_command_id: &mut u64,
    ) -> Vec<CommandEnvelope> {
        let mut plan = Plan::new(state, next_command_id);

        wake_sleepers(&mut plan);
        staff_stations(&mut plan, &self.held_levers);

        for station in state.stations.values() {
            match station.station_type {
                StationType::CupDispenser => {
                    let room = state.cups.len() < self.max_cups_in_flight;
                    if room
                        && plan.player_operated(station)
                        && !station.is_processing()
                        && station.get_available_slot().is_some()
                    {
                        plan.press(&station.id);
                    }
                }
                StationType::BobaMachine => {
                    if plan.player_operated(station)
                        && !station.is_processing()
                        && has_work(station, state)
                    {
                        plan.press(&station.id);
                    }
                }
                StationType::DeliveryTray => {
                    if !station.is_processing() && has_idle_cup(station) {
                        plan.press(&station.id);
                    }
                }
                StationType::TeaMachine => {
                    operate_lever(&mut plan, &mut self.held_levers, station, content);
                }
                StationType::CupSealer => {
                    operate_ripcord(&mut plan, &mut self.pulled_cords, station, content);
                }
                StationType::Trashcan | StationType::EmployeeChair => {}
            }
        }

        route_cups(&mut plan);
        if self.buy_upgrades {
            buy_upgrade(&mut plan, &mut self.ledger);
        }
        plan.commands
    }
}
