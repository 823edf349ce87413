//! Shared test fixtures for `line_core` and downstream crates.
//!
//! `base_content()` is a complete line: one station of every type, two
//! employees, every upgrade, and short durations so payloads finish within a
//! few dozen ticks.

use crate::cup::{CupLocation, CupState};
use crate::employee::EmployeeState;
use crate::{
    CommandEnvelope, CommandId, Constants, Counters, CupId, EmployeeDef, EmployeeId, LayoutDef,
    LineContent, LineState, MetaState, StationDef, StationId, StationState, StationType,
    UpgradeDef, UpgradeId,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeMap;

pub fn base_constants() -> Constants {
    Constants {
        tick_seconds: 0.05,

        cup_tea_capacity: 10.0,
        cup_boba_capacity: 5,
        cup_base_price: 10,

        dispenser_cooldown: 0.5,
        boba_time_between_emit: 0.1,
        boba_time_between_trigger: 0.3,
        tea_base_pour_rate: 2.0,
        sealer_claw_duration: 0.2,
        sealer_rotation_duration: 0.4,
        delivery_validation_delay: 0.5,
        delivery_time_between_cups: 0.2,
        trash_dispose_duration: 0.5,
        chair_heal_interval: 1.0,
        chair_heal_amount: 1,

        eject_check_interval: 0.5,
        eject_impulse: 3.0,
        intake_speed: 2.0,
        intake_max_distance: 3.0,
        intake_max_time: 2.0,

        lever_max_angle: 60.0,
        lever_trigger_threshold: 45.0,
        lever_pull_sensitivity: 4.0,
        lever_return_speed: 120.0,
        lever_employee_pull_speed: 90.0,
        ripcord_max_pull: 1.0,
        ripcord_min_pull_speed: 4.0,
        ripcord_retract_speed: 2.0,
        ripcord_fail_speed: 1.0,

        max_fatigue: 5,
        rested_fatigue: 2,
        fatigue_speed_penalty: 0.15,
        min_speed_factor: 0.25,
        fatigue_roll_one_in: 3,
        cups_until_check_min: 2,
        cups_until_check_max: 4,
        work_retry_delay: 0.5,
        employee_press_delay_factor: 1.5,
    }
}

fn upgrade(id: &str, station_type: Option<StationType>, values: &[f32]) -> UpgradeDef {
    UpgradeDef {
        id: UpgradeId(id.to_string()),
        name: id.to_string(),
        description: String::new(),
        station_type,
        base_cost: 10,
        stack_values: values.to_vec(),
    }
}

fn station_def(
    id: &str,
    station_type: StationType,
    cup_slots: usize,
    active_cup_slots: usize,
    employee_slots: usize,
) -> StationDef {
    StationDef {
        id: StationId(id.to_string()),
        station_type,
        trigger: None,
        cup_slots,
        active_cup_slots,
        employee_slots,
        auto_eject: false,
        has_claws: true,
    }
}

pub fn base_content() -> LineContent {
    LineContent {
        content_version: "test".to_string(),
        upgrades: vec![
            upgrade("BobaPerClick", Some(StationType::BobaMachine), &[2.0, 3.0, 5.0]),
            upgrade("TeaPourSpeed", Some(StationType::TeaMachine), &[3.0, 4.5, 6.0]),
            upgrade("ClawArmSpeed", Some(StationType::CupSealer), &[1.5, 2.0, 3.0]),
            upgrade("RotSpeed", Some(StationType::CupSealer), &[1.5, 2.0, 3.0]),
            upgrade("AutoEject", None, &[1.0]),
            upgrade("CupSlots", None, &[2.0, 3.0]),
        ],
        layout: LayoutDef {
            stations: vec![
                station_def("dispenser", StationType::CupDispenser, 1, 1, 0),
                station_def("boba", StationType::BobaMachine, 2, 1, 1),
                station_def("tea", StationType::TeaMachine, 2, 1, 2),
                station_def("sealer", StationType::CupSealer, 1, 1, 1),
                station_def("delivery", StationType::DeliveryTray, 3, 3, 0),
                station_def("trash", StationType::Trashcan, 2, 2, 0),
                station_def("chair", StationType::EmployeeChair, 0, 0, 2),
            ],
            employees: vec![
                EmployeeDef {
                    id: EmployeeId("emp_0001".to_string()),
                    name: "Mei".to_string(),
                    base_speed: 1.0,
                },
                EmployeeDef {
                    id: EmployeeId("emp_0002".to_string()),
                    name: "Ravi".to_string(),
                    base_speed: 0.8,
                },
            ],
        },
        constants: base_constants(),
    }
}

/// Every station from the layout, every employee unassigned, no cups.
pub fn base_state(content: &LineContent) -> LineState {
    let mut rng = make_rng();
    let stations = content
        .layout
        .stations
        .iter()
        .map(|def| (def.id.clone(), StationState::from_def(def, content)))
        .collect();
    let employees = content
        .layout
        .employees
        .iter()
        .map(|def| {
            (
                def.id.clone(),
                EmployeeState::spawn(def, &content.constants, &mut rng),
            )
        })
        .collect();

    LineState {
        meta: MetaState {
            tick: 0,
            seed: 42,
            schema_version: 1,
            content_version: content.content_version.clone(),
        },
        stations,
        cups: BTreeMap::new(),
        employees,
        counters: Counters::default(),
    }
}

/// Deterministic RNG seeded with 42.
pub fn make_rng() -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(42)
}

pub fn station(id: &str) -> StationId {
    StationId(id.to_string())
}

pub fn employee(id: &str) -> EmployeeId {
    EmployeeId(id.to_string())
}

/// Puts a fresh cup straight into `slot` without going through a command.
pub fn place_cup(
    state: &mut LineState,
    content: &LineContent,
    station_id: &StationId,
    slot: usize,
) -> CupId {
    let cup_id = CupId(format!("cup_{:04}", state.counters.next_cup_id));
    state.counters.next_cup_id += 1;

    let mut cup = CupState::new(cup_id.clone(), &content.constants);
    cup.location = CupLocation::InSlot {
        station_id: station_id.clone(),
        slot,
    };
    cup.toggle_physics(false);

    let station = state
        .stations
        .get_mut(station_id)
        .expect("fixture station exists");
    assert!(station.cup_slots[slot].try_snap(cup_id.clone()));
    state.cups.insert(cup_id.clone(), cup);
    cup_id
}

/// A cup that passes every station predicate.
pub fn place_complete_cup(
    state: &mut LineState,
    content: &LineContent,
    station_id: &StationId,
    slot: usize,
) -> CupId {
    let cup_id = place_cup(state, content, station_id, slot);
    let cup = state.cups.get_mut(&cup_id).expect("cup just placed");
    cup.add_tea(cup.tea_capacity);
    for _ in 0..cup.boba_capacity {
        cup.add_boba();
    }
    cup.seal();
    cup_id
}

/// Envelope that executes on the state's current tick.
pub fn command(state: &LineState, command: crate::Command) -> CommandEnvelope {
    CommandEnvelope {
        id: CommandId(format!("cmd_{:06}", state.meta.tick)),
        issued_tick: state.meta.tick,
        execute_at_tick: state.meta.tick,
        command,
    }
}
