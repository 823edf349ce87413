//! Type definitions for `line_core`.
//!
//! All public types, structs, enums, and ID newtypes used by the line engine.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::cup::CupState;
use crate::employee::EmployeeState;
use crate::station::StationState;

// ---------------------------------------------------------------------------
// ID newtypes
// ---------------------------------------------------------------------------

macro_rules! string_id {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(StationId);
string_id!(CupId);
string_id!(EmployeeId);
string_id!(UpgradeId);
string_id!(CommandId);
string_id!(EventId);

// ---------------------------------------------------------------------------
// Core enums
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventLevel {
    Normal,
    Debug,
}

/// Concrete station variants a layout can place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StationType {
    CupDispenser,
    BobaMachine,
    TeaMachine,
    CupSealer,
    DeliveryTray,
    Trashcan,
    EmployeeChair,
}

/// Physical input device mounted on a station.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriggerType {
    Button,
    Lever,
    Ripcord,
}

// ---------------------------------------------------------------------------
// State types
// ---------------------------------------------------------------------------

/// The root "world" object. Owns every station, cup and employee.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineState {
    pub meta: MetaState,
    pub stations: BTreeMap<StationId, StationState>,
    pub cups: BTreeMap<CupId, CupState>,
    pub employees: BTreeMap<EmployeeId, EmployeeState>,
    pub counters: Counters,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaState {
    pub tick: u64,
    pub seed: u64,
    pub schema_version: u32,
    pub content_version: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Counters {
    pub next_event_id: u64,
    pub next_command_id: u64,
    pub next_cup_id: u64,
    pub cups_sold: u64,
    pub cups_discarded: u64,
}

// ---------------------------------------------------------------------------
// Command types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandEnvelope {
    pub id: CommandId,
    pub issued_tick: u64,
    pub execute_at_tick: u64,
    pub command: Command,
}

/// Signals crossing the input, physics and UI boundaries into the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Command {
    /// Player grabs the station's trigger.
    BeginInteraction { station_id: StationId },
    /// Accumulated input while the trigger is held (lever angle / ripcord pull).
    ContinuousInput { station_id: StationId, delta: f32 },
    /// Player lets go of the trigger.
    EndInteraction { station_id: StationId },
    /// Drag-and-drop. `to: None` drops the cup loose.
    MoveCup {
        cup_id: CupId,
        to: Option<StationId>,
    },
    /// A loose cup arrives in front of a station's intake (conveyor).
    OfferCup {
        cup_id: CupId,
        station_id: StationId,
        distance: f32,
    },
    PlaceEmployee {
        employee_id: EmployeeId,
        station_id: StationId,
    },
    PickUpEmployee { employee_id: EmployeeId },
    WakeEmployee { employee_id: EmployeeId },
    /// Cost gating is the caller's responsibility.
    ApplyUpgrade {
        station_id: StationId,
        upgrade_id: UpgradeId,
    },
}

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub id: EventId,
    pub tick: u64,
    pub event: Event,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    StationTriggered {
        station_id: StationId,
    },
    PayloadCompleted {
        station_id: StationId,
    },
    CupDispensed {
        station_id: StationId,
        cup_id: CupId,
    },
    CupSnapped {
        station_id: StationId,
        slot: usize,
        cup_id: CupId,
    },
    CupReleased {
        station_id: StationId,
        slot: usize,
        cup_id: CupId,
    },
    /// Presentation applies `impulse` to the now physics-enabled cup.
    CupEjected {
        station_id: StationId,
        slot: usize,
        cup_id: CupId,
        impulse: f32,
    },
    BobaAdded {
        station_id: StationId,
        cup_id: CupId,
        boba_count: u32,
    },
    BobaSpilled {
        station_id: StationId,
    },
    CupSealed {
        station_id: StationId,
        cup_id: CupId,
    },
    /// The only economy signal. Carries the sold cup for pricing.
    ContainerSold {
        station_id: StationId,
        cup: CupState,
    },
    DeliveryRejected {
        station_id: StationId,
        cup_id: CupId,
    },
    CupDiscarded {
        station_id: StationId,
        cup_id: CupId,
    },
    IntakeStarted {
        station_id: StationId,
        slot: usize,
        cup_id: CupId,
    },
    IntakeAborted {
        station_id: StationId,
        cup_id: CupId,
        reason: String,
    },
    EmployeeAssigned {
        employee_id: EmployeeId,
        station_id: StationId,
        active: bool,
    },
    EmployeeUnassigned {
        employee_id: EmployeeId,
        station_id: StationId,
    },
    WorkLoopStarted {
        employee_id: EmployeeId,
        station_id: StationId,
    },
    WorkLoopStopped {
        employee_id: EmployeeId,
        station_id: StationId,
    },
    RemoteActivation {
        employee_id: EmployeeId,
        station_id: StationId,
        intensity: f32,
    },
    AttemptFailed {
        employee_id: EmployeeId,
        station_id: StationId,
    },
    CupCompletedByEmployee {
        employee_id: EmployeeId,
        station_id: StationId,
    },
    FatigueChanged {
        employee_id: EmployeeId,
        before: u32,
        after: u32,
    },
    EmployeeFellAsleep {
        employee_id: EmployeeId,
    },
    EmployeeWoke {
        employee_id: EmployeeId,
        fatigue: u32,
    },
    UpgradeApplied {
        station_id: StationId,
        upgrade_id: UpgradeId,
        level: u32,
    },
    /// Only emitted at `EventLevel::Debug`.
    CommandRejected {
        command_id: CommandId,
        reason: String,
    },
    /// Only emitted at `EventLevel::Debug`.
    WorkRoll {
        employee_id: EmployeeId,
        station_id: StationId,
        p: f32,
        rolled: f32,
    },
}

// ---------------------------------------------------------------------------
// Content types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineContent {
    pub content_version: String,
    pub upgrades: Vec<UpgradeDef>,
    pub layout: LayoutDef,
    pub constants: Constants,
}

impl LineContent {
    pub fn upgrade(&self, id: &UpgradeId) -> Option<&UpgradeDef> {
        self.upgrades.iter().find(|u| &u.id == id)
    }
}

/// Immutable upgrade record. `stack_values[n]` is the effect at level `n + 1`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpgradeDef {
    pub id: UpgradeId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// `None` for upgrades any station with cup slots can take.
    #[serde(default)]
    pub station_type: Option<StationType>,
    pub base_cost: u32,
    pub stack_values: Vec<f32>,
}

impl UpgradeDef {
    pub fn applies_to(&self, station_type: StationType) -> bool {
        self.station_type.map_or(true, |t| t == station_type)
    }

    pub fn max_level(&self) -> u32 {
        u32::try_from(self.stack_values.len()).unwrap_or(u32::MAX)
    }

    /// Cost to go from `current_level` to `current_level + 1`.
    pub fn cost(&self, current_level: u32) -> u32 {
        self.base_cost.saturating_mul(current_level + 1)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutDef {
    pub stations: Vec<StationDef>,
    #[serde(default)]
    pub employees: Vec<EmployeeDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StationDef {
    pub id: StationId,
    pub station_type: StationType,
    #[serde(default)]
    pub trigger: Option<TriggerType>,
    /// Total slots built into the station, dormant ones included.
    pub cup_slots: usize,
    /// Slots usable from the start; `CupSlots` upgrades wake the rest.
    pub active_cup_slots: usize,
    #[serde(default)]
    pub employee_slots: usize,
    #[serde(default)]
    pub auto_eject: bool,
    /// Sealer only: whether the claw arms are fitted.
    #[serde(default = "default_true")]
    pub has_claws: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmployeeDef {
    pub id: EmployeeId,
    pub name: String,
    pub base_speed: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Constants {
    /// Seconds of simulated time per tick.
    pub tick_seconds: f32,

    // Cups
    pub cup_tea_capacity: f32,
    pub cup_boba_capacity: u32,
    pub cup_base_price: u32,

    // Station payloads
    pub dispenser_cooldown: f32,
    pub boba_time_between_emit: f32,
    pub boba_time_between_trigger: f32,
    pub tea_base_pour_rate: f32,
    pub sealer_claw_duration: f32,
    pub sealer_rotation_duration: f32,
    pub delivery_validation_delay: f32,
    pub delivery_time_between_cups: f32,
    pub trash_dispose_duration: f32,
    pub chair_heal_interval: f32,
    pub chair_heal_amount: u32,

    // Slot handling
    pub eject_check_interval: f32,
    pub eject_impulse: f32,
    pub intake_speed: f32,
    pub intake_max_distance: f32,
    pub intake_max_time: f32,

    // Triggers
    pub lever_max_angle: f32,
    pub lever_trigger_threshold: f32,
    pub lever_pull_sensitivity: f32,
    pub lever_return_speed: f32,
    pub lever_employee_pull_speed: f32,
    pub ripcord_max_pull: f32,
    pub ripcord_min_pull_speed: f32,
    pub ripcord_retract_speed: f32,
    pub ripcord_fail_speed: f32,

    // Employees
    pub max_fatigue: u32,
    pub rested_fatigue: u32,
    pub fatigue_speed_penalty: f32,
    pub min_speed_factor: f32,
    pub fatigue_roll_one_in: u32,
    pub cups_until_check_min: u32,
    pub cups_until_check_max: u32,
    pub work_retry_delay: f32,
    pub employee_press_delay_factor: f32,
}
