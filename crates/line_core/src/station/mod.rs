//! Station controller.
//!
//! Every station shares the same shell: cup slots, employee slots, an optional
//! trigger, upgrade levels, an auto-eject loop and at most one active worker.
//! What the station actually does when triggered lives in its `StationKind`
//! variant, reached only through the `Activatable`, `UpgradeHandler` and
//! `EmployeeWorkable` traits. Shared behavior is free functions in this module.

mod boba;
mod chair;
mod delivery;
mod dispenser;
mod intake;
mod sealer;
mod tea;
mod trash;

pub use boba::BobaMachine;
pub use chair::EmployeeChair;
pub use delivery::DeliveryTray;
pub use dispenser::CupDispenser;
pub(crate) use intake::{advance_intakes, can_accept_cup, start_intake};
pub use intake::IntakeTask;
pub use sealer::CupSealer;
pub use tea::TeaMachine;
pub use trash::Trashcan;

use std::collections::BTreeMap;

use rand::Rng;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::{debug, info, warn};

use crate::cup::{CupLocation, CupState};
use crate::employee::EmployeeState;
use crate::slot::{first_available, Slot};
use crate::trigger::{TriggerSignal, TriggerState};
use crate::upgrade::{UpgradeRejection, UpgradeState, UPGRADE_AUTO_EJECT, UPGRADE_CUP_SLOTS};
use crate::work::{step_work, WorkLoop, WorkStyle};
use crate::{
    Constants, Counters, CupId, EmployeeId, Event, EventEnvelope, EventLevel, LineContent,
    StationDef, StationId, StationType, TriggerType, UpgradeId,
};

pub type CupSlots = SmallVec<[Slot<CupId>; 4]>;
pub type EmployeeSlots = SmallVec<[Slot<EmployeeId>; 2]>;

// ---------------------------------------------------------------------------
// Station contract
// ---------------------------------------------------------------------------

/// Payload entry points, driven by trigger signals and the tick.
pub(crate) trait Activatable {
    /// Starts a payload. Returns false when the request was ignored
    /// (mid-payload, nothing to work on).
    fn activate(&mut self, io: &mut StationIo<'_>) -> bool;

    /// Returns true if this ended a running payload.
    fn deactivate(&mut self, _io: &mut StationIo<'_>) -> bool {
        false
    }

    /// Re-entrancy guard: while true, `activate` is ignored.
    fn is_processing(&self) -> bool;

    /// Advances in-flight sequences. Returns the number of payloads finished.
    fn advance(&mut self, io: &mut StationIo<'_>, dt: f32) -> u32;

    fn on_cup_inserted(&mut self, _io: &mut StationIo<'_>, _slot: usize) {}
}

pub(crate) trait UpgradeHandler {
    fn handles_upgrade(&self, _upgrade_id: &str) -> bool {
        false
    }

    fn apply_upgrade_value(&mut self, _upgrade_id: &str, _value: f32) {}
}

pub(crate) trait EmployeeWorkable {
    /// Per-cup completion predicate for this station.
    fn cup_complete(&self, cup: &CupState) -> bool;

    fn work_style(&self) -> WorkStyle;
}

pub(crate) trait StationBehavior: Activatable + UpgradeHandler + EmployeeWorkable {}

impl<T: Activatable + UpgradeHandler + EmployeeWorkable> StationBehavior for T {}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StationKind {
    Dispenser(CupDispenser),
    Boba(BobaMachine),
    Tea(TeaMachine),
    Sealer(CupSealer),
    Delivery(DeliveryTray),
    Trash(Trashcan),
    Chair(EmployeeChair),
}

impl StationKind {
    fn new(def: &StationDef, constants: &Constants) -> Self {
        match def.station_type {
            StationType::CupDispenser => Self::Dispenser(CupDispenser::default()),
            StationType::BobaMachine => Self::Boba(BobaMachine::default()),
            StationType::TeaMachine => Self::Tea(TeaMachine::new(constants)),
            StationType::CupSealer => Self::Sealer(CupSealer::new(def.has_claws)),
            StationType::DeliveryTray => Self::Delivery(DeliveryTray::default()),
            StationType::Trashcan => Self::Trash(Trashcan::default()),
            StationType::EmployeeChair => Self::Chair(EmployeeChair),
        }
    }

    pub(crate) fn behavior(&self) -> &dyn StationBehavior {
        match self {
            Self::Dispenser(s) => s,
            Self::Boba(s) => s,
            Self::Tea(s) => s,
            Self::Sealer(s) => s,
            Self::Delivery(s) => s,
            Self::Trash(s) => s,
            Self::Chair(s) => s,
        }
    }

    pub(crate) fn behavior_mut(&mut self) -> &mut dyn StationBehavior {
        match self {
            Self::Dispenser(s) => s,
            Self::Boba(s) => s,
            Self::Tea(s) => s,
            Self::Sealer(s) => s,
            Self::Delivery(s) => s,
            Self::Trash(s) => s,
            Self::Chair(s) => s,
        }
    }
}

pub fn default_trigger(station_type: StationType) -> Option<TriggerType> {
    match station_type {
        StationType::CupDispenser | StationType::BobaMachine | StationType::DeliveryTray => {
            Some(TriggerType::Button)
        }
        StationType::TeaMachine => Some(TriggerType::Lever),
        StationType::CupSealer => Some(TriggerType::Ripcord),
        StationType::Trashcan | StationType::EmployeeChair => None,
    }
}

// ---------------------------------------------------------------------------
// Station state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StationState {
    pub id: StationId,
    pub station_type: StationType,
    pub kind: StationKind,
    pub cup_slots: CupSlots,
    pub employee_slots: EmployeeSlots,
    pub trigger: Option<TriggerState>,
    /// One entry per applicable upgrade definition, in content order.
    pub upgrades: Vec<UpgradeState>,
    pub active_employee: Option<EmployeeId>,
    pub auto_eject: bool,
    pub eject_timer: f32,
    pub work: Option<WorkLoop>,
    pub intakes: Vec<IntakeTask>,
    pub activations_accepted: u64,
    pub payloads_completed: u64,
}

impl StationState {
    pub fn from_def(def: &StationDef, content: &LineContent) -> Self {
        let constants = &content.constants;
        let cup_slots = (0..def.cup_slots)
            .map(|i| {
                if i < def.active_cup_slots {
                    Slot::default()
                } else {
                    Slot::dormant()
                }
            })
            .collect();
        let employee_slots = (0..def.employee_slots).map(|_| Slot::default()).collect();
        let trigger = def
            .trigger
            .or_else(|| default_trigger(def.station_type))
            .map(|t| TriggerState::new(t, constants));
        let upgrades = content
            .upgrades
            .iter()
            .filter(|u| {
                u.applies_to(def.station_type) && (u.station_type.is_some() || def.cup_slots > 0)
            })
            .map(UpgradeState::new)
            .collect();

        Self {
            id: def.id.clone(),
            station_type: def.station_type,
            kind: StationKind::new(def, constants),
            cup_slots,
            employee_slots,
            trigger,
            upgrades,
            active_employee: None,
            auto_eject: def.auto_eject,
            eject_timer: 0.0,
            work: None,
            intakes: Vec::new(),
            activations_accepted: 0,
            payloads_completed: 0,
        }
    }

    /// First slot that is active, empty and not busy. Ties go to the lower index.
    pub fn get_available_slot(&self) -> Option<usize> {
        first_available(&self.cup_slots)
    }

    pub fn has_any_cup(&self) -> bool {
        self.cup_slots.iter().any(Slot::is_occupied)
    }

    /// Station-specific: true if any held cup satisfies this station's predicate.
    pub fn check_completion(&self, cups: &BTreeMap<CupId, CupState>) -> bool {
        let behavior = self.kind.behavior();
        self.cup_slots
            .iter()
            .filter_map(Slot::occupant)
            .filter_map(|id| cups.get(id))
            .any(|cup| behavior.cup_complete(cup))
    }

    pub fn cup_complete(&self, cup: &CupState) -> bool {
        self.kind.behavior().cup_complete(cup)
    }

    pub fn is_processing(&self) -> bool {
        self.kind.behavior().is_processing()
    }

    pub fn work_style(&self) -> WorkStyle {
        self.kind.behavior().work_style()
    }

    /// Ordered as the upgrade UI lists them.
    pub fn upgrade_states(&self) -> &[UpgradeState] {
        &self.upgrades
    }

    pub fn upgrade_level(&self, upgrade_id: &str) -> u32 {
        self.upgrades
            .iter()
            .find(|u| u.upgrade_id.0 == upgrade_id)
            .map_or(0, |u| u.level)
    }

    pub fn slot_of(&self, cup_id: &CupId) -> Option<usize> {
        self.cup_slots
            .iter()
            .position(|slot| slot.occupant() == Some(cup_id))
    }

    pub fn busy_slot_count(&self) -> usize {
        self.cup_slots.iter().filter(|slot| slot.is_busy()).count()
    }

    /// Employees waiting in a slot without being the active worker.
    pub fn standby_employees(&self) -> impl Iterator<Item = &EmployeeId> {
        self.employee_slots
            .iter()
            .filter_map(Slot::occupant)
            .filter(move |id| self.active_employee.as_ref() != Some(*id))
    }
}

fn is_generic_upgrade(upgrade_id: &str) -> bool {
    upgrade_id == UPGRADE_AUTO_EJECT || upgrade_id == UPGRADE_CUP_SLOTS
}

/// True when the active worker has something to do here.
///
/// Rest stations accept any seated worker, asleep or not. Everything else
/// needs a trigger, an incomplete cup, an idle payload and an awake worker.
pub fn can_employee_work(
    station: &StationState,
    employees: &BTreeMap<EmployeeId, EmployeeState>,
    cups: &BTreeMap<CupId, CupState>,
) -> bool {
    let Some(employee) = station
        .active_employee
        .as_ref()
        .and_then(|id| employees.get(id))
    else {
        return false;
    };
    match station.work_style() {
        WorkStyle::None => false,
        WorkStyle::Rest => true,
        WorkStyle::HoldUntilComplete | WorkStyle::RepeatPress | WorkStyle::SinglePull => {
            station.trigger.is_some()
                && employee.is_awake()
                && station.has_any_cup()
                && !station.check_completion(cups)
                && !station.is_processing()
        }
    }
}

// ---------------------------------------------------------------------------
// Tick context
// ---------------------------------------------------------------------------

/// Everything outside the station that station code may touch during a tick.
pub(crate) struct LineCtx<'a> {
    pub cups: &'a mut BTreeMap<CupId, CupState>,
    pub employees: &'a mut BTreeMap<EmployeeId, EmployeeState>,
    pub counters: &'a mut Counters,
    pub content: &'a LineContent,
    pub events: &'a mut Vec<EventEnvelope>,
    pub tick: u64,
    pub event_level: EventLevel,
}

impl LineCtx<'_> {
    pub fn emit(&mut self, event: Event) {
        self.events.push(crate::emit(self.counters, self.tick, event));
    }

    pub fn constants(&self) -> &Constants {
        &self.content.constants
    }
}

/// The view a station variant gets of its own slots and the cups in them.
pub(crate) struct StationIo<'a> {
    pub station_id: &'a StationId,
    pub slots: &'a mut CupSlots,
    pub cups: &'a mut BTreeMap<CupId, CupState>,
    pub constants: &'a Constants,
    pub counters: &'a mut Counters,
    pub events: &'a mut Vec<EventEnvelope>,
    pub tick: u64,
    /// Set whenever a slot gains or loses a cup.
    pub cups_changed: bool,
}

impl StationIo<'_> {
    pub fn emit(&mut self, event: Event) {
        self.events.push(crate::emit(self.counters, self.tick, event));
    }

    pub fn occupant(&self, slot: usize) -> Option<&CupId> {
        self.slots.get(slot).and_then(Slot::occupant)
    }

    pub fn cup(&self, slot: usize) -> Option<&CupState> {
        let id = self.slots.get(slot)?.occupant()?;
        self.cups.get(id)
    }

    pub fn cup_mut(&mut self, slot: usize) -> Option<&mut CupState> {
        let id = self.slots.get(slot)?.occupant()?;
        self.cups.get_mut(id)
    }

    pub fn is_busy(&self, slot: usize) -> bool {
        self.slots.get(slot).is_some_and(Slot::is_busy)
    }

    pub fn set_busy(&mut self, slot: usize, busy: bool) {
        if let Some(s) = self.slots.get_mut(slot) {
            s.set_busy(busy);
        }
    }

    /// Binds a loose cup to an active slot and takes it out of physics.
    pub fn snap_into(&mut self, slot: usize, cup_id: &CupId) -> bool {
        let Some(cup) = self.cups.get_mut(cup_id) else {
            return false;
        };
        if cup.is_snapped() {
            return false;
        }
        let Some(target) = self.slots.get_mut(slot) else {
            return false;
        };
        if !target.is_active() || !target.try_snap(cup_id.clone()) {
            return false;
        }
        cup.location = CupLocation::InSlot {
            station_id: self.station_id.clone(),
            slot,
        };
        cup.toggle_physics(false);
        self.cups_changed = true;
        self.emit(Event::CupSnapped {
            station_id: self.station_id.clone(),
            slot,
            cup_id: cup_id.clone(),
        });
        true
    }

    /// Detaches the cup without touching it otherwise. `None` while busy or empty.
    fn detach(&mut self, slot: usize) -> Option<CupId> {
        let cup_id = self.slots.get_mut(slot)?.release()?;
        if let Some(cup) = self.cups.get_mut(&cup_id) {
            cup.location = CupLocation::Loose;
            cup.toggle_physics(true);
        }
        self.cups_changed = true;
        Some(cup_id)
    }

    /// Hands the cup back to whoever is moving it (player, conveyor).
    pub fn release(&mut self, slot: usize) -> Option<CupId> {
        let cup_id = self.detach(slot)?;
        self.emit(Event::CupReleased {
            station_id: self.station_id.clone(),
            slot,
            cup_id: cup_id.clone(),
        });
        Some(cup_id)
    }

    /// Detach and push the cup out with `eject_impulse`.
    pub fn eject(&mut self, slot: usize) -> bool {
        let Some(cup_id) = self.detach(slot) else {
            return false;
        };
        if let Some(cup) = self.cups.get_mut(&cup_id) {
            cup.set_grabbable(true);
        }
        self.emit(Event::CupEjected {
            station_id: self.station_id.clone(),
            slot,
            cup_id,
            impulse: self.constants.eject_impulse,
        });
        true
    }

    /// Detach and remove the cup from the world. Works on busy slots: the
    /// caller owns the busy window it is closing.
    pub fn consume(&mut self, slot: usize) -> Option<CupState> {
        let s = self.slots.get_mut(slot)?;
        s.set_busy(false);
        let cup_id = s.release()?;
        self.cups_changed = true;
        self.cups.remove(&cup_id)
    }
}

/// Runs `f` against the station's variant with an io view over its slots.
/// Returns `f`'s result and whether any slot changed occupant.
fn with_io<R>(
    station: &mut StationState,
    ctx: &mut LineCtx<'_>,
    f: impl FnOnce(&mut dyn StationBehavior, &mut StationIo<'_>) -> R,
) -> (R, bool) {
    let StationState {
        id,
        kind,
        cup_slots,
        ..
    } = station;
    let mut io = StationIo {
        station_id: id,
        slots: cup_slots,
        cups: &mut *ctx.cups,
        constants: &ctx.content.constants,
        counters: &mut *ctx.counters,
        events: &mut *ctx.events,
        tick: ctx.tick,
        cups_changed: false,
    };
    let result = f(kind.behavior_mut(), &mut io);
    (result, io.cups_changed)
}

// ---------------------------------------------------------------------------
// Activation
// ---------------------------------------------------------------------------

/// Routes a trigger signal into the station payload.
pub(crate) fn dispatch_signal(
    station: &mut StationState,
    ctx: &mut LineCtx<'_>,
    signal: TriggerSignal,
) {
    match signal {
        TriggerSignal::Activate => {
            let (accepted, changed) = with_io(station, ctx, |b, io| b.activate(io));
            if accepted {
                station.activations_accepted += 1;
                ctx.emit(Event::StationTriggered {
                    station_id: station.id.clone(),
                });
            } else {
                debug!(station = %station.id, "activation ignored");
            }
            if changed {
                on_cup_state_changed(station, ctx);
            }
        }
        TriggerSignal::Deactivate => {
            let (ended, changed) = with_io(station, ctx, |b, io| b.deactivate(io));
            if ended {
                record_payloads(station, ctx, 1);
            }
            if changed {
                on_cup_state_changed(station, ctx);
            }
        }
    }
}

fn record_payloads(station: &mut StationState, ctx: &mut LineCtx<'_>, count: u32) {
    for _ in 0..count {
        station.payloads_completed += 1;
        ctx.emit(Event::PayloadCompleted {
            station_id: station.id.clone(),
        });
    }
}

// ---------------------------------------------------------------------------
// Slot operations
// ---------------------------------------------------------------------------

/// Snaps a loose cup into `slot` and runs the insertion hooks.
pub(crate) fn snap_cup(
    station: &mut StationState,
    ctx: &mut LineCtx<'_>,
    slot: usize,
    cup_id: &CupId,
) -> bool {
    let (snapped, _) = with_io(station, ctx, |b, io| {
        if !io.snap_into(slot, cup_id) {
            return false;
        }
        b.on_cup_inserted(io, slot);
        true
    });
    if snapped {
        on_cup_state_changed(station, ctx);
    }
    snapped
}

/// `None` when the slot is busy or empty.
pub(crate) fn release_cup(
    station: &mut StationState,
    ctx: &mut LineCtx<'_>,
    slot: usize,
) -> Option<CupId> {
    let (released, _) = with_io(station, ctx, |_, io| io.release(slot));
    if released.is_some() {
        on_cup_state_changed(station, ctx);
    }
    released
}

pub(crate) fn eject_cup(station: &mut StationState, ctx: &mut LineCtx<'_>, slot: usize) -> bool {
    let (ejected, _) = with_io(station, ctx, |_, io| io.eject(slot));
    if ejected {
        on_cup_state_changed(station, ctx);
    }
    ejected
}

/// Slot hook: wake the active worker's loop if it is idle and there is work.
pub(crate) fn on_cup_state_changed(station: &mut StationState, ctx: &mut LineCtx<'_>) {
    if station.work.is_some() {
        return;
    }
    let Some(employee_id) = station.active_employee.clone() else {
        return;
    };
    if !can_employee_work(station, ctx.employees, ctx.cups) {
        return;
    }
    let style = station.work_style();
    station.work = Some(WorkLoop::start(employee_id.clone(), style, ctx.constants()));
    ctx.emit(Event::WorkLoopStarted {
        employee_id,
        station_id: station.id.clone(),
    });
}

// ---------------------------------------------------------------------------
// Employees
// ---------------------------------------------------------------------------

/// Seats an employee in the first free employee slot. The first one seated
/// while nobody is active becomes the active worker; later ones stand by.
/// Returns `None` when every employee slot is taken.
pub(crate) fn seat_employee(
    station: &mut StationState,
    ctx: &mut LineCtx<'_>,
    employee_id: &EmployeeId,
) -> Option<bool> {
    let slot = first_available(&station.employee_slots)?;
    if !station.employee_slots[slot].try_snap(employee_id.clone()) {
        return None;
    }
    if let Some(employee) = ctx.employees.get_mut(employee_id) {
        employee.current_station = Some(station.id.clone());
    }
    let active = station.active_employee.is_none();
    ctx.emit(Event::EmployeeAssigned {
        employee_id: employee_id.clone(),
        station_id: station.id.clone(),
        active,
    });
    if active {
        set_active_employee(station, ctx, employee_id.clone());
    }
    Some(active)
}

/// Takes an employee out of its slot. Returns false if it was not seated here.
pub(crate) fn unseat_employee(
    station: &mut StationState,
    ctx: &mut LineCtx<'_>,
    employee_id: &EmployeeId,
) -> bool {
    let Some(slot) = station
        .employee_slots
        .iter()
        .position(|s| s.occupant() == Some(employee_id))
    else {
        return false;
    };
    if station.employee_slots[slot].release().is_none() {
        return false;
    }
    if let Some(employee) = ctx.employees.get_mut(employee_id) {
        employee.current_station = None;
    }
    ctx.emit(Event::EmployeeUnassigned {
        employee_id: employee_id.clone(),
        station_id: station.id.clone(),
    });
    remove_active_employee(station, ctx, employee_id);
    true
}

pub(crate) fn set_active_employee(
    station: &mut StationState,
    ctx: &mut LineCtx<'_>,
    employee_id: EmployeeId,
) {
    debug!(station = %station.id, employee = %employee_id, "active employee set");
    station.active_employee = Some(employee_id);
    on_cup_state_changed(station, ctx);
}

/// Removing the active worker cancels its loop, releases the trigger and
/// promotes the first standby employee, if any.
pub(crate) fn remove_active_employee(
    station: &mut StationState,
    ctx: &mut LineCtx<'_>,
    employee_id: &EmployeeId,
) {
    if station.active_employee.as_ref() != Some(employee_id) {
        return;
    }
    stop_employee_work(station, ctx);
    station.active_employee = None;

    let next = station.standby_employees().next().cloned();
    if let Some(next) = next {
        ctx.emit(Event::EmployeeAssigned {
            employee_id: next.clone(),
            station_id: station.id.clone(),
            active: true,
        });
        set_active_employee(station, ctx, next);
    }
}

/// Cancels the work loop and leaves the trigger released.
pub(crate) fn stop_employee_work(station: &mut StationState, ctx: &mut LineCtx<'_>) {
    let work = station.work.take();
    if let Some(signal) = station.trigger.as_mut().and_then(TriggerState::stop_operating) {
        dispatch_signal(station, ctx, signal);
    }
    if let Some(work) = work {
        ctx.emit(Event::WorkLoopStopped {
            employee_id: work.employee_id,
            station_id: station.id.clone(),
        });
    }
}

// ---------------------------------------------------------------------------
// Upgrades
// ---------------------------------------------------------------------------

/// Raises one upgrade level and reconfigures the running station.
///
/// Rejections leave the level untouched: unknown id, wrong station type, no
/// handler on this variant, or already maxed.
pub(crate) fn apply_upgrade(
    station: &mut StationState,
    ctx: &mut LineCtx<'_>,
    upgrade_id: &UpgradeId,
) -> Result<u32, UpgradeRejection> {
    let def = ctx
        .content
        .upgrade(upgrade_id)
        .ok_or(UpgradeRejection::UnknownUpgrade)?;
    if let Some(expected) = def.station_type {
        if expected != station.station_type {
            return Err(UpgradeRejection::WrongStationType {
                expected,
                actual: station.station_type,
            });
        }
    }
    let generic = is_generic_upgrade(&upgrade_id.0);
    if !generic && !station.kind.behavior().handles_upgrade(&upgrade_id.0) {
        warn!(station = %station.id, upgrade = %upgrade_id, "no handler for upgrade");
        return Err(UpgradeRejection::Unhandled);
    }

    let index = match station.upgrades.iter().position(|u| &u.upgrade_id == upgrade_id) {
        Some(index) => index,
        None => {
            station.upgrades.push(UpgradeState::new(def));
            station.upgrades.len() - 1
        }
    };
    let state = &mut station.upgrades[index];
    if !state.apply() {
        return Err(UpgradeRejection::Maxed { level: state.level });
    }
    let level = state.level;
    let value = state.current_value();

    if generic {
        apply_generic_upgrade(station, &upgrade_id.0, value);
    } else {
        station
            .kind
            .behavior_mut()
            .apply_upgrade_value(&upgrade_id.0, value);
    }

    info!(
        station = %station.id,
        upgrade = %upgrade_id,
        old_level = level - 1,
        new_level = level,
        value,
        "upgrade applied"
    );
    ctx.emit(Event::UpgradeApplied {
        station_id: station.id.clone(),
        upgrade_id: upgrade_id.clone(),
        level,
    });
    Ok(level)
}

fn apply_generic_upgrade(station: &mut StationState, upgrade_id: &str, value: f32) {
    match upgrade_id {
        UPGRADE_AUTO_EJECT => {
            if !station.auto_eject {
                station.auto_eject = true;
                station.eject_timer = 0.0;
            }
        }
        UPGRADE_CUP_SLOTS => {
            let active = round_to_count(value) as usize;
            for slot in station.cup_slots.iter_mut().take(active) {
                slot.activate();
            }
        }
        _ => {}
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub(crate) fn round_to_count(value: f32) -> u32 {
    value.round().max(0.0) as u32
}

// ---------------------------------------------------------------------------
// Tick
// ---------------------------------------------------------------------------

pub(crate) fn tick_stations(
    stations: &mut BTreeMap<StationId, StationState>,
    ctx: &mut LineCtx<'_>,
    rng: &mut impl Rng,
) {
    let dt = ctx.constants().tick_seconds;
    for station in stations.values_mut() {
        step_work(station, ctx, rng);
        advance_trigger(station, ctx, dt);
        advance_payload(station, ctx, dt);
        advance_intakes(station, ctx, dt);
        advance_auto_eject(station, ctx, dt);
    }
}

fn advance_trigger(station: &mut StationState, ctx: &mut LineCtx<'_>, dt: f32) {
    let Some(signal) = station.trigger.as_mut().and_then(|t| t.advance(dt)) else {
        return;
    };
    dispatch_signal(station, ctx, signal);
}

fn advance_payload(station: &mut StationState, ctx: &mut LineCtx<'_>, dt: f32) {
    let (finished, changed) = with_io(station, ctx, |b, io| b.advance(io, dt));
    record_payloads(station, ctx, finished);
    if changed {
        on_cup_state_changed(station, ctx);
    }
}

/// Every `eject_check_interval` seconds, pushes out any non-busy cup that
/// satisfies this station's completion predicate.
fn advance_auto_eject(station: &mut StationState, ctx: &mut LineCtx<'_>, dt: f32) {
    if !station.auto_eject {
        return;
    }
    station.eject_timer -= dt;
    if station.eject_timer > 0.0 {
        return;
    }
    station.eject_timer = ctx.constants().eject_check_interval;

    let (_, changed) = with_io(station, ctx, |b, io| {
        for slot in 0..io.slots.len() {
            let ready = !io.is_busy(slot) && io.cup(slot).is_some_and(|cup| b.cup_complete(cup));
            if ready {
                io.eject(slot);
            }
        }
    });
    if changed {
        on_cup_state_changed(station, ctx);
    }
}
