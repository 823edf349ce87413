//! Trigger adapters: button, lever and ripcord behind one activation contract.
//!
//! Adapters never touch slots or cups. Every entry point returns at most one
//! `TriggerSignal` which the owning station dispatches to its payload.
//! Direct (player) and remote (employee) operation exclude each other: while
//! one is in progress the other's calls are ignored.

use serde::{Deserialize, Serialize};

use crate::{Constants, TriggerType};

const ANGLE_EPSILON: f32 = 1e-4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriggerSignal {
    Activate,
    Deactivate,
}

/// Who currently operates the trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Control {
    #[default]
    Idle,
    Direct,
    Remote,
}

/// Result of a remote activation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteStart {
    /// Another operation owns the trigger; nothing happened.
    Busy,
    /// Accepted; the activation signal will come out of a later `advance`.
    Pending,
    /// Accepted and triggered immediately.
    Fired,
}

pub trait TriggerAdapter {
    fn begin_interaction(&mut self) -> Option<TriggerSignal>;
    fn continuous_input(&mut self, delta: f32);
    fn end_interaction(&mut self) -> Option<TriggerSignal>;
    fn remote_activate(&mut self, intensity: f32) -> RemoteStart;
    /// Ends remote operation and leaves the trigger released.
    fn stop_operating(&mut self) -> Option<TriggerSignal>;
    fn advance(&mut self, dt: f32) -> Option<TriggerSignal>;
    fn control(&self) -> Control;

    /// Plays a failed remote attempt that never reaches the trigger point.
    fn remote_fail(&mut self) -> bool {
        false
    }

    fn supports_failed_attempt(&self) -> bool {
        false
    }
}

// ---------------------------------------------------------------------------
// Button
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Button {
    pressed: bool,
}

impl TriggerAdapter for Button {
    fn begin_interaction(&mut self) -> Option<TriggerSignal> {
        self.pressed = true;
        Some(TriggerSignal::Activate)
    }

    fn continuous_input(&mut self, _delta: f32) {}

    fn end_interaction(&mut self) -> Option<TriggerSignal> {
        self.pressed = false;
        None
    }

    fn remote_activate(&mut self, _intensity: f32) -> RemoteStart {
        if self.pressed {
            return RemoteStart::Busy;
        }
        RemoteStart::Fired
    }

    fn stop_operating(&mut self) -> Option<TriggerSignal> {
        None
    }

    fn advance(&mut self, _dt: f32) -> Option<TriggerSignal> {
        None
    }

    fn control(&self) -> Control {
        if self.pressed {
            Control::Direct
        } else {
            Control::Idle
        }
    }
}

// ---------------------------------------------------------------------------
// Lever
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
enum LeverRemote {
    Pulling { intensity: f32 },
    Holding,
    Returning,
}

/// Continuous angle in `[0, max_angle]`. Engaged while held past the threshold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lever {
    angle: f32,
    max_angle: f32,
    threshold: f32,
    sensitivity: f32,
    return_speed: f32,
    employee_pull_speed: f32,
    held: bool,
    engaged: bool,
    control: Control,
    remote: Option<LeverRemote>,
}

impl Lever {
    pub fn new(constants: &Constants) -> Self {
        Self {
            angle: 0.0,
            max_angle: constants.lever_max_angle,
            threshold: constants.lever_trigger_threshold,
            sensitivity: constants.lever_pull_sensitivity,
            return_speed: constants.lever_return_speed,
            employee_pull_speed: constants.lever_employee_pull_speed,
            held: false,
            engaged: false,
            control: Control::Idle,
            remote: None,
        }
    }

    pub fn angle(&self) -> f32 {
        self.angle
    }

    pub fn is_engaged(&self) -> bool {
        self.engaged
    }

    fn move_toward_rest(&mut self, dt: f32) {
        self.angle = (self.angle - self.return_speed * dt).max(0.0);
    }

    fn update_engagement(&mut self) -> Option<TriggerSignal> {
        let should_engage = self.held && self.angle + ANGLE_EPSILON >= self.threshold;
        match (should_engage, self.engaged) {
            (true, false) => {
                self.engaged = true;
                Some(TriggerSignal::Activate)
            }
            (false, true) => {
                self.engaged = false;
                Some(TriggerSignal::Deactivate)
            }
            _ => None,
        }
    }
}

impl TriggerAdapter for Lever {
    fn begin_interaction(&mut self) -> Option<TriggerSignal> {
        if self.control == Control::Remote {
            return None;
        }
        self.control = Control::Direct;
        self.held = true;
        None
    }

    fn continuous_input(&mut self, delta: f32) {
        if self.control != Control::Direct {
            return;
        }
        self.angle = (self.angle + delta * self.sensitivity).clamp(0.0, self.max_angle);
    }

    fn end_interaction(&mut self) -> Option<TriggerSignal> {
        if self.control != Control::Direct {
            return None;
        }
        self.held = false;
        self.control = Control::Idle;
        self.update_engagement()
    }

    fn remote_activate(&mut self, intensity: f32) -> RemoteStart {
        if self.control != Control::Idle || intensity <= 0.0 {
            return RemoteStart::Busy;
        }
        self.control = Control::Remote;
        self.held = true;
        self.remote = Some(LeverRemote::Pulling { intensity });
        RemoteStart::Pending
    }

    fn stop_operating(&mut self) -> Option<TriggerSignal> {
        if self.control != Control::Remote {
            return None;
        }
        self.held = false;
        self.remote = Some(LeverRemote::Returning);
        self.update_engagement()
    }

    fn advance(&mut self, dt: f32) -> Option<TriggerSignal> {
        match self.remote {
            Some(LeverRemote::Pulling { intensity }) => {
                self.angle = (self.angle + self.employee_pull_speed * intensity * dt)
                    .clamp(0.0, self.max_angle);
                if self.angle + ANGLE_EPSILON >= self.threshold {
                    self.angle = self.threshold;
                    self.remote = Some(LeverRemote::Holding);
                }
            }
            Some(LeverRemote::Holding) => self.angle = self.threshold,
            Some(LeverRemote::Returning) => {
                self.move_toward_rest(dt);
                if self.angle <= 0.0 {
                    self.remote = None;
                    self.control = Control::Idle;
                }
            }
            None if !self.held => self.move_toward_rest(dt),
            None => {}
        }
        self.update_engagement()
    }

    fn control(&self) -> Control {
        self.control
    }
}

// ---------------------------------------------------------------------------
// Ripcord
// ---------------------------------------------------------------------------

/// Must reach full pull fast enough to fire; a slow pull releases the cord.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ripcord {
    pull: f32,
    max_pull: f32,
    min_pull_speed: f32,
    retract_speed: f32,
    fail_speed: f32,
    held: bool,
    /// One activation per pull.
    fired: bool,
    failing: bool,
    control: Control,
    pulled_this_tick: f32,
}

impl Ripcord {
    pub fn new(constants: &Constants) -> Self {
        Self {
            pull: 0.0,
            max_pull: constants.ripcord_max_pull,
            min_pull_speed: constants.ripcord_min_pull_speed,
            retract_speed: constants.ripcord_retract_speed,
            fail_speed: constants.ripcord_fail_speed,
            held: false,
            fired: false,
            failing: false,
            control: Control::Idle,
            pulled_this_tick: 0.0,
        }
    }

    pub fn pull(&self) -> f32 {
        self.pull
    }

    fn release(&mut self) {
        self.held = false;
        self.failing = false;
        self.control = Control::Idle;
        self.pulled_this_tick = 0.0;
    }
}

impl TriggerAdapter for Ripcord {
    fn begin_interaction(&mut self) -> Option<TriggerSignal> {
        if self.control == Control::Remote {
            return None;
        }
        self.control = Control::Direct;
        self.held = true;
        self.fired = false;
        None
    }

    fn continuous_input(&mut self, delta: f32) {
        if self.control != Control::Direct || !self.held {
            return;
        }
        self.pull = (self.pull + delta).clamp(0.0, self.max_pull);
        self.pulled_this_tick += delta.max(0.0);
    }

    fn end_interaction(&mut self) -> Option<TriggerSignal> {
        if self.control == Control::Direct {
            self.release();
        }
        None
    }

    fn remote_activate(&mut self, _intensity: f32) -> RemoteStart {
        if self.control != Control::Idle {
            return RemoteStart::Busy;
        }
        self.pull = self.max_pull;
        self.fired = true;
        RemoteStart::Fired
    }

    fn stop_operating(&mut self) -> Option<TriggerSignal> {
        if self.control == Control::Remote {
            self.release();
        }
        None
    }

    fn advance(&mut self, dt: f32) -> Option<TriggerSignal> {
        let mut signal = None;

        if self.control == Control::Direct && self.held && dt > 0.0 {
            let velocity = self.pulled_this_tick / dt;
            self.pulled_this_tick = 0.0;
            if self.pull >= self.max_pull && !self.fired {
                if velocity >= self.min_pull_speed {
                    self.fired = true;
                    signal = Some(TriggerSignal::Activate);
                } else {
                    // Too slow: the cord slips out of the hand and retracts.
                    self.release();
                }
            }
        }

        if self.failing {
            self.pull = (self.pull + self.fail_speed * dt).min(self.max_pull);
            if self.pull >= self.max_pull {
                self.release();
            }
        } else if !self.held {
            self.pull = (self.pull - self.retract_speed * dt).max(0.0);
        }

        signal
    }

    fn control(&self) -> Control {
        self.control
    }

    fn remote_fail(&mut self) -> bool {
        if self.control != Control::Idle {
            return false;
        }
        self.control = Control::Remote;
        self.held = true;
        self.failing = true;
        self.pull = 0.0;
        true
    }

    fn supports_failed_attempt(&self) -> bool {
        true
    }
}

// ---------------------------------------------------------------------------
// Station-facing wrapper
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TriggerKind {
    Button(Button),
    Lever(Lever),
    Ripcord(Ripcord),
}

/// The trigger mounted on a station plus a count of accepted remote activations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerState {
    pub kind: TriggerKind,
    pub remote_activations: u32,
}

impl TriggerState {
    pub fn new(trigger_type: TriggerType, constants: &Constants) -> Self {
        let kind = match trigger_type {
            TriggerType::Button => TriggerKind::Button(Button::default()),
            TriggerType::Lever => TriggerKind::Lever(Lever::new(constants)),
            TriggerType::Ripcord => TriggerKind::Ripcord(Ripcord::new(constants)),
        };
        Self {
            kind,
            remote_activations: 0,
        }
    }

    pub fn trigger_type(&self) -> TriggerType {
        match self.kind {
            TriggerKind::Button(_) => TriggerType::Button,
            TriggerKind::Lever(_) => TriggerType::Lever,
            TriggerKind::Ripcord(_) => TriggerType::Ripcord,
        }
    }

    fn adapter(&self) -> &dyn TriggerAdapter {
        match &self.kind {
            TriggerKind::Button(b) => b,
            TriggerKind::Lever(l) => l,
            TriggerKind::Ripcord(r) => r,
        }
    }

    fn adapter_mut(&mut self) -> &mut dyn TriggerAdapter {
        match &mut self.kind {
            TriggerKind::Button(b) => b,
            TriggerKind::Lever(l) => l,
            TriggerKind::Ripcord(r) => r,
        }
    }

    pub fn begin_interaction(&mut self) -> Option<TriggerSignal> {
        self.adapter_mut().begin_interaction()
    }

    pub fn continuous_input(&mut self, delta: f32) {
        self.adapter_mut().continuous_input(delta);
    }

    pub fn end_interaction(&mut self) -> Option<TriggerSignal> {
        self.adapter_mut().end_interaction()
    }

    pub fn remote_activate(&mut self, intensity: f32) -> RemoteStart {
        let start = self.adapter_mut().remote_activate(intensity);
        if start != RemoteStart::Busy {
            self.remote_activations += 1;
        }
        start
    }

    pub fn remote_fail(&mut self) -> bool {
        self.adapter_mut().remote_fail()
    }

    pub fn stop_operating(&mut self) -> Option<TriggerSignal> {
        self.adapter_mut().stop_operating()
    }

    pub fn advance(&mut self, dt: f32) -> Option<TriggerSignal> {
        self.adapter_mut().advance(dt)
    }

    pub fn control(&self) -> Control {
        self.adapter().control()
    }

    pub fn supports_failed_attempt(&self) -> bool {
        self.adapter().supports_failed_attempt()
    }

    /// True while an employee-driven operation still owns the trigger.
    pub fn is_remote_busy(&self) -> bool {
        self.control() == Control::Remote
    }
}
