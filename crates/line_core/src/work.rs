//! Employee work loop.
//!
//! A loop is a value stored on the station: the worker it belongs to plus the
//! phase it is suspended in. `step_work` resumes it once per tick. Dropping the
//! value (see `stop_employee_work`) is the only way to cancel it, and that
//! always happens between steps.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::employee::CompletionOutcome;
use crate::station::{dispatch_signal, stop_employee_work, LineCtx, StationState};
use crate::trigger::{RemoteStart, TriggerSignal, TriggerState};
use crate::{Constants, EmployeeId, Event, EventLevel};

/// Floor for the work speed used as a divisor.
const MIN_WORK_SPEED: f32 = 0.01;

/// How a worker operates a station type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkStyle {
    /// Not workable by employees.
    None,
    /// Start the trigger once and hold it until the cup is done (lever).
    HoldUntilComplete,
    /// Press, wait a fatigue-scaled delay, check, repeat (button).
    RepeatPress,
    /// One pull, then wait for the payload to finish (ripcord).
    SinglePull,
    /// Sit and recover.
    Rest,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum WorkPhase {
    /// Ready to try the trigger once the station is idle.
    Waiting,
    /// Trigger handed over; waiting on the payload or the cup.
    Operating,
    Cooldown { remaining: f32 },
    /// The failed-pull sequence is playing.
    FailedAttempt,
    RetryDelay { remaining: f32 },
    Resting { remaining: f32 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkLoop {
    pub employee_id: EmployeeId,
    pub phase: WorkPhase,
}

impl WorkLoop {
    pub(crate) fn start(employee_id: EmployeeId, style: WorkStyle, constants: &Constants) -> Self {
        let phase = match style {
            WorkStyle::Rest => WorkPhase::Resting {
                remaining: constants.chair_heal_interval,
            },
            _ => WorkPhase::Waiting,
        };
        Self { employee_id, phase }
    }
}

/// Resumes the station's work loop for one tick.
pub(crate) fn step_work(station: &mut StationState, ctx: &mut LineCtx<'_>, rng: &mut impl Rng) {
    let Some(work) = station.work.clone() else {
        return;
    };
    let employee_id = work.employee_id;
    let Some(employee) = ctx.employees.get(&employee_id) else {
        warn!(station = %station.id, employee = %employee_id, "work loop for unknown employee");
        stop_employee_work(station, ctx);
        return;
    };
    let still_assigned = employee.current_station.as_ref() == Some(&station.id)
        && station.active_employee.as_ref() == Some(&employee_id);
    if !still_assigned {
        stop_employee_work(station, ctx);
        return;
    }

    let style = station.work_style();
    if style == WorkStyle::Rest {
        step_rest(station, ctx, &employee_id, work.phase);
        return;
    }
    if employee.asleep || !station.has_any_cup() {
        stop_employee_work(station, ctx);
        return;
    }

    let dt = ctx.constants().tick_seconds;
    let next = match work.phase {
        WorkPhase::Waiting => attempt(station, ctx, rng, &employee_id, style),
        WorkPhase::Operating => match style {
            WorkStyle::HoldUntilComplete => {
                if station.check_completion(ctx.cups) {
                    finish_cup(station, ctx, rng, &employee_id);
                    None
                } else {
                    Some(WorkPhase::Operating)
                }
            }
            _ => {
                let trigger_busy = station
                    .trigger
                    .as_ref()
                    .is_some_and(TriggerState::is_remote_busy);
                if station.is_processing() || trigger_busy {
                    Some(WorkPhase::Operating)
                } else {
                    check_or_wait(station, ctx, rng, &employee_id)
                }
            }
        },
        WorkPhase::Cooldown { remaining } => {
            let remaining = remaining - dt;
            if remaining > 0.0 {
                Some(WorkPhase::Cooldown { remaining })
            } else {
                check_or_wait(station, ctx, rng, &employee_id)
            }
        }
        WorkPhase::FailedAttempt => {
            let playing = station
                .trigger
                .as_ref()
                .is_some_and(TriggerState::is_remote_busy);
            Some(if playing {
                WorkPhase::FailedAttempt
            } else {
                WorkPhase::RetryDelay {
                    remaining: ctx.constants().work_retry_delay,
                }
            })
        }
        WorkPhase::RetryDelay { remaining } => {
            let remaining = remaining - dt;
            Some(if remaining > 0.0 {
                WorkPhase::RetryDelay { remaining }
            } else {
                WorkPhase::Waiting
            })
        }
        WorkPhase::Resting { .. } => Some(WorkPhase::Waiting),
    };

    if let (Some(phase), Some(work)) = (next, station.work.as_mut()) {
        work.phase = phase;
    }
}

/// Finish the cup if the station's predicate holds, otherwise go again.
fn check_or_wait(
    station: &mut StationState,
    ctx: &mut LineCtx<'_>,
    rng: &mut impl Rng,
    employee_id: &EmployeeId,
) -> Option<WorkPhase> {
    if station.check_completion(ctx.cups) {
        finish_cup(station, ctx, rng, employee_id);
        return None;
    }
    Some(WorkPhase::Waiting)
}

/// One try at the trigger. Ripcord stations roll for success first.
fn attempt(
    station: &mut StationState,
    ctx: &mut LineCtx<'_>,
    rng: &mut impl Rng,
    employee_id: &EmployeeId,
    style: WorkStyle,
) -> Option<WorkPhase> {
    if station.is_processing() {
        return Some(WorkPhase::Waiting);
    }
    if station.check_completion(ctx.cups) {
        finish_cup(station, ctx, rng, employee_id);
        return None;
    }
    let Some(employee) = ctx.employees.get(employee_id) else {
        return Some(WorkPhase::Waiting);
    };
    let speed = employee.effective_work_speed(ctx.constants());
    let p = employee.success_probability();

    let Some(trigger) = station.trigger.as_mut() else {
        warn!(station = %station.id, "employee assigned to station without trigger");
        stop_employee_work(station, ctx);
        return None;
    };

    if trigger.supports_failed_attempt() {
        let rolled: f32 = rng.gen();
        let failed = rolled >= p;
        let started_fail = failed && trigger.remote_fail();
        if ctx.event_level == EventLevel::Debug {
            ctx.emit(Event::WorkRoll {
                employee_id: employee_id.clone(),
                station_id: station.id.clone(),
                p,
                rolled,
            });
        }
        if failed {
            if !started_fail {
                return Some(WorkPhase::Waiting);
            }
            ctx.emit(Event::AttemptFailed {
                employee_id: employee_id.clone(),
                station_id: station.id.clone(),
            });
            return Some(WorkPhase::FailedAttempt);
        }
    }

    let start = trigger.remote_activate(speed);
    if start == RemoteStart::Busy {
        return Some(WorkPhase::Waiting);
    }
    ctx.emit(Event::RemoteActivation {
        employee_id: employee_id.clone(),
        station_id: station.id.clone(),
        intensity: speed,
    });
    if start == RemoteStart::Fired {
        dispatch_signal(station, ctx, TriggerSignal::Activate);
    }

    Some(match style {
        WorkStyle::RepeatPress => {
            let constants = ctx.constants();
            WorkPhase::Cooldown {
                remaining: constants.boba_time_between_trigger
                    * constants.employee_press_delay_factor
                    / speed.max(MIN_WORK_SPEED),
            }
        }
        _ => WorkPhase::Operating,
    })
}

/// Credits the worker with a cup and ends the loop.
fn finish_cup(
    station: &mut StationState,
    ctx: &mut LineCtx<'_>,
    rng: &mut impl Rng,
    employee_id: &EmployeeId,
) {
    let constants = &ctx.content.constants;
    let Some(employee) = ctx.employees.get_mut(employee_id) else {
        stop_employee_work(station, ctx);
        return;
    };
    let before = employee.fatigue;
    let outcome = employee.on_cup_completed(constants, rng);
    let after = employee.fatigue;

    ctx.emit(Event::CupCompletedByEmployee {
        employee_id: employee_id.clone(),
        station_id: station.id.clone(),
    });
    if let CompletionOutcome::FatigueIncreased { fell_asleep } = outcome {
        ctx.emit(Event::FatigueChanged {
            employee_id: employee_id.clone(),
            before,
            after,
        });
        if fell_asleep {
            info!(employee = %employee_id, station = %station.id, "employee fell asleep");
            ctx.emit(Event::EmployeeFellAsleep {
                employee_id: employee_id.clone(),
            });
        }
    }
    stop_employee_work(station, ctx);
}

/// Chair loop: every interval, heal the seated worker.
fn step_rest(
    station: &mut StationState,
    ctx: &mut LineCtx<'_>,
    employee_id: &EmployeeId,
    phase: WorkPhase,
) {
    let constants = ctx.constants();
    let (dt, interval, amount) = (
        constants.tick_seconds,
        constants.chair_heal_interval,
        constants.chair_heal_amount,
    );
    let remaining = match phase {
        WorkPhase::Resting { remaining } => remaining - dt,
        _ => interval,
    };
    let next = if remaining > 0.0 {
        remaining
    } else {
        if let Some(employee) = ctx.employees.get_mut(employee_id) {
            let before = employee.fatigue;
            employee.heal_fatigue(amount);
            let after = employee.fatigue;
            if after != before {
                ctx.emit(Event::FatigueChanged {
                    employee_id: employee_id.clone(),
                    before,
                    after,
                });
            }
        }
        interval
    };
    if let Some(work) = station.work.as_mut() {
        work.phase = WorkPhase::Resting { remaining: next };
    }
}
