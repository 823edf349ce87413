use super::*;
use crate::work::WorkPhase;
use rand::rngs::mock::StepRng;

fn emp<'a>(state: &'a LineState, id: &str) -> &'a EmployeeState {
    &state.employees[&employee(id)]
}

#[test]
fn test_employee_pours_tea_without_player_input() {
    let content = base_content();
    let mut state = base_state(&content);
    let mut rng = make_rng();
    let cup_id = place_cup(&mut state, &content, &station("tea"), 0);

    let mut events = step(&mut state, &content, &mut rng, vec![place_employee("emp_0001", "tea")]);
    events.extend(run_ticks(&mut state, &content, &mut rng, 200));

    assert_eq!(count(&events, |e| matches!(e, Event::RemoteActivation { .. })), 1);
    assert_eq!(count(&events, |e| matches!(e, Event::CupCompletedByEmployee { .. })), 1);
    assert!(cup(&state, &cup_id).is_tea_full());
    let tea = &state.stations[&station("tea")];
    assert!(tea.work.is_none());
    assert!(!tea.is_processing());
}

#[test]
fn test_loop_does_not_start_without_cup() {
    let content = base_content();
    let mut state = base_state(&content);
    let mut rng = make_rng();

    let events = step(&mut state, &content, &mut rng, vec![place_employee("emp_0001", "tea")]);
    assert_eq!(count(&events, |e| matches!(e, Event::WorkLoopStarted { .. })), 0);
    assert_eq!(
        state.stations[&station("tea")].active_employee,
        Some(employee("emp_0001"))
    );
}

#[test]
fn test_cup_arrival_wakes_idle_worker() {
    let content = base_content();
    let mut state = base_state(&content);
    let mut rng = make_rng();
    let cup_id = place_cup(&mut state, &content, &station("dispenser"), 0);

    step(&mut state, &content, &mut rng, vec![place_employee("emp_0001", "tea")]);
    let events = step(&mut state, &content, &mut rng, vec![move_cup(&cup_id, Some("tea"))]);
    assert_eq!(count(&events, |e| matches!(e, Event::WorkLoopStarted { .. })), 1);
    assert_eq!(count(&events, |e| matches!(e, Event::RemoteActivation { .. })), 1);
}

#[test]
fn test_removing_cup_stops_loop() {
    let content = base_content();
    let mut state = base_state(&content);
    let mut rng = make_rng();
    let cup_id = place_cup(&mut state, &content, &station("tea"), 0);

    step(&mut state, &content, &mut rng, vec![place_employee("emp_0001", "tea")]);
    run_ticks(&mut state, &content, &mut rng, 20);
    let mut events = step(&mut state, &content, &mut rng, vec![move_cup(&cup_id, None)]);
    events.extend(run_ticks(&mut state, &content, &mut rng, 2));

    assert_eq!(count(&events, |e| matches!(e, Event::WorkLoopStopped { .. })), 1);
    let tea = &state.stations[&station("tea")];
    assert!(tea.work.is_none());
    assert!(!tea.is_processing());
}

#[test]
fn test_employee_presses_boba_until_full() {
    let content = base_content();
    let mut state = base_state(&content);
    let mut rng = make_rng();
    let cup_id = place_cup(&mut state, &content, &station("boba"), 0);

    let mut events = step(&mut state, &content, &mut rng, vec![place_employee("emp_0001", "boba")]);
    events.extend(run_ticks(&mut state, &content, &mut rng, 100));

    assert!(cup(&state, &cup_id).is_boba_full());
    assert_eq!(count(&events, |e| matches!(e, Event::RemoteActivation { .. })), 5);
    assert_eq!(count(&events, |e| matches!(e, Event::BobaSpilled { .. })), 0);
    assert_eq!(count(&events, |e| matches!(e, Event::CupCompletedByEmployee { .. })), 1);
}

#[test]
fn test_rested_employee_seals_on_first_pull() {
    let content = base_content();
    let mut state = base_state(&content);
    let mut rng = make_rng();
    let cup_id = place_cup(&mut state, &content, &station("sealer"), 0);

    let place = vec![place_employee("emp_0001", "sealer")];
    let mut events = step(&mut state, &content, &mut rng, place);
    events.extend(run_ticks(&mut state, &content, &mut rng, 60));

    assert_eq!(count(&events, |e| matches!(e, Event::AttemptFailed { .. })), 0);
    assert_eq!(count(&events, |e| matches!(e, Event::WorkRoll { .. })), 1);
    assert_eq!(count(&events, |e| matches!(e, Event::CupSealed { .. })), 1);
    assert!(cup(&state, &cup_id).sealed);
}

#[test]
fn test_failed_roll_plays_failure_and_retries() {
    let content = base_content();
    let mut state = base_state(&content);
    // Always rolls just under 1.0: any p below 1 fails.
    let mut rng = StepRng::new(u64::MAX, 0);
    let cup_id = place_cup(&mut state, &content, &station("sealer"), 0);
    state.employees.get_mut(&employee("emp_0001")).unwrap().fatigue = 1;

    let first = step(&mut state, &content, &mut rng, vec![place_employee("emp_0001", "sealer")]);
    assert_eq!(count(&first, |e| matches!(e, Event::AttemptFailed { .. })), 1);
    assert_eq!(count(&first, |e| matches!(e, Event::RemoteActivation { .. })), 0);
    let work = state.stations[&station("sealer")].work.as_ref().unwrap();
    assert_eq!(work.phase, WorkPhase::FailedAttempt);

    let events = run_ticks(&mut state, &content, &mut rng, 80);
    assert!(count(&events, |e| matches!(e, Event::AttemptFailed { .. })) >= 2);
    assert_eq!(count(&events, |e| matches!(e, Event::StationTriggered { .. })), 0);
    assert!(!cup(&state, &cup_id).sealed);
    assert_eq!(emp(&state, "emp_0001").fatigue, 1);
}

#[test]
fn test_player_cannot_pull_during_failed_attempt() {
    let content = base_content();
    let mut state = base_state(&content);
    let mut rng = StepRng::new(u64::MAX, 0);
    let cup_id = place_cup(&mut state, &content, &station("sealer"), 0);
    state.employees.get_mut(&employee("emp_0001")).unwrap().fatigue = 2;

    step(&mut state, &content, &mut rng, vec![place_employee("emp_0001", "sealer")]);
    step(
        &mut state,
        &content,
        &mut rng,
        vec![
            Command::BeginInteraction {
                station_id: station("sealer"),
            },
            Command::ContinuousInput {
                station_id: station("sealer"),
                delta: 1.0,
            },
        ],
    );
    assert!(!slot_busy(&state, "sealer", 0));
    assert!(!cup(&state, &cup_id).sealed);
}

#[test]
fn test_fatigue_check_puts_worker_to_sleep_and_wake_restores() {
    let mut content = base_content();
    content.constants.fatigue_roll_one_in = 1;
    let mut state = base_state(&content);
    let mut rng = make_rng();
    let cup_id = place_cup(&mut state, &content, &station("boba"), 0);
    for _ in 0..content.constants.cup_boba_capacity - 1 {
        state.cups.get_mut(&cup_id).unwrap().add_boba();
    }
    {
        let worker = state.employees.get_mut(&employee("emp_0001")).unwrap();
        worker.fatigue = 4;
        worker.cups_until_check = 1;
    }

    let mut events = step(&mut state, &content, &mut rng, vec![place_employee("emp_0001", "boba")]);
    events.extend(run_ticks(&mut state, &content, &mut rng, 40));

    assert_eq!(count(&events, |e| matches!(e, Event::EmployeeFellAsleep { .. })), 1);
    assert!(emp(&state, "emp_0001").asleep);
    assert!(emp(&state, "emp_0001").effective_work_speed(&content.constants).abs() < 1e-5);

    let events = step(
        &mut state,
        &content,
        &mut rng,
        vec![Command::WakeEmployee {
            employee_id: employee("emp_0001"),
        }],
    );
    assert_eq!(count(&events, |e| matches!(e, Event::EmployeeWoke { .. })), 1);
    let worker = emp(&state, "emp_0001");
    assert!(!worker.asleep);
    assert_eq!(worker.fatigue, content.constants.rested_fatigue);
}

#[test]
fn test_asleep_worker_does_not_start() {
    let content = base_content();
    let mut state = base_state(&content);
    let mut rng = make_rng();
    place_cup(&mut state, &content, &station("tea"), 0);
    state.employees.get_mut(&employee("emp_0001")).unwrap().asleep = true;

    let events = step(&mut state, &content, &mut rng, vec![place_employee("emp_0001", "tea")]);
    assert_eq!(count(&events, |e| matches!(e, Event::WorkLoopStarted { .. })), 0);

    let events = step(
        &mut state,
        &content,
        &mut rng,
        vec![Command::WakeEmployee {
            employee_id: employee("emp_0001"),
        }],
    );
    assert_eq!(count(&events, |e| matches!(e, Event::WorkLoopStarted { .. })), 1);
}

#[test]
fn test_waking_awake_employee_is_rejected() {
    let content = base_content();
    let mut state = base_state(&content);
    let mut rng = make_rng();

    let events = step(
        &mut state,
        &content,
        &mut rng,
        vec![Command::WakeEmployee {
            employee_id: employee("emp_0002"),
        }],
    );
    assert_eq!(rejected(&events), 1);
}

#[test]
fn test_chair_heals_over_time() {
    let content = base_content();
    let mut state = base_state(&content);
    let mut rng = make_rng();
    state.employees.get_mut(&employee("emp_0001")).unwrap().fatigue = 3;

    step(&mut state, &content, &mut rng, vec![place_employee("emp_0001", "chair")]);
    let events = run_ticks(&mut state, &content, &mut rng, 50);

    assert_eq!(emp(&state, "emp_0001").fatigue, 1);
    assert_eq!(count(&events, |e| matches!(e, Event::FatigueChanged { .. })), 2);
}

#[test]
fn test_chair_heals_but_does_not_wake() {
    let content = base_content();
    let mut state = base_state(&content);
    let mut rng = make_rng();
    {
        let worker = state.employees.get_mut(&employee("emp_0001")).unwrap();
        worker.fatigue = 5;
        worker.asleep = true;
    }

    step(&mut state, &content, &mut rng, vec![place_employee("emp_0001", "chair")]);
    run_ticks(&mut state, &content, &mut rng, 50);

    let worker = emp(&state, "emp_0001");
    assert_eq!(worker.fatigue, 3);
    assert!(worker.asleep);
}

#[test]
fn test_chair_stops_healing_at_zero() {
    let content = base_content();
    let mut state = base_state(&content);
    let mut rng = make_rng();

    step(&mut state, &content, &mut rng, vec![place_employee("emp_0001", "chair")]);
    let events = run_ticks(&mut state, &content, &mut rng, 50);
    assert_eq!(emp(&state, "emp_0001").fatigue, 0);
    assert_eq!(count(&events, |e| matches!(e, Event::FatigueChanged { .. })), 0);
}
