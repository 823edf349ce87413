use super::*;

fn pick_up(employee_id: &str) -> Command {
    Command::PickUpEmployee {
        employee_id: employee(employee_id),
    }
}

#[test]
fn test_unknown_targets_are_rejected() {
    let content = base_content();
    let mut state = base_state(&content);
    let mut rng = make_rng();
    let cup_id = place_cup(&mut state, &content, &station("tea"), 0);

    let events = step(
        &mut state,
        &content,
        &mut rng,
        vec![
            move_cup(&CupId("cup_9999".to_string()), Some("tea")),
            move_cup(&cup_id, Some("nowhere")),
            place_employee("emp_9999", "tea"),
            place_employee("emp_0001", "nowhere"),
            pick_up("emp_9999"),
        ],
    );
    assert_eq!(rejected(&events), 5);
    // A bad target must not dislodge the cup.
    assert_eq!(occupant(&state, "tea", 0), Some(&cup_id));
}

#[test]
fn test_move_cup_between_stations() {
    let content = base_content();
    let mut state = base_state(&content);
    let mut rng = make_rng();
    let cup_id = place_cup(&mut state, &content, &station("dispenser"), 0);

    let events = step(&mut state, &content, &mut rng, vec![move_cup(&cup_id, Some("tea"))]);
    assert_eq!(count(&events, |e| matches!(e, Event::CupReleased { .. })), 1);
    assert_eq!(count(&events, |e| matches!(e, Event::CupSnapped { .. })), 1);
    assert_eq!(occupant(&state, "dispenser", 0), None);
    assert_eq!(occupant(&state, "tea", 0), Some(&cup_id));
    assert!(!cup(&state, &cup_id).physics_enabled);
}

#[test]
fn test_move_cup_to_floor_turns_physics_on() {
    let content = base_content();
    let mut state = base_state(&content);
    let mut rng = make_rng();
    let cup_id = place_cup(&mut state, &content, &station("tea"), 0);

    let events = step(&mut state, &content, &mut rng, vec![move_cup(&cup_id, None)]);
    assert_eq!(rejected(&events), 0);
    assert_eq!(occupant(&state, "tea", 0), None);
    let moved = cup(&state, &cup_id);
    assert!(!moved.is_snapped());
    assert!(moved.physics_enabled);
}

#[test]
fn test_move_into_full_station_leaves_cup_loose() {
    let content = base_content();
    let mut state = base_state(&content);
    let mut rng = make_rng();
    place_cup(&mut state, &content, &station("dispenser"), 0);
    let cup_id = place_cup(&mut state, &content, &station("tea"), 0);

    let events = step(&mut state, &content, &mut rng, vec![move_cup(&cup_id, Some("dispenser"))]);
    assert_eq!(rejected(&events), 1);
    assert_eq!(count(&events, |e| matches!(e, Event::CupReleased { .. })), 1);
    assert_eq!(occupant(&state, "tea", 0), None);
    let moved = cup(&state, &cup_id);
    assert!(!moved.is_snapped());
    assert!(moved.physics_enabled);
}

#[test]
fn test_move_cup_into_dormant_slot_is_refused() {
    let content = base_content();
    let mut state = base_state(&content);
    let mut rng = make_rng();
    place_cup(&mut state, &content, &station("boba"), 0);
    let cup_id = place_cup(&mut state, &content, &station("dispenser"), 0);

    let events = step(&mut state, &content, &mut rng, vec![move_cup(&cup_id, Some("boba"))]);
    assert_eq!(rejected(&events), 1);
    assert_eq!(occupant(&state, "boba", 1), None);
}

#[test]
fn test_place_employee_moves_between_stations() {
    let content = base_content();
    let mut state = base_state(&content);
    let mut rng = make_rng();

    step(&mut state, &content, &mut rng, vec![place_employee("emp_0001", "tea")]);
    let events = step(&mut state, &content, &mut rng, vec![place_employee("emp_0001", "boba")]);

    assert_eq!(count(&events, |e| matches!(e, Event::EmployeeUnassigned { .. })), 1);
    assert_eq!(state.stations[&station("tea")].active_employee, None);
    assert_eq!(
        state.stations[&station("boba")].active_employee,
        Some(employee("emp_0001"))
    );
    assert_eq!(
        state.employees[&employee("emp_0001")].current_station,
        Some(station("boba"))
    );
}

#[test]
fn test_full_station_refuses_second_employee() {
    let content = base_content();
    let mut state = base_state(&content);
    let mut rng = make_rng();

    step(&mut state, &content, &mut rng, vec![place_employee("emp_0001", "sealer")]);
    let events = step(&mut state, &content, &mut rng, vec![place_employee("emp_0002", "sealer")]);

    assert_eq!(rejected(&events), 1);
    assert_eq!(state.employees[&employee("emp_0002")].current_station, None);
    assert_eq!(
        state.stations[&station("sealer")].active_employee,
        Some(employee("emp_0001"))
    );
}

#[test]
fn test_refused_move_keeps_employee_seated() {
    let content = base_content();
    let mut state = base_state(&content);
    let mut rng = make_rng();

    step(
        &mut state,
        &content,
        &mut rng,
        vec![
            place_employee("emp_0001", "sealer"),
            place_employee("emp_0002", "tea"),
        ],
    );
    let events = step(&mut state, &content, &mut rng, vec![place_employee("emp_0002", "sealer")]);

    assert_eq!(rejected(&events), 1);
    assert_eq!(
        state.employees[&employee("emp_0002")].current_station,
        Some(station("tea"))
    );
}

#[test]
fn test_standby_employee_is_promoted() {
    let content = base_content();
    let mut state = base_state(&content);
    let mut rng = make_rng();

    let events = step(
        &mut state,
        &content,
        &mut rng,
        vec![
            place_employee("emp_0001", "tea"),
            place_employee("emp_0002", "tea"),
        ],
    );
    assert_eq!(
        count(&events, |e| matches!(e, Event::EmployeeAssigned { active: false, .. })),
        1
    );
    let tea = &state.stations[&station("tea")];
    assert_eq!(tea.active_employee, Some(employee("emp_0001")));
    assert_eq!(tea.standby_employees().count(), 1);

    let events = step(&mut state, &content, &mut rng, vec![pick_up("emp_0001")]);
    assert_eq!(
        count(&events, |e| matches!(e, Event::EmployeeAssigned { active: true, .. })),
        1
    );
    let tea = &state.stations[&station("tea")];
    assert_eq!(tea.active_employee, Some(employee("emp_0002")));
    assert_eq!(tea.standby_employees().count(), 0);
    assert_eq!(state.employees[&employee("emp_0001")].current_station, None);
}

#[test]
fn test_promoted_employee_picks_up_the_work() {
    let content = base_content();
    let mut state = base_state(&content);
    let mut rng = make_rng();
    let cup_id = place_cup(&mut state, &content, &station("tea"), 0);

    step(
        &mut state,
        &content,
        &mut rng,
        vec![
            place_employee("emp_0001", "tea"),
            place_employee("emp_0002", "tea"),
        ],
    );
    run_ticks(&mut state, &content, &mut rng, 10);
    step(&mut state, &content, &mut rng, vec![pick_up("emp_0001")]);
    run_ticks(&mut state, &content, &mut rng, 300);

    assert!(cup(&state, &cup_id).is_tea_full());
}

#[test]
fn test_picking_up_only_worker_halts_the_pour() {
    let content = base_content();
    let mut state = base_state(&content);
    let mut rng = make_rng();
    let cup_id = place_cup(&mut state, &content, &station("tea"), 0);

    step(&mut state, &content, &mut rng, vec![place_employee("emp_0001", "tea")]);
    run_ticks(&mut state, &content, &mut rng, 25);
    let events = step(&mut state, &content, &mut rng, vec![pick_up("emp_0001")]);
    assert_eq!(count(&events, |e| matches!(e, Event::WorkLoopStopped { .. })), 1);
    run_ticks(&mut state, &content, &mut rng, 5);
    let fill = cup(&state, &cup_id).tea_fill;
    assert!(fill > 0.0);

    let events = run_ticks(&mut state, &content, &mut rng, 40);
    assert_eq!(count(&events, |e| matches!(e, Event::RemoteActivation { .. })), 0);
    assert_eq!(count(&events, |e| matches!(e, Event::StationTriggered { .. })), 0);
    assert!((cup(&state, &cup_id).tea_fill - fill).abs() < 1e-6);
    let tea = &state.stations[&station("tea")];
    assert_eq!(tea.active_employee, None);
    assert!(tea.work.is_none());
}

#[test]
fn test_pick_up_unassigned_employee_is_rejected() {
    let content = base_content();
    let mut state = base_state(&content);
    let mut rng = make_rng();

    let events = step(&mut state, &content, &mut rng, vec![pick_up("emp_0002")]);
    assert_eq!(rejected(&events), 1);
}
