use super::*;
use crate::test_fixtures::{
    base_content, base_state, command, employee, make_rng, place_complete_cup, place_cup, station,
};
use rand::Rng;

mod commands;
mod employees;

// --- Shared test helpers ------------------------------------------------

/// One tick at debug level with `commands` scheduled for it.
fn step(
    state: &mut LineState,
    content: &LineContent,
    rng: &mut impl Rng,
    commands: Vec<Command>,
) -> Vec<EventEnvelope> {
    let envelopes: Vec<CommandEnvelope> = commands
        .into_iter()
        .map(|c| command(state, c))
        .collect();
    tick(state, &envelopes, content, rng, EventLevel::Debug)
}

fn run_ticks(
    state: &mut LineState,
    content: &LineContent,
    rng: &mut impl Rng,
    ticks: usize,
) -> Vec<EventEnvelope> {
    let mut events = Vec::new();
    for _ in 0..ticks {
        events.extend(tick(state, &[], content, rng, EventLevel::Debug));
    }
    events
}

fn count(events: &[EventEnvelope], pred: impl Fn(&Event) -> bool) -> usize {
    events.iter().filter(|e| pred(&e.event)).count()
}

fn press(station_id: &str) -> Vec<Command> {
    vec![
        Command::BeginInteraction {
            station_id: station(station_id),
        },
        Command::EndInteraction {
            station_id: station(station_id),
        },
    ]
}

fn move_cup(cup_id: &CupId, to: Option<&str>) -> Command {
    Command::MoveCup {
        cup_id: cup_id.clone(),
        to: to.map(station),
    }
}

fn place_employee(employee_id: &str, station_id: &str) -> Command {
    Command::PlaceEmployee {
        employee_id: employee(employee_id),
        station_id: station(station_id),
    }
}

fn rejected(events: &[EventEnvelope]) -> usize {
    count(events, |e| matches!(e, Event::CommandRejected { .. }))
}

fn cup<'a>(state: &'a LineState, cup_id: &CupId) -> &'a CupState {
    &state.cups[cup_id]
}

fn slot_busy(state: &LineState, station_id: &str, slot: usize) -> bool {
    state.stations[&station(station_id)].cup_slots[slot].is_busy()
}

fn occupant<'a>(state: &'a LineState, station_id: &str, slot: usize) -> Option<&'a CupId> {
    state.stations[&station(station_id)].cup_slots[slot].occupant()
}

// --- Engine-wide behavior -------------------------------------------------

#[test]
fn test_tick_increments_and_ids_are_sequential() {
    let content = base_content();
    let mut state = base_state(&content);
    let mut rng = make_rng();

    let events = step(&mut state, &content, &mut rng, press("dispenser"));
    assert_eq!(state.meta.tick, 1);
    assert!(!events.is_empty());
    for (i, envelope) in events.iter().enumerate() {
        assert_eq!(envelope.id.0, format!("evt_{i:06}"));
        assert_eq!(envelope.tick, 0);
    }
}

#[test]
fn test_commands_for_later_ticks_wait() {
    let content = base_content();
    let mut state = base_state(&content);
    let mut rng = make_rng();

    let later = CommandEnvelope {
        id: CommandId("cmd_later".to_string()),
        issued_tick: 0,
        execute_at_tick: 1,
        command: Command::BeginInteraction {
            station_id: station("dispenser"),
        },
    };
    let first = tick(&mut state, &[later.clone()], &content, &mut rng, EventLevel::Debug);
    assert_eq!(count(&first, |e| matches!(e, Event::CupDispensed { .. })), 0);

    let second = tick(&mut state, &[later], &content, &mut rng, EventLevel::Debug);
    assert_eq!(count(&second, |e| matches!(e, Event::CupDispensed { .. })), 1);
}

#[test]
fn test_debug_events_hidden_at_normal_level() {
    let content = base_content();
    let mut state = base_state(&content);
    let mut rng = make_rng();

    let bad = command(
        &state,
        Command::BeginInteraction {
            station_id: station("nowhere"),
        },
    );
    let events = tick(&mut state, &[bad], &content, &mut rng, EventLevel::Normal);
    assert_eq!(rejected(&events), 0);
}

#[test]
fn test_same_seed_same_events() {
    let content = base_content();
    let run = || {
        let mut state = base_state(&content);
        let mut rng = make_rng();
        place_cup(&mut state, &content, &station("sealer"), 0);
        let place = vec![place_employee("emp_0001", "sealer")];
        let mut events = step(&mut state, &content, &mut rng, place);
        events.extend(run_ticks(&mut state, &content, &mut rng, 60));
        serde_json::to_string(&events).unwrap()
    };
    assert_eq!(run(), run());
}

#[test]
fn test_state_round_trips_through_json() {
    let content = base_content();
    let mut state = base_state(&content);
    let mut rng = make_rng();
    place_cup(&mut state, &content, &station("tea"), 0);
    step(&mut state, &content, &mut rng, vec![place_employee("emp_0001", "tea")]);
    run_ticks(&mut state, &content, &mut rng, 5);

    let json = serde_json::to_string(&state).unwrap();
    let restored: LineState = serde_json::from_str(&json).unwrap();
    assert_eq!(restored.meta.tick, state.meta.tick);
    assert!(restored.stations[&station("tea")].work.is_some());
}
