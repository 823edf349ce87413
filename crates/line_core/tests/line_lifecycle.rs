//! Integration test: dispense → tea → boba → seal → deliver, by hand and with staff.

use line_core::test_fixtures::{base_content, base_state, command, employee, station};
use line_core::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

struct Line {
    content: LineContent,
    state: LineState,
    rng: ChaCha8Rng,
    events: Vec<EventEnvelope>,
}

impl Line {
    fn new() -> Self {
        let content = base_content();
        let state = base_state(&content);
        Self {
            content,
            state,
            rng: ChaCha8Rng::seed_from_u64(42),
            events: Vec::new(),
        }
    }

    fn step(&mut self, commands: Vec<Command>) {
        let envelopes: Vec<CommandEnvelope> = commands
            .into_iter()
            .map(|c| command(&self.state, c))
            .collect();
        let events = tick(
            &mut self.state,
            &envelopes,
            &self.content,
            &mut self.rng,
            EventLevel::Normal,
        );
        self.events.extend(events);
    }

    fn idle(&mut self, ticks: usize) {
        for _ in 0..ticks {
            self.step(vec![]);
        }
    }

    fn count(&self, pred: impl Fn(&Event) -> bool) -> usize {
        self.events.iter().filter(|e| pred(&e.event)).count()
    }

    fn press(&mut self, id: &str) {
        self.step(vec![
            Command::BeginInteraction {
                station_id: station(id),
            },
            Command::EndInteraction {
                station_id: station(id),
            },
        ]);
    }

    fn dispense(&mut self) -> CupId {
        self.press("dispenser");
        self.events
            .iter()
            .rev()
            .find_map(|e| match &e.event {
                Event::CupDispensed { cup_id, .. } => Some(cup_id.clone()),
                _ => None,
            })
            .expect("dispenser should create a cup")
    }

    fn move_cup(&mut self, cup_id: &CupId, to: &str) {
        self.step(vec![Command::MoveCup {
            cup_id: cup_id.clone(),
            to: Some(station(to)),
        }]);
    }

    fn cup(&self, cup_id: &CupId) -> &CupState {
        &self.state.cups[cup_id]
    }
}

#[test]
fn manual_line_sells_one_cup() {
    let mut line = Line::new();
    let cup_id = line.dispense();

    line.move_cup(&cup_id, "tea");
    line.step(vec![
        Command::BeginInteraction {
            station_id: station("tea"),
        },
        Command::ContinuousInput {
            station_id: station("tea"),
            delta: 15.0,
        },
    ]);
    line.idle(110);
    line.step(vec![Command::EndInteraction {
        station_id: station("tea"),
    }]);
    assert!(line.cup(&cup_id).is_tea_full(), "tea should be full after holding the lever");

    line.move_cup(&cup_id, "boba");
    for _ in 0..line.content.constants.cup_boba_capacity {
        line.press("boba");
        line.idle(10);
    }
    assert!(line.cup(&cup_id).is_boba_full());

    line.move_cup(&cup_id, "sealer");
    line.step(vec![
        Command::BeginInteraction {
            station_id: station("sealer"),
        },
        Command::ContinuousInput {
            station_id: station("sealer"),
            delta: 1.0,
        },
    ]);
    line.step(vec![Command::EndInteraction {
        station_id: station("sealer"),
    }]);
    line.idle(40);
    assert!(line.cup(&cup_id).is_complete());

    line.move_cup(&cup_id, "delivery");
    line.press("delivery");
    line.idle(40);

    assert_eq!(line.count(|e| matches!(e, Event::ContainerSold { .. })), 1);
    assert_eq!(line.count(|e| matches!(e, Event::DeliveryRejected { .. })), 0);
    assert_eq!(line.state.counters.cups_sold, 1);
    assert!(!line.state.cups.contains_key(&cup_id));
    let delivery = &line.state.stations[&station("delivery")];
    assert!(delivery.cup_slots.iter().all(|slot| !slot.is_occupied()));
}

#[test]
fn staffed_tea_station_fills_without_player() {
    let mut line = Line::new();
    let cup_id = line.dispense();

    line.step(vec![Command::PlaceEmployee {
        employee_id: employee("emp_0001"),
        station_id: station("tea"),
    }]);
    line.move_cup(&cup_id, "tea");
    line.idle(200);

    assert_eq!(line.count(|e| matches!(e, Event::RemoteActivation { .. })), 1);
    assert!(line.cup(&cup_id).is_tea_full());
    assert!(line.state.stations[&station("tea")].work.is_none());

    let metrics = compute_metrics(&line.state);
    assert_eq!(metrics.cups_in_flight, 1);
    assert_eq!(metrics.cups_tea_full, 1);
    assert_eq!(metrics.employees_assigned, 1);
    assert_eq!(metrics.active_work_loops, 0);
}
