//! Content loading and initial line construction shared by the runners.

use anyhow::{Context, Result};
use line_core::{
    Constants, Counters, EmployeeState, LayoutDef, LineContent, LineState, MetaState, StationState,
    StationType, TriggerType, UpgradeDef,
};
use rand::Rng;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use tracing::info;

const SCHEMA_VERSION: u32 = 1;

#[derive(Deserialize)]
struct UpgradesFile {
    content_version: String,
    upgrades: Vec<UpgradeDef>,
}

/// Validates loaded content, panicking on any authoring error.
///
/// Catches mistakes like: two stations sharing an id, more active cup slots
/// than the station has, an upgrade with no levels, or a trigger mounted on a
/// station that cannot take one.
pub fn validate_content(content: &LineContent) {
    validate_constants(&content.constants);

    let mut upgrade_ids = HashSet::new();
    for upgrade in &content.upgrades {
        assert!(
            upgrade_ids.insert(&upgrade.id),
            "duplicate upgrade id '{}'",
            upgrade.id,
        );
        assert!(
            !upgrade.stack_values.is_empty(),
            "upgrade '{}' has no levels",
            upgrade.id,
        );
    }

    let mut station_ids = HashSet::new();
    for station in &content.layout.stations {
        assert!(
            station_ids.insert(&station.id),
            "duplicate station id '{}'",
            station.id,
        );
        assert!(
            station.active_cup_slots <= station.cup_slots,
            "station '{}' has {} active cup slots but only {} slots",
            station.id,
            station.active_cup_slots,
            station.cup_slots,
        );
        if let Some(trigger) = station.trigger {
            assert!(
                trigger_fits(station.station_type, trigger),
                "station '{}' of type {:?} cannot mount a {:?} trigger",
                station.id,
                station.station_type,
                trigger,
            );
        }
    }

    let mut employee_ids = HashSet::new();
    for employee in &content.layout.employees {
        assert!(
            employee_ids.insert(&employee.id),
            "duplicate employee id '{}'",
            employee.id,
        );
        assert!(
            employee.base_speed > 0.0,
            "employee '{}' has non-positive base speed",
            employee.id,
        );
    }
}

fn validate_constants(c: &Constants) {
    assert!(c.tick_seconds > 0.0, "tick_seconds must be positive");
    assert!(c.cup_tea_capacity > 0.0, "cup_tea_capacity must be positive");
    assert!(c.cup_boba_capacity > 0, "cup_boba_capacity must be positive");
    assert!(
        c.lever_trigger_threshold <= c.lever_max_angle,
        "lever_trigger_threshold exceeds lever_max_angle",
    );
    assert!(
        c.rested_fatigue <= c.max_fatigue,
        "rested_fatigue exceeds max_fatigue",
    );
    assert!(c.fatigue_roll_one_in > 0, "fatigue_roll_one_in must be at least 1");
    assert!(
        c.cups_until_check_min <= c.cups_until_check_max,
        "cups_until_check_min exceeds cups_until_check_max",
    );
}

/// Trashcans and chairs are never triggered.
fn trigger_fits(station_type: StationType, trigger: TriggerType) -> bool {
    match station_type {
        StationType::Trashcan | StationType::EmployeeChair => false,
        StationType::CupSealer => trigger == TriggerType::Ripcord,
        StationType::CupDispenser
        | StationType::BobaMachine
        | StationType::TeaMachine
        | StationType::DeliveryTray => true,
    }
}

fn read_json<T: DeserializeOwned>(dir: &Path, file: &str) -> Result<T> {
    let path = dir.join(file);
    let text = std::fs::read_to_string(&path).with_context(|| format!("reading {file}"))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {file}"))
}

pub fn load_content(content_dir: &str) -> Result<LineContent> {
    let dir = Path::new(content_dir);
    let constants: Constants = read_json(dir, "constants.json")?;
    let upgrades_file: UpgradesFile = read_json(dir, "upgrades.json")?;
    let layout: LayoutDef = read_json(dir, "layout.json")?;

    let content = LineContent {
        content_version: upgrades_file.content_version,
        upgrades: upgrades_file.upgrades,
        layout,
        constants,
    };
    validate_content(&content);
    info!(
        content_version = %content.content_version,
        stations = content.layout.stations.len(),
        upgrades = content.upgrades.len(),
        "content loaded"
    );
    Ok(content)
}

/// Every station from the layout, every employee unassigned, no cups.
pub fn build_initial_state(content: &LineContent, seed: u64, rng: &mut impl Rng) -> LineState {
    let stations = content
        .layout
        .stations
        .iter()
        .map(|def| (def.id.clone(), StationState::from_def(def, content)))
        .collect();
    let employees: BTreeMap<_, _> = content
        .layout
        .employees
        .iter()
        .map(|def| {
            (
                def.id.clone(),
                EmployeeState::spawn(def, &content.constants, rng),
            )
        })
        .collect();

    LineState {
        meta: MetaState {
            tick: 0,
            seed,
            schema_version: SCHEMA_VERSION,
            content_version: content.content_version.clone(),
        },
        stations,
        cups: BTreeMap::new(),
        employees,
        counters: Counters {
            next_event_id: 1,
            ..Counters::default()
        },
    }
}
