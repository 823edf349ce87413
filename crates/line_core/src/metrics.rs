use crate::cup::CupState;
use crate::LineState;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

const METRICS_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub tick: u64,
    pub metrics_version: u32,

    pub cups_in_flight: u32,
    pub cups_tea_full: u32,
    pub cups_boba_full: u32,
    pub cups_sealed: u32,
    pub cups_complete: u32,
    pub cups_loose: u32,

    pub cups_sold: u64,
    pub cups_discarded: u64,

    pub employees_total: u32,
    pub employees_assigned: u32,
    pub employees_asleep: u32,
    pub avg_fatigue: f32,
    pub max_fatigue: u32,
    pub active_work_loops: u32,

    pub occupied_slots: u32,
    pub busy_slots: u32,
    pub stations_processing: u32,
    pub total_upgrade_levels: u32,
}

#[derive(Default)]
struct CupAccumulator {
    in_flight: u32,
    tea_full: u32,
    boba_full: u32,
    sealed: u32,
    complete: u32,
    loose: u32,
}

impl CupAccumulator {
    fn accumulate(&mut self, cup: &CupState) {
        self.in_flight += 1;
        if cup.is_tea_full() {
            self.tea_full += 1;
        }
        if cup.is_boba_full() {
            self.boba_full += 1;
        }
        if cup.is_sealed() {
            self.sealed += 1;
        }
        if cup.is_complete() {
            self.complete += 1;
        }
        if !cup.is_snapped() {
            self.loose += 1;
        }
    }
}

#[allow(clippy::cast_possible_truncation)]
pub fn compute_metrics(state: &LineState) -> MetricsSnapshot {
    let mut cups = CupAccumulator::default();
    for cup in state.cups.values() {
        cups.accumulate(cup);
    }

    let mut employees_assigned = 0_u32;
    let mut employees_asleep = 0_u32;
    let mut fatigue_sum = 0_u32;
    let mut max_fatigue = 0_u32;
    for employee in state.employees.values() {
        if employee.current_station.is_some() {
            employees_assigned += 1;
        }
        if employee.asleep {
            employees_asleep += 1;
        }
        fatigue_sum += employee.fatigue;
        max_fatigue = max_fatigue.max(employee.fatigue);
    }
    let employees_total = state.employees.len() as u32;
    let avg_fatigue = if employees_total > 0 {
        fatigue_sum as f32 / employees_total as f32
    } else {
        0.0
    };

    let mut active_work_loops = 0_u32;
    let mut occupied_slots = 0_u32;
    let mut busy_slots = 0_u32;
    let mut stations_processing = 0_u32;
    let mut total_upgrade_levels = 0_u32;
    for station in state.stations.values() {
        if station.work.is_some() {
            active_work_loops += 1;
        }
        occupied_slots += station.cup_slots.iter().filter(|s| s.is_occupied()).count() as u32;
        busy_slots += station.busy_slot_count() as u32;
        if station.is_processing() {
            stations_processing += 1;
        }
        total_upgrade_levels += station.upgrades.iter().map(|u| u.level).sum::<u32>();
    }

    MetricsSnapshot {
        tick: state.meta.tick,
        metrics_version: METRICS_VERSION,
        cups_in_flight: cups.in_flight,
        cups_tea_full: cups.tea_full,
        cups_boba_full: cups.boba_full,
        cups_sealed: cups.sealed,
        cups_complete: cups.complete,
        cups_loose: cups.loose,
        cups_sold: state.counters.cups_sold,
        cups_discarded: state.counters.cups_discarded,
        employees_total,
        employees_assigned,
        employees_asleep,
        avg_fatigue,
        max_fatigue,
        active_work_loops,
        occupied_slots,
        busy_slots,
        stations_processing,
        total_upgrade_levels,
    }
}

pub fn write_metrics_header(writer: &mut impl Write) -> std::io::Result<()> {
    writeln!(
        writer,
        "tick,metrics_version,\
         cups_in_flight,cups_tea_full,cups_boba_full,cups_sealed,cups_complete,cups_loose,\
         cups_sold,cups_discarded,\
         employees_total,employees_assigned,employees_asleep,avg_fatigue,max_fatigue,\
         active_work_loops,\
         occupied_slots,busy_slots,stations_processing,total_upgrade_levels"
    )
}

/// One CSV row, columns in header order.
pub fn append_metrics_row(
    writer: &mut impl Write,
    snapshot: &MetricsSnapshot,
) -> std::io::Result<()> {
    writeln!(
        writer,
        "{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{}",
        snapshot.tick,
        snapshot.metrics_version,
        snapshot.cups_in_flight,
        snapshot.cups_tea_full,
        snapshot.cups_boba_full,
        snapshot.cups_sealed,
        snapshot.cups_complete,
        snapshot.cups_loose,
        snapshot.cups_sold,
        snapshot.cups_discarded,
        snapshot.employees_total,
        snapshot.employees_assigned,
        snapshot.employees_asleep,
        snapshot.avg_fatigue,
        snapshot.max_fatigue,
        snapshot.active_work_loops,
        snapshot.occupied_slots,
        snapshot.busy_slots,
        snapshot.stations_processing,
        snapshot.total_upgrade_levels,
    )
}

const DEFAULT_ROWS_PER_FILE: usize = 50_000;

/// CSV sink for one run directory. Starts a new `metrics_NNN.csv` whenever
/// the current file holds `rows_per_file` rows.
pub struct MetricsFileWriter {
    run_dir: PathBuf,
    rows_per_file: usize,
    part: u32,
    rows: usize,
    out: BufWriter<File>,
}

impl MetricsFileWriter {
    pub fn new(run_dir: PathBuf) -> std::io::Result<Self> {
        Self::with_rows_per_file(run_dir, DEFAULT_ROWS_PER_FILE)
    }

    pub fn with_rows_per_file(run_dir: PathBuf, rows_per_file: usize) -> std::io::Result<Self> {
        let out = open_part(&run_dir, 0)?;
        Ok(Self {
            run_dir,
            rows_per_file: rows_per_file.max(1),
            part: 0,
            rows: 0,
            out,
        })
    }

    pub fn write_row(&mut self, snapshot: &MetricsSnapshot) -> std::io::Result<()> {
        if self.rows == self.rows_per_file {
            self.out.flush()?;
            self.part += 1;
            self.out = open_part(&self.run_dir, self.part)?;
            self.rows = 0;
        }
        append_metrics_row(&mut self.out, snapshot)?;
        self.rows += 1;
        Ok(())
    }

    pub fn flush(&mut self) -> std::io::Result<()> {
        self.out.flush()
    }
}

fn open_part(run_dir: &Path, part: u32) -> std::io::Result<BufWriter<File>> {
    let path = run_dir.join(format!("metrics_{part:03}.csv"));
    let mut out = BufWriter::new(File::create(path)?);
    write_metrics_header(&mut out)?;
    Ok(out)
}
