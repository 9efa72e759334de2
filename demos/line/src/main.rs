//! line: RPL DODAG formation over a line of motes.
//!
//! Usage: `line [settings.json]`.  Without a file the built-in settings
//! below are used.  Set `RUST_LOG=debug` to watch Trickle and parent churn.
//! Output lands in `output/line/`.

mod topology;

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use rpl_core::Settings;
use rpl_output::{write_node_reports, CsvEventLog};
use rpl_sim::SimBuilder;

use topology::build_line;

// ── Constants ─────────────────────────────────────────────────────────────────

const MOTE_COUNT: usize = 8;
const LINK_PDR:   f64   = 0.95;
const OUTPUT_DIR: &str  = "output/line";

fn default_settings() -> Settings {
    Settings {
        seed:                     42,
        total_slotframes:         2_000, // ~34 min of 10 ms slots
        dio_interval_min_exp:     10,
        dio_interval_doublings:   6,
        etx_default:              1.0,
        dao_period_ms:            30_000,
        dis_period_ms:            10_000,
        ..Settings::default()
    }
}

// ── main ──────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = match std::env::args().nth(1).map(PathBuf::from) {
        Some(path) => Settings::from_path(&path)
            .with_context(|| format!("loading settings from {}", path.display()))?,
        None => default_settings(),
    };

    println!("=== line: RPL/Trickle over {MOTE_COUNT} motes ===");
    println!("{}", serde_json::to_string_pretty(&settings)?);
    println!();

    // 1. Topology and output sink.
    let topology = build_line(MOTE_COUNT, LINK_PDR)?;
    std::fs::create_dir_all(OUTPUT_DIR)?;
    let log = CsvEventLog::new(Path::new(OUTPUT_DIR))?;

    // 2. Build and run on a worker thread.
    let sim = SimBuilder::new(settings, topology).log(log).build()?;
    let t0 = Instant::now();
    let (sim, outcome) = sim.spawn()?.join()?;
    let elapsed = t0.elapsed();

    // 3. Summary.
    let reports = sim.reports()?;
    write_node_reports(Path::new(OUTPUT_DIR), &reports)?;
    tracing::info!(dir = OUTPUT_DIR, "CSV output written");
    println!(
        "Stopped at {} ({:?}) after {:.3} s, {} events, {} records",
        outcome.last_tick,
        outcome.reason,
        elapsed.as_secs_f64(),
        sim.queue.dispatched(),
        sim.log().written(),
    );
    let frames = sim.net.frames;
    println!("Frames: {} sent, {} delivered, {} lost", frames.sent, frames.delivered, frames.lost);
    println!();

    println!(
        "{:<6} {:<6} {:<8} {:<24} {:>6} {:>6} {:>6} {:>6} {:>8}",
        "Node", "DAG", "Rank", "Parent", "DIO", "DIS", "DAO", "Reset", "I (ms)"
    );
    println!("{}", "-".repeat(84));
    for r in &reports {
        println!(
            "{:<6} {:<6} {:<8} {:<24} {:>6} {:>6} {:>6} {:>6} {:>8}",
            r.node.0,
            r.dag_rank.map_or("-".into(), |d| d.to_string()),
            r.state.rank.map_or("inf".into(), |d| d.to_string()),
            r.state.preferred_parent.map_or("-".into(), |p| p.to_string()),
            r.counters.dio_sent,
            r.counters.dis_sent,
            r.counters.dao_sent,
            r.trickle.reset_count,
            r.trickle.interval,
        );
    }
    println!();
    println!("{}/{} motes in the DODAG", sim.joined_count(), MOTE_COUNT);

    Ok(())
}
