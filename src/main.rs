//! Match Analytics - entity tracking and match statistics from detector output
//!
//! Reads per-frame detections (JSONL), keeps stable entity identities across
//! frames and derives pass counts, possession shares and distance covered.
//!
//! Module structure:
//! - `domain/` - Core types (EntityId, BoundingBox, Side, MatchStats)
//! - `io/` - External interfaces (detections input, frame images, stats egress)
//! - `services/` - Tracking and statistics logic (EntityTracker, MatchAnalyzer)
//! - `infra/` - Infrastructure (Config, Metrics)
//!
//! Usage:
//!   match-analytics --config config/dev.toml --detections run1/detections.jsonl

use clap::Parser;
use match_analytics::domain::{MatchStats, Side};
use match_analytics::infra::{Config, Metrics};
use match_analytics::io::{DetectionSource, StatsEgress};
use match_analytics::services::{run_detections, AnalysisSession};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

/// Match Analytics - tracking and pass/possession statistics
#[derive(Parser, Debug)]
#[command(name = "match-analytics", version, about)]
struct Args {
    /// Path to TOML configuration file (falls back to $CONFIG_FILE, then config/dev.toml)
    #[arg(short, long)]
    config: Option<String>,

    /// Detections JSONL file, one frame per line
    #[arg(short, long)]
    detections: PathBuf,

    /// Override the stats egress file from config
    #[arg(short, long)]
    egress: Option<String>,
}

fn main() -> anyhow::Result<()> {
    // Initialize structured logging with configurable level via RUST_LOG env var
    // Default: INFO, use RUST_LOG=debug for per-entity events
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_target(false)
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), git_hash = env!("GIT_HASH"), "match_analytics_starting");

    let args = Args::parse();

    let config_path = Config::resolve_config_path(args.config.as_deref());
    let mut config = Config::load_from_path(&config_path);
    if let Some(ref file) = args.egress {
        config = config.with_egress_file(file);
    }

    info!(
        config_file = %config.config_file(),
        patience = %config.patience(),
        assignment = %config.assignment().as_str(),
        pass_threshold = %config.pass_distance_threshold(),
        frame_stride = %config.frame_stride(),
        egress_file = %config.egress_file(),
        "config_loaded"
    );

    let metrics = Arc::new(Metrics::new());
    let mut session = AnalysisSession::from_config(&config, metrics.clone());
    let egress = StatsEgress::new(config.egress_file());
    let source = DetectionSource::open(&args.detections, &config)?;

    let summary = run_detections(&mut session, source, &egress, &config)?;

    metrics.report(session.tracker().len()).log();
    log_final_stats(&config, session.stats(), summary.frames_processed);
    print_final_stats(&config, session.stats());

    info!(
        session_id = %session.session_id(),
        egress_failures = %summary.egress_failures,
        "match_analytics_complete"
    );
    Ok(())
}

fn log_final_stats(config: &Config, stats: &MatchStats, frames: u64) {
    info!(
        frames = %frames,
        side_a = %config.side_label(Side::A),
        side_b = %config.side_label(Side::B),
        passes_a = %stats.passes.a,
        passes_b = %stats.passes.b,
        possession_a = format!("{:.4}", stats.possession.a),
        possession_b = format!("{:.4}", stats.possession.b),
        ball_distance = format!("{:.2}", stats.ball_distance),
        entities_seen = %stats.entity_distance.len(),
        "final_stats"
    );
}

fn print_final_stats(config: &Config, stats: &MatchStats) {
    println!("\nFinal Stats:");
    for (side, share) in stats.possession.iter() {
        println!("{} possession: {:.2}%", config.side_label(side), share * 100.0);
    }
    for (side, passes) in stats.passes.iter() {
        println!("{} passes: {}", config.side_label(side), passes);
    }
    println!("Total passes: {}", stats.total_passes());
    println!("Ball distance: {:.2}", stats.ball_distance);
    for (id, distance) in &stats.entity_distance {
        println!("Entity {} distance: {:.2}", id, distance);
    }
}
