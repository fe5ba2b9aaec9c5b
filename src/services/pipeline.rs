//! Run loop shared by the CLI and integration tests
//!
//! Pulls frames from a detections source, loads each frame image, drives the
//! session, writes stats snapshots to egress and emits periodic metrics
//! reports. Egress is per frame or once after the last frame, depending on
//! `[egress] every_frame`.

use crate::infra::config::Config;
use crate::io::detections::DetectionFrame;
use crate::io::egress::{StatsEgress, StatsRecord};
use crate::io::frames::load_frame;
use crate::services::session::AnalysisSession;
use crate::services::side_classifier::SideClassifier;
use image::RgbImage;
use tracing::{info, warn};

/// Outcome of one pass over a detections source
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub frames_processed: u64,
    /// Index of the last frame pulled from the source
    pub last_frame: Option<u64>,
    pub snapshots_written: u64,
    pub metrics_reports: u64,
    pub egress_failures: u64,
}

/// Drive `session` over every frame in `frames`
///
/// A source error stops the run and is returned. Frame images that fail to
/// load are replaced by an empty frame; failed egress writes are counted and
/// do not stop the run.
pub fn run_detections<C, I>(
    session: &mut AnalysisSession<C>,
    frames: I,
    egress: &StatsEgress,
    config: &Config,
) -> anyhow::Result<RunSummary>
where
    C: SideClassifier,
    I: IntoIterator<Item = anyhow::Result<DetectionFrame>>,
{
    let every_frame = config.egress_every_frame();
    let metrics_interval = config.metrics_interval_frames();
    let mut summary = RunSummary::default();
    let mut last: Option<(u64, Option<u64>)> = None;

    for item in frames {
        let frame = item?;

        let image = load_frame(frame.image.as_deref()).unwrap_or_else(|e| {
            warn!(frame = %frame.index, error = %format!("{e:#}"), "frame_load_failed");
            RgbImage::new(0, 0)
        });

        session.process_frame(frame.index, &frame.detections, &image);

        if every_frame {
            egress_snapshot(egress, session, frame.index, frame.captured_at_ms, &mut summary);
        }
        if metrics_interval > 0 && session.frames_processed() % metrics_interval == 0 {
            session.metrics().report(session.tracker().len()).log();
            summary.metrics_reports += 1;
        }
        last = Some((frame.index, frame.captured_at_ms));
    }

    if let (false, Some((index, ts))) = (every_frame, last) {
        egress_snapshot(egress, session, index, ts, &mut summary);
    }

    summary.frames_processed = session.frames_processed();
    summary.last_frame = last.map(|(index, _)| index);
    summary.egress_failures = session.metrics().egress_failures();

    info!(
        session_id = %session.session_id(),
        frames = %summary.frames_processed,
        snapshots = %summary.snapshots_written,
        egress_failures = %summary.egress_failures,
        "run_finished"
    );
    Ok(summary)
}

/// Write the current stats, counting failures instead of aborting the run
fn egress_snapshot<C: SideClassifier>(
    egress: &StatsEgress,
    session: &AnalysisSession<C>,
    frame: u64,
    ts: Option<u64>,
    summary: &mut RunSummary,
) {
    let record = StatsRecord::new(session.session_id(), frame, session.stats()).with_ts_event(ts);
    if egress.write_stats(&record) {
        summary.snapshots_written += 1;
    } else {
        session.metrics().record_egress_failure();
    }
}
