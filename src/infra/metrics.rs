//! Lock-free metrics collection and periodic reporting
//!
//! Uses atomics so a reporter can read while the frame loop records.
//! Reporting swaps the periodic counters to get a consistent snapshot.
//!
//! NOTE: All atomics use Relaxed ordering intentionally; these are statistical
//! counters only. Do NOT use these atomics for coordination or logic decisions.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;

/// Exponential frame latency bucket boundaries (microseconds)
/// Buckets: ≤100, ≤200, ≤400, ≤800, ≤1600, ≤3200, ≤6400, ≤12800, ≤25600, ≤51200, >51200
const BUCKET_BOUNDS: [u64; 10] = [100, 200, 400, 800, 1600, 3200, 6400, 12800, 25600, 51200];
const NUM_BUCKETS: usize = 11;

/// Compute bucket index for a latency value using binary search
#[inline]
fn bucket_index(latency_us: u64) -> usize {
    BUCKET_BOUNDS.partition_point(|&bound| bound < latency_us)
}

/// Update an atomic max value using compare-and-swap loop
#[inline]
fn update_atomic_max(atomic_max: &AtomicU64, new_value: u64) {
    let mut current_max = atomic_max.load(Ordering::Relaxed);
    while new_value > current_max {
        match atomic_max.compare_exchange_weak(
            current_max,
            new_value,
            Ordering::Relaxed,
            Ordering::Relaxed,
        ) {
            Ok(_) => break,
            Err(actual) => current_max = actual,
        }
    }
}

/// Swap all buckets to zero and return their values
#[inline]
fn swap_buckets(buckets: &[AtomicU64; NUM_BUCKETS]) -> [u64; NUM_BUCKETS] {
    let mut result = [0u64; NUM_BUCKETS];
    for (i, bucket) in buckets.iter().enumerate() {
        result[i] = bucket.swap(0, Ordering::Relaxed);
    }
    result
}

/// Compute percentile from histogram buckets
/// Returns the upper bound of the bucket containing the percentile
fn percentile_from_buckets(buckets: &[u64; NUM_BUCKETS], percentile: f64) -> u64 {
    let total: u64 = buckets.iter().sum();
    if total == 0 {
        return 0;
    }

    let target = (total as f64 * percentile) as u64;
    let mut cumulative = 0u64;

    // Upper bounds for each bucket (last bucket uses 2x the previous bound)
    const BUCKET_UPPER_BOUNDS: [u64; NUM_BUCKETS] =
        [100, 200, 400, 800, 1600, 3200, 6400, 12800, 25600, 51200, 102400];

    for (i, &count) in buckets.iter().enumerate() {
        cumulative += count;
        if cumulative >= target {
            return BUCKET_UPPER_BOUNDS[i];
        }
    }
    BUCKET_UPPER_BOUNDS[NUM_BUCKETS - 1]
}

/// Lock-free metrics collector
pub struct Metrics {
    /// Total frames processed (monotonic)
    frames_total: AtomicU64,
    /// Frames since last report (reset on report)
    frames_since_report: AtomicU64,
    /// Sum of frame latencies in microseconds (reset on report)
    latency_sum_us: AtomicU64,
    /// Max frame latency in microseconds (reset on report)
    latency_max_us: AtomicU64,
    /// Frame processing latency histogram buckets (reset on report)
    latency_buckets: [AtomicU64; NUM_BUCKETS],
    /// Entities registered by the tracker (monotonic)
    entities_registered: AtomicU64,
    /// Entities deregistered after exceeding patience (monotonic)
    entities_deregistered: AtomicU64,
    /// Unmatched detections not registered because tracks outnumbered inputs (monotonic)
    detections_dropped: AtomicU64,
    /// Frames analyzed with a ball present (monotonic)
    ball_frames: AtomicU64,
    /// Pass events inferred (monotonic)
    pass_events: AtomicU64,
    /// Possession changes between sides (monotonic)
    possession_changes: AtomicU64,
    /// Stats egress write failures (monotonic)
    egress_failures: AtomicU64,
    /// Last report time (only accessed from reporter, not atomic)
    last_report_time: parking_lot::Mutex<Instant>,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            frames_total: AtomicU64::new(0),
            frames_since_report: AtomicU64::new(0),
            latency_sum_us: AtomicU64::new(0),
            latency_max_us: AtomicU64::new(0),
            latency_buckets: std::array::from_fn(|_| AtomicU64::new(0)),
            entities_registered: AtomicU64::new(0),
            entities_deregistered: AtomicU64::new(0),
            detections_dropped: AtomicU64::new(0),
            ball_frames: AtomicU64::new(0),
            pass_events: AtomicU64::new(0),
            possession_changes: AtomicU64::new(0),
            egress_failures: AtomicU64::new(0),
            last_report_time: parking_lot::Mutex::new(Instant::now()),
        }
    }

    /// Record a frame was processed with given latency (lock-free)
    #[inline]
    pub fn record_frame_processed(&self, latency_us: u64) {
        self.frames_total.fetch_add(1, Ordering::Relaxed);
        self.frames_since_report.fetch_add(1, Ordering::Relaxed);
        self.latency_sum_us.fetch_add(latency_us, Ordering::Relaxed);

        let bucket = bucket_index(latency_us);
        self.latency_buckets[bucket].fetch_add(1, Ordering::Relaxed);

        update_atomic_max(&self.latency_max_us, latency_us);
    }

    #[inline]
    pub fn record_entity_registered(&self) {
        self.entities_registered.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_entity_deregistered(&self) {
        self.entities_deregistered.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_detections_dropped(&self, count: u64) {
        self.detections_dropped.fetch_add(count, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_ball_frame(&self) {
        self.ball_frames.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_pass(&self, possession_changed: bool) {
        self.pass_events.fetch_add(1, Ordering::Relaxed);
        if possession_changed {
            self.possession_changes.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[inline]
    pub fn record_egress_failure(&self) {
        self.egress_failures.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn frames_total(&self) -> u64 {
        self.frames_total.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn entities_registered(&self) -> u64 {
        self.entities_registered.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn entities_deregistered(&self) -> u64 {
        self.entities_deregistered.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn detections_dropped(&self) -> u64 {
        self.detections_dropped.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn pass_events(&self) -> u64 {
        self.pass_events.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn egress_failures(&self) -> u64 {
        self.egress_failures.load(Ordering::Relaxed)
    }

    /// Calculate and return metrics summary, then reset periodic counters
    pub fn report(&self, active_entities: usize) -> MetricsSummary {
        let frames_count = self.frames_since_report.swap(0, Ordering::Relaxed);
        let latency_sum = self.latency_sum_us.swap(0, Ordering::Relaxed);
        let max_latency = self.latency_max_us.swap(0, Ordering::Relaxed);
        let lat_buckets = swap_buckets(&self.latency_buckets);

        let elapsed = {
            let mut last = self.last_report_time.lock();
            let elapsed = last.elapsed();
            *last = Instant::now();
            elapsed
        };

        let frames_per_sec = if elapsed.as_secs_f64() > 0.0 {
            frames_count as f64 / elapsed.as_secs_f64()
        } else {
            0.0
        };

        let avg_latency = if frames_count > 0 { latency_sum / frames_count } else { 0 };

        MetricsSummary {
            frames_total: self.frames_total.load(Ordering::Relaxed),
            frames_per_sec,
            avg_frame_latency_us: avg_latency,
            max_frame_latency_us: max_latency,
            lat_buckets,
            lat_p50_us: percentile_from_buckets(&lat_buckets, 0.50),
            lat_p95_us: percentile_from_buckets(&lat_buckets, 0.95),
            lat_p99_us: percentile_from_buckets(&lat_buckets, 0.99),
            active_entities,
            entities_registered: self.entities_registered.load(Ordering::Relaxed),
            entities_deregistered: self.entities_deregistered.load(Ordering::Relaxed),
            detections_dropped: self.detections_dropped.load(Ordering::Relaxed),
            ball_frames: self.ball_frames.load(Ordering::Relaxed),
            pass_events: self.pass_events.load(Ordering::Relaxed),
            possession_changes: self.possession_changes.load(Ordering::Relaxed),
            egress_failures: self.egress_failures.load(Ordering::Relaxed),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
pub struct MetricsSummary {
    pub frames_total: u64,
    pub frames_per_sec: f64,
    pub avg_frame_latency_us: u64,
    pub max_frame_latency_us: u64,
    /// Frame latency histogram buckets
    /// Bounds: ≤100, ≤200, ≤400, ≤800, ≤1600, ≤3200, ≤6400, ≤12800, ≤25600, ≤51200, >51200 µs
    pub lat_buckets: [u64; NUM_BUCKETS],
    pub lat_p50_us: u64,
    pub lat_p95_us: u64,
    pub lat_p99_us: u64,
    pub active_entities: usize,
    pub entities_registered: u64,
    pub entities_deregistered: u64,
    pub detections_dropped: u64,
    pub ball_frames: u64,
    pub pass_events: u64,
    pub possession_changes: u64,
    pub egress_failures: u64,
}

impl MetricsSummary {
    pub fn log(&self) {
        info!(
            frames_total = %self.frames_total,
            frames_per_sec = format!("{:.1}", self.frames_per_sec),
            avg_latency_us = %self.avg_frame_latency_us,
            max_latency_us = %self.max_frame_latency_us,
            p50_us = %self.lat_p50_us,
            p95_us = %self.lat_p95_us,
            p99_us = %self.lat_p99_us,
            active_entities = %self.active_entities,
            registered = %self.entities_registered,
            deregistered = %self.entities_deregistered,
            dropped = %self.detections_dropped,
            passes = %self.pass_events,
            ball_frames = %self.ball_frames,
            possession_changes = %self.possession_changes,
            egress_failures = %self.egress_failures,
            "metrics"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_new() {
        let metrics = Metrics::new();
        assert_eq!(metrics.frames_total(), 0);
        assert_eq!(metrics.pass_events(), 0);
    }

    #[test]
    fn test_record_frame() {
        let metrics = Metrics::new();

        metrics.record_frame_processed(100);
        assert_eq!(metrics.frames_total(), 1);
        assert_eq!(metrics.latency_sum_us.load(Ordering::Relaxed), 100);

        metrics.record_frame_processed(200);
        assert_eq!(metrics.frames_total(), 2);
        assert_eq!(metrics.latency_sum_us.load(Ordering::Relaxed), 300);
    }

    #[test]
    fn test_report() {
        let metrics = Metrics::new();

        metrics.record_frame_processed(100);
        metrics.record_frame_processed(200);
        metrics.record_frame_processed(300);
        metrics.record_entity_registered();
        metrics.record_entity_registered();
        metrics.record_entity_deregistered();
        metrics.record_detections_dropped(3);
        metrics.record_pass(true);
        metrics.record_pass(false);
        metrics.record_egress_failure();

        let summary = metrics.report(4);

        assert_eq!(summary.frames_total, 3);
        assert_eq!(summary.avg_frame_latency_us, 200);
        assert_eq!(summary.max_frame_latency_us, 300);
        assert_eq!(summary.active_entities, 4);
        assert_eq!(summary.entities_registered, 2);
        assert_eq!(summary.entities_deregistered, 1);
        assert_eq!(summary.detections_dropped, 3);
        assert_eq!(summary.pass_events, 2);
        assert_eq!(summary.possession_changes, 1);
        assert_eq!(summary.egress_failures, 1);

        // Periodic counters should be reset, monotonic ones kept
        assert_eq!(metrics.frames_since_report.load(Ordering::Relaxed), 0);
        assert_eq!(metrics.latency_sum_us.load(Ordering::Relaxed), 0);
        assert_eq!(metrics.latency_max_us.load(Ordering::Relaxed), 0);
        assert_eq!(metrics.frames_total(), 3);
        assert_eq!(metrics.egress_failures(), 1);
    }

    #[test]
    fn test_report_empty() {
        let metrics = Metrics::new();
        let summary = metrics.report(0);

        assert_eq!(summary.frames_total, 0);
        assert_eq!(summary.avg_frame_latency_us, 0);
        assert_eq!(summary.lat_p99_us, 0);
    }

    #[test]
    fn test_bucket_index() {
        assert_eq!(bucket_index(0), 0);
        assert_eq!(bucket_index(100), 0);
        assert_eq!(bucket_index(101), 1);
        assert_eq!(bucket_index(51200), 9);
        assert_eq!(bucket_index(51201), 10);
    }

    #[test]
    fn test_percentile_computation() {
        let metrics = Metrics::new();

        for _ in 0..100 {
            metrics.record_frame_processed(150);
        }

        let summary = metrics.report(0);

        assert_eq!(summary.lat_p50_us, 200);
        assert_eq!(summary.lat_p99_us, 200);
    }

    #[test]
    fn test_concurrent_updates() {
        use std::sync::Arc;
        use std::thread;

        let metrics = Arc::new(Metrics::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let m = metrics.clone();
                thread::spawn(move || {
                    for i in 0..500 {
                        m.record_frame_processed(i);
                    }
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(metrics.frames_total(), 2000);
    }
}
