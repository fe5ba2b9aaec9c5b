//! Stats egress - writes match statistics to file
//!
//! Snapshots are written in JSONL format (one JSON object per line)
//! to the file specified in config.

use crate::domain::stats::MatchStats;
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use tracing::{debug, error, info};

/// One egressed statistics snapshot
#[derive(Debug, Serialize)]
pub struct StatsRecord<'a> {
    pub session_id: &'a str,
    pub frame: u64,
    /// Write time (RFC 3339, UTC)
    pub generated_at: String,
    /// Capture time of the frame, epoch milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ts_event: Option<u64>,
    pub stats: &'a MatchStats,
}

impl<'a> StatsRecord<'a> {
    pub fn new(session_id: &'a str, frame: u64, stats: &'a MatchStats) -> Self {
        Self {
            session_id,
            frame,
            generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            ts_event: None,
            stats,
        }
    }

    pub fn with_ts_event(mut self, ts_event: Option<u64>) -> Self {
        self.ts_event = ts_event;
        self
    }
}

/// Egress writer for stats snapshots
pub struct StatsEgress {
    file_path: String,
}

impl StatsEgress {
    pub fn new(file_path: &str) -> Self {
        info!(file_path = %file_path, "egress_initialized");
        Self { file_path: file_path.to_string() }
    }

    pub fn file_path(&self) -> &str {
        &self.file_path
    }

    /// Write a snapshot to the egress file
    /// Returns true if successful, false otherwise
    pub fn write_stats(&self, record: &StatsRecord<'_>) -> bool {
        let json = match serde_json::to_string(record) {
            Ok(json) => json,
            Err(e) => {
                error!(frame = %record.frame, error = %e, "stats_serialize_failed");
                return false;
            }
        };

        match self.append_line(&json) {
            Ok(()) => {
                debug!(
                    session_id = %record.session_id,
                    frame = %record.frame,
                    passes = %record.stats.total_passes(),
                    "stats_egressed"
                );
                true
            }
            Err(e) => {
                error!(
                    frame = %record.frame,
                    error = %e,
                    "stats_egress_failed"
                );
                false
            }
        }
    }

    /// Append a line to the egress file
    fn append_line(&self, line: &str) -> std::io::Result<()> {
        let path = Path::new(&self.file_path);

        // Create parent directories if they don't exist
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new().create(true).append(true).open(path)?;

        writeln!(file, "{}", line)?;
        debug!(file = %self.file_path, bytes = %line.len(), "egress_written");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{EntityId, PerSide};
    use std::collections::BTreeMap;
    use std::fs;
    use tempfile::tempdir;

    fn sample_stats() -> MatchStats {
        let mut distances = BTreeMap::new();
        distances.insert(EntityId(0), 12.5);
        distances.insert(EntityId(3), 4.0);
        MatchStats::compile(PerSide::new(3, 1), 240.0, distances)
    }

    #[test]
    fn test_egress_new() {
        let egress = StatsEgress::new("test.jsonl");
        assert_eq!(egress.file_path(), "test.jsonl");
    }

    #[test]
    fn test_write_stats() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("stats.jsonl");
        let egress = StatsEgress::new(file_path.to_str().unwrap());

        let stats = sample_stats();
        let record = StatsRecord::new("session-1", 42, &stats).with_ts_event(Some(1500));
        assert!(egress.write_stats(&record));

        let content = fs::read_to_string(&file_path).unwrap();
        assert!(content.ends_with('\n'));

        let parsed: serde_json::Value = serde_json::from_str(content.trim()).unwrap();
        assert_eq!(parsed["session_id"], "session-1");
        assert_eq!(parsed["frame"], 42);
        assert_eq!(parsed["ts_event"], 1500);
        assert_eq!(parsed["stats"]["passes"]["a"], 3);
        assert_eq!(parsed["stats"]["possession"]["a"], 0.75);
        assert_eq!(parsed["stats"]["entity_distance"]["3"], 4.0);
        assert!(parsed["generated_at"].as_str().unwrap().ends_with('Z'));
    }

    #[test]
    fn test_write_multiple_records_appends() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("stats.jsonl");
        let egress = StatsEgress::new(file_path.to_str().unwrap());
        let stats = sample_stats();

        for frame in 1..=3 {
            assert!(egress.write_stats(&StatsRecord::new("s", frame, &stats)));
        }

        let content = fs::read_to_string(&file_path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        for line in lines {
            let parsed: serde_json::Value = serde_json::from_str(line).unwrap();
            assert!(parsed.get("ts_event").is_none());
        }
    }

    #[test]
    fn test_egress_creates_parent_directories() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("nested").join("dir").join("stats.jsonl");
        let egress = StatsEgress::new(file_path.to_str().unwrap());

        let stats = MatchStats::default();
        assert!(egress.write_stats(&StatsRecord::new("s", 1, &stats)));
        assert!(file_path.exists());
    }

    #[test]
    fn test_egress_write_failure() {
        let dir = tempdir().unwrap();
        // A directory cannot be opened for appending
        let egress = StatsEgress::new(dir.path().to_str().unwrap());
        let stats = MatchStats::default();
        assert!(!egress.write_stats(&StatsRecord::new("s", 1, &stats)));
    }
}
