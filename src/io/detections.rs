//! Detection input - JSONL stream of per-frame detector output
//!
//! One JSON object per line:
//!
//! ```json
//! {"frame": 12, "image": "frames/0012.png", "ts": "2026-01-05T16:41:30.048+00:00",
//!  "detections": [{"class": "person", "bbox": [10, 20, 40, 90], "confidence": 0.82},
//!                 {"class": "ball", "bbox": [50, 60, 56, 66], "confidence": 0.41}]}
//! ```
//!
//! Every field except `detections` is optional. Boxes may be fractional and
//! are truncated to whole pixels; boxes with a coordinate that is not finite
//! or does not fit a pixel index are dropped. Person boxes and the ball are kept only
//! above their confidence thresholds; when several balls qualify the last one
//! wins. Image paths are resolved relative to the JSONL file.

use crate::domain::types::{BoundingBox, FrameDetections};
use crate::infra::config::Config;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::{Path, PathBuf};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::{debug, info};

/// Detector class label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectionClass {
    Person,
    Ball,
    /// Any other label; ignored
    #[serde(other)]
    Other,
}

/// One raw detector output box
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDetection {
    pub class: DetectionClass,
    /// `[x1, y1, x2, y2]` in pixels
    pub bbox: [f64; 4],
    pub confidence: f32,
}

impl RawDetection {
    /// Box truncated to whole pixels, or `None` if any coordinate is out of range
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        let [x1, y1, x2, y2] = self.bbox;
        Some(BoundingBox::new(pixel(x1)?, pixel(y1)?, pixel(x2)?, pixel(y2)?))
    }
}

/// Truncate toward zero, rejecting NaN, infinities and values outside i32
fn pixel(v: f64) -> Option<i32> {
    let t = v.trunc();
    (t >= f64::from(i32::MIN) && t <= f64::from(i32::MAX)).then_some(t as i32)
}

/// One line of the detections file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<PathBuf>,
    /// Capture time (RFC 3339)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ts: Option<String>,
    #[serde(default)]
    pub detections: Vec<RawDetection>,
}

/// A thresholded frame ready for the session
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionFrame {
    pub index: u64,
    /// Frame image, already resolved against the detections file location
    pub image: Option<PathBuf>,
    /// Capture time as epoch milliseconds, if the record carried a valid one
    pub captured_at_ms: Option<u64>,
    pub detections: FrameDetections,
}

/// Confidence thresholds applied to raw detections
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectionFilter {
    pub person_min_confidence: f32,
    pub ball_min_confidence: f32,
}

impl Default for DetectionFilter {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl DetectionFilter {
    pub fn from_config(config: &Config) -> Self {
        Self {
            person_min_confidence: config.person_min_confidence(),
            ball_min_confidence: config.ball_min_confidence(),
        }
    }

    /// Split raw detections into entity boxes and at most one ball
    pub fn apply(&self, raw: &[RawDetection]) -> FrameDetections {
        let mut frame = FrameDetections::default();
        for det in raw {
            let keep = match det.class {
                DetectionClass::Person => det.confidence > self.person_min_confidence,
                DetectionClass::Ball => det.confidence > self.ball_min_confidence,
                DetectionClass::Other => false,
            };
            if !keep {
                continue;
            }
            let Some(bbox) = det.bounding_box() else {
                debug!(class = ?det.class, bbox = ?det.bbox, "detection_out_of_range");
                continue;
            };
            if det.class == DetectionClass::Ball {
                frame.ball = Some(bbox);
            } else {
                frame.entities.push(bbox);
            }
        }
        frame
    }
}

/// Parse an RFC 3339 timestamp to epoch milliseconds
///
/// Instants before the Unix epoch have no `u64` representation and yield `None`.
fn parse_iso_time(time_str: &str) -> Option<u64> {
    let dt = OffsetDateTime::parse(time_str, &Rfc3339).ok()?;
    u64::try_from(dt.unix_timestamp_nanos() / 1_000_000).ok()
}

/// Streaming reader over a detections JSONL source
///
/// Yields one [`DetectionFrame`] per kept record. With `stride = N` only
/// records N, 2N, 3N... are kept. Blank lines are skipped and do not count as
/// records.
pub struct DetectionSource<R> {
    lines: Lines<R>,
    filter: DetectionFilter,
    stride: u64,
    base_dir: Option<PathBuf>,
    line_no: u64,
    records_seen: u64,
}

impl DetectionSource<BufReader<File>> {
    /// Open a detections file using thresholds and stride from config
    pub fn open<P: AsRef<Path>>(path: P, config: &Config) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("Failed to open detections file: {}", path.display()))?;

        info!(
            file = %path.display(),
            person_min_confidence = %config.person_min_confidence(),
            ball_min_confidence = %config.ball_min_confidence(),
            frame_stride = %config.frame_stride(),
            "detections_opened"
        );

        let source = Self::new(
            BufReader::new(file),
            DetectionFilter::from_config(config),
            config.frame_stride(),
        );
        Ok(match path.parent() {
            Some(dir) => source.with_base_dir(dir),
            None => source,
        })
    }
}

impl<R: BufRead> DetectionSource<R> {
    pub fn new(reader: R, filter: DetectionFilter, stride: u32) -> Self {
        Self {
            lines: reader.lines(),
            filter,
            stride: u64::from(stride.max(1)),
            base_dir: None,
            line_no: 0,
            records_seen: 0,
        }
    }

    /// Resolve relative image paths against `dir`
    pub fn with_base_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.base_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    fn resolve_image(&self, image: PathBuf) -> PathBuf {
        match &self.base_dir {
            Some(dir) if image.is_relative() => dir.join(image),
            _ => image,
        }
    }

    fn build_frame(&self, record: DetectionRecord) -> DetectionFrame {
        let captured_at_ms = record.ts.as_deref().and_then(|ts| {
            let parsed = parse_iso_time(ts);
            if parsed.is_none() {
                debug!(line = %self.line_no, ts = %ts, "invalid_timestamp");
            }
            parsed
        });

        DetectionFrame {
            index: record.frame.unwrap_or(self.line_no),
            image: record.image.map(|p| self.resolve_image(p)),
            captured_at_ms,
            detections: self.filter.apply(&record.detections),
        }
    }
}

impl<R: BufRead> Iterator for DetectionSource<R> {
    type Item = anyhow::Result<DetectionFrame>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => {
                    self.line_no += 1;
                    return Some(Err(anyhow::Error::new(e)
                        .context(format!("Failed to read detections line {}", self.line_no))));
                }
            };
            self.line_no += 1;

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            self.records_seen += 1;
            if self.records_seen % self.stride != 0 {
                continue;
            }

            let record: DetectionRecord = match serde_json::from_str(trimmed)
                .with_context(|| format!("Invalid detection record at line {}", self.line_no))
            {
                Ok(record) => record,
                Err(e) => return Some(Err(e)),
            };
            return Some(Ok(self.build_frame(record)));
        }
    }
}
