//! Configuration loading from TOML files
//!
//! Config file is selected via:
//! 1. --config <path> command line argument
//! 2. CONFIG_FILE environment variable
//! 3. Default: config/dev.toml

use crate::domain::Side;
use crate::services::assignment::AssignmentStrategy;
use crate::services::side_classifier::HsvRange;
use anyhow::Context;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;
use tracing::warn;

#[derive(Debug, Clone, Deserialize)]
pub struct TrackerConfig {
    /// Consecutive missed frames tolerated before an entity is deregistered
    #[serde(default = "default_patience")]
    pub patience: u32,
    #[serde(default)]
    pub assignment: AssignmentStrategy,
}

fn default_patience() -> u32 {
    50
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self { patience: default_patience(), assignment: AssignmentStrategy::default() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClassifierConfig {
    /// Half the edge length of the square sampled around a centroid
    #[serde(default = "default_sample_half_size")]
    pub sample_half_size: u32,
    /// HSV ranges counted towards side A (light kit)
    #[serde(default = "default_light_bands")]
    pub light_bands: Vec<HsvRange>,
    /// HSV ranges counted towards side B (red kit)
    #[serde(default = "default_red_bands")]
    pub red_bands: Vec<HsvRange>,
}

fn default_sample_half_size() -> u32 {
    20
}

fn default_light_bands() -> Vec<HsvRange> {
    vec![HsvRange::new([0, 0, 200], [180, 30, 255])]
}

fn default_red_bands() -> Vec<HsvRange> {
    vec![HsvRange::new([0, 100, 100], [10, 255, 255]), HsvRange::new([160, 100, 100], [180, 255, 255])]
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            sample_half_size: default_sample_half_size(),
            light_bands: default_light_bands(),
            red_bands: default_red_bands(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalyzerConfig {
    /// Ball displacement (pixels) between frames above which a pass is inferred
    #[serde(default = "default_pass_distance_threshold")]
    pub pass_distance_threshold: f64,
}

fn default_pass_distance_threshold() -> f64 {
    20.0
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self { pass_distance_threshold: default_pass_distance_threshold() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DetectionsConfig {
    #[serde(default = "default_person_min_confidence")]
    pub person_min_confidence: f32,
    #[serde(default = "default_ball_min_confidence")]
    pub ball_min_confidence: f32,
    /// Keep every Nth frame record
    #[serde(default = "default_frame_stride")]
    pub frame_stride: u32,
}

fn default_person_min_confidence() -> f32 {
    0.5
}

fn default_ball_min_confidence() -> f32 {
    0.3
}

fn default_frame_stride() -> u32 {
    1
}

impl Default for DetectionsConfig {
    fn default() -> Self {
        Self {
            person_min_confidence: default_person_min_confidence(),
            ball_min_confidence: default_ball_min_confidence(),
            frame_stride: default_frame_stride(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TeamsConfig {
    #[serde(default = "default_side_a_label")]
    pub side_a: String,
    #[serde(default = "default_side_b_label")]
    pub side_b: String,
}

fn default_side_a_label() -> String {
    "Spain".to_string()
}

fn default_side_b_label() -> String {
    "Portugal".to_string()
}

impl Default for TeamsConfig {
    fn default() -> Self {
        Self { side_a: default_side_a_label(), side_b: default_side_b_label() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EgressConfig {
    /// File path for stats egress (JSONL format)
    #[serde(default = "default_egress_file")]
    pub file: String,
    /// Write a record for every processed frame, not only the final one
    #[serde(default = "default_every_frame")]
    pub every_frame: bool,
}

fn default_egress_file() -> String {
    "stats.jsonl".to_string()
}

fn default_every_frame() -> bool {
    true
}

impl Default for EgressConfig {
    fn default() -> Self {
        Self { file: default_egress_file(), every_frame: default_every_frame() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    /// Frames between metrics reports (0 to disable)
    #[serde(default = "default_interval_frames")]
    pub interval_frames: u64,
}

fn default_interval_frames() -> u64 {
    100
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { interval_frames: default_interval_frames() }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub tracker: TrackerConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub analyzer: AnalyzerConfig,
    #[serde(default)]
    pub detections: DetectionsConfig,
    #[serde(default)]
    pub teams: TeamsConfig,
    #[serde(default)]
    pub egress: EgressConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Main configuration struct used throughout the application
#[derive(Debug, Clone)]
pub struct Config {
    patience: u32,
    assignment: AssignmentStrategy,
    sample_half_size: u32,
    light_bands: Vec<HsvRange>,
    red_bands: Vec<HsvRange>,
    pass_distance_threshold: f64,
    person_min_confidence: f32,
    ball_min_confidence: f32,
    frame_stride: u32,
    side_a_label: String,
    side_b_label: String,
    egress_file: String,
    egress_every_frame: bool,
    metrics_interval_frames: u64,
    config_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_toml(TomlConfig::default(), "default".to_string())
    }
}

impl Config {
    fn from_toml(toml_config: TomlConfig, config_file: String) -> Self {
        Self {
            patience: toml_config.tracker.patience,
            assignment: toml_config.tracker.assignment,
            sample_half_size: toml_config.classifier.sample_half_size,
            light_bands: toml_config.classifier.light_bands,
            red_bands: toml_config.classifier.red_bands,
            pass_distance_threshold: toml_config.analyzer.pass_distance_threshold,
            person_min_confidence: toml_config.detections.person_min_confidence,
            ball_min_confidence: toml_config.detections.ball_min_confidence,
            // A stride of 0 would drop every frame
            frame_stride: toml_config.detections.frame_stride.max(1),
            side_a_label: toml_config.teams.side_a,
            side_b_label: toml_config.teams.side_b,
            egress_file: toml_config.egress.file,
            egress_every_frame: toml_config.egress.every_frame,
            metrics_interval_frames: toml_config.metrics.interval_frames,
            config_file,
        }
    }

    /// Determine config file path from an explicit argument or environment
    pub fn resolve_config_path(arg: Option<&str>) -> String {
        if let Some(path) = arg {
            return path.to_string();
        }

        if let Ok(path) = env::var("CONFIG_FILE") {
            return path;
        }

        "config/dev.toml".to_string()
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let toml_config: TomlConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        Ok(Self::from_toml(toml_config, path.display().to_string()))
    }

    /// Load configuration - tries TOML file first, falls back to defaults
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Self {
        match Self::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(error = %format!("{e:#}"), "config_load_failed_using_defaults");
                Self::default()
            }
        }
    }

    pub fn patience(&self) -> u32 {
        self.patience
    }

    pub fn assignment(&self) -> AssignmentStrategy {
        self.assignment
    }

    pub fn sample_half_size(&self) -> u32 {
        self.sample_half_size
    }

    pub fn light_bands(&self) -> &[HsvRange] {
        &self.light_bands
    }

    pub fn red_bands(&self) -> &[HsvRange] {
        &self.red_bands
    }

    pub fn pass_distance_threshold(&self) -> f64 {
        self.pass_distance_threshold
    }

    pub fn person_min_confidence(&self) -> f32 {
        self.person_min_confidence
    }

    pub fn ball_min_confidence(&self) -> f32 {
        self.ball_min_confidence
    }

    pub fn frame_stride(&self) -> u32 {
        self.frame_stride
    }

    pub fn side_a_label(&self) -> &str {
        &self.side_a_label
    }

    pub fn side_b_label(&self) -> &str {
        &self.side_b_label
    }

    /// Display label for a side
    pub fn side_label(&self, side: Side) -> &str {
        match side {
            Side::A => &self.side_a_label,
            Side::B => &self.side_b_label,
        }
    }

    pub fn egress_file(&self) -> &str {
        &self.egress_file
    }

    pub fn egress_every_frame(&self) -> bool {
        self.egress_every_frame
    }

    pub fn metrics_interval_frames(&self) -> u64 {
        self.metrics_interval_frames
    }

    pub fn config_file(&self) -> &str {
        &self.config_file
    }

    /// Builder method to override the patience threshold
    pub fn with_patience(mut self, patience: u32) -> Self {
        self.patience = patience;
        self
    }

    /// Builder method to override the pass distance threshold
    pub fn with_pass_distance_threshold(mut self, threshold: f64) -> Self {
        self.pass_distance_threshold = threshold;
        self
    }

    /// Builder method to select the assignment strategy
    pub fn with_assignment(mut self, assignment: AssignmentStrategy) -> Self {
        self.assignment = assignment;
        self
    }

    /// Builder method to redirect egress output
    pub fn with_egress_file(mut self, file: &str) -> Self {
        self.egress_file = file.to_string();
        self
    }

    /// Builder method to choose per-frame or end-of-run egress
    pub fn with_egress_every_frame(mut self, every_frame: bool) -> Self {
        self.egress_every_frame = every_frame;
        self
    }

    /// Builder method to set the periodic metrics report interval (0 disables)
    pub fn with_metrics_interval_frames(mut self, frames: u64) -> Self {
        self.metrics_interval_frames = frames;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.patience(), 50);
        assert_eq!(config.assignment(), AssignmentStrategy::Greedy);
        assert_eq!(config.sample_half_size(), 20);
        assert_eq!(config.pass_distance_threshold(), 20.0);
        assert_eq!(config.person_min_confidence(), 0.5);
        assert_eq!(config.ball_min_confidence(), 0.3);
        assert_eq!(config.frame_stride(), 1);
        assert_eq!(config.light_bands().len(), 1);
        assert_eq!(config.red_bands().len(), 2);
        assert_eq!(config.config_file(), "default");
    }

    #[test]
    fn test_side_labels() {
        let config = Config::default();
        assert_eq!(config.side_label(Side::A), "Spain");
        assert_eq!(config.side_label(Side::B), "Portugal");
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let toml_config: TomlConfig = toml::from_str(
            r#"
[tracker]
patience = 5

[detections]
frame_stride = 0
"#,
        )
        .unwrap();
        let config = Config::from_toml(toml_config, "inline".to_string());

        assert_eq!(config.patience(), 5);
        assert_eq!(config.frame_stride(), 1);
        assert_eq!(config.pass_distance_threshold(), 20.0);
        assert_eq!(config.egress_file(), "stats.jsonl");
    }

    #[test]
    fn test_resolve_config_path_from_arg() {
        assert_eq!(Config::resolve_config_path(Some("config/match.toml")), "config/match.toml");
    }

    #[test]
    fn test_builders() {
        let config = Config::default()
            .with_patience(3)
            .with_pass_distance_threshold(35.0)
            .with_assignment(AssignmentStrategy::Optimal)
            .with_egress_file("out/stats.jsonl")
            .with_egress_every_frame(false)
            .with_metrics_interval_frames(0);
        assert_eq!(config.patience(), 3);
        assert_eq!(config.pass_distance_threshold(), 35.0);
        assert_eq!(config.assignment(), AssignmentStrategy::Optimal);
        assert_eq!(config.egress_file(), "out/stats.jsonl");
        assert!(!config.egress_every_frame());
        assert_eq!(config.metrics_interval_frames(), 0);
    }
}
