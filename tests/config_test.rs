//! Integration tests for configuration loading

use match_analytics::domain::Side;
use match_analytics::infra::Config;
use match_analytics::services::side_classifier::HsvRange;
use match_analytics::services::AssignmentStrategy;
use std::io::Write;
use tempfile::NamedTempFile;

#[test]
fn test_load_config_from_file() {
    let mut temp_file = NamedTempFile::new().unwrap();

    let config_content = r#"
[tracker]
patience = 12
assignment = "optimal"

[classifier]
sample_half_size = 8
light_bands = [[0, 0, 180, 180, 40, 255]]
red_bands = [[170, 120, 90, 180, 255, 255]]

[analyzer]
pass_distance_threshold = 32.5

[detections]
person_min_confidence = 0.6
ball_min_confidence = 0.25
frame_stride = 2

[teams]
side_a = "Home"
side_b = "Away"

[egress]
file = "out/run.jsonl"
every_frame = false

[metrics]
interval_frames = 25
"#;

    temp_file.write_all(config_content.as_bytes()).unwrap();
    temp_file.flush().unwrap();

    let config = Config::from_file(temp_file.path()).unwrap();

    assert_eq!(config.patience(), 12);
    assert_eq!(config.assignment(), AssignmentStrategy::Optimal);
    assert_eq!(config.sample_half_size(), 8);
    assert_eq!(config.light_bands(), &[HsvRange::new([0, 0, 180], [180, 40, 255])]);
    assert_eq!(config.red_bands(), &[HsvRange::new([170, 120, 90], [180, 255, 255])]);
    assert_eq!(config.pass_distance_threshold(), 32.5);
    assert_eq!(config.person_min_confidence(), 0.6);
    assert_eq!(config.ball_min_confidence(), 0.25);
    assert_eq!(config.frame_stride(), 2);
    assert_eq!(config.side_label(Side::A), "Home");
    assert_eq!(config.side_label(Side::B), "Away");
    assert_eq!(config.egress_file(), "out/run.jsonl");
    assert!(!config.egress_every_frame());
    assert_eq!(config.metrics_interval_frames(), 25);
    assert_eq!(config.config_file(), temp_file.path().display().to_string());
}

#[test]
fn test_invalid_toml_is_error() {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(b"[tracker]\npatience = \"many\"\n").unwrap();
    temp_file.flush().unwrap();

    let err = Config::from_file(temp_file.path()).unwrap_err();
    assert!(err.to_string().contains("Failed to parse config file"));
}

#[test]
fn test_unknown_assignment_is_error() {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(b"[tracker]\nassignment = \"random\"\n").unwrap();
    temp_file.flush().unwrap();

    assert!(Config::from_file(temp_file.path()).is_err());
}

#[test]
fn test_load_from_path_fallback() {
    let config = Config::load_from_path("/nonexistent/config.toml");
    assert_eq!(config.patience(), 50);
    assert_eq!(config.assignment(), AssignmentStrategy::Greedy);
    assert_eq!(config.side_label(Side::A), "Spain");
    assert_eq!(config.egress_file(), "stats.jsonl");
}

#[test]
fn test_dev_config_matches_defaults() {
    let config = Config::from_file(concat!(env!("CARGO_MANIFEST_DIR"), "/config/dev.toml")).unwrap();
    let defaults = Config::default();

    assert_eq!(config.patience(), defaults.patience());
    assert_eq!(config.light_bands(), defaults.light_bands());
    assert_eq!(config.red_bands(), defaults.red_bands());
    assert_eq!(config.pass_distance_threshold(), defaults.pass_distance_threshold());
    assert_eq!(config.frame_stride(), defaults.frame_stride());
}
