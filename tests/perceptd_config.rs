use std::sync::Mutex;
use std::time::Duration;

use tempfile::NamedTempFile;

use percept::{ModelCapability, PerceptConfig};

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "PERCEPT_CONFIG",
        "PERCEPT_STREAM_ADDR",
        "PERCEPT_JPEG_QUALITY",
        "PERCEPT_INTERVAL_MS",
        "PERCEPT_DEVICE",
        "PERCEPT_MODEL_PATH",
        "PERCEPT_MODEL_CAPABILITY",
        "PERCEPT_MODEL_LABELS",
    ] {
        std::env::remove_var(key);
    }
}

#[test]
fn loads_config_from_file_and_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let json = r#"{
        "interval_ms": 250,
        "stream": {
            "addr": "127.0.0.1:9100",
            "channel": "/live",
            "jpeg_quality": 75
        },
        "capture": {
            "device": "stub://bench",
            "width": 1280,
            "height": 720,
            "target_fps": 15
        },
        "model": {
            "name": "fomo-96",
            "capability": "detection",
            "input_width": 96,
            "input_height": 96,
            "labels": ["person"]
        }
    }"#;
    std::io::Write::write_all(&mut file, json.as_bytes()).expect("write config");

    std::env::set_var("PERCEPT_INTERVAL_MS", "40");
    std::env::set_var("PERCEPT_MODEL_LABELS", "person, bicycle");

    let cfg = PerceptConfig::load_from(Some(file.path())).expect("load config");

    // Env wins over file.
    assert_eq!(cfg.interval, Duration::from_millis(40));
    assert_eq!(cfg.model.labels, vec!["person", "bicycle"]);

    // File wins over defaults.
    assert_eq!(cfg.stream.addr, "127.0.0.1:9100");
    assert_eq!(cfg.stream.channel, "/live");
    assert_eq!(cfg.stream.jpeg_quality, 75);
    assert_eq!(cfg.capture.device, "stub://bench");
    assert_eq!(cfg.capture.width, 1280);
    assert_eq!(cfg.model.capability, ModelCapability::Detection);
    assert_eq!(cfg.model.input.width, 96);
    assert_eq!(cfg.model.name, "fomo-96");

    clear_env();
}

#[test]
fn defaults_apply_without_a_config_file() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let cfg = PerceptConfig::load_from(None).expect("load defaults");

    assert_eq!(cfg.interval, Duration::from_millis(100));
    assert_eq!(cfg.stream.jpeg_quality, 90);
    assert_eq!(cfg.stream.channel, "/stream");
    assert_eq!(cfg.model.capability, ModelCapability::Classification);
    assert_eq!((cfg.model.input.width, cfg.model.input.height), (96, 96));
    assert_eq!((cfg.capture.width, cfg.capture.height), (640, 480));
}

#[test]
fn zero_interval_is_rejected() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("PERCEPT_INTERVAL_MS", "0");
    let err = PerceptConfig::load_from(None).expect_err("zero interval");
    assert!(err.to_string().contains("interval_ms"));
    clear_env();
}

#[test]
fn out_of_range_jpeg_quality_is_rejected() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("PERCEPT_JPEG_QUALITY", "0");
    assert!(PerceptConfig::load_from(None).is_err());
    std::env::set_var("PERCEPT_JPEG_QUALITY", "101");
    assert!(PerceptConfig::load_from(None).is_err());
    clear_env();
}

#[test]
fn unknown_capability_is_rejected() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("PERCEPT_MODEL_CAPABILITY", "segmentation");
    let err = PerceptConfig::load_from(None).expect_err("unknown capability");
    assert!(err.to_string().contains("segmentation"));
    clear_env();
}
