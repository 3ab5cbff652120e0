//! Daemon configuration.
//!
//! Settings come from an optional JSON file (`--config` or the
//! `PERCEPT_CONFIG` env var), then `PERCEPT_*` env overrides, then
//! validation. Everything that is a policy choice rather than an invariant
//! lives here: the pacing interval, stream address, JPEG quality, capture
//! geometry, and the model descriptor.

use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::capture::CameraConfig;
use crate::infer::{ModelCapability, ModelDescriptor};
use crate::preprocess::TargetSize;

const DEFAULT_STREAM_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_STREAM_CHANNEL: &str = "/stream";
const DEFAULT_JPEG_QUALITY: u8 = 90;
const DEFAULT_INTERVAL_MS: u64 = 100;
const DEFAULT_CAPTURE_WIDTH: u32 = 640;
const DEFAULT_CAPTURE_HEIGHT: u32 = 480;
const DEFAULT_CAPTURE_FPS: u32 = 10;
const DEFAULT_MODEL_NAME: &str = "stub";
const DEFAULT_INPUT_WIDTH: u32 = 96;
const DEFAULT_INPUT_HEIGHT: u32 = 96;

#[derive(Debug, Deserialize, Default)]
struct PerceptConfigFile {
    interval_ms: Option<u64>,
    stream: Option<StreamConfigFile>,
    capture: Option<CaptureConfigFile>,
    model: Option<ModelConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct StreamConfigFile {
    addr: Option<String>,
    channel: Option<String>,
    jpeg_quality: Option<u8>,
}

#[derive(Debug, Deserialize, Default)]
struct CaptureConfigFile {
    device: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    target_fps: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct ModelConfigFile {
    name: Option<String>,
    path: Option<PathBuf>,
    capability: Option<String>,
    input_width: Option<u32>,
    input_height: Option<u32>,
    labels: Option<Vec<String>>,
}

#[derive(Debug, Clone)]
pub struct PerceptConfig {
    pub interval: Duration,
    pub stream: StreamSettings,
    pub capture: CameraConfig,
    pub model: ModelSettings,
}

#[derive(Debug, Clone)]
pub struct StreamSettings {
    pub addr: String,
    pub channel: String,
    pub jpeg_quality: u8,
}

#[derive(Debug, Clone)]
pub struct ModelSettings {
    pub name: String,
    pub model_path: Option<PathBuf>,
    pub capability: ModelCapability,
    pub input: TargetSize,
    pub labels: Vec<String>,
}

impl ModelSettings {
    pub fn descriptor(&self) -> ModelDescriptor {
        ModelDescriptor {
            name: self.name.clone(),
            capability: self.capability,
            input: self.input,
            labels: self.labels.clone(),
        }
    }
}

impl PerceptConfig {
    /// Load from the `PERCEPT_CONFIG` file (if set), then apply env
    /// overrides and validate.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("PERCEPT_CONFIG").ok().map(PathBuf::from);
        Self::load_from(config_path.as_deref())
    }

    /// Same as `load`, with an explicit config-file path taking precedence
    /// over `PERCEPT_CONFIG`.
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let file_cfg = match path {
            Some(path) => read_config_file(path)?,
            None => PerceptConfigFile::default(),
        };
        let mut cfg = Self::from_file(file_cfg)?;
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: PerceptConfigFile) -> Result<Self> {
        let stream = StreamSettings {
            addr: file
                .stream
                .as_ref()
                .and_then(|s| s.addr.clone())
                .unwrap_or_else(|| DEFAULT_STREAM_ADDR.to_string()),
            channel: file
                .stream
                .as_ref()
                .and_then(|s| s.channel.clone())
                .unwrap_or_else(|| DEFAULT_STREAM_CHANNEL.to_string()),
            jpeg_quality: file
                .stream
                .as_ref()
                .and_then(|s| s.jpeg_quality)
                .unwrap_or(DEFAULT_JPEG_QUALITY),
        };
        let capture = CameraConfig {
            device: file
                .capture
                .as_ref()
                .and_then(|c| c.device.clone())
                .unwrap_or_else(|| CameraConfig::default().device),
            width: file
                .capture
                .as_ref()
                .and_then(|c| c.width)
                .unwrap_or(DEFAULT_CAPTURE_WIDTH),
            height: file
                .capture
                .as_ref()
                .and_then(|c| c.height)
                .unwrap_or(DEFAULT_CAPTURE_HEIGHT),
            target_fps: file
                .capture
                .as_ref()
                .and_then(|c| c.target_fps)
                .unwrap_or(DEFAULT_CAPTURE_FPS),
        };
        let model = ModelSettings {
            name: file
                .model
                .as_ref()
                .and_then(|m| m.name.clone())
                .unwrap_or_else(|| DEFAULT_MODEL_NAME.to_string()),
            model_path: file.model.as_ref().and_then(|m| m.path.clone()),
            capability: match file.model.as_ref().and_then(|m| m.capability.as_deref()) {
                Some(value) => parse_capability(value)?,
                None => ModelCapability::Classification,
            },
            input: TargetSize {
                width: file
                    .model
                    .as_ref()
                    .and_then(|m| m.input_width)
                    .unwrap_or(DEFAULT_INPUT_WIDTH),
                height: file
                    .model
                    .as_ref()
                    .and_then(|m| m.input_height)
                    .unwrap_or(DEFAULT_INPUT_HEIGHT),
            },
            labels: file
                .model
                .and_then(|m| m.labels)
                .unwrap_or_else(|| vec!["background".to_string(), "object".to_string()]),
        };
        Ok(Self {
            interval: Duration::from_millis(file.interval_ms.unwrap_or(DEFAULT_INTERVAL_MS)),
            stream,
            capture,
            model,
        })
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(addr) = std::env::var("PERCEPT_STREAM_ADDR") {
            if !addr.trim().is_empty() {
                self.stream.addr = addr;
            }
        }
        if let Ok(quality) = std::env::var("PERCEPT_JPEG_QUALITY") {
            self.stream.jpeg_quality = quality
                .parse()
                .map_err(|_| anyhow!("PERCEPT_JPEG_QUALITY must be an integer 1..=100"))?;
        }
        if let Ok(interval) = std::env::var("PERCEPT_INTERVAL_MS") {
            let ms: u64 = interval
                .parse()
                .map_err(|_| anyhow!("PERCEPT_INTERVAL_MS must be an integer number of ms"))?;
            self.interval = Duration::from_millis(ms);
        }
        if let Ok(device) = std::env::var("PERCEPT_DEVICE") {
            if !device.trim().is_empty() {
                self.capture.device = device;
            }
        }
        if let Ok(path) = std::env::var("PERCEPT_MODEL_PATH") {
            if !path.trim().is_empty() {
                self.model.model_path = Some(PathBuf::from(path));
            }
        }
        if let Ok(capability) = std::env::var("PERCEPT_MODEL_CAPABILITY") {
            self.model.capability = parse_capability(&capability)?;
        }
        if let Ok(labels) = std::env::var("PERCEPT_MODEL_LABELS") {
            let parsed = split_csv(&labels);
            if !parsed.is_empty() {
                self.model.labels = parsed;
            }
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.interval.is_zero() {
            return Err(anyhow!("interval_ms must be greater than zero"));
        }
        if !(1..=100).contains(&self.stream.jpeg_quality) {
            return Err(anyhow!("jpeg_quality must be in 1..=100"));
        }
        if self.capture.width == 0 || self.capture.height == 0 {
            return Err(anyhow!("capture dimensions must be nonzero"));
        }
        if self.model.input.width == 0 || self.model.input.height == 0 {
            return Err(anyhow!("model input dimensions must be nonzero"));
        }
        if self.model.capability == ModelCapability::Classification && self.model.labels.is_empty()
        {
            return Err(anyhow!("classification models need at least one label"));
        }
        Ok(())
    }
}

fn parse_capability(value: &str) -> Result<ModelCapability> {
    match value.trim().to_ascii_lowercase().as_str() {
        "classification" => Ok(ModelCapability::Classification),
        "detection" => Ok(ModelCapability::Detection),
        other => Err(anyhow!(
            "unknown model capability '{}' (expected classification or detection)",
            other
        )),
    }
}

fn read_config_file(path: &Path) -> Result<PerceptConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    serde_json::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))
}

fn split_csv(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|entry| entry.trim())
        .filter(|entry| !entry.is_empty())
        .map(|entry| entry.to_string())
        .collect()
}
