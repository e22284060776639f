use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;

use crate::capture::GuardPolicy;
use crate::error::{CaptureError, CaptureResult};
use crate::sensor::SensorKind;
use crate::storage::DepthFormat;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub capture: CaptureConfig,
    #[serde(default)]
    pub sensor: SensorConfig,
    #[serde(default)]
    pub health: HealthConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

/// Recording pipeline settings
#[derive(Debug, Clone, Deserialize)]
pub struct CaptureConfig {
    /// Root under which `<phrase>/<session>/` trees are written
    pub data_root: PathBuf,

    /// Phrase to preload into the phrase context, if any
    #[serde(default)]
    pub phrase: Option<String>,

    /// First session id probed for a phrase
    #[serde(default = "default_first_session_id")]
    pub first_session_id: u32,

    /// Minimum skeletal samples for a session to be committed
    #[serde(default = "default_min_frames")]
    pub min_frames: usize,

    #[serde(default = "default_color_width")]
    pub color_width: u32,
    #[serde(default = "default_color_height")]
    pub color_height: u32,

    /// JPEG quality for color frames
    #[serde(default = "default_color_quality")]
    pub color_quality: u8,

    #[serde(default = "default_depth_width")]
    pub depth_width: u32,
    #[serde(default = "default_depth_height")]
    pub depth_height: u32,

    #[serde(default)]
    pub depth_format: DepthFormat,

    /// JPEG quality for depth frames (ignored for PNG)
    #[serde(default = "default_depth_quality")]
    pub depth_quality: u8,

    #[serde(default)]
    pub guard_policy: GuardPolicy,
}

fn default_first_session_id() -> u32 {
    1
}

fn default_min_frames() -> usize {
    25
}

fn default_color_width() -> u32 {
    1920
}

fn default_color_height() -> u32 {
    1080
}

fn default_color_quality() -> u8 {
    40
}

fn default_depth_width() -> u32 {
    512
}

fn default_depth_height() -> u32 {
    424
}

fn default_depth_quality() -> u8 {
    90
}

impl CaptureConfig {
    pub fn new(data_root: impl Into<PathBuf>) -> Self {
        Self {
            data_root: data_root.into(),
            phrase: None,
            first_session_id: default_first_session_id(),
            min_frames: default_min_frames(),
            color_width: default_color_width(),
            color_height: default_color_height(),
            color_quality: default_color_quality(),
            depth_width: default_depth_width(),
            depth_height: default_depth_height(),
            depth_format: DepthFormat::default(),
            depth_quality: default_depth_quality(),
            guard_policy: GuardPolicy::default(),
        }
    }

    /// Ensure the data root is usable before any session can start
    pub fn validate(&self) -> CaptureResult<()> {
        if self.data_root.as_os_str().is_empty() {
            return Err(CaptureError::MissingRoot("data_root is empty".to_string()));
        }

        std::fs::create_dir_all(&self.data_root).map_err(|e| {
            CaptureError::MissingRoot(format!("{}: {}", self.data_root.display(), e))
        })?;

        if self.color_width == 0 || self.color_height == 0 {
            return Err(CaptureError::InvalidConfig(
                "color dimensions must be non-zero".to_string(),
            ));
        }

        if self.depth_width == 0 || self.depth_height == 0 {
            return Err(CaptureError::InvalidConfig(
                "depth dimensions must be non-zero".to_string(),
            ));
        }

        if !(1..=100).contains(&self.color_quality) || !(1..=100).contains(&self.depth_quality) {
            return Err(CaptureError::InvalidConfig(
                "JPEG quality must be within 1..=100".to_string(),
            ));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SensorConfig {
    #[serde(default)]
    pub kind: SensorKind,

    /// Ticks per second for the synthetic sensor
    #[serde(default = "default_fps")]
    pub fps: u32,

    /// Tracked bodies reported by the synthetic sensor
    #[serde(default = "default_bodies")]
    pub bodies: usize,
}

fn default_fps() -> u32 {
    30
}

fn default_bodies() -> usize {
    1
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            kind: SensorKind::default(),
            fps: default_fps(),
            bodies: default_bodies(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HealthConfig {
    /// Minimum free space on the data root's disk, in megabytes
    #[serde(default = "default_min_free_mb")]
    pub min_free_mb: u64,
}

fn default_min_free_mb() -> u64 {
    1024
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            min_free_mb: default_min_free_mb(),
        }
    }
}

impl Config {
    /// Load from `path` (any extension `config` understands) with
    /// `PHRASE_CAPTURE__SECTION__KEY` environment overrides
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("PHRASE_CAPTURE").separator("__"))
            .build()
            .with_context(|| format!("Failed to read config from {}", path))?;

        Ok(settings.try_deserialize()?)
    }
}
