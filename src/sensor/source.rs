use anyhow::Result;
use serde::Deserialize;
use tokio::sync::mpsc;

use super::frames::{BodyFrame, MultiSourceFrame};
use super::synthetic::SyntheticSensor;
use crate::config::SensorConfig;

/// Independent event streams delivered by a running sensor
///
/// The body stream and the combined color/depth stream arrive on their own
/// schedules; consumers must not assume they interleave.
pub struct SensorStreams {
    pub bodies: mpsc::Receiver<BodyFrame>,
    pub frames: mpsc::Receiver<MultiSourceFrame>,
}

/// Body-tracking sensor trait
///
/// Implementations:
/// - Synthetic: generated frames for demos and tests
/// - Kinect: native driver (not available in this build)
#[async_trait::async_trait]
pub trait SensorSource: Send + Sync {
    /// Open the sensor and start delivering frames
    async fn start(&mut self) -> Result<SensorStreams>;

    /// Stop delivering frames
    async fn stop(&mut self) -> Result<()>;

    /// Whether the sensor is connected and usable
    fn is_available(&self) -> bool;

    /// Sensor name for logging
    fn name(&self) -> &str;
}

/// Sensor backend selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorKind {
    #[default]
    Synthetic,
    Kinect,
}

/// Sensor factory
pub struct SensorSourceFactory;

impl SensorSourceFactory {
    pub fn create(
        config: &SensorConfig,
        color_size: (u32, u32),
        depth_size: (u32, u32),
    ) -> Result<Box<dyn SensorSource>> {
        match config.kind {
            SensorKind::Synthetic => Ok(Box::new(SyntheticSensor::new(
                config.fps,
                config.bodies,
                color_size,
                depth_size,
            ))),
            SensorKind::Kinect => {
                anyhow::bail!("Kinect capture is not supported in this build")
            }
        }
    }
}
