use crate::capture::CapturePipeline;
use crate::health::HealthMonitor;
use std::sync::Arc;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// The single capture pipeline (one active session at most)
    pub pipeline: Arc<CapturePipeline>,

    pub health: Arc<HealthMonitor>,

    /// JPEG quality for preview snapshots
    pub preview_quality: u8,
}

impl AppState {
    pub fn new(pipeline: Arc<CapturePipeline>, health: Arc<HealthMonitor>) -> Self {
        Self {
            pipeline,
            health,
            preview_quality: 70,
        }
    }
}
