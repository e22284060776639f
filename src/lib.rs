pub mod capture;
pub mod config;
pub mod error;
pub mod health;
pub mod http;
pub mod joints;
pub mod phrase;
pub mod sensor;
pub mod storage;

pub use capture::{
    CapturePipeline, GuardPolicy, QualityGate, RecorderStatus, RunState, SessionOutcome,
    SessionRecorder,
};
pub use config::{CaptureConfig, Config};
pub use error::{CaptureError, CaptureResult};
pub use health::{HealthMonitor, HealthReport};
pub use http::{create_router, AppState};
pub use joints::{FileJointWriter, JointStreamWriter};
pub use phrase::PhraseContext;
pub use sensor::{BodyFrame, ColorFrame, DepthFrame, MultiSourceFrame, SensorSource};
pub use storage::{ColorFrameEncoder, DepthFormat, DepthFrameEncoder, SessionDirectoryManager};
