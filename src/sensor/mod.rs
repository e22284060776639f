pub mod body;
pub mod frames;
pub mod source;
pub mod synthetic;

pub use body::{Body, JointType, Position, Quaternion};
pub use frames::{BodyFrame, ColorFrame, DepthFrame, MultiSourceFrame};
pub use source::{SensorKind, SensorSource, SensorSourceFactory, SensorStreams};
pub use synthetic::SyntheticSensor;
