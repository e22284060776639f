//! Durable per-session storage
//!
//! - `dirs`: collision-free session directory allocation
//! - `encode`: color and depth frame encoders

pub mod dirs;
pub mod encode;

pub use dirs::{SessionDirectoryManager, SessionLayout, COLOR_DIR, DEPTH_DIR};
pub use encode::{
    color_to_jpeg, depth_intensity, depth_to_bgra, ColorFrameEncoder, DepthFormat,
    DepthFrameEncoder,
};
