// Synthetic sensor producing generated color, depth and body streams

use anyhow::{bail, Result};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;

use super::body::{Body, JointType, Position, Quaternion, JOINT_COUNT};
use super::frames::{BodyFrame, ColorFrame, DepthFrame, MultiSourceFrame};
use super::source::{SensorSource, SensorStreams};

/// Body slots reported per frame, tracked or not
pub const BODY_SLOTS: usize = 6;

const MIN_RELIABLE_MM: u16 = 500;
const MAX_RELIABLE_MM: u16 = 4500;

/// Synthetic sensor
///
/// Emits one body frame and one color/depth frame per tick from two
/// independent tasks, so consumers see the same scheduling freedom a real
/// sensor gives them.
pub struct SyntheticSensor {
    fps: u32,
    tracked_bodies: usize,
    color_size: (u32, u32),
    depth_size: (u32, u32),
    tasks: Vec<JoinHandle<()>>,
    capturing: bool,
}

impl SyntheticSensor {
    pub fn new(
        fps: u32,
        tracked_bodies: usize,
        color_size: (u32, u32),
        depth_size: (u32, u32),
    ) -> Self {
        info!(
            "Synthetic sensor initialized ({} fps, {} tracked bodies, color {}x{}, depth {}x{})",
            fps, tracked_bodies, color_size.0, color_size.1, depth_size.0, depth_size.1
        );

        Self {
            fps: fps.max(1),
            tracked_bodies: tracked_bodies.min(BODY_SLOTS),
            color_size,
            depth_size,
            tasks: Vec::new(),
            capturing: false,
        }
    }

    fn tick_period(&self) -> Duration {
        Duration::from_micros(1_000_000 / self.fps as u64)
    }
}

#[async_trait::async_trait]
impl SensorSource for SyntheticSensor {
    async fn start(&mut self) -> Result<SensorStreams> {
        if self.capturing {
            bail!("Already capturing");
        }

        info!("Starting synthetic sensor");

        let (body_tx, body_rx) = mpsc::channel(64);
        let (frame_tx, frame_rx) = mpsc::channel(8);
        let period = self.tick_period();
        let tracked = self.tracked_bodies;

        self.tasks.push(tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            let mut tick: u64 = 0;
            loop {
                interval.tick().await;
                let frame = synthetic_body_frame(tick, tracked, period);
                if body_tx.send(frame).await.is_err() {
                    break;
                }
                tick += 1;
            }
        }));

        let (color_w, color_h) = self.color_size;
        let (depth_w, depth_h) = self.depth_size;

        self.tasks.push(tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            let mut tick: u64 = 0;
            loop {
                interval.tick().await;
                let frame = MultiSourceFrame {
                    color: Some(synthetic_color_frame(tick, color_w, color_h)),
                    depth: Some(synthetic_depth_frame(tick, depth_w, depth_h)),
                };
                if frame_tx.send(frame).await.is_err() {
                    break;
                }
                tick += 1;
            }
        }));

        self.capturing = true;

        info!("Synthetic sensor started");

        Ok(SensorStreams {
            bodies: body_rx,
            frames: frame_rx,
        })
    }

    async fn stop(&mut self) -> Result<()> {
        if !self.capturing {
            return Ok(());
        }

        info!("Stopping synthetic sensor");

        for task in self.tasks.drain(..) {
            task.abort();
        }

        self.capturing = false;

        Ok(())
    }

    fn is_available(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "Synthetic"
    }
}

/// Body frame with `tracked` bodies in a slowly waving T-pose
pub fn synthetic_body_frame(tick: u64, tracked: usize, period: Duration) -> BodyFrame {
    let phase = tick as f64 * 0.1;
    let bodies = (0..BODY_SLOTS)
        .map(|slot| {
            if slot < tracked {
                t_pose(slot as u64 + 1, slot as f64 * 0.8, phase)
            } else {
                Body::untracked()
            }
        })
        .collect();

    BodyFrame {
        bodies,
        timestamp_ms: tick * period.as_millis() as u64,
    }
}

fn t_pose(tracking_id: u64, offset_x: f64, phase: f64) -> Body {
    let mut body = Body {
        tracking_id,
        ..Body::default()
    };
    let lift = phase.sin() * 0.1;
    let at = |x: f64, y: f64| Position::new(offset_x + x, y, 2.5);

    body.set_position(JointType::Head, at(0.0, 1.7));
    body.set_position(JointType::Neck, at(0.0, 1.5));
    body.set_position(JointType::SpineShoulder, at(0.0, 1.45));
    body.set_position(JointType::SpineMid, at(0.0, 1.2));
    body.set_position(JointType::SpineBase, at(0.0, 0.95));
    body.set_position(JointType::ShoulderLeft, at(-0.2, 1.45));
    body.set_position(JointType::ShoulderRight, at(0.2, 1.45));
    body.set_position(JointType::ElbowLeft, at(-0.45, 1.45 + lift));
    body.set_position(JointType::ElbowRight, at(0.45, 1.45 - lift));
    body.set_position(JointType::WristLeft, at(-0.7, 1.45 + 2.0 * lift));
    body.set_position(JointType::WristRight, at(0.7, 1.45 - 2.0 * lift));
    body.set_position(JointType::HandLeft, at(-0.78, 1.45 + 2.0 * lift));
    body.set_position(JointType::HandRight, at(0.78, 1.45 - 2.0 * lift));
    body.set_position(JointType::HandTipLeft, at(-0.85, 1.45 + 2.0 * lift));
    body.set_position(JointType::HandTipRight, at(0.85, 1.45 - 2.0 * lift));
    body.set_position(JointType::ThumbLeft, at(-0.8, 1.5 + 2.0 * lift));
    body.set_position(JointType::ThumbRight, at(0.8, 1.5 - 2.0 * lift));
    body.set_position(JointType::HipLeft, at(-0.12, 0.9));
    body.set_position(JointType::HipRight, at(0.12, 0.9));
    body.set_position(JointType::KneeLeft, at(-0.12, 0.5));
    body.set_position(JointType::KneeRight, at(0.12, 0.5));

    let half = phase / 2.0;
    let swing = Quaternion {
        w: half.cos(),
        x: 0.0,
        y: 0.0,
        z: half.sin(),
    };
    body.orientations = [swing; JOINT_COUNT];

    body
}

/// Horizontal gradient that shifts with the tick
pub fn synthetic_color_frame(tick: u64, width: u32, height: u32) -> ColorFrame {
    let mut pixels = Vec::with_capacity(width as usize * height as usize * 4);
    for y in 0..height {
        for x in 0..width {
            let r = ((x as u64 + tick) % 256) as u8;
            let g = ((y as u64 * 255) / height.max(1) as u64) as u8;
            pixels.extend_from_slice(&[r, g, 128, 255]);
        }
    }
    ColorFrame::new(pixels, width, height)
}

/// Depth ramp across the reliable range, with the border outside it
pub fn synthetic_depth_frame(tick: u64, width: u32, height: u32) -> DepthFrame {
    let span = (MAX_RELIABLE_MM - MIN_RELIABLE_MM) as u64;
    let samples = (0..height)
        .flat_map(|y| {
            (0..width).map(move |x| {
                if x == 0 || y == 0 {
                    0
                } else {
                    MIN_RELIABLE_MM + ((x as u64 * span / width as u64 + tick) % span) as u16
                }
            })
        })
        .collect();

    DepthFrame {
        samples,
        width,
        height,
        min_reliable: MIN_RELIABLE_MM,
        max_reliable: MAX_RELIABLE_MM,
    }
}
