use std::collections::VecDeque;

use crate::sensor::{ColorFrame, DepthFrame};

/// Frames queued for the open session
///
/// Color and depth are queued independently and may differ in length when
/// the two streams delivered at different rates.
#[derive(Debug, Default)]
pub struct FrameIngestBuffer {
    color: VecDeque<ColorFrame>,
    depth: VecDeque<DepthFrame>,
}

impl FrameIngestBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_color(&mut self, frame: ColorFrame) {
        self.color.push_back(frame);
    }

    pub fn push_depth(&mut self, frame: DepthFrame) {
        self.depth.push_back(frame);
    }

    pub fn color_len(&self) -> usize {
        self.color.len()
    }

    pub fn depth_len(&self) -> usize {
        self.depth.len()
    }

    pub fn is_empty(&self) -> bool {
        self.color.is_empty() && self.depth.is_empty()
    }

    /// Drop every queued frame; returns (color, depth) counts dropped
    pub fn clear(&mut self) -> (usize, usize) {
        let dropped = (self.color.len(), self.depth.len());
        self.color.clear();
        self.depth.clear();
        dropped
    }

    /// Move both queues out, oldest frame first, leaving the buffer empty
    pub fn take(&mut self) -> (VecDeque<ColorFrame>, VecDeque<DepthFrame>) {
        (
            std::mem::take(&mut self.color),
            std::mem::take(&mut self.depth),
        )
    }
}
