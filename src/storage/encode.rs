use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ColorType, ImageEncoder};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use super::dirs::SessionLayout;
use crate::error::{CaptureError, CaptureResult};
use crate::sensor::{ColorFrame, DepthFrame};

/// Container used for persisted depth frames
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DepthFormat {
    /// Single-channel JPEG of the intensity image
    #[default]
    Jpeg,
    /// Lossless 32-bit PNG of the expanded buffer
    Png,
}

impl DepthFormat {
    pub fn extension(self) -> &'static str {
        match self {
            DepthFormat::Jpeg => "jpg",
            DepthFormat::Png => "png",
        }
    }
}

/// Writes RGBA color frames as JPEG files
///
/// Output: `<session>/color/<phrase>_color_<n>.jpg`. The index is owned by
/// the caller's commit, which numbers each session's frames from 1.
pub struct ColorFrameEncoder {
    width: u32,
    height: u32,
    quality: u8,
}

impl ColorFrameEncoder {
    pub fn new(width: u32, height: u32, quality: u8) -> Self {
        Self {
            width,
            height,
            quality,
        }
    }

    pub fn encode(
        &self,
        frame: &ColorFrame,
        layout: &SessionLayout,
        index: u32,
    ) -> CaptureResult<PathBuf> {
        let expected = self.width as usize * self.height as usize * 4;
        if frame.width != self.width || frame.height != self.height || frame.pixels.len() != expected
        {
            return Err(CaptureError::FrameSize {
                kind: "color",
                expected,
                actual: frame.pixels.len(),
            });
        }

        let path = layout
            .color_dir()
            .join(format!("{}_color_{}.jpg", layout.phrase, index));

        let bytes = color_to_jpeg(frame, self.quality).map_err(|source| CaptureError::Encode {
            path: path.clone(),
            source,
        })?;

        write_file(&path, &bytes)?;
        Ok(path)
    }
}

/// Compress an RGBA frame to JPEG bytes (alpha is dropped)
pub fn color_to_jpeg(frame: &ColorFrame, quality: u8) -> image::ImageResult<Vec<u8>> {
    let rgb: Vec<u8> = frame
        .pixels
        .chunks_exact(4)
        .flat_map(|px| [px[0], px[1], px[2]])
        .collect();

    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, quality).encode(
        &rgb,
        frame.width,
        frame.height,
        ColorType::Rgb8,
    )?;
    Ok(bytes)
}

/// Map one depth sample to an 8-bit intensity
///
/// Samples inside `[min, max]` scale linearly against `max`; everything else
/// (including every sample when `max` is 0) maps to 0.
pub fn depth_intensity(sample: u16, min: u16, max: u16) -> u8 {
    if max == 0 || sample < min || sample > max {
        return 0;
    }
    ((sample as u32 * 255) / max as u32) as u8
}

/// Expand a depth frame to a 32-bit B, G, R, A grayscale buffer (A = 255)
pub fn depth_to_bgra(frame: &DepthFrame) -> Vec<u8> {
    let mut pixels = Vec::with_capacity(frame.samples.len() * 4);
    for &sample in &frame.samples {
        let intensity = depth_intensity(sample, frame.min_reliable, frame.max_reliable);
        pixels.extend_from_slice(&[intensity, intensity, intensity, 255]);
    }
    pixels
}

/// Writes depth frames as grayscale images
///
/// Output: `<session>/depth/<phrase>_depth_<n>.<jpg|png>`
pub struct DepthFrameEncoder {
    width: u32,
    height: u32,
    format: DepthFormat,
    quality: u8,
}

impl DepthFrameEncoder {
    pub fn new(width: u32, height: u32, format: DepthFormat, quality: u8) -> Self {
        Self {
            width,
            height,
            format,
            quality,
        }
    }

    pub fn encode(
        &self,
        frame: &DepthFrame,
        layout: &SessionLayout,
        index: u32,
    ) -> CaptureResult<PathBuf> {
        let expected = self.width as usize * self.height as usize;
        if frame.width != self.width || frame.height != self.height || frame.samples.len() != expected
        {
            return Err(CaptureError::FrameSize {
                kind: "depth",
                expected,
                actual: frame.samples.len(),
            });
        }

        let path = layout.depth_dir().join(format!(
            "{}_depth_{}.{}",
            layout.phrase,
            index,
            self.format.extension()
        ));

        let bgra = depth_to_bgra(frame);
        let mut bytes = Vec::new();
        let result = match self.format {
            DepthFormat::Jpeg => {
                // B == G == R, so one channel carries the whole image
                let gray: Vec<u8> = bgra.chunks_exact(4).map(|px| px[0]).collect();
                let mut encoder = JpegEncoder::new_with_quality(&mut bytes, self.quality);
                encoder.encode(&gray, self.width, self.height, ColorType::L8)
            }
            DepthFormat::Png => {
                let rgba: Vec<u8> = bgra
                    .chunks_exact(4)
                    .flat_map(|px| [px[2], px[1], px[0], px[3]])
                    .collect();
                PngEncoder::new(&mut bytes).write_image(
                    &rgba,
                    self.width,
                    self.height,
                    ColorType::Rgba8,
                )
            }
        };
        result.map_err(|source| CaptureError::Encode {
            path: path.clone(),
            source,
        })?;

        write_file(&path, &bytes)?;
        Ok(path)
    }
}

fn write_file(path: &Path, bytes: &[u8]) -> CaptureResult<()> {
    fs::write(path, bytes).map_err(|e| CaptureError::io(path, e))
}
