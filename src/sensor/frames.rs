use super::body::Body;

/// One RGBA color image captured at a sensor tick
#[derive(Debug, Clone)]
pub struct ColorFrame {
    /// Raw pixels, 4 bytes per pixel (R, G, B, A), row-major
    pub pixels: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl ColorFrame {
    pub fn new(pixels: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            pixels,
            width,
            height,
        }
    }

    pub fn expected_len(&self) -> usize {
        self.width as usize * self.height as usize * 4
    }
}

/// One depth image plus the reliable-distance bounds valid for its tick
#[derive(Debug, Clone)]
pub struct DepthFrame {
    /// One sample per pixel, in millimetres
    pub samples: Vec<u16>,
    pub width: u32,
    pub height: u32,
    /// Closest reliable distance for this tick
    pub min_reliable: u16,
    /// Farthest reliable distance for this tick
    pub max_reliable: u16,
}

impl DepthFrame {
    pub fn expected_len(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// Combined color/depth arrival; either half may be missing on a given tick
#[derive(Debug, Clone, Default)]
pub struct MultiSourceFrame {
    pub color: Option<ColorFrame>,
    pub depth: Option<DepthFrame>,
}

/// Snapshot of every body slot reported by the sensor on one tick
#[derive(Debug, Clone, Default)]
pub struct BodyFrame {
    /// All slots, including untracked ones (tracking id 0)
    pub bodies: Vec<Body>,
    /// Sensor timestamp in milliseconds
    pub timestamp_ms: u64,
}

impl BodyFrame {
    /// Bodies with a non-zero tracking identity
    pub fn tracked(&self) -> impl Iterator<Item = &Body> {
        self.bodies.iter().filter(|b| b.is_tracked())
    }

    pub fn tracked_count(&self) -> usize {
        self.tracked().count()
    }
}
