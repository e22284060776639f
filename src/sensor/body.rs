//! Skeletal body model and the per-tick sample line built from it
//!
//! A sample line is:
//! - normalized positions (x y z) of [`POSITION_JOINTS`], rounded to 5 places
//! - the separator token `|||`
//! - orientation quaternions (w x y z) of [`ORIENTATION_JOINTS`], rounded to 7 places
//!
//! Positions are divided by half the summed length of the six arm bones
//! (neck-shoulder, shoulder-elbow, elbow-wrist on both sides) so samples are
//! comparable across signers of different size.

use serde::{Deserialize, Serialize};

/// Separator between the position block and the orientation block
pub const SECTION_SEPARATOR: &str = "|||";

/// Joint identifiers in sensor order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JointType {
    SpineBase = 0,
    SpineMid = 1,
    Neck = 2,
    Head = 3,
    ShoulderLeft = 4,
    ElbowLeft = 5,
    WristLeft = 6,
    HandLeft = 7,
    ShoulderRight = 8,
    ElbowRight = 9,
    WristRight = 10,
    HandRight = 11,
    HipLeft = 12,
    KneeLeft = 13,
    AnkleLeft = 14,
    FootLeft = 15,
    HipRight = 16,
    KneeRight = 17,
    AnkleRight = 18,
    FootRight = 19,
    SpineShoulder = 20,
    HandTipLeft = 21,
    ThumbLeft = 22,
    HandTipRight = 23,
    ThumbRight = 24,
}

pub const JOINT_COUNT: usize = 25;

/// Joints whose positions appear in a sample line, in order
pub const POSITION_JOINTS: [JointType; 20] = [
    JointType::Head,
    JointType::Neck,
    JointType::ShoulderRight,
    JointType::ShoulderLeft,
    JointType::SpineShoulder,
    JointType::ElbowRight,
    JointType::ElbowLeft,
    JointType::WristRight,
    JointType::WristLeft,
    JointType::HandRight,
    JointType::HandLeft,
    JointType::ThumbRight,
    JointType::ThumbLeft,
    JointType::HandTipRight,
    JointType::HandTipLeft,
    JointType::HipRight,
    JointType::HipLeft,
    JointType::SpineBase,
    JointType::KneeRight,
    JointType::KneeLeft,
];

/// Joints whose orientations appear in a sample line, in order (knees excluded)
pub const ORIENTATION_JOINTS: [JointType; 18] = [
    JointType::Head,
    JointType::Neck,
    JointType::ShoulderRight,
    JointType::ShoulderLeft,
    JointType::SpineShoulder,
    JointType::ElbowRight,
    JointType::ElbowLeft,
    JointType::WristRight,
    JointType::WristLeft,
    JointType::HandRight,
    JointType::HandLeft,
    JointType::ThumbRight,
    JointType::ThumbLeft,
    JointType::HandTipRight,
    JointType::HandTipLeft,
    JointType::HipRight,
    JointType::HipLeft,
    JointType::SpineBase,
];

impl JointType {
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Camera-space position in metres
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn distance(&self, other: &Position) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2) + (self.z - other.z).powi(2))
            .sqrt()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    pub w: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Default for Quaternion {
    fn default() -> Self {
        Self {
            w: 1.0,
            x: 0.0,
            y: 0.0,
            z: 0.0,
        }
    }
}

/// One body slot as reported by the sensor
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Body {
    /// 0 means the slot is not tracking anyone
    pub tracking_id: u64,
    pub positions: [Position; JOINT_COUNT],
    pub orientations: [Quaternion; JOINT_COUNT],
}

impl Body {
    pub fn untracked() -> Self {
        Self::default()
    }

    pub fn is_tracked(&self) -> bool {
        self.tracking_id != 0
    }

    pub fn position(&self, joint: JointType) -> Position {
        self.positions[joint.index()]
    }

    pub fn orientation(&self, joint: JointType) -> Quaternion {
        self.orientations[joint.index()]
    }

    pub fn set_position(&mut self, joint: JointType, position: Position) {
        self.positions[joint.index()] = position;
    }

    pub fn set_orientation(&mut self, joint: JointType, orientation: Quaternion) {
        self.orientations[joint.index()] = orientation;
    }

    /// Half the summed length of both arms (neck to wrist)
    pub fn arm_span_norm(&self) -> f64 {
        let bone = |a: JointType, b: JointType, places: u32| {
            round_to(self.position(a).distance(&self.position(b)), places)
        };

        let l0 = bone(JointType::Neck, JointType::ShoulderLeft, 5);
        let r0 = bone(JointType::Neck, JointType::ShoulderRight, 5);
        let l1 = bone(JointType::ShoulderLeft, JointType::ElbowLeft, 5);
        let r1 = bone(JointType::ShoulderRight, JointType::ElbowRight, 5);
        let l2 = bone(JointType::ElbowLeft, JointType::WristLeft, 4);
        let r2 = bone(JointType::ElbowRight, JointType::WristRight, 4);

        (l0 + l1 + l2 + r0 + r1 + r2) / 2.0
    }

    /// Build the skeletal sample line for this body (without trailing newline)
    pub fn sample_line(&self) -> String {
        let norm = self.arm_span_norm();
        // Degenerate skeleton (all arm joints coincide): emit raw positions
        let norm = if norm > 0.0 && norm.is_finite() { norm } else { 1.0 };

        let mut fields: Vec<String> =
            Vec::with_capacity(POSITION_JOINTS.len() * 3 + 1 + ORIENTATION_JOINTS.len() * 4);

        for joint in POSITION_JOINTS {
            let p = self.position(joint);
            fields.push(format_value(p.x / norm, 5));
            fields.push(format_value(p.y / norm, 5));
            fields.push(format_value(p.z / norm, 5));
        }

        fields.push(SECTION_SEPARATOR.to_string());

        for joint in ORIENTATION_JOINTS {
            let q = self.orientation(joint);
            fields.push(format_value(q.w, 7));
            fields.push(format_value(q.x, 7));
            fields.push(format_value(q.y, 7));
            fields.push(format_value(q.z, 7));
        }

        fields.join(" ")
    }
}

fn round_to(value: f64, places: u32) -> f64 {
    let scale = 10f64.powi(places as i32);
    (value * scale).round() / scale
}

fn format_value(value: f64, places: u32) -> String {
    let rounded = round_to(value, places);
    // Avoid "-0" in the output
    if rounded == 0.0 {
        "0".to_string()
    } else {
        format!("{}", rounded)
    }
}
