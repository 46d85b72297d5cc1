//! Face detections as delivered by an external face-landmark model

use crate::surface::Surface;
use anyhow::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn midpoint(self, other: Point) -> Point {
        Point::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }

    pub fn distance(self, other: Point) -> f32 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Face box in frame pixel space
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Has a finite, positive area
    pub fn is_usable(&self) -> bool {
        [self.x, self.y, self.width, self.height].iter().all(|v| v.is_finite())
            && self.width > 0.0
            && self.height > 0.0
    }
}

/// Head rotation estimate in degrees
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rotation {
    pub pitch: f32,
    pub yaw: f32,
    pub roll: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DetectionState {
    #[default]
    NotDetected,
    Detected,
}

/// One face found in one frame
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaceDetection {
    pub state: DetectionState,
    #[serde(default)]
    pub rotation: Rotation,
    #[serde(default)]
    pub mouth_open: f32,
    /// Ordered landmarks; empty when the detector does not produce them
    #[serde(default)]
    pub landmarks: Vec<Point>,
    pub bounding_box: BoundingBox,
    #[serde(default)]
    pub confidence: Option<f32>,
}

impl FaceDetection {
    pub fn detected(bounding_box: BoundingBox, landmarks: Vec<Point>) -> Self {
        Self {
            state: DetectionState::Detected,
            bounding_box,
            landmarks,
            ..Self::default()
        }
    }

    pub fn is_detected(&self) -> bool {
        self.state == DetectionState::Detected
    }

    pub fn landmark(&self, index: usize) -> Option<Point> {
        self.landmarks.get(index).copied()
    }
}

/// Landmark indices the facial filters read
///
/// The default follows the 468-point face mesh topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LandmarkLayout {
    pub left_eye: usize,
    pub right_eye: usize,
    pub mouth_left: usize,
    pub mouth_right: usize,
    pub left_cheek: usize,
    pub right_cheek: usize,
}

impl LandmarkLayout {
    pub const FACE_MESH: LandmarkLayout = LandmarkLayout {
        left_eye: 159,
        right_eye: 386,
        mouth_left: 61,
        mouth_right: 291,
        left_cheek: 50,
        right_cheek: 280,
    };

    /// Landmarks needed to locate both eyes
    pub fn eyes_required(&self) -> usize {
        self.left_eye.max(self.right_eye) + 1
    }

    pub fn mouth_required(&self) -> usize {
        self.mouth_left.max(self.mouth_right) + 1
    }

    pub fn cheeks_required(&self) -> usize {
        self.left_cheek.max(self.right_cheek) + 1
    }
}

impl Default for LandmarkLayout {
    fn default() -> Self {
        Self::FACE_MESH
    }
}

/// Face-landmark model collaborator
///
/// Implementations own model loading; `is_ready` stays false until the model
/// can serve `detect`.
pub trait FaceDetector {
    fn is_ready(&self) -> bool {
        true
    }

    /// Detect faces in a frame, in frame pixel coordinates
    fn detect(&mut self, frame: &Surface) -> Result<Vec<FaceDetection>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detection_parses_from_json() {
        let json = r#"{
            "state": "detected",
            "mouthOpen": 0.2,
            "landmarks": [{"x": 1.0, "y": 2.0}],
            "boundingBox": {"x": 10, "y": 20, "width": 30, "height": 40},
            "confidence": 0.9
        }"#;
        let detection: FaceDetection = serde_json::from_str(json).unwrap();
        assert!(detection.is_detected());
        assert_eq!(detection.landmark(0), Some(Point::new(1.0, 2.0)));
        assert_eq!(detection.landmark(1), None);
        assert_eq!(detection.bounding_box.center(), Point::new(25.0, 40.0));
        assert_eq!(detection.rotation, Rotation::default());
    }

    #[test]
    fn face_mesh_requirements() {
        let layout = LandmarkLayout::default();
        assert_eq!(layout.eyes_required(), 387);
        assert_eq!(layout.mouth_required(), 292);
        assert_eq!(layout.cheeks_required(), 281);
    }

    #[test]
    fn degenerate_boxes_are_unusable() {
        assert!(BoundingBox::new(0.0, 0.0, 10.0, 10.0).is_usable());
        assert!(!BoundingBox::new(0.0, 0.0, 0.0, 10.0).is_usable());
        assert!(!BoundingBox::new(f32::NAN, 0.0, 10.0, 10.0).is_usable());
    }
}
