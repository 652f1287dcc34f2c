// Data models for holistic landmark tracking (face mesh, body pose, both hands)

use serde::{Deserialize, Serialize};

// ==============================================================================
// Landmark Groups
// ==============================================================================

/// Canonical point count of a face mesh without iris refinement
pub const FACE_LANDMARKS: usize = 468;

/// Canonical point count of a body pose
pub const POSE_LANDMARKS: usize = 33;

/// Canonical point count of one hand
pub const HAND_LANDMARKS: usize = 21;

/// The four landmark groups a holistic tracker reports, in concatenation order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LandmarkGroup {
    Face,
    Pose,
    LeftHand,
    RightHand,
}

impl LandmarkGroup {
    /// All groups in the order they are concatenated into a keypoint row
    pub const ALL: [LandmarkGroup; 4] = [
        LandmarkGroup::Face,
        LandmarkGroup::Pose,
        LandmarkGroup::LeftHand,
        LandmarkGroup::RightHand,
    ];

    /// Number of points the group always has when present
    pub fn canonical_len(&self) -> usize {
        match self {
            LandmarkGroup::Face => FACE_LANDMARKS,
            LandmarkGroup::Pose => POSE_LANDMARKS,
            LandmarkGroup::LeftHand | LandmarkGroup::RightHand => HAND_LANDMARKS,
        }
    }

    /// Offset of the group's first point in the concatenated row
    pub fn offset(&self) -> usize {
        match self {
            LandmarkGroup::Face => 0,
            LandmarkGroup::Pose => FACE_LANDMARKS,
            LandmarkGroup::LeftHand => FACE_LANDMARKS + POSE_LANDMARKS,
            LandmarkGroup::RightHand => FACE_LANDMARKS + POSE_LANDMARKS + HAND_LANDMARKS,
        }
    }

    /// Group owning a position of the concatenated row, if any
    pub fn containing(index: usize) -> Option<LandmarkGroup> {
        Self::ALL
            .into_iter()
            .find(|group| (group.offset()..group.offset() + group.canonical_len()).contains(&index))
    }

    pub fn to_string(&self) -> &'static str {
        match self {
            LandmarkGroup::Face => "face",
            LandmarkGroup::Pose => "pose",
            LandmarkGroup::LeftHand => "left_hand",
            LandmarkGroup::RightHand => "right_hand",
        }
    }
}

// ==============================================================================
// Shared: 3D Keypoint
// ==============================================================================

/// A 3D landmark in normalized image-relative coordinates
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Keypoint3D {
    pub x: f32, // Normalized [0, 1] for image coordinates
    pub y: f32, // Normalized [0, 1] for image coordinates
    pub z: f32, // Depth relative to the group's reference point
}

impl Keypoint3D {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn to_array(&self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }
}

// ==============================================================================
// Holistic Frame (Unified Result)
// ==============================================================================

/// Raw landmark sets detected in one frame. Each group is either fully present or absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HolisticLandmarks {
    pub face: Option<Vec<Keypoint3D>>,
    pub pose: Option<Vec<Keypoint3D>>,
    pub left_hand: Option<Vec<Keypoint3D>>,
    pub right_hand: Option<Vec<Keypoint3D>>,
}

impl HolisticLandmarks {
    pub fn group(&self, group: LandmarkGroup) -> Option<&[Keypoint3D]> {
        match group {
            LandmarkGroup::Face => self.face.as_deref(),
            LandmarkGroup::Pose => self.pose.as_deref(),
            LandmarkGroup::LeftHand => self.left_hand.as_deref(),
            LandmarkGroup::RightHand => self.right_hand.as_deref(),
        }
    }

    pub fn has_hands(&self) -> bool {
        self.left_hand.is_some() || self.right_hand.is_some()
    }

    pub fn present_groups(&self) -> Vec<LandmarkGroup> {
        LandmarkGroup::ALL
            .into_iter()
            .filter(|g| self.group(*g).is_some())
            .collect()
    }
}

/// Landmark result for a single captured frame, tagged in capture order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HolisticFrame {
    pub frame_id: u64,
    pub timestamp: i64,
    pub landmarks: HolisticLandmarks,
    pub processing_time_ms: u64,
}

impl HolisticFrame {
    pub fn new(frame_id: u64, landmarks: HolisticLandmarks) -> Self {
        Self {
            frame_id,
            timestamp: chrono::Utc::now().timestamp_millis(),
            landmarks,
            processing_time_ms: 0,
        }
    }
}

// ==============================================================================
// Configuration
// ==============================================================================

/// Options handed through to the holistic tracker unchanged
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HolisticConfig {
    pub model_complexity: ModelComplexity,
    pub smooth_landmarks: bool,
    pub enable_segmentation: bool,
    pub refine_face_landmarks: bool,   // Adds 10 iris points, leave off for 468-point faces
    pub min_detection_confidence: f32, // Minimum confidence for detection (default: 0.5)
    pub min_tracking_confidence: f32,  // Minimum confidence for tracking (default: 0.5)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelComplexity {
    Lite = 0,  // Fastest, less accurate
    Full = 1,  // Balanced
    Heavy = 2, // Slowest, most accurate
}

impl Default for HolisticConfig {
    fn default() -> Self {
        Self {
            model_complexity: ModelComplexity::Full,
            smooth_landmarks: true,
            enable_segmentation: false,
            refine_face_landmarks: false,
            min_detection_confidence: 0.5,
            min_tracking_confidence: 0.5,
        }
    }
}

impl HolisticConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.min_detection_confidence) {
            return Err(format!(
                "Invalid detection confidence: {}. Must be between 0.0 and 1.0",
                self.min_detection_confidence
            ));
        }
        if !(0.0..=1.0).contains(&self.min_tracking_confidence) {
            return Err(format!(
                "Invalid tracking confidence: {}. Must be between 0.0 and 1.0",
                self.min_tracking_confidence
            ));
        }
        if self.refine_face_landmarks {
            return Err(format!(
                "refine_face_landmarks must be off: refined faces carry {} points, the feature layout expects exactly {}",
                FACE_LANDMARKS + 10,
                FACE_LANDMARKS
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_offsets_cover_row() {
        assert_eq!(LandmarkGroup::Face.offset(), 0);
        assert_eq!(LandmarkGroup::Pose.offset(), 468);
        assert_eq!(LandmarkGroup::LeftHand.offset(), 501);
        assert_eq!(LandmarkGroup::RightHand.offset(), 522);

        let total: usize = LandmarkGroup::ALL.iter().map(|g| g.canonical_len()).sum();
        assert_eq!(total, 543);
    }

    #[test]
    fn test_group_containing() {
        assert_eq!(LandmarkGroup::containing(0), Some(LandmarkGroup::Face));
        assert_eq!(LandmarkGroup::containing(467), Some(LandmarkGroup::Face));
        assert_eq!(LandmarkGroup::containing(480), Some(LandmarkGroup::Pose));
        assert_eq!(LandmarkGroup::containing(501), Some(LandmarkGroup::LeftHand));
        assert_eq!(LandmarkGroup::containing(542), Some(LandmarkGroup::RightHand));
        assert_eq!(LandmarkGroup::containing(543), None);
    }

    #[test]
    fn test_present_groups() {
        let landmarks = HolisticLandmarks {
            pose: Some(vec![Keypoint3D::default(); POSE_LANDMARKS]),
            right_hand: Some(vec![Keypoint3D::default(); HAND_LANDMARKS]),
            ..Default::default()
        };
        assert_eq!(
            landmarks.present_groups(),
            vec![LandmarkGroup::Pose, LandmarkGroup::RightHand]
        );
        assert!(landmarks.has_hands());
        assert!(!HolisticLandmarks::default().has_hands());
    }

    #[test]
    fn test_holistic_config_default() {
        let config = HolisticConfig::default();
        assert_eq!(config.model_complexity, ModelComplexity::Full);
        assert_eq!(config.min_detection_confidence, 0.5);
        assert_eq!(config.min_tracking_confidence, 0.5);
        assert!(config.smooth_landmarks);
        assert!(!config.refine_face_landmarks);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_holistic_config_validation() {
        let mut config = HolisticConfig::default();
        config.min_detection_confidence = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_refined_face_is_invalid() {
        let config = HolisticConfig {
            refine_face_landmarks: true,
            ..Default::default()
        };
        let message = config.validate().unwrap_err();
        assert!(message.contains("478"));
        assert!(message.contains("468"));
    }
}
