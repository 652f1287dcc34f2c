// Data models for gesture classification results

use crate::models::landmarks::LandmarkGroup;
use serde::{Deserialize, Serialize};
use std::fmt;

// ==============================================================================
// Label Set
// ==============================================================================

/// Gesture labels in classifier output order. Position is the label identity.
pub const ACTIONS: [&str; 17] = [
    "call",
    "class",
    "doctor",
    "email",
    "family",
    "form",
    "learn",
    "like",
    "meet",
    "No hands in frame",
    "please",
    "room",
    "teacher",
    "thank you",
    "today",
    "water",
    "you",
];

/// Label shown when no score clears the confidence threshold
pub const UNCERTAIN_LABEL: &str = "Uncertain";

// ==============================================================================
// Prediction
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum GestureLabel {
    Sign { index: usize, name: String },
    Uncertain,
}

impl GestureLabel {
    pub fn as_str(&self) -> &str {
        match self {
            GestureLabel::Sign { name, .. } => name,
            GestureLabel::Uncertain => UNCERTAIN_LABEL,
        }
    }

    pub fn is_uncertain(&self) -> bool {
        matches!(self, GestureLabel::Uncertain)
    }
}

impl fmt::Display for GestureLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One classifier score paired with its label, for display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelScore {
    pub label: String,
    pub score: f32,
}

/// Outcome of classifying one full window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub label: GestureLabel,
    pub top_index: usize,
    pub top_score: f32,
    pub probabilities: Vec<f32>, // Raw scores aligned with the label list
    pub window_end_frame_id: u64,
    pub timestamp: i64,
}

impl Prediction {
    pub fn scores_with_labels(&self, labels: &[String]) -> Vec<LabelScore> {
        labels
            .iter()
            .zip(self.probabilities.iter())
            .map(|(label, score)| LabelScore {
                label: label.clone(),
                score: *score,
            })
            .collect()
    }
}

// ==============================================================================
// Error Types
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum GestureError {
    #[error("Classifier not initialized")]
    NotInitialized,

    #[error("Model loading failed: {0}")]
    ModelLoadFailed(String),

    #[error("Inference failed: {0}")]
    InferenceFailed(String),

    #[error("Landmark detection failed: {0}")]
    DetectionFailed(String),

    #[error("Malformed frame: {} has {actual} points, expected {expected}", .group.to_string())]
    MalformedFrame {
        group: LandmarkGroup,
        expected: usize,
        actual: usize,
    },

    #[error("Selection entry {position} is {index}, must be below {bound}")]
    SelectionOutOfBounds {
        position: usize,
        index: usize,
        bound: usize,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Pipeline task failed: {0}")]
    PipelineFailed(String),
}

pub type GestureResult<T> = Result<T, GestureError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_labels() {
        assert_eq!(ACTIONS.len(), 17);
        assert_eq!(ACTIONS[0], "call");
        assert_eq!(ACTIONS[9], "No hands in frame");
        assert_eq!(ACTIONS[16], "you");
    }

    #[test]
    fn test_gesture_label_display() {
        let label = GestureLabel::Sign {
            index: 13,
            name: "thank you".to_string(),
        };
        assert_eq!(label.to_string(), "thank you");
        assert!(!label.is_uncertain());
        assert_eq!(GestureLabel::Uncertain.to_string(), "Uncertain");
    }

    #[test]
    fn test_scores_with_labels() {
        let prediction = Prediction {
            label: GestureLabel::Uncertain,
            top_index: 1,
            top_score: 0.6,
            probabilities: vec![0.4, 0.6],
            window_end_frame_id: 19,
            timestamp: 0,
        };
        let labels = vec!["call".to_string(), "class".to_string()];
        let scores = prediction.scores_with_labels(&labels);
        assert_eq!(scores.len(), 2);
        assert_eq!(scores[1].label, "class");
        assert_eq!(scores[1].score, 0.6);
    }

    #[test]
    fn test_malformed_frame_message() {
        let err = GestureError::MalformedFrame {
            group: LandmarkGroup::LeftHand,
            expected: 21,
            actual: 20,
        };
        assert_eq!(
            err.to_string(),
            "Malformed frame: left_hand has 20 points, expected 21"
        );
    }
}
