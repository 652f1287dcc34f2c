// Keypoint feature extraction
// Maps one frame's holistic landmarks onto the fixed per-frame feature row the
// gesture classifier was trained on.

use crate::models::gesture::{GestureError, GestureResult};
use crate::models::landmarks::{HolisticFrame, HolisticLandmarks, Keypoint3D, LandmarkGroup};

/// Length of the concatenated face ++ pose ++ left hand ++ right hand row
pub const TOTAL_LANDMARKS: usize = 543;

/// Positions in the concatenated row that make up a feature vector, in output order.
/// A fixed lookup, so order and repeats are meaningful.
pub const SELECTION_INDICES: [usize; 88] = [
    0, 9, 11, 13, 14, 17, 117, 118, 119, 199, 346, 347, 348,
    468, 469, 470, 471, 472, 473, 474, 475, 476, 477, 478, 479,
    480, 481, 482, 483, 484, 485, 486, 487, 488, 489, 490, 491,
    492, 493, 494, 495, 496, 497, 498, 499, 500, 501, 502, 503,
    504, 505, 506, 507, 508, 509, 510, 511, 512, 513, 514, 515,
    516, 517, 518, 519, 520, 521, 522, 523, 524, 525, 526, 527,
    528, 529, 530, 531, 532, 533, 534, 535, 536, 537, 538, 539,
    540, 541, 542,
];

/// Values per frame: three coordinates per selected landmark
pub const FEATURE_LENGTH: usize = SELECTION_INDICES.len() * 3;

/// Flattened feature row for one frame
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    pub frame_id: u64,
    pub values: Vec<f32>,
}

impl FeatureVector {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Check that every selection entry addresses the concatenated row
pub fn validate_selection(indices: &[usize]) -> GestureResult<()> {
    match indices.iter().position(|&index| index >= TOTAL_LANDMARKS) {
        Some(position) => Err(GestureError::SelectionOutOfBounds {
            position,
            index: indices[position],
            bound: TOTAL_LANDMARKS,
        }),
        None => Ok(()),
    }
}

#[derive(Debug, Clone)]
pub struct FeatureExtractor {
    selection: Vec<usize>,
}

impl FeatureExtractor {
    /// Build an extractor for a custom selection, rejecting out-of-range entries
    pub fn new(selection: Vec<usize>) -> GestureResult<Self> {
        validate_selection(&selection)?;
        Ok(Self { selection })
    }

    pub fn selection(&self) -> &[usize] {
        &self.selection
    }

    /// Number of values produced per frame
    pub fn feature_len(&self) -> usize {
        self.selection.len() * 3
    }

    /// Extract the feature row for a frame, tagged with its frame id
    pub fn extract(&self, frame: &HolisticFrame) -> GestureResult<FeatureVector> {
        let values = self.extract_landmarks(&frame.landmarks)?;
        Ok(FeatureVector {
            frame_id: frame.frame_id,
            values,
        })
    }

    /// Absent groups contribute zero triples; present groups must have their canonical size.
    pub fn extract_landmarks(&self, landmarks: &HolisticLandmarks) -> GestureResult<Vec<f32>> {
        let mut row: Vec<Keypoint3D> = Vec::with_capacity(TOTAL_LANDMARKS);

        for group in LandmarkGroup::ALL {
            let expected = group.canonical_len();
            match landmarks.group(group) {
                Some(points) if points.len() == expected => row.extend_from_slice(points),
                Some(points) => {
                    return Err(GestureError::MalformedFrame {
                        group,
                        expected,
                        actual: points.len(),
                    })
                }
                None => row.resize(row.len() + expected, Keypoint3D::default()),
            }
        }

        Ok(self
            .selection
            .iter()
            .flat_map(|&index| row[index].to_array())
            .collect())
    }
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self {
            selection: SELECTION_INDICES.to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::landmarks::{FACE_LANDMARKS, HAND_LANDMARKS, POSE_LANDMARKS};

    fn points(count: usize, base: f32) -> Vec<Keypoint3D> {
        (0..count)
            .map(|i| Keypoint3D::new(base + i as f32, base + i as f32 + 0.25, base + i as f32 + 0.5))
            .collect()
    }

    fn landmarks_with(mask: u8) -> HolisticLandmarks {
        HolisticLandmarks {
            face: (mask & 1 != 0).then(|| points(FACE_LANDMARKS, 1.0)),
            pose: (mask & 2 != 0).then(|| points(POSE_LANDMARKS, 1000.0)),
            left_hand: (mask & 4 != 0).then(|| points(HAND_LANDMARKS, 2000.0)),
            right_hand: (mask & 8 != 0).then(|| points(HAND_LANDMARKS, 3000.0)),
        }
    }

    #[test]
    fn test_selection_constants() {
        assert_eq!(SELECTION_INDICES.len(), 88);
        assert_eq!(FEATURE_LENGTH, 264);
        assert!(validate_selection(&SELECTION_INDICES).is_ok());
    }

    #[test]
    fn test_feature_length_for_every_presence_combination() {
        let extractor = FeatureExtractor::default();
        for mask in 0..16u8 {
            let values = extractor.extract_landmarks(&landmarks_with(mask)).unwrap();
            assert_eq!(values.len(), 264, "presence mask {:04b}", mask);
        }
    }

    #[test]
    fn test_absent_left_hand_is_zero() {
        let extractor = FeatureExtractor::default();
        let landmarks = landmarks_with(0b1011);
        let values = extractor.extract_landmarks(&landmarks).unwrap();

        for (position, &index) in SELECTION_INDICES.iter().enumerate() {
            let triple = &values[position * 3..position * 3 + 3];
            if LandmarkGroup::containing(index) == Some(LandmarkGroup::LeftHand) {
                assert_eq!(triple, &[0.0, 0.0, 0.0], "index {}", index);
            } else {
                assert!(triple.iter().any(|v| *v != 0.0), "index {}", index);
            }
        }
    }

    #[test]
    fn test_selected_values_come_from_concatenated_row() {
        let extractor = FeatureExtractor::default();
        let values = extractor.extract_landmarks(&landmarks_with(0b1111)).unwrap();

        // Face index 9 is the second selection entry
        assert_eq!(&values[3..6], &[10.0, 10.25, 10.5]);
        // Row index 468 is the first pose landmark
        assert_eq!(&values[13 * 3..13 * 3 + 3], &[1000.0, 1000.25, 1000.5]);
        // Row index 542 is the last right hand landmark
        assert_eq!(&values[261..264], &[3020.0, 3020.25, 3020.5]);
    }

    #[test]
    fn test_custom_selection_keeps_order_and_repeats() {
        let extractor = FeatureExtractor::new(vec![501, 0, 501]).unwrap();
        let values = extractor.extract_landmarks(&landmarks_with(0b0101)).unwrap();
        assert_eq!(
            values,
            vec![2000.0, 2000.25, 2000.5, 1.0, 1.25, 1.5, 2000.0, 2000.25, 2000.5]
        );
    }

    #[test]
    fn test_selection_out_of_bounds() {
        let err = FeatureExtractor::new(vec![0, 542, 543]).unwrap_err();
        match err {
            GestureError::SelectionOutOfBounds { position, index, bound } => {
                assert_eq!(position, 2);
                assert_eq!(index, 543);
                assert_eq!(bound, 543);
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_malformed_group_is_rejected() {
        let extractor = FeatureExtractor::default();
        let mut landmarks = landmarks_with(0b0010);
        landmarks.right_hand = Some(points(HAND_LANDMARKS - 1, 0.0));

        match extractor.extract_landmarks(&landmarks) {
            Err(GestureError::MalformedFrame { group, expected, actual }) => {
                assert_eq!(group, LandmarkGroup::RightHand);
                assert_eq!(expected, 21);
                assert_eq!(actual, 20);
            }
            other => panic!("expected malformed frame, got {:?}", other),
        }
    }

    #[test]
    fn test_refined_face_is_rejected() {
        let extractor = FeatureExtractor::default();
        let landmarks = HolisticLandmarks {
            face: Some(points(478, 0.0)),
            ..Default::default()
        };
        assert!(matches!(
            extractor.extract_landmarks(&landmarks),
            Err(GestureError::MalformedFrame { group: LandmarkGroup::Face, .. })
        ));
    }

    #[test]
    fn test_extract_tags_frame_id() {
        let extractor = FeatureExtractor::default();
        let frame = HolisticFrame::new(42, landmarks_with(0));
        let features = extractor.extract(&frame).unwrap();
        assert_eq!(features.frame_id, 42);
        assert_eq!(features.len(), FEATURE_LENGTH);
        assert!(features.values.iter().all(|v| *v == 0.0));
    }
}
