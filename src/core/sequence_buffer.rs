// Rolling window of per-frame feature vectors fed to the gesture classifier

use crate::core::feature_extractor::FeatureVector;
use ndarray::Array3;
use std::collections::VecDeque;

/// Default number of frames in a classification window
pub const SEQUENCE_LENGTH: usize = 20;

/// Bounded FIFO of feature vectors, oldest first
#[derive(Debug, Clone)]
pub struct SequenceBuffer {
    frames: VecDeque<FeatureVector>,
    capacity: usize,
}

impl SequenceBuffer {
    /// Panics if `capacity` is zero
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "sequence buffer capacity must be non-zero");
        Self {
            frames: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// Append a vector, evicting the oldest once over capacity
    pub fn append(&mut self, features: FeatureVector) {
        self.frames.push_back(features);
        if self.frames.len() > self.capacity {
            self.frames.pop_front();
        }
    }

    pub fn is_full(&self) -> bool {
        self.frames.len() == self.capacity
    }

    /// Current contents in arrival order
    pub fn snapshot(&self) -> Vec<FeatureVector> {
        self.frames.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn latest_frame_id(&self) -> Option<u64> {
        self.frames.back().map(|f| f.frame_id)
    }
}

impl Default for SequenceBuffer {
    fn default() -> Self {
        Self::new(SEQUENCE_LENGTH)
    }
}

/// Stack a window into a `[1, frames, features]` tensor, oldest row first.
/// Rows are assumed to share the first row's length.
pub fn window_tensor(window: &[FeatureVector]) -> Array3<f32> {
    let features = window.first().map(|f| f.len()).unwrap_or(0);
    let mut tensor = Array3::<f32>::zeros((1, window.len(), features));
    for (row, frame) in window.iter().enumerate() {
        for (col, value) in frame.values.iter().take(features).enumerate() {
            tensor[[0, row, col]] = *value;
        }
    }
    tensor
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vector(frame_id: u64) -> FeatureVector {
        FeatureVector {
            frame_id,
            values: vec![frame_id as f32; 4],
        }
    }

    #[test]
    fn test_keeps_last_capacity_frames_in_order() {
        let mut buffer = SequenceBuffer::new(20);
        for id in 1..=45 {
            buffer.append(vector(id));
        }

        let ids: Vec<u64> = buffer.snapshot().iter().map(|f| f.frame_id).collect();
        assert_eq!(ids, (26..=45).collect::<Vec<u64>>());
        assert_eq!(buffer.len(), 20);
        assert!(buffer.is_full());
    }

    #[test]
    fn test_not_full_below_capacity() {
        let mut buffer = SequenceBuffer::default();
        assert!(buffer.is_empty());
        for id in 0..19 {
            buffer.append(vector(id));
            assert!(!buffer.is_full(), "full after {} frames", id + 1);
        }
        buffer.append(vector(19));
        assert!(buffer.is_full());
    }

    #[test]
    fn test_snapshot_does_not_mutate() {
        let mut buffer = SequenceBuffer::new(3);
        buffer.append(vector(1));
        buffer.append(vector(2));

        let first = buffer.snapshot();
        let second = buffer.snapshot();
        assert_eq!(first, second);
        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.latest_frame_id(), Some(2));
    }

    #[test]
    fn test_window_tensor_shape_and_rows() {
        let mut buffer = SequenceBuffer::new(3);
        for id in 1..=4 {
            buffer.append(vector(id));
        }

        let tensor = window_tensor(&buffer.snapshot());
        assert_eq!(tensor.shape(), &[1, 3, 4]);
        assert_eq!(tensor[[0, 0, 0]], 2.0);
        assert_eq!(tensor[[0, 2, 3]], 4.0);
    }

    #[test]
    #[should_panic]
    fn test_zero_capacity_panics() {
        SequenceBuffer::new(0);
    }
}
