// Decision policy: turns raw classifier scores into a gesture label

use crate::models::gesture::{GestureError, GestureLabel, GestureResult, ACTIONS};

/// Minimum top score for a label to be reported
pub const CONFIDENCE_THRESHOLD: f32 = 0.75;

#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub top_index: usize,
    pub top_score: f32,
    pub label: GestureLabel,
}

#[derive(Debug, Clone)]
pub struct DecisionPolicy {
    labels: Vec<String>,
    threshold: f32,
}

impl DecisionPolicy {
    pub fn new(labels: Vec<String>, threshold: f32) -> Self {
        Self { labels, threshold }
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Pick the highest score (earliest index on ties) and report its label
    /// only if it is strictly above the threshold. Scores are compared as-is.
    pub fn decide(&self, scores: &[f32]) -> GestureResult<Decision> {
        if scores.is_empty() {
            return Err(GestureError::InvalidInput(
                "empty score distribution".to_string(),
            ));
        }
        if scores.len() != self.labels.len() {
            return Err(GestureError::InvalidInput(format!(
                "score distribution has {} entries, expected {}",
                scores.len(),
                self.labels.len()
            )));
        }

        // NaN never compares greater, so it can't hide a real maximum
        let mut top: Option<(usize, f32)> = None;
        let mut best = f32::NEG_INFINITY;
        for (index, &score) in scores.iter().enumerate() {
            if score > best {
                top = Some((index, score));
                best = score;
            }
        }
        let (top_index, top_score) = top.unwrap_or((0, scores[0]));

        let label = if top_score > self.threshold {
            GestureLabel::Sign {
                index: top_index,
                name: self.labels[top_index].clone(),
            }
        } else {
            GestureLabel::Uncertain
        };

        Ok(Decision {
            top_index,
            top_score,
            label,
        })
    }
}

impl Default for DecisionPolicy {
    fn default() -> Self {
        Self::new(
            ACTIONS.iter().map(|a| a.to_string()).collect(),
            CONFIDENCE_THRESHOLD,
        )
    }
}
