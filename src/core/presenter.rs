// Terminal presentation layer
// Follows the pipeline's published state and reports predictions and status changes.

use crate::core::overlay::render_overlay;
use crate::core::pipeline::{PipelineStatus, PresentationState};
use crate::models::gesture::LabelScore;
use std::path::PathBuf;
use tokio::sync::watch;
use tracing::{error, info, warn};

/// One `label: score` line per entry, in label order
pub fn format_probabilities(probabilities: &[LabelScore]) -> Vec<String> {
    probabilities
        .iter()
        .map(|entry| format!("{}: {:.4}", entry.label, entry.score))
        .collect()
}

/// Where to write the latest overlay as a PNG
#[derive(Debug, Clone)]
pub struct OverlaySnapshot {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
}

#[derive(Default)]
pub struct TerminalPresenter {
    last_status: Option<PipelineStatus>,
    last_label: Option<String>,
    last_window: Option<u64>,
    snapshot: Option<OverlaySnapshot>,
}

impl TerminalPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_overlay_snapshot(mut self, snapshot: OverlaySnapshot) -> Self {
        self.snapshot = Some(snapshot);
        self
    }

    /// Report what changed since the previous state. Returns the messages shown:
    /// status changes, label changes and the probability list of each new prediction.
    pub fn present(&mut self, state: &PresentationState) -> Vec<String> {
        let mut messages = Vec::new();

        if self.last_status.as_ref() != Some(&state.status) {
            let message = format!("Pipeline {}", state.status);
            match &state.status {
                PipelineStatus::Faulted(_) => error!("{}", message),
                _ => info!("{}", message),
            }
            self.last_status = Some(state.status.clone());
            messages.push(message);
        }

        let Some(prediction) = &state.prediction else {
            return messages;
        };
        if self.last_window == Some(prediction.window_end_frame_id) {
            return messages;
        }
        self.last_window = Some(prediction.window_end_frame_id);

        let label = prediction.label.as_str();
        if self.last_label.as_deref() != Some(label) {
            let message = format!("Current Prediction: {}", label);
            info!("{}", message);
            self.last_label = Some(label.to_string());
            messages.push(message);
        }

        let lines = format_probabilities(&state.probabilities);
        if !lines.is_empty() {
            info!("Model Probabilities:\n{}", lines.join("\n"));
            messages.extend(lines);
        }

        if let (Some(snapshot), Some(overlay)) = (&self.snapshot, &state.overlay) {
            let image = render_overlay(overlay, snapshot.width, snapshot.height);
            if let Err(e) = image.save(&snapshot.path) {
                warn!("Failed to write overlay snapshot {}: {}", snapshot.path.display(), e);
            }
        }

        messages
    }

    /// Present every published state until the pipeline ends or its sender is dropped
    pub async fn run(mut self, mut states: watch::Receiver<PresentationState>) {
        loop {
            let state = states.borrow_and_update().clone();
            self.present(&state);
            if state.status.is_terminal() {
                break;
            }
            if states.changed().await.is_err() {
                break;
            }
        }
    }
}
