// Gesture pipeline
// A single task owns the sequence buffer and the current prediction. Frames are
// processed in arrival order; at most one classification runs at a time.

use crate::core::classifier::{ClassifierSlot, GestureClassifier};
use crate::core::config::Config;
use crate::core::decision::DecisionPolicy;
use crate::core::feature_extractor::FeatureExtractor;
use crate::core::landmark_source::LandmarkEvent;
use crate::core::overlay::{build_overlay, OverlayFrame};
use crate::core::sequence_buffer::{window_tensor, SequenceBuffer};
use crate::models::gesture::{GestureError, GestureResult, LabelScore, Prediction, ACTIONS};
use crate::models::landmarks::HolisticFrame;
use ndarray::Array3;
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

// ==============================================================================
// Status and Counters
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "reason")]
pub enum PipelineStatus {
    WaitingForFrames,
    Running,
    Faulted(String),
    Stopped,
}

impl PipelineStatus {
    /// The frame loop has ended
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineStatus::Faulted(_) | PipelineStatus::Stopped)
    }
}

impl fmt::Display for PipelineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineStatus::WaitingForFrames => f.write_str("waiting for frames"),
            PipelineStatus::Running => f.write_str("running"),
            PipelineStatus::Faulted(reason) => write!(f, "faulted: {}", reason),
            PipelineStatus::Stopped => f.write_str("stopped"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineStats {
    pub frames_received: u64,
    /// Frames overwritten in the queue before the pipeline reached them
    pub frames_dropped: u64,
    pub frames_out_of_order: u64,
    pub windows_classified: u64,
    pub windows_superseded: u64,
    pub inference_errors: u64,
}

/// A full window ready for the classifier
#[derive(Debug, Clone)]
pub struct Window {
    pub end_frame_id: u64,
    pub tensor: Array3<f32>,
}

#[derive(Debug, Clone)]
pub enum FrameOutcome {
    /// Frame appended, buffer not yet full
    Buffering,
    /// Frame appended and the buffer holds a complete window
    Window(Window),
    /// Frame arrived out of capture order and was not appended
    Rejected,
}

/// Snapshot published to the presentation layer
#[derive(Debug, Clone)]
pub struct PresentationState {
    pub status: PipelineStatus,
    pub classifier_ready: bool,
    pub prediction: Option<Prediction>,
    pub probabilities: Vec<LabelScore>,
    pub overlay: Option<OverlayFrame>,
    pub buffered_frames: usize,
    pub stats: PipelineStats,
}

impl Default for PresentationState {
    fn default() -> Self {
        Self {
            status: PipelineStatus::WaitingForFrames,
            classifier_ready: false,
            prediction: None,
            probabilities: Vec::new(),
            overlay: None,
            buffered_frames: 0,
            stats: PipelineStats::default(),
        }
    }
}

// ==============================================================================
// Pipeline State
// ==============================================================================

/// Everything the frame loop mutates. Owned by exactly one task.
pub struct PipelineState {
    extractor: FeatureExtractor,
    buffer: SequenceBuffer,
    policy: DecisionPolicy,
    current_prediction: Option<Prediction>,
    overlay: Option<OverlayFrame>,
    status: PipelineStatus,
    stats: PipelineStats,
    last_frame_id: Option<u64>,
}

impl PipelineState {
    pub fn new(extractor: FeatureExtractor, buffer: SequenceBuffer, policy: DecisionPolicy) -> Self {
        Self {
            extractor,
            buffer,
            policy,
            current_prediction: None,
            overlay: None,
            status: PipelineStatus::WaitingForFrames,
            stats: PipelineStats::default(),
            last_frame_id: None,
        }
    }

    pub fn from_config(config: &Config) -> GestureResult<Self> {
        config
            .validate()
            .map_err(|e| GestureError::InvalidConfig(e.to_string()))?;

        Ok(Self::new(
            FeatureExtractor::default(),
            SequenceBuffer::new(config.sequence_length),
            DecisionPolicy::new(
                ACTIONS.iter().map(|a| a.to_string()).collect(),
                config.confidence_threshold,
            ),
        ))
    }

    /// Extract, order-check and buffer one frame. Malformed frames are errors.
    pub fn on_frame(&mut self, frame: &HolisticFrame) -> GestureResult<FrameOutcome> {
        self.stats.frames_received += 1;

        if let Some(last) = self.last_frame_id {
            if frame.frame_id <= last {
                self.stats.frames_out_of_order += 1;
                warn!("Rejected frame {} (last accepted {})", frame.frame_id, last);
                return Ok(FrameOutcome::Rejected);
            }
        }

        let features = self.extractor.extract(frame)?;
        self.overlay = Some(build_overlay(frame.frame_id, &frame.landmarks));
        self.buffer.append(features);
        self.last_frame_id = Some(frame.frame_id);
        self.status = PipelineStatus::Running;

        if !self.buffer.is_full() {
            return Ok(FrameOutcome::Buffering);
        }

        Ok(FrameOutcome::Window(Window {
            end_frame_id: frame.frame_id,
            tensor: window_tensor(&self.buffer.snapshot()),
        }))
    }

    /// Apply the decision policy to classifier scores and make the result current
    pub fn on_scores(&mut self, window_end_frame_id: u64, scores: &[f32]) -> GestureResult<&Prediction> {
        let decision = self.policy.decide(scores)?;
        self.stats.windows_classified += 1;

        let prediction = Prediction {
            label: decision.label,
            top_index: decision.top_index,
            top_score: decision.top_score,
            probabilities: scores.to_vec(),
            window_end_frame_id,
            timestamp: chrono::Utc::now().timestamp_millis(),
        };
        Ok(self.current_prediction.insert(prediction))
    }

    pub fn current_prediction(&self) -> Option<&Prediction> {
        self.current_prediction.as_ref()
    }

    pub fn status(&self) -> &PipelineStatus {
        &self.status
    }

    pub fn stats(&self) -> &PipelineStats {
        &self.stats
    }

    pub fn buffer(&self) -> &SequenceBuffer {
        &self.buffer
    }

    fn fault(&mut self, reason: String) {
        error!("Pipeline faulted: {}", reason);
        self.status = PipelineStatus::Faulted(reason);
    }

    pub fn presentation(&self, classifier_ready: bool) -> PresentationState {
        PresentationState {
            status: self.status.clone(),
            classifier_ready,
            prediction: self.current_prediction.clone(),
            probabilities: self
                .current_prediction
                .as_ref()
                .map(|p| p.scores_with_labels(self.policy.labels()))
                .unwrap_or_default(),
            overlay: self.overlay.clone(),
            buffered_frames: self.buffer.len(),
            stats: self.stats.clone(),
        }
    }
}

// ==============================================================================
// Pipeline Task
// ==============================================================================

struct InferenceOutcome {
    window_end_frame_id: u64,
    result: GestureResult<Vec<f32>>,
}

pub struct GesturePipeline {
    state: PipelineState,
    slot: ClassifierSlot,
}

impl GesturePipeline {
    pub fn new(config: &Config) -> GestureResult<Self> {
        Ok(Self::with_state(PipelineState::from_config(config)?))
    }

    pub fn with_state(state: PipelineState) -> Self {
        Self {
            state,
            slot: ClassifierSlot::new(),
        }
    }

    /// Start the frame loop on the current tokio runtime
    pub fn spawn(self, frames: broadcast::Receiver<LandmarkEvent>) -> PipelineHandle {
        let (presentation_tx, presentation_rx) = watch::channel(PresentationState::default());
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let slot = self.slot.clone();

        let task = tokio::spawn(run_loop(
            self.state,
            self.slot,
            frames,
            shutdown_rx,
            presentation_tx,
        ));

        PipelineHandle {
            presentation: presentation_rx,
            slot,
            shutdown_tx: Some(shutdown_tx),
            task,
        }
    }
}

pub struct PipelineHandle {
    presentation: watch::Receiver<PresentationState>,
    slot: ClassifierSlot,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<PipelineState>,
}

impl PipelineHandle {
    pub fn subscribe(&self) -> watch::Receiver<PresentationState> {
        self.presentation.clone()
    }

    /// Make a classifier available; inference resumes with the next full window
    pub fn install_classifier(&self, classifier: Box<dyn GestureClassifier>) -> GestureResult<()> {
        info!("Classifier installed: {}", classifier.get_model_info());
        self.slot.install(classifier)
    }

    pub fn classifier_slot(&self) -> ClassifierSlot {
        self.slot.clone()
    }

    /// Stop the frame loop and return its final state. Pending inference results are discarded.
    pub async fn shutdown(mut self) -> GestureResult<PipelineState> {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        self.task
            .await
            .map_err(|e| GestureError::PipelineFailed(e.to_string()))
    }
}

async fn run_loop(
    mut state: PipelineState,
    slot: ClassifierSlot,
    mut frames: broadcast::Receiver<LandmarkEvent>,
    mut shutdown_rx: oneshot::Receiver<()>,
    presentation: watch::Sender<PresentationState>,
) -> PipelineState {
    // Capacity 1 is enough: only one inference is ever in flight
    let (result_tx, mut result_rx) = mpsc::channel::<InferenceOutcome>(1);
    let mut in_flight = false;

    info!("Gesture pipeline started");

    loop {
        tokio::select! {
            _ = &mut shutdown_rx => {
                state.status = PipelineStatus::Stopped;
                break;
            }
            Some(outcome) = result_rx.recv() => {
                in_flight = false;
                handle_inference(&mut state, &slot, outcome);
            }
            event = frames.recv() => match event {
                Err(RecvError::Closed) => {
                    info!("Landmark source closed");
                    state.status = PipelineStatus::Stopped;
                    break;
                }
                Err(RecvError::Lagged(missed)) => {
                    state.stats.frames_dropped += missed;
                    debug!("Pipeline busy, {} frames dropped ({} total)", missed, state.stats.frames_dropped);
                }
                Ok(LandmarkEvent::SourceFailed(reason)) => {
                    state.fault(format!("Landmark source failed: {}", reason));
                    break;
                }
                Ok(LandmarkEvent::Frame(frame)) => match state.on_frame(&frame) {
                    Err(e) => {
                        state.fault(e.to_string());
                        break;
                    }
                    Ok(FrameOutcome::Window(window)) => {
                        if in_flight {
                            state.stats.windows_superseded += 1;
                            debug!("Inference busy, skipped window ending at frame {}", window.end_frame_id);
                        } else if slot.is_ready() {
                            in_flight = true;
                            spawn_inference(slot.clone(), window, result_tx.clone());
                        }
                    }
                    Ok(FrameOutcome::Buffering) | Ok(FrameOutcome::Rejected) => {}
                },
            },
        }

        presentation.send_replace(state.presentation(in_flight || slot.is_ready()));
    }

    presentation.send_replace(state.presentation(slot.is_ready()));
    info!("Gesture pipeline {}", state.status);
    state
}

fn spawn_inference(slot: ClassifierSlot, window: Window, result_tx: mpsc::Sender<InferenceOutcome>) {
    tokio::task::spawn_blocking(move || {
        let result = slot.predict(&window.tensor);
        // Fails only when the pipeline is gone; the result is discarded
        let _ = result_tx.try_send(InferenceOutcome {
            window_end_frame_id: window.end_frame_id,
            result,
        });
    });
}

fn handle_inference(state: &mut PipelineState, slot: &ClassifierSlot, outcome: InferenceOutcome) {
    let scores = match outcome.result {
        Ok(scores) => scores,
        Err(GestureError::NotInitialized) => return,
        Err(e) => {
            state.stats.inference_errors += 1;
            warn!("Inference failed for window ending at frame {}: {}", outcome.window_end_frame_id, e);
            return;
        }
    };

    match state.on_scores(outcome.window_end_frame_id, &scores) {
        Ok(prediction) => debug!(
            "Frame {}: {} ({:.4})",
            prediction.window_end_frame_id, prediction.label, prediction.top_score
        ),
        Err(e) => {
            error!("Classifier output rejected, suspending inference: {}", e);
            if let Some(classifier) = slot.eject() {
                warn!("Ejected classifier: {}", classifier.get_model_info());
            }
        }
    }
}
