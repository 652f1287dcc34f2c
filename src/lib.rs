pub mod core;
pub mod models;
pub mod platform;

use crate::core::classifier::{ClassifierLoader, ModelCacheLoader};
use crate::core::config::Config;
use crate::core::feature_extractor::{validate_selection, SELECTION_INDICES};
use crate::core::landmark_source::{frame_queue, spawn_landmark_source};
use crate::core::pipeline::{GesturePipeline, PipelineStatus};
use crate::core::presenter::{OverlaySnapshot, TerminalPresenter};
use crate::platform::camera::open_capture;
use crate::platform::holistic::{DefaultHolistic, HolisticBridge};
use anyhow::{anyhow, Context};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Run recognition until Ctrl-C or until the pipeline stops on its own.
///
/// Capture starts immediately; the classifier is loaded in the background and
/// predictions begin once it is installed.
pub async fn run(config: Config) -> anyhow::Result<()> {
    config
        .validate()
        .map_err(|e| anyhow!("Invalid configuration: {}", e))?;
    validate_selection(&SELECTION_INDICES).context("Built-in landmark selection is invalid")?;

    let session_id = Uuid::new_v4();
    info!("Starting sign gesture session {}", session_id);

    let (frame_tx, frame_rx) = frame_queue(config.frame_queue_capacity);
    let handle = GesturePipeline::new(&config)?.spawn(frame_rx);

    // Load the classifier without holding up capture
    let loader = ModelCacheLoader::new(config.clone());
    let slot = handle.classifier_slot();
    tokio::spawn(async move {
        match loader.load().await {
            Ok(classifier) => {
                info!("Classifier ready: {}", classifier.get_model_info());
                if let Err(e) = slot.install(classifier) {
                    error!("Failed to install classifier: {}", e);
                }
            }
            Err(e) => warn!("Running without predictions: {}", e),
        }
    });

    let shutdown = Arc::new(AtomicBool::new(false));
    let capture_config = config.clone();
    let holistic_config = config.holistic.clone();
    let source = spawn_landmark_source(
        move || open_capture(&capture_config),
        move || {
            let bridge = DefaultHolistic::new(&holistic_config)?;
            Ok(Box::new(bridge) as Box<dyn HolisticBridge>)
        },
        frame_tx,
        shutdown.clone(),
    )
    .context("Failed to start landmark source thread")?;

    let mut presenter = TerminalPresenter::new();
    if let Some(path) = &config.overlay_snapshot_path {
        presenter = presenter.with_overlay_snapshot(OverlaySnapshot {
            path: path.clone(),
            width: config.frame_width,
            height: config.frame_height,
        });
    }
    let presenter_task = tokio::spawn(presenter.run(handle.subscribe()));

    let mut states = handle.subscribe();
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result.context("Failed to listen for Ctrl-C")?;
            info!("Shutdown requested");
        }
        _ = states.wait_for(|state| state.status.is_terminal()) => {}
    }

    shutdown.store(true, Ordering::Relaxed);
    let final_state = handle.shutdown().await?;
    let source_stats = tokio::task::spawn_blocking(move || source.join())
        .await?
        .map_err(|_| anyhow!("Landmark source thread panicked"))?;
    let _ = presenter_task.await;

    let stats = final_state.stats();
    info!(
        "Session {} finished: {} frames captured, {} received, {} dropped, {} windows classified, {} superseded",
        session_id,
        source_stats.frames_captured,
        stats.frames_received,
        stats.frames_dropped,
        stats.windows_classified,
        stats.windows_superseded
    );

    match final_state.status() {
        PipelineStatus::Faulted(reason) => Err(anyhow!("Pipeline faulted: {}", reason)),
        _ => Ok(()),
    }
}
