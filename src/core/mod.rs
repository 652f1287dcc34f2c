pub mod config;
pub mod ml_models;

// Landmarks to features
pub mod feature_extractor;
pub mod sequence_buffer;

// Classification
pub mod classifier;
pub mod decision;

// Orchestration and presentation
pub mod landmark_source;
pub mod overlay;
pub mod pipeline;
pub mod presenter;
