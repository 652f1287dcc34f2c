// Holistic landmark tracking platform integration
// Provides the MediaPipe Holistic bridge and result parsing

pub mod holistic_bridge;

pub use holistic_bridge::{parse_holistic_json, DefaultHolistic, HolisticBridge};
