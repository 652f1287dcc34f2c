// Device and tracker integrations

pub mod camera;
pub mod holistic;
