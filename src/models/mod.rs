pub mod capture;
pub mod gesture;
pub mod landmarks;
