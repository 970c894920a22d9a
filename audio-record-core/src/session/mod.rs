pub mod lease;
pub mod recorder;
