pub mod clip;
pub mod job;
pub mod progress;
pub mod task;
