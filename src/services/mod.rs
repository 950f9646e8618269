pub mod cutter;
pub mod progress;
pub mod queue;
pub mod segment;
pub mod storage;
