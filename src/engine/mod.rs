pub mod executor;
pub mod indicators;
pub mod levels;
pub mod market;
pub mod metrics;
pub mod orders;
pub mod playback;
pub mod snapshot;
pub mod strategy;
