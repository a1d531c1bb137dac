pub mod config;
pub mod indicators;
pub mod levels;
pub mod result;
pub mod series;
pub mod trade;
