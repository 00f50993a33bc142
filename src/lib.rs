pub mod acquire;
pub mod config;
pub mod dsp;
pub mod engine;
pub mod report;
pub mod ui;
pub mod utils;
