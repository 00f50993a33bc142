pub mod addressing;
pub mod results;
pub mod sequence;
pub mod thresholds;

pub use results::{ChannelResult, Measurement, ResultAggregator};
pub use sequence::{MeasurementLoop, RunError};
pub use thresholds::{ModeThresholds, TestMode, Verdict};
