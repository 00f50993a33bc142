pub mod peak;
pub mod spectrum;

pub use peak::{ExtractionStyle, Peak, PeakExtractor};
pub use spectrum::{AcquisitionResult, power_spectrum};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DspError {
    #[error("spectrum too short for extraction: {got} bins, need at least {need}")]
    InsufficientData { got: usize, need: usize },
}
