pub mod epics;
pub mod raw;

use thiserror::Error;

use crate::dsp::AcquisitionResult;

/// Acquisition failures, split by kind: transport problems are about
/// reaching the instrument at all, data problems are about what it sent
/// back. Both end up at the operator's retry prompt, but they are logged
/// and reported separately because they mean different things.
#[derive(Debug, Error)]
pub enum AcquireError {
    #[error("instrument transport failure: {0}")]
    Transport(String),
    #[error("instrument returned missing or malformed data: {0}")]
    Data(String),
}

impl From<std::io::Error> for AcquireError {
    fn from(err: std::io::Error) -> Self {
        AcquireError::Transport(err.to_string())
    }
}

/// One spectrum acquisition for a logical (module, channel) pair.
///
/// Implementations resolve the physical site address themselves via
/// [`crate::engine::addressing`]; callers always speak logical coordinates.
pub trait AcquisitionAdapter {
    fn acquire(&mut self, module: u32, channel: u32) -> Result<AcquisitionResult, AcquireError>;
}

impl<T: AcquisitionAdapter + ?Sized> AcquisitionAdapter for Box<T> {
    fn acquire(&mut self, module: u32, channel: u32) -> Result<AcquisitionResult, AcquireError> {
        (**self).acquire(module, channel)
    }
}
