use byteorder::{LittleEndian, ReadBytesExt};
use indicatif::ProgressBar;
use std::io::{Cursor, Read};
use std::net::TcpStream;
use tracing::{debug, info};

use super::{AcquireError, AcquisitionAdapter};
use crate::dsp::{self, AcquisitionResult};
use crate::engine::addressing;
use crate::utils::consts::{RAW_BYTES_REQUIRED, RAW_PORT_PREFIX};

/// Raw-mode acquisition: connect to the per-channel data server, accumulate
/// a fixed byte count of LE i16 samples, and run the spectrum transform
/// locally.
///
/// The read blocks with no timeout; a stalled stream hangs the run rather
/// than failing it, and only an operator interrupt gets out. That matches
/// how the bench uses it.
pub struct RawStreamAdapter {
    carrier: String,
    nyquist_hz: f64,
}

impl RawStreamAdapter {
    pub fn new(carrier: &str, nyquist_hz: f64) -> Self {
        Self { carrier: carrier.to_string(), nyquist_hz }
    }
}

impl AcquisitionAdapter for RawStreamAdapter {
    fn acquire(&mut self, module: u32, channel: u32) -> Result<AcquisitionResult, AcquireError> {
        let carrier_channel = addressing::carrier_channel(module, channel);
        let samples = fetch_samples(&self.carrier, carrier_channel)?;
        Ok(dsp::power_spectrum(&samples, self.nyquist_hz))
    }
}

/// Channel data server port: fixed prefix plus the two-digit zero-padded
/// carrier channel number.
fn channel_port(carrier_channel: u32) -> Result<u16, AcquireError> {
    let port = format!("{RAW_PORT_PREFIX}{carrier_channel:02}");
    port.parse::<u16>()
        .map_err(|_| AcquireError::Transport(format!("bad channel port {port}")))
}

/// Read until at least [`RAW_BYTES_REQUIRED`] bytes have accumulated, then
/// decode the buffer as LE i16 samples.
pub fn fetch_samples(carrier: &str, carrier_channel: u32) -> Result<Vec<i16>, AcquireError> {
    let port = channel_port(carrier_channel)?;
    info!("streaming channel {carrier_channel} from {carrier}:{port}");

    let mut stream = TcpStream::connect((carrier, port))
        .map_err(|e| AcquireError::Transport(format!("connect to {carrier}:{port}: {e}")))?;

    let bar = ProgressBar::new(RAW_BYTES_REQUIRED as u64);
    let mut buffer = Vec::with_capacity(RAW_BYTES_REQUIRED);
    let mut chunk = [0u8; 16384];
    while buffer.len() < RAW_BYTES_REQUIRED {
        let n = stream.read(&mut chunk)?;
        if n == 0 {
            bar.abandon();
            return Err(AcquireError::Transport(format!(
                "stream closed after {} of {} bytes",
                buffer.len(),
                RAW_BYTES_REQUIRED
            )));
        }
        buffer.extend_from_slice(&chunk[..n]);
        bar.set_position(buffer.len().min(RAW_BYTES_REQUIRED) as u64);
    }
    bar.finish_and_clear();
    debug!("accumulated {} bytes", buffer.len());

    Ok(decode_samples(&buffer))
}

fn decode_samples(buffer: &[u8]) -> Vec<i16> {
    let even = buffer.len() - buffer.len() % 2;
    let mut cursor = Cursor::new(&buffer[..even]);
    let mut samples = Vec::with_capacity(even / 2);
    while let Ok(sample) = cursor.read_i16::<LittleEndian>() {
        samples.push(sample);
    }
    samples
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_le_i16() {
        let bytes = [0x01, 0x00, 0xff, 0xff, 0x00, 0x80];
        assert_eq!(decode_samples(&bytes), vec![1, -1, i16::MIN]);
    }

    #[test]
    fn test_decode_drops_trailing_odd_byte() {
        let bytes = [0x02, 0x00, 0x7f];
        assert_eq!(decode_samples(&bytes), vec![2]);
    }

    #[test]
    fn test_channel_port_is_prefix_plus_padded_channel() {
        assert_eq!(channel_port(1).unwrap(), 53001);
        assert_eq!(channel_port(16).unwrap(), 53016);
    }
}
