use std::process::Command;
use tracing::{debug, warn};

use super::{AcquireError, AcquisitionAdapter};
use crate::dsp::AcquisitionResult;
use crate::engine::addressing;

/// Thin wrapper over the EPICS command-line tools (`caget`/`caput`), which
/// are already installed on the deployment hosts. Every instrument knob and
/// waveform this rig touches goes through here.
#[derive(Debug, Clone, Default)]
pub struct EpicsGateway;

impl EpicsGateway {
    pub fn new() -> Self {
        Self
    }

    fn run(&self, tool: &str, args: &[&str]) -> Result<String, AcquireError> {
        debug!("{} {}", tool, args.join(" "));
        let output = Command::new(tool)
            .args(args)
            .output()
            .map_err(|e| AcquireError::Transport(format!("failed to spawn {tool}: {e}")))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AcquireError::Transport(format!(
                "{tool} exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Fetch a scalar process variable as trimmed text.
    pub fn get_scalar(&self, pv: &str) -> Result<String, AcquireError> {
        let reply = self.run("caget", &["-t", pv])?;
        let value = reply.trim();
        if value.is_empty() {
            return Err(AcquireError::Data(format!("empty reply for {pv}")));
        }
        Ok(value.to_string())
    }

    /// Fetch a waveform process variable as floats.
    ///
    /// `caget -t` prints the element count ahead of array values; the
    /// leading token is dropped when it matches the remaining length.
    pub fn get_waveform(&self, pv: &str) -> Result<Vec<f64>, AcquireError> {
        let reply = self.run("caget", &["-t", pv])?;
        let tokens: Vec<&str> = reply.split_whitespace().collect();
        if tokens.is_empty() {
            return Err(AcquireError::Data(format!("empty reply for {pv}")));
        }

        let mut start = 0;
        if let Ok(count) = tokens[0].parse::<usize>() {
            if count == tokens.len() - 1 {
                start = 1;
            }
        }

        let values = tokens[start..]
            .iter()
            .map(|t| t.parse::<f64>())
            .collect::<Result<Vec<f64>, _>>()
            .map_err(|e| AcquireError::Data(format!("non-numeric reply for {pv}: {e}")))?;
        if values.is_empty() {
            return Err(AcquireError::Data(format!("zero-length waveform for {pv}")));
        }
        Ok(values)
    }

    pub fn put(&self, pv: &str, value: &str) -> Result<(), AcquireError> {
        self.run("caput", &["-t", pv, value]).map(|_| ())
    }
}

/// Identification block printed at the top of the report. Fields an
/// instrument does not expose come back as "unknown" rather than failing
/// the run.
#[derive(Debug, Clone)]
pub struct SystemId {
    pub carrier: String,
    pub software_version: String,
    pub fpga_version: String,
    /// (site, serial number)
    pub site_serials: Vec<(u32, String)>,
    /// (site, degrees C as reported)
    pub site_temperatures: Vec<(u32, String)>,
}

impl SystemId {
    pub fn fetch(gateway: &EpicsGateway, carrier: &str, sites: u32) -> Self {
        let scalar = |pv: String| {
            gateway.get_scalar(&pv).unwrap_or_else(|e| {
                warn!("could not read {pv}: {e}");
                "unknown".to_string()
            })
        };

        let mut site_serials = Vec::new();
        let mut site_temperatures = Vec::new();
        for site in 1..=sites {
            site_serials.push((site, scalar(format!("{carrier}:{site}:SERIAL"))));
            site_temperatures.push((site, scalar(format!("{carrier}:{site}:TEMP"))));
        }

        Self {
            carrier: carrier.to_string(),
            software_version: scalar(format!("{carrier}:SYS:VERSION:SW")),
            fpga_version: scalar(format!("{carrier}:SYS:VERSION:FPGA")),
            site_serials,
            site_temperatures,
        }
    }
}

/// Pre-run instrument setup: drop out of continuous streaming, push the
/// spectrum smoothing factor to every site, then re-arm streaming unless
/// the spectra are computed locally from raw captures.
pub fn configure_instrument(
    gateway: &EpicsGateway,
    carrier: &str,
    sites: u32,
    smoothing: u32,
    local_fft: bool,
) -> Result<(), AcquireError> {
    gateway.put(&format!("{carrier}:MODE:CONTINUOUS"), "0")?;
    for site in 1..=sites {
        gateway.put(
            &format!("{carrier}:{site}:AI:WF:PS:SMOO"),
            &smoothing.to_string(),
        )?;
    }
    if !local_fft {
        gateway.put(&format!("{carrier}:MODE:CONTINUOUS"), "1")?;
    }
    Ok(())
}

/// Spectrum-mode acquisition: the instrument computes the power spectrum
/// itself and serves it as a pair of waveform PVs, amplitude in dB and
/// frequency in Hz.
pub struct PvSpectrumAdapter {
    gateway: EpicsGateway,
    carrier: String,
}

impl PvSpectrumAdapter {
    pub fn new(gateway: EpicsGateway, carrier: &str) -> Self {
        Self { gateway, carrier: carrier.to_string() }
    }
}

impl AcquisitionAdapter for PvSpectrumAdapter {
    fn acquire(&mut self, module: u32, channel: u32) -> Result<AcquisitionResult, AcquireError> {
        let addr = addressing::resolve(module, channel);
        let base = format!(
            "{}:{}:AI:WF:PS:{:02}",
            self.carrier, addr.site, addr.channel
        );

        let magnitude_db = self.gateway.get_waveform(&format!("{base}.VALA"))?;
        let freq_hz = self.gateway.get_waveform(&format!("{base}.VALB"))?;
        if magnitude_db.len() != freq_hz.len() {
            return Err(AcquireError::Data(format!(
                "axis length mismatch for {base}: {} dB bins vs {} Hz bins",
                magnitude_db.len(),
                freq_hz.len()
            )));
        }
        Ok(AcquisitionResult::new(freq_hz, magnitude_db))
    }
}
