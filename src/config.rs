use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::dsp::ExtractionStyle;
use crate::engine::thresholds::{ModeThresholds, TestMode};
use crate::utils::consts::{DATA_ROOT, MAX_MODULES};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not parse config file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid {mode:?} thresholds: {reason}")]
    Thresholds { mode: TestMode, reason: String },
    #[error("module count {0} out of range 1..={MAX_MODULES}")]
    ModuleCount(u32),
    #[error("sample rate and oversampling ratio must be positive")]
    Rates,
}

/// Where spectra come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AcquisitionMode {
    /// The instrument serves ready-made power spectra as waveform PVs.
    PvSpectrum,
    /// Raw samples are streamed over TCP and transformed locally.
    RawLocalFft,
}

/// Per-mode engine settings: acceptance band, peak-search skip offset and
/// extraction style. Captured deployments disagree on the numbers (skip
/// offsets of 2 and 4, common-mode floors of -80 and -75), so all of it is
/// site configuration, not engine logic.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ModeSettings {
    pub thresholds: ModeThresholds,
    pub skip_bins: usize,
    pub style: ExtractionStyle,
    pub half_window: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub carrier: String,
    pub modules: u32,
    pub acquisition: AcquisitionMode,
    /// ADC base sample rate, before oversampling.
    pub sample_rate_hz: f64,
    /// Oversampling ratio; Nyquist for the local transform is
    /// `sample_rate_hz / (2 * osr)`.
    pub osr: u32,
    /// Spectrum smoothing factor pushed to each site before the run.
    pub smoothing: u32,
    pub standard: ModeSettings,
    pub common_mode: ModeSettings,
    #[serde(default)]
    pub save_waveforms: bool,
    #[serde(default = "default_data_root")]
    pub data_root: PathBuf,
    /// When set, the per-carrier directory is archived here after the run.
    #[serde(default)]
    pub final_data_root: Option<PathBuf>,
}

fn default_data_root() -> PathBuf {
    PathBuf::from(DATA_ROOT)
}

impl RunConfig {
    /// Bench defaults for one carrier. The threshold numbers are the most
    /// recently captured deployment values and are expected to be
    /// overridden by a site config file.
    pub fn defaults(carrier: &str, modules: u32) -> Self {
        Self {
            carrier: carrier.to_string(),
            modules,
            acquisition: AcquisitionMode::PvSpectrum,
            sample_rate_hz: 40_000_000.0,
            osr: 40,
            smoothing: 9,
            standard: ModeSettings {
                thresholds: ModeThresholds {
                    db_min: -6.0,
                    db_max: -2.0,
                    freq_min: 90_000.0,
                    freq_max: 110_000.0,
                },
                skip_bins: 2,
                style: ExtractionStyle::SingleBin,
                half_window: 5,
            },
            common_mode: ModeSettings {
                thresholds: ModeThresholds {
                    db_min: -110.0,
                    db_max: -80.0,
                    freq_min: 90_000.0,
                    freq_max: 110_000.0,
                },
                skip_bins: 4,
                style: ExtractionStyle::WindowedEnergy,
                half_window: 5,
            },
            save_waveforms: false,
            data_root: default_data_root(),
            final_data_root: None,
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        let config: RunConfig = serde_json::from_str(&text)?;
        Ok(config)
    }

    pub fn mode(&self, mode: TestMode) -> &ModeSettings {
        match mode {
            TestMode::Standard => &self.standard,
            TestMode::CommonMode => &self.common_mode,
        }
    }

    pub fn nyquist_hz(&self) -> f64 {
        self.sample_rate_hz / (2.0 * self.osr as f64)
    }

    /// Sites spanned by the configured modules; each 16-channel module
    /// reaches one site past its own index.
    pub fn sites(&self) -> u32 {
        self.modules + 1
    }

    pub fn carrier_dir(&self) -> PathBuf {
        self.data_root.join(&self.carrier)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.modules == 0 || self.modules > MAX_MODULES {
            return Err(ConfigError::ModuleCount(self.modules));
        }
        if self.sample_rate_hz <= 0.0 || self.osr == 0 {
            return Err(ConfigError::Rates);
        }
        for (mode, settings) in [
            (TestMode::Standard, &self.standard),
            (TestMode::CommonMode, &self.common_mode),
        ] {
            settings
                .thresholds
                .validate()
                .map_err(|reason| ConfigError::Thresholds { mode, reason })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        assert!(RunConfig::defaults("acq2106_001", 3).validate().is_ok());
    }

    #[test]
    fn test_module_count_bounds() {
        assert!(matches!(
            RunConfig::defaults("uut", 0).validate(),
            Err(ConfigError::ModuleCount(0))
        ));
        assert!(matches!(
            RunConfig::defaults("uut", 4).validate(),
            Err(ConfigError::ModuleCount(4))
        ));
    }

    #[test]
    fn test_inverted_band_is_rejected() {
        let mut config = RunConfig::defaults("uut", 1);
        config.common_mode.thresholds.db_min = -70.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Thresholds { mode: TestMode::CommonMode, .. })
        ));
    }

    #[test]
    fn test_nyquist_from_osr() {
        let config = RunConfig::defaults("uut", 1);
        assert_eq!(config.nyquist_hz(), 40_000_000.0 / 80.0);
    }

    #[test]
    fn test_round_trips_through_json() {
        let config = RunConfig::defaults("acq2106_123", 2);
        let text = serde_json::to_string(&config).unwrap();
        let back: RunConfig = serde_json::from_str(&text).unwrap();
        assert_eq!(back.carrier, "acq2106_123");
        assert_eq!(back.modules, 2);
        assert_eq!(back.standard.skip_bins, 2);
    }
}
