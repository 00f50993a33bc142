use serde::{Deserialize, Serialize};
use std::fmt;

use crate::dsp::Peak;

/// The two cabling configurations a channel is measured in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestMode {
    Standard,
    CommonMode,
}

impl TestMode {
    /// Wording used in operator prompts.
    pub fn label(&self) -> &'static str {
        match self {
            TestMode::Standard => "standard configuration",
            TestMode::CommonMode => "common-mode (shorted) configuration",
        }
    }
}

impl fmt::Display for TestMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Acceptance band for one test mode. Both intervals are closed.
///
/// The numeric values drift between deployments and hardware revisions
/// (common-mode dB floors of -80 and -75 have both been in service), so
/// they arrive as configuration and are validated at startup.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModeThresholds {
    pub db_min: f64,
    pub db_max: f64,
    pub freq_min: f64,
    pub freq_max: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    Fail,
}

impl ModeThresholds {
    pub fn validate(&self) -> Result<(), String> {
        if self.db_min >= self.db_max {
            return Err(format!(
                "dB band is empty: min {} >= max {}",
                self.db_min, self.db_max
            ));
        }
        if self.freq_min >= self.freq_max {
            return Err(format!(
                "frequency band is empty: min {} >= max {}",
                self.freq_min, self.freq_max
            ));
        }
        Ok(())
    }

    /// Pass iff both the amplitude and the frequency sit inside their bands.
    pub fn verdict(&self, peak: &Peak) -> Verdict {
        let db_ok = self.db_min <= peak.db && peak.db <= self.db_max;
        let freq_ok = self.freq_min <= peak.freq_hz && peak.freq_hz <= self.freq_max;
        if db_ok && freq_ok { Verdict::Pass } else { Verdict::Fail }
    }
}
