use thiserror::Error;
use tracing::{error, info, warn};

use super::addressing;
use super::results::{Measurement, ResultAggregator};
use super::thresholds::{TestMode, Verdict};
use crate::acquire::AcquisitionAdapter;
use crate::config::RunConfig;
use crate::dsp::{AcquisitionResult, Peak, PeakExtractor};
use crate::report::{ReportError, WaveformStore};
use crate::ui::OperatorLink;
use crate::utils::consts::{CHANNELS_PER_MODULE, DECLINE_TOKEN};

#[derive(Debug, Error)]
pub enum RunError {
    #[error("operator input failed: {0}")]
    Operator(#[from] std::io::Error),
    #[error(transparent)]
    Report(#[from] ReportError),
}

/// Per-channel measurement states. Acquisition and extraction failures and
/// validation failures all land in `RetryPrompt`, but only a validation
/// failure carries data that can be force-accepted; there is never a
/// malformed measurement to commit.
enum State {
    AwaitingConnection,
    Acquiring,
    Validating(AcquisitionResult, Peak),
    RetryPrompt(Option<(AcquisitionResult, Peak)>),
    Accepted(AcquisitionResult, Peak),
}

/// Drives the whole test: one operator-paced measurement per (mode,
/// channel) pair, all channels in standard configuration first, then all in
/// common-mode. Strictly sequential; every suspension point is either the
/// operator or the instrument read.
pub struct MeasurementLoop<'a, A: AcquisitionAdapter, O: OperatorLink> {
    adapter: &'a mut A,
    operator: &'a mut O,
    config: &'a RunConfig,
    waveforms: Option<&'a WaveformStore>,
}

impl<'a, A: AcquisitionAdapter, O: OperatorLink> MeasurementLoop<'a, A, O> {
    pub fn new(
        adapter: &'a mut A,
        operator: &'a mut O,
        config: &'a RunConfig,
        waveforms: Option<&'a WaveformStore>,
    ) -> Self {
        Self { adapter, operator, config, waveforms }
    }

    /// Full run: every channel of every module, both modes.
    pub fn run(&mut self) -> Result<ResultAggregator, RunError> {
        self.confirm_run()?;

        let mut aggregator = ResultAggregator::new();
        for mode in [TestMode::Standard, TestMode::CommonMode] {
            for module in 1..=self.config.modules {
                info!("carrier in use: {}", self.config.carrier);
                for channel in 1..=CHANNELS_PER_MODULE {
                    let measurement = self.measure_channel(mode, module, channel)?;
                    aggregator.commit(measurement);
                }
            }
        }
        Ok(aggregator)
    }

    /// Single-channel retest: both modes for one run-wide channel index,
    /// aggregated in isolation.
    pub fn retest(&mut self, channel_index: usize) -> Result<ResultAggregator, RunError> {
        self.confirm_run()?;

        let (module, channel) = addressing::module_and_channel(channel_index);
        let mut aggregator = ResultAggregator::new();
        for mode in [TestMode::Standard, TestMode::CommonMode] {
            let measurement = self.measure_channel(mode, module, channel)?;
            aggregator.commit(measurement);
        }
        Ok(aggregator)
    }

    fn confirm_run(&mut self) -> Result<(), RunError> {
        self.operator.request(&format!(
            "This test has been configured for system {} with {} modules. \
             Press enter if this is correct, otherwise interrupt and start again",
            self.config.carrier, self.config.modules
        ))?;
        Ok(())
    }

    fn measure_channel(
        &mut self,
        mode: TestMode,
        module: u32,
        channel: u32,
    ) -> Result<Measurement, RunError> {
        let settings = self.config.mode(mode);
        let extractor = PeakExtractor {
            skip_bins: settings.skip_bins,
            style: settings.style,
            half_window: settings.half_window,
        };

        let mut state = State::AwaitingConnection;
        loop {
            state = match state {
                State::AwaitingConnection => {
                    self.operator.request(&format!(
                        "Please connect channel {channel:02} on module {module} in {} \
                         and press enter to continue",
                        mode.label()
                    ))?;
                    State::Acquiring
                }

                // Raw-mode adapters run the spectrum transform internally,
                // so extraction can follow acquisition directly.
                State::Acquiring => match self.adapter.acquire(module, channel) {
                    Ok(spectrum) => match extractor.extract(&spectrum) {
                        Ok(peak) => State::Validating(spectrum, peak),
                        Err(e) => {
                            error!("extraction failed on module {module} CH{channel:02}: {e}");
                            State::RetryPrompt(None)
                        }
                    },
                    Err(e) => {
                        error!("acquisition failed on module {module} CH{channel:02}: {e}");
                        State::RetryPrompt(None)
                    }
                },

                State::Validating(spectrum, peak) => {
                    info!(
                        "peak detected at {:.3} dB, {:.1} Hz",
                        peak.db, peak.freq_hz
                    );
                    match settings.thresholds.verdict(&peak) {
                        Verdict::Pass => State::Accepted(spectrum, peak),
                        Verdict::Fail => {
                            warn!(
                                "peak outside acceptance band ({}..{} dB, {}..{} Hz)",
                                settings.thresholds.db_min,
                                settings.thresholds.db_max,
                                settings.thresholds.freq_min,
                                settings.thresholds.freq_max
                            );
                            State::RetryPrompt(Some((spectrum, peak)))
                        }
                    }
                }

                State::RetryPrompt(failed) => {
                    let reply = self.operator.request(&format!(
                        "Press enter to reconnect and remeasure, \
                         or reply '{DECLINE_TOKEN}' to decline"
                    ))?;
                    if reply.trim() == DECLINE_TOKEN {
                        match failed {
                            Some((spectrum, peak)) => {
                                warn!("operator accepted an out-of-band reading");
                                State::Accepted(spectrum, peak)
                            }
                            None => {
                                // No data was produced; there is nothing to
                                // force-accept, so the only way forward is
                                // another attempt.
                                warn!("no measurement to accept, remeasuring");
                                State::AwaitingConnection
                            }
                        }
                    } else {
                        State::AwaitingConnection
                    }
                }

                State::Accepted(spectrum, peak) => {
                    if let Some(store) = self.waveforms {
                        store.save(module, channel, &spectrum)?;
                    }
                    return Ok(Measurement {
                        mode,
                        channel_index: addressing::channel_index(module, channel),
                        peak_db: peak.db,
                        peak_freq_hz: peak.freq_hz,
                    });
                }
            };
        }
    }
}
