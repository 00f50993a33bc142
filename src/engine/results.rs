use std::collections::BTreeMap;

use super::thresholds::TestMode;

/// One accepted reading for a (mode, channel) pair. Immutable once
/// committed; forced accepts look the same as automatic passes here.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    pub mode: TestMode,
    pub channel_index: usize,
    pub peak_db: f64,
    pub peak_freq_hz: f64,
}

/// Both readings for one channel plus the derived rejection ratio.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelResult {
    pub channel_index: usize,
    pub standard: Measurement,
    pub common_mode: Measurement,
    pub cmrr: f64,
}

#[derive(Debug, Default, Clone, Copy)]
struct ChannelSlot {
    standard: Option<Measurement>,
    common_mode: Option<Measurement>,
}

/// Accumulates accepted measurements for one run and derives the CMRR
/// table once both modes are present. Owned by the run and passed into the
/// measurement loop; nothing else writes to it.
#[derive(Debug, Default)]
pub struct ResultAggregator {
    channels: BTreeMap<usize, ChannelSlot>,
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an accepted measurement. Committing the same (mode, channel)
    /// twice is a sequencing bug in the caller.
    pub fn commit(&mut self, measurement: Measurement) {
        let slot = self.channels.entry(measurement.channel_index).or_default();
        let cell = match measurement.mode {
            TestMode::Standard => &mut slot.standard,
            TestMode::CommonMode => &mut slot.common_mode,
        };
        debug_assert!(
            cell.is_none(),
            "duplicate measurement for channel {} in {}",
            measurement.channel_index,
            measurement.mode
        );
        *cell = Some(measurement);
    }

    pub fn len(&self) -> usize {
        self.channels
            .values()
            .map(|s| s.standard.is_some() as usize + s.common_mode.is_some() as usize)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// CMRR results in ascending channel order. Channels missing either
    /// mode (an interrupted run) are skipped.
    pub fn channel_results(&self) -> Vec<ChannelResult> {
        self.channels
            .iter()
            .filter_map(|(&channel_index, slot)| {
                let standard = slot.standard?;
                let common_mode = slot.common_mode?;
                Some(ChannelResult {
                    channel_index,
                    standard,
                    common_mode,
                    cmrr: standard.peak_db - common_mode.peak_db,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn measurement(mode: TestMode, channel_index: usize, peak_db: f64) -> Measurement {
        Measurement { mode, channel_index, peak_db, peak_freq_hz: 100_000.0 }
    }

    #[test]
    fn test_cmrr_is_exact_difference() {
        let mut agg = ResultAggregator::new();
        agg.commit(measurement(TestMode::Standard, 1, -4.25));
        agg.commit(measurement(TestMode::CommonMode, 1, -101.5));

        let results = agg.channel_results();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].cmrr, -4.25 - -101.5);
    }

    #[test]
    fn test_results_come_out_in_channel_order() {
        let mut agg = ResultAggregator::new();
        for &ch in &[3, 1, 2] {
            agg.commit(measurement(TestMode::Standard, ch, -4.0));
            agg.commit(measurement(TestMode::CommonMode, ch, -100.0));
        }

        let order: Vec<usize> = agg
            .channel_results()
            .iter()
            .map(|r| r.channel_index)
            .collect();
        assert_eq!(order, vec![1, 2, 3]);
    }

    #[test]
    fn test_incomplete_channels_are_skipped() {
        let mut agg = ResultAggregator::new();
        agg.commit(measurement(TestMode::Standard, 1, -4.0));
        agg.commit(measurement(TestMode::Standard, 2, -4.0));
        agg.commit(measurement(TestMode::CommonMode, 2, -95.0));

        let results = agg.channel_results();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].channel_index, 2);
        assert_eq!(agg.len(), 3);
    }
}
