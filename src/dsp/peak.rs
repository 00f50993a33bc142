use serde::{Deserialize, Serialize};

use super::spectrum::AcquisitionResult;
use super::DspError;

/// How the peak amplitude is estimated from the spectrum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionStyle {
    /// Maximum single bin of the spectrum.
    SingleBin,
    /// RMS energy over a window of bins around the single-bin peak; more
    /// robust against noise, at the cost of single-bin frequency precision.
    WindowedEnergy,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Peak {
    pub db: f64,
    pub freq_hz: f64,
}

/// Peak search over an [`AcquisitionResult`].
///
/// `skip_bins` excludes leading low-frequency bins (DC and supply ripple)
/// from the search; captured deployments use 2 or 4 depending on the
/// acceptance band, so it is configuration rather than a constant. The same
/// goes for `half_window`, the windowed-energy half-width in bins.
#[derive(Debug, Clone, Copy)]
pub struct PeakExtractor {
    pub skip_bins: usize,
    pub style: ExtractionStyle,
    pub half_window: usize,
}

impl PeakExtractor {
    pub fn extract(&self, spectrum: &AcquisitionResult) -> Result<Peak, DspError> {
        // The energy window clips at the array bounds, so it only needs one
        // half-window of bins to say anything meaningful.
        let need = match self.style {
            ExtractionStyle::SingleBin => self.skip_bins + 1,
            ExtractionStyle::WindowedEnergy => {
                (self.skip_bins + 1).max(self.half_window)
            }
        };
        if spectrum.len() < need {
            return Err(DspError::InsufficientData { got: spectrum.len(), need });
        }

        // Single-bin peak over magnitude[skip..]; first bin wins ties.
        let (peak_index, peak_db) = spectrum.magnitude_db[self.skip_bins..]
            .iter()
            .enumerate()
            .fold((0, f64::NEG_INFINITY), |(bi, bv), (i, &v)| {
                if v > bv { (i, v) } else { (bi, bv) }
            });
        let peak_index = peak_index + self.skip_bins;
        let freq_hz = spectrum.freq_hz[peak_index];

        let db = match self.style {
            ExtractionStyle::SingleBin => peak_db,
            ExtractionStyle::WindowedEnergy => {
                windowed_energy_db(&spectrum.magnitude_db, peak_index, self.half_window)
            }
        };

        Ok(Peak { db, freq_hz })
    }
}

/// Sum of squared linear amplitudes over `half_window` bins either side of
/// `center` (clipped to the array bounds), returned as dB.
fn windowed_energy_db(magnitude_db: &[f64], center: usize, half_window: usize) -> f64 {
    let lo = center.saturating_sub(half_window);
    let hi = (center + half_window).min(magnitude_db.len());
    let energy: f64 = magnitude_db[lo..hi]
        .iter()
        .map(|&db| {
            let amplitude = 10f64.powf(db / 20.0);
            amplitude * amplitude
        })
        .sum();
    20.0 * energy.sqrt().log10()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spectrum(magnitude_db: Vec<f64>) -> AcquisitionResult {
        let freq_hz = (0..magnitude_db.len()).map(|i| i as f64 * 100.0).collect();
        AcquisitionResult::new(freq_hz, magnitude_db)
    }

    #[test]
    fn test_single_bin_peak() {
        let s = spectrum(vec![-10.0, -20.0, -30.0, -5.0, -40.0, -50.0]);
        let extractor = PeakExtractor {
            skip_bins: 2,
            style: ExtractionStyle::SingleBin,
            half_window: 5,
        };
        let peak = extractor.extract(&s).unwrap();
        assert_eq!(peak.db, -5.0);
        assert_eq!(peak.freq_hz, 300.0);
    }

    #[test]
    fn test_skip_bins_excludes_leading_maximum() {
        // Bin 0 holds the global maximum but sits inside the skip region.
        let s = spectrum(vec![0.0, -90.0, -80.0, -70.0, -60.0, -85.0]);
        let extractor = PeakExtractor {
            skip_bins: 2,
            style: ExtractionStyle::SingleBin,
            half_window: 5,
        };
        let peak = extractor.extract(&s).unwrap();
        assert_eq!(peak.db, -60.0);
        assert_eq!(peak.freq_hz, 400.0);
    }

    #[test]
    fn test_windowed_energy_clips_at_edges() {
        // 9 bins, peak at index 4; the +-5 window must clip, not panic.
        let mut bins = vec![-100.0; 9];
        bins[4] = -3.0;
        let s = spectrum(bins);
        let extractor = PeakExtractor {
            skip_bins: 0,
            style: ExtractionStyle::WindowedEnergy,
            half_window: 5,
        };
        let peak = extractor.extract(&s).unwrap();
        assert_eq!(peak.freq_hz, 400.0);
        // The noise bins contribute almost nothing next to the -3 dB peak.
        assert!((peak.db - -3.0).abs() < 0.1, "got {} dB", peak.db);
    }

    #[test]
    fn test_windowed_energy_reports_single_bin_frequency() {
        let mut bins = vec![-80.0; 64];
        bins[20] = -10.0;
        bins[21] = -12.0;
        let s = spectrum(bins);
        let extractor = PeakExtractor {
            skip_bins: 4,
            style: ExtractionStyle::WindowedEnergy,
            half_window: 5,
        };
        let peak = extractor.extract(&s).unwrap();
        assert_eq!(peak.freq_hz, 2000.0);
    }

    #[test]
    fn test_insufficient_data() {
        let s = spectrum(vec![-10.0, -20.0]);
        let extractor = PeakExtractor {
            skip_bins: 0,
            style: ExtractionStyle::WindowedEnergy,
            half_window: 5,
        };
        assert!(matches!(
            extractor.extract(&s),
            Err(DspError::InsufficientData { .. })
        ));
    }

    #[test]
    fn test_tie_takes_first_bin() {
        let s = spectrum(vec![-50.0, -6.0, -6.0, -50.0]);
        let extractor = PeakExtractor {
            skip_bins: 0,
            style: ExtractionStyle::SingleBin,
            half_window: 5,
        };
        let peak = extractor.extract(&s).unwrap();
        assert_eq!(peak.freq_hz, 100.0);
    }
}
