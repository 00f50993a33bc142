use num_complex::Complex;
use rustfft::FftPlanner;

use crate::utils::consts::FULL_SCALE;

/// Amplitude floor applied before the log so an all-zero bin maps to a large
/// negative dB value instead of -inf.
const AMPLITUDE_FLOOR: f64 = 1e-12;

/// One-sided power spectrum with its matching frequency axis.
///
/// Either fetched directly from the instrument (already in dB) or produced
/// locally by [`power_spectrum`]. Both sequences always have equal length.
#[derive(Debug, Clone, PartialEq)]
pub struct AcquisitionResult {
    pub freq_hz: Vec<f64>,
    pub magnitude_db: Vec<f64>,
}

impl AcquisitionResult {
    pub fn new(freq_hz: Vec<f64>, magnitude_db: Vec<f64>) -> Self {
        assert_eq!(freq_hz.len(), magnitude_db.len());
        Self { freq_hz, magnitude_db }
    }

    pub fn len(&self) -> usize {
        self.magnitude_db.len()
    }

    pub fn is_empty(&self) -> bool {
        self.magnitude_db.is_empty()
    }
}

/// Transform a raw signed 16-bit sample buffer into a normalized one-sided
/// power spectrum in dB, with a frequency axis spanning 0..Nyquist.
///
/// Samples are scaled to [-1, 1], so a full-scale sinusoid lands near 0 dB
/// after the 2/N amplitude normalization.
pub fn power_spectrum(samples: &[i16], nyquist_hz: f64) -> AcquisitionResult {
    let n = samples.len();
    let mut buf: Vec<Complex<f64>> = samples
        .iter()
        .map(|&s| Complex::new(s as f64 / FULL_SCALE, 0.0))
        .collect();

    let mut planner = FftPlanner::<f64>::new();
    planner.plan_fft_forward(n).process(&mut buf);

    // One-sided spectrum: bins 0..=N/2, last bin at Nyquist.
    let bins = n / 2 + 1;
    let scale = 2.0 / n as f64;
    let magnitude_db: Vec<f64> = buf[..bins]
        .iter()
        .map(|c| {
            let amplitude = (c.norm() * scale).max(AMPLITUDE_FLOOR);
            20.0 * amplitude.log10()
        })
        .collect();

    let step = nyquist_hz / (bins - 1) as f64;
    let freq_hz: Vec<f64> = (0..bins).map(|i| i as f64 * step).collect();

    AcquisitionResult { freq_hz, magnitude_db }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn sinusoid(freq_hz: f64, sample_rate: f64, n: usize) -> Vec<i16> {
        (0..n)
            .map(|i| {
                let phase = 2.0 * PI * freq_hz * i as f64 / sample_rate;
                (phase.sin() * 32767.0) as i16
            })
            .collect()
    }

    #[test]
    fn test_axis_matches_magnitude_length() {
        let samples = sinusoid(1000.0, 8000.0, 1024);
        let result = power_spectrum(&samples, 4000.0);
        assert_eq!(result.freq_hz.len(), result.magnitude_db.len());
        assert_eq!(result.len(), 1024 / 2 + 1);
        assert_eq!(result.freq_hz[0], 0.0);
        assert!((result.freq_hz[result.len() - 1] - 4000.0).abs() < 1e-9);
    }

    #[test]
    fn test_deterministic() {
        let samples = sinusoid(2500.0, 48000.0, 2048);
        let a = power_spectrum(&samples, 24000.0);
        let b = power_spectrum(&samples, 24000.0);
        assert_eq!(a, b);
    }

    #[test]
    fn test_zero_input_stays_finite() {
        let samples = vec![0i16; 512];
        let result = power_spectrum(&samples, 1000.0);
        assert!(result.magnitude_db.iter().all(|db| db.is_finite()));
    }

    #[test]
    fn test_full_scale_sinusoid_near_zero_db() {
        // Tone on the bin closest to 100 kHz, 1 MHz sample rate (500 kHz
        // Nyquist), 4096 samples. Bin-centered so there is no scalloping.
        let n = 4096;
        let tone = (100_000.0f64 / (1_000_000.0 / n as f64)).round()
            * (1_000_000.0 / n as f64);
        let samples = sinusoid(tone, 1_000_000.0, n);
        let result = power_spectrum(&samples, 500_000.0);

        let (max_index, max_db) = result
            .magnitude_db
            .iter()
            .enumerate()
            .fold((0, f64::NEG_INFINITY), |(bi, bv), (i, &v)| {
                if v > bv { (i, v) } else { (bi, bv) }
            });

        let bin_width = 500_000.0 / (result.len() - 1) as f64;
        assert!((result.freq_hz[max_index] - 100_000.0).abs() <= bin_width);
        assert!(max_db > -0.5 && max_db < 0.5, "peak was {max_db} dB");
    }
}
