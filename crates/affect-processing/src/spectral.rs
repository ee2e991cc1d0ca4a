//! Spectral analysis: peak frequency, band filtering and band power

use crate::filters::ButterworthFilter;
use affect_core::{AffectError, AffectResult};
use num_complex::Complex;
use rustfft::FftPlanner;
use serde::{Deserialize, Serialize};

/// Frequency band definition for spectral analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrequencyBand {
    pub name: String,
    pub low_freq: f64,
    pub high_freq: f64,
}

impl FrequencyBand {
    pub fn new(name: impl Into<String>, low_freq: f64, high_freq: f64) -> Self {
        FrequencyBand {
            name: name.into(),
            low_freq,
            high_freq,
        }
    }

    /// Heart-rate variability bands (ULF, VLF, LF, HF)
    pub fn hrv_bands() -> Vec<FrequencyBand> {
        vec![
            FrequencyBand::new("ULF", 0.01, 0.04),
            FrequencyBand::new("VLF", 0.05, 0.15),
            FrequencyBand::new("LF", 0.15, 0.4),
            FrequencyBand::new("HF", 0.4, 1.0),
        ]
    }
}

/// FFT-backed spectral analyzer
pub struct SpectralAnalyzer {
    fft_planner: FftPlanner<f64>,
}

impl SpectralAnalyzer {
    pub fn new() -> Self {
        SpectralAnalyzer {
            fft_planner: FftPlanner::new(),
        }
    }

    /// Frequency (Hz) of the largest-magnitude bin in the non-negative half spectrum
    ///
    /// The DC bin is included, so a signal with a large offset reports 0 Hz.
    pub fn peak_frequency<T: Copy + Into<f64>>(
        &mut self,
        signal: &[T],
        sampling_rate: f64,
    ) -> AffectResult<f64> {
        if signal.is_empty() {
            return Err(AffectError::EmptyInput {
                operation: "peak_frequency",
            });
        }

        let fft_size = signal.len();
        let fft = self.fft_planner.plan_fft_forward(fft_size);

        let mut spectrum: Vec<Complex<f64>> = signal
            .iter()
            .map(|&x| Complex::new(x.into(), 0.0))
            .collect();
        fft.process(&mut spectrum);

        let peak_bin = spectrum[..fft_size / 2 + 1]
            .iter()
            .map(|c| c.norm())
            .enumerate()
            .max_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(bin, _)| bin)
            .unwrap_or(0);

        Ok(peak_bin as f64 * sampling_rate / fft_size as f64)
    }
}

impl Default for SpectralAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

/// Band-pass the input signal once per band
///
/// Every band gets its own freshly filtered buffer.
pub fn band_signals<T: Copy + Into<f64>>(
    signal: &[T],
    bands: &[FrequencyBand],
    sampling_rate: f64,
    order: usize,
) -> AffectResult<Vec<Vec<f64>>> {
    bands
        .iter()
        .map(|band| {
            let filter =
                ButterworthFilter::bandpass(band.low_freq, band.high_freq, order, sampling_rate)?;
            Ok(filter.apply(signal))
        })
        .collect()
}

/// Sum of squares of each band signal
pub fn band_energy_sums(band_signals: &[Vec<f64>]) -> Vec<f64> {
    band_signals
        .iter()
        .map(|band| band.iter().map(|x| x * x).sum())
        .collect()
}

/// `20 log10(max(|x| / resolution) + epsilon)` for each band signal
pub fn relative_powers(band_signals: &[Vec<f64>], resolution: f64, epsilon: f64) -> Vec<f64> {
    band_signals
        .iter()
        .map(|band| {
            let peak = band
                .iter()
                .fold(0.0f64, |acc, &x| acc.max(x.abs() / resolution));
            20.0 * (peak + epsilon).log10()
        })
        .collect()
}

/// Divide a band signal by its L2 norm in place; an all-zero band is left as is
pub fn normalize(band: &mut [f64]) {
    let norm = band.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm == 0.0 {
        return;
    }
    for x in band.iter_mut() {
        *x /= norm;
    }
}
