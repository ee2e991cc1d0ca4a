//! Butterworth filters and finite differences
//!
//! Filters run as cascades of biquad sections designed with the bilinear
//! transform. Each call to [`ButterworthFilter::apply`] starts from zero state
//! and returns a new buffer; the input is never modified.

use affect_core::{config_error, AffectResult};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Filter response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterType {
    ButterworthLowpass,
    ButterworthHighpass,
    ButterworthBandpass,
}

/// Filter design parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterConfig {
    pub filter_type: FilterType,
    /// Filter order (per edge for bandpass)
    pub order: usize,
    /// Cutoff for lowpass/highpass (Hz)
    pub cutoff_freq: Option<f64>,
    /// Low edge for bandpass (Hz)
    pub low_cutoff: Option<f64>,
    /// High edge for bandpass (Hz)
    pub high_cutoff: Option<f64>,
}

impl FilterConfig {
    pub fn lowpass(cutoff_freq: f64, order: usize) -> Self {
        Self {
            filter_type: FilterType::ButterworthLowpass,
            order,
            cutoff_freq: Some(cutoff_freq),
            low_cutoff: None,
            high_cutoff: None,
        }
    }

    pub fn highpass(cutoff_freq: f64, order: usize) -> Self {
        Self {
            filter_type: FilterType::ButterworthHighpass,
            order,
            cutoff_freq: Some(cutoff_freq),
            low_cutoff: None,
            high_cutoff: None,
        }
    }

    pub fn bandpass(low_cutoff: f64, high_cutoff: f64, order: usize) -> Self {
        Self {
            filter_type: FilterType::ButterworthBandpass,
            order,
            cutoff_freq: None,
            low_cutoff: Some(low_cutoff),
            high_cutoff: Some(high_cutoff),
        }
    }
}

/// Single second-order section
///
/// y[n] = b0*x[n] + b1*x[n-1] + b2*x[n-2] - a1*y[n-1] - a2*y[n-2]
#[derive(Debug, Clone, Copy, PartialEq)]
struct BiquadSection {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
}

#[derive(Debug, Clone, Copy, Default)]
struct BiquadState {
    x1: f64,
    x2: f64,
    y1: f64,
    y2: f64,
}

impl BiquadSection {
    fn passthrough() -> Self {
        Self { b0: 1.0, b1: 0.0, b2: 0.0, a1: 0.0, a2: 0.0 }
    }

    /// Second-order lowpass with quality factor `q`, `k = tan(pi fc / fs)`
    fn lowpass(k: f64, q: f64) -> Self {
        let k2 = k * k;
        let norm = 1.0 / (1.0 + k / q + k2);
        let b0 = k2 * norm;
        Self {
            b0,
            b1: 2.0 * b0,
            b2: b0,
            a1: 2.0 * (k2 - 1.0) * norm,
            a2: (1.0 - k / q + k2) * norm,
        }
    }

    fn highpass(k: f64, q: f64) -> Self {
        let k2 = k * k;
        let norm = 1.0 / (1.0 + k / q + k2);
        Self {
            b0: norm,
            b1: -2.0 * norm,
            b2: norm,
            a1: 2.0 * (k2 - 1.0) * norm,
            a2: (1.0 - k / q + k2) * norm,
        }
    }

    /// First-order lowpass stored as a degenerate biquad
    fn first_order_lowpass(k: f64) -> Self {
        let b0 = k / (1.0 + k);
        Self { b0, b1: b0, b2: 0.0, a1: (k - 1.0) / (1.0 + k), a2: 0.0 }
    }

    fn first_order_highpass(k: f64) -> Self {
        let b0 = 1.0 / (1.0 + k);
        Self { b0, b1: -b0, b2: 0.0, a1: (k - 1.0) / (1.0 + k), a2: 0.0 }
    }

    fn process_sample(&self, input: f64, state: &mut BiquadState) -> f64 {
        let output = self.b0 * input + self.b1 * state.x1 + self.b2 * state.x2
            - self.a1 * state.y1
            - self.a2 * state.y2;

        state.x2 = state.x1;
        state.x1 = input;
        state.y2 = state.y1;
        state.y1 = output;

        output
    }
}

/// Butterworth filter of arbitrary order
#[derive(Debug, Clone)]
pub struct ButterworthFilter {
    filter_config: FilterConfig,
    sampling_rate: f64,
    biquads: Vec<BiquadSection>,
}

impl ButterworthFilter {
    /// Design a filter for the given sampling rate
    ///
    /// A lowpass edge at or above Nyquist leaves the signal unchanged, since
    /// there is nothing above it to attenuate.
    pub fn new(filter_config: FilterConfig, sampling_rate: f64) -> AffectResult<Self> {
        if !(sampling_rate > 0.0) {
            return Err(config_error!("sampling rate must be positive, got {}", sampling_rate));
        }
        if filter_config.order == 0 {
            return Err(config_error!("filter order must be at least 1"));
        }

        let order = filter_config.order;
        let biquads = match filter_config.filter_type {
            FilterType::ButterworthLowpass => {
                let cutoff = filter_config
                    .cutoff_freq
                    .ok_or_else(|| config_error!("lowpass filter requires a cutoff frequency"))?;
                design_lowpass(cutoff, sampling_rate, order)?
            }
            FilterType::ButterworthHighpass => {
                let cutoff = filter_config
                    .cutoff_freq
                    .ok_or_else(|| config_error!("highpass filter requires a cutoff frequency"))?;
                design_highpass(cutoff, sampling_rate, order)?
            }
            FilterType::ButterworthBandpass => {
                let (low, high) = match (filter_config.low_cutoff, filter_config.high_cutoff) {
                    (Some(low), Some(high)) => (low, high),
                    _ => {
                        return Err(config_error!(
                            "bandpass filter requires low and high cutoff frequencies"
                        ))
                    }
                };
                if low >= high {
                    return Err(config_error!(
                        "low cutoff {} Hz must be below high cutoff {} Hz",
                        low,
                        high
                    ));
                }
                // Highpass at the low edge cascaded with lowpass at the high edge
                let mut sections = design_highpass(low, sampling_rate, order)?;
                sections.extend(design_lowpass(high, sampling_rate, order)?);
                sections
            }
        };

        Ok(ButterworthFilter {
            filter_config,
            sampling_rate,
            biquads,
        })
    }

    pub fn lowpass(cutoff_freq: f64, order: usize, sampling_rate: f64) -> AffectResult<Self> {
        Self::new(FilterConfig::lowpass(cutoff_freq, order), sampling_rate)
    }

    pub fn bandpass(
        low_cutoff: f64,
        high_cutoff: f64,
        order: usize,
        sampling_rate: f64,
    ) -> AffectResult<Self> {
        Self::new(FilterConfig::bandpass(low_cutoff, high_cutoff, order), sampling_rate)
    }

    pub fn config(&self) -> &FilterConfig {
        &self.filter_config
    }

    pub fn sampling_rate(&self) -> f64 {
        self.sampling_rate
    }

    /// Filter a signal in a single forward pass, returning a new buffer
    pub fn apply<T: Copy + Into<f64>>(&self, signal: &[T]) -> Vec<f64> {
        let mut output: Vec<f64> = signal.iter().map(|&x| x.into()).collect();

        for biquad in &self.biquads {
            let mut state = BiquadState::default();
            for sample in output.iter_mut() {
                *sample = biquad.process_sample(*sample, &mut state);
            }
        }

        output
    }
}

/// Bilinear-transform prewarp, `None` when the edge is not below Nyquist
fn prewarp(cutoff: f64, fs: f64) -> AffectResult<Option<f64>> {
    if !(cutoff > 0.0) {
        return Err(config_error!("cutoff frequency must be positive, got {}", cutoff));
    }
    if cutoff >= fs / 2.0 {
        return Ok(None);
    }
    Ok(Some((PI * cutoff / fs).tan()))
}

/// Pole quality factors of an order-N Butterworth prototype, one per biquad
fn section_q_factors(order: usize) -> impl Iterator<Item = f64> {
    (0..order / 2).map(move |k| {
        let theta = PI * (2 * k + 1) as f64 / (2 * order) as f64;
        1.0 / (2.0 * theta.sin())
    })
}

fn design_lowpass(cutoff: f64, fs: f64, order: usize) -> AffectResult<Vec<BiquadSection>> {
    let k = match prewarp(cutoff, fs)? {
        Some(k) => k,
        None => return Ok(vec![BiquadSection::passthrough()]),
    };

    let mut sections: Vec<BiquadSection> = section_q_factors(order)
        .map(|q| BiquadSection::lowpass(k, q))
        .collect();
    if order % 2 == 1 {
        sections.push(BiquadSection::first_order_lowpass(k));
    }
    Ok(sections)
}

fn design_highpass(cutoff: f64, fs: f64, order: usize) -> AffectResult<Vec<BiquadSection>> {
    let k = match prewarp(cutoff, fs)? {
        Some(k) => k,
        None => {
            return Err(config_error!(
                "highpass cutoff {} Hz must be below Nyquist ({} Hz)",
                cutoff,
                fs / 2.0
            ))
        }
    };

    let mut sections: Vec<BiquadSection> = section_q_factors(order)
        .map(|q| BiquadSection::highpass(k, q))
        .collect();
    if order % 2 == 1 {
        sections.push(BiquadSection::first_order_highpass(k));
    }
    Ok(sections)
}

/// First difference `d[i] = x[i+1] - x[i]`, one shorter than the input
pub fn finite_difference<T: Copy + Into<f64>>(signal: &[T]) -> Vec<f64> {
    signal
        .windows(2)
        .map(|pair| pair[1].into() - pair[0].into())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use affect_core::AffectError;

    fn sine(freq: f64, fs: f64, n: usize) -> Vec<f64> {
        (0..n).map(|i| (2.0 * PI * freq * i as f64 / fs).sin()).collect()
    }

    fn tail_peak(signal: &[f64]) -> f64 {
        signal[signal.len() / 2..]
            .iter()
            .fold(0.0f64, |acc, &x| acc.max(x.abs()))
    }

    #[test]
    fn test_lowpass_passes_dc() {
        let filter = ButterworthFilter::lowpass(5.0, 4, 64.0).unwrap();
        let output = filter.apply(&[1.0f64; 256]);
        assert!((output[255] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_lowpass_attenuates_high_frequency() {
        let filter = ButterworthFilter::lowpass(2.0, 4, 64.0).unwrap();
        let output = filter.apply(&sine(20.0, 64.0, 512));
        assert!(tail_peak(&output) < 0.01);
    }

    #[test]
    fn test_odd_order_sections() {
        let filter = ButterworthFilter::bandpass(0.05, 0.15, 5, 64.0).unwrap();
        // 2 biquads + 1 first-order section per edge
        assert_eq!(filter.biquads.len(), 6);
    }

    #[test]
    fn test_bandpass_rejects_out_of_band() {
        let filter = ButterworthFilter::bandpass(4.0, 8.0, 4, 64.0).unwrap();
        let in_band = filter.apply(&sine(5.6, 64.0, 1024));
        let below = filter.apply(&sine(0.5, 64.0, 1024));
        let above = filter.apply(&sine(25.0, 64.0, 1024));

        assert!(tail_peak(&in_band) > 0.8);
        assert!(tail_peak(&below) < 0.05);
        assert!(tail_peak(&above) < 0.05);
    }

    #[test]
    fn test_cutoff_above_nyquist_passes_through() {
        let filter = ButterworthFilter::lowpass(5.0, 4, 4.0).unwrap();
        let signal = [0.3f64, 0.5, 0.2, 0.9];
        assert_eq!(filter.apply(&signal), signal.to_vec());
    }

    #[test]
    fn test_invalid_designs() {
        assert!(matches!(
            ButterworthFilter::lowpass(5.0, 0, 64.0),
            Err(AffectError::Configuration { .. })
        ));
        assert!(ButterworthFilter::bandpass(1.0, 0.5, 5, 64.0).is_err());
        assert!(ButterworthFilter::new(FilterConfig::highpass(40.0, 2), 64.0).is_err());
        assert!(ButterworthFilter::lowpass(5.0, 4, 0.0).is_err());
    }

    #[test]
    fn test_apply_leaves_input_untouched() {
        let filter = ButterworthFilter::lowpass(1.0, 2, 4.0).unwrap();
        let signal = vec![1.0f64, 0.0, 1.0, 0.0];
        let copy = signal.clone();
        let _ = filter.apply(&signal);
        assert_eq!(signal, copy);
    }

    #[test]
    fn test_finite_difference() {
        assert_eq!(finite_difference(&[1.0f64, 4.0, 2.0, 2.5]), vec![3.0, -2.0, 0.5]);
        assert!(finite_difference(&[1.0f32]).is_empty());
        assert!(finite_difference::<f64>(&[]).is_empty());
    }
}
