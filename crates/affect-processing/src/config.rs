//! Configuration for windowed feature extraction

use crate::spectral::FrequencyBand;
use affect_core::{config_error, AffectError, AffectResult, Channel};
use serde::{Deserialize, Serialize};

/// Complete extraction configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Configuration name/profile
    pub name: String,
    /// Window length in whole seconds
    pub window_size: usize,
    pub sampling_rates: SamplingRates,
    pub eda: EdaParams,
    pub ppg: PpgParams,
}

/// Native sampling rates in Hz
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplingRates {
    /// Per-axis accelerometer rate; ACC-3D stores three entries per step
    pub acc: f64,
    pub bvp: f64,
    pub eda: f64,
    pub temperature: f64,
}

/// Skin conductance parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EdaParams {
    /// Derivative threshold for Healey response runs
    pub healey_threshold: f64,
    /// Low-pass cutoff applied before differentiation (Hz)
    pub lowpass_cutoff: f64,
    pub lowpass_order: usize,
    /// Tarvainen smoothing parameter
    pub tarvainen_lambda: f64,
    /// Diagonal coefficients of the difference operator
    pub tarvainen_coefficients: [f64; 3],
    /// SCR local maxima must stay above the SCR mean for more than this many samples
    pub scr_maxima_min_samples: usize,
}

/// Pulse wave parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PpgParams {
    /// Derivative level a beat upstroke must reach
    pub beat_threshold: f64,
    /// Upstroke must stay above threshold for more than this many samples
    pub beat_min_samples: usize,
    pub bandpass_order: usize,
    /// Exactly four HRV bands
    pub bands: Vec<FrequencyBand>,
    pub epsilon: f64,
    /// Normalisation constant for relative power (half the FFT size)
    pub resolution: f64,
}

impl ExtractionConfig {
    /// Settings used for the WESAD wrist recordings (Empatica E4)
    pub fn wesad() -> Self {
        ExtractionConfig {
            name: "WESAD wrist".to_string(),
            window_size: 5,
            sampling_rates: SamplingRates {
                acc: 32.0,
                bvp: 64.0,
                eda: 4.0,
                temperature: 4.0,
            },
            eda: EdaParams {
                healey_threshold: 0.02325,
                lowpass_cutoff: 5.0,
                lowpass_order: 4,
                tarvainen_lambda: 1500.0,
                tarvainen_coefficients: [1.0, -2.0, 1.0],
                scr_maxima_min_samples: 4,
            },
            ppg: PpgParams {
                beat_threshold: 3.5,
                beat_min_samples: 3,
                bandpass_order: 5,
                bands: FrequencyBand::hrv_bands(),
                epsilon: 1e-7,
                resolution: 1024.0 / 2.0,
            },
        }
    }

    /// Native rate for a channel under this configuration
    pub fn sampling_rate(&self, channel: Channel) -> Option<f64> {
        match channel {
            Channel::Acc3D | Channel::AccX | Channel::AccY | Channel::AccZ => {
                Some(self.sampling_rates.acc)
            }
            Channel::Bvp => Some(self.sampling_rates.bvp),
            Channel::Eda => Some(self.sampling_rates.eda),
            Channel::Temperature => Some(self.sampling_rates.temperature),
            _ => None,
        }
    }

    /// Buffer entries per second, counting interleaved entries
    pub fn entries_per_second(&self, channel: Channel) -> Option<usize> {
        self.sampling_rate(channel)
            .map(|rate| (rate * channel.interleave() as f64).round() as usize)
    }

    /// Buffer entries covering a full window
    pub fn window_entries(&self, channel: Channel) -> Option<usize> {
        self.entries_per_second(channel)
            .map(|per_second| per_second * self.window_size)
    }

    pub fn validate(&self) -> AffectResult<()> {
        if self.window_size == 0 {
            return Err(config_error!("window size must be at least one second"));
        }

        let rates = [
            ("accelerometer", self.sampling_rates.acc),
            ("BVP", self.sampling_rates.bvp),
            ("EDA", self.sampling_rates.eda),
            ("temperature", self.sampling_rates.temperature),
        ];
        for (name, rate) in rates {
            if !(rate > 0.0) || !rate.is_finite() {
                return Err(config_error!("{} sampling rate must be positive, got {}", name, rate));
            }
        }

        if !(self.eda.tarvainen_lambda > 0.0) {
            return Err(config_error!(
                "Tarvainen lambda must be positive, got {}",
                self.eda.tarvainen_lambda
            ));
        }
        if self.eda.lowpass_order == 0 || self.ppg.bandpass_order == 0 {
            return Err(config_error!("filter orders must be at least 1"));
        }
        if !(self.eda.lowpass_cutoff > 0.0) {
            return Err(config_error!(
                "EDA low-pass cutoff must be positive, got {}",
                self.eda.lowpass_cutoff
            ));
        }

        self.validate_bands()?;

        if !(self.ppg.resolution > 0.0) || !(self.ppg.epsilon > 0.0) {
            return Err(config_error!("spectral resolution and epsilon must be positive"));
        }

        Ok(())
    }

    fn validate_bands(&self) -> AffectResult<()> {
        if self.ppg.bands.len() != 4 {
            return Err(config_error!(
                "PPG features need exactly 4 frequency bands, got {}",
                self.ppg.bands.len()
            ));
        }

        let nyquist = self.sampling_rates.bvp / 2.0;
        for band in &self.ppg.bands {
            if !(band.low_freq > 0.0) || band.low_freq >= band.high_freq {
                return Err(config_error!(
                    "band '{}' must satisfy 0 < low < high, got {}..{} Hz",
                    band.name,
                    band.low_freq,
                    band.high_freq
                ));
            }
            if band.low_freq >= nyquist {
                return Err(config_error!(
                    "band '{}' starts above the BVP Nyquist frequency ({} Hz)",
                    band.name,
                    nyquist
                ));
            }
        }

        Ok(())
    }

    /// Export configuration to JSON
    pub fn to_json(&self) -> AffectResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| AffectError::Configuration {
            message: format!("Failed to serialize configuration: {}", e),
        })
    }

    /// Import configuration from JSON
    pub fn from_json(json: &str) -> AffectResult<Self> {
        serde_json::from_str(json).map_err(|e| AffectError::Configuration {
            message: format!("Failed to deserialize configuration: {}", e),
        })
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self::wesad()
    }
}
