//! Heartbeat detection and time-domain HRV

use crate::filters::finite_difference;
use crate::statistics;
use serde::{Deserialize, Serialize};

/// Index of the highest sample in each run where `value >= threshold`
///
/// Only runs longer than `min_samples` count. A run still open at the end of
/// the signal is not reported.
pub fn find_local_maxima(signal: &[f64], threshold: f64, min_samples: usize) -> Vec<usize> {
    let mut maxima = Vec::new();
    let mut run_start: Option<usize> = None;

    for (i, &value) in signal.iter().enumerate() {
        if value >= threshold {
            run_start.get_or_insert(i);
            continue;
        }

        if let Some(start) = run_start.take() {
            if i - start > min_samples {
                maxima.push(argmax(&signal[start..i]) + start);
            }
        }
    }

    maxima
}

fn argmax(values: &[f64]) -> usize {
    values
        .iter()
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |best, (i, &v)| if v > best.1 { (i, v) } else { best })
        .0
}

/// Beat-to-beat metrics of one window
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HeartFeatures {
    /// Instantaneous heart rate per interval (beats per minute)
    pub heart_rates: Vec<f64>,
    /// Beat-to-beat intervals in samples
    pub rr_intervals: Vec<f64>,
    /// Adjacent interval pairs differing by more than 50 ms
    pub nn50: usize,
    /// `nn50` over the number of intervals, 0 without intervals
    pub pnn50: f64,
}

impl HeartFeatures {
    pub fn hr_mean(&self) -> f64 {
        statistics::mean(&self.heart_rates).unwrap_or(0.0)
    }

    pub fn hr_std(&self) -> f64 {
        statistics::std_dev(&self.heart_rates).unwrap_or(0.0)
    }

    pub fn rr_mean(&self) -> f64 {
        statistics::mean(&self.rr_intervals).unwrap_or(0.0)
    }

    pub fn rr_std(&self) -> f64 {
        statistics::std_dev(&self.rr_intervals).unwrap_or(0.0)
    }

    pub fn rr_rms(&self) -> f64 {
        statistics::rms(&self.rr_intervals).unwrap_or(0.0)
    }
}

/// RR intervals, heart rates and NN50 from beat indices
pub fn heart_features(beats: &[usize], sampling_rate: f64) -> HeartFeatures {
    let rr_intervals: Vec<f64> = beats
        .windows(2)
        .map(|pair| pair[1] as f64 - pair[0] as f64)
        .collect();

    let heart_rates = rr_intervals
        .iter()
        .map(|&rr| 60.0 * sampling_rate / rr)
        .collect();

    let fifty_ms = sampling_rate * 0.05;
    let nn50 = rr_intervals
        .windows(2)
        .filter(|pair| (pair[1] - pair[0]).abs() > fifty_ms)
        .count();

    let pnn50 = if rr_intervals.is_empty() {
        0.0
    } else {
        nn50 as f64 / rr_intervals.len() as f64
    };

    HeartFeatures {
        heart_rates,
        rr_intervals,
        nn50,
        pnn50,
    }
}

/// Beat detection on the PPG derivative
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BeatDetector {
    pub threshold: f64,
    pub min_samples: usize,
    pub sampling_rate: f64,
}

impl BeatDetector {
    pub fn new(threshold: f64, min_samples: usize, sampling_rate: f64) -> Self {
        BeatDetector {
            threshold,
            min_samples,
            sampling_rate,
        }
    }

    /// Beat indices, measured on the first difference of the pulse wave
    pub fn detect<T: Copy + Into<f64>>(&self, ppg: &[T]) -> Vec<usize> {
        find_local_maxima(&finite_difference(ppg), self.threshold, self.min_samples)
    }

    pub fn analyze<T: Copy + Into<f64>>(&self, ppg: &[T]) -> HeartFeatures {
        heart_features(&self.detect(ppg), self.sampling_rate)
    }
}

impl Default for BeatDetector {
    fn default() -> Self {
        Self::new(3.5, 3, 64.0)
    }
}
