//! Healey-style skin conductance response segmentation
//!
//! Low-pass the EDA signal, differentiate it, keep derivative runs above a
//! threshold lasting at least one second, and widen each run out to the
//! surrounding zero crossings of the derivative.
//!
//! Reference: Healey and Picard, "Detecting stress during real-world driving
//! tasks using physiological sensors", IEEE T-ITS 6(2), 2005.

use crate::filters::{finite_difference, ButterworthFilter};
use affect_core::AffectResult;
use serde::{Deserialize, Serialize};

/// Contiguous derivative indices above threshold, `last` inclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThresholdRun {
    pub first: usize,
    pub last: usize,
}

impl ThresholdRun {
    pub fn len(&self) -> usize {
        self.last - self.first + 1
    }
}

/// Sign changes of the derivative
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ZeroCrossings {
    /// Indices `i` where `d[i] < 0 < d[i+1]`
    pub plus: Vec<usize>,
    /// Indices `i` where `d[i] > 0 > d[i+1]`
    pub minus: Vec<usize>,
}

/// Reconstructed response spanning `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GsrPeak {
    pub start: usize,
    pub end: usize,
}

impl GsrPeak {
    pub fn duration(&self) -> usize {
        self.end - self.start
    }
}

/// Shape of one response
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PeakFeatures {
    /// Rise from the onset sample to the highest sample of the range
    pub magnitude: f64,
    /// Range length in samples
    pub duration: f64,
    /// Triangle area `0.5 * magnitude * duration`
    pub amplitude: f64,
}

/// Column-wise sum over all responses of a window
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PeakSummary {
    pub magnitude: f64,
    pub duration: f64,
    pub amplitude: f64,
    pub count: usize,
}

/// Runs where `d[i] > threshold` lasting at least `min_len` samples
///
/// A run still open at the end of the signal is not reported.
pub fn find_above(derivative: &[f64], threshold: f64, min_len: f64) -> Vec<ThresholdRun> {
    let mut runs = Vec::new();
    let mut open: Option<ThresholdRun> = None;

    for (i, &value) in derivative.iter().enumerate() {
        if value > threshold {
            match open.as_mut() {
                Some(run) => run.last = i,
                None => open = Some(ThresholdRun { first: i, last: i }),
            }
        } else if let Some(run) = open.take() {
            if run.len() as f64 >= min_len {
                runs.push(run);
            }
        }
    }

    runs
}

pub fn zero_crossings(derivative: &[f64]) -> ZeroCrossings {
    let mut crossings = ZeroCrossings::default();

    for (i, pair) in derivative.windows(2).enumerate() {
        if pair[0] < 0.0 && pair[1] > 0.0 {
            crossings.plus.push(i);
        } else if pair[0] > 0.0 && pair[1] < 0.0 {
            crossings.minus.push(i);
        }
    }

    crossings
}

/// Widen each run to the last plus crossing at or before its start and the
/// first minus crossing at or after its end
pub fn construct_peaks(runs: &[ThresholdRun], crossings: &ZeroCrossings) -> Vec<GsrPeak> {
    runs.iter()
        .map(|run| {
            let start = crossings
                .plus
                .iter()
                .copied()
                .take_while(|&c| c <= run.first)
                .last()
                .unwrap_or(run.first);
            let end = crossings
                .minus
                .iter()
                .copied()
                .find(|&c| c >= run.last)
                .unwrap_or(run.last);
            GsrPeak { start, end }
        })
        .collect()
}

/// Drop every peak identical to its successor
pub fn merge_duplicate_peaks(peaks: &[GsrPeak]) -> Vec<GsrPeak> {
    peaks
        .iter()
        .enumerate()
        .filter(|&(i, peak)| peaks.get(i + 1) != Some(peak))
        .map(|(_, &peak)| peak)
        .collect()
}

/// Magnitude, duration and amplitude of each peak measured on `signal`
pub fn peak_features(signal: &[f64], peaks: &[GsrPeak]) -> Vec<PeakFeatures> {
    peaks
        .iter()
        .filter(|peak| peak.start < signal.len())
        .map(|peak| {
            let onset = signal[peak.start];
            let end = peak.end.min(signal.len());
            let highest = signal[peak.start..end]
                .iter()
                .copied()
                .fold(onset, f64::max);
            let magnitude = highest - onset;
            let duration = peak.duration() as f64;

            PeakFeatures {
                magnitude,
                duration,
                amplitude: 0.5 * magnitude * duration,
            }
        })
        .collect()
}

pub fn sum_features(features: &[PeakFeatures]) -> PeakSummary {
    features.iter().fold(
        PeakSummary {
            count: features.len(),
            ..PeakSummary::default()
        },
        |mut summary, peak| {
            summary.magnitude += peak.magnitude;
            summary.duration += peak.duration;
            summary.amplitude += peak.amplitude;
            summary
        },
    )
}

/// Full segmentation pipeline for one EDA window
#[derive(Debug, Clone)]
pub struct PeakSegmenter {
    threshold: f64,
    sampling_rate: f64,
    lowpass: ButterworthFilter,
}

impl PeakSegmenter {
    pub fn new(
        threshold: f64,
        cutoff_freq: f64,
        filter_order: usize,
        sampling_rate: f64,
    ) -> AffectResult<Self> {
        Ok(PeakSegmenter {
            threshold,
            sampling_rate,
            lowpass: ButterworthFilter::lowpass(cutoff_freq, filter_order, sampling_rate)?,
        })
    }

    /// Responses found in the signal; the input is left untouched
    pub fn peaks<T: Copy + Into<f64>>(&self, signal: &[T]) -> (Vec<f64>, Vec<GsrPeak>) {
        let filtered = self.lowpass.apply(signal);
        let derivative = finite_difference(&filtered);

        let runs = find_above(&derivative, self.threshold, self.sampling_rate);
        let crossings = zero_crossings(&derivative);
        let peaks = merge_duplicate_peaks(&construct_peaks(&runs, &crossings));

        (filtered, peaks)
    }

    pub fn peak_features<T: Copy + Into<f64>>(&self, signal: &[T]) -> Vec<PeakFeatures> {
        let (filtered, peaks) = self.peaks(signal);
        peak_features(&filtered, &peaks)
    }

    pub fn summarize<T: Copy + Into<f64>>(&self, signal: &[T]) -> PeakSummary {
        sum_features(&self.peak_features(signal))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_above_requires_one_second() {
        let mut derivative = vec![0.0; 20];
        // 4-sample run at 4 Hz counts, 3-sample run does not
        for d in &mut derivative[2..6] {
            *d = 0.05;
        }
        for d in &mut derivative[10..13] {
            *d = 0.05;
        }

        let runs = find_above(&derivative, 0.02325, 4.0);
        assert_eq!(runs, vec![ThresholdRun { first: 2, last: 5 }]);
    }

    #[test]
    fn test_find_above_ignores_trailing_run() {
        let derivative = [0.0, 0.1, 0.1, 0.1, 0.1, 0.1];
        assert!(find_above(&derivative, 0.02, 4.0).is_empty());
    }

    #[test]
    fn test_zero_crossings() {
        let derivative = [-1.0, 1.0, 2.0, -0.5, 0.0, 1.0, -1.0];
        let crossings = zero_crossings(&derivative);
        assert_eq!(crossings.plus, vec![0]);
        assert_eq!(crossings.minus, vec![2, 5]);
    }

    #[test]
    fn test_construct_peaks_uses_nearest_crossings() {
        let runs = [ThresholdRun { first: 5, last: 9 }];
        let crossings = ZeroCrossings {
            plus: vec![1, 3, 7],
            minus: vec![4, 11, 15],
        };
        assert_eq!(
            construct_peaks(&runs, &crossings),
            vec![GsrPeak { start: 3, end: 11 }]
        );
    }

    #[test]
    fn test_construct_peaks_falls_back_to_run_bounds() {
        let runs = [ThresholdRun { first: 5, last: 9 }];
        let peaks = construct_peaks(&runs, &ZeroCrossings::default());
        assert_eq!(peaks, vec![GsrPeak { start: 5, end: 9 }]);
    }

    #[test]
    fn test_merge_removes_adjacent_duplicates() {
        let a = GsrPeak { start: 2, end: 10 };
        let b = GsrPeak { start: 12, end: 20 };
        let merged = merge_duplicate_peaks(&[a, a, b, b, b]);
        assert_eq!(merged, vec![a, b]);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let a = GsrPeak { start: 0, end: 4 };
        let b = GsrPeak { start: 3, end: 8 };
        let c = GsrPeak { start: 9, end: 12 };
        let once = merge_duplicate_peaks(&[a, a, b, c, c, a]);
        let twice = merge_duplicate_peaks(&once);
        assert_eq!(once, twice);
        assert_eq!(once, vec![a, b, c, a]);
    }

    #[test]
    fn test_peak_features_and_sum() {
        let signal = [1.0, 1.0, 1.5, 2.0, 1.8, 1.2, 1.0];
        let peaks = [GsrPeak { start: 1, end: 5 }, GsrPeak { start: 4, end: 6 }];
        let features = peak_features(&signal, &peaks);

        assert!((features[0].magnitude - 1.0).abs() < 1e-12);
        assert_eq!(features[0].duration, 4.0);
        assert!((features[0].amplitude - 2.0).abs() < 1e-12);
        assert_eq!(features[1].magnitude, 0.0);

        let summary = sum_features(&features);
        assert_eq!(summary.count, 2);
        assert_eq!(summary.duration, 6.0);
        assert!((summary.amplitude - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_segmenter_detects_rising_response() {
        // 4 Hz EDA: flat, a 2 s rise, then a slow decay
        let mut signal = vec![1.0; 8];
        signal.extend((1..=8).map(|i| 1.0 + 0.1 * i as f64));
        signal.extend((1..=8).map(|i| 1.8 - 0.02 * i as f64));
        signal.extend(vec![1.64; 4]);

        let segmenter = PeakSegmenter::new(0.02325, 5.0, 4, 4.0).unwrap();
        let summary = segmenter.summarize(&signal);

        // Derivative run 7..=14 closes at the minus crossing 14, so the
        // range covers samples 7..14
        assert_eq!(summary.count, 1);
        assert_eq!(summary.duration, 7.0);
        assert!((summary.magnitude - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_segmenter_flat_signal_has_no_peaks() {
        let segmenter = PeakSegmenter::new(0.02325, 5.0, 4, 4.0).unwrap();
        assert_eq!(segmenter.summarize(&[0.4f64; 20]), PeakSummary::default());
        assert_eq!(segmenter.summarize::<f64>(&[]), PeakSummary::default());
    }
}
