//! Per-channel feature blocks
//!
//! Each block maps one channel slice to a fixed number of features. Empty
//! input yields a block of zeros so the window vector keeps its length.

use crate::beats::{find_local_maxima, BeatDetector};
use crate::config::ExtractionConfig;
use crate::detrend::TarvainenDetrender;
use crate::healey::PeakSegmenter;
use crate::spectral::{self, SpectralAnalyzer};
use crate::statistics::{self, SignalSummary};
use affect_core::{
    AffectResult, Channel, ACC_BLOCK_LEN, EDA_BLOCK_LEN, PPG_BLOCK_LEN, TEMPERATURE_BLOCK_LEN,
};
use serde::{Deserialize, Serialize};

/// Feature block computed for a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlockKind {
    /// Mean, std, |integral|, peak frequency of one second
    Accelerometer,
    /// HRV time and frequency domain
    Ppg,
    /// Tonic/phasic statistics and Healey responses
    Eda,
    /// Descriptive statistics
    Temperature,
}

impl BlockKind {
    /// Block computed from a channel, `None` for event-driven channels
    pub fn for_channel(channel: Channel) -> Option<Self> {
        match channel {
            Channel::Acc3D | Channel::AccX | Channel::AccY | Channel::AccZ => {
                Some(BlockKind::Accelerometer)
            }
            Channel::Bvp => Some(BlockKind::Ppg),
            Channel::Eda => Some(BlockKind::Eda),
            Channel::Temperature => Some(BlockKind::Temperature),
            _ => None,
        }
    }

    /// Fixed number of features in the block
    pub fn len(&self) -> usize {
        match self {
            BlockKind::Accelerometer => ACC_BLOCK_LEN,
            BlockKind::Ppg => PPG_BLOCK_LEN,
            BlockKind::Eda => EDA_BLOCK_LEN,
            BlockKind::Temperature => TEMPERATURE_BLOCK_LEN,
        }
    }

    /// Fallback block for missing data
    pub fn zeros(&self) -> Vec<f64> {
        vec![0.0; self.len()]
    }
}

/// Computes channel blocks with reusable state (FFT plans, detrending filters)
pub struct FeatureExtractor {
    config: ExtractionConfig,
    spectral: SpectralAnalyzer,
    detrender: TarvainenDetrender,
    segmenter: PeakSegmenter,
    beat_detector: BeatDetector,
}

impl FeatureExtractor {
    pub fn new(config: ExtractionConfig) -> AffectResult<Self> {
        config.validate()?;

        let detrender = TarvainenDetrender::with_coefficients(
            config.eda.tarvainen_lambda,
            config.eda.tarvainen_coefficients,
        );
        let segmenter = PeakSegmenter::new(
            config.eda.healey_threshold,
            config.eda.lowpass_cutoff,
            config.eda.lowpass_order,
            config.sampling_rates.eda,
        )?;
        let beat_detector = BeatDetector::new(
            config.ppg.beat_threshold,
            config.ppg.beat_min_samples,
            config.sampling_rates.bvp,
        );

        Ok(FeatureExtractor {
            config,
            spectral: SpectralAnalyzer::new(),
            detrender,
            segmenter,
            beat_detector,
        })
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Dispatch a channel slice to its block
    pub fn block(&mut self, kind: BlockKind, signal: &[f64]) -> AffectResult<Vec<f64>> {
        match kind {
            BlockKind::Accelerometer => self.accelerometer_features(signal),
            BlockKind::Ppg => self.ppg_features(signal),
            BlockKind::Eda => self.eda_features(signal),
            BlockKind::Temperature => self.temperature_features(signal),
        }
    }

    /// Block for one second of a single accelerometer stream
    pub fn accelerometer_features(&mut self, signal: &[f64]) -> AffectResult<Vec<f64>> {
        if signal.is_empty() {
            return Ok(BlockKind::Accelerometer.zeros());
        }

        Ok(vec![
            statistics::mean(signal)?,
            statistics::std_dev(signal)?,
            statistics::absolute(statistics::integral(signal)?),
            self.spectral
                .peak_frequency(signal, self.config.sampling_rates.acc)?,
        ])
    }

    pub fn ppg_features(&mut self, signal: &[f64]) -> AffectResult<Vec<f64>> {
        if signal.is_empty() {
            return Ok(BlockKind::Ppg.zeros());
        }

        let heart = self.beat_detector.analyze(signal);

        let ppg = &self.config.ppg;
        let mut bands = spectral::band_signals(
            signal,
            &ppg.bands,
            self.config.sampling_rates.bvp,
            ppg.bandpass_order,
        )?;
        let sums = spectral::band_energy_sums(&bands);
        let powers = spectral::relative_powers(&bands, ppg.resolution, ppg.epsilon);

        spectral::normalize(&mut bands[1]);
        spectral::normalize(&mut bands[2]);

        let mut features = vec![
            heart.hr_mean(),
            heart.hr_std(),
            heart.rr_mean(),
            heart.rr_std(),
            heart.nn50 as f64,
            heart.pnn50,
            heart.rr_rms(),
            statistics::ratio(sums[1], sums[2]),
        ];
        features.extend_from_slice(&sums);
        features.extend_from_slice(&powers);
        features.push(statistics::mean(&bands[1])?);
        features.push(statistics::mean(&bands[2])?);

        Ok(features)
    }

    pub fn eda_features(&mut self, signal: &[f64]) -> AffectResult<Vec<f64>> {
        if signal.is_empty() {
            return Ok(BlockKind::Eda.zeros());
        }

        let summary = SignalSummary::calculate(signal)?;
        let parts = self.detrender.decompose(signal)?;
        let (scr, scl) = (&parts.phasic, &parts.tonic);

        let scr_mean = statistics::mean(scr)?;
        let scr_maxima = find_local_maxima(
            scr,
            scr_mean,
            self.config.eda.scr_maxima_min_samples,
        );
        let responses = self.segmenter.summarize(signal);

        Ok(vec![
            summary.mean,
            summary.std_dev,
            summary.min,
            summary.max,
            summary.slope,
            summary.dynamic_range,
            statistics::mean(scl)?,
            statistics::std_dev(scl)?,
            statistics::std_dev(scr)?,
            statistics::correlation(scl)?,
            scr_maxima.len() as f64,
            responses.magnitude,
            responses.duration,
            responses.amplitude,
            statistics::slope(scr)?,
        ])
    }

    pub fn temperature_features(&mut self, signal: &[f64]) -> AffectResult<Vec<f64>> {
        if signal.is_empty() {
            return Ok(BlockKind::Temperature.zeros());
        }

        let summary = SignalSummary::calculate(signal)?;
        Ok(vec![
            summary.mean,
            summary.std_dev,
            summary.min,
            summary.max,
            summary.dynamic_range,
            summary.slope,
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use affect_core::AffectError;
    use std::f64::consts::PI;

    fn extractor() -> FeatureExtractor {
        FeatureExtractor::new(ExtractionConfig::wesad()).unwrap()
    }

    fn pulse_wave(seconds: usize) -> Vec<f64> {
        // 80 bpm at 64 Hz: 8-sample systolic upstroke, then exponential decay
        (0..seconds * 64)
            .map(|i| {
                let k = i % 48;
                if k < 8 {
                    7.5 * k as f64
                } else {
                    60.0 * (-((k - 8) as f64) / 10.0).exp()
                }
            })
            .collect()
    }

    #[test]
    fn test_empty_blocks_are_zero_vectors() {
        let mut extractor = extractor();
        assert_eq!(extractor.eda_features(&[]).unwrap(), vec![0.0; 15]);
        assert_eq!(extractor.accelerometer_features(&[]).unwrap(), vec![0.0; 4]);
        assert_eq!(extractor.temperature_features(&[]).unwrap(), vec![0.0; 6]);
        assert_eq!(extractor.ppg_features(&[]).unwrap(), vec![0.0; 18]);
    }

    #[test]
    fn test_block_lengths() {
        let mut extractor = extractor();
        let eda: Vec<f64> = (0..20).map(|i| 0.4 + 0.01 * i as f64).collect();
        let acc: Vec<f64> = (0..32).map(|i| (2.0 * PI * i as f64 / 8.0).sin()).collect();

        assert_eq!(extractor.block(BlockKind::Eda, &eda).unwrap().len(), 15);
        assert_eq!(extractor.block(BlockKind::Accelerometer, &acc).unwrap().len(), 4);
        assert_eq!(extractor.block(BlockKind::Temperature, &[33.1, 33.2]).unwrap().len(), 6);
        assert_eq!(extractor.block(BlockKind::Ppg, &pulse_wave(5)).unwrap().len(), 18);
    }

    #[test]
    fn test_accelerometer_block_values() {
        let mut extractor = extractor();
        let acc: Vec<f64> = (0..32).map(|i| (2.0 * PI * 4.0 * i as f64 / 32.0).sin()).collect();
        let block = extractor.accelerometer_features(&acc).unwrap();

        assert!(block[0].abs() < 1e-12);
        assert!((block[1] - 0.5f64.sqrt()).abs() < 1e-9);
        assert!(block[2] >= 0.0);
        assert!((block[3] - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_temperature_block_order() {
        let mut extractor = extractor();
        let block = extractor.temperature_features(&[32.0, 32.5, 33.0, 33.5]).unwrap();
        assert_eq!(block[2], 32.0);
        assert_eq!(block[3], 33.5);
        assert!((block[4] - 33.5 / 32.0).abs() < 1e-12);
        assert!((block[5] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_ppg_block_heart_rate() {
        let mut extractor = extractor();
        let block = extractor.ppg_features(&pulse_wave(5)).unwrap();

        assert!((block[0] - 80.0).abs() < 1e-9);
        assert_eq!(block[1], 0.0);
        assert_eq!(block[2], 48.0);
        assert_eq!(block[4], 0.0);
        assert!(block.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_eda_block_counts_responses() {
        let mut extractor = extractor();
        // Baseline with one 2 s conductance rise
        let mut eda = vec![0.40; 6];
        eda.extend((1..=8).map(|i| 0.40 + 0.05 * i as f64));
        eda.extend(vec![0.80; 6]);

        let block = extractor.eda_features(&eda).unwrap();
        assert_eq!(block.len(), 15);
        assert!((block[0] - statistics::mean(&eda).unwrap()).abs() < 1e-12);
        assert!(block[11] > 0.0, "summed response magnitude");
        assert!(block[12] >= 4.0, "summed response duration");
    }

    fn assert_slots(block: &[f64], expected: &[f64]) {
        assert_eq!(block.len(), expected.len());
        for (slot, (got, want)) in block.iter().zip(expected).enumerate() {
            assert!(
                (got - want).abs() <= 1e-12 * want.abs().max(1.0),
                "slot {slot}: got {got}, want {want}"
            );
        }
    }

    #[test]
    fn test_ppg_block_layout() {
        let config = ExtractionConfig::wesad();
        let ppg = &config.ppg;
        let signal: Vec<f64> = pulse_wave(5)
            .iter()
            .enumerate()
            .map(|(i, v)| v + 5.0 * (2.0 * PI * 0.2 * i as f64 / 64.0).sin())
            .collect();

        let block = extractor().ppg_features(&signal).unwrap();

        let heart = BeatDetector::new(ppg.beat_threshold, ppg.beat_min_samples, 64.0)
            .analyze(&signal);
        let mut bands =
            spectral::band_signals(&signal, &ppg.bands, 64.0, ppg.bandpass_order).unwrap();
        let sums = spectral::band_energy_sums(&bands);
        let powers = spectral::relative_powers(&bands, ppg.resolution, ppg.epsilon);
        spectral::normalize(&mut bands[1]);
        spectral::normalize(&mut bands[2]);

        let mut expected = vec![
            heart.hr_mean(),
            heart.hr_std(),
            heart.rr_mean(),
            heart.rr_std(),
            heart.nn50 as f64,
            heart.pnn50,
            heart.rr_rms(),
            statistics::ratio(sums[1], sums[2]),
        ];
        expected.extend_from_slice(&sums);
        expected.extend_from_slice(&powers);
        expected.push(statistics::mean(&bands[1]).unwrap());
        expected.push(statistics::mean(&bands[2]).unwrap());
        assert_slots(&block, &expected);

        // Energy sums come from the raw bands, not the unit-norm ones
        let unit_energy: f64 = bands[1].iter().map(|x| x * x).sum();
        assert!((unit_energy - 1.0).abs() < 1e-9);
        assert!((block[9] - 1.0).abs() > 1e-9);
    }

    #[test]
    fn test_eda_block_layout() {
        let config = ExtractionConfig::wesad();
        let eda_params = &config.eda;
        let mut eda = vec![0.40; 6];
        eda.extend((1..=8).map(|i| 0.40 + 0.05 * i as f64));
        eda.extend((0..10).map(|i| 0.80 - 0.02 * i as f64));

        let block = extractor().eda_features(&eda).unwrap();

        let summary = SignalSummary::calculate(&eda).unwrap();
        let parts = TarvainenDetrender::with_coefficients(
            eda_params.tarvainen_lambda,
            eda_params.tarvainen_coefficients,
        )
        .decompose(&eda)
        .unwrap();
        let (scr, scl) = (&parts.phasic, &parts.tonic);
        let scr_mean = statistics::mean(scr).unwrap();
        let maxima = find_local_maxima(scr, scr_mean, eda_params.scr_maxima_min_samples);
        let responses = PeakSegmenter::new(
            eda_params.healey_threshold,
            eda_params.lowpass_cutoff,
            eda_params.lowpass_order,
            4.0,
        )
        .unwrap()
        .summarize(&eda);

        let expected = vec![
            summary.mean,
            summary.std_dev,
            summary.min,
            summary.max,
            summary.slope,
            summary.dynamic_range,
            statistics::mean(scl).unwrap(),
            statistics::std_dev(scl).unwrap(),
            statistics::std_dev(scr).unwrap(),
            statistics::correlation(scl).unwrap(),
            maxima.len() as f64,
            responses.magnitude,
            responses.duration,
            responses.amplitude,
            statistics::slope(scr).unwrap(),
        ];
        assert_slots(&block, &expected);

        // Tonic and phasic parts add back up to the signal
        assert!((block[6] + scr_mean - block[0]).abs() < 1e-9);
        assert!((-1.0..=1.0).contains(&block[9]));
        assert!(responses.count > 0);
    }

    #[test]
    fn test_eda_too_short_to_detrend() {
        let mut extractor = extractor();
        assert!(matches!(
            extractor.eda_features(&[0.4, 0.41]),
            Err(AffectError::DetrendFailure { .. })
        ));
    }

    #[test]
    fn test_strategy_table() {
        assert_eq!(BlockKind::for_channel(Channel::AccY), Some(BlockKind::Accelerometer));
        assert_eq!(BlockKind::for_channel(Channel::Eda).map(|k| k.len()), Some(15));
        assert_eq!(BlockKind::for_channel(Channel::Ibi), None);
        assert_eq!(BlockKind::Ppg.zeros().len(), 18);
    }
}
