//! Wrist-worn biosensor simulator producing E4-like channel streams

use crate::signal_patterns::{pulse_shape, scr_shape, ArousalPattern};
use affect_core::{
    config_error, AffectError, AffectResult, Channel, SessionBuffers, WindowSnapshot,
};
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::ops::Range;

/// Phasic responses older than this no longer contribute to EDA
const SCR_MEMORY: f64 = 30.0;

/// Configuration for wearable simulation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WearableConfig {
    /// Resting heart rate in beats per minute
    pub heart_rate_bpm: f64,
    /// Extra beats per minute at full arousal
    pub arousal_heart_rate_gain: f64,
    /// Peak-to-trough BVP amplitude
    pub bvp_amplitude: f64,
    pub eda: EdaModel,
    pub temperature: TemperatureModel,
    /// Arousal over time, drives every channel
    pub pattern: ArousalPattern,
    pub noise: NoiseConfig,
    /// Random seed for reproducibility
    pub seed: Option<u64>,
}

/// Skin conductance model (microsiemens)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EdaModel {
    pub tonic_level: f64,
    /// Tonic change per minute
    pub tonic_drift: f64,
    /// Tonic rise at full arousal
    pub arousal_gain: f64,
    /// Expected phasic responses per second at full arousal
    pub response_rate: f64,
    pub response_amplitude: f64,
}

/// Skin temperature model (degrees Celsius)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TemperatureModel {
    pub baseline: f64,
    /// Peripheral cooling at full arousal
    pub arousal_drop: f64,
    /// Amplitude of the slow thermoregulatory oscillation
    pub drift_amplitude: f64,
}

/// Per-channel Gaussian noise standard deviations
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoiseConfig {
    pub acc_std: f64,
    pub bvp_std: f64,
    pub eda_std: f64,
    pub temperature_std: f64,
}

impl NoiseConfig {
    /// Noise-free signals
    pub fn none() -> Self {
        NoiseConfig {
            acc_std: 0.0,
            bvp_std: 0.0,
            eda_std: 0.0,
            temperature_std: 0.0,
        }
    }
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            acc_std: 0.01,
            bvp_std: 1.0,
            eda_std: 0.002,
            temperature_std: 0.005,
        }
    }
}

impl Default for WearableConfig {
    fn default() -> Self {
        Self {
            heart_rate_bpm: 72.0,
            arousal_heart_rate_gain: 30.0,
            bvp_amplitude: 60.0,
            eda: EdaModel {
                tonic_level: 0.4,
                tonic_drift: 0.01,
                arousal_gain: 0.3,
                response_rate: 0.15,
                response_amplitude: 0.5,
            },
            temperature: TemperatureModel {
                baseline: 33.0,
                arousal_drop: 0.4,
                drift_amplitude: 0.05,
            },
            pattern: ArousalPattern::default(),
            noise: NoiseConfig::default(),
            seed: None,
        }
    }
}

impl WearableConfig {
    pub fn validate(&self) -> AffectResult<()> {
        if !(self.heart_rate_bpm > 0.0) || !self.heart_rate_bpm.is_finite() {
            return Err(config_error!(
                "heart rate must be positive, got {} bpm",
                self.heart_rate_bpm
            ));
        }
        if !(self.arousal_heart_rate_gain >= 0.0) {
            return Err(config_error!("heart rate gain must not be negative"));
        }
        if !(self.eda.response_rate >= 0.0) {
            return Err(config_error!(
                "SCR rate must not be negative, got {}",
                self.eda.response_rate
            ));
        }
        Ok(())
    }
}

/// Per-channel noise distributions
struct NoiseSources {
    acc: Normal<f64>,
    bvp: Normal<f64>,
    eda: Normal<f64>,
    temperature: Normal<f64>,
}

impl NoiseSources {
    fn new(config: &NoiseConfig) -> AffectResult<Self> {
        let normal = |name: &str, std: f64| {
            Normal::new(0.0, std).map_err(|e| AffectError::Simulation {
                message: format!("Failed to create {} noise distribution: {}", name, e),
            })
        };

        Ok(NoiseSources {
            acc: normal("accelerometer", config.acc_std)?,
            bvp: normal("BVP", config.bvp_std)?,
            eda: normal("EDA", config.eda_std)?,
            temperature: normal("temperature", config.temperature_std)?,
        })
    }
}

/// Wearable session simulator
pub struct WearableSimulator {
    config: WearableConfig,
    rng: rand::rngs::StdRng,
    noise: NoiseSources,
    /// Seconds of signal generated so far
    time_offset: f64,
    /// Position within the current cardiac cycle
    beat_phase: f64,
    /// Onset times and amplitudes of active phasic responses
    responses: Vec<(f64, f64)>,
}

impl WearableSimulator {
    pub fn new(config: WearableConfig) -> AffectResult<Self> {
        config.validate()?;

        let seed = config.seed.unwrap_or_else(|| {
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0)
        });

        Ok(WearableSimulator {
            noise: NoiseSources::new(&config.noise)?,
            rng: rand::rngs::StdRng::seed_from_u64(seed),
            config,
            time_offset: 0.0,
            beat_phase: 0.0,
            responses: Vec::new(),
        })
    }

    pub fn config(&self) -> &WearableConfig {
        &self.config
    }

    /// Replace the configuration, keeping the random stream and clock
    pub fn update_config(&mut self, config: WearableConfig) -> AffectResult<()> {
        config.validate()?;
        self.noise = NoiseSources::new(&config.noise)?;
        self.config = config;
        Ok(())
    }

    pub fn set_pattern(&mut self, pattern: ArousalPattern) {
        self.config.pattern = pattern;
    }

    /// Simulated seconds generated so far
    pub fn time(&self) -> f64 {
        self.time_offset
    }

    pub fn current_arousal(&self) -> f64 {
        self.config.pattern.arousal_at_time(self.time_offset)
    }

    /// Restart the simulated clock
    pub fn reset_time(&mut self) {
        self.time_offset = 0.0;
        self.beat_phase = 0.0;
        self.responses.clear();
    }

    /// Append `duration` seconds of every periodic channel to a session
    ///
    /// Sample times are `k / rate`, so consecutive chunks join without gaps
    /// or duplicates.
    pub fn fill(&mut self, session: &mut SessionBuffers, duration: f64) -> AffectResult<()> {
        if !(duration >= 0.0) || !duration.is_finite() {
            return Err(AffectError::Simulation {
                message: format!("duration must be a finite non-negative number, got {}", duration),
            });
        }

        let start = self.time_offset;
        let end = start + duration;

        self.push_acceleration(session, start, end);
        self.push_bvp(session, start, end)?;
        self.push_eda(session, start, end)?;
        self.push_temperature(session, start, end)?;

        self.time_offset = end;
        Ok(())
    }

    /// A complete recording of `duration` seconds in a fresh session
    pub fn recording(&mut self, duration: f64) -> AffectResult<WindowSnapshot> {
        let mut session = SessionBuffers::new();
        self.fill(&mut session, duration)?;
        Ok(session.grab_window())
    }

    fn push_acceleration(&mut self, session: &mut SessionBuffers, start: f64, end: f64) {
        let rate = rate_of(Channel::AccX);
        for k in sample_range(rate, start, end) {
            let t = k as f64 / rate;
            let arousal = self.config.pattern.arousal_at_time(t);
            // Restless hand movement grows with arousal
            let amplitude = 0.05 + 0.4 * arousal;

            let x = amplitude * (2.0 * PI * 1.8 * t).sin() + self.noise.acc.sample(&mut self.rng);
            let y = 0.6 * amplitude * (2.0 * PI * 0.9 * t + 1.0).sin()
                + self.noise.acc.sample(&mut self.rng);
            let z = 1.0
                + 0.3 * amplitude * (2.0 * PI * 1.8 * t).cos()
                + self.noise.acc.sample(&mut self.rng);

            session.push_acceleration(x, y, z, t);
        }
    }

    fn push_bvp(&mut self, session: &mut SessionBuffers, start: f64, end: f64) -> AffectResult<()> {
        let rate = rate_of(Channel::Bvp);
        for k in sample_range(rate, start, end) {
            let t = k as f64 / rate;
            let arousal = self.config.pattern.arousal_at_time(t);
            let bpm = self.config.heart_rate_bpm + self.config.arousal_heart_rate_gain * arousal;

            let value = self.config.bvp_amplitude * pulse_shape(self.beat_phase)
                + self.noise.bvp.sample(&mut self.rng);
            session.push(Channel::Bvp, value, t)?;

            self.beat_phase = (self.beat_phase + bpm / 60.0 / rate).fract();
        }
        Ok(())
    }

    fn push_eda(&mut self, session: &mut SessionBuffers, start: f64, end: f64) -> AffectResult<()> {
        let rate = rate_of(Channel::Eda);
        let model = self.config.eda;

        for k in sample_range(rate, start, end) {
            let t = k as f64 / rate;
            let arousal = self.config.pattern.arousal_at_time(t);

            if self.rng.gen::<f64>() < model.response_rate * arousal / rate {
                let amplitude = model.response_amplitude * (0.5 + self.rng.gen::<f64>());
                self.responses.push((t, amplitude));
            }
            self.responses.retain(|&(onset, _)| t - onset < SCR_MEMORY);

            let phasic: f64 = self
                .responses
                .iter()
                .map(|&(onset, amplitude)| amplitude * scr_shape(t - onset))
                .sum();
            let tonic =
                model.tonic_level + model.tonic_drift * t / 60.0 + model.arousal_gain * arousal;

            let value = (tonic + phasic + self.noise.eda.sample(&mut self.rng)).max(0.0);
            session.push(Channel::Eda, value, t)?;
        }
        Ok(())
    }

    fn push_temperature(
        &mut self,
        session: &mut SessionBuffers,
        start: f64,
        end: f64,
    ) -> AffectResult<()> {
        let rate = rate_of(Channel::Temperature);
        let model = self.config.temperature;

        for k in sample_range(rate, start, end) {
            let t = k as f64 / rate;
            let arousal = self.config.pattern.arousal_at_time(t);

            let value = model.baseline - model.arousal_drop * arousal
                + model.drift_amplitude * (2.0 * PI * t / 300.0).sin()
                + self.noise.temperature.sample(&mut self.rng);
            session.push(Channel::Temperature, value, t)?;
        }
        Ok(())
    }
}

fn rate_of(channel: Channel) -> f64 {
    channel.native_rate().unwrap_or(1.0)
}

/// Sample indices `k` with `start <= k / rate < end`
fn sample_range(rate: f64, start: f64, end: f64) -> Range<u64> {
    let first = (start * rate - 1e-9).ceil().max(0.0) as u64;
    let last = (end * rate - 1e-9).ceil().max(0.0) as u64;
    first..last
}

#[cfg(test)]
mod tests {
    use super::*;
    use affect_processing::{ExtractionConfig, FeatureExtractor, PeakSegmenter, WindowAssembler};

    fn seeded(seed: u64) -> WearableConfig {
        WearableConfig {
            seed: Some(seed),
            ..Default::default()
        }
    }

    #[test]
    fn test_native_rates() {
        let mut sim = WearableSimulator::new(seeded(1)).unwrap();
        let recording = sim.recording(5.0).unwrap();

        assert_eq!(recording.len(Channel::Acc3D), 480);
        assert_eq!(recording.len(Channel::AccX), 160);
        assert_eq!(recording.len(Channel::AccZ), 160);
        assert_eq!(recording.len(Channel::Bvp), 320);
        assert_eq!(recording.len(Channel::Eda), 20);
        assert_eq!(recording.len(Channel::Temperature), 20);
        assert_eq!(recording.len(Channel::Ibi), 0);
        assert_eq!(sim.time(), 5.0);
    }

    #[test]
    fn test_deterministic_with_seed() {
        let first = WearableSimulator::new(seeded(42)).unwrap().recording(10.0).unwrap();
        let second = WearableSimulator::new(seeded(42)).unwrap().recording(10.0).unwrap();

        for channel in Channel::ALL {
            assert_eq!(first.readings(channel), second.readings(channel));
        }

        let other = WearableSimulator::new(seeded(43)).unwrap().recording(10.0).unwrap();
        assert_ne!(first.readings(Channel::Bvp), other.readings(Channel::Bvp));
    }

    #[test]
    fn test_chunks_join_without_gaps() {
        let mut sim = WearableSimulator::new(seeded(3)).unwrap();
        let mut session = SessionBuffers::new();
        for _ in 0..20 {
            sim.fill(&mut session, 0.25).unwrap();
        }

        assert_eq!(session.len(Channel::Bvp), 320);
        assert_eq!(session.len(Channel::Eda), 20);
        assert_eq!(session.len(Channel::AccY), 160);
        assert!(session.acceleration_consistent());

        let snapshot = session.grab_window();
        let times = snapshot.buffer(Channel::Eda).unwrap().timestamps();
        assert!(times.windows(2).all(|pair| (pair[1] - pair[0] - 0.25).abs() < 1e-9));
    }

    #[test]
    fn test_heart_rate_is_recovered() {
        let config = WearableConfig {
            heart_rate_bpm: 72.0,
            pattern: ArousalPattern::Constant { level: 0.0 },
            noise: NoiseConfig::none(),
            seed: Some(5),
            ..Default::default()
        };
        let mut sim = WearableSimulator::new(config).unwrap();
        let recording = sim.recording(5.0).unwrap();

        let mut extractor = FeatureExtractor::new(ExtractionConfig::wesad()).unwrap();
        let block = extractor.ppg_features(recording.readings(Channel::Bvp)).unwrap();
        assert!((block[0] - 72.0).abs() < 3.0, "hr mean {}", block[0]);
    }

    #[test]
    fn test_arousal_raises_conductance() {
        let calm = WearableConfig {
            pattern: ArousalPattern::Constant { level: 0.0 },
            ..seeded(9)
        };
        let stressed = WearableConfig {
            pattern: ArousalPattern::Constant { level: 1.0 },
            ..seeded(9)
        };

        let mean_eda = |config| {
            let recording = WearableSimulator::new(config).unwrap().recording(20.0).unwrap();
            let eda = recording.readings(Channel::Eda);
            eda.iter().sum::<f64>() / eda.len() as f64
        };
        assert!(mean_eda(stressed) > mean_eda(calm) + 0.2);
    }

    #[test]
    fn test_responses_pass_healey_criterion() {
        let config = WearableConfig {
            pattern: ArousalPattern::Constant { level: 1.0 },
            noise: NoiseConfig::none(),
            seed: Some(5),
            ..Default::default()
        };
        let recording = WearableSimulator::new(config).unwrap().recording(60.0).unwrap();

        let eda = ExtractionConfig::wesad().eda;
        let segmenter =
            PeakSegmenter::new(eda.healey_threshold, eda.lowpass_cutoff, eda.lowpass_order, 4.0)
                .unwrap();
        let (_, peaks) = segmenter.peaks(recording.readings(Channel::Eda));
        assert!(!peaks.is_empty());

        // Some window of the recording reports a summed response magnitude
        let mut assembler = WindowAssembler::new(ExtractionConfig::wesad()).unwrap();
        let vectors = assembler.batch(&recording).unwrap();
        let magnitude_slot = assembler.vector_len() - 10;
        assert!(vectors.iter().any(|v| v.values()[magnitude_slot] > 0.0));
    }

    #[test]
    fn test_invalid_config() {
        let config = WearableConfig {
            heart_rate_bpm: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            WearableSimulator::new(config),
            Err(AffectError::Configuration { .. })
        ));

        let mut config = WearableConfig::default();
        config.noise.bvp_std = -1.0;
        assert!(matches!(
            WearableSimulator::new(config),
            Err(AffectError::Simulation { .. })
        ));

        let mut sim = WearableSimulator::new(seeded(1)).unwrap();
        assert!(sim.fill(&mut SessionBuffers::new(), f64::NAN).is_err());
    }

    #[test]
    fn test_reset_time() {
        let mut sim = WearableSimulator::new(seeded(1)).unwrap();
        sim.recording(3.0).unwrap();
        sim.reset_time();
        assert_eq!(sim.time(), 0.0);
    }
}
