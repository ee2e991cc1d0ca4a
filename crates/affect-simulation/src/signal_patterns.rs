//! Arousal patterns and physiological waveform shapes for simulation

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Arousal level over time, in `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ArousalPattern {
    /// Constant arousal level
    Constant { level: f64 },
    /// Slow oscillation around a baseline
    Sinusoidal {
        frequency: f64,
        amplitude: f64,
        baseline: f64,
    },
    /// Linear change over a duration, then hold
    Ramp {
        start_level: f64,
        end_level: f64,
        duration: f64,
    },
    /// Alternating stressor and rest periods
    Stressor {
        on_duration: f64,
        off_duration: f64,
        level: f64,
    },
}

impl ArousalPattern {
    /// Arousal at `time` seconds, clamped to `[0, 1]`
    pub fn arousal_at_time(&self, time: f64) -> f64 {
        let level = match *self {
            ArousalPattern::Constant { level } => level,

            ArousalPattern::Sinusoidal {
                frequency,
                amplitude,
                baseline,
            } => baseline + amplitude * (2.0 * PI * frequency * time).sin(),

            ArousalPattern::Ramp {
                start_level,
                end_level,
                duration,
            } => {
                if time >= duration {
                    end_level
                } else {
                    start_level + (end_level - start_level) * (time / duration)
                }
            }

            ArousalPattern::Stressor {
                on_duration,
                off_duration,
                level,
            } => {
                let phase = time % (on_duration + off_duration);
                if phase < on_duration {
                    level
                } else {
                    0.0
                }
            }
        };

        level.clamp(0.0, 1.0)
    }

    pub fn description(&self) -> &'static str {
        match self {
            ArousalPattern::Constant { .. } => "Constant arousal",
            ArousalPattern::Sinusoidal { .. } => "Oscillating arousal",
            ArousalPattern::Ramp { .. } => "Gradual ramp",
            ArousalPattern::Stressor { .. } => "Stressor blocks",
        }
    }

    /// Common presets
    pub fn presets() -> Vec<(&'static str, ArousalPattern)> {
        vec![
            ("Baseline", ArousalPattern::Constant { level: 0.1 }),
            ("Amusement", ArousalPattern::Sinusoidal {
                frequency: 0.02, amplitude: 0.2, baseline: 0.35
            }),
            ("Stress Onset", ArousalPattern::Ramp {
                start_level: 0.1, end_level: 0.9, duration: 60.0
            }),
            ("Public Speaking", ArousalPattern::Stressor {
                on_duration: 30.0, off_duration: 15.0, level: 0.85
            }),
        ]
    }
}

impl Default for ArousalPattern {
    fn default() -> Self {
        ArousalPattern::Constant { level: 0.2 }
    }
}

/// Normalised pulse wave over one cardiac cycle, `phase` in `[0, 1)`
///
/// Raised-cosine systolic upstroke followed by an exponential diastolic
/// run-off with a small dicrotic bump.
pub fn pulse_shape(phase: f64) -> f64 {
    const UPSTROKE: f64 = 0.12;

    if phase < UPSTROKE {
        0.5 * (1.0 - (PI * phase / UPSTROKE).cos())
    } else {
        let fall = phase - UPSTROKE;
        let dicrotic = 0.08 * (-((fall - 0.25) / 0.05).powi(2)).exp();
        (-fall * 5.0).exp() + dicrotic
    }
}

/// Skin conductance response `elapsed` seconds after onset
///
/// Difference of exponentials: rises over about two seconds and recovers
/// over several more. Peaks near 1.0 at t = 2 s.
pub fn scr_shape(elapsed: f64) -> f64 {
    const RISE: f64 = 1.0;
    const RECOVERY: f64 = 5.0;
    // 1 / max of exp(-t/R) - exp(-t/r) for the constants above
    const NORM: f64 = 1.869;

    if elapsed < 0.0 {
        return 0.0;
    }
    NORM * ((-elapsed / RECOVERY).exp() - (-elapsed / RISE).exp())
}
