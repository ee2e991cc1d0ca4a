//! Physical stillness index (PSI)
//!
//! Sliding-window RMS of acceleration, summarised by its average and maximum.
//!
//! Reference: Chang et al., "A wireless accelerometer-based body posture
//! stability detection system and its application for meditation
//! practitioners", Sensors 12(12), 2012.

use affect_core::{AffectError, AffectResult};
use serde::{Deserialize, Serialize};

/// Default half-width of the RMS window
pub const DEFAULT_WINDOW_WIDTH: usize = 8;

/// How the sliding RMS is evaluated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StillnessMode {
    /// Matches the historical output: bias is kept and each window only
    /// contributes its term at offset `w - 1`
    Parity,
    /// Removes the mean and accumulates all `2w + 1` terms of each window
    Corrected,
}

/// PSI of one acceleration stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StillnessIndex {
    /// RMS value per window centre, indices `w..len-w`
    pub rms: Vec<f64>,
    pub average: f64,
    pub max: f64,
}

/// PSI over several axes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StillnessVector {
    pub per_axis: Vec<StillnessIndex>,
    /// Mean of the per-axis averages
    pub average: f64,
    /// Mean of the per-axis maxima
    pub max: f64,
}

pub fn physical_stillness_index(
    accelerations: &[f64],
    window_width: usize,
    mode: StillnessMode,
) -> AffectResult<StillnessIndex> {
    let n = accelerations.len();
    if n <= 2 * window_width {
        return Err(AffectError::EmptyInput {
            operation: "physical_stillness_index",
        });
    }

    let scale = 1.0 / (2.0 * window_width as f64 + 1.0);
    let w = window_width;

    let rms: Vec<f64> = match mode {
        StillnessMode::Parity => (w..n - w)
            .map(|i| {
                let last = accelerations[(i + w).saturating_sub(1)];
                (scale * last * last).sqrt()
            })
            .collect(),
        StillnessMode::Corrected => {
            let mean = accelerations.iter().sum::<f64>() / n as f64;
            let centred: Vec<f64> = accelerations.iter().map(|a| a - mean).collect();
            (w..n - w)
                .map(|i| {
                    let energy: f64 = centred[i - w..=i + w].iter().map(|a| a * a).sum();
                    (scale * energy).sqrt()
                })
                .collect()
        }
    };

    let average = rms.iter().sum::<f64>() / rms.len() as f64;
    let max = rms.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    Ok(StillnessIndex { rms, average, max })
}

/// PSI of each axis, with the average and maximum indices averaged across axes
pub fn stillness_index_vector(
    axes: &[Vec<f64>],
    window_width: usize,
    mode: StillnessMode,
) -> AffectResult<StillnessVector> {
    if axes.is_empty() {
        return Err(AffectError::EmptyInput {
            operation: "stillness_index_vector",
        });
    }

    let per_axis = axes
        .iter()
        .map(|axis| physical_stillness_index(axis, window_width, mode))
        .collect::<AffectResult<Vec<_>>>()?;

    let count = per_axis.len() as f64;
    let average = per_axis.iter().map(|psi| psi.average).sum::<f64>() / count;
    let max = per_axis.iter().map(|psi| psi.max).sum::<f64>() / count;

    Ok(StillnessVector {
        per_axis,
        average,
        max,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_too_short_for_window() {
        let short = vec![1.0; 16];
        assert!(matches!(
            physical_stillness_index(&short, 8, StillnessMode::Corrected),
            Err(AffectError::EmptyInput { .. })
        ));
        assert!(physical_stillness_index(&[1.0; 17], 8, StillnessMode::Corrected).is_ok());
    }

    #[test]
    fn test_constant_signal_is_still_when_corrected() {
        let gravity = vec![9.81; 40];
        let psi = physical_stillness_index(&gravity, 8, StillnessMode::Corrected).unwrap();
        assert_eq!(psi.rms.len(), 24);
        assert!(psi.max.abs() < 1e-12);
    }

    #[test]
    fn test_parity_keeps_bias_and_last_term() {
        let gravity = vec![9.81; 40];
        let psi = physical_stillness_index(&gravity, 8, StillnessMode::Parity).unwrap();
        let expected = (9.81f64 * 9.81 / 17.0).sqrt();
        assert!((psi.average - expected).abs() < 1e-12);

        // Only x[i + w - 1] contributes
        let mut impulse = vec![0.0; 20];
        impulse[10] = 3.0;
        let psi = physical_stillness_index(&impulse, 2, StillnessMode::Parity).unwrap();
        let nonzero: Vec<usize> = psi
            .rms
            .iter()
            .enumerate()
            .filter(|(_, &v)| v > 0.0)
            .map(|(k, _)| k + 2)
            .collect();
        assert_eq!(nonzero, vec![9]);
    }

    #[test]
    fn test_corrected_accumulates_window() {
        let mut impulse = vec![0.0; 21];
        impulse[10] = 2.1;
        let psi = physical_stillness_index(&impulse, 2, StillnessMode::Corrected).unwrap();
        // Impulse spreads over the five centres within reach
        let touched = psi.rms.iter().filter(|&&v| v > 0.2).count();
        assert_eq!(touched, 5);
    }

    #[test]
    fn test_vector_averages_axes() {
        let still = vec![0.0; 30];
        let moving: Vec<f64> = (0..30).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();

        let psi = stillness_index_vector(&[still, moving.clone()], 4, StillnessMode::Corrected)
            .unwrap();
        let single = physical_stillness_index(&moving, 4, StillnessMode::Corrected).unwrap();

        assert_eq!(psi.per_axis.len(), 2);
        assert!((psi.average - single.average / 2.0).abs() < 1e-12);
        assert!((psi.max - single.max / 2.0).abs() < 1e-12);
        assert!(stillness_index_vector(&[], 4, StillnessMode::Parity).is_err());
    }
}
