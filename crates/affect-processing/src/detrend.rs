//! Tarvainen smoothness-priors detrending
//!
//! Splits a signal into a slow trend and a fast stationary part using
//! `H = I - (I + lambda^2 D D^T)^-1`, where `D` is the `n x (n-2)` banded
//! second-difference operator. `H * signal` is the detrended (phasic) part and
//! the residual `signal - H * signal` is the trend (tonic) part.
//!
//! Reference: Tarvainen, Ranta-aho and Karjalainen, "An advanced detrending
//! method with application to HRV analysis", IEEE TBME 49(2), 2002.

use affect_core::{AffectError, AffectResult};
use nalgebra::{DMatrix, DVector};
use std::collections::HashMap;
use tracing::debug;

/// Phasic and tonic components of a signal
#[derive(Debug, Clone, PartialEq)]
pub struct Decomposition {
    /// Trend-removed fast component (SCR for EDA)
    pub phasic: Vec<f64>,
    /// Slow residual component (SCL for EDA)
    pub tonic: Vec<f64>,
}

/// Detrending filter with a per-length cache of `H`
#[derive(Debug, Clone)]
pub struct TarvainenDetrender {
    lambda: f64,
    coefficients: [f64; 3],
    cache: HashMap<usize, DMatrix<f64>>,
}

impl TarvainenDetrender {
    /// Standard second-difference coefficients
    pub const SECOND_DIFFERENCE: [f64; 3] = [1.0, -2.0, 1.0];

    pub fn new(lambda: f64) -> Self {
        Self::with_coefficients(lambda, Self::SECOND_DIFFERENCE)
    }

    /// Use custom coefficients for the three diagonals of `D`
    pub fn with_coefficients(lambda: f64, coefficients: [f64; 3]) -> Self {
        TarvainenDetrender {
            lambda,
            coefficients,
            cache: HashMap::new(),
        }
    }

    pub fn lambda(&self) -> f64 {
        self.lambda
    }

    /// Number of distinct signal lengths with a cached filter
    pub fn cached_lengths(&self) -> usize {
        self.cache.len()
    }

    /// Trend-removed signal `H * signal`
    pub fn remove_trend<T: Copy + Into<f64>>(&mut self, signal: &[T]) -> AffectResult<Vec<f64>> {
        let n = signal.len();
        let h = self.filter_matrix(n)?;
        let x = DVector::from_iterator(n, signal.iter().map(|&v| v.into()));
        Ok((h * x).iter().copied().collect())
    }

    /// Both components of the signal
    pub fn decompose<T: Copy + Into<f64>>(&mut self, signal: &[T]) -> AffectResult<Decomposition> {
        let phasic = self.remove_trend(signal)?;
        let tonic = residual(signal, &phasic);
        Ok(Decomposition { phasic, tonic })
    }

    fn filter_matrix(&mut self, n: usize) -> AffectResult<&DMatrix<f64>> {
        if !self.cache.contains_key(&n) {
            let h = build_filter(n, self.lambda, &self.coefficients)?;
            debug!(length = n, lambda = self.lambda, "built detrending filter");
            self.cache.insert(n, h);
        }

        self.cache.get(&n).ok_or_else(|| AffectError::DetrendFailure {
            length: n,
            reason: "filter missing from cache".to_string(),
        })
    }
}

impl Default for TarvainenDetrender {
    fn default() -> Self {
        Self::new(1500.0)
    }
}

fn build_filter(n: usize, lambda: f64, coefficients: &[f64; 3]) -> AffectResult<DMatrix<f64>> {
    if n < 3 {
        return Err(AffectError::DetrendFailure {
            length: n,
            reason: "at least 3 samples are needed for a second-difference operator".to_string(),
        });
    }

    let mut d2 = DMatrix::<f64>::zeros(n, n - 2);
    for (offset, &coefficient) in coefficients.iter().enumerate() {
        for column in 0..n - 2 {
            d2[(column + offset, column)] = coefficient;
        }
    }

    let identity = DMatrix::<f64>::identity(n, n);
    let smoothing = &identity + (&d2 * d2.transpose()) * lambda.powi(2);
    let inverse = smoothing
        .try_inverse()
        .ok_or_else(|| AffectError::DetrendFailure {
            length: n,
            reason: "smoothing matrix is singular".to_string(),
        })?;

    Ok(identity - inverse)
}

/// Element-wise `signal - detrended`
pub fn residual<T: Copy + Into<f64>>(signal: &[T], detrended: &[f64]) -> Vec<f64> {
    signal
        .iter()
        .zip(detrended)
        .map(|(&x, &d)| x.into() - d)
        .collect()
}
