//! Scalar statistics over sample sequences
//!
//! Every function accepts `f32` or `f64` samples and works in `f64`. Empty
//! input is an error here; channel blocks decide whether to fall back to zeros.

use affect_core::{AffectError, AffectResult};
use serde::{Deserialize, Serialize};

fn ensure_non_empty<T>(signal: &[T], operation: &'static str) -> AffectResult<()> {
    if signal.is_empty() {
        return Err(AffectError::EmptyInput { operation });
    }
    Ok(())
}

fn samples<T: Copy + Into<f64>>(signal: &[T]) -> impl Iterator<Item = f64> + '_ {
    signal.iter().map(|&x| x.into())
}

/// Arithmetic mean
pub fn mean<T: Copy + Into<f64>>(signal: &[T]) -> AffectResult<f64> {
    ensure_non_empty(signal, "mean")?;
    Ok(samples(signal).sum::<f64>() / signal.len() as f64)
}

/// Population standard deviation
pub fn std_dev<T: Copy + Into<f64>>(signal: &[T]) -> AffectResult<f64> {
    ensure_non_empty(signal, "std_dev")?;
    let mu = mean(signal)?;
    let variance = samples(signal).map(|x| (x - mu).powi(2)).sum::<f64>() / signal.len() as f64;
    Ok(variance.sqrt())
}

pub fn min<T: Copy + Into<f64>>(signal: &[T]) -> AffectResult<f64> {
    ensure_non_empty(signal, "min")?;
    Ok(samples(signal).fold(f64::INFINITY, f64::min))
}

pub fn max<T: Copy + Into<f64>>(signal: &[T]) -> AffectResult<f64> {
    ensure_non_empty(signal, "max")?;
    Ok(samples(signal).fold(f64::NEG_INFINITY, f64::max))
}

/// Ratio of maximum to minimum
///
/// A zero minimum yields an infinite or NaN ratio, which is passed through.
pub fn dynamic_range<T: Copy + Into<f64>>(signal: &[T]) -> AffectResult<f64> {
    Ok(max(signal)? / min(signal)?)
}

/// Least-squares slope of the signal against the sample index
pub fn slope<T: Copy + Into<f64>>(signal: &[T]) -> AffectResult<f64> {
    ensure_non_empty(signal, "slope")?;
    let n = signal.len() as f64;
    let t_mean = (n - 1.0) / 2.0;
    let y_mean = mean(signal)?;

    let (mut sxy, mut sxx) = (0.0, 0.0);
    for (i, y) in samples(signal).enumerate() {
        let dt = i as f64 - t_mean;
        sxy += dt * (y - y_mean);
        sxx += dt * dt;
    }

    // Single sample
    if sxx == 0.0 {
        return Ok(0.0);
    }
    Ok(sxy / sxx)
}

/// Pearson correlation of the signal against the sample index
///
/// Returns 0 when the signal (or the time axis) has no variance.
pub fn correlation<T: Copy + Into<f64>>(signal: &[T]) -> AffectResult<f64> {
    ensure_non_empty(signal, "correlation")?;
    let n = signal.len() as f64;
    let t_mean = (n - 1.0) / 2.0;
    let y_mean = mean(signal)?;

    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (i, y) in samples(signal).enumerate() {
        let dt = i as f64 - t_mean;
        let dy = y - y_mean;
        sxy += dt * dy;
        sxx += dt * dt;
        syy += dy * dy;
    }

    let denominator = (sxx * syy).sqrt();
    if denominator == 0.0 {
        return Ok(0.0);
    }
    Ok(sxy / denominator)
}

/// p-th percentile with linear interpolation between closest ranks
pub fn percentile<T: Copy + Into<f64>>(signal: &[T], p: f64) -> AffectResult<f64> {
    ensure_non_empty(signal, "percentile")?;
    if !(0.0..=100.0).contains(&p) {
        return Err(AffectError::config(format!(
            "percentile must lie in [0, 100], got {}",
            p
        )));
    }

    let mut sorted: Vec<f64> = samples(signal).collect();
    sorted.sort_by(f64::total_cmp);

    let h = (sorted.len() - 1) as f64 * p / 100.0;
    let lower = h.floor() as usize;
    let upper = h.ceil() as usize;
    Ok(sorted[lower] + (h - lower as f64) * (sorted[upper] - sorted[lower]))
}

/// Definite integral over the sample index using composite Simpson's rule
///
/// Integrates over `[0, n-1]` with `n` partitions, rounded up to the next
/// even count. Sample points between indices read the preceding sample.
pub fn integral<T: Copy + Into<f64>>(signal: &[T]) -> AffectResult<f64> {
    ensure_non_empty(signal, "integral")?;
    let n = signal.len();
    let partitions = if n % 2 == 0 { n } else { n + 1 };
    let end = (n - 1) as f64;
    let step = end / partitions as f64;

    let f = |x: f64| -> f64 { signal[(x.floor() as usize).min(n - 1)].into() };

    let mut sum = f(0.0) + f(end);
    let mut weight = 4.0;
    let mut offset = step;
    for _ in 0..partitions - 1 {
        sum += weight * f(offset);
        weight = 6.0 - weight;
        offset += step;
    }

    Ok(sum * step / 3.0)
}

/// Root mean square
pub fn rms<T: Copy + Into<f64>>(signal: &[T]) -> AffectResult<f64> {
    ensure_non_empty(signal, "rms")?;
    let mean_square = samples(signal).map(|x| x * x).sum::<f64>() / signal.len() as f64;
    Ok(mean_square.sqrt())
}

/// Absolute value, used on integrals
pub fn absolute(value: f64) -> f64 {
    value.abs()
}

/// Ratio of two quantities, 0 when the denominator vanishes
pub fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

/// Descriptive summary shared by the EDA and temperature blocks
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalSummary {
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub dynamic_range: f64,
    pub slope: f64,
}

impl SignalSummary {
    pub fn calculate<T: Copy + Into<f64>>(signal: &[T]) -> AffectResult<Self> {
        let min = min(signal)?;
        let max = max(signal)?;

        Ok(SignalSummary {
            mean: mean(signal)?,
            std_dev: std_dev(signal)?,
            min,
            max,
            dynamic_range: max / min,
            slope: slope(signal)?,
        })
    }
}
