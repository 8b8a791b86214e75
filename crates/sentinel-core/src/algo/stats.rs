//! Column statistics used by the scorer
//!
//! Sample statistics follow the ddof=1 convention; anything undefined on
//! short input comes back as `None` rather than NaN.

use crate::signal::Trend;

/// Share of the series' std a window shift must exceed to count as a trend
const TREND_TOLERANCE: f64 = 0.2;

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation. `None` below two values.
pub fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    Some((ss / (values.len() - 1) as f64).sqrt())
}

pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Linear-interpolated quantile, `q` in [0, 1]
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Compare the mean of the newest window against the oldest one.
///
/// The window is `len / 2` clamped to [2, 5]; a series shorter than two
/// windows has no readable trend.
pub fn classify_trend(series: &[f64]) -> Trend {
    let window = (series.len() / 2).clamp(2, 5);
    if series.len() < window * 2 {
        return Trend::Unclear;
    }

    let (Some(prior), Some(recent)) = (
        mean(&series[..window]),
        mean(&series[series.len() - window..]),
    ) else {
        return Trend::Unclear;
    };
    let delta = recent - prior;
    let spread = sample_std(series).unwrap_or(0.0);

    if delta.abs() <= spread * TREND_TOLERANCE {
        Trend::Stable
    } else if delta > 0.0 {
        Trend::Increasing
    } else {
        Trend::Decreasing
    }
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
