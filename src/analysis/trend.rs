//! Moving-average trend detection over per-period average scores.

use super::reductions::round_to;
use crate::models::{AverageScore, Direction, TrendResult, TrendStatus};

/// Default moving-average window, in periods.
pub const DEFAULT_WINDOW: usize = 7;

/// Change rate (percent) above which a trend is improving.
pub const IMPROVING_THRESHOLD: f64 = 10.0;

/// Change rate (percent) below which a trend is declining.
pub const DECLINING_THRESHOLD: f64 = -10.0;

/// Classify the recent trajectory of a series of period averages.
///
/// The series is smoothed with a trailing simple moving average, then the
/// mean of the last `window_size` smoothed values is compared with the mean
/// of the `window_size` values before it (or with the first smoothed value
/// when the series is shorter than two windows). A window of 0 is treated
/// as 1.
pub fn calculate_trend<T: AverageScore>(periods: &[T], window_size: usize) -> TrendResult {
    let window = window_size.max(1);

    if periods.len() < window {
        return TrendResult::placeholder(TrendStatus::InsufficientData);
    }

    let scores: Vec<Option<f64>> = periods.iter().map(AverageScore::average_score).collect();
    if scores.iter().all(Option::is_none) {
        return TrendResult::placeholder(TrendStatus::NoScores);
    }

    let smoothed = moving_average(&scores, window);
    let n = smoothed.len();

    let recent_avg = mean_present(&smoothed[n - window..]).unwrap_or(0.0);
    let previous_avg = if n >= 2 * window {
        mean_present(&smoothed[n - 2 * window..n - window])
    } else {
        smoothed[0]
    }
    .unwrap_or(0.0);

    let change_rate = if previous_avg != 0.0 {
        (recent_avg - previous_avg) / previous_avg.abs() * 100.0
    } else {
        0.0
    };

    TrendResult {
        trend: TrendStatus::Calculated,
        change_rate: round_to(change_rate, 2),
        direction: classify_direction(change_rate),
        recent_average: Some(round_to(recent_avg, 3)),
        previous_average: Some(round_to(previous_avg, 3)),
    }
}

/// Map a change rate to a direction. The thresholds are exclusive.
pub fn classify_direction(change_rate: f64) -> Direction {
    if change_rate > IMPROVING_THRESHOLD {
        Direction::Improving
    } else if change_rate < DECLINING_THRESHOLD {
        Direction::Declining
    } else {
        Direction::Stable
    }
}

/// Trailing simple moving average with a minimum of one present value.
///
/// Produces one value per input; a position whose window holds no present
/// value yields `None`.
pub fn moving_average(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    let window = window.max(1);

    (0..values.len())
        .map(|i| {
            let start = (i + 1).saturating_sub(window);
            mean_present(&values[start..=i])
        })
        .collect()
}

fn mean_present(values: &[Option<f64>]) -> Option<f64> {
    let present: Vec<f64> = values.iter().flatten().copied().collect();
    if present.is_empty() {
        None
    } else {
        Some(present.iter().sum::<f64>() / present.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_series_is_stable() {
        let series = vec![0.5; 14];
        let result = calculate_trend(&series, DEFAULT_WINDOW);

        assert_eq!(result.trend, TrendStatus::Calculated);
        assert_eq!(result.change_rate, 0.0);
        assert_eq!(result.direction, Direction::Stable);
        assert_eq!(result.recent_average, Some(0.5));
        assert_eq!(result.previous_average, Some(0.5));
    }

    #[test]
    fn test_insufficient_data() {
        let result = calculate_trend(&[0.1, 0.2, 0.3], DEFAULT_WINDOW);

        assert_eq!(result, TrendResult::placeholder(TrendStatus::InsufficientData));
        assert_eq!(result.change_rate, 0.0);
        assert_eq!(result.direction, Direction::Neutral);

        let empty: [f64; 0] = [];
        assert_eq!(
            calculate_trend(&empty, DEFAULT_WINDOW).trend,
            TrendStatus::InsufficientData
        );
    }

    #[test]
    fn test_no_scores() {
        let series: Vec<Option<f64>> = vec![None; 8];
        let result = calculate_trend(&series, DEFAULT_WINDOW);

        assert_eq!(result, TrendResult::placeholder(TrendStatus::NoScores));
    }

    #[test]
    fn test_threshold_boundary_is_exclusive() {
        // (0.6875 - 0.625) / 0.625 * 100 == 10.0 exactly.
        let up = calculate_trend(&[0.625, 0.6875], 1);
        assert_eq!(up.change_rate, 10.0);
        assert_eq!(up.direction, Direction::Stable);

        let down = calculate_trend(&[0.625, 0.5625], 1);
        assert_eq!(down.change_rate, -10.0);
        assert_eq!(down.direction, Direction::Stable);

        assert_eq!(classify_direction(10.0), Direction::Stable);
        assert_eq!(classify_direction(-10.0), Direction::Stable);
        assert_eq!(classify_direction(10.01), Direction::Improving);
        assert_eq!(classify_direction(-10.01), Direction::Declining);
    }

    #[test]
    fn test_improving_two_windows() {
        let mut series = vec![0.2; 3];
        series.extend([0.6; 3]);
        let result = calculate_trend(&series, 3);

        // Smoothed: 0.2, 0.2, 0.2, 0.333.., 0.466.., 0.6
        assert_eq!(result.direction, Direction::Improving);
        assert_eq!(result.previous_average, Some(0.2));
        assert_eq!(result.recent_average, Some(0.467));
        assert_eq!(result.change_rate, 133.33);
    }

    #[test]
    fn test_declining_short_series_uses_first_value() {
        // Fewer than two windows: baseline is the first smoothed value.
        let series = [0.8, 0.6, 0.4, 0.2];
        let result = calculate_trend(&series, 3);

        assert_eq!(result.trend, TrendStatus::Calculated);
        assert_eq!(result.previous_average, Some(0.8));
        assert_eq!(result.direction, Direction::Declining);
        assert!(result.change_rate < -10.0);
    }

    #[test]
    fn test_zero_baseline_gives_zero_rate() {
        let result = calculate_trend(&[0.0, 0.0, 0.5], 2);

        assert_eq!(result.trend, TrendStatus::Calculated);
        assert_eq!(result.change_rate, 0.0);
        assert_eq!(result.direction, Direction::Stable);
    }

    #[test]
    fn test_zero_window_treated_as_one() {
        let result = calculate_trend(&[0.625, 0.6875], 0);
        assert_eq!(result, calculate_trend(&[0.625, 0.6875], 1));
    }

    #[test]
    fn test_moving_average_skips_missing() {
        let values = [Some(1.0), None, Some(3.0), None, None];
        let smoothed = moving_average(&values, 2);

        assert_eq!(smoothed, vec![Some(1.0), Some(1.0), Some(3.0), Some(3.0), None]);
    }
}
