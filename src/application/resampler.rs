// Resampler - turns a sparse, unordered history batch into a gap-filled series
use crate::domain::history::HistoryPoint;

pub const DEFAULT_INTERVAL_MS: i64 = 60_000;

/// Value given to synthetic points inserted into a gap.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum FillPolicy {
    /// Zero fill. Right for rate channels such as RPM, where an outage means "not running".
    #[default]
    Zero,
    /// Repeat the last real value before the gap.
    HoldLast,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeSeriesResampler {
    interval_ms: i64,
    fill: FillPolicy,
}

impl Default for TimeSeriesResampler {
    fn default() -> Self {
        Self::new(DEFAULT_INTERVAL_MS)
    }
}

impl TimeSeriesResampler {
    pub fn new(interval_ms: i64) -> Self {
        Self {
            interval_ms,
            fill: FillPolicy::Zero,
        }
    }

    pub fn with_fill(mut self, fill: FillPolicy) -> Self {
        self.fill = fill;
        self
    }

    pub fn interval_ms(&self) -> i64 {
        self.interval_ms
    }

    /// Sorts `points` by time (stable) and inserts a synthetic point every
    /// interval inside any gap wider than one interval, stopping strictly
    /// before the next real point. Real points are never moved or replaced.
    pub fn resample(&self, mut points: Vec<HistoryPoint>) -> Vec<HistoryPoint> {
        points.sort_by_key(|p| p.time_ms);
        if points.len() < 2 || self.interval_ms <= 0 {
            return points;
        }

        let mut output = Vec::with_capacity(points.len());
        for pair in points.windows(2) {
            let (current, next) = (pair[0], pair[1]);
            output.push(current);

            let fill_value = match self.fill {
                FillPolicy::Zero => 0.0,
                FillPolicy::HoldLast => current.value,
            };
            // stop at the end of the i64 range instead of wrapping
            let mut fill_at = current.time_ms.checked_add(self.interval_ms);
            while let Some(t) = fill_at.filter(|t| *t < next.time_ms) {
                output.push(HistoryPoint::new(t, fill_value));
                fill_at = t.checked_add(self.interval_ms);
            }
        }
        if let Some(last) = points.last() {
            output.push(*last);
        }

        tracing::debug!(
            "Resampled {} points into {} at {}ms",
            points.len(),
            output.len(),
            self.interval_ms
        );
        output
    }
}

/// Zero-fill resampling with the given interval.
pub fn resample(points: Vec<HistoryPoint>, interval_ms: i64) -> Vec<HistoryPoint> {
    TimeSeriesResampler::new(interval_ms).resample(points)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(time_ms: i64, value: f64) -> HistoryPoint {
        HistoryPoint::new(time_ms, value)
    }

    #[test]
    fn test_gap_fill() {
        let output = resample(vec![p(0, 5.0), p(185_000, 9.0)], 60_000);
        assert_eq!(
            output,
            vec![
                p(0, 5.0),
                p(60_000, 0.0),
                p(120_000, 0.0),
                p(180_000, 0.0),
                p(185_000, 9.0),
            ]
        );
    }

    #[test]
    fn test_dense_input_is_unchanged() {
        let dense: Vec<_> = (0..10).map(|i| p(i * 60_000, i as f64)).collect();
        assert_eq!(resample(dense.clone(), 60_000), dense);

        let denser = vec![p(0, 1.0), p(30_000, 2.0), p(45_000, 3.0)];
        assert_eq!(resample(denser.clone(), 60_000), denser);
    }

    #[test]
    fn test_single_and_empty() {
        assert_eq!(resample(vec![p(100, 42.0)], 60_000), vec![p(100, 42.0)]);
        assert!(resample(Vec::new(), 60_000).is_empty());
    }

    #[test]
    fn test_unordered_input_is_sorted_stably() {
        let output = resample(vec![p(60_000, 2.0), p(0, 1.0), p(60_000, 3.0)], 60_000);
        assert_eq!(output, vec![p(0, 1.0), p(60_000, 2.0), p(60_000, 3.0)]);
    }

    #[test]
    fn test_exact_multiple_gap_stops_before_next() {
        let output = resample(vec![p(0, 7.0), p(180_000, 8.0)], 60_000);
        assert_eq!(
            output,
            vec![p(0, 7.0), p(60_000, 0.0), p(120_000, 0.0), p(180_000, 8.0)]
        );
    }

    #[test]
    fn test_consecutive_spacing_never_exceeds_interval() {
        let sparse = vec![p(500_000, 1.0), p(0, 4.0), p(61_000, 2.0), p(1_000_000, 3.0)];
        let output = resample(sparse, 60_000);
        for pair in output.windows(2) {
            let gap = pair[1].time_ms - pair[0].time_ms;
            assert!(gap > 0 && gap <= 60_000, "gap {} too wide", gap);
        }
        assert_eq!(output.first().unwrap().time_ms, 0);
        assert_eq!(output.last().unwrap().time_ms, 1_000_000);
    }

    #[test]
    fn test_hold_last_fill() {
        let output = TimeSeriesResampler::new(60_000)
            .with_fill(FillPolicy::HoldLast)
            .resample(vec![p(0, 40.0), p(130_000, 38.0)]);
        assert_eq!(output, vec![p(0, 40.0), p(60_000, 40.0), p(120_000, 40.0), p(130_000, 38.0)]);
    }

    #[test]
    fn test_huge_interval_does_not_overflow() {
        let output = resample(vec![p(1, 1.0), p(2, 2.0)], i64::MAX);
        assert_eq!(output, vec![p(1, 1.0), p(2, 2.0)]);
    }

    #[test]
    fn test_gap_near_i64_max() {
        let output = resample(vec![p(i64::MAX - 100_000, 1.0), p(i64::MAX - 1, 2.0)], 60_000);
        assert_eq!(
            output,
            vec![
                p(i64::MAX - 100_000, 1.0),
                p(i64::MAX - 40_000, 0.0),
                p(i64::MAX - 1, 2.0),
            ]
        );
    }

    #[test]
    fn test_non_positive_interval_only_sorts() {
        let output = resample(vec![p(200_000, 1.0), p(0, 2.0)], 0);
        assert_eq!(output, vec![p(0, 2.0), p(200_000, 1.0)]);
    }
}
