//! Windowed running statistic

use super::sync::ProcessGroup;
use std::collections::VecDeque;
use std::fmt;

const DEFAULT_WINDOW: usize = 20;

/// Tracks a series of values with a bounded window of recent entries and
/// global weighted statistics over the whole series.
///
/// The window feeds the smoothed progress display (`median`, `avg`, `max`,
/// `value`); the weighted `count`/`total` pair survives the window and
/// yields the epoch-global average, including after cross-worker reduction.
///
/// # Example
///
/// ```
/// use destilar::metrics::SmoothedValue;
///
/// let mut meter = SmoothedValue::default();
/// meter.update(2.0, 1);
/// meter.update(4.0, 3);
/// assert_eq!(meter.global_avg(), 3.5);
/// assert_eq!(meter.value(), 4.0);
/// ```
#[derive(Debug, Clone)]
pub struct SmoothedValue {
    window: VecDeque<f64>,
    window_size: usize,
    count: u64,
    total: f64,
}

impl SmoothedValue {
    /// Create a meter with the given window size
    pub fn with_window(window_size: usize) -> Self {
        Self {
            window: VecDeque::with_capacity(window_size),
            window_size: window_size.max(1),
            count: 0,
            total: 0.0,
        }
    }

    /// Record a value with weight `n`
    pub fn update(&mut self, value: f64, n: u64) {
        if self.window.len() == self.window_size {
            self.window.pop_front();
        }
        self.window.push_back(value);
        self.count += n;
        self.total += value * n as f64;
    }

    /// Most recent value
    pub fn value(&self) -> f64 {
        self.window.back().copied().unwrap_or(0.0)
    }

    /// Mean of the window
    pub fn avg(&self) -> f64 {
        if self.window.is_empty() {
            return 0.0;
        }
        self.window.iter().sum::<f64>() / self.window.len() as f64
    }

    /// Median of the window
    pub fn median(&self) -> f64 {
        if self.window.is_empty() {
            return 0.0;
        }
        let mut sorted: Vec<f64> = self.window.iter().copied().collect();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
        sorted[sorted.len() / 2]
    }

    /// Maximum of the window
    pub fn max(&self) -> f64 {
        self.window.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    /// Weighted average over the whole series (all workers, after sync)
    pub fn global_avg(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        self.total / self.count as f64
    }

    /// Total weight recorded so far
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Weighted sum recorded so far
    pub fn total(&self) -> f64 {
        self.total
    }

    /// Sum-reduce the global statistics across workers.
    ///
    /// The window stays local; only `count` and `total` take part in the
    /// reduction, so `global_avg` becomes the count-weighted mean over all
    /// workers.
    pub fn synchronize(&mut self, group: &dyn ProcessGroup) {
        let mut stats = [self.count as f64, self.total];
        group.all_reduce_sum(&mut stats);
        self.count = stats[0] as u64;
        self.total = stats[1];
    }
}

impl Default for SmoothedValue {
    fn default() -> Self {
        Self::with_window(DEFAULT_WINDOW)
    }
}

impl fmt::Display for SmoothedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4} ({:.4})", self.median(), self.global_avg())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_global_avg_is_weighted() {
        let mut meter = SmoothedValue::default();
        meter.update(1.0, 1);
        meter.update(3.0, 3);

        // (1*1 + 3*3) / 4
        assert_relative_eq!(meter.global_avg(), 2.5, epsilon = 1e-12);
        assert_eq!(meter.count(), 4);
    }

    #[test]
    fn test_window_is_bounded() {
        let mut meter = SmoothedValue::with_window(2);
        meter.update(1.0, 1);
        meter.update(2.0, 1);
        meter.update(3.0, 1);

        // Window holds [2, 3]; global stats see all three
        assert_relative_eq!(meter.avg(), 2.5, epsilon = 1e-12);
        assert_relative_eq!(meter.global_avg(), 2.0, epsilon = 1e-12);
        assert_eq!(meter.value(), 3.0);
    }

    #[test]
    fn test_median_and_max() {
        let mut meter = SmoothedValue::default();
        for v in [5.0, 1.0, 3.0] {
            meter.update(v, 1);
        }
        assert_eq!(meter.median(), 3.0);
        assert_eq!(meter.max(), 5.0);
    }

    #[test]
    fn test_empty_meter_reads_zero() {
        let meter = SmoothedValue::default();
        assert_eq!(meter.value(), 0.0);
        assert_eq!(meter.avg(), 0.0);
        assert_eq!(meter.global_avg(), 0.0);
    }

    #[test]
    fn test_display_format() {
        let mut meter = SmoothedValue::default();
        meter.update(2.0, 1);
        assert_eq!(format!("{meter}"), "2.0000 (2.0000)");
    }
}
