//! Named meter collection

use super::smoothed::SmoothedValue;
use super::sync::ProcessGroup;
use std::collections::BTreeMap;
use std::fmt;

/// A set of named meters covering one epoch.
///
/// Meters are created lazily on first update with the default window;
/// meters needing a custom window (the learning-rate meter uses window 1)
/// are registered up front with [`MeterSet::add_meter`].
#[derive(Debug, Clone, Default)]
pub struct MeterSet {
    meters: BTreeMap<String, SmoothedValue>,
}

impl MeterSet {
    /// Create an empty meter set
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a meter with a custom configuration
    pub fn add_meter(&mut self, name: &str, meter: SmoothedValue) {
        self.meters.insert(name.to_string(), meter);
    }

    /// Record `value` with weight `n` under `name`
    pub fn update(&mut self, name: &str, value: f64, n: u64) {
        self.meters
            .entry(name.to_string())
            .or_default()
            .update(value, n);
    }

    /// Look up a meter by name
    pub fn get(&self, name: &str) -> Option<&SmoothedValue> {
        self.meters.get(name)
    }

    /// Whether no meter has been registered or updated yet
    pub fn is_empty(&self) -> bool {
        self.meters.is_empty()
    }

    /// Sum-reduce every meter's global statistics across workers.
    ///
    /// Meters are visited in name order, one collective reduction each;
    /// every worker must hold the same meter names at the barrier.
    pub fn synchronize(&mut self, group: &dyn ProcessGroup) {
        for meter in self.meters.values_mut() {
            meter.synchronize(group);
        }
    }

    /// Read out every meter's epoch-global average
    pub fn global_averages(&self) -> BTreeMap<String, f64> {
        self.meters
            .iter()
            .map(|(name, meter)| (name.clone(), meter.global_avg()))
            .collect()
    }
}

impl fmt::Display for MeterSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (name, meter) in &self.meters {
            if !first {
                write!(f, "  ")?;
            }
            write!(f, "{name}: {meter}")?;
            first = false;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::LocalGroup;
    use approx::assert_relative_eq;

    #[test]
    fn test_lazy_meter_creation() {
        let mut meters = MeterSet::new();
        meters.update("loss", 0.5, 1);
        meters.update("loss", 1.5, 1);

        assert_relative_eq!(meters.get("loss").unwrap().global_avg(), 1.0);
    }

    #[test]
    fn test_registered_meter_keeps_window() {
        let mut meters = MeterSet::new();
        meters.add_meter("lr", SmoothedValue::with_window(1));
        meters.update("lr", 0.1, 1);
        meters.update("lr", 0.05, 1);

        // Window of one: only the latest value is smoothed over
        assert_relative_eq!(meters.get("lr").unwrap().avg(), 0.05);
    }

    #[test]
    fn test_global_averages_readout() {
        let mut meters = MeterSet::new();
        meters.update("acc1", 50.0, 2);
        meters.update("acc1", 100.0, 2);
        meters.update("loss", 0.7, 1);

        let stats = meters.global_averages();
        assert_relative_eq!(stats["acc1"], 75.0);
        assert_relative_eq!(stats["loss"], 0.7);
    }

    #[test]
    fn test_synchronize_single_process_is_identity() {
        let mut meters = MeterSet::new();
        meters.update("loss", 2.0, 4);
        meters.synchronize(&LocalGroup);

        assert_relative_eq!(meters.get("loss").unwrap().global_avg(), 2.0);
        assert_eq!(meters.get("loss").unwrap().count(), 4);
    }

    #[test]
    fn test_display_joins_meters() {
        let mut meters = MeterSet::new();
        meters.update("acc1", 50.0, 1);
        meters.update("loss", 1.0, 1);

        let line = format!("{meters}");
        assert!(line.contains("acc1:"));
        assert!(line.contains("loss:"));
        assert!(line.contains("  "));
    }
}
