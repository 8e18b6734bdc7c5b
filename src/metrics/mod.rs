//! Running metrics and cross-worker aggregation
//!
//! Each epoch owns a [`MeterSet`] of named [`SmoothedValue`] meters. Meters
//! track a bounded window of recent values for progress display plus a
//! global weighted count/total; at epoch end the global statistics are
//! sum-reduced across workers through a [`ProcessGroup`] and read out as
//! per-metric global averages.

mod accuracy;
mod meters;
mod smoothed;
mod sync;

pub use accuracy::accuracy;
pub use meters::MeterSet;
pub use smoothed::SmoothedValue;
pub use sync::{LocalGroup, ProcessGroup};
