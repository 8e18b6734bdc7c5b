//! Compute targets and numeric precision
//!
//! Batches are moved to a [`Device`] before each step and the device is
//! synchronized after each optimizer step. Evaluation selects a
//! [`Precision`] per model; reduced precision runs forward passes through a
//! bf16-style truncation of intermediate values.

use crate::data::Batch;

/// Compute target for batches and model execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Device {
    #[default]
    Cpu,
}

impl Device {
    /// Move a batch onto this device
    pub fn transfer(self, batch: Batch) -> Batch {
        match self {
            Device::Cpu => batch,
        }
    }

    /// Block until all queued device work has completed.
    ///
    /// On the CPU target this is immediate; it exists so step timing does
    /// not include queued asynchronous work on accelerator targets.
    pub fn synchronize(self) {
        match self {
            Device::Cpu => {}
        }
    }
}

/// Numeric precision for a forward pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precision {
    /// Full f32 precision
    Full,
    /// Reduced (bf16-style) precision
    Reduced,
}

impl Precision {
    /// Evaluation precision policy for a named model variant.
    ///
    /// Models whose name contains the substring `"base"` evaluate at full
    /// precision; every other variant uses the reduced path.
    pub fn for_model(model_name: &str) -> Precision {
        if model_name.contains("base") {
            Precision::Full
        } else {
            Precision::Reduced
        }
    }
}

/// Truncate a value to bf16-style precision (sign, exponent, 7 mantissa bits)
pub fn reduce_precision(x: f32) -> f32 {
    f32::from_bits(x.to_bits() & 0xffff_0000)
}
