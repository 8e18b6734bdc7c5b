//! # Destilar: Distillation Training Epochs
//!
//! Destilar drives one training epoch and one evaluation pass for an image
//! classifier trained with knowledge distillation. It is an orchestration
//! layer: the model, loss functor, optimizer, EMA updater, and label mixer
//! are collaborators behind traits, while the crate owns the per-batch
//! protocol, the target-transform pipeline, metric aggregation across
//! workers, and the skip-on-non-finite-loss recovery policy.
//!
//! ## Architecture
//!
//! - **engine**: `train_one_epoch` and `evaluate`
//! - **model**: `Model` trait plus a linear reference classifier
//! - **loss**: base losses and the distillation criterion (none/soft/hard/mid)
//! - **optim**: optimizers, gradient clipping, LR scheduling
//! - **targets**: one-hot encoding, mixing hook, binarization
//! - **metrics**: smoothed meters, top-k accuracy, cross-worker reduction
//! - **ema**: exponential-moving-average shadow parameters
//! - **device**: compute target and numeric precision policy
//! - **config**: typed engine configuration with YAML loading

pub mod config;
pub mod data;
pub mod device;
pub mod ema;
pub mod engine;
pub mod error;
pub mod loss;
pub mod metrics;
pub mod model;
pub mod optim;
pub mod param;
pub mod targets;

// Re-export commonly used types
pub use config::{DistillKind, EngineConfig};
pub use data::Batch;
pub use device::{Device, Precision};
pub use engine::{evaluate, train_one_epoch};
pub use error::{Error, Result};
pub use model::Model;
pub use param::Param;
