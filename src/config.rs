//! Engine configuration
//!
//! The training loop consumes an explicit [`EngineConfig`] rather than an
//! ambient argument object: exactly the fields the per-batch protocol
//! recognizes, loadable from YAML.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Which distillation signal the criterion produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistillKind {
    /// No distillation; the base task loss alone
    #[default]
    None,
    /// Temperature-scaled KL divergence against teacher probabilities
    Soft,
    /// Cross-entropy against the teacher's argmax labels
    Hard,
    /// Soft distillation plus a teacher-alignment term, reported decomposed
    Mid,
}

/// Configuration bundle for [`crate::engine::train_one_epoch`]
///
/// # Example
///
/// ```
/// use destilar::{DistillKind, EngineConfig};
///
/// let cfg = EngineConfig::new()
///     .with_distillation(DistillKind::Mid, 0.5, 0.5)
///     .with_bce_loss(true);
/// assert!(cfg.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Binarize loss targets for a binary-cross-entropy-style base loss
    #[serde(default)]
    pub bce_loss: bool,

    /// Distillation variant the criterion is configured for
    #[serde(default)]
    pub distillation_type: DistillKind,

    /// Weight of the distillation term in the combined loss, in `[0, 1]`
    #[serde(default = "default_alpha")]
    pub distillation_alpha: f32,

    /// Weight of the mid (alignment) term when `distillation_type` is `mid`
    #[serde(default = "default_beta")]
    pub distillation_beta: f32,
}

fn default_alpha() -> f32 {
    0.5
}

fn default_beta() -> f32 {
    0.5
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            bce_loss: false,
            distillation_type: DistillKind::None,
            distillation_alpha: default_alpha(),
            distillation_beta: default_beta(),
        }
    }
}

impl EngineConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable target binarization
    pub fn with_bce_loss(mut self, bce_loss: bool) -> Self {
        self.bce_loss = bce_loss;
        self
    }

    /// Set the distillation variant and its weights
    pub fn with_distillation(mut self, kind: DistillKind, alpha: f32, beta: f32) -> Self {
        self.distillation_type = kind;
        self.distillation_alpha = alpha;
        self.distillation_beta = beta;
        self
    }

    /// Check the weight ranges
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.distillation_alpha) {
            return Err(Error::ConfigError(format!(
                "distillation_alpha must be in [0, 1], got {}",
                self.distillation_alpha
            )));
        }
        if self.distillation_beta < 0.0 {
            return Err(Error::ConfigError(format!(
                "distillation_beta must be non-negative, got {}",
                self.distillation_beta
            )));
        }
        Ok(())
    }
}

/// Load and validate an [`EngineConfig`] from a YAML file
pub fn load_config(path: &Path) -> Result<EngineConfig> {
    let text = std::fs::read_to_string(path)?;
    let config: EngineConfig =
        serde_yaml::from_str(&text).map_err(|e| Error::Serialization(e.to_string()))?;
    config.validate()?;
    Ok(config)
}
