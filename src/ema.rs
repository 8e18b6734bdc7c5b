//! Exponential-moving-average shadow parameters

use crate::param::Param;
use ndarray::Array1;

/// Refreshes a shadow parameter set from the live model.
///
/// Updated by the engine once per processed batch, strictly after the
/// optimizer step; skipped batches trigger no update.
pub trait EmaUpdate {
    /// Fold the current parameters into the shadow copy
    fn update(&mut self, params: &[Param]);
}

/// Decayed running average of model parameters.
///
/// `shadow = decay * shadow + (1 - decay) * param`, element-wise. The
/// shadow copy is commonly evaluated in place of the live weights for more
/// stable results.
///
/// # Example
///
/// ```
/// use destilar::ema::{EmaUpdate, ModelEma};
/// use destilar::Param;
///
/// let params = vec![Param::from_vec(vec![1.0, 2.0], true)];
/// let mut ema = ModelEma::new(&params, 0.9);
/// ema.update(&params);
/// assert_eq!(ema.shadow()[0][0], 1.0);
/// ```
#[derive(Debug, Clone)]
pub struct ModelEma {
    decay: f32,
    shadow: Vec<Array1<f32>>,
}

impl ModelEma {
    /// Initialize the shadow copy from the current parameters
    ///
    /// # Panics
    ///
    /// Panics if `decay` is outside `[0, 1)`.
    pub fn new(params: &[Param], decay: f32) -> Self {
        assert!(
            (0.0..1.0).contains(&decay),
            "EMA decay must be in [0, 1), got {decay}"
        );

        Self {
            decay,
            shadow: params.iter().map(|p| p.data().clone()).collect(),
        }
    }

    /// The shadow parameter vectors
    pub fn shadow(&self) -> &[Array1<f32>] {
        &self.shadow
    }

    /// Decay factor
    pub fn decay(&self) -> f32 {
        self.decay
    }

    /// Overwrite `params` with the shadow copy (for shadow-weight evaluation)
    pub fn apply_to(&self, params: &mut [Param]) {
        assert_eq!(
            params.len(),
            self.shadow.len(),
            "Parameter count does not match the shadow copy"
        );
        for (param, shadow) in params.iter_mut().zip(&self.shadow) {
            *param.data_mut() = shadow.clone();
        }
    }
}

impl EmaUpdate for ModelEma {
    fn update(&mut self, params: &[Param]) {
        assert_eq!(
            params.len(),
            self.shadow.len(),
            "Parameter count does not match the shadow copy"
        );

        for (shadow, param) in self.shadow.iter_mut().zip(params) {
            *shadow = &*shadow * self.decay + param.data() * (1.0 - self.decay);
        }
    }
}
