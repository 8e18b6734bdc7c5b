//! Loss functions and the distillation criterion
//!
//! Losses follow one pattern: a forward pass produces a [`LossTerm`]
//! holding the scalar value together with its analytic gradient with
//! respect to the model outputs. The engine combines terms linearly and
//! hands the combined gradient to [`crate::model::Model::backward`].

mod cross_entropy;
mod distill;

pub use cross_entropy::{cross_entropy, BaseLoss, BinaryCrossEntropy, SoftTargetCrossEntropy};
pub use distill::{Criterion, DistillationCriterion, LossOutput, LossTerm};
