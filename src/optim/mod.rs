//! Optimizers and gradient utilities

mod adamw;
mod optimizer;
mod scheduler;
mod sgd;

pub use adamw::AdamW;
pub use optimizer::Optimizer;
pub use scheduler::{CosineAnnealingLR, LRScheduler};
pub use sgd::SGD;

use crate::param::Param;

/// Clip the global L2 norm of all parameter gradients to `max_norm`.
///
/// Returns the pre-clip norm. Gradients are rescaled in place when the
/// norm exceeds the threshold; parameters without gradients are skipped.
pub fn clip_grad_norm(params: &mut [Param], max_norm: f32) -> f32 {
    let mut total_sq = 0.0;
    for param in params.iter() {
        if let Some(grad) = param.grad() {
            total_sq += grad.iter().map(|g| g * g).sum::<f32>();
        }
    }
    let total_norm = total_sq.sqrt();

    if total_norm > max_norm {
        let scale = max_norm / (total_norm + 1e-6);
        for param in params.iter() {
            if let Some(grad) = param.grad() {
                param.set_grad(&grad * scale);
            }
        }
    }

    total_norm
}
