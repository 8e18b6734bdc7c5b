//! Base task losses over dense targets

use super::distill::LossTerm;
use ndarray::{Array2, Axis};

/// Base task loss over dense per-class targets.
///
/// `forward` returns the batch-mean scalar together with its gradient with
/// respect to the logits, so the backward pass needs no recorded graph.
pub trait BaseLoss {
    /// Compute loss value and gradient for a batch of logits
    fn forward(&self, outputs: &Array2<f32>, targets: &Array2<f32>) -> LossTerm;

    /// Name of the loss function
    fn name(&self) -> &str;
}

/// Cross-entropy against dense (possibly soft or multi-hot) targets
///
/// `L = mean_b( -Σ_c t[b,c] * ln softmax(o)[b,c] )`
///
/// # Example
///
/// ```
/// use destilar::loss::{BaseLoss, SoftTargetCrossEntropy};
/// use ndarray::array;
///
/// let loss = SoftTargetCrossEntropy.forward(
///     &array![[2.0, 0.5, 0.1]],
///     &array![[1.0, 0.0, 0.0]],
/// );
/// assert!(loss.value > 0.0);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct SoftTargetCrossEntropy;

impl BaseLoss for SoftTargetCrossEntropy {
    fn forward(&self, outputs: &Array2<f32>, targets: &Array2<f32>) -> LossTerm {
        assert_eq!(
            outputs.shape(),
            targets.shape(),
            "Outputs and targets must have the same shape"
        );

        let batch_size = outputs.nrows() as f32;
        let probs = softmax_2d(outputs);

        let mut value = 0.0;
        for (p_row, t_row) in probs.axis_iter(Axis(0)).zip(targets.axis_iter(Axis(0))) {
            for (&p, &t) in p_row.iter().zip(t_row.iter()) {
                if t != 0.0 {
                    value -= t * (p + 1e-10).ln();
                }
            }
        }
        value /= batch_size;

        // d/do of -Σ t ln softmax(o) is p * Σt - t per row
        let row_mass = targets.sum_axis(Axis(1)).insert_axis(Axis(1));
        let grad = (&probs * &row_mass - targets) / batch_size;

        LossTerm { value, grad }
    }

    fn name(&self) -> &str {
        "SoftTargetCrossEntropy"
    }
}

/// Binary cross-entropy with logits, element-mean over the batch
///
/// `L = mean( -t*ln σ(o) - (1-t)*ln(1-σ(o)) )`
#[derive(Debug, Clone, Copy, Default)]
pub struct BinaryCrossEntropy;

impl BaseLoss for BinaryCrossEntropy {
    fn forward(&self, outputs: &Array2<f32>, targets: &Array2<f32>) -> LossTerm {
        assert_eq!(
            outputs.shape(),
            targets.shape(),
            "Outputs and targets must have the same shape"
        );

        let n = outputs.len() as f32;
        let probs = outputs.mapv(sigmoid);

        let mut value = 0.0;
        for (&p, &t) in probs.iter().zip(targets.iter()) {
            value -= t * (p + 1e-10).ln() + (1.0 - t) * (1.0 - p + 1e-10).ln();
        }
        value /= n;

        let grad = (&probs - targets) / n;

        LossTerm { value, grad }
    }

    fn name(&self) -> &str {
        "BinaryCrossEntropy"
    }
}

/// Cross-entropy of logits against hard class labels, value only.
///
/// Used by the evaluation pass, where no gradient is needed.
pub fn cross_entropy(outputs: &Array2<f32>, labels: &[usize]) -> f32 {
    assert_eq!(
        outputs.nrows(),
        labels.len(),
        "Output rows and labels must have the same length"
    );

    let probs = softmax_2d(outputs);
    let mut loss = 0.0;
    for (row, &label) in probs.axis_iter(Axis(0)).zip(labels) {
        loss -= (row[label] + 1e-10).ln();
    }
    loss / labels.len().max(1) as f32
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Row-wise softmax with max-subtraction for numerical stability
pub(crate) fn softmax_2d(x: &Array2<f32>) -> Array2<f32> {
    let mut result = x.clone();

    for mut row in result.axis_iter_mut(Axis(0)) {
        let max_val = row.iter().fold(f32::NEG_INFINITY, |a, &b| a.max(b));
        row.mapv_inplace(|v| (v - max_val).exp());

        let sum: f32 = row.sum();
        row.mapv_inplace(|v| v / sum);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_softmax_sums_to_one() {
        let x = array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]];
        let probs = softmax_2d(&x);

        for row in probs.axis_iter(Axis(0)) {
            let sum: f32 = row.sum();
            assert_relative_eq!(sum, 1.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_softmax_stable_for_large_logits() {
        let x = array![[1000.0, 999.0, 998.0]];
        let probs = softmax_2d(&x);
        for &p in probs.iter() {
            assert!(p.is_finite());
        }
    }

    #[test]
    fn test_soft_ce_one_hot_matches_hard_ce() {
        let outputs = array![[2.0, 1.0, 0.5], [0.1, 0.2, 3.0]];
        let labels = [0usize, 2];
        let targets = crate::targets::one_hot(&labels, 3);

        let soft = SoftTargetCrossEntropy.forward(&outputs, &targets);
        let hard = cross_entropy(&outputs, &labels);
        assert_relative_eq!(soft.value, hard, epsilon = 1e-6);
    }

    #[test]
    fn test_soft_ce_gradient_is_probs_minus_targets() {
        let outputs = array![[2.0, 1.0, 0.5]];
        let targets = array![[1.0, 0.0, 0.0]];

        let term = SoftTargetCrossEntropy.forward(&outputs, &targets);
        let probs = softmax_2d(&outputs);

        // One-hot rows: grad = (p - t) / B
        for c in 0..3 {
            assert_relative_eq!(
                term.grad[[0, c]],
                probs[[0, c]] - targets[[0, c]],
                epsilon = 1e-6
            );
        }
    }

    #[test]
    fn test_soft_ce_gradient_sums_to_zero_for_normalized_targets() {
        let outputs = array![[0.3, -1.2, 2.0], [1.0, 1.0, 1.0]];
        let targets = array![[0.5, 0.25, 0.25], [0.0, 1.0, 0.0]];

        let term = SoftTargetCrossEntropy.forward(&outputs, &targets);
        for row in term.grad.axis_iter(Axis(0)) {
            assert_relative_eq!(row.sum(), 0.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_bce_confident_correct_is_small() {
        let outputs = array![[10.0, -10.0]];
        let targets = array![[1.0, 0.0]];

        let term = BinaryCrossEntropy.forward(&outputs, &targets);
        assert!(term.value < 0.01);
    }

    #[test]
    fn test_bce_gradient_direction() {
        let outputs = array![[0.0, 0.0]];
        let targets = array![[1.0, 0.0]];

        let term = BinaryCrossEntropy.forward(&outputs, &targets);
        // σ(0) = 0.5: push the positive logit up, the negative one down
        assert!(term.grad[[0, 0]] < 0.0);
        assert!(term.grad[[0, 1]] > 0.0);
    }

    #[test]
    fn test_hard_ce_uniform_logits() {
        let outputs = array![[0.0, 0.0, 0.0, 0.0]];
        let loss = cross_entropy(&outputs, &[2]);
        assert_relative_eq!(loss, (4.0_f32).ln(), epsilon = 1e-6);
    }

    #[test]
    fn test_loss_names() {
        assert_eq!(SoftTargetCrossEntropy.name(), "SoftTargetCrossEntropy");
        assert_eq!(BinaryCrossEntropy.name(), "BinaryCrossEntropy");
    }
}
