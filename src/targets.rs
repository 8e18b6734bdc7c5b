//! Loss-target transform pipeline
//!
//! Ground-truth labels become dense per-class targets and then pass through
//! an explicit two-stage pipeline: `one_hot -> maybe mix -> maybe binarize`.
//! Every stage returns a new value, so the pre-transform labels stay
//! available for accuracy scoring.

use ndarray::Array2;

/// Label-mixing transform applied jointly to inputs and dense targets.
///
/// Implementations (Mixup, CutMix, ...) are external collaborators; the
/// engine only requires that the transform is pure — it consumes the batch
/// and returns replacements rather than mutating in place.
pub trait MixTransform {
    /// Transform a batch of inputs and dense targets
    fn apply(&self, inputs: Array2<f32>, targets: Array2<f32>) -> (Array2<f32>, Array2<f32>);
}

/// Encode class indices as dense one-hot rows
///
/// # Panics
///
/// Panics if any label is out of range for `num_classes`.
pub fn one_hot(labels: &[usize], num_classes: usize) -> Array2<f32> {
    let mut targets = Array2::zeros((labels.len(), num_classes));
    for (row, &label) in labels.iter().enumerate() {
        assert!(
            label < num_classes,
            "Label {label} out of range for {num_classes} classes"
        );
        targets[[row, label]] = 1.0;
    }
    targets
}

/// Binarize dense targets: every value strictly greater than zero maps to
/// 1.0, everything else to 0.0. Idempotent.
pub fn binarize(targets: &Array2<f32>) -> Array2<f32> {
    targets.mapv(|v| if v > 0.0 { 1.0 } else { 0.0 })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_one_hot() {
        let targets = one_hot(&[2, 0], 3);
        assert_eq!(targets, array![[0.0, 0.0, 1.0], [1.0, 0.0, 0.0]]);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_one_hot_rejects_bad_label() {
        one_hot(&[3], 3);
    }

    #[test]
    fn test_binarize_thresholds_at_zero() {
        let mixed = array![[0.7, 0.3, 0.0], [-0.2, 0.0, 1.0]];
        let bin = binarize(&mixed);
        assert_eq!(bin, array![[1.0, 1.0, 0.0], [0.0, 0.0, 1.0]]);
    }

    #[test]
    fn test_binarize_idempotent() {
        let mixed = array![[0.7, 0.3, 0.0], [0.0, 0.1, 0.9]];
        let once = binarize(&mixed);
        let twice = binarize(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_binarize_returns_new_value() {
        let original = array![[0.5, 0.5]];
        let bin = binarize(&original);
        assert_eq!(original, array![[0.5, 0.5]]);
        assert_eq!(bin, array![[1.0, 1.0]]);
    }
}
