//! Top-k classification accuracy

use ndarray::Array2;

/// Top-k accuracy of `output` logits against ground-truth class labels.
///
/// Returns one percentage in `[0, 100]` per requested `k`, in order. A
/// prediction counts as correct for `k` when fewer than `k` classes score
/// strictly higher than the true class.
///
/// # Example
///
/// ```
/// use destilar::metrics::accuracy;
/// use ndarray::array;
///
/// let output = array![[0.1, 2.0, 0.5], [3.0, 0.2, 0.1]];
/// let acc = accuracy(&output, &[1, 0], &[1, 2]);
/// assert_eq!(acc, vec![100.0, 100.0]);
/// ```
///
/// # Panics
///
/// Panics if the number of label entries does not match the number of
/// output rows, or if a label is out of range.
pub fn accuracy(output: &Array2<f32>, labels: &[usize], topk: &[usize]) -> Vec<f32> {
    assert_eq!(
        output.nrows(),
        labels.len(),
        "Output rows and labels must have the same length"
    );

    let batch_size = labels.len();
    let mut correct = vec![0usize; topk.len()];

    for (row, &label) in output.rows().into_iter().zip(labels) {
        assert!(
            label < row.len(),
            "Label {label} out of range for {} classes",
            row.len()
        );
        let target_score = row[label];
        let higher = row.iter().filter(|&&score| score > target_score).count();
        for (slot, &k) in correct.iter_mut().zip(topk) {
            if higher < k {
                *slot += 1;
            }
        }
    }

    correct
        .iter()
        .map(|&c| {
            if batch_size == 0 {
                0.0
            } else {
                100.0 * c as f32 / batch_size as f32
            }
        })
        .collect()
}
