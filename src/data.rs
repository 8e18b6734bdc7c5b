//! Training and evaluation batches

use ndarray::Array2;

/// One batch of samples: inputs plus ground-truth class labels.
///
/// `inputs` has shape `[batch, features]`; `labels` holds one class index
/// per row. The labels are the scoring reference for accuracy and are never
/// altered by the target-transform pipeline.
#[derive(Debug, Clone)]
pub struct Batch {
    /// Input samples, one row per example
    pub inputs: Array2<f32>,
    /// Ground-truth class indices, one per example
    pub labels: Vec<usize>,
}

impl Batch {
    /// Create a new batch
    ///
    /// # Panics
    ///
    /// Panics if the number of labels does not match the number of rows.
    pub fn new(inputs: Array2<f32>, labels: Vec<usize>) -> Self {
        assert_eq!(
            inputs.nrows(),
            labels.len(),
            "Batch inputs and labels must have the same length"
        );
        Self { inputs, labels }
    }

    /// Number of examples in the batch
    pub fn batch_size(&self) -> usize {
        self.labels.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_batch_size() {
        let batch = Batch::new(array![[1.0, 2.0], [3.0, 4.0]], vec![0, 1]);
        assert_eq!(batch.batch_size(), 2);
    }

    #[test]
    #[should_panic(expected = "same length")]
    fn test_mismatched_lengths_panic() {
        Batch::new(array![[1.0, 2.0]], vec![0, 1]);
    }
}
