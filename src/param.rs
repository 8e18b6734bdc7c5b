//! Model parameters with gradient slots

use ndarray::Array1;
use std::cell::RefCell;
use std::rc::Rc;

/// A flat parameter vector with an attached gradient slot.
///
/// The data is owned by the holding model; the gradient cell is shared so
/// that backward passes can accumulate into it while the optimizer reads it
/// back out. Gradients are produced by [`crate::model::Model::backward`],
/// consumed by [`crate::optim::Optimizer::step`], and cleared with
/// [`Param::zero_grad`].
#[derive(Clone)]
pub struct Param {
    data: Array1<f32>,
    grad: Rc<RefCell<Option<Array1<f32>>>>,
    requires_grad: bool,
}

impl Param {
    /// Create a parameter from raw data
    pub fn new(data: Array1<f32>, requires_grad: bool) -> Self {
        Self {
            data,
            grad: Rc::new(RefCell::new(None)),
            requires_grad,
        }
    }

    /// Create a parameter from a vector
    pub fn from_vec(data: Vec<f32>, requires_grad: bool) -> Self {
        Self::new(Array1::from(data), requires_grad)
    }

    /// Create a zero-initialized parameter
    pub fn zeros(size: usize, requires_grad: bool) -> Self {
        Self::new(Array1::zeros(size), requires_grad)
    }

    /// Get reference to data
    pub fn data(&self) -> &Array1<f32> {
        &self.data
    }

    /// Get mutable reference to data
    pub fn data_mut(&mut self) -> &mut Array1<f32> {
        &mut self.data
    }

    /// Get the accumulated gradient, if any
    pub fn grad(&self) -> Option<Array1<f32>> {
        self.grad.borrow().clone()
    }

    /// Replace the gradient
    pub fn set_grad(&self, grad: Array1<f32>) {
        *self.grad.borrow_mut() = Some(grad);
    }

    /// Accumulate into the gradient slot
    pub fn accumulate_grad(&self, grad: Array1<f32>) {
        let mut slot = self.grad.borrow_mut();
        if let Some(existing) = slot.as_mut() {
            *existing = &*existing + &grad;
        } else {
            *slot = Some(grad);
        }
    }

    /// Clear the gradient slot
    pub fn zero_grad(&self) {
        *self.grad.borrow_mut() = None;
    }

    /// Whether this parameter participates in gradient updates
    pub fn requires_grad(&self) -> bool {
        self.requires_grad
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl std::fmt::Debug for Param {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Param")
            .field("data", &self.data)
            .field("grad", &self.grad.borrow())
            .field("requires_grad", &self.requires_grad)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr1;

    #[test]
    fn test_param_creation() {
        let p = Param::from_vec(vec![1.0, 2.0, 3.0], true);
        assert_eq!(p.len(), 3);
        assert!(p.requires_grad());
        assert!(p.grad().is_none());
    }

    #[test]
    fn test_accumulate_grad() {
        let p = Param::zeros(2, true);
        p.accumulate_grad(arr1(&[1.0, 2.0]));
        p.accumulate_grad(arr1(&[0.5, 0.5]));

        let grad = p.grad().unwrap();
        assert_eq!(grad[0], 1.5);
        assert_eq!(grad[1], 2.5);
    }

    #[test]
    fn test_zero_grad() {
        let p = Param::zeros(2, true);
        p.set_grad(arr1(&[1.0, 1.0]));
        assert!(p.grad().is_some());

        p.zero_grad();
        assert!(p.grad().is_none());
    }

    #[test]
    fn test_data_mut() {
        let mut p = Param::from_vec(vec![1.0, 2.0], true);
        *p.data_mut() = arr1(&[3.0, 4.0]);
        assert_eq!(p.data()[0], 3.0);
        assert_eq!(p.data()[1], 4.0);
    }
}
