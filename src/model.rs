//! Model abstraction and a linear reference classifier

use crate::device::{reduce_precision, Precision};
use crate::param::Param;
use ndarray::{Array1, Array2};
use rand::Rng;

/// A classifier the engine can drive.
///
/// The engine only needs forward computation, gradient accumulation into
/// the parameter slots, train/eval mode switching, and the class count for
/// target encoding. Architecture lives entirely behind this trait.
pub trait Model {
    /// Compute logits `[batch, classes]` for a batch of inputs
    fn forward(&mut self, inputs: &Array2<f32>, precision: Precision) -> Array2<f32>;

    /// Accumulate parameter gradients from the gradient of the loss with
    /// respect to the outputs of the most recent forward pass.
    ///
    /// `create_graph` requests a second-order (differentiable) gradient
    /// graph for optimizers that declare the capability.
    fn backward(&mut self, grad_output: &Array2<f32>, create_graph: bool);

    /// Trainable parameters, in a stable order
    fn parameters(&mut self) -> &mut [Param];

    /// Switch between training and evaluation behavior
    fn set_train(&mut self, training: bool);

    /// Number of output classes
    fn num_classes(&self) -> usize;
}

/// Single-layer softmax classifier: `logits = W x + b`.
///
/// The reference [`Model`] implementation. Parameters are a row-major
/// weight matrix flattened to one [`Param`] plus a bias vector; the
/// backward pass computes the analytic gradients from the cached forward
/// inputs.
///
/// # Example
///
/// ```
/// use destilar::model::{LinearClassifier, Model};
/// use destilar::Precision;
/// use ndarray::array;
///
/// let mut model = LinearClassifier::new(4, 3);
/// let logits = model.forward(&array![[0.1, 0.2, 0.3, 0.4]], Precision::Full);
/// assert_eq!(logits.dim(), (1, 3));
/// ```
pub struct LinearClassifier {
    params: Vec<Param>,
    in_features: usize,
    num_classes: usize,
    training: bool,
    cached_inputs: Option<Array2<f32>>,
}

impl LinearClassifier {
    /// Create a classifier with uniform random initialization
    pub fn new(in_features: usize, num_classes: usize) -> Self {
        let bound = 1.0 / (in_features as f32).sqrt();
        let mut rng = rand::thread_rng();
        let weights: Vec<f32> = (0..num_classes * in_features)
            .map(|_| rng.gen_range(-bound..bound))
            .collect();

        Self::from_flat(weights, vec![0.0; num_classes], in_features, num_classes)
    }

    /// Create a classifier from explicit weights `[classes, features]` and
    /// a bias vector
    ///
    /// # Panics
    ///
    /// Panics if the bias length does not match the weight row count.
    pub fn from_weights(weights: Array2<f32>, bias: Array1<f32>) -> Self {
        let (num_classes, in_features) = weights.dim();
        assert_eq!(
            bias.len(),
            num_classes,
            "Bias length must match the number of classes"
        );

        let flat: Vec<f32> = weights.iter().copied().collect();
        Self::from_flat(flat, bias.to_vec(), in_features, num_classes)
    }

    fn from_flat(
        weights: Vec<f32>,
        bias: Vec<f32>,
        in_features: usize,
        num_classes: usize,
    ) -> Self {
        Self {
            params: vec![
                Param::from_vec(weights, true),
                Param::from_vec(bias, true),
            ],
            in_features,
            num_classes,
            training: true,
            cached_inputs: None,
        }
    }

    /// Input feature count
    pub fn in_features(&self) -> usize {
        self.in_features
    }

    /// Whether the model is in training mode
    pub fn is_training(&self) -> bool {
        self.training
    }
}

impl Model for LinearClassifier {
    fn forward(&mut self, inputs: &Array2<f32>, precision: Precision) -> Array2<f32> {
        assert_eq!(
            inputs.ncols(),
            self.in_features,
            "Input features do not match the classifier"
        );

        let weights = self.params[0].data();
        let bias = self.params[1].data();

        let mut logits = Array2::zeros((inputs.nrows(), self.num_classes));
        for (b, row) in inputs.rows().into_iter().enumerate() {
            for c in 0..self.num_classes {
                let offset = c * self.in_features;
                let mut acc = bias[c];
                for (f, &x) in row.iter().enumerate() {
                    acc += weights[offset + f] * x;
                }
                logits[[b, c]] = acc;
            }
        }

        if precision == Precision::Reduced {
            logits.mapv_inplace(reduce_precision);
        }

        self.cached_inputs = Some(inputs.clone());
        logits
    }

    fn backward(&mut self, grad_output: &Array2<f32>, _create_graph: bool) {
        // A linear map has no second-order terms; create_graph is moot here
        let inputs = self
            .cached_inputs
            .as_ref()
            .expect("backward called before forward");
        assert_eq!(
            grad_output.dim(),
            (inputs.nrows(), self.num_classes),
            "Output gradient shape does not match the last forward pass"
        );

        let mut weight_grad = Array1::zeros(self.num_classes * self.in_features);
        let mut bias_grad = Array1::zeros(self.num_classes);

        for (b, x_row) in inputs.rows().into_iter().enumerate() {
            for c in 0..self.num_classes {
                let g = grad_output[[b, c]];
                if g == 0.0 {
                    continue;
                }
                bias_grad[c] += g;
                let offset = c * self.in_features;
                for (f, &x) in x_row.iter().enumerate() {
                    weight_grad[offset + f] += g * x;
                }
            }
        }

        if self.params[0].requires_grad() {
            self.params[0].accumulate_grad(weight_grad);
        }
        if self.params[1].requires_grad() {
            self.params[1].accumulate_grad(bias_grad);
        }
    }

    fn parameters(&mut self) -> &mut [Param] {
        &mut self.params
    }

    fn set_train(&mut self, training: bool) {
        self.training = training;
    }

    fn num_classes(&self) -> usize {
        self.num_classes
    }
}
