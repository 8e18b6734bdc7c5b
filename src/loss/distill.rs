//! Distillation-aware training criterion

use super::cross_entropy::{softmax_2d, BaseLoss, SoftTargetCrossEntropy};
use crate::config::DistillKind;
use crate::device::Precision;
use crate::model::Model;
use ndarray::{Array2, Axis};

/// A scalar loss together with its gradient w.r.t. the model outputs
#[derive(Debug, Clone)]
pub struct LossTerm {
    /// Batch-mean loss value
    pub value: f32,
    /// Gradient of the value with respect to the logits
    pub grad: Array2<f32>,
}

/// The shape of a criterion's result, tagged by arity.
///
/// `Simple` carries one ready-to-use term; `Decomposed` carries the three
/// components of mid distillation, which the engine combines as
/// `base*(1-alpha) + distill*alpha + mid*beta`. The variant must match the
/// configured [`DistillKind`]; a mismatch is a configuration bug.
#[derive(Debug, Clone)]
pub enum LossOutput {
    /// A single combined loss
    Simple(LossTerm),
    /// Mid distillation components, combined by the caller
    Decomposed {
        /// Base task loss
        base: LossTerm,
        /// Teacher-distribution distillation loss
        distill: LossTerm,
        /// Teacher-alignment loss
        mid: LossTerm,
    },
}

/// Training loss functor: inputs, model outputs, and (possibly transformed)
/// dense targets in, a tagged [`LossOutput`] out.
pub trait Criterion {
    /// Compute the loss for one batch
    fn forward(
        &mut self,
        inputs: &Array2<f32>,
        outputs: &Array2<f32>,
        targets: &Array2<f32>,
    ) -> LossOutput;
}

/// Combines a base task loss with a teacher-distillation term.
///
/// The teacher model runs a full-precision forward pass on the same inputs
/// the student consumed; its parameters never receive gradients. For
/// [`DistillKind::Soft`] and [`DistillKind::Hard`] the base and
/// distillation terms are blended internally with weight `alpha`; for
/// [`DistillKind::Mid`] the three terms are returned decomposed.
///
/// # Example
///
/// ```no_run
/// use destilar::config::DistillKind;
/// use destilar::loss::{DistillationCriterion, SoftTargetCrossEntropy};
/// # let teacher: Box<dyn destilar::Model> = todo!();
///
/// let criterion = DistillationCriterion::new(
///     Box::new(SoftTargetCrossEntropy),
///     teacher,
///     DistillKind::Soft,
///     0.5,
///     3.0,
/// );
/// ```
pub struct DistillationCriterion {
    base: Box<dyn BaseLoss>,
    teacher: Option<Box<dyn Model>>,
    kind: DistillKind,
    alpha: f32,
    tau: f32,
}

impl DistillationCriterion {
    /// Create a distillation criterion with a teacher model
    ///
    /// # Arguments
    ///
    /// * `base` - Base task loss over the (possibly transformed) targets
    /// * `teacher` - Teacher model queried once per batch
    /// * `kind` - Distillation variant
    /// * `alpha` - Distillation weight in `[0, 1]` for soft/hard blending
    /// * `tau` - Softening temperature
    ///
    /// # Panics
    ///
    /// Panics if `tau <= 0` or `alpha` is outside `[0, 1]`.
    pub fn new(
        base: Box<dyn BaseLoss>,
        teacher: Box<dyn Model>,
        kind: DistillKind,
        alpha: f32,
        tau: f32,
    ) -> Self {
        assert!(tau > 0.0, "Temperature must be positive, got {tau}");
        assert!(
            (0.0..=1.0).contains(&alpha),
            "Alpha must be in [0, 1], got {alpha}"
        );

        Self {
            base,
            teacher: Some(teacher),
            kind,
            alpha,
            tau,
        }
    }

    /// Create a criterion that applies the base loss alone
    pub fn without_teacher(base: Box<dyn BaseLoss>) -> Self {
        Self {
            base,
            teacher: None,
            kind: DistillKind::None,
            alpha: 0.0,
            tau: 1.0,
        }
    }

    fn teacher_logits(&mut self, inputs: &Array2<f32>) -> Array2<f32> {
        let teacher = self
            .teacher
            .as_mut()
            .expect("Distillation requires a teacher model");
        teacher.forward(inputs, Precision::Full)
    }
}

impl Criterion for DistillationCriterion {
    fn forward(
        &mut self,
        inputs: &Array2<f32>,
        outputs: &Array2<f32>,
        targets: &Array2<f32>,
    ) -> LossOutput {
        let base = self.base.forward(outputs, targets);

        match self.kind {
            DistillKind::None => LossOutput::Simple(base),
            DistillKind::Soft => {
                let teacher_logits = self.teacher_logits(inputs);
                let distill = soft_distillation(outputs, &teacher_logits, self.tau);
                LossOutput::Simple(blend(&base, &distill, self.alpha))
            }
            DistillKind::Hard => {
                let teacher_logits = self.teacher_logits(inputs);
                let distill = hard_distillation(outputs, &teacher_logits);
                LossOutput::Simple(blend(&base, &distill, self.alpha))
            }
            DistillKind::Mid => {
                let teacher_logits = self.teacher_logits(inputs);
                let distill = soft_distillation(outputs, &teacher_logits, self.tau);
                let mid = alignment_loss(outputs, &teacher_logits);
                LossOutput::Decomposed { base, distill, mid }
            }
        }
    }
}

/// `base*(1-alpha) + distill*alpha`, values and gradients alike
fn blend(base: &LossTerm, distill: &LossTerm, alpha: f32) -> LossTerm {
    LossTerm {
        value: base.value * (1.0 - alpha) + distill.value * alpha,
        grad: &base.grad * (1.0 - alpha) + &distill.grad * alpha,
    }
}

/// Temperature-scaled KL divergence against the teacher distribution
///
/// `tau² * KL(softmax(teacher/tau) || softmax(student/tau))`, batch mean.
fn soft_distillation(student: &Array2<f32>, teacher: &Array2<f32>, tau: f32) -> LossTerm {
    assert_eq!(
        student.shape(),
        teacher.shape(),
        "Student and teacher logits must have the same shape"
    );

    let batch_size = student.nrows() as f32;
    let student_soft = softmax_2d(&(student / tau));
    let teacher_soft = softmax_2d(&(teacher / tau));

    let value = kl_divergence(&teacher_soft, &student_soft) * tau * tau;
    let grad = (&student_soft - &teacher_soft) * (tau / batch_size);

    LossTerm { value, grad }
}

/// Cross-entropy against the teacher's argmax labels
fn hard_distillation(student: &Array2<f32>, teacher: &Array2<f32>) -> LossTerm {
    assert_eq!(
        student.shape(),
        teacher.shape(),
        "Student and teacher logits must have the same shape"
    );

    let labels: Vec<usize> = teacher
        .axis_iter(Axis(0))
        .map(|row| {
            row.iter()
                .enumerate()
                .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap())
                .map(|(idx, _)| idx)
                .unwrap_or(0)
        })
        .collect();
    let hard_targets = crate::targets::one_hot(&labels, teacher.ncols());

    SoftTargetCrossEntropy.forward(student, &hard_targets)
}

/// Mean-squared alignment of student logits onto the teacher's
fn alignment_loss(student: &Array2<f32>, teacher: &Array2<f32>) -> LossTerm {
    assert_eq!(
        student.shape(),
        teacher.shape(),
        "Student and teacher logits must have the same shape"
    );

    let n = student.len() as f32;
    let diff = student - teacher;
    let value = diff.mapv(|d| d * d).sum() / n;
    let grad = diff * (2.0 / n);

    LossTerm { value, grad }
}

/// `KL(p || q)` between row distributions, batch mean
fn kl_divergence(p: &Array2<f32>, q: &Array2<f32>) -> f32 {
    assert_eq!(p.shape(), q.shape());

    let mut total_kl = 0.0;
    for (p_row, q_row) in p.axis_iter(Axis(0)).zip(q.axis_iter(Axis(0))) {
        let mut kl = 0.0;
        for (&p_i, &q_i) in p_row.iter().zip(q_row.iter()) {
            if p_i > 1e-10 {
                kl += p_i * (p_i / q_i.max(1e-10)).ln();
            }
        }
        total_kl += kl;
    }

    total_kl / p.nrows() as f32
}
