//! Training and evaluation epochs
//!
//! The two top-level procedures of the crate. `train_one_epoch` drives one
//! pass over a training data source: target transforms, forward pass,
//! distillation-aware loss, backward pass, gradient clipping, optimizer
//! step, and EMA update, with per-batch metric recording. `evaluate` drives
//! one read-only pass with plain cross-entropy and top-k accuracy. Both end
//! with a cross-worker metric reduction and return per-metric global
//! averages.
//!
//! A non-finite loss is the only handled failure: the batch is skipped with
//! a printed notice and contributes no optimizer step, no EMA update, and
//! no metric updates. Everything else (shape mismatches, mismatched loss
//! arity) is a programming or configuration error and panics.

use crate::config::{DistillKind, EngineConfig};
use crate::data::Batch;
use crate::device::{Device, Precision};
use crate::ema::EmaUpdate;
use crate::loss::{cross_entropy, Criterion, LossOutput};
use crate::metrics::{accuracy, MeterSet, ProcessGroup, SmoothedValue};
use crate::model::Model;
use crate::optim::{clip_grad_norm, Optimizer};
use crate::targets::{binarize, one_hot, MixTransform};
use ndarray::Array2;
use std::collections::BTreeMap;

const TRAIN_PRINT_FREQ: usize = 10;
const EVAL_PRINT_FREQ: usize = 100;

/// Train the model for one epoch.
///
/// Per processed batch: exactly one optimizer step and, when an EMA updater
/// is configured, exactly one EMA update strictly after it. Loss targets
/// run through the pure transform pipeline (one-hot, optional mixing,
/// optional binarization) while accuracy is always scored against the
/// untouched ground-truth labels.
///
/// # Arguments
///
/// * `model` - Student model, mutated in place each step
/// * `criterion` - Distillation-aware loss functor; its [`LossOutput`]
///   arity must match `cfg.distillation_type`
/// * `data` - Finite source of training batches, consumed once
/// * `optimizer` - Parameter update rule; its learning rate is recorded
///   into the `lr` meter each step
/// * `device` - Compute target for batches
/// * `epoch` - Epoch index, used in progress headers only
/// * `max_norm` - Optional global gradient-norm clip threshold
/// * `model_ema` - Optional shadow-parameter updater
/// * `mixup` - Optional label-mixing transform
/// * `set_training_mode` - Mode flag forwarded to `model.set_train`
/// * `group` - Process group for the end-of-epoch metric reduction
/// * `cfg` - Recognized configuration fields
///
/// # Returns
///
/// Map from metric name to its epoch-global average across all workers.
#[allow(clippy::too_many_arguments)]
pub fn train_one_epoch<I>(
    model: &mut dyn Model,
    criterion: &mut dyn Criterion,
    data: I,
    optimizer: &mut dyn Optimizer,
    device: Device,
    epoch: usize,
    max_norm: Option<f32>,
    mut model_ema: Option<&mut dyn EmaUpdate>,
    mixup: Option<&dyn MixTransform>,
    set_training_mode: bool,
    group: &dyn ProcessGroup,
    cfg: &EngineConfig,
) -> BTreeMap<String, f64>
where
    I: IntoIterator<Item = Batch>,
{
    model.set_train(set_training_mode);

    let mut meters = MeterSet::new();
    meters.add_meter("lr", SmoothedValue::with_window(1));
    let header = format!("Epoch: [{epoch}]");

    for (i, batch) in data.into_iter().enumerate() {
        let Batch { inputs, labels } = device.transfer(batch);
        let batch_size = labels.len();

        // Target pipeline; `labels` stays untouched for accuracy scoring
        let targets = one_hot(&labels, model.num_classes());
        let (inputs, targets) = match mixup {
            Some(mix) => mix.apply(inputs, targets),
            None => (inputs, targets),
        };
        let targets = if cfg.bce_loss {
            binarize(&targets)
        } else {
            targets
        };

        let outputs = model.forward(&inputs, Precision::Full);
        let loss = criterion.forward(&inputs, &outputs, &targets);
        let (loss_value, grad, components) = combine_loss(loss, cfg);

        let acc = accuracy(&outputs, &labels, &[1, 5]);

        if !loss_value.is_finite() {
            println!("Loss is {loss_value}, skipping this batch");
            continue;
        }

        optimizer.zero_grad(model.parameters());
        model.backward(&grad, optimizer.is_second_order());
        if let Some(max_norm) = max_norm {
            clip_grad_norm(model.parameters(), max_norm);
        }
        optimizer.step(model.parameters());

        device.synchronize();
        if let Some(ema) = model_ema.as_mut() {
            ema.update(model.parameters());
        }

        meters.update("loss", f64::from(loss_value), 1);
        if let Some([base, distill, mid]) = components {
            meters.update("base_loss", f64::from(base), 1);
            meters.update("distillation_loss", f64::from(distill), 1);
            meters.update("mid_loss", f64::from(mid), 1);
        }
        meters.update("lr", f64::from(optimizer.lr()), 1);
        meters.update("acc1", f64::from(acc[0]), batch_size as u64);
        meters.update("acc5", f64::from(acc[1]), batch_size as u64);

        if i % TRAIN_PRINT_FREQ == 0 {
            println!("{header}  [{i}]  {meters}");
        }
    }

    // Gather the stats from all workers
    meters.synchronize(group);
    println!("{header} Averaged stats: {meters}");
    meters.global_averages()
}

/// Evaluate the model over a data source.
///
/// Read-only with respect to parameters: no gradients are produced and no
/// optimizer is involved. The model runs in eval mode unless
/// `use_train_mode` requests train-mode normalization statistics. The
/// forward pass runs at [`Precision::Reduced`] unless `model_name` contains
/// the substring `"base"`.
///
/// Returns the map from metric name to its epoch-global average.
pub fn evaluate<I>(
    data: I,
    model: &mut dyn Model,
    device: Device,
    use_train_mode: bool,
    model_name: &str,
    group: &dyn ProcessGroup,
) -> BTreeMap<String, f64>
where
    I: IntoIterator<Item = Batch>,
{
    model.set_train(use_train_mode);

    let precision = Precision::for_model(model_name);
    let mut meters = MeterSet::new();
    let header = "Test:";

    for (i, batch) in data.into_iter().enumerate() {
        let Batch { inputs, labels } = device.transfer(batch);
        let batch_size = labels.len();

        let outputs = model.forward(&inputs, precision);
        let loss = cross_entropy(&outputs, &labels);
        let acc = accuracy(&outputs, &labels, &[1, 5]);

        meters.update("loss", f64::from(loss), 1);
        meters.update("acc1", f64::from(acc[0]), batch_size as u64);
        meters.update("acc5", f64::from(acc[1]), batch_size as u64);

        if i % EVAL_PRINT_FREQ == 0 {
            println!("{header}  [{i}]  {meters}");
        }
    }

    meters.synchronize(group);

    let stats = meters.global_averages();
    println!(
        "* Acc@1 {:.3} Acc@5 {:.3} loss {:.3}",
        stats.get("acc1").copied().unwrap_or(0.0),
        stats.get("acc5").copied().unwrap_or(0.0),
        stats.get("loss").copied().unwrap_or(0.0),
    );
    stats
}

/// Resolve a criterion result against the configured distillation type.
///
/// Mid distillation combines values and gradients alike with
/// `base*(1-alpha) + distill*alpha + mid*beta` and reports the three raw
/// component values; every other type passes the single term through.
fn combine_loss(
    loss: LossOutput,
    cfg: &EngineConfig,
) -> (f32, Array2<f32>, Option<[f32; 3]>) {
    match (cfg.distillation_type, loss) {
        (DistillKind::Mid, LossOutput::Decomposed { base, distill, mid }) => {
            let alpha = cfg.distillation_alpha;
            let beta = cfg.distillation_beta;
            let value = base.value * (1.0 - alpha) + distill.value * alpha + mid.value * beta;
            let grad = &base.grad * (1.0 - alpha) + &distill.grad * alpha + &mid.grad * beta;
            (value, grad, Some([base.value, distill.value, mid.value]))
        }
        (DistillKind::Mid, LossOutput::Simple(_)) => {
            panic!("Mid distillation requires a decomposed loss")
        }
        (_, LossOutput::Simple(term)) => (term.value, term.grad, None),
        (kind, LossOutput::Decomposed { .. }) => {
            panic!("Decomposed loss is only valid for mid distillation, got {kind:?}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loss::LossTerm;
    use approx::assert_relative_eq;
    use ndarray::array;

    fn term(value: f32, grad: f32) -> LossTerm {
        LossTerm {
            value,
            grad: array![[grad]],
        }
    }

    #[test]
    fn test_combine_simple_passthrough() {
        let cfg = EngineConfig::default();
        let (value, grad, components) =
            combine_loss(LossOutput::Simple(term(0.7, 0.2)), &cfg);

        assert_relative_eq!(value, 0.7);
        assert_relative_eq!(grad[[0, 0]], 0.2);
        assert!(components.is_none());
    }

    #[test]
    fn test_combine_mid_formula() {
        let cfg = EngineConfig::new().with_distillation(DistillKind::Mid, 0.25, 2.0);
        let loss = LossOutput::Decomposed {
            base: term(1.0, 0.1),
            distill: term(2.0, 0.2),
            mid: term(3.0, 0.3),
        };

        let (value, grad, components) = combine_loss(loss, &cfg);

        // 1.0*0.75 + 2.0*0.25 + 3.0*2.0
        assert_relative_eq!(value, 7.25, epsilon = 1e-6);
        assert_relative_eq!(grad[[0, 0]], 0.1 * 0.75 + 0.2 * 0.25 + 0.3 * 2.0, epsilon = 1e-6);
        assert_eq!(components, Some([1.0, 2.0, 3.0]));
    }

    #[test]
    fn test_combine_mid_alpha_extremes() {
        for alpha in [0.0_f32, 1.0] {
            let cfg = EngineConfig::new().with_distillation(DistillKind::Mid, alpha, 0.0);
            let loss = LossOutput::Decomposed {
                base: term(1.0, 0.0),
                distill: term(2.0, 0.0),
                mid: term(5.0, 0.0),
            };
            let (value, _, _) = combine_loss(loss, &cfg);
            let expected = 1.0 * (1.0 - alpha) + 2.0 * alpha;
            assert_relative_eq!(value, expected, epsilon = 1e-6);
        }
    }

    #[test]
    #[should_panic(expected = "requires a decomposed loss")]
    fn test_combine_rejects_simple_for_mid() {
        let cfg = EngineConfig::new().with_distillation(DistillKind::Mid, 0.5, 0.5);
        combine_loss(LossOutput::Simple(term(1.0, 0.0)), &cfg);
    }

    #[test]
    #[should_panic(expected = "only valid for mid distillation")]
    fn test_combine_rejects_decomposed_for_soft() {
        let cfg = EngineConfig::new().with_distillation(DistillKind::Soft, 0.5, 0.5);
        let loss = LossOutput::Decomposed {
            base: term(1.0, 0.0),
            distill: term(2.0, 0.0),
            mid: term(3.0, 0.0),
        };
        combine_loss(loss, &cfg);
    }
}
