// ============================================================
// Layer 5 — Gradient Norm Clipping
// ============================================================
// Caps the L2 norm of the whole gradient, taken over every
// parameter of the model at once:
//
//   norm = sqrt(sum over parameters of sum(g * g))
//   if norm > max_norm:
//       every g *= max_norm / norm
//
// All gradients share one scale factor, so the update keeps its
// direction and only its length shrinks. Recurrent models need
// this: one long sequence can blow the gradient up by orders of
// magnitude.
//
// Gradients live on the inner (non-autodiff) backend, keyed by
// parameter id; the module visitor walks the model to find them.
//
// Reference: Pascanu et al. (2013) On the difficulty of training RNNs

use burn::{
    module::{AutodiffModule, ModuleVisitor, ParamId},
    optim::GradientsParams,
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use std::marker::PhantomData;

// ─── Norm ─────────────────────────────────────────────────────────────────────
struct SquaredNorm<'a, B: AutodiffBackend> {
    grads: &'a GradientsParams,
    total: f64,
    _backend: PhantomData<B>,
}

impl<B: AutodiffBackend> ModuleVisitor<B> for SquaredNorm<'_, B> {
    fn visit_float<const D: usize>(&mut self, id: ParamId, _tensor: &Tensor<B, D>) {
        if let Some(grad) = self.grads.get::<B::InnerBackend, D>(id) {
            self.total += (grad.clone() * grad).sum().into_scalar().elem::<f64>();
        }
    }
}

/// Global L2 norm of `grads` over every parameter of `model`.
pub fn grad_norm<B, M>(model: &M, grads: &GradientsParams) -> f64
where
    B: AutodiffBackend,
    M: AutodiffModule<B>,
{
    let mut visitor = SquaredNorm::<B> { grads, total: 0.0, _backend: PhantomData };
    model.visit(&mut visitor);
    visitor.total.sqrt()
}

// ─── Clip ─────────────────────────────────────────────────────────────────────
struct Rescale<'a, B: AutodiffBackend> {
    grads:  &'a mut GradientsParams,
    factor: f64,
    _backend: PhantomData<B>,
}

impl<B: AutodiffBackend> ModuleVisitor<B> for Rescale<'_, B> {
    fn visit_float<const D: usize>(&mut self, id: ParamId, _tensor: &Tensor<B, D>) {
        if let Some(grad) = self.grads.remove::<B::InnerBackend, D>(id) {
            self.grads.register::<B::InnerBackend, D>(id, grad.mul_scalar(self.factor));
        }
    }
}

/// Scale all gradients by `min(1, max_norm / norm)`. Returns the norm
/// measured before clipping.
pub fn clip_grad_norm<B, M>(model: &M, grads: &mut GradientsParams, max_norm: f64) -> f64
where
    B: AutodiffBackend,
    M: AutodiffModule<B>,
{
    let norm = grad_norm::<B, M>(model, grads);

    if norm > max_norm {
        let mut visitor = Rescale::<B> { grads, factor: max_norm / norm, _backend: PhantomData };
        model.visit(&mut visitor);
    }
    norm
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{Autodiff, NdArray};

    use crate::ml::model::{nll_loss, LstmClassifier, LstmClassifierConfig, SequenceClassifier};

    type TestBackend = Autodiff<NdArray>;

    /// Model plus the gradients of a deliberately large loss.
    fn model_and_grads() -> (LstmClassifier<TestBackend>, GradientsParams) {
        let device = Default::default();
        let model: LstmClassifier<TestBackend> =
            LstmClassifierConfig::new(6, 3, 3, 2, 4, 0.0, 0.0).init(&device);

        let tokens = Tensor::<TestBackend, 1, Int>::from_ints([1, 2, 3, 4, 5, 0, 3, 3, 1, 2, 2, 2], &device)
            .reshape([3, 4]);
        let labels = Tensor::<TestBackend, 1, Int>::from_ints([0, 1, 2], &device);

        let hidden = model.init_hidden(3, &device);
        let loss   = nll_loss(model.forward(tokens, hidden), labels).mul_scalar(1000.0);
        let grads  = GradientsParams::from_grads(loss.backward(), &model);
        (model, grads)
    }

    fn grad_of<const D: usize>(grads: &GradientsParams, id: ParamId) -> Vec<f32> {
        grads
            .get::<NdArray, D>(id)
            .unwrap()
            .into_data()
            .to_vec::<f32>()
            .unwrap()
    }

    #[test]
    fn test_global_norm_capped_at_ceiling() {
        let (model, mut grads) = model_and_grads();
        let before = grad_norm::<TestBackend, _>(&model, &grads);
        assert!(before > 0.5, "loss too small to exercise clipping: {before}");

        let reported = clip_grad_norm::<TestBackend, _>(&model, &mut grads, 0.5);
        let after    = grad_norm::<TestBackend, _>(&model, &grads);

        assert!((reported - before).abs() < 1e-9);
        assert!(after <= 0.5 * (1.0 + 1e-4), "global norm after clipping = {after}");
        assert!(after >= 0.5 * (1.0 - 1e-4));
    }

    #[test]
    fn test_every_parameter_scaled_by_same_factor() {
        let (model, mut grads) = model_and_grads();
        let emb_id = model.embedding.weight.id;
        let out_id = model.output.weight.id;

        let emb_before = grad_of::<2>(&grads, emb_id);
        let out_before = grad_of::<2>(&grads, out_id);
        let before     = clip_grad_norm::<TestBackend, _>(&model, &mut grads, 0.5);
        let factor     = (0.5 / before) as f32;

        for (b, a) in emb_before.iter().zip(grad_of::<2>(&grads, emb_id)) {
            assert!((b * factor - a).abs() <= 1e-5 * b.abs().max(1.0));
        }
        for (b, a) in out_before.iter().zip(grad_of::<2>(&grads, out_id)) {
            assert!((b * factor - a).abs() <= 1e-5 * b.abs().max(1.0));
        }
    }

    #[test]
    fn test_small_gradient_left_alone() {
        let (model, mut grads) = model_and_grads();
        let out_id = model.output.weight.id;
        let before = grad_of::<2>(&grads, out_id);

        let norm = clip_grad_norm::<TestBackend, _>(&model, &mut grads, f64::MAX);

        assert_eq!(grad_of::<2>(&grads, out_id), before);
        assert!((grad_norm::<TestBackend, _>(&model, &grads) - norm).abs() < 1e-9);
    }
}
