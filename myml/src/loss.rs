//! Loss functions.

use ndarray::prelude::*;
use ndarray::Zip;

use crate::layers::LogSigmoid;
use crate::traits::{ActivationFn, Loss};

/// Targets for [`NegativeSamplingLoss`]: which examples are real (positive)
/// pairs and how much each example counts.
#[derive(Debug, Clone, Copy)]
pub struct Targets<'a> {
    pub positive: ArrayView1<'a, bool>,
    pub weight: ArrayView1<'a, f32>,
}

/// Loss for noise-contrastive training of pair scores.
///
/// Unlike [`Loss`] implementations that expect probabilities, `yh` here is
/// the raw score (a logit). The loss is a weighted sum over the batch:
///
/// ```text
/// L = -Σ w_i log σ(s_i)   for positive examples
///     -Σ w_j log σ(-s_j)  for noise examples
/// ```
#[derive(Debug, Clone, Copy)]
pub struct NegativeSamplingLoss;

fn sign(positive: bool) -> f32 {
    if positive {
        1.0
    } else {
        -1.0
    }
}

impl<'a> Loss<Ix1, Targets<'a>> for NegativeSamplingLoss {
    fn loss(&self, y: Targets<'a>, yh: ArrayView1<'_, f32>) -> f32 {
        assert_eq!(y.positive.len(), yh.len());
        Zip::from(&y.positive)
            .and(&y.weight)
            .and(&yh)
            .fold(0.0, |total, &pos, &w, &s| {
                total - w * LogSigmoid.f(sign(pos) * s)
            })
    }

    fn deriv(&self, y: Targets<'a>, yh: ArrayView1<'_, f32>) -> Array1<f32> {
        assert_eq!(y.positive.len(), yh.len());
        Zip::from(&y.positive)
            .and(&y.weight)
            .and(&yh)
            .map_collect(|&pos, &w, &s| {
                let k = sign(pos);
                -w * k * LogSigmoid.df(k * s)
            })
    }

    /// Fraction of examples that land on the correct side of zero.
    fn accuracy(&self, y: Targets<'a>, yh: ArrayView1<'_, f32>) -> f32 {
        let n = yh.len();
        if n == 0 {
            return 1.0;
        }
        let mut num_good = 0;
        Zip::from(&y.positive).and(&yh).for_each(|&pos, &s| {
            if pos == (s > 0.0) {
                num_good += 1;
            }
        });
        num_good as f32 / n as f32
    }
}
