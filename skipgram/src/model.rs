//! Embedding parameters and the training step.

use myml::init::xavier_uniform;
use myml::layers::{PairScoreLayer, Pairs};
use myml::loss::{NegativeSamplingLoss, Targets};
use myml::optim::Sgd;
use myml::Loss;
use ndarray::prelude::*;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::batch::Batch;
use crate::error::Error;

/// All trainable state, plus the step counter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelState {
    /// Center-word embeddings, one row per vocabulary word. These are the
    /// word vectors.
    pub q: Array2<f32>,
    /// Context-word embeddings.
    pub r: Array2<f32>,
    /// Per-context-word bias.
    pub b: Array1<f32>,
    /// Number of optimization steps taken so far.
    pub global_step: u64,
}

#[derive(Debug, Clone, Copy)]
pub struct StepStats {
    pub loss: f32,
    pub accuracy: f32,
}

/// A batch flattened into the layout the pair-score layer wants: positive
/// pairs first, then noise pairs.
struct Examples {
    left: Vec<u32>,
    right: Vec<u32>,
    positive: Array1<bool>,
    weight: Array1<f32>,
}

impl Examples {
    fn new(batch: &Batch) -> Self {
        let pos = &batch.positive;
        let neg = &batch.negative;
        let n_pos = pos.centers.len();
        let n_neg = neg.centers.len();
        Examples {
            left: [&pos.centers[..], &neg.centers[..]].concat(),
            right: [&pos.contexts[..], &neg.contexts[..]].concat(),
            positive: (0..n_pos + n_neg).map(|i| i < n_pos).collect(),
            weight: pos
                .weights
                .iter()
                .copied()
                .chain(std::iter::repeat(1.0).take(n_neg))
                .collect(),
        }
    }

    fn pairs(&self) -> Pairs<'_> {
        Pairs::new(&self.left, &self.right)
    }

    fn targets(&self) -> Targets<'_> {
        Targets {
            positive: self.positive.view(),
            weight: self.weight.view(),
        }
    }
}

impl ModelState {
    /// Fresh parameters for `vocab_size` words and `dim`-wide embeddings.
    pub fn new<R: Rng + ?Sized>(vocab_size: usize, dim: usize, rng: &mut R) -> Self {
        ModelState {
            q: xavier_uniform((vocab_size, dim), rng),
            r: xavier_uniform((vocab_size, dim), rng),
            b: xavier_uniform(vocab_size, rng),
            global_step: 0,
        }
    }

    pub fn vocab_size(&self) -> usize {
        self.q.nrows()
    }

    pub fn dim(&self) -> usize {
        self.q.ncols()
    }

    /// Fails if these parameters were not made for `vocab_size` words of
    /// `dim` dimensions.
    pub fn check_shape(&self, vocab_size: usize, dim: usize) -> Result<(), Error> {
        let expected = (vocab_size, dim);
        for found in [self.q.dim(), self.r.dim(), (self.b.len(), dim)] {
            if found != expected {
                return Err(Error::ShapeMismatch { expected, found });
            }
        }
        Ok(())
    }

    fn layer(&self) -> PairScoreLayer {
        PairScoreLayer::new(self.vocab_size(), self.dim())
    }

    /// `dot(Q[center], R[context]) + B[context]`
    pub fn score(&self, center: usize, context: usize) -> f32 {
        self.q.row(center).dot(&self.r.row(context)) + self.b[context]
    }

    /// Loss of `batch` under the current parameters.
    pub fn loss(&self, batch: &Batch) -> f32 {
        let examples = Examples::new(batch);
        let scores = self.scores(&examples);
        NegativeSamplingLoss.loss(examples.targets(), scores.view())
    }

    fn scores(&self, examples: &Examples) -> Array1<f32> {
        let mut scores = Array1::zeros(examples.left.len());
        self.layer().apply(
            self.q.view(),
            self.r.view(),
            self.b.view(),
            examples.pairs(),
            scores.view_mut(),
        );
        scores
    }

    /// Take one gradient descent step on `batch` and bump the step counter.
    ///
    /// All gradients are computed before any parameter changes. Returns the
    /// loss and accuracy measured before the update.
    pub fn step(&mut self, batch: &Batch, sgd: &Sgd) -> StepStats {
        let examples = Examples::new(batch);
        let scores = self.scores(&examples);
        let targets = examples.targets();
        let stats = StepStats {
            loss: NegativeSamplingLoss.loss(targets, scores.view()),
            accuracy: NegativeSamplingLoss.accuracy(targets, scores.view()),
        };

        let dz = NegativeSamplingLoss.deriv(targets, scores.view());
        let grad = self
            .layer()
            .derivatives(self.q.view(), self.r.view(), examples.pairs(), dz.view());
        sgd.apply_rows(self.q.view_mut(), &grad.left);
        sgd.apply_rows(self.r.view_mut(), &grad.right);
        sgd.apply_elements(self.b.view_mut(), &grad.bias);

        self.global_step += 1;
        stats
    }
}
