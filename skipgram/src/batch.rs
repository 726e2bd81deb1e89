//! Drawing training pairs.

use rand::distributions::{Distribution, Uniform};
use rand::Rng;

use crate::corpus::Corpus;
use crate::error::Error;
use crate::sampling::noise_table;

/// Real (center, context) pairs taken from the text.
#[derive(Debug, Clone, Default)]
pub struct PositivePairs {
    /// Corpus position of each center word.
    pub positions: Vec<usize>,
    /// Offset from center to context, in `-window..0`.
    pub offsets: Vec<isize>,
    pub centers: Vec<u32>,
    pub contexts: Vec<u32>,
    /// Loss weight of each pair: the center's subsample weight, scaled so the
    /// weights of all center positions average to 1.
    pub weights: Vec<f32>,
}

/// Pairs of words drawn independently from the noise distribution.
#[derive(Debug, Clone, Default)]
pub struct NoisePairs {
    pub centers: Vec<u32>,
    pub contexts: Vec<u32>,
}

#[derive(Debug, Clone, Default)]
pub struct Batch {
    pub positive: PositivePairs,
    pub negative: NoisePairs,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.positive.centers.len() + self.negative.centers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub struct BatchSampler<'c> {
    corpus: &'c Corpus,
    loss_weights: Vec<f32>,
    noise_table: Vec<u32>,
    batch_size: usize,
    centers: Uniform<usize>,
    offsets: Uniform<isize>,
    noise: Uniform<usize>,
}

impl<'c> BatchSampler<'c> {
    pub fn new(corpus: &'c Corpus, batch_size: usize, noise_size: usize) -> Result<Self, Error> {
        let w = corpus.window_size;
        if w == 0 {
            return Err(Error::InvalidConfig("window size must be at least 1".to_string()));
        }
        if corpus.len() <= 2 * w || corpus.content_pd.len() != corpus.len() - 2 * w {
            return Err(Error::DegenerateDistribution(
                "corpus is too short for the context window",
            ));
        }

        let n = corpus.content_pd.len() as f64;
        let loss_weights = corpus
            .content_pd
            .iter()
            .map(|&p| (p * n) as f32)
            .collect();
        let noise_table = noise_table(&corpus.noise_pd, corpus.len(), noise_size)?;
        let noise = Uniform::new(0, noise_table.len());

        Ok(BatchSampler {
            corpus,
            loss_weights,
            noise_table,
            batch_size,
            centers: Uniform::new(w, corpus.len() - w),
            offsets: Uniform::new(-(w as isize), 0),
            noise,
        })
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn noise_table(&self) -> &[u32] {
        &self.noise_table
    }

    /// Draw `batch_size` positive pairs and `batch_size` noise pairs.
    ///
    /// Centers are uniform over the positions that have a subsample weight;
    /// the weight goes into the loss rather than into the choice of center.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Batch {
        let content = &self.corpus.content;
        let w = self.corpus.window_size;
        let n = self.batch_size;

        let mut positive = PositivePairs {
            positions: Vec::with_capacity(n),
            offsets: Vec::with_capacity(n),
            centers: Vec::with_capacity(n),
            contexts: Vec::with_capacity(n),
            weights: Vec::with_capacity(n),
        };
        for _ in 0..n {
            let pos = self.centers.sample(rng);
            let offset = self.offsets.sample(rng);
            let ctx = pos
                .checked_add_signed(offset)
                .expect("center is at least one window from the start");
            positive.positions.push(pos);
            positive.offsets.push(offset);
            positive.centers.push(content[pos]);
            positive.contexts.push(content[ctx]);
            positive.weights.push(self.loss_weights[pos - w]);
        }

        let mut negative = NoisePairs {
            centers: Vec::with_capacity(n),
            contexts: Vec::with_capacity(n),
        };
        for _ in 0..n {
            negative.centers.push(self.noise_table[self.noise.sample(rng)]);
            negative.contexts.push(self.noise_table[self.noise.sample(rng)]);
        }

        Batch { positive, negative }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn corpus(window: usize) -> Corpus {
        let text = "a b a c a b d e a b c a f g a b a c h a b i j a";
        let tokens: Vec<&str> = text.split_whitespace().collect();
        Corpus::from_tokens(&tokens, 8, "*UNKNOWN*", window).unwrap()
    }

    #[test]
    fn samples_stay_in_bounds() {
        let c = corpus(3);
        let sampler = BatchSampler::new(&c, 500, 4).unwrap();
        let mut rng = StdRng::seed_from_u64(11);
        let v = c.domain.len() as u32;
        for _ in 0..5 {
            let batch = sampler.sample(&mut rng);
            assert_eq!(batch.positive.centers.len(), 500);
            assert_eq!(batch.negative.centers.len(), 500);
            for (&pos, &off) in batch.positive.positions.iter().zip(&batch.positive.offsets) {
                // the last `window` positions carry no weight and are never centers
                assert!(3 <= pos && pos < c.len() - 3);
                assert!((-3..0).contains(&off));
            }
            let all = batch
                .positive
                .centers
                .iter()
                .chain(&batch.positive.contexts)
                .chain(&batch.negative.centers)
                .chain(&batch.negative.contexts);
            assert!(all.into_iter().all(|&i| i < v));
        }
    }

    #[test]
    fn pairs_match_the_text() {
        let c = corpus(2);
        let sampler = BatchSampler::new(&c, 200, 4).unwrap();
        let batch = sampler.sample(&mut StdRng::seed_from_u64(3));
        let p = &batch.positive;
        for i in 0..p.centers.len() {
            let pos = p.positions[i];
            assert_eq!(p.centers[i], c.content[pos]);
            assert_eq!(p.contexts[i], c.content[(pos as isize + p.offsets[i]) as usize]);
            let expected = (c.content_pd[pos - 2] * c.content_pd.len() as f64) as f32;
            assert_eq!(p.weights[i], expected);
        }
    }

    #[test]
    fn loss_weights_average_one() {
        let c = corpus(2);
        let sampler = BatchSampler::new(&c, 1, 4).unwrap();
        let mean = sampler.loss_weights.iter().sum::<f32>() / sampler.loss_weights.len() as f32;
        assert!((mean - 1.0).abs() < 1e-5);
    }

    #[test]
    fn zero_window_is_rejected() {
        let tokens = ["a", "b", "c"];
        let mut c = Corpus::from_tokens(&tokens, 8, "*UNKNOWN*", 1).unwrap();
        c.window_size = 0;
        assert!(BatchSampler::new(&c, 10, 4).is_err());
    }
}
