//! Subsampling weights and the noise distribution.

use crate::error::Error;

/// Words much more frequent than this are down-weighted.
pub const SUBSAMPLE_THRESHOLD: f64 = 1e-5;

/// Exponent applied to word counts to smooth the noise distribution.
pub const NOISE_POWER: f64 = 2.0 / 3.0;

fn normalized(mut v: Vec<f64>, what: &'static str) -> Result<Vec<f64>, Error> {
    let total: f64 = v.iter().sum();
    if total == 0.0 || !total.is_finite() {
        return Err(Error::DegenerateDistribution(what));
    }
    for x in &mut v {
        *x /= total;
    }
    Ok(v)
}

/// Per-word keep ratio `1 - sqrt(t / f)`.
///
/// `f` is the word's count divided by the vocabulary size, not by the corpus
/// length. Ratios for rare words can be negative and are left that way.
pub fn subsample_ratios(counts: &[u64]) -> Vec<f64> {
    let vocab_size = counts.len() as f64;
    counts
        .iter()
        .map(|&c| {
            let freq = c as f64 / vocab_size;
            1.0 - (SUBSAMPLE_THRESHOLD / freq).sqrt()
        })
        .collect()
}

/// Weight of each center position, normalized to sum to 1.
///
/// Only positions `window..content.len() - window` have a full context on
/// both sides; element `i` of the result is the weight of position
/// `i + window`.
pub fn subsample_weights(counts: &[u64], content: &[u32], window: usize) -> Result<Vec<f64>, Error> {
    if content.len() <= 2 * window {
        return Err(Error::DegenerateDistribution(
            "corpus is too short for the context window",
        ));
    }
    let ratio = subsample_ratios(counts);
    let weights = content[window..content.len() - window]
        .iter()
        .map(|&i| ratio[i as usize])
        .collect();
    normalized(weights, "subsample weights sum to zero")
}

/// Probability of drawing each word as noise, proportional to
/// `count^(2/3)`.
pub fn noise_distribution(counts: &[u64]) -> Result<Vec<f64>, Error> {
    let noise = counts.iter().map(|&c| (c as f64).powf(NOISE_POWER)).collect();
    normalized(noise, "noise distribution over an empty vocabulary")
}

/// Expand `noise_pd` into a table where word `i` appears
/// `floor(noise_pd[i] * scale)` times, so a uniform draw from the table is a
/// draw from the noise distribution.
///
/// `scale` is the corpus length, raised if needed so that a word of average
/// probability gets at least `noise_size` slots.
pub fn noise_table(noise_pd: &[f64], corpus_len: usize, noise_size: usize) -> Result<Vec<u32>, Error> {
    let scale = corpus_len.max(noise_size.saturating_mul(noise_pd.len())) as f64;
    let mut table = Vec::with_capacity(scale as usize);
    for (i, &p) in noise_pd.iter().enumerate() {
        let n = (p * scale) as usize;
        table.extend(std::iter::repeat(i as u32).take(n));
    }
    if table.is_empty() {
        return Err(Error::DegenerateDistribution("noise table is empty"));
    }
    Ok(table)
}
