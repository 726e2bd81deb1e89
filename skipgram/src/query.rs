//! Nearest-neighbor and analogy queries over an embedding matrix.

use std::cmp::Reverse;

use ndarray::prelude::*;
use ordered_float::OrderedFloat;
use rayon::prelude::*;

use crate::error::Error;

/// Maps between words and row indices of an embedding matrix.
pub trait Lexicon {
    fn len(&self) -> usize;
    fn word(&self, index: usize) -> &str;
    fn lookup(&self, word: &str) -> Option<usize>;
}

pub fn norm(v: ArrayView1<'_, f32>) -> f32 {
    v.dot(&v).sqrt()
}

/// Scale `v` to unit length. Zero vectors are left alone.
pub fn normalize(mut v: ArrayViewMut1<'_, f32>) {
    let len = norm(v.view());
    if len > 0.0 {
        v /= len;
    }
}

/// One query result.
#[derive(Debug, Clone, PartialEq)]
pub struct Neighbor<'a> {
    pub word: &'a str,
    pub index: usize,
    pub score: f32,
}

/// Answers queries against a read-only view of an embedding matrix, one row
/// per word of `lexicon`.
pub struct QueryEngine<'a, L: ?Sized> {
    lexicon: &'a L,
    embeddings: ArrayView2<'a, f32>,
}

impl<'a, L> QueryEngine<'a, L>
where
    L: Lexicon + ?Sized,
{
    pub fn new(lexicon: &'a L, embeddings: ArrayView2<'a, f32>) -> Self {
        assert_eq!(
            embeddings.nrows(),
            lexicon.len(),
            "embedding matrix should have one row per word"
        );
        QueryEngine {
            lexicon,
            embeddings,
        }
    }

    pub fn index(&self, word: &str) -> Result<usize, Error> {
        self.lexicon
            .lookup(word)
            .ok_or_else(|| Error::NotFound(word.to_string()))
    }

    pub fn vector(&self, word: &str) -> Result<ArrayView1<'a, f32>, Error> {
        Ok(self.embeddings.index_axis_move(Axis(0), self.index(word)?))
    }

    /// The `k` words whose vectors have the highest cosine similarity with
    /// `word`'s vector. The word itself is among the candidates.
    pub fn nearest(&self, word: &str, k: usize) -> Result<Vec<Neighbor<'a>>, Error> {
        let target = self.vector(word)?;
        Ok(self.by_cosine(target, k, &[]))
    }

    /// Solve "`a` is to `b` as `c` is to ?": the `k` words whose vectors have
    /// the highest dot product with `b - a + c`.
    pub fn analogy(&self, a: &str, b: &str, c: &str, k: usize) -> Result<Vec<Neighbor<'a>>, Error> {
        let target = &self.vector(b)? - &self.vector(a)? + &self.vector(c)?;
        Ok(self.by_dot(target.view(), k, &[]))
    }

    /// Top `k` rows by cosine similarity with `target`, skipping the rows in
    /// `exclude`. A zero vector has similarity 0 with everything.
    pub fn by_cosine(&self, target: ArrayView1<'_, f32>, k: usize, exclude: &[usize]) -> Vec<Neighbor<'a>> {
        let target_norm = norm(target);
        self.rank(k, exclude, |row| {
            let d = norm(row) * target_norm;
            if d == 0.0 {
                0.0
            } else {
                row.dot(&target) / d
            }
        })
    }

    /// Top `k` rows by dot product with `target`, skipping the rows in
    /// `exclude`.
    pub fn by_dot(&self, target: ArrayView1<'_, f32>, k: usize, exclude: &[usize]) -> Vec<Neighbor<'a>> {
        self.rank(k, exclude, |row| row.dot(&target))
    }

    fn rank<F>(&self, k: usize, exclude: &[usize], score: F) -> Vec<Neighbor<'a>>
    where
        F: Fn(ArrayView1<'_, f32>) -> f32 + Sync,
    {
        let embeddings = self.embeddings;
        let mut scored: Vec<(usize, f32)> = (0..embeddings.nrows())
            .into_par_iter()
            .filter(|i| !exclude.contains(i))
            .map(|i| (i, score(embeddings.row(i))))
            .collect();

        let key = |&(_, s): &(usize, f32)| Reverse(OrderedFloat(s));
        let k = k.min(scored.len());
        if k == 0 {
            return vec![];
        }
        if k < scored.len() {
            scored.select_nth_unstable_by_key(k - 1, key);
            scored.truncate(k);
        }
        scored.sort_by_key(key);

        scored
            .into_iter()
            .map(|(index, score)| Neighbor {
                word: self.lexicon.word(index),
                index,
                score,
            })
            .collect()
    }
}

/// Format results as `[w1, w2, ...]` for log lines.
pub fn word_list(neighbors: &[Neighbor<'_>]) -> String {
    let words: Vec<&str> = neighbors.iter().map(|n| n.word).collect();
    format!("[{}]", words.join(", "))
}
