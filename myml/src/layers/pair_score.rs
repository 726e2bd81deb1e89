use ndarray::prelude::*;
use ndarray::Zip;

use crate::optim::RowGradient;

/// A batch of index pairs. `left[i]` selects a row of the left embedding
/// matrix, `right[i]` a row of the right embedding matrix and the bias.
#[derive(Debug, Clone, Copy)]
pub struct Pairs<'a> {
    pub left: &'a [u32],
    pub right: &'a [u32],
}

impl<'a> Pairs<'a> {
    pub fn new(left: &'a [u32], right: &'a [u32]) -> Self {
        assert_eq!(left.len(), right.len(), "pair batches must line up");
        Pairs { left, right }
    }

    pub fn len(&self) -> usize {
        self.left.len()
    }

    pub fn is_empty(&self) -> bool {
        self.left.is_empty()
    }
}

/// Scores a pair of embedding rows: `z = dot(L[l], R[r]) + b[r]`.
///
/// The parameters are two `(n, dim)` matrices and a length-`n` bias vector.
/// Only the rows named by a batch take part in it, so gradients come back as
/// [`RowGradient`]s instead of dense arrays.
#[derive(Debug)]
pub struct PairScoreLayer {
    /// Number of rows in each matrix.
    n: usize,
    /// Embedding width.
    dim: usize,
}

/// Gradients of the loss with respect to the three parameter arrays of a
/// [`PairScoreLayer`].
#[derive(Debug)]
pub struct PairGradient {
    pub left: RowGradient,
    pub right: RowGradient,
    /// Rows are one element wide.
    pub bias: RowGradient,
}

impl PairScoreLayer {
    pub fn new(num_embeddings: usize, dim: usize) -> Self {
        PairScoreLayer {
            n: num_embeddings,
            dim,
        }
    }

    fn check_shapes(&self, l: ArrayView2<'_, f32>, r: ArrayView2<'_, f32>, pairs: Pairs<'_>) {
        assert_eq!(l.shape(), [self.n, self.dim]);
        assert_eq!(r.shape(), [self.n, self.dim]);
        debug_assert!(pairs.left.iter().all(|&i| (i as usize) < self.n));
        debug_assert!(pairs.right.iter().all(|&i| (i as usize) < self.n));
    }

    /// Compute the score of every pair into `y`.
    pub fn apply(
        &self,
        l: ArrayView2<'_, f32>,
        r: ArrayView2<'_, f32>,
        b: ArrayView1<'_, f32>,
        pairs: Pairs<'_>,
        mut y: ArrayViewMut1<'_, f32>,
    ) {
        self.check_shapes(l, r, pairs);
        assert_eq!(b.len(), self.n);
        assert_eq!(y.len(), pairs.len());

        Zip::from(&mut y)
            .and(&ArrayView1::from(pairs.left))
            .and(&ArrayView1::from(pairs.right))
            .par_for_each(|y, &li, &ri| {
                let (li, ri) = (li as usize, ri as usize);
                *y = l.row(li).dot(&r.row(ri)) + b[ri];
            });
    }

    /// Given `dz`, the partial derivative of the loss with respect to each
    /// pair's score, compute the gradient for each parameter row involved.
    ///
    /// Every row of the result is computed from the parameters as passed in;
    /// nothing is updated here.
    pub fn derivatives(
        &self,
        l: ArrayView2<'_, f32>,
        r: ArrayView2<'_, f32>,
        pairs: Pairs<'_>,
        dz: ArrayView1<'_, f32>,
    ) -> PairGradient {
        self.check_shapes(l, r, pairs);
        let n = pairs.len();
        assert_eq!(dz.len(), n);

        let mut dl = Array2::<f32>::zeros((n, self.dim));
        let mut dr = Array2::<f32>::zeros((n, self.dim));
        Zip::from(dl.rows_mut())
            .and(dr.rows_mut())
            .and(&ArrayView1::from(pairs.left))
            .and(&ArrayView1::from(pairs.right))
            .and(&dz)
            .par_for_each(|mut dl, mut dr, &li, &ri, &dz| {
                // ∂z/∂L[l] = R[r] and ∂z/∂R[r] = L[l]
                dl.assign(&r.row(ri as usize));
                dl *= dz;
                dr.assign(&l.row(li as usize));
                dr *= dz;
            });

        PairGradient {
            left: RowGradient::new(pairs.left.to_vec(), dl),
            right: RowGradient::new(pairs.right.to_vec(), dr),
            bias: RowGradient::new(pairs.right.to_vec(), dz.to_owned().insert_axis(Axis(1))),
        }
    }
}
