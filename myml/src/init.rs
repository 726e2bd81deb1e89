//! Parameter initialization.

use ndarray::prelude::*;
use ndarray::IntoDimension;
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use rand::Rng;

/// Draw an array from the uniform distribution on `±sqrt(6 / fan)`
/// (Glorot & Bengio, 2010).
///
/// For a matrix, `fan` is the sum of its dimensions. A vector counts as a
/// `(n, 1)` matrix, so `fan = n + 1`.
pub fn xavier_uniform<Sh, R>(shape: Sh, rng: &mut R) -> Array<f32, Sh::Dim>
where
    Sh: IntoDimension,
    R: Rng + ?Sized,
{
    let dim = shape.into_dimension();
    let fan: usize = match dim.slice() {
        [n] => n + 1,
        dims => dims.iter().sum(),
    };
    let limit = xavier_limit(fan);
    Array::random_using(dim, Uniform::new_inclusive(-limit, limit), rng)
}

pub fn xavier_limit(fan: usize) -> f32 {
    (6.0 / fan as f64).sqrt() as f32
}
