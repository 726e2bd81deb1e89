use std::fmt::Debug;

use ndarray::prelude::*;

/// A loss function over a batch of model outputs `yh` with targets `y`.
pub trait Loss<D: Dimension, Y>: Debug {
    fn loss(&self, y: Y, yh: ArrayView<'_, f32, D>) -> f32;
    fn accuracy(&self, y: Y, yh: ArrayView<'_, f32, D>) -> f32;

    /// Partial derivative of `loss` with respect to each element of `yh`.
    fn deriv(&self, y: Y, yh: ArrayView<'_, f32, D>) -> Array<f32, D>;
}

pub trait ActivationFn: Copy + Clone + Debug {
    fn f(self, x: f32) -> f32;
    fn df(self, x: f32) -> f32;
}
