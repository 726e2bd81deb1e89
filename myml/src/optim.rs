//! Optimizers.

use ndarray::prelude::*;

/// Gradient for a subset of the rows of a parameter matrix.
///
/// `values.row(i)` is the gradient for row `rows[i]`. A row may appear more
/// than once; its contributions add up.
#[derive(Debug, Clone)]
pub struct RowGradient {
    pub rows: Vec<u32>,
    pub values: Array2<f32>,
}

impl RowGradient {
    pub fn new(rows: Vec<u32>, values: Array2<f32>) -> Self {
        assert_eq!(rows.len(), values.nrows());
        RowGradient { rows, values }
    }
}

/// Plain stochastic gradient descent with a fixed learning rate.
#[derive(Debug, Clone, Copy)]
pub struct Sgd {
    learning_rate: f32,
}

impl Sgd {
    pub fn new(learning_rate: f32) -> Self {
        Sgd { learning_rate }
    }

    pub fn learning_rate(&self) -> f32 {
        self.learning_rate
    }

    /// Subtract `learning_rate * grad` from the rows of `params` it names.
    pub fn apply_rows(&self, mut params: ArrayViewMut2<'_, f32>, grad: &RowGradient) {
        assert_eq!(params.ncols(), grad.values.ncols());
        for (&row, g) in grad.rows.iter().zip(grad.values.rows()) {
            params
                .row_mut(row as usize)
                .scaled_add(-self.learning_rate, &g);
        }
    }

    /// Same as `apply_rows`, for a parameter vector with one element per row.
    pub fn apply_elements(&self, params: ArrayViewMut1<'_, f32>, grad: &RowGradient) {
        self.apply_rows(params.insert_axis(Axis(1)), grad);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_rows_accumulate() {
        let mut p = Array2::<f32>::ones((3, 2));
        let g = RowGradient::new(vec![2, 0, 2], array![[1.0, 2.0], [0.5, 0.5], [1.0, 0.0]]);
        Sgd::new(0.5).apply_rows(p.view_mut(), &g);
        assert_eq!(p, array![[0.75, 0.75], [1.0, 1.0], [0.0, 0.0]]);
    }

    #[test]
    fn vector_update() {
        let mut b = Array1::<f32>::zeros(4);
        let g = RowGradient::new(vec![1, 3], array![[2.0], [-4.0]]);
        let sgd = Sgd::new(0.25);
        assert_eq!(sgd.learning_rate(), 0.25);
        sgd.apply_elements(b.view_mut(), &g);
        assert_eq!(b, array![0.0, -0.5, 0.0, 1.0]);
    }
}
