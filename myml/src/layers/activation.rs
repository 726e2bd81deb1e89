use crate::ActivationFn;

/// The logistic function.
fn sigmoid(x: f32) -> f32 {
    // Never exponentiate a large positive number.
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

/// `log(sigmoid(x))`, computed without underflowing to `-inf` for very
/// negative `x`.
#[derive(Debug, Clone, Copy)]
pub struct LogSigmoid;

impl ActivationFn for LogSigmoid {
    fn f(self, x: f32) -> f32 {
        // log σ(x) = -softplus(-x)
        -((-x).max(0.0) + (-x.abs()).exp().ln_1p())
    }

    fn df(self, x: f32) -> f32 {
        sigmoid(-x)
    }
}
