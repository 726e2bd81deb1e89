//! Layers. Each one has a forward pass (`apply`) and a backward pass
//! (`derivatives`) that turns ∂L/∂output into gradients for its parameters.

mod activation;
pub use activation::LogSigmoid;

mod pair_score;
pub use pair_score::{PairGradient, PairScoreLayer, Pairs};
