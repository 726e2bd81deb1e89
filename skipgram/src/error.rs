use thiserror::Error;

/// Errors with a meaning of their own. Everything else (I/O, decoding) is
/// reported through `anyhow` with context attached.
#[derive(Debug, Error)]
pub enum Error {
    #[error("word not found in vocabulary: {0:?}")]
    NotFound(String),

    #[error("degenerate distribution: {0}")]
    DegenerateDistribution(&'static str),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("parameters have shape {found:?}, expected {expected:?} (vocabulary size, embedding size)")]
    ShapeMismatch {
        expected: (usize, usize),
        found: (usize, usize),
    },
}
