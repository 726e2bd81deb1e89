//! Word embeddings trained with a skip-gram objective and negative sampling.

pub mod batch;
pub mod checkpoint;
pub mod config;
pub mod corpus;
mod error;
pub mod model;
pub mod query;
pub mod sampling;
pub mod train;
pub mod vectors;
pub mod vocab;

pub use config::Config;
pub use error::Error;
pub use query::{Lexicon, Neighbor, QueryEngine};
pub use vectors::Vectors;
