mod traits;
pub use traits::{ActivationFn, Loss};

pub mod init;
pub mod layers;
pub mod loss;
pub mod optim;
