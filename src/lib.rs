pub mod activation;
pub mod error;
pub mod loss;
pub mod network;
pub mod optim;
pub mod train;

// Convenience re-exports
pub use activation::activation::ActivationFunction;
pub use error::{NetError, Result};
pub use loss::dead_zone::DeadZoneLoss;
pub use network::{Connection, Net, NetSpec, Unit, UnitId};
pub use optim::corrector::Corrector;
pub use train::{
    AbortHandle, RestartEnd, RestartStats, Sample, Search, SearchConfig, SearchResult,
    SearchWorker,
};
