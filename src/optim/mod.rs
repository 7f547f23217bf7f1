pub mod corrector;

pub use corrector::Corrector;
