pub mod dead_zone;

pub use dead_zone::DeadZoneLoss;
