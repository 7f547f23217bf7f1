//! Error types shared by the network and the search.

use thiserror::Error;

/// Errors surfaced by graph construction, evaluation, persistence and search.
///
/// Deleting a unit whose outgoing edge is already gone is not an error; that
/// case never reaches the caller.
#[derive(Debug, Error)]
pub enum NetError {
    #[error("Shape mismatch for {what}: expected {expected}, got {actual}")]
    ShapeMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Layer {layer} out of range (net has {layers} layers)")]
    LayerOutOfRange { layer: usize, layers: usize },

    #[error("Unit {unit} out of range in layer {layer} ({units} units)")]
    UnitOutOfRange {
        layer: usize,
        unit: usize,
        units: usize,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl NetError {
    pub(crate) fn shape(what: &'static str, expected: usize, actual: usize) -> Self {
        NetError::ShapeMismatch { what, expected, actual }
    }
}

pub type Result<T> = std::result::Result<T, NetError>;
