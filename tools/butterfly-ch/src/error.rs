//! Error types for contraction hierarchy preprocessing
//!
//! Bounded-search exhaustion is not an error (it is reported through search
//! statistics). Degenerate vertices are contracted trivially. What remains is
//! malformed input, which fails at load time, and broken internal contracts.

use thiserror::Error;

/// Main error type for butterfly-ch operations
#[derive(Debug, Error)]
pub enum ContractError {
    /// File I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Graph or config file could not be (de)serialized
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// An edge references a vertex id outside `0..vertex_count`
    #[error("edge {edge} references vertex {vertex}, but the graph has {vertex_count} vertices")]
    DanglingVertex {
        edge: usize,
        vertex: u32,
        vertex_count: u32,
    },

    /// Negative, NaN or otherwise unusable edge weight
    #[error("edge {edge} has invalid weight {weight}")]
    InvalidWeight { edge: usize, weight: f64 },

    /// Weight does not fit into the packed edge word
    #[error("weight {0} cannot be packed into an edge word")]
    WeightOverflow(f64),

    /// Invalid tuning parameters
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A bookkeeping contract of the contraction was broken; the graph is corrupt
    #[error("invariant violation: {0}")]
    InvariantViolation(String),
}

/// Convenience result type for butterfly-ch operations
pub type Result<T> = std::result::Result<T, ContractError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dangling_vertex_message_names_the_edge() {
        let err = ContractError::DanglingVertex {
            edge: 3,
            vertex: 42,
            vertex_count: 10,
        };
        assert_eq!(
            err.to_string(),
            "edge 3 references vertex 42, but the graph has 10 vertices"
        );
    }

    #[test]
    fn io_errors_convert() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: ContractError = io.into();
        assert!(matches!(err, ContractError::Io(_)));
    }
}
