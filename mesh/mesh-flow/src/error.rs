//! Error types for flow baking.

use thiserror::Error;

/// Result type for flow baking operations.
pub type FlowResult<T> = Result<T, FlowError>;

/// Errors that can occur during flow baking.
///
/// Structural errors ([`FlowError::InvalidTopology`],
/// [`FlowError::AmbiguousSubmeshMembership`]) and [`FlowError::InvalidParams`]
/// abort a bake before any walking starts. [`FlowError::DegenerateDirection`]
/// never reaches the caller of a bake: the walker skips the offending sample
/// and counts it in the bake statistics.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FlowError {
    /// A submesh index list is malformed.
    #[error("invalid topology in submesh {submesh}: {details}")]
    InvalidTopology {
        /// Submesh containing the defect.
        submesh: usize,
        /// Description of the defect.
        details: String,
    },

    /// A vertex is referenced from more than one submesh.
    #[error("vertex {vertex} is referenced from submesh {first} and submesh {second}")]
    AmbiguousSubmeshMembership {
        /// The shared vertex.
        vertex: u32,
        /// Submesh that referenced the vertex first.
        first: usize,
        /// Conflicting submesh.
        second: usize,
    },

    /// Normalizing the direction between two vertices produced a zero-length vector.
    #[error("degenerate flow direction from vertex {from} to vertex {to}")]
    DegenerateDirection {
        /// Contributing vertex.
        from: u32,
        /// Receiving vertex.
        to: u32,
    },

    /// Invalid bake parameters.
    #[error("invalid parameters: {0}")]
    InvalidParams(String),

    /// The bake was cancelled at a suspension point.
    #[error("bake cancelled")]
    Cancelled,

    /// The session was resumed after it had finished or failed.
    #[error("bake session already finished")]
    SessionFinished,
}

impl FlowError {
    /// Create an invalid topology error.
    #[must_use]
    pub fn invalid_topology(submesh: usize, details: impl Into<String>) -> Self {
        Self::InvalidTopology {
            submesh,
            details: details.into(),
        }
    }

    /// Create an invalid params error.
    #[must_use]
    pub fn invalid_params(details: impl Into<String>) -> Self {
        Self::InvalidParams(details.into())
    }

    /// Whether this error rejects the mesh itself rather than the bake settings.
    #[must_use]
    pub const fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::InvalidTopology { .. } | Self::AmbiguousSubmeshMembership { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = FlowError::invalid_topology(2, "index count 4 is not a multiple of 3");
        let message = format!("{err}");
        assert!(message.contains("submesh 2"));
        assert!(message.contains("multiple of 3"));

        let err = FlowError::AmbiguousSubmeshMembership {
            vertex: 7,
            first: 0,
            second: 1,
        };
        assert!(format!("{err}").contains("vertex 7"));

        let err = FlowError::invalid_params("epsilon must be finite");
        assert!(format!("{err}").contains("epsilon"));
    }

    #[test]
    fn structural_classification() {
        assert!(FlowError::invalid_topology(0, "x").is_structural());
        assert!(!FlowError::Cancelled.is_structural());
        assert!(!FlowError::DegenerateDirection { from: 0, to: 1 }.is_structural());
    }
}
