//! Error types for physics construction and configuration.

use thiserror::Error;

/// Errors reported by factories, setters and configuration validation.
///
/// Stepping a space never produces an error; everything that can go wrong
/// is rejected up front at construction or mutation time.
#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum PhysicsError {
    /// Shape geometry is unusable (vertex count, radius, degenerate hull).
    #[error("invalid geometry: {reason}")]
    InvalidGeometry {
        /// Description of the geometric problem.
        reason: String,
    },

    /// A dynamic body ended up with no mass.
    #[error("degenerate mass: body {body_id} has mass {mass}")]
    DegenerateMass {
        /// Raw id of the offending body (0 if not yet in a space).
        body_id: u64,
        /// The computed mass.
        mass: f64,
    },

    /// A two-body constraint was given no bodies at all.
    #[error("both constraint bodies can't be absent")]
    BothBodiesNull,

    /// Storage could not grow.
    #[error("allocation failure: {what}")]
    AllocationFailure {
        /// The structure that failed to grow.
        what: String,
    },

    /// A parameter is outside its valid range.
    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Why it was rejected.
        reason: String,
    },

    /// Invalid body id referenced.
    #[error("invalid body ID: {0}")]
    InvalidBodyId(u64),

    /// Invalid shape id referenced.
    #[error("invalid shape ID: {0}")]
    InvalidShapeId(u64),

    /// Invalid constraint id referenced.
    #[error("invalid constraint ID: {0}")]
    InvalidConstraintId(u64),

    /// Spline path too short.
    #[error("spline path needs at least 4 control points, got {0}")]
    InsufficientControlPoints(usize),

    /// Spline path too long.
    #[error("spline path supports at most {max} control points, got {got}")]
    TooManyControlPoints {
        /// Number of points supplied.
        got: usize,
        /// Upper bound.
        max: usize,
    },

    /// A body was added to the space twice.
    #[error("body {0} is already in the space")]
    BodyAlreadyInSpace(u64),
}

impl PhysicsError {
    /// Create an invalid geometry error.
    #[must_use]
    pub fn invalid_geometry(reason: impl Into<String>) -> Self {
        Self::InvalidGeometry {
            reason: reason.into(),
        }
    }

    /// Create an invalid parameter error.
    #[must_use]
    pub fn invalid_parameter(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }

    /// Create an allocation failure error.
    #[must_use]
    pub fn allocation_failure(what: impl Into<String>) -> Self {
        Self::AllocationFailure { what: what.into() }
    }

    /// Check if this error comes from a factory that refused to build.
    #[must_use]
    pub fn is_construction_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidGeometry { .. }
                | Self::DegenerateMass { .. }
                | Self::BothBodiesNull
                | Self::AllocationFailure { .. }
        )
    }

    /// Check if this error is a rejected argument at a setter/factory boundary.
    #[must_use]
    pub fn is_precondition_violation(&self) -> bool {
        matches!(
            self,
            Self::InvalidParameter { .. }
                | Self::InsufficientControlPoints(_)
                | Self::TooManyControlPoints { .. }
        )
    }
}
