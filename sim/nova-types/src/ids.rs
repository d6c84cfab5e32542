//! Identifiers for bodies, shapes and constraints.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
        #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
        pub struct $name(pub u64);

        impl $name {
            /// Create a new ID.
            #[must_use]
            pub const fn new(id: u64) -> Self {
                Self(id)
            }

            /// Get the raw ID value.
            #[must_use]
            pub const fn raw(self) -> u64 {
                self.0
            }
        }

        impl From<u64> for $name {
            fn from(id: u64) -> Self {
                Self(id)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!($label, "({})"), self.0)
            }
        }
    };
}

define_id!(
    /// Unique identifier of a rigid body, assigned by the owning space.
    BodyId,
    "Body"
);

define_id!(
    /// Unique identifier of a shape, assigned at shape construction.
    ShapeId,
    "Shape"
);

define_id!(
    /// Unique identifier of a constraint, assigned by the owning space.
    ConstraintId,
    "Constraint"
);

/// Order-independent key for an unordered pair of ids.
///
/// `pair_key(a, b) == pair_key(b, a)` for every `a`, `b`.
#[must_use]
pub fn pair_key(a: u64, b: u64) -> (u64, u64) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_body_id() {
        let id = BodyId::new(42);
        assert_eq!(id.raw(), 42);
        assert_eq!(id.to_string(), "Body(42)");

        let id2: BodyId = 42.into();
        assert_eq!(id, id2);
    }

    #[test]
    fn test_id_display_labels() {
        assert_eq!(ShapeId(3).to_string(), "Shape(3)");
        assert_eq!(ConstraintId(7).to_string(), "Constraint(7)");
    }

    #[test]
    fn test_pair_key_symmetry() {
        assert_eq!(pair_key(5, 2), pair_key(2, 5));
        assert_eq!(pair_key(2, 5), (2, 5));
        assert_eq!(pair_key(4, 4), (4, 4));
    }
}
