//! Collision filtering by group, category and mask.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Decides which body pairs are allowed to collide.
///
/// Two bodies collide only if they do not share a non-zero `group` and each
/// body's `mask` intersects the other's `category`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CollisionFilter {
    /// Bodies sharing the same non-zero group never collide.
    pub group: u32,
    /// Category bits this body belongs to.
    pub category: u32,
    /// Category bits this body collides with.
    pub mask: u32,
}

impl Default for CollisionFilter {
    fn default() -> Self {
        Self {
            group: 0,
            category: u32::MAX,
            mask: u32::MAX,
        }
    }
}

impl CollisionFilter {
    /// Create a filter.
    #[must_use]
    pub const fn new(group: u32, category: u32, mask: u32) -> Self {
        Self {
            group,
            category,
            mask,
        }
    }

    /// Set the group.
    #[must_use]
    pub const fn with_group(mut self, group: u32) -> Self {
        self.group = group;
        self
    }

    /// Set category and mask.
    #[must_use]
    pub const fn with_bits(mut self, category: u32, mask: u32) -> Self {
        self.category = category;
        self.mask = mask;
        self
    }

    /// Check whether two filters allow a collision.
    #[must_use]
    pub const fn should_collide(&self, other: &Self) -> bool {
        if self.group != 0 && self.group == other.group {
            return false;
        }
        (self.mask & other.category) != 0 && (other.mask & self.category) != 0
    }
}
