//! Bounding volume hierarchy broad phase.
//!
//! The tree is rebuilt from scratch every query. Each node splits its bodies
//! at the mean AABB center along the longer side of the node's bounds until
//! a node holds at most `leaf_threshold` bodies, or the split would leave
//! one side empty.

use nova_types::{Aabb, Axis, PhysicsError, Result};
use tracing::trace;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::detector::BroadPhase;
use crate::proxy::{is_candidate, BroadPhasePair, BroadPhaseProxy};

/// BVH configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BvhConfig {
    /// Maximum number of bodies a leaf holds.
    pub leaf_threshold: usize,
}

impl Default for BvhConfig {
    fn default() -> Self {
        Self { leaf_threshold: 1 }
    }
}

impl BvhConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.leaf_threshold == 0 {
            return Err(PhysicsError::invalid_parameter(
                "leaf_threshold",
                "must be at least 1",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
enum BvhNode {
    Internal {
        aabb: Aabb,
        left: usize,
        right: usize,
    },
    Leaf {
        aabb: Aabb,
        first: usize,
        count: usize,
    },
}

impl BvhNode {
    fn aabb(&self) -> &Aabb {
        match self {
            Self::Internal { aabb, .. } | Self::Leaf { aabb, .. } => aabb,
        }
    }
}

/// Bounding volume hierarchy over proxy AABBs.
#[derive(Debug, Clone, Default)]
pub struct Bvh {
    config: BvhConfig,
    /// Index 0 is the root.
    nodes: Vec<BvhNode>,
    /// Proxy indices, grouped by leaf.
    indices: Vec<usize>,
}

impl Bvh {
    /// Create an empty tree.
    pub fn new(config: BvhConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            nodes: Vec::new(),
            indices: Vec::new(),
        })
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &BvhConfig {
        &self.config
    }

    /// Rebuild the tree over every collidable proxy.
    pub fn build(&mut self, proxies: &[BroadPhaseProxy]) {
        self.nodes.clear();
        self.indices.clear();
        self.indices.extend(
            proxies
                .iter()
                .enumerate()
                .filter(|(_, p)| p.collision_enabled)
                .map(|(i, _)| i),
        );
        if self.indices.is_empty() {
            return;
        }
        self.nodes.reserve(self.indices.len() * 2);
        let end = self.indices.len();
        self.build_recursive(proxies, 0, end);
    }

    fn build_recursive(&mut self, proxies: &[BroadPhaseProxy], start: usize, end: usize) -> usize {
        let aabb = bounds_of(proxies, &self.indices[start..end]);
        let count = end - start;

        if count <= self.config.leaf_threshold {
            return self.push_leaf(aabb, start, count);
        }

        let size = aabb.size();
        let axis = if size.x > size.y { Axis::X } else { Axis::Y };
        let center = |i: usize| proxies[i].aabb.center()[axis.index()];

        let slice = &mut self.indices[start..end];
        #[allow(clippy::cast_precision_loss)]
        let split = slice.iter().map(|&i| center(i)).sum::<f64>() / count as f64;

        // In-place partition: centers at or below the mean go left
        let mut mid = 0;
        for k in 0..slice.len() {
            if center(slice[k]) <= split {
                slice.swap(k, mid);
                mid += 1;
            }
        }

        if mid == 0 || mid == count {
            return self.push_leaf(aabb, start, count);
        }

        let node = self.nodes.len();
        self.nodes.push(BvhNode::Internal {
            aabb,
            left: 0,
            right: 0,
        });
        let left_child = self.build_recursive(proxies, start, start + mid);
        let right_child = self.build_recursive(proxies, start + mid, end);
        if let BvhNode::Internal { left, right, .. } = &mut self.nodes[node] {
            *left = left_child;
            *right = right_child;
        }
        node
    }

    fn push_leaf(&mut self, aabb: Aabb, first: usize, count: usize) -> usize {
        let node = self.nodes.len();
        self.nodes.push(BvhNode::Leaf { aabb, first, count });
        node
    }

    /// Bounds of the whole tree.
    #[must_use]
    pub fn root_aabb(&self) -> Option<Aabb> {
        self.nodes.first().map(|n| *n.aabb())
    }

    /// Number of nodes, leaves included.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of internal (splitting) nodes.
    #[must_use]
    pub fn internal_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, BvhNode::Internal { .. }))
            .count()
    }

    /// Proxy indices of every leaf whose bounds overlap `aabb`.
    #[must_use]
    pub fn query(&self, aabb: &Aabb) -> Vec<usize> {
        let mut out = Vec::new();
        self.query_callback(aabb, |i| out.push(i));
        out
    }

    /// Like [`query`](Self::query) but calls `f` for each index.
    pub fn query_callback<F>(&self, aabb: &Aabb, mut f: F)
    where
        F: FnMut(usize),
    {
        if !self.nodes.is_empty() {
            self.query_recursive(0, aabb, &mut f);
        }
    }

    fn query_recursive<F>(&self, node: usize, aabb: &Aabb, f: &mut F)
    where
        F: FnMut(usize),
    {
        let n = &self.nodes[node];
        if !n.aabb().overlaps(aabb) {
            return;
        }
        match *n {
            BvhNode::Internal { left, right, .. } => {
                self.query_recursive(left, aabb, f);
                self.query_recursive(right, aabb, f);
            }
            BvhNode::Leaf { first, count, .. } => {
                for &i in &self.indices[first..first + count] {
                    f(i);
                }
            }
        }
    }
}

impl BroadPhase for Bvh {
    fn find_candidate_pairs(
        &mut self,
        proxies: &[BroadPhaseProxy],
        sleeping: bool,
    ) -> Vec<BroadPhasePair> {
        self.build(proxies);

        let mut pairs = Vec::new();
        for (i, a) in proxies.iter().enumerate() {
            if !a.collision_enabled {
                continue;
            }
            self.query_callback(&a.aabb, |j| {
                // Leaves can hold bodies that only share a bounding box
                if j > i && is_candidate(a, &proxies[j], sleeping) {
                    pairs.push(BroadPhasePair { a: i, b: j });
                }
            });
        }
        pairs.sort_unstable();
        trace!(pairs = pairs.len(), nodes = self.nodes.len(), "BVH pass");
        pairs
    }
}

fn bounds_of(proxies: &[BroadPhaseProxy], indices: &[usize]) -> Aabb {
    let mut iter = indices.iter().map(|&i| proxies[i].aabb);
    match iter.next() {
        Some(first) => iter.fold(first, |acc, b| acc.merged(&b)),
        None => Aabb::default(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::cast_precision_loss)]
mod tests {
    use super::*;
    use crate::BruteForce;
    use nalgebra::Vector2;
    use nova_types::BodyId;
    use rand::{Rng, SeedableRng};

    fn square(id: u64, x: f64, y: f64) -> BroadPhaseProxy {
        BroadPhaseProxy::new(
            BodyId(id),
            Aabb::from_center(Vector2::new(x, y), Vector2::new(0.5, 0.5)),
        )
    }

    #[test]
    fn test_zero_leaf_threshold_rejected() {
        assert!(Bvh::new(BvhConfig { leaf_threshold: 0 }).is_err());
    }

    #[test]
    fn test_build_splits_to_single_leaves() {
        let proxies: Vec<_> = (0..8).map(|i| square(i, i as f64 * 2.0, 0.0)).collect();
        let mut bvh = Bvh::new(BvhConfig::default()).unwrap();
        bvh.build(&proxies);
        // A full binary tree over 8 leaves
        assert_eq!(bvh.node_count(), 15);
        assert_eq!(bvh.internal_count(), 7);
        let root = bvh.root_aabb().unwrap();
        assert_eq!(root.min, Vector2::new(-0.5, -0.5));
        assert_eq!(root.max, Vector2::new(14.5, 0.5));
    }

    #[test]
    fn test_coincident_bodies_stay_in_one_leaf() {
        let proxies = [square(1, 0.0, 0.0), square(2, 0.0, 0.0), square(3, 0.0, 0.0)];
        let mut bvh = Bvh::new(BvhConfig::default()).unwrap();
        bvh.build(&proxies);
        assert_eq!(bvh.node_count(), 1);
        assert_eq!(bvh.query(&proxies[0].aabb).len(), 3);
    }

    #[test]
    fn test_query() {
        let proxies: Vec<_> = (0..10).map(|i| square(i, i as f64 * 3.0, 0.0)).collect();
        let mut bvh = Bvh::new(BvhConfig::default()).unwrap();
        bvh.build(&proxies);

        let mut hits = bvh.query(&Aabb::from_bounds(2.0, -1.0, 7.0, 1.0));
        hits.sort_unstable();
        assert_eq!(hits, vec![1, 2]);
        assert!(bvh.query(&Aabb::from_bounds(100.0, 100.0, 101.0, 101.0)).is_empty());
    }

    #[test]
    fn test_matches_brute_force() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        let proxies: Vec<_> = (0..200)
            .map(|i| {
                let x = rng.gen_range(0.0..60.0);
                let y = rng.gen_range(0.0..40.0);
                square(i, x, y).with_static(i % 11 == 0)
            })
            .collect();

        let expected = BruteForce::new().find_candidate_pairs(&proxies, false);
        for leaf_threshold in [1, 4] {
            let mut bvh = Bvh::new(BvhConfig { leaf_threshold }).unwrap();
            assert_eq!(bvh.find_candidate_pairs(&proxies, false), expected);
        }
    }
}
