//! Strategy selection.

use nova_types::Result;
use tracing::{debug, info};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::brute_force::BruteForce;
use crate::bvh::{Bvh, BvhConfig};
use crate::proxy::{BroadPhasePair, BroadPhaseProxy};
use crate::shg::{ShgConfig, SpatialHashGrid};

/// A broad-phase strategy.
pub trait BroadPhase {
    /// Find every pair of proxies that passes the early-out rules and whose
    /// AABBs overlap.
    ///
    /// Pairs are returned sorted and without duplicates. `sleeping` enables
    /// the sleeping early-outs.
    fn find_candidate_pairs(
        &mut self,
        proxies: &[BroadPhaseProxy],
        sleeping: bool,
    ) -> Vec<BroadPhasePair>;
}

/// Broad-phase algorithm selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum BroadPhaseAlgorithm {
    /// Test every pair.
    BruteForce,
    /// Uniform grid, optionally multithreaded.
    #[default]
    SpatialHashGrid,
    /// Tree rebuilt every step.
    Bvh,
}

/// Configuration for all strategies.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BroadPhaseConfig {
    /// Active algorithm.
    pub algorithm: BroadPhaseAlgorithm,
    /// Grid settings.
    pub shg: ShgConfig,
    /// Tree settings.
    pub bvh: BvhConfig,
}

impl BroadPhaseConfig {
    /// Select an algorithm.
    #[must_use]
    pub fn with_algorithm(mut self, algorithm: BroadPhaseAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Replace the grid settings.
    #[must_use]
    pub fn with_shg(mut self, shg: ShgConfig) -> Self {
        self.shg = shg;
        self
    }

    /// Validate every sub-config.
    pub fn validate(&self) -> Result<()> {
        self.shg.validate()?;
        self.bvh.validate()
    }
}

/// Owns one instance of each strategy and dispatches to the selected one.
#[derive(Debug, Clone, Default)]
pub struct BroadPhaseDetector {
    config: BroadPhaseConfig,
    brute: BruteForce,
    shg: SpatialHashGrid,
    bvh: Bvh,
    last_pair_count: usize,
}

impl BroadPhaseDetector {
    /// Create a detector.
    pub fn new(config: BroadPhaseConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            brute: BruteForce::new(),
            shg: SpatialHashGrid::new(config.shg)?,
            bvh: Bvh::new(config.bvh)?,
            config,
            last_pair_count: 0,
        })
    }

    /// Find candidate pairs with the selected algorithm.
    pub fn find_candidate_pairs(
        &mut self,
        proxies: &[BroadPhaseProxy],
        sleeping: bool,
    ) -> Vec<BroadPhasePair> {
        let pairs = match self.config.algorithm {
            BroadPhaseAlgorithm::BruteForce => self.brute.find_candidate_pairs(proxies, sleeping),
            BroadPhaseAlgorithm::SpatialHashGrid => {
                self.shg.find_candidate_pairs(proxies, sleeping)
            }
            BroadPhaseAlgorithm::Bvh => self.bvh.find_candidate_pairs(proxies, sleeping),
        };
        self.last_pair_count = pairs.len();
        pairs
    }

    /// Current configuration.
    #[must_use]
    pub fn config(&self) -> &BroadPhaseConfig {
        &self.config
    }

    /// Selected algorithm.
    #[must_use]
    pub fn algorithm(&self) -> BroadPhaseAlgorithm {
        self.config.algorithm
    }

    /// Switch algorithm.
    pub fn set_algorithm(&mut self, algorithm: BroadPhaseAlgorithm) {
        if algorithm != self.config.algorithm {
            debug!(from = ?self.config.algorithm, to = ?algorithm, "broad-phase algorithm changed");
        }
        self.config.algorithm = algorithm;
    }

    /// Replace the configuration, rebuilding the grid and tree.
    pub fn set_config(&mut self, config: BroadPhaseConfig) -> Result<()> {
        let slabs = self.shg.slabs();
        self.shg = SpatialHashGrid::new(config.shg)?.with_slabs(slabs);
        self.bvh = Bvh::new(config.bvh)?;
        self.config = config;
        Ok(())
    }

    /// Enable multithreaded grid pair generation.
    ///
    /// `threads == 0` uses every rayon worker; `1` disables it.
    pub fn set_multithreading(&mut self, threads: usize) {
        info!(threads, "SHG multithreading configured");
        self.shg.set_slabs(threads);
    }

    /// Whether grid pair generation is multithreaded.
    #[must_use]
    pub fn is_multithreaded(&self) -> bool {
        self.shg.slabs() != 1
    }

    /// Pairs found by the last call.
    #[must_use]
    pub fn last_pair_count(&self) -> usize {
        self.last_pair_count
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::cast_precision_loss)]
mod tests {
    use super::*;
    use nalgebra::Vector2;
    use nova_types::{Aabb, BodyId};

    fn row(n: usize, spacing: f64) -> Vec<BroadPhaseProxy> {
        (0..n)
            .map(|i| {
                BroadPhaseProxy::new(
                    BodyId(i as u64 + 1),
                    Aabb::from_center(
                        Vector2::new(5.0 + i as f64 * spacing, 5.0),
                        Vector2::new(0.5, 0.5),
                    ),
                )
            })
            .collect()
    }

    #[test]
    fn test_default_is_shg() {
        assert_eq!(
            BroadPhaseDetector::default().algorithm(),
            BroadPhaseAlgorithm::SpatialHashGrid
        );
    }

    #[test]
    fn test_all_algorithms_agree() {
        let proxies = row(20, 0.8);
        let mut detector = BroadPhaseDetector::default();
        let mut results = Vec::new();
        for algorithm in [
            BroadPhaseAlgorithm::BruteForce,
            BroadPhaseAlgorithm::SpatialHashGrid,
            BroadPhaseAlgorithm::Bvh,
        ] {
            detector.set_algorithm(algorithm);
            results.push(detector.find_candidate_pairs(&proxies, false));
        }
        assert_eq!(results[0].len(), 19);
        assert_eq!(results[0], results[1]);
        assert_eq!(results[0], results[2]);
        assert_eq!(detector.last_pair_count(), 19);
    }

    #[test]
    fn test_multithreading_toggle() {
        let mut detector = BroadPhaseDetector::default();
        assert!(!detector.is_multithreaded());
        detector.set_multithreading(0);
        assert!(detector.is_multithreaded());
        let proxies = row(30, 0.9);
        assert_eq!(detector.find_candidate_pairs(&proxies, false).len(), 29);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = BroadPhaseConfig::default();
        config.bvh.leaf_threshold = 0;
        assert!(BroadPhaseDetector::new(config).is_err());
    }
}
