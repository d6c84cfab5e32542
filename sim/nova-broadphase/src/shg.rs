//! Spatial hash grid broad phase.
//!
//! Bodies are binned into fixed-size cells covering their AABB. Each body is
//! then tested against the bodies in its own cells and the ring of
//! neighbouring cells. A pair can be seen from several cells, so results go
//! through a map keyed by the order-independent pair of body ids.
//!
//! Cell coordinates are clamped to the grid, so bodies outside the bounds
//! pile up in the border cells instead of being lost.

use hashbrown::{HashMap, HashSet};
use nalgebra::Vector2;
use nova_types::{pair_key, Aabb, BodyId, PhysicsError, Result};
use tracing::{trace, warn};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::detector::BroadPhase;
use crate::proxy::{is_candidate, BroadPhasePair, BroadPhaseProxy};

type PairMap = HashMap<(u64, u64), BroadPhasePair>;

/// Spatial hash grid configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ShgConfig {
    /// Region covered by the grid.
    pub bounds: Aabb,
    /// Cell width.
    pub cell_width: f64,
    /// Cell height.
    pub cell_height: f64,
    /// Bodies faster than this have last step's pairs re-tested directly.
    pub fast_speed_threshold: f64,
}

impl Default for ShgConfig {
    fn default() -> Self {
        Self {
            bounds: Aabb::from_bounds(0.0, 0.0, 128.0, 72.0),
            cell_width: 3.5,
            cell_height: 3.5,
            fast_speed_threshold: 30.0,
        }
    }
}

impl ShgConfig {
    /// Create a config with square cells.
    #[must_use]
    pub fn new(bounds: Aabb, cell_size: f64) -> Self {
        Self {
            bounds,
            cell_width: cell_size,
            cell_height: cell_size,
            ..Default::default()
        }
    }

    /// Set the fast-body speed threshold.
    #[must_use]
    pub fn with_fast_speed_threshold(mut self, threshold: f64) -> Self {
        self.fast_speed_threshold = threshold;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if !(self.cell_width > 0.0 && self.cell_width.is_finite()) {
            return Err(PhysicsError::invalid_parameter(
                "cell_width",
                format!("must be positive and finite, got {}", self.cell_width),
            ));
        }
        if !(self.cell_height > 0.0 && self.cell_height.is_finite()) {
            return Err(PhysicsError::invalid_parameter(
                "cell_height",
                format!("must be positive and finite, got {}", self.cell_height),
            ));
        }
        let size = self.bounds.size();
        if !(size.x > 0.0 && size.y > 0.0) {
            return Err(PhysicsError::invalid_parameter(
                "bounds",
                "grid bounds must have positive area",
            ));
        }
        if self.fast_speed_threshold < 0.0 {
            return Err(PhysicsError::invalid_parameter(
                "fast_speed_threshold",
                "must be non-negative",
            ));
        }
        Ok(())
    }
}

/// Inclusive range of cell coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CellRange {
    x0: i32,
    y0: i32,
    x1: i32,
    y1: i32,
}

/// Uniform grid broad phase.
#[derive(Debug, Clone)]
pub struct SpatialHashGrid {
    config: ShgConfig,
    cols: i32,
    rows: i32,
    cells: HashMap<(i32, i32), Vec<usize>>,
    previous_pairs: Vec<(BodyId, BodyId)>,
    slabs: usize,
}

impl Default for SpatialHashGrid {
    fn default() -> Self {
        Self::from_valid(ShgConfig::default())
    }
}

impl SpatialHashGrid {
    /// Create a grid.
    pub fn new(config: ShgConfig) -> Result<Self> {
        config.validate()?;
        let size = config.bounds.size();
        if config.cell_width > size.x || config.cell_height > size.y {
            warn!(
                cell_width = config.cell_width,
                cell_height = config.cell_height,
                "SHG cell is larger than the grid bounds"
            );
        }
        Ok(Self::from_valid(config))
    }

    fn from_valid(config: ShgConfig) -> Self {
        let size = config.bounds.size();
        #[allow(clippy::cast_possible_truncation)]
        let cols = ((size.x / config.cell_width).ceil() as i32).max(1);
        #[allow(clippy::cast_possible_truncation)]
        let rows = ((size.y / config.cell_height).ceil() as i32).max(1);
        Self {
            config,
            cols,
            rows,
            cells: HashMap::new(),
            previous_pairs: Vec::new(),
            slabs: 1,
        }
    }

    /// Run pair generation over `slabs` worker threads.
    ///
    /// `0` uses one slab per rayon worker; `1` is sequential. Without the
    /// `parallel` feature the grid always runs sequentially.
    #[must_use]
    pub fn with_slabs(mut self, slabs: usize) -> Self {
        self.slabs = slabs;
        self
    }

    /// Set the number of parallel slabs. See [`with_slabs`](Self::with_slabs).
    pub fn set_slabs(&mut self, slabs: usize) {
        self.slabs = slabs;
    }

    /// Number of parallel slabs requested.
    #[must_use]
    pub fn slabs(&self) -> usize {
        self.slabs
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &ShgConfig {
        &self.config
    }

    /// Grid dimensions in cells.
    #[must_use]
    pub fn dimensions(&self) -> (i32, i32) {
        (self.cols, self.rows)
    }

    /// Proxy indices stored in a cell, if it is occupied.
    #[must_use]
    pub fn cell(&self, x: i32, y: i32) -> Option<&[usize]> {
        self.cells.get(&(x, y)).map(Vec::as_slice)
    }

    /// Cell coordinate containing a world point, clamped to the grid.
    #[must_use]
    pub fn cell_of(&self, point: Vector2<f64>) -> (i32, i32) {
        let local = point - self.config.bounds.min;
        (
            clamp_cell(local.x / self.config.cell_width, self.cols),
            clamp_cell(local.y / self.config.cell_height, self.rows),
        )
    }

    fn range_of(&self, aabb: &Aabb) -> CellRange {
        let (x0, y0) = self.cell_of(aabb.min);
        let (x1, y1) = self.cell_of(aabb.max);
        CellRange { x0, y0, x1, y1 }
    }

    /// Bin every collidable proxy into the cells its AABB covers.
    pub fn place(&mut self, proxies: &[BroadPhaseProxy]) {
        self.cells.clear();
        for (index, proxy) in proxies.iter().enumerate() {
            if !proxy.collision_enabled {
                continue;
            }
            let range = self.range_of(&proxy.aabb);
            for y in range.y0..=range.y1 {
                for x in range.x0..=range.x1 {
                    self.cells.entry((x, y)).or_default().push(index);
                }
            }
        }
    }

    /// Emit every candidate partner of proxy `index` with a higher index.
    fn query<F>(&self, index: usize, proxies: &[BroadPhaseProxy], sleeping: bool, mut emit: F)
    where
        F: FnMut(&BroadPhaseProxy, &BroadPhaseProxy, BroadPhasePair),
    {
        let a = &proxies[index];
        if !a.collision_enabled {
            return;
        }
        let range = self.range_of(&a.aabb);
        // Own cells plus the neighbouring ring
        let x0 = (range.x0 - 1).max(0);
        let y0 = (range.y0 - 1).max(0);
        let x1 = (range.x1 + 1).min(self.cols - 1);
        let y1 = (range.y1 + 1).min(self.rows - 1);

        for y in y0..=y1 {
            for x in x0..=x1 {
                let Some(cell) = self.cells.get(&(x, y)) else {
                    continue;
                };
                for &other in cell {
                    if other <= index {
                        continue;
                    }
                    let b = &proxies[other];
                    if is_candidate(a, b, sleeping) {
                        emit(a, b, BroadPhasePair { a: index, b: other });
                    }
                }
            }
        }
    }

    fn find_sequential(&self, proxies: &[BroadPhaseProxy], sleeping: bool) -> PairMap {
        let mut pairs = PairMap::new();
        for index in 0..proxies.len() {
            self.query(index, proxies, sleeping, |a, b, pair| {
                pairs.insert(pair_key(a.id.raw(), b.id.raw()), pair);
            });
        }
        pairs
    }

    /// Split proxies into vertical slabs by x position.
    ///
    /// Dynamic bodies are spread over the x extent of all dynamic bodies;
    /// static bodies over the grid bounds.
    #[cfg_attr(not(feature = "parallel"), allow(dead_code))]
    fn partition(&self, proxies: &[BroadPhaseProxy], slabs: usize) -> Vec<Vec<usize>> {
        let mut bins = vec![Vec::new(); slabs];

        let (mut min_x, mut max_x) = (f64::INFINITY, f64::NEG_INFINITY);
        for proxy in proxies.iter().filter(|p| !p.is_static) {
            min_x = min_x.min(proxy.aabb.min.x);
            max_x = max_x.max(proxy.aabb.max.x);
        }
        let dynamic_width = (max_x - min_x) / slabs as f64;
        let static_min = self.config.bounds.min.x;
        let static_width = self.config.bounds.size().x / slabs as f64;

        for (index, proxy) in proxies.iter().enumerate() {
            let (origin, width) = if proxy.is_static {
                (static_min, static_width)
            } else {
                (min_x, dynamic_width)
            };
            let slab = if width > 0.0 && width.is_finite() {
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let s = ((proxy.position.x - origin) / width).floor().max(0.0) as usize;
                s.min(slabs - 1)
            } else {
                0
            };
            bins[slab].push(index);
        }
        bins
    }

    #[cfg(feature = "parallel")]
    fn find_parallel(&self, proxies: &[BroadPhaseProxy], sleeping: bool, slabs: usize) -> PairMap {
        use parking_lot::Mutex;
        use rayon::prelude::*;

        let bins = self.partition(proxies, slabs);
        let shared = Mutex::new(PairMap::new());

        bins.par_iter().for_each(|bin| {
            let mut local = Vec::new();
            for &index in bin {
                self.query(index, proxies, sleeping, |a, b, pair| {
                    local.push((pair_key(a.id.raw(), b.id.raw()), pair));
                });
            }
            shared.lock().extend(local);
        });

        shared.into_inner()
    }

    #[cfg(not(feature = "parallel"))]
    fn find_parallel(&self, proxies: &[BroadPhaseProxy], sleeping: bool, _slabs: usize) -> PairMap {
        self.find_sequential(proxies, sleeping)
    }

    fn effective_slabs(&self) -> usize {
        #[cfg(feature = "parallel")]
        {
            if self.slabs == 0 {
                return rayon::current_num_threads().max(1);
            }
        }
        self.slabs.max(1)
    }

    /// Re-test last step's pairs involving a fast body.
    ///
    /// A fast body can leave and re-enter contact range between two grid
    /// placements; testing its old partners directly keeps the pair alive.
    fn recheck_fast_pairs(&self, proxies: &[BroadPhaseProxy], sleeping: bool, pairs: &mut PairMap) {
        let threshold = self.config.fast_speed_threshold;
        if self.previous_pairs.is_empty() {
            return;
        }
        let fast: HashSet<BodyId> = proxies
            .iter()
            .filter(|p| p.speed > threshold)
            .map(|p| p.id)
            .collect();
        if fast.is_empty() {
            return;
        }
        let index_of: HashMap<BodyId, usize> =
            proxies.iter().enumerate().map(|(i, p)| (p.id, i)).collect();

        for &(id_a, id_b) in &self.previous_pairs {
            if !fast.contains(&id_a) && !fast.contains(&id_b) {
                continue;
            }
            let key = pair_key(id_a.raw(), id_b.raw());
            if pairs.contains_key(&key) {
                continue;
            }
            let (Some(&i), Some(&j)) = (index_of.get(&id_a), index_of.get(&id_b)) else {
                continue;
            };
            if is_candidate(&proxies[i], &proxies[j], sleeping) {
                pairs.insert(key, BroadPhasePair::new(i, j));
            }
        }
    }
}

impl BroadPhase for SpatialHashGrid {
    fn find_candidate_pairs(
        &mut self,
        proxies: &[BroadPhaseProxy],
        sleeping: bool,
    ) -> Vec<BroadPhasePair> {
        self.place(proxies);

        let slabs = self.effective_slabs();
        let mut map = if slabs > 1 {
            self.find_parallel(proxies, sleeping, slabs)
        } else {
            self.find_sequential(proxies, sleeping)
        };
        self.recheck_fast_pairs(proxies, sleeping, &mut map);

        let mut pairs: Vec<BroadPhasePair> = map.into_values().collect();
        pairs.sort_unstable();

        self.previous_pairs = pairs
            .iter()
            .map(|p| (proxies[p.a].id, proxies[p.b].id))
            .collect();
        trace!(pairs = pairs.len(), cells = self.cells.len(), slabs, "SHG pass");
        pairs
    }
}

#[allow(clippy::cast_possible_truncation)]
fn clamp_cell(coord: f64, count: i32) -> i32 {
    if coord.is_nan() {
        return 0;
    }
    (coord.floor().clamp(0.0, f64::from(count - 1))) as i32
}
