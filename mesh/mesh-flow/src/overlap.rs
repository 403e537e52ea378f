//! Detection of overlapping (seam-duplicate) vertices.
//!
//! Mesh authoring splits a topological point into several vertices wherever
//! texture coordinates are discontinuous. Those duplicates share a position
//! but not an index, so they are found geometrically: `u` overlaps `v` when
//! `|pos(v) - pos(u)|² < epsilon`.

// Mesh processing uses u32 vertex indices; casts are safe for practical mesh sizes.
#![allow(clippy::cast_possible_truncation)]

use hashbrown::HashMap;
use mesh_types::{MeshSnapshot, Point3};
use rayon::prelude::*;
use smallvec::SmallVec;
use tracing::debug;

use crate::params::OverlapStrategy;

/// Per-vertex sets of overlapping vertex indices.
///
/// Each set is sorted ascending and never contains the vertex itself. The
/// relation is symmetric but not necessarily transitive; use
/// [`OverlapSets::group_of`] for the transitive class.
///
/// # Example
///
/// ```
/// use mesh_flow::{OverlapSets, OverlapStrategy};
/// use mesh_types::{MeshSnapshot, Vertex};
///
/// let vertices = vec![
///     Vertex::from_coords(0.0, 0.0, 0.0),
///     Vertex::from_coords(1.0, 0.0, 0.0),
///     Vertex::from_coords(0.0, 0.0, 0.0), // seam duplicate of vertex 0
/// ];
/// let mesh = MeshSnapshot::from_parts(vertices, vec![]);
///
/// let overlaps = OverlapSets::detect(&mesh, 1e-7, OverlapStrategy::BruteForce, false);
/// assert_eq!(overlaps.overlaps(0), &[2]);
/// assert_eq!(overlaps.overlaps(2), &[0]);
/// assert!(overlaps.overlaps(1).is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverlapSets {
    sets: Vec<SmallVec<[u32; 2]>>,
}

impl OverlapSets {
    /// Find the overlap set of every vertex in the snapshot.
    ///
    /// Each vertex only writes its own set, so with `parallel` the vertices
    /// are fanned out over the rayon pool.
    #[must_use]
    pub fn detect(
        mesh: &MeshSnapshot,
        epsilon: f64,
        strategy: OverlapStrategy,
        parallel: bool,
    ) -> Self {
        let positions: Vec<Point3<f64>> = mesh.positions().copied().collect();

        let sets = match strategy {
            OverlapStrategy::BruteForce => brute_force(&positions, epsilon, parallel),
            OverlapStrategy::SpatialHash => spatial_hash(&positions, epsilon, parallel),
        };

        let result = Self { sets };
        debug!(
            vertices = positions.len(),
            duplicates = result.duplicate_count(),
            ?strategy,
            "Calculated overlapping vertices"
        );
        result
    }

    /// Build overlap sets directly.
    ///
    /// Sets are sorted and deduplicated; the caller is responsible for symmetry.
    #[must_use]
    pub fn from_sets(sets: impl IntoIterator<Item = Vec<u32>>) -> Self {
        let sets = sets
            .into_iter()
            .map(|mut set| {
                set.sort_unstable();
                set.dedup();
                SmallVec::from_vec(set)
            })
            .collect();
        Self { sets }
    }

    /// Vertices overlapping `vertex`, sorted ascending.
    #[inline]
    #[must_use]
    pub fn overlaps(&self, vertex: usize) -> &[u32] {
        self.sets.get(vertex).map_or(&[], |s| s.as_slice())
    }

    /// Whether `other` overlaps `vertex`.
    #[inline]
    #[must_use]
    pub fn contains(&self, vertex: usize, other: u32) -> bool {
        self.overlaps(vertex).binary_search(&other).is_ok()
    }

    /// Number of vertices covered.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.sets.len()
    }

    /// Whether no vertices are covered.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Number of vertices with at least one overlap.
    #[must_use]
    pub fn duplicate_count(&self) -> usize {
        self.sets.iter().filter(|s| !s.is_empty()).count()
    }

    /// Check that `u ∈ overlaps(v) ⇔ v ∈ overlaps(u)` for all pairs.
    #[must_use]
    pub fn is_symmetric(&self) -> bool {
        self.sets.iter().enumerate().all(|(vertex, set)| {
            set.iter()
                .all(|&other| self.contains(other as usize, vertex as u32))
        })
    }

    /// The transitive overlap class containing `vertex`, sorted ascending.
    ///
    /// Always contains `vertex` itself.
    #[must_use]
    pub fn group_of(&self, vertex: usize) -> Vec<u32> {
        let mut group = vec![vertex as u32];
        let mut cursor = 0;
        while cursor < group.len() {
            let current = group[cursor] as usize;
            for &other in self.overlaps(current) {
                if !group.contains(&other) {
                    group.push(other);
                }
            }
            cursor += 1;
        }
        group.sort_unstable();
        group
    }

    /// Partition all vertices into transitive overlap classes.
    ///
    /// Groups are ordered by their lowest member; singletons are included.
    #[must_use]
    pub fn groups(&self) -> Vec<Vec<u32>> {
        let mut assigned = vec![false; self.sets.len()];
        let mut groups = Vec::new();

        for vertex in 0..self.sets.len() {
            if assigned[vertex] {
                continue;
            }
            let group = self.group_of(vertex);
            for &member in &group {
                assigned[member as usize] = true;
            }
            groups.push(group);
        }

        groups
    }
}

fn overlaps_for(positions: &[Point3<f64>], vertex: usize, epsilon: f64) -> SmallVec<[u32; 2]> {
    let position = &positions[vertex];
    positions
        .iter()
        .enumerate()
        .filter(|&(search, other)| {
            search != vertex && (position - other).norm_squared() < epsilon
        })
        .map(|(search, _)| search as u32)
        .collect()
}

fn brute_force(positions: &[Point3<f64>], epsilon: f64, parallel: bool) -> Vec<SmallVec<[u32; 2]>> {
    if parallel {
        (0..positions.len())
            .into_par_iter()
            .map(|vertex| overlaps_for(positions, vertex, epsilon))
            .collect()
    } else {
        (0..positions.len())
            .map(|vertex| overlaps_for(positions, vertex, epsilon))
            .collect()
    }
}

fn spatial_hash(
    positions: &[Point3<f64>],
    epsilon: f64,
    parallel: bool,
) -> Vec<SmallVec<[u32; 2]>> {
    // Nothing can be strictly closer than zero.
    if epsilon <= 0.0 {
        return vec![SmallVec::new(); positions.len()];
    }

    // A pair closer than sqrt(epsilon) differs by at most one cell per axis.
    let cell_size = epsilon.sqrt();
    let mut grid: HashMap<(i64, i64, i64), Vec<u32>> = HashMap::new();
    for (idx, position) in positions.iter().enumerate() {
        grid.entry(pos_to_cell(position, cell_size))
            .or_default()
            .push(idx as u32);
    }

    let scan = |vertex: usize| -> SmallVec<[u32; 2]> {
        let position = &positions[vertex];
        let cell = pos_to_cell(position, cell_size);
        let mut found: SmallVec<[u32; 2]> = SmallVec::new();

        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    let neighbor_cell = (
                        cell.0.saturating_add(dx),
                        cell.1.saturating_add(dy),
                        cell.2.saturating_add(dz),
                    );
                    let Some(candidates) = grid.get(&neighbor_cell) else {
                        continue;
                    };
                    for &other in candidates {
                        if other as usize != vertex
                            && (position - &positions[other as usize]).norm_squared() < epsilon
                        {
                            found.push(other);
                        }
                    }
                }
            }
        }

        found.sort_unstable();
        found.dedup();
        found
    };

    if parallel {
        (0..positions.len()).into_par_iter().map(scan).collect()
    } else {
        (0..positions.len()).map(scan).collect()
    }
}

/// Convert position to spatial hash cell.
#[allow(clippy::cast_possible_truncation)]
fn pos_to_cell(pos: &Point3<f64>, cell_size: f64) -> (i64, i64, i64) {
    (
        (pos.x / cell_size).floor() as i64,
        (pos.y / cell_size).floor() as i64,
        (pos.z / cell_size).floor() as i64,
    )
}
