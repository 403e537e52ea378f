//! Seeded breadth-first walk that records flow samples.
//!
//! The walk spreads outward from the seed vertices one layer at a time. Every
//! time a frontier vertex `v` touches a triangle neighbour `w`, the edge
//! `v -> w` is recorded as a flow sample on `w` unless an equivalent
//! contribution already exists (see [`FlowWalker::already_contributed`]).
//!
//! A layer reads and writes the records of vertices other than the one being
//! processed, so a layer always runs as one sequential pass. Layers are the
//! unit of suspension for [`crate::FlowBakeSession`].

// Mesh processing uses u32 vertex indices; casts are safe for practical mesh sizes.
#![allow(clippy::cast_possible_truncation)]

use std::collections::VecDeque;

use hashbrown::HashSet;
use mesh_types::{Matrix4, Point3, Vector3};
use smallvec::SmallVec;
use tracing::{debug, warn};

use crate::error::{FlowError, FlowResult};
use crate::overlap::OverlapSets;
use crate::result::WalkStats;
use crate::topology::MeshTopologyIndex;

/// Mutable walk state of one vertex.
#[derive(Debug, Clone, Default)]
pub struct VertexRecord {
    flowed_from: HashSet<u32>,
    flow_samples: SmallVec<[Vector3<f64>; 4]>,
}

impl VertexRecord {
    /// Vertices that contributed a flow sample to this vertex.
    #[inline]
    #[must_use]
    pub const fn flowed_from(&self) -> &HashSet<u32> {
        &self.flowed_from
    }

    /// Distinct unit directions received from contributing vertices.
    #[inline]
    #[must_use]
    pub fn flow_samples(&self) -> &[Vector3<f64>] {
        &self.flow_samples
    }

    /// Record a sample; identical directions are stored once.
    fn add_sample(&mut self, direction: Vector3<f64>) {
        if !self.flow_samples.contains(&direction) {
            self.flow_samples.push(direction);
        }
    }
}

/// Summary of one processed layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerReport {
    /// One-based layer number.
    pub layer: usize,
    /// Frontier vertices processed in this layer.
    pub processed: usize,
    /// Vertices discovered for the next layer.
    pub discovered: usize,
}

/// Unit direction from one vertex position to another.
///
/// # Errors
///
/// Returns [`FlowError::DegenerateDirection`] if the positions coincide or the
/// result is not finite.
///
/// # Example
///
/// ```
/// use mesh_flow::flow_direction;
/// use mesh_types::{Point3, Vector3};
///
/// let d = flow_direction(0, 1, &Point3::origin(), &Point3::new(0.0, 2.0, 0.0)).unwrap();
/// assert_eq!(d, Vector3::y());
///
/// assert!(flow_direction(0, 1, &Point3::origin(), &Point3::origin()).is_err());
/// ```
pub fn flow_direction(
    from: u32,
    to: u32,
    from_position: &Point3<f64>,
    to_position: &Point3<f64>,
) -> FlowResult<Vector3<f64>> {
    (to_position - from_position)
        .try_normalize(f64::EPSILON)
        .filter(|d| d.iter().all(|c| c.is_finite()))
        .ok_or(FlowError::DegenerateDirection { from, to })
}

/// Layered breadth-first flow walker.
///
/// Owns the topology and overlap sets for the duration of a bake, plus the
/// per-vertex [`VertexRecord`] arena, the walked set and the double-buffered
/// frontier.
///
/// # Example
///
/// ```
/// use mesh_flow::{FlowWalker, MeshTopologyIndex, OverlapSets, OverlapStrategy};
/// use mesh_types::{Matrix4, MeshSnapshot, Point3, Vertex};
///
/// let vertices = vec![
///     Vertex::from_coords(0.0, 0.0, 0.0),
///     Vertex::from_coords(1.0, 0.0, 0.0),
///     Vertex::from_coords(0.0, 1.0, 0.0),
/// ];
/// let mesh = MeshSnapshot::from_faces(vertices, &[[0, 1, 2]]);
/// let topology = MeshTopologyIndex::build(&mesh).unwrap();
/// let overlaps = OverlapSets::detect(&mesh, 1e-7, OverlapStrategy::BruteForce, false);
///
/// let mut walker = FlowWalker::new(topology, overlaps);
/// walker.seed(&[Point3::origin()], &Matrix4::identity());
/// walker.walk();
///
/// assert_eq!(walker.walked_count(), 3);
/// assert!(walker.record(1).unwrap().flowed_from().contains(&0));
/// ```
#[derive(Debug, Clone)]
pub struct FlowWalker<'a> {
    topology: MeshTopologyIndex<'a>,
    overlaps: OverlapSets,
    records: Vec<VertexRecord>,
    walked: Vec<bool>,
    walked_count: usize,
    read: VecDeque<u32>,
    write: VecDeque<u32>,
    neighbors: Vec<u32>,
    edges: Vec<(u32, u32)>,
    stats: WalkStats,
}

impl<'a> FlowWalker<'a> {
    /// Create a walker with an empty frontier.
    #[must_use]
    pub fn new(topology: MeshTopologyIndex<'a>, overlaps: OverlapSets) -> Self {
        let vertex_count = topology.vertex_count();
        Self {
            topology,
            overlaps,
            records: vec![VertexRecord::default(); vertex_count],
            walked: vec![false; vertex_count],
            walked_count: 0,
            read: VecDeque::new(),
            write: VecDeque::new(),
            neighbors: Vec::new(),
            edges: Vec::new(),
            stats: WalkStats::default(),
        }
    }

    /// Snap each seed to its nearest vertex and enqueue it.
    ///
    /// Vertex positions are mapped through `transform` before measuring the
    /// distance to a seed. Every snapped vertex is enqueued once, including
    /// one already walked through another seed's seam duplicate. Returns the
    /// number of vertices enqueued.
    pub fn seed(&mut self, seeds: &[Point3<f64>], transform: &Matrix4<f64>) -> usize {
        let mut enqueued = 0;
        for seed in seeds {
            if !seed.coords.iter().all(|c| c.is_finite()) {
                warn!(?seed, "Ignoring non-finite seed");
                continue;
            }
            let Some(nearest) = self.nearest_vertex(seed, transform) else {
                warn!("No triangle references any vertex; seed ignored");
                continue;
            };
            self.mark_walked(nearest);
            if !self.read.contains(&nearest) {
                self.read.push_back(nearest);
                enqueued += 1;
            }
        }
        self.stats.seeds += enqueued;
        debug!(seeds = seeds.len(), enqueued, "Seeded flow walk");
        enqueued
    }

    /// Nearest triangle-referenced vertex to `point`, ties going to the lowest index.
    #[must_use]
    pub fn nearest_vertex(&self, point: &Point3<f64>, transform: &Matrix4<f64>) -> Option<u32> {
        let mut nearest = None;
        let mut nearest_distance = f64::INFINITY;
        for vertex in 0..self.topology.vertex_count() {
            if !self.topology.is_referenced(vertex) {
                continue;
            }
            let position = transform.transform_point(self.topology.position(vertex));
            let distance = (position - point).norm_squared();
            if distance < nearest_distance {
                nearest_distance = distance;
                nearest = Some(vertex as u32);
            }
        }
        nearest
    }

    /// Whether another layer is waiting to be processed.
    #[inline]
    #[must_use]
    pub fn has_pending_layer(&self) -> bool {
        !self.read.is_empty()
    }

    /// Process one full layer of the frontier.
    ///
    /// Returns `None` if the frontier is already empty.
    pub fn step_layer(&mut self) -> Option<LayerReport> {
        if self.read.is_empty() {
            return None;
        }

        let processed = self.read.len();
        debug!(frontier = processed, layer = self.stats.layers + 1, "Walking layer");

        let mut neighbors = std::mem::take(&mut self.neighbors);
        while let Some(vertex) = self.read.pop_front() {
            neighbors.clear();
            self.topology.for_each_neighbor(
                vertex,
                self.overlaps.overlaps(vertex as usize),
                |neighbor| neighbors.push(neighbor),
            );

            for &neighbor in &neighbors {
                if self.mark_walked(neighbor) {
                    self.write.push_back(neighbor);
                }
                self.contribute(vertex, neighbor);
            }
        }
        self.neighbors = neighbors;

        // The read queue is drained, so swapping leaves `write` empty.
        std::mem::swap(&mut self.read, &mut self.write);
        self.stats.layers += 1;

        let report = LayerReport {
            layer: self.stats.layers,
            processed,
            discovered: self.read.len(),
        };
        debug!(discovered = report.discovered, "Walked layer");
        Some(report)
    }

    /// Process layers until the frontier is empty. Returns the number of layers run.
    pub fn walk(&mut self) -> usize {
        let mut layers = 0;
        while self.step_layer().is_some() {
            layers += 1;
        }
        layers
    }

    /// Whether recording `from -> to` would duplicate an existing contribution.
    ///
    /// True if any of:
    /// - `to` already flowed into `from` (the edge would point back upstream)
    /// - `from` already flowed into `to`
    /// - `from` and `to` share an ancestor
    /// - for a seam duplicate `d` of `to`: `d` flowed into `from`, or `d`
    ///   shares an ancestor with `from`
    ///
    /// This suppresses the common double-counting paths but is not a proof
    /// that the recorded edges form a DAG.
    #[must_use]
    pub fn already_contributed(&self, from: u32, to: u32) -> bool {
        let from_ancestors = &self.records[from as usize].flowed_from;
        let to_ancestors = &self.records[to as usize].flowed_from;

        if from_ancestors.contains(&to) || to_ancestors.contains(&from) {
            return true;
        }
        if !to_ancestors.is_disjoint(from_ancestors) {
            return true;
        }

        self.overlaps.overlaps(to as usize).iter().any(|&duplicate| {
            from_ancestors.contains(&duplicate)
                || !self.records[duplicate as usize]
                    .flowed_from
                    .is_disjoint(from_ancestors)
        })
    }

    fn contribute(&mut self, from: u32, to: u32) {
        if self.already_contributed(from, to) {
            self.stats.redundant_skipped += 1;
            return;
        }

        let direction = flow_direction(
            from,
            to,
            self.topology.position(from as usize),
            self.topology.position(to as usize),
        );
        match direction {
            Ok(direction) => {
                let record = &mut self.records[to as usize];
                record.flowed_from.insert(from);
                record.add_sample(direction);
                self.edges.push((from, to));
                self.stats.contributions += 1;
            }
            Err(err) => {
                self.stats.degenerate_skipped += 1;
                warn!(%err, "Skipping flow sample");
            }
        }
    }

    /// Mark a vertex and its whole overlap class as walked.
    ///
    /// Returns `false` if the vertex was already walked.
    fn mark_walked(&mut self, vertex: u32) -> bool {
        if self.walked[vertex as usize] {
            return false;
        }
        self.walked[vertex as usize] = true;
        self.walked_count += 1;
        if !self.overlaps.overlaps(vertex as usize).is_empty() {
            for member in self.overlaps.group_of(vertex as usize) {
                let slot = &mut self.walked[member as usize];
                if !*slot {
                    *slot = true;
                    self.walked_count += 1;
                }
            }
        }
        self.stats.walked = self.walked_count;
        true
    }

    /// Whether the vertex has entered the walk.
    #[inline]
    #[must_use]
    pub fn is_walked(&self, vertex: usize) -> bool {
        self.walked.get(vertex).copied().unwrap_or(false)
    }

    /// Number of walked vertices.
    #[inline]
    #[must_use]
    pub const fn walked_count(&self) -> usize {
        self.walked_count
    }

    /// Iterate over walked vertex indices in ascending order.
    pub fn walked_vertices(&self) -> impl Iterator<Item = u32> + '_ {
        self.walked
            .iter()
            .enumerate()
            .filter(|&(_, &walked)| walked)
            .map(|(vertex, _)| vertex as u32)
    }

    /// Walk record of a vertex.
    #[inline]
    #[must_use]
    pub fn record(&self, vertex: usize) -> Option<&VertexRecord> {
        self.records.get(vertex)
    }

    /// All walk records, indexed by vertex.
    #[inline]
    #[must_use]
    pub fn records(&self) -> &[VertexRecord] {
        &self.records
    }

    /// Topology the walk runs over.
    #[inline]
    #[must_use]
    pub const fn topology(&self) -> &MeshTopologyIndex<'a> {
        &self.topology
    }

    /// Overlap sets the walk runs over.
    #[inline]
    #[must_use]
    pub const fn overlaps(&self) -> &OverlapSets {
        &self.overlaps
    }

    /// Number of vertices waiting in the frontier.
    #[inline]
    #[must_use]
    pub fn frontier_len(&self) -> usize {
        self.read.len()
    }

    /// Recorded `(from, to)` contributions in the order they were made.
    #[inline]
    #[must_use]
    pub fn edges(&self) -> &[(u32, u32)] {
        &self.edges
    }

    /// Counters accumulated so far.
    #[inline]
    #[must_use]
    pub const fn stats(&self) -> &WalkStats {
        &self.stats
    }

    pub(crate) fn take_edges(&mut self) -> Vec<(u32, u32)> {
        std::mem::take(&mut self.edges)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::params::OverlapStrategy;
    use mesh_types::{MeshSnapshot, Vertex};

    fn walker_for(mesh: &MeshSnapshot) -> FlowWalker<'_> {
        let topology = MeshTopologyIndex::build(mesh).unwrap();
        let overlaps = OverlapSets::detect(mesh, 1e-7, OverlapStrategy::BruteForce, false);
        FlowWalker::new(topology, overlaps)
    }

    fn single_triangle() -> MeshSnapshot {
        MeshSnapshot::from_faces(
            vec![
                Vertex::from_coords(0.0, 0.0, 0.0),
                Vertex::from_coords(1.0, 0.0, 0.0),
                Vertex::from_coords(0.0, 1.0, 0.0),
            ],
            &[[0, 1, 2]],
        )
    }

    #[test]
    fn nearest_vertex_prefers_lowest_index_on_tie() {
        let mesh = single_triangle();
        let walker = walker_for(&mesh);
        // Equidistant from vertices 1 and 2.
        let nearest = walker.nearest_vertex(&Point3::new(1.0, 1.0, 0.0), &Matrix4::identity());
        assert_eq!(nearest, Some(1));
    }

    #[test]
    fn nearest_vertex_applies_transform() {
        let mesh = single_triangle();
        let walker = walker_for(&mesh);
        let transform = Matrix4::new_translation(&Vector3::new(10.0, 0.0, 0.0));

        let nearest = walker.nearest_vertex(&Point3::new(11.0, 0.0, 0.0), &transform);
        assert_eq!(nearest, Some(1));
    }

    #[test]
    fn nearest_vertex_skips_unreferenced() {
        let mut mesh = single_triangle();
        mesh.vertices.push(Vertex::from_coords(5.0, 5.0, 5.0));
        let walker = walker_for(&mesh);

        let nearest = walker.nearest_vertex(&Point3::new(5.0, 5.0, 5.0), &Matrix4::identity());
        assert_ne!(nearest, Some(3));
    }

    #[test]
    fn duplicate_seeds_enqueue_once() {
        let mesh = single_triangle();
        let mut walker = walker_for(&mesh);
        let enqueued = walker.seed(&[Point3::origin(), Point3::new(0.01, 0.0, 0.0)], &Matrix4::identity());

        assert_eq!(enqueued, 1);
        assert_eq!(walker.frontier_len(), 1);
    }

    #[test]
    fn seeds_on_separate_seam_duplicates_both_enqueue() {
        // Vertex 3 sits 1e-4 from vertex 0, inside the default squared epsilon.
        let mesh = MeshSnapshot::from_faces(
            vec![
                Vertex::from_coords(0.0, 0.0, 0.0),
                Vertex::from_coords(1.0, 0.0, 0.0),
                Vertex::from_coords(0.0, 1.0, 0.0),
                Vertex::from_coords(1e-4, 0.0, 0.0),
                Vertex::from_coords(0.0, -1.0, 0.0),
            ],
            &[[0, 1, 2], [3, 2, 4]],
        );
        let mut walker = walker_for(&mesh);
        assert_eq!(walker.overlaps().overlaps(0), &[3]);

        let seeds = [Point3::origin(), Point3::new(1e-4, 0.0, 0.0)];
        let enqueued = walker.seed(&seeds, &Matrix4::identity());

        assert_eq!(enqueued, 2);
        assert_eq!(walker.frontier_len(), 2);
        assert_eq!(walker.walked_count(), 2);
        assert_eq!(walker.stats().seeds, 2);
    }

    #[test]
    fn single_triangle_walk() {
        let mesh = single_triangle();
        let mut walker = walker_for(&mesh);
        walker.seed(&[Point3::origin()], &Matrix4::identity());

        let first = walker.step_layer().unwrap();
        assert_eq!(first.processed, 1);
        assert_eq!(first.discovered, 2);
        walker.walk();

        assert!(walker.record(0).unwrap().flowed_from().is_empty());
        assert_eq!(walker.record(1).unwrap().flow_samples(), &[Vector3::x()]);
        assert_eq!(walker.record(2).unwrap().flow_samples(), &[Vector3::y()]);
        assert_eq!(walker.edges(), &[(0, 1), (0, 2)]);
        assert!(!walker.has_pending_layer());
    }

    #[test]
    fn redundant_contribution_rules() {
        let mesh = single_triangle();
        let mut walker = walker_for(&mesh);
        walker.seed(&[Point3::origin()], &Matrix4::identity());
        walker.step_layer();

        // Back upstream to the seed.
        assert!(walker.already_contributed(1, 0));
        // Direct repeat.
        assert!(walker.already_contributed(0, 1));
        // Siblings sharing the seed as ancestor.
        assert!(walker.already_contributed(1, 2));
        assert!(walker.already_contributed(2, 1));
    }

    #[test]
    fn degenerate_direction_is_skipped() {
        // Vertices 0 and 1 coincide but the epsilon is zero, so they do not overlap.
        let mesh = MeshSnapshot::from_faces(
            vec![
                Vertex::from_coords(0.0, 0.0, 0.0),
                Vertex::from_coords(0.0, 0.0, 0.0),
                Vertex::from_coords(0.0, 1.0, 0.0),
            ],
            &[[0, 1, 2]],
        );
        let topology = MeshTopologyIndex::build(&mesh).unwrap();
        let overlaps = OverlapSets::detect(&mesh, 0.0, OverlapStrategy::BruteForce, false);
        let mut walker = FlowWalker::new(topology, overlaps);
        walker.seed(&[Point3::origin()], &Matrix4::identity());
        walker.walk();

        // 0 -> 1 in the first layer, 1 -> 0 in the second.
        assert_eq!(walker.stats().degenerate_skipped, 2);
        assert!(walker.record(1).unwrap().flow_samples().is_empty());
        assert!(walker
            .records()
            .iter()
            .flat_map(VertexRecord::flow_samples)
            .all(|d| d.iter().all(|c| c.is_finite())));
    }

    #[test]
    fn empty_seed_list_walks_nothing() {
        let mesh = single_triangle();
        let mut walker = walker_for(&mesh);
        assert_eq!(walker.seed(&[], &Matrix4::identity()), 0);
        assert_eq!(walker.walk(), 0);
        assert_eq!(walker.walked_count(), 0);
    }

    #[test]
    fn non_finite_seed_is_ignored() {
        let mesh = single_triangle();
        let mut walker = walker_for(&mesh);
        let enqueued = walker.seed(&[Point3::new(f64::NAN, 0.0, 0.0)], &Matrix4::identity());
        assert_eq!(enqueued, 0);
    }

    #[test]
    fn walked_closure_covers_overlap_chain() {
        // 1~3 and 3~4 overlap, 1 and 4 do not overlap directly.
        let mesh = MeshSnapshot::from_faces(
            vec![
                Vertex::from_coords(0.0, 0.0, 0.0),
                Vertex::from_coords(1.0, 0.0, 0.0),
                Vertex::from_coords(0.0, 1.0, 0.0),
                Vertex::from_coords(1.0, 0.0, 0.0),
                Vertex::from_coords(1.0, 0.0, 0.0),
            ],
            &[[0, 1, 2], [3, 2, 0], [4, 2, 0]],
        );
        let topology = MeshTopologyIndex::build(&mesh).unwrap();
        let overlaps = OverlapSets::from_sets([vec![], vec![3], vec![], vec![1, 4], vec![3]]);
        let mut walker = FlowWalker::new(topology, overlaps);
        walker.seed(&[Point3::origin()], &Matrix4::identity());
        walker.step_layer();

        assert!(walker.is_walked(1));
        assert!(walker.is_walked(3));
        assert!(walker.is_walked(4));
        assert_eq!(walker.walked_count(), 5);
        assert_eq!(walker.walked_count(), walker.walked_vertices().count());
        assert_eq!(walker.stats().walked, 5);
    }
}
