//! Depth-limited ancestor averaging of recorded flow samples.

// Mesh processing uses u32 vertex indices; casts are safe for practical mesh sizes.
#![allow(clippy::cast_possible_truncation)]

use mesh_types::Vector3;
use rayon::prelude::*;
use smallvec::SmallVec;
use tracing::debug;

use crate::result::FlowField;
use crate::walker::FlowWalker;

/// Folds each vertex's flow samples together with those of its seam
/// duplicates and of its ancestors up to `depth` hops upstream.
///
/// For a vertex `v` at depth `d`, the samples of `v` and of every vertex
/// overlapping `v` are added to a running sum; if `d > 0` the same is done
/// for every vertex in `v.flowed_from` at depth `d - 1`. The result is
/// `sum / count`, where `count` starts at 1 so a vertex without samples
/// resolves to the zero vector.
///
/// One average is computed per transitive overlap group and written to
/// every member, so seam duplicates end up bitwise identical.
///
/// # Example
///
/// ```
/// use mesh_flow::{FlowAverager, FlowWalker, MeshTopologyIndex, OverlapSets, OverlapStrategy};
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
/// let mut walker = FlowWalker::new(topology, overlaps);
/// walker.seed(&[Point3::origin()], &Matrix4::identity());
/// walker.walk();
///
/// let field = FlowAverager::new(5).average(&walker, false);
/// // One sample of +X, divided by 1 + 1.
/// assert_eq!(field.direction(1).unwrap().x, 0.5);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlowAverager {
    depth: u32,
}

impl Default for FlowAverager {
    fn default() -> Self {
        Self::new(5)
    }
}

impl FlowAverager {
    /// Create an averager folding in `depth` ancestor hops.
    ///
    /// Ancestors are revisited without memoization, so cost grows like
    /// `branching^depth`. Bakes cap the depth at [`crate::MAX_RECURSION_DEPTH`].
    #[must_use]
    pub const fn new(depth: u32) -> Self {
        Self { depth }
    }

    /// Ancestor depth.
    #[must_use]
    pub const fn depth(&self) -> u32 {
        self.depth
    }

    /// Average every walked overlap group.
    ///
    /// Groups are independent, so with `parallel` they are fanned out over
    /// the rayon pool. The walk must be complete.
    #[must_use]
    pub fn average(&self, walker: &FlowWalker<'_>, parallel: bool) -> FlowField {
        let groups: Vec<Vec<u32>> = walker
            .overlaps()
            .groups()
            .into_iter()
            .filter(|group| group.iter().any(|&v| walker.is_walked(v as usize)))
            .collect();

        let average_group = |group: &Vec<u32>| {
            // Groups are sorted; the highest member stands in for the group.
            let representative = group.last().copied().unwrap_or_default();
            self.average_vertex(walker, representative)
        };

        let averages: Vec<Vector3<f64>> = if parallel {
            groups.par_iter().map(average_group).collect()
        } else {
            groups.iter().map(average_group).collect()
        };

        let mut field = FlowField::unreached(walker.topology().vertex_count());
        for (group, average) in groups.iter().zip(averages) {
            for &member in group {
                field.set(member as usize, average);
            }
        }

        debug!(
            groups = groups.len(),
            reached = field.reached_count(),
            depth = self.depth,
            "Averaged flow directions"
        );
        field
    }

    /// Averaged direction of a single vertex.
    #[must_use]
    pub fn average_vertex(&self, walker: &FlowWalker<'_>, vertex: u32) -> Vector3<f64> {
        let mut sum = Vector3::zeros();
        let mut count = 1_u32;
        accumulate(walker, vertex, self.depth, &mut sum, &mut count);
        sum / f64::from(count)
    }
}

fn accumulate(
    walker: &FlowWalker<'_>,
    vertex: u32,
    depth: u32,
    sum: &mut Vector3<f64>,
    count: &mut u32,
) {
    let Some(record) = walker.record(vertex as usize) else {
        return;
    };

    let duplicates = walker.overlaps().overlaps(vertex as usize);
    let samples = record.flow_samples().iter().chain(
        duplicates
            .iter()
            .filter_map(|&d| walker.record(d as usize))
            .flat_map(|r| r.flow_samples()),
    );
    for sample in samples {
        *sum += sample;
        *count += 1;
    }

    if depth == 0 {
        return;
    }

    // Fixed order keeps the floating-point sum reproducible.
    let mut ancestors: SmallVec<[u32; 8]> = record.flowed_from().iter().copied().collect();
    ancestors.sort_unstable();
    for ancestor in ancestors {
        accumulate(walker, ancestor, depth - 1, sum, count);
    }
}
