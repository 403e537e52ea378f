//! Neighbour smoothing of an averaged flow field.

use mesh_types::Vector3;
use tracing::debug;

use crate::result::FlowField;
use crate::walker::FlowWalker;

/// Blends each walked vertex's direction with its triangle neighbours.
///
/// Every pass is a Jacobi step: the new direction of an overlap group is
/// `(own + Σ neighbours) / (1 + n)`, read entirely from the previous pass.
/// Neighbours are resolved through all seam duplicates of the group and
/// counted once per shared triangle. Unwalked vertices neither contribute
/// nor change.
///
/// # Example
///
/// ```
/// use mesh_flow::{FlowAverager, FlowSmoother, FlowWalker, MeshTopologyIndex, OverlapSets, OverlapStrategy};
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
/// let mut field = FlowAverager::new(5).average(&walker, false);
/// FlowSmoother::new(1).smooth(&walker, &mut field);
/// // The seed picks up its neighbours' directions.
/// assert!(field.direction(0).unwrap().norm() > 0.0);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlowSmoother {
    iterations: u32,
}

impl FlowSmoother {
    /// Create a smoother running `iterations` passes.
    #[must_use]
    pub const fn new(iterations: u32) -> Self {
        Self { iterations }
    }

    /// Number of passes.
    #[must_use]
    pub const fn iterations(&self) -> u32 {
        self.iterations
    }

    /// Smooth `field` in place.
    pub fn smooth(&self, walker: &FlowWalker<'_>, field: &mut FlowField) {
        if self.iterations == 0 {
            return;
        }

        let groups: Vec<Vec<u32>> = walker
            .overlaps()
            .groups()
            .into_iter()
            .filter(|group| group.iter().any(|&v| walker.is_walked(v as usize)))
            .collect();

        for _ in 0..self.iterations {
            let previous = field.directions().to_vec();

            for group in &groups {
                let Some((&first, rest)) = group.split_first() else {
                    continue;
                };

                let mut sum: Vector3<f64> = previous[first as usize];
                let mut neighbours = 0_u32;
                walker.topology().for_each_neighbor(first, rest, |neighbour| {
                    if walker.is_walked(neighbour as usize) {
                        sum += previous[neighbour as usize];
                        neighbours += 1;
                    }
                });

                let smoothed = sum / f64::from(neighbours + 1);
                for &member in group {
                    field.set(member as usize, smoothed);
                }
            }
        }

        debug!(
            iterations = self.iterations,
            groups = groups.len(),
            "Smoothed flow directions"
        );
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::averager::FlowAverager;
    use crate::overlap::OverlapSets;
    use crate::params::OverlapStrategy;
    use crate::topology::MeshTopologyIndex;
    use approx::assert_relative_eq;
    use mesh_types::{Matrix4, MeshSnapshot, Point3, Vertex};

    fn triangle_with_island() -> MeshSnapshot {
        MeshSnapshot::from_faces(
            vec![
                Vertex::from_coords(0.0, 0.0, 0.0),
                Vertex::from_coords(1.0, 0.0, 0.0),
                Vertex::from_coords(0.0, 1.0, 0.0),
                Vertex::from_coords(5.0, 0.0, 0.0),
                Vertex::from_coords(6.0, 0.0, 0.0),
                Vertex::from_coords(5.0, 1.0, 0.0),
            ],
            &[[0, 1, 2], [3, 4, 5]],
        )
    }

    fn walked(mesh: &MeshSnapshot) -> FlowWalker<'_> {
        let topology = MeshTopologyIndex::build(mesh).unwrap();
        let overlaps = OverlapSets::detect(mesh, 1e-7, OverlapStrategy::BruteForce, false);
        let mut walker = FlowWalker::new(topology, overlaps);
        walker.seed(&[Point3::origin()], &Matrix4::identity());
        walker.walk();
        walker
    }

    #[test]
    fn zero_iterations_is_identity() {
        let mesh = triangle_with_island();
        let walker = walked(&mesh);
        let field = FlowAverager::default().average(&walker, false);

        let mut smoothed = field.clone();
        FlowSmoother::new(0).smooth(&walker, &mut smoothed);
        assert_eq!(field, smoothed);
    }

    #[test]
    fn single_pass_averages_neighbours() {
        let mesh = triangle_with_island();
        let walker = walked(&mesh);
        let mut field = FlowAverager::default().average(&walker, false);
        // 0: zero, 1: +X/2, 2: +Y/2
        FlowSmoother::new(1).smooth(&walker, &mut field);

        assert_relative_eq!(
            *field.direction(0).unwrap(),
            Vector3::new(0.5, 0.5, 0.0) / 3.0,
            epsilon = 1e-12
        );
        assert_relative_eq!(
            *field.direction(1).unwrap(),
            Vector3::new(0.5, 0.5, 0.0) / 3.0,
            epsilon = 1e-12
        );
    }

    #[test]
    fn unwalked_island_is_untouched() {
        let mesh = triangle_with_island();
        let walker = walked(&mesh);
        let mut field = FlowAverager::default().average(&walker, false);
        FlowSmoother::new(3).smooth(&walker, &mut field);

        for vertex in 3..6 {
            assert!(!field.is_reached(vertex));
            assert_eq!(field.direction(vertex), Some(&Vector3::zeros()));
        }
    }
}
