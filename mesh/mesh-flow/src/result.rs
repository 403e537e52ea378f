//! Bake outputs.

use mesh_types::{Vector3, VertexColor};

/// Counters collected while walking.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkStats {
    /// Vertices enqueued by seeding.
    pub seeds: usize,
    /// Layers processed.
    pub layers: usize,
    /// Vertices walked, including seam duplicates marked through their group.
    pub walked: usize,
    /// Flow samples recorded.
    pub contributions: usize,
    /// Edges rejected as redundant contributions.
    pub redundant_skipped: usize,
    /// Edges rejected because their direction could not be normalized.
    pub degenerate_skipped: usize,
}

/// Per-vertex averaged flow directions and their color encoding.
///
/// Indexed by vertex. Vertices the walk never reached keep a zero direction,
/// a transparent color and `is_reached() == false`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlowField {
    directions: Vec<Vector3<f64>>,
    colors: Vec<VertexColor>,
    reached: Vec<bool>,
}

impl FlowField {
    /// A field of `vertex_count` unreached vertices.
    #[must_use]
    pub fn unreached(vertex_count: usize) -> Self {
        Self {
            directions: vec![Vector3::zeros(); vertex_count],
            colors: vec![VertexColor::TRANSPARENT; vertex_count],
            reached: vec![false; vertex_count],
        }
    }

    /// Store an averaged direction and its color for a reached vertex.
    pub fn set(&mut self, vertex: usize, direction: Vector3<f64>) {
        self.directions[vertex] = direction;
        self.colors[vertex] = VertexColor::from_direction(&direction);
        self.reached[vertex] = true;
    }

    /// Number of vertices covered.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.directions.len()
    }

    /// Whether the field covers no vertices.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.directions.is_empty()
    }

    /// Averaged direction of a vertex.
    #[inline]
    #[must_use]
    pub fn direction(&self, vertex: usize) -> Option<&Vector3<f64>> {
        self.directions.get(vertex)
    }

    /// Encoded color of a vertex.
    #[inline]
    #[must_use]
    pub fn color(&self, vertex: usize) -> Option<VertexColor> {
        self.colors.get(vertex).copied()
    }

    /// Whether the walk reached the vertex.
    #[inline]
    #[must_use]
    pub fn is_reached(&self, vertex: usize) -> bool {
        self.reached.get(vertex).copied().unwrap_or(false)
    }

    /// Number of reached vertices.
    #[must_use]
    pub fn reached_count(&self) -> usize {
        self.reached.iter().filter(|&&r| r).count()
    }

    /// All averaged directions.
    #[inline]
    #[must_use]
    pub fn directions(&self) -> &[Vector3<f64>] {
        &self.directions
    }

    /// All encoded colors, ready to be written back to the mesh.
    #[inline]
    #[must_use]
    pub fn colors(&self) -> &[VertexColor] {
        &self.colors
    }

    /// Consume the field, returning `(directions, colors)`.
    #[must_use]
    pub fn into_parts(self) -> (Vec<Vector3<f64>>, Vec<VertexColor>) {
        (self.directions, self.colors)
    }
}

/// Everything a completed bake produces.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlowBake {
    /// Averaged directions and colors.
    pub field: FlowField,
    /// Walk counters.
    pub stats: WalkStats,
    /// Recorded `(from, to)` contributions, in walk order. Useful for
    /// drawing flow rays in a debug view.
    pub edges: Vec<(u32, u32)>,
}

impl FlowBake {
    /// Colors for every vertex.
    #[inline]
    #[must_use]
    pub fn colors(&self) -> &[VertexColor] {
        self.field.colors()
    }
}
