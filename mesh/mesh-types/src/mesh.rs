//! Immutable mesh snapshot consumed by the flow baker.

use crate::Vertex;
use nalgebra::{Point3, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A triangle mesh partitioned into submeshes.
///
/// Vertices are shared by index across the whole snapshot. Each submesh is a
/// flat index list grouped in runs of three: slot `t` belongs to triangle
/// `t / 3`, whose slots are `3 * (t / 3)..3 * (t / 3) + 3`.
///
/// The snapshot is not validated on construction; the baker rejects malformed
/// index lists before doing any work.
///
/// # Example
///
/// ```
/// use mesh_types::{MeshSnapshot, Vertex};
///
/// let vertices = vec![
///     Vertex::from_coords(0.0, 0.0, 0.0),
///     Vertex::from_coords(1.0, 0.0, 0.0),
///     Vertex::from_coords(0.0, 1.0, 0.0),
/// ];
/// let mesh = MeshSnapshot::from_parts(vertices, vec![vec![0, 1, 2]]);
///
/// assert_eq!(mesh.submesh_count(), 1);
/// assert_eq!(mesh.triangle_count(), 1);
/// ```
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MeshSnapshot {
    /// Vertex data.
    pub vertices: Vec<Vertex>,

    /// One flat triangle index list per submesh.
    pub submeshes: Vec<Vec<u32>>,
}

impl MeshSnapshot {
    /// Create a new empty snapshot.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            vertices: Vec::new(),
            submeshes: Vec::new(),
        }
    }

    /// Create a snapshot from vertices and submesh index lists.
    #[inline]
    #[must_use]
    pub const fn from_parts(vertices: Vec<Vertex>, submeshes: Vec<Vec<u32>>) -> Self {
        Self {
            vertices,
            submeshes,
        }
    }

    /// Create a single-submesh snapshot from triangle faces.
    ///
    /// # Example
    ///
    /// ```
    /// use mesh_types::{MeshSnapshot, Vertex};
    ///
    /// let vertices = vec![
    ///     Vertex::from_coords(0.0, 0.0, 0.0),
    ///     Vertex::from_coords(1.0, 0.0, 0.0),
    ///     Vertex::from_coords(1.0, 1.0, 0.0),
    ///     Vertex::from_coords(0.0, 1.0, 0.0),
    /// ];
    /// let mesh = MeshSnapshot::from_faces(vertices, &[[0, 1, 2], [0, 2, 3]]);
    /// assert_eq!(mesh.submeshes[0], vec![0, 1, 2, 0, 2, 3]);
    /// ```
    #[must_use]
    pub fn from_faces(vertices: Vec<Vertex>, faces: &[[u32; 3]]) -> Self {
        let indices = faces.iter().flatten().copied().collect();
        Self {
            vertices,
            submeshes: vec![indices],
        }
    }

    /// Create a snapshot from raw coordinate arrays.
    ///
    /// # Arguments
    ///
    /// * `positions` - Flat array `[x0, y0, z0, x1, y1, z1, ...]`
    /// * `normals` - Flat array of the same layout, or empty for zero normals
    /// * `submeshes` - One flat index list per submesh
    ///
    /// Returns an empty snapshot if `positions` is not divisible by 3 or
    /// `normals` is non-empty and differs in length from `positions`.
    ///
    /// # Example
    ///
    /// ```
    /// use mesh_types::MeshSnapshot;
    ///
    /// let positions = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
    /// let mesh = MeshSnapshot::from_raw(&positions, &[], vec![vec![0, 1, 2]]);
    /// assert_eq!(mesh.vertex_count(), 3);
    /// ```
    #[must_use]
    pub fn from_raw(positions: &[f64], normals: &[f64], submeshes: Vec<Vec<u32>>) -> Self {
        if positions.len() % 3 != 0 || (!normals.is_empty() && normals.len() != positions.len()) {
            return Self::new();
        }

        let vertices = if normals.is_empty() {
            positions
                .chunks_exact(3)
                .map(|p| Vertex::from_coords(p[0], p[1], p[2]))
                .collect()
        } else {
            positions
                .chunks_exact(3)
                .zip(normals.chunks_exact(3))
                .map(|(p, n)| {
                    Vertex::with_normal(Point3::new(p[0], p[1], p[2]), Vector3::new(n[0], n[1], n[2]))
                })
                .collect()
        };

        Self {
            vertices,
            submeshes,
        }
    }

    /// Number of vertices.
    #[inline]
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Number of submeshes.
    #[inline]
    #[must_use]
    pub fn submesh_count(&self) -> usize {
        self.submeshes.len()
    }

    /// Number of complete triangles across all submeshes.
    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.submeshes.iter().map(|s| s.len() / 3).sum()
    }

    /// Check if the snapshot has no vertices or no triangles.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() || self.triangle_count() == 0
    }

    /// Position of a vertex, or `None` if out of bounds.
    #[inline]
    #[must_use]
    pub fn position(&self, index: usize) -> Option<&Point3<f64>> {
        self.vertices.get(index).map(|v| &v.position)
    }

    /// Iterate over vertex positions in index order.
    pub fn positions(&self) -> impl ExactSizeIterator<Item = &Point3<f64>> {
        self.vertices.iter().map(|v| &v.position)
    }

    /// Iterate over vertex normals in index order.
    pub fn normals(&self) -> impl ExactSizeIterator<Item = &Vector3<f64>> {
        self.vertices.iter().map(|v| &v.normal)
    }
}
