//! Reverse index from vertices to the triangle slots that reference them.

// Slot indices are stored as u32; index lists longer than u32::MAX are unsupported.
#![allow(clippy::cast_possible_truncation)]

use mesh_types::{MeshSnapshot, Point3};
use smallvec::SmallVec;
use tracing::debug;

use crate::error::{FlowError, FlowResult};

/// Per-vertex triangle membership for a [`MeshSnapshot`].
///
/// Built once per bake. Each referenced vertex belongs to exactly one
/// submesh, and knows every slot of that submesh's index list that points at it.
///
/// # Example
///
/// ```
/// use mesh_flow::MeshTopologyIndex;
/// use mesh_types::{MeshSnapshot, Vertex};
///
/// let vertices = vec![
///     Vertex::from_coords(0.0, 0.0, 0.0),
///     Vertex::from_coords(1.0, 0.0, 0.0),
///     Vertex::from_coords(0.0, 1.0, 0.0),
/// ];
/// let mesh = MeshSnapshot::from_faces(vertices, &[[0, 1, 2]]);
///
/// let topology = MeshTopologyIndex::build(&mesh).unwrap();
/// assert_eq!(topology.triangle_slots(1), &[1]);
/// assert_eq!(topology.submesh_of(2), Some(0));
/// ```
#[derive(Debug, Clone)]
pub struct MeshTopologyIndex<'a> {
    mesh: &'a MeshSnapshot,
    submesh_of: Vec<Option<usize>>,
    triangle_slots: Vec<SmallVec<[u32; 8]>>,
}

impl<'a> MeshTopologyIndex<'a> {
    /// Build the reverse index.
    ///
    /// The whole snapshot is validated before anything is indexed.
    ///
    /// # Errors
    ///
    /// - [`FlowError::InvalidTopology`] if an index list length is not a
    ///   multiple of 3 or an index is out of bounds
    /// - [`FlowError::AmbiguousSubmeshMembership`] if a vertex is referenced
    ///   from more than one submesh
    pub fn build(mesh: &'a MeshSnapshot) -> FlowResult<Self> {
        let vertex_count = mesh.vertex_count();

        for (submesh, indices) in mesh.submeshes.iter().enumerate() {
            if indices.len() % 3 != 0 {
                return Err(FlowError::invalid_topology(
                    submesh,
                    format!("index count {} is not a multiple of 3", indices.len()),
                ));
            }
            if let Some((slot, index)) = indices
                .iter()
                .enumerate()
                .find(|&(_, &index)| index as usize >= vertex_count)
            {
                return Err(FlowError::invalid_topology(
                    submesh,
                    format!("slot {slot} references vertex {index} (mesh has {vertex_count} vertices)"),
                ));
            }
        }

        let mut submesh_of: Vec<Option<usize>> = vec![None; vertex_count];
        let mut triangle_slots: Vec<SmallVec<[u32; 8]>> = vec![SmallVec::new(); vertex_count];

        for (submesh, indices) in mesh.submeshes.iter().enumerate() {
            for (slot, &vertex) in indices.iter().enumerate() {
                let vertex_idx = vertex as usize;
                match submesh_of[vertex_idx] {
                    None => submesh_of[vertex_idx] = Some(submesh),
                    Some(first) if first != submesh => {
                        return Err(FlowError::AmbiguousSubmeshMembership {
                            vertex,
                            first,
                            second: submesh,
                        });
                    }
                    Some(_) => {}
                }
                triangle_slots[vertex_idx].push(slot as u32);
            }
        }

        debug!(
            vertices = vertex_count,
            submeshes = mesh.submesh_count(),
            triangles = mesh.triangle_count(),
            "Built topology index"
        );

        Ok(Self {
            mesh,
            submesh_of,
            triangle_slots,
        })
    }

    /// The indexed snapshot.
    #[inline]
    #[must_use]
    pub const fn mesh(&self) -> &'a MeshSnapshot {
        self.mesh
    }

    /// Number of vertices in the snapshot.
    #[inline]
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.submesh_of.len()
    }

    /// Submesh owning a vertex, or `None` if no triangle references it.
    #[inline]
    #[must_use]
    pub fn submesh_of(&self, vertex: usize) -> Option<usize> {
        self.submesh_of.get(vertex).copied().flatten()
    }

    /// Slots of the owning submesh's index list that reference a vertex.
    #[inline]
    #[must_use]
    pub fn triangle_slots(&self, vertex: usize) -> &[u32] {
        self.triangle_slots.get(vertex).map_or(&[], |s| s.as_slice())
    }

    /// Whether any triangle references the vertex.
    #[inline]
    #[must_use]
    pub fn is_referenced(&self, vertex: usize) -> bool {
        self.submesh_of(vertex).is_some()
    }

    /// Position of a vertex.
    ///
    /// # Panics
    ///
    /// Panics if `vertex` is out of bounds. Indices handed out by this index
    /// are always in bounds.
    #[inline]
    #[must_use]
    pub fn position(&self, vertex: usize) -> &Point3<f64> {
        &self.mesh.vertices[vertex].position
    }

    /// The three vertices of the triangle containing `slot` in `submesh`.
    #[must_use]
    pub fn triangle_at(&self, submesh: usize, slot: u32) -> Option<[u32; 3]> {
        let indices = self.mesh.submeshes.get(submesh)?;
        let start = slot as usize - slot as usize % 3;
        match indices.get(start..start + 3)? {
            &[a, b, c] => Some([a, b, c]),
            _ => None,
        }
    }

    /// Visit every triangle neighbour of `vertex`.
    ///
    /// Triangles are resolved through the vertex itself and through every
    /// vertex in `overlaps`, since seam duplicates are the same topological
    /// point. Neighbours equal to `vertex` or contained in `overlaps` are
    /// skipped. A neighbour shared by several triangles is visited once per
    /// triangle.
    pub fn for_each_neighbor(&self, vertex: u32, overlaps: &[u32], mut visit: impl FnMut(u32)) {
        let members = std::iter::once(vertex).chain(overlaps.iter().copied());
        for member in members {
            let Some(submesh) = self.submesh_of(member as usize) else {
                continue;
            };
            for &slot in self.triangle_slots(member as usize) {
                let Some(triangle) = self.triangle_at(submesh, slot) else {
                    continue;
                };
                for neighbor in triangle {
                    if neighbor != vertex && !overlaps.contains(&neighbor) {
                        visit(neighbor);
                    }
                }
            }
        }
    }
}
