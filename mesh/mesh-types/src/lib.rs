//! Core mesh types for vertex flow baking.
//!
//! This crate provides the read-only inputs and per-vertex outputs shared by
//! the flow baking engine and its collaborators:
//!
//! - [`Vertex`] - A point in 3D space with its normal
//! - [`MeshSnapshot`] - Vertices plus one flat triangle index list per submesh
//! - [`VertexColor`] - Linear RGBA color, with the direction encoding used by baked flow maps
//!
//! # Layer 0 Crate
//!
//! This is a Layer 0 crate with **zero Bevy dependencies**. It can be used in:
//! - CLI tools
//! - Web applications (WASM)
//! - Servers
//! - Other game engines
//!
//! # Units
//!
//! This library is **unit-agnostic**. Positions and normals are `f64`,
//! colors are `f32`. Seeds handed to the baker must live in the same space
//! as the snapshot positions (or be related to it by the baker's seed transform).
//!
//! # Example
//!
//! ```
//! use mesh_types::{MeshSnapshot, Vertex};
//!
//! let mut mesh = MeshSnapshot::new();
//! mesh.vertices.push(Vertex::from_coords(0.0, 0.0, 0.0));
//! mesh.vertices.push(Vertex::from_coords(1.0, 0.0, 0.0));
//! mesh.vertices.push(Vertex::from_coords(0.0, 1.0, 0.0));
//! mesh.submeshes.push(vec![0, 1, 2]);
//!
//! assert_eq!(mesh.vertex_count(), 3);
//! assert_eq!(mesh.triangle_count(), 1);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

mod mesh;
mod vertex;

pub use mesh::MeshSnapshot;
pub use vertex::{Vertex, VertexColor};

// Re-export nalgebra types for convenience
pub use nalgebra::{Matrix4, Point3, Vector3};
