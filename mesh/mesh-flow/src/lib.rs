//! Vertex flow-field baking for triangle meshes.
//!
//! Given a mesh and a set of seed points, this crate computes for every
//! vertex a direction describing how an effect (fur combing, liquid spread,
//! paint flow) travels outward from the seeds across the mesh, and encodes
//! it as a vertex color.
//!
//! - **Topology index** - Vertex to triangle-slot reverse lookup
//! - **Overlap detection** - Seam duplicates found by position
//! - **Flow walk** - Layered breadth-first walk recording flow samples
//! - **Averaging** - Depth-limited ancestor averaging, identical across seam duplicates
//! - **Smoothing** - Optional neighbour blending of the averaged field
//! - **Sessions** - Resumable driver with cancellation between layers
//!
//! # Layer 0 Crate
//!
//! This is a Layer 0 crate with **zero Bevy dependencies**. It can be used in:
//! - CLI tools
//! - Editor tooling
//! - Asset pipelines
//! - Other game engines
//!
//! # Algorithm
//!
//! Each seed snaps to its nearest vertex. The walk then spreads one layer
//! at a time over triangle neighbours, treating vertices that share a
//! position (UV seams) as one topological point. Every walked edge
//! `v -> w` adds the unit vector from `v` to `w` as a sample on `w`, unless
//! the two already share an ancestor. After the walk, each vertex averages
//! its samples with those of its duplicates and ancestors.
//!
//! Colors encode directions as `direction * 0.5 + 0.5` with alpha 1; use
//! [`VertexColor::to_direction`](mesh_types::VertexColor::to_direction) to
//! decode. Unreached vertices are fully transparent.
//!
//! # Example
//!
//! ```
//! use mesh_flow::{bake, FlowParams};
//! use mesh_types::{MeshSnapshot, Point3, Vertex};
//!
//! let vertices = vec![
//!     Vertex::from_coords(0.0, 0.0, 0.0),
//!     Vertex::from_coords(1.0, 0.0, 0.0),
//!     Vertex::from_coords(0.0, 1.0, 0.0),
//! ];
//! let mesh = MeshSnapshot::from_faces(vertices, &[[0, 1, 2]]);
//!
//! let result = bake(&mesh, &[Point3::origin()], &FlowParams::default()).unwrap();
//!
//! // Vertex 1 flows away from the seed along +X.
//! let direction = result.field.direction(1).unwrap();
//! assert!(direction.x > 0.0);
//! assert!(result.field.is_reached(2));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

mod averager;
mod error;
mod overlap;
mod params;
mod result;
mod session;
mod smoothing;
mod topology;
mod walker;

pub use averager::FlowAverager;
pub use error::{FlowError, FlowResult};
pub use overlap::OverlapSets;
pub use params::{FlowParams, MAX_RECURSION_DEPTH, OverlapStrategy};
pub use result::{FlowBake, FlowField, WalkStats};
pub use session::{BakeProgress, BakeStage, BakeStatus, CancelToken, FlowBakeSession, bake};
pub use smoothing::FlowSmoother;
pub use topology::MeshTopologyIndex;
pub use walker::{FlowWalker, LayerReport, VertexRecord, flow_direction};
