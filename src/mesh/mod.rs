//! The oriented triangle mesh underlying a triangulation.
//!
//! All traversal is done through [OrientedEdge] handles, a (triangle,
//! orientation) pair that can be rotated within its triangle for free and
//! crossed over to the neighboring triangle through the [Mesh].

mod handles;
mod oriented_edge;
#[allow(clippy::module_inception)]
mod mesh;

pub use handles::{FixedSubsegmentHandle, FixedTriangleHandle, FixedVertexHandle};
pub use mesh::{Mesh, VertexKind};
pub use oriented_edge::OrientedEdge;
