//! # dwyer
//!
//! Delaunay triangulations and Voronoi diagrams in the plane, built with
//! Dwyer's divide and conquer algorithm.
//!
//! # Features
//! * A 2D [Delaunay triangulation](triangulate)
//!   * Uses exact predicates to avoid floating point rounding issues
//!   * Handles duplicate and collinear input points
//! * Constrained triangulations: [segments](Triangulation::insert_segment)
//!   can be forced into the triangulation and the mesh can be reduced to the
//!   domain they enclose ([Triangulation::carve_holes])
//! * The dual [Voronoi diagram](VoronoiDiagram), with unbounded cells
//!   resolved against a [rectangle](VoronoiDiagram::clipped) or against the
//!   [domain boundary](VoronoiDiagram::bounded)
//!
//! # Example
//!
//! ```
//! use dwyer::{triangulate, BoundingRect, Point2, VoronoiDiagram};
//!
//! # fn main() -> Result<(), dwyer::TriangulationError> {
//! let points = vec![
//!     Point2::new(0.0, 0.0),
//!     Point2::new(1.0, 0.0),
//!     Point2::new(1.0, 1.0),
//!     Point2::new(0.0, 1.0),
//!     Point2::new(0.4, 0.6),
//! ];
//! let triangulation = triangulate(points)?;
//! assert_eq!(triangulation.num_triangles(), 4);
//! assert_eq!(triangulation.hull_size(), 4);
//!
//! let rect = BoundingRect::from_corners(Point2::new(-1.0, -1.0), Point2::new(2.0, 2.0));
//! let diagram = VoronoiDiagram::clipped(&triangulation, &rect);
//! assert!(diagram.faces().all(|face| face.is_bounded()));
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod cdt;
mod divconq;
mod line_side_info;
mod math;
pub mod mesh;
mod point;
mod rectangle;
mod voronoi;

#[cfg(test)]
mod test_utilities;

pub use crate::cdt::PositionInTriangulation;
pub use crate::divconq::{triangulate, Triangulation};
pub use crate::line_side_info::LineSideInfo;
pub use crate::math::{
    circumcenter, contained_in_circumference, mitigate_underflow, project_point, side_query,
    validate_coordinate, validate_vertex, CoordinateError, Phase, PointProjection,
    TriangulationError, MAX_ALLOWED_VALUE, MIN_ALLOWED_VALUE,
};
pub use crate::point::{DwyerNum, HasPosition, Point2};
pub use crate::rectangle::BoundingRect;
pub use crate::voronoi::{VoronoiDiagram, VoronoiFace, VoronoiHalfEdge};
