mod clip;
mod dual;

use num_traits::Float;

use crate::divconq::Triangulation;
use crate::mesh::{FixedTriangleHandle, FixedVertexHandle};
use crate::rectangle::BoundingRect;
use crate::{DwyerNum, HasPosition, Point2};

/// A Voronoi diagram in half edge representation, dual to a Delaunay
/// triangulation.
///
/// Voronoi vertices are the circumcenters of the triangulation's triangles,
/// one face exists per input vertex (its generator) and every edge between
/// two cells is split into a pair of twin half edges. Cells of generators on
/// the convex hull are unbounded; their outermost edges are rays that can be
/// resolved against a bounding rectangle ([VoronoiDiagram::clipped]) or
/// against the triangulation's own boundary subsegments
/// ([VoronoiDiagram::bounded]).
#[derive(Debug, Clone)]
pub struct VoronoiDiagram<S> {
    vertices: Vec<Point2<S>>,
    half_edges: Vec<VoronoiHalfEdge<S>>,
    faces: Vec<VoronoiFace<S>>,
    /// Outgoing ray half edges, one per boundary edge of the mesh.
    rays: Vec<u32>,
    /// The triangle that produced each of the first `num_triangles`
    /// Voronoi vertices.
    sources: Vec<FixedTriangleHandle>,
}

/// A directed edge of a Voronoi cell. The cell's interior lies to its left.
#[derive(Debug, Clone, Copy)]
pub struct VoronoiHalfEdge<S> {
    pub(crate) origin: Option<u32>,
    pub(crate) end: Option<u32>,
    /// The outward direction of the unbounded end if this edge is a ray.
    pub(crate) direction: Option<Point2<S>>,
    pub(crate) face: u32,
    pub(crate) twin: Option<u32>,
    pub(crate) next: Option<u32>,
}

impl<S: DwyerNum> VoronoiHalfEdge<S> {
    /// The index of the Voronoi vertex this edge starts at, if any.
    ///
    /// `None` for rays coming in from infinity that have not been resolved
    /// against a boundary yet.
    pub fn origin(&self) -> Option<usize> {
        self.origin.map(|index| index as usize)
    }

    /// The index of the Voronoi vertex this edge ends at, if any.
    pub fn end(&self) -> Option<usize> {
        self.end.map(|index| index as usize)
    }

    /// The index of the face this edge belongs to.
    pub fn face(&self) -> usize {
        self.face as usize
    }

    /// The oppositely directed half edge of the adjacent cell.
    ///
    /// `None` for closure edges created by boundary resolution, which run
    /// along the boundary and have no cell on their right.
    pub fn twin(&self) -> Option<usize> {
        self.twin.map(|index| index as usize)
    }

    /// The next half edge of the same cell in counterclockwise order.
    pub fn next(&self) -> Option<usize> {
        self.next.map(|index| index as usize)
    }

    /// Returns `true` if this edge extends to infinity until resolved.
    pub fn is_ray(&self) -> bool {
        self.direction.is_some()
    }

    /// The outward direction of the unbounded end for rays.
    pub fn direction(&self) -> Option<Point2<S>> {
        self.direction
    }
}

/// A Voronoi cell, owned by its generator vertex.
#[derive(Debug, Clone, Copy)]
pub struct VoronoiFace<S> {
    pub(crate) generator: FixedVertexHandle,
    pub(crate) position: Point2<S>,
    pub(crate) first_edge: Option<u32>,
    pub(crate) bounded: bool,
}

impl<S: DwyerNum> VoronoiFace<S> {
    /// The triangulation vertex that generates this cell.
    pub fn generator(&self) -> FixedVertexHandle {
        self.generator
    }

    /// The generator's position.
    pub fn position(&self) -> Point2<S> {
        self.position
    }

    /// An arbitrary half edge of this cell, or `None` if the generator does
    /// not take part in the triangulation.
    ///
    /// For unbounded cells this is the first edge of the open chain, so that
    /// following [VoronoiHalfEdge::next] visits every edge of the cell.
    pub fn first_edge(&self) -> Option<usize> {
        self.first_edge.map(|index| index as usize)
    }

    /// Returns `true` if this cell forms a closed polygon.
    ///
    /// Cells are unbounded until their rays have been resolved against a
    /// boundary. A cell can also stay open after boundary resolution if no
    /// valid boundary intersection was found for one of its rays.
    pub fn is_bounded(&self) -> bool {
        self.bounded
    }
}

impl<S: DwyerNum + Float> VoronoiDiagram<S> {
    /// Builds the Voronoi diagram of a triangulation without resolving the
    /// rays of unbounded cells.
    pub fn new<V>(triangulation: &Triangulation<V>) -> Self
    where
        V: HasPosition<Scalar = S>,
    {
        dual::build(triangulation)
    }

    /// Builds the Voronoi diagram and clips its rays against a rectangle.
    ///
    /// Every ray that intersects the rectangle boundary receives a boundary
    /// vertex as its far endpoint and open cells are closed by edges running
    /// along the rectangle, inserting rectangle corners as needed. A cell
    /// whose rays never reach the rectangle is left open; resolution is best
    /// effort for edges lying entirely outside of the rectangle.
    pub fn clipped<V>(triangulation: &Triangulation<V>, rect: &BoundingRect<S>) -> Self
    where
        V: HasPosition<Scalar = S>,
    {
        let mut diagram = dual::build(triangulation);
        clip::resolve_rectangle(&mut diagram, rect);
        diagram
    }

    /// Builds the Voronoi diagram of a constrained triangulation, bounded by
    /// the triangulation's own boundary subsegments.
    ///
    /// Edges that leave the domain are cut at the boundary, cells of boundary
    /// generators are closed along the subsegments and triangles whose
    /// circumcenter falls on the far side of a subsegment are treated as
    /// blinded by it. Cells for which no valid boundary intersection exists
    /// are left open, check [VoronoiFace::is_bounded].
    pub fn bounded<V>(triangulation: &Triangulation<V>) -> Self
    where
        V: HasPosition<Scalar = S>,
    {
        let mut diagram = dual::build(triangulation);
        clip::resolve_domain(&mut diagram, triangulation);
        diagram
    }
}

impl<S: DwyerNum> VoronoiDiagram<S> {
    /// The number of Voronoi vertices, including vertices added by boundary
    /// resolution.
    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// The position of a Voronoi vertex.
    pub fn vertex_position(&self, vertex: usize) -> Point2<S> {
        self.vertices[vertex]
    }

    /// The number of half edges, including closure edges added by boundary
    /// resolution.
    pub fn num_half_edges(&self) -> usize {
        self.half_edges.len()
    }

    /// Returns a half edge by index.
    pub fn half_edge(&self, edge: usize) -> &VoronoiHalfEdge<S> {
        &self.half_edges[edge]
    }

    /// One face per input vertex, in input vertex order.
    pub fn num_faces(&self) -> usize {
        self.faces.len()
    }

    /// Returns a face by index. Face indices equal the indices of their
    /// generator vertices.
    pub fn face(&self, face: usize) -> &VoronoiFace<S> {
        &self.faces[face]
    }

    /// An iterator over all faces.
    pub fn faces(&self) -> impl Iterator<Item = &VoronoiFace<S>> {
        self.faces.iter()
    }

    /// The outgoing ray half edges, one per boundary edge of the mesh.
    pub fn rays(&self) -> impl Iterator<Item = usize> + '_ {
        self.rays.iter().map(|&index| index as usize)
    }

    /// The half edges of a cell in counterclockwise order.
    ///
    /// For closed cells the cycle is enumerated exactly once starting at the
    /// face's first edge, for open cells the chain is followed until it ends.
    pub fn face_edges(&self, face: usize) -> Vec<usize> {
        let mut result = Vec::new();
        let Some(first) = self.faces[face].first_edge else {
            return result;
        };
        let mut current = first;
        loop {
            result.push(current as usize);
            match self.half_edges[current as usize].next {
                Some(next) if next != first && result.len() <= self.half_edges.len() => {
                    current = next;
                }
                _ => return result,
            }
        }
    }

    /// The boundary polygon of a closed cell in counterclockwise order.
    ///
    /// Returns `None` for open cells.
    pub fn cell_polygon(&self, face: usize) -> Option<Vec<Point2<S>>> {
        if !self.faces[face].bounded {
            return None;
        }
        let mut result = Vec::new();
        for edge in self.face_edges(face) {
            result.push(self.vertices[self.half_edges[edge].origin? as usize]);
        }
        Some(result)
    }
}

#[cfg(test)]
mod test {
    use approx::assert_relative_eq;

    use super::VoronoiDiagram;
    use crate::divconq::triangulate;
    use crate::mesh::FixedVertexHandle;
    use crate::rectangle::BoundingRect;
    use crate::test_utilities::{random_points_with_seed, SEED};
    use crate::Point2;

    fn signed_area(polygon: &[Point2<f64>]) -> f64 {
        let mut doubled = 0.0;
        for (index, p) in polygon.iter().enumerate() {
            let q = polygon[(index + 1) % polygon.len()];
            doubled += p.x * q.y - q.x * p.y;
        }
        doubled * 0.5
    }

    fn assert_convex_ccw(polygon: &[Point2<f64>]) {
        assert!(polygon.len() >= 3);
        for index in 0..polygon.len() {
            let a = polygon[index];
            let b = polygon[(index + 1) % polygon.len()];
            let c = polygon[(index + 2) % polygon.len()];
            let cross = (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x);
            assert!(cross >= -1.0e-9, "polygon is not convex ccw: {polygon:?}");
        }
    }

    #[test]
    fn test_single_triangle_dual() {
        let triangulation = triangulate(vec![
            Point2::new(0.0, 0.0),
            Point2::new(4.0, 0.0),
            Point2::new(2.0, 3.0),
        ])
        .unwrap();
        let diagram = VoronoiDiagram::new(&triangulation);

        assert_eq!(diagram.num_vertices(), 1);
        assert_relative_eq!(diagram.vertex_position(0).x, 2.0);
        assert_relative_eq!(diagram.vertex_position(0).y, 5.0 / 6.0);
        assert_eq!(diagram.num_faces(), 3);
        assert_eq!(diagram.rays().count(), 3);
        assert!(diagram.faces().all(|face| !face.is_bounded()));
    }

    #[test]
    fn test_square_dual_shares_circumcenter() {
        let triangulation = triangulate(vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(1.0, 1.0),
            Point2::new(0.0, 1.0),
        ])
        .unwrap();
        let diagram = VoronoiDiagram::new(&triangulation);

        // Both triangles of the square are co-circular, their circumcenters
        // coincide in the middle.
        assert_eq!(diagram.num_vertices(), 2);
        for vertex in 0..2 {
            assert_relative_eq!(diagram.vertex_position(vertex).x, 0.5);
            assert_relative_eq!(diagram.vertex_position(vertex).y, 0.5);
        }
    }

    #[test]
    fn test_duality_and_cycles() {
        let triangulation = triangulate(random_points_with_seed(30, SEED)).unwrap();
        let diagram = VoronoiDiagram::new(&triangulation);

        assert_eq!(diagram.num_faces(), triangulation.num_vertices());
        let bounded = diagram.faces().filter(|face| face.is_bounded()).count();
        assert_eq!(bounded, triangulation.num_vertices() - triangulation.hull_size());

        for edge_index in 0..diagram.num_half_edges() {
            let edge = diagram.half_edge(edge_index);
            let (Some(origin), Some(end)) = (edge.origin(), edge.end()) else {
                continue;
            };
            // Every voronoi vertex on an edge between two cells is equidistant
            // from both generators.
            let twin = diagram.half_edge(edge.twin().unwrap());
            let this_generator = diagram.face(edge.face()).position();
            let other_generator = diagram.face(twin.face()).position();
            for vertex in [origin, end] {
                let position = diagram.vertex_position(vertex);
                assert_relative_eq!(
                    position.distance_2(this_generator),
                    position.distance_2(other_generator),
                    epsilon = 1.0e-8,
                );
            }
        }

        // Closed cells form consistent counterclockwise cycles.
        for face_index in 0..diagram.num_faces() {
            if !diagram.face(face_index).is_bounded() {
                continue;
            }
            let edges = diagram.face_edges(face_index);
            assert!(edges.len() >= 3);
            for (position, &edge_index) in edges.iter().enumerate() {
                let edge = diagram.half_edge(edge_index);
                let next = diagram.half_edge(edges[(position + 1) % edges.len()]);
                assert_eq!(edge.face(), face_index);
                assert_eq!(edge.end(), next.origin());
            }
            let polygon = diagram.cell_polygon(face_index).unwrap();
            assert!(signed_area(&polygon) > 0.0);
        }
    }

    #[test]
    fn test_clipped_three_points() {
        let triangulation = triangulate(vec![
            Point2::new(0.0, 0.0),
            Point2::new(4.0, 0.0),
            Point2::new(2.0, 3.0),
        ])
        .unwrap();
        let rect = BoundingRect::from_corners(Point2::new(-10.0, -10.0), Point2::new(10.0, 10.0));
        let diagram = VoronoiDiagram::clipped(&triangulation, &rect);

        assert_eq!(diagram.num_faces(), 3);
        for face_index in 0..3 {
            assert!(diagram.face(face_index).is_bounded());
            let polygon = diagram.cell_polygon(face_index).unwrap();
            assert_convex_ccw(&polygon);
        }

        // The three cells tile the rectangle.
        let total: f64 = (0..3)
            .map(|face| signed_area(&diagram.cell_polygon(face).unwrap()))
            .sum();
        assert_relative_eq!(total, 400.0, epsilon = 1.0e-8);
    }

    #[test]
    fn test_clipped_resolved_endpoints_on_boundary() {
        let triangulation = triangulate(random_points_with_seed(40, SEED)).unwrap();
        let rect = BoundingRect::from_corners(Point2::new(-5.0, -5.0), Point2::new(5.0, 5.0));
        let diagram = VoronoiDiagram::clipped(&triangulation, &rect);

        for ray in diagram.rays() {
            let Some(end) = diagram.half_edge(ray).end() else {
                continue;
            };
            let position = diagram.vertex_position(end);
            let on_x = position.x == -5.0 || position.x == 5.0;
            let on_y = position.y == -5.0 || position.y == 5.0;
            assert!(on_x || on_y, "resolved ray endpoint {position:?} is not on the boundary");
        }
    }

    #[test]
    fn test_clipped_unreachable_rectangle() {
        // The rectangle lies far away from every ray, no cell can be closed.
        let triangulation = triangulate(vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(0.5, 1.0),
        ])
        .unwrap();
        let rect = BoundingRect::from_corners(Point2::new(50.0, 0.0), Point2::new(51.0, 1.0));
        let diagram = VoronoiDiagram::clipped(&triangulation, &rect);
        assert!(diagram.faces().any(|face| !face.is_bounded()));
    }

    #[test]
    fn test_bounded_square_domain() {
        let mut triangulation = triangulate(vec![
            Point2::new(0.0, 0.0),
            Point2::new(2.0, 0.0),
            Point2::new(2.0, 2.0),
            Point2::new(0.0, 2.0),
            Point2::new(1.0, 1.0),
        ])
        .unwrap();
        for (from, to) in [(0, 1), (1, 2), (2, 3), (3, 0)] {
            triangulation
                .insert_segment(
                    FixedVertexHandle::new(from),
                    FixedVertexHandle::new(to),
                    1,
                )
                .unwrap();
        }
        triangulation.carve_holes(&[]);

        let diagram = VoronoiDiagram::bounded(&triangulation);
        assert_eq!(diagram.num_faces(), 5);
        let mut total = 0.0;
        for face_index in 0..diagram.num_faces() {
            assert!(diagram.face(face_index).is_bounded());
            let polygon = diagram.cell_polygon(face_index).unwrap();
            let area = signed_area(&polygon);
            assert!(area > 0.0);
            total += area;
        }
        // The cells tile the square domain.
        assert_relative_eq!(total, 4.0, epsilon = 1.0e-8);
    }

    #[test]
    fn test_bounded_obtuse_domain() {
        // The single triangle's circumcenter lies far below the domain; the
        // cells must be cut back to the boundary instead of reaching it.
        let mut triangulation = triangulate(vec![
            Point2::new(0.0, 0.0),
            Point2::new(4.0, 0.0),
            Point2::new(2.0, 0.5),
        ])
        .unwrap();
        for (from, to) in [(0, 1), (1, 2), (2, 0)] {
            triangulation
                .insert_segment(
                    FixedVertexHandle::new(from),
                    FixedVertexHandle::new(to),
                    1,
                )
                .unwrap();
        }
        triangulation.carve_holes(&[]);

        let diagram = VoronoiDiagram::bounded(&triangulation);
        assert_eq!(diagram.num_faces(), 3);
        let mut total = 0.0;
        for face_index in 0..diagram.num_faces() {
            assert!(diagram.face(face_index).is_bounded(), "face {face_index} is open");
            let polygon = diagram.cell_polygon(face_index).unwrap();
            for position in &polygon {
                assert!(
                    position.y >= -1.0e-9 && position.y <= 0.5 + 1.0e-9,
                    "cell vertex {position:?} lies outside the domain"
                );
            }
            let area = signed_area(&polygon);
            assert!(area > 0.0);
            total += area;
        }
        assert_relative_eq!(total, 1.0, epsilon = 1.0e-8);
    }

    #[test]
    fn test_bounded_ring_domain() {
        // A carved ring: every circumcenter lies outside of the domain, so
        // every cell edge comes from a cut against the boundary.
        let mut triangulation = triangulate(vec![
            Point2::<f64>::new(-2.0, -2.0),
            Point2::new(2.0, -2.0),
            Point2::new(2.0, 2.0),
            Point2::new(-2.0, 2.0),
            Point2::new(-1.0, -1.0),
            Point2::new(1.0, -1.0),
            Point2::new(1.0, 1.0),
            Point2::new(-1.0, 1.0),
        ])
        .unwrap();
        let segments = [(0, 1), (1, 2), (2, 3), (3, 0), (4, 5), (5, 6), (6, 7), (7, 4)];
        for (from, to) in segments {
            triangulation
                .insert_segment(
                    FixedVertexHandle::new(from),
                    FixedVertexHandle::new(to),
                    1,
                )
                .unwrap();
        }
        triangulation.carve_holes(&[Point2::new(0.0, 0.0)]);
        assert_eq!(triangulation.num_triangles(), 8);

        let diagram = VoronoiDiagram::bounded(&triangulation);
        assert_eq!(diagram.num_faces(), 8);
        let mut total = 0.0;
        for face_index in 0..diagram.num_faces() {
            assert!(diagram.face(face_index).is_bounded(), "face {face_index} is open");
            let polygon = diagram.cell_polygon(face_index).unwrap();
            for position in &polygon {
                let reach = position.x.abs().max(position.y.abs());
                assert!(
                    reach >= 1.0 - 1.0e-9 && reach <= 2.0 + 1.0e-9,
                    "cell vertex {position:?} lies outside the ring"
                );
            }
            let area = signed_area(&polygon);
            assert!(area > 0.0);
            total += area;
        }
        // Four corner cells of area 1/2 and four cells of area 5/2.
        assert_relative_eq!(total, 12.0, epsilon = 1.0e-8);
    }
}
