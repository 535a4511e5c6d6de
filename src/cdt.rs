use hashbrown::{HashMap, HashSet};

use crate::divconq::Triangulation;
use crate::math::{contained_in_circumference, side_query, Phase};
use crate::mesh::{
    FixedSubsegmentHandle, FixedTriangleHandle, FixedVertexHandle, Mesh, OrientedEdge, VertexKind,
};
use crate::{HasPosition, Point2, TriangulationError};

/// The result of a point location query, see [Triangulation::locate].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionInTriangulation {
    /// The point lies in the interior of a triangle.
    InTriangle(FixedTriangleHandle),
    /// The point lies on an edge.
    OnEdge(OrientedEdge),
    /// The point coincides with a vertex.
    OnVertex(FixedVertexHandle),
    /// The point lies outside of all triangles.
    Outside,
    /// The triangulation has no triangles, e.g. because all vertices are
    /// collinear.
    NoTriangulation,
}

impl<V: HasPosition> Triangulation<V> {
    /// Locates a point by walking through the mesh.
    ///
    /// The walk starts at an arbitrary triangle and crosses an edge whenever
    /// the target lies on the other side of it. For meshes that have become
    /// non convex through hole carving the walk can get stuck; in that case
    /// the query falls back to scanning all triangles.
    pub fn locate(&self, point: Point2<V::Scalar>) -> PositionInTriangulation {
        let mesh = self.mesh();
        let Some(start) = mesh.triangles().next() else {
            return PositionInTriangulation::NoTriangulation;
        };

        let mut current = start;
        let mut budget = 2 * mesh.num_triangles() + 8;
        loop {
            match classify(mesh, current, point) {
                Classification::Inside(position) => return position,
                Classification::Beyond(edge) => match mesh.neighbor(edge) {
                    Some(neighbor) => current = neighbor.triangle(),
                    None => return PositionInTriangulation::Outside,
                },
            }
            budget -= 1;
            if budget == 0 {
                break;
            }
        }

        // The walk did not terminate, scan instead.
        for triangle in mesh.triangles() {
            if let Classification::Inside(position) = classify(mesh, triangle, point) {
                return position;
            }
        }
        PositionInTriangulation::Outside
    }

    /// Forces the edge from `from` to `to` into the triangulation and pins a
    /// subsegment with the given boundary marker onto it.
    ///
    /// If the edge is not already present, all edges crossing it are deleted
    /// and the resulting cavity is retriangulated on both sides of the new
    /// edge, keeping the triangulation constrained Delaunay.
    ///
    /// Fails with [TriangulationError::MissingEdge] if an endpoint is a
    /// discarded duplicate, if the segment would cross another subsegment or
    /// if it passes exactly through a third vertex. A failed call leaves the
    /// triangulation unchanged.
    pub fn insert_segment(
        &mut self,
        from: FixedVertexHandle,
        to: FixedVertexHandle,
        marker: i32,
    ) -> Result<FixedSubsegmentHandle, TriangulationError> {
        let missing = TriangulationError::MissingEdge { from, to };
        if from == to
            || self.mesh().vertex_kind(from) == VertexKind::Undead
            || self.mesh().vertex_kind(to) == VertexKind::Undead
        {
            return Err(missing);
        }

        // Scan for an existing edge and for the wedge triangle that the
        // segment leaves `from` through.
        let mut existing = None;
        let mut wedge = None;
        let from_position = self.mesh().position(from);
        let to_position = self.mesh().position(to);
        for triangle in self.mesh().triangles() {
            for orient in 0..3 {
                let edge = OrientedEdge::new(triangle, orient);
                let org = solid(self.mesh().org(edge));
                if org != from {
                    continue;
                }
                let dest = solid(self.mesh().dest(edge));
                if dest == to {
                    existing = Some(edge);
                    continue;
                }
                let apex = solid(self.mesh().apex(edge));
                if apex == to {
                    continue;
                }
                let dest_position = self.mesh().position(dest);
                let apex_position = self.mesh().position(apex);
                if side_query(from_position, to_position, dest_position).is_on_right_side()
                    && side_query(from_position, to_position, apex_position).is_on_left_side()
                    && !side_query(dest_position, apex_position, to_position).is_on_left_side()
                {
                    wedge = Some(edge);
                }
            }
        }

        let edge = match existing {
            Some(edge) => edge,
            None => {
                let wedge = wedge.ok_or(missing)?;
                self.recover_segment(wedge, from, to)?
            }
        };

        let subsegment = self.mesh_mut().bond_new_subsegment(edge, marker);
        for endpoint in [from, to] {
            self.mesh_mut()
                .set_vertex_kind(endpoint, VertexKind::SegmentEndpoint);
            if marker != 0 {
                self.mesh_mut().set_vertex_marker(endpoint, marker);
            } else if self.mesh().vertex_marker(endpoint) == 0 {
                self.mesh_mut().set_vertex_marker(endpoint, 1);
            }
        }
        Ok(subsegment)
    }

    /// Deletes all edges crossing the segment and retriangulates the cavity,
    /// returning the new edge running from `from` to `to`.
    fn recover_segment(
        &mut self,
        wedge: OrientedEdge,
        from: FixedVertexHandle,
        to: FixedVertexHandle,
    ) -> Result<OrientedEdge, TriangulationError> {
        let missing = TriangulationError::MissingEdge { from, to };
        let from_position = self.mesh().position(from);
        let to_position = self.mesh().position(to);

        // Walk along the segment and collect the crossed triangles together
        // with the cavity vertices on both sides. This part is read only so
        // that a failure leaves the triangulation untouched.
        let mut cavity = HashSet::new();
        cavity.insert(wedge.triangle());
        let mut left_chain = vec![solid(self.mesh().apex(wedge))];
        let mut right_chain = vec![solid(self.mesh().dest(wedge))];
        let mut crossed = wedge.lnext();
        let mut budget = self.mesh().num_triangles() + 8;
        loop {
            budget = budget
                .checked_sub(1)
                .ok_or(TriangulationError::InternalError(Phase::Build))?;
            if self.mesh().subsegment(crossed).is_some() {
                return Err(missing);
            }
            // Both endpoints are vertices of the triangulation, the walk
            // cannot leave the hull.
            let entered = self
                .mesh()
                .neighbor(crossed)
                .ok_or(TriangulationError::InternalError(Phase::Build))?;
            cavity.insert(entered.triangle());
            let apex = solid(self.mesh().apex(entered));
            if apex == to {
                break;
            }
            let query = side_query(from_position, to_position, self.mesh().position(apex));
            if query.is_on_line() {
                // The segment passes exactly through a vertex.
                return Err(missing);
            }
            if query.is_on_left_side() {
                crossed = entered.lnext();
                left_chain.push(apex);
            } else {
                crossed = entered.lprev();
                right_chain.push(apex);
            }
        }

        // Record the cavity boundary before deleting anything: the outside
        // edge to rebind against and any subsegment pinned to a boundary
        // edge.
        let mut builder = CavityBuilder {
            pending: HashMap::new(),
            segment: (from, to),
            segment_edge: None,
        };
        let mut pinned = Vec::new();
        for &triangle in &cavity {
            for orient in 0..3 {
                let edge = OrientedEdge::new(triangle, orient);
                if let Some(outside) = self.mesh().neighbor(edge) {
                    if cavity.contains(&outside.triangle()) {
                        continue;
                    }
                    let org = solid(self.mesh().org(edge));
                    let dest = solid(self.mesh().dest(edge));
                    builder.pending.insert((dest, org), outside);
                    if let Some(subsegment) = self.mesh().subsegment(edge) {
                        pinned.push(subsegment);
                    }
                }
            }
        }
        for &triangle in &cavity {
            self.mesh_mut().kill_triangle(triangle);
        }

        // Retriangulate both sides of the segment. The chains are arranged so
        // that each polygon is counterclockwise and closed by the segment
        // itself, which makes the two sides bind to each other through the
        // shared pending map.
        left_chain.reverse();
        let mut left_polygon = vec![to];
        left_polygon.extend(left_chain);
        left_polygon.push(from);
        let mut right_polygon = vec![from];
        right_polygon.extend(right_chain);
        right_polygon.push(to);

        builder.fill(self.mesh_mut(), &left_polygon);
        builder.fill(self.mesh_mut(), &right_polygon);

        for subsegment in pinned {
            let outside = self
                .mesh()
                .subsegment_links(subsegment)
                .into_iter()
                .flatten()
                .find(|edge| !self.mesh().is_dead(edge.triangle()));
            if let Some(outside) = outside {
                if let Some(inside) = self.mesh().neighbor(outside) {
                    self.mesh_mut().rebond_subsegment(subsegment, inside);
                }
            }
        }

        builder
            .segment_edge
            .ok_or(TriangulationError::InternalError(Phase::Build))
    }

    /// Deletes all triangles that lie outside of the domain bounded by
    /// subsegments.
    ///
    /// Starting from every hole point and from every hull edge that is not
    /// covered by a subsegment, triangles are eaten by a flood fill that
    /// never crosses a subsegment. The remaining mesh is the region enclosed
    /// by subsegments, minus the region around each hole point.
    ///
    /// Hole points that coincide with a vertex or lie outside of the
    /// triangulation are ignored.
    pub fn carve_holes(&mut self, holes: &[Point2<V::Scalar>]) {
        let mut seeds = Vec::new();
        for hole in holes {
            match self.locate(*hole) {
                PositionInTriangulation::InTriangle(triangle) => seeds.push(triangle),
                PositionInTriangulation::OnEdge(edge) => seeds.push(edge.triangle()),
                _ => {}
            }
        }

        let mesh = self.mesh_mut();
        mesh.advance_stamp();
        let mut queue = Vec::new();
        let live: Vec<_> = mesh.triangles().collect();
        for &triangle in &live {
            for orient in 0..3 {
                let edge = OrientedEdge::new(triangle, orient);
                if mesh.neighbor(edge).is_none() && mesh.subsegment(edge).is_none() {
                    mesh.mark_visited(triangle);
                    queue.push(triangle);
                    break;
                }
            }
        }
        for seed in seeds {
            if !mesh.is_visited(seed) {
                mesh.mark_visited(seed);
                queue.push(seed);
            }
        }

        while let Some(triangle) = queue.pop() {
            for orient in 0..3 {
                let edge = OrientedEdge::new(triangle, orient);
                if mesh.subsegment(edge).is_some() {
                    continue;
                }
                if let Some(neighbor) = mesh.neighbor(edge) {
                    let neighbor = neighbor.triangle();
                    if !mesh.is_visited(neighbor) {
                        mesh.mark_visited(neighbor);
                        queue.push(neighbor);
                    }
                }
            }
        }

        for &triangle in &live {
            if !mesh.is_visited(triangle) {
                continue;
            }
            for orient in 0..3 {
                let edge = OrientedEdge::new(triangle, orient);
                if let Some(subsegment) = mesh.subsegment(edge) {
                    mesh.dissolve_subsegment_side(subsegment, triangle);
                }
                if let Some(neighbor) = mesh.neighbor(edge) {
                    if !mesh.is_visited(neighbor.triangle()) {
                        mesh.dissolve(neighbor);
                    }
                }
            }
            mesh.kill_triangle(triangle);
        }

        // The boundary has changed, recount it.
        let mut hull_size = 0;
        let live: Vec<_> = mesh.triangles().collect();
        for triangle in live {
            for orient in 0..3 {
                if mesh.neighbor(OrientedEdge::new(triangle, orient)).is_none() {
                    hull_size += 1;
                }
            }
        }
        self.set_hull_size(hull_size);
    }
}

enum Classification {
    Inside(PositionInTriangulation),
    Beyond(OrientedEdge),
}

fn classify<V: HasPosition>(
    mesh: &Mesh<V>,
    triangle: FixedTriangleHandle,
    point: Point2<V::Scalar>,
) -> Classification {
    let mut on_line = None;
    for orient in 0..3 {
        let edge = OrientedEdge::new(triangle, orient);
        let org = solid(mesh.org(edge));
        let dest = solid(mesh.dest(edge));
        let query = side_query(mesh.position(org), mesh.position(dest), point);
        if query.is_on_right_side() {
            return Classification::Beyond(edge);
        }
        if query.is_on_line() {
            if point == mesh.position(org) {
                return Classification::Inside(PositionInTriangulation::OnVertex(org));
            }
            if point == mesh.position(dest) {
                return Classification::Inside(PositionInTriangulation::OnVertex(dest));
            }
            on_line = Some(edge);
        }
    }
    match on_line {
        Some(edge) => Classification::Inside(PositionInTriangulation::OnEdge(edge)),
        None => Classification::Inside(PositionInTriangulation::InTriangle(triangle)),
    }
}

fn solid(vertex: Option<FixedVertexHandle>) -> FixedVertexHandle {
    vertex.expect("unexpected ghost vertex after hull removal")
}

/// Retriangulates the cavity left behind by segment recovery.
///
/// New triangles are knitted together through `pending`: every created
/// directed edge either finds its reversed partner there and binds to it or
/// registers itself and waits.
struct CavityBuilder {
    pending: HashMap<(FixedVertexHandle, FixedVertexHandle), OrientedEdge>,
    segment: (FixedVertexHandle, FixedVertexHandle),
    segment_edge: Option<OrientedEdge>,
}

impl CavityBuilder {
    /// Triangulates a counterclockwise pseudo polygon. The polygon is closed
    /// by the implied edge from the last vertex back to the first.
    fn fill<V: HasPosition>(&mut self, mesh: &mut Mesh<V>, polygon: &[FixedVertexHandle]) {
        if polygon.len() < 3 {
            return;
        }
        let base_org = polygon[polygon.len() - 1];
        let base_dest = polygon[0];

        // Pick the chain vertex whose circumcircle with the base edge is
        // empty. The triangle over the base edge splits the polygon into two
        // smaller pseudo polygons.
        let mut best = 1;
        for candidate in 2..polygon.len() - 1 {
            if contained_in_circumference(
                mesh.position(base_org),
                mesh.position(base_dest),
                mesh.position(polygon[best]),
                mesh.position(polygon[candidate]),
            ) {
                best = candidate;
            }
        }

        self.create_face(mesh, base_org, base_dest, polygon[best]);
        self.fill(mesh, &polygon[..=best]);
        self.fill(mesh, &polygon[best..]);
    }

    /// Creates the counterclockwise triangle `(a, b, c)` and binds it to its
    /// already created neighbors.
    fn create_face<V: HasPosition>(
        &mut self,
        mesh: &mut Mesh<V>,
        a: FixedVertexHandle,
        b: FixedVertexHandle,
        c: FixedVertexHandle,
    ) {
        let edge = mesh.create_triangle(Some(a), Some(b), Some(c));
        for (directed, org, dest) in [(edge, a, b), (edge.lnext(), b, c), (edge.lprev(), c, a)] {
            if (org, dest) == self.segment {
                self.segment_edge = Some(directed);
            }
            match self.pending.remove(&(dest, org)) {
                Some(partner) => mesh.bind(directed, partner),
                None => {
                    self.pending.insert((org, dest), directed);
                }
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::PositionInTriangulation;
    use crate::divconq::triangulate;
    use crate::mesh::{FixedVertexHandle, VertexKind};
    use crate::{Point2, TriangulationError};

    fn v(index: usize) -> FixedVertexHandle {
        FixedVertexHandle::new(index)
    }

    #[test]
    fn test_insert_existing_edge() {
        let mut triangulation = triangulate(vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(1.0, 1.0),
            Point2::new(0.0, 1.0),
        ])
        .unwrap();
        let before = triangulation.num_triangles();
        let subsegment = triangulation.insert_segment(v(0), v(1), 3).unwrap();

        let mesh = triangulation.mesh();
        assert_eq!(mesh.subsegment_vertices(subsegment), [v(0), v(1)]);
        assert_eq!(mesh.subsegment_marker(subsegment), 3);
        assert_eq!(mesh.vertex_kind(v(0)), VertexKind::SegmentEndpoint);
        assert_eq!(mesh.vertex_marker(v(0)), 3);
        assert_eq!(triangulation.num_triangles(), before);
        mesh.sanity_check();
    }

    #[test]
    fn test_insert_crossing_segment() {
        // The Delaunay triangulation of this quad uses the vertical diagonal,
        // the horizontal one has to be forced in.
        let mut triangulation = triangulate(vec![
            Point2::new(0.0, 0.0),
            Point2::new(4.0, 0.0),
            Point2::new(2.0, 1.0),
            Point2::new(2.0, -1.0),
        ])
        .unwrap();
        assert_eq!(triangulation.num_triangles(), 2);

        triangulation.insert_segment(v(0), v(1), 1).unwrap();
        triangulation.mesh().sanity_check();
        assert_eq!(triangulation.num_triangles(), 2);

        // Both remaining triangles contain the forced edge.
        for indices in triangulation.triangle_indices() {
            assert!(indices.contains(&0));
            assert!(indices.contains(&1));
        }
    }

    #[test]
    fn test_insert_crossing_segment_through_fan() {
        // Several vertices lie between the endpoints, none exactly on the
        // segment.
        let mut points = vec![Point2::new(-10.0, 0.1), Point2::new(10.0, 0.2)];
        for i in 0..7 {
            let x = -6.0 + 2.0 * i as f64;
            points.push(Point2::new(x, 1.0 + (i % 3) as f64));
            points.push(Point2::new(x, -1.0 - (i % 4) as f64));
        }
        let mut triangulation = triangulate(points).unwrap();
        triangulation.insert_segment(v(0), v(1), 1).unwrap();
        triangulation.mesh().sanity_check();

        let mesh = triangulation.mesh();
        let found = mesh.subsegments().any(|subsegment| {
            let [a, b] = mesh.subsegment_vertices(subsegment);
            (a, b) == (v(0), v(1)) || (a, b) == (v(1), v(0))
        });
        assert!(found);
    }

    #[test]
    fn test_insert_segment_through_vertex_fails() {
        let mut triangulation = triangulate(vec![
            Point2::new(0.0, 0.0),
            Point2::new(2.0, 0.0),
            Point2::new(4.0, 0.0),
            Point2::new(2.0, 3.0),
            Point2::new(2.0, -3.0),
        ])
        .unwrap();
        // The segment from vertex 0 to vertex 2 passes through vertex 1.
        assert_eq!(
            triangulation.insert_segment(v(0), v(2), 1),
            Err(TriangulationError::MissingEdge {
                from: v(0),
                to: v(2)
            })
        );
        triangulation.mesh().sanity_check();
    }

    #[test]
    fn test_crossing_subsegments_fail() {
        let mut triangulation = triangulate(vec![
            Point2::new(0.0, 0.0),
            Point2::new(4.0, 0.0),
            Point2::new(2.0, 1.0),
            Point2::new(2.0, -1.0),
        ])
        .unwrap();
        triangulation.insert_segment(v(2), v(3), 1).unwrap();
        assert_eq!(
            triangulation.insert_segment(v(0), v(1), 1),
            Err(TriangulationError::MissingEdge {
                from: v(0),
                to: v(1)
            })
        );
    }

    #[test]
    fn test_locate() {
        let triangulation = triangulate(vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(0.0, 1.0),
        ])
        .unwrap();
        assert_eq!(
            triangulation.locate(Point2::new(0.0, 0.0)),
            PositionInTriangulation::OnVertex(v(0))
        );
        assert_eq!(
            triangulation.locate(Point2::new(5.0, 5.0)),
            PositionInTriangulation::Outside
        );
        assert!(matches!(
            triangulation.locate(Point2::new(0.25, 0.25)),
            PositionInTriangulation::InTriangle(_)
        ));
    }

    #[test]
    fn test_carve_ring() {
        let mut triangulation = triangulate(vec![
            Point2::new(-2.0, -2.0),
            Point2::new(2.0, -2.0),
            Point2::new(2.0, 2.0),
            Point2::new(-2.0, 2.0),
            Point2::new(-1.0, -1.0),
            Point2::new(1.0, -1.0),
            Point2::new(1.0, 1.0),
            Point2::new(-1.0, 1.0),
        ])
        .unwrap();
        for (from, to) in [(0, 1), (1, 2), (2, 3), (3, 0)] {
            triangulation.insert_segment(v(from), v(to), 1).unwrap();
        }
        for (from, to) in [(4, 5), (5, 6), (6, 7), (7, 4)] {
            triangulation.insert_segment(v(from), v(to), 2).unwrap();
        }
        assert_eq!(triangulation.num_triangles(), 10);

        triangulation.carve_holes(&[Point2::new(0.0, 0.0)]);
        triangulation.mesh().sanity_check();
        assert_eq!(triangulation.num_triangles(), 8);
        assert_eq!(triangulation.hull_size(), 8);

        // The two triangles inside of the inner square are gone, every
        // remaining triangle touches the outer square.
        for indices in triangulation.triangle_indices() {
            assert!(indices.iter().any(|&index| index < 4));
        }
    }

    #[test]
    fn test_carve_without_protection() {
        // Without any subsegments the flood fill eats the entire mesh.
        let mut triangulation = triangulate(vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(0.0, 1.0),
            Point2::new(1.0, 1.0),
        ])
        .unwrap();
        triangulation.carve_holes(&[]);
        assert_eq!(triangulation.num_triangles(), 0);
    }

    #[test]
    fn test_carve_keeps_protected_domain() {
        let mut triangulation = triangulate(vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(1.0, 1.0),
            Point2::new(0.0, 1.0),
        ])
        .unwrap();
        for (from, to) in [(0, 1), (1, 2), (2, 3), (3, 0)] {
            triangulation.insert_segment(v(from), v(to), 1).unwrap();
        }
        let before = triangulation.num_triangles();
        triangulation.carve_holes(&[]);
        assert_eq!(triangulation.num_triangles(), before);
    }
}
