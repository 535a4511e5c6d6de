use std::cmp::Ordering;

use crate::math::{contained_in_circumference, side_query, validate_vertex, Phase};
use crate::mesh::{FixedVertexHandle, Mesh, OrientedEdge, VertexKind};
use crate::{HasPosition, Point2, TriangulationError};

/// A Delaunay triangulation of a set of points.
///
/// Create one by calling [triangulate]. The triangulation borrows nothing; it
/// owns its input vertices, accessible through [Self::mesh].
pub struct Triangulation<V: HasPosition = Point2<f64>> {
    mesh: Mesh<V>,
    hull_size: usize,
    num_duplicates: usize,
}

impl<V: HasPosition> Triangulation<V> {
    /// The underlying triangle mesh.
    pub fn mesh(&self) -> &Mesh<V> {
        &self.mesh
    }

    pub(crate) fn mesh_mut(&mut self) -> &mut Mesh<V> {
        &mut self.mesh
    }

    /// The number of edges on the boundary of the triangulation.
    ///
    /// For inputs that are not all collinear this is the number of convex hull
    /// edges (or, after carving, the number of boundary edges of the domain).
    /// If all input points lie on a single line, the triangulation contains no
    /// triangles and every input edge is counted from both sides.
    pub fn hull_size(&self) -> usize {
        self.hull_size
    }

    pub(crate) fn set_hull_size(&mut self, hull_size: usize) {
        self.hull_size = hull_size;
    }

    /// The number of input vertices that were exact duplicates of an earlier
    /// vertex. Duplicates keep their handle but are marked
    /// [VertexKind::Undead] and are not part of any triangle.
    pub fn num_duplicates(&self) -> usize {
        self.num_duplicates
    }

    /// The number of vertices, including duplicates.
    pub fn num_vertices(&self) -> usize {
        self.mesh.num_vertices()
    }

    /// The number of triangles.
    pub fn num_triangles(&self) -> usize {
        self.mesh.num_triangles()
    }

    /// Returns all triangles as vertex index triples in counterclockwise order.
    ///
    /// The indices refer to the input vertex sequence.
    pub fn triangle_indices(&self) -> Vec<[usize; 3]> {
        self.mesh
            .triangles()
            .map(|triangle| {
                let [v0, v1, v2] = self.mesh.solid_vertices(triangle);
                [v0.index(), v1.index(), v2.index()]
            })
            .collect()
    }
}

/// Creates the Delaunay triangulation of the given vertices using Dwyer's
/// divide and conquer algorithm.
///
/// Duplicate points are allowed; all duplicates beyond the first occurrence
/// are skipped and reported via [Triangulation::num_duplicates]. At least two
/// distinct vertices are required.
///
/// Vertex handles of the result are assigned in input order.
pub fn triangulate<V: HasPosition>(
    vertices: Vec<V>,
) -> Result<Triangulation<V>, TriangulationError> {
    let mut mesh = Mesh::new();
    for vertex in &vertices {
        validate_vertex(vertex)?;
    }

    let mut sorted = Vec::with_capacity(vertices.len());
    for vertex in vertices {
        sorted.push(mesh.add_vertex(vertex));
    }
    if sorted.len() < 2 {
        return Err(TriangulationError::TooFewVertices {
            found: sorted.len(),
        });
    }

    sorted.sort_unstable_by(|a, b| compare_by_axis(&mesh, *a, *b, 0));

    // Exact duplicates become undead: they keep their handle but take no part
    // in the triangulation.
    let mut num_duplicates = 0;
    let mut distinct: Vec<FixedVertexHandle> = Vec::with_capacity(sorted.len());
    for handle in sorted {
        if let Some(&previous) = distinct.last() {
            if mesh.position(handle) == mesh.position(previous) {
                mesh.set_vertex_kind(handle, VertexKind::Undead);
                num_duplicates += 1;
                continue;
            }
        }
        distinct.push(handle);
    }
    if distinct.len() < 2 {
        return Err(TriangulationError::TooFewVertices {
            found: distinct.len(),
        });
    }

    alternate_axes(&mesh, &mut distinct, 0);
    let (hull_left, _) = divconq_recurse(&mut mesh, &distinct, 0)?;
    let hull_size = remove_ghosts(&mut mesh, hull_left);

    Ok(Triangulation {
        mesh,
        hull_size,
        num_duplicates,
    })
}

fn compare_by_axis<V: HasPosition>(
    mesh: &Mesh<V>,
    a: FixedVertexHandle,
    b: FixedVertexHandle,
    axis: usize,
) -> Ordering {
    let pa = mesh.position(a).to_f64();
    let pb = mesh.position(b).to_f64();
    let by_position = if axis == 0 {
        pa.x.total_cmp(&pb.x).then(pa.y.total_cmp(&pb.y))
    } else {
        pa.y.total_cmp(&pb.y).then(pa.x.total_cmp(&pb.x))
    };
    // The index tie break keeps the sort deterministic and ensures that the
    // first occurrence of a duplicate position is the one that survives.
    by_position.then(a.index().cmp(&b.index()))
}

/// Recursively partitions the vertices by alternating between the x and y
/// axis, so that each recursion level of [divconq_recurse] can simply cut the
/// slice in half.
fn alternate_axes<V: HasPosition>(mesh: &Mesh<V>, array: &mut [FixedVertexHandle], axis: usize) {
    let divider = array.len() / 2;
    // Small slices are triangulated directly and expect their natural order.
    let axis = if array.len() <= 3 { 0 } else { axis };

    array.select_nth_unstable_by(divider, |a, b| compare_by_axis(mesh, *a, *b, axis));

    let (left, right) = array.split_at_mut(divider);
    if right.len() >= 2 {
        if left.len() >= 2 {
            alternate_axes(mesh, left, 1 - axis);
        }
        alternate_axes(mesh, right, 1 - axis);
    }
}

/// Extracts a vertex that is known to be set by the builder's invariants.
fn solid(vertex: Option<FixedVertexHandle>) -> FixedVertexHandle {
    vertex.expect("unexpected ghost apex in solid position")
}

/// Triangulates a sorted slice of vertices.
///
/// Returns two oriented ghost edges spanning the triangulation: the first has
/// its origin at the leftmost vertex and its destination unset, the second
/// has its destination at the rightmost vertex and its origin unset. In both,
/// the remaining two vertex slots hold solid vertices.
fn divconq_recurse<V: HasPosition>(
    mesh: &mut Mesh<V>,
    sorted: &[FixedVertexHandle],
    axis: usize,
) -> Result<(OrientedEdge, OrientedEdge), TriangulationError> {
    match *sorted {
        [a, b] => Ok(make_edge(mesh, a, b)),
        [a, b, c] => Ok(make_triple(mesh, a, b, c)),
        [_, _, ..] => {
            let divider = sorted.len() / 2;
            let (far_left, inner_left) = divconq_recurse(mesh, &sorted[..divider], 1 - axis)?;
            let (inner_right, far_right) = divconq_recurse(mesh, &sorted[divider..], 1 - axis)?;
            merge_hulls(mesh, far_left, inner_left, inner_right, far_right, axis)
        }
        _ => Err(TriangulationError::InternalError(Phase::Build)),
    }
}

/// Creates the triangulation of two vertices: two ghost triangles glued
/// together along the single edge.
fn make_edge<V: HasPosition>(
    mesh: &mut Mesh<V>,
    a: FixedVertexHandle,
    b: FixedVertexHandle,
) -> (OrientedEdge, OrientedEdge) {
    let g_ab = mesh.create_triangle(Some(a), Some(b), None);
    let g_ba = mesh.create_triangle(Some(b), Some(a), None);
    mesh.bind(g_ab, g_ba);
    mesh.bind(g_ab.lnext(), g_ba.lprev());
    mesh.bind(g_ab.lprev(), g_ba.lnext());
    (g_ba.lnext(), g_ba.lprev())
}

/// Creates the triangulation of three vertices, sorted from left to right:
/// either a single solid triangle surrounded by three ghosts, or, if the
/// points are collinear, two edges represented by four ghosts.
fn make_triple<V: HasPosition>(
    mesh: &mut Mesh<V>,
    a: FixedVertexHandle,
    b: FixedVertexHandle,
    c: FixedVertexHandle,
) -> (OrientedEdge, OrientedEdge) {
    let orientation = side_query(mesh.position(a), mesh.position(b), mesh.position(c));

    if orientation.is_on_line() {
        let g_ab = mesh.create_triangle(Some(a), Some(b), None);
        let g_ba = mesh.create_triangle(Some(b), Some(a), None);
        let g_bc = mesh.create_triangle(Some(b), Some(c), None);
        let g_cb = mesh.create_triangle(Some(c), Some(b), None);
        mesh.bind(g_ab, g_ba);
        mesh.bind(g_bc, g_cb);
        // Chain the four ghosts into a single loop around the two edges.
        mesh.bind(g_ab.lnext(), g_bc.lprev());
        mesh.bind(g_bc.lnext(), g_cb.lprev());
        mesh.bind(g_cb.lnext(), g_ba.lprev());
        mesh.bind(g_ba.lnext(), g_ab.lprev());
        return (g_ba.lnext(), g_cb.lprev());
    }

    // Relabel so that (a, v1, v2) is counterclockwise.
    let (v1, v2) = if orientation.is_on_left_side() {
        (b, c)
    } else {
        (c, b)
    };
    let middle = mesh.create_triangle(Some(a), Some(v1), Some(v2));
    let g_1a = mesh.create_triangle(Some(v1), Some(a), None);
    let g_21 = mesh.create_triangle(Some(v2), Some(v1), None);
    let g_a2 = mesh.create_triangle(Some(a), Some(v2), None);
    mesh.bind(middle, g_1a);
    mesh.bind(middle.lnext(), g_21);
    mesh.bind(middle.lprev(), g_a2);
    mesh.bind(g_1a.lnext(), g_a2.lprev());
    mesh.bind(g_a2.lnext(), g_21.lprev());
    mesh.bind(g_21.lnext(), g_1a.lprev());

    let far_left = g_1a.lnext();
    // The rightmost vertex is `c`; which ghost starts its hull edge there
    // depends on the relabeling above.
    let far_right = if orientation.is_on_left_side() {
        g_21.lprev()
    } else {
        g_1a.lprev()
    };
    (far_left, far_right)
}

/// Merges a left and a right partial triangulation into one, stitching the
/// gap between them with new triangles.
///
/// `inner_left` and `inner_right` are the ghost edges facing the gap,
/// `far_left` and `far_right` the extremal ghost edges of the combined hull.
/// `axis` indicates whether the hulls are separated along x or y.
fn merge_hulls<V: HasPosition>(
    mesh: &mut Mesh<V>,
    mut far_left: OrientedEdge,
    mut inner_left: OrientedEdge,
    mut inner_right: OrientedEdge,
    mut far_right: OrientedEdge,
    axis: usize,
) -> Result<(OrientedEdge, OrientedEdge), TriangulationError> {
    let mut inner_left_dest = solid(mesh.dest(inner_left));
    let mut inner_left_apex = solid(mesh.apex(inner_left));
    let mut inner_right_org = solid(mesh.org(inner_right));
    let mut inner_right_apex = solid(mesh.apex(inner_right));

    if axis == 1 {
        // The hulls were built sorted by y, so "left" and "right" really are
        // "below" and "above". Walk the extremal handles so that the merge can
        // proceed exactly as for a vertical cut.
        let mut far_left_pt = solid(mesh.org(far_left));
        let mut far_left_apex = solid(mesh.apex(far_left));
        while mesh.position(far_left_apex).y < mesh.position(far_left_pt).y {
            far_left = mesh.sym(far_left.lnext());
            far_left_pt = far_left_apex;
            far_left_apex = solid(mesh.apex(far_left));
        }
        let mut check_edge = mesh.sym(inner_left);
        let mut check_vertex = solid(mesh.apex(check_edge));
        while mesh.position(check_vertex).y > mesh.position(inner_left_dest).y {
            inner_left = check_edge.lnext();
            inner_left_apex = inner_left_dest;
            inner_left_dest = check_vertex;
            check_edge = mesh.sym(inner_left);
            check_vertex = solid(mesh.apex(check_edge));
        }
        while mesh.position(inner_right_apex).y < mesh.position(inner_right_org).y {
            inner_right = mesh.sym(inner_right.lnext());
            inner_right_org = inner_right_apex;
            inner_right_apex = solid(mesh.apex(inner_right));
        }
        let mut far_right_pt = solid(mesh.dest(far_right));
        let mut check_edge = mesh.sym(far_right);
        let mut check_vertex = solid(mesh.apex(check_edge));
        while mesh.position(check_vertex).y > mesh.position(far_right_pt).y {
            far_right = check_edge.lnext();
            far_right_pt = check_vertex;
            check_edge = mesh.sym(far_right);
            check_vertex = solid(mesh.apex(check_edge));
        }
    }

    // Find a line tangent to and below both hulls.
    loop {
        let mut change_made = false;
        if side_query(
            mesh.position(inner_left_dest),
            mesh.position(inner_left_apex),
            mesh.position(inner_right_org),
        )
        .is_on_left_side()
        {
            inner_left = mesh.sym(inner_left.lprev());
            inner_left_dest = inner_left_apex;
            inner_left_apex = solid(mesh.apex(inner_left));
            change_made = true;
        }
        if side_query(
            mesh.position(inner_right_apex),
            mesh.position(inner_right_org),
            mesh.position(inner_left_dest),
        )
        .is_on_left_side()
        {
            inner_right = mesh.sym(inner_right.lnext());
            inner_right_org = inner_right_apex;
            inner_right_apex = solid(mesh.apex(inner_right));
            change_made = true;
        }
        if !change_made {
            break;
        }
    }

    // The candidates for the next "gear tooth" of each hull.
    let mut left_cand = mesh.sym(inner_left);
    let mut right_cand = mesh.sym(inner_right);

    // The bottommost new ghost, covering the lower tangent edge.
    let mut base = mesh.create_triangle(Some(inner_right_org), Some(inner_left_dest), None);
    mesh.bind(base.lnext(), inner_left);
    mesh.bind(base.lprev(), inner_right);

    if inner_left_dest == solid(mesh.org(far_left)) {
        far_left = base.lnext();
    }
    if inner_right_org == solid(mesh.dest(far_right)) {
        far_right = base.lprev();
    }

    let mut lower_left = inner_left_dest;
    let mut lower_right = inner_right_org;
    let mut upper_left = solid(mesh.apex(left_cand));
    let mut upper_right = solid(mesh.apex(right_cand));

    let mut budget = 10 * (mesh.num_vertices() + 4);
    let spend = |budget: &mut usize| -> Result<(), TriangulationError> {
        *budget = budget.checked_sub(1).ok_or({
            // The loops below always terminate on well formed hulls. Running
            // out of budget means the connectivity is corrupted.
            TriangulationError::InternalError(Phase::Merge)
        })?;
        Ok(())
    };

    loop {
        spend(&mut budget)?;
        let left_finished = !side_query(
            mesh.position(upper_left),
            mesh.position(lower_left),
            mesh.position(lower_right),
        )
        .is_on_left_side();
        let right_finished = !side_query(
            mesh.position(upper_right),
            mesh.position(lower_left),
            mesh.position(lower_right),
        )
        .is_on_left_side();

        if left_finished && right_finished {
            // Create the topmost new ghost and knit the hull loops together.
            let top = mesh.create_triangle(Some(lower_left), Some(lower_right), None);
            mesh.bind(top, base);
            mesh.bind(top.lnext(), right_cand);
            mesh.bind(top.lprev(), left_cand);

            if axis == 1 {
                // Walk the extremal handles back from topmost/bottommost to
                // leftmost/rightmost.
                let mut far_left_pt = solid(mesh.org(far_left));
                let mut check_edge = mesh.sym(far_left);
                let mut check_vertex = solid(mesh.apex(check_edge));
                while mesh.position(check_vertex).x < mesh.position(far_left_pt).x {
                    far_left = check_edge.lprev();
                    far_left_pt = check_vertex;
                    check_edge = mesh.sym(far_left);
                    check_vertex = solid(mesh.apex(check_edge));
                }
                let mut far_right_pt = solid(mesh.dest(far_right));
                let mut far_right_apex = solid(mesh.apex(far_right));
                while mesh.position(far_right_apex).x > mesh.position(far_right_pt).x {
                    far_right = mesh.sym(far_right.lprev());
                    far_right_pt = far_right_apex;
                    far_right_apex = solid(mesh.apex(far_right));
                }
            }
            return Ok((far_left, far_right));
        }

        // Consider eliminating edges from the left hull: delete edges whose
        // circumcircle contains the vertex that would be exposed next.
        if !left_finished {
            let mut next_edge = mesh.sym(left_cand.lprev());
            let mut next_apex = mesh.apex(next_edge);
            while let Some(apex) = next_apex {
                if !contained_in_circumference(
                    mesh.position(lower_left),
                    mesh.position(lower_right),
                    mesh.position(upper_left),
                    mesh.position(apex),
                ) {
                    break;
                }
                spend(&mut budget)?;
                // Flip the edge, reusing `left_cand`'s ghost for the new hull
                // edge further up.
                next_edge = next_edge.lnext();
                let top_casing = mesh.sym(next_edge);
                next_edge = next_edge.lnext();
                let side_casing = mesh.sym(next_edge);
                mesh.bind(next_edge, top_casing);
                mesh.bind(left_cand, side_casing);
                left_cand = left_cand.lnext();
                let outer_casing = mesh.sym(left_cand);
                next_edge = next_edge.lprev();
                mesh.bind(next_edge, outer_casing);

                mesh.set_org(left_cand, Some(lower_left));
                mesh.set_dest(left_cand, None);
                mesh.set_apex(left_cand, Some(apex));
                mesh.set_org(next_edge, None);
                mesh.set_dest(next_edge, Some(upper_left));
                mesh.set_apex(next_edge, Some(apex));

                upper_left = apex;
                next_edge = side_casing;
                next_apex = mesh.apex(next_edge);
            }
        }

        // Mirror image: eliminate edges from the right hull.
        if !right_finished {
            let mut next_edge = mesh.sym(right_cand.lnext());
            let mut next_apex = mesh.apex(next_edge);
            while let Some(apex) = next_apex {
                if !contained_in_circumference(
                    mesh.position(lower_left),
                    mesh.position(lower_right),
                    mesh.position(upper_right),
                    mesh.position(apex),
                ) {
                    break;
                }
                spend(&mut budget)?;
                next_edge = next_edge.lprev();
                let top_casing = mesh.sym(next_edge);
                next_edge = next_edge.lprev();
                let side_casing = mesh.sym(next_edge);
                mesh.bind(next_edge, top_casing);
                mesh.bind(right_cand, side_casing);
                right_cand = right_cand.lprev();
                let outer_casing = mesh.sym(right_cand);
                next_edge = next_edge.lnext();
                mesh.bind(next_edge, outer_casing);

                mesh.set_org(right_cand, None);
                mesh.set_dest(right_cand, Some(lower_right));
                mesh.set_apex(right_cand, Some(apex));
                mesh.set_org(next_edge, Some(upper_right));
                mesh.set_dest(next_edge, None);
                mesh.set_apex(next_edge, Some(apex));

                upper_right = apex;
                next_edge = side_casing;
                next_apex = mesh.apex(next_edge);
            }
        }

        // Connect the gap with the winning candidate. On a tie both upper
        // vertices lie outside each other's circumcircle; either choice
        // produces a valid Delaunay triangle.
        let right_wins = left_finished
            || (!right_finished
                && contained_in_circumference(
                    mesh.position(upper_left),
                    mesh.position(lower_left),
                    mesh.position(lower_right),
                    mesh.position(upper_right),
                ));
        if right_wins {
            // The ghost of `right_cand` becomes the new solid triangle.
            mesh.bind(base, right_cand);
            base = right_cand.lprev();
            mesh.set_dest(base, Some(lower_left));
            lower_right = upper_right;
            right_cand = mesh.sym(base);
            upper_right = solid(mesh.apex(right_cand));
        } else {
            mesh.bind(base, left_cand);
            base = left_cand.lnext();
            mesh.set_org(base, Some(lower_right));
            lower_left = upper_left;
            left_cand = mesh.sym(base);
            upper_left = solid(mesh.apex(left_cand));
        }
    }
}

/// Removes all ghost triangles, leaving `None` neighbors on the hull, and
/// marks hull vertices with boundary marker 1.
///
/// Returns the number of hull edges.
fn remove_ghosts<V: HasPosition>(mesh: &mut Mesh<V>, start: OrientedEdge) -> usize {
    let mut hull_size = 0;
    let mut dissolve_edge = start;
    loop {
        hull_size += 1;
        let real_edge = dissolve_edge.lprev();
        let next_ghost = mesh.sym(dissolve_edge.lnext());

        let org = solid(mesh.org(real_edge));
        if mesh.vertex_marker(org) == 0 {
            mesh.set_vertex_marker(org, 1);
        }

        if let Some(inner) = mesh.neighbor(real_edge) {
            // Adjacent ghosts (from all-collinear point sets) die on their own.
            if !mesh.is_ghost(inner.triangle()) {
                mesh.dissolve(inner);
            }
        }
        mesh.kill_triangle(dissolve_edge.triangle());

        dissolve_edge = next_ghost;
        if dissolve_edge == start {
            break;
        }
    }
    hull_size
}

#[cfg(test)]
mod test {
    use super::{triangulate, Triangulation};
    use crate::mesh::{FixedVertexHandle, VertexKind};
    use crate::test_utilities::{random_points_in_range, random_points_with_seed, SEED, SEED2};
    use crate::{
        contained_in_circumference, side_query, Point2, PositionInTriangulation,
        TriangulationError,
    };

    fn check_delaunay_property(triangulation: &Triangulation<Point2<f64>>) {
        let mesh = triangulation.mesh();
        mesh.sanity_check();
        for triangle in mesh.triangles() {
            let [v0, v1, v2] = mesh.solid_vertices(triangle);
            let p0 = mesh.position(v0);
            let p1 = mesh.position(v1);
            let p2 = mesh.position(v2);
            for other in mesh.vertices() {
                if other == v0 || other == v1 || other == v2 {
                    continue;
                }
                if mesh.vertex_kind(other) == VertexKind::Undead {
                    continue;
                }
                assert!(
                    !contained_in_circumference(p0, p1, p2, mesh.position(other)),
                    "delaunay property violated"
                );
            }
        }
    }

    fn check_euler(triangulation: &Triangulation<Point2<f64>>) {
        let num_distinct = triangulation.num_vertices() - triangulation.num_duplicates();
        assert_eq!(
            triangulation.num_triangles(),
            2 * num_distinct - 2 - triangulation.hull_size()
        );
    }

    #[test]
    fn test_too_few_vertices() {
        assert_eq!(
            triangulate(Vec::<Point2<f64>>::new()).err(),
            Some(TriangulationError::TooFewVertices { found: 0 })
        );
        assert_eq!(
            triangulate(vec![Point2::new(0.0, 0.0)]).err(),
            Some(TriangulationError::TooFewVertices { found: 1 })
        );
        // Two distinct positions, but all duplicates of one point.
        assert_eq!(
            triangulate(vec![Point2::new(1.0, 2.0); 5]).err(),
            Some(TriangulationError::TooFewVertices { found: 1 })
        );
    }

    #[test]
    fn test_two_vertices() {
        let triangulation =
            triangulate(vec![Point2::new(0.0, 0.0), Point2::new(1.0, 2.0)]).unwrap();
        assert_eq!(triangulation.num_triangles(), 0);
        assert_eq!(triangulation.hull_size(), 2);
        triangulation.mesh().sanity_check();
    }

    #[test]
    fn test_single_triangle() {
        let triangulation = triangulate(vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(0.0, 1.0),
        ])
        .unwrap();
        assert_eq!(triangulation.num_triangles(), 1);
        assert_eq!(triangulation.hull_size(), 3);
        check_euler(&triangulation);
        check_delaunay_property(&triangulation);
    }

    #[test]
    fn test_unit_square() {
        let triangulation = triangulate(vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(1.0, 1.0),
            Point2::new(0.0, 1.0),
        ])
        .unwrap();
        // The four points are cocircular, either diagonal is valid.
        assert_eq!(triangulation.num_triangles(), 2);
        assert_eq!(triangulation.hull_size(), 4);
        check_euler(&triangulation);
        check_delaunay_property(&triangulation);
    }

    #[test]
    fn test_three_collinear_points() {
        let triangulation = triangulate(vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(2.0, 0.0),
        ])
        .unwrap();
        assert_eq!(triangulation.num_triangles(), 0);
        assert_eq!(triangulation.hull_size(), 4);
        triangulation.mesh().sanity_check();
    }

    #[test]
    fn test_collinear_points() {
        let triangulation = triangulate(vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 1.0),
            Point2::new(2.0, 2.0),
            Point2::new(3.0, 3.0),
        ])
        .unwrap();
        assert_eq!(triangulation.num_triangles(), 0);
        // Each of the three edges is a boundary edge on both of its sides.
        assert_eq!(triangulation.hull_size(), 6);
        triangulation.mesh().sanity_check();
    }

    #[test]
    fn test_square_with_center() {
        let triangulation = triangulate(vec![
            Point2::new(-1.0, -1.0),
            Point2::new(1.0, -1.0),
            Point2::new(1.0, 1.0),
            Point2::new(-1.0, 1.0),
            Point2::new(0.0, 0.0),
        ])
        .unwrap();
        assert_eq!(triangulation.num_triangles(), 4);
        assert_eq!(triangulation.hull_size(), 4);
        check_euler(&triangulation);
        check_delaunay_property(&triangulation);

        // The center is part of every triangle.
        for indices in triangulation.triangle_indices() {
            assert!(indices.contains(&4));
        }
    }

    #[test]
    fn test_triangle_orientation() {
        let triangulation = triangulate(random_points_with_seed(32, SEED)).unwrap();
        let mesh = triangulation.mesh();
        for indices in triangulation.triangle_indices() {
            let [i0, i1, i2] = indices.map(crate::mesh::FixedVertexHandle::new);
            assert!(side_query(
                mesh.position(i0),
                mesh.position(i1),
                mesh.position(i2)
            )
            .is_on_left_side());
        }
    }

    #[test]
    fn test_random_triangulation() {
        for size in [4, 9, 30, 150] {
            let triangulation = triangulate(random_points_with_seed(size, SEED)).unwrap();
            check_euler(&triangulation);
            check_delaunay_property(&triangulation);
        }
    }

    #[test]
    fn test_large_triangulation() {
        let triangulation = triangulate(random_points_in_range(50.0, 500, SEED)).unwrap();
        check_euler(&triangulation);
        check_delaunay_property(&triangulation);
    }

    #[test]
    fn test_small_coordinate_range() {
        let triangulation = triangulate(random_points_in_range(0.5, 60, SEED2)).unwrap();
        check_euler(&triangulation);
        check_delaunay_property(&triangulation);
    }

    #[test]
    fn test_input_order_invariance() {
        // The same point set must produce the same triangles regardless of
        // the order in which the points are handed in.
        fn canonical_triangles(triangulation: &Triangulation<Point2<f64>>) -> Vec<[(u64, u64); 3]> {
            let mesh = triangulation.mesh();
            let mut result: Vec<[(u64, u64); 3]> = triangulation
                .triangle_indices()
                .into_iter()
                .map(|indices| {
                    let mut corners = indices.map(|index| {
                        let position = mesh.position(FixedVertexHandle::new(index));
                        (position.x.to_bits(), position.y.to_bits())
                    });
                    // Rotate the smallest corner to the front, keeping the
                    // ccw order intact.
                    let smallest = (0..corners.len()).min_by_key(|&slot| corners[slot]).unwrap();
                    corners.rotate_left(smallest);
                    corners
                })
                .collect();
            result.sort_unstable();
            result
        }

        let points = random_points_with_seed(80, SEED);
        let expected = canonical_triangles(&triangulate(points.clone()).unwrap());

        let mut reversed = points.clone();
        reversed.reverse();
        assert_eq!(
            canonical_triangles(&triangulate(reversed).unwrap()),
            expected
        );

        let mut rotated = points.clone();
        rotated.rotate_left(points.len() / 3);
        assert_eq!(
            canonical_triangles(&triangulate(rotated).unwrap()),
            expected
        );
    }

    #[test]
    fn test_grid() {
        // A grid maximizes cocircular vertex groups.
        let mut points = Vec::new();
        for x in 0..6 {
            for y in 0..6 {
                points.push(Point2::new(x as f64, y as f64));
            }
        }
        let triangulation = triangulate(points).unwrap();
        assert_eq!(triangulation.hull_size(), 20);
        check_euler(&triangulation);
        check_delaunay_property(&triangulation);
    }

    #[test]
    fn test_duplicates() {
        let points = vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(0.0, 0.0),
            Point2::new(0.0, 1.0),
            Point2::new(1.0, 0.0),
        ];
        let triangulation = triangulate(points).unwrap();
        assert_eq!(triangulation.num_duplicates(), 2);
        assert_eq!(triangulation.num_vertices(), 5);
        assert_eq!(triangulation.num_triangles(), 1);

        let mesh = triangulation.mesh();
        let kinds: Vec<_> = mesh.vertices().map(|v| mesh.vertex_kind(v)).collect();
        assert_eq!(
            kinds,
            vec![
                VertexKind::Input,
                VertexKind::Input,
                VertexKind::Undead,
                VertexKind::Input,
                VertexKind::Undead,
            ]
        );

        // No triangle refers to an undead vertex.
        for indices in triangulation.triangle_indices() {
            assert!(!indices.contains(&2));
            assert!(!indices.contains(&4));
        }
    }

    #[test]
    fn test_hull_markers() {
        let triangulation = triangulate(vec![
            Point2::new(-1.0, -1.0),
            Point2::new(1.0, -1.0),
            Point2::new(1.0, 1.0),
            Point2::new(-1.0, 1.0),
            Point2::new(0.0, 0.0),
        ])
        .unwrap();
        let mesh = triangulation.mesh();
        let markers: Vec<_> = mesh.vertices().map(|v| mesh.vertex_marker(v)).collect();
        assert_eq!(markers, vec![1, 1, 1, 1, 0]);
    }

    #[test]
    fn test_locate() {
        let triangulation = triangulate(random_points_with_seed(40, SEED)).unwrap();
        let mesh = triangulation.mesh();
        for triangle in mesh.triangles() {
            let [v0, v1, v2] = mesh.solid_vertices(triangle);
            let center = mesh
                .position(v0)
                .add(mesh.position(v1))
                .add(mesh.position(v2))
                .mul(1.0 / 3.0);
            match triangulation.locate(center) {
                PositionInTriangulation::InTriangle(t) => assert_eq!(t, triangle),
                other => panic!("expected {triangle:?}, got {other:?}"),
            }
        }
        assert_eq!(
            triangulation.locate(Point2::new(1000.0, 1000.0)),
            PositionInTriangulation::Outside
        );
    }
}
