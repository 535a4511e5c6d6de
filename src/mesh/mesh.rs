use super::{FixedSubsegmentHandle, FixedTriangleHandle, FixedVertexHandle, OrientedEdge};
use crate::{HasPosition, Point2};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Classifies a vertex of a triangulation.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde")
)]
pub enum VertexKind {
    /// A regular input vertex.
    Input,
    /// An input vertex that is an endpoint of at least one subsegment.
    SegmentEndpoint,
    /// A duplicate input vertex. Undead vertices keep their handle but are not
    /// part of the triangulation.
    Undead,
}

#[derive(Clone, Debug)]
struct VertexEntry<V> {
    data: V,
    marker: i32,
    kind: VertexKind,
}

#[derive(Clone, Debug)]
struct TriangleEntry {
    /// Vertex slots. `None` marks the apex of a ghost triangle.
    vertices: [Option<FixedVertexHandle>; 3],
    /// The neighboring oriented edge for each of the three edges. `None` on
    /// the outside of the triangulation once ghosts have been removed.
    neighbors: [Option<OrientedEdge>; 3],
    /// The subsegment pinned to each of the three edges, if any.
    subsegments: [Option<FixedSubsegmentHandle>; 3],
    last_visited: u32,
    dead: bool,
}

impl TriangleEntry {
    fn new() -> Self {
        Self {
            vertices: [None; 3],
            neighbors: [None; 3],
            subsegments: [None; 3],
            last_visited: 0,
            dead: false,
        }
    }
}

#[derive(Clone, Debug)]
struct SubsegmentEntry {
    vertices: [FixedVertexHandle; 2],
    /// The adjoining triangle edge on each side. An entry becomes `None` when
    /// the triangle on that side is carved away.
    links: [Option<OrientedEdge>; 2],
    marker: i32,
}

/// A triangle mesh stored in index based arenas.
///
/// The mesh consists of vertices, triangles and subsegments. Each triangle
/// stores its three vertices in counterclockwise order together with the
/// adjoining triangle for each of its three edges. All connectivity queries
/// are phrased in terms of [OrientedEdge]s.
///
/// During construction, the area outside the convex hull is covered by *ghost*
/// triangles. A ghost triangle has exactly one unset vertex slot; its one real
/// edge lies on the hull and its remaining two edges link it to the adjacent
/// ghosts. Ghosts are removed before a mesh is handed out to users.
pub struct Mesh<V = Point2<f64>> {
    vertices: Vec<VertexEntry<V>>,
    triangles: Vec<TriangleEntry>,
    subsegments: Vec<SubsegmentEntry>,
    free_triangles: Vec<FixedTriangleHandle>,
    current_stamp: u32,
    num_live_triangles: usize,
}

impl<V> Default for Mesh<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Mesh<V> {
    /// Creates an empty mesh.
    pub fn new() -> Self {
        Self {
            vertices: Vec::new(),
            triangles: Vec::new(),
            subsegments: Vec::new(),
            free_triangles: Vec::new(),
            current_stamp: 0,
            num_live_triangles: 0,
        }
    }

    /// The number of vertices, including undead (duplicate) vertices.
    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// The number of live triangles.
    pub fn num_triangles(&self) -> usize {
        self.num_live_triangles
    }

    /// The number of subsegments.
    pub fn num_subsegments(&self) -> usize {
        self.subsegments.len()
    }

    pub(crate) fn add_vertex(&mut self, data: V) -> FixedVertexHandle {
        let handle = FixedVertexHandle::new(self.vertices.len());
        self.vertices.push(VertexEntry {
            data,
            marker: 0,
            kind: VertexKind::Input,
        });
        handle
    }

    /// Returns the data associated with a vertex.
    pub fn vertex(&self, vertex: FixedVertexHandle) -> &V {
        &self.vertices[vertex.index()].data
    }

    /// Returns the boundary marker of a vertex.
    ///
    /// Hull vertices receive marker `1`, vertices on a subsegment inherit the
    /// subsegment's marker. All other vertices have marker `0`.
    pub fn vertex_marker(&self, vertex: FixedVertexHandle) -> i32 {
        self.vertices[vertex.index()].marker
    }

    pub(crate) fn set_vertex_marker(&mut self, vertex: FixedVertexHandle, marker: i32) {
        self.vertices[vertex.index()].marker = marker;
    }

    /// Returns the classification of a vertex.
    pub fn vertex_kind(&self, vertex: FixedVertexHandle) -> VertexKind {
        self.vertices[vertex.index()].kind
    }

    pub(crate) fn set_vertex_kind(&mut self, vertex: FixedVertexHandle, kind: VertexKind) {
        self.vertices[vertex.index()].kind = kind;
    }

    /// An iterator over all vertex handles, including undead vertices.
    pub fn vertices(&self) -> impl Iterator<Item = FixedVertexHandle> {
        (0..self.vertices.len()).map(FixedVertexHandle::new)
    }

    /// An iterator over all live triangle handles.
    pub fn triangles(&self) -> impl Iterator<Item = FixedTriangleHandle> + '_ {
        self.triangles
            .iter()
            .enumerate()
            .filter(|(_, entry)| !entry.dead)
            .map(|(index, _)| FixedTriangleHandle::new(index))
    }

    /// An iterator over all subsegment handles.
    pub fn subsegments(&self) -> impl Iterator<Item = FixedSubsegmentHandle> {
        (0..self.subsegments.len()).map(FixedSubsegmentHandle::new)
    }

    /// The number of triangle slots, including dead ones. Used to allocate
    /// dense per triangle lookup tables.
    pub(crate) fn triangle_slot_count(&self) -> usize {
        self.triangles.len()
    }

    pub(crate) fn is_dead(&self, triangle: FixedTriangleHandle) -> bool {
        self.triangles[triangle.index()].dead
    }

    /// Returns `true` if the triangle has an unset vertex slot.
    pub fn is_ghost(&self, triangle: FixedTriangleHandle) -> bool {
        self.triangles[triangle.index()]
            .vertices
            .iter()
            .any(|vertex| vertex.is_none())
    }

    /// Creates a new triangle and returns its edge at orientation 0, which
    /// runs from `org` to `dest`.
    pub(crate) fn create_triangle(
        &mut self,
        org: Option<FixedVertexHandle>,
        dest: Option<FixedVertexHandle>,
        apex: Option<FixedVertexHandle>,
    ) -> OrientedEdge {
        let handle = match self.free_triangles.pop() {
            Some(handle) => {
                self.triangles[handle.index()] = TriangleEntry::new();
                handle
            }
            None => {
                let handle = FixedTriangleHandle::new(self.triangles.len());
                self.triangles.push(TriangleEntry::new());
                handle
            }
        };
        self.num_live_triangles += 1;
        self.triangles[handle.index()].vertices = [apex, org, dest];
        OrientedEdge::new(handle, 0)
    }

    pub(crate) fn kill_triangle(&mut self, triangle: FixedTriangleHandle) {
        let entry = &mut self.triangles[triangle.index()];
        debug_assert!(!entry.dead);
        *entry = TriangleEntry::new();
        entry.dead = true;
        self.free_triangles.push(triangle);
        self.num_live_triangles -= 1;
    }

    /// Returns the origin vertex of an edge. `None` for the two link edges of
    /// a ghost triangle.
    pub fn org(&self, edge: OrientedEdge) -> Option<FixedVertexHandle> {
        self.triangles[edge.triangle().index()].vertices[edge.org_slot()]
    }

    /// Returns the destination vertex of an edge.
    pub fn dest(&self, edge: OrientedEdge) -> Option<FixedVertexHandle> {
        self.triangles[edge.triangle().index()].vertices[edge.dest_slot()]
    }

    /// Returns the apex of an edge, the triangle vertex opposite of it.
    pub fn apex(&self, edge: OrientedEdge) -> Option<FixedVertexHandle> {
        self.triangles[edge.triangle().index()].vertices[edge.apex_slot()]
    }

    pub(crate) fn set_org(&mut self, edge: OrientedEdge, vertex: Option<FixedVertexHandle>) {
        self.triangles[edge.triangle().index()].vertices[edge.org_slot()] = vertex;
    }

    pub(crate) fn set_dest(&mut self, edge: OrientedEdge, vertex: Option<FixedVertexHandle>) {
        self.triangles[edge.triangle().index()].vertices[edge.dest_slot()] = vertex;
    }

    pub(crate) fn set_apex(&mut self, edge: OrientedEdge, vertex: Option<FixedVertexHandle>) {
        self.triangles[edge.triangle().index()].vertices[edge.apex_slot()] = vertex;
    }

    /// Returns the three vertices of a triangle that is known to be solid.
    ///
    /// # Panics
    /// Panics if the triangle is a ghost.
    pub(crate) fn solid_vertices(&self, triangle: FixedTriangleHandle) -> [FixedVertexHandle; 3] {
        let vertices = self.triangles[triangle.index()].vertices;
        [
            vertices[0].expect("triangle is a ghost"),
            vertices[1].expect("triangle is a ghost"),
            vertices[2].expect("triangle is a ghost"),
        ]
    }

    /// Returns the edge on the other side of this edge, or `None` on the
    /// outside of the triangulation.
    ///
    /// The returned edge runs in the opposite direction: its origin is this
    /// edge's destination and vice versa.
    pub fn neighbor(&self, edge: OrientedEdge) -> Option<OrientedEdge> {
        self.triangles[edge.triangle().index()].neighbors[edge.orient() as usize]
    }

    /// Like [Self::neighbor], for edges that are known to have a neighbor.
    ///
    /// # Panics
    /// Panics if the edge has no neighbor.
    pub(crate) fn sym(&self, edge: OrientedEdge) -> OrientedEdge {
        self.neighbor(edge).expect("edge has no neighbor")
    }

    /// Returns the next edge with the same origin, in counterclockwise order.
    pub fn onext(&self, edge: OrientedEdge) -> Option<OrientedEdge> {
        self.neighbor(edge.lprev())
    }

    /// Returns the next edge with the same origin, in clockwise order.
    pub fn oprev(&self, edge: OrientedEdge) -> Option<OrientedEdge> {
        self.neighbor(edge).map(OrientedEdge::lnext)
    }

    /// Makes two edges neighbors of each other. This is the only way to
    /// connect triangles, keeping the neighbor relation symmetric.
    pub(crate) fn bind(&mut self, first: OrientedEdge, second: OrientedEdge) {
        self.triangles[first.triangle().index()].neighbors[first.orient() as usize] = Some(second);
        self.triangles[second.triangle().index()].neighbors[second.orient() as usize] = Some(first);
    }

    /// Removes the neighbor link of one edge without touching the other side.
    pub(crate) fn dissolve(&mut self, edge: OrientedEdge) {
        self.triangles[edge.triangle().index()].neighbors[edge.orient() as usize] = None;
    }

    /// Returns the subsegment pinned to an edge, if any.
    pub fn subsegment(&self, edge: OrientedEdge) -> Option<FixedSubsegmentHandle> {
        self.triangles[edge.triangle().index()].subsegments[edge.orient() as usize]
    }

    /// Creates a subsegment on top of an existing edge and pins it to the
    /// triangles on both sides.
    pub(crate) fn bond_new_subsegment(
        &mut self,
        edge: OrientedEdge,
        marker: i32,
    ) -> FixedSubsegmentHandle {
        let org = self.org(edge).expect("subsegment edge must be solid");
        let dest = self.dest(edge).expect("subsegment edge must be solid");
        let handle = FixedSubsegmentHandle::new(self.subsegments.len());
        let neighbor = self.neighbor(edge);
        self.subsegments.push(SubsegmentEntry {
            vertices: [org, dest],
            links: [Some(edge), neighbor],
            marker,
        });
        self.triangles[edge.triangle().index()].subsegments[edge.orient() as usize] = Some(handle);
        if let Some(neighbor) = neighbor {
            self.triangles[neighbor.triangle().index()].subsegments[neighbor.orient() as usize] =
                Some(handle);
        }
        handle
    }

    /// Returns the two endpoints of a subsegment.
    pub fn subsegment_vertices(&self, subsegment: FixedSubsegmentHandle) -> [FixedVertexHandle; 2] {
        self.subsegments[subsegment.index()].vertices
    }

    /// Returns the marker of a subsegment.
    pub fn subsegment_marker(&self, subsegment: FixedSubsegmentHandle) -> i32 {
        self.subsegments[subsegment.index()].marker
    }

    /// Returns the adjoining triangle edges of a subsegment. After hole
    /// carving, only the side facing the interior of the domain remains.
    pub fn subsegment_links(&self, subsegment: FixedSubsegmentHandle) -> [Option<OrientedEdge>; 2] {
        self.subsegments[subsegment.index()].links
    }

    /// Removes the link from a subsegment to a triangle that is being deleted.
    pub(crate) fn dissolve_subsegment_side(
        &mut self,
        subsegment: FixedSubsegmentHandle,
        triangle: FixedTriangleHandle,
    ) {
        for link in &mut self.subsegments[subsegment.index()].links {
            if link.map(|edge| edge.triangle()) == Some(triangle) {
                *link = None;
            }
        }
    }

    /// Re-pins a subsegment to an edge after the surrounding triangles have
    /// been restructured.
    pub(crate) fn rebond_subsegment(
        &mut self,
        subsegment: FixedSubsegmentHandle,
        edge: OrientedEdge,
    ) {
        let neighbor = self.neighbor(edge);
        self.subsegments[subsegment.index()].links = [Some(edge), neighbor];
        self.triangles[edge.triangle().index()].subsegments[edge.orient() as usize] =
            Some(subsegment);
        if let Some(neighbor) = neighbor {
            self.triangles[neighbor.triangle().index()].subsegments[neighbor.orient() as usize] =
                Some(subsegment);
        }
    }

    /// Starts a new round of triangle visits. All triangles are unvisited
    /// afterwards.
    pub(crate) fn advance_stamp(&mut self) {
        if self.current_stamp == u32::MAX {
            for triangle in &mut self.triangles {
                triangle.last_visited = 0;
            }
            self.current_stamp = 0;
        }
        self.current_stamp += 1;
    }

    pub(crate) fn mark_visited(&mut self, triangle: FixedTriangleHandle) {
        self.triangles[triangle.index()].last_visited = self.current_stamp;
    }

    pub(crate) fn is_visited(&self, triangle: FixedTriangleHandle) -> bool {
        self.triangles[triangle.index()].last_visited == self.current_stamp
    }
}

impl<V: HasPosition> Mesh<V> {
    /// Returns the position of a vertex.
    pub fn position(&self, vertex: FixedVertexHandle) -> Point2<V::Scalar> {
        self.vertices[vertex.index()].data.position()
    }

    #[allow(unused)]
    pub(crate) fn sanity_check(&self) {
        for triangle in self.triangles() {
            let is_ghost = self.is_ghost(triangle);
            for orient in 0..3 {
                let edge = OrientedEdge::new(triangle, orient);
                if let Some(neighbor) = self.neighbor(edge) {
                    assert!(!self.is_dead(neighbor.triangle()));
                    assert_eq!(self.neighbor(neighbor), Some(edge));
                    assert_eq!(self.org(edge), self.dest(neighbor));
                    assert_eq!(self.dest(edge), self.org(neighbor));
                }
                if let Some(subsegment) = self.subsegment(edge) {
                    let vertices = self.subsegment_vertices(subsegment);
                    let org = self.org(edge).unwrap();
                    let dest = self.dest(edge).unwrap();
                    assert!(vertices == [org, dest] || vertices == [dest, org]);
                }
            }

            if !is_ghost {
                let [v0, v1, v2] = self.solid_vertices(triangle);
                let query =
                    crate::side_query(self.position(v0), self.position(v1), self.position(v2));
                assert!(query.is_on_left_side(), "triangle is not oriented ccw");
            }
        }

        for subsegment in self.subsegments() {
            for link in self.subsegment_links(subsegment).into_iter().flatten() {
                assert!(!self.is_dead(link.triangle()));
                assert_eq!(self.subsegment(link), Some(subsegment));
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::{Mesh, OrientedEdge};
    use crate::Point2;

    /// Builds two solid triangles sharing one edge:
    ///
    /// ```text
    ///    v3 ---- v2
    ///     |    /  |
    ///     |   /   |
    ///     |  /    |
    ///    v0 ---- v1
    /// ```
    fn two_triangles() -> (Mesh<Point2<f64>>, OrientedEdge, OrientedEdge) {
        let mut mesh = Mesh::new();
        let v0 = mesh.add_vertex(Point2::new(0.0, 0.0));
        let v1 = mesh.add_vertex(Point2::new(1.0, 0.0));
        let v2 = mesh.add_vertex(Point2::new(1.0, 1.0));
        let v3 = mesh.add_vertex(Point2::new(0.0, 1.0));

        let lower = mesh.create_triangle(Some(v0), Some(v1), Some(v2));
        let upper = mesh.create_triangle(Some(v2), Some(v3), Some(v0));
        // The diagonal runs from v2 to v0 in `lower` and from v0 to v2 in `upper`.
        mesh.bind(lower.lnext().lnext(), upper.lnext().lnext());
        (mesh, lower, upper)
    }

    #[test]
    fn test_vertex_roles() {
        let (mesh, lower, _) = two_triangles();
        assert_eq!(mesh.org(lower).unwrap().index(), 0);
        assert_eq!(mesh.dest(lower).unwrap().index(), 1);
        assert_eq!(mesh.apex(lower).unwrap().index(), 2);

        let rotated = lower.lnext();
        assert_eq!(mesh.org(rotated), mesh.dest(lower));
        assert_eq!(mesh.dest(rotated), mesh.apex(lower));
        assert_eq!(mesh.apex(rotated), mesh.org(lower));
    }

    #[test]
    fn test_neighbor_symmetry() {
        let (mesh, lower, upper) = two_triangles();
        let diagonal = lower.lnext().lnext();
        let neighbor = mesh.neighbor(diagonal).unwrap();
        assert_eq!(neighbor, upper.lnext().lnext());
        assert_eq!(mesh.neighbor(neighbor), Some(diagonal));
        assert_eq!(mesh.org(diagonal), mesh.dest(neighbor));
        assert_eq!(mesh.dest(diagonal), mesh.org(neighbor));

        // The outer edges have no neighbors.
        assert_eq!(mesh.neighbor(lower), None);
        assert_eq!(mesh.neighbor(upper), None);
        mesh.sanity_check();
    }

    #[test]
    fn test_kill_and_reuse() {
        let (mut mesh, lower, upper) = two_triangles();
        assert_eq!(mesh.num_triangles(), 2);
        mesh.dissolve(upper.lnext().lnext());
        mesh.kill_triangle(lower.triangle());
        assert_eq!(mesh.num_triangles(), 1);
        assert!(mesh.is_dead(lower.triangle()));

        // The dead slot is reused.
        let recycled = mesh.create_triangle(None, None, None);
        assert_eq!(recycled.triangle(), lower.triangle());
        assert!(!mesh.is_dead(recycled.triangle()));
        assert_eq!(mesh.num_triangles(), 2);
    }

    #[test]
    fn test_ghost_classification() {
        let mut mesh = Mesh::<Point2<f64>>::new();
        let v0 = mesh.add_vertex(Point2::new(0.0, 0.0));
        let v1 = mesh.add_vertex(Point2::new(1.0, 0.0));
        let ghost = mesh.create_triangle(Some(v0), Some(v1), None);
        assert!(mesh.is_ghost(ghost.triangle()));
        assert_eq!(mesh.apex(ghost), None);
        assert_eq!(mesh.org(ghost.lnext()), mesh.dest(ghost));
        assert_eq!(mesh.dest(ghost.lnext()), None);
    }

    #[test]
    fn test_visited_stamps() {
        let (mut mesh, lower, upper) = two_triangles();
        mesh.advance_stamp();
        assert!(!mesh.is_visited(lower.triangle()));
        mesh.mark_visited(lower.triangle());
        assert!(mesh.is_visited(lower.triangle()));
        assert!(!mesh.is_visited(upper.triangle()));

        // A new round forgets all marks.
        mesh.advance_stamp();
        assert!(!mesh.is_visited(lower.triangle()));
    }

    #[test]
    fn test_subsegment_bonding() {
        let (mut mesh, lower, upper) = two_triangles();
        let diagonal = lower.lnext().lnext();
        let subsegment = mesh.bond_new_subsegment(diagonal, 7);
        assert_eq!(mesh.subsegment(diagonal), Some(subsegment));
        assert_eq!(mesh.subsegment(upper.lnext().lnext()), Some(subsegment));
        assert_eq!(mesh.subsegment_marker(subsegment), 7);
        mesh.sanity_check();

        mesh.dissolve_subsegment_side(subsegment, upper.triangle());
        assert_eq!(mesh.subsegment_links(subsegment), [Some(diagonal), None]);
    }
}
