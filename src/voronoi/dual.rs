use hashbrown::HashMap;
use num_traits::Float;
use smallvec::SmallVec;

use crate::divconq::Triangulation;
use crate::math::circumcenter;
use crate::mesh::{FixedVertexHandle, OrientedEdge, VertexKind};
use crate::voronoi::{VoronoiDiagram, VoronoiFace, VoronoiHalfEdge};
use crate::{HasPosition, Point2};

/// Builds the Voronoi diagram of a triangulation with unresolved rays.
///
/// Half edges of the first block of `3 * num_triangles` entries correspond to
/// the oriented mesh edges, one per triangle and orientation; the incoming
/// rays of unbounded cells are appended after that block.
pub(super) fn build<V>(triangulation: &Triangulation<V>) -> VoronoiDiagram<V::Scalar>
where
    V: HasPosition,
    V::Scalar: Float,
{
    let mesh = triangulation.mesh();

    // Each living triangle becomes a Voronoi vertex at its circumcenter,
    // densely renumbered to skip dead arena slots.
    let mut dense = vec![u32::MAX; mesh.triangle_slot_count()];
    let mut vertices = Vec::with_capacity(mesh.num_triangles());
    let mut sources = Vec::with_capacity(mesh.num_triangles());
    for triangle in mesh.triangles() {
        dense[triangle.index()] = vertices.len() as u32;
        let positions = mesh.solid_vertices(triangle).map(|v| mesh.position(v));
        let (center, _) = circumcenter(positions);
        vertices.push(center);
        sources.push(triangle);
    }

    let mut faces: Vec<_> = mesh
        .vertices()
        .map(|vertex| VoronoiFace {
            generator: vertex,
            position: mesh.position(vertex),
            first_edge: None,
            bounded: mesh.vertex_kind(vertex) != VertexKind::Undead,
        })
        .collect();

    let unset = VoronoiHalfEdge {
        origin: None,
        end: None,
        direction: None,
        face: 0,
        twin: None,
        next: None,
    };
    let mut half_edges = vec![unset; sources.len() * 3];
    let mut rays = Vec::new();

    for (index, &triangle) in sources.iter().enumerate() {
        for orient in 0..3 {
            let edge = OrientedEdge::new(triangle, orient);
            let id = (index * 3 + orient as usize) as u32;
            let org = expect_solid(mesh.org(edge));
            let dest = expect_solid(mesh.dest(edge));
            // The half edge from this triangle's circumcenter crosses the
            // mesh edge from left to right and keeps the destination
            // generator on its left, so it belongs to the destination's face.
            let face = dest.index() as u32;

            match mesh.neighbor(edge) {
                Some(neighbor) => {
                    let neighbor_index = dense[neighbor.triangle().index()];
                    let twin = neighbor_index * 3 + neighbor.orient() as u32;
                    half_edges[id as usize] = VoronoiHalfEdge {
                        origin: Some(index as u32),
                        end: Some(neighbor_index),
                        direction: None,
                        face,
                        twin: Some(twin),
                        next: None,
                    };
                    let first_edge = &mut faces[face as usize].first_edge;
                    if first_edge.is_none() {
                        *first_edge = Some(id);
                    }
                }
                None => {
                    // A boundary edge produces an outgoing ray along the
                    // outward perpendicular plus an incoming twin for the
                    // neighboring cell.
                    let delta = mesh.position(dest).sub(mesh.position(org));
                    let direction = Point2::new(delta.y, -delta.x);
                    let incoming = half_edges.len() as u32;
                    half_edges[id as usize] = VoronoiHalfEdge {
                        origin: Some(index as u32),
                        end: None,
                        direction: Some(direction),
                        face,
                        twin: Some(incoming),
                        next: None,
                    };
                    let incoming_face = org.index() as u32;
                    half_edges.push(VoronoiHalfEdge {
                        origin: None,
                        end: Some(index as u32),
                        direction: Some(direction),
                        face: incoming_face,
                        twin: Some(id),
                        next: None,
                    });
                    rays.push(id);
                    // The incoming ray starts the open chain of its cell.
                    faces[incoming_face as usize].first_edge = Some(incoming);
                    faces[incoming_face as usize].bounded = false;
                    faces[face as usize].bounded = false;
                }
            }
        }
    }

    // Connect the cells into counterclockwise cycles. Every Voronoi vertex
    // has at most three outgoing half edges, exactly one of them per incident
    // face, so the continuation of an edge is the outgoing edge at its end
    // vertex that belongs to the same face.
    let mut outgoing: HashMap<u32, SmallVec<[u32; 4]>> = HashMap::new();
    for (id, half_edge) in half_edges.iter().enumerate() {
        if let Some(origin) = half_edge.origin {
            outgoing.entry(origin).or_default().push(id as u32);
        }
    }
    for id in 0..half_edges.len() {
        let Some(end) = half_edges[id].end else {
            continue;
        };
        let face = half_edges[id].face;
        half_edges[id].next = outgoing.get(&end).and_then(|candidates| {
            candidates
                .iter()
                .copied()
                .find(|&candidate| half_edges[candidate as usize].face == face)
        });
    }

    for face in &mut faces {
        if face.first_edge.is_none() {
            face.bounded = false;
        }
    }

    VoronoiDiagram {
        vertices,
        half_edges,
        faces,
        rays,
        sources,
    }
}

fn expect_solid(vertex: Option<FixedVertexHandle>) -> FixedVertexHandle {
    vertex.expect("ghost triangle in finished triangulation")
}
