use hashbrown::{HashMap, HashSet};
use num_traits::Float;
use smallvec::SmallVec;

use crate::divconq::Triangulation;
use crate::math::{line_intersection, project_point, side_query};
use crate::mesh::{FixedSubsegmentHandle, FixedVertexHandle, Mesh, OrientedEdge};
use crate::rectangle::{BoundingRect, RectSide};
use crate::voronoi::{VoronoiDiagram, VoronoiHalfEdge};
use crate::{DwyerNum, HasPosition};

/// Resolves all rays against a rectangle and closes the affected cells along
/// its boundary.
///
/// Rays that never reach the rectangle stay unresolved and leave their cell
/// open. Edges between two circumcenters are not clipped even when they lie
/// outside of the rectangle, resolution is best effort in that case.
pub(super) fn resolve_rectangle<S: DwyerNum + Float>(
    diagram: &mut VoronoiDiagram<S>,
    rect: &BoundingRect<S>,
) {
    // Move the far endpoint of every ray that reaches the rectangle onto its
    // boundary.
    let mut sides: HashMap<u32, RectSide> = HashMap::new();
    for index in 0..diagram.rays.len() {
        let ray = diagram.rays[index];
        let edge = diagram.half_edges[ray as usize];
        let (Some(origin), Some(direction)) = (edge.origin, edge.direction) else {
            continue;
        };
        let Some((exit, side)) = rect.ray_exit(diagram.vertices[origin as usize], direction)
        else {
            continue;
        };
        let vertex = diagram.vertices.len() as u32;
        diagram.vertices.push(exit);
        diagram.half_edges[ray as usize].end = Some(vertex);
        if let Some(twin) = edge.twin {
            diagram.half_edges[twin as usize].origin = Some(vertex);
        }
        sides.insert(ray, side);
    }

    // Close each open cell whose chain starts and ends on the rectangle by
    // walking counterclockwise along the boundary, inserting the corners that
    // are passed on the way.
    for face in 0..diagram.faces.len() {
        if diagram.faces[face].bounded {
            continue;
        }
        let Some(first) = diagram.faces[face].first_edge else {
            continue;
        };
        let incoming = diagram.half_edges[first as usize];
        let (Some(entry_vertex), Some(incoming_twin)) = (incoming.origin, incoming.twin) else {
            continue;
        };
        let Some(&entry_side) = sides.get(&incoming_twin) else {
            continue;
        };

        // Find the final, outgoing ray of the chain.
        let mut outgoing = first;
        let mut budget = diagram.half_edges.len();
        while let Some(next) = diagram.half_edges[outgoing as usize].next {
            outgoing = next;
            budget -= 1;
            if budget == 0 {
                break;
            }
        }
        if budget == 0 {
            continue;
        }
        let Some(exit_vertex) = diagram.half_edges[outgoing as usize].end else {
            continue;
        };
        let Some(&exit_side) = sides.get(&outgoing) else {
            continue;
        };

        let exit = diagram.vertices[exit_vertex as usize];
        let entry = diagram.vertices[entry_vertex as usize];
        let corners = rect.corners_between_ccw(exit, exit_side, entry, entry_side);

        let mut previous = outgoing;
        let mut current_vertex = exit_vertex;
        for corner in corners {
            let corner_vertex = diagram.vertices.len() as u32;
            diagram.vertices.push(corner);
            previous =
                push_closure_edge(diagram, previous, current_vertex, corner_vertex, face as u32);
            current_vertex = corner_vertex;
        }
        let last = push_closure_edge(diagram, previous, current_vertex, entry_vertex, face as u32);
        diagram.half_edges[last as usize].next = Some(first);
        diagram.faces[face].bounded = true;
    }
}

/// Appends a boundary closure edge and hooks it behind `previous`.
fn push_closure_edge<S: DwyerNum>(
    diagram: &mut VoronoiDiagram<S>,
    previous: u32,
    from: u32,
    to: u32,
    face: u32,
) -> u32 {
    let id = diagram.half_edges.len() as u32;
    diagram.half_edges.push(VoronoiHalfEdge {
        origin: Some(from),
        end: Some(to),
        direction: None,
        face,
        twin: None,
        next: None,
    });
    diagram.half_edges[previous as usize].next = Some(id);
    id
}

/// A point on the domain boundary, located on a subsegment by its relative
/// position between the subsegment's two vertices.
#[derive(Debug, Clone, Copy)]
struct Anchor<S> {
    subsegment: FixedSubsegmentHandle,
    position: S,
}

/// Resolves the diagram against the triangulation's own boundary
/// subsegments.
///
/// Rays of subsegment-covered boundary edges end at the edge midpoint, edges
/// reaching a blinded circumcenter are cut where they cross the blinding
/// subsegment and the cells are closed by walking along the subsegments.
/// Cells for which no valid boundary intersection is found are left open.
pub(super) fn resolve_domain<S, V>(
    diagram: &mut VoronoiDiagram<S>,
    triangulation: &Triangulation<V>,
) where
    S: DwyerNum + Float,
    V: HasPosition<Scalar = S>,
{
    let mesh = triangulation.mesh();

    // A triangle whose circumcenter falls on the far side of a subsegment is
    // blinded by it. The search spreads outward from each subsegment over
    // adjacent blinded triangles without crossing other subsegments.
    let vertex_of: HashMap<_, _> = diagram
        .sources
        .iter()
        .enumerate()
        .map(|(index, &triangle)| (triangle, index as u32))
        .collect();
    let mut blinded: HashMap<u32, FixedSubsegmentHandle> = HashMap::new();
    for subsegment in mesh.subsegments() {
        let [a, b] = mesh.subsegment_vertices(subsegment);
        let pa = mesh.position(a);
        let pb = mesh.position(b);
        for link in mesh.subsegment_links(subsegment).into_iter().flatten() {
            let Some(apex) = mesh.apex(link) else {
                continue;
            };
            let interior = side_query(pa, pb, mesh.position(apex));
            if interior.is_on_line() {
                continue;
            }
            let mut stack = vec![link.triangle()];
            let mut seen = HashSet::new();
            while let Some(triangle) = stack.pop() {
                if !seen.insert(triangle) {
                    continue;
                }
                let Some(&vertex) = vertex_of.get(&triangle) else {
                    continue;
                };
                let center_side = side_query(pa, pb, diagram.vertices[vertex as usize]);
                if center_side.is_on_line()
                    || center_side.is_on_left_side() == interior.is_on_left_side()
                {
                    continue;
                }
                blinded.entry(vertex).or_insert(subsegment);
                for orient in 0..3 {
                    let edge = OrientedEdge::new(triangle, orient);
                    if mesh.subsegment(edge).is_some() {
                        continue;
                    }
                    if let Some(neighbor) = mesh.neighbor(edge) {
                        stack.push(neighbor.triangle());
                    }
                }
            }
        }
    }

    // Cut the diagram's edges at the domain boundary.
    let mut cut_exit: HashMap<u32, Anchor<S>> = HashMap::new();
    let mut cut_entry: HashMap<u32, Anchor<S>> = HashMap::new();
    let mut removed: HashSet<u32> = HashSet::new();
    let mut broken: HashSet<u32> = HashSet::new();

    for index in 0..diagram.sources.len() {
        let triangle = diagram.sources[index];
        for orient in 0..3 {
            let id = (index * 3 + orient as usize) as u32;
            let edge = OrientedEdge::new(triangle, orient);
            let half_edge = diagram.half_edges[id as usize];

            if mesh.neighbor(edge).is_none() {
                let Some(subsegment) = mesh.subsegment(edge) else {
                    // An unprotected boundary edge, the adjacent cells cannot
                    // be closed.
                    broken.insert(half_edge.face);
                    if let Some(twin) = half_edge.twin {
                        broken.insert(diagram.half_edges[twin as usize].face);
                    }
                    continue;
                };
                // The perpendicular bisector of a boundary edge crosses it
                // exactly at its midpoint.
                let (Some(org), Some(dest)) = (mesh.org(edge), mesh.dest(edge)) else {
                    continue;
                };
                let Some(origin) = half_edge.origin else {
                    continue;
                };
                let blinding = blinded.get(&origin).copied();
                if blinding == Some(subsegment) {
                    // The circumcenter lies behind this very subsegment, so
                    // the ray crosses it exactly at the midpoint and no part
                    // of it remains inside the domain.
                    removed.insert(id);
                    if let Some(twin) = half_edge.twin {
                        removed.insert(twin);
                    }
                    continue;
                }
                let one = S::one();
                let half = one / (one + one);
                let midpoint = mesh.position(org).add(mesh.position(dest)).mul(half);
                let [a, b] = mesh.subsegment_vertices(subsegment);
                let anchor = Anchor {
                    subsegment,
                    position: project_point(mesh.position(a), mesh.position(b), midpoint)
                        .relative_position(),
                };
                let vertex = diagram.vertices.len() as u32;
                diagram.vertices.push(midpoint);
                diagram.half_edges[id as usize].end = Some(vertex);
                cut_exit.insert(id, anchor);
                if let Some(twin) = half_edge.twin {
                    diagram.half_edges[twin as usize].origin = Some(vertex);
                    cut_entry.insert(twin, anchor);
                }
                if let Some(blinding) = blinding {
                    // The circumcenter itself lies outside of the domain, pull
                    // the near end of the ray back to the blinding subsegment.
                    let [a, b] = mesh.subsegment_vertices(blinding);
                    let pa = mesh.position(a);
                    let pb = mesh.position(b);
                    let from = diagram.vertices[origin as usize];
                    let Some(cut) = line_intersection(from, midpoint, pa, pb) else {
                        broken.insert(half_edge.face);
                        if let Some(twin) = half_edge.twin {
                            broken.insert(diagram.half_edges[twin as usize].face);
                        }
                        continue;
                    };
                    let anchor = Anchor {
                        subsegment: blinding,
                        position: project_point(pa, pb, cut).relative_position(),
                    };
                    let vertex = diagram.vertices.len() as u32;
                    diagram.vertices.push(cut);
                    diagram.half_edges[id as usize].origin = Some(vertex);
                    cut_entry.insert(id, anchor);
                    if let Some(twin) = half_edge.twin {
                        diagram.half_edges[twin as usize].end = Some(vertex);
                        cut_exit.insert(twin, anchor);
                    }
                }
                continue;
            }

            // Interior edges are processed from their unblinded side.
            let (Some(origin), Some(end)) = (half_edge.origin, half_edge.end) else {
                continue;
            };
            let origin_blinded = blinded.contains_key(&origin);
            match (origin_blinded, blinded.get(&end).copied()) {
                (false, Some(subsegment)) => {
                    let [a, b] = mesh.subsegment_vertices(subsegment);
                    let pa = mesh.position(a);
                    let pb = mesh.position(b);
                    let from = diagram.vertices[origin as usize];
                    let to = diagram.vertices[end as usize];
                    let Some(cut) = line_intersection(from, to, pa, pb) else {
                        broken.insert(half_edge.face);
                        if let Some(twin) = half_edge.twin {
                            broken.insert(diagram.half_edges[twin as usize].face);
                        }
                        continue;
                    };
                    let anchor = Anchor {
                        subsegment,
                        position: project_point(pa, pb, cut).relative_position(),
                    };
                    let vertex = diagram.vertices.len() as u32;
                    diagram.vertices.push(cut);
                    diagram.half_edges[id as usize].end = Some(vertex);
                    cut_exit.insert(id, anchor);
                    if let Some(twin) = half_edge.twin {
                        diagram.half_edges[twin as usize].origin = Some(vertex);
                        cut_entry.insert(twin, anchor);
                    }
                }
                (true, Some(end_blinding)) => {
                    // Both circumcenters lie outside of the domain, but the
                    // edge may still pass through it. Keep the portion between
                    // the two blinding subsegments if there is one.
                    let Some(&origin_blinding) = blinded.get(&origin) else {
                        continue;
                    };
                    if origin_blinding == end_blinding {
                        removed.insert(id);
                        continue;
                    }
                    let from = diagram.vertices[origin as usize];
                    let to = diagram.vertices[end as usize];
                    let [a, b] = mesh.subsegment_vertices(origin_blinding);
                    let (pa, pb) = (mesh.position(a), mesh.position(b));
                    let [c, d] = mesh.subsegment_vertices(end_blinding);
                    let (pc, pd) = (mesh.position(c), mesh.position(d));
                    let (Some(enter), Some(exit)) = (
                        line_intersection(from, to, pa, pb),
                        line_intersection(from, to, pc, pd),
                    ) else {
                        removed.insert(id);
                        continue;
                    };
                    let enter_at = project_point(from, to, enter).relative_position();
                    let exit_at = project_point(from, to, exit).relative_position();
                    if enter_at >= exit_at {
                        // The edge never enters the domain.
                        removed.insert(id);
                        continue;
                    }
                    let enter_anchor = Anchor {
                        subsegment: origin_blinding,
                        position: project_point(pa, pb, enter).relative_position(),
                    };
                    let exit_anchor = Anchor {
                        subsegment: end_blinding,
                        position: project_point(pc, pd, exit).relative_position(),
                    };
                    let enter_vertex = diagram.vertices.len() as u32;
                    diagram.vertices.push(enter);
                    let exit_vertex = diagram.vertices.len() as u32;
                    diagram.vertices.push(exit);
                    diagram.half_edges[id as usize].origin = Some(enter_vertex);
                    diagram.half_edges[id as usize].end = Some(exit_vertex);
                    cut_entry.insert(id, enter_anchor);
                    cut_exit.insert(id, exit_anchor);
                    if let Some(twin) = half_edge.twin {
                        diagram.half_edges[twin as usize].origin = Some(exit_vertex);
                        diagram.half_edges[twin as usize].end = Some(enter_vertex);
                        cut_entry.insert(twin, exit_anchor);
                        cut_exit.insert(twin, enter_anchor);
                    }
                }
                _ => {}
            }
        }
    }

    // Map from boundary vertices to their incident subsegments, needed to
    // continue a boundary walk past a corner.
    let mut segments_at: HashMap<FixedVertexHandle, SmallVec<[FixedSubsegmentHandle; 2]>> =
        HashMap::new();
    for subsegment in mesh.subsegments() {
        for vertex in mesh.subsegment_vertices(subsegment) {
            segments_at.entry(vertex).or_default().push(subsegment);
        }
    }

    // Relink each cell, closing the gaps left by removed and cut edges with
    // walks along the boundary.
    for face in 0..diagram.faces.len() {
        let Some(first) = diagram.faces[face].first_edge else {
            continue;
        };
        if broken.contains(&(face as u32)) {
            diagram.faces[face].bounded = false;
            continue;
        }

        let mut chain = vec![first];
        let mut current = first;
        let mut budget = diagram.half_edges.len();
        while let Some(next) = diagram.half_edges[current as usize].next {
            if next == first {
                break;
            }
            chain.push(next);
            current = next;
            budget -= 1;
            if budget == 0 {
                break;
            }
        }
        if budget == 0 {
            diagram.faces[face].bounded = false;
            continue;
        }
        let kept: Vec<u32> = chain
            .into_iter()
            .filter(|id| !removed.contains(id))
            .collect();
        if kept.is_empty() {
            diagram.faces[face].bounded = false;
            continue;
        }

        let mut closed = true;
        for position in 0..kept.len() {
            let id = kept[position];
            let follower = kept[(position + 1) % kept.len()];
            let end = diagram.half_edges[id as usize].end;
            let start = diagram.half_edges[follower as usize].origin;
            if !cut_exit.contains_key(&id) && end.is_some() && end == start {
                diagram.half_edges[id as usize].next = Some(follower);
                continue;
            }
            let (Some(&exit), Some(&entry)) = (cut_exit.get(&id), cut_entry.get(&follower))
            else {
                closed = false;
                break;
            };
            if !close_gap(diagram, mesh, &segments_at, face as u32, id, exit, follower, entry) {
                closed = false;
                break;
            }
        }
        diagram.faces[face].bounded = closed;
        if closed {
            diagram.faces[face].first_edge = Some(kept[0]);
        }
    }
}

/// Walks along the boundary subsegments from an exit anchor to the next
/// entry anchor, appending closure edges and corner vertices on the way.
///
/// Traveling a subsegment in the direction of its linked mesh edge keeps the
/// domain interior on the left, which makes the walk counterclockwise around
/// the cell. Returns `false` if the entry anchor cannot be reached.
#[allow(clippy::too_many_arguments)]
fn close_gap<S, V>(
    diagram: &mut VoronoiDiagram<S>,
    mesh: &Mesh<V>,
    segments_at: &HashMap<FixedVertexHandle, SmallVec<[FixedSubsegmentHandle; 2]>>,
    face: u32,
    exit_edge: u32,
    exit: Anchor<S>,
    entry_edge: u32,
    entry: Anchor<S>,
) -> bool
where
    S: DwyerNum + Float,
    V: HasPosition<Scalar = S>,
{
    let Some(mut current_vertex) = diagram.half_edges[exit_edge as usize].end else {
        return false;
    };
    let Some(entry_vertex) = diagram.half_edges[entry_edge as usize].origin else {
        return false;
    };

    let mut previous = exit_edge;
    let mut subsegment = exit.subsegment;
    let mut position = exit.position;
    let mut budget = mesh.num_subsegments() + 2;
    loop {
        budget -= 1;
        if budget == 0 {
            return false;
        }
        let [a, b] = mesh.subsegment_vertices(subsegment);
        let Some(link) = mesh
            .subsegment_links(subsegment)
            .into_iter()
            .flatten()
            .next()
        else {
            return false;
        };
        let Some(ahead) = mesh.dest(link) else {
            return false;
        };
        let increasing = ahead == b;

        if entry.subsegment == subsegment {
            let reachable = if increasing {
                entry.position >= position
            } else {
                entry.position <= position
            };
            if reachable {
                let last =
                    push_closure_edge(diagram, previous, current_vertex, entry_vertex, face);
                diagram.half_edges[last as usize].next = Some(entry_edge);
                return true;
            }
        }

        // Continue past the corner onto the adjacent subsegment.
        let corner = if increasing { b } else { a };
        let corner_vertex = diagram.vertices.len() as u32;
        diagram.vertices.push(mesh.position(corner));
        previous = push_closure_edge(diagram, previous, current_vertex, corner_vertex, face);
        current_vertex = corner_vertex;

        let Some(next_subsegment) = segments_at
            .get(&corner)
            .and_then(|list| list.iter().copied().find(|&other| other != subsegment))
        else {
            return false;
        };
        subsegment = next_subsegment;
        let [next_a, _] = mesh.subsegment_vertices(next_subsegment);
        position = if corner == next_a { S::zero() } else { S::one() };
    }
}
