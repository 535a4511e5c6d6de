use std::fmt::{Debug, Formatter, Result};

use super::FixedTriangleHandle;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One of the three directed edges of a triangle.
///
/// An oriented edge pairs a triangle with an orientation in `0..3`. The three
/// vertices of the triangle take the roles *origin*, *destination* and *apex*
/// relative to that orientation:
///
/// ```text
///            apex
///            /  \
///           /    \
///          /      \
///     origin ----> destination
/// ```
///
/// Rotating within the same triangle is a pure index operation ([Self::lnext],
/// [Self::lprev]). Crossing over to the neighboring triangle requires mesh
/// access, see [Mesh::neighbor](super::Mesh::neighbor).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde")
)]
pub struct OrientedEdge {
    triangle: FixedTriangleHandle,
    orient: u8,
}

impl OrientedEdge {
    pub(crate) fn new(triangle: FixedTriangleHandle, orient: u8) -> Self {
        debug_assert!(orient < 3);
        Self { triangle, orient }
    }

    /// Returns the triangle this edge belongs to.
    #[inline]
    pub fn triangle(self) -> FixedTriangleHandle {
        self.triangle
    }

    /// Returns the orientation within the triangle, a value in `0..3`.
    #[inline]
    pub fn orient(self) -> u8 {
        self.orient
    }

    /// Returns the next edge counterclockwise within the same triangle.
    ///
    /// The returned edge starts at this edge's destination.
    #[inline]
    pub fn lnext(self) -> Self {
        Self::new(self.triangle, PLUS_1_MOD_3[self.orient as usize])
    }

    /// Returns the previous edge counterclockwise within the same triangle.
    ///
    /// The returned edge ends at this edge's origin.
    #[inline]
    pub fn lprev(self) -> Self {
        Self::new(self.triangle, MINUS_1_MOD_3[self.orient as usize])
    }

    /// The vertex slot holding this edge's apex.
    #[inline]
    pub(crate) fn apex_slot(self) -> usize {
        self.orient as usize
    }

    /// The vertex slot holding this edge's origin.
    #[inline]
    pub(crate) fn org_slot(self) -> usize {
        PLUS_1_MOD_3[self.orient as usize] as usize
    }

    /// The vertex slot holding this edge's destination.
    #[inline]
    pub(crate) fn dest_slot(self) -> usize {
        MINUS_1_MOD_3[self.orient as usize] as usize
    }
}

const PLUS_1_MOD_3: [u8; 3] = [1, 2, 0];
const MINUS_1_MOD_3: [u8; 3] = [2, 0, 1];

impl Debug for OrientedEdge {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        write!(f, "OrientedEdge({}:{})", self.triangle.index(), self.orient)
    }
}

#[cfg(test)]
mod test {
    use super::{FixedTriangleHandle, OrientedEdge};

    #[test]
    fn test_rotation_algebra() {
        for orient in 0..3 {
            let edge = OrientedEdge::new(FixedTriangleHandle::new(0), orient);
            assert_eq!(edge.lnext().lnext().lnext(), edge);
            assert_eq!(edge.lprev().lprev().lprev(), edge);
            assert_eq!(edge.lnext().lprev(), edge);
            assert_eq!(edge.lprev().lnext(), edge);
        }
    }

    #[test]
    fn test_vertex_slots() {
        for orient in 0..3 {
            let edge = OrientedEdge::new(FixedTriangleHandle::new(0), orient);
            // lnext starts at this edge's destination.
            assert_eq!(edge.lnext().org_slot(), edge.dest_slot());
            // lprev ends at this edge's origin.
            assert_eq!(edge.lprev().dest_slot(), edge.org_slot());
            // All three slots are distinct.
            assert_ne!(edge.org_slot(), edge.dest_slot());
            assert_ne!(edge.org_slot(), edge.apex_slot());
            assert_ne!(edge.dest_slot(), edge.apex_slot());
        }
    }
}
