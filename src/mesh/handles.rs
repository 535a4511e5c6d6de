use std::fmt::{Debug, Formatter, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A handle to a vertex of a triangulation.
///
/// Vertex handles are stable: the handle of a vertex is determined by its
/// position in the input sequence and never changes afterwards, not even for
/// vertices that turn out to be duplicates.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde")
)]
pub struct FixedVertexHandle {
    index: u32,
}

/// A handle to a triangle of a triangulation.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde")
)]
pub struct FixedTriangleHandle {
    index: u32,
}

/// A handle to a subsegment (a constraint edge) of a triangulation.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde")
)]
pub struct FixedSubsegmentHandle {
    index: u32,
}

macro_rules! impl_handle {
    ($handle_type:ident, $debug_name:literal) => {
        impl $handle_type {
            pub(crate) fn new(index: usize) -> Self {
                Self {
                    index: index as u32,
                }
            }

            /// Returns the index of this handle into the backing storage.
            #[inline]
            pub fn index(self) -> usize {
                self.index as usize
            }
        }

        impl Debug for $handle_type {
            fn fmt(&self, f: &mut Formatter<'_>) -> Result {
                write!(f, concat!($debug_name, "({})"), self.index)
            }
        }
    };
}

impl_handle!(FixedVertexHandle, "VertexHandle");
impl_handle!(FixedTriangleHandle, "TriangleHandle");
impl_handle!(FixedSubsegmentHandle, "SubsegmentHandle");
