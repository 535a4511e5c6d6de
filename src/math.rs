use std::{error::Error, fmt::Display};

use crate::mesh::FixedVertexHandle;
use crate::{HasPosition, LineSideInfo, Point2};
use num_traits::Float;

use crate::DwyerNum;

/// Indicates a point's projected position relative to an edge.
///
/// Returned by [project_point].
pub struct PointProjection<S> {
    factor: S,
    length_2: S,
}

/// The error type reported for an invalid vertex position.
///
/// Vertices can be checked for validity up front by using [crate::validate_vertex].
#[derive(Copy, Clone, PartialOrd, Ord, PartialEq, Eq, Debug, Hash)]
pub enum CoordinateError {
    /// A coordinate value was too small.
    ///
    /// The absolute value of any vertex coordinate must either be zero or
    /// greater than or equal to [crate::MIN_ALLOWED_VALUE].
    TooSmall,

    /// A coordinate value was too large.
    ///
    /// The absolute value of any vertex coordinate must be less than or equal to
    /// [crate::MAX_ALLOWED_VALUE].
    TooLarge,

    /// A coordinate value was NaN.
    NAN,
}

impl Display for CoordinateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        <Self as std::fmt::Debug>::fmt(self, f)
    }
}

impl Error for CoordinateError {}

/// Identifies the stage of triangulation or dual construction in which an
/// internal invariant was found to be violated.
#[derive(Copy, Clone, PartialOrd, Ord, PartialEq, Eq, Debug, Hash)]
pub enum Phase {
    /// Sorting and duplicate removal of the input vertices.
    Sort,
    /// The divide and conquer base cases.
    Build,
    /// Merging two partial triangulations.
    Merge,
    /// Construction of the Voronoi dual.
    Dual,
    /// Resolution of unbounded Voronoi edges.
    Resolve,
}

/// The error type used for creating triangulations.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub enum TriangulationError {
    /// Fewer than two distinct vertices remained after duplicate removal.
    TooFewVertices {
        /// The number of distinct vertices found in the input.
        found: usize,
    },

    /// A vertex coordinate was unsuitable for exact predicate evaluation.
    InvalidCoordinate(CoordinateError),

    /// A constraint edge could not be recovered, e.g. because one of its
    /// endpoints was removed as a duplicate or the edge passes exactly
    /// through another vertex.
    MissingEdge {
        /// The requested start vertex of the constraint edge.
        from: FixedVertexHandle,
        /// The requested end vertex of the constraint edge.
        to: FixedVertexHandle,
    },

    /// An internal invariant was violated. This indicates a bug, not bad input.
    InternalError(Phase),
}

impl Display for TriangulationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        <Self as std::fmt::Debug>::fmt(self, f)
    }
}

impl Error for TriangulationError {}

impl From<CoordinateError> for TriangulationError {
    fn from(error: CoordinateError) -> Self {
        TriangulationError::InvalidCoordinate(error)
    }
}

/// The smallest allowed coordinate value greater than zero that can be used with
/// triangulations. This value is equal to 2<sup>-142</sup>.
///
/// The *absolute value* of any vertex coordinate must be either zero or greater
/// than or equal to this value.
/// This is a requirement for preventing floating point underflow when calculating exact
/// geometric predicates.
///
/// Note that "underflow" refers to underflow of the `f64` _exponent_ in contrast to underflow
/// towards negative infinity: Values very close to zero (but not zero itself) can potentially
/// trigger this situation.
///
/// *See also [validate_coordinate], [validate_vertex], [MAX_ALLOWED_VALUE],
/// [mitigate_underflow]*

// Implementation note: These numbers come from the paper of Jonathan Richard Shewchuk:
// "The four predicates implemented for this report will not overflow nor underflow if
// their inputs have exponents in the range -[142, 201] and IEEE-745 double precision
// arithmetic is used."
// Source: Adaptive Precision Floating-Point Arithmetic and Fast Robust Geometric Predicates
pub const MIN_ALLOWED_VALUE: f64 = 1.793662034335766e-43; // 1.0 * 2^-142

/// The largest allowed coordinate value that can be used with triangulations.
/// This value is equal to 2<sup>201</sup>.
///
/// The *absolute value* of any vertex coordinate must be smaller than or equal
/// to this value.
/// This is a requirement for preventing floating point overflow when calculating exact
/// geometric predicates.
///
/// *See also [validate_coordinate], [validate_vertex], [MIN_ALLOWED_VALUE]*
pub const MAX_ALLOWED_VALUE: f64 = 3.2138760885179806e60; // 1.0 * 2^201

/// Checks if a coordinate value is suitable for a Delaunay triangulation.
///
/// Will return an error if and only if
///  - The absolute value of the coordinate is too small (See [MIN_ALLOWED_VALUE])
///  - The absolute value of the coordinate is too large (See [MAX_ALLOWED_VALUE])
///  - The coordinate is NaN (not a number)
///
/// Passing in any non-finite floating point number (e.g. `f32::NEG_INFINITY`) will
/// result in `Err(CoordinateError::TooLarge)`.
///
/// Note that any non-nan, finite, **normal** `f32` coordinate will always be valid.
/// However, subnormal `f32` numbers may still cause an underflow.
///
/// *See also [mitigate_underflow]*
pub fn validate_coordinate<S: DwyerNum>(value: S) -> Result<(), CoordinateError> {
    let as_f64: f64 = value.into();
    if as_f64.is_nan() {
        Err(CoordinateError::NAN)
    } else if as_f64.abs() < MIN_ALLOWED_VALUE && as_f64 != 0.0 {
        Err(CoordinateError::TooSmall)
    } else if as_f64.abs() > MAX_ALLOWED_VALUE {
        Err(CoordinateError::TooLarge)
    } else {
        Ok(())
    }
}

/// Checks if a vertex is suitable for a Delaunay triangulation.
///
/// A vertex is considered suitable if all of its coordinates are valid. See [validate_coordinate]
/// for more information.
///
/// *See also [mitigate_underflow]*
pub fn validate_vertex<V: HasPosition>(vertex: &V) -> Result<(), CoordinateError> {
    let position = vertex.position();
    validate_coordinate(position.x)?;
    validate_coordinate(position.y)?;
    Ok(())
}

/// Prevents underflow issues of a position by setting any coordinate that is too small to zero.
///
/// A vertex with a position returned by this function will never cause
/// [CoordinateError::TooSmall] when being passed to a triangulation.
/// Note that this method will _always_ round towards zero, even if rounding to
/// ±[MIN_ALLOWED_VALUE] would result in a smaller rounding error.
///
/// This function might be useful if the vertices come from an uncontrollable source like user
/// input. There is deliberately no `mitigate_overflow` method as clamping a coordinate to
/// ±[MAX_ALLOWED_VALUE] could result in an arbitrarily large error.
///
/// # Example
/// ```
/// use dwyer::{triangulate, CoordinateError, TriangulationError, Point2};
///
/// let invalid_position = Point2::new(1.0e-44, 42.0);
/// let points = vec![
///     Point2::new(0.0, 0.0),
///     Point2::new(1.0, 0.0),
///     invalid_position,
/// ];
///
/// // Oh no! We're not allowed to triangulate that point!
/// assert_eq!(
///     triangulate(points.clone()).err(),
///     Some(TriangulationError::InvalidCoordinate(
///         CoordinateError::TooSmall
///     ))
/// );
///
/// let valid_position = dwyer::mitigate_underflow(invalid_position);
///
/// // That's better!
/// let points = vec![points[0], points[1], valid_position];
/// assert!(triangulate(points).is_ok());
///
/// // But keep in mind that the position has changed:
/// assert_ne!(invalid_position, valid_position);
/// assert_eq!(valid_position, Point2::new(0.0, 42.0));
/// ```
pub fn mitigate_underflow(position: Point2<f64>) -> Point2<f64> {
    Point2::new(
        mitigate_underflow_for_coordinate(position.x),
        mitigate_underflow_for_coordinate(position.y),
    )
}

fn mitigate_underflow_for_coordinate<S: DwyerNum>(coordinate: S) -> S {
    if coordinate != S::zero() && coordinate.abs().into() < MIN_ALLOWED_VALUE {
        S::zero()
    } else {
        coordinate
    }
}

impl<S: DwyerNum> PointProjection<S> {
    fn new(factor: S, length_2: S) -> Self {
        Self { factor, length_2 }
    }

    /// Returns `true` if a point's projection is located before an edge.
    pub fn is_before_edge(&self) -> bool {
        self.factor < S::zero()
    }

    /// Returns `true` if a point's projection is located behind an edge.
    pub fn is_behind_edge(&self) -> bool {
        self.factor > self.length_2
    }

    /// Returns `true` if a point's projection is located on an edge.
    pub fn is_on_edge(&self) -> bool {
        !self.is_before_edge() && !self.is_behind_edge()
    }
}

impl<S: DwyerNum + Float> PointProjection<S> {
    /// Returns the relative position of the projected point on the edge.
    ///
    /// This method will return a value between 0.0 and 1.0 (linearly interpolated) if the
    /// projected point lies between the edge's start and end point, a value smaller than
    /// zero if it lies "before" the start and a value greater than 1.0 if it lies behind
    /// the end point.
    pub fn relative_position(&self) -> S {
        self.factor / self.length_2
    }
}

/// Projects a point onto the line through `p1` and `p2`.
pub fn project_point<S>(p1: Point2<S>, p2: Point2<S>, query_point: Point2<S>) -> PointProjection<S>
where
    S: DwyerNum,
{
    let dir = p2.sub(p1);
    PointProjection::new(query_point.sub(p1).dot(dir), dir.length2())
}

fn to_robust_coord<S: DwyerNum>(point: Point2<S>) -> robust::Coord<S> {
    robust::Coord {
        x: point.x,
        y: point.y,
    }
}

/// Returns `true` if `p` lies strictly inside the circle through `v1`, `v2`
/// and `v3`. The three circle vertices must be ordered counterclockwise.
pub fn contained_in_circumference<S>(
    v1: Point2<S>,
    v2: Point2<S>,
    v3: Point2<S>,
    p: Point2<S>,
) -> bool
where
    S: DwyerNum,
{
    let v1 = to_robust_coord(v1);
    let v2 = to_robust_coord(v2);
    let v3 = to_robust_coord(v3);
    let p = to_robust_coord(p);

    // incircle expects all vertices to be ordered CW for right handed systems.
    // For consistency, the public interface of this method will expect the points to be
    // ordered ccw.
    robust::incircle(v3, v2, v1, p) < 0.0
}

/// Determines on which side of the directed line through `p1` and `p2` a
/// point lies, evaluated with exact arithmetic.
pub fn side_query<S>(p1: Point2<S>, p2: Point2<S>, query_point: Point2<S>) -> LineSideInfo
where
    S: DwyerNum,
{
    let p1 = to_robust_coord(p1);
    let p2 = to_robust_coord(p2);
    let query_point = to_robust_coord(query_point);

    let result = robust::orient2d(p1, p2, query_point);
    LineSideInfo::from_determinant(result)
}

/// Returns the intersection of the infinite lines through `(p1, p2)` and
/// `(q1, q2)`, or `None` if the lines are parallel.
pub(crate) fn line_intersection<S>(
    p1: Point2<S>,
    p2: Point2<S>,
    q1: Point2<S>,
    q2: Point2<S>,
) -> Option<Point2<S>>
where
    S: DwyerNum + Float,
{
    let r = p2.sub(p1);
    let s = q2.sub(q1);
    let denominator = r.x * s.y - r.y * s.x;
    if denominator == S::zero() {
        return None;
    }
    let offset = q1.sub(p1);
    let t = (offset.x * s.y - offset.y * s.x) / denominator;
    Some(p1.add(r.mul(t)))
}

/// Returns the circumcenter of a triangle with positively oriented vertices,
/// along with the squared circumradius.
pub fn circumcenter<S>(positions: [Point2<S>; 3]) -> (Point2<S>, S)
where
    S: DwyerNum + Float,
{
    let [v0, v1, v2] = positions;
    let b = v1.sub(v0);
    let c = v2.sub(v0);

    let one = S::one();
    let two = one + one;
    let d = two * (b.x * c.y - c.x * b.y);
    let len_b = b.dot(b);
    let len_c = c.dot(c);
    let d_inv: S = one / d;

    let x = (len_b * c.y - len_c * b.y) * d_inv;
    let y = (-len_b * c.x + len_c * b.x) * d_inv;
    let result = Point2::new(x, y);
    (result.add(v0), x * x + y * y)
}
