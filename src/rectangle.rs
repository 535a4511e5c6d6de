use crate::{DwyerNum, Point2};
use num_traits::Float;
use smallvec::SmallVec;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// An axis aligned rectangle.
///
/// Used both as a bounding box of a point set and as the clip region when
/// resolving unbounded Voronoi edges.
#[derive(Clone, Copy, PartialEq, Debug)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde")
)]
pub struct BoundingRect<S> {
    lower: Point2<S>,
    upper: Point2<S>,
}

/// The four sides of a rectangle.
///
/// The sides are ordered counterclockwise, starting at the bottom, so that
/// side `i + 1` follows side `i` when traversing the boundary with the
/// rectangle's interior to the left.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) enum RectSide {
    Bottom,
    Right,
    Top,
    Left,
}

impl RectSide {
    fn index(self) -> usize {
        match self {
            RectSide::Bottom => 0,
            RectSide::Right => 1,
            RectSide::Top => 2,
            RectSide::Left => 3,
        }
    }

    fn from_index(index: usize) -> Self {
        match index % 4 {
            0 => RectSide::Bottom,
            1 => RectSide::Right,
            2 => RectSide::Top,
            _ => RectSide::Left,
        }
    }

    fn next_ccw(self) -> Self {
        Self::from_index(self.index() + 1)
    }
}

impl<S: DwyerNum> BoundingRect<S> {
    /// Creates a bounding rectangle that contains exactly one point.
    pub fn from_point(point: Point2<S>) -> Self {
        BoundingRect {
            lower: point,
            upper: point,
        }
    }

    /// Creates a bounding rectangle from two corner points.
    ///
    /// The corners do not need to be ordered in any way.
    pub fn from_corners(corner1: Point2<S>, corner2: Point2<S>) -> Self {
        let min = |a: S, b: S| if a < b { a } else { b };
        let max = |a: S, b: S| if a > b { a } else { b };
        BoundingRect {
            lower: Point2::new(min(corner1.x, corner2.x), min(corner1.y, corner2.y)),
            upper: Point2::new(max(corner1.x, corner2.x), max(corner1.y, corner2.y)),
        }
    }

    /// Returns the lower corner of the bounding rectangle.
    ///
    /// The lower corner has the smaller coordinates.
    pub fn lower(&self) -> Point2<S> {
        self.lower
    }

    /// Returns the upper corner of the bounding rectangle.
    ///
    /// The upper corner has the larger coordinates.
    pub fn upper(&self) -> Point2<S> {
        self.upper
    }

    /// Checks if a point is contained within the bounding rectangle.
    ///
    /// A point lying exactly on the bounding rectangle's border is also contained.
    #[inline]
    pub fn contains_point(&self, point: Point2<S>) -> bool {
        self.lower.all_component_wise(point, |l, r| l <= r)
            && self.upper.all_component_wise(point, |l, r| l >= r)
    }

    /// Enlarges this bounding rectangle to contain a point.
    ///
    /// If the point is already contained, nothing will be changed.
    /// Otherwise, this will enlarge `self` to be just large enough
    /// to contain the new point.
    #[inline]
    pub fn add_point(&mut self, point: Point2<S>) {
        let min = |a: S, b: S| if a < b { a } else { b };
        let max = |a: S, b: S| if a > b { a } else { b };
        self.lower = Point2::new(min(self.lower.x, point.x), min(self.lower.y, point.y));
        self.upper = Point2::new(max(self.upper.x, point.x), max(self.upper.y, point.y));
    }

    /// Returns the rectangle's center.
    pub fn center(&self) -> Point2<S> {
        let one = S::one();
        let half = one / (one + one);
        self.lower.add(self.upper.sub(self.lower).mul(half))
    }
}

impl<S: DwyerNum + Float> BoundingRect<S> {
    /// Returns the point where a ray starting at `origin` leaves this rectangle,
    /// along with the side it passes through.
    ///
    /// The origin does not need to lie inside the rectangle. Returns `None` if
    /// the ray misses the rectangle entirely or only points away from it.
    pub(crate) fn ray_exit(
        &self,
        origin: Point2<S>,
        direction: Point2<S>,
    ) -> Option<(Point2<S>, RectSide)> {
        let mut t_enter = S::zero();
        let mut t_exit = S::infinity();
        let mut exit_side = None;

        for axis in 0..2 {
            let (o, d, lower, upper) = if axis == 0 {
                (origin.x, direction.x, self.lower.x, self.upper.x)
            } else {
                (origin.y, direction.y, self.lower.y, self.upper.y)
            };

            if d == S::zero() {
                if o < lower || o > upper {
                    return None;
                }
                continue;
            }

            let t0 = (lower - o) / d;
            let t1 = (upper - o) / d;
            let (t_min, t_max) = if t0 < t1 { (t0, t1) } else { (t1, t0) };
            if t_min > t_enter {
                t_enter = t_min;
            }
            if t_max < t_exit {
                t_exit = t_max;
                exit_side = Some(match (axis, d > S::zero()) {
                    (0, true) => RectSide::Right,
                    (0, false) => RectSide::Left,
                    (1, true) => RectSide::Top,
                    (1, false) => RectSide::Bottom,
                    _ => unreachable!(),
                });
            }
        }

        let exit_side = exit_side?;
        if t_exit < t_enter || t_exit < S::zero() {
            return None;
        }

        let mut exit = origin.add(direction.mul(t_exit));
        // Snap the bounded coordinate so later side classification stays exact.
        match exit_side {
            RectSide::Bottom => exit.y = self.lower.y,
            RectSide::Right => exit.x = self.upper.x,
            RectSide::Top => exit.y = self.upper.y,
            RectSide::Left => exit.x = self.lower.x,
        }
        Some((exit, exit_side))
    }

    /// Returns the corner at the counterclockwise end of the given side.
    fn ccw_corner(&self, side: RectSide) -> Point2<S> {
        match side {
            RectSide::Bottom => Point2::new(self.upper.x, self.lower.y),
            RectSide::Right => Point2::new(self.upper.x, self.upper.y),
            RectSide::Top => Point2::new(self.lower.x, self.upper.y),
            RectSide::Left => Point2::new(self.lower.x, self.lower.y),
        }
    }

    /// Measures progress along a side in counterclockwise direction.
    fn side_progress(&self, side: RectSide, point: Point2<S>) -> S {
        match side {
            RectSide::Bottom => point.x,
            RectSide::Right => point.y,
            RectSide::Top => -point.x,
            RectSide::Left => -point.y,
        }
    }

    /// Returns the rectangle corners passed when walking counterclockwise along
    /// the boundary from `from` to `to`.
    ///
    /// Both points must lie on the given sides of the boundary.
    pub(crate) fn corners_between_ccw(
        &self,
        from: Point2<S>,
        from_side: RectSide,
        to: Point2<S>,
        to_side: RectSide,
    ) -> SmallVec<[Point2<S>; 4]> {
        let mut result = SmallVec::new();
        if from_side == to_side
            && self.side_progress(to_side, to) >= self.side_progress(from_side, from)
        {
            return result;
        }

        let mut side = from_side;
        loop {
            result.push(self.ccw_corner(side));
            side = side.next_ccw();
            if side == to_side {
                break;
            }
        }
        result
    }
}
