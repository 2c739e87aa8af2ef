//! Hot pixels: the square of influence around one rounded grid vertex.
//!
//! Every distinct rounded vertex (and every rounded intersection point)
//! owns one hot pixel. Any segment passing through the pixel is snapped
//! to its center, which is what turns "nearly touching after rounding"
//! into an explicit shared vertex.
//!
//! All tests run in scaled grid space, where pixel centers are integers
//! and the four corners sit exactly at `center ± 0.5`. That keeps the
//! corner coordinates exact, so the orientation predicates below see the
//! same corners every time.
//!
//! The pixel is **half-open**: the left and bottom edges belong to it,
//! the top and right edges belong to the neighbouring pixels. That is the
//! same side [`round_half_up`] sends a tied ordinate to, so a point always
//! lies in exactly the pixel it rounds to, and pixels never overlap.

use geo::algorithm::line_intersection::line_intersection;
use geo::kernels::{Kernel, Orientation, RobustKernel};
use geo::{Coord, Line, Rect};

use crate::precision::round_half_up;

/// Half the pixel width in scaled grid units.
const TOLERANCE: f64 = 0.5;

/// Index of each corner in [`HotPixel::scaled_corners`].
const UPPER_RIGHT: usize = 0;
const UPPER_LEFT: usize = 1;
const LOWER_LEFT: usize = 2;
const LOWER_RIGHT: usize = 3;

/// The half-open unit grid cell centred on a rounded coordinate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HotPixel {
    /// Center in model coordinates (already on the grid).
    center: Coord<f64>,
    /// Grid cells per unit.
    scale: f64,
    /// Center in scaled grid coordinates (integral values).
    hpx: f64,
    hpy: f64,
    /// Whether this pixel is a node: a point where segments must be split.
    is_node: bool,
}

impl HotPixel {
    /// Create the pixel around `center`, which must already be rounded
    /// to the grid defined by `scale`.
    #[must_use]
    pub fn new(center: Coord<f64>, scale: f64) -> Self {
        let (hpx, hpy) = if (scale - 1.0).abs() < f64::EPSILON {
            (center.x, center.y)
        } else {
            (
                round_half_up(center.x * scale),
                round_half_up(center.y * scale),
            )
        };
        Self {
            center,
            scale,
            hpx,
            hpy,
            is_node: false,
        }
    }

    /// The rounded coordinate this pixel is centred on.
    #[must_use]
    pub const fn coordinate(&self) -> Coord<f64> {
        self.center
    }

    /// Grid cells per unit.
    #[must_use]
    pub const fn scale(&self) -> f64 {
        self.scale
    }

    /// Pixel width in model units.
    #[must_use]
    pub fn width(&self) -> f64 {
        1.0 / self.scale
    }

    /// Returns `true` if segments passing through this pixel must be
    /// split at its center.
    #[must_use]
    pub const fn is_node(&self) -> bool {
        self.is_node
    }

    /// Mark this pixel as a node.
    pub const fn set_to_node(&mut self) {
        self.is_node = true;
    }

    /// The pixel square in model coordinates.
    #[must_use]
    pub fn bounds(&self) -> Rect<f64> {
        let hw = TOLERANCE / self.scale;
        Rect::new(
            Coord {
                x: self.center.x - hw,
                y: self.center.y - hw,
            },
            Coord {
                x: self.center.x + hw,
                y: self.center.y + hw,
            },
        )
    }

    fn scale_ordinate(&self, value: f64) -> f64 {
        if (self.scale - 1.0).abs() < f64::EPSILON {
            value
        } else {
            value * self.scale
        }
    }

    fn to_scaled(&self, p: Coord<f64>) -> Coord<f64> {
        Coord {
            x: self.scale_ordinate(p.x),
            y: self.scale_ordinate(p.y),
        }
    }

    /// Corners in scaled space, indexed by the `UPPER_RIGHT` ..
    /// `LOWER_RIGHT` constants (counter-clockwise from upper right).
    fn scaled_corners(&self) -> [Coord<f64>; 4] {
        let minx = self.hpx - TOLERANCE;
        let maxx = self.hpx + TOLERANCE;
        let miny = self.hpy - TOLERANCE;
        let maxy = self.hpy + TOLERANCE;
        let mut corners = [Coord { x: 0.0, y: 0.0 }; 4];
        corners[UPPER_RIGHT] = Coord { x: maxx, y: maxy };
        corners[UPPER_LEFT] = Coord { x: minx, y: maxy };
        corners[LOWER_LEFT] = Coord { x: minx, y: miny };
        corners[LOWER_RIGHT] = Coord { x: maxx, y: miny };
        corners
    }

    /// Returns `true` if `p` lies in the pixel. The top and right edges
    /// are excluded.
    #[must_use]
    pub fn intersects_point(&self, p: Coord<f64>) -> bool {
        let s = self.to_scaled(p);
        s.x >= self.hpx - TOLERANCE
            && s.x < self.hpx + TOLERANCE
            && s.y >= self.hpy - TOLERANCE
            && s.y < self.hpy + TOLERANCE
    }

    /// Returns `true` if the segment `p0`-`p1` intersects the pixel.
    ///
    /// The segment hits the pixel if it passes through the interior, runs
    /// along the left or bottom edge, touches the lower-left corner, or
    /// crosses either diagonal. Touching only the top or right edge, or
    /// a corner on them, is a miss.
    #[must_use]
    pub fn intersects(&self, p0: Coord<f64>, p1: Coord<f64>) -> bool {
        let hit = self.intersects_scaled(self.to_scaled(p0), self.to_scaled(p1));
        debug_assert!(
            !hit
                || self.intersects_point(p0)
                || self.intersects_point(p1)
                || self.intersects_pixel_closure(p0, p1),
            "segment hits the pixel without reaching its closure"
        );
        hit
    }

    fn intersects_scaled(&self, p0: Coord<f64>, p1: Coord<f64>) -> bool {
        // Orient the segment so p is left-most.
        let (p, q) = if p0.x > p1.x { (p1, p0) } else { (p0, p1) };

        let minx = self.hpx - TOLERANCE;
        let maxx = self.hpx + TOLERANCE;
        let miny = self.hpy - TOLERANCE;
        let maxy = self.hpy + TOLERANCE;

        // Envelope rejection. The top and right edges are outside.
        if p.x >= maxx || q.x < minx {
            return false;
        }
        if p.y.min(q.y) >= maxy || p.y.max(q.y) < miny {
            return false;
        }

        // An axis-parallel segment (or a point) that overlaps the
        // envelope must hit the pixel.
        if p.x == q.x || p.y == q.y {
            return true;
        }

        let corners = self.scaled_corners();
        let orient = corners.map(|corner| RobustKernel::orient2d(p, q, corner));
        let rising = p.y < q.y;

        // Through the upper-left corner: a rising segment only grazes it
        // and stays on the top edge's side.
        if orient[UPPER_LEFT] == Orientation::Collinear {
            return !rising;
        }
        // Through the upper-right corner: a falling segment only grazes it.
        if orient[UPPER_RIGHT] == Orientation::Collinear {
            return rising;
        }
        // Top side crossed.
        if orient[UPPER_LEFT] != orient[UPPER_RIGHT] {
            return true;
        }
        // The lower-left corner is inside.
        if orient[LOWER_LEFT] == Orientation::Collinear {
            return true;
        }
        // Left side crossed.
        if orient[LOWER_LEFT] != orient[UPPER_LEFT] {
            return true;
        }
        // Through the lower-right corner, which sits on the right edge.
        if orient[LOWER_RIGHT] == Orientation::Collinear {
            return !rising;
        }
        // Bottom side crossed.
        if orient[LOWER_LEFT] != orient[LOWER_RIGHT] {
            return true;
        }
        // Right side crossed.
        if orient[LOWER_RIGHT] != orient[UPPER_RIGHT] {
            return true;
        }

        // All four corners are strictly on one side.
        false
    }

    /// Test against the **closed** pixel by explicit intersection with
    /// each side, including the top and right edges.
    ///
    /// A segment lying strictly inside the pixel touches no side, so this
    /// is combined with [`intersects_point`](Self::intersects_point).
    /// Every hit of [`intersects`](Self::intersects) is also a hit here;
    /// debug builds check that on every call.
    #[must_use]
    pub fn intersects_pixel_closure(&self, p0: Coord<f64>, p1: Coord<f64>) -> bool {
        let segment = Line::new(self.to_scaled(p0), self.to_scaled(p1));
        let corners = self.scaled_corners();
        (0..4).any(|i| {
            let side = Line::new(corners[i], corners[(i + 1) % 4]);
            line_intersection(segment, side).is_some()
        })
    }
}
