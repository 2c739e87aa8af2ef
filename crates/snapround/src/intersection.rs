//! Exact intersections between input segments, found before snapping.
//!
//! Hot pixels built from input vertices alone miss crossings in the
//! middle of two segments. This pass intersects every pair of nearby
//! segments with `geo`'s robust intersection routine and reports each
//! point that must become a node:
//!
//! - every intersection point interior to at least one of the two
//!   segments, and
//! - every segment endpoint lying within `nearness` of another segment
//!   without being near that segment's endpoints. After rounding such a
//!   vertex would land on the other segment without a node there.

use geo::algorithm::line_intersection::{LineIntersection, line_intersection};
use geo::line_measures::Distance;
use geo::{Coord, Euclidean, Line, Point};

use crate::index::{SegmentId, SegmentTree};

/// Near-vertex tolerance as a fraction of the grid size.
pub const NEARNESS_FACTOR: f64 = 100.0;

/// Collects intersection points between segments of a set of polylines.
#[derive(Debug, Clone)]
pub struct IntersectionAdder {
    nearness: f64,
    intersections: Vec<Coord<f64>>,
    interior_count: usize,
    near_vertex_count: usize,
}

impl IntersectionAdder {
    /// `nearness` is the distance within which a vertex counts as lying on
    /// another segment.
    #[must_use]
    pub const fn new(nearness: f64) -> Self {
        Self {
            nearness,
            intersections: Vec::new(),
            interior_count: 0,
            near_vertex_count: 0,
        }
    }

    /// Adder for a grid of the given cell size.
    #[must_use]
    pub fn for_grid_size(grid_size: f64) -> Self {
        Self::new(grid_size / NEARNESS_FACTOR)
    }

    /// Distance within which a vertex counts as lying on a segment.
    #[must_use]
    pub const fn nearness(&self) -> f64 {
        self.nearness
    }

    /// Points found so far. May contain repeats; the pixel index
    /// deduplicates them after rounding.
    #[must_use]
    pub fn intersections(&self) -> &[Coord<f64>] {
        &self.intersections
    }

    /// Take the points found.
    #[must_use]
    pub fn into_intersections(self) -> Vec<Coord<f64>> {
        self.intersections
    }

    /// Number of interior intersection points found.
    #[must_use]
    pub const fn interior_count(&self) -> usize {
        self.interior_count
    }

    /// Number of near-vertex points found.
    #[must_use]
    pub const fn near_vertex_count(&self) -> usize {
        self.near_vertex_count
    }

    /// Test every pair of segments in `tree` whose envelopes lie within
    /// `nearness` of each other. Returns the number of pairs tested.
    pub fn process_all(&mut self, tree: &SegmentTree<'_>) -> usize {
        let pairs = tree.overlapping_pairs(self.nearness);
        for &(a, b) in &pairs {
            self.process_pair(tree, a, b);
        }
        pairs.len()
    }

    fn process_pair(&mut self, tree: &SegmentTree<'_>, a: SegmentId, b: SegmentId) {
        if a == b {
            return;
        }
        let seg0 = tree.segment(a);
        let seg1 = tree.segment(b);
        self.process_segments(seg0, seg1);
    }

    /// Record the node points produced by one pair of segments.
    pub fn process_segments(&mut self, seg0: Line<f64>, seg1: Line<f64>) {
        let points = intersection_points(seg0, seg1);
        if points
            .iter()
            .any(|&p| is_interior_to(p, seg0) || is_interior_to(p, seg1))
        {
            self.interior_count += points.len();
            self.intersections.extend(points);
            return;
        }

        // No interior crossing: check each endpoint against the other
        // segment.
        self.process_near_vertex(seg0.start, seg1);
        self.process_near_vertex(seg0.end, seg1);
        self.process_near_vertex(seg1.start, seg0);
        self.process_near_vertex(seg1.end, seg0);
    }

    fn process_near_vertex(&mut self, p: Coord<f64>, seg: Line<f64>) {
        let pt = Point::from(p);
        if Euclidean.distance(&pt, &Point::from(seg.start)) < self.nearness {
            return;
        }
        if Euclidean.distance(&pt, &Point::from(seg.end)) < self.nearness {
            return;
        }
        if Euclidean.distance(&pt, &seg) < self.nearness {
            self.near_vertex_count += 1;
            self.intersections.push(p);
        }
    }
}

/// The one or two points where two segments meet (none if disjoint).
fn intersection_points(seg0: Line<f64>, seg1: Line<f64>) -> Vec<Coord<f64>> {
    match line_intersection(seg0, seg1) {
        None => Vec::new(),
        Some(LineIntersection::SinglePoint { intersection, .. }) => vec![intersection],
        Some(LineIntersection::Collinear { intersection }) => {
            if intersection.start == intersection.end {
                vec![intersection.start]
            } else {
                vec![intersection.start, intersection.end]
            }
        }
    }
}

fn is_interior_to(p: Coord<f64>, seg: Line<f64>) -> bool {
    p != seg.start && p != seg.end
}

/// Find every node point between the segments of `strings`.
#[must_use]
pub fn find_intersections(strings: &[&[Coord<f64>]], grid_size: f64) -> IntersectionAdder {
    let tree = SegmentTree::new(strings.iter().copied());
    let mut adder = IntersectionAdder::for_grid_size(grid_size);
    adder.process_all(&tree);
    adder
}
