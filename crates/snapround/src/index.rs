//! Spatial indexes used during one noding run.
//!
//! Both indexes are R*-trees from `rstar`. Queries are envelope based and
//! may return false positives; every caller re-tests candidates exactly.
//!
//! - [`HotPixelIndex`] owns the hot pixels of a run, keyed by their exact
//!   rounded coordinate, and answers "which pixels could this segment
//!   pass through?".
//! - [`SegmentTree`] indexes every segment of a set of polylines and
//!   answers "which segments could touch this one?".

use std::collections::HashMap;

use geo::{Coord, Line, Point};
use rstar::primitives::GeomWithData;
use rstar::{AABB, RTree};

use crate::hot_pixel::HotPixel;
use crate::precision::PrecisionModel;

// ---------------------------------------------------------------------------
// Coordinate keys
// ---------------------------------------------------------------------------

/// Hashable exact-equality key for a coordinate.
///
/// `-0.0` and `0.0` compare equal as floats, so both map to the same key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CoordKey {
    x_bits: u64,
    y_bits: u64,
}

impl CoordKey {
    fn from_coord(c: Coord<f64>) -> Self {
        Self {
            x_bits: (c.x + 0.0).to_bits(),
            y_bits: (c.y + 0.0).to_bits(),
        }
    }
}

// ---------------------------------------------------------------------------
// Hot pixel index
// ---------------------------------------------------------------------------

type IndexedPixel = GeomWithData<[f64; 2], usize>;

/// All hot pixels of one noding run.
#[derive(Debug)]
pub struct HotPixelIndex {
    precision: PrecisionModel,
    pixels: Vec<HotPixel>,
    lookup: HashMap<CoordKey, usize>,
    tree: RTree<IndexedPixel>,
}

impl HotPixelIndex {
    /// Create an empty index for the given grid.
    #[must_use]
    pub fn new(precision: PrecisionModel) -> Self {
        Self {
            precision,
            pixels: Vec::new(),
            lookup: HashMap::new(),
            tree: RTree::new(),
        }
    }

    /// Number of distinct pixels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    /// Returns `true` if no pixel has been added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    /// Number of pixels currently marked as nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.pixels.iter().filter(|hp| hp.is_node()).count()
    }

    /// Iterate over all pixels in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &HotPixel> {
        self.pixels.iter()
    }

    /// Round `p` and add a pixel for it.
    ///
    /// If the rounded coordinate already has a pixel, a second vertex has
    /// landed in it, so the existing pixel becomes a node.
    pub fn add(&mut self, p: Coord<f64>) -> &mut HotPixel {
        let center = self.precision.round(p);
        let key = CoordKey::from_coord(center);
        let idx = if let Some(&idx) = self.lookup.get(&key) {
            self.pixels[idx].set_to_node();
            idx
        } else {
            let idx = self.pixels.len();
            self.pixels
                .push(HotPixel::new(center, self.precision.scale()));
            self.lookup.insert(key, idx);
            self.tree
                .insert(GeomWithData::new([center.x, center.y], idx));
            idx
        };
        &mut self.pixels[idx]
    }

    /// Add a pixel for every point.
    pub fn add_points(&mut self, points: &[Coord<f64>]) {
        for &p in points {
            self.add(p);
        }
    }

    /// Add a pixel for every point and mark each as a node.
    pub fn add_nodes(&mut self, points: &[Coord<f64>]) {
        for &p in points {
            self.add(p).set_to_node();
        }
    }

    /// Exact lookup of the pixel centred on an already rounded coordinate.
    #[must_use]
    pub fn find(&self, rounded: Coord<f64>) -> Option<&HotPixel> {
        self.lookup
            .get(&CoordKey::from_coord(rounded))
            .map(|&idx| &self.pixels[idx])
    }

    /// Visit every pixel whose center lies in the envelope of `p0`-`p1`
    /// expanded by one grid cell.
    ///
    /// The expansion covers pixels whose square reaches the segment while
    /// their center lies outside its envelope.
    pub fn query<F>(&mut self, p0: Coord<f64>, p1: Coord<f64>, mut visit: F)
    where
        F: FnMut(&mut HotPixel),
    {
        let margin = self.precision.grid_size();
        let envelope = AABB::from_corners(
            [p0.x.min(p1.x) - margin, p0.y.min(p1.y) - margin],
            [p0.x.max(p1.x) + margin, p0.y.max(p1.y) + margin],
        );
        for entry in self.tree.locate_in_envelope(&envelope) {
            visit(&mut self.pixels[entry.data]);
        }
    }
}

// ---------------------------------------------------------------------------
// Segment tree
// ---------------------------------------------------------------------------

/// Identifies segment `segment` (from vertex `segment` to `segment + 1`)
/// of polyline `string`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SegmentId {
    /// Index of the polyline.
    pub string: usize,
    /// Index of the segment's first vertex.
    pub segment: usize,
}

type IndexedSegment = GeomWithData<Line<f64>, SegmentId>;

/// R*-tree over every segment of a set of polylines.
#[derive(Debug)]
pub struct SegmentTree<'a> {
    strings: Vec<&'a [Coord<f64>]>,
    tree: RTree<IndexedSegment>,
}

impl<'a> SegmentTree<'a> {
    /// Index every segment of every polyline.
    pub fn new<I>(strings: I) -> Self
    where
        I: IntoIterator<Item = &'a [Coord<f64>]>,
    {
        let strings: Vec<&'a [Coord<f64>]> = strings.into_iter().collect();
        let segments: Vec<IndexedSegment> = strings
            .iter()
            .enumerate()
            .flat_map(|(si, pts)| {
                pts.windows(2).enumerate().map(move |(i, w)| {
                    GeomWithData::new(
                        Line::new(w[0], w[1]),
                        SegmentId {
                            string: si,
                            segment: i,
                        },
                    )
                })
            })
            .collect();
        Self {
            strings,
            tree: RTree::bulk_load(segments),
        }
    }

    /// Total number of indexed segments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    /// Returns `true` if no segment was indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// The geometry of one indexed segment.
    #[must_use]
    pub fn segment(&self, id: SegmentId) -> Line<f64> {
        let pts = self.strings[id.string];
        Line::new(pts[id.segment], pts[id.segment + 1])
    }

    /// The vertices of one indexed polyline.
    #[must_use]
    pub fn string(&self, string: usize) -> &'a [Coord<f64>] {
        self.strings[string]
    }

    /// Every segment whose envelope overlaps the envelope of `id`
    /// expanded by `tolerance`. Includes `id` itself.
    pub fn candidates(&self, id: SegmentId, tolerance: f64) -> impl Iterator<Item = SegmentId> + '_ {
        let line = self.segment(id);
        let envelope = AABB::from_corners(
            Point::new(
                line.start.x.min(line.end.x) - tolerance,
                line.start.y.min(line.end.y) - tolerance,
            ),
            Point::new(
                line.start.x.max(line.end.x) + tolerance,
                line.start.y.max(line.end.y) + tolerance,
            ),
        );
        self.tree
            .locate_in_envelope_intersecting(&envelope)
            .map(|entry| entry.data)
    }

    /// Every unordered pair of distinct segments whose envelopes overlap
    /// within `tolerance`, each reported once as `(a, b)` with `a < b`.
    pub fn overlapping_pairs(&self, tolerance: f64) -> Vec<(SegmentId, SegmentId)> {
        let mut pairs = Vec::new();
        for entry in self.tree.iter() {
            let a = entry.data;
            for b in self.candidates(a, tolerance) {
                if a < b {
                    pairs.push((a, b));
                }
            }
        }
        pairs.sort_unstable();
        pairs
    }
}
