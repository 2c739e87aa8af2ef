//! Snap-rounding noder.
//!
//! Rounds every vertex to the grid and nodes the input so that the result
//! stays fully noded after rounding:
//!
//! 1. Exact intersections (and near vertices) between input segments
//!    become node pixels.
//! 2. Every rounded input vertex gets a hot pixel. A pixel reached by two
//!    vertices is a node.
//! 3. Each original segment is tested against every pixel near it. A
//!    pixel it passes through is inserted into the rounded string and
//!    becomes a node.
//! 4. Vertices of the rounded strings whose pixel is a node become split
//!    points too.
//! 5. Each rounded string is split at its nodes.
//! 6. The fragments are checked against the pixels once more. Rounding
//!    moves a segment, so a fragment can pass through a pixel that its
//!    original segment missed. Such pixels are inserted and the strings
//!    split again, until no fragment passes through a pixel other than
//!    its own end pixels. Noding the output a second time then changes
//!    nothing.
//!
//! The base noder is total: given finite input it always produces output,
//! though extremely close near-misses can still leave a crossing. Wrap it
//! in a [`ValidatingNoder`](crate::ValidatingNoder) to turn that into an
//! error.

use geo::Coord;

use crate::diagnostics::{
    Clock, NoClock, NodingDiagnostics, NodingSummary, StageDiagnostics, StageMetrics,
};
use crate::index::{HotPixelIndex, SegmentTree};
use crate::intersection::IntersectionAdder;
use crate::noder::Noder;
use crate::precision::PrecisionModel;
use crate::segment_string::{NodedSegmentString, SegmentString, noded_substrings};
use crate::types::NodingError;

/// Nodes polylines by snap-rounding them to a fixed grid.
#[derive(Debug, Clone)]
pub struct SnapRoundingNoder<D> {
    precision: PrecisionModel,
    fragments: Vec<SegmentString<D>>,
}

/// Counters for the segment snapping phase.
#[derive(Debug, Default)]
struct SnapCounts {
    segments: usize,
    candidates: usize,
    snaps: usize,
}

/// Counters for the re-snapping phase.
#[derive(Debug, Default)]
struct ResnapCounts {
    rounds: usize,
    snaps: usize,
}

impl<D: Clone> SnapRoundingNoder<D> {
    /// Noder for the grid of `precision`, with no result yet.
    #[must_use]
    pub const fn new(precision: PrecisionModel) -> Self {
        Self {
            precision,
            fragments: Vec::new(),
        }
    }

    /// Noder for a grid with `scale` cells per unit.
    ///
    /// # Errors
    ///
    /// Returns [`NodingError::InvalidScale`] if `scale` is not finite and
    /// strictly positive.
    pub fn with_scale(scale: f64) -> Result<Self, NodingError> {
        PrecisionModel::new(scale).map(Self::new)
    }

    /// The grid every output vertex lies on.
    #[must_use]
    pub const fn precision(&self) -> &PrecisionModel {
        &self.precision
    }

    /// Like [`compute_nodes`](Noder::compute_nodes), also timing each phase
    /// with `clock` and returning the collected diagnostics.
    ///
    /// # Errors
    ///
    /// Returns [`NodingError::NonFiniteCoordinate`] if any input coordinate
    /// is NaN or infinite. No work is done in that case and the previous
    /// result is cleared.
    pub fn compute_nodes_with_diagnostics<C: Clock>(
        &mut self,
        segments: &[SegmentString<D>],
        clock: &C,
    ) -> Result<NodingDiagnostics, NodingError> {
        self.fragments.clear();
        check_finite(segments)?;

        let total_start = clock.now();
        let pm = self.precision;
        let mut pixels = HotPixelIndex::new(pm);

        // 1. Intersections between input segments.
        let start = clock.now();
        let tree = SegmentTree::new(segments.iter().map(SegmentString::coords));
        let mut adder = IntersectionAdder::for_grid_size(pm.grid_size());
        let pair_count = adder.process_all(&tree);
        pixels.add_nodes(adder.intersections());
        let intersections = StageDiagnostics {
            duration: clock.elapsed(&start),
            metrics: StageMetrics::Intersections {
                segment_count: tree.len(),
                pair_count,
                interior_count: adder.interior_count(),
                near_vertex_count: adder.near_vertex_count(),
                nearness: adder.nearness(),
            },
        };
        tracing::debug!(
            "intersection pass: {} pairs, {} interior points, {} near vertices",
            pair_count,
            adder.interior_count(),
            adder.near_vertex_count()
        );

        // 2. Hot pixels for every input vertex.
        let start = clock.now();
        let mut vertex_count = 0;
        for s in segments {
            pixels.add_points(s.coords());
            vertex_count += s.len();
        }
        let vertex_pixels = StageDiagnostics {
            duration: clock.elapsed(&start),
            metrics: StageMetrics::VertexPixels {
                vertex_count,
                pixel_count: pixels.len(),
                node_pixel_count: pixels.node_count(),
            },
        };
        tracing::debug!(
            "{} hot pixels ({} nodes) from {} vertices",
            pixels.len(),
            pixels.node_count(),
            vertex_count
        );

        // 3. Snap every segment to the pixels it passes through.
        let start = clock.now();
        let mut counts = SnapCounts::default();
        let mut snapped: Vec<NodedSegmentString<D>> = segments
            .iter()
            .filter_map(|s| snap_string(&pm, s, &mut pixels, &mut counts))
            .collect();
        let collapsed_count = segments.len() - snapped.len();
        let segment_snapping = StageDiagnostics {
            duration: clock.elapsed(&start),
            metrics: StageMetrics::SegmentSnapping {
                segment_count: counts.segments,
                candidate_count: counts.candidates,
                snap_count: counts.snaps,
            },
        };

        // 4. Split at vertices whose pixel became a node.
        let start = clock.now();
        let mut rounded_vertex_count = 0;
        let mut vertex_node_count = 0;
        for ss in &mut snapped {
            rounded_vertex_count += ss.coords().len();
            vertex_node_count += snap_vertices(ss, &pixels);
        }
        let vertex_snapping = StageDiagnostics {
            duration: clock.elapsed(&start),
            metrics: StageMetrics::VertexSnapping {
                vertex_count: rounded_vertex_count,
                node_count: vertex_node_count,
            },
        };

        // 5. Split into fragments.
        let start = clock.now();
        let fragments = noded_substrings(&snapped);
        let point_count = fragments.iter().map(SegmentString::len).sum();
        let splitting = StageDiagnostics {
            duration: clock.elapsed(&start),
            metrics: StageMetrics::Splitting {
                string_count: snapped.len(),
                collapsed_count,
                fragment_count: fragments.len(),
                point_count,
            },
        };
        tracing::debug!(
            "snap-rounded {} strings into {} fragments ({} collapsed)",
            snapped.len(),
            fragments.len(),
            collapsed_count
        );

        // 6. Snap the rounded fragments until they are stable.
        let start = clock.now();
        let mut resnap = ResnapCounts::default();
        self.fragments = resnap_fragments(fragments, &mut pixels, &mut resnap);
        let resnapping = StageDiagnostics {
            duration: clock.elapsed(&start),
            metrics: StageMetrics::Resnapping {
                round_count: resnap.rounds,
                snap_count: resnap.snaps,
                fragment_count: self.fragments.len(),
            },
        };
        if resnap.snaps > 0 {
            tracing::debug!(
                "re-snapping inserted {} pixels over {} rounds, {} fragments",
                resnap.snaps,
                resnap.rounds,
                self.fragments.len()
            );
        }

        Ok(NodingDiagnostics {
            intersections,
            vertex_pixels,
            segment_snapping,
            vertex_snapping,
            splitting,
            resnapping,
            validation: None,
            total_duration: clock.elapsed(&total_start),
            summary: NodingSummary {
                scale: pm.scale(),
                input_string_count: segments.len(),
                input_vertex_count: vertex_count,
                hot_pixel_count: pixels.len(),
                node_count: pixels.node_count(),
                fragment_count: self.fragments.len(),
            },
        })
    }
}

impl<D: Clone> Noder<D> for SnapRoundingNoder<D> {
    fn compute_nodes(&mut self, segments: &[SegmentString<D>]) -> Result<(), NodingError> {
        self.compute_nodes_with_diagnostics(segments, &NoClock)
            .map(|_| ())
    }

    fn noded_substrings(&self) -> Vec<SegmentString<D>> {
        self.fragments.clone()
    }
}

fn check_finite<D>(segments: &[SegmentString<D>]) -> Result<(), NodingError> {
    for (string_index, s) in segments.iter().enumerate() {
        if let Some(vertex_index) = s
            .coords()
            .iter()
            .position(|c| !c.x.is_finite() || !c.y.is_finite())
        {
            return Err(NodingError::NonFiniteCoordinate {
                string_index,
                vertex_index,
            });
        }
    }
    Ok(())
}

/// Round one input string and insert every pixel its original segments
/// pass through. Returns `None` if the string collapses to a point.
fn snap_string<D: Clone>(
    pm: &PrecisionModel,
    s: &SegmentString<D>,
    pixels: &mut HotPixelIndex,
    counts: &mut SnapCounts,
) -> Option<NodedSegmentString<D>> {
    let pts = s.coords();
    let pts_round = pm.round_points(pts);
    if pts_round.len() <= 1 {
        return None;
    }

    let mut snap = NodedSegmentString::new(pts_round, s.data().clone());
    let mut snap_index = 0;
    for w in pts.windows(2) {
        let (p0, p1) = (w[0], w[1]);
        // Original segments that round to nothing add no rounded segment.
        if pm.round(p1) == snap.coords()[snap_index] {
            continue;
        }
        snap_segment(p0, p1, &mut snap, snap_index, pixels, counts);
        snap_index += 1;
    }
    Some(snap)
}

/// Insert into segment `segment_index` of `snap` every pixel that the
/// original segment `p0`-`p1` passes through.
fn snap_segment<D>(
    p0: Coord<f64>,
    p1: Coord<f64>,
    snap: &mut NodedSegmentString<D>,
    segment_index: usize,
    pixels: &mut HotPixelIndex,
    counts: &mut SnapCounts,
) {
    counts.segments += 1;
    pixels.query(p0, p1, |hp| {
        counts.candidates += 1;
        // A pixel holding one of the segment's own endpoints is already a
        // vertex of the rounded segment, unless other lines meet there.
        if !hp.is_node() && (hp.intersects_point(p0) || hp.intersects_point(p1)) {
            return;
        }
        if hp.intersects(p0, p1) {
            snap.add_intersection(hp.coordinate(), segment_index);
            hp.set_to_node();
            counts.snaps += 1;
        }
    });
}

/// Insert into the rounded fragments every pixel they pass through other
/// than the pixels of their own segment endpoints, then split again.
/// Repeats until a pass finds nothing to insert.
///
/// Each inserted pixel center lies strictly between the endpoints of the
/// segment it splits, so no pass turns a fragment back on itself.
fn resnap_fragments<D: Clone>(
    mut fragments: Vec<SegmentString<D>>,
    pixels: &mut HotPixelIndex,
    counts: &mut ResnapCounts,
) -> Vec<SegmentString<D>> {
    loop {
        counts.rounds += 1;
        let mut hits: Vec<(usize, usize, Coord<f64>)> = Vec::new();
        for (string_index, fragment) in fragments.iter().enumerate() {
            for (segment_index, w) in fragment.coords().windows(2).enumerate() {
                let (a, b) = (w[0], w[1]);
                pixels.query(a, b, |hp| {
                    let center = hp.coordinate();
                    if center != a && center != b && hp.intersects(a, b) {
                        hp.set_to_node();
                        hits.push((string_index, segment_index, center));
                    }
                });
            }
        }
        if hits.is_empty() {
            return fragments;
        }
        counts.snaps += hits.len();

        let mut noded: Vec<NodedSegmentString<D>> = fragments
            .into_iter()
            .map(|f| {
                let (coords, data) = f.into_parts();
                NodedSegmentString::new(coords, data)
            })
            .collect();
        for (string_index, segment_index, center) in hits {
            noded[string_index].add_intersection(center, segment_index);
        }
        for ss in &mut noded {
            snap_vertices(ss, pixels);
        }
        fragments = noded_substrings(&noded);
    }
}

/// Add a split point at every vertex whose pixel is a node. Returns the
/// number of such vertices.
fn snap_vertices<D>(ss: &mut NodedSegmentString<D>, pixels: &HotPixelIndex) -> usize {
    let nodes: Vec<(usize, Coord<f64>)> = ss
        .coords()
        .iter()
        .enumerate()
        .filter(|&(_, &p)| pixels.find(p).is_some_and(|hp| hp.is_node()))
        .map(|(i, &p)| (i, p))
        .collect();
    for &(i, p) in &nodes {
        ss.add_intersection(p, i);
    }
    nodes.len()
}
