//! Per-string ordered sets of split points.
//!
//! A [`SegmentNodeList`] records every coordinate at which a polyline must
//! be split, keyed by the segment it falls on and its position along that
//! segment. [`SegmentNodeList::split_edges`] then cuts the polyline into
//! fragments between consecutive nodes.

use std::cmp::Ordering;

use geo::Coord;

use crate::segment_string::SegmentString;

/// A split point on one segment of a polyline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentNode {
    /// Where the polyline is split.
    pub coordinate: Coord<f64>,
    /// Index of the segment containing the node. A node lying on a vertex
    /// belongs to the segment starting at that vertex.
    pub segment_index: usize,
    /// `false` when the node coincides with the segment's start vertex.
    is_interior: bool,
    /// Projection parameter along the segment, used for ordering.
    param: f64,
}

impl SegmentNode {
    fn new(coordinate: Coord<f64>, segment_index: usize, pts: &[Coord<f64>]) -> Self {
        let start = pts[segment_index];
        let param = pts
            .get(segment_index + 1)
            .map_or(0.0, |&end| projection_param(start, end, coordinate));
        Self {
            coordinate,
            segment_index,
            is_interior: coordinate != start,
            param,
        }
    }

    /// Returns `true` if the node does not coincide with the start vertex
    /// of its segment.
    #[must_use]
    pub const fn is_interior(&self) -> bool {
        self.is_interior
    }

    /// Order by segment, then by position along the segment.
    ///
    /// A node on the start vertex sorts before interior nodes of the same
    /// segment. Equal coordinates on the same segment compare equal.
    fn compare(&self, other: &Self) -> Ordering {
        self.segment_index
            .cmp(&other.segment_index)
            .then_with(|| {
                if self.coordinate == other.coordinate {
                    return Ordering::Equal;
                }
                self.is_interior
                    .cmp(&other.is_interior)
                    .then_with(|| self.param.total_cmp(&other.param))
                    .then_with(|| self.coordinate.x.total_cmp(&other.coordinate.x))
                    .then_with(|| self.coordinate.y.total_cmp(&other.coordinate.y))
            })
    }
}

fn projection_param(start: Coord<f64>, end: Coord<f64>, p: Coord<f64>) -> f64 {
    let d = end - start;
    let len2 = d.x.mul_add(d.x, d.y * d.y);
    if len2 == 0.0 {
        return 0.0;
    }
    let v = p - start;
    v.x.mul_add(d.x, v.y * d.y) / len2
}

/// Ordered, deduplicated split points of one polyline.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SegmentNodeList {
    nodes: Vec<SegmentNode>,
}

impl SegmentNodeList {
    /// Create an empty list.
    #[must_use]
    pub const fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    /// Number of distinct nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if no node has been added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes in order along the polyline.
    pub fn iter(&self) -> impl Iterator<Item = &SegmentNode> {
        self.nodes.iter()
    }

    /// Insert a node on segment `segment_index` of `pts`.
    ///
    /// Returns `false` if an equal node was already present.
    pub fn add(&mut self, coordinate: Coord<f64>, segment_index: usize, pts: &[Coord<f64>]) -> bool {
        let node = SegmentNode::new(coordinate, segment_index, pts);
        match self.nodes.binary_search_by(|n| n.compare(&node)) {
            Ok(_) => false,
            Err(pos) => {
                self.nodes.insert(pos, node);
                true
            }
        }
    }

    fn add_endpoints(&mut self, pts: &[Coord<f64>]) {
        let max_segment = pts.len() - 1;
        self.add(pts[0], 0, pts);
        self.add(pts[max_segment], max_segment, pts);
    }

    /// Add nodes at the apex of every `A-B-A` collapse.
    ///
    /// Splitting at the apex keeps a collapsed piece as its own fragment
    /// rather than folding it back onto its neighbour.
    fn add_collapsed_nodes(&mut self, pts: &[Coord<f64>]) {
        let mut collapsed = collapses_from_existing_vertices(pts);
        collapsed.extend(self.collapses_from_inserted_nodes());
        for idx in collapsed {
            self.add(pts[idx], idx, pts);
        }
    }

    fn collapses_from_inserted_nodes(&self) -> Vec<usize> {
        self.nodes
            .windows(2)
            .filter_map(|w| collapse_index(&w[0], &w[1]))
            .collect()
    }

    /// Cut `pts` into fragments between consecutive nodes.
    ///
    /// The endpoints of `pts` are always nodes. Every fragment starts and
    /// ends on a node, keeps the original vertices strictly between them,
    /// and carries a clone of `data`. The list itself is left unchanged.
    #[must_use]
    pub fn split_edges<D: Clone>(&self, pts: &[Coord<f64>], data: &D) -> Vec<SegmentString<D>> {
        if pts.len() < 2 {
            return Vec::new();
        }
        let mut working = self.clone();
        working.add_endpoints(pts);
        working.add_collapsed_nodes(pts);

        working
            .nodes
            .windows(2)
            .filter_map(|w| {
                let coords = split_edge_coords(&w[0], &w[1], pts);
                (coords.len() >= 2).then(|| SegmentString::new(coords, data.clone()))
            })
            .collect()
    }
}

fn collapses_from_existing_vertices(pts: &[Coord<f64>]) -> Vec<usize> {
    pts.windows(3)
        .enumerate()
        .filter(|(_, w)| w[0] == w[2])
        .map(|(i, _)| i + 1)
        .collect()
}

/// Two consecutive nodes at the same coordinate with exactly one vertex
/// between them form a collapse; returns that vertex.
fn collapse_index(ei0: &SegmentNode, ei1: &SegmentNode) -> Option<usize> {
    if ei0.coordinate != ei1.coordinate {
        return None;
    }
    let mut vertices_between = ei1.segment_index - ei0.segment_index;
    if !ei1.is_interior() {
        vertices_between = vertices_between.saturating_sub(1);
    }
    (vertices_between == 1).then_some(ei0.segment_index + 1)
}

fn split_edge_coords(ei0: &SegmentNode, ei1: &SegmentNode, pts: &[Coord<f64>]) -> Vec<Coord<f64>> {
    let mut coords = Vec::with_capacity(ei1.segment_index - ei0.segment_index + 2);
    coords.push(ei0.coordinate);
    for &p in &pts[ei0.segment_index + 1..=ei1.segment_index] {
        push_distinct(&mut coords, p);
    }
    // The last vertex copied is the start of ei1's segment; the node itself
    // is only needed when it lies past that vertex.
    let last_seg_start = pts[ei1.segment_index];
    if ei1.is_interior() || ei1.coordinate != last_seg_start {
        push_distinct(&mut coords, ei1.coordinate);
    }
    coords
}

fn push_distinct(coords: &mut Vec<Coord<f64>>, p: Coord<f64>) {
    if coords.last() != Some(&p) {
        coords.push(p);
    }
}
