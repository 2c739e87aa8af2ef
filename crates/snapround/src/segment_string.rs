//! Polylines with caller context, before and after noding.

use geo::{Coord, Line};
use serde::{Deserialize, Serialize};

use crate::node_list::SegmentNodeList;

/// An open polyline plus opaque caller context.
///
/// The context `D` is cloned onto every fragment the polyline is split
/// into, so attributes can be reattached after noding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentString<D> {
    coords: Vec<Coord<f64>>,
    data: D,
}

impl<D> SegmentString<D> {
    /// Wrap `coords` with the caller context `data`. The vertices are
    /// taken as given; no rounding or deduplication happens here.
    #[must_use]
    pub const fn new(coords: Vec<Coord<f64>>, data: D) -> Self {
        Self { coords, data }
    }

    /// The vertices, in order.
    #[must_use]
    pub fn coords(&self) -> &[Coord<f64>] {
        &self.coords
    }

    /// The caller context.
    #[must_use]
    pub const fn data(&self) -> &D {
        &self.data
    }

    /// Number of vertices.
    #[must_use]
    pub fn len(&self) -> usize {
        self.coords.len()
    }

    /// Returns `true` if there are no vertices.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }

    /// Number of segments (`len - 1`, or zero).
    #[must_use]
    pub fn segment_count(&self) -> usize {
        self.coords.len().saturating_sub(1)
    }

    /// Segment `i`, from vertex `i` to vertex `i + 1`.
    #[must_use]
    pub fn segment(&self, i: usize) -> Option<Line<f64>> {
        match self.coords.get(i..i + 2) {
            Some(&[a, b]) => Some(Line::new(a, b)),
            _ => None,
        }
    }

    /// Returns `true` if the first and last vertices coincide.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.coords.len() > 1 && self.coords.first() == self.coords.last()
    }

    /// Split into vertices and context.
    #[must_use]
    pub fn into_parts(self) -> (Vec<Coord<f64>>, D) {
        (self.coords, self.data)
    }
}

/// A polyline owned by a noding run, accumulating split points.
///
/// Holds its own copy of the vertices; splitting never shares a buffer
/// with the input or with other fragments.
#[derive(Debug, Clone, PartialEq)]
pub struct NodedSegmentString<D> {
    coords: Vec<Coord<f64>>,
    data: D,
    nodes: SegmentNodeList,
}

impl<D> NodedSegmentString<D> {
    /// A string over `coords` with no split points yet.
    #[must_use]
    pub const fn new(coords: Vec<Coord<f64>>, data: D) -> Self {
        Self {
            coords,
            data,
            nodes: SegmentNodeList::new(),
        }
    }

    /// The vertices, without the split points.
    #[must_use]
    pub fn coords(&self) -> &[Coord<f64>] {
        &self.coords
    }

    /// The caller context, cloned onto every fragment.
    #[must_use]
    pub const fn data(&self) -> &D {
        &self.data
    }

    /// Split points recorded so far (endpoints are added at split time).
    #[must_use]
    pub const fn node_list(&self) -> &SegmentNodeList {
        &self.nodes
    }

    /// Record that the polyline must be split at `coordinate`, which lies
    /// on segment `segment_index`.
    ///
    /// A coordinate equal to the segment's end vertex is filed under the
    /// next segment, so every vertex node has a single canonical key.
    pub fn add_intersection(&mut self, coordinate: Coord<f64>, segment_index: usize) {
        let mut normalized = segment_index;
        if self.coords.get(segment_index + 1) == Some(&coordinate) {
            normalized += 1;
        }
        self.nodes.add(coordinate, normalized, &self.coords);
    }

    /// Fragments between consecutive split points, freshly allocated.
    #[must_use]
    pub fn noded_substrings(&self) -> Vec<SegmentString<D>>
    where
        D: Clone,
    {
        self.nodes.split_edges(&self.coords, &self.data)
    }
}

impl<D: Clone> NodedSegmentString<D> {
    /// Copy an input polyline into a noded one.
    #[must_use]
    pub fn from_segment_string(s: &SegmentString<D>) -> Self {
        Self::new(s.coords.clone(), s.data.clone())
    }
}

/// Fragments of every string, in input order.
#[must_use]
pub fn noded_substrings<D: Clone>(strings: &[NodedSegmentString<D>]) -> Vec<SegmentString<D>> {
    strings
        .iter()
        .flat_map(NodedSegmentString::noded_substrings)
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn c(x: f64, y: f64) -> Coord<f64> {
        Coord { x, y }
    }

    #[test]
    fn segment_access() {
        let s = SegmentString::new(vec![c(0.0, 0.0), c(1.0, 0.0), c(1.0, 1.0)], 7_u32);
        assert_eq!(s.len(), 3);
        assert_eq!(s.segment_count(), 2);
        assert_eq!(s.segment(1), Some(Line::new(c(1.0, 0.0), c(1.0, 1.0))));
        assert_eq!(s.segment(2), None);
        assert_eq!(*s.data(), 7);
        assert!(!s.is_closed());
    }

    #[test]
    fn closed_ring() {
        let s = SegmentString::new(
            vec![c(0.0, 0.0), c(1.0, 0.0), c(1.0, 1.0), c(0.0, 0.0)],
            (),
        );
        assert!(s.is_closed());
        assert!(!SegmentString::new(vec![c(0.0, 0.0)], ()).is_closed());
    }

    #[test]
    fn intersection_on_next_vertex_is_normalized() {
        let mut s = NodedSegmentString::new(vec![c(0.0, 0.0), c(5.0, 0.0), c(10.0, 0.0)], ());
        s.add_intersection(c(5.0, 0.0), 0);
        s.add_intersection(c(5.0, 0.0), 1);
        assert_eq!(s.node_list().len(), 1);
        let node = s.node_list().iter().next().unwrap();
        assert_eq!(node.segment_index, 1);
        assert!(!node.is_interior());
    }

    #[test]
    fn substrings_are_fresh_each_call() {
        let mut s = NodedSegmentString::new(vec![c(0.0, 0.0), c(10.0, 0.0)], 1_u8);
        s.add_intersection(c(4.0, 0.0), 0);
        let first = s.noded_substrings();
        let second = s.noded_substrings();
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].coords(), &[c(0.0, 0.0), c(4.0, 0.0)]);
    }

    #[test]
    fn free_function_preserves_input_order() {
        let a = NodedSegmentString::new(vec![c(0.0, 0.0), c(1.0, 0.0)], 'a');
        let b = NodedSegmentString::new(vec![c(0.0, 1.0), c(1.0, 1.0)], 'b');
        let out = noded_substrings(&[a, b]);
        let tags: Vec<char> = out.iter().map(|s| *s.data()).collect();
        assert_eq!(tags, vec!['a', 'b']);
    }

    #[test]
    fn segment_string_serde_roundtrip() {
        let s = SegmentString::new(vec![c(0.5, 1.5), c(2.0, 3.0)], "x".to_string());
        let json = serde_json::to_string(&s).unwrap();
        let back: SegmentString<String> = serde_json::from_str(&json).unwrap();
        assert_eq!(s, back);
    }
}
