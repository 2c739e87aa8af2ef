//! Checking that a set of polylines is fully noded.
//!
//! A set is fully noded when no two segments meet anywhere except at
//! shared string endpoints. [`NodingValidator`] scans for violations and
//! [`ValidatingNoder`] wraps any [`Noder`] with that scan.

use geo::Coord;
use geo::algorithm::line_intersection::{LineIntersection, line_intersection};

use crate::index::{SegmentId, SegmentTree};
use crate::noder::Noder;
use crate::segment_string::SegmentString;
use crate::types::{NodingError, NonNodedIntersection};

/// Scans polylines for intersections that are not at string endpoints.
#[derive(Debug)]
pub struct NodingValidator<'a> {
    tree: SegmentTree<'a>,
}

impl<'a> NodingValidator<'a> {
    /// Index every segment of `strings` for checking.
    #[must_use]
    pub fn new<D>(strings: &'a [SegmentString<D>]) -> Self {
        Self {
            tree: SegmentTree::new(strings.iter().map(SegmentString::coords)),
        }
    }

    /// Returns `true` if the strings are fully noded.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.find_non_noded().is_none()
    }

    /// # Errors
    ///
    /// Returns [`NodingError::NonNodedIntersection`] describing the first
    /// violation found.
    pub fn check_valid(&self) -> Result<(), NodingError> {
        match self.find_non_noded() {
            Some(found) => Err(NodingError::NonNodedIntersection(found)),
            None => Ok(()),
        }
    }

    /// The first violation, scanning segment pairs in string order.
    #[must_use]
    pub fn find_non_noded(&self) -> Option<NonNodedIntersection> {
        self.tree
            .overlapping_pairs(0.0)
            .into_iter()
            .find_map(|(a, b)| self.check_pair(a, b))
    }

    /// Every violation, one per offending segment pair.
    #[must_use]
    pub fn find_all_non_noded(&self) -> Vec<NonNodedIntersection> {
        self.tree
            .overlapping_pairs(0.0)
            .into_iter()
            .filter_map(|(a, b)| self.check_pair(a, b))
            .collect()
    }

    fn check_pair(&self, a: SegmentId, b: SegmentId) -> Option<NonNodedIntersection> {
        if a == b {
            return None;
        }
        let seg0 = self.tree.segment(a);
        let seg1 = self.tree.segment(b);

        let same_string = a.string == b.string;
        if same_string && a.segment.abs_diff(b.segment) <= 1 {
            return None;
        }

        let found = |location: Coord<f64>| NonNodedIntersection {
            location,
            segment_a: seg0,
            segment_b: seg1,
        };

        // Crossing or overlap in the interior of either segment.
        let points: Vec<Coord<f64>> = match line_intersection(seg0, seg1) {
            None => return None,
            Some(LineIntersection::SinglePoint { intersection, .. }) => vec![intersection],
            Some(LineIntersection::Collinear { intersection }) => {
                vec![intersection.start, intersection.end]
            }
        };
        let is_vertex_of = |p: Coord<f64>, seg: geo::Line<f64>| p == seg.start || p == seg.end;
        if let Some(&p) = points
            .iter()
            .find(|&&p| !is_vertex_of(p, seg0) || !is_vertex_of(p, seg1))
        {
            return Some(found(p));
        }

        // Segments meeting at a vertex that is interior to one of the
        // strings.
        let len0 = self.tree.string(a.string).len();
        let len1 = self.tree.string(b.string).len();
        let end00 = a.segment == 0;
        let end01 = a.segment + 2 == len0;
        let end10 = b.segment == 0;
        let end11 = b.segment + 2 == len1;
        let vertex_pairs = [
            (seg0.start, end00, seg1.start, end10),
            (seg0.start, end00, seg1.end, end11),
            (seg0.end, end01, seg1.start, end10),
            (seg0.end, end01, seg1.end, end11),
        ];
        vertex_pairs
            .into_iter()
            .find(|&(p, p_is_end, q, q_is_end)| !(p_is_end && q_is_end) && p == q)
            .map(|(p, ..)| found(p))
    }
}

/// Wraps a noder and rejects output that is not fully noded.
///
/// After a successful [`compute_nodes`](Noder::compute_nodes) the inner
/// noder's fragments are passed through unchanged. After a failed
/// validation no fragments are returned; [`into_inner`](Self::into_inner)
/// still gives access to the unvalidated result.
#[derive(Debug, Clone)]
pub struct ValidatingNoder<N> {
    inner: N,
    valid: bool,
}

impl<N> ValidatingNoder<N> {
    /// Validate everything `inner` produces.
    #[must_use]
    pub const fn new(inner: N) -> Self {
        Self {
            inner,
            valid: false,
        }
    }

    /// The wrapped noder.
    #[must_use]
    pub const fn inner(&self) -> &N {
        &self.inner
    }

    /// Unwrap the noder, keeping its last result even if it failed
    /// validation.
    #[must_use]
    pub fn into_inner(self) -> N {
        self.inner
    }
}

impl<D, N: Noder<D>> Noder<D> for ValidatingNoder<N> {
    fn compute_nodes(&mut self, segments: &[SegmentString<D>]) -> Result<(), NodingError> {
        self.valid = false;
        self.inner.compute_nodes(segments)?;
        let fragments = self.inner.noded_substrings();
        if let Some(found) = NodingValidator::new(&fragments).find_non_noded() {
            tracing::warn!("noding validation failed: non-noded intersection at {}", found);
            return Err(NodingError::NonNodedIntersection(found));
        }
        tracing::debug!("noding validation passed for {} fragments", fragments.len());
        self.valid = true;
        Ok(())
    }

    fn noded_substrings(&self) -> Vec<SegmentString<D>> {
        if self.valid {
            self.inner.noded_substrings()
        } else {
            Vec::new()
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn c(x: f64, y: f64) -> Coord<f64> {
        Coord { x, y }
    }

    fn line(pts: &[(f64, f64)]) -> SegmentString<()> {
        SegmentString::new(pts.iter().map(|&(x, y)| c(x, y)).collect(), ())
    }

    #[test]
    fn proper_crossing_is_invalid() {
        let strings = vec![
            line(&[(0.0, 0.0), (10.0, 10.0)]),
            line(&[(0.0, 10.0), (10.0, 0.0)]),
        ];
        let found = NodingValidator::new(&strings).find_non_noded().unwrap();
        assert_eq!(found.location, c(5.0, 5.0));
    }

    #[test]
    fn shared_endpoints_are_valid() {
        let strings = vec![
            line(&[(0.0, 0.0), (5.0, 5.0)]),
            line(&[(5.0, 5.0), (10.0, 10.0)]),
            line(&[(5.0, 5.0), (10.0, 0.0)]),
        ];
        assert!(NodingValidator::new(&strings).is_valid());
    }

    #[test]
    fn t_junction_is_invalid() {
        let strings = vec![
            line(&[(0.0, 0.0), (10.0, 0.0)]),
            line(&[(5.0, 0.0), (5.0, 5.0)]),
        ];
        let err = NodingValidator::new(&strings).check_valid().unwrap_err();
        assert!(matches!(err, NodingError::NonNodedIntersection(n) if n.location == c(5.0, 0.0)));
    }

    #[test]
    fn touching_at_interior_vertex_is_invalid() {
        let strings = vec![
            line(&[(0.0, 0.0), (5.0, 0.0), (10.0, 0.0)]),
            line(&[(5.0, 0.0), (5.0, 5.0)]),
        ];
        assert!(!NodingValidator::new(&strings).is_valid());
    }

    #[test]
    fn adjacent_segments_of_one_string_are_ignored() {
        let strings = vec![line(&[(0.0, 0.0), (5.0, 0.0), (5.0, 5.0)])];
        assert!(NodingValidator::new(&strings).is_valid());
    }

    #[test]
    fn self_crossing_string_is_invalid() {
        let strings = vec![line(&[
            (0.0, 0.0),
            (10.0, 10.0),
            (10.0, 0.0),
            (0.0, 10.0),
        ])];
        assert!(!NodingValidator::new(&strings).is_valid());
    }

    #[test]
    fn closed_ring_endpoints_are_valid() {
        let strings = vec![line(&[
            (0.0, 0.0),
            (10.0, 0.0),
            (10.0, 10.0),
            (0.0, 0.0),
        ])];
        assert!(NodingValidator::new(&strings).is_valid());
    }

    #[test]
    fn collinear_overlap_is_invalid() {
        let strings = vec![
            line(&[(0.0, 0.0), (10.0, 0.0)]),
            line(&[(2.0, 0.0), (12.0, 0.0)]),
        ];
        assert!(!NodingValidator::new(&strings).is_valid());
    }

    #[test]
    fn find_all_reports_each_pair() {
        let strings = vec![
            line(&[(0.0, 5.0), (10.0, 5.0)]),
            line(&[(2.0, 0.0), (2.0, 10.0)]),
            line(&[(8.0, 0.0), (8.0, 10.0)]),
        ];
        assert_eq!(NodingValidator::new(&strings).find_all_non_noded().len(), 2);
    }

    /// Returns whatever it was given, unchanged.
    struct Passthrough(Vec<SegmentString<()>>);

    impl Noder<()> for Passthrough {
        fn compute_nodes(&mut self, segments: &[SegmentString<()>]) -> Result<(), NodingError> {
            self.0 = segments.to_vec();
            Ok(())
        }

        fn noded_substrings(&self) -> Vec<SegmentString<()>> {
            self.0.clone()
        }
    }

    #[test]
    fn validating_noder_rejects_crossings() {
        let mut noder = ValidatingNoder::new(Passthrough(Vec::new()));
        let input = vec![
            line(&[(0.0, 0.0), (10.0, 10.0)]),
            line(&[(0.0, 10.0), (10.0, 0.0)]),
        ];
        let err = noder.compute_nodes(&input).unwrap_err();
        assert!(matches!(err, NodingError::NonNodedIntersection(_)));
        assert!(noder.noded_substrings().is_empty());
        assert_eq!(noder.into_inner().0.len(), 2);
    }

    #[test]
    fn validating_noder_passes_valid_output_through() {
        let mut noder = ValidatingNoder::new(Passthrough(Vec::new()));
        let input = vec![
            line(&[(0.0, 0.0), (5.0, 5.0)]),
            line(&[(5.0, 5.0), (10.0, 0.0)]),
        ];
        noder.compute_nodes(&input).unwrap();
        assert_eq!(noder.noded_substrings(), input);
    }
}
