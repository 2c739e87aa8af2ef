//! The noding contract shared by every noder.

use crate::segment_string::SegmentString;
use crate::types::NodingError;

/// Computes a fully noded version of a set of polylines.
///
/// Implementations never modify the input strings. Working state lives
/// only for the duration of one [`compute_nodes`](Self::compute_nodes)
/// call; the result is kept until the next call.
pub trait Noder<D> {
    /// Node `segments`, replacing any previous result.
    ///
    /// # Errors
    ///
    /// Configuration errors (non-finite coordinates) are reported before
    /// any work is done. Validating noders also report residual crossings
    /// as [`NodingError::NonNodedIntersection`].
    fn compute_nodes(&mut self, segments: &[SegmentString<D>]) -> Result<(), NodingError>;

    /// The fragments of the last successful run, as a fresh collection.
    ///
    /// Empty before the first call to
    /// [`compute_nodes`](Self::compute_nodes).
    fn noded_substrings(&self) -> Vec<SegmentString<D>>;
}
