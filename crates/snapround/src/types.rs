//! Shared types for the snap-rounding noder: configuration and errors.

use geo::{Coord, Line};
use serde::{Deserialize, Serialize};

/// Configuration for a noding run.
///
/// Used by [`node_geometry`](crate::geometry::node_geometry) and by the
/// bench CLI, which accepts the whole config as JSON.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoderConfig {
    /// Grid cells per unit. Must be finite and strictly positive.
    pub scale: f64,

    /// Whether to re-scan the noded output for residual crossings and
    /// report them as [`NodingError::NonNodedIntersection`].
    pub validate: bool,
}

impl NoderConfig {
    /// Default grid: integer coordinates.
    pub const DEFAULT_SCALE: f64 = 1.0;

    /// Validation is on by default; callers that accept imprecise
    /// output must opt out explicitly.
    pub const DEFAULT_VALIDATE: bool = true;
}

impl Default for NoderConfig {
    fn default() -> Self {
        Self {
            scale: Self::DEFAULT_SCALE,
            validate: Self::DEFAULT_VALIDATE,
        }
    }
}

/// A pair of output segments that cross without sharing a node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NonNodedIntersection {
    /// Where the two segments meet.
    pub location: Coord<f64>,
    /// First offending segment.
    pub segment_a: Line<f64>,
    /// Second offending segment.
    pub segment_b: Line<f64>,
}

impl std::fmt::Display for NonNodedIntersection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "({} {}) between LINESTRING ({} {}, {} {}) and LINESTRING ({} {}, {} {})",
            self.location.x,
            self.location.y,
            self.segment_a.start.x,
            self.segment_a.start.y,
            self.segment_a.end.x,
            self.segment_a.end.y,
            self.segment_b.start.x,
            self.segment_b.start.y,
            self.segment_b.end.x,
            self.segment_b.end.y,
        )
    }
}

/// Errors that can occur while noding.
///
/// `InvalidScale` and `NonFiniteCoordinate` are configuration errors and
/// are raised before any work is done. `NonNodedIntersection` is only
/// raised by [`ValidatingNoder`](crate::ValidatingNoder); the base
/// [`SnapRoundingNoder`](crate::SnapRoundingNoder) always produces output.
#[derive(Debug, Clone, PartialEq, thiserror::Error, Serialize, Deserialize)]
pub enum NodingError {
    /// The precision model scale is zero, negative, or not finite.
    #[error("invalid precision model scale: {0} (must be finite and > 0)")]
    InvalidScale(f64),

    /// An input coordinate is NaN or infinite.
    #[error("non-finite coordinate at vertex {vertex_index} of segment string {string_index}")]
    NonFiniteCoordinate {
        /// Index of the offending segment string in the input slice.
        string_index: usize,
        /// Index of the offending vertex within that string.
        vertex_index: usize,
    },

    /// Validation found a crossing that the noder did not node.
    #[error("found non-noded intersection at {0}")]
    NonNodedIntersection(NonNodedIntersection),
}
