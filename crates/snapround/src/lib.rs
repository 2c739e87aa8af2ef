//! snapround: Snap-rounding noder for line segments (sans-IO).
//!
//! Takes a set of polylines and produces a fully noded set of fragments
//! whose vertices all lie on a fixed precision grid:
//! round vertices -> build hot pixels -> snap segments through pixels ->
//! split at nodes -> re-snap fragments until stable -> optional validation.
//!
//! This crate has **no I/O dependencies**. It operates on in-memory
//! coordinates and returns structured data. File handling and reporting
//! live in `snapround-bench`.
//!
//! ```
//! use snapround::{Coord, Noder, SegmentString, SnapRoundingNoder, ValidatingNoder};
//!
//! let lines = vec![
//!     SegmentString::new(vec![Coord { x: 1.0, y: 1.0 }, Coord { x: 9.0, y: 2.0 }], "a"),
//!     SegmentString::new(vec![Coord { x: 3.0, y: 3.0 }, Coord { x: 3.0, y: 0.0 }], "b"),
//! ];
//! let mut noder = ValidatingNoder::new(SnapRoundingNoder::with_scale(1.0)?);
//! noder.compute_nodes(&lines)?;
//! assert_eq!(noder.noded_substrings().len(), 4);
//! # Ok::<(), snapround::NodingError>(())
//! ```

pub mod diagnostics;
pub mod geometry;
pub mod hot_pixel;
pub mod index;
pub mod intersection;
pub mod node_list;
pub mod noder;
pub mod precision;
pub mod segment_string;
pub mod snap_rounding;
pub mod types;
pub mod validating;

pub use geo::Coord;

pub use geometry::{node_geometry, segment_strings_from_geometry, to_multi_line_string};
pub use hot_pixel::HotPixel;
pub use noder::Noder;
pub use precision::PrecisionModel;
pub use segment_string::{NodedSegmentString, SegmentString};
pub use snap_rounding::SnapRoundingNoder;
pub use types::{NoderConfig, NodingError, NonNodedIntersection};
pub use validating::{NodingValidator, ValidatingNoder};
