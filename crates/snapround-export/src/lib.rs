//! snapround-export: Pure format serializers for noded output (sans-IO)
//!
//! Converts noded fragments into output formats. Currently supports SVG,
//! used as a diagnostic view of where nodes were inserted.

pub mod svg;

pub use svg::{SvgMetadata, build_path_data, to_svg};
