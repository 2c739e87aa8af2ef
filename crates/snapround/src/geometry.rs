//! Conversions between `geo` geometries and segment strings.
//!
//! Only linear components take part in noding. Points carry no segments
//! and areal components (polygons, rects, triangles) are skipped: their
//! boundaries are a topology concern of the caller.

use geo::{Geometry, LineString, MultiLineString};

use crate::noder::Noder;
use crate::segment_string::SegmentString;
use crate::snap_rounding::SnapRoundingNoder;
use crate::types::{NoderConfig, NodingError};
use crate::validating::ValidatingNoder;

/// Extract every linear component of `geometry`, in order.
///
/// Each string is tagged with the index of its component in that order,
/// so fragments can be traced back to the line they came from.
#[must_use]
pub fn segment_strings_from_geometry(geometry: &Geometry<f64>) -> Vec<SegmentString<usize>> {
    let mut lines = Vec::new();
    collect_lines(geometry, &mut lines);
    lines
        .into_iter()
        .enumerate()
        .map(|(i, ls)| SegmentString::new(ls.0, i))
        .collect()
}

fn collect_lines(geometry: &Geometry<f64>, out: &mut Vec<LineString<f64>>) {
    match geometry {
        Geometry::Line(line) => out.push(LineString::from(vec![line.start, line.end])),
        Geometry::LineString(ls) => out.push(ls.clone()),
        Geometry::MultiLineString(mls) => out.extend(mls.0.iter().cloned()),
        Geometry::GeometryCollection(gc) => {
            for g in &gc.0 {
                collect_lines(g, out);
            }
        }
        Geometry::Point(_)
        | Geometry::MultiPoint(_)
        | Geometry::Polygon(_)
        | Geometry::MultiPolygon(_)
        | Geometry::Rect(_)
        | Geometry::Triangle(_) => {}
    }
}

/// Copy each string's coordinates into one multi-line-string.
#[must_use]
pub fn to_multi_line_string<D>(strings: &[SegmentString<D>]) -> MultiLineString<f64> {
    MultiLineString::new(
        strings
            .iter()
            .map(|s| LineString::new(s.coords().to_vec()))
            .collect(),
    )
}

/// Snap-round the linear components of `geometry`.
///
/// # Errors
///
/// Returns [`NodingError::InvalidScale`] for a bad `config.scale`,
/// [`NodingError::NonFiniteCoordinate`] for NaN or infinite input, and,
/// when `config.validate` is set, [`NodingError::NonNodedIntersection`] if
/// the result is not fully noded.
pub fn node_geometry(
    geometry: &Geometry<f64>,
    config: &NoderConfig,
) -> Result<MultiLineString<f64>, NodingError> {
    let strings = segment_strings_from_geometry(geometry);
    let noder = SnapRoundingNoder::with_scale(config.scale)?;
    let fragments = if config.validate {
        run(ValidatingNoder::new(noder), &strings)?
    } else {
        run(noder, &strings)?
    };
    Ok(to_multi_line_string(&fragments))
}

fn run<D, N: Noder<D>>(
    mut noder: N,
    strings: &[SegmentString<D>],
) -> Result<Vec<SegmentString<D>>, NodingError> {
    noder.compute_nodes(strings)?;
    Ok(noder.noded_substrings())
}
