//! SVG export serializer.
//!
//! Converts noded fragments into an SVG string using the [`svg`] crate for
//! document construction, XML escaping, and path data formatting.
//!
//! Each fragment becomes a separate `<path>` element using `M` (move to)
//! and `L` (line to) commands. Every distinct fragment endpoint is a node
//! and is drawn as a `<circle>` under `<g id="nodes">`.
//!
//! Model coordinates are mapped into a fixed-size `viewBox` with the y axis
//! flipped, so tiny geographic extents render at a readable size and the
//! `f32` path formatting of the `svg` crate does not lose precision.
//!
//! This is a pure function with no I/O -- it returns a `String`.

use geo::BoundingRect;
use snapround::{Coord, SegmentString, to_multi_line_string};
use svg::Document;
use svg::node::element::path::Data;
use svg::node::element::{Circle, Description, Element, Group, Path, Title};
use svg::node::{Node, Text, Value};

/// Length of the longer side of the drawing, in `viewBox` units.
const DOCUMENT_SIZE: f64 = 1000.0;
/// Blank border around the drawing, in `viewBox` units.
const MARGIN: f64 = 20.0;
/// Radius of node markers, in `viewBox` units.
const NODE_RADIUS: f64 = 4.0;

/// Metadata to embed in the SVG document.
///
/// All fields are optional. Text values are XML-escaped automatically by
/// the `svg` crate.
#[derive(Debug, Clone, Default)]
pub struct SvgMetadata<'a> {
    /// Document title, emitted as `<title>`.
    ///
    /// Typically the input filename (without extension).
    pub title: Option<&'a str>,

    /// Document description, emitted as `<desc>`.
    pub description: Option<&'a str>,

    /// Noder configuration JSON, emitted inside a `<metadata>` element
    /// wrapped in a namespaced `<snapround:config>` element.
    pub config_json: Option<&'a str>,
}

/// Build an SVG path `d` attribute string from a coordinate sequence.
///
/// Uses `M` for the first point and `L` for subsequent points.
/// Returns an empty string for sequences with fewer than 2 points.
///
/// # Examples
///
/// ```
/// use snapround::Coord;
/// use snapround_export::build_path_data;
///
/// let d = build_path_data(&[Coord { x: 10.0, y: 20.0 }, Coord { x: 30.0, y: 40.0 }]);
/// assert_eq!(d, "M10,20 L30,40");
/// ```
#[must_use]
pub fn build_path_data(coords: &[Coord<f64>]) -> String {
    build_path_data_transformed(coords, |c| (c.x, c.y))
}

fn build_path_data_transformed<F>(coords: &[Coord<f64>], tx: F) -> String
where
    F: Fn(Coord<f64>) -> (f64, f64),
{
    if coords.len() < 2 {
        return String::new();
    }
    let mut data = Data::new().move_to(tx(coords[0]));
    for &c in &coords[1..] {
        data = data.line_to(tx(c));
    }
    String::from(Value::from(data))
}

/// Maps model coordinates into the `viewBox`.
#[derive(Debug, Clone, Copy)]
struct Transform {
    min_x: f64,
    max_y: f64,
    scale: f64,
    width: f64,
    height: f64,
}

impl Transform {
    fn fit<D>(fragments: &[SegmentString<D>]) -> Self {
        let Some(rect) = to_multi_line_string(fragments).bounding_rect() else {
            return Self {
                min_x: 0.0,
                max_y: 0.0,
                scale: 1.0,
                width: DOCUMENT_SIZE,
                height: DOCUMENT_SIZE,
            };
        };
        let extent = rect.width().max(rect.height());
        let scale = if extent > 0.0 {
            DOCUMENT_SIZE / extent
        } else {
            1.0
        };
        Self {
            min_x: rect.min().x,
            max_y: rect.max().y,
            scale,
            width: rect.width().mul_add(scale, 2.0 * MARGIN),
            height: rect.height().mul_add(scale, 2.0 * MARGIN),
        }
    }

    fn apply(&self, c: Coord<f64>) -> (f64, f64) {
        (
            (c.x - self.min_x).mul_add(self.scale, MARGIN),
            (self.max_y - c.y).mul_add(self.scale, MARGIN),
        )
    }
}

/// Distinct fragment endpoints, in a stable order.
fn node_coords<D>(fragments: &[SegmentString<D>]) -> Vec<Coord<f64>> {
    let mut nodes: Vec<Coord<f64>> = fragments
        .iter()
        .filter(|f| f.len() >= 2)
        .flat_map(|f| [f.coords()[0], f.coords()[f.len() - 1]])
        .collect();
    nodes.sort_by(|a, b| a.x.total_cmp(&b.x).then_with(|| a.y.total_cmp(&b.y)));
    nodes.dedup();
    nodes
}

/// Serialize noded fragments into an SVG document string.
///
/// Each fragment with 2 or more points becomes a `<path>` element;
/// shorter ones are skipped. Fragment endpoints are marked with red
/// circles.
///
/// # Examples
///
/// ```
/// use snapround::{Coord, SegmentString};
/// use snapround_export::{SvgMetadata, to_svg};
///
/// let fragments = vec![SegmentString::new(
///     vec![Coord { x: 0.0, y: 0.0 }, Coord { x: 10.0, y: 0.0 }],
///     (),
/// )];
/// let metadata = SvgMetadata {
///     title: Some("roads"),
///     ..SvgMetadata::default()
/// };
/// let svg = to_svg(&fragments, &metadata);
/// assert!(svg.contains("<title>roads</title>"));
/// assert!(svg.contains("<path"));
/// ```
#[must_use]
pub fn to_svg<D>(fragments: &[SegmentString<D>], metadata: &SvgMetadata<'_>) -> String {
    let transform = Transform::fit(fragments);
    let mut doc = Document::new()
        .set("width", transform.width)
        .set("height", transform.height)
        .set("viewBox", (0, 0, transform.width, transform.height));

    if let Some(title) = metadata.title {
        doc = doc.add(Title::new(title));
    }

    if let Some(description) = metadata.description {
        doc = doc.add(Description::new().add(Text::new(description)));
    }

    if let Some(config_json) = metadata.config_json {
        let mut config_el = Element::new("snapround:config");
        config_el.assign("xmlns:snapround", "https://github.com/snapround/snapround/ns/1");
        config_el.append(Text::new(config_json));
        let mut metadata_el = Element::new("metadata");
        metadata_el.append(config_el);
        doc = doc.add(metadata_el);
    }

    for fragment in fragments {
        let d = build_path_data_transformed(fragment.coords(), |c| transform.apply(c));
        if d.is_empty() {
            continue;
        }
        let path = Path::new()
            .set("d", d)
            .set("fill", "none")
            .set("stroke", "black")
            .set("stroke-width", 1);
        doc = doc.add(path);
    }

    let nodes = node_coords(fragments);
    if !nodes.is_empty() {
        let mut group = Group::new().set("id", "nodes").set("fill", "red");
        for c in nodes {
            let (cx, cy) = transform.apply(c);
            group = group.add(
                Circle::new()
                    .set("cx", cx)
                    .set("cy", cy)
                    .set("r", NODE_RADIUS),
            );
        }
        doc = doc.add(group);
    }

    // The svg crate omits the XML declaration, so we prepend it.
    format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{doc}\n")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn c(x: f64, y: f64) -> Coord<f64> {
        Coord { x, y }
    }

    fn frag(pts: &[(f64, f64)]) -> SegmentString<()> {
        SegmentString::new(pts.iter().map(|&(x, y)| c(x, y)).collect(), ())
    }

    fn no_meta() -> SvgMetadata<'static> {
        SvgMetadata::default()
    }

    // --- build_path_data ---

    #[test]
    fn build_path_data_single_point() {
        assert_eq!(build_path_data(&[c(5.0, 5.0)]), "");
    }

    #[test]
    fn build_path_data_three_points() {
        let d = build_path_data(&[c(10.0, 15.0), c(12.5, 18.3), c(14.0, 20.1)]);
        assert_eq!(d, "M10,15 L12.5,18.3 L14,20.1");
    }

    // --- Document structure ---

    #[test]
    fn empty_fragments_produce_valid_svg_with_no_paths() {
        let svg = to_svg::<()>(&[], &no_meta());
        assert!(svg.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
        assert!(svg.contains(r#"xmlns="http://www.w3.org/2000/svg""#));
        assert!(svg.contains(r#"viewBox="0 0 1000 1000""#));
        assert!(!svg.contains("<path"));
        assert!(!svg.contains("<circle"));
    }

    #[test]
    fn fragments_are_fitted_and_flipped() {
        let fragments = vec![frag(&[(0.0, 0.0), (10.0, 0.0)]), frag(&[(0.0, 0.0), (0.0, 10.0)])];
        let svg = to_svg(&fragments, &no_meta());
        assert!(svg.contains(r#"viewBox="0 0 1040 1040""#), "{svg}");
        assert!(svg.contains(r#"d="M20,1020 L1020,1020""#), "{svg}");
        assert!(svg.contains(r#"d="M20,1020 L20,20""#), "{svg}");
        assert!(svg.trim_end().ends_with("</svg>"));
    }

    #[test]
    fn shared_endpoints_are_marked_once() {
        let fragments = vec![
            frag(&[(0.0, 0.0), (5.0, 5.0)]),
            frag(&[(5.0, 5.0), (10.0, 10.0)]),
        ];
        let svg = to_svg(&fragments, &no_meta());
        assert!(svg.contains(r#"id="nodes""#));
        assert_eq!(svg.matches("<circle").count(), 3);
    }

    #[test]
    fn degenerate_fragments_are_skipped() {
        let fragments = vec![frag(&[(1.0, 1.0)]), frag(&[(0.0, 0.0), (2.0, 2.0)])];
        let svg = to_svg(&fragments, &no_meta());
        assert_eq!(svg.matches("<path").count(), 1);
        assert_eq!(svg.matches("<circle").count(), 2);
    }

    // --- Metadata ---

    #[test]
    fn title_and_desc_emitted_before_paths() {
        let meta = SvgMetadata {
            title: Some("roads"),
            description: Some("scale=1000000"),
            ..SvgMetadata::default()
        };
        let svg = to_svg(&[frag(&[(0.0, 0.0), (1.0, 1.0)])], &meta);
        let title_pos = svg.find("<title>roads</title>").unwrap();
        let desc_pos = svg.find("<desc>scale=1000000</desc>").unwrap();
        let path_pos = svg.find("<path").unwrap();
        assert!(title_pos < desc_pos);
        assert!(desc_pos < path_pos);
    }

    #[test]
    fn special_characters_in_title_are_escaped() {
        let meta = SvgMetadata {
            title: Some("A <B> & C"),
            ..SvgMetadata::default()
        };
        let svg = to_svg::<()>(&[], &meta);
        assert!(svg.contains("<title>A &lt;B&gt; &amp; C</title>"));
    }

    #[test]
    fn config_json_is_embedded_in_metadata() {
        let meta = SvgMetadata {
            config_json: Some(r#"{"scale":1000.0,"validate":true}"#),
            ..SvgMetadata::default()
        };
        let svg = to_svg::<()>(&[], &meta);
        assert!(svg.contains("<metadata>"));
        assert!(svg.contains("<snapround:config"));
        assert!(svg.contains("</snapround:config>"));
    }
}
