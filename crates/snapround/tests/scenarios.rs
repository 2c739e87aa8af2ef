//! Integration test: acceptance cases for snap-rounding, each run through
//! `ValidatingNoder` so a residual crossing fails the test.

#![allow(clippy::unwrap_used, clippy::unreadable_literal, clippy::excessive_precision)]

use snapround::{Coord, Noder, SegmentString, SnapRoundingNoder, ValidatingNoder};

type Fragment = Vec<(f64, f64)>;

fn lines(input: &[&[(f64, f64)]]) -> Vec<SegmentString<usize>> {
    input
        .iter()
        .enumerate()
        .map(|(i, pts)| {
            SegmentString::new(pts.iter().map(|&(x, y)| Coord { x, y }).collect(), i)
        })
        .collect()
}

/// Node `input` at `scale`, panicking if validation fails.
fn node_validated(input: &[&[(f64, f64)]], scale: f64) -> Vec<Fragment> {
    let strings = lines(input);
    let mut noder = ValidatingNoder::new(SnapRoundingNoder::with_scale(scale).unwrap());
    let result = noder.compute_nodes(&strings);
    assert!(result.is_ok(), "noding at scale {scale} failed: {result:?}");
    noder
        .noded_substrings()
        .iter()
        .map(|s| s.coords().iter().map(|c| (c.x, c.y)).collect())
        .collect()
}

/// Orient each fragment so it starts at its smaller end, then sort, so
/// fragment order and direction do not matter.
fn normalized(fragments: &[Fragment]) -> Vec<Fragment> {
    let mut out: Vec<Fragment> = fragments
        .iter()
        .map(|f| {
            let mut f = f.clone();
            let reversed: Fragment = f.iter().rev().copied().collect();
            if cmp_fragment(&reversed, &f).is_lt() {
                f = reversed;
            }
            f
        })
        .collect();
    out.sort_by(cmp_fragment);
    out
}

fn cmp_fragment(a: &Fragment, b: &Fragment) -> std::cmp::Ordering {
    for (p, q) in a.iter().zip(b) {
        let ord = p.0.total_cmp(&q.0).then_with(|| p.1.total_cmp(&q.1));
        if ord.is_ne() {
            return ord;
        }
    }
    a.len().cmp(&b.len())
}

fn assert_same_fragments(actual: &[Fragment], expected: &[&[(f64, f64)]]) {
    let actual = normalized(actual);
    let expected: Vec<Fragment> = expected.iter().map(|f| f.to_vec()).collect();
    let expected = normalized(&expected);
    assert_eq!(
        actual.len(),
        expected.len(),
        "fragment count differs\nactual:   {actual:?}\nexpected: {expected:?}"
    );
    for (a, e) in actual.iter().zip(&expected) {
        let close = a.len() == e.len()
            && a
                .iter()
                .zip(e)
                .all(|(p, q)| (p.0 - q.0).abs() < 1e-9 && (p.1 - q.1).abs() < 1e-9);
        assert!(close, "fragment differs\nactual:   {a:?}\nexpected: {e:?}");
    }
}

/// Node `fragments` again and check nothing changes.
fn assert_renoding_is_stable(fragments: &[Fragment], scale: f64) {
    let input: Vec<&[(f64, f64)]> = fragments.iter().map(Vec::as_slice).collect();
    let again = node_validated(&input, scale);
    assert_same_fragments(&again, &input);
}

#[test]
fn simple_crossing() {
    let out = node_validated(&[&[(1.0, 1.0), (9.0, 2.0)], &[(3.0, 3.0), (3.0, 0.0)]], 1.0);
    assert_same_fragments(
        &out,
        &[
            &[(1.0, 1.0), (3.0, 1.0)],
            &[(3.0, 1.0), (9.0, 2.0)],
            &[(3.0, 3.0), (3.0, 1.0)],
            &[(3.0, 1.0), (3.0, 0.0)],
        ],
    );
    assert_renoding_is_stable(&out, 1.0);
}

#[test]
fn horizontal_lines_with_middle_node() {
    let out = node_validated(
        &[
            &[(2.5117493, 49.0278625), (2.5144958, 49.0278625)],
            &[
                (2.511749, 49.027863),
                (2.513123, 49.027863),
                (2.514496, 49.027863),
            ],
        ],
        1_000_000.0,
    );
    assert_same_fragments(
        &out,
        &[
            &[(2.511749, 49.027863), (2.513123, 49.027863)],
            &[(2.511749, 49.027863), (2.513123, 49.027863)],
            &[(2.513123, 49.027863), (2.514496, 49.027863)],
            &[(2.513123, 49.027863), (2.514496, 49.027863)],
        ],
    );
}

#[test]
fn slant_and_horizontal_line_with_middle_node() {
    let out = node_validated(
        &[
            &[
                (0.1565552, 49.5277405),
                (0.1579285, 49.5277405),
                (0.1593018, 49.5277405),
            ],
            &[(0.1568985, 49.5280838), (0.1589584, 49.5273972)],
        ],
        1_000_000.0,
    );
    assert_same_fragments(
        &out,
        &[
            &[(0.156555, 49.527741), (0.157928, 49.527741)],
            &[(0.156899, 49.528084), (0.157928, 49.527741)],
            &[(0.157928, 49.527741), (0.157929, 49.527741)],
            &[(0.157928, 49.527741), (0.157929, 49.527741)],
            &[(0.157929, 49.527741), (0.158958, 49.527397)],
            &[(0.157929, 49.527741), (0.159302, 49.527741)],
        ],
    );
    assert_renoding_is_stable(&out, 1_000_000.0);
}

#[test]
fn nearby_corner() {
    let out = node_validated(
        &[
            &[(0.2, 1.1), (1.6, 1.4), (1.9, 2.9)],
            &[(0.9, 0.9), (2.3, 1.7)],
        ],
        1.0,
    );
    assert_same_fragments(
        &out,
        &[
            &[(0.0, 1.0), (1.0, 1.0)],
            &[(1.0, 1.0), (2.0, 1.0)],
            &[(1.0, 1.0), (2.0, 1.0)],
            &[(2.0, 1.0), (2.0, 2.0)],
            &[(2.0, 1.0), (2.0, 2.0)],
            &[(2.0, 2.0), (2.0, 3.0)],
        ],
    );
    assert_renoding_is_stable(&out, 1.0);
}

#[test]
fn nearby_shape() {
    let out = node_validated(
        &[
            &[(1.3, 0.1), (2.4, 3.9)],
            &[(0.0, 1.0), (1.53, 1.48), (0.0, 4.0)],
        ],
        1.0,
    );
    assert_same_fragments(
        &out,
        &[
            &[(1.0, 0.0), (2.0, 1.0)],
            &[(2.0, 1.0), (2.0, 4.0)],
            &[(0.0, 1.0), (2.0, 1.0)],
            &[(2.0, 1.0), (0.0, 4.0)],
        ],
    );
}

#[test]
fn intersection_on_grid_corner() {
    node_validated(
        &[
            &[(4.30166242, 45.53438188), (4.30166243, 45.53438187)],
            &[(4.3011475, 45.5328371), (4.3018341, 45.5348969)],
        ],
        100_000_000.0,
    );
}

#[test]
fn vertex_crosses_line() {
    node_validated(
        &[
            &[(2.2164917, 48.8864136), (2.2175217, 48.8867569)],
            &[(2.2175217, 48.8867569), (2.2182083, 48.8874435)],
            &[(2.2182083, 48.8874435), (2.2161484, 48.8853836)],
        ],
        1_000_000.0,
    );
}

#[test]
fn vertex_crosses_line_at_full_precision() {
    node_validated(
        &[
            &[
                (2.276916574988164, 49.06082147500638),
                (2.2769165, 49.0608215),
            ],
            &[(2.2769165, 49.0608215), (2.2755432, 49.0608215)],
            &[
                (2.2762299, 49.0615082),
                (2.276916574988164, 49.06082147500638),
            ],
        ],
        1_000_000.0,
    );
}

#[test]
fn short_line_node_is_added() {
    let out = node_validated(
        &[&[
            (2.1279144, 48.8445282),
            (2.126884443750796, 48.84555818124935),
            (2.1268845, 48.8455582),
            (2.1268845, 48.8462448),
        ]],
        1_000_000.0,
    );
    assert_same_fragments(
        &out,
        &[
            &[(2.127914, 48.844528), (2.126885, 48.845558)],
            &[(2.126885, 48.845558), (2.126884, 48.845558)],
            &[(2.126884, 48.845558), (2.126885, 48.845558)],
            &[(2.126885, 48.845558), (2.126885, 48.846245)],
        ],
    );
    assert_renoding_is_stable(&out, 1_000_000.0);
}

#[test]
fn diagonal_right_up_is_noded() {
    node_validated(
        &[
            &[(0.0, 0.0), (10.0, 10.0)],
            &[(0.0, 2.0), (4.55, 5.4), (9.0, 10.0)],
        ],
        1.0,
    );
}

#[test]
fn diagonal_left_up_is_noded() {
    node_validated(
        &[
            &[(10.0, 0.0), (0.0, 10.0)],
            &[(10.0, 2.0), (5.45, 5.45), (1.0, 10.0)],
        ],
        1.0,
    );
}

#[test]
fn diagonal_at_full_precision_is_noded() {
    node_validated(
        &[
            &[(2.45167, 48.96709), (2.45768, 48.9731)],
            &[
                (2.4526978, 48.968811),
                (2.4537277, 48.9691544),
                (2.4578476, 48.9732742),
            ],
        ],
        100_000.0,
    );
}

#[test]
fn near_vertex_is_noded() {
    node_validated(
        &[
            &[
                (2.4829102, 48.8726807),
                (2.4830818249999997, 48.873195575),
                (2.4839401, 48.8723373),
            ],
            &[(2.4829102, 48.8726807), (2.4832535, 48.8737106)],
        ],
        100_000_000.0,
    );
}

#[test]
fn noding_is_repeatable_on_one_noder() {
    let strings = lines(&[&[(1.0, 1.0), (9.0, 2.0)], &[(3.0, 3.0), (3.0, 0.0)]]);
    let mut noder = SnapRoundingNoder::with_scale(1.0).unwrap();
    noder.compute_nodes(&strings).unwrap();
    let first = noder.noded_substrings();
    noder.compute_nodes(&strings).unwrap();
    assert_eq!(first, noder.noded_substrings());
}

#[test]
fn output_touching_a_pixel_corner_is_stable() {
    // The rounded second line passes the corner of the pixel at (-7, 28).
    let out = node_validated(
        &[
            &[(0.0, 44.117), (-24.665, 1.185), (-7.223, 28.391)],
            &[(-47.589, -10.829), (0.0, 36.239)],
        ],
        1.0,
    );
    assert_renoding_is_stable(&out, 1.0);
}

#[test]
fn rounded_segment_drifting_into_a_pixel_is_stable() {
    let out = node_validated(&[&[(0.0, -0.4), (2.0, 0.6)], &[(1.0, 1.2), (1.0, 5.0)]], 1.0);
    assert_same_fragments(
        &out,
        &[
            &[(0.0, 0.0), (1.0, 1.0)],
            &[(1.0, 1.0), (2.0, 1.0)],
            &[(1.0, 1.0), (1.0, 5.0)],
        ],
    );
    assert_renoding_is_stable(&out, 1.0);
}
