//! Uniform cubic B-spline evaluation for puzzle edge outlines.
//!
//! A tab shape is described once, as a set of control points running from
//! `(0, 0)` to `(1, 0)` (the canonical curve). [`approximate`] samples that
//! curve and [`map_curve_to_edge`] places the samples on a concrete edge by
//! treating points as complex numbers: multiplying by `target - source`
//! rotates and scales the unit frame onto the edge, adding `source`
//! translates it.
//!
//! Every step is a fixed sequence of floating point operations on the inputs,
//! so two participants that evaluate the same edge get the same polyline.

use num_complex::Complex64;

use super::Vec2;

/// Control points of the canonical tab, in units of 1/12 of the edge length.
///
/// The bump rises on the positive Y side of the `(0,0) -> (1,0)` baseline.
pub const CANONICAL_TAB_CURVE: [(f64, f64); 11] = [
    (0.0, 0.0),
    (2.0, 0.0),
    (6.0, -1.0),
    (4.0, 1.0),
    (4.0, 3.0),
    (6.0, 4.0),
    (8.0, 3.0),
    (8.0, 1.0),
    (6.0, -1.0),
    (10.0, 0.0),
    (12.0, 0.0),
];

const CANONICAL_TAB_NORM: f64 = 1.0 / 12.0;

/// The canonical tab control polygon scaled into the unit frame.
#[must_use]
pub fn canonical_tab_curve() -> Vec<Vec2> {
    CANONICAL_TAB_CURVE
        .iter()
        .map(|&(x, y)| Vec2::new(x, y) * CANONICAL_TAB_NORM)
        .collect()
}

/// Cubic B-spline basis weights at local parameter `t` in `[0, 1)`.
#[must_use]
pub fn bspline_weights(t: f64) -> [f64; 4] {
    let t2 = t * t;
    let t3 = t2 * t;
    let s = 1.0 - t;
    [
        s * s * s / 6.0,
        (3.0 * t3 - 6.0 * t2 + 4.0) / 6.0,
        (-3.0 * t3 + 3.0 * t2 + 3.0 * t + 1.0) / 6.0,
        t3 / 6.0,
    ]
}

/// Sample a clamped uniform cubic B-spline through `points`.
///
/// The control polygon is padded with two copies of its first and last point so
/// the curve is pulled onto both ends. Returns `precision - 1` interior samples;
/// the endpoints themselves are not included. Fewer than three control points
/// (or `precision == 0`) yields an empty curve.
#[must_use]
pub fn approximate(points: &[Vec2], precision: usize) -> Vec<Vec2> {
    if points.len() < 3 || precision == 0 {
        return Vec::new();
    }

    let mut padded = Vec::with_capacity(points.len() + 4);
    padded.push(points[0]);
    padded.push(points[0]);
    padded.extend_from_slice(points);
    padded.push(points[points.len() - 1]);
    padded.push(points[points.len() - 1]);

    let spans = (padded.len() - 4) as f64;
    let mut samples = Vec::with_capacity(precision - 1);
    for i in 1..precision {
        let progress = spans * i as f64 / precision as f64;
        let current = progress.floor();
        let start = current as usize;
        let w = bspline_weights(progress - current);
        let (a, b, c, d) = (
            padded[start],
            padded[start + 1],
            padded[start + 2],
            padded[start + 3],
        );
        samples.push(Vec2::new(
            a.x * w[0] + b.x * w[1] + c.x * w[2] + d.x * w[3],
            a.y * w[0] + b.y * w[1] + c.y * w[2] + d.y * w[3],
        ));
    }

    samples
}

/// Multiply two planar vectors as complex numbers.
#[must_use]
pub fn complex_multiply(a: Vec2, b: Vec2) -> Vec2 {
    (Complex64::from(a) * Complex64::from(b)).into()
}

/// Place unit-frame samples onto the edge `source -> target`.
#[must_use]
pub fn map_curve_to_edge(curve: &[Vec2], source: Vec2, target: Vec2) -> Vec<Vec2> {
    let frame = target - source;
    curve
        .iter()
        .map(|&p| complex_multiply(p, frame) + source)
        .collect()
}
