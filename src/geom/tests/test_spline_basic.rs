use crate::geom::{
    Tolerance, Vec2, approximate, bspline_weights, canonical_tab_curve, complex_multiply,
    map_curve_to_edge,
};

#[test]
fn approximate_returns_precision_minus_one_samples() {
    let curve = canonical_tab_curve();
    for precision in [2, 6, 20, 64] {
        assert_eq!(approximate(&curve, precision).len(), precision - 1);
    }
}

#[test]
fn approximate_is_deterministic() {
    let curve = canonical_tab_curve();
    for precision in [7, 20, 64] {
        assert_eq!(approximate(&curve, precision), approximate(&curve, precision));
    }
}

#[test]
fn approximate_rejects_short_control_polygons() {
    let two = [Vec2::ZERO, Vec2::X];
    assert!(approximate(&two, 20).is_empty());
    assert!(approximate(&canonical_tab_curve(), 0).is_empty());
}

#[test]
fn bspline_weights_partition_unity() {
    for step in 0..10 {
        let t = f64::from(step) / 10.0;
        let sum: f64 = bspline_weights(t).iter().sum();
        assert!((sum - 1.0).abs() < 1e-12, "t={t} sum={sum}");
    }
}

#[test]
fn canonical_tab_bulges_on_positive_side() {
    let samples = approximate(&canonical_tab_curve(), 20);

    let first = samples[0];
    assert_eq!(first.y, 0.0);
    assert!(first.x > 0.0 && first.x < 0.1);

    let max_y = samples.iter().map(|p| p.y).fold(f64::MIN, f64::max);
    let min_y = samples.iter().map(|p| p.y).fold(f64::MAX, f64::min);
    assert!(max_y > 0.25 && max_y < 1.0 / 3.0, "max_y={max_y}");
    assert!(min_y > -0.1, "min_y={min_y}");
    assert!(samples.iter().all(|p| p.x > 0.0 && p.x < 1.0));
}

#[test]
fn complex_multiply_rotates_and_scales() {
    let r = complex_multiply(Vec2::new(1.0, 1.0), Vec2::new(0.0, 2.0));
    assert_eq!(r, Vec2::new(-2.0, 2.0));
}

#[test]
fn map_curve_places_unit_frame_on_edge() {
    let source = Vec2::new(1.0, 1.0);
    let target = Vec2::new(1.0, 3.0);
    let mapped = map_curve_to_edge(&[Vec2::ZERO, Vec2::X, Vec2::new(0.5, 0.25)], source, target);

    let tol = Tolerance::DEFAULT;
    assert!(tol.approx_eq_vec2(mapped[0], source));
    assert!(tol.approx_eq_vec2(mapped[1], target));
    // +Y in the unit frame is to the left of source -> target.
    assert!(tol.approx_eq_vec2(mapped[2], Vec2::new(0.5, 2.0)));
}
