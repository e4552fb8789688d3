use crate::geom::{
    EarClipTriangulator, EdgeType, ExtrusionError, ExtrusionMode, MeshDiagnostics, PieceEdge,
    PolygonTriangulator, Tolerance, Vec2, dedup_polygon, extrude_outline,
};

fn clockwise_square() -> Vec<Vec2> {
    vec![
        Vec2::new(0.0, 0.0),
        Vec2::new(0.0, 1.0),
        Vec2::new(1.0, 1.0),
        Vec2::new(1.0, 0.0),
    ]
}

fn tabbed_outline() -> Vec<Vec2> {
    let corners = clockwise_square();
    let types = [EdgeType::Blank, EdgeType::Tab, EdgeType::Tab, EdgeType::Straight];
    let mut points = Vec::new();
    for (slot, edge_type) in types.into_iter().enumerate() {
        let edge = PieceEdge::build(corners[slot], corners[(slot + 1) % 4], edge_type, 12).unwrap();
        points.extend(edge.points);
    }
    dedup_polygon(&points, Tolerance::WELD)
}

#[test]
fn seam_split_counts_follow_outline_and_triangulation() {
    let outline = tabbed_outline();
    let triangles = EarClipTriangulator::default().triangulate(&outline).unwrap();

    let mesh = extrude_outline(&outline, &triangles, 0.1, ExtrusionMode::SeamSplit).unwrap();
    mesh.validate().expect("mesh validate");

    let p = outline.len();
    assert_eq!(mesh.vertex_count(), 4 * p);
    assert_eq!(mesh.triangle_count(), 2 * triangles.len() / 3 + 2 * p);
}

#[test]
fn seam_shared_solid_is_watertight() {
    let outline = tabbed_outline();
    let triangles = EarClipTriangulator::default().triangulate(&outline).unwrap();

    let mesh = extrude_outline(&outline, &triangles, 0.25, ExtrusionMode::SeamShared).unwrap();
    assert_eq!(mesh.vertex_count(), 2 * outline.len());

    let diag = MeshDiagnostics::from_mesh(&mesh);
    assert!(diag.is_valid_solid(), "{diag}");
    assert_eq!(diag.degenerate_triangle_count, 0);
}

#[test]
fn seam_split_solid_has_open_rim_seams() {
    let outline = clockwise_square();
    let triangles = EarClipTriangulator::default().triangulate(&outline).unwrap();
    let mesh = extrude_outline(&outline, &triangles, 1.0, ExtrusionMode::SeamSplit).unwrap();

    let diag = MeshDiagnostics::from_mesh(&mesh);
    // Each cap boundary and each rim boundary is open: four loops of four edges.
    assert_eq!(diag.open_edge_count, 16);
    assert!(diag.is_manifold());
}

#[test]
fn top_cap_faces_up_and_rim_faces_out() {
    let outline = clockwise_square();
    let triangles = EarClipTriangulator::default().triangulate(&outline).unwrap();
    let mut mesh = extrude_outline(&outline, &triangles, 0.5, ExtrusionMode::SeamSplit).unwrap();
    mesh.recalculate_normals();
    let normals = mesh.normals.as_ref().unwrap();

    for (pos, n) in mesh.positions.iter().zip(normals).take(4) {
        assert_eq!(pos[2], 0.0);
        assert!((n[2] - 1.0).abs() < 1e-9, "top normal {n:?}");
    }
    for (pos, n) in mesh.positions.iter().zip(normals).skip(12) {
        assert_eq!(pos[2], -0.5);
        assert!((n[2] + 1.0).abs() < 1e-9, "bottom normal {n:?}");
    }
    // Rim normals point away from the square's center.
    for (pos, n) in mesh.positions.iter().zip(normals).skip(4).take(8) {
        let outward = (pos[0] - 0.5) * n[0] + (pos[1] - 0.5) * n[1];
        assert!(outward > 0.0, "rim normal {n:?} at {pos:?}");
        assert!(n[2].abs() < 1e-9);
    }
}

#[test]
fn extrusion_rejects_bad_inputs() {
    let outline = clockwise_square();
    let triangles = [0, 1, 2, 0, 2, 3];

    assert_eq!(
        extrude_outline(&outline[..2], &triangles, 0.1, ExtrusionMode::SeamSplit),
        Err(ExtrusionError::NotEnoughPoints { count: 2 })
    );
    assert_eq!(
        extrude_outline(&outline, &[0, 1, 9], 0.1, ExtrusionMode::SeamShared),
        Err(ExtrusionError::InvalidTriangles { vertex_count: 4 })
    );
    assert!(matches!(
        extrude_outline(&outline, &triangles, 0.0, ExtrusionMode::SeamSplit),
        Err(ExtrusionError::InvalidThickness { .. })
    ));
}
