mod core;
mod diagnostics;
mod edge;
mod extrusion;
mod mesh;
mod spline;
mod triangulation;
mod uv;

pub use core::{Tolerance, Vec2, Vec3, angle_delta_deg, normalize_angle_deg};
pub use diagnostics::MeshDiagnostics;
pub use edge::{EdgeError, EdgeType, MAX_TAB_CROSS_RATIO, PieceEdge};
pub use extrusion::{
    ExtrusionError, ExtrusionMode, extrude_flat_piece, extrude_flat_piece_no_split, extrude_outline,
};
pub use mesh::{SolidMesh, dedup_polygon};
pub use spline::{
    CANONICAL_TAB_CURVE, approximate, bspline_weights, canonical_tab_curve, complex_multiply,
    map_curve_to_edge,
};
pub use triangulation::{
    EarClipTriangulator, PolygonTriangulator, TriangulationError, is_simple_polygon, signed_area,
};
pub use uv::{apply_uvs, project_point, project_uvs};

#[cfg(test)]
mod tests;
