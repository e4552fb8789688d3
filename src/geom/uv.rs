use super::Vec2;
use super::mesh::SolidMesh;

/// Texture coordinates for every vertex of a piece solid.
///
/// Vertices are stored relative to the piece's placement `offset`; adding it
/// back gives the position in puzzle space, which is then normalized so the
/// whole puzzle spans `[0, 1]` on both axes. Depth is ignored, so rim vertices
/// share the coordinates of the outline point they were extruded from.
#[must_use]
pub fn project_uvs(mesh: &SolidMesh, offset: Vec2, puzzle_size: Vec2) -> Vec<[f64; 2]> {
    mesh.positions
        .iter()
        .map(|p| project_point(Vec2::new(p[0], p[1]), offset, puzzle_size).to_array())
        .collect()
}

/// Project one piece-local point into normalized image space.
#[must_use]
pub fn project_point(local: Vec2, offset: Vec2, puzzle_size: Vec2) -> Vec2 {
    let p = local + offset;
    Vec2::new(p.x / puzzle_size.x + 0.5, p.y / puzzle_size.y + 0.5)
}

/// Attach projected UVs to `mesh`, replacing any it already had.
pub fn apply_uvs(mesh: &mut SolidMesh, offset: Vec2, puzzle_size: Vec2) {
    let uvs = project_uvs(mesh, offset, puzzle_size);
    mesh.uvs = Some(uvs);
}
