use serde::{Deserialize, Serialize};

use super::Vec2;
use super::mesh::SolidMesh;

/// How cap and rim faces share vertices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ExtrusionMode {
    /// Rim faces get their own copies of the outline vertices, so shading is
    /// hard along the top and bottom rim.
    #[default]
    SeamSplit,
    /// Rim and caps share vertices; half the vertex count, used for collision.
    SeamShared,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExtrusionError {
    #[error("outline requires at least 3 points, got {count}")]
    NotEnoughPoints { count: usize },
    #[error("triangle indices are not a valid triangle list over {vertex_count} outline points")]
    InvalidTriangles { vertex_count: usize },
    #[error("thickness must be finite and positive, got {thickness}")]
    InvalidThickness { thickness: f64 },
}

/// Extrude a clockwise outline and its cap triangulation into a closed slab.
///
/// The top cap sits at `z = 0` and faces `+Z`; the bottom cap sits at
/// `z = -thickness`. `triangles` must index into `outline` and keep its
/// clockwise winding.
pub fn extrude_outline(
    outline: &[Vec2],
    triangles: &[u32],
    thickness: f64,
    mode: ExtrusionMode,
) -> Result<SolidMesh, ExtrusionError> {
    match mode {
        ExtrusionMode::SeamSplit => extrude_flat_piece(outline, triangles, thickness),
        ExtrusionMode::SeamShared => extrude_flat_piece_no_split(outline, triangles, thickness),
    }
}

fn validate_inputs(outline: &[Vec2], triangles: &[u32], thickness: f64) -> Result<(), ExtrusionError> {
    if outline.len() < 3 {
        return Err(ExtrusionError::NotEnoughPoints {
            count: outline.len(),
        });
    }
    let n = outline.len();
    if triangles.is_empty()
        || triangles.len() % 3 != 0
        || triangles.iter().any(|&i| i as usize >= n)
    {
        return Err(ExtrusionError::InvalidTriangles { vertex_count: n });
    }
    if !thickness.is_finite() || thickness <= 0.0 {
        return Err(ExtrusionError::InvalidThickness { thickness });
    }
    Ok(())
}

// Vertex blocks, each `n` long:
//   [0, n)    top cap
//   [n, 2n)   top rim
//   [2n, 3n)  bottom rim
//   [3n, 4n)  bottom cap
pub fn extrude_flat_piece(
    outline: &[Vec2],
    triangles: &[u32],
    thickness: f64,
) -> Result<SolidMesh, ExtrusionError> {
    validate_inputs(outline, triangles, thickness)?;
    let n = outline.len();
    let nv = n as u32;

    let mut positions = Vec::with_capacity(n * 4);
    for z in [0.0, 0.0, -thickness, -thickness] {
        positions.extend(outline.iter().map(|p| p.extend(z).to_array()));
    }

    let mut indices = Vec::with_capacity(triangles.len() * 2 + n * 6);
    push_reversed(&mut indices, triangles);
    for i in 0..nv {
        let next = (i + 1) % nv;
        indices.extend_from_slice(&[i + nv, next + 2 * nv, i + 2 * nv]);
        indices.extend_from_slice(&[i + nv, next + nv, next + 2 * nv]);
    }
    indices.extend(triangles.iter().map(|&i| i + 3 * nv));

    Ok(SolidMesh::new(positions, indices))
}

// Vertex blocks, each `n` long:
//   [0, n)   top
//   [n, 2n)  bottom
pub fn extrude_flat_piece_no_split(
    outline: &[Vec2],
    triangles: &[u32],
    thickness: f64,
) -> Result<SolidMesh, ExtrusionError> {
    validate_inputs(outline, triangles, thickness)?;
    let n = outline.len();
    let nv = n as u32;

    let mut positions = Vec::with_capacity(n * 2);
    for z in [0.0, -thickness] {
        positions.extend(outline.iter().map(|p| p.extend(z).to_array()));
    }

    let mut indices = Vec::with_capacity(triangles.len() * 2 + n * 6);
    push_reversed(&mut indices, triangles);
    for i in 0..nv {
        let next = (i + 1) % nv;
        indices.extend_from_slice(&[i, next + nv, i + nv]);
        indices.extend_from_slice(&[i, next, next + nv]);
    }
    indices.extend(triangles.iter().map(|&i| i + nv));

    Ok(SolidMesh::new(positions, indices))
}

fn push_reversed(indices: &mut Vec<u32>, triangles: &[u32]) {
    for tri in triangles.chunks_exact(3) {
        indices.extend_from_slice(&[tri[2], tri[1], tri[0]]);
    }
}
