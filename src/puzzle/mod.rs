//! Piece generation: grid layout, edge shapes and per-piece solids.
//!
//! Generation runs once on the authority and is reproducible everywhere:
//! the same config, image size and noise field produce the same pieces on
//! every participant, so replicas rebuild geometry locally instead of
//! receiving meshes.

mod edges;
mod layout;
mod noise;
mod piece;

use thiserror::Error;

use crate::config::{ConfigError, PuzzleConfig};
use crate::geom::{
    EarClipTriangulator, EdgeError, ExtrusionError, PolygonTriangulator, TriangulationError, Vec2,
};

pub use edges::{assign_edge_types, noise_index};
pub use layout::GridLayout;
pub use noise::NoiseField;
pub use piece::{Neighbor, NeighborSlot, PieceRecord, Side};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

#[derive(Debug, Error)]
pub enum PuzzleError {
    #[error("no piece with id {id}")]
    NotFound { id: usize },
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("edge construction failed: {0}")]
    Edge(#[from] EdgeError),
    #[error("outline triangulation failed: {0}")]
    Triangulation(#[from] TriangulationError),
    #[error("extrusion failed: {0}")]
    Extrusion(#[from] ExtrusionError),
}

/// Read-only registry of generated pieces.
#[derive(Debug, Clone)]
pub struct Puzzle {
    config: PuzzleConfig,
    layout: GridLayout,
    pieces: Vec<PieceRecord>,
}

impl Puzzle {
    /// Generate all pieces for an image of `image_size` pixels.
    pub fn generate(
        config: &PuzzleConfig,
        image_size: (u32, u32),
        noise: &NoiseField,
    ) -> Result<Self, PuzzleError> {
        Self::generate_with_triangulator(config, image_size, noise, &EarClipTriangulator::default())
    }

    pub fn generate_with_triangulator(
        config: &PuzzleConfig,
        image_size: (u32, u32),
        noise: &NoiseField,
        triangulator: &dyn PolygonTriangulator,
    ) -> Result<Self, PuzzleError> {
        config.validate()?;
        let size = GridLayout::puzzle_size(image_size.0, image_size.1, config.scale);
        let layout = GridLayout::new(config.num_pieces, size);

        let mut slots: Vec<[NeighborSlot; 4]> =
            (0..layout.num_pieces).map(|id| layout.slots(id)).collect();
        assign_edge_types(&mut slots, noise);

        let pieces = build_pieces(&layout, slots, config, triangulator)?;
        log::info!(
            "generated {} pieces ({} x {}), puzzle size {:.3} x {:.3}",
            pieces.len(),
            layout.num_cols,
            layout.num_rows,
            size.x,
            size.y
        );

        Ok(Self {
            config: config.clone(),
            layout,
            pieces,
        })
    }

    /// Look up a piece; unknown ids are an explicit `NotFound`.
    pub fn piece(&self, id: usize) -> Result<&PieceRecord, PuzzleError> {
        self.pieces.get(id).ok_or(PuzzleError::NotFound { id })
    }

    #[must_use]
    pub fn pieces(&self) -> &[PieceRecord] {
        &self.pieces
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pieces.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }

    #[must_use]
    pub const fn layout(&self) -> &GridLayout {
        &self.layout
    }

    #[must_use]
    pub const fn size(&self) -> Vec2 {
        self.layout.size
    }

    #[must_use]
    pub const fn config(&self) -> &PuzzleConfig {
        &self.config
    }
}

#[cfg(feature = "parallel")]
fn build_pieces(
    layout: &GridLayout,
    slots: Vec<[NeighborSlot; 4]>,
    config: &PuzzleConfig,
    triangulator: &dyn PolygonTriangulator,
) -> Result<Vec<PieceRecord>, PuzzleError> {
    slots
        .into_par_iter()
        .enumerate()
        .map(|(id, slots)| build_piece(layout, id, slots, config, triangulator))
        .collect()
}

#[cfg(not(feature = "parallel"))]
fn build_pieces(
    layout: &GridLayout,
    slots: Vec<[NeighborSlot; 4]>,
    config: &PuzzleConfig,
    triangulator: &dyn PolygonTriangulator,
) -> Result<Vec<PieceRecord>, PuzzleError> {
    slots
        .into_iter()
        .enumerate()
        .map(|(id, slots)| build_piece(layout, id, slots, config, triangulator))
        .collect()
}

fn build_piece(
    layout: &GridLayout,
    id: usize,
    slots: [NeighborSlot; 4],
    config: &PuzzleConfig,
    triangulator: &dyn PolygonTriangulator,
) -> Result<PieceRecord, PuzzleError> {
    PieceRecord::build(
        id,
        layout.center(id),
        layout.corners(id),
        layout.piece_size(),
        slots,
        config,
        layout.size,
        triangulator,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::{EdgeType, MeshDiagnostics};

    fn small_puzzle(num_pieces: usize) -> Puzzle {
        let config = PuzzleConfig::default().with_num_pieces(num_pieces);
        Puzzle::generate(&config, (400, 300), &NoiseField::generate(42, 16, 16)).unwrap()
    }

    #[test]
    fn test_unknown_piece_is_not_found() {
        let puzzle = small_puzzle(4);
        assert!(puzzle.piece(3).is_ok());
        assert!(matches!(puzzle.piece(4), Err(PuzzleError::NotFound { id: 4 })));
    }

    #[test]
    fn test_meshes_are_valid_solids() {
        let puzzle = small_puzzle(9);
        for piece in puzzle.pieces() {
            piece.mesh.validate().unwrap();
            piece.collision_mesh.validate().unwrap();
            assert!(piece.mesh.uvs.is_some());
            assert!(piece.mesh.normals.is_some());

            let diag = MeshDiagnostics::from_mesh(&piece.collision_mesh);
            assert!(diag.is_valid_solid(), "piece {}: {diag}", piece.id);
            assert!(piece.collision_mesh.vertex_count() < piece.mesh.vertex_count());
        }
    }

    #[test]
    fn test_uvs_stay_in_unit_square() {
        let puzzle = small_puzzle(9);
        for piece in puzzle.pieces() {
            assert!(piece.slots.iter().all(|s| s.edge_type != EdgeType::Unassigned));
            // Tabs sit on inner seams only, so nothing crosses the outer border.
            for uv in piece.mesh.uvs.as_ref().unwrap() {
                assert!(uv[0] >= -1e-9 && uv[0] <= 1.0 + 1e-9, "piece {}: {uv:?}", piece.id);
                assert!(uv[1] >= -1e-9 && uv[1] <= 1.0 + 1e-9, "piece {}: {uv:?}", piece.id);
            }
        }
    }

    #[test]
    fn test_generation_is_reproducible() {
        let a = small_puzzle(4);
        let b = small_puzzle(4);
        assert_eq!(a.pieces(), b.pieces());
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = PuzzleConfig {
            thickness: 0.0,
            ..PuzzleConfig::default()
        };
        let result = Puzzle::generate(&config, (10, 10), &NoiseField::generate(0, 4, 4));
        assert!(matches!(result, Err(PuzzleError::Config(_))));
    }
}
