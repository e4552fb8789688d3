use serde::{Deserialize, Serialize};

use crate::config::PuzzleConfig;
use crate::geom::{
    EdgeError, EdgeType, ExtrusionMode, MAX_TAB_CROSS_RATIO, PieceEdge, PolygonTriangulator,
    SolidMesh, Tolerance, Vec2, apply_uvs, dedup_polygon, extrude_outline,
};

use super::PuzzleError;

/// Side of a piece, in the fixed slot order used everywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Side {
    Left,
    Top,
    Right,
    Bottom,
}

impl Side {
    pub const ALL: [Side; 4] = [Side::Left, Side::Top, Side::Right, Side::Bottom];

    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Side::Left => 0,
            Side::Top => 1,
            Side::Right => 2,
            Side::Bottom => 3,
        }
    }

    /// The side the neighbor across this one uses for the shared seam.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Side::Left => Side::Right,
            Side::Top => Side::Bottom,
            Side::Right => Side::Left,
            Side::Bottom => Side::Top,
        }
    }

    /// Indices into the piece's corner quad bounding this side, in clockwise order.
    ///
    /// Corners are bottom-left, top-left, top-right, bottom-right.
    #[must_use]
    pub const fn corner_indices(self) -> (usize, usize) {
        match self {
            Side::Left => (0, 1),
            Side::Top => (1, 2),
            Side::Right => (2, 3),
            Side::Bottom => (3, 0),
        }
    }
}

/// What lies across one side of a piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Neighbor {
    /// Puzzle boundary.
    #[default]
    None,
    Piece(usize),
}

impl Neighbor {
    #[must_use]
    pub const fn id(self) -> Option<usize> {
        match self {
            Neighbor::None => None,
            Neighbor::Piece(id) => Some(id),
        }
    }

    #[must_use]
    pub const fn is_boundary(self) -> bool {
        matches!(self, Neighbor::None)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NeighborSlot {
    pub neighbor: Neighbor,
    /// Neighbor's center minus this piece's center in the solved layout.
    pub correct_offset: Vec2,
    /// Corner indices bounding this side.
    pub corners: (usize, usize),
    pub edge_type: EdgeType,
}

/// Immutable reference data for one piece.
#[derive(Debug, Clone, PartialEq)]
pub struct PieceRecord {
    pub id: usize,
    /// Center of the piece's cell in puzzle space.
    pub center: Vec2,
    pub slots: [NeighborSlot; 4],
    /// Base quad in puzzle space: bottom-left, top-left, top-right, bottom-right.
    pub corners: [Vec2; 4],
    /// Grid cell size shared by every piece; bounds how far tabs reach across a seam.
    pub cell_size: Vec2,
    /// Visual solid, in coordinates relative to `center`.
    pub mesh: SolidMesh,
    /// Seam-shared collision solid, relative to `center`.
    pub collision_mesh: SolidMesh,
}

impl PieceRecord {
    /// Build both solids for a piece whose slots are fully assigned.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn build(
        id: usize,
        center: Vec2,
        corners: [Vec2; 4],
        cell_size: Vec2,
        slots: [NeighborSlot; 4],
        config: &PuzzleConfig,
        puzzle_size: Vec2,
        triangulator: &dyn PolygonTriangulator,
    ) -> Result<Self, PuzzleError> {
        let outline = local_outline(&corners, cell_size, &slots, center, config.mesh_detail)?;
        let triangles = triangulator.triangulate(&outline)?;
        let mut mesh =
            extrude_outline(&outline, &triangles, config.thickness, ExtrusionMode::SeamSplit)?;
        apply_uvs(&mut mesh, center, puzzle_size);
        mesh.recalculate_normals();

        let collider_outline =
            local_outline(&corners, cell_size, &slots, center, config.collider_detail)?;
        let collider_triangles = triangulator.triangulate(&collider_outline)?;
        let collision_mesh = extrude_outline(
            &collider_outline,
            &collider_triangles,
            config.thickness,
            ExtrusionMode::SeamShared,
        )?;

        log::debug!(
            "piece {id}: outline {} pts, visual V:{} T:{}, collision V:{} T:{}",
            outline.len(),
            mesh.vertex_count(),
            mesh.triangle_count(),
            collision_mesh.vertex_count(),
            collision_mesh.triangle_count()
        );

        Ok(Self {
            id,
            center,
            slots,
            corners,
            cell_size,
            mesh,
            collision_mesh,
        })
    }

    #[must_use]
    pub fn slot(&self, side: Side) -> &NeighborSlot {
        &self.slots[side.index()]
    }

    /// Embedded polyline of one side, in puzzle space.
    pub fn edge(&self, side: Side, precision: usize) -> Result<PieceEdge, EdgeError> {
        side_edge(&self.corners, self.cell_size, side, self.slot(side), precision)
    }

    /// Closed clockwise outline in puzzle space.
    pub fn outline(&self, precision: usize) -> Result<Vec<Vec2>, EdgeError> {
        outline(&self.corners, self.cell_size, &self.slots, precision)
    }
}

fn side_edge(
    corners: &[Vec2; 4],
    cell_size: Vec2,
    side: Side,
    slot: &NeighborSlot,
    precision: usize,
) -> Result<PieceEdge, EdgeError> {
    let (a, b) = slot.corners;
    let across = match side {
        Side::Left | Side::Right => cell_size.x,
        Side::Top | Side::Bottom => cell_size.y,
    };
    PieceEdge::build_limited(
        corners[a],
        corners[b],
        slot.edge_type,
        precision,
        across * MAX_TAB_CROSS_RATIO,
    )
}

fn outline(
    corners: &[Vec2; 4],
    cell_size: Vec2,
    slots: &[NeighborSlot; 4],
    precision: usize,
) -> Result<Vec<Vec2>, EdgeError> {
    let mut points = Vec::new();
    for (side, slot) in Side::ALL.into_iter().zip(slots) {
        points.extend(side_edge(corners, cell_size, side, slot, precision)?.points);
    }
    Ok(dedup_polygon(&points, Tolerance::WELD))
}

fn local_outline(
    corners: &[Vec2; 4],
    cell_size: Vec2,
    slots: &[NeighborSlot; 4],
    center: Vec2,
    precision: usize,
) -> Result<Vec<Vec2>, EdgeError> {
    Ok(outline(corners, cell_size, slots, precision)?
        .into_iter()
        .map(|p| p - center)
        .collect())
}
