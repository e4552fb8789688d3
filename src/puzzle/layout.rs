use crate::geom::{EdgeType, Vec2};

use super::piece::{Neighbor, NeighborSlot, Side};

/// Row-major grid of pieces centered on the puzzle origin, rows growing along +Y.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridLayout {
    pub num_pieces: usize,
    pub num_cols: usize,
    pub num_rows: usize,
    /// Full puzzle size in puzzle units.
    pub size: Vec2,
}

impl GridLayout {
    /// Lay out `num_pieces` over a puzzle of `size`; the aspect ratio decides
    /// the column count and the last row may be short.
    #[must_use]
    pub fn new(num_pieces: usize, size: Vec2) -> Self {
        let num_pieces = num_pieces.max(1);
        let aspect = size.x / size.y;
        let cols = (aspect.sqrt() * (num_pieces as f64).sqrt()).floor();
        let num_cols = if cols.is_finite() && cols >= 1.0 {
            (cols as usize).min(num_pieces)
        } else {
            1
        };
        let num_rows = num_pieces.div_ceil(num_cols);

        log::debug!("layout: {num_pieces} pieces as {num_cols} cols x {num_rows} rows");
        Self {
            num_pieces,
            num_cols,
            num_rows,
            size,
        }
    }

    /// Image dimensions scaled so the puzzle's diagonal equals `scale`.
    #[must_use]
    pub fn puzzle_size(image_width: u32, image_height: u32, scale: f64) -> Vec2 {
        let image = Vec2::new(f64::from(image_width), f64::from(image_height));
        let factor = image.length() / scale;
        Vec2::new(image.x / factor, image.y / factor)
    }

    #[must_use]
    pub fn piece_size(&self) -> Vec2 {
        Vec2::new(
            self.size.x / self.num_cols as f64,
            self.size.y / self.num_rows as f64,
        )
    }

    /// `(row, col)` of a piece id.
    #[must_use]
    pub const fn cell(&self, id: usize) -> (usize, usize) {
        (id / self.num_cols, id % self.num_cols)
    }

    #[must_use]
    pub fn center(&self, id: usize) -> Vec2 {
        let (row, col) = self.cell(id);
        let piece = self.piece_size();
        Vec2::new(
            (col as f64 + 0.5) * piece.x - self.size.x * 0.5,
            (row as f64 + 0.5) * piece.y - self.size.y * 0.5,
        )
    }

    /// Base quad of a piece: bottom-left, top-left, top-right, bottom-right.
    ///
    /// Corners come from grid-line coordinates, so pieces sharing a corner
    /// compute the same bits for it.
    #[must_use]
    pub fn corners(&self, id: usize) -> [Vec2; 4] {
        let (row, col) = self.cell(id);
        let x0 = self.grid_x(col);
        let x1 = self.grid_x(col + 1);
        let y0 = self.grid_y(row);
        let y1 = self.grid_y(row + 1);
        [
            Vec2::new(x0, y0),
            Vec2::new(x0, y1),
            Vec2::new(x1, y1),
            Vec2::new(x1, y0),
        ]
    }

    fn grid_x(&self, col: usize) -> f64 {
        col as f64 * self.piece_size().x - self.size.x * 0.5
    }

    fn grid_y(&self, row: usize) -> f64 {
        row as f64 * self.piece_size().y - self.size.y * 0.5
    }

    #[must_use]
    pub fn neighbor(&self, id: usize, side: Side) -> Neighbor {
        let (row, col) = self.cell(id);
        let n = self.num_pieces;
        let exists = match side {
            Side::Left => col > 0,
            Side::Top => row + 1 < self.num_rows && id + self.num_cols < n,
            Side::Right => col + 1 < self.num_cols && id + 1 < n,
            Side::Bottom => row > 0,
        };
        if !exists {
            return Neighbor::None;
        }
        Neighbor::Piece(match side {
            Side::Left => id - 1,
            Side::Top => id + self.num_cols,
            Side::Right => id + 1,
            Side::Bottom => id - self.num_cols,
        })
    }

    /// Slots of a piece in left, top, right, bottom order, shapes unassigned.
    #[must_use]
    pub fn slots(&self, id: usize) -> [NeighborSlot; 4] {
        let center = self.center(id);
        Side::ALL.map(|side| {
            let neighbor = self.neighbor(id, side);
            NeighborSlot {
                neighbor,
                correct_offset: neighbor
                    .id()
                    .map_or(Vec2::ZERO, |other| self.center(other) - center),
                corners: side.corner_indices(),
                edge_type: EdgeType::Unassigned,
            }
        })
    }
}
