use crate::geom::EdgeType;

use super::noise::NoiseField;
use super::piece::{Neighbor, NeighborSlot, Side};

/// Noise index used for one slot of one piece.
#[must_use]
pub const fn noise_index(piece: usize, side: Side) -> usize {
    piece * 4 + side.index()
}

/// Resolve every slot of every piece to `Straight`, `Tab` or `Blank`.
///
/// Pieces are visited in id order and slots in left, top, right, bottom
/// order. The first visit of a shared seam decides it from the noise field
/// and writes the complement into the neighbor's mirror slot; the later visit
/// finds it assigned and leaves it alone.
pub fn assign_edge_types(slots: &mut [[NeighborSlot; 4]], noise: &NoiseField) {
    for piece in 0..slots.len() {
        for side in Side::ALL {
            let slot = slots[piece][side.index()];
            match slot.neighbor {
                Neighbor::None => slots[piece][side.index()].edge_type = EdgeType::Straight,
                Neighbor::Piece(other) => {
                    if slot.edge_type != EdgeType::Unassigned {
                        continue;
                    }
                    let edge_type = if noise.sample(noise_index(piece, side)) >= 0.5 {
                        EdgeType::Tab
                    } else {
                        EdgeType::Blank
                    };
                    let mirror = &mut slots[other][side.opposite().index()];
                    debug_assert_eq!(mirror.neighbor, Neighbor::Piece(piece));
                    mirror.edge_type = edge_type.complement();
                    slots[piece][side.index()].edge_type = edge_type;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::Vec2;
    use crate::puzzle::layout::GridLayout;

    fn assigned(num_pieces: usize, seed: u64) -> (GridLayout, Vec<[NeighborSlot; 4]>) {
        let layout = GridLayout::new(num_pieces, Vec2::new(4.0, 3.0));
        let mut slots: Vec<_> = (0..num_pieces).map(|id| layout.slots(id)).collect();
        assign_edge_types(&mut slots, &NoiseField::generate(seed, 16, 16));
        (layout, slots)
    }

    #[test]
    fn test_no_slot_left_unassigned() {
        let (_, slots) = assigned(23, 3);
        for piece in &slots {
            for slot in piece {
                assert_ne!(slot.edge_type, EdgeType::Unassigned);
                assert_eq!(slot.neighbor.is_boundary(), slot.edge_type == EdgeType::Straight);
            }
        }
    }

    #[test]
    fn test_seams_are_complementary() {
        let (_, slots) = assigned(30, 11);
        for (piece, piece_slots) in slots.iter().enumerate() {
            for side in Side::ALL {
                let slot = piece_slots[side.index()];
                if let Neighbor::Piece(other) = slot.neighbor {
                    let mirror = slots[other][side.opposite().index()];
                    assert_eq!(mirror.neighbor, Neighbor::Piece(piece));
                    assert_eq!(mirror.edge_type, slot.edge_type.complement());
                    assert!(slot.edge_type.is_shaped());
                }
            }
        }
    }

    #[test]
    fn test_assignment_is_deterministic() {
        let (_, a) = assigned(20, 5);
        let (_, b) = assigned(20, 5);
        assert_eq!(a, b);
    }
}
