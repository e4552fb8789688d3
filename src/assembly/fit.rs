use serde::{Deserialize, Serialize};

use crate::geom::{Vec2, angle_delta_deg};

use super::transform::Placement;

/// Snap tolerances for the fit test.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitThresholds {
    /// Degrees; bounds both the rotation mismatch and the direction error.
    pub rotation_deg: f64,
    /// Puzzle units; bounds the distance error.
    pub position: f64,
}

impl Default for FitThresholds {
    fn default() -> Self {
        Self {
            rotation_deg: 7.0,
            position: 0.1,
        }
    }
}

/// Whether piece `q` sits where it belongs relative to piece `p`.
///
/// `p` and `q` are world placements; `correct_offset` is `q`'s solved center
/// minus `p`'s. The rotations must agree, the center distance must match the
/// solved distance, and the direction from `p` to `q`, seen from `p`'s frame,
/// must match the solved direction.
#[must_use]
pub fn fits(p: Placement, q: Placement, correct_offset: Vec2, thresholds: FitThresholds) -> bool {
    let rotation_error = angle_delta_deg(q.rotation_deg, p.rotation_deg).abs();
    if rotation_error > thresholds.rotation_deg {
        log::debug!("fit rejected: rotation off by {rotation_error:.2} deg");
        return false;
    }

    let delta = q.position - p.position;
    let distance_error = (delta.length() - correct_offset.length()).abs();
    if distance_error > thresholds.position {
        log::debug!("fit rejected: distance off by {distance_error:.4}");
        return false;
    }

    let local = delta.rotated_deg(-p.rotation_deg);
    match local.angle_between_deg(correct_offset) {
        Some(direction_error) if direction_error <= thresholds.rotation_deg => true,
        Some(direction_error) => {
            log::debug!("fit rejected: direction off by {direction_error:.2} deg");
            false
        }
        None => false,
    }
}
