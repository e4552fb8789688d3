use serde::{Deserialize, Serialize};

use crate::geom::{Vec2, normalize_angle_deg};

/// Rotation applied per scroll step when a participant turns a held cluster.
pub const ROTATION_STEP_DEG: f64 = 5.0;

/// Rigid planar transform: rotation about the axis perpendicular to the
/// table, in degrees counter-clockwise, followed by a translation.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Placement {
    pub position: Vec2,
    pub rotation_deg: f64,
}

impl Placement {
    pub const IDENTITY: Self = Self::new(Vec2::ZERO, 0.0);

    #[must_use]
    pub const fn new(position: Vec2, rotation_deg: f64) -> Self {
        Self {
            position,
            rotation_deg,
        }
    }

    #[must_use]
    pub const fn at(position: Vec2) -> Self {
        Self::new(position, 0.0)
    }

    /// Map a point from this placement's local frame into the parent frame.
    #[must_use]
    pub fn apply(self, local: Vec2) -> Vec2 {
        self.position + local.rotated_deg(self.rotation_deg)
    }

    /// `local` expressed in this placement's parent frame.
    #[must_use]
    pub fn compose(self, local: Placement) -> Placement {
        Placement::new(
            self.apply(local.position),
            normalize_angle_deg(self.rotation_deg + local.rotation_deg),
        )
    }

    /// Inverse of [`Placement::compose`]: the local placement that composes
    /// with `self` to give `world`.
    #[must_use]
    pub fn relative(self, world: Placement) -> Placement {
        Placement::new(
            (world.position - self.position).rotated_deg(-self.rotation_deg),
            normalize_angle_deg(world.rotation_deg - self.rotation_deg),
        )
    }

    /// Rotate by `delta_deg` about `pivot`.
    #[must_use]
    pub fn rotated_about(self, pivot: Vec2, delta_deg: f64) -> Placement {
        Placement::new(
            pivot + (self.position - pivot).rotated_deg(delta_deg),
            normalize_angle_deg(self.rotation_deg + delta_deg),
        )
    }

    #[must_use]
    pub fn translated(self, delta: Vec2) -> Placement {
        Placement::new(self.position + delta, self.rotation_deg)
    }

    /// Turn in place by whole rotation steps; positive is counter-clockwise.
    #[must_use]
    pub fn rotated_by(self, steps: i32) -> Placement {
        Placement::new(
            self.position,
            normalize_angle_deg(self.rotation_deg + f64::from(steps) * ROTATION_STEP_DEG),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::Tolerance;

    fn approx(a: Placement, b: Placement) -> bool {
        Tolerance::LOOSE.approx_eq_vec2(a.position, b.position)
            && crate::geom::angle_delta_deg(a.rotation_deg, b.rotation_deg).abs() < 1e-6
    }

    #[test]
    fn test_relative_inverts_compose() {
        let parent = Placement::new(Vec2::new(3.0, -1.0), 130.0);
        let local = Placement::new(Vec2::new(0.5, 2.0), 250.0);
        let world = parent.compose(local);
        assert!(approx(parent.relative(world), local));
    }

    #[test]
    fn test_rotation_about_pivot_keeps_pivot_fixed() {
        let p = Placement::new(Vec2::new(1.0, 0.0), 0.0);
        let r = p.rotated_about(Vec2::ZERO, 90.0);
        assert!(approx(r, Placement::new(Vec2::new(0.0, 1.0), 90.0)));

        let pinned = p.rotated_about(p.position, 45.0);
        assert_eq!(pinned.position, p.position);
    }

    #[test]
    fn test_rotation_steps_wrap() {
        let p = Placement::IDENTITY.rotated_by(-1);
        assert_eq!(p.rotation_deg, 355.0);
        assert_eq!(p.rotated_by(2).rotation_deg, 5.0);
    }
}
