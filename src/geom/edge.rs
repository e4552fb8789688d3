use serde::{Deserialize, Serialize};

use super::Vec2;
use super::spline::{approximate, canonical_tab_curve, map_curve_to_edge};

/// Shape of one side of a piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EdgeType {
    /// Not decided yet; must not survive edge shape assignment.
    #[default]
    Unassigned,
    /// Puzzle boundary.
    Straight,
    /// Protrudes out of the piece.
    Tab,
    /// Recessed into the piece; the exact inverse of the neighbor's tab.
    Blank,
}

impl EdgeType {
    /// Shape the neighbor must have on the same seam.
    #[must_use]
    pub const fn complement(self) -> Self {
        match self {
            Self::Tab => Self::Blank,
            Self::Blank => Self::Tab,
            other => other,
        }
    }

    #[must_use]
    pub const fn is_shaped(self) -> bool {
        matches!(self, Self::Tab | Self::Blank)
    }
}

/// Largest tab size across a seam, as a multiple of the piece's extent
/// perpendicular to that seam. Two blanks facing each other inside a piece
/// stay apart below this ratio.
pub const MAX_TAB_CROSS_RATIO: f64 = 1.25;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EdgeError {
    #[error("edge shape is still unassigned")]
    Unassigned,
    #[error("edge endpoints must be finite")]
    NonFiniteEndpoint,
}

/// One embedded side of a piece outline.
///
/// `points` always starts at `source` and ends at `target`. A tab is the
/// canonical curve mapped onto `source -> target`; a blank is the same curve
/// mapped onto `target -> source` and reversed, which makes it the exact
/// reverse of the tab its neighbor builds on the shared seam.
#[derive(Debug, Clone, PartialEq)]
pub struct PieceEdge {
    pub source: Vec2,
    pub target: Vec2,
    pub edge_type: EdgeType,
    pub points: Vec<Vec2>,
}

impl PieceEdge {
    pub fn build(
        source: Vec2,
        target: Vec2,
        edge_type: EdgeType,
        precision: usize,
    ) -> Result<Self, EdgeError> {
        Self::build_limited(source, target, edge_type, precision, f64::INFINITY)
    }

    /// Like [`PieceEdge::build`], but the tab's height off the seam uses
    /// `min(seam length, max_tab_scale)` instead of the seam length.
    ///
    /// The limit only depends on the seam and the value passed in, so both
    /// pieces on a seam get mirrored polylines when they pass the same limit.
    pub fn build_limited(
        source: Vec2,
        target: Vec2,
        edge_type: EdgeType,
        precision: usize,
        max_tab_scale: f64,
    ) -> Result<Self, EdgeError> {
        if !source.is_finite() || !target.is_finite() {
            return Err(EdgeError::NonFiniteEndpoint);
        }

        let points = match edge_type {
            EdgeType::Unassigned => return Err(EdgeError::Unassigned),
            EdgeType::Straight => vec![source, target],
            EdgeType::Tab => shaped_points(source, target, precision, max_tab_scale),
            EdgeType::Blank => {
                let mut points = shaped_points(target, source, precision, max_tab_scale);
                points.reverse();
                points
            }
        };

        Ok(Self {
            source,
            target,
            edge_type,
            points,
        })
    }
}

fn shaped_points(source: Vec2, target: Vec2, precision: usize, max_tab_scale: f64) -> Vec<Vec2> {
    let mut samples = approximate(&canonical_tab_curve(), precision);
    let length = (target - source).length();
    if max_tab_scale < length {
        let squash = max_tab_scale / length;
        for p in &mut samples {
            p.y *= squash;
        }
    }
    let mut points = Vec::with_capacity(samples.len() + 2);
    points.push(source);
    points.extend(map_curve_to_edge(&samples, source, target));
    points.push(target);
    points
}
