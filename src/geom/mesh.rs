use super::{Tolerance, Vec2, Vec3};

/// Indexed triangle solid produced for each piece.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SolidMesh {
    pub positions: Vec<[f64; 3]>,
    pub indices: Vec<u32>,
    pub uvs: Option<Vec<[f64; 2]>>,
    pub normals: Option<Vec<[f64; 3]>>,
}

impl SolidMesh {
    /// Create a new mesh with positions and indices only.
    #[must_use]
    pub fn new(positions: Vec<[f64; 3]>, indices: Vec<u32>) -> Self {
        Self {
            positions,
            indices,
            uvs: None,
            normals: None,
        }
    }

    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Returns true if any vertex position contains NaN or Inf values.
    #[must_use]
    pub fn has_invalid_vertices(&self) -> bool {
        self.positions
            .iter()
            .any(|p| !p[0].is_finite() || !p[1].is_finite() || !p[2].is_finite())
    }

    /// Returns true if all vertex indices are within bounds.
    #[must_use]
    pub fn has_valid_indices(&self) -> bool {
        let n = self.positions.len() as u32;
        self.indices.iter().all(|&i| i < n)
    }

    /// Returns true if all optional vertex attribute buffers match `positions.len()`.
    #[must_use]
    pub fn has_valid_attribute_lengths(&self) -> bool {
        let n = self.positions.len();
        self.uvs.as_ref().map_or(true, |uvs| uvs.len() == n)
            && self.normals.as_ref().map_or(true, |normals| normals.len() == n)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.indices.len() % 3 != 0 {
            return Err("mesh indices are not a triangle list (len % 3 != 0)".to_string());
        }
        if self.has_invalid_vertices() {
            return Err("mesh has invalid vertex coordinates (NaN/Inf)".to_string());
        }
        if !self.has_valid_indices() {
            return Err("mesh has out-of-bounds vertex indices".to_string());
        }
        if !self.has_valid_attribute_lengths() {
            return Err("mesh attribute buffers do not match vertex count".to_string());
        }
        Ok(())
    }

    /// Recompute area-weighted vertex normals from the triangle list.
    pub fn recalculate_normals(&mut self) {
        self.normals = Some(compute_smooth_normals(&self.positions, &self.indices));
    }
}

/// Clean a closed outline before triangulation.
///
/// Coincident consecutive points collapse (including a closing point equal to
/// the first), then points lying on the line through their neighbors are
/// dropped. Every point that survives ends up in at least one cap triangle.
#[must_use]
pub fn dedup_polygon(points: &[Vec2], tol: Tolerance) -> Vec<Vec2> {
    let mut out: Vec<Vec2> = Vec::with_capacity(points.len());
    for &p in points {
        if out.last().is_some_and(|&last| tol.approx_eq_vec2(last, p)) {
            continue;
        }
        out.push(p);
    }
    while out.len() > 1 && tol.approx_eq_vec2(out[0], out[out.len() - 1]) {
        out.pop();
    }

    let mut i = 0usize;
    let mut since_removal = 0usize;
    while out.len() > 3 && since_removal < out.len() {
        let n = out.len();
        let prev = out[(i + n - 1) % n];
        let next = out[(i + 1) % n];
        if distance_to_line(prev, out[i], next) <= tol.eps {
            out.remove(i);
            since_removal = 0;
            if i >= out.len() {
                i = 0;
            }
        } else {
            since_removal += 1;
            i = (i + 1) % n;
        }
    }
    out
}

fn distance_to_line(a: Vec2, p: Vec2, b: Vec2) -> f64 {
    let ab = b - a;
    let len = ab.length();
    if len <= 0.0 {
        return (p - a).length();
    }
    ab.perp_dot(p - a).abs() / len
}

fn compute_smooth_normals(points: &[[f64; 3]], indices: &[u32]) -> Vec<[f64; 3]> {
    let mut normals = vec![Vec3::ZERO; points.len()];

    for tri in indices.chunks_exact(3) {
        let i0 = tri[0] as usize;
        let i1 = tri[1] as usize;
        let i2 = tri[2] as usize;

        let (Some(a), Some(b), Some(c)) = (points.get(i0), points.get(i1), points.get(i2)) else {
            continue;
        };
        let a = Vec3::from_array(*a);
        let n = (Vec3::from_array(*b) - a).cross(Vec3::from_array(*c) - a);

        normals[i0] = normals[i0] + n;
        normals[i1] = normals[i1] + n;
        normals[i2] = normals[i2] + n;
    }

    normals
        .into_iter()
        .map(|n| n.normalized().unwrap_or(Vec3::Z).to_array())
        .collect()
}
