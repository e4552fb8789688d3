//! Topology and quality checks for generated piece meshes.
//!
//! Diagnostics are computed after a mesh is built and are used to verify
//! piece solids in tests and in the CLI report:
//!
//! - collision solids must be watertight and manifold
//! - visual solids keep their rim split, so they report open edges along the
//!   cap seams by construction
//!
//! # Example
//!
//! ```ignore
//! use jigsaw_engine::geom::MeshDiagnostics;
//!
//! let diag = MeshDiagnostics::from_mesh(&piece.collision_mesh);
//! assert!(diag.is_valid_solid(), "{diag}");
//! ```

use std::collections::BTreeMap;
use std::fmt;

use super::mesh::SolidMesh;
use super::Vec3;

/// Counts describing the topology of one mesh.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct MeshDiagnostics {
    /// Total number of vertices in the mesh.
    pub vertex_count: usize,

    /// Total number of triangles in the mesh.
    pub triangle_count: usize,

    /// Triangles whose area is zero within tolerance.
    pub degenerate_triangle_count: usize,

    /// Edges with only one adjacent triangle.
    ///
    /// A watertight mesh has zero open edges.
    pub open_edge_count: usize,

    /// Edges with more than two adjacent triangles.
    pub non_manifold_edge_count: usize,

    /// Human-readable notes about issues found.
    pub warnings: Vec<String>,
}

impl MeshDiagnostics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inspect a mesh and count its edge topology and degenerate faces.
    #[must_use]
    pub fn from_mesh(mesh: &SolidMesh) -> Self {
        let mut diag = Self {
            vertex_count: mesh.vertex_count(),
            triangle_count: mesh.triangle_count(),
            ..Self::default()
        };

        let mut edge_counts: BTreeMap<(u32, u32), u32> = BTreeMap::new();
        for tri in mesh.indices.chunks_exact(3) {
            let (i0, i1, i2) = (tri[0], tri[1], tri[2]);
            for (a, b) in [(i0, i1), (i1, i2), (i2, i0)] {
                let key = if a <= b { (a, b) } else { (b, a) };
                *edge_counts.entry(key).or_insert(0) += 1;
            }

            if triangle_area(mesh, i0, i1, i2).is_none_or(|area| area <= 1e-12) {
                diag.degenerate_triangle_count += 1;
            }
        }

        for count in edge_counts.values() {
            match count {
                1 => diag.open_edge_count += 1,
                2 => {}
                _ => diag.non_manifold_edge_count += 1,
            }
        }

        if diag.open_edge_count > 0 {
            diag.add_warning("mesh has open edges");
        }
        if diag.non_manifold_edge_count > 0 {
            diag.add_warning("mesh has non-manifold edges");
        }
        if diag.degenerate_triangle_count > 0 {
            diag.add_warning("mesh has degenerate triangles");
        }
        diag
    }

    #[must_use]
    pub fn is_watertight(&self) -> bool {
        self.open_edge_count == 0
    }

    #[must_use]
    pub fn is_manifold(&self) -> bool {
        self.non_manifold_edge_count == 0
    }

    /// Returns `true` if the mesh is both watertight and manifold.
    #[must_use]
    pub fn is_valid_solid(&self) -> bool {
        self.is_watertight() && self.is_manifold()
    }

    pub fn add_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    /// Sum counts of another mesh into this one.
    pub fn merge(&mut self, other: &MeshDiagnostics) {
        self.vertex_count += other.vertex_count;
        self.triangle_count += other.triangle_count;
        self.degenerate_triangle_count += other.degenerate_triangle_count;
        self.open_edge_count += other.open_edge_count;
        self.non_manifold_edge_count += other.non_manifold_edge_count;
        self.warnings.extend(other.warnings.iter().cloned());
    }

    /// Returns a short summary string suitable for logging.
    ///
    /// Format: `"V:{vertices} T:{triangles} [issues...]"`
    #[must_use]
    pub fn summary(&self) -> String {
        let mut parts = vec![format!("V:{} T:{}", self.vertex_count, self.triangle_count)];
        if self.degenerate_triangle_count > 0 {
            parts.push(format!("degenerate:{}", self.degenerate_triangle_count));
        }
        if self.open_edge_count > 0 {
            parts.push(format!("open:{}", self.open_edge_count));
        }
        if self.non_manifold_edge_count > 0 {
            parts.push(format!("non-manifold:{}", self.non_manifold_edge_count));
        }
        parts.join(" ")
    }
}

impl fmt::Display for MeshDiagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Mesh Diagnostics:")?;
        writeln!(f, "  Vertices: {}", self.vertex_count)?;
        writeln!(f, "  Triangles: {}", self.triangle_count)?;
        if self.open_edge_count > 0 {
            writeln!(f, "  Open edges: {}", self.open_edge_count)?;
        }
        if self.non_manifold_edge_count > 0 {
            writeln!(f, "  Non-manifold edges: {}", self.non_manifold_edge_count)?;
        }
        if self.degenerate_triangle_count > 0 {
            writeln!(f, "  Degenerate triangles: {}", self.degenerate_triangle_count)?;
        }
        for warning in &self.warnings {
            writeln!(f, "  Warning: {warning}")?;
        }
        let status = if self.is_valid_solid() { "SOLID" } else { "OPEN" };
        writeln!(f, "  Status: {status}")
    }
}

fn triangle_area(mesh: &SolidMesh, i0: u32, i1: u32, i2: u32) -> Option<f64> {
    let a = Vec3::from_array(*mesh.positions.get(i0 as usize)?);
    let b = Vec3::from_array(*mesh.positions.get(i1 as usize)?);
    let c = Vec3::from_array(*mesh.positions.get(i2 as usize)?);
    Some(0.5 * (b - a).cross(c - a).length())
}
