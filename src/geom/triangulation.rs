use super::{Tolerance, Vec2};

/// Triangulates a simple polygon.
///
/// Input is an ordered outline (either winding, no repeated closing point);
/// output is a flat list of index triples into that outline. Implementations
/// must be deterministic: the same outline always yields the same indices.
pub trait PolygonTriangulator: Send + Sync {
    fn triangulate(&self, polygon: &[Vec2]) -> Result<Vec<u32>, TriangulationError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TriangulationError {
    #[error("polygon requires at least 3 points, got {count}")]
    NotEnoughPoints { count: usize },
    #[error("polygon points must be finite")]
    NonFinitePoint,
    #[error("polygon degenerates after filtering")]
    Degenerate,
    #[error("polygon outline crosses itself")]
    SelfIntersecting,
    #[error("failed to triangulate polygon (no ears found)")]
    NoEar,
}

/// Ear clipping over a doubly linked ring of outline vertices.
///
/// Triangles keep the winding of the input outline, so a clockwise outline
/// produces clockwise triangles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EarClipTriangulator {
    pub tol: Tolerance,
}

impl EarClipTriangulator {
    #[must_use]
    pub const fn new(tol: Tolerance) -> Self {
        Self { tol }
    }
}

impl Default for EarClipTriangulator {
    fn default() -> Self {
        Self::new(Tolerance::default_geom())
    }
}

impl PolygonTriangulator for EarClipTriangulator {
    fn triangulate(&self, polygon: &[Vec2]) -> Result<Vec<u32>, TriangulationError> {
        if polygon.len() < 3 {
            return Err(TriangulationError::NotEnoughPoints {
                count: polygon.len(),
            });
        }
        if polygon.iter().any(|p| !p.is_finite()) {
            return Err(TriangulationError::NonFinitePoint);
        }
        if !is_simple_polygon(polygon) {
            return Err(TriangulationError::SelfIntersecting);
        }

        let mut nodes = build_ring_nodes(polygon);
        let triangles = earclip_polygon(0, &mut nodes, self.tol)?;
        Ok(triangles.into_iter().flatten().collect())
    }
}

#[derive(Debug, Clone, Copy)]
struct Node {
    idx: u32,
    point: Vec2,
    prev: usize,
    next: usize,
}

fn build_ring_nodes(vertices: &[Vec2]) -> Vec<Node> {
    let len = vertices.len();
    vertices
        .iter()
        .enumerate()
        .map(|(i, &point)| Node {
            idx: i as u32,
            point,
            prev: (i + len - 1) % len,
            next: (i + 1) % len,
        })
        .collect()
}

fn ring_len(start: usize, nodes: &[Node]) -> usize {
    let mut count = 0usize;
    let mut cur = start;
    loop {
        count += 1;
        cur = nodes[cur].next;
        if cur == start || count > nodes.len().saturating_add(1) {
            break;
        }
    }
    count
}

fn filter_ring_points(start: usize, nodes: &mut [Node], tol: Tolerance) -> Option<usize> {
    if ring_len(start, nodes) < 3 {
        return None;
    }

    let mut start = start;
    let mut cur = start;
    let mut guard = 0usize;

    loop {
        guard += 1;
        if guard > nodes.len().saturating_mul(4).max(16) {
            break;
        }

        let prev = nodes[cur].prev;
        let next = nodes[cur].next;
        if cur == next || cur == prev || prev == next {
            break;
        }

        let p = nodes[prev].point;
        let c = nodes[cur].point;
        let n = nodes[next].point;

        let dup = tol.approx_eq_vec2(p, c) || tol.approx_eq_vec2(c, n);
        let collinear = distance_point_to_line(p, c, n) <= tol.eps;

        if dup || collinear {
            if cur == start {
                start = next;
            }
            remove_node(cur, nodes);
            cur = prev;
            if ring_len(start, nodes) < 3 {
                return None;
            }
        } else {
            cur = next;
        }

        if cur == start {
            break;
        }
    }

    Some(start)
}

fn earclip_polygon(
    start: usize,
    nodes: &mut [Node],
    tol: Tolerance,
) -> Result<Vec<[u32; 3]>, TriangulationError> {
    let mut start = filter_ring_points(start, nodes, tol).ok_or(TriangulationError::Degenerate)?;

    let is_ccw = signed_area_ring(start, nodes) > 0.0;
    let mut remaining = ring_len(start, nodes);
    if remaining < 3 {
        return Err(TriangulationError::Degenerate);
    }

    let mut ear = start;
    let mut stop = start;
    let mut triangles = Vec::with_capacity(remaining.saturating_sub(2));
    let mut passes_without_clip = 0usize;

    while remaining > 2 {
        let prev = nodes[ear].prev;
        let next = nodes[ear].next;
        if is_ear(prev, ear, next, nodes, is_ccw, tol) {
            triangles.push([nodes[prev].idx, nodes[ear].idx, nodes[next].idx]);

            if ear == start {
                start = next;
            }
            remove_node(ear, nodes);
            remaining -= 1;
            ear = next;
            stop = next;
            passes_without_clip = 0;
            continue;
        }

        ear = next;
        if ear == stop {
            passes_without_clip += 1;
            if passes_without_clip > 2 {
                return Err(TriangulationError::NoEar);
            }
            start = filter_ring_points(start, nodes, tol).ok_or(TriangulationError::Degenerate)?;
            remaining = ring_len(start, nodes);
            ear = start;
            stop = start;
        }
    }

    Ok(triangles)
}

fn is_ear(prev: usize, ear: usize, next: usize, nodes: &[Node], is_ccw: bool, tol: Tolerance) -> bool {
    let a = nodes[prev].point;
    let b = nodes[ear].point;
    let c = nodes[next].point;

    if distance_point_to_line(a, b, c) <= tol.eps {
        return false;
    }

    let cross = orient2d(a, b, c);
    if is_ccw {
        if cross <= 0.0 {
            return false;
        }
    } else if cross >= 0.0 {
        return false;
    }

    let mut p = nodes[next].next;
    let mut guard = 0usize;
    while p != prev {
        guard += 1;
        if guard > nodes.len().saturating_add(1) {
            break;
        }
        let pt = nodes[p].point;
        if point_in_triangle(a, b, c, pt, is_ccw, tol) {
            let cross_p = orient2d(nodes[nodes[p].prev].point, pt, nodes[nodes[p].next].point);
            let is_reflex = if is_ccw {
                cross_p <= tol.eps
            } else {
                cross_p >= -tol.eps
            };
            if is_reflex {
                return false;
            }
        }
        p = nodes[p].next;
    }

    true
}

fn signed_area_ring(start: usize, nodes: &[Node]) -> f64 {
    let mut area = 0.0;
    let mut p = start;
    loop {
        let q = nodes[p].next;
        area += nodes[p].point.perp_dot(nodes[q].point);
        p = q;
        if p == start {
            break;
        }
    }
    0.5 * area
}

fn remove_node(node: usize, nodes: &mut [Node]) {
    let prev = nodes[node].prev;
    let next = nodes[node].next;
    nodes[prev].next = next;
    nodes[next].prev = prev;
}

fn orient2d(a: Vec2, b: Vec2, c: Vec2) -> f64 {
    (b - a).perp_dot(c - a)
}

fn point_in_triangle(a: Vec2, b: Vec2, c: Vec2, p: Vec2, is_ccw: bool, tol: Tolerance) -> bool {
    let ab = orient2d(a, b, p);
    let bc = orient2d(b, c, p);
    let ca = orient2d(c, a, p);

    if is_ccw {
        ab >= -tol.eps && bc >= -tol.eps && ca >= -tol.eps
    } else {
        ab <= tol.eps && bc <= tol.eps && ca <= tol.eps
    }
}

fn distance_point_to_line(a: Vec2, p: Vec2, b: Vec2) -> f64 {
    let ab = b - a;
    let len = ab.length();
    if !len.is_finite() || len <= 0.0 {
        return (p - a).length();
    }
    ab.perp_dot(p - a).abs() / len
}

/// Signed area of an outline; negative for clockwise winding.
#[must_use]
pub fn signed_area(polygon: &[Vec2]) -> f64 {
    let n = polygon.len();
    if n < 3 {
        return 0.0;
    }
    let twice: f64 = (0..n)
        .map(|i| polygon[i].perp_dot(polygon[(i + 1) % n]))
        .sum();
    0.5 * twice
}

/// True when no two non-adjacent outline segments properly cross.
#[must_use]
pub fn is_simple_polygon(polygon: &[Vec2]) -> bool {
    let n = polygon.len();
    for i in 0..n {
        let (a, b) = (polygon[i], polygon[(i + 1) % n]);
        for j in (i + 2)..n {
            if i == 0 && j == n - 1 {
                continue;
            }
            let (c, d) = (polygon[j], polygon[(j + 1) % n]);
            if segments_cross(a, b, c, d) {
                return false;
            }
        }
    }
    true
}

fn segments_cross(a: Vec2, b: Vec2, c: Vec2, d: Vec2) -> bool {
    let d1 = orient2d(c, d, a);
    let d2 = orient2d(c, d, b);
    let d3 = orient2d(a, b, c);
    let d4 = orient2d(a, b, d);
    d1 * d2 < 0.0 && d3 * d4 < 0.0
}
