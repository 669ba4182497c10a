//! Reference triangle walk mesh.
//!
//! Walk points are a triangle index plus barycentric weights. Walking moves the
//! weights toward the target, hops across shared edges into the neighbouring
//! triangle, and slides along boundary edges.

use std::collections::HashMap;

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::error::SceneError;
use crate::locomotion::WalkSurface;

const MAX_WALK_ITERATIONS: usize = 32;
const MIN_STEP_SQUARED: f32 = 1e-12;
/// Target weights this close below zero count as on the edge.
const WEIGHT_EPSILON: f32 = 1e-5;
const MIN_DOUBLE_AREA: f32 = 1e-10;

/// Serialized walk mesh: positions, optional per-vertex normals, triangles.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WalkMeshDescription {
    pub vertices: Vec<[f32; 3]>,
    #[serde(default)]
    pub normals: Option<Vec<[f32; 3]>>,
    pub triangles: Vec<[u32; 3]>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WalkPoint {
    pub triangle: usize,
    pub weights: Vec3,
}

#[derive(Debug, Clone)]
pub struct TriangleWalkMesh {
    vertices: Vec<Vec3>,
    vertex_normals: Option<Vec<Vec3>>,
    triangles: Vec<[u32; 3]>,
    face_normals: Vec<Vec3>,
    /// Directed edge (a, b) to the triangle that owns it.
    edge_owner: HashMap<(u32, u32), usize>,
}

impl TriangleWalkMesh {
    /// Flat-shaded mesh: the normal is constant across each triangle.
    pub fn new(vertices: Vec<Vec3>, triangles: Vec<[u32; 3]>) -> Result<Self, SceneError> {
        Self::build(vertices, None, triangles)
    }

    /// Smooth mesh: normals are interpolated from per-vertex normals.
    pub fn with_vertex_normals(
        vertices: Vec<Vec3>,
        normals: Vec<Vec3>,
        triangles: Vec<[u32; 3]>,
    ) -> Result<Self, SceneError> {
        if normals.len() != vertices.len() {
            return Err(SceneError::NormalCount {
                expected: vertices.len(),
                found: normals.len(),
            });
        }
        Self::build(vertices, Some(normals), triangles)
    }

    pub fn from_description(description: &WalkMeshDescription) -> Result<Self, SceneError> {
        let vertices = description
            .vertices
            .iter()
            .copied()
            .map(Vec3::from_array)
            .collect::<Vec<_>>();
        match &description.normals {
            Some(normals) => Self::with_vertex_normals(
                vertices,
                normals.iter().copied().map(Vec3::from_array).collect(),
                description.triangles.clone(),
            ),
            None => Self::new(vertices, description.triangles.clone()),
        }
    }

    fn build(
        vertices: Vec<Vec3>,
        vertex_normals: Option<Vec<Vec3>>,
        triangles: Vec<[u32; 3]>,
    ) -> Result<Self, SceneError> {
        if triangles.is_empty() {
            return Err(SceneError::EmptyWalkMesh);
        }
        let mut face_normals = Vec::with_capacity(triangles.len());
        let mut edge_owner = HashMap::with_capacity(triangles.len() * 3);
        for (triangle, corners) in triangles.iter().enumerate() {
            for &index in corners {
                if index as usize >= vertices.len() {
                    return Err(SceneError::VertexIndex {
                        triangle,
                        index,
                        vertex_count: vertices.len(),
                    });
                }
            }
            let [a, b, c] = corners.map(|index| vertices[index as usize]);
            let cross = (b - a).cross(c - a);
            if cross.length_squared() <= MIN_DOUBLE_AREA * MIN_DOUBLE_AREA {
                return Err(SceneError::DegenerateTriangle { triangle });
            }
            face_normals.push(cross.normalize());
            for k in 0..3 {
                edge_owner.insert((corners[k], corners[(k + 1) % 3]), triangle);
            }
        }
        let vertex_normals =
            vertex_normals.map(|normals| normals.into_iter().map(Vec3::normalize_or_zero).collect());
        Ok(Self {
            vertices,
            vertex_normals,
            triangles,
            face_normals,
            edge_owner,
        })
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    fn corners(&self, triangle: usize) -> [Vec3; 3] {
        self.triangles[triangle].map(|index| self.vertices[index as usize])
    }

    fn neighbor_across(&self, triangle: usize, opposite_corner: usize) -> Option<usize> {
        let corners = self.triangles[triangle];
        let from = corners[(opposite_corner + 1) % 3];
        let to = corners[(opposite_corner + 2) % 3];
        self.edge_owner.get(&(to, from)).copied()
    }

    /// Re-express a point on the edge opposite `opposite_corner` of `from`
    /// in the weights of `to`.
    fn transfer_weights(&self, from: usize, opposite_corner: usize, weights: Vec3, to: usize) -> Vec3 {
        let source = self.triangles[from];
        let target = self.triangles[to];
        let mut moved = Vec3::ZERO;
        for k in 0..3 {
            for offset in [1, 2] {
                let corner = (opposite_corner + offset) % 3;
                if target[k] == source[corner] {
                    moved[k] = weights[corner];
                }
            }
        }
        normalize_weights(moved)
    }
}

impl WalkSurface for TriangleWalkMesh {
    type WalkPoint = WalkPoint;

    fn start(&self, position: Vec3) -> WalkPoint {
        let mut best = WalkPoint {
            triangle: 0,
            weights: Vec3::new(1.0, 0.0, 0.0),
        };
        let mut best_distance = f32::INFINITY;
        for triangle in 0..self.triangles.len() {
            let [a, b, c] = self.corners(triangle);
            let closest = closest_point_on_triangle(position, a, b, c);
            let distance = closest.distance_squared(position);
            if distance < best_distance {
                best_distance = distance;
                best = WalkPoint {
                    triangle,
                    weights: normalize_weights(barycentric(closest, a, b, c).max(Vec3::ZERO)),
                };
            }
        }
        best
    }

    fn walk(&self, point: &mut WalkPoint, step: Vec3) {
        let mut remaining = step;
        for _ in 0..MAX_WALK_ITERATIONS {
            let normal = self.face_normals[point.triangle];
            remaining -= normal * remaining.dot(normal);
            if remaining.length_squared() <= MIN_STEP_SQUARED {
                break;
            }

            let [a, b, c] = self.corners(point.triangle);
            let here = point.weights.x * a + point.weights.y * b + point.weights.z * c;
            let mut target = barycentric(here + remaining, a, b, c);
            for k in 0..3 {
                if target[k] < 0.0 && target[k] > -WEIGHT_EPSILON {
                    target[k] = 0.0;
                }
            }

            let delta = target - point.weights;
            let mut exit: Option<(usize, f32)> = None;
            for k in 0..3 {
                if target[k] < 0.0 && delta[k] < 0.0 {
                    let t = (point.weights[k] / -delta[k]).clamp(0.0, 1.0);
                    if exit.map_or(true, |(_, best)| t < best) {
                        exit = Some((k, t));
                    }
                }
            }

            let Some((corner, t)) = exit else {
                point.weights = normalize_weights(target);
                break;
            };

            let mut on_edge = point.weights + delta * t;
            on_edge[corner] = 0.0;
            let on_edge = normalize_weights(on_edge.max(Vec3::ZERO));
            remaining *= 1.0 - t;

            match self.neighbor_across(point.triangle, corner) {
                Some(next) => {
                    let carry = Quat::from_rotation_arc(normal, self.face_normals[next]);
                    remaining = carry * remaining;
                    point.weights = self.transfer_weights(point.triangle, corner, on_edge, next);
                    point.triangle = next;
                }
                None => {
                    point.weights = on_edge;
                    let corners = self.triangles[point.triangle];
                    let edge = (self.vertices[corners[(corner + 2) % 3] as usize]
                        - self.vertices[corners[(corner + 1) % 3] as usize])
                        .normalize_or_zero();
                    remaining = edge * remaining.dot(edge);
                }
            }
        }
    }

    fn world_point(&self, point: &WalkPoint) -> Vec3 {
        let [a, b, c] = self.corners(point.triangle);
        point.weights.x * a + point.weights.y * b + point.weights.z * c
    }

    fn world_normal(&self, point: &WalkPoint) -> Vec3 {
        let face = self.face_normals[point.triangle];
        match &self.vertex_normals {
            Some(normals) => {
                let [a, b, c] = self.triangles[point.triangle].map(|index| normals[index as usize]);
                (point.weights.x * a + point.weights.y * b + point.weights.z * c)
                    .try_normalize()
                    .unwrap_or(face)
            }
            None => face,
        }
    }
}

// ---------------------------------------------------------------------------
// Geometry helpers
// ---------------------------------------------------------------------------

/// Barycentric weights of `p` projected onto the plane of (a, b, c).
fn barycentric(p: Vec3, a: Vec3, b: Vec3, c: Vec3) -> Vec3 {
    let v0 = b - a;
    let v1 = c - a;
    let v2 = p - a;
    let d00 = v0.dot(v0);
    let d01 = v0.dot(v1);
    let d11 = v1.dot(v1);
    let d20 = v2.dot(v0);
    let d21 = v2.dot(v1);
    let denom = d00 * d11 - d01 * d01;
    let v = (d11 * d20 - d01 * d21) / denom;
    let w = (d00 * d21 - d01 * d20) / denom;
    Vec3::new(1.0 - v - w, v, w)
}

fn normalize_weights(weights: Vec3) -> Vec3 {
    let sum = weights.x + weights.y + weights.z;
    if sum > 0.0 {
        weights / sum
    } else {
        Vec3::new(1.0, 0.0, 0.0)
    }
}

/// Closest point to `p` on triangle (a, b, c), by Voronoi region.
fn closest_point_on_triangle(p: Vec3, a: Vec3, b: Vec3, c: Vec3) -> Vec3 {
    let ab = b - a;
    let ac = c - a;
    let ap = p - a;
    let d1 = ab.dot(ap);
    let d2 = ac.dot(ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        return a;
    }

    let bp = p - b;
    let d3 = ab.dot(bp);
    let d4 = ac.dot(bp);
    if d3 >= 0.0 && d4 <= d3 {
        return b;
    }

    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        return a + ab * (d1 / (d1 - d3));
    }

    let cp = p - c;
    let d5 = ab.dot(cp);
    let d6 = ac.dot(cp);
    if d6 >= 0.0 && d5 <= d6 {
        return c;
    }

    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        return a + ac * (d2 / (d2 - d6));
    }

    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        return b + (c - b) * ((d4 - d3) / ((d4 - d3) + (d5 - d6)));
    }

    let denom = 1.0 / (va + vb + vc);
    a + ab * (vb * denom) + ac * (vc * denom)
}
