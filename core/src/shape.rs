use serde::{Deserialize, Serialize};

use crate::math::{Aabb, Transform, Vec2};

pub type ShapeId = u32;

/// Shape kinds in canonical order. Contact pairs are always stored with
/// `shape1.kind() <= shape2.kind()` so the narrow phase only needs one
/// kernel per unordered combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ShapeType {
    Circle,
    Segment,
    Poly,
}

/// Shape geometry. Stored twice per shape: once in the body-local frame
/// (authoritative) and once in world space (cached by `cache`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ShapeGeom {
    Circle {
        center: Vec2,
        radius: f32,
    },
    /// Capsule: a line segment inflated by a radius.
    Segment {
        a: Vec2,
        b: Vec2,
        radius: f32,
    },
    /// Convex polygon, counter-clockwise winding.
    Poly {
        verts: Vec<Vec2>,
    },
}

/// Mass contribution of a single shape: mass, centroid in the body-local
/// frame, and rotational inertia about that centroid.
#[derive(Debug, Clone, Copy)]
pub struct MassData {
    pub mass: f32,
    pub centroid: Vec2,
    pub inertia: f32,
}

#[derive(Debug, Clone)]
pub struct Shape {
    pub id: ShapeId,
    /// Body-local geometry.
    pub geom: ShapeGeom,
    /// World-space geometry, valid after `cache`.
    pub world: ShapeGeom,
    /// World-space bounds, valid after `cache`.
    pub aabb: Aabb,
    pub restitution: f32,
    pub friction: f32,
    pub density: f32,
}

impl Shape {
    pub fn new(id: ShapeId, geom: ShapeGeom, density: f32, restitution: f32, friction: f32) -> Self {
        let world = geom.clone();
        let mut shape = Self {
            id,
            geom,
            world,
            aabb: Aabb::EMPTY,
            restitution,
            friction,
            density,
        };
        shape.cache(&Transform::IDENTITY);
        shape
    }

    pub fn kind(&self) -> ShapeType {
        match self.geom {
            ShapeGeom::Circle { .. } => ShapeType::Circle,
            ShapeGeom::Segment { .. } => ShapeType::Segment,
            ShapeGeom::Poly { .. } => ShapeType::Poly,
        }
    }

    /// Recompute world geometry and bounds from the body transform.
    pub fn cache(&mut self, xf: &Transform) {
        match &self.geom {
            ShapeGeom::Circle { center, radius } => {
                let c = xf.apply(*center);
                self.world = ShapeGeom::Circle {
                    center: c,
                    radius: *radius,
                };
                self.aabb = Aabb::around(c, *radius);
            }
            ShapeGeom::Segment { a, b, radius } => {
                let wa = xf.apply(*a);
                let wb = xf.apply(*b);
                self.world = ShapeGeom::Segment {
                    a: wa,
                    b: wb,
                    radius: *radius,
                };
                self.aabb = Aabb::new(wa.min(wb), wa.max(wb)).expand(*radius);
            }
            ShapeGeom::Poly { verts } => {
                let world_verts: Vec<Vec2> = verts.iter().map(|v| xf.apply(*v)).collect();
                let mut aabb = Aabb::EMPTY;
                for v in &world_verts {
                    aabb.min = aabb.min.min(*v);
                    aabb.max = aabb.max.max(*v);
                }
                self.world = ShapeGeom::Poly { verts: world_verts };
                self.aabb = aabb;
            }
        }
    }

    /// Mass properties from local geometry and density.
    pub fn mass_data(&self) -> MassData {
        use std::f32::consts::PI;
        match &self.geom {
            ShapeGeom::Circle { center, radius } => {
                let mass = self.density * PI * radius * radius;
                MassData {
                    mass,
                    centroid: *center,
                    inertia: 0.5 * mass * radius * radius,
                }
            }
            ShapeGeom::Segment { a, b, radius } => {
                let len = (*b - *a).length();
                let r = *radius;
                let m_rect = self.density * len * 2.0 * r;
                let m_caps = self.density * PI * r * r;
                let i_rect = m_rect * (len * len + 4.0 * r * r) / 12.0;
                // End caps treated as a disc split between the two ends.
                let i_caps = m_caps * (0.5 * r * r + 0.25 * len * len);
                MassData {
                    mass: m_rect + m_caps,
                    centroid: (*a + *b) * 0.5,
                    inertia: i_rect + i_caps,
                }
            }
            ShapeGeom::Poly { verts } => polygon_mass_data(verts, self.density),
        }
    }

    /// Point containment test against the cached world geometry.
    pub fn contains_point(&self, p: Vec2) -> bool {
        match &self.world {
            ShapeGeom::Circle { center, radius } => p.distance_sq(*center) <= radius * radius,
            ShapeGeom::Segment { a, b, radius } => {
                segment_distance_sq(p, *a, *b) <= radius * radius
            }
            ShapeGeom::Poly { verts } => {
                let n = verts.len();
                if n < 3 {
                    return false;
                }
                for i in 0..n {
                    let edge = verts[(i + 1) % n] - verts[i];
                    if edge.cross(p - verts[i]) < 0.0 {
                        return false;
                    }
                }
                true
            }
        }
    }

    /// Index of a world vertex within `tol` of `p`, for authoring picks.
    /// Circle centers count as vertex 0.
    pub fn vertex_near(&self, p: Vec2, tol: f32) -> Option<usize> {
        let tol_sq = tol * tol;
        match &self.world {
            ShapeGeom::Circle { center, .. } => (p.distance_sq(*center) <= tol_sq).then_some(0),
            ShapeGeom::Segment { a, b, .. } => {
                if p.distance_sq(*a) <= tol_sq {
                    Some(0)
                } else if p.distance_sq(*b) <= tol_sq {
                    Some(1)
                } else {
                    None
                }
            }
            ShapeGeom::Poly { verts } => verts
                .iter()
                .position(|v| p.distance_sq(*v) <= tol_sq),
        }
    }

    /// Index of a world edge within `tol` of `p`, for authoring picks.
    pub fn edge_near(&self, p: Vec2, tol: f32) -> Option<usize> {
        let tol_sq = tol * tol;
        match &self.world {
            ShapeGeom::Circle { .. } => None,
            ShapeGeom::Segment { a, b, radius } => {
                let reach = tol + radius;
                (segment_distance_sq(p, *a, *b) <= reach * reach).then_some(0)
            }
            ShapeGeom::Poly { verts } => {
                let n = verts.len();
                (0..n).find(|&i| segment_distance_sq(p, verts[i], verts[(i + 1) % n]) <= tol_sq)
            }
        }
    }
}

fn segment_distance_sq(p: Vec2, a: Vec2, b: Vec2) -> f32 {
    let ab = b - a;
    let len_sq = ab.length_sq();
    if len_sq < 1e-12 {
        return p.distance_sq(a);
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    p.distance_sq(a + ab * t)
}

fn polygon_mass_data(verts: &[Vec2], density: f32) -> MassData {
    let n = verts.len();
    if n < 3 {
        return MassData {
            mass: 0.0,
            centroid: Vec2::ZERO,
            inertia: 0.0,
        };
    }
    let mut area = 0.0f32;
    let mut centroid = Vec2::ZERO;
    let mut i_origin = 0.0f32;
    for i in 0..n {
        let v0 = verts[i];
        let v1 = verts[(i + 1) % n];
        let cross = v0.cross(v1);
        area += 0.5 * cross;
        centroid += (v0 + v1) * (cross / 6.0);
        i_origin += cross * (v0.dot(v0) + v0.dot(v1) + v1.dot(v1)) / 12.0;
    }
    if area <= 1e-12 {
        return MassData {
            mass: 0.0,
            centroid: Vec2::ZERO,
            inertia: 0.0,
        };
    }
    centroid = centroid * (1.0 / area);
    let mass = density * area;
    let inertia = density * i_origin - mass * centroid.length_sq();
    MassData {
        mass,
        centroid,
        inertia,
    }
}

/// Convenience constructor for an axis-aligned box polygon.
pub fn box_verts(half_w: f32, half_h: f32) -> Vec<Vec2> {
    vec![
        Vec2::new(-half_w, -half_h),
        Vec2::new(half_w, -half_h),
        Vec2::new(half_w, half_h),
        Vec2::new(-half_w, half_h),
    ]
}
