use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

use serde::{Deserialize, Serialize};

/// 2D vector with the three 2D cross products the solver needs.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn dot(self, other: Vec2) -> f32 {
        self.x * other.x + self.y * other.y
    }

    /// Scalar 2D cross product: the z component of the 3D cross.
    pub fn cross(self, other: Vec2) -> f32 {
        self.x * other.y - self.y * other.x
    }

    /// s x v, the angular-velocity-times-lever-arm product.
    pub fn cross_scalar_vec(s: f32, v: Vec2) -> Vec2 {
        Vec2::new(-s * v.y, s * v.x)
    }

    /// v x s.
    pub fn cross_vec_scalar(v: Vec2, s: f32) -> Vec2 {
        Vec2::new(s * v.y, -s * v.x)
    }

    /// Counter-clockwise perpendicular.
    pub fn perp(self) -> Vec2 {
        Vec2::new(-self.y, self.x)
    }

    pub fn length_sq(self) -> f32 {
        self.x * self.x + self.y * self.y
    }

    pub fn length(self) -> f32 {
        self.length_sq().sqrt()
    }

    /// Unit vector, or zero when the length is degenerate.
    pub fn normalized(self) -> Vec2 {
        let len = self.length();
        if len > 1e-8 {
            Vec2::new(self.x / len, self.y / len)
        } else {
            Vec2::ZERO
        }
    }

    pub fn distance_sq(self, other: Vec2) -> f32 {
        (other - self).length_sq()
    }

    pub fn min(self, other: Vec2) -> Vec2 {
        Vec2::new(self.x.min(other.x), self.y.min(other.y))
    }

    pub fn max(self, other: Vec2) -> Vec2 {
        Vec2::new(self.x.max(other.x), self.y.max(other.y))
    }
}

impl Add for Vec2 {
    type Output = Vec2;
    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vec2 {
    type Output = Vec2;
    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Neg for Vec2 {
    type Output = Vec2;
    fn neg(self) -> Vec2 {
        Vec2::new(-self.x, -self.y)
    }
}

impl Mul<f32> for Vec2 {
    type Output = Vec2;
    fn mul(self, s: f32) -> Vec2 {
        Vec2::new(self.x * s, self.y * s)
    }
}

impl Mul<Vec2> for f32 {
    type Output = Vec2;
    fn mul(self, v: Vec2) -> Vec2 {
        v * self
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Vec2) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl SubAssign for Vec2 {
    fn sub_assign(&mut self, rhs: Vec2) {
        self.x -= rhs.x;
        self.y -= rhs.y;
    }
}

/// Rotation with cached cos/sin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rot {
    pub c: f32,
    pub s: f32,
}

impl Rot {
    pub const IDENTITY: Rot = Rot { c: 1.0, s: 0.0 };

    pub fn new(angle: f32) -> Self {
        Self {
            c: angle.cos(),
            s: angle.sin(),
        }
    }

    pub fn apply(self, v: Vec2) -> Vec2 {
        Vec2::new(self.c * v.x - self.s * v.y, self.s * v.x + self.c * v.y)
    }

    /// Inverse rotation (transpose).
    pub fn apply_inv(self, v: Vec2) -> Vec2 {
        Vec2::new(self.c * v.x + self.s * v.y, -self.s * v.x + self.c * v.y)
    }
}

/// Rigid transform: rotation followed by translation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub pos: Vec2,
    pub rot: Rot,
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        pos: Vec2::ZERO,
        rot: Rot::IDENTITY,
    };

    pub fn new(pos: Vec2, angle: f32) -> Self {
        Self {
            pos,
            rot: Rot::new(angle),
        }
    }

    pub fn apply(self, v: Vec2) -> Vec2 {
        self.pos + self.rot.apply(v)
    }

    pub fn apply_inv(self, v: Vec2) -> Vec2 {
        self.rot.apply_inv(v - self.pos)
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec2,
    pub max: Vec2,
}

impl Aabb {
    /// Inverted-empty box: union with anything yields that thing.
    pub const EMPTY: Aabb = Aabb {
        min: Vec2::new(f32::MAX, f32::MAX),
        max: Vec2::new(f32::MIN, f32::MIN),
    };

    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    pub fn around(center: Vec2, half_extent: f32) -> Self {
        let h = Vec2::new(half_extent, half_extent);
        Self {
            min: center - h,
            max: center + h,
        }
    }

    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x
            && other.min.x <= self.max.x
            && self.min.y <= other.max.y
            && other.min.y <= self.max.y
    }

    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    pub fn expand(&self, margin: f32) -> Aabb {
        let m = Vec2::new(margin, margin);
        Aabb {
            min: self.min - m,
            max: self.max + m,
        }
    }
}

/// Solve the symmetric 2x2 system [k11 k12; k12 k22] * x = b.
/// Returns None when the matrix is singular (degenerate constraint).
pub fn solve22(k11: f32, k12: f32, k22: f32, b: Vec2) -> Option<Vec2> {
    let det = k11 * k22 - k12 * k12;
    if det.abs() < 1e-12 {
        return None;
    }
    let inv_det = 1.0 / det;
    Some(Vec2::new(
        inv_det * (k22 * b.x - k12 * b.y),
        inv_det * (k11 * b.y - k12 * b.x),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn cross_products_are_consistent() {
        let v = Vec2::new(3.0, -2.0);
        // s x v is v rotated 90 degrees CCW and scaled
        let sv = Vec2::cross_scalar_vec(2.0, v);
        assert_relative_eq!(sv.x, 4.0);
        assert_relative_eq!(sv.y, 6.0);
        // v x s = -(s x v)
        let vs = Vec2::cross_vec_scalar(v, 2.0);
        assert_relative_eq!(vs.x, -sv.x);
        assert_relative_eq!(vs.y, -sv.y);
    }

    #[test]
    fn rot_roundtrips() {
        let r = Rot::new(0.7);
        let v = Vec2::new(1.5, -4.0);
        let back = r.apply_inv(r.apply(v));
        assert_relative_eq!(back.x, v.x, epsilon = 1e-6);
        assert_relative_eq!(back.y, v.y, epsilon = 1e-6);
    }

    #[test]
    fn transform_roundtrips() {
        let xf = Transform::new(Vec2::new(3.0, 4.0), 1.2);
        let p = Vec2::new(-2.0, 0.5);
        let back = xf.apply_inv(xf.apply(p));
        assert_relative_eq!(back.x, p.x, epsilon = 1e-6);
        assert_relative_eq!(back.y, p.y, epsilon = 1e-6);
    }

    #[test]
    fn normalized_zero_is_zero() {
        assert_eq!(Vec2::ZERO.normalized(), Vec2::ZERO);
    }

    #[test]
    fn aabb_overlap_and_union() {
        let a = Aabb::new(Vec2::new(0.0, 0.0), Vec2::new(2.0, 2.0));
        let b = Aabb::new(Vec2::new(1.0, 1.0), Vec2::new(3.0, 3.0));
        let c = Aabb::new(Vec2::new(5.0, 5.0), Vec2::new(6.0, 6.0));
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c));
        let u = a.union(&c);
        assert_eq!(u.min, Vec2::ZERO);
        assert_eq!(u.max, Vec2::new(6.0, 6.0));
    }

    #[test]
    fn solve22_singular_is_none() {
        assert!(solve22(0.0, 0.0, 0.0, Vec2::new(1.0, 1.0)).is_none());
        let x = solve22(2.0, 0.0, 4.0, Vec2::new(2.0, 8.0)).unwrap();
        assert_relative_eq!(x.x, 1.0);
        assert_relative_eq!(x.y, 2.0);
    }
}
