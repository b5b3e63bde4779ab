//! Persistent contact manifold and its sequential-impulse solver.
//!
//! One `ContactSolver` lives per colliding shape pair and survives across
//! steps; accumulated impulses carry over between steps for points whose
//! feature ids match (warm starting).

use crate::body::{Body, BodyId};
use crate::collision::{Contact, FeaturePair};
use crate::config::{LINEAR_SLOP, MAX_LINEAR_CORRECTION, RESTITUTION_THRESHOLD};
use crate::math::{Rot, Vec2};
use crate::shape::{Shape, ShapeId};

#[derive(Debug, Clone, Copy)]
pub struct ContactPoint {
    /// World position at narrow-phase time.
    pub position: Vec2,
    pub depth: f32,
    pub feature: FeaturePair,
    /// Accumulated normal impulse.
    pub jn_acc: f32,
    /// Accumulated tangent impulse.
    pub jt_acc: f32,
    /// Restitution bias velocity (target rebound speed).
    pub bias: f32,
    /// Effective mass along the normal.
    pub en: f32,
    /// Effective mass along the tangent.
    pub et: f32,
    /// Lever arms from the body centroids, world frame at init time.
    pub r1: Vec2,
    pub r2: Vec2,
    /// Anchors in each body's centroid-local frame, for the position solver.
    pub local1: Vec2,
    pub local2: Vec2,
    /// Separation at narrow-phase time (negative of depth).
    pub sep0: f32,
}

impl ContactPoint {
    fn from_contact(c: &Contact) -> Self {
        Self {
            position: c.position,
            depth: c.depth,
            feature: c.feature,
            jn_acc: 0.0,
            jt_acc: 0.0,
            bias: 0.0,
            en: 0.0,
            et: 0.0,
            r1: Vec2::ZERO,
            r2: Vec2::ZERO,
            local1: Vec2::ZERO,
            local2: Vec2::ZERO,
            sep0: -c.depth,
        }
    }
}

/// Solver state for one shape pair. Invariant: `shape1.kind() <= shape2.kind()`
/// in the canonical ordering used by the narrow phase.
#[derive(Debug, Clone)]
pub struct ContactSolver {
    pub shape1: ShapeId,
    pub shape2: ShapeId,
    pub body1: BodyId,
    pub body2: BodyId,
    /// Combined restitution: max of the pair.
    pub restitution: f32,
    /// Combined friction: geometric mean of the pair.
    pub friction: f32,
    /// Separating normal, shape1 toward shape2.
    pub normal: Vec2,
    pub points: Vec<ContactPoint>,
}

impl ContactSolver {
    pub fn new(s1: &Shape, s2: &Shape, body1: BodyId, body2: BodyId, contacts: &[Contact]) -> Self {
        let mut solver = Self {
            shape1: s1.id,
            shape2: s2.id,
            body1,
            body2,
            restitution: s1.restitution.max(s2.restitution),
            friction: (s1.friction * s2.friction).sqrt(),
            normal: Vec2::ZERO,
            points: Vec::with_capacity(contacts.len()),
        };
        solver.update(contacts, false);
        solver
    }

    /// Replace the manifold with this step's contacts, carrying forward
    /// accumulated impulses from old points whose feature ids match.
    pub fn update(&mut self, contacts: &[Contact], warm_starting: bool) {
        let mut points = Vec::with_capacity(contacts.len());
        for c in contacts {
            let mut point = ContactPoint::from_contact(c);
            if warm_starting {
                if let Some(old) = self.points.iter().find(|p| p.feature == c.feature) {
                    point.jn_acc = old.jn_acc;
                    point.jt_acc = old.jt_acc;
                }
            }
            points.push(point);
        }
        if let Some(first) = contacts.first() {
            self.normal = first.normal;
        }
        self.points = points;
    }

    /// Precompute lever arms, effective masses, and restitution bias from the
    /// current body state. Runs once per step before the velocity iterations.
    pub fn init(&mut self, b1: &Body, b2: &Body) {
        let n = self.normal;
        let t = Vec2::cross_vec_scalar(n, 1.0);
        let rot1 = Rot::new(b1.a);
        let rot2 = Rot::new(b2.a);
        for p in &mut self.points {
            p.r1 = p.position - b1.p;
            p.r2 = p.position - b2.p;
            p.local1 = rot1.apply_inv(p.r1);
            p.local2 = rot2.apply_inv(p.r2);

            let rn1 = p.r1.cross(n);
            let rn2 = p.r2.cross(n);
            let kn = b1.inv_mass
                + b2.inv_mass
                + b1.inv_inertia * rn1 * rn1
                + b2.inv_inertia * rn2 * rn2;
            p.en = if kn > 0.0 { 1.0 / kn } else { 0.0 };

            let rt1 = p.r1.cross(t);
            let rt2 = p.r2.cross(t);
            let kt = b1.inv_mass
                + b2.inv_mass
                + b1.inv_inertia * rt1 * rt1
                + b2.inv_inertia * rt2 * rt2;
            p.et = if kt > 0.0 { 1.0 / kt } else { 0.0 };

            let dv = b2.v + Vec2::cross_scalar_vec(b2.w, p.r2)
                - b1.v
                - Vec2::cross_scalar_vec(b1.w, p.r1);
            let vn = dv.dot(n);
            p.bias = if vn < -RESTITUTION_THRESHOLD {
                -self.restitution * vn
            } else {
                0.0
            };
        }
    }

    /// Apply the carried-over impulses so the velocity solver starts from
    /// last step's solution.
    pub fn warm_start(&mut self, b1: &mut Body, b2: &mut Body) {
        let n = self.normal;
        let t = Vec2::cross_vec_scalar(n, 1.0);
        for p in &self.points {
            if p.jn_acc == 0.0 && p.jt_acc == 0.0 {
                continue;
            }
            let impulse = n * p.jn_acc + t * p.jt_acc;
            b1.v -= impulse * b1.inv_mass;
            b1.w -= b1.inv_inertia * p.r1.cross(impulse);
            b2.v += impulse * b2.inv_mass;
            b2.w += b2.inv_inertia * p.r2.cross(impulse);
        }
    }

    /// One Gauss-Seidel velocity iteration. Tangent is solved before normal
    /// within each point; the friction cone clamps against the accumulated
    /// normal impulse.
    pub fn solve_velocity(&mut self, b1: &mut Body, b2: &mut Body) {
        let n = self.normal;
        let t = Vec2::cross_vec_scalar(n, 1.0);
        for p in &mut self.points {
            // Tangent.
            let dv = b2.v + Vec2::cross_scalar_vec(b2.w, p.r2)
                - b1.v
                - Vec2::cross_scalar_vec(b1.w, p.r1);
            let vt = dv.dot(t);
            let d_jt = -p.et * vt;
            let max_jt = self.friction * p.jn_acc;
            let old_jt = p.jt_acc;
            p.jt_acc = (old_jt + d_jt).clamp(-max_jt, max_jt);
            let d_jt = p.jt_acc - old_jt;
            let impulse = t * d_jt;
            b1.v -= impulse * b1.inv_mass;
            b1.w -= b1.inv_inertia * p.r1.cross(impulse);
            b2.v += impulse * b2.inv_mass;
            b2.w += b2.inv_inertia * p.r2.cross(impulse);

            // Normal.
            let dv = b2.v + Vec2::cross_scalar_vec(b2.w, p.r2)
                - b1.v
                - Vec2::cross_scalar_vec(b1.w, p.r1);
            let vn = dv.dot(n);
            let d_jn = -p.en * (vn - p.bias);
            let old_jn = p.jn_acc;
            p.jn_acc = (old_jn + d_jn).max(0.0);
            let d_jn = p.jn_acc - old_jn;
            let impulse = n * d_jn;
            b1.v -= impulse * b1.inv_mass;
            b1.w -= b1.inv_inertia * p.r1.cross(impulse);
            b2.v += impulse * b2.inv_mass;
            b2.w += b2.inv_inertia * p.r2.cross(impulse);
        }
    }

    /// One position iteration: pseudo-impulses push penetration back toward
    /// the slop. Returns the smallest separation seen before correction.
    pub fn solve_position(&mut self, b1: &mut Body, b2: &mut Body) -> f32 {
        let n = self.normal;
        let mut min_sep = f32::MAX;
        for p in &self.points {
            let r1 = Rot::new(b1.a).apply(p.local1);
            let r2 = Rot::new(b2.a).apply(p.local2);
            let p1 = b1.p + r1;
            let p2 = b2.p + r2;
            let separation = (p2 - p1).dot(n) + p.sep0;
            min_sep = min_sep.min(separation);

            let correction = (separation + LINEAR_SLOP).clamp(-MAX_LINEAR_CORRECTION, 0.0);
            if correction == 0.0 {
                continue;
            }
            let rn1 = r1.cross(n);
            let rn2 = r2.cross(n);
            let k = b1.inv_mass
                + b2.inv_mass
                + b1.inv_inertia * rn1 * rn1
                + b2.inv_inertia * rn2 * rn2;
            if k <= 0.0 {
                continue;
            }
            let lambda = -correction / k;
            let impulse = n * lambda;
            b1.p -= impulse * b1.inv_mass;
            b1.a -= b1.inv_inertia * r1.cross(impulse);
            b2.p += impulse * b2.inv_mass;
            b2.a += b2.inv_inertia * r2.cross(impulse);
        }
        min_sep
    }
}
