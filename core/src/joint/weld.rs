//! Weld joint: pins two bodies at a point and locks their relative angle.

use crate::body::Body;
use crate::config::{ANGULAR_SLOP, LINEAR_SLOP, MAX_ANGULAR_CORRECTION};
use crate::math::{Rot, Vec2, solve22};

use super::{JointBase, world_anchor};

#[derive(Debug, Clone)]
pub struct WeldJoint {
    pub base: JointBase,
    pub local1: Vec2,
    pub local2: Vec2,
    pub ref_angle: f32,
    // Solver cache.
    pub r1: Vec2,
    pub r2: Vec2,
    pub k11: f32,
    pub k12: f32,
    pub k22: f32,
    pub em_ang: f32,
    pub acc: Vec2,
    pub ang_acc: f32,
}

impl WeldJoint {
    pub fn new(b1: &Body, b2: &Body, pivot: Vec2) -> Self {
        Self {
            base: JointBase::new(b1.id, b2.id),
            local1: super::local_anchor(b1, pivot),
            local2: super::local_anchor(b2, pivot),
            ref_angle: b2.a - b1.a,
            r1: Vec2::ZERO,
            r2: Vec2::ZERO,
            k11: 0.0,
            k12: 0.0,
            k22: 0.0,
            em_ang: 0.0,
            acc: Vec2::ZERO,
            ang_acc: 0.0,
        }
    }

    pub fn init_solver(&mut self, b1: &mut Body, b2: &mut Body, _dt: f32, warm_starting: bool) {
        self.r1 = Rot::new(b1.a).apply(self.local1);
        self.r2 = Rot::new(b2.a).apply(self.local2);

        self.k11 = b1.inv_mass
            + b2.inv_mass
            + b1.inv_inertia * self.r1.y * self.r1.y
            + b2.inv_inertia * self.r2.y * self.r2.y;
        self.k12 =
            -b1.inv_inertia * self.r1.x * self.r1.y - b2.inv_inertia * self.r2.x * self.r2.y;
        self.k22 = b1.inv_mass
            + b2.inv_mass
            + b1.inv_inertia * self.r1.x * self.r1.x
            + b2.inv_inertia * self.r2.x * self.r2.x;
        let ii_sum = b1.inv_inertia + b2.inv_inertia;
        self.em_ang = if ii_sum > 0.0 { 1.0 / ii_sum } else { 0.0 };

        if warm_starting {
            let p = self.acc;
            b1.v -= p * b1.inv_mass;
            b1.w -= b1.inv_inertia * (self.r1.cross(p) + self.ang_acc);
            b2.v += p * b2.inv_mass;
            b2.w += b2.inv_inertia * (self.r2.cross(p) + self.ang_acc);
        } else {
            self.acc = Vec2::ZERO;
            self.ang_acc = 0.0;
        }
    }

    pub fn solve_velocity(&mut self, b1: &mut Body, b2: &mut Body) {
        // Angle lock.
        let cdot = b2.w - b1.w;
        let impulse = -self.em_ang * cdot;
        self.ang_acc += impulse;
        b1.w -= b1.inv_inertia * impulse;
        b2.w += b2.inv_inertia * impulse;

        // Point-to-point.
        let cdot = b2.v + Vec2::cross_scalar_vec(b2.w, self.r2)
            - b1.v
            - Vec2::cross_scalar_vec(b1.w, self.r1);
        if let Some(impulse) = solve22(self.k11, self.k12, self.k22, -cdot) {
            self.acc += impulse;
            b1.v -= impulse * b1.inv_mass;
            b1.w -= b1.inv_inertia * self.r1.cross(impulse);
            b2.v += impulse * b2.inv_mass;
            b2.w += b2.inv_inertia * self.r2.cross(impulse);
        }
    }

    pub fn solve_position(&mut self, b1: &mut Body, b2: &mut Body) -> bool {
        // Angle correction.
        let c_ang = b2.a - b1.a - self.ref_angle;
        if self.em_ang > 0.0 {
            let clamped = c_ang.clamp(-MAX_ANGULAR_CORRECTION, MAX_ANGULAR_CORRECTION);
            let impulse = -self.em_ang * clamped;
            b1.a -= b1.inv_inertia * impulse;
            b2.a += b2.inv_inertia * impulse;
        }

        // Point correction.
        let r1 = Rot::new(b1.a).apply(self.local1);
        let r2 = Rot::new(b2.a).apply(self.local2);
        let c = (b2.p + r2) - (b1.p + r1);
        let pos_err = c.length();
        let k11 = b1.inv_mass
            + b2.inv_mass
            + b1.inv_inertia * r1.y * r1.y
            + b2.inv_inertia * r2.y * r2.y;
        let k12 = -b1.inv_inertia * r1.x * r1.y - b2.inv_inertia * r2.x * r2.y;
        let k22 = b1.inv_mass
            + b2.inv_mass
            + b1.inv_inertia * r1.x * r1.x
            + b2.inv_inertia * r2.x * r2.x;
        if let Some(impulse) = solve22(k11, k12, k22, -c) {
            b1.p -= impulse * b1.inv_mass;
            b1.a -= b1.inv_inertia * r1.cross(impulse);
            b2.p += impulse * b2.inv_mass;
            b2.a += b2.inv_inertia * r2.cross(impulse);
        }

        pos_err <= LINEAR_SLOP && c_ang.abs() <= ANGULAR_SLOP
    }

    pub fn reaction_force(&self, inv_dt: f32) -> Vec2 {
        self.acc * inv_dt
    }

    pub fn reaction_torque(&self, inv_dt: f32) -> f32 {
        self.ang_acc * inv_dt
    }

    pub fn anchor1(&self, b1: &Body) -> Vec2 {
        world_anchor(b1, self.local1)
    }

    pub fn anchor2(&self, b2: &Body) -> Vec2 {
        world_anchor(b2, self.local2)
    }
}
