//! Distance joint: holds two anchors at a fixed separation. With a nonzero
//! frequency it behaves as a damped spring solved at the velocity level, in
//! which case the position pass is skipped.

use std::f32::consts::PI;

use crate::body::Body;
use crate::config::{LINEAR_SLOP, MAX_LINEAR_CORRECTION};
use crate::math::{Rot, Vec2};

use super::{JointBase, world_anchor};

#[derive(Debug, Clone)]
pub struct DistanceJoint {
    pub base: JointBase,
    pub local1: Vec2,
    pub local2: Vec2,
    pub rest_length: f32,
    /// Spring frequency in Hz; zero means rigid.
    pub frequency_hz: f32,
    pub damping_ratio: f32,
    // Solver cache.
    pub r1: Vec2,
    pub r2: Vec2,
    pub u: Vec2,
    pub s1: f32,
    pub s2: f32,
    pub em: f32,
    pub gamma: f32,
    pub bias: f32,
    pub acc: f32,
}

impl DistanceJoint {
    pub fn new(b1: &Body, b2: &Body, anchor1: Vec2, anchor2: Vec2) -> Self {
        Self {
            base: JointBase::new(b1.id, b2.id),
            local1: super::local_anchor(b1, anchor1),
            local2: super::local_anchor(b2, anchor2),
            rest_length: (anchor2 - anchor1).length(),
            frequency_hz: 0.0,
            damping_ratio: 0.0,
            r1: Vec2::ZERO,
            r2: Vec2::ZERO,
            u: Vec2::ZERO,
            s1: 0.0,
            s2: 0.0,
            em: 0.0,
            gamma: 0.0,
            bias: 0.0,
            acc: 0.0,
        }
    }

    pub fn init_solver(&mut self, b1: &mut Body, b2: &mut Body, dt: f32, warm_starting: bool) {
        self.r1 = Rot::new(b1.a).apply(self.local1);
        self.r2 = Rot::new(b2.a).apply(self.local2);
        let d = (b2.p + self.r2) - (b1.p + self.r1);
        let len = d.length();
        self.u = if len > LINEAR_SLOP {
            d * (1.0 / len)
        } else {
            Vec2::ZERO
        };
        self.s1 = self.r1.cross(self.u);
        self.s2 = self.r2.cross(self.u);
        let k = b1.inv_mass
            + b2.inv_mass
            + b1.inv_inertia * self.s1 * self.s1
            + b2.inv_inertia * self.s2 * self.s2;
        let em = if k > 0.0 { 1.0 / k } else { 0.0 };

        if self.frequency_hz > 0.0 && dt > 0.0 {
            let c = len - self.rest_length;
            let omega = 2.0 * PI * self.frequency_hz;
            let stiffness = em * omega * omega;
            let damping = 2.0 * em * self.damping_ratio * omega;
            let gamma = dt * (damping + dt * stiffness);
            self.gamma = if gamma > 0.0 { 1.0 / gamma } else { 0.0 };
            self.bias = c * dt * stiffness * self.gamma;
            let soft_k = k + self.gamma;
            self.em = if soft_k > 0.0 { 1.0 / soft_k } else { 0.0 };
        } else {
            self.gamma = 0.0;
            self.bias = 0.0;
            self.em = em;
        }

        if warm_starting {
            self.apply_impulse(b1, b2, self.acc);
        } else {
            self.acc = 0.0;
        }
    }

    fn apply_impulse(&self, b1: &mut Body, b2: &mut Body, lambda: f32) {
        let p = self.u * lambda;
        b1.v -= p * b1.inv_mass;
        b1.w -= b1.inv_inertia * self.s1 * lambda;
        b2.v += p * b2.inv_mass;
        b2.w += b2.inv_inertia * self.s2 * lambda;
    }

    pub fn solve_velocity(&mut self, b1: &mut Body, b2: &mut Body) {
        let cdot = self.u.dot(
            b2.v + Vec2::cross_scalar_vec(b2.w, self.r2)
                - b1.v
                - Vec2::cross_scalar_vec(b1.w, self.r1),
        );
        let impulse = -self.em * (cdot + self.bias + self.gamma * self.acc);
        self.acc += impulse;
        self.apply_impulse(b1, b2, impulse);
    }

    pub fn solve_position(&mut self, b1: &mut Body, b2: &mut Body) -> bool {
        if self.frequency_hz > 0.0 {
            // Spring: positional error is corrected by the velocity bias.
            return true;
        }
        let r1 = Rot::new(b1.a).apply(self.local1);
        let r2 = Rot::new(b2.a).apply(self.local2);
        let d = (b2.p + r2) - (b1.p + r1);
        let len = d.length();
        if len <= LINEAR_SLOP {
            return true;
        }
        let u = d * (1.0 / len);
        let c = len - self.rest_length;
        let correction = c.clamp(-MAX_LINEAR_CORRECTION, MAX_LINEAR_CORRECTION);
        let s1 = r1.cross(u);
        let s2 = r2.cross(u);
        let k = b1.inv_mass
            + b2.inv_mass
            + b1.inv_inertia * s1 * s1
            + b2.inv_inertia * s2 * s2;
        if k > 0.0 {
            let lambda = -correction / k;
            b1.p -= u * (lambda * b1.inv_mass);
            b1.a -= b1.inv_inertia * s1 * lambda;
            b2.p += u * (lambda * b2.inv_mass);
            b2.a += b2.inv_inertia * s2 * lambda;
        }
        c.abs() < LINEAR_SLOP
    }

    pub fn reaction_force(&self, inv_dt: f32) -> Vec2 {
        self.u * (self.acc * inv_dt)
    }

    pub fn reaction_torque(&self, _inv_dt: f32) -> f32 {
        0.0
    }

    pub fn anchor1(&self, b1: &Body) -> Vec2 {
        world_anchor(b1, self.local1)
    }

    pub fn anchor2(&self, b2: &Body) -> Vec2 {
        world_anchor(b2, self.local2)
    }
}
