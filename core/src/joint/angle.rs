//! Angle joint: locks the relative angle of two bodies, with no positional
//! coupling at all.

use crate::body::Body;
use crate::config::{ANGULAR_SLOP, MAX_ANGULAR_CORRECTION};
use crate::math::Vec2;

use super::JointBase;

#[derive(Debug, Clone)]
pub struct AngleJoint {
    pub base: JointBase,
    pub ref_angle: f32,
    // Solver cache.
    pub em_ang: f32,
    pub acc: f32,
}

impl AngleJoint {
    pub fn new(b1: &Body, b2: &Body) -> Self {
        Self {
            base: JointBase::new(b1.id, b2.id),
            ref_angle: b2.a - b1.a,
            em_ang: 0.0,
            acc: 0.0,
        }
    }

    pub fn init_solver(&mut self, b1: &mut Body, b2: &mut Body, _dt: f32, warm_starting: bool) {
        let ii_sum = b1.inv_inertia + b2.inv_inertia;
        self.em_ang = if ii_sum > 0.0 { 1.0 / ii_sum } else { 0.0 };
        if warm_starting {
            b1.w -= b1.inv_inertia * self.acc;
            b2.w += b2.inv_inertia * self.acc;
        } else {
            self.acc = 0.0;
        }
    }

    pub fn solve_velocity(&mut self, b1: &mut Body, b2: &mut Body) {
        let cdot = b2.w - b1.w;
        let impulse = -self.em_ang * cdot;
        self.acc += impulse;
        b1.w -= b1.inv_inertia * impulse;
        b2.w += b2.inv_inertia * impulse;
    }

    pub fn solve_position(&mut self, b1: &mut Body, b2: &mut Body) -> bool {
        let c = b2.a - b1.a - self.ref_angle;
        if self.em_ang > 0.0 {
            let clamped = c.clamp(-MAX_ANGULAR_CORRECTION, MAX_ANGULAR_CORRECTION);
            let impulse = -self.em_ang * clamped;
            b1.a -= b1.inv_inertia * impulse;
            b2.a += b2.inv_inertia * impulse;
        }
        c.abs() <= ANGULAR_SLOP
    }

    pub fn reaction_force(&self, _inv_dt: f32) -> Vec2 {
        Vec2::ZERO
    }

    pub fn reaction_torque(&self, inv_dt: f32) -> f32 {
        self.acc * inv_dt
    }

    pub fn anchor1(&self, b1: &Body) -> Vec2 {
        b1.p
    }

    pub fn anchor2(&self, b2: &Body) -> Vec2 {
        b2.p
    }
}
