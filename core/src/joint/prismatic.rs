//! Prismatic joint: the bodies slide along an axis fixed in body1's frame,
//! with relative rotation locked. Optional translation limits and a linear
//! motor, solved as sequential 1-D rows (angle lock, perpendicular, axial).

use crate::body::Body;
use crate::config::{
    ANGULAR_SLOP, LINEAR_SLOP, MAX_ANGULAR_CORRECTION, MAX_LINEAR_CORRECTION,
};
use crate::math::{Rot, Vec2};

use super::{JointBase, LimitState, world_anchor};

#[derive(Debug, Clone)]
pub struct PrismaticJoint {
    pub base: JointBase,
    pub local1: Vec2,
    pub local2: Vec2,
    /// Slide axis in body1's centroid-local frame, unit length.
    pub local_axis: Vec2,
    pub ref_angle: f32,
    pub enable_limit: bool,
    pub lower: f32,
    pub upper: f32,
    pub enable_motor: bool,
    pub motor_speed: f32,
    pub max_motor_force: f32,
    pub state: LimitState,
    // Solver cache.
    pub axis: Vec2,
    pub perp: Vec2,
    pub a1: f32,
    pub a2: f32,
    pub s1: f32,
    pub s2: f32,
    pub em_axial: f32,
    pub em_perp: f32,
    pub em_ang: f32,
    pub perp_acc: f32,
    pub ang_acc: f32,
    pub motor_acc: f32,
    pub limit_acc: f32,
    pub max_motor_impulse: f32,
}

impl PrismaticJoint {
    pub fn new(b1: &Body, b2: &Body, pivot: Vec2, axis: Vec2) -> Self {
        Self {
            base: JointBase::new(b1.id, b2.id),
            local1: super::local_anchor(b1, pivot),
            local2: super::local_anchor(b2, pivot),
            local_axis: Rot::new(b1.a).apply_inv(axis.normalized()),
            ref_angle: b2.a - b1.a,
            enable_limit: false,
            lower: 0.0,
            upper: 0.0,
            enable_motor: false,
            motor_speed: 0.0,
            max_motor_force: 0.0,
            state: LimitState::Inactive,
            axis: Vec2::ZERO,
            perp: Vec2::ZERO,
            a1: 0.0,
            a2: 0.0,
            s1: 0.0,
            s2: 0.0,
            em_axial: 0.0,
            em_perp: 0.0,
            em_ang: 0.0,
            perp_acc: 0.0,
            ang_acc: 0.0,
            motor_acc: 0.0,
            limit_acc: 0.0,
            max_motor_impulse: 0.0,
        }
    }

    /// Translation of body2's anchor along the slide axis.
    pub fn translation(&self, b1: &Body, b2: &Body) -> f32 {
        let r1 = Rot::new(b1.a).apply(self.local1);
        let r2 = Rot::new(b2.a).apply(self.local2);
        let d = (b2.p + r2) - (b1.p + r1);
        Rot::new(b1.a).apply(self.local_axis).dot(d)
    }

    pub fn init_solver(&mut self, b1: &mut Body, b2: &mut Body, dt: f32, warm_starting: bool) {
        let r1 = Rot::new(b1.a).apply(self.local1);
        let r2 = Rot::new(b2.a).apply(self.local2);
        let d = (b2.p + r2) - (b1.p + r1);

        self.axis = Rot::new(b1.a).apply(self.local_axis);
        self.perp = self.axis.perp();
        self.a1 = (d + r1).cross(self.axis);
        self.a2 = r2.cross(self.axis);
        self.s1 = (d + r1).cross(self.perp);
        self.s2 = r2.cross(self.perp);

        let k_axial = b1.inv_mass
            + b2.inv_mass
            + b1.inv_inertia * self.a1 * self.a1
            + b2.inv_inertia * self.a2 * self.a2;
        self.em_axial = if k_axial > 0.0 { 1.0 / k_axial } else { 0.0 };
        let k_perp = b1.inv_mass
            + b2.inv_mass
            + b1.inv_inertia * self.s1 * self.s1
            + b2.inv_inertia * self.s2 * self.s2;
        self.em_perp = if k_perp > 0.0 { 1.0 / k_perp } else { 0.0 };
        let ii_sum = b1.inv_inertia + b2.inv_inertia;
        self.em_ang = if ii_sum > 0.0 { 1.0 / ii_sum } else { 0.0 };
        self.max_motor_impulse = self.max_motor_force * dt;

        if self.enable_limit {
            let translation = self.axis.dot(d);
            if (self.upper - self.lower).abs() < 2.0 * LINEAR_SLOP {
                self.state = LimitState::Equal;
            } else if translation <= self.lower {
                if self.state != LimitState::AtLower {
                    self.limit_acc = 0.0;
                }
                self.state = LimitState::AtLower;
            } else if translation >= self.upper {
                if self.state != LimitState::AtUpper {
                    self.limit_acc = 0.0;
                }
                self.state = LimitState::AtUpper;
            } else {
                self.state = LimitState::Inactive;
                self.limit_acc = 0.0;
            }
        } else {
            self.state = LimitState::Inactive;
            self.limit_acc = 0.0;
        }
        if !self.enable_motor {
            self.motor_acc = 0.0;
        }

        if warm_starting {
            let axial = self.motor_acc + self.limit_acc;
            let p = self.perp * self.perp_acc + self.axis * axial;
            let l1 = self.perp_acc * self.s1 + self.ang_acc + axial * self.a1;
            let l2 = self.perp_acc * self.s2 + self.ang_acc + axial * self.a2;
            b1.v -= p * b1.inv_mass;
            b1.w -= b1.inv_inertia * l1;
            b2.v += p * b2.inv_mass;
            b2.w += b2.inv_inertia * l2;
        } else {
            self.perp_acc = 0.0;
            self.ang_acc = 0.0;
            self.motor_acc = 0.0;
            self.limit_acc = 0.0;
        }
    }

    fn apply_axial(&self, b1: &mut Body, b2: &mut Body, impulse: f32) {
        let p = self.axis * impulse;
        b1.v -= p * b1.inv_mass;
        b1.w -= b1.inv_inertia * self.a1 * impulse;
        b2.v += p * b2.inv_mass;
        b2.w += b2.inv_inertia * self.a2 * impulse;
    }

    pub fn solve_velocity(&mut self, b1: &mut Body, b2: &mut Body) {
        // Motor.
        if self.enable_motor && self.state != LimitState::Equal {
            let cdot =
                self.axis.dot(b2.v - b1.v) + self.a2 * b2.w - self.a1 * b1.w - self.motor_speed;
            let impulse = -self.em_axial * cdot;
            let old = self.motor_acc;
            self.motor_acc =
                (old + impulse).clamp(-self.max_motor_impulse, self.max_motor_impulse);
            self.apply_axial(b1, b2, self.motor_acc - old);
        }

        // Translation limit.
        if self.enable_limit && self.state != LimitState::Inactive {
            let cdot = self.axis.dot(b2.v - b1.v) + self.a2 * b2.w - self.a1 * b1.w;
            let mut impulse = -self.em_axial * cdot;
            match self.state {
                LimitState::AtLower => {
                    let old = self.limit_acc;
                    self.limit_acc = (old + impulse).max(0.0);
                    impulse = self.limit_acc - old;
                }
                LimitState::AtUpper => {
                    let old = self.limit_acc;
                    self.limit_acc = (old + impulse).min(0.0);
                    impulse = self.limit_acc - old;
                }
                LimitState::Equal => {
                    self.limit_acc += impulse;
                }
                LimitState::Inactive => unreachable!(),
            }
            self.apply_axial(b1, b2, impulse);
        }

        // Perpendicular row.
        let cdot = self.perp.dot(b2.v - b1.v) + self.s2 * b2.w - self.s1 * b1.w;
        let impulse = -self.em_perp * cdot;
        self.perp_acc += impulse;
        let p = self.perp * impulse;
        b1.v -= p * b1.inv_mass;
        b1.w -= b1.inv_inertia * self.s1 * impulse;
        b2.v += p * b2.inv_mass;
        b2.w += b2.inv_inertia * self.s2 * impulse;

        // Angle lock.
        let cdot = b2.w - b1.w;
        let impulse = -self.em_ang * cdot;
        self.ang_acc += impulse;
        b1.w -= b1.inv_inertia * impulse;
        b2.w += b2.inv_inertia * impulse;
    }

    pub fn solve_position(&mut self, b1: &mut Body, b2: &mut Body) -> bool {
        let r1 = Rot::new(b1.a).apply(self.local1);
        let r2 = Rot::new(b2.a).apply(self.local2);
        let d = (b2.p + r2) - (b1.p + r1);
        let axis = Rot::new(b1.a).apply(self.local_axis);
        let perp = axis.perp();
        let s1 = (d + r1).cross(perp);
        let s2 = r2.cross(perp);

        // Perpendicular error.
        let c_perp = perp.dot(d);
        let correction = c_perp.clamp(-MAX_LINEAR_CORRECTION, MAX_LINEAR_CORRECTION);
        let k_perp = b1.inv_mass
            + b2.inv_mass
            + b1.inv_inertia * s1 * s1
            + b2.inv_inertia * s2 * s2;
        if k_perp > 0.0 && correction != 0.0 {
            let lambda = -correction / k_perp;
            b1.p -= perp * (lambda * b1.inv_mass);
            b1.a -= b1.inv_inertia * s1 * lambda;
            b2.p += perp * (lambda * b2.inv_mass);
            b2.a += b2.inv_inertia * s2 * lambda;
        }

        // Angle error.
        let c_ang = b2.a - b1.a - self.ref_angle;
        if self.em_ang > 0.0 {
            let clamped = c_ang.clamp(-MAX_ANGULAR_CORRECTION, MAX_ANGULAR_CORRECTION);
            let impulse = -self.em_ang * clamped;
            b1.a -= b1.inv_inertia * impulse;
            b2.a += b2.inv_inertia * impulse;
        }

        // Translation limit error.
        let mut lim_ok = true;
        if self.enable_limit && self.state != LimitState::Inactive {
            let a1 = (d + r1).cross(axis);
            let a2 = r2.cross(axis);
            let translation = axis.dot(d);
            let c_lim = match self.state {
                LimitState::AtLower => {
                    (translation - self.lower + LINEAR_SLOP).clamp(-MAX_LINEAR_CORRECTION, 0.0)
                }
                LimitState::AtUpper => {
                    (translation - self.upper - LINEAR_SLOP).clamp(0.0, MAX_LINEAR_CORRECTION)
                }
                LimitState::Equal => (translation - self.lower)
                    .clamp(-MAX_LINEAR_CORRECTION, MAX_LINEAR_CORRECTION),
                LimitState::Inactive => 0.0,
            };
            let k_ax = b1.inv_mass
                + b2.inv_mass
                + b1.inv_inertia * a1 * a1
                + b2.inv_inertia * a2 * a2;
            if k_ax > 0.0 && c_lim != 0.0 {
                let lambda = -c_lim / k_ax;
                b1.p -= axis * (lambda * b1.inv_mass);
                b1.a -= b1.inv_inertia * a1 * lambda;
                b2.p += axis * (lambda * b2.inv_mass);
                b2.a += b2.inv_inertia * a2 * lambda;
            }
            lim_ok = c_lim.abs() <= LINEAR_SLOP;
        }

        c_perp.abs() <= LINEAR_SLOP && c_ang.abs() <= ANGULAR_SLOP && lim_ok
    }

    pub fn reaction_force(&self, inv_dt: f32) -> Vec2 {
        (self.perp * self.perp_acc + self.axis * (self.motor_acc + self.limit_acc)) * inv_dt
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
