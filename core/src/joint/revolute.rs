//! Revolute joint: pins two bodies at a shared point, with an optional
//! angular motor and optional angle limits.

use crate::body::Body;
use crate::config::{ANGULAR_SLOP, LINEAR_SLOP, MAX_ANGULAR_CORRECTION};
use crate::math::{Rot, Vec2, solve22};

use super::{JointBase, LimitState, world_anchor};

#[derive(Debug, Clone)]
pub struct RevoluteJoint {
    pub base: JointBase,
    pub local1: Vec2,
    pub local2: Vec2,
    pub ref_angle: f32,
    pub enable_limit: bool,
    pub lower: f32,
    pub upper: f32,
    pub enable_motor: bool,
    pub motor_speed: f32,
    pub max_motor_torque: f32,
    pub state: LimitState,
    // Solver cache.
    pub r1: Vec2,
    pub r2: Vec2,
    pub k11: f32,
    pub k12: f32,
    pub k22: f32,
    pub em_ang: f32,
    pub acc: Vec2,
    pub motor_acc: f32,
    pub limit_acc: f32,
    pub max_motor_impulse: f32,
}

impl RevoluteJoint {
    pub fn new(b1: &Body, b2: &Body, pivot: Vec2) -> Self {
        Self {
            base: JointBase::new(b1.id, b2.id),
            local1: super::local_anchor(b1, pivot),
            local2: super::local_anchor(b2, pivot),
            ref_angle: b2.a - b1.a,
            enable_limit: false,
            lower: 0.0,
            upper: 0.0,
            enable_motor: false,
            motor_speed: 0.0,
            max_motor_torque: 0.0,
            state: LimitState::Inactive,
            r1: Vec2::ZERO,
            r2: Vec2::ZERO,
            k11: 0.0,
            k12: 0.0,
            k22: 0.0,
            em_ang: 0.0,
            acc: Vec2::ZERO,
            motor_acc: 0.0,
            limit_acc: 0.0,
            max_motor_impulse: 0.0,
        }
    }

    pub fn joint_angle(&self, b1: &Body, b2: &Body) -> f32 {
        b2.a - b1.a - self.ref_angle
    }

    pub fn init_solver(&mut self, b1: &mut Body, b2: &mut Body, dt: f32, warm_starting: bool) {
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
        self.max_motor_impulse = self.max_motor_torque * dt;

        if self.enable_limit {
            let angle = self.joint_angle(b1, b2);
            if (self.upper - self.lower).abs() < 2.0 * ANGULAR_SLOP {
                self.state = LimitState::Equal;
            } else if angle <= self.lower {
                if self.state != LimitState::AtLower {
                    self.limit_acc = 0.0;
                }
                self.state = LimitState::AtLower;
            } else if angle >= self.upper {
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
            let p = self.acc;
            b1.v -= p * b1.inv_mass;
            b1.w -= b1.inv_inertia * (self.r1.cross(p) + self.motor_acc + self.limit_acc);
            b2.v += p * b2.inv_mass;
            b2.w += b2.inv_inertia * (self.r2.cross(p) + self.motor_acc + self.limit_acc);
        } else {
            self.acc = Vec2::ZERO;
            self.motor_acc = 0.0;
            self.limit_acc = 0.0;
        }
    }

    pub fn solve_velocity(&mut self, b1: &mut Body, b2: &mut Body) {
        // Motor.
        if self.enable_motor && self.state != LimitState::Equal {
            let cdot = b2.w - b1.w - self.motor_speed;
            let impulse = -self.em_ang * cdot;
            let old = self.motor_acc;
            self.motor_acc =
                (old + impulse).clamp(-self.max_motor_impulse, self.max_motor_impulse);
            let impulse = self.motor_acc - old;
            b1.w -= b1.inv_inertia * impulse;
            b2.w += b2.inv_inertia * impulse;
        }

        // Limit.
        if self.enable_limit && self.state != LimitState::Inactive {
            let cdot = b2.w - b1.w;
            let mut impulse = -self.em_ang * cdot;
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
            b1.w -= b1.inv_inertia * impulse;
            b2.w += b2.inv_inertia * impulse;
        }

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
        // Angular limit correction.
        let mut ang_ok = true;
        if self.enable_limit && self.state != LimitState::Inactive {
            let angle = self.joint_angle(b1, b2);
            let c = match self.state {
                LimitState::AtLower => {
                    (angle - self.lower + ANGULAR_SLOP).clamp(-MAX_ANGULAR_CORRECTION, 0.0)
                }
                LimitState::AtUpper => {
                    (angle - self.upper - ANGULAR_SLOP).clamp(0.0, MAX_ANGULAR_CORRECTION)
                }
                LimitState::Equal => {
                    (angle - self.lower).clamp(-MAX_ANGULAR_CORRECTION, MAX_ANGULAR_CORRECTION)
                }
                LimitState::Inactive => 0.0,
            };
            if self.em_ang > 0.0 && c != 0.0 {
                let impulse = -self.em_ang * c;
                b1.a -= b1.inv_inertia * impulse;
                b2.a += b2.inv_inertia * impulse;
            }
            ang_ok = c.abs() <= ANGULAR_SLOP;
        }

        // Point-to-point correction.
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

        pos_err <= LINEAR_SLOP && ang_ok
    }

    pub fn reaction_force(&self, inv_dt: f32) -> Vec2 {
        self.acc * inv_dt
    }

    pub fn reaction_torque(&self, inv_dt: f32) -> f32 {
        (self.motor_acc + self.limit_acc) * inv_dt
    }

    pub fn anchor1(&self, b1: &Body) -> Vec2 {
        world_anchor(b1, self.local1)
    }

    pub fn anchor2(&self, b2: &Body) -> Vec2 {
        world_anchor(b2, self.local2)
    }
}
