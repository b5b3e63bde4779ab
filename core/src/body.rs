use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::joint::JointId;
use crate::math::{Aabb, Rot, Transform, Vec2};
use crate::shape::{Shape, ShapeId};

pub type BodyId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyKind {
    Static,
    Dynamic,
    Kinematic,
}

/// A rigid body: pose, velocity, mass data, and an ordered list of shapes.
///
/// `p` is the world-space position of the center of mass; `centroid` is the
/// same point in the body-local frame. The body origin (the frame shapes are
/// authored in) is `p - R(a) * centroid`.
#[derive(Debug, Clone)]
pub struct Body {
    pub id: BodyId,
    pub kind: BodyKind,
    /// World position of the center of mass.
    pub p: Vec2,
    pub a: f32,
    /// Linear velocity of the center of mass.
    pub v: Vec2,
    pub w: f32,
    pub force: Vec2,
    pub torque: f32,
    pub mass: f32,
    pub inv_mass: f32,
    pub inertia: f32,
    pub inv_inertia: f32,
    /// Center of mass in the body-local frame.
    pub centroid: Vec2,
    pub shapes: Vec<Shape>,
    /// Union of world shape bounds, valid after `cache_data`.
    pub aabb: Aabb,
    pub layer: u16,
    pub mask: u16,
    pub awake: bool,
    pub sleep_time: f32,
    /// Ids of joints attached to this body (looked up in the world table).
    pub joints: BTreeSet<JointId>,
}

impl Body {
    pub fn new(id: BodyId, kind: BodyKind, position: Vec2, angle: f32) -> Self {
        Self {
            id,
            kind,
            p: position,
            a: angle,
            v: Vec2::ZERO,
            w: 0.0,
            force: Vec2::ZERO,
            torque: 0.0,
            mass: 0.0,
            inv_mass: 0.0,
            inertia: 0.0,
            inv_inertia: 0.0,
            centroid: Vec2::ZERO,
            shapes: Vec::new(),
            aabb: Aabb::EMPTY,
            layer: 0xFFFF,
            mask: 0xFFFF,
            awake: true,
            sleep_time: 0.0,
            joints: BTreeSet::new(),
        }
    }

    pub fn is_static(&self) -> bool {
        self.kind == BodyKind::Static
    }

    pub fn is_dynamic(&self) -> bool {
        self.kind == BodyKind::Dynamic
    }

    pub fn is_kinematic(&self) -> bool {
        self.kind == BodyKind::Kinematic
    }

    /// Awake and able to move: static bodies are never active.
    pub fn is_active(&self) -> bool {
        self.awake && !self.is_static()
    }

    /// Body-origin transform for shape authoring and external consumers.
    pub fn transform(&self) -> Transform {
        let rot = Rot::new(self.a);
        Transform {
            pos: self.p - rot.apply(self.centroid),
            rot,
        }
    }

    /// Body-origin world position.
    pub fn position(&self) -> Vec2 {
        self.transform().pos
    }

    pub fn add_shape(&mut self, shape: Shape) {
        self.shapes.push(shape);
        self.reset_mass_data();
        self.cache_data();
    }

    pub fn remove_shape(&mut self, id: ShapeId) -> bool {
        let before = self.shapes.len();
        self.shapes.retain(|s| s.id != id);
        if self.shapes.len() == before {
            return false;
        }
        self.reset_mass_data();
        self.cache_data();
        true
    }

    /// Recompute mass, inertia, and centroid from the shape list.
    ///
    /// Static and kinematic bodies keep zero inverses; a dynamic body whose
    /// shapes contribute no mass behaves the same way. The world centroid
    /// position `p` is shifted so the body origin stays fixed, and the
    /// centroid velocity picks up the spin term for the shifted point.
    pub fn reset_mass_data(&mut self) {
        let rot = Rot::new(self.a);
        let old_local = self.centroid;
        let old_world = self.p;

        let mut mass = 0.0f32;
        let mut centroid = Vec2::ZERO;
        let mut parts = Vec::with_capacity(self.shapes.len());
        for shape in &self.shapes {
            let md = shape.mass_data();
            mass += md.mass;
            centroid += md.centroid * md.mass;
            parts.push(md);
        }
        if mass > 0.0 {
            centroid = centroid * (1.0 / mass);
        } else {
            centroid = Vec2::ZERO;
        }
        let mut inertia = 0.0f32;
        for md in &parts {
            inertia += md.inertia + md.mass * md.centroid.distance_sq(centroid);
        }

        self.mass = mass;
        self.inertia = inertia;
        self.centroid = centroid;
        if self.kind == BodyKind::Dynamic && mass > 0.0 {
            self.inv_mass = 1.0 / mass;
            self.inv_inertia = if inertia > 0.0 { 1.0 / inertia } else { 0.0 };
        } else {
            self.inv_mass = 0.0;
            self.inv_inertia = 0.0;
        }

        // Keep the body origin fixed while p tracks the new centroid.
        self.p = old_world + rot.apply(centroid - old_local);
        self.v += Vec2::cross_scalar_vec(self.w, self.p - old_world);
    }

    /// Integrate external forces into velocity. `damping_step` is the global
    /// damping coefficient already raised to dt.
    pub fn update_velocity(&mut self, gravity: Vec2, damping_step: f32, dt: f32) {
        if !self.awake || self.kind != BodyKind::Dynamic || self.inv_mass == 0.0 {
            return;
        }
        self.v = (self.v + (gravity + self.force * self.inv_mass) * dt) * damping_step;
        self.w = (self.w + self.torque * self.inv_inertia * dt) * damping_step;
    }

    /// Semi-implicit Euler position update. Clears accumulated forces.
    pub fn update_position(&mut self, dt: f32) {
        if !self.awake || self.is_static() {
            self.force = Vec2::ZERO;
            self.torque = 0.0;
            return;
        }
        self.p += self.v * dt;
        self.a += self.w * dt;
        self.force = Vec2::ZERO;
        self.torque = 0.0;
    }

    /// Recompute world shape geometry and the body AABB.
    pub fn cache_data(&mut self) {
        let xf = self.transform();
        let mut aabb = Aabb::EMPTY;
        for shape in &mut self.shapes {
            shape.cache(&xf);
            aabb = aabb.union(&shape.aabb);
        }
        self.aabb = aabb;
    }

    pub fn set_awake(&mut self, awake: bool) {
        if self.is_static() {
            return;
        }
        if awake {
            if !self.awake {
                log::debug!("body {} woke", self.id);
            }
            self.awake = true;
            self.sleep_time = 0.0;
        } else {
            self.awake = false;
            self.sleep_time = 0.0;
            self.v = Vec2::ZERO;
            self.w = 0.0;
            self.force = Vec2::ZERO;
            self.torque = 0.0;
        }
    }

    pub fn apply_force(&mut self, f: Vec2) {
        if !self.is_dynamic() {
            return;
        }
        self.force += f;
        self.set_awake(true);
    }

    pub fn apply_force_at(&mut self, f: Vec2, world_point: Vec2) {
        if !self.is_dynamic() {
            return;
        }
        self.force += f;
        self.torque += (world_point - self.p).cross(f);
        self.set_awake(true);
    }

    pub fn apply_torque(&mut self, t: f32) {
        if !self.is_dynamic() {
            return;
        }
        self.torque += t;
        self.set_awake(true);
    }

    pub fn apply_impulse(&mut self, impulse: Vec2, world_point: Vec2) {
        if !self.is_dynamic() {
            return;
        }
        self.v += impulse * self.inv_mass;
        self.w += (world_point - self.p).cross(impulse) * self.inv_inertia;
        self.set_awake(true);
    }

    /// Layer/mask and kind filter; the joint-link part of the collidability
    /// rule lives in the world, which owns the joint table.
    pub fn filter_collide(&self, other: &Body) -> bool {
        if !self.is_dynamic() && !other.is_dynamic() {
            return false;
        }
        (self.layer & other.mask) != 0 && (other.layer & self.mask) != 0
    }
}
