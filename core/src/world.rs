//! World: body and joint registries plus the fixed-order step pipeline.
//!
//! Registries are indexed by monotonically assigned ids and always iterated
//! in id order, so a given scene and step parameters reproduce the same
//! trajectory. Id counters are world fields and reset with `clear`.

use std::collections::HashMap;
use std::time::Instant;

use log::debug;

use crate::body::{Body, BodyId, BodyKind};
use crate::collision::collide;
use crate::config::LINEAR_SLOP;
use crate::contact::ContactSolver;
use crate::joint::{Joint, JointId};
use crate::math::Vec2;
use crate::shape::{Shape, ShapeGeom, ShapeId};
use crate::sleep;
use crate::stats::StepStats;

pub struct World {
    bodies: Vec<Option<Body>>,
    joints: Vec<Option<Joint>>,
    solvers: Vec<ContactSolver>,
    next_body_id: BodyId,
    next_shape_id: ShapeId,
    next_joint_id: JointId,
    gravity: Vec2,
    /// Per-second velocity retention coefficient, applied as `damping^dt`.
    damping: f32,
    step_count: u64,
    post_solve: Option<Box<dyn FnMut(&ContactSolver)>>,
}

/// Disjoint mutable access to two registry slots.
fn two_bodies(bodies: &mut [Option<Body>], i: BodyId, j: BodyId) -> (&mut Body, &mut Body) {
    let (i, j) = (i as usize, j as usize);
    debug_assert!(i != j);
    if i < j {
        let (lo, hi) = bodies.split_at_mut(j);
        (lo[i].as_mut().unwrap(), hi[0].as_mut().unwrap())
    } else {
        let (lo, hi) = bodies.split_at_mut(i);
        (hi[0].as_mut().unwrap(), lo[j].as_mut().unwrap())
    }
}

impl World {
    pub fn new(gravity: Vec2) -> Self {
        Self {
            bodies: Vec::new(),
            joints: Vec::new(),
            solvers: Vec::new(),
            next_body_id: 0,
            next_shape_id: 0,
            next_joint_id: 0,
            gravity,
            damping: 1.0,
            step_count: 0,
            post_solve: None,
        }
    }

    pub fn gravity(&self) -> Vec2 {
        self.gravity
    }

    pub fn set_gravity(&mut self, gravity: Vec2) {
        self.gravity = gravity;
    }

    pub fn damping(&self) -> f32 {
        self.damping
    }

    pub fn set_damping(&mut self, damping: f32) {
        self.damping = damping;
    }

    pub fn step_count(&self) -> u64 {
        self.step_count
    }

    /// Hook invoked once per live contact solver at the end of each step.
    /// It receives read-only solver state and cannot touch world topology.
    pub fn set_post_solve(&mut self, hook: impl FnMut(&ContactSolver) + 'static) {
        self.post_solve = Some(Box::new(hook));
    }

    pub fn clear_post_solve(&mut self) {
        self.post_solve = None;
    }

    /// Tear down all bodies, joints, and manifolds and reset id counters.
    pub fn clear(&mut self) {
        self.bodies.clear();
        self.joints.clear();
        self.solvers.clear();
        self.next_body_id = 0;
        self.next_shape_id = 0;
        self.next_joint_id = 0;
        self.step_count = 0;
    }

    // ---------------------------------------------------------------------
    // Bodies and shapes
    // ---------------------------------------------------------------------

    pub fn add_body(&mut self, kind: BodyKind, position: Vec2, angle: f32) -> BodyId {
        let id = self.next_body_id;
        self.next_body_id += 1;
        let idx = id as usize;
        if idx >= self.bodies.len() {
            self.bodies.resize_with(idx + 1, || None);
        }
        self.bodies[idx] = Some(Body::new(id, kind, position, angle));
        id
    }

    /// Removing a body cascades removal of all its joints; their other
    /// endpoints wake. Manifolds involving the body drop on the next step.
    pub fn remove_body(&mut self, id: BodyId) {
        let Some(body) = self.bodies.get_mut(id as usize).and_then(Option::take) else {
            return;
        };
        for jid in body.joints {
            self.remove_joint(jid);
        }
    }

    pub fn body(&self, id: BodyId) -> Option<&Body> {
        self.bodies.get(id as usize)?.as_ref()
    }

    pub fn body_mut(&mut self, id: BodyId) -> Option<&mut Body> {
        self.bodies.get_mut(id as usize)?.as_mut()
    }

    /// Live bodies in id order.
    pub fn bodies(&self) -> impl Iterator<Item = &Body> {
        self.bodies.iter().flatten()
    }

    pub fn body_count(&self) -> usize {
        self.bodies.iter().flatten().count()
    }

    pub fn add_shape(
        &mut self,
        body_id: BodyId,
        geom: ShapeGeom,
        density: f32,
        restitution: f32,
        friction: f32,
    ) -> Option<ShapeId> {
        if self.body(body_id).is_none() {
            return None;
        }
        let id = self.next_shape_id;
        self.next_shape_id += 1;
        let shape = Shape::new(id, geom, density, restitution, friction);
        let body = self.body_mut(body_id).unwrap();
        body.add_shape(shape);
        Some(id)
    }

    pub fn remove_shape(&mut self, body_id: BodyId, shape_id: ShapeId) -> bool {
        self.body_mut(body_id)
            .is_some_and(|b| b.remove_shape(shape_id))
    }

    // ---------------------------------------------------------------------
    // Joints
    // ---------------------------------------------------------------------

    /// Register a joint; both endpoints wake.
    pub fn add_joint(&mut self, mut joint: Joint) -> JointId {
        let id = self.next_joint_id;
        self.next_joint_id += 1;
        joint.base_mut().id = id;
        for bid in [joint.body1(), joint.body2()] {
            if let Some(body) = self.body_mut(bid) {
                body.joints.insert(id);
                body.set_awake(true);
            }
        }
        let idx = id as usize;
        if idx >= self.joints.len() {
            self.joints.resize_with(idx + 1, || None);
        }
        self.joints[idx] = Some(joint);
        id
    }

    /// Unregister a joint; both endpoints wake.
    pub fn remove_joint(&mut self, id: JointId) {
        let Some(joint) = self.joints.get_mut(id as usize).and_then(Option::take) else {
            return;
        };
        for bid in [joint.body1(), joint.body2()] {
            if let Some(body) = self.body_mut(bid) {
                body.joints.remove(&id);
                body.set_awake(true);
            }
        }
    }

    pub fn joint(&self, id: JointId) -> Option<&Joint> {
        self.joints.get(id as usize)?.as_ref()
    }

    pub fn joint_mut(&mut self, id: JointId) -> Option<&mut Joint> {
        self.joints.get_mut(id as usize)?.as_mut()
    }

    /// Live joints in id order.
    pub fn joints(&self) -> impl Iterator<Item = &Joint> {
        self.joints.iter().flatten()
    }

    pub fn joint_count(&self) -> usize {
        self.joints.iter().flatten().count()
    }

    /// Contact solvers produced by the most recent step.
    pub fn contact_solvers(&self) -> &[ContactSolver] {
        &self.solvers
    }

    /// True when a collide_connected=false joint links the two bodies.
    fn joints_forbid(&self, a: &Body, b: &Body) -> bool {
        a.joints.iter().any(|jid| {
            self.joints
                .get(*jid as usize)
                .and_then(Option::as_ref)
                .is_some_and(|j| {
                    !j.collide_connected()
                        && ((j.body1() == a.id && j.body2() == b.id)
                            || (j.body1() == b.id && j.body2() == a.id))
                })
        })
    }

    // ---------------------------------------------------------------------
    // Authoring queries
    // ---------------------------------------------------------------------

    pub fn find_shape_at(&self, p: Vec2) -> Option<(BodyId, ShapeId)> {
        for body in self.bodies() {
            for shape in &body.shapes {
                if shape.aabb.contains(p) && shape.contains_point(p) {
                    return Some((body.id, shape.id));
                }
            }
        }
        None
    }

    pub fn find_vertex_at(&self, p: Vec2, tol: f32) -> Option<(BodyId, ShapeId, usize)> {
        for body in self.bodies() {
            for shape in &body.shapes {
                if let Some(i) = shape.vertex_near(p, tol) {
                    return Some((body.id, shape.id, i));
                }
            }
        }
        None
    }

    pub fn find_edge_at(&self, p: Vec2, tol: f32) -> Option<(BodyId, ShapeId, usize)> {
        for body in self.bodies() {
            for shape in &body.shapes {
                if let Some(i) = shape.edge_near(p, tol) {
                    return Some((body.id, shape.id, i));
                }
            }
        }
        None
    }

    pub fn find_joint_at(&self, p: Vec2, tol: f32) -> Option<JointId> {
        let tol_sq = tol * tol;
        for joint in self.joints() {
            let (Some(b1), Some(b2)) = (self.body(joint.body1()), self.body(joint.body2()))
            else {
                continue;
            };
            if joint.anchor1(b1).distance_sq(p) <= tol_sq
                || joint.anchor2(b2).distance_sq(p) <= tol_sq
            {
                return Some(joint.id());
            }
        }
        None
    }

    // ---------------------------------------------------------------------
    // Stepping
    // ---------------------------------------------------------------------

    /// Advance the world by one fixed step.
    ///
    /// Pipeline order is part of the contract: collision and manifold
    /// persistence, solver init, warm start, force integration, wake
    /// propagation, velocity solve (joints before contacts), position
    /// integration, joint breakage, position solve (contacts before joints),
    /// transform sync, post-solve hook, sleep accounting.
    pub fn step(
        &mut self,
        dt: f32,
        velocity_iterations: usize,
        position_iterations: usize,
        warm_starting: bool,
        allow_sleep: bool,
    ) -> StepStats {
        let mut stats = StepStats::default();
        if dt <= 0.0 {
            stats.bodies = self.body_count();
            stats.joints = self.joint_count();
            return stats;
        }
        let inv_dt = 1.0 / dt;
        self.step_count += 1;

        // 1. Broad phase, narrow phase, manifold persistence.
        let t_collision = Instant::now();
        self.update_contacts(warm_starting);
        stats.contacts = self.solvers.iter().map(|s| s.points.len()).sum();
        stats.collision = t_collision.elapsed();

        // 2. Solver init (joints apply or clear their own warm impulses).
        let t_init = Instant::now();
        {
            let bodies = &mut self.bodies;
            for solver in &mut self.solvers {
                let (b1, b2) = two_bodies(bodies, solver.body1, solver.body2);
                solver.init(b1, b2);
            }
            for joint in self.joints.iter_mut().flatten() {
                if !joint_pair_active(bodies, joint) {
                    continue;
                }
                let (b1, b2) = two_bodies(bodies, joint.body1(), joint.body2());
                joint.init_solver(b1, b2, dt, warm_starting);
            }
        }
        stats.init = t_init.elapsed();

        // 3. Warm start contacts.
        if warm_starting {
            let bodies = &mut self.bodies;
            for solver in &mut self.solvers {
                let (b1, b2) = two_bodies(bodies, solver.body1, solver.body2);
                solver.warm_start(b1, b2);
            }
        }

        // 4. Integrate forces into velocities.
        let damping_step = self.damping.powf(dt);
        for body in self.bodies.iter_mut().flatten() {
            body.update_velocity(self.gravity, damping_step, dt);
        }

        // 5. Wake propagation across joints.
        let mut to_wake = Vec::new();
        for joint in self.joints.iter().flatten() {
            let (Some(b1), Some(b2)) = (self.body(joint.body1()), self.body(joint.body2()))
            else {
                continue;
            };
            if b1.is_active() != b2.is_active() {
                let sleeper = if b1.is_active() { b2 } else { b1 };
                if !sleeper.is_static() && !sleeper.awake {
                    to_wake.push(sleeper.id);
                }
            }
        }
        for id in to_wake {
            if let Some(body) = self.body_mut(id) {
                body.set_awake(true);
            }
        }

        // 6. Velocity solver: joints first, then contacts.
        let t_velocity = Instant::now();
        {
            let bodies = &mut self.bodies;
            for _ in 0..velocity_iterations {
                for joint in self.joints.iter_mut().flatten() {
                    if !joint_pair_active(bodies, joint) {
                        continue;
                    }
                    let (b1, b2) = two_bodies(bodies, joint.body1(), joint.body2());
                    joint.solve_velocity(b1, b2);
                }
                for solver in &mut self.solvers {
                    let (b1, b2) = two_bodies(bodies, solver.body1, solver.body2);
                    solver.solve_velocity(b1, b2);
                }
            }
        }
        stats.velocity_solver = t_velocity.elapsed();

        // 7. Integrate velocities into positions.
        for body in self.bodies.iter_mut().flatten() {
            body.update_position(dt);
        }

        // 8. Breakable joints.
        let mut broken = Vec::new();
        for joint in self.joints.iter().flatten() {
            let base = joint.base();
            if base.breakable
                && joint.reaction_force(inv_dt).length_sq() >= base.max_force * base.max_force
            {
                broken.push(joint.id());
            }
        }
        for id in broken {
            debug!("joint {id} broke");
            self.remove_joint(id);
            stats.broken_joints.push(id);
        }

        // 9. Position solver: contacts first, then joints; early exit when
        // everything reports error under slop.
        let t_position = Instant::now();
        {
            let bodies = &mut self.bodies;
            for _ in 0..position_iterations {
                stats.position_iterations += 1;
                let mut ok = true;
                for solver in &mut self.solvers {
                    let (b1, b2) = two_bodies(bodies, solver.body1, solver.body2);
                    if solver.solve_position(b1, b2) < -LINEAR_SLOP {
                        ok = false;
                    }
                }
                for joint in self.joints.iter_mut().flatten() {
                    if !joint_pair_active(bodies, joint) {
                        continue;
                    }
                    let (b1, b2) = two_bodies(bodies, joint.body1(), joint.body2());
                    if !joint.solve_position(b1, b2) {
                        ok = false;
                    }
                }
                if ok {
                    stats.position_solved = true;
                    break;
                }
            }
        }
        stats.position_solver = t_position.elapsed();

        // 10. Sync transforms for bodies that moved.
        for body in self.bodies.iter_mut().flatten() {
            if body.awake && !body.is_static() {
                body.cache_data();
            }
        }

        // 11. Post-solve hook.
        if let Some(mut hook) = self.post_solve.take() {
            for solver in &self.solvers {
                hook(solver);
            }
            self.post_solve = Some(hook);
        }

        // 12. Sleep accounting.
        if allow_sleep {
            sleep::try_sleep(&mut self.bodies, stats.position_solved, dt);
        }

        stats.bodies = self.body_count();
        stats.joints = self.joint_count();
        stats
    }

    /// Rebuild the contact solver list: pair bodies, run the narrow phase,
    /// and persist manifolds from the previous step where shape pairs and
    /// feature ids still match. Fresh pairs wake both bodies.
    fn update_contacts(&mut self, warm_starting: bool) {
        let mut old: Vec<Option<ContactSolver>> = self.solvers.drain(..).map(Some).collect();
        let index: HashMap<(ShapeId, ShapeId), usize> = old
            .iter()
            .enumerate()
            .map(|(i, s)| {
                let s = s.as_ref().unwrap();
                ((s.shape1, s.shape2), i)
            })
            .collect();

        let mut fresh = Vec::new();
        let mut to_wake = Vec::new();
        let mut contacts = Vec::new();
        let n = self.bodies.len();
        for i in 0..n {
            for j in (i + 1)..n {
                let (Some(a), Some(b)) = (&self.bodies[i], &self.bodies[j]) else {
                    continue;
                };
                if (a.is_static() || !a.awake) && (b.is_static() || !b.awake) {
                    continue;
                }
                if !a.filter_collide(b) || self.joints_forbid(a, b) {
                    continue;
                }
                if !a.aabb.overlaps(&b.aabb) {
                    continue;
                }
                for sa in &a.shapes {
                    for sb in &b.shapes {
                        let (s1, s2, id1, id2) = if (sa.kind(), sa.id) <= (sb.kind(), sb.id) {
                            (sa, sb, a.id, b.id)
                        } else {
                            (sb, sa, b.id, a.id)
                        };
                        if !s1.aabb.overlaps(&s2.aabb) {
                            continue;
                        }
                        if !collide(s1, s2, &mut contacts) {
                            continue;
                        }
                        if let Some(&slot) = index.get(&(s1.id, s2.id)) {
                            let mut solver = old[slot].take().unwrap();
                            solver.update(&contacts, warm_starting);
                            fresh.push(solver);
                        } else {
                            fresh.push(ContactSolver::new(s1, s2, id1, id2, &contacts));
                            to_wake.push(id1);
                            to_wake.push(id2);
                        }
                    }
                }
            }
        }
        self.solvers = fresh;
        for id in to_wake {
            if let Some(body) = self.body_mut(id) {
                body.set_awake(true);
            }
        }
    }
}

fn joint_pair_active(bodies: &[Option<Body>], joint: &Joint) -> bool {
    let active = |id: BodyId| {
        bodies
            .get(id as usize)
            .and_then(Option::as_ref)
            .is_some_and(Body::is_active)
    };
    active(joint.body1()) || active(joint.body2())
}
