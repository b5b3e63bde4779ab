//! Integration tests for the physics engine.

use kinetic2d_core::body::BodyKind;
use kinetic2d_core::config::{
    DEFAULT_POSITION_ITERATIONS, DEFAULT_VELOCITY_ITERATIONS, LINEAR_SLOP,
};
use kinetic2d_core::joint::{
    AngleJoint, DistanceJoint, Joint, LineJoint, PrismaticJoint, RevoluteJoint, RopeJoint,
    WeldJoint,
};
use kinetic2d_core::math::Vec2;
use kinetic2d_core::shape::{ShapeGeom, box_verts};
use kinetic2d_core::world::World;
use kinetic2d_core::{BodyId, SceneError};

const DT: f32 = 1.0 / 60.0;

fn step_default(world: &mut World) -> kinetic2d_core::StepStats {
    world.step(
        DT,
        DEFAULT_VELOCITY_ITERATIONS,
        DEFAULT_POSITION_ITERATIONS,
        true,
        true,
    )
}

fn add_box(world: &mut World, kind: BodyKind, x: f32, y: f32, half: f32) -> BodyId {
    let id = world.add_body(kind, Vec2::new(x, y), 0.0);
    world.add_shape(
        id,
        ShapeGeom::Poly {
            verts: box_verts(half, half),
        },
        1.0 / (4.0 * half * half),
        0.0,
        0.5,
    );
    id
}

fn add_circle(world: &mut World, kind: BodyKind, x: f32, y: f32, radius: f32) -> BodyId {
    let id = world.add_body(kind, Vec2::new(x, y), 0.0);
    world.add_shape(
        id,
        ShapeGeom::Circle {
            center: Vec2::ZERO,
            radius,
        },
        1.0 / (std::f32::consts::PI * radius * radius),
        0.0,
        0.5,
    );
    id
}

fn add_floor(world: &mut World) -> BodyId {
    let id = world.add_body(BodyKind::Static, Vec2::new(0.0, -0.5), 0.0);
    world.add_shape(
        id,
        ShapeGeom::Poly {
            verts: box_verts(50.0, 0.5),
        },
        1.0,
        0.0,
        0.5,
    );
    id
}

// =========================================================================
// Integration & damping
// =========================================================================

#[test]
fn free_fall_matches_semi_implicit_euler() {
    let mut world = World::new(Vec2::new(0.0, -10.0));
    let body = add_box(&mut world, BodyKind::Dynamic, 0.0, 10.0, 0.5);
    let steps = 120u32;
    for _ in 0..steps {
        world.step(DT, DEFAULT_VELOCITY_ITERATIONS, DEFAULT_POSITION_ITERATIONS, true, false);
    }
    let b = world.body(body).unwrap();
    assert!((b.v.y + 20.0).abs() < 0.1, "v_y = {}", b.v.y);
    // semi-implicit Euler: y = y0 - g dt^2 n(n+1)/2
    let expected = 10.0 - 10.0 * DT * DT * (steps * (steps + 1)) as f32 / 2.0;
    assert!((b.p.y - expected).abs() < 0.05, "y = {} vs {}", b.p.y, expected);
    assert_eq!(b.v.x, 0.0);
}

#[test]
fn damping_scales_velocity_per_step() {
    let mut world = World::new(Vec2::ZERO);
    let body = add_box(&mut world, BodyKind::Dynamic, 0.0, 0.0, 0.5);
    world.set_damping(0.5);
    {
        let b = world.body_mut(body).unwrap();
        b.v = Vec2::new(1.0, 0.0);
        b.w = 1.0;
    }
    let factor = 0.5f32.powf(DT);
    let mut expected_v = 1.0f32;
    let mut expected_w = 1.0f32;
    for _ in 0..60 {
        world.step(DT, 8, 3, true, false);
        expected_v *= factor;
        expected_w *= factor;
        let b = world.body(body).unwrap();
        assert!((b.v.x - expected_v).abs() < 1e-4);
        assert!((b.w - expected_w).abs() < 1e-4);
    }
    // after one second the coefficient itself
    assert!((world.body(body).unwrap().v.x - 0.5).abs() < 1e-3);
}

#[test]
fn zero_dt_is_a_no_op() {
    let mut world = World::new(Vec2::new(0.0, -10.0));
    let body = add_box(&mut world, BodyKind::Dynamic, 0.0, 5.0, 0.5);
    let stats = world.step(0.0, 8, 3, true, true);
    assert_eq!(stats.position_iterations, 0);
    let b = world.body(body).unwrap();
    assert_eq!(b.p.y, 5.0);
    assert_eq!(b.v.y, 0.0);
}

// =========================================================================
// Static bodies & contacts
// =========================================================================

#[test]
fn static_bodies_never_move() {
    let mut world = World::new(Vec2::new(0.0, -10.0));
    let floor = add_floor(&mut world);
    add_box(&mut world, BodyKind::Dynamic, 0.0, 3.0, 0.5);
    let before = {
        let f = world.body(floor).unwrap();
        (f.p, f.a, f.v, f.w)
    };
    for _ in 0..200 {
        step_default(&mut world);
    }
    let f = world.body(floor).unwrap();
    assert_eq!(before, (f.p, f.a, f.v, f.w));
}

#[test]
fn dropped_box_comes_to_rest_on_floor() {
    let mut world = World::new(Vec2::new(0.0, -10.0));
    add_floor(&mut world);
    let body = add_box(&mut world, BodyKind::Dynamic, 0.0, 2.0, 0.5);
    for _ in 0..300 {
        step_default(&mut world);
    }
    let b = world.body(body).unwrap();
    assert!((b.p.y - 0.5).abs() < 0.02, "resting y = {}", b.p.y);
    assert!(b.v.length() < 0.01);
    assert!(!b.awake, "box should have gone to sleep");
}

#[test]
fn non_penetration_holds_when_position_solved() {
    let mut world = World::new(Vec2::new(0.0, -10.0));
    add_floor(&mut world);
    add_box(&mut world, BodyKind::Dynamic, 0.0, 1.0, 0.5);
    add_box(&mut world, BodyKind::Dynamic, 0.05, 2.1, 0.5);
    let mut prev_solved = false;
    for _ in 0..240 {
        let stats = world.step(DT, 8, 3, true, false);
        if prev_solved {
            // narrow-phase depth at the start of this step reflects the poses
            // the previous position pass signed off on
            for solver in world.contact_solvers() {
                for p in &solver.points {
                    assert!(
                        p.depth <= LINEAR_SLOP + 5e-3,
                        "penetration {} after a solved pass",
                        p.depth
                    );
                }
            }
        }
        prev_solved = stats.position_solved;
    }
}

#[test]
fn friction_cone_bounds_tangent_impulse() {
    let mut world = World::new(Vec2::new(0.0, -10.0));
    add_floor(&mut world);
    let body = add_box(&mut world, BodyKind::Dynamic, 0.0, 0.55, 0.5);
    world.body_mut(body).unwrap().v = Vec2::new(5.0, 0.0);
    for _ in 0..120 {
        world.step(DT, 8, 3, true, false);
        for solver in world.contact_solvers() {
            for p in &solver.points {
                assert!(
                    p.jt_acc.abs() <= solver.friction * p.jn_acc + 1e-5,
                    "|jt| = {} vs cone {}",
                    p.jt_acc.abs(),
                    solver.friction * p.jn_acc
                );
            }
        }
    }
    // friction must have slowed the slide
    assert!(world.body(body).unwrap().v.x < 2.5);
}

#[test]
fn resting_manifold_impulse_is_stable_across_steps() {
    let mut world = World::new(Vec2::new(0.0, -10.0));
    add_floor(&mut world);
    add_box(&mut world, BodyKind::Dynamic, 0.0, 0.5, 0.5);
    let total_jn = |world: &World| -> f32 {
        world
            .contact_solvers()
            .iter()
            .flat_map(|s| s.points.iter())
            .map(|p| p.jn_acc)
            .sum()
    };
    for _ in 0..100 {
        world.step(DT, 8, 3, true, false);
    }
    let a = total_jn(&world);
    world.step(DT, 8, 3, true, false);
    let b = total_jn(&world);
    assert!(a > 0.0);
    assert!((a - b).abs() <= 0.1 * a + 1e-4, "jn {a} vs {b}");
}

// =========================================================================
// Sleep
// =========================================================================

#[test]
fn resting_stack_sleeps_and_keeps_spacing() {
    let mut world = World::new(Vec2::new(0.0, -10.0));
    add_floor(&mut world);
    let bottom = add_box(&mut world, BodyKind::Dynamic, 0.0, 0.5, 0.5);
    let top = add_box(&mut world, BodyKind::Dynamic, 0.0, 1.5, 0.5);

    let mut slept_at = None;
    for i in 0..300 {
        step_default(&mut world);
        if slept_at.is_none() && !world.body(top).unwrap().awake {
            slept_at = Some(i);
        }
    }
    let slept_at = slept_at.expect("stack never slept");
    assert!(slept_at < 100, "slept at step {slept_at}");

    let b = world.body(bottom).unwrap();
    let t = world.body(top).unwrap();
    assert!(!b.awake && !t.awake);
    assert_eq!(b.v, Vec2::ZERO);
    assert_eq!(t.v, Vec2::ZERO);
    assert!(
        (t.p.y - b.p.y - 1.0).abs() < 0.01,
        "spacing = {}",
        t.p.y - b.p.y
    );
}

#[test]
fn new_contact_wakes_a_sleeping_body() {
    let mut world = World::new(Vec2::new(0.0, -10.0));
    add_floor(&mut world);
    let sleeper = add_box(&mut world, BodyKind::Dynamic, 0.0, 0.5, 0.5);
    for _ in 0..120 {
        step_default(&mut world);
    }
    assert!(!world.body(sleeper).unwrap().awake);

    add_box(&mut world, BodyKind::Dynamic, 0.1, 2.0, 0.5);
    let mut woke = false;
    for _ in 0..60 {
        step_default(&mut world);
        if world.body(sleeper).unwrap().awake {
            woke = true;
            break;
        }
    }
    assert!(woke, "falling box never woke the sleeper");
}

#[test]
fn joint_wakes_both_endpoints_when_added() {
    let mut world = World::new(Vec2::new(0.0, -10.0));
    add_floor(&mut world);
    let a = add_box(&mut world, BodyKind::Dynamic, -1.0, 0.5, 0.5);
    let b = add_box(&mut world, BodyKind::Dynamic, 1.0, 0.5, 0.5);
    for _ in 0..120 {
        step_default(&mut world);
    }
    assert!(!world.body(a).unwrap().awake);

    let joint = {
        let b1 = world.body(a).unwrap();
        let b2 = world.body(b).unwrap();
        Joint::Distance(DistanceJoint::new(b1, b2, b1.p, b2.p))
    };
    world.add_joint(joint);
    assert!(world.body(a).unwrap().awake);
    assert!(world.body(b).unwrap().awake);
}

// =========================================================================
// Joints
// =========================================================================

#[test]
fn rope_swing_respects_the_length_bound() {
    let mut world = World::new(Vec2::new(0.0, -10.0));
    let pivot = world.add_body(BodyKind::Static, Vec2::ZERO, 0.0);
    let bob = add_circle(&mut world, BodyKind::Dynamic, 2.0, 0.0, 0.1);
    let joint = {
        let b1 = world.body(pivot).unwrap();
        let b2 = world.body(bob).unwrap();
        Joint::Rope(RopeJoint::new(b1, b2, Vec2::ZERO, b2.p, 2.0))
    };
    world.add_joint(joint);

    let mut min_y = f32::MAX;
    for _ in 0..600 {
        world.step(DT, 8, 3, true, false);
        let p = world.body(bob).unwrap().p;
        assert!(p.length() <= 2.0 + LINEAR_SLOP + 1e-3, "rope stretched to {}", p.length());
        min_y = min_y.min(p.y);
    }
    // it actually swung
    assert!(min_y < -1.0, "pendulum never dropped, min_y = {min_y}");
}

#[test]
fn breakable_joint_snaps_under_load() {
    let mut world = World::new(Vec2::new(0.0, -100.0));
    let anchor = world.add_body(BodyKind::Static, Vec2::new(0.0, 2.0), 0.0);
    let weight = add_circle(&mut world, BodyKind::Dynamic, 0.0, 1.0, 0.2);
    let jid = {
        let b1 = world.body(anchor).unwrap();
        let b2 = world.body(weight).unwrap();
        let mut j = DistanceJoint::new(b1, b2, b1.p, b2.p);
        j.base.breakable = true;
        j.base.max_force = 1.0;
        world.add_joint(Joint::Distance(j))
    };

    let mut broke_at = None;
    for i in 0..10 {
        let stats = world.step(DT, 8, 3, true, false);
        if stats.broken_joints.contains(&jid) {
            broke_at = Some(i);
            break;
        }
    }
    assert!(broke_at.expect("joint never broke") <= 2);
    assert!(world.joint(jid).is_none());
    assert_eq!(world.joint_count(), 0);

    // endpoint falls free after the break
    let y0 = world.body(weight).unwrap().p.y;
    for _ in 0..30 {
        world.step(DT, 8, 3, true, false);
    }
    assert!(world.body(weight).unwrap().p.y < y0 - 0.5);
}

#[test]
fn revolute_holds_the_pivot_point() {
    let mut world = World::new(Vec2::new(0.0, -10.0));
    let anchor = world.add_body(BodyKind::Static, Vec2::ZERO, 0.0);
    let arm = add_box(&mut world, BodyKind::Dynamic, 1.0, 0.0, 0.5);
    let jid = {
        let b1 = world.body(anchor).unwrap();
        let b2 = world.body(arm).unwrap();
        let j = RevoluteJoint::new(b1, b2, Vec2::ZERO);
        world.add_joint(Joint::Revolute(j))
    };
    for _ in 0..300 {
        world.step(DT, 8, 3, true, false);
        let j = world.joint(jid).unwrap();
        let a1 = j.anchor1(world.body(anchor).unwrap());
        let a2 = j.anchor2(world.body(arm).unwrap());
        assert!((a2 - a1).length() < 0.02, "pivot drifted {}", (a2 - a1).length());
    }
    // the arm swung below the pivot
    assert!(world.body(arm).unwrap().p.y < 0.0);
}

#[test]
fn revolute_motor_drives_angular_velocity() {
    let mut world = World::new(Vec2::ZERO);
    let anchor = world.add_body(BodyKind::Static, Vec2::ZERO, 0.0);
    let wheel = add_circle(&mut world, BodyKind::Dynamic, 0.0, 0.0, 0.5);
    {
        let b1 = world.body(anchor).unwrap();
        let b2 = world.body(wheel).unwrap();
        let mut j = RevoluteJoint::new(b1, b2, Vec2::ZERO);
        j.enable_motor = true;
        j.motor_speed = 2.0;
        j.max_motor_torque = 100.0;
        world.add_joint(Joint::Revolute(j));
    }
    for _ in 0..60 {
        world.step(DT, 8, 3, true, false);
    }
    assert!((world.body(wheel).unwrap().w - 2.0).abs() < 0.05);
}

#[test]
fn revolute_limit_stops_the_swing() {
    let mut world = World::new(Vec2::new(0.0, -10.0));
    let anchor = world.add_body(BodyKind::Static, Vec2::ZERO, 0.0);
    let arm = add_box(&mut world, BodyKind::Dynamic, 1.0, 0.0, 0.5);
    {
        let b1 = world.body(anchor).unwrap();
        let b2 = world.body(arm).unwrap();
        let mut j = RevoluteJoint::new(b1, b2, Vec2::ZERO);
        j.enable_limit = true;
        j.lower = -0.5;
        j.upper = 0.5;
        world.add_joint(Joint::Revolute(j));
    }
    for _ in 0..300 {
        world.step(DT, 8, 3, true, false);
    }
    let angle = world.body(arm).unwrap().a - world.body(anchor).unwrap().a;
    assert!(angle >= -0.5 - 0.05 && angle <= 0.5 + 0.05, "angle = {angle}");
}

#[test]
fn weld_locks_pose() {
    let mut world = World::new(Vec2::new(0.0, -10.0));
    let base = world.add_body(BodyKind::Static, Vec2::ZERO, 0.0);
    let attached = add_box(&mut world, BodyKind::Dynamic, 1.0, 0.0, 0.5);
    {
        let b1 = world.body(base).unwrap();
        let b2 = world.body(attached).unwrap();
        let j = WeldJoint::new(b1, b2, Vec2::new(0.5, 0.0));
        world.add_joint(Joint::Weld(j));
    }
    for _ in 0..300 {
        world.step(DT, 8, 3, true, false);
    }
    let b = world.body(attached).unwrap();
    assert!(b.a.abs() < 0.05, "welded body rotated {}", b.a);
    assert!((b.p - Vec2::new(1.0, 0.0)).length() < 0.05);
}

#[test]
fn prismatic_slides_only_along_its_axis() {
    let mut world = World::new(Vec2::new(0.0, -10.0));
    let rail = world.add_body(BodyKind::Static, Vec2::ZERO, 0.0);
    let slider = add_box(&mut world, BodyKind::Dynamic, 0.0, 0.0, 0.5);
    {
        let b1 = world.body(rail).unwrap();
        let b2 = world.body(slider).unwrap();
        let j = PrismaticJoint::new(b1, b2, Vec2::ZERO, Vec2::new(0.0, 1.0));
        world.add_joint(Joint::Prismatic(j));
    }
    // push sideways every step; the joint must refuse the lateral motion
    for _ in 0..120 {
        world
            .body_mut(slider)
            .unwrap()
            .apply_force(Vec2::new(20.0, 0.0));
        world.step(DT, 8, 3, true, false);
    }
    let b = world.body(slider).unwrap();
    assert!(b.p.x.abs() < 0.02, "lateral drift {}", b.p.x);
    assert!(b.a.abs() < 0.02, "slider rotated {}", b.a);
    assert!(b.p.y < -0.5, "slider should fall along the axis");
}

#[test]
fn prismatic_limit_clamps_translation() {
    let mut world = World::new(Vec2::new(0.0, -10.0));
    let rail = world.add_body(BodyKind::Static, Vec2::ZERO, 0.0);
    let slider = add_box(&mut world, BodyKind::Dynamic, 0.0, 0.0, 0.5);
    {
        let b1 = world.body(rail).unwrap();
        let b2 = world.body(slider).unwrap();
        let mut j = PrismaticJoint::new(b1, b2, Vec2::ZERO, Vec2::new(0.0, 1.0));
        j.enable_limit = true;
        j.lower = -1.0;
        j.upper = 1.0;
        world.add_joint(Joint::Prismatic(j));
    }
    for _ in 0..300 {
        world.step(DT, 8, 3, true, false);
    }
    let y = world.body(slider).unwrap().p.y;
    assert!(y >= -1.0 - 0.05, "slider passed its lower limit: {y}");
}

#[test]
fn line_joint_slides_and_spins() {
    let mut world = World::new(Vec2::new(0.0, -10.0));
    let rail = world.add_body(BodyKind::Static, Vec2::ZERO, 0.0);
    let slider = add_box(&mut world, BodyKind::Dynamic, 0.0, 0.0, 0.5);
    {
        let b1 = world.body(rail).unwrap();
        let b2 = world.body(slider).unwrap();
        let j = LineJoint::new(b1, b2, Vec2::ZERO, Vec2::new(0.0, 1.0));
        world.add_joint(Joint::Line(j));
    }
    for _ in 0..120 {
        let b = world.body_mut(slider).unwrap();
        b.apply_force(Vec2::new(20.0, 0.0));
        b.apply_torque(5.0);
        world.step(DT, 8, 3, true, false);
    }
    let b = world.body(slider).unwrap();
    assert!(b.p.x.abs() < 0.02, "lateral drift {}", b.p.x);
    assert!(b.a > 0.5, "line joint must leave rotation free");
}

#[test]
fn angle_joint_locks_relative_angle() {
    let mut world = World::new(Vec2::ZERO);
    let a = add_circle(&mut world, BodyKind::Dynamic, -1.0, 0.0, 0.5);
    let b = add_circle(&mut world, BodyKind::Dynamic, 1.0, 0.0, 0.5);
    {
        let b1 = world.body(a).unwrap();
        let b2 = world.body(b).unwrap();
        let j = AngleJoint::new(b1, b2);
        world.add_joint(Joint::Angle(j));
    }
    for _ in 0..120 {
        world.body_mut(a).unwrap().apply_torque(2.0);
        world.step(DT, 8, 3, true, false);
    }
    let rel = world.body(b).unwrap().a - world.body(a).unwrap().a;
    assert!(rel.abs() < 0.02, "relative angle drifted {rel}");
    assert!(world.body(a).unwrap().a > 0.1, "torque should spin the pair");
}

#[test]
fn distance_spring_oscillates_and_settles_toward_rest() {
    let mut world = World::new(Vec2::ZERO);
    let anchor = world.add_body(BodyKind::Static, Vec2::ZERO, 0.0);
    let bob = add_circle(&mut world, BodyKind::Dynamic, 2.0, 0.0, 0.2);
    {
        let b1 = world.body(anchor).unwrap();
        let b2 = world.body(bob).unwrap();
        let mut j = DistanceJoint::new(b1, b2, Vec2::ZERO, Vec2::new(2.0, 0.0));
        j.rest_length = 1.0;
        j.frequency_hz = 1.0;
        j.damping_ratio = 0.2;
        world.add_joint(Joint::Distance(j));
    }
    let mut crossed = false;
    for _ in 0..600 {
        world.step(DT, 8, 3, true, false);
        let d = world.body(bob).unwrap().p.length();
        if d < 1.0 {
            crossed = true;
        }
        assert!(d < 3.0, "spring diverged to {d}");
    }
    assert!(crossed, "spring never pulled through its rest length");
    let d = world.body(bob).unwrap().p.length();
    assert!((d - 1.0).abs() < 0.2, "spring settled at {d}");
}

#[test]
fn collide_connected_false_suppresses_contacts() {
    let mut world = World::new(Vec2::ZERO);
    let a = add_circle(&mut world, BodyKind::Dynamic, -0.4, 0.0, 0.5);
    let b = add_circle(&mut world, BodyKind::Dynamic, 0.4, 0.0, 0.5);
    {
        let b1 = world.body(a).unwrap();
        let b2 = world.body(b).unwrap();
        let j = DistanceJoint::new(b1, b2, b1.p, b2.p);
        world.add_joint(Joint::Distance(j));
    }
    world.step(DT, 8, 3, true, false);
    assert!(world.contact_solvers().is_empty());

    world.joint_mut(0).unwrap().base_mut().collide_connected = true;
    world.step(DT, 8, 3, true, false);
    assert!(!world.contact_solvers().is_empty());
}

#[test]
fn removing_a_body_cascades_its_joints() {
    let mut world = World::new(Vec2::new(0.0, -10.0));
    let a = add_circle(&mut world, BodyKind::Dynamic, 0.0, 0.0, 0.5);
    let b = add_circle(&mut world, BodyKind::Dynamic, 2.0, 0.0, 0.5);
    let jid = {
        let b1 = world.body(a).unwrap();
        let b2 = world.body(b).unwrap();
        let j = DistanceJoint::new(b1, b2, b1.p, b2.p);
        world.add_joint(Joint::Distance(j))
    };
    world.remove_body(a);
    assert!(world.body(a).is_none());
    assert!(world.joint(jid).is_none());
    assert!(world.body(b).unwrap().joints.is_empty());
    // stepping after the removal must be safe
    step_default(&mut world);
}

// =========================================================================
// Warm starting
// =========================================================================

#[test]
fn warm_starting_needs_fewer_position_iterations() {
    let run = |warm: bool| -> f64 {
        let mut world = World::new(Vec2::new(0.0, -10.0));
        add_floor(&mut world);
        // six-row pyramid, 21 boxes
        for row in 0..6 {
            let count = 6 - row;
            let y = 0.5 + row as f32 * 1.0;
            let x0 = -(count as f32 - 1.0) * 0.525;
            for i in 0..count {
                add_box(&mut world, BodyKind::Dynamic, x0 + i as f32 * 1.05, y, 0.5);
            }
        }
        let mut total = 0usize;
        for i in 0..100 {
            let stats = world.step(DT, 8, 3, warm, false);
            if i >= 50 {
                total += stats.position_iterations;
            }
        }
        total as f64 / 50.0
    };

    let warm_mean = run(true);
    let cold_mean = run(false);
    assert!(
        warm_mean < cold_mean,
        "warm {warm_mean} vs cold {cold_mean}"
    );
}

// =========================================================================
// Kinematic bodies
// =========================================================================

#[test]
fn kinematic_body_moves_at_prescribed_velocity() {
    let mut world = World::new(Vec2::new(0.0, -10.0));
    let platform = add_box(&mut world, BodyKind::Kinematic, 0.0, 0.0, 0.5);
    world.body_mut(platform).unwrap().v = Vec2::new(1.0, 0.0);
    for _ in 0..60 {
        step_default(&mut world);
    }
    let b = world.body(platform).unwrap();
    // gravity does not apply, velocity is unchanged
    assert!((b.p.x - 1.0).abs() < 1e-3);
    assert_eq!(b.v, Vec2::new(1.0, 0.0));
    assert_eq!(b.p.y, 0.0);
}

// =========================================================================
// Post-solve hook & queries
// =========================================================================

#[test]
fn post_solve_sees_each_manifold() {
    use std::cell::Cell;
    use std::rc::Rc;

    let mut world = World::new(Vec2::new(0.0, -10.0));
    add_floor(&mut world);
    add_box(&mut world, BodyKind::Dynamic, 0.0, 0.5, 0.5);
    let count = Rc::new(Cell::new(0usize));
    let seen = count.clone();
    world.set_post_solve(move |solver| {
        assert!(solver.points.len() <= 2);
        seen.set(seen.get() + 1);
    });
    world.step(DT, 8, 3, true, false);
    assert_eq!(count.get(), world.contact_solvers().len());
    assert!(count.get() > 0);
}

#[test]
fn point_queries_find_shapes_vertices_edges_and_joints() {
    let mut world = World::new(Vec2::ZERO);
    let a = add_box(&mut world, BodyKind::Static, 0.0, 0.0, 1.0);
    let b = add_circle(&mut world, BodyKind::Dynamic, 5.0, 0.0, 0.5);
    let jid = {
        let b1 = world.body(a).unwrap();
        let b2 = world.body(b).unwrap();
        let j = DistanceJoint::new(b1, b2, Vec2::new(1.0, 0.0), Vec2::new(5.0, 0.0));
        world.add_joint(Joint::Distance(j))
    };

    assert_eq!(world.find_shape_at(Vec2::ZERO).map(|(id, _)| id), Some(a));
    assert_eq!(
        world.find_shape_at(Vec2::new(5.2, 0.0)).map(|(id, _)| id),
        Some(b)
    );
    assert!(world.find_shape_at(Vec2::new(20.0, 0.0)).is_none());

    let vertex = world.find_vertex_at(Vec2::new(-1.0, -1.0), 0.05);
    assert_eq!(vertex.map(|(id, _, i)| (id, i)), Some((a, 0)));

    let edge = world.find_edge_at(Vec2::new(0.0, -1.0), 0.05);
    assert_eq!(edge.map(|(id, _, i)| (id, i)), Some((a, 0)));

    assert_eq!(world.find_joint_at(Vec2::new(1.0, 0.0), 0.1), Some(jid));
    assert_eq!(world.find_joint_at(Vec2::new(10.0, 10.0), 0.1), None);
}

// =========================================================================
// Scene I/O
// =========================================================================

fn build_showcase_world() -> World {
    let mut world = World::new(Vec2::new(0.0, -10.0));
    let ground = world.add_body(BodyKind::Static, Vec2::ZERO, 0.0);
    world.add_shape(
        ground,
        ShapeGeom::Poly {
            verts: box_verts(4.0, 0.5),
        },
        1.0,
        0.25,
        0.75,
    );
    let ball = world.add_body(BodyKind::Dynamic, Vec2::new(2.0, 4.0), 0.0);
    world.add_shape(
        ball,
        ShapeGeom::Circle {
            center: Vec2::ZERO,
            radius: 0.5,
        },
        2.0,
        0.5,
        0.25,
    );
    let bar = world.add_body(BodyKind::Dynamic, Vec2::new(-2.0, 4.0), 0.0);
    world.add_shape(
        bar,
        ShapeGeom::Segment {
            a: Vec2::new(-1.0, 0.0),
            b: Vec2::new(1.0, 0.0),
            radius: 0.25,
        },
        1.0,
        0.0,
        0.5,
    );

    let (g, ba, br) = (ground, ball, bar);
    let joints: Vec<Joint> = {
        let gb = world.body(g).unwrap();
        let bb = world.body(ba).unwrap();
        let rb = world.body(br).unwrap();
        vec![
            Joint::Rope(RopeJoint::new(gb, bb, Vec2::new(2.0, 0.0), bb.p, 4.0)),
            Joint::Distance({
                let mut j = DistanceJoint::new(gb, rb, Vec2::new(-2.0, 0.0), rb.p);
                j.frequency_hz = 2.0;
                j.damping_ratio = 0.5;
                j
            }),
            Joint::Revolute({
                let mut j = RevoluteJoint::new(gb, bb, Vec2::new(2.0, 2.0));
                j.enable_limit = true;
                j.lower = -1.0;
                j.upper = 1.0;
                j.enable_motor = true;
                j.motor_speed = 0.5;
                j.max_motor_torque = 10.0;
                j
            }),
            Joint::Weld(WeldJoint::new(gb, rb, Vec2::new(-2.0, 2.0))),
            Joint::Prismatic(PrismaticJoint::new(
                gb,
                bb,
                Vec2::new(2.0, 0.0),
                Vec2::new(0.0, 1.0),
            )),
            Joint::Line(LineJoint::new(gb, rb, Vec2::new(-2.0, 0.0), Vec2::new(1.0, 0.0))),
            Joint::Angle({
                let mut j = AngleJoint::new(bb, rb);
                j.base.breakable = true;
                j.base.max_force = 50.0;
                j
            }),
        ]
    };
    for j in joints {
        world.add_joint(j);
    }
    world
}

#[test]
fn scene_round_trip_is_structurally_equal() {
    let world = build_showcase_world();
    let first = world.to_json().unwrap();

    let mut reloaded = World::new(Vec2::new(0.0, -10.0));
    reloaded.load_json(&first).unwrap();
    let second = reloaded.to_json().unwrap();

    let a: serde_json::Value = serde_json::from_str(&first).unwrap();
    let b: serde_json::Value = serde_json::from_str(&second).unwrap();
    assert_eq!(a, b);
    assert_eq!(reloaded.body_count(), 3);
    assert_eq!(reloaded.joint_count(), 7);
}

#[test]
fn loaded_scene_steps_like_the_original() {
    let mut original = build_showcase_world();
    let json = original.to_json().unwrap();
    let mut loaded = World::new(Vec2::new(0.0, -10.0));
    loaded.load_json(&json).unwrap();

    for _ in 0..60 {
        step_default(&mut original);
        step_default(&mut loaded);
    }
    for (a, b) in original.bodies().zip(loaded.bodies()) {
        assert!((a.p - b.p).length() < 1e-4);
        assert!((a.a - b.a).abs() < 1e-4);
    }
}

#[test]
fn scene_with_dangling_joint_reference_fails_and_clears() {
    let json = r#"{
        "bodies": [
            {"type": "dynamic", "position": {"x": 0.0, "y": 0.0}, "angle": 0.0, "shapes": [
                {"type": "ShapeCircle", "center": {"x": 0.0, "y": 0.0}, "radius": 1.0,
                 "e": 0.0, "u": 0.5, "density": 1.0}
            ]}
        ],
        "joints": [
            {"type": "AngleJoint", "body1": 0, "body2": 7}
        ]
    }"#;
    let mut world = World::new(Vec2::ZERO);
    let err = world.load_json(json).unwrap_err();
    assert!(matches!(err, SceneError::MissingBody { joint: 0, body: 7 }));
    assert_eq!(world.body_count(), 0);
    assert_eq!(world.joint_count(), 0);
}

#[test]
fn scene_with_unknown_shape_kind_fails_and_clears() {
    let json = r#"{
        "bodies": [
            {"type": "dynamic", "position": {"x": 0.0, "y": 0.0}, "angle": 0.0, "shapes": [
                {"type": "ShapeTorus", "radius": 1.0, "e": 0.0, "u": 0.5, "density": 1.0}
            ]}
        ],
        "joints": []
    }"#;
    let mut world = World::new(Vec2::ZERO);
    let err = world.load_json(json).unwrap_err();
    assert!(matches!(err, SceneError::Json(_)));
    assert_eq!(world.body_count(), 0);
}

#[test]
fn scene_with_degenerate_polygon_fails_and_clears() {
    let json = r#"{
        "bodies": [
            {"type": "static", "position": {"x": 0.0, "y": 0.0}, "angle": 0.0, "shapes": [
                {"type": "ShapePoly", "verts": [{"x": 0.0, "y": 0.0}, {"x": 1.0, "y": 0.0}],
                 "e": 0.0, "u": 0.5, "density": 1.0}
            ]}
        ],
        "joints": []
    }"#;
    let mut world = World::new(Vec2::ZERO);
    let err = world.load_json(json).unwrap_err();
    assert!(matches!(err, SceneError::InvalidPolygon(2)));
    assert_eq!(world.body_count(), 0);
}

#[test]
fn clear_resets_id_counters() {
    let mut world = World::new(Vec2::ZERO);
    add_box(&mut world, BodyKind::Dynamic, 0.0, 0.0, 0.5);
    add_box(&mut world, BodyKind::Dynamic, 2.0, 0.0, 0.5);
    world.clear();
    assert_eq!(world.body_count(), 0);
    let id = add_box(&mut world, BodyKind::Dynamic, 0.0, 0.0, 0.5);
    assert_eq!(id, 0);
}
