//! Sleep accounting. The population sleeps as a whole: only when every
//! dynamic body has stayed within the velocity tolerances for long enough
//! *and* the position solver reported success does the world go quiet.

use crate::body::Body;
use crate::config::{SLEEP_ANGULAR_TOLERANCE, SLEEP_LINEAR_TOLERANCE, TIME_TO_SLEEP};

/// Advance per-body sleep timers and return the minimum across awake dynamic
/// bodies. A single fast body forces the minimum to zero. Returns `f32::MAX`
/// when there is nothing to account for.
pub fn accumulate(bodies: &mut [Option<Body>], dt: f32) -> f32 {
    let lin_tol_sq = SLEEP_LINEAR_TOLERANCE * SLEEP_LINEAR_TOLERANCE;
    let ang_tol_sq = SLEEP_ANGULAR_TOLERANCE * SLEEP_ANGULAR_TOLERANCE;
    let mut min_sleep = f32::MAX;
    for body in bodies.iter_mut().flatten() {
        if !body.is_dynamic() || !body.awake {
            continue;
        }
        if body.w * body.w <= ang_tol_sq && body.v.length_sq() <= lin_tol_sq {
            body.sleep_time += dt;
            min_sleep = min_sleep.min(body.sleep_time);
        } else {
            body.sleep_time = 0.0;
            min_sleep = 0.0;
        }
    }
    min_sleep
}

/// End-of-step sleep decision. Returns true when the population was put to
/// sleep this step.
pub fn try_sleep(bodies: &mut [Option<Body>], position_solved: bool, dt: f32) -> bool {
    let min_sleep = accumulate(bodies, dt);
    if !position_solved || min_sleep < TIME_TO_SLEEP || min_sleep == f32::MAX {
        return false;
    }
    let mut count = 0usize;
    for body in bodies.iter_mut().flatten() {
        if body.is_dynamic() && body.awake {
            body.set_awake(false);
            count += 1;
        }
    }
    log::debug!("put {count} bodies to sleep");
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::{Body, BodyKind};
    use crate::math::Vec2;
    use crate::shape::{Shape, ShapeGeom};

    fn circle_body(id: u32) -> Option<Body> {
        let mut body = Body::new(id, BodyKind::Dynamic, Vec2::ZERO, 0.0);
        body.add_shape(Shape::new(
            id,
            ShapeGeom::Circle {
                center: Vec2::ZERO,
                radius: 0.5,
            },
            1.0,
            0.0,
            0.5,
        ));
        Some(body)
    }

    #[test]
    fn quiet_bodies_accumulate_fast_bodies_reset() {
        let mut bodies = vec![circle_body(0), circle_body(1)];
        bodies[1].as_mut().unwrap().v = Vec2::new(10.0, 0.0);
        let min = accumulate(&mut bodies, 0.1);
        assert_eq!(min, 0.0);
        assert!(bodies[0].as_ref().unwrap().sleep_time > 0.0);
        assert_eq!(bodies[1].as_ref().unwrap().sleep_time, 0.0);
    }

    #[test]
    fn population_sleeps_together() {
        let mut bodies = vec![circle_body(0), circle_body(1)];
        for _ in 0..10 {
            try_sleep(&mut bodies, true, 0.1);
        }
        assert!(bodies.iter().flatten().all(|b| !b.awake));
    }

    #[test]
    fn unsolved_position_pass_blocks_sleep() {
        let mut bodies = vec![circle_body(0)];
        for _ in 0..10 {
            assert!(!try_sleep(&mut bodies, false, 0.1));
        }
        assert!(bodies[0].as_ref().unwrap().awake);
    }
}
