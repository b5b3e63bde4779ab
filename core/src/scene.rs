//! JSON scene format: `{"bodies": [...], "joints": [...]}`. Joints reference
//! bodies by index into the `bodies` array, so a round trip through
//! serialize/load reassigns ids but preserves structure.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::body::{BodyId, BodyKind};
use crate::error::SceneError;
use crate::joint::{
    AngleJoint, DistanceJoint, Joint, LineJoint, PrismaticJoint, RevoluteJoint, RopeJoint,
    WeldJoint,
};
use crate::math::Vec2;
use crate::shape::ShapeGeom;
use crate::world::World;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub bodies: Vec<SceneBody>,
    #[serde(default)]
    pub joints: Vec<SceneJoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneBody {
    #[serde(rename = "type")]
    pub kind: BodyKind,
    pub position: Vec2,
    pub angle: f32,
    pub shapes: Vec<SceneShape>,
}

/// Shape with its material. `e` is restitution, `u` friction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SceneShape {
    #[serde(rename = "ShapeCircle")]
    Circle {
        center: Vec2,
        radius: f32,
        e: f32,
        u: f32,
        density: f32,
    },
    #[serde(rename = "ShapeSegment")]
    Segment {
        a: Vec2,
        b: Vec2,
        radius: f32,
        e: f32,
        u: f32,
        density: f32,
    },
    #[serde(rename = "ShapePoly")]
    Poly {
        verts: Vec<Vec2>,
        e: f32,
        u: f32,
        density: f32,
    },
}

/// Joint with world-space anchors; `max_force` is absent for unbreakable
/// joints (JSON has no infinity).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SceneJoint {
    #[serde(rename = "RopeJoint")]
    Rope {
        body1: usize,
        body2: usize,
        anchor1: Vec2,
        anchor2: Vec2,
        max_length: f32,
        #[serde(default)]
        collide_connected: bool,
        #[serde(default)]
        max_force: Option<f32>,
        #[serde(default)]
        breakable: bool,
    },
    #[serde(rename = "DistanceJoint")]
    Distance {
        body1: usize,
        body2: usize,
        anchor1: Vec2,
        anchor2: Vec2,
        rest_length: f32,
        #[serde(default)]
        frequency_hz: f32,
        #[serde(default)]
        damping_ratio: f32,
        #[serde(default)]
        collide_connected: bool,
        #[serde(default)]
        max_force: Option<f32>,
        #[serde(default)]
        breakable: bool,
    },
    #[serde(rename = "RevoluteJoint")]
    Revolute {
        body1: usize,
        body2: usize,
        anchor: Vec2,
        #[serde(default)]
        enable_limit: bool,
        #[serde(default)]
        lower: f32,
        #[serde(default)]
        upper: f32,
        #[serde(default)]
        enable_motor: bool,
        #[serde(default)]
        motor_speed: f32,
        #[serde(default)]
        max_motor_torque: f32,
        #[serde(default)]
        collide_connected: bool,
        #[serde(default)]
        max_force: Option<f32>,
        #[serde(default)]
        breakable: bool,
    },
    #[serde(rename = "WeldJoint")]
    Weld {
        body1: usize,
        body2: usize,
        anchor: Vec2,
        #[serde(default)]
        collide_connected: bool,
        #[serde(default)]
        max_force: Option<f32>,
        #[serde(default)]
        breakable: bool,
    },
    #[serde(rename = "PrismaticJoint")]
    Prismatic {
        body1: usize,
        body2: usize,
        anchor: Vec2,
        axis: Vec2,
        #[serde(default)]
        enable_limit: bool,
        #[serde(default)]
        lower: f32,
        #[serde(default)]
        upper: f32,
        #[serde(default)]
        enable_motor: bool,
        #[serde(default)]
        motor_speed: f32,
        #[serde(default)]
        max_motor_force: f32,
        #[serde(default)]
        collide_connected: bool,
        #[serde(default)]
        max_force: Option<f32>,
        #[serde(default)]
        breakable: bool,
    },
    #[serde(rename = "LineJoint")]
    Line {
        body1: usize,
        body2: usize,
        anchor: Vec2,
        axis: Vec2,
        #[serde(default)]
        enable_limit: bool,
        #[serde(default)]
        lower: f32,
        #[serde(default)]
        upper: f32,
        #[serde(default)]
        enable_motor: bool,
        #[serde(default)]
        motor_speed: f32,
        #[serde(default)]
        max_motor_force: f32,
        #[serde(default)]
        collide_connected: bool,
        #[serde(default)]
        max_force: Option<f32>,
        #[serde(default)]
        breakable: bool,
    },
    #[serde(rename = "AngleJoint")]
    Angle {
        body1: usize,
        body2: usize,
        #[serde(default)]
        collide_connected: bool,
        #[serde(default)]
        max_force: Option<f32>,
        #[serde(default)]
        breakable: bool,
    },
}

impl SceneJoint {
    fn endpoints(&self) -> (usize, usize) {
        match self {
            SceneJoint::Rope { body1, body2, .. }
            | SceneJoint::Distance { body1, body2, .. }
            | SceneJoint::Revolute { body1, body2, .. }
            | SceneJoint::Weld { body1, body2, .. }
            | SceneJoint::Prismatic { body1, body2, .. }
            | SceneJoint::Line { body1, body2, .. }
            | SceneJoint::Angle { body1, body2, .. } => (*body1, *body2),
        }
    }

    fn common(&self) -> (bool, Option<f32>, bool) {
        match self {
            SceneJoint::Rope {
                collide_connected,
                max_force,
                breakable,
                ..
            }
            | SceneJoint::Distance {
                collide_connected,
                max_force,
                breakable,
                ..
            }
            | SceneJoint::Revolute {
                collide_connected,
                max_force,
                breakable,
                ..
            }
            | SceneJoint::Weld {
                collide_connected,
                max_force,
                breakable,
                ..
            }
            | SceneJoint::Prismatic {
                collide_connected,
                max_force,
                breakable,
                ..
            }
            | SceneJoint::Line {
                collide_connected,
                max_force,
                breakable,
                ..
            }
            | SceneJoint::Angle {
                collide_connected,
                max_force,
                breakable,
                ..
            } => (*collide_connected, *max_force, *breakable),
        }
    }
}

fn scene_common(joint: &Joint) -> (bool, Option<f32>, bool) {
    let base = joint.base();
    let max_force = base.max_force.is_finite().then_some(base.max_force);
    (base.collide_connected, max_force, base.breakable)
}

impl World {
    pub fn to_scene(&self) -> Scene {
        let mut index_of: HashMap<BodyId, usize> = HashMap::new();
        let mut bodies = Vec::new();
        for body in self.bodies() {
            index_of.insert(body.id, bodies.len());
            let shapes = body
                .shapes
                .iter()
                .map(|s| match &s.geom {
                    ShapeGeom::Circle { center, radius } => SceneShape::Circle {
                        center: *center,
                        radius: *radius,
                        e: s.restitution,
                        u: s.friction,
                        density: s.density,
                    },
                    ShapeGeom::Segment { a, b, radius } => SceneShape::Segment {
                        a: *a,
                        b: *b,
                        radius: *radius,
                        e: s.restitution,
                        u: s.friction,
                        density: s.density,
                    },
                    ShapeGeom::Poly { verts } => SceneShape::Poly {
                        verts: verts.clone(),
                        e: s.restitution,
                        u: s.friction,
                        density: s.density,
                    },
                })
                .collect();
            bodies.push(SceneBody {
                kind: body.kind,
                position: body.position(),
                angle: body.a,
                shapes,
            });
        }

        let mut joints = Vec::new();
        for joint in self.joints() {
            let (Some(b1), Some(b2)) = (self.body(joint.body1()), self.body(joint.body2()))
            else {
                continue;
            };
            let body1 = index_of[&b1.id];
            let body2 = index_of[&b2.id];
            let (collide_connected, max_force, breakable) = scene_common(joint);
            let scene_joint = match joint {
                Joint::Rope(j) => SceneJoint::Rope {
                    body1,
                    body2,
                    anchor1: j.anchor1(b1),
                    anchor2: j.anchor2(b2),
                    max_length: j.max_length,
                    collide_connected,
                    max_force,
                    breakable,
                },
                Joint::Distance(j) => SceneJoint::Distance {
                    body1,
                    body2,
                    anchor1: j.anchor1(b1),
                    anchor2: j.anchor2(b2),
                    rest_length: j.rest_length,
                    frequency_hz: j.frequency_hz,
                    damping_ratio: j.damping_ratio,
                    collide_connected,
                    max_force,
                    breakable,
                },
                Joint::Revolute(j) => SceneJoint::Revolute {
                    body1,
                    body2,
                    anchor: j.anchor1(b1),
                    enable_limit: j.enable_limit,
                    lower: j.lower,
                    upper: j.upper,
                    enable_motor: j.enable_motor,
                    motor_speed: j.motor_speed,
                    max_motor_torque: j.max_motor_torque,
                    collide_connected,
                    max_force,
                    breakable,
                },
                Joint::Weld(j) => SceneJoint::Weld {
                    body1,
                    body2,
                    anchor: j.anchor1(b1),
                    collide_connected,
                    max_force,
                    breakable,
                },
                Joint::Prismatic(j) => SceneJoint::Prismatic {
                    body1,
                    body2,
                    anchor: j.anchor1(b1),
                    axis: crate::math::Rot::new(b1.a).apply(j.local_axis),
                    enable_limit: j.enable_limit,
                    lower: j.lower,
                    upper: j.upper,
                    enable_motor: j.enable_motor,
                    motor_speed: j.motor_speed,
                    max_motor_force: j.max_motor_force,
                    collide_connected,
                    max_force,
                    breakable,
                },
                Joint::Line(j) => SceneJoint::Line {
                    body1,
                    body2,
                    anchor: j.anchor1(b1),
                    axis: crate::math::Rot::new(b1.a).apply(j.local_axis),
                    enable_limit: j.enable_limit,
                    lower: j.lower,
                    upper: j.upper,
                    enable_motor: j.enable_motor,
                    motor_speed: j.motor_speed,
                    max_motor_force: j.max_motor_force,
                    collide_connected,
                    max_force,
                    breakable,
                },
                Joint::Angle(_) => SceneJoint::Angle {
                    body1,
                    body2,
                    collide_connected,
                    max_force,
                    breakable,
                },
            };
            joints.push(scene_joint);
        }

        Scene { bodies, joints }
    }

    /// Replace the world's contents with a scene. On any error the world is
    /// left cleared.
    pub fn load_scene(&mut self, scene: &Scene) -> Result<(), SceneError> {
        self.clear();
        match self.build_scene(scene) {
            Ok(()) => Ok(()),
            Err(e) => {
                self.clear();
                Err(e)
            }
        }
    }

    fn build_scene(&mut self, scene: &Scene) -> Result<(), SceneError> {
        let mut ids = Vec::with_capacity(scene.bodies.len());
        for sb in &scene.bodies {
            let id = self.add_body(sb.kind, sb.position, sb.angle);
            for shape in &sb.shapes {
                let (geom, e, u, density) = match shape {
                    SceneShape::Circle {
                        center,
                        radius,
                        e,
                        u,
                        density,
                    } => (
                        ShapeGeom::Circle {
                            center: *center,
                            radius: *radius,
                        },
                        *e,
                        *u,
                        *density,
                    ),
                    SceneShape::Segment {
                        a,
                        b,
                        radius,
                        e,
                        u,
                        density,
                    } => (
                        ShapeGeom::Segment {
                            a: *a,
                            b: *b,
                            radius: *radius,
                        },
                        *e,
                        *u,
                        *density,
                    ),
                    SceneShape::Poly {
                        verts,
                        e,
                        u,
                        density,
                    } => {
                        if verts.len() < 3 {
                            return Err(SceneError::InvalidPolygon(verts.len()));
                        }
                        (
                            ShapeGeom::Poly {
                                verts: verts.clone(),
                            },
                            *e,
                            *u,
                            *density,
                        )
                    }
                };
                self.add_shape(id, geom, density, e, u);
            }
            ids.push(id);
        }

        for (j_idx, sj) in scene.joints.iter().enumerate() {
            let (i1, i2) = sj.endpoints();
            let id1 = *ids.get(i1).ok_or(SceneError::MissingBody {
                joint: j_idx,
                body: i1,
            })?;
            let id2 = *ids.get(i2).ok_or(SceneError::MissingBody {
                joint: j_idx,
                body: i2,
            })?;
            let b1 = self.body(id1).unwrap();
            let b2 = self.body(id2).unwrap();
            let mut joint = match sj {
                SceneJoint::Rope {
                    anchor1,
                    anchor2,
                    max_length,
                    ..
                } => Joint::Rope(RopeJoint::new(b1, b2, *anchor1, *anchor2, *max_length)),
                SceneJoint::Distance {
                    anchor1,
                    anchor2,
                    rest_length,
                    frequency_hz,
                    damping_ratio,
                    ..
                } => {
                    let mut j = DistanceJoint::new(b1, b2, *anchor1, *anchor2);
                    j.rest_length = *rest_length;
                    j.frequency_hz = *frequency_hz;
                    j.damping_ratio = *damping_ratio;
                    Joint::Distance(j)
                }
                SceneJoint::Revolute {
                    anchor,
                    enable_limit,
                    lower,
                    upper,
                    enable_motor,
                    motor_speed,
                    max_motor_torque,
                    ..
                } => {
                    let mut j = RevoluteJoint::new(b1, b2, *anchor);
                    j.enable_limit = *enable_limit;
                    j.lower = *lower;
                    j.upper = *upper;
                    j.enable_motor = *enable_motor;
                    j.motor_speed = *motor_speed;
                    j.max_motor_torque = *max_motor_torque;
                    Joint::Revolute(j)
                }
                SceneJoint::Weld { anchor, .. } => Joint::Weld(WeldJoint::new(b1, b2, *anchor)),
                SceneJoint::Prismatic {
                    anchor,
                    axis,
                    enable_limit,
                    lower,
                    upper,
                    enable_motor,
                    motor_speed,
                    max_motor_force,
                    ..
                } => {
                    let mut j = PrismaticJoint::new(b1, b2, *anchor, *axis);
                    j.enable_limit = *enable_limit;
                    j.lower = *lower;
                    j.upper = *upper;
                    j.enable_motor = *enable_motor;
                    j.motor_speed = *motor_speed;
                    j.max_motor_force = *max_motor_force;
                    Joint::Prismatic(j)
                }
                SceneJoint::Line {
                    anchor,
                    axis,
                    enable_limit,
                    lower,
                    upper,
                    enable_motor,
                    motor_speed,
                    max_motor_force,
                    ..
                } => {
                    let mut j = LineJoint::new(b1, b2, *anchor, *axis);
                    j.enable_limit = *enable_limit;
                    j.lower = *lower;
                    j.upper = *upper;
                    j.enable_motor = *enable_motor;
                    j.motor_speed = *motor_speed;
                    j.max_motor_force = *max_motor_force;
                    Joint::Line(j)
                }
                SceneJoint::Angle { .. } => Joint::Angle(AngleJoint::new(b1, b2)),
            };
            let (collide_connected, max_force, breakable) = sj.common();
            let base = joint.base_mut();
            base.collide_connected = collide_connected;
            base.max_force = max_force.unwrap_or(f32::INFINITY);
            base.breakable = breakable;
            self.add_joint(joint);
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<String, SceneError> {
        Ok(serde_json::to_string_pretty(&self.to_scene())?)
    }

    /// Parse and load a JSON scene. On any error the world is left cleared.
    pub fn load_json(&mut self, json: &str) -> Result<(), SceneError> {
        let scene: Scene = match serde_json::from_str(json) {
            Ok(scene) => scene,
            Err(e) => {
                self.clear();
                return Err(e.into());
            }
        };
        self.load_scene(&scene)
    }
}
