//! Joint constraints. Each concrete kind implements the same capability set
//! (init, velocity solve, position solve, reactions, world anchors); the
//! `Joint` enum is the dispatch table the world iterates.

pub mod angle;
pub mod distance;
pub mod line;
pub mod prismatic;
pub mod revolute;
pub mod rope;
pub mod weld;

pub use angle::AngleJoint;
pub use distance::DistanceJoint;
pub use line::LineJoint;
pub use prismatic::PrismaticJoint;
pub use revolute::RevoluteJoint;
pub use rope::RopeJoint;
pub use weld::WeldJoint;

use crate::body::{Body, BodyId};
use crate::math::Vec2;

pub type JointId = u32;

/// Relationship of a limited joint to its bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LimitState {
    #[default]
    Inactive,
    AtLower,
    AtUpper,
    Equal,
}

/// Fields shared by every joint kind.
#[derive(Debug, Clone)]
pub struct JointBase {
    pub id: JointId,
    pub body1: BodyId,
    pub body2: BodyId,
    pub collide_connected: bool,
    /// Reaction force magnitude at which a breakable joint snaps.
    pub max_force: f32,
    pub breakable: bool,
}

impl JointBase {
    pub fn new(body1: BodyId, body2: BodyId) -> Self {
        Self {
            id: 0,
            body1,
            body2,
            collide_connected: false,
            max_force: f32::INFINITY,
            breakable: false,
        }
    }
}

#[derive(Debug, Clone)]
pub enum Joint {
    Rope(RopeJoint),
    Distance(DistanceJoint),
    Revolute(RevoluteJoint),
    Weld(WeldJoint),
    Prismatic(PrismaticJoint),
    Line(LineJoint),
    Angle(AngleJoint),
}

macro_rules! forward {
    ($self:ident, $j:ident => $body:expr) => {
        match $self {
            Joint::Rope($j) => $body,
            Joint::Distance($j) => $body,
            Joint::Revolute($j) => $body,
            Joint::Weld($j) => $body,
            Joint::Prismatic($j) => $body,
            Joint::Line($j) => $body,
            Joint::Angle($j) => $body,
        }
    };
}

impl Joint {
    pub fn base(&self) -> &JointBase {
        forward!(self, j => &j.base)
    }

    pub fn base_mut(&mut self) -> &mut JointBase {
        forward!(self, j => &mut j.base)
    }

    pub fn id(&self) -> JointId {
        self.base().id
    }

    pub fn body1(&self) -> BodyId {
        self.base().body1
    }

    pub fn body2(&self) -> BodyId {
        self.base().body2
    }

    pub fn collide_connected(&self) -> bool {
        self.base().collide_connected
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Joint::Rope(_) => "rope",
            Joint::Distance(_) => "distance",
            Joint::Revolute(_) => "revolute",
            Joint::Weld(_) => "weld",
            Joint::Prismatic(_) => "prismatic",
            Joint::Line(_) => "line",
            Joint::Angle(_) => "angle",
        }
    }

    /// Precompute Jacobian pieces and effective masses; apply (or clear) the
    /// warm-start impulses.
    pub fn init_solver(&mut self, b1: &mut Body, b2: &mut Body, dt: f32, warm_starting: bool) {
        forward!(self, j => j.init_solver(b1, b2, dt, warm_starting))
    }

    pub fn solve_velocity(&mut self, b1: &mut Body, b2: &mut Body) {
        forward!(self, j => j.solve_velocity(b1, b2))
    }

    /// Returns true when the positional error is below slop.
    pub fn solve_position(&mut self, b1: &mut Body, b2: &mut Body) -> bool {
        forward!(self, j => j.solve_position(b1, b2))
    }

    pub fn reaction_force(&self, inv_dt: f32) -> Vec2 {
        forward!(self, j => j.reaction_force(inv_dt))
    }

    pub fn reaction_torque(&self, inv_dt: f32) -> f32 {
        forward!(self, j => j.reaction_torque(inv_dt))
    }

    /// World anchor on body1.
    pub fn anchor1(&self, b1: &Body) -> Vec2 {
        forward!(self, j => j.anchor1(b1))
    }

    /// World anchor on body2.
    pub fn anchor2(&self, b2: &Body) -> Vec2 {
        forward!(self, j => j.anchor2(b2))
    }
}

/// World anchor from a centroid-local one.
pub(crate) fn world_anchor(body: &Body, local: Vec2) -> Vec2 {
    body.p + crate::math::Rot::new(body.a).apply(local)
}

/// Centroid-local anchor from a world one.
pub(crate) fn local_anchor(body: &Body, world: Vec2) -> Vec2 {
    crate::math::Rot::new(body.a).apply_inv(world - body.p)
}
