pub mod body;
pub mod collision;
pub mod config;
pub mod contact;
pub mod error;
pub mod joint;
pub mod math;
pub mod scene;
pub mod shape;
pub mod sleep;
pub mod stats;
pub mod world;

pub use body::{Body, BodyId, BodyKind};
pub use contact::ContactSolver;
pub use error::SceneError;
pub use joint::{Joint, JointId};
pub use math::Vec2;
pub use scene::Scene;
pub use shape::{Shape, ShapeGeom, ShapeId};
pub use stats::StepStats;
pub use world::World;
