use std::time::Duration;

use crate::joint::JointId;

/// Per-step solver report.
#[derive(Debug, Clone, Default)]
pub struct StepStats {
    /// Broad phase + narrow phase + manifold persistence.
    pub collision: Duration,
    /// Contact and joint solver initialization.
    pub init: Duration,
    pub velocity_solver: Duration,
    pub position_solver: Duration,
    /// Position rounds actually run (early exit on success).
    pub position_iterations: usize,
    /// True when every constraint reported error under slop.
    pub position_solved: bool,
    pub contacts: usize,
    pub bodies: usize,
    pub joints: usize,
    /// Joints that exceeded their max force and were removed this step.
    pub broken_joints: Vec<JointId>,
}
