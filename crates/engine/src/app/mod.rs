//! Headless driver: the control-to-action mapping, the fixed-timestep loop
//! and its metrics.

mod controls;
mod loop_runner;
mod metrics;

pub use controls::{
    ControlBind, ControlsManager, PlayerAction, PlayerActionType, PlayerInput, PlayerInputKind,
    StickDeadZone,
};
pub use loop_runner::{run_headless, AppError, FrameDriver, IdleDriver, LoopConfig, LoopSummary};
pub use metrics::{LoopMetricsSnapshot, MetricsHandle, SimulationMetrics};
