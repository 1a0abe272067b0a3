use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::content::ContentError;
use crate::sim::{Simulation, SimulationError};
use crate::StartupError;

use super::controls::{ControlsManager, PlayerAction, PlayerInput};
use super::metrics::{MetricsAccumulator, MetricsHandle, SimulationMetrics};

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub target_tps: u32,
    pub max_frame_delta: Duration,
    pub max_ticks_per_frame: u32,
    pub metrics_log_interval: Duration,
    pub frames_to_run: u64,
    /// Fixed length of every frame. `None` paces frames on the wall clock.
    pub frame_delta: Option<Duration>,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            target_tps: 60,
            max_frame_delta: Duration::from_millis(250),
            max_ticks_per_frame: 5,
            metrics_log_interval: Duration::from_secs(1),
            frames_to_run: 600,
            frame_delta: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error("content load failed: {0}")]
    Content(#[from] ContentError),
    #[error("simulation failed: {0}")]
    Simulation(#[from] SimulationError),
}

/// Feeds the loop with hardware input and reacts to the resulting player
/// actions. Both hooks default to doing nothing.
pub trait FrameDriver {
    fn sample_inputs(&mut self, _frame: u64) -> Vec<PlayerInput> {
        Vec::new()
    }

    fn on_action(&mut self, _sim: &mut Simulation, _action: PlayerAction) {}
}

/// Driver with no input source.
#[derive(Debug, Default)]
pub struct IdleDriver;

impl FrameDriver for IdleDriver {}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoopSummary {
    pub frames: u64,
    pub ticks: u64,
    pub actions: u64,
    pub dropped_backlog: Duration,
    pub final_metrics: SimulationMetrics,
}

/// Runs the fixed-timestep loop over the simulation's current area for
/// `frames_to_run` frames.
pub fn run_headless(
    sim: &mut Simulation,
    controls: &mut ControlsManager,
    driver: &mut dyn FrameDriver,
    config: &LoopConfig,
    metrics_handle: &MetricsHandle,
) -> Result<LoopSummary, AppError> {
    let target_tps = config.target_tps.max(1);
    let max_frame_delta =
        normalize_non_zero_duration(config.max_frame_delta, Duration::from_millis(250));
    let max_ticks_per_frame = config.max_ticks_per_frame.max(1);
    let metrics_log_interval =
        normalize_non_zero_duration(config.metrics_log_interval, Duration::from_secs(1));
    let fixed_dt = Duration::from_secs_f64(1.0 / target_tps as f64);
    let fixed_dt_seconds = fixed_dt.as_secs_f32();
    let virtual_frame = config.frame_delta.filter(|delta| !delta.is_zero());

    info!(
        target_tps,
        max_frame_delta_ms = max_frame_delta.as_millis() as u64,
        max_ticks_per_frame,
        metrics_log_interval_ms = metrics_log_interval.as_millis() as u64,
        frames_to_run = config.frames_to_run,
        virtual_frame_ms = virtual_frame.map(|delta| delta.as_millis() as u64),
        "loop_config"
    );

    let mut summary = LoopSummary {
        frames: 0,
        ticks: 0,
        actions: 0,
        dropped_backlog: Duration::ZERO,
        final_metrics: SimulationMetrics::default(),
    };
    let mut accumulator = Duration::ZERO;
    let mut loop_time = Duration::ZERO;
    let mut metrics_accumulator = MetricsAccumulator::new(metrics_log_interval);
    let mut last_frame_instant = Instant::now();

    for frame in 0..config.frames_to_run {
        let frame_start = Instant::now();
        let frame_dt = match virtual_frame {
            Some(delta) => delta,
            None => frame_start.saturating_duration_since(last_frame_instant),
        };
        last_frame_instant = frame_start;

        for input in driver.sample_inputs(frame) {
            controls.handle_input(&input);
        }
        controls.new_frame();
        while let Some(action) = controls.poll_action() {
            debug!(action = action.action.name(), value = action.value, "player_action");
            driver.on_action(sim, action);
            summary.actions += 1;
        }

        accumulator = accumulator.saturating_add(clamp_frame_delta(frame_dt, max_frame_delta));
        let step_plan = plan_sim_steps(accumulator, fixed_dt, max_ticks_per_frame);
        for _ in 0..step_plan.ticks_to_run {
            sim.tick(fixed_dt_seconds)?;
            metrics_accumulator.record_tick();
            summary.ticks += 1;
        }
        accumulator = step_plan.remaining_accumulator;

        if step_plan.dropped_backlog > Duration::ZERO {
            summary.dropped_backlog = summary
                .dropped_backlog
                .saturating_add(step_plan.dropped_backlog);
            warn!(
                dropped_backlog_ms = step_plan.dropped_backlog.as_millis() as u64,
                max_ticks_per_frame, "sim_clamp_triggered"
            );
        }

        if virtual_frame.is_none() {
            let cap_sleep = compute_cap_sleep(
                Instant::now().saturating_duration_since(frame_start),
                Some(fixed_dt),
            );
            if cap_sleep > Duration::ZERO {
                thread::sleep(cap_sleep);
            }
        }

        metrics_accumulator.record_frame(frame_dt);
        loop_time = loop_time.saturating_add(frame_dt);
        summary.frames += 1;

        if let Some(snapshot) = metrics_accumulator.maybe_snapshot(loop_time) {
            let metrics = SimulationMetrics {
                loop_metrics: snapshot,
                frame: sim.frame(),
                mob_count: sim.mob_count(),
                day_minutes: sim.day_minutes().unwrap_or_default(),
            };
            metrics_handle.publish(metrics);
            info!(
                fps = snapshot.fps,
                tps = snapshot.tps,
                frame_time_ms = snapshot.frame_time_ms,
                frame = metrics.frame,
                mob_count = metrics.mob_count,
                day_minutes = metrics.day_minutes,
                "simulation_metrics"
            );
        }
    }

    summary.final_metrics = SimulationMetrics {
        loop_metrics: metrics_handle.latest().loop_metrics,
        frame: sim.frame(),
        mob_count: sim.mob_count(),
        day_minutes: sim.day_minutes().unwrap_or_default(),
    };
    info!(
        frames = summary.frames,
        ticks = summary.ticks,
        actions = summary.actions,
        dropped_backlog_ms = summary.dropped_backlog.as_millis() as u64,
        "loop_finished"
    );
    Ok(summary)
}

#[derive(Debug, Clone, Copy)]
struct StepPlan {
    ticks_to_run: u32,
    remaining_accumulator: Duration,
    dropped_backlog: Duration,
}

fn plan_sim_steps(
    mut accumulator: Duration,
    fixed_dt: Duration,
    max_ticks_per_frame: u32,
) -> StepPlan {
    let mut ticks_to_run = 0u32;
    while accumulator >= fixed_dt && ticks_to_run < max_ticks_per_frame {
        accumulator = accumulator.saturating_sub(fixed_dt);
        ticks_to_run = ticks_to_run.saturating_add(1);
    }

    // Whatever the tick cap left behind is dropped, not carried forward.
    let dropped_backlog = if accumulator >= fixed_dt {
        std::mem::take(&mut accumulator)
    } else {
        Duration::ZERO
    };
    StepPlan {
        ticks_to_run,
        remaining_accumulator: accumulator,
        dropped_backlog,
    }
}

fn clamp_frame_delta(frame_dt: Duration, max_frame_delta: Duration) -> Duration {
    frame_dt.min(max_frame_delta)
}

fn normalize_non_zero_duration(value: Duration, fallback: Duration) -> Duration {
    if value.is_zero() {
        fallback
    } else {
        value
    }
}

fn compute_cap_sleep(elapsed: Duration, target: Option<Duration>) -> Duration {
    match target {
        Some(frame_target) if elapsed < frame_target => frame_target - elapsed,
        _ => Duration::ZERO,
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::app::controls::{ControlBind, PlayerActionType, PlayerInputKind, StickDeadZone};
    use crate::content::{ContentLoadLevel, ContentManager, ContentType};
    use crate::sim::test_support::write_test_game_data;

    fn started(temp: &TempDir) -> Simulation {
        write_test_game_data(temp.path());
        let mut content = ContentManager::new(temp.path().to_path_buf());
        content
            .load_all(&ContentType::ALL, ContentLoadLevel::Full)
            .expect("load");
        let mut sim = Simulation::new(content, 7);
        sim.start_area("test_field").expect("start");
        sim
    }

    fn virtual_config(frames_to_run: u64, frame_delta: Duration) -> LoopConfig {
        LoopConfig {
            frames_to_run,
            frame_delta: Some(frame_delta),
            ..LoopConfig::default()
        }
    }

    #[derive(Default)]
    struct ScriptedDriver {
        seen: Vec<PlayerAction>,
    }

    impl FrameDriver for ScriptedDriver {
        fn sample_inputs(&mut self, frame: u64) -> Vec<PlayerInput> {
            let key = PlayerInputKind::KeyboardKey { key: 23 };
            match frame {
                2 => vec![PlayerInput::new(key, 1.0)],
                5 => vec![PlayerInput::new(key, 0.0)],
                _ => Vec::new(),
            }
        }

        fn on_action(&mut self, sim: &mut Simulation, action: PlayerAction) {
            assert!(sim.mob_count() > 0);
            self.seen.push(action);
        }
    }

    #[test]
    fn clamp_frame_delta_caps_large_frame() {
        let max_frame_delta = Duration::from_millis(250);
        assert_eq!(
            clamp_frame_delta(Duration::from_millis(600), max_frame_delta),
            max_frame_delta
        );
    }

    #[test]
    fn plan_sim_steps_runs_expected_ticks_without_drop() {
        let result = plan_sim_steps(Duration::from_millis(48), Duration::from_millis(16), 5);

        assert_eq!(result.ticks_to_run, 3);
        assert_eq!(result.remaining_accumulator, Duration::ZERO);
        assert_eq!(result.dropped_backlog, Duration::ZERO);
    }

    #[test]
    fn plan_sim_steps_keeps_partial_step() {
        let result = plan_sim_steps(Duration::from_millis(40), Duration::from_millis(16), 5);

        assert_eq!(result.ticks_to_run, 2);
        assert_eq!(result.remaining_accumulator, Duration::from_millis(8));
        assert_eq!(result.dropped_backlog, Duration::ZERO);
    }

    #[test]
    fn plan_sim_steps_drops_backlog_when_tick_cap_hit() {
        let result = plan_sim_steps(Duration::from_millis(120), Duration::from_millis(16), 3);

        assert_eq!(result.ticks_to_run, 3);
        assert_eq!(result.remaining_accumulator, Duration::ZERO);
        assert_eq!(result.dropped_backlog, Duration::from_millis(72));
    }

    #[test]
    fn compute_cap_sleep_only_when_under_budget() {
        let target = Some(Duration::from_millis(16));
        assert_eq!(compute_cap_sleep(Duration::from_millis(20), target), Duration::ZERO);
        assert_eq!(
            compute_cap_sleep(Duration::from_millis(6), target),
            Duration::from_millis(10)
        );
        assert_eq!(compute_cap_sleep(Duration::from_millis(6), None), Duration::ZERO);
    }

    #[test]
    fn virtual_frames_tick_once_per_step() {
        let temp = TempDir::new().expect("temp");
        let mut sim = started(&temp);
        let metrics = MetricsHandle::default();
        let config = LoopConfig {
            target_tps: 50,
            ..virtual_config(100, Duration::from_millis(20))
        };

        let summary = run_headless(
            &mut sim,
            &mut ControlsManager::default(),
            &mut IdleDriver,
            &config,
            &metrics,
        )
        .expect("run");

        assert_eq!(summary.frames, 100);
        assert_eq!(summary.ticks, 100);
        assert_eq!(summary.dropped_backlog, Duration::ZERO);
        assert_eq!(sim.frame(), 100);
        assert_eq!(summary.final_metrics.frame, 100);
        let published = metrics.latest();
        assert!(published.frame > 0);
        assert!((published.loop_metrics.tps - 50.0).abs() < 0.5);
    }

    #[test]
    fn long_frames_are_capped_and_backlog_dropped() {
        let temp = TempDir::new().expect("temp");
        let mut sim = started(&temp);
        let config = LoopConfig {
            target_tps: 100,
            max_ticks_per_frame: 3,
            ..virtual_config(4, Duration::from_millis(100))
        };

        let summary = run_headless(
            &mut sim,
            &mut ControlsManager::default(),
            &mut IdleDriver,
            &config,
            &MetricsHandle::default(),
        )
        .expect("run");

        assert_eq!(summary.ticks, 12);
        assert!(summary.dropped_backlog > Duration::ZERO);
    }

    #[test]
    fn bound_inputs_reach_the_driver_as_actions() {
        let temp = TempDir::new().expect("temp");
        let mut sim = started(&temp);
        let mut controls = ControlsManager::new(
            vec![ControlBind {
                action: PlayerActionType::Whistle,
                input: PlayerInputKind::KeyboardKey { key: 23 },
            }],
            StickDeadZone::default(),
        );
        let mut driver = ScriptedDriver::default();

        let summary = run_headless(
            &mut sim,
            &mut controls,
            &mut driver,
            &virtual_config(8, Duration::from_millis(16)),
            &MetricsHandle::default(),
        )
        .expect("run");

        assert_eq!(summary.actions, 2);
        let values = driver
            .seen
            .iter()
            .map(|action| (action.action, action.value))
            .collect::<Vec<_>>();
        assert_eq!(
            values,
            vec![
                (PlayerActionType::Whistle, 1.0),
                (PlayerActionType::Whistle, 0.0)
            ]
        );
    }

    #[test]
    fn running_without_an_area_fails() {
        let temp = TempDir::new().expect("temp");
        let mut sim = Simulation::new(ContentManager::new(temp.path().to_path_buf()), 1);

        let error = run_headless(
            &mut sim,
            &mut ControlsManager::default(),
            &mut IdleDriver,
            &virtual_config(1, Duration::from_millis(20)),
            &MetricsHandle::default(),
        )
        .expect_err("no area");
        assert!(matches!(error, AppError::Simulation(SimulationError::NoArea)));
    }
}
