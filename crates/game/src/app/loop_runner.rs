use std::process::ExitCode;

use sprout_engine::{
    run_headless, AppError, ContentLoadLevel, ContentManager, ContentType, ControlsManager,
    IdleDriver, LoopSummary, MetricsHandle, Simulation,
};
use tracing::{error, info, warn};

use super::bootstrap::AppWiring;
use super::options::GameOptions;

pub(crate) fn run(app: AppWiring) -> ExitCode {
    let AppWiring {
        paths,
        options,
        mut controls,
    } = app;
    let content = ContentManager::new(paths.game_data_dir);

    match run_session(content, &options, &mut controls) {
        Ok(summary) => {
            info!(
                frames = summary.frames,
                ticks = summary.ticks,
                mob_count = summary.final_metrics.mob_count,
                day_minutes = summary.final_metrics.day_minutes,
                "shutdown"
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(error = %err, "session_failed");
            ExitCode::FAILURE
        }
    }
}

/// Loads every content type, plays the configured area for the configured
/// number of frames, then unloads everything again.
pub(crate) fn run_session(
    mut content: ContentManager,
    options: &GameOptions,
    controls: &mut ControlsManager,
) -> Result<LoopSummary, AppError> {
    let report = content.load_all(&ContentType::ALL, ContentLoadLevel::Full)?;
    if !report.errors.is_empty() {
        warn!(
            errors = report.errors.len(),
            report = %report.render_human_readable(),
            "content_loaded_with_errors"
        );
    }

    let mut sim = Simulation::new(content, options.rng_seed);
    sim.start_area(&options.area)?;
    info!(area = options.area.as_str(), mob_count = sim.mob_count(), "area_started");

    let summary = run_headless(
        &mut sim,
        controls,
        &mut IdleDriver,
        &options.loop_config(),
        &MetricsHandle::default(),
    );

    if let Some(result) = sim.mission_result() {
        info!(
            status = ?result.status,
            score = result.score,
            medal = ?result.medal,
            "mission_result"
        );
    }
    sim.end_area();
    let mut content = sim.into_content();
    content.unload_all(&ContentType::ALL)?;
    summary
}
