use anyhow::{Context, Result};
use retl_daily::{init_tracing_once, PipelineRun, RedditPipeline};

/// Scheduler entry point: one invocation = one run. Parameters and credentials come
/// from the environment (or a `.env` file next to the task); the published location
/// is printed on stdout, any failure exits non-zero.
fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    init_tracing_once();

    let run = PipelineRun::from_env().context("resolve run from environment")?;
    tracing::info!(run_id = %run.run_id, work_dir = %run.work_dir.display(), "Resolved run");

    let report = RedditPipeline::new(run)
        .run()
        .context("reddit pipeline failed")?;

    if let Some(reason) = &report.stream_truncated {
        tracing::warn!(rows = report.rows, reason = %reason, "Published a partial extract");
    }
    println!("{}", report.location);
    Ok(())
}
