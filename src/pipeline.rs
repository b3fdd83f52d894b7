//! Run orchestrator: authenticate → extract/normalize/write → ensure bucket → publish → cleanup.
//!
//! Strictly linear. Any stage error moves the run to `Failed`; the local file is removed
//! if it was created, and the stage error (never a cleanup error) goes back to the caller.
//! Retries belong to the scheduler re-invoking the whole run.

use crate::config::PipelineRun;
use crate::error::{EtlError, EtlResult};
use crate::progress::make_row_progress;
use crate::publish::{ensure_container, publish, ObjectStore, S3Store};
use crate::sink::CsvSink;
use crate::source::{PostSource, RedditClient};
use crate::transform::normalize;
use crate::util::remove_with_backoff;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunState {
    Init,
    Authenticated,
    Extracting,
    LocalWriteComplete,
    ContainerReady,
    Published,
    CleanedUp,
    Failed,
}

impl RunState {
    pub fn is_terminal(self) -> bool {
        matches!(self, RunState::CleanedUp | RunState::Failed)
    }
}

/// What a successful run hands back to the scheduler.
#[derive(Clone, Debug)]
pub struct RunReport {
    pub run_id: String,
    /// `<bucket>/raw/<run_id>.csv`
    pub location: String,
    pub rows: u64,
    pub local_path: PathBuf,
    /// Set when the listing ended early; the rows read before that were still published.
    pub stream_truncated: Option<String>,
    /// `CleanedUp`, or `Published` if removing the local file failed.
    pub final_state: RunState,
}

pub struct RedditPipeline {
    run: PipelineRun,
    state: RunState,
    file_created: bool,
}

impl RedditPipeline {
    pub fn new(run: PipelineRun) -> Self {
        Self { run, state: RunState::Init, file_created: false }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Execute against the live Reddit API and S3.
    pub fn run(&mut self) -> EtlResult<RunReport> {
        self.execute(
            |run| RedditClient::connect(&run.reddit, &run.user_agent),
            |run| S3Store::connect(&run.storage),
        )
    }

    /// Execute with injected collaborators. Both connectors run before any local I/O.
    /// A pipeline runs once; a second call is rejected and leaves the first outcome untouched.
    pub fn execute<S, O, CS, CO>(&mut self, connect_source: CS, connect_store: CO) -> EtlResult<RunReport>
    where
        S: PostSource,
        O: ObjectStore,
        CS: FnOnce(&PipelineRun) -> EtlResult<S>,
        CO: FnOnce(&PipelineRun) -> EtlResult<O>,
    {
        if self.state != RunState::Init {
            return Err(EtlError::Config(format!(
                "run '{}' already executed (state {:?}); start a new pipeline",
                self.run.run_id, self.state
            )));
        }
        let local_path = self.run.local_path();
        match self.drive(connect_source, connect_store, &local_path) {
            Ok(report) => Ok(report),
            Err(e) => {
                self.fail(&local_path, &e);
                Err(e)
            }
        }
    }

    fn drive<S, O, CS, CO>(&mut self, connect_source: CS, connect_store: CO, local_path: &Path) -> EtlResult<RunReport>
    where
        S: PostSource,
        O: ObjectStore,
        CS: FnOnce(&PipelineRun) -> EtlResult<S>,
        CO: FnOnce(&PipelineRun) -> EtlResult<O>,
    {
        self.run.validate()?;
        tracing::info!(run_id = %self.run.run_id, subreddit = %self.run.subreddit, window = %self.run.time_filter, limit = ?self.run.limit, "Run starting");

        let store = connect_store(&self.run)?;
        let source = connect_source(&self.run)?;
        self.transition(RunState::Authenticated);

        self.transition(RunState::Extracting);
        let (rows, truncated) = self.extract_to(&source, local_path)?;
        if let Some(reason) = &truncated {
            if self.run.fail_on_truncated_stream {
                return Err(EtlError::ExtractionStream { rows, reason: reason.clone() });
            }
            tracing::warn!(rows, reason = %reason, "Listing ended early; publishing the rows captured so far");
        }
        self.transition(RunState::LocalWriteComplete);

        let bucket = self.run.storage.bucket.clone();
        ensure_container(&store, &bucket)?;
        self.transition(RunState::ContainerReady);

        let location = publish(&store, local_path, &bucket, &self.run.run_id)?;
        self.transition(RunState::Published);

        match remove_with_backoff(local_path, 8, 50) {
            Ok(_) => {
                tracing::info!(path = %local_path.display(), "Local file cleaned up");
                self.transition(RunState::CleanedUp);
            }
            Err(e) => {
                tracing::warn!(path = %local_path.display(), error = %e, "Could not remove local file after upload");
            }
        }
        self.file_created = false;

        Ok(RunReport {
            run_id: self.run.run_id.clone(),
            location,
            rows,
            local_path: local_path.to_path_buf(),
            stream_truncated: truncated,
            final_state: self.state,
        })
    }

    /// Pull, normalize and write one record at a time. Returns the row count and the
    /// early-termination reason, if any.
    fn extract_to<S: PostSource>(&mut self, source: &S, local_path: &Path) -> EtlResult<(u64, Option<String>)> {
        fs::create_dir_all(&self.run.work_dir).map_err(|e| EtlError::local_write(&self.run.work_dir, e))?;
        tracing::info!(path = %local_path.display(), "Writing data to {}...", local_path.display());

        let mut sink = CsvSink::open(local_path)?;
        self.file_created = true;
        let pb = if self.run.progress {
            Some(make_row_progress(self.run.limit, &format!("r/{}", self.run.subreddit)))
        } else {
            None
        };

        let mut stream = source.top_posts(&self.run.subreddit, self.run.time_filter, self.run.limit);
        for raw in stream.by_ref() {
            sink.write_row(&normalize(&raw))?;
            if let Some(pb) = &pb {
                pb.inc(1);
            }
        }
        let truncated = stream.truncated().map(str::to_string);
        let rows = sink.finish()?;

        if let Some(pb) = pb {
            pb.finish_with_message("done");
        }
        tracing::info!(rows, path = %local_path.display(), "Successfully processed and saved {} rows to {}.", rows, local_path.display());
        Ok((rows, truncated))
    }

    fn transition(&mut self, next: RunState) {
        tracing::debug!(from = ?self.state, to = ?next, "state transition");
        self.state = next;
    }

    fn fail(&mut self, local_path: &Path, err: &EtlError) {
        tracing::error!(run_id = %self.run.run_id, state = ?self.state, error = %err, "Run failed");
        self.state = RunState::Failed;
        if !self.file_created {
            return;
        }
        match remove_with_backoff(local_path, 8, 50) {
            Ok(true) => tracing::info!(path = %local_path.display(), "Local file cleaned up after failure"),
            Ok(false) => {}
            Err(e) => tracing::warn!(path = %local_path.display(), error = %e, "Cleanup after failure also failed"),
        }
    }
}
