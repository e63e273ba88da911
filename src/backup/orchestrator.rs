//! One backup run: decide, evict, upload every path under a concurrency cap, mark complete.
//!
//! ```text
//! Idle -> Checking -> Skipped -> Done
//!                  -> Evicting -> Uploading -> Completing -> Done
//! ```
//!
//! Only failures while checking end a run early. Eviction, per-path and completion marker
//! failures are logged and recorded in the [`RunReport`].

use crate::backup::archive::tar::TarArchiver;
use crate::backup::archive::Archiver;
use crate::backup::catalog::Catalog;
use crate::backup::job::{BackupJob, JobContext, JobReport};
use crate::backup::remote::{join_remote, RemoteStore};
use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::Result;
use crate::backup::result_error::WithMsg;
use crate::backup::run_config::RunConfig;
use crate::backup::snapshot::Snapshot;
use chrono::{NaiveDateTime, TimeDelta};
use derive_more::Display;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tempfile::TempDir;
use tracing::{debug, error, info, warn};

const SECS_PER_DAY: f64 = 24.0 * 60.0 * 60.0;

#[derive(Clone, Copy, Debug, Display, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Checking,
    Skipped,
    Evicting,
    Uploading,
    Completing,
    Done,
}

#[derive(Debug)]
pub enum RunOutcome {
    /// Remote check, catalog load or run setup failed; nothing was touched.
    Fatal(Error),
    /// The most recent snapshot is younger than the configured max age.
    Skipped { latest: Snapshot, age: TimeDelta },
    Completed(CompletedRun),
}

#[derive(Debug)]
pub struct CompletedRun {
    pub snapshot: Snapshot,
    /// Remote directory of the new snapshot.
    pub remote: String,
    pub eviction_target: Option<Snapshot>,
    pub eviction_error: Option<Error>,
    pub jobs: Vec<JobReport>,
    pub marker_error: Option<Error>,
    pub dry_run: bool,
}

impl CompletedRun {
    pub fn failed_jobs(&self) -> impl Iterator<Item = &JobReport> {
        self.jobs.iter().filter(|job| !job.is_success())
    }
}

#[derive(Debug)]
pub struct RunReport {
    /// Every state the run went through, starting at `Idle`.
    pub states: Vec<RunState>,
    pub outcome: RunOutcome,
}

impl RunReport {
    /// `1` when the run failed before any backup work, `2` when at least one path failed,
    /// `0` otherwise.
    pub fn exit_code(&self) -> i32 {
        match &self.outcome {
            RunOutcome::Fatal(_) => 1,
            RunOutcome::Completed(run) if run.failed_jobs().next().is_some() => 2,
            _ => 0,
        }
    }

    pub fn is_success(&self) -> bool {
        self.exit_code() == 0
    }
}

struct StateTrail {
    states: Vec<RunState>,
}

impl StateTrail {
    fn new() -> Self {
        Self {
            states: vec![RunState::Idle],
        }
    }

    fn enter(&mut self, state: RunState) {
        if let Some(prev) = self.states.last() {
            debug!("Backup run: {prev} -> {state}");
        }
        self.states.push(state);
    }

    fn finish(mut self, outcome: RunOutcome) -> RunReport {
        self.enter(RunState::Done);
        RunReport {
            states: self.states,
            outcome,
        }
    }
}

/// Resources of the upload phase, set up before anything is deleted.
struct UploadResources {
    pool: ThreadPool,
    work_dir: Option<TempDir>,
}

pub struct Orchestrator<S, A> {
    config: RunConfig,
    store: S,
    archiver: A,
}

impl Orchestrator<Box<dyn RemoteStore>, TarArchiver> {
    /// Store and archiver as described by the config.
    pub fn from_config(config: RunConfig) -> Self {
        let store = config.store().build(config.rclone_bin().clone());
        let archiver = TarArchiver::builder()
            .compressor(config.compressor().clone())
            .build();
        Self::new(config, store, archiver)
    }
}

impl<S: RemoteStore, A: Archiver> Orchestrator<S, A> {
    pub fn new(config: RunConfig, store: S, archiver: A) -> Self {
        Self {
            config,
            store,
            archiver,
        }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn run(&self, now: NaiveDateTime) -> RunReport {
        let mut trail = StateTrail::new();
        let base = self.config.remote().as_str();
        let retention = self.config.retention();
        let dry_run = self.config.dry_run();
        if dry_run {
            warn!("Dry run, no remote changes will be made");
        }

        trail.enter(RunState::Checking);
        let catalog = match self.load_catalog(base) {
            Ok(catalog) => catalog,
            Err(e) => {
                error!("{e}");
                return trail.finish(RunOutcome::Fatal(e));
            }
        };

        let due = retention.is_backup_due(&catalog, now);
        if let (false, Ok(latest)) = (due, catalog.most_recent()) {
            let age = now.signed_duration_since(latest.created_at);
            info!(
                "Last backup {latest} is recent, age = {:.1} days (max {:.1} days)",
                age.num_seconds() as f64 / SECS_PER_DAY,
                retention.max_age.as_secs_f64() / SECS_PER_DAY,
            );
            trail.enter(RunState::Skipped);
            return trail.finish(RunOutcome::Skipped {
                latest: latest.clone(),
                age,
            });
        }
        info!("Backup is due, {} backups on remote", catalog.count());

        let resources = match self.prepare_upload() {
            Ok(resources) => resources,
            Err(e) => {
                error!("{e}");
                return trail.finish(RunOutcome::Fatal(e));
            }
        };

        trail.enter(RunState::Evicting);
        let eviction_target = retention.eviction_target(&catalog).cloned();
        let eviction_error = self.evict(base, eviction_target.as_ref());

        trail.enter(RunState::Uploading);
        let snapshot = Snapshot::at(now);
        let remote = join_remote(base, snapshot.name());
        info!("Creating backup {remote}");
        let jobs = self
            .config
            .paths()
            .iter()
            .map(|path| BackupJob::new(path, &remote, self.config.compress()))
            .collect::<Vec<_>>();
        let reports = self.run_jobs(&jobs, &resources);
        drop(resources);

        trail.enter(RunState::Completing);
        let marker_error = self.mark_complete(&remote);

        let run = CompletedRun {
            snapshot,
            remote,
            eviction_target,
            eviction_error,
            jobs: reports,
            marker_error,
            dry_run,
        };
        let failed = run.failed_jobs().count();
        if failed == 0 {
            info!("Backup {} done, {} paths", run.snapshot, run.jobs.len());
        } else {
            error!(
                "Backup {} finished with {failed} of {} paths failed",
                run.snapshot,
                run.jobs.len()
            );
        }

        trail.finish(RunOutcome::Completed(run))
    }

    fn load_catalog(&self, base: &str) -> Result<Catalog> {
        self.store.check(base)?;
        Catalog::load(&self.store, base)
    }

    fn prepare_upload(&self) -> Result<UploadResources> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(self.config.concurrency())
            .thread_name(|i| format!("backup-job-{i}"))
            .build()?;

        let work_dir = if self.config.compress() && !self.config.dry_run() {
            let parent = self
                .config
                .tmp_dir()
                .clone()
                .unwrap_or_else(std::env::temp_dir);
            let dir = tempfile::Builder::new()
                .prefix("rclone-backup-")
                .tempdir_in(&parent)
                .map_err(Error::from)
                .with_msg(format!("Creating archive directory in {parent:?} failed"))?;
            debug!("Temporary archives go to {:?}", dir.path());
            Some(dir)
        } else {
            None
        };

        Ok(UploadResources { pool, work_dir })
    }

    /// Deletes `target` unless in dry run. Failures are returned, never propagated.
    fn evict(&self, base: &str, target: Option<&Snapshot>) -> Option<Error> {
        let max_count = self.config.retention().max_count;
        let target = match target {
            Some(target) => target,
            None => {
                debug!("Below {max_count} backups, nothing to delete");
                return None;
            }
        };

        info!("Deleting oldest backup {target} to keep at most {max_count} backups");
        if self.config.dry_run() {
            warn!("Dry run, backup {target} not deleted");
            return None;
        }

        match self.store.delete(base, target.name()) {
            Ok(()) => None,
            Err(e) => {
                error!("Failed to delete old backup: {e}");
                Some(e)
            }
        }
    }

    /// Runs all jobs on the bounded pool and waits for every one of them.
    fn run_jobs(&self, jobs: &[BackupJob], resources: &UploadResources) -> Vec<JobReport> {
        let ctx = JobContext {
            store: &self.store,
            archiver: &self.archiver,
            work_dir: resources.work_dir.as_ref().map(TempDir::path),
            dry_run: self.config.dry_run(),
        };

        resources
            .pool
            .install(|| jobs.par_iter().map(|job| job.run(&ctx)).collect())
    }

    fn mark_complete(&self, remote: &str) -> Option<Error> {
        if self.config.dry_run() {
            warn!("Dry run, {remote} not marked complete");
            return None;
        }

        match self.store.mark_complete(remote) {
            Ok(()) => {
                debug!("Marked {remote} complete");
                None
            }
            Err(e) => {
                warn!("{e}");
                Some(e)
            }
        }
    }
}
