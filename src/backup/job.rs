use crate::backup::archive::{ArchiveSummary, Archiver};
use crate::backup::remote::{join_remote, RemoteStore};
use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::Result;
use itertools::Itertools;
use std::path::{Component, Path, PathBuf};
use tempfile::TempPath;
use tracing::{error, info, warn};

/// Remote entry name of a source path: its normal components joined with `_`.
///
/// `/home/user/docs` becomes `home_user_docs`; the filesystem root becomes `root`.
pub fn entry_name(path: &Path) -> String {
    let joined = path
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy()),
            _ => None,
        })
        .join("_");
    let name = sanitize_filename::sanitize(joined);
    if name.is_empty() {
        "root".to_string()
    } else {
        name
    }
}

/// One source path to copy into the snapshot being created.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackupJob {
    pub source: PathBuf,
    pub entry: String,
    /// Remote directory receiving the copy or the archive.
    pub destination: String,
    pub compress: bool,
}

/// Everything a job needs besides its own paths.
pub struct JobContext<'a, S: ?Sized, A: ?Sized> {
    pub store: &'a S,
    pub archiver: &'a A,
    /// Directory holding temporary archives, the system temp dir when `None`.
    pub work_dir: Option<&'a Path>,
    pub dry_run: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JobStatus {
    Uploaded { archive: Option<ArchiveSummary> },
    DryRun,
}

#[derive(Debug)]
pub struct JobReport {
    pub source: PathBuf,
    pub destination: String,
    pub result: Result<JobStatus>,
}

impl JobReport {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

impl BackupJob {
    pub fn new<P: Into<PathBuf>>(source: P, snapshot_remote: &str, compress: bool) -> Self {
        let source = source.into();
        let entry = entry_name(&source);
        Self {
            destination: join_remote(snapshot_remote, &entry),
            source,
            entry,
            compress,
        }
    }

    /// Archives (when requested) and uploads the source. Never panics on failure,
    /// the outcome is returned in the report.
    pub fn run<S, A>(&self, ctx: &JobContext<'_, S, A>) -> JobReport
    where
        S: RemoteStore + ?Sized,
        A: Archiver + ?Sized,
    {
        info!("Backing up {:?} to {}", self.source, self.destination);
        let result = self.execute(ctx);
        match &result {
            Ok(JobStatus::Uploaded { .. }) => info!("Backup done: {:?}", self.source),
            Ok(JobStatus::DryRun) => {}
            Err(e) => error!("Backup of {:?} failed: {e}", self.source),
        }

        JobReport {
            source: self.source.clone(),
            destination: self.destination.clone(),
            result,
        }
    }

    fn execute<S, A>(&self, ctx: &JobContext<'_, S, A>) -> Result<JobStatus>
    where
        S: RemoteStore + ?Sized,
        A: Archiver + ?Sized,
    {
        if ctx.dry_run {
            if self.compress {
                warn!("Dry run, {:?} not archived", self.source);
            }
            warn!("Dry run, {:?} not uploaded to {}", self.source, self.destination);
            return Ok(JobStatus::DryRun);
        }

        if !self.compress {
            ctx.store.upload(&self.source, &self.destination)?;
            return Ok(JobStatus::Uploaded { archive: None });
        }

        let work_dir = ctx
            .work_dir
            .map(Path::to_path_buf)
            .unwrap_or_else(std::env::temp_dir);
        // Removed on drop, so a failed archive does not linger either.
        let archive_path =
            TempPath::try_from_path(work_dir.join(ctx.archiver.archive_file_name(&self.entry)))
                .map_err(|e| Error::archive_failed(&self.source, e.into()))?;
        let summary = ctx.archiver.create_archive(&self.source, &archive_path)?;

        let uploaded = ctx.store.upload(&archive_path, &self.destination);
        if let Err(e) = archive_path.close() {
            warn!("Failed to remove temporary archive of {:?}: {e}", self.source);
        }
        uploaded?;

        Ok(JobStatus::Uploaded {
            archive: Some(summary),
        })
    }
}
