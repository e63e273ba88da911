pub mod local;
pub mod rclone;
#[cfg(test)]
pub(crate) mod testing;

use crate::backup::remote::local::LocalStore;
use crate::backup::remote::rclone::RcloneStore;
use crate::backup::result_error::result::Result;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Zero byte file written into a snapshot once all of its uploads were attempted.
pub static COMPLETION_MARKER: &str = "BACKUP_COMPLETED";

/// Remote storage holding one directory per snapshot below a base path.
///
/// Remote paths are plain strings so rclone remotes like `nas:backup` pass through untouched.
pub trait RemoteStore: Send + Sync {
    /// Verifies the base path is reachable. Failures are `RemoteUnavailable`.
    fn check(&self, _base: &str) -> Result<()> {
        Ok(())
    }

    /// Raw directory names directly below `base`. Failures are `RemoteUnavailable`.
    fn list_snapshots(&self, base: &str) -> Result<Vec<String>>;

    /// Removes the snapshot `name` below `base` with everything in it.
    fn delete(&self, base: &str, name: &str) -> Result<()>;

    /// Copies a local file, or the content of a local directory, into the remote directory.
    fn upload(&self, local: &Path, remote: &str) -> Result<()>;

    /// Writes [`COMPLETION_MARKER`] into the snapshot directory `remote`.
    fn mark_complete(&self, remote: &str) -> Result<()>;
}

impl<T: RemoteStore + ?Sized> RemoteStore for Box<T> {
    fn check(&self, base: &str) -> Result<()> {
        self.as_ref().check(base)
    }

    fn list_snapshots(&self, base: &str) -> Result<Vec<String>> {
        self.as_ref().list_snapshots(base)
    }

    fn delete(&self, base: &str, name: &str) -> Result<()> {
        self.as_ref().delete(base, name)
    }

    fn upload(&self, local: &Path, remote: &str) -> Result<()> {
        self.as_ref().upload(local, remote)
    }

    fn mark_complete(&self, remote: &str) -> Result<()> {
        self.as_ref().mark_complete(remote)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum StoreKind {
    /// Shell out to the rclone CLI
    #[default]
    Rclone,
    /// Treat the remote as a local directory, e.g. a mounted NAS share
    Local,
}

impl StoreKind {
    pub fn build<P: Into<PathBuf>>(self, rclone_bin: Option<P>) -> Box<dyn RemoteStore> {
        match self {
            StoreKind::Rclone => match rclone_bin {
                Some(bin) => Box::new(RcloneStore::builder().binary(bin.into()).build()),
                None => Box::new(RcloneStore::default()),
            },
            StoreKind::Local => Box::new(LocalStore),
        }
    }
}

/// Appends `segment` to a remote path, keeping rclone remote roots like `nas:` intact.
pub fn join_remote(base: &str, segment: &str) -> String {
    let segment = segment.trim_start_matches('/');
    if base.is_empty() {
        segment.to_string()
    } else if base.ends_with('/') || base.ends_with(':') {
        format!("{base}{segment}")
    } else {
        format!("{base}/{segment}")
    }
}
