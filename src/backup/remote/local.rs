use crate::backup::remote::{RemoteStore, COMPLETION_MARKER};
use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::Result;
use crate::backup::result_error::WithMsg;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// [`RemoteStore`] on a plain directory, e.g. a mounted NAS share.
///
/// Behaves like `rclone copy` against a local remote: directories are merged into the
/// destination, symlinks are not followed.
#[derive(Clone, Copy, Debug, Default)]
pub struct LocalStore;

impl LocalStore {
    fn copy_tree(src: &Path, dst: &Path) -> Result<()> {
        fs::symlink_metadata(src)
            .map_err(Error::from)
            .with_msg(format!("Reading {src:?} failed"))?;
        fs::create_dir_all(dst)?;
        if src.is_file() {
            let file_name = src.file_name().ok_or_else(|| {
                Error::from(io::Error::other(format!("{src:?} has no file name")))
            })?;
            fs::copy(src, dst.join(file_name))?;
            return Ok(());
        }

        for entry in WalkDir::new(src).min_depth(1) {
            let entry = entry?;
            let target = dst.join(
                entry
                    .path()
                    .strip_prefix(src)
                    .map_err(|e| Error::from(io::Error::other(e)))?,
            );
            let file_type = entry.file_type();
            if file_type.is_symlink() {
                warn!("Skipping symlink {:?}", entry.path());
            } else if file_type.is_dir() {
                fs::create_dir_all(&target)?;
            } else {
                fs::copy(entry.path(), &target)
                    .map_err(Error::from)
                    .with_msg(format!("Copying {:?} failed", entry.path()))?;
            }
        }
        Ok(())
    }
}

impl RemoteStore for LocalStore {
    fn check(&self, base: &str) -> Result<()> {
        let metadata = fs::metadata(base).map_err(|e| Error::remote_unavailable(base, e.into()))?;
        if !metadata.is_dir() {
            return Err(Error::remote_unavailable(
                base,
                io::Error::other("not a directory").into(),
            ));
        }
        debug!("Remote access ok: {base}");
        Ok(())
    }

    fn list_snapshots(&self, base: &str) -> Result<Vec<String>> {
        let list = || -> Result<Vec<String>> {
            let mut names = Vec::new();
            for entry in fs::read_dir(base)? {
                let entry = entry?;
                if entry.file_type()?.is_dir() {
                    names.push(entry.file_name().to_string_lossy().into_owned());
                }
            }
            Ok(names)
        };

        list().map_err(|e| Error::remote_unavailable(base, e))
    }

    fn delete(&self, base: &str, name: &str) -> Result<()> {
        let path = PathBuf::from(base).join(name);
        fs::remove_dir_all(&path)
            .map_err(|e| Error::delete_failed(path.to_string_lossy(), e.into()))
    }

    fn upload(&self, local: &Path, remote: &str) -> Result<()> {
        Self::copy_tree(local, Path::new(remote))
            .map_err(|e| Error::upload_failed(local, remote, e))
    }

    fn mark_complete(&self, remote: &str) -> Result<()> {
        let dir = Path::new(remote);
        fs::create_dir_all(dir)
            .and_then(|_| File::create(dir.join(COMPLETION_MARKER)))
            .map(|_| ())
            .map_err(|e| Error::mark_failed(remote, e.into()))
    }
}
