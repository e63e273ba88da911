pub mod tar;

use crate::backup::file_ext::FileExtProvider;
use crate::backup::result_error::result::Result;
use std::path::{Path, PathBuf};

/// Outcome of packing one source directory.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ArchiveSummary {
    pub path: PathBuf,
    /// Regular files written into the archive.
    pub files: usize,
    /// Entries left out because they could not be read.
    pub skipped: usize,
}

/// Packs a directory tree into a single file.
///
/// Implementations keep regular files only, stored relative to the source directory.
/// Symlinks and directory entries are skipped, unreadable entries are logged and left out.
pub trait Archiver: FileExtProvider + Send + Sync {
    fn create_archive(&self, src_dir: &Path, dst_file: &Path) -> Result<ArchiveSummary>;

    /// `<base_name>.<ext>`, the file name used for an archive of `base_name`.
    fn archive_file_name(&self, base_name: &str) -> String {
        match self.file_ext() {
            Some(ext) => format!("{base_name}.{ext}"),
            None => base_name.to_string(),
        }
    }
}
