use crate::backup::archive::{ArchiveSummary, Archiver};
use crate::backup::compress::{CompressorBuilder, CompressorConfig};
use crate::backup::file_ext::FileExtProvider;
use crate::backup::finish::Finish;
use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::Result;
use bon::Builder;
use getset::Getters;
use itertools::Itertools;
use std::fs::File;
use std::io::{BufWriter, IntoInnerError, Write};
use std::path::Path;
use std::sync::{Arc, OnceLock};
use tracing::{debug, info, trace, warn};
use walkdir::WalkDir;

static TAR_FILE_EXT: OnceLock<Arc<str>> = OnceLock::new();
const PROGRESS_EVERY: usize = 100;

/// Writes a tar archive, optionally compressed, of every regular file below a directory.
#[derive(Clone, Debug, Default, Builder, Getters)]
#[getset(get = "pub")]
pub struct TarArchiver {
    #[builder(default, into)]
    compressor: CompressorConfig,
}

impl FileExtProvider for TarArchiver {
    fn file_ext(&self) -> Option<Arc<str>> {
        Some(
            std::iter::once(TAR_FILE_EXT.get_or_init(|| "tar".into()).clone())
                .chain(self.compressor.file_ext())
                .join(".")
                .into(),
        )
    }
}

impl Archiver for TarArchiver {
    fn create_archive(&self, src_dir: &Path, dst_file: &Path) -> Result<ArchiveSummary> {
        self.write_archive(src_dir, dst_file)
            .map_err(|e| Error::archive_failed(src_dir, e))
    }
}

impl TarArchiver {
    fn write_archive(&self, src_dir: &Path, dst_file: &Path) -> Result<ArchiveSummary> {
        if !src_dir.is_dir() {
            return Err(std::io::Error::other(format!("{src_dir:?} is not a directory")).into());
        }
        debug!("Archiving directory {src_dir:?} into {dst_file:?}");

        let mut writer = File::create(dst_file)
            .map(BufWriter::new)
            .map_err(Error::from)
            .and_then(|f| self.compressor.build_compressor(f))
            .map(BufWriter::new)
            .map(tar::Builder::new)?;

        let mut summary = ArchiveSummary {
            path: dst_file.to_path_buf(),
            ..Default::default()
        };

        for entry in WalkDir::new(src_dir).follow_links(false) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Error reading path, skipping: {e}");
                    summary.skipped += 1;
                    continue;
                }
            };

            let file_type = entry.file_type();
            if file_type.is_dir() || file_type.is_symlink() {
                continue;
            }
            if !file_type.is_file() || entry.path() == dst_file {
                trace!("Skipping {:?}, not a regular file", entry.path());
                continue;
            }

            let rel_path = entry
                .path()
                .strip_prefix(src_dir)
                .map_err(std::io::Error::other)?;
            if summary.files % PROGRESS_EVERY == 0 {
                debug!(
                    "Archiving progress: {} files from {src_dir:?}, current {rel_path:?}",
                    summary.files
                );
            }

            let mut file = match File::open(entry.path()) {
                Ok(file) => file,
                Err(e) => {
                    warn!("Skipping unreadable file {:?}: {e}", entry.path());
                    summary.skipped += 1;
                    continue;
                }
            };
            writer.append_file(rel_path, &mut file)?;
            summary.files += 1;
        }

        writer
            .into_inner()?
            .into_inner()
            .map_err(IntoInnerError::into_error)?
            .finish()?
            .into_inner()
            .map_err(IntoInnerError::into_error)?
            .flush()?;

        info!(
            "Archived {} files from {src_dir:?} ({} skipped)",
            summary.files, summary.skipped
        );
        Ok(summary)
    }
}
