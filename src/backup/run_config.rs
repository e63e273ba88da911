use crate::backup::compress::CompressorConfig;
use crate::backup::remote::StoreKind;
use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::Result;
use crate::backup::result_error::WithMsg;
use crate::backup::retention::RetentionConfig;
use crate::backup::validate::{validate_source_paths, validate_writable_dir};
use bon::Builder;
use getset::{CopyGetters, Getters};
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::warn;
use validator::Validate;

pub const DEFAULT_CONCURRENCY: usize = 2;

fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

/// Settings of one backup run, fixed for its whole duration.
#[skip_serializing_none]
#[derive(Clone, Debug, Serialize, Deserialize, Validate, Builder, Getters, CopyGetters, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    /// Local paths backed up into every snapshot.
    #[validate(length(min = 1), custom(function = validate_source_paths))]
    #[builder(into)]
    #[getset(get = "pub")]
    paths: Vec<PathBuf>,
    /// Remote base path holding the `bak_*` snapshot directories.
    #[validate(length(min = 1))]
    #[builder(into)]
    #[getset(get = "pub")]
    remote: String,
    #[serde(default)]
    #[builder(default)]
    #[getset(get_copy = "pub")]
    store: StoreKind,
    /// rclone executable, looked up in `PATH` when unset.
    #[builder(into)]
    #[getset(get = "pub")]
    rclone_bin: Option<PathBuf>,
    #[validate(nested)]
    #[serde(default)]
    #[builder(default)]
    #[getset(get = "pub")]
    retention: RetentionConfig,
    /// Upper bound on paths archived and uploaded at the same time.
    #[validate(range(min = 1))]
    #[serde(default = "default_concurrency")]
    #[builder(default = DEFAULT_CONCURRENCY)]
    #[getset(get_copy = "pub")]
    concurrency: usize,
    #[serde(default)]
    #[builder(default)]
    #[getset(get_copy = "pub")]
    dry_run: bool,
    /// Pack each path into a single archive before uploading it.
    #[serde(default)]
    #[builder(default)]
    #[getset(get_copy = "pub")]
    compress: bool,
    #[validate(nested)]
    #[serde(default)]
    #[builder(default, into)]
    #[getset(get = "pub")]
    compressor: CompressorConfig,
    /// Parent of the temporary archive directory, the system temp dir when unset.
    #[validate(custom(function = validate_writable_dir))]
    #[builder(into)]
    #[getset(get = "pub")]
    tmp_dir: Option<PathBuf>,
}

impl RunConfig {
    /// Reads and validates a YAML config file.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        File::open(path)
            .map_err(Error::from)
            .and_then(|f| serde_yml::from_reader::<_, RunConfig>(f).map_err(Error::from))
            .with_msg(format!("Parse YAML config failed: {path:?}"))
            .and_then(|config| config.validated())
    }

    pub fn validated(self) -> Result<Self> {
        self.validate()
            .map_err(Error::from)
            .with_msg("Config validation failed")?;
        for missing in self.missing_paths() {
            warn!("Source path {missing:?} not found, its backup will fail");
        }
        Ok(self)
    }

    /// Configured source paths that do not exist right now.
    pub fn missing_paths(&self) -> impl Iterator<Item = &PathBuf> {
        self.paths.iter().filter(|p| !p.exists())
    }

    /// Same config with dry run forced on when `dry_run` is set.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run |= dry_run;
        self
    }
}
