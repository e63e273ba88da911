//! Validation functions for configuration values.

use crate::backup::job::entry_name;
use itertools::Itertools;
use validator::ValidationError;

use std::path::{Path, PathBuf};

/// Source paths must map to distinct remote entries.
///
/// Existence is not checked here, a missing path only fails its own job.
pub fn validate_source_paths(paths: &[PathBuf]) -> Result<(), ValidationError> {
    let duplicates = paths
        .iter()
        .into_group_map_by(|p| entry_name(p))
        .into_iter()
        .filter(|(_, group)| group.len() > 1)
        .map(|(name, group)| format!("{group:?} -> {name:?}"))
        .sorted()
        .collect_vec();
    if !duplicates.is_empty() {
        return Err(ValidationError::new("DuplicateSourcePath").with_message(
            format!(
                "source paths must map to distinct remote entries: {}",
                duplicates.join(", ")
            )
            .into(),
        ));
    }

    Ok(())
}

pub fn validate_dir_exist<P: AsRef<Path>>(dir: P) -> Result<(), ValidationError> {
    let dir = dir.as_ref();
    if dir.exists() {
        if !dir.is_dir() {
            return Err(ValidationError::new("InvalidDirectory")
                .with_message(format!("{:?} is not a directory", dir).into()));
        }
    } else {
        return Err(ValidationError::new("InvalidDirectory")
            .with_message(format!("{:?} not found", dir).into()));
    }

    Ok(())
}

pub fn validate_writable_dir<P: AsRef<Path>>(dir: P) -> Result<(), ValidationError> {
    let dir = dir.as_ref();
    validate_dir_exist(dir)?;
    let md = std::fs::metadata(dir).map_err(|e| {
        ValidationError::new("InvalidDirectory")
            .with_message(format!("cannot access metadata for {:?}: {}", dir, e).into())
    })?;
    if md.permissions().readonly() {
        Err(ValidationError::new("InvalidDirectory")
            .with_message(format!("cannot write to dir {:?}", dir).into()))
    } else {
        Ok(())
    }
}
