//! Snapshot names on the remote.
//!
//! Every backup run lives in its own remote directory called `bak_<timestamp>`, with the
//! timestamp written as `YYYY-MM-DD_HH-MM-SS` in local time. All fields are fixed width and
//! zero padded, so sorting names lexically sorts them chronologically.

use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::Result;
use chrono::{NaiveDateTime, SubsecRound};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::sync::Arc;

pub static SNAPSHOT_PREFIX: &str = "bak_";
pub static TIME_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";
const TIMESTAMP_LEN: usize = "YYYY-MM-DD_HH-MM-SS".len();

/// One backup run on the remote, identified by its directory name.
///
/// Ordering compares names first, which matches creation time order for every name
/// accepted by [`Snapshot::parse`].
#[derive(Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Snapshot {
    pub name: Arc<str>,
    pub created_at: NaiveDateTime,
}

impl Snapshot {
    /// Snapshot for a run started at `created_at`, sub-second precision is dropped.
    pub fn at(created_at: NaiveDateTime) -> Self {
        let created_at = created_at.trunc_subsecs(0);
        Self {
            name: format!("{SNAPSHOT_PREFIX}{}", created_at.format(TIME_FORMAT)).into(),
            created_at,
        }
    }

    pub fn parse<S: AsRef<str>>(name: S) -> Result<Self> {
        let name = name.as_ref();
        let malformed = |reason: String| Error::MalformedSnapshotName {
            name: name.to_string(),
            reason,
        };

        let timestamp = name
            .strip_prefix(SNAPSHOT_PREFIX)
            .ok_or_else(|| malformed(format!("missing {SNAPSHOT_PREFIX:?} prefix")))?;
        if timestamp.len() != TIMESTAMP_LEN {
            return Err(malformed(format!(
                "timestamp {timestamp:?} is not of the form YYYY-MM-DD_HH-MM-SS"
            )));
        }

        let created_at = NaiveDateTime::parse_from_str(timestamp, TIME_FORMAT)
            .map_err(|e| malformed(e.to_string()))?;
        // chrono accepts unpadded fields, those would break lexical ordering.
        if created_at.format(TIME_FORMAT).to_string() != timestamp {
            return Err(malformed(format!("timestamp {timestamp:?} is not zero padded")));
        }

        Ok(Self {
            name: name.into(),
            created_at,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl FromStr for Snapshot {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Display for Snapshot {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}
