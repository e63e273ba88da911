use crate::backup::catalog::Catalog;
use crate::backup::snapshot::Snapshot;
use bon::Builder;
use chrono::{NaiveDateTime, TimeDelta};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use validator::Validate;

pub const DEFAULT_MAX_COUNT: usize = 14;
pub const DEFAULT_MAX_AGE_DAYS: u64 = 7;
const SECS_PER_DAY: u64 = 24 * 60 * 60;

pub fn days(days: u64) -> Duration {
    Duration::from_secs(days.saturating_mul(SECS_PER_DAY))
}

/// Thresholds deciding when a new backup is taken and when the oldest one goes.
#[derive(Clone, Debug, Validate, Serialize, Deserialize, Builder, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RetentionConfig {
    /// Number of snapshots kept on the remote, counting the one about to be created.
    #[validate(range(min = 1))]
    #[serde(default = "default_max_count")]
    #[builder(default = DEFAULT_MAX_COUNT)]
    pub max_count: usize,
    /// Age the most recent snapshot must exceed before a new backup is due.
    #[serde(with = "humantime_serde", default = "default_max_age")]
    #[builder(default = default_max_age())]
    pub max_age: Duration,
}

fn default_max_count() -> usize {
    DEFAULT_MAX_COUNT
}

fn default_max_age() -> Duration {
    days(DEFAULT_MAX_AGE_DAYS)
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl RetentionConfig {
    fn max_age_delta(&self) -> TimeDelta {
        TimeDelta::from_std(self.max_age).unwrap_or(TimeDelta::MAX)
    }

    /// A backup is due when there is none yet, or when the most recent one is strictly
    /// older than `max_age`.
    pub fn is_backup_due(&self, catalog: &Catalog, now: NaiveDateTime) -> bool {
        match catalog.most_recent() {
            Ok(latest) => now.signed_duration_since(latest.created_at) > self.max_age_delta(),
            Err(_) => true,
        }
    }

    /// Oldest snapshot once the catalog holds `max_count` or more entries.
    pub fn eviction_target<'a>(&self, catalog: &'a Catalog) -> Option<&'a Snapshot> {
        if catalog.count() >= self.max_count {
            catalog.oldest()
        } else {
            None
        }
    }
}
