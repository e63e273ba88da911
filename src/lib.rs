//! # rclone_backup
//!
//! Periodic snapshot backups of local paths to an rclone remote, with count and age based
//! retention.
//!
//! ## Features
//!
//! - **Snapshots**: one `bak_YYYY-MM-DD_HH-MM-SS` directory per run, marked complete at the end
//! - **Retention**: a new snapshot is taken only when the latest is older than the max age,
//!   the oldest one is deleted once the max count is reached
//! - **Compression**: optional tar archive per path, XZ (LZMA) compressed by default
//! - **Bounded Parallelism**: paths are archived and uploaded on a fixed-size thread pool
//! - **Remotes**: the `rclone` CLI, or a plain local directory
//!
//! ## Quick Start
//!
//! ```no_run
//! use rclone_backup::backup::orchestrator::Orchestrator;
//! use rclone_backup::backup::run_config::RunConfig;
//!
//! let config = RunConfig::from_yaml_file("backup.yml")?;
//! let report = Orchestrator::from_config(config).run(chrono::Local::now().naive_local());
//! std::process::exit(report.exit_code());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod backup;
