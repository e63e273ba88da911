use chrono::Local;
use clap::Parser;
use rclone_backup::backup::orchestrator::Orchestrator;
use rclone_backup::backup::remote::StoreKind;
use rclone_backup::backup::result_error::result::Result;
use rclone_backup::backup::retention::{
    days, RetentionConfig, DEFAULT_MAX_AGE_DAYS, DEFAULT_MAX_COUNT,
};
use rclone_backup::backup::run_config::{RunConfig, DEFAULT_CONCURRENCY};
use std::path::PathBuf;
use std::process::exit;
use tracing::{error, Level};

/// Back up local paths into dated snapshots on an rclone remote, keeping a bounded history
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Local path to back up, repeat for several paths
    #[arg(short, long = "path", required_unless_present = "config", conflicts_with = "config")]
    paths: Vec<PathBuf>,

    /// Remote base path holding the snapshots, e.g. `nas:backup`
    #[arg(short, long, required_unless_present = "config", conflicts_with = "config")]
    remote: Option<String>,

    /// Maximum number of snapshots kept on the remote
    #[arg(long, default_value_t = DEFAULT_MAX_COUNT, conflicts_with = "config")]
    max_backups: usize,

    /// Days after the latest snapshot before a new one is taken
    #[arg(long, default_value_t = DEFAULT_MAX_AGE_DAYS, conflicts_with = "config")]
    max_days: u64,

    /// Number of paths archived and uploaded at the same time
    #[arg(long, default_value_t = DEFAULT_CONCURRENCY, conflicts_with = "config")]
    concurrency: usize,

    /// Log what would be done without touching the remote
    #[arg(long)]
    dry_run: bool,

    /// Upload each path as a compressed tar archive
    #[arg(short = 'z', long, conflicts_with = "config")]
    zip: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Location of a YAML config file, replaces every backup flag except `--dry-run`
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Remote store implementation
    #[arg(long, value_enum, default_value_t = StoreKind::Rclone, conflicts_with = "config")]
    store: StoreKind,

    /// rclone executable
    #[arg(long, conflicts_with = "config")]
    rclone_bin: Option<PathBuf>,

    /// Directory for temporary archives
    #[arg(long, conflicts_with = "config")]
    tmp_dir: Option<PathBuf>,
}

impl Args {
    fn run_config(self) -> Result<RunConfig> {
        if let Some(config) = &self.config {
            return RunConfig::from_yaml_file(config).map(|c| c.with_dry_run(self.dry_run));
        }

        RunConfig::builder()
            .paths(self.paths)
            .remote(self.remote.unwrap_or_default())
            .store(self.store)
            .maybe_rclone_bin(self.rclone_bin)
            .retention(
                RetentionConfig::builder()
                    .max_count(self.max_backups)
                    .max_age(days(self.max_days))
                    .build(),
            )
            .concurrency(self.concurrency)
            .dry_run(self.dry_run)
            .compress(self.zip)
            .maybe_tmp_dir(self.tmp_dir)
            .build()
            .validated()
    }
}

fn main() {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_max_level(if args.debug { Level::DEBUG } else { Level::INFO })
        .init();

    let config = match args.run_config() {
        Ok(config) => config,
        Err(e) => {
            error!("{e}");
            exit(1);
        }
    };

    let report = Orchestrator::from_config(config).run(Local::now().naive_local());
    exit(report.exit_code());
}
