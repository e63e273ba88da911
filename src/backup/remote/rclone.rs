use crate::backup::command::run_command;
use crate::backup::remote::{join_remote, RemoteStore, COMPLETION_MARKER};
use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::Result;
use bon::Builder;
use getset::Getters;
use itertools::Itertools;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::debug;

fn default_copy_args() -> Vec<String> {
    ["--transfers=1", "--checkers=4", "--fast-list"]
        .map(String::from)
        .to_vec()
}

/// [`RemoteStore`] backed by the `rclone` command line tool.
#[derive(Clone, Debug, Builder, Getters)]
#[getset(get = "pub")]
pub struct RcloneStore {
    #[builder(default = PathBuf::from("rclone"), into)]
    binary: PathBuf,
    /// Extra flags passed to `rclone copy`.
    #[builder(default = default_copy_args())]
    copy_args: Vec<String>,
}

impl Default for RcloneStore {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl RcloneStore {
    fn rclone<I, A>(&self, args: I) -> Result<String>
    where
        I: IntoIterator<Item = A>,
        A: Into<OsString>,
    {
        run_command(&self.binary, args.into_iter().map(Into::into).collect_vec())
    }
}

impl RemoteStore for RcloneStore {
    fn check(&self, base: &str) -> Result<()> {
        self.rclone(["version"])
            .map_err(|e| Error::remote_unavailable(base, e))?;
        debug!("rclone found at {:?}", self.binary);

        self.rclone(["lsd", base])
            .map_err(|e| Error::remote_unavailable(base, e))?;
        debug!("Remote access ok: {base}");
        Ok(())
    }

    fn list_snapshots(&self, base: &str) -> Result<Vec<String>> {
        let out = self
            .rclone(["lsf", base, "--dirs-only"])
            .map_err(|e| Error::remote_unavailable(base, e))?;

        Ok(parse_lsf_output(&out))
    }

    fn delete(&self, base: &str, name: &str) -> Result<()> {
        let remote = join_remote(base, name);
        self.rclone(["purge", remote.as_str()])
            .map(|_| ())
            .map_err(|e| Error::delete_failed(remote, e))
    }

    fn upload(&self, local: &Path, remote: &str) -> Result<()> {
        let args = [
            OsString::from("copy"),
            local.as_os_str().to_owned(),
            OsString::from(remote),
        ]
        .into_iter()
        .chain(self.copy_args.iter().map(OsString::from));

        self.rclone(args)
            .map(|_| ())
            .map_err(|e| Error::upload_failed(local, remote, e))
    }

    fn mark_complete(&self, remote: &str) -> Result<()> {
        self.rclone(["touch", join_remote(remote, COMPLETION_MARKER).as_str()])
            .map(|_| ())
            .map_err(|e| Error::mark_failed(remote, e))
    }
}

/// Directory names from `rclone lsf --dirs-only`, one per line with a trailing `/`.
fn parse_lsf_output(out: &str) -> Vec<String> {
    out.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| line.trim_end_matches('/').to_string())
        .collect()
}
