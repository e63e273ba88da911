use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::Result;
use itertools::Itertools;
use std::ffi::OsStr;
use std::process::Command;

/// Runs `program` to completion and returns its stdout.
///
/// A non-zero exit becomes [`Error::Command`] carrying the captured stderr.
pub fn run_command<P, I, A>(program: P, args: I) -> Result<String>
where
    P: AsRef<OsStr>,
    I: IntoIterator<Item = A>,
    A: AsRef<OsStr>,
{
    let mut cmd = Command::new(program.as_ref());
    cmd.args(args);
    let command_line = std::iter::once(cmd.get_program())
        .chain(cmd.get_args())
        .map(OsStr::to_string_lossy)
        .join(" ");

    tracing::debug!("Execute: {command_line}");
    let output = cmd.output()?;
    if !output.status.success() {
        return Err(Error::Command {
            command: command_line,
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_run_command_captures_stdout() {
        let out = run_command("sh", ["-c", "echo hello"]).unwrap();
        assert_eq!(out, "hello\n");
    }

    #[test]
    fn test_run_command_failure_keeps_stderr() {
        match run_command("sh", ["-c", "echo broken >&2; exit 3"]) {
            Err(Error::Command {
                command, stderr, ..
            }) => {
                assert_eq!(command, "sh -c echo broken >&2; exit 3");
                assert_eq!(stderr, "broken\n");
            }
            other => panic!("Expected Command error, got {other:?}"),
        }
    }

    #[test]
    fn test_run_command_missing_program_is_io_error() {
        let res = run_command("definitely-not-a-real-program-4711", ["--version"]);
        assert!(matches!(res, Err(Error::Io(_))));
    }
}
