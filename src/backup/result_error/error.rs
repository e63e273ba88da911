use crate::backup::result_error::{WithDebugObjectAndFnName, WithMsg};
use itertools::Itertools;
use std::fmt::Debug;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    LiblzmaStream(#[from] liblzma::stream::Error),
    #[error(transparent)]
    ValidationError(#[from] validator::ValidationErrors),
    #[error(transparent)]
    ThreadPoolBuildError(#[from] rayon::ThreadPoolBuildError),
    #[error(transparent)]
    SerdeYml(#[from] serde_yml::Error),
    #[error(transparent)]
    WalkDir(#[from] walkdir::Error),
    #[error("`{command}` exited with {status}:\n{}", indent::indent_all_with("  ", stderr.trim_end().to_string()))]
    Command {
        command: String,
        status: String,
        stderr: String,
    },
    #[error("Remote {remote:?} is unavailable:\n{}", indent::indent_all_with("  ", error.to_string()))]
    RemoteUnavailable { remote: String, error: Box<Error> },
    #[error("Malformed snapshot name {name:?}: {reason}")]
    MalformedSnapshotName { name: String, reason: String },
    #[error("Snapshot catalog is empty")]
    EmptyCatalog,
    #[error("Archiving {src:?} failed:\n{}", indent::indent_all_with("  ", error.to_string()))]
    ArchiveFailed { src: PathBuf, error: Box<Error> },
    #[error("Uploading {local:?} to {remote:?} failed:\n{}", indent::indent_all_with("  ", error.to_string()))]
    RemoteUploadFailed {
        local: PathBuf,
        remote: String,
        error: Box<Error>,
    },
    #[error("Deleting remote snapshot {remote:?} failed:\n{}", indent::indent_all_with("  ", error.to_string()))]
    RemoteDeleteFailed { remote: String, error: Box<Error> },
    #[error("Marking {remote:?} complete failed:\n{}", indent::indent_all_with("  ", error.to_string()))]
    RemoteMarkFailed { remote: String, error: Box<Error> },
    #[error("{}:\n{}", msg, indent::indent_all_with("  ", error.to_string()))]
    WithMsg { msg: String, error: Box<Error> },
    #[error("{:?} {} failed:\n{}", obj_debug, fn_name, indent::indent_all_with("  ", error.to_string()))]
    WithDebugObjAndFnName {
        error: Box<Error>,
        obj_debug: Box<dyn Debug + Send + Sync>,
        fn_name: String,
    },
    #[error("{}", itertools::join(.0, "\n\n"))]
    LotsOfError(Vec<Error>),
}

impl<S: Into<String>, O: Debug + Send + Sync + 'static> WithDebugObjectAndFnName<S, O> for Error {
    fn with_debug_object_and_fn_name(self, obj: O, fn_name: S) -> Self {
        Error::WithDebugObjAndFnName {
            error: Box::new(self),
            obj_debug: Box::new(obj),
            fn_name: fn_name.into(),
        }
    }
}

impl<S: Into<String>> WithMsg<S> for Error {
    fn with_msg(self, msg: S) -> Self {
        Self::WithMsg {
            msg: msg.into(),
            error: Box::new(self),
        }
    }
}

impl From<Vec<Error>> for Error {
    fn from(errors: Vec<Error>) -> Self {
        Self::LotsOfError(errors.into_iter().flat_map(Error::into_iter).collect_vec())
    }
}

impl Error {
    pub fn into_iter(self) -> Box<dyn Iterator<Item = Error>> {
        match self {
            Error::LotsOfError(v) => Box::new(v.into_iter().flat_map(Error::into_iter)),
            e => Box::new(std::iter::once(e)),
        }
    }

    pub fn chain(self, other: Error) -> Error {
        Error::LotsOfError(self.into_iter().chain(other.into_iter()).collect_vec())
    }

    pub fn remote_unavailable<S: Into<String>>(remote: S, error: Error) -> Self {
        Self::RemoteUnavailable {
            remote: remote.into(),
            error: Box::new(error),
        }
    }

    pub fn archive_failed<P: Into<PathBuf>>(src: P, error: Error) -> Self {
        Self::ArchiveFailed {
            src: src.into(),
            error: Box::new(error),
        }
    }

    pub fn upload_failed<P: Into<PathBuf>, S: Into<String>>(local: P, remote: S, error: Error) -> Self {
        Self::RemoteUploadFailed {
            local: local.into(),
            remote: remote.into(),
            error: Box::new(error),
        }
    }

    pub fn delete_failed<S: Into<String>>(remote: S, error: Error) -> Self {
        Self::RemoteDeleteFailed {
            remote: remote.into(),
            error: Box::new(error),
        }
    }

    pub fn mark_failed<S: Into<String>>(remote: S, error: Error) -> Self {
        Self::RemoteMarkFailed {
            remote: remote.into(),
            error: Box::new(error),
        }
    }

    /// Errors that stop a run before any backup work starts.
    pub fn is_fatal(&self) -> bool {
        match self {
            Error::RemoteUnavailable { .. }
            | Error::MalformedSnapshotName { .. }
            | Error::ValidationError(_)
            | Error::ThreadPoolBuildError(_) => true,
            Error::WithMsg { error, .. } | Error::WithDebugObjAndFnName { error, .. } => {
                error.is_fatal()
            }
            Error::LotsOfError(v) => v.iter().any(Error::is_fatal),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn io_error(msg: &str) -> Error {
        Error::from(std::io::Error::new(std::io::ErrorKind::NotFound, msg.to_string()))
    }

    #[test]
    fn test_error_from_io_error() {
        match io_error("file not found") {
            Error::Io(_) => (),
            _ => panic!("Expected Io error"),
        }
    }

    #[test]
    fn test_error_with_msg() {
        match io_error("file not found").with_msg("Custom message") {
            Error::WithMsg { msg, .. } => assert_eq!(msg, "Custom message"),
            _ => panic!("Expected WithMsg error"),
        }
    }

    #[test]
    fn test_error_with_debug_object_and_fn_name_display() {
        let error = io_error("file not found").with_debug_object_and_fn_name(42, "test_function");
        let error_str = error.to_string();

        assert!(error_str.contains("test_function"));
        assert!(error_str.contains("failed"));
        assert!(error_str.contains("file not found"));
    }

    #[test]
    fn test_error_from_vec_flattens() {
        let nested = io_error("a").chain(io_error("b"));
        let combined = Error::from(vec![nested, io_error("c")]);
        match combined {
            Error::LotsOfError(v) => assert_eq!(v.len(), 3),
            _ => panic!("Expected LotsOfError"),
        }
    }

    #[test]
    fn test_error_into_iter_single() {
        let mut iter = io_error("test").into_iter();
        assert!(iter.next().is_some());
        assert!(iter.next().is_none());
    }

    #[test]
    fn test_remote_error_display_is_indented() {
        let error = Error::upload_failed(
            "/srv/data",
            "nas:backup/bak_2024-01-01_00-00-00/srv_data",
            Error::Command {
                command: "rclone copy".to_string(),
                status: "exit status: 1".to_string(),
                stderr: "connection refused\n".to_string(),
            },
        );
        let error_str = error.to_string();

        assert!(error_str.starts_with("Uploading \"/srv/data\""));
        assert!(error_str.contains("`rclone copy` exited with exit status: 1"));
        assert!(error_str.contains("    connection refused"));
    }

    #[test]
    fn test_is_fatal() {
        assert!(Error::remote_unavailable("nas:", io_error("x")).is_fatal());
        assert!(Error::MalformedSnapshotName {
            name: "x".to_string(),
            reason: "y".to_string()
        }
        .is_fatal());
        assert!(Error::remote_unavailable("nas:", io_error("x"))
            .with_msg("Loading catalog")
            .is_fatal());
        assert!(!Error::delete_failed("nas:bak", io_error("x")).is_fatal());
        assert!(!Error::archive_failed("/srv", io_error("x")).is_fatal());
    }
}
