//! Instrumented in-memory [`RemoteStore`] for tests.

use crate::backup::remote::RemoteStore;
use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::Result;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Call {
    Check(String),
    List(String),
    Delete(String, String),
    Upload(PathBuf, String),
    MarkComplete(String),
}

#[derive(Debug, Default)]
pub struct FakeStore {
    snapshots: Mutex<Vec<String>>,
    calls: Mutex<Vec<Call>>,
    /// Content of every uploaded regular file, keyed by remote path.
    uploaded_files: Mutex<HashMap<String, Vec<u8>>>,
    fail_check: AtomicBool,
    fail_list: AtomicBool,
    fail_delete: AtomicBool,
    fail_mark: AtomicBool,
    fail_upload_of: Mutex<HashSet<PathBuf>>,
    upload_delay: Mutex<Duration>,
    in_flight: AtomicUsize,
    high_water_mark: AtomicUsize,
}

fn fake_error(op: &str) -> Error {
    std::io::Error::other(format!("injected {op} failure")).into()
}

impl FakeStore {
    pub fn with_snapshots<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let store = Self::default();
        *store.snapshots.lock().unwrap() = names.into_iter().map(Into::into).collect();
        store
    }

    pub fn fail_check(&self) {
        self.fail_check.store(true, Ordering::SeqCst);
    }

    pub fn fail_list(&self) {
        self.fail_list.store(true, Ordering::SeqCst);
    }

    pub fn fail_delete(&self) {
        self.fail_delete.store(true, Ordering::SeqCst);
    }

    pub fn fail_mark(&self) {
        self.fail_mark.store(true, Ordering::SeqCst);
    }

    pub fn fail_upload_of<P: Into<PathBuf>>(&self, local: P) {
        self.fail_upload_of.lock().unwrap().insert(local.into());
    }

    pub fn set_upload_delay(&self, delay: Duration) {
        *self.upload_delay.lock().unwrap() = delay;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn uploads(&self) -> Vec<(PathBuf, String)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Upload(local, remote) => Some((local, remote)),
                _ => None,
            })
            .collect()
    }

    pub fn uploaded_file(&self, remote: &str) -> Option<Vec<u8>> {
        self.uploaded_files.lock().unwrap().get(remote).cloned()
    }

    pub fn snapshots(&self) -> Vec<String> {
        self.snapshots.lock().unwrap().clone()
    }

    pub fn high_water_mark(&self) -> usize {
        self.high_water_mark.load(Ordering::SeqCst)
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

impl RemoteStore for FakeStore {
    fn check(&self, base: &str) -> Result<()> {
        self.record(Call::Check(base.to_string()));
        if self.fail_check.load(Ordering::SeqCst) {
            return Err(Error::remote_unavailable(base, fake_error("check")));
        }
        Ok(())
    }

    fn list_snapshots(&self, base: &str) -> Result<Vec<String>> {
        self.record(Call::List(base.to_string()));
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(Error::remote_unavailable(base, fake_error("list")));
        }
        Ok(self
            .snapshots()
            .into_iter()
            .map(|name| format!("{name}/"))
            .collect())
    }

    fn delete(&self, base: &str, name: &str) -> Result<()> {
        self.record(Call::Delete(base.to_string(), name.to_string()));
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(Error::delete_failed(name, fake_error("delete")));
        }
        self.snapshots.lock().unwrap().retain(|n| n != name);
        Ok(())
    }

    fn upload(&self, local: &Path, remote: &str) -> Result<()> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.high_water_mark.fetch_max(now, Ordering::SeqCst);
        self.record(Call::Upload(local.to_path_buf(), remote.to_string()));

        let delay = *self.upload_delay.lock().unwrap();
        std::thread::sleep(delay);

        let res = if self.fail_upload_of.lock().unwrap().contains(local) {
            Err(Error::upload_failed(local, remote, fake_error("upload")))
        } else if local.is_file() {
            std::fs::read(local)
                .map(|content| {
                    self.uploaded_files
                        .lock()
                        .unwrap()
                        .insert(remote.to_string(), content);
                })
                .map_err(|e| Error::upload_failed(local, remote, e.into()))
        } else {
            Ok(())
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        res
    }

    fn mark_complete(&self, remote: &str) -> Result<()> {
        self.record(Call::MarkComplete(remote.to_string()));
        if self.fail_mark.load(Ordering::SeqCst) {
            return Err(Error::mark_failed(remote, fake_error("mark")));
        }
        if let Some(name) = remote.rsplit(['/', ':']).next() {
            self.snapshots.lock().unwrap().push(name.to_string());
        }
        Ok(())
    }
}
