use crate::backup::remote::RemoteStore;
use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::{convert_error_vec, Result};
use crate::backup::result_error::WithMsg;
use crate::backup::snapshot::Snapshot;
use itertools::Itertools;
use tracing::{debug, warn};

/// Snapshots found on the remote for one run, sorted oldest first.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Catalog {
    snapshots: Vec<Snapshot>,
}

impl Catalog {
    /// Lists `base` on the remote and parses every entry.
    ///
    /// A single malformed entry fails the whole load.
    pub fn load<S: RemoteStore + ?Sized>(store: &S, base: &str) -> Result<Self> {
        let names = store.list_snapshots(base)?;
        if names.is_empty() {
            warn!("No previous backups found in {base:?}");
        } else {
            debug!("Found {} backups in {base:?}", names.len());
        }

        Self::from_names(names).with_msg(format!("Loading snapshot catalog of {base:?} failed"))
    }

    /// Every malformed name is reported, not only the first one.
    pub fn from_names<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let (snapshots, errors): (Vec<_>, Vec<_>) = names
            .into_iter()
            .map(|name| Snapshot::parse(name.as_ref().trim_end_matches('/')))
            .partition_result();
        convert_error_vec(errors)?;

        Ok(Self {
            snapshots: snapshots.into_iter().sorted().dedup().collect(),
        })
    }

    pub fn most_recent(&self) -> Result<&Snapshot> {
        self.snapshots.last().ok_or(Error::EmptyCatalog)
    }

    pub fn oldest(&self) -> Option<&Snapshot> {
        self.snapshots.first()
    }

    pub fn count(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Snapshot> {
        self.snapshots.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::remote::testing::FakeStore;

    #[test]
    fn test_from_names_sorts_ascending() {
        let catalog = Catalog::from_names([
            "bak_2024-03-01_00-00-00/",
            "bak_2023-12-31_23-59-59/",
            "bak_2024-01-15_12-00-00/",
        ])
        .unwrap();

        let names: Vec<_> = catalog.iter().map(Snapshot::name).collect();
        assert_eq!(
            names,
            vec![
                "bak_2023-12-31_23-59-59",
                "bak_2024-01-15_12-00-00",
                "bak_2024-03-01_00-00-00",
            ]
        );
        assert_eq!(catalog.count(), 3);
        assert_eq!(catalog.oldest().unwrap().name(), "bak_2023-12-31_23-59-59");
        assert_eq!(catalog.most_recent().unwrap().name(), "bak_2024-03-01_00-00-00");
    }

    #[test]
    fn test_most_recent_is_lexically_last() {
        let names = [
            "bak_2024-10-01_00-00-00",
            "bak_2024-09-30_23-59-59",
            "bak_2025-01-01_00-00-00",
            "bak_2024-10-01_00-00-01",
        ];
        let catalog = Catalog::from_names(names).unwrap();
        let lexically_last = names.iter().max().unwrap();
        let chronologically_last = catalog.iter().map(|s| s.created_at).max().unwrap();

        assert_eq!(catalog.most_recent().unwrap().name(), *lexically_last);
        assert_eq!(catalog.most_recent().unwrap().created_at, chronologically_last);
    }

    #[test]
    fn test_empty_catalog() {
        let catalog = Catalog::from_names(Vec::<String>::new()).unwrap();
        assert_eq!(catalog.count(), 0);
        assert!(catalog.is_empty());
        assert!(catalog.oldest().is_none());
        assert!(matches!(catalog.most_recent(), Err(Error::EmptyCatalog)));
    }

    #[test]
    fn test_malformed_entry_fails_whole_load() {
        let err = Catalog::from_names(["bak_2024-01-01_00-00-00", "lost+found"]).unwrap_err();
        let errors: Vec<_> = err.into_iter().collect();
        assert_eq!(errors.len(), 1);
        assert!(matches!(&errors[0], Error::MalformedSnapshotName { name, .. } if name == "lost+found"));
    }

    #[test]
    fn test_every_malformed_entry_is_reported() {
        let err = Catalog::from_names(["bak_2024-1-1_0-0-0", "bak_2024-01-01_00-00-00", "tmp/"])
            .unwrap_err();
        assert!(err.is_fatal());
        let names = err
            .into_iter()
            .map(|e| match e {
                Error::MalformedSnapshotName { name, .. } => name,
                other => panic!("Expected MalformedSnapshotName, got {other:?}"),
            })
            .collect_vec();
        assert_eq!(names, vec!["bak_2024-1-1_0-0-0", "tmp"]);
    }

    #[test]
    fn test_load_from_store() {
        let store = FakeStore::with_snapshots(["bak_2024-01-02_00-00-00", "bak_2024-01-01_00-00-00"]);
        let catalog = Catalog::load(&store, "nas:backup").unwrap();
        assert_eq!(catalog.count(), 2);
        assert_eq!(catalog.oldest().unwrap().name(), "bak_2024-01-01_00-00-00");
    }

    #[test]
    fn test_load_propagates_remote_unavailable() {
        let store = FakeStore::default();
        store.fail_list();
        let err = Catalog::load(&store, "nas:backup").unwrap_err();
        assert!(matches!(err, Error::RemoteUnavailable { .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_load_malformed_is_fatal() {
        let store = FakeStore::with_snapshots(["bak_2024-01-01_00-00-00", "notes"]);
        let err = Catalog::load(&store, "nas:backup").unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("notes"));
    }
}
