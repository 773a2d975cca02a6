//! Persists one record per file under a base directory.
use std::path::{Path, PathBuf};

use tracing::instrument;

use crate::error::Error;
use crate::record::Record;

/// File-backed engine for the record store.
///
/// Filename convention: `uid` joined to the base path with a single `/`.
/// Existence/insert/update preconditions are enforced one layer up, by the
/// model (see [`crate::model::TextModel`]); this layer only reads, writes,
/// and removes files.
#[derive(Clone, Debug)]
pub struct FileStorage {
    base_path: PathBuf,
}

impl FileStorage {
    #[must_use]
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        FileStorage {
            base_path: base_path.into(),
        }
    }

    fn path_for(&self, uid: &str) -> PathBuf {
        self.base_path.join(uid)
    }

    /// True iff a regular entry exists at `<base>/<uid>`. A failed stat (the
    /// file genuinely doesn't exist, or isn't readable) is treated as
    /// "does not exist" rather than an error.
    #[must_use]
    pub fn exists(&self, uid: &str) -> bool {
        self.path_for(uid).is_file()
    }

    /// Reads the file whole and parses it as a record.
    #[instrument(level = "trace", skip(self), err)]
    pub fn select(&self, uid: &str) -> Result<Record, Error> {
        let content = std::fs::read_to_string(self.path_for(uid))?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Writes (create-or-truncate) `<base>/<record.uid>`.
    #[instrument(level = "trace", skip(self, record), fields(uid = %record.uid), err)]
    pub fn insert(&self, record: &Record) -> Result<(), Error> {
        self.write(record)
    }

    /// Identical to [`FileStorage::insert`] at this layer; the model
    /// distinguishes insert from update via its own exists/no-exists
    /// preconditions.
    #[instrument(level = "trace", skip(self, record), fields(uid = %record.uid), err)]
    pub fn update(&self, record: &Record) -> Result<(), Error> {
        self.write(record)
    }

    fn write(&self, record: &Record) -> Result<(), Error> {
        let content = serde_json::to_string(record)?;
        std::fs::write(self.path_for(&record.uid), content)?;
        Ok(())
    }

    /// Removes the file. Absence surfaces as an I/O error.
    #[instrument(level = "trace", skip(self), err)]
    pub fn delete(&self, uid: &str) -> Result<(), Error> {
        std::fs::remove_file(self.path_for(uid))?;
        Ok(())
    }

    #[must_use]
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn record(uid: &str) -> Record {
        Record {
            uid: uid.into(),
            value: "hi".into(),
            timestamp: 1.0,
            check_sum: 42,
            size: 4,
            lang: "en".into(),
        }
    }

    #[test]
    fn insert_then_select_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path());

        assert!(!storage.exists("a"));

        storage.insert(&record("a")).unwrap();

        assert!(storage.exists("a"));
        assert_eq!(storage.select("a").unwrap(), record("a"));
    }

    #[test]
    fn delete_removes_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path());

        storage.insert(&record("a")).unwrap();
        storage.delete("a").unwrap();

        assert!(!storage.exists("a"));
        assert!(storage.select("a").is_err());
    }

    #[test]
    fn select_of_missing_uid_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path());

        assert!(storage.select("nope").is_err());
    }
}
