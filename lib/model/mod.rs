//! The record model: builds, validates and checksums records, wrapping
//! storage with exists/no-exists preconditions.
use tracing::instrument;

use crate::error::Error;
use crate::processors::Processor;
use crate::record::{self, Record};
use crate::storage::FileStorage;

/// Text record model, keyed by `uid`.
pub struct TextModel {
    storage: FileStorage,
    processors: Vec<Box<dyn Processor>>,
}

impl TextModel {
    #[must_use]
    pub fn new(storage: FileStorage, processors: Vec<Box<dyn Processor>>) -> Self {
        TextModel {
            storage,
            processors,
        }
    }

    fn valid_exists(&self, uid: &str) -> Result<(), Error> {
        if self.storage.exists(uid) {
            Ok(())
        } else {
            Err(Error::RecordMissing)
        }
    }

    fn valid_no_exists(&self, uid: &str) -> Result<(), Error> {
        if self.storage.exists(uid) {
            Err(Error::RecordExists)
        } else {
            Ok(())
        }
    }

    /// Returns the stored record unchanged. Fails with [`Error::RecordMissing`]
    /// if `uid` doesn't exist.
    #[instrument(level = "debug", skip(self), err)]
    pub fn get(&self, uid: &str) -> Result<Record, Error> {
        self.valid_exists(uid)?;
        self.storage.select(uid)
    }

    /// Builds a new record via [`Record::create`] and persists it. Fails
    /// with [`Error::RecordExists`] if `uid` is already present.
    #[instrument(level = "debug", skip(self, value), err)]
    pub fn insert(&self, uid: &str, value: String) -> Result<Record, Error> {
        self.valid_no_exists(uid)?;

        let record = Record::create(uid.to_string(), value, &self.processors);
        self.storage.insert(&record)?;

        Ok(record)
    }

    /// Full replacement of an existing record. Fails with
    /// [`Error::RecordMissing`] if `uid` is absent, or with
    /// [`Error::RecordExists`] ("no change") if the new checksum equals the
    /// stored one.
    #[instrument(level = "debug", skip(self, value), err)]
    pub fn update(&self, uid: &str, value: String) -> Result<Record, Error> {
        self.valid_exists(uid)?;

        let last_check_sum = self.storage.select(uid)?.check_sum;
        let new_check_sum = record::sign(&value);

        if last_check_sum == new_check_sum {
            return Err(Error::RecordExists);
        }

        let record =
            Record::create_with_check_sum(uid.to_string(), value, new_check_sum, &self.processors);
        self.storage.update(&record)?;

        Ok(record)
    }

    /// Deletes a record. Fails with [`Error::RecordMissing`] if absent.
    #[instrument(level = "debug", skip(self), err)]
    pub fn delete(&self, uid: &str) -> Result<(), Error> {
        self.valid_exists(uid)?;
        self.storage.delete(uid)
    }

    /// Unconditionally writes the fully-formed record as received, bypassing
    /// processors and checksum rules. Used on the receiving side of a
    /// fan-out so a mirror stores a byte-identical copy of the origin
    /// record.
    #[instrument(level = "debug", skip(self, record), fields(uid = %record.uid), err)]
    pub fn copy(&self, record: Record) -> Result<Record, Error> {
        self.storage.update(&record)?;
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::processors::{DetectLangProcess, MarkProcess};

    fn model() -> (TextModel, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path());
        let processors: Vec<Box<dyn Processor>> =
            vec![Box::new(DetectLangProcess), Box::new(MarkProcess)];
        (TextModel::new(storage, processors), dir)
    }

    #[test]
    fn insert_then_get_round_trips() {
        let (model, _dir) = model();

        let inserted = model.insert("a", "hello".into()).unwrap();
        let fetched = model.get("a").unwrap();

        assert_eq!(inserted, fetched);
        assert_eq!(fetched.value, "hello (Marked).");
    }

    #[test]
    fn insert_of_existing_uid_is_refused() {
        let (model, _dir) = model();

        model.insert("a", "hello".into()).unwrap();

        assert!(matches!(
            model.insert("a", "again".into()),
            Err(Error::RecordExists)
        ));
    }

    #[test]
    fn get_of_missing_uid_is_refused() {
        let (model, _dir) = model();
        assert!(matches!(model.get("nope"), Err(Error::RecordMissing)));
    }

    #[test]
    fn update_with_same_value_is_refused_as_no_change() {
        let (model, _dir) = model();

        model.insert("a", "hello".into()).unwrap();

        assert!(matches!(
            model.update("a", "hello".into()),
            Err(Error::RecordExists)
        ));
    }

    #[test]
    fn update_with_new_value_replaces_the_record() {
        let (model, _dir) = model();

        model.insert("a", "hello".into()).unwrap();
        let updated = model.update("a", "goodbye".into()).unwrap();

        assert_eq!(updated.value, "goodbye (Marked).");
        assert_eq!(model.get("a").unwrap(), updated);
    }

    #[test]
    fn delete_of_missing_uid_is_refused() {
        let (model, _dir) = model();
        assert!(matches!(model.delete("nope"), Err(Error::RecordMissing)));
    }

    #[test]
    fn copy_bypasses_processors_and_checksum_rules() {
        let (model, _dir) = model();

        let record = Record {
            uid: "a".into(),
            value: "raw".into(),
            timestamp: 0.0,
            check_sum: 1,
            size: 1,
            lang: "en".into(),
        };

        let copied = model.copy(record.clone()).unwrap();

        assert_eq!(copied, record);
        assert_eq!(model.get("a").unwrap(), record);
    }
}
