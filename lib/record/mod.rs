//! The record model: the sole first-class entity persisted by a node.
use std::collections::hash_map::DefaultHasher;
use std::fmt::Write as _;
use std::hash::{Hash, Hasher};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::processors::Processor;

/// A single text record, addressed by a client-chosen `uid`.
///
/// `check_sum` is a pure function of the *pre-processed* value; `size` is
/// computed last, once every other field (including `lang`, set by a
/// processor) is final.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Record {
    pub uid: String,
    pub value: String,
    pub timestamp: f64,
    pub check_sum: i64,
    pub size: u64,
    pub lang: String,
}

impl Record {
    /// Builds, processes and returns a new record from raw client input.
    ///
    /// `check_sum` is fixed up front (over `value` as supplied by the
    /// client) so that processors are free to mutate `value` or set other
    /// fields without affecting change detection.
    pub fn create(uid: String, value: String, processors: &[Box<dyn Processor>]) -> Record {
        let check_sum = sign(&value);
        Self::create_with_check_sum(uid, value, check_sum, processors)
    }

    /// As [`Record::create`], but with a pre-computed checksum. Used by
    /// `update`, where the checksum must be compared against the previous
    /// record's before the new record is built.
    pub fn create_with_check_sum(
        uid: String,
        value: String,
        check_sum: i64,
        processors: &[Box<dyn Processor>],
    ) -> Record {
        let mut record = Record {
            uid,
            value,
            timestamp: now(),
            check_sum,
            size: 0,
            lang: String::new(),
        };

        for processor in processors {
            processor.process(&mut record);
        }

        record.size = iterable_size(&record);

        record
    }
}

fn now() -> f64 {
    let now = Utc::now();
    now.timestamp() as f64 + f64::from(now.timestamp_subsec_nanos()) / 1_000_000_000.0
}

/// Deterministic, non-cryptographic sign of a value, used as `check_sum`.
///
/// `DefaultHasher` is seeded with fixed keys (unlike the `RandomState` used
/// by `HashMap`), so this is stable across processes and nodes -- which is
/// what makes byte-identical mirrored files a real invariant rather than a
/// coincidence of an unseeded hash.
#[must_use]
pub fn sign(value: &str) -> i64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish() as i64
}

/// Byte-length of the hex-encoded concatenation of every field-name and
/// field-value pair in the record, computed over the final field set
/// (`size` itself excluded).
fn iterable_size(record: &Record) -> u64 {
    let mut buf = String::new();
    buf.push_str("uid");
    buf.push_str(&record.uid);
    buf.push_str("value");
    buf.push_str(&record.value);
    buf.push_str("timestamp");
    let _ = write!(buf, "{}", record.timestamp);
    buf.push_str("check_sum");
    let _ = write!(buf, "{}", record.check_sum);
    buf.push_str("lang");
    buf.push_str(&record.lang);

    hex::encode(buf.as_bytes()).len() as u64
}
