//! Pluggable pure transforms that enrich a [`crate::record::Record`] in
//! place before it is persisted. The model holds a fixed, ordered list of
//! these, built at construction time.
use rand::seq::SliceRandom;

use crate::record::Record;

/// Fixed tag set a [`DetectLangProcess`] picks from.
pub const LANGUAGES: [&str; 7] = ["en", "es", "ct", "fr", "jp", "it", "de"];

/// A single pure operation that mutates a record in place.
pub trait Processor: Send + Sync {
    fn process(&self, record: &mut Record);
}

/// Assigns `record.lang` by picking one tag uniformly at random from
/// [`LANGUAGES`]. Intentionally non-deterministic and not stable across
/// retries -- this is why `check_sum` is computed over the pre-processed
/// value instead.
pub struct DetectLangProcess;

impl Processor for DetectLangProcess {
    fn process(&self, record: &mut Record) {
        record.lang = (*LANGUAGES
            .choose(&mut rand::thread_rng())
            .expect("LANGUAGES is non-empty"))
        .to_string();
    }
}

/// Appends the literal suffix `" (Marked)."` to `record.value`.
pub struct MarkProcess;

impl Processor for MarkProcess {
    fn process(&self, record: &mut Record) {
        record.value.push_str(" (Marked).");
    }
}
