//! A bounded, thread-safe `uid -> record` cache.
//!
//! All mutation runs through a single actor task reached over a bounded
//! channel -- the concrete form of "a bounded internal staging queue holds
//! records pending admission to serialize concurrent puts through a single
//! critical section." Eviction order is an explicit `VecDeque`
//! (first-inserted-first-evicted; updates to an existing key replace the
//! value but do not move it), replacing the map-iteration-order eviction of
//! the original implementation.
use std::collections::VecDeque;

use rustc_hash::FxHashMap;
use tokio::sync::{mpsc, oneshot};
use tracing::trace;

use crate::record::Record;

/// `size_limit` meaning unlimited cache memory.
pub const UNLIMITED: i64 = -1;
/// `size_limit` meaning the cache is disabled: all operations are no-ops.
pub const DISABLED: i64 = 0;

const QUEUE_CAPACITY: usize = 128;

enum Op {
    Put {
        record: Record,
        reply: oneshot::Sender<bool>,
    },
    Get {
        uid: String,
        reply: oneshot::Sender<Option<Record>>,
    },
    Forget {
        uid: String,
        reply: oneshot::Sender<bool>,
    },
}

struct Inner {
    order: VecDeque<String>,
    map: FxHashMap<String, Record>,
    total_size: u64,
    size_limit: i64,
}

impl Inner {
    fn new(size_limit: i64) -> Self {
        Inner {
            order: VecDeque::new(),
            map: FxHashMap::default(),
            total_size: 0,
            size_limit,
        }
    }

    fn enough_memory(&self, record_size: u64) -> bool {
        self.size_limit == UNLIMITED || record_size as i64 <= self.size_limit
    }

    fn is_duplicate(&self, record: &Record) -> bool {
        self.map
            .get(&record.uid)
            .is_some_and(|existing| existing.check_sum == record.check_sum)
    }

    fn put(&mut self, record: Record) -> bool {
        if !self.enough_memory(record.size) {
            return false;
        }

        if self.is_duplicate(&record) {
            return false;
        }

        let old_size = self.map.get(&record.uid).map_or(0, |r| r.size);
        let mut total_without_old = self.total_size - old_size;

        if self.size_limit != UNLIMITED {
            while record.size + total_without_old > self.size_limit as u64 {
                match self.order.pop_front() {
                    Some(oldest) if oldest == record.uid => {
                        // Its old size was already excluded above; evicting
                        // it wouldn't free anything, so there's nothing
                        // left to reclaim.
                        self.order.push_front(oldest);
                        break;
                    }
                    Some(oldest) => {
                        if let Some(removed) = self.map.remove(&oldest) {
                            total_without_old -= removed.size;
                        }
                    }
                    None => break,
                }
            }
        }

        let is_new = !self.map.contains_key(&record.uid);
        self.total_size = total_without_old + record.size;
        self.map.insert(record.uid.clone(), record.clone());
        if is_new {
            self.order.push_back(record.uid);
        }

        true
    }

    fn get(&self, uid: &str) -> Option<Record> {
        self.map.get(uid).cloned()
    }

    fn forget(&mut self, uid: &str) -> bool {
        match self.map.remove(uid) {
            Some(removed) => {
                self.total_size -= removed.size;
                self.order.retain(|existing| existing != uid);
                true
            }
            None => false,
        }
    }
}

/// Bounded in-memory cache, swappable behind the same `is_enabled`/`put`/
/// `get`/`forget` capability a [`crate::strategy::Spread`] depends on.
#[derive(Clone)]
pub struct MemoryCache {
    size_limit: i64,
    tx: Option<mpsc::Sender<Op>>,
}

impl MemoryCache {
    /// `size_limit` is a positive byte count, [`UNLIMITED`] (-1), or
    /// [`DISABLED`] (0).
    #[must_use]
    pub fn new(size_limit: i64) -> Self {
        if size_limit == DISABLED {
            return MemoryCache {
                size_limit,
                tx: None,
            };
        }

        let (tx, mut rx) = mpsc::channel::<Op>(QUEUE_CAPACITY);
        tokio::spawn(async move {
            let mut inner = Inner::new(size_limit);
            while let Some(op) = rx.recv().await {
                match op {
                    Op::Put { record, reply } => {
                        let admitted = inner.put(record);
                        trace!(admitted, "cache put");
                        let _ = reply.send(admitted);
                    }
                    Op::Get { uid, reply } => {
                        let _ = reply.send(inner.get(&uid));
                    }
                    Op::Forget { uid, reply } => {
                        let _ = reply.send(inner.forget(&uid));
                    }
                }
            }
        });

        MemoryCache {
            size_limit,
            tx: Some(tx),
        }
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.size_limit != DISABLED
    }

    /// Admits a record into the cache. Returns `false` (a no-op) if the
    /// cache is disabled, the record alone exceeds the size limit, or an
    /// entry for the same `uid` already exists with an equal `check_sum`.
    pub async fn put(&self, record: Record) -> bool {
        let Some(tx) = &self.tx else {
            return false;
        };

        let (reply_tx, reply_rx) = oneshot::channel();
        if tx
            .send(Op::Put {
                record,
                reply: reply_tx,
            })
            .await
            .is_err()
        {
            return false;
        }
        reply_rx.await.unwrap_or(false)
    }

    /// Returns the cached record for `uid`, or `None` if disabled or absent.
    pub async fn get(&self, uid: &str) -> Option<Record> {
        let tx = self.tx.as_ref()?;

        let (reply_tx, reply_rx) = oneshot::channel();
        if tx
            .send(Op::Get {
                uid: uid.to_string(),
                reply: reply_tx,
            })
            .await
            .is_err()
        {
            return None;
        }
        reply_rx.await.ok().flatten()
    }

    /// Evicts `uid` from the cache. Returns `true` if it was present,
    /// `false` if disabled or absent.
    pub async fn forget(&self, uid: &str) -> bool {
        let Some(tx) = &self.tx else {
            return false;
        };

        let (reply_tx, reply_rx) = oneshot::channel();
        if tx
            .send(Op::Forget {
                uid: uid.to_string(),
                reply: reply_tx,
            })
            .await
            .is_err()
        {
            return false;
        }
        reply_rx.await.unwrap_or(false)
    }
}
