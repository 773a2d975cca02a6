//! Orchestrates fan-out (`spread_*`) replication and cache-backed
//! read-through (`bounce_*`) proxying -- the replication/consistency engine
//! at the core of this crate.
use std::sync::Arc;

use tracing::{error, info, instrument};

use crate::cache::MemoryCache;
use crate::error::Error;
use crate::peer::PeerClient;
use crate::record::Record;
use crate::registry::Registry;

/// Bound on concurrent in-flight fan-out calls, so an unresponsive or large
/// peer set can't exhaust runtime resources (REDESIGN FLAGS: the original
/// spawned an unbounded OS thread per peer per write).
const MAX_IN_FLIGHT_FANOUT: usize = 16;

/// Replication strategy: fire-and-forget fan-out to all peers after a local
/// mutation, or sequential cache-backed proxying when this node owns no
/// authoritative copy of the key.
#[derive(Clone)]
pub struct Spread {
    registry: Arc<Registry>,
    route: String,
    client: PeerClient,
    cache: Option<MemoryCache>,
    semaphore: Arc<tokio::sync::Semaphore>,
}

impl Spread {
    #[must_use]
    pub fn new(registry: Registry, route: impl Into<String>) -> Self {
        Spread {
            registry: Arc::new(registry),
            route: route.into(),
            client: PeerClient::new(),
            cache: None,
            semaphore: Arc::new(tokio::sync::Semaphore::new(MAX_IN_FLIGHT_FANOUT)),
        }
    }

    /// Attaches a cache tier. Validates that if the cache is enabled, at
    /// least one peer is configured -- otherwise there is nothing for
    /// `bounce_*` to proxy to, which is a fatal configuration error.
    pub fn with_cache(mut self, cache: MemoryCache) -> Result<Self, Error> {
        if cache.is_enabled() && self.registry.is_empty() {
            return Err(Error::ServerMissing);
        }

        self.cache = Some(cache);
        Ok(self)
    }

    #[must_use]
    pub fn cache(&self) -> Option<&MemoryCache> {
        self.cache.as_ref()
    }

    fn query_for_fanout(&self) -> Vec<(&'static str, &'static str)> {
        let mut query = vec![("mirror", "1")];
        if self.registry.is_bridge() {
            query.push(("bridge", "1"));
        }
        query
    }

    /// Launches one fire-and-forget worker per peer, PUTting the record.
    /// Workers do not block the caller and their outcome is not reported
    /// back; ordering across peers is unspecified.
    #[instrument(level = "info", skip(self, record), fields(uid = %record.uid))]
    pub fn spread_put(&self, record: Record) {
        let query = self.query_for_fanout();
        let body = serde_json::to_string(&record).unwrap_or_default();

        for peer in self.registry.peers().to_vec() {
            let client = self.client.clone();
            let route = self.route.clone();
            let uid = record.uid.clone();
            let query = query.clone();
            let semaphore = self.semaphore.clone();
            let body = body.clone();

            tokio::spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return;
                };

                let form = [("value", body.as_str())];

                match client.put(&peer, &[route.as_str(), uid.as_str()], &query, &form) {
                    Ok(response) if response.is_success() => {
                        info!(peer, uid, "spread_put delivered");
                    }
                    Ok(response) => {
                        error!(peer, uid, status = response.status, "spread_put rejected");
                    }
                    Err(err) => {
                        error!(peer, uid, %err, "spread_put failed");
                    }
                }
            });
        }
    }

    /// Symmetric to [`Spread::spread_put`], for deletes.
    #[instrument(level = "info", skip(self))]
    pub fn spread_delete(&self, uid: String) {
        let query = self.query_for_fanout();

        for peer in self.registry.peers().to_vec() {
            let client = self.client.clone();
            let route = self.route.clone();
            let uid = uid.clone();
            let query = query.clone();
            let semaphore = self.semaphore.clone();

            tokio::spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return;
                };

                match client.delete(&peer, &[route.as_str(), uid.as_str()], &query) {
                    Ok(response) if response.is_success() => {
                        info!(peer, uid, "spread_delete delivered");
                    }
                    Ok(response) => {
                        error!(peer, uid, status = response.status, "spread_delete rejected");
                    }
                    Err(err) => {
                        error!(peer, uid, %err, "spread_delete failed");
                    }
                }
            });
        }
    }

    /// Walks peers in declaration order; returns the first whose response
    /// is 200 and whose body parses as a record. Does not populate the
    /// cache -- that's driven by the put/post/delete bounce paths.
    #[instrument(level = "debug", skip(self))]
    pub fn bounce_get(&self, uid: &str) -> Result<Record, Error> {
        for peer in self.registry.peers() {
            let Ok(response) = self.client.get(peer, &[self.route.as_str(), uid], &[]) else {
                continue;
            };

            if response.status == 200 {
                if let Ok(record) = serde_json::from_str::<Record>(&response.body) {
                    return Ok(record);
                }
            }
        }

        Err(Error::RecordMissing)
    }

    async fn bounce_write<F>(&self, uid: &str, form: &[(&str, &str)], call: F) -> Option<Record>
    where
        F: Fn(&PeerClient, &str, &[&str], &[(&str, &str)]) -> Result<crate::peer::PeerResponse, Error>,
    {
        let mut valid_response = false;
        let mut last_record = None;

        for peer in self.registry.peers() {
            let to_cache = valid_response;

            let Ok(response) = call(&self.client, peer, &[self.route.as_str(), uid], form) else {
                continue;
            };

            if !response.is_success() {
                continue;
            }

            let Ok(record) = serde_json::from_str::<Record>(&response.body) else {
                continue;
            };

            if to_cache {
                if let Some(cache) = &self.cache {
                    cache.put(record.clone()).await;
                }
            }

            last_record = Some(record);
            valid_response = true;
        }

        last_record
    }

    /// Calls every peer sequentially with PUT; only admits a response into
    /// the cache once a *prior* peer has already answered successfully.
    /// Returns the last successful record, or `None` if none succeeded.
    #[instrument(level = "debug", skip(self, value))]
    pub async fn bounce_put(&self, uid: &str, value: &str) -> Option<Record> {
        let form = [("value", value)];
        self.bounce_write(uid, &form, |client, peer, segments, form| {
            client.put(peer, segments, &[], form)
        })
        .await
    }

    /// As [`Spread::bounce_put`], issuing POST instead.
    #[instrument(level = "debug", skip(self, value))]
    pub async fn bounce_post(&self, uid: &str, value: &str) -> Option<Record> {
        let form = [("value", value)];
        self.bounce_write(uid, &form, |client, peer, segments, form| {
            client.post(peer, segments, &[], form)
        })
        .await
    }

    /// Calls every peer sequentially with DELETE. If at least one responded
    /// 200, evicts the entry from the cache (after the loop) and returns
    /// `Ok(())`; if none responded 200, returns [`Error::RecordMissing`].
    #[instrument(level = "debug", skip(self))]
    pub async fn bounce_delete(&self, uid: &str) -> Result<(), Error> {
        let mut any_success = false;

        for peer in self.registry.peers() {
            let Ok(response) = self.client.delete(peer, &[self.route.as_str(), uid], &[]) else {
                continue;
            };

            if response.status == 200 {
                any_success = true;
            }
        }

        if !any_success {
            return Err(Error::RecordMissing);
        }

        if let Some(cache) = &self.cache {
            cache.forget(uid).await;
        }

        Ok(())
    }
}
