//! A thin HTTP client for talking to peer nodes.
use std::time::Duration;

use tracing::instrument;

use crate::error::Error;

const TIMEOUT: Duration = Duration::from_secs(30);

/// A peer's response: its status code and raw body. Non-2xx statuses are
/// *not* treated as transport failures -- the caller inspects `status` to
/// decide whether the peer accepted the request.
#[derive(Debug, Clone)]
pub struct PeerResponse {
    pub status: u16,
    pub body: String,
}

impl PeerResponse {
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Issues GET/PUT/POST/DELETE to a peer URL with path segments, query
/// params, and an optional form body, always under a 30-second timeout.
#[derive(Clone)]
pub struct PeerClient {
    agent: ureq::Agent,
}

impl Default for PeerClient {
    fn default() -> Self {
        PeerClient {
            agent: ureq::AgentBuilder::new()
                .timeout(TIMEOUT)
                .build(),
        }
    }
}

impl PeerClient {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn url(base_url: &str, segments: &[&str]) -> String {
        let mut url = base_url.trim_end_matches('/').to_string();
        for segment in segments {
            url.push('/');
            url.push_str(segment);
        }
        url
    }

    #[instrument(level = "debug", skip(self, query), err)]
    pub fn get(
        &self,
        base_url: &str,
        segments: &[&str],
        query: &[(&str, &str)],
    ) -> Result<PeerResponse, Error> {
        let mut request = self
            .agent
            .get(&Self::url(base_url, segments))
            .set("Accept", "application/json");
        for (key, value) in query {
            request = request.query(key, value);
        }

        to_peer_response(request.call())
    }

    #[instrument(level = "debug", skip(self, query, form), err)]
    pub fn put(
        &self,
        base_url: &str,
        segments: &[&str],
        query: &[(&str, &str)],
        form: &[(&str, &str)],
    ) -> Result<PeerResponse, Error> {
        let mut request = self
            .agent
            .put(&Self::url(base_url, segments))
            .set("Accept", "application/json");
        for (key, value) in query {
            request = request.query(key, value);
        }

        to_peer_response(request.send_form(form))
    }

    #[instrument(level = "debug", skip(self, query, form), err)]
    pub fn post(
        &self,
        base_url: &str,
        segments: &[&str],
        query: &[(&str, &str)],
        form: &[(&str, &str)],
    ) -> Result<PeerResponse, Error> {
        let mut request = self
            .agent
            .post(&Self::url(base_url, segments))
            .set("Accept", "application/json");
        for (key, value) in query {
            request = request.query(key, value);
        }

        to_peer_response(request.send_form(form))
    }

    #[instrument(level = "debug", skip(self, query), err)]
    pub fn delete(
        &self,
        base_url: &str,
        segments: &[&str],
        query: &[(&str, &str)],
    ) -> Result<PeerResponse, Error> {
        let mut request = self
            .agent
            .delete(&Self::url(base_url, segments))
            .set("Accept", "application/json");
        for (key, value) in query {
            request = request.query(key, value);
        }

        to_peer_response(request.call())
    }
}

fn to_peer_response(result: Result<ureq::Response, ureq::Error>) -> Result<PeerResponse, Error> {
    match result {
        Ok(response) => {
            let status = response.status();
            let body = response.into_string().unwrap_or_default();
            Ok(PeerResponse { status, body })
        }
        Err(ureq::Error::Status(status, response)) => {
            let body = response.into_string().unwrap_or_default();
            Ok(PeerResponse { status, body })
        }
        Err(err @ ureq::Error::Transport(_)) => Err(err.into()),
    }
}
