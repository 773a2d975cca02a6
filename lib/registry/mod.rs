//! Parses a newline/whitespace-separated peer list file and detects the
//! optional leading `*` bridge marker.
use std::path::Path;

use crate::error::Error;

/// An immutable, once-loaded list of peer base URLs plus the "this node is a
/// bridge for its own outgoing fan-out" flag.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Registry {
    peers: Vec<String>,
    bridge: bool,
}

impl Registry {
    /// Loads peers from a path whose contents are whitespace-separated peer
    /// URLs. A leading `*` token is consumed and sets the bridge flag; an
    /// empty file yields an empty peer list and bridge flag false.
    pub fn load(path: &Path) -> Result<Registry, Error> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::parse(&content))
    }

    fn parse(content: &str) -> Registry {
        let mut tokens = content.split_whitespace();

        let bridge = match tokens.clone().next() {
            Some("*") => {
                tokens.next();
                true
            }
            _ => false,
        };

        Registry {
            peers: tokens.map(str::to_string).collect(),
            bridge,
        }
    }

    /// Builds a registry directly from a peer list, bypassing the file
    /// format. Used in tests and anywhere peers are already known
    /// programmatically.
    #[must_use]
    pub fn from_peers(peers: Vec<String>, bridge: bool) -> Registry {
        Registry { peers, bridge }
    }

    #[must_use]
    pub fn peers(&self) -> &[String] {
        &self.peers
    }

    #[must_use]
    pub fn is_bridge(&self) -> bool {
        self.bridge
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}
