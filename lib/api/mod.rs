pub mod handlers;
pub mod server;

use std::sync::Arc;

use serde::Deserialize;

use crate::model::TextModel;
use crate::strategy::Spread;

/// Request-scoped dependencies, built once at bootstrap and cloned into
/// every filter chain (REDESIGN FLAGS: no process-wide statics).
#[derive(Clone)]
pub struct Context {
    pub model: Arc<TextModel>,
    pub strategy: Arc<Spread>,
}

/// The at-most-one-of mode flag a `/text/{uid}` request carries.
#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
pub struct ModeQuery {
    pub mirror: Option<u8>,
    pub bridge: Option<u8>,
    pub cache: Option<u8>,
}

impl ModeQuery {
    #[must_use]
    pub fn is_cache(self) -> bool {
        self.cache.unwrap_or(0) == 1
    }

    #[must_use]
    pub fn is_bridge(self) -> bool {
        self.bridge.unwrap_or(0) == 1
    }

    #[must_use]
    pub fn is_mirror(self) -> bool {
        self.mirror.unwrap_or(0) == 1 || self.is_bridge()
    }
}

/// The `value` form field every `/text/{uid}` write carries -- either raw
/// client text (origin writes) or a JSON-encoded record (mirror/bridge
/// sink writes, matching how `Spread::spread_put` encodes its body).
#[derive(Debug, Deserialize)]
pub struct ValueForm {
    pub value: String,
}
