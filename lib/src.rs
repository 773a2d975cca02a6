#![forbid(unsafe_code)]

use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

pub mod api;
pub mod cache;
pub mod error;
pub mod model;
pub mod peer;
pub mod processors;
pub mod record;
pub mod registry;
pub mod storage;
pub mod strategy;

pub use error::Error;

/// Default port a node listens on when none is given on the command line.
pub const DEFAULT_PORT: u16 = 8001;

/// Everything needed to bring a node up: where its peers are listed, where
/// its records live on disk, which address to bind, and how big a memory
/// cache to give it. `cache_size` is [`cache::DISABLED`] by default (see
/// the CLI's `--cache-size`) -- a node with no peers configured, which is
/// the normal shape of a passive mirror sink or a standalone node, must be
/// able to bind and serve without ever tripping `Spread::with_cache`'s
/// "cache enabled with no peers" check.
pub struct Settings {
    pub servers_list_path: PathBuf,
    pub base_path: PathBuf,
    pub listen: IpAddr,
    pub port: u16,
    pub cache_size: i64,
}

fn processors() -> Vec<Box<dyn processors::Processor>> {
    vec![
        Box::new(processors::DetectLangProcess),
        Box::new(processors::MarkProcess),
    ]
}

/// Wires storage, the model, the replication strategy and the cache
/// together into an [`api::Context`], then serves `/text/{uid}` until the
/// process is asked to stop.
///
/// # Errors
/// If the peer list can't be read, or a cache is enabled with no peers
/// configured.
pub async fn run(settings: Settings) -> Result<(), Error> {
    let registry = registry::Registry::load(&settings.servers_list_path)?;

    let storage = storage::FileStorage::new(settings.base_path);
    let model = Arc::new(model::TextModel::new(storage, processors()));

    let cache = cache::MemoryCache::new(settings.cache_size);
    let strategy = strategy::Spread::new(registry, "text").with_cache(cache)?;

    let context = api::Context {
        model,
        strategy: Arc::new(strategy),
    };

    info!(listen = %settings.listen, port = settings.port, "starting ministore node");

    api::server::Server::with_context(context)
        .run(settings.listen, settings.port)
        .await;

    Ok(())
}
