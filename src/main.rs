#![forbid(unsafe_code)]

use std::net::{IpAddr, Ipv4Addr};

use clap::Parser;
use tracing::{error, info, metadata::LevelFilter};
use tracing_subscriber::{
    prelude::__tracing_subscriber_SubscriberExt, util::SubscriberInitExt, Layer,
};

use ministore::Settings;

mod cli;

use cli::Cli;

fn enable_tracing() {
    let level = if let Ok(level) = std::env::var("LOG_LEVEL") {
        match level.to_ascii_lowercase().as_str() {
            "warn" => LevelFilter::WARN,
            "info" => LevelFilter::INFO,
            "trace" => LevelFilter::TRACE,
            _ => LevelFilter::ERROR,
        }
    } else if cfg!(debug_assertions) {
        LevelFilter::TRACE
    } else {
        LevelFilter::INFO
    };

    tracing_subscriber::Registry::default()
        .with(
            (if cfg!(debug_assertions) {
                tracing_subscriber::fmt::layer()
            } else {
                tracing_subscriber::fmt::layer()
                    .with_file(false)
                    .with_line_number(false)
            })
            .compact()
            .with_ansi(true)
            .with_filter(level),
        )
        .init();
}

#[tokio::main]
async fn main() {
    enable_tracing();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            std::process::exit(1);
        }
    };

    let cli = cli.validate();

    let settings = Settings {
        servers_list_path: cli.servers_list_path,
        base_path: cli.base_path,
        listen: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        port: cli.port,
        cache_size: cli.cache_size,
    };

    let run = tokio::spawn(ministore::run(settings));

    tokio::select! {
        result = run => {
            match result {
                Ok(Ok(())) => {}
                Ok(Err(err)) => error!("{err}"),
                Err(err) => error!("{err}"),
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("shutting down");
        }
    }
}
