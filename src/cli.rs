use std::path::PathBuf;

use clap::Parser;

use ministore::cache::DISABLED;
use ministore::DEFAULT_PORT;

/// `<program> SERVERS_LIST_PATH BASE_PATH [PORT]`
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[arg(value_name = "SERVERS_LIST_PATH", help = "Path to the peer list file")]
    pub servers_list_path: PathBuf,

    #[arg(value_name = "BASE_PATH", help = "Directory records are persisted under")]
    pub base_path: PathBuf,

    #[arg(value_name = "PORT", default_value_t = DEFAULT_PORT, help = "Port to listen on")]
    pub port: u16,

    #[arg(
        long,
        value_name = "BYTES",
        default_value_t = DISABLED,
        help = "Memory cache bound: -1 unlimited, 0 disabled (default), or a positive byte limit"
    )]
    pub cache_size: i64,
}

impl Cli {
    /// Exits the process with status 1 and clap's help text if either path
    /// does not exist on disk.
    pub fn validate(self) -> Self {
        if !self.servers_list_path.exists() {
            eprintln!("error: servers list path does not exist: {}", self.servers_list_path.display());
            Self::exit_with_help();
        }

        if !self.base_path.exists() {
            eprintln!("error: base path does not exist: {}", self.base_path.display());
            Self::exit_with_help();
        }

        self
    }

    fn exit_with_help() -> ! {
        use clap::CommandFactory;
        let _ = Cli::command().print_help();
        std::process::exit(1);
    }
}
