mod api;
mod commands;
mod config;
mod domain;
mod logging;
mod server;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "devinfo", version, about = "Configurable device status snapshot")]
struct Cli {
    /// Log level (default: warn, or the daemon's configured level; RUST_LOG overrides)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the device report once and print it
    Report {
        /// Output format (table or json)
        #[arg(long, default_value = "table")]
        format: String,

        /// Path to config file (default: ~/.config/devinfo/config.yaml)
        #[arg(long)]
        config: Option<PathBuf>,

        /// POST the JSON report to this URL after printing
        #[arg(long)]
        push: Option<String>,
    },

    /// Rebuild and redraw the report on an interval
    Watch {
        /// Seconds between rebuilds (overrides config)
        #[arg(long)]
        interval_secs: Option<u64>,

        /// Path to config file
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// List known metric keys with their current values
    Keys {
        /// Path to config file
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Write the default configuration file
    InitConfig {
        /// Destination (default: ~/.config/devinfo/config.yaml)
        #[arg(long)]
        path: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Serve the report over HTTP
    Daemon {
        /// HTTP listen address (overrides config)
        #[arg(long)]
        http_addr: Option<String>,

        /// Path to config file
        #[arg(long)]
        config: Option<String>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if !matches!(cli.command, Commands::Daemon { .. }) {
        logging::init(cli.log_level.as_deref().unwrap_or("warn"), false);
    }

    match cli.command {
        Commands::Report {
            format,
            config,
            push,
        } => commands::report::run(&format, config.as_deref(), push.as_deref()),
        Commands::Watch {
            interval_secs,
            config,
        } => commands::watch::run(config.as_deref(), interval_secs),
        Commands::Keys { config } => commands::keys::run(config.as_deref()),
        Commands::InitConfig { path, force } => commands::init_config::run(path.as_deref(), force),
        Commands::Daemon {
            http_addr,
            config,
        } => commands::daemon::run(http_addr, cli.log_level, config),
    }
}
