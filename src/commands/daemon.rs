use std::path::PathBuf;

use anyhow::Result;

use crate::config;

pub fn run(
    http_addr: Option<String>,
    log_level: Option<String>,
    config_path: Option<String>,
) -> Result<()> {
    let config_path = config_path.map(PathBuf::from);
    let cfg = config::load(config_path.as_deref())?;
    let mut daemon_config = cfg.daemon.clone();

    // CLI flags override config values
    if let Some(addr) = http_addr {
        daemon_config.http_addr = addr;
    }
    if let Some(level) = log_level {
        daemon_config.log_level = level;
    }

    // Build tokio runtime explicitly (no #[tokio::main] on fn main)
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(crate::server::run(daemon_config, config_path))
}
