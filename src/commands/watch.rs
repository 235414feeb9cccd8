//! `devinfo watch` — rebuild the report on a fixed interval.
//!
//! The config file is reloaded on every tick, so toggling a metric or the
//! master visibility switch shows up on the next rebuild.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use tracing::{info, warn};

use crate::config;

pub fn run(config_path: Option<&Path>, interval_secs: Option<u64>) -> Result<()> {
    let cfg = config::load(config_path)?;
    let interval_secs = interval_secs.unwrap_or(cfg.watch.interval_secs).max(1);
    let config_path = config_path.map(Path::to_path_buf);

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(watch_loop(config_path, interval_secs))
}

async fn watch_loop(config_path: Option<PathBuf>, interval_secs: u64) -> Result<()> {
    info!(interval_secs, "starting watch loop");
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let path = config_path.clone();
                match tokio::task::spawn_blocking(move || rebuild(path.as_deref())).await? {
                    Ok(()) => {}
                    Err(e) => warn!(error = %e, "report rebuild failed"),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted, stopping watch loop");
                return Ok(());
            }
        }
    }
}

fn rebuild(config_path: Option<&Path>) -> Result<()> {
    let cfg = config::load(config_path)?;
    let report = super::host_service(&cfg).snapshot(&cfg, &cfg)?;
    // Clear screen and home the cursor.
    print!("\x1B[2J\x1B[H");
    super::report::print_table(&report);
    Ok(())
}
