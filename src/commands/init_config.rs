//! `devinfo init-config` — write the default configuration file.

use std::path::Path;

use anyhow::Result;
use colored::Colorize;

use crate::config;

pub fn run(path: Option<&Path>, force: bool) -> Result<()> {
    let written = config::write_default(path, force)?;
    println!("{} {}", "Wrote".green(), written.display());
    Ok(())
}
