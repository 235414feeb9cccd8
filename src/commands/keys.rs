//! `devinfo keys` — list every metric key the registry knows and what it
//! resolves to right now, ignoring visibility.

use std::path::Path;

use anyhow::Result;
use colored::Colorize;

use crate::config;
use crate::domain::probes::SettingsSource;

pub fn run(config_path: Option<&Path>) -> Result<()> {
    let cfg = config::load(config_path)?;
    let service = super::host_service(&cfg);
    let registry = service.registry();

    let keys = registry.keys();
    let width = keys.iter().map(|k| k.as_str().len()).max().unwrap_or(0);

    println!("{}", "═══ Metric Keys ═══".cyan().bold());
    for key in &keys {
        let shown = cfg.get_bool(key.as_str(), true);
        let marker = if shown { "on ".green() } else { "off".red() };
        println!(
            "  {} {:<width$}  {}",
            marker,
            key.as_str(),
            registry.resolve(key),
            width = width
        );
    }

    let unknown: Vec<&String> = cfg
        .display
        .keys
        .iter()
        .filter(|k| !keys.iter().any(|known| known.as_str() == k.as_str()))
        .collect();
    if !unknown.is_empty() {
        println!();
        for key in unknown {
            println!("  {} {} (no probe, shows N/A)", "?".yellow(), key);
        }
    }
    Ok(())
}
