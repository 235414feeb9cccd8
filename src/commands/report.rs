//! `devinfo report` — build and display one device report.

use std::path::Path;

use anyhow::Result;
use colored::{ColoredString, Colorize};

use crate::config;
use crate::domain::metric::Color;
use crate::domain::report_service::DeviceReport;

pub fn run(format: &str, config_path: Option<&Path>, push: Option<&str>) -> Result<()> {
    let cfg = config::load(config_path)?;
    let report = super::host_service(&cfg).snapshot(&cfg, &cfg)?;

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&report)?),
        _ => print_table(&report),
    }

    if let Some(url) = push {
        let rt = tokio::runtime::Runtime::new()?;
        rt.block_on(push_report(url, &report))?;
    }

    Ok(())
}

async fn push_report(url: &str, report: &DeviceReport) -> Result<()> {
    println!("\n{} to {}...", "Pushing report".cyan(), url);

    let client = reqwest::Client::new();
    let resp = client.post(url).json(report).send().await?;

    if resp.status().is_success() {
        println!("{}", "Report pushed successfully".green());
    } else {
        println!(
            "{}: {} {}",
            "Push failed".red(),
            resp.status(),
            resp.text().await.unwrap_or_default()
        );
    }
    Ok(())
}

fn paint(text: &str, color: Color) -> ColoredString {
    text.truecolor(color.red(), color.green(), color.blue())
}

pub fn print_table(report: &DeviceReport) {
    println!("{}", "═══ Device Info ═══".cyan().bold());
    println!("  Host: {}", report.hostname.bold());
    println!();

    if !report.visible {
        println!("  {}", "(device info hidden)".dimmed());
        return;
    }
    if report.items.is_empty() {
        println!("  {}", "(no metrics enabled)".dimmed());
        return;
    }

    let width = report
        .items
        .iter()
        .map(|i| i.title.chars().count())
        .max()
        .unwrap_or(0);

    for item in &report.items {
        let style = item.style.unwrap_or_default();
        let title = format!("{:<width$}", format!("{}:", item.title), width = width + 1);
        let value = if item.value.is_available() {
            paint(item.value.as_str(), style.value_color)
        } else {
            item.value.as_str().dimmed()
        };
        println!("  {}  {}", paint(&title, style.title_color), value);
    }
}
