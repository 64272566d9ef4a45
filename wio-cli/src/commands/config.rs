//! Config command - show the effective configuration

use anyhow::{Context, Result};
use colored::Colorize;
use serde_json::json;
use wio_core::config::IdentityStrategy;

use super::{get_wio_dir, load_config};
use crate::output;

pub fn run(json: bool, write: bool) -> Result<()> {
    let wio_dir = get_wio_dir()?;
    let config = load_config()?;

    if write {
        std::fs::create_dir_all(&wio_dir)
            .with_context(|| format!("Failed to create {}", wio_dir.display()))?;
        config.save(&wio_dir)?;
        if !json {
            output::success(&format!("✓ Wrote {}", wio_dir.join("settings.json").display()));
        }
    }

    if json {
        let body = json!({
            "wioDir": wio_dir,
            "appium": config.appium,
            "capabilities": config.appium.to_capabilities(),
            "locators": config.locators,
            "scrape": config.scrape,
            "export": config.export,
        });
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    println!("{}", "Wio Configuration".bold());
    println!("Settings: {}", wio_dir.join("settings.json").display());
    println!();

    let appium = &config.appium;
    let scrape = &config.scrape;
    let identity = match &scrape.identity {
        IdentityStrategy::Tuple => "tuple".to_string(),
        IdentityStrategy::Attribute { name } => format!("attribute ({name})"),
        IdentityStrategy::Detail => "detail view".to_string(),
    };

    let mut table = output::create_table();
    table.add_row(vec!["Appium server", appium.server_url.as_str()]);
    table.add_row(vec!["Device", appium.device_name.as_str()]);
    table.add_row(vec!["UDID", appium.udid.as_str()]);
    table.add_row(vec!["Automation", appium.automation_name.as_str()]);
    table.add_row(vec!["Currency".to_string(), scrape.currency.clone()]);
    table.add_row(vec!["Foreign currencies".to_string(), scrape.foreign_currencies.join(", ")]);
    table.add_row(vec!["Identity".to_string(), identity]);
    table.add_row(vec!["Scroll mode".to_string(), format!("{:?}", scrape.scroll_mode).to_lowercase()]);
    table.add_row(vec![
        "Stop after".to_string(),
        format!("{} batches without new spending", scrape.max_no_new),
    ]);
    table.add_row(vec![
        "Output directory".to_string(),
        config.export.output_dir.display().to_string(),
    ]);
    println!("{table}");

    if !config.locators.detail_date_xpath.is_empty() {
        output::info("Detail view dates override section dates");
    }
    Ok(())
}
