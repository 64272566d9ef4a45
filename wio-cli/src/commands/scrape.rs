//! Scrape command - read the transaction list and export spending

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::warn;
use wio_core::services::ScrapeOutcome;
use wio_core::{ScrapeReport, WioContext};

use super::load_config;
use crate::output;

#[derive(Serialize)]
struct ScrapeJson<'a> {
    #[serde(flatten)]
    outcome: &'a ScrapeOutcome,
    output: Option<&'a Path>,
}

pub fn run(demo: bool, output_dir: Option<PathBuf>, filename: Option<String>, json: bool) -> Result<()> {
    let mut config = load_config()?;
    if let Some(dir) = output_dir {
        config.export.output_dir = dir;
    }
    if demo {
        // Nothing on screen needs to settle
        config.scrape = config.scrape.without_delays();
    }
    let ctx = WioContext::from_config(config);

    let report = if demo {
        if !json {
            output::info("Demo mode: scraping the built-in sample feed");
        }
        ctx.scrape_and_export(&ctx.demo_tree(), filename.as_deref())?
    } else {
        if !json {
            output::info(&format!("Connecting to Appium at {}", ctx.config.appium.server_url));
        }
        let session = ctx.connect().context("Failed to connect to the device")?;
        let result = ctx.scrape_and_export(&session, filename.as_deref());
        if let Err(e) = session.close() {
            warn!(error = %e, "Failed to close Appium session");
        }
        result.context("Scrape failed")?
    };

    if json {
        let body = ScrapeJson {
            outcome: &report.outcome,
            output: report.output.as_deref(),
        };
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    print_report(&ctx, &report);
    Ok(())
}

fn print_report(ctx: &WioContext, report: &ScrapeReport) {
    let outcome = &report.outcome;
    let Some(path) = &report.output else {
        output::warning("No spending transactions found!");
        output::info(&format!(
            "Stopped after {} batches: {}",
            outcome.batches, outcome.stop_reason
        ));
        return;
    };

    let mut table = output::create_table();
    table.set_header(vec!["Date", "Description", "Category", "Amount"]);
    for tx in &outcome.transactions {
        table.add_row(vec![
            comfy_table::Cell::new(tx.date()),
            comfy_table::Cell::new(tx.description()),
            comfy_table::Cell::new(tx.category().unwrap_or("")),
            output::amount_cell(tx.amount(), tx.currency()),
        ]);
    }
    println!("{table}");
    println!(
        "{}",
        output::total_line(
            outcome.transactions.iter().map(|tx| tx.amount()),
            &ctx.config.scrape.currency
        )
    );
    println!();

    output::info(&format!(
        "{} batches, {} rows skipped, stopped: {}",
        outcome.batches, outcome.skipped, outcome.stop_reason
    ));
    output::success(&format!(
        "✓ Successfully exported {} transactions to {}",
        outcome.transactions.len(),
        path.display()
    ));
}
