//! Show command - print an exported CSV file

use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;
use comfy_table::Cell;
use wio_core::services::read_export;

use crate::output;

pub fn run(file: &Path, json: bool) -> Result<()> {
    let rows = read_export(file).with_context(|| format!("Failed to read {}", file.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    if rows.is_empty() {
        output::warning("No transactions in file");
        return Ok(());
    }

    println!("{}", file.display().to_string().bold());
    let mut table = output::create_table();
    table.set_header(vec!["Date", "Description", "Category", "Amount"]);
    for row in &rows {
        table.add_row(vec![
            Cell::new(&row.date),
            Cell::new(&row.description),
            Cell::new(row.category.as_deref().unwrap_or("")),
            output::amount_cell(row.amount, &row.currency),
        ]);
    }
    println!("{table}");

    // Files from one scrape share a single currency
    let currency = rows.first().map(|r| r.currency.as_str()).unwrap_or_default();
    println!("{}", output::total_line(rows.iter().map(|r| r.amount), currency));
    Ok(())
}
