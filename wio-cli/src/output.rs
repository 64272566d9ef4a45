//! Output formatting utilities

use colored::Colorize;
use comfy_table::{presets::UTF8_FULL_CONDENSED, Cell, CellAlignment, ContentArrangement, Table};
use rust_decimal::Decimal;

/// Print a success message
pub fn success(msg: &str) {
    println!("{}", msg.green());
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{}", msg.red());
}

/// Print a warning message
pub fn warning(msg: &str) {
    println!("{}", msg.yellow());
}

/// Print an info message
pub fn info(msg: &str) {
    println!("{}", msg.cyan());
}

/// Create a styled table
pub fn create_table() -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Right-aligned amount cell with its currency
pub fn amount_cell(amount: Decimal, currency: &str) -> Cell {
    Cell::new(format!("{amount} {currency}")).set_alignment(CellAlignment::Right)
}

/// Sum of amounts, shown under a transaction table
pub fn total_line(amounts: impl IntoIterator<Item = Decimal>, currency: &str) -> String {
    let total: Decimal = amounts.into_iter().sum();
    format!("Total: {} {}", total, currency).bold().to_string()
}
