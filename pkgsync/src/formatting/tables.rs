//! Table formatting utilities using comfy-table.

use comfy_table::{Cell, Table};
use owo_colors::OwoColorize;

fn new_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    let header_cells: Vec<Cell> = headers
        .iter()
        .map(|h| Cell::new(*h).add_attribute(comfy_table::Attribute::Bold))
        .collect();
    table
        .set_header(header_cells)
        .load_preset(comfy_table::presets::UTF8_FULL)
        .apply_modifier(comfy_table::modifiers::UTF8_ROUND_CORNERS)
        .set_content_arrangement(comfy_table::ContentArrangement::Dynamic);
    table
}

/// Prints one row per synced manifest with the fields and patch operations.
pub fn print_change_table(rows: &[(String, Vec<String>, Vec<String>)]) {
    let mut table = new_table(&["Manifest", "Fields", "Operations"]);

    for (path, fields, operations) in rows {
        let fields_str = if fields.is_empty() {
            "(none)".bright_black().to_string()
        } else {
            fields.join(", ")
        };
        table.add_row(vec![
            Cell::new(path).fg(comfy_table::Color::White),
            Cell::new(fields_str),
            Cell::new(operations.join("\n")).fg(comfy_table::Color::DarkGrey),
        ]);
    }

    println!("{}", table);
}

/// Prints one row per copy attempt.
pub fn print_copy_table(rows: &[(String, String, bool)]) {
    let mut table = new_table(&["Source", "Destination", "Result"]);

    for (from, to, copied) in rows {
        let result = if *copied {
            Cell::new("copied").fg(comfy_table::Color::Green)
        } else {
            Cell::new("skipped").fg(comfy_table::Color::Yellow)
        };
        table.add_row(vec![
            Cell::new(from).fg(comfy_table::Color::DarkGrey),
            Cell::new(to).fg(comfy_table::Color::White),
            result,
        ]);
    }

    println!("{}", table);
}
