//! Terminal output: tab-separated tables or pretty JSON.

use anyhow::Result;
use serde::Serialize;

use stockbook_infra::RecordRow;
use stockbook_infra::queries::row_profit;

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn print_table(header: &[&str], rows: &[Vec<String>]) {
    println!("{}", header.join("\t"));
    for row in rows {
        println!("{}", row.join("\t"));
    }
}

/// Cell for display. A blank profit cell shows market minus settlement.
fn cell(row: &RecordRow, column: &str) -> String {
    let stored = row.get(column).unwrap_or_default();
    if column == "利润" && stored.trim().is_empty() {
        return row_profit(row).map(|p| p.to_string()).unwrap_or_default();
    }
    // Cells are single-line in the table view.
    stored.replace(['\t', '\n', '\r'], " ")
}

pub fn print_rows(rows: &[RecordRow], columns: &[String], json: bool) -> Result<()> {
    if json {
        return print_json(rows);
    }
    let header: Vec<&str> = columns.iter().map(String::as_str).collect();
    let body: Vec<Vec<String>> = rows
        .iter()
        .map(|row| columns.iter().map(|c| cell(row, c)).collect())
        .collect();
    print_table(&header, &body);
    Ok(())
}
