//! Output formatting module for CLI display
//!
//! Keeps presentation apart from the pipeline: every function here turns
//! already computed values into a string for the terminal.

use chrono::NaiveDate;
use colored::Colorize;
use rust_decimal::Decimal;
use serde::Serialize;
use std::path::PathBuf;
use tabled::{
    settings::{object::Columns, Alignment, Style},
    Table, Tabled,
};

use crate::rates::RateSample;
use crate::records::{ClosedPosition, DividendRecord};
use crate::reports::PreparedRecords;
use crate::utils::{format_decimal_si, format_eur};

fn signed(value: Decimal) -> String {
    let text = format_eur(value);
    if value >= Decimal::ZERO {
        text.green().to_string()
    } else {
        text.red().to_string()
    }
}

fn date(value: NaiveDate) -> String {
    value.format("%d.%m.%Y").to_string()
}

/// Converted dividends as a table
pub fn format_dividends_table(dividends: &[DividendRecord]) -> String {
    #[derive(Tabled)]
    struct DividendRow {
        #[tabled(rename = "Date")]
        date: String,
        #[tabled(rename = "ISIN")]
        isin: String,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Net")]
        net: String,
        #[tabled(rename = "Foreign tax")]
        tax: String,
        #[tabled(rename = "Gross")]
        gross: String,
    }

    let rows: Vec<DividendRow> = dividends
        .iter()
        .map(|d| DividendRow {
            date: date(d.payment_date),
            isin: d.instrument_id.clone(),
            name: d.full_name.clone(),
            net: format_eur(d.net_dividend),
            tax: format_eur(d.foreign_tax),
            gross: format_eur(d.gross()),
        })
        .collect();

    let mut table = Table::new(&rows);
    table.with(Style::modern());
    table.modify(Columns::new(3..), Alignment::right());
    table.to_string()
}

/// Converted closed positions as a table
pub fn format_positions_table(positions: &[ClosedPosition]) -> String {
    #[derive(Tabled)]
    struct PositionRow {
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Type")]
        class: String,
        #[tabled(rename = "Side")]
        side: String,
        #[tabled(rename = "Units")]
        units: String,
        #[tabled(rename = "Lev")]
        leverage: u32,
        #[tabled(rename = "Open")]
        open: String,
        #[tabled(rename = "Close")]
        close: String,
        #[tabled(rename = "Start value")]
        start: String,
        #[tabled(rename = "Close value")]
        end: String,
        #[tabled(rename = "Profit")]
        profit: String,
    }

    let rows: Vec<PositionRow> = positions
        .iter()
        .map(|p| PositionRow {
            name: p.full_name.clone(),
            class: p.class.as_str().to_string(),
            side: p.direction().to_string(),
            units: p.units.normalize().to_string(),
            leverage: p.leverage,
            open: date(p.open_date),
            close: date(p.close_date),
            start: format_eur(p.start_value),
            end: format_eur(p.close_value),
            profit: signed(p.profit),
        })
        .collect();

    let mut table = Table::new(&rows);
    table.with(Style::modern());
    table.modify(Columns::new(3..5), Alignment::right());
    table.modify(Columns::new(7..), Alignment::right());
    table.to_string()
}

pub fn format_preview(prepared: &PreparedRecords, rejected: usize) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "\n{} Dividends ({})\n\n",
        "💶".cyan().bold(),
        prepared.dividends.len()
    ));
    if prepared.dividends.is_empty() {
        output.push_str("No dividends\n");
    } else {
        output.push_str(&format_dividends_table(&prepared.dividends));
        output.push('\n');
    }

    output.push_str(&format!(
        "\n{} Closed positions ({})\n\n",
        "📈".cyan().bold(),
        prepared.positions.len()
    ));
    if prepared.positions.is_empty() {
        output.push_str("No closed positions\n");
    } else {
        output.push_str(&format_positions_table(&prepared.positions));
        output.push('\n');
    }

    let gross: Decimal = prepared.dividends.iter().map(|d| d.gross()).sum();
    let tax: Decimal = prepared.dividends.iter().map(|d| d.foreign_tax).sum();
    let profit: Decimal = prepared.positions.iter().map(|p| p.profit).sum();

    output.push_str(&format!("\n{} Summary", "━".repeat(60).bright_black()));
    output.push_str(&format!("\n{:<22} {}", "Gross dividends:".bold(), format_eur(gross)));
    output.push_str(&format!("\n{:<22} {}", "Foreign tax withheld:".bold(), format_eur(tax)));
    output.push_str(&format!("\n{:<22} {}\n", "Trading profit:".bold(), signed(profit)));

    if rejected > 0 {
        output.push_str(&format!(
            "\n{} {} rows were skipped as malformed; run with RUST_LOG=warn for details\n",
            "⚠".yellow().bold(),
            rejected
        ));
    }

    output
}

pub fn format_preview_json(prepared: &PreparedRecords, rejected: usize) -> String {
    #[derive(Serialize)]
    struct JsonPreview<'a> {
        #[serde(flatten)]
        records: &'a PreparedRecords,
        rejected_rows: usize,
    }

    serde_json::to_string_pretty(&JsonPreview {
        records: prepared,
        rejected_rows: rejected,
    })
    .unwrap_or_else(|e| format!(r#"{{"error": "JSON serialization failed: {}"}}"#, e))
}

pub fn format_written(paths: &[PathBuf], rejected: usize) -> String {
    let mut output = String::new();
    for path in paths {
        output.push_str(&format!("{} {}\n", "✓".green().bold(), path.display()));
    }
    if rejected > 0 {
        output.push_str(&format!(
            "{} {} malformed rows skipped\n",
            "⚠".yellow().bold(),
            rejected
        ));
    }
    output
}

pub fn format_rate_lookup(requested: NaiveDate, sample: &RateSample) -> String {
    let mut output = format!(
        "{} USD/EUR on {}: {}",
        "💱".cyan().bold(),
        date(requested),
        sample.rate.normalize()
    );
    if sample.date != requested {
        output.push_str(&format!(" (published {})", date(sample.date)).bright_black().to_string());
    }
    output.push('\n');
    output
}

pub fn format_rate_lookup_json(requested: NaiveDate, sample: &RateSample) -> String {
    serde_json::json!({
        "date": requested,
        "rate": sample.rate,
        "sample_date": sample.date,
    })
    .to_string()
}

pub fn format_rates_updated(path: &std::path::Path, count: usize, latest: Option<&RateSample>) -> String {
    let mut output = format!(
        "{} {} exchange rates cached at {}\n",
        "✓".green().bold(),
        count,
        path.display()
    );
    if let Some(latest) = latest {
        output.push_str(&format!(
            "  latest: {} on {}\n",
            format_decimal_si(latest.rate),
            date(latest.date)
        ));
    }
    output
}
