use anyhow::Result;
use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_xlsxwriter::{DocProperties, Format, FormatAlign, Workbook, Worksheet, XlsxError};
use std::path::{Path, PathBuf};

use super::write_atomic;
use crate::records::{ClosedPosition, DividendRecord};

pub const DIVIDENDS_SHEET: &str = "Dividends";
pub const POSITIONS_SHEET: &str = "Closed positions";

pub fn statement_file(year: i32) -> String {
    format!("eToro_EUR_statement_{}.xlsx", year)
}

fn money(value: Decimal) -> f64 {
    value.round_dp(2).to_f64().unwrap_or_default()
}

fn date(value: NaiveDate) -> String {
    value.format("%d.%m.%Y").to_string()
}

fn write_header(sheet: &mut Worksheet, columns: &[(&str, f64)]) -> Result<(), XlsxError> {
    let bold = Format::new().set_bold().set_align(FormatAlign::Center);
    for (col, (title, width)) in columns.iter().enumerate() {
        let col = col as u16;
        sheet.write_string_with_format(0, col, *title, &bold)?;
        sheet.set_column_width(col, *width)?;
    }
    sheet.set_freeze_panes(1, 0)?;
    Ok(())
}

fn write_dividends(sheet: &mut Worksheet, dividends: &[DividendRecord]) -> Result<(), XlsxError> {
    sheet.set_name(DIVIDENDS_SHEET)?;
    write_header(
        sheet,
        &[
            ("Payment Date", 15.0),
            ("ISIN", 20.0),
            ("Full Name", 40.0),
            ("EUR Net Dividend", 20.0),
            ("EUR Foreign Tax", 20.0),
        ],
    )?;

    let amount = Format::new().set_num_format("#,##0.00");
    for (i, d) in dividends.iter().enumerate() {
        let row = i as u32 + 1;
        sheet.write_string(row, 0, date(d.payment_date))?;
        sheet.write_string(row, 1, &d.instrument_id)?;
        sheet.write_string(row, 2, &d.full_name)?;
        sheet.write_number_with_format(row, 3, money(d.net_dividend), &amount)?;
        sheet.write_number_with_format(row, 4, money(d.foreign_tax), &amount)?;
    }
    Ok(())
}

fn write_positions(sheet: &mut Worksheet, positions: &[ClosedPosition]) -> Result<(), XlsxError> {
    sheet.set_name(POSITIONS_SHEET)?;
    write_header(
        sheet,
        &[
            ("ISIN", 15.0),
            ("Full Name", 40.0),
            ("Type", 12.0),
            ("Trade Type", 10.0),
            ("Units", 15.0),
            ("Leverage", 10.0),
            ("Open Date", 15.0),
            ("Close Date", 15.0),
            ("EUR Start Value", 15.0),
            ("EUR Close Value", 15.0),
            ("EUR Open Price", 15.0),
            ("EUR Close Price", 15.0),
            ("EUR Profit", 15.0),
        ],
    )?;

    let amount = Format::new().set_num_format("#,##0.00");
    for (i, p) in positions.iter().enumerate() {
        let row = i as u32 + 1;
        sheet.write_string(row, 0, &p.instrument_id)?;
        sheet.write_string(row, 1, &p.full_name)?;
        sheet.write_string(row, 2, p.class.as_str())?;
        sheet.write_string(row, 3, p.direction())?;
        sheet.write_number(row, 4, p.units.to_f64().unwrap_or_default())?;
        sheet.write_number(row, 5, p.leverage)?;
        sheet.write_string(row, 6, date(p.open_date))?;
        sheet.write_string(row, 7, date(p.close_date))?;
        sheet.write_number_with_format(row, 8, money(p.start_value), &amount)?;
        sheet.write_number_with_format(row, 9, money(p.close_value), &amount)?;
        sheet.write_number_with_format(row, 10, money(p.open_price), &amount)?;
        sheet.write_number_with_format(row, 11, money(p.close_price), &amount)?;
        sheet.write_number_with_format(row, 12, money(p.profit), &amount)?;
    }
    Ok(())
}

/// Write the EUR statement workbook with one sheet per record kind
pub fn write_statement(
    dir: &Path,
    year: i32,
    positions: &[ClosedPosition],
    dividends: &[DividendRecord],
) -> Result<PathBuf> {
    let mut workbook = Workbook::new();
    workbook.set_properties(&DocProperties::new().set_title("eToro EUR statement"));

    write_dividends(workbook.add_worksheet(), dividends)?;
    write_positions(workbook.add_worksheet(), positions)?;

    let bytes = workbook.save_to_buffer()?;
    write_atomic(dir, &statement_file(year), &bytes)
}
