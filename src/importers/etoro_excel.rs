use anyhow::{anyhow, Context, Result};
use calamine::{open_workbook, Data, DataType, Reader, Xlsx};
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info, warn};

use crate::error::ReportError;
use crate::records::{InstrumentClass, RawDividend, RawPosition};

const POSITIONS_SHEET: &str = "closed positions";
const DIVIDENDS_SHEET: &str = "dividends";
/// Sheet order of the account statement when names don't match
const POSITIONS_SHEET_INDEX: usize = 1;
const DIVIDENDS_SHEET_INDEX: usize = 3;

#[derive(Debug, Clone, Copy, Default)]
pub struct ImportOptions {
    /// Abort on the first malformed row instead of skipping it
    pub strict: bool,
}

/// Everything read from one account statement
#[derive(Debug, Default)]
pub struct EtoroExport {
    pub positions: Vec<RawPosition>,
    pub dividends: Vec<RawDividend>,
    /// Rows that were skipped, in sheet order
    pub rejected: Vec<ReportError>,
}

/// Column mapping for the closed positions sheet
#[derive(Debug, Clone, Default)]
struct PositionColumns {
    action: Option<usize>,
    amount: Option<usize>,
    units: Option<usize>,
    open_date: Option<usize>,
    close_date: Option<usize>,
    leverage: Option<usize>,
    profit: Option<usize>,
    open_rate: Option<usize>,
    close_rate: Option<usize>,
    class: Option<usize>,
    isin: Option<usize>,
}

impl PositionColumns {
    fn from_header(header: &[Data]) -> Self {
        let mut mapping = Self::default();

        for (idx, cell) in header.iter().enumerate() {
            let text = cell.to_string().trim().to_lowercase();

            match text.as_str() {
                "action" => mapping.action = Some(idx),
                "amount" => mapping.amount = Some(idx),
                "units" => mapping.units = Some(idx),
                "leverage" => mapping.leverage = Some(idx),
                "type" => mapping.class = Some(idx),
                "isin" => mapping.isin = Some(idx),
                _ => {}
            }

            if text.starts_with("open date") {
                mapping.open_date = Some(idx);
            } else if text.starts_with("close date") {
                mapping.close_date = Some(idx);
            } else if text.starts_with("open rate") {
                mapping.open_rate = Some(idx);
            } else if text.starts_with("close rate") {
                mapping.close_rate = Some(idx);
            } else if mapping.profit.is_none() && text.starts_with("profit") {
                // Newer exports carry "Profit(USD)" next to "Profit(EUR)"
                mapping.profit = Some(idx);
            }
        }

        mapping
    }

    fn missing(&self) -> Vec<&'static str> {
        [
            ("Action", self.action),
            ("Amount", self.amount),
            ("Units", self.units),
            ("Open Date", self.open_date),
            ("Close Date", self.close_date),
            ("Leverage", self.leverage),
            ("Profit", self.profit),
            ("Open Rate", self.open_rate),
            ("Close Rate", self.close_rate),
            ("Type", self.class),
        ]
        .into_iter()
        .filter(|(_, idx)| idx.is_none())
        .map(|(name, _)| name)
        .collect()
    }
}

/// Column mapping for the dividends sheet
#[derive(Debug, Clone, Default)]
struct DividendColumns {
    date: Option<usize>,
    name: Option<usize>,
    net: Option<usize>,
    tax: Option<usize>,
    isin: Option<usize>,
}

impl DividendColumns {
    fn from_header(header: &[Data]) -> Self {
        let mut mapping = Self::default();

        for (idx, cell) in header.iter().enumerate() {
            let text = cell.to_string().trim().to_lowercase();

            if text.contains("date of payment") || text.contains("payment date") {
                mapping.date = Some(idx);
            } else if text.contains("instrument name") {
                mapping.name = Some(idx);
            } else if text.contains("net dividend") {
                mapping.net = Some(idx);
            } else if text.contains("withholding tax amount") {
                mapping.tax = Some(idx);
            } else if text == "isin" {
                mapping.isin = Some(idx);
            }
        }

        mapping
    }

    fn missing(&self) -> Vec<&'static str> {
        [
            ("Date of Payment", self.date),
            ("Instrument Name", self.name),
            ("Net Dividend Received", self.net),
            ("Withholding Tax Amount", self.tax),
        ]
        .into_iter()
        .filter(|(_, idx)| idx.is_none())
        .map(|(name, _)| name)
        .collect()
    }
}

/// Parse an eToro account statement workbook
pub fn import_etoro<P: AsRef<Path>>(file_path: P, options: ImportOptions) -> Result<EtoroExport> {
    let path = file_path.as_ref();
    info!("Parsing eToro account statement: {:?}", path);

    let mut workbook: Xlsx<_> = open_workbook(path).context("Failed to open Excel file")?;
    let sheet_names = workbook.sheet_names();
    let mut export = EtoroExport::default();

    let positions_sheet = find_sheet(&sheet_names, POSITIONS_SHEET, POSITIONS_SHEET_INDEX)
        .ok_or_else(|| anyhow!("No closed positions sheet in {:?}", path))?;
    debug!("Closed positions sheet: {}", positions_sheet);
    let range = workbook
        .worksheet_range(&positions_sheet)
        .context("Failed to read closed positions sheet")?;
    read_positions(&positions_sheet, range.rows(), options, &mut export)?;

    match find_sheet(&sheet_names, DIVIDENDS_SHEET, DIVIDENDS_SHEET_INDEX) {
        Some(dividends_sheet) => {
            debug!("Dividends sheet: {}", dividends_sheet);
            let range = workbook
                .worksheet_range(&dividends_sheet)
                .context("Failed to read dividends sheet")?;
            read_dividends(&dividends_sheet, range.rows(), options, &mut export)?;
        }
        None => warn!("No dividends sheet in {:?}; continuing without dividends", path),
    }

    info!(
        "Parsed {} closed positions and {} dividends ({} rows skipped)",
        export.positions.len(),
        export.dividends.len(),
        export.rejected.len()
    );
    Ok(export)
}

fn find_sheet(sheet_names: &[String], pattern: &str, fallback: usize) -> Option<String> {
    sheet_names
        .iter()
        .find(|name| name.to_lowercase().contains(pattern))
        .or_else(|| sheet_names.get(fallback))
        .cloned()
}

/// Record a bad row, or fail the import in strict mode
fn reject(export: &mut EtoroExport, err: ReportError, options: ImportOptions) -> Result<()> {
    if options.strict {
        return Err(err.into());
    }
    warn!("Skipping {}", err);
    export.rejected.push(err);
    Ok(())
}

fn read_positions<'a>(
    sheet: &str,
    mut rows: impl Iterator<Item = &'a [Data]>,
    options: ImportOptions,
    export: &mut EtoroExport,
) -> Result<()> {
    let header = rows
        .next()
        .ok_or_else(|| anyhow!("Sheet '{}' is empty", sheet))?;
    let columns = PositionColumns::from_header(header);
    let missing = columns.missing();
    if !missing.is_empty() {
        return Err(anyhow!(
            "Sheet '{}' is missing columns: {}",
            sheet,
            missing.join(", ")
        ));
    }
    debug!("Position column mapping: {:?}", columns);

    for (idx, row) in rows.enumerate() {
        // Header is sheet row 1
        let row_number = idx + 2;
        if row.iter().all(|cell| cell.is_empty()) {
            continue;
        }

        match parse_position(row, &columns, row_number) {
            Ok(Some(position)) => export.positions.push(position),
            Ok(None) => continue,
            Err(reason) => reject(export, ReportError::malformed(sheet, row_number, reason), options)?,
        }
    }

    Ok(())
}

fn read_dividends<'a>(
    sheet: &str,
    mut rows: impl Iterator<Item = &'a [Data]>,
    options: ImportOptions,
    export: &mut EtoroExport,
) -> Result<()> {
    let Some(header) = rows.next() else {
        return Ok(());
    };
    let columns = DividendColumns::from_header(header);
    let missing = columns.missing();
    if !missing.is_empty() {
        return Err(anyhow!(
            "Sheet '{}' is missing columns: {}",
            sheet,
            missing.join(", ")
        ));
    }

    for (idx, row) in rows.enumerate() {
        let row_number = idx + 2;
        if row.iter().all(|cell| cell.is_empty()) {
            continue;
        }

        match parse_dividend(row, &columns, row_number) {
            Ok(Some(dividend)) => export.dividends.push(dividend),
            Ok(None) => continue,
            Err(reason) => reject(export, ReportError::malformed(sheet, row_number, reason), options)?,
        }
    }

    Ok(())
}

fn cell(row: &[Data], idx: Option<usize>) -> &Data {
    idx.and_then(|i| row.get(i)).unwrap_or(&Data::Empty)
}

fn text(row: &[Data], idx: Option<usize>) -> String {
    cell(row, idx).to_string().trim().to_string()
}

/// Split "Buy Apple Inc" into (is_long, "Apple Inc")
pub fn parse_action(action: &str) -> Option<(bool, String)> {
    let mut words = action.split_whitespace();
    let is_long = match words.next()? {
        w if w.eq_ignore_ascii_case("buy") => true,
        w if w.eq_ignore_ascii_case("sell") => false,
        _ => return None,
    };
    let name = words.collect::<Vec<_>>().join(" ");
    if name.is_empty() {
        return None;
    }
    Some((is_long, name))
}

/// Parse one closed position row. `Ok(None)` marks a non-data row such as a total.
fn parse_position(
    row: &[Data],
    columns: &PositionColumns,
    row_number: usize,
) -> std::result::Result<Option<RawPosition>, String> {
    let action = text(row, columns.action);
    if action.is_empty() {
        return Ok(None);
    }
    let (is_long, full_name) =
        parse_action(&action).ok_or_else(|| format!("unrecognised action '{}'", action))?;

    let class_text = text(row, columns.class);
    let class = InstrumentClass::from_str(&class_text)
        .map_err(|_| format!("unknown instrument type '{}'", class_text))?;

    let units = parse_decimal(cell(row, columns.units)).map_err(|e| format!("units: {}", e))?;
    if units <= Decimal::ZERO {
        return Err(format!("units must be positive, got {}", units));
    }

    let leverage = parse_decimal(cell(row, columns.leverage)).map_err(|e| format!("leverage: {}", e))?;
    if leverage < Decimal::ONE || !leverage.fract().is_zero() {
        return Err(format!("leverage must be a whole number of at least 1, got {}", leverage));
    }
    let leverage = leverage
        .to_u32()
        .ok_or_else(|| format!("leverage out of range: {}", leverage))?;

    let open_date = parse_date(cell(row, columns.open_date)).map_err(|e| format!("open date: {}", e))?;
    let close_date = parse_date(cell(row, columns.close_date)).map_err(|e| format!("close date: {}", e))?;
    if close_date < open_date {
        return Err(format!("closed on {} before opening on {}", close_date, open_date));
    }

    Ok(Some(RawPosition {
        row: row_number,
        instrument_id: text(row, columns.isin),
        full_name,
        is_long,
        class,
        units,
        leverage,
        open_date,
        close_date,
        amount: parse_decimal(cell(row, columns.amount)).map_err(|e| format!("amount: {}", e))?,
        profit: parse_decimal(cell(row, columns.profit)).map_err(|e| format!("profit: {}", e))?,
        open_rate: parse_decimal(cell(row, columns.open_rate)).map_err(|e| format!("open rate: {}", e))?,
        close_rate: parse_decimal(cell(row, columns.close_rate))
            .map_err(|e| format!("close rate: {}", e))?,
    }))
}

fn parse_dividend(
    row: &[Data],
    columns: &DividendColumns,
    row_number: usize,
) -> std::result::Result<Option<RawDividend>, String> {
    let full_name = text(row, columns.name);
    if full_name.is_empty() {
        return Ok(None);
    }

    let tax_cell = cell(row, columns.tax);
    let withholding_tax = if tax_cell.is_empty() {
        Decimal::ZERO
    } else {
        parse_decimal(tax_cell).map_err(|e| format!("withholding tax: {}", e))?
    };

    Ok(Some(RawDividend {
        row: row_number,
        instrument_id: text(row, columns.isin),
        full_name,
        payment_date: parse_date(cell(row, columns.date)).map_err(|e| format!("payment date: {}", e))?,
        net_dividend: parse_decimal(cell(row, columns.net)).map_err(|e| format!("net dividend: {}", e))?,
        withholding_tax,
    }))
}

/// Parse a date, dropping any time of day
fn parse_date(cell: &Data) -> std::result::Result<NaiveDate, String> {
    match cell {
        Data::DateTime(dt) => excel_serial_date(dt.as_f64()),
        Data::Float(f) => excel_serial_date(*f),
        Data::Int(i) => excel_serial_date(*i as f64),
        Data::DateTimeIso(s) => parse_date_text(s),
        Data::String(s) => parse_date_text(s),
        Data::Empty => Err("missing".to_string()),
        other => Err(format!("could not parse date from {:?}", other)),
    }
}

fn excel_serial_date(serial: f64) -> std::result::Result<NaiveDate, String> {
    if !serial.is_finite() {
        return Err(format!("invalid date serial {}", serial));
    }
    let days = serial.floor() as i64;
    chrono::Duration::try_days(days)
        .zip(NaiveDate::from_ymd_opt(1899, 12, 30))
        .and_then(|(offset, epoch)| epoch.checked_add_signed(offset))
        .ok_or_else(|| format!("date serial out of range: {}", serial))
}

fn parse_date_text(text: &str) -> std::result::Result<NaiveDate, String> {
    let text = text.trim();

    for format in ["%d/%m/%Y %H:%M:%S", "%d/%m/%Y %H:%M", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Ok(dt.date());
        }
    }
    for format in ["%d/%m/%Y", "%Y-%m-%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return Ok(date);
        }
    }

    Err(format!("could not parse date '{}'", text))
}

/// Parse a number from a numeric cell or English-formatted text
fn parse_decimal(cell: &Data) -> std::result::Result<Decimal, String> {
    match cell {
        Data::Int(i) => Ok(Decimal::from(*i)),
        Data::Float(f) => Decimal::from_f64(*f).ok_or_else(|| format!("invalid number {}", f)),
        Data::String(s) => {
            let mut cleaned = s.trim().replace(',', "");
            // Accounting notation for negatives
            if let Some(inner) = cleaned.strip_prefix('(').and_then(|c| c.strip_suffix(')')) {
                cleaned = format!("-{}", inner);
            }
            Decimal::from_str(&cleaned).map_err(|_| format!("invalid number '{}'", s.trim()))
        }
        Data::Empty => Err("missing".to_string()),
        other => Err(format!("invalid number {:?}", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn s(v: &str) -> Data {
        Data::String(v.to_string())
    }

    fn position_header() -> Vec<Data> {
        [
            "Position ID", "Action", "Amount", "Units", "Open Date", "Close Date", "Leverage",
            "Spread", "Profit", "Open Rate", "Close Rate", "Take profit rate", "Stop lose rate",
            "Rollover Fees And Dividends", "Copied From", "Type", "ISIN", "Notes",
        ]
        .iter()
        .map(|h| s(h))
        .collect()
    }

    fn position_row(action: &str, units: Data, leverage: Data, open: &str, close: &str, class: &str) -> Vec<Data> {
        vec![
            Data::Int(1001),
            s(action),
            Data::Float(500.0),
            units,
            s(open),
            s(close),
            leverage,
            Data::Float(0.0),
            Data::Float(80.0),
            Data::Float(125.0),
            Data::Float(145.0),
            Data::Empty,
            Data::Empty,
            Data::Float(0.0),
            Data::Empty,
            s(class),
            s("US0378331005"),
            Data::Empty,
        ]
    }

    #[test]
    fn test_parse_action() {
        assert_eq!(parse_action("Buy Apple"), Some((true, "Apple".to_string())));
        assert_eq!(
            parse_action("Sell  Royal Dutch Shell "),
            Some((false, "Royal Dutch Shell".to_string()))
        );
        assert_eq!(parse_action("Hold Apple"), None);
        assert_eq!(parse_action("Buy"), None);
    }

    #[test]
    fn test_position_column_mapping() {
        let columns = PositionColumns::from_header(&position_header());
        assert!(columns.missing().is_empty());
        assert_eq!(columns.action, Some(1));
        assert_eq!(columns.profit, Some(8));
        assert_eq!(columns.class, Some(15));
        assert_eq!(columns.isin, Some(16));
    }

    #[test]
    fn test_parse_position_row() {
        let columns = PositionColumns::from_header(&position_header());
        let row = position_row(
            "Buy Apple",
            Data::Float(4.0),
            Data::Int(1),
            "03/02/2024 14:05:10",
            "04/03/2024 09:00:00",
            "Stocks",
        );

        let position = parse_position(&row, &columns, 2).unwrap().unwrap();
        assert!(position.is_long);
        assert_eq!(position.full_name, "Apple");
        assert_eq!(position.units, dec!(4));
        assert_eq!(position.leverage, 1);
        assert_eq!(position.open_date, NaiveDate::from_ymd_opt(2024, 2, 3).unwrap());
        assert_eq!(position.close_date, NaiveDate::from_ymd_opt(2024, 3, 4).unwrap());
        assert_eq!(position.amount, dec!(500));
        assert_eq!(position.open_rate, dec!(125));
        assert_eq!(position.class, InstrumentClass::Stock);
        assert_eq!(position.instrument_id, "US0378331005");
    }

    #[test]
    fn test_invalid_positions_rejected() {
        let columns = PositionColumns::from_header(&position_header());
        let ok_dates = ("03/02/2024 14:05:10", "04/03/2024 09:00:00");

        let zero_units = position_row("Buy Apple", Data::Float(0.0), Data::Int(1), ok_dates.0, ok_dates.1, "Stocks");
        assert!(parse_position(&zero_units, &columns, 2).unwrap_err().contains("units"));

        let no_leverage = position_row("Buy Apple", Data::Float(1.0), Data::Int(0), ok_dates.0, ok_dates.1, "Stocks");
        assert!(parse_position(&no_leverage, &columns, 2).unwrap_err().contains("leverage"));

        let backwards = position_row("Buy Apple", Data::Float(1.0), Data::Int(1), ok_dates.1, ok_dates.0, "Stocks");
        assert!(parse_position(&backwards, &columns, 2).unwrap_err().contains("before"));

        let bonds = position_row("Buy Apple", Data::Float(1.0), Data::Int(1), ok_dates.0, ok_dates.1, "Bonds");
        assert!(parse_position(&bonds, &columns, 2).unwrap_err().contains("Bonds"));
    }

    #[test]
    fn test_row_without_action_is_skipped() {
        let columns = PositionColumns::from_header(&position_header());
        let mut row = position_row("", Data::Float(1.0), Data::Int(1), "", "", "");
        row[0] = s("Total");
        assert_eq!(parse_position(&row, &columns, 9).unwrap(), None);
    }

    #[test]
    fn test_read_positions_skip_and_strict() {
        let header = position_header();
        let good = position_row("Buy Apple", Data::Float(1.0), Data::Int(1), "03/02/2024", "04/03/2024", "Stocks");
        let bad = position_row("Buy Apple", Data::Float(-1.0), Data::Int(1), "03/02/2024", "04/03/2024", "Stocks");
        let rows = vec![header, good, bad];

        let mut export = EtoroExport::default();
        read_positions(
            "Closed Positions",
            rows.iter().map(|r| r.as_slice()),
            ImportOptions::default(),
            &mut export,
        )
        .unwrap();
        assert_eq!(export.positions.len(), 1);
        assert_eq!(export.rejected.len(), 1);
        assert!(matches!(
            export.rejected[0],
            ReportError::MalformedRecord { row: 3, .. }
        ));

        let mut export = EtoroExport::default();
        let err = read_positions(
            "Closed Positions",
            rows.iter().map(|r| r.as_slice()),
            ImportOptions { strict: true },
            &mut export,
        )
        .unwrap_err();
        assert!(err.to_string().contains("row 3"));
    }

    #[test]
    fn test_missing_columns_reported() {
        let header = vec![s("Action"), s("Amount")];
        let mut export = EtoroExport::default();
        let err = read_positions(
            "Closed Positions",
            std::iter::once(header.as_slice()),
            ImportOptions::default(),
            &mut export,
        )
        .unwrap_err();
        assert!(err.to_string().contains("Units"));
    }

    #[test]
    fn test_parse_dividend_row() {
        let header: Vec<Data> = [
            "Date of Payment",
            "Instrument Name",
            "Net Dividend Received (USD)",
            "Withholding Tax Rate (%)",
            "Withholding Tax Amount (USD)",
            "Position ID",
            "Type",
            "ISIN",
        ]
        .iter()
        .map(|h| s(h))
        .collect();
        let columns = DividendColumns::from_header(&header);
        assert!(columns.missing().is_empty());

        let row = vec![
            s("15/02/2024"),
            s("Apple"),
            Data::Float(8.5),
            s("15 %"),
            Data::Float(1.5),
            Data::Int(1001),
            s("Stocks"),
            s("US0378331005"),
        ];
        let dividend = parse_dividend(&row, &columns, 2).unwrap().unwrap();
        assert_eq!(dividend.payment_date, NaiveDate::from_ymd_opt(2024, 2, 15).unwrap());
        assert_eq!(dividend.net_dividend, dec!(8.5));
        assert_eq!(dividend.withholding_tax, dec!(1.5));
        assert_eq!(dividend.instrument_id, "US0378331005");
    }

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        assert_eq!(parse_date(&s("15/03/2024 23:59:59")).unwrap(), expected);
        assert_eq!(parse_date(&s("15/03/2024")).unwrap(), expected);
        assert_eq!(parse_date(&Data::Float(45366.75)).unwrap(), expected);
        assert!(parse_date(&s("March 15")).is_err());
        assert!(parse_date(&Data::Empty).is_err());
    }

    #[test]
    fn test_out_of_range_serial_dates_rejected() {
        assert!(parse_date(&Data::Float(1e15)).unwrap_err().contains("out of range"));
        assert!(parse_date(&Data::Float(-1e15)).is_err());
        assert!(parse_date(&Data::Float(f64::NAN)).unwrap_err().contains("invalid"));
        assert!(parse_date(&Data::Float(f64::INFINITY)).is_err());

        let columns = PositionColumns::from_header(&position_header());
        let mut row = position_row("Buy Apple", Data::Float(1.0), Data::Int(1), "", "04/03/2024", "Stocks");
        row[4] = Data::Float(1e15);
        assert!(parse_position(&row, &columns, 2).unwrap_err().contains("open date"));
    }

    #[test]
    fn test_parse_decimal_english_format() {
        assert_eq!(parse_decimal(&s("1,234.56")).unwrap(), dec!(1234.56));
        assert_eq!(parse_decimal(&s("(12.50)")).unwrap(), dec!(-12.50));
        assert_eq!(parse_decimal(&Data::Float(0.1)).unwrap(), dec!(0.1));
        assert_eq!(parse_decimal(&Data::Int(3)).unwrap(), dec!(3));
        assert!(parse_decimal(&s("n/a")).is_err());
    }

    #[test]
    fn test_find_sheet_by_name_or_position() {
        let names: Vec<String> = ["Account Summary", "Closed Positions", "Account Activity", "Dividends"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(find_sheet(&names, POSITIONS_SHEET, 1).as_deref(), Some("Closed Positions"));
        assert_eq!(find_sheet(&names, DIVIDENDS_SHEET, 3).as_deref(), Some("Dividends"));

        let renamed: Vec<String> = ["A", "B", "C", "D"].iter().map(|s| s.to_string()).collect();
        assert_eq!(find_sheet(&renamed, DIVIDENDS_SHEET, 3).as_deref(), Some("D"));
        assert_eq!(find_sheet(&renamed[..2], DIVIDENDS_SHEET, 3), None);
    }
}
