#![allow(dead_code)]

//! Fixture builders shared by the integration tests.
//!
//! The statement mimics an eToro export for 2024: two Apple stock positions,
//! a leveraged Tesla CFD short, a crypto position, one malformed row and three
//! dividends. Every rate in the fixture series is 1.25 USD per EUR, so EUR
//! amounts are the USD amounts divided by 1.25.

use rust_xlsxwriter::{Workbook, Worksheet};
use std::path::{Path, PathBuf};

pub const APPLE: &str = "US0378331005";
pub const TESLA: &str = "US88160R1014";

pub enum Cell<'a> {
    S(&'a str),
    N(f64),
}

use Cell::{N, S};

fn write_rows(worksheet: &mut Worksheet, headers: &[&str], rows: &[Vec<Cell>]) {
    for (col, header) in headers.iter().enumerate() {
        worksheet.write_string(0, col as u16, *header).unwrap();
    }
    for (r, row) in rows.iter().enumerate() {
        let r = (r + 1) as u32;
        for (col, cell) in row.iter().enumerate() {
            match cell {
                S(text) => worksheet.write_string(r, col as u16, *text).unwrap(),
                N(value) => worksheet.write_number(r, col as u16, *value).unwrap(),
            };
        }
    }
}

const POSITION_HEADERS: [&str; 14] = [
    "Position ID",
    "Action",
    "Amount",
    "Units",
    "Open Date",
    "Close Date",
    "Leverage",
    "Spread",
    "Profit",
    "Open Rate",
    "Close Rate",
    "Type",
    "ISIN",
    "Notes",
];

const DIVIDEND_HEADERS: [&str; 8] = [
    "Date of Payment",
    "Instrument Name",
    "Net Dividend Received (USD)",
    "Withholding Tax Rate (%)",
    "Withholding Tax Amount (USD)",
    "Position ID",
    "Type",
    "ISIN",
];

#[allow(clippy::too_many_arguments)]
fn position<'a>(
    id: f64,
    action: &'a str,
    amount: f64,
    units: f64,
    open: &'a str,
    close: &'a str,
    leverage: f64,
    profit: f64,
    class: &'a str,
    isin: &'a str,
) -> Vec<Cell<'a>> {
    vec![
        N(id),
        S(action),
        N(amount),
        N(units),
        S(open),
        S(close),
        N(leverage),
        N(0.0),
        N(profit),
        N(100.0),
        N(110.0),
        S(class),
        S(isin),
        S(""),
    ]
}

fn dividend<'a>(date: &'a str, name: &'a str, net: f64, tax: f64, isin: &'a str) -> Vec<Cell<'a>> {
    vec![
        S(date),
        S(name),
        N(net),
        S("15 %"),
        N(tax),
        N(9000.0),
        S("Stocks"),
        S(isin),
    ]
}

/// Write the 2024 statement fixture and return its path
pub fn write_statement_fixture(dir: &Path) -> PathBuf {
    let positions = vec![
        position(1.0, "Buy Apple", 500.0, 4.0, "01/02/2024 15:30:00", "04/03/2024 16:00:00", 1.0, 50.0, "Stocks", APPLE),
        position(2.0, "Buy Apple", 250.0, 2.0, "05/02/2024 15:30:00", "04/03/2024 16:00:00", 1.0, 25.0, "Stocks", APPLE),
        position(3.0, "Sell Tesla", 1000.0, 5.0, "01/02/2024 10:00:00", "01/03/2024 10:00:00", 2.0, -100.0, "CFD", TESLA),
        position(4.0, "Buy Bitcoin", 100.0, 0.0025, "01/02/2024 10:00:00", "03/06/2024 10:00:00", 1.0, 10.0, "Crypto", ""),
        position(5.0, "Buy Apple", 100.0, 0.0, "01/02/2024 10:00:00", "04/03/2024 10:00:00", 1.0, 5.0, "Stocks", APPLE),
    ];
    let dividends = vec![
        dividend("15/02/2024", "Apple", 8.5, 1.5, APPLE),
        dividend("15/02/2024", "Apple", 4.25, 0.75, APPLE),
        dividend("10/06/2024", "Unknown Holdings", 5.0, 0.0, "XX0000000001"),
    ];

    let mut workbook = Workbook::new();
    {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name("Account Summary").unwrap();
        worksheet.write_string(0, 0, "Details").unwrap();
    }
    {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name("Closed Positions").unwrap();
        write_rows(worksheet, &POSITION_HEADERS, &positions);
    }
    {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name("Account Activity").unwrap();
        worksheet.write_string(0, 0, "Date").unwrap();
    }
    {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name("Dividends").unwrap();
        write_rows(worksheet, &DIVIDEND_HEADERS, &dividends);
    }

    let path = dir.join("etoro_2024.xlsx");
    workbook.save(&path).unwrap();
    path
}

/// ECB `csvdata` excerpt with a flat 1.25 rate
pub fn write_rates_fixture(dir: &Path) -> PathBuf {
    let mut content = String::from("KEY,FREQ,CURRENCY,CURRENCY_DENOM,EXR_TYPE,EXR_SUFFIX,TIME_PERIOD,OBS_VALUE\n");
    for date in [
        "2024-01-31",
        "2024-02-01",
        "2024-02-05",
        "2024-02-15",
        "2024-03-01",
        "2024-03-04",
        "2024-06-03",
        "2024-06-10",
    ] {
        content.push_str(&format!("EXR.D.USD.EUR.SP00.A,D,USD,EUR,SP00,A,{},1.2500\n", date));
    }

    let path = dir.join("rates.csv");
    std::fs::write(&path, content).unwrap();
    path
}

pub fn write_treaties_fixture(dir: &Path) -> PathBuf {
    let path = dir.join("treaties.csv");
    std::fs::write(&path, "country,relief\nUS,15\n").unwrap();
    path
}
