// Records module - typed closed positions and dividends in the reference currency

pub mod convert;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub use convert::{convert_dividend, convert_position, convert_all};

/// Instrument classes found in the broker export
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum InstrumentClass {
    Stock,
    Etf,
    Cfd,
    Crypto,
    Currency,
    Index,
    Commodity,
}

/// Which declaration a closed position belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    /// Doh-KDVP, gains from disposal of securities
    Securities,
    /// D-IFI, gains from derivative financial instruments
    Derivatives,
    /// Not declared through either form
    Excluded,
}

impl InstrumentClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            InstrumentClass::Stock => "Stocks",
            InstrumentClass::Etf => "ETF",
            InstrumentClass::Cfd => "CFD",
            InstrumentClass::Crypto => "Crypto",
            InstrumentClass::Currency => "Currencies",
            InstrumentClass::Index => "Indices",
            InstrumentClass::Commodity => "Commodities",
        }
    }

    pub fn destination(&self) -> Destination {
        match self {
            InstrumentClass::Cfd => Destination::Derivatives,
            InstrumentClass::Crypto => Destination::Excluded,
            _ => Destination::Securities,
        }
    }
}

impl FromStr for InstrumentClass {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "STOCKS" | "STOCK" => Ok(InstrumentClass::Stock),
            "ETF" | "ETFS" => Ok(InstrumentClass::Etf),
            "CFD" | "CFDS" => Ok(InstrumentClass::Cfd),
            "CRYPTO" | "CRYPTOASSETS" => Ok(InstrumentClass::Crypto),
            "CURRENCIES" | "CURRENCY" => Ok(InstrumentClass::Currency),
            "INDICES" | "INDEX" => Ok(InstrumentClass::Index),
            "COMMODITIES" | "COMMODITY" => Ok(InstrumentClass::Commodity),
            _ => Err(()),
        }
    }
}

/// Closed position row as exported, amounts still in the source currency
#[derive(Debug, Clone, PartialEq)]
pub struct RawPosition {
    /// 1-based row in the source sheet
    pub row: usize,
    pub instrument_id: String,
    pub full_name: String,
    pub is_long: bool,
    pub class: InstrumentClass,
    pub units: Decimal,
    pub leverage: u32,
    pub open_date: NaiveDate,
    pub close_date: NaiveDate,
    pub amount: Decimal,
    pub profit: Decimal,
    pub open_rate: Decimal,
    pub close_rate: Decimal,
}

/// Dividend row as exported, amounts still in the source currency
#[derive(Debug, Clone, PartialEq)]
pub struct RawDividend {
    pub row: usize,
    pub instrument_id: String,
    pub full_name: String,
    pub payment_date: NaiveDate,
    pub net_dividend: Decimal,
    pub withholding_tax: Decimal,
}

/// Closed position with amounts in the reference currency
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClosedPosition {
    pub instrument_id: String,
    pub full_name: String,
    pub class: InstrumentClass,
    pub is_long: bool,
    pub units: Decimal,
    pub leverage: u32,
    pub open_date: NaiveDate,
    pub close_date: NaiveDate,
    pub start_value: Decimal,
    pub close_value: Decimal,
    pub open_price: Decimal,
    pub close_price: Decimal,
    pub profit: Decimal,
    /// Instrument prices in the instrument's own currency, kept for matching
    pub open_rate_native: Decimal,
    pub close_rate_native: Decimal,
}

impl ClosedPosition {
    pub fn direction(&self) -> &'static str {
        if self.is_long {
            "Long"
        } else {
            "Short"
        }
    }

    pub fn is_leveraged(&self) -> bool {
        self.leverage != 1
    }
}

/// Dividend payment with amounts in the reference currency
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DividendRecord {
    pub instrument_id: String,
    pub full_name: String,
    pub payment_date: NaiveDate,
    pub net_dividend: Decimal,
    pub foreign_tax: Decimal,
}

impl DividendRecord {
    /// Dividend before withholding
    pub fn gross(&self) -> Decimal {
        self.net_dividend + self.foreign_tax
    }
}

/// Ascending (full name, open date), the order every report presents positions in
pub fn sort_positions(positions: &mut [ClosedPosition]) {
    positions.sort_by(|a, b| {
        a.full_name
            .cmp(&b.full_name)
            .then(a.open_date.cmp(&b.open_date))
    });
}

/// Ascending (full name, payment date)
pub fn sort_dividends(dividends: &mut [DividendRecord]) {
    dividends.sort_by(|a, b| {
        a.full_name
            .cmp(&b.full_name)
            .then(a.payment_date.cmp(&b.payment_date))
    });
}
