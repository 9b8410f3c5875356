//! edavki - Slovenian eDavki declarations from eToro account statements
//!
//! Reads the closed positions and dividends of an eToro statement, converts
//! every amount to EUR with the ECB reference rate of the transaction day, and
//! produces the Doh-Div, Doh-KDVP and D-IFI declarations plus an EUR workbook.

pub mod cli;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod export;
pub mod importers;
pub mod lookup;
pub mod pipeline;
pub mod rates;
pub mod records;
pub mod reports;
pub mod tax;
pub mod utils;
