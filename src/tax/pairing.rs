//! Pairing of closed positions into report line items
//!
//! Both position-based forms describe a closed position as two line items: the
//! leg that opened it and the leg that closed it. Positions are grouped into
//! runs first, a run being a maximal stretch of consecutive positions sharing
//! a grouping key in the already sorted input. Each run becomes one report
//! item (two for derivatives, one per direction).
//!
//! Runs are strictly contiguous. If the same key reappears after a different
//! one, it starts a new run and therefore a new item.

use chrono::NaiveDate;
use itertools::Itertools;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, warn};

use crate::records::ClosedPosition;

pub const INVENTORY_LIST_TYPE: &str = "PLVP";
pub const SECURITY_ACQUISITION_TYPE: &str = "B";
pub const DERIVATIVE_ACQUISITION_TYPE: &str = "A";
pub const CFD_TYPE: &str = "02";
pub const CFD_TYPE_NAME: &str = "finančne pogodbe na razliko";

// ---------------------------------------------------------------------------
// Securities (Doh-KDVP)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SecurityPurchase {
    /// Acquisition date
    #[serde(rename = "F1")]
    pub date: NaiveDate,
    /// Acquisition type
    #[serde(rename = "F2")]
    pub acquisition_type: &'static str,
    #[serde(rename = "F3")]
    pub quantity: Decimal,
    /// Price per unit
    #[serde(rename = "F4")]
    pub price: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SecuritySale {
    #[serde(rename = "F6")]
    pub date: NaiveDate,
    #[serde(rename = "F7")]
    pub quantity: Decimal,
    #[serde(rename = "F9")]
    pub price: Decimal,
    /// Loss transfer
    #[serde(rename = "F10")]
    pub loss_transfer: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SecurityLeg {
    Purchase(SecurityPurchase),
    Sale(SecuritySale),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SecurityRow {
    #[serde(rename = "ID")]
    pub id: usize,
    #[serde(flatten)]
    pub leg: SecurityLeg,
    /// Quantity still held after this row
    #[serde(rename = "F8")]
    pub remaining: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Securities {
    #[serde(rename = "ISIN")]
    pub isin: String,
    #[serde(rename = "IsFond")]
    pub is_fond: bool,
    #[serde(rename = "Row")]
    pub rows: Vec<SecurityRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SecurityItem {
    #[serde(rename = "ItemID")]
    pub item_id: usize,
    pub inventory_list_type: &'static str,
    pub name: String,
    pub has_foreign_tax: bool,
    pub has_loss_transfer: bool,
    pub foreign_transfer: bool,
    pub tax_decrease_conformance: bool,
    pub securities: Securities,
}

/// Expand one run into alternating purchase / sale rows
pub fn security_rows(run: &[&ClosedPosition]) -> Vec<SecurityRow> {
    run.iter()
        .enumerate()
        .flat_map(|(k, p)| {
            [
                SecurityRow {
                    id: 2 * k,
                    leg: SecurityLeg::Purchase(SecurityPurchase {
                        date: p.open_date,
                        acquisition_type: SECURITY_ACQUISITION_TYPE,
                        quantity: p.units,
                        price: p.open_price,
                    }),
                    remaining: p.units,
                },
                SecurityRow {
                    id: 2 * k + 1,
                    leg: SecurityLeg::Sale(SecuritySale {
                        date: p.close_date,
                        quantity: p.units,
                        price: p.close_price,
                        loss_transfer: false,
                    }),
                    remaining: Decimal::ZERO,
                },
            ]
        })
        .collect()
}

/// Group sorted security positions into items, one per contiguous ISIN run.
///
/// Item numbers start at 1 and increase across the whole report.
pub fn pair_securities(positions: &[ClosedPosition]) -> Vec<SecurityItem> {
    let mut items = Vec::new();

    for (isin, run) in &positions.iter().chunk_by(|p| p.instrument_id.as_str()) {
        let run: Vec<&ClosedPosition> = run.collect();
        if isin.is_empty() {
            warn!(
                "Position '{}' has no ISIN; its item is unnamed and must be completed by hand",
                run[0].full_name.trim()
            );
        }

        items.push(SecurityItem {
            item_id: items.len() + 1,
            inventory_list_type: INVENTORY_LIST_TYPE,
            name: isin.to_string(),
            has_foreign_tax: false,
            has_loss_transfer: false,
            foreign_transfer: false,
            tax_decrease_conformance: false,
            securities: Securities {
                isin: isin.to_string(),
                is_fond: false,
                rows: security_rows(&run),
            },
        });
    }

    debug!(
        "Paired {} security positions into {} items",
        positions.len(),
        items.len()
    );
    items
}

// ---------------------------------------------------------------------------
// Derivatives (D-IFI)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LongPurchase {
    #[serde(rename = "F1")]
    pub date: NaiveDate,
    #[serde(rename = "F2")]
    pub acquisition_type: &'static str,
    #[serde(rename = "F3")]
    pub quantity: Decimal,
    #[serde(rename = "F4")]
    pub price: Decimal,
    /// Leveraged
    #[serde(rename = "F9")]
    pub leveraged: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LongSale {
    #[serde(rename = "F5")]
    pub date: NaiveDate,
    #[serde(rename = "F6")]
    pub quantity: Decimal,
    #[serde(rename = "F7")]
    pub price: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum LongLeg {
    Purchase(LongPurchase),
    Sale(LongSale),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LongSubItem {
    #[serde(skip)]
    pub id: usize,
    #[serde(flatten)]
    pub leg: LongLeg,
    #[serde(rename = "F8")]
    pub remaining: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShortSale {
    #[serde(rename = "F1")]
    pub date: NaiveDate,
    #[serde(rename = "F2")]
    pub quantity: Decimal,
    #[serde(rename = "F3")]
    pub price: Decimal,
    #[serde(rename = "F9")]
    pub leveraged: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShortPurchase {
    #[serde(rename = "F4")]
    pub date: NaiveDate,
    #[serde(rename = "F5")]
    pub acquisition_type: &'static str,
    #[serde(rename = "F6")]
    pub quantity: Decimal,
    #[serde(rename = "F7")]
    pub price: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ShortLeg {
    Sale(ShortSale),
    Purchase(ShortPurchase),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShortSubItem {
    #[serde(skip)]
    pub id: usize,
    #[serde(flatten)]
    pub leg: ShortLeg,
    /// Negative while the short is open
    #[serde(rename = "F8")]
    pub remaining: Decimal,
}

/// Sub-items of one derivative item, tagged by the item's TypeId
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "TypeId")]
pub enum DerivativeRows {
    #[serde(rename = "PLIFI")]
    Long {
        #[serde(rename = "TSubItem")]
        rows: Vec<LongSubItem>,
    },
    #[serde(rename = "PLIFIShort")]
    Short {
        #[serde(rename = "TShortSubItem")]
        rows: Vec<ShortSubItem>,
    },
}

impl DerivativeRows {
    pub fn type_id(&self) -> &'static str {
        match self {
            DerivativeRows::Long { .. } => "PLIFI",
            DerivativeRows::Short { .. } => "PLIFIShort",
        }
    }

    pub fn len(&self) -> usize {
        match self {
            DerivativeRows::Long { rows } => rows.len(),
            DerivativeRows::Short { rows } => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DerivativeItem {
    #[serde(rename = "ItemID")]
    pub item_id: usize,
    #[serde(rename = "Type")]
    pub kind: &'static str,
    pub type_name: &'static str,
    pub name: String,
    pub has_foreign_tax: bool,
    #[serde(flatten)]
    pub rows: DerivativeRows,
}

pub fn long_rows(run: &[&ClosedPosition]) -> Vec<LongSubItem> {
    run.iter()
        .enumerate()
        .flat_map(|(k, p)| {
            [
                LongSubItem {
                    id: 2 * k,
                    leg: LongLeg::Purchase(LongPurchase {
                        date: p.open_date,
                        acquisition_type: DERIVATIVE_ACQUISITION_TYPE,
                        quantity: p.units,
                        price: p.open_price,
                        leveraged: p.is_leveraged(),
                    }),
                    remaining: p.units,
                },
                LongSubItem {
                    id: 2 * k + 1,
                    leg: LongLeg::Sale(LongSale {
                        date: p.close_date,
                        quantity: p.units,
                        price: p.close_price,
                    }),
                    remaining: Decimal::ZERO,
                },
            ]
        })
        .collect()
}

/// A short is opened by selling and closed by buying back
pub fn short_rows(run: &[&ClosedPosition]) -> Vec<ShortSubItem> {
    run.iter()
        .enumerate()
        .flat_map(|(k, p)| {
            [
                ShortSubItem {
                    id: 2 * k,
                    leg: ShortLeg::Sale(ShortSale {
                        date: p.open_date,
                        quantity: p.units,
                        price: p.open_price,
                        leveraged: p.is_leveraged(),
                    }),
                    remaining: -p.units,
                },
                ShortSubItem {
                    id: 2 * k + 1,
                    leg: ShortLeg::Purchase(ShortPurchase {
                        date: p.close_date,
                        acquisition_type: DERIVATIVE_ACQUISITION_TYPE,
                        quantity: p.units,
                        price: p.close_price,
                    }),
                    remaining: Decimal::ZERO,
                },
            ]
        })
        .collect()
}

/// Group sorted derivative positions into items.
///
/// Each contiguous run of one instrument name yields a long item when it
/// holds long positions and a short item when it holds shorts, in that
/// order. Within each direction the run's original order is kept.
pub fn pair_derivatives(positions: &[ClosedPosition]) -> Vec<DerivativeItem> {
    let mut items: Vec<DerivativeItem> = Vec::new();

    for (name, run) in &positions.iter().chunk_by(|p| p.full_name.as_str()) {
        let (longs, shorts): (Vec<&ClosedPosition>, Vec<&ClosedPosition>) =
            run.partition(|p| p.is_long);
        let name = name.trim();

        if !longs.is_empty() {
            items.push(DerivativeItem {
                item_id: items.len() + 1,
                kind: CFD_TYPE,
                type_name: CFD_TYPE_NAME,
                name: name.to_string(),
                has_foreign_tax: false,
                rows: DerivativeRows::Long {
                    rows: long_rows(&longs),
                },
            });
        }

        if !shorts.is_empty() {
            items.push(DerivativeItem {
                item_id: items.len() + 1,
                kind: CFD_TYPE,
                type_name: CFD_TYPE_NAME,
                name: name.to_string(),
                has_foreign_tax: false,
                rows: DerivativeRows::Short {
                    rows: short_rows(&shorts),
                },
            });
        }
    }

    debug!(
        "Paired {} derivative positions into {} items",
        positions.len(),
        items.len()
    );
    items
}
