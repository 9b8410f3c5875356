// Reports module - assembles the Doh-Div, Doh-KDVP and D-IFI declarations

use chrono::{Datelike, NaiveDate};
use itertools::Itertools;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info, warn};

use crate::lookup::{InstrumentDirectory, TreatyTable, COUNTRY_MISSING};
use crate::records::{sort_dividends, sort_positions, ClosedPosition, Destination, DividendRecord};
use crate::tax::{compact, pair_derivatives, pair_securities, DerivativeItem, SecurityItem};

pub const DOMAIN: &str = "edavki.durs.si";
/// Natural person
pub const TAXPAYER_TYPE: &str = "FO";
/// Original filing
pub const WORKFLOW_ORIGINAL: &str = "O";
pub const DIVIDEND_TYPE: &str = "1";

/// Calendar year being declared
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportPeriod {
    pub year: i32,
}

impl ReportPeriod {
    pub fn new(year: i32) -> Self {
        Self { year }
    }

    /// The year before `today`, which is what gets filed in spring
    pub fn previous_year(today: NaiveDate) -> Self {
        Self::new(today.year() - 1)
    }

    pub fn start(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, 1, 1).unwrap_or(NaiveDate::MIN)
    }

    pub fn end(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, 12, 31).unwrap_or(NaiveDate::MAX)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Taxpayer {
    #[serde(rename = "taxNumber")]
    pub tax_number: u32,
    #[serde(rename = "taxpayerType")]
    pub taxpayer_type: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Workflow {
    #[serde(rename = "DocumentWorkflowID")]
    pub document_workflow_id: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportHeader {
    pub taxpayer: Taxpayer,
    #[serde(rename = "Workflow")]
    pub workflow: Workflow,
    pub domain: &'static str,
}

impl ReportHeader {
    pub fn new(tax_number: u32) -> Self {
        Self {
            taxpayer: Taxpayer {
                tax_number,
                taxpayer_type: TAXPAYER_TYPE,
            },
            workflow: Workflow {
                document_workflow_id: WORKFLOW_ORIGINAL,
            },
            domain: DOMAIN,
        }
    }
}

// Dividends (Doh-Div)

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DividendItem {
    pub date: NaiveDate,
    pub payer_identification_number: String,
    pub payer_name: String,
    pub payer_address: String,
    pub payer_country: String,
    #[serde(rename = "Type")]
    pub kind: &'static str,
    /// Gross dividend, before withholding
    pub value: Decimal,
    pub foreign_tax: Decimal,
    pub source_country: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relief_statement: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DohDiv {
    #[serde(rename = "Period")]
    pub period: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DividendReport {
    #[serde(rename = "Header")]
    pub header: ReportHeader,
    #[serde(rename = "Doh_Div")]
    pub doh_div: DohDiv,
    #[serde(rename = "Dividend")]
    pub items: Vec<DividendItem>,
}

// Securities (Doh-KDVP)

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct KdvpPeriod {
    #[serde(rename = "DocumentWorkflowID")]
    pub document_workflow_id: &'static str,
    pub year: i32,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SecuritiesReport {
    #[serde(rename = "Header")]
    pub header: ReportHeader,
    #[serde(rename = "KDVP")]
    pub kdvp: KdvpPeriod,
    #[serde(rename = "KDVPItem")]
    pub items: Vec<SecurityItem>,
}

// Derivatives (D-IFI)

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DIfi {
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    #[serde(rename = "TItem")]
    pub items: Vec<DerivativeItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivativesReport {
    #[serde(rename = "Header")]
    pub header: ReportHeader,
    #[serde(rename = "D_IFI")]
    pub d_ifi: DIfi,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AssemblyOptions {
    pub compact_dividends: bool,
    pub compact_positions: bool,
    /// Attach the treaty relief to each dividend
    pub treaty_relief: bool,
}

/// Sorted and optionally compacted records, ready for every report
#[derive(Debug, Clone, Default, Serialize)]
pub struct PreparedRecords {
    pub positions: Vec<ClosedPosition>,
    pub dividends: Vec<DividendRecord>,
}

impl PreparedRecords {
    pub fn routed(&self, destination: Destination) -> Vec<ClosedPosition> {
        self.positions
            .iter()
            .filter(|p| p.class.destination() == destination)
            .cloned()
            .collect()
    }
}

/// Sort, then compact when opted in and there is something to merge
pub fn prepare(
    mut positions: Vec<ClosedPosition>,
    mut dividends: Vec<DividendRecord>,
    options: AssemblyOptions,
    period: ReportPeriod,
) -> PreparedRecords {
    sort_positions(&mut positions);
    sort_dividends(&mut dividends);

    if options.compact_dividends && dividends.len() > 1 {
        let before = dividends.len();
        dividends = compact(dividends);
        debug!("Compacted dividends: {} -> {}", before, dividends.len());
    }
    if options.compact_positions && positions.len() > 1 {
        let before = positions.len();
        positions = compact(positions);
        debug!("Compacted positions: {} -> {}", before, positions.len());
    }

    let outside_positions = positions
        .iter()
        .filter(|p| !period.contains(p.close_date))
        .count();
    let outside_dividends = dividends
        .iter()
        .filter(|d| !period.contains(d.payment_date))
        .count();
    if outside_positions + outside_dividends > 0 {
        warn!(
            "{} positions and {} dividends fall outside {}; they are reported as given",
            outside_positions, outside_dividends, period.year
        );
    }

    PreparedRecords {
        positions,
        dividends,
    }
}

/// Builds the three declarations from converted records
pub struct ReportAssembler<'a> {
    header: ReportHeader,
    period: ReportPeriod,
    options: AssemblyOptions,
    directory: &'a dyn InstrumentDirectory,
    treaties: &'a dyn TreatyTable,
}

impl<'a> ReportAssembler<'a> {
    pub fn new(
        tax_number: u32,
        period: ReportPeriod,
        options: AssemblyOptions,
        directory: &'a dyn InstrumentDirectory,
        treaties: &'a dyn TreatyTable,
    ) -> Self {
        Self {
            header: ReportHeader::new(tax_number),
            period,
            options,
            directory,
            treaties,
        }
    }

    pub fn period(&self) -> ReportPeriod {
        self.period
    }

    fn country_of(&self, isin: &str) -> String {
        match self.directory.country_of(isin) {
            Some(country) => country,
            None => {
                warn!(
                    "Country for ISIN '{}' is unknown; fix it in the declaration or add it to the countries file",
                    isin
                );
                COUNTRY_MISSING.to_string()
            }
        }
    }

    pub fn dividend_report(&self, dividends: &[DividendRecord]) -> DividendReport {
        let countries: Vec<String> = dividends
            .iter()
            .map(|d| self.country_of(&d.instrument_id))
            .collect();

        // One treaty lookup per distinct source country
        let reliefs: HashMap<&str, Option<Decimal>> = if self.options.treaty_relief {
            countries
                .iter()
                .map(String::as_str)
                .unique()
                .map(|c| (c, self.treaties.relief_of(c)))
                .collect()
        } else {
            HashMap::new()
        };
        for (country, relief) in &reliefs {
            if relief.is_none() && *country != COUNTRY_MISSING {
                warn!("No tax treaty relief known for {}", country);
            }
        }

        let items = dividends
            .iter()
            .zip(&countries)
            .map(|(d, country)| DividendItem {
                date: d.payment_date,
                payer_identification_number: d.instrument_id.clone(),
                payer_name: d.full_name.clone(),
                payer_address: self.directory.address_of(&d.instrument_id).unwrap_or_default(),
                payer_country: country.clone(),
                kind: DIVIDEND_TYPE,
                value: d.gross().round_dp(2),
                foreign_tax: d.foreign_tax.round_dp(2),
                source_country: country.clone(),
                relief_statement: reliefs.get(country.as_str()).copied().flatten(),
            })
            .collect();

        DividendReport {
            header: self.header.clone(),
            doh_div: DohDiv {
                period: self.period.year.to_string(),
            },
            items,
        }
    }

    /// Doh-KDVP over the securities among `positions`; derivatives and
    /// excluded classes are filtered out here
    pub fn securities_report(&self, positions: &[ClosedPosition]) -> SecuritiesReport {
        let securities: Vec<ClosedPosition> = positions
            .iter()
            .filter(|p| p.class.destination() == Destination::Securities)
            .cloned()
            .collect();

        SecuritiesReport {
            header: self.header.clone(),
            kdvp: KdvpPeriod {
                document_workflow_id: WORKFLOW_ORIGINAL,
                year: self.period.year,
                period_start: self.period.start(),
                period_end: self.period.end(),
            },
            items: pair_securities(&securities),
        }
    }

    pub fn derivatives_report(&self, positions: &[ClosedPosition]) -> DerivativesReport {
        let derivatives: Vec<ClosedPosition> = positions
            .iter()
            .filter(|p| p.class.destination() == Destination::Derivatives)
            .cloned()
            .collect();

        DerivativesReport {
            header: self.header.clone(),
            d_ifi: DIfi {
                period_start: self.period.start(),
                period_end: self.period.end(),
                items: pair_derivatives(&derivatives),
            },
        }
    }

    /// All three declarations from one prepared record set
    pub fn assemble(&self, prepared: &PreparedRecords) -> Reports {
        let reports = Reports {
            dividends: self.dividend_report(&prepared.dividends),
            securities: self.securities_report(&prepared.positions),
            derivatives: self.derivatives_report(&prepared.positions),
        };
        info!(
            "Assembled {} dividend, {} securities and {} derivative items for {}",
            reports.dividends.items.len(),
            reports.securities.items.len(),
            reports.derivatives.d_ifi.items.len(),
            self.period.year
        );
        reports
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reports {
    pub dividends: DividendReport,
    pub securities: SecuritiesReport,
    pub derivatives: DerivativesReport,
}
