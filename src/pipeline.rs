//! One run from account statement to declaration files
//!
//! import -> convert to EUR -> sort / compact -> pair -> write

use anyhow::{bail, Result};
use clap::ValueEnum;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::export::{self, DERIVATIVES_FILE, DIVIDENDS_FILE, SECURITIES_FILE};
use crate::importers::{import_etoro, ImportOptions};
use crate::lookup::LookupTables;
use crate::rates::ecb::{self, RateFeed};
use crate::rates::CurrencyRateIndex;
use crate::records::{convert_all, ClosedPosition, DividendRecord};
use crate::reports::{prepare, AssemblyOptions, PreparedRecords, ReportAssembler, ReportPeriod};

/// Output documents a run can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Form {
    /// Doh-Div, dividends
    Div,
    /// Doh-KDVP, disposal of securities
    Kdvp,
    /// D-IFI, derivatives
    Ifi,
    /// Human-readable EUR workbook
    Statement,
    All,
}

impl Form {
    /// Expand `All` and drop duplicates; nothing selected means everything
    pub fn expand(forms: &[Form]) -> Vec<Form> {
        let everything = [Form::Div, Form::Kdvp, Form::Ifi, Form::Statement];
        if forms.is_empty() || forms.contains(&Form::All) {
            return everything.to_vec();
        }
        everything.into_iter().filter(|f| forms.contains(f)).collect()
    }

    pub fn needs_tax_number(&self) -> bool {
        matches!(self, Form::Div | Form::Kdvp | Form::Ifi | Form::All)
    }
}

/// Records read from a statement, already in EUR
#[derive(Debug, Clone, Default)]
pub struct Converted {
    pub positions: Vec<ClosedPosition>,
    pub dividends: Vec<DividendRecord>,
    /// Rows skipped as malformed
    pub rejected: usize,
}

pub fn build_index(feed: &RateFeed, rates_file: Option<&Path>, lookback_days: i64) -> Result<CurrencyRateIndex> {
    let samples = ecb::load_rates(feed, rates_file)?;
    Ok(CurrencyRateIndex::with_horizon(samples, lookback_days)?)
}

/// Import a statement and convert every row with `index`
pub fn load_statement(input: &Path, import: ImportOptions, index: &CurrencyRateIndex) -> Result<Converted> {
    let export = import_etoro(input, import)?;
    let (positions, dividends) = convert_all(&export.positions, &export.dividends, index)?;

    Ok(Converted {
        positions,
        dividends,
        rejected: export.rejected.len(),
    })
}

#[derive(Debug, Clone)]
pub struct ReportRequest {
    pub input: PathBuf,
    pub forms: Vec<Form>,
    pub tax_number: Option<u32>,
    pub period: ReportPeriod,
    pub options: AssemblyOptions,
    pub import: ImportOptions,
    pub out_dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct ReportOutcome {
    pub written: Vec<PathBuf>,
    pub prepared: PreparedRecords,
    pub rejected: usize,
}

pub fn run_report(
    request: &ReportRequest,
    index: &CurrencyRateIndex,
    tables: &LookupTables,
) -> Result<ReportOutcome> {
    let forms = Form::expand(&request.forms);
    let tax_number = match request.tax_number {
        Some(n) => n,
        None if forms.iter().any(Form::needs_tax_number) => {
            bail!("A tax number is required for the declarations; pass --tax-number or set tax_number in the config file")
        }
        None => 0,
    };
    if request.options.treaty_relief && !tables.has_treaties() {
        warn!("Treaty relief requested but no treaties file is configured; relief will be left empty");
    }

    let converted = load_statement(&request.input, request.import, index)?;
    let prepared = prepare(
        converted.positions,
        converted.dividends,
        request.options,
        request.period,
    );
    let assembler = ReportAssembler::new(tax_number, request.period, request.options, tables, tables);

    let mut written = Vec::new();
    for form in &forms {
        let path = match form {
            Form::Div => {
                let report = assembler.dividend_report(&prepared.dividends);
                export::write_json(&request.out_dir, DIVIDENDS_FILE, &report)?
            }
            Form::Kdvp => {
                let report = assembler.securities_report(&prepared.positions);
                export::write_json(&request.out_dir, SECURITIES_FILE, &report)?
            }
            Form::Ifi => {
                let report = assembler.derivatives_report(&prepared.positions);
                export::write_json(&request.out_dir, DERIVATIVES_FILE, &report)?
            }
            Form::Statement => export::write_statement(
                &request.out_dir,
                request.period.year,
                &prepared.positions,
                &prepared.dividends,
            )?,
            Form::All => continue,
        };
        written.push(path);
    }

    info!("Report run finished: {} files written", written.len());
    Ok(ReportOutcome {
        written,
        prepared,
        rejected: converted.rejected,
    })
}
