//! Routes parsed CLI commands to the pipeline.
//!
//! Configuration file values are merged with flags here: boolean flags can
//! only switch an option on, value flags replace what the file says.

use anyhow::{anyhow, Context, Result};
use chrono::{Local, NaiveDate};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::cli::formatters;
use crate::cli::{Cli, Commands, RatesCommands, StatementArgs};
use crate::config::Config;
use crate::importers::ImportOptions;
use crate::lookup::LookupTables;
use crate::pipeline::{self, Form, ReportRequest};
use crate::rates::ecb;
use crate::rates::CurrencyRateIndex;
use crate::reports::{prepare, AssemblyOptions, ReportPeriod};

/// Route a parsed command line to its handler
pub fn dispatch(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref())?;
    let json_output = cli.json;

    match cli.command {
        Commands::Report {
            statement,
            forms,
            tax_number,
            treaty_relief,
            out_dir,
        } => dispatch_report(
            &config,
            statement,
            forms,
            tax_number,
            treaty_relief,
            out_dir,
            json_output,
        ),
        Commands::Preview { statement } => dispatch_preview(&config, statement, json_output),
        Commands::Rates { action } => dispatch_rates(&config, action, json_output),
    }
}

fn period_for(year: Option<i32>) -> ReportPeriod {
    match year {
        Some(year) => ReportPeriod::new(year),
        None => ReportPeriod::previous_year(Local::now().date_naive()),
    }
}

fn assembly_options(config: &Config, statement: &StatementArgs, treaty_relief: bool) -> AssemblyOptions {
    AssemblyOptions {
        compact_dividends: statement.compact_dividends || config.compact_dividends,
        compact_positions: statement.compact_positions || config.compact_positions,
        treaty_relief: treaty_relief || config.treaty_relief,
    }
}

fn rate_index(config: &Config, rates: Option<&Path>) -> Result<CurrencyRateIndex> {
    pipeline::build_index(&config.rate_feed(), rates, config.rate_lookback_days)
}

fn lookup_tables(config: &Config) -> Result<LookupTables> {
    LookupTables::load(
        config.countries_file.as_deref(),
        config.addresses_file.as_deref(),
        config.treaties_file.as_deref(),
    )
}

/// Flag, then config file, then the statement's own directory
fn output_dir(config: &Config, flag: Option<PathBuf>, input: &Path) -> PathBuf {
    flag.or_else(|| config.output_dir.clone())
        .unwrap_or_else(|| match input.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        })
}

fn dispatch_report(
    config: &Config,
    statement: StatementArgs,
    forms: Vec<Form>,
    tax_number: Option<u32>,
    treaty_relief: bool,
    out_dir: Option<PathBuf>,
    json_output: bool,
) -> Result<()> {
    let request = ReportRequest {
        out_dir: output_dir(config, out_dir, &statement.file),
        forms,
        tax_number: tax_number.or(config.tax_number),
        period: period_for(statement.year),
        options: assembly_options(config, &statement, treaty_relief),
        import: ImportOptions {
            strict: statement.strict,
        },
        input: statement.file.clone(),
    };
    info!(
        "Preparing {} declarations from {:?}",
        request.period.year, request.input
    );

    let tables = lookup_tables(config)?;
    let index = rate_index(config, statement.rates.as_deref())?;
    let outcome = pipeline::run_report(&request, &index, &tables)?;

    if json_output {
        let written: Vec<String> = outcome
            .written
            .iter()
            .map(|p| p.display().to_string())
            .collect();
        println!(
            "{}",
            serde_json::json!({ "written": written, "rejected_rows": outcome.rejected })
        );
    } else {
        print!("{}", formatters::format_written(&outcome.written, outcome.rejected));
    }
    Ok(())
}

fn dispatch_preview(config: &Config, statement: StatementArgs, json_output: bool) -> Result<()> {
    let index = rate_index(config, statement.rates.as_deref())?;
    let converted = pipeline::load_statement(
        &statement.file,
        ImportOptions {
            strict: statement.strict,
        },
        &index,
    )?;
    let prepared = prepare(
        converted.positions,
        converted.dividends,
        assembly_options(config, &statement, false),
        period_for(statement.year),
    );

    if json_output {
        println!("{}", formatters::format_preview_json(&prepared, converted.rejected));
    } else {
        print!("{}", formatters::format_preview(&prepared, converted.rejected));
    }
    Ok(())
}

fn dispatch_rates(config: &Config, action: RatesCommands, json_output: bool) -> Result<()> {
    match action {
        RatesCommands::Update => {
            let feed = config.rate_feed();
            let path = ecb::refresh_rates_csv(&feed, true)?;
            let index = pipeline::build_index(&feed, Some(&path), config.rate_lookback_days)?;
            if json_output {
                println!(
                    "{}",
                    serde_json::json!({
                        "path": path.display().to_string(),
                        "samples": index.len(),
                        "latest": index.latest(),
                    })
                );
            } else {
                print!(
                    "{}",
                    formatters::format_rates_updated(&path, index.len(), Some(index.latest()))
                );
            }
            Ok(())
        }
        RatesCommands::Lookup { date, rates } => {
            let date = parse_cli_date(&date)?;
            let index = rate_index(config, rates.as_deref())?;
            let sample = index.sample_as_of(date)?;
            if json_output {
                println!("{}", formatters::format_rate_lookup_json(date, sample));
            } else {
                print!("{}", formatters::format_rate_lookup(date, sample));
            }
            Ok(())
        }
    }
}

/// Accept ISO dates as well as the Slovenian `DD.MM.YYYY`
fn parse_cli_date(input: &str) -> Result<NaiveDate> {
    let input = input.trim();
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(input, "%d.%m.%Y"))
        .map_err(|_| anyhow!("Invalid date '{}'; use YYYY-MM-DD or DD.MM.YYYY", input))
        .context("Failed to parse date argument")
}
