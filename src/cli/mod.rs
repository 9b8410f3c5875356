use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::pipeline::Form;

pub mod formatters;

#[derive(Parser)]
#[command(name = "edavki")]
#[command(
    version,
    about = "Slovenian eDavki tax declarations from eToro account statements"
)]
#[command(
    long_about = "Convert an eToro account statement into the Doh-Div (dividends), Doh-KDVP (securities) and D-IFI (derivatives) declarations, with every amount in EUR at the ECB reference rate of the transaction day."
)]
pub struct Cli {
    /// Disable colorized/ANSI output
    #[arg(long = "no-color", global = true)]
    pub no_color: bool,

    /// Output results in JSON format
    #[arg(long = "json", global = true)]
    pub json: bool,

    /// Configuration file (default: <config dir>/edavki/config.toml)
    #[arg(long = "config", global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every command that reads a statement
#[derive(clap::Args, Debug, Clone, Default)]
pub struct StatementArgs {
    /// Path to the eToro account statement (.xlsx)
    pub file: PathBuf,

    /// Exchange rate CSV to use instead of the ECB feed
    #[arg(long, value_name = "FILE")]
    pub rates: Option<PathBuf>,

    /// Merge same-day dividends from the same payer
    #[arg(long)]
    pub compact_dividends: bool,

    /// Merge positions identical except for their amounts
    #[arg(long)]
    pub compact_positions: bool,

    /// Abort on the first malformed row instead of skipping it
    #[arg(long)]
    pub strict: bool,

    /// Year being declared (default: last year)
    #[arg(long)]
    pub year: Option<i32>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write declaration files for a statement
    Report {
        #[command(flatten)]
        statement: StatementArgs,

        /// Documents to produce; repeat for several (default: all)
        #[arg(long = "form", value_enum)]
        forms: Vec<Form>,

        /// Your Slovenian tax number
        #[arg(long)]
        tax_number: Option<u32>,

        /// Claim double-taxation treaty relief on dividends
        #[arg(long)]
        treaty_relief: bool,

        /// Directory for the output files (default: next to the statement)
        #[arg(long, value_name = "DIR")]
        out_dir: Option<PathBuf>,
    },

    /// Show the converted EUR records without writing anything
    Preview {
        #[command(flatten)]
        statement: StatementArgs,
    },

    /// Exchange rate cache
    Rates {
        #[command(subcommand)]
        action: RatesCommands,
    },
}

#[derive(Subcommand)]
pub enum RatesCommands {
    /// Download the ECB series again, ignoring the cache age
    Update,

    /// Show the rate effective on a date
    Lookup {
        /// Date (YYYY-MM-DD or DD.MM.YYYY)
        date: String,

        /// Rate CSV to use instead of the ECB feed
        #[arg(long, value_name = "FILE")]
        rates: Option<PathBuf>,
    },
}
