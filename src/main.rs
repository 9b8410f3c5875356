use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use edavki::cli::Cli;

fn main() -> Result<()> {
    // Logs go to stderr so --json output stays clean
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if cli.no_color {
        colored::control::set_override(false);
    }

    edavki::dispatcher::dispatch(cli)
}
