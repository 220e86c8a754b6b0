//! IndexSync CLI — cluster administration for the index synchronizer.
//!
//! Checks engine connectivity and health, purges prefixed indexes, and
//! manages the local configuration file.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli)
}
