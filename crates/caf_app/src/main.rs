mod app;
mod cli;
mod effects;
mod logging;
mod render;

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<ExitCode> {
    let cli = cli::Cli::parse();
    logging::initialize(cli.log_destination(), cli.log_level());
    app::run(cli)
}
