use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;

use rigquote_cli::{execute, logging, Cli};

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    logging::init(&cli.load_options())?;

    let result = execute(cli);
    println!("{}", result.output);
    Ok(ExitCode::from(result.exit_code))
}
