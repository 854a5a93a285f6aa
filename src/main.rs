mod cli;

use anyhow::Result;
use clap::Parser;

use cli::{dispatch, Cli};

fn main() -> Result<()> {
    let cli = Cli::parse();
    flurry::logging::init_logging(cli.verbose);
    dispatch(cli)
}
