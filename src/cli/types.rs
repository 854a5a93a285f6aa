use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "flurry")]
#[command(about = "Accumulating snowfall shared by every launch on this machine", long_about = None)]
#[command(version)]
#[command(before_help = flurry::LOGO)]
#[command(subcommand_help_heading = "Commands")]
pub struct Cli {
    /// Config file (default: <config dir>/flurry/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Debug logging for flurry itself (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the scene, or join the one already running as a new session
    Run {
        /// Leave the scene once this file grows
        #[arg(short, long)]
        watch: Option<PathBuf>,

        /// Melt and exit after this many seconds
        #[arg(short, long)]
        duration: Option<f64>,

        /// Do not draw to the terminal
        #[arg(long)]
        headless: bool,
    },

    /// Show whether a scene is running and which process owns it
    Status {
        /// Print machine-readable JSON
        #[arg(long)]
        json: bool,
    },

    /// Ask the running scene to melt away and exit
    Stop,

    /// Generate shell completions
    Completions {
        /// Target shell
        shell: Shell,
    },
}
