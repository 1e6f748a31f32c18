use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "world-finder")]
#[command(about = "Find save-game worlds on disk and export structured metadata")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Saves directory to scan (defaults to the game's saves folder).
    #[arg(long, value_name = "DIR")]
    pub saves: Option<PathBuf>,

    /// Export file path for the snapshot document.
    #[arg(long, value_name = "FILE")]
    pub out: Option<PathBuf>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Scan once and print the snapshot document.
    List,
    /// Scan once and write the snapshot document to the export file.
    Export,
    /// Run the recurring scan and export schedulers.
    Watch {
        /// Seconds between scan passes.
        #[arg(long, value_name = "SECS", default_value_t = 5)]
        scan_interval: u64,

        /// Seconds between exports.
        #[arg(long, value_name = "SECS", default_value_t = 5)]
        export_interval: u64,

        /// Stop after this many seconds; run until killed when omitted.
        #[arg(long, value_name = "SECS")]
        duration: Option<u64>,
    },
    /// Resolve a {placeholder} template against one world.
    Resolve {
        /// Template text containing {placeholder} tokens.
        template: String,

        /// World folder name; tokens render as [name] markers when omitted.
        #[arg(short = 'w', long, value_name = "FOLDER")]
        world: Option<String>,
    },
    /// Resolve a single flat lookup token, e.g. worldfinder_world_1_name.
    Lookup { token: String },
    /// Print every placeholder name the template engine can resolve.
    Placeholders,
}
