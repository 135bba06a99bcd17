use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "senbetsu")]
#[command(about = "Rank feed releases, track source health and screen files for import", long_about = None)]
pub struct Cli {
    /// Use this config file instead of the user config
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Raise log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Parse a saved feed document and list its releases, best rated first
    Feed {
        file: PathBuf,
        /// URL the feed was fetched from; decides whether ratings are read
        #[arg(long)]
        source_url: String,
    },
    /// Group the media files under a folder with their companion files
    Files {
        dir: PathBuf,
        /// Do not descend into subfolders
        #[arg(long)]
        top_level: bool,
    },
    /// Show recorded source health
    Status {
        /// Only this source
        #[arg(long)]
        source: Option<i64>,
    },
}
