use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "reelsaver")]
#[command(author, version, about = "Telegram bot that re-hosts TikTok and Instagram videos", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Run the bot with long polling (default)
    Run,

    /// Write a full-state export and exit
    Export {
        /// Directory for the export file, defaults to EXPORT_DIR
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print global usage statistics as JSON and exit
    Stats,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
