pub mod chat;
pub mod init;
pub mod status;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "raccoon", about = "Conversational bookkeeping assistant.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Set up raccoon: choose a data directory and initialize the ledger.
    Init {
        /// Path for raccoon data (default: ~/Documents/raccoon)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
        /// Display name used on recorded entries
        #[arg(long)]
        owner_name: Option<String>,
    },
    /// Talk to the assistant: one message with --message, or a REPL without.
    Chat {
        /// Send a single message and print the reply
        #[arg(long, short)]
        message: Option<String>,
        /// Owner id to book entries under (default: "local")
        #[arg(long)]
        owner: Option<String>,
    },
    /// Show current settings, ledger location and record counts.
    Status,
}
