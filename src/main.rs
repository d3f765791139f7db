mod budget;
mod cli;
mod columns;
mod confirm;
mod error;
mod expr;
mod extract;
mod fmt;
mod handler;
mod intent;
mod models;
mod oracle;
mod registry;
mod reports;
mod settings;
mod store;
mod temporal;

use clap::Parser;

use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init {
            data_dir,
            owner_name,
        } => cli::init::run(data_dir, owner_name),
        Commands::Chat { message, owner } => cli::chat::run(message, owner),
        Commands::Status => cli::status::run(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
