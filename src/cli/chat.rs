use std::io::{BufRead, Write};

use chrono::Local;
use colored::Colorize;

use crate::error::{RaccoonError, Result};
use crate::handler::Assistant;
use crate::oracle::{GeminiOracle, LanguageOracle};
use crate::settings::{load_settings, Settings};
use crate::store::SqliteStore;

/// Stands in when no API key is configured. Built-in commands still work;
/// anything needing the model degrades the way an outage would.
struct UnconfiguredOracle;

impl LanguageOracle for UnconfiguredOracle {
    fn infer(&self, _prompt: &str) -> Result<String> {
        Err(RaccoonError::OracleUnavailable(
            "no API key configured".to_string(),
        ))
    }
}

fn build_oracle(settings: &Settings) -> Result<Box<dyn LanguageOracle>> {
    match settings.api_key() {
        Some(key) => Ok(Box::new(GeminiOracle::new(
            &settings.oracle_base_url,
            &settings.oracle_model,
            &key,
        )?)),
        None => {
            eprintln!(
                "{} {} is not set — language features disabled, commands still work.",
                "note:".yellow(),
                settings.api_key_env
            );
            Ok(Box::new(UnconfiguredOracle))
        }
    }
}

pub fn run(message: Option<String>, owner: Option<String>) -> Result<()> {
    let settings = load_settings();
    let db_path = std::path::PathBuf::from(&settings.data_dir).join("raccoon.db");
    if !db_path.exists() {
        println!("Ledger not found. Run `raccoon init` first.");
        return Ok(());
    }
    let store = SqliteStore::open(&db_path)?;
    let oracle = build_oracle(&settings)?;
    let mut assistant = Assistant::new(&store, oracle.as_ref());

    let owner_id = owner.unwrap_or_else(|| "local".to_string());
    let display_name = if settings.owner_name.is_empty() {
        owner_id.clone()
    } else {
        settings.owner_name.clone()
    };

    if let Some(text) = message {
        let reply =
            assistant.handle_message(&text, &owner_id, &display_name, Local::now().naive_local());
        println!("{reply}");
        return Ok(());
    }

    println!("🦝 Raccoon is listening. Type \"help\" for commands, \"exit\" to quit.");
    let stdin = std::io::stdin();
    loop {
        print!("{} ", ">".cyan().bold());
        std::io::stdout().flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
            break;
        }
        let reply =
            assistant.handle_message(line, &owner_id, &display_name, Local::now().naive_local());
        println!("{reply}");
    }
    println!("Bye! 🦝");
    Ok(())
}
