use colored::Colorize;

use crate::error::Result;
use crate::settings::{load_settings, save_settings, settings_file_exists, shellexpand_path};
use crate::store::SqliteStore;

pub fn run(data_dir: Option<String>, owner_name: Option<String>) -> Result<()> {
    let mut settings = load_settings();
    if let Some(dir) = data_dir {
        settings.data_dir = shellexpand_path(&dir);
    }
    if let Some(name) = owner_name {
        settings.owner_name = name;
    }

    let dir = std::path::PathBuf::from(&settings.data_dir);
    std::fs::create_dir_all(&dir)?;
    let db_path = dir.join("raccoon.db");
    let fresh = !db_path.exists();
    // Opening creates the schema.
    SqliteStore::open(&db_path)?;

    let first_run = !settings_file_exists();
    save_settings(&settings)?;

    if fresh {
        println!("{} Ledger created at {}", "✓".green(), db_path.display());
    } else {
        println!("{} Ledger already exists at {}", "✓".green(), db_path.display());
    }
    if first_run {
        println!(
            "Set the {} environment variable to enable the assistant's language model.",
            settings.api_key_env
        );
        println!("Then try: raccoon chat --message \"lunch 80\"");
    }
    Ok(())
}
