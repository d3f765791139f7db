use crate::error::Result;
use crate::fmt::format_bytes;
use crate::settings::load_settings;
use crate::store::{LedgerStore, SqliteStore};

pub fn run() -> Result<()> {
    let settings = load_settings();
    let data_dir = std::path::PathBuf::from(&settings.data_dir);
    let db_path = data_dir.join("raccoon.db");

    println!(
        "Owner:      {}",
        if settings.owner_name.is_empty() {
            "(not set)"
        } else {
            &settings.owner_name
        }
    );
    println!("Data dir:   {}", data_dir.display());
    println!("Ledger:     {}", db_path.display());
    println!("Model:      {}", settings.oracle_model);
    println!(
        "API key:    {}",
        if settings.api_key().is_some() {
            format!("set (via {})", settings.api_key_env)
        } else {
            format!("not set (export {})", settings.api_key_env)
        }
    );

    if db_path.exists() {
        let size = std::fs::metadata(&db_path)?.len();
        println!("DB size:    {}", format_bytes(size));

        let store = SqliteStore::open(&db_path)?;
        let records = store.read_all()?.len();
        println!();
        println!("Records:    {records}");
    } else {
        println!();
        println!("Ledger not found. Run `raccoon init` to set up.");
    }

    Ok(())
}
