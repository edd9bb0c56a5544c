use anyhow::Result;
use rusqlite::Connection;
use std::env;
use std::path::Path;
use std::process;

// Use library instead of local modules
use momo_ledger::{count_transactions, process_xml_file, setup_database};

const DEFAULT_DB_PATH: &str = "momo-ledger.db";

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();

    match args.get(1).map(String::as_str) {
        Some("ingest") if args.len() >= 3 => {
            let dump_path = Path::new(&args[2]);
            let db_path = args.get(3).map(String::as_str).unwrap_or(DEFAULT_DB_PATH);
            run_ingest(dump_path, Path::new(db_path))?;
        }
        _ => {
            eprintln!("Usage: momo-ledger ingest <sms-dump.xml> [db-path]");
            eprintln!("       (default db path: {DEFAULT_DB_PATH})");
            process::exit(2);
        }
    }

    Ok(())
}

fn run_ingest(dump_path: &Path, db_path: &Path) -> Result<()> {
    println!("📥 Ingesting SMS dump: {}", dump_path.display());

    let conn = Connection::open(db_path)?;
    setup_database(&conn)?;
    println!("✓ Database initialized with WAL mode: {}", db_path.display());

    let report = process_xml_file(&conn, dump_path)?;

    println!("\nProcessing complete!");
    println!("✓ Successfully processed: {} messages", report.processed);
    println!("✓ Errors/Unprocessed: {} messages", report.failed);
    println!("✓ Database contains {} transactions", count_transactions(&conn)?);

    Ok(())
}
