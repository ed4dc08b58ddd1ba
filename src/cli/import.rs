use std::path::Path;

use crate::cli::open_db;
use crate::error::Result;
use crate::importer::{read_payload, SpreadsheetImporter};
use crate::repository::SqliteRepository;
use crate::settings::load_settings;
use crate::store::CategoryStore;

pub fn run(db: Option<&Path>, file: &Path) -> Result<()> {
    let limit = load_settings().max_payload_bytes;
    let bytes = read_payload(file, limit)?;

    let conn = open_db(db)?;
    let store = CategoryStore::new(SqliteRepository::new(&conn));
    let summary = SpreadsheetImporter::new(&store)
        .with_limit(limit)
        .import(&bytes)?;

    println!(
        "{} rows: {} created, {} reused, {} relinked",
        summary.rows, summary.created, summary.reused, summary.relinked
    );
    Ok(())
}
