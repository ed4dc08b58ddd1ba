use std::path::{Path, PathBuf};

use crate::cli::open_db;
use crate::error::{Result, TaxonError};
use crate::export::{ExportFormat, SpreadsheetExporter};
use crate::repository::SqliteRepository;
use crate::settings::load_settings;
use crate::store::CategoryStore;

fn default_output_path(format: ExportFormat) -> PathBuf {
    let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
    load_settings()
        .exports_dir()
        .join(format!("categories-{stamp}.{}", format.extension()))
}

/// Write `bytes` to `path`, creating parent directories as needed.
pub(crate) fn write_document(path: &Path, bytes: &[u8]) -> Result<()> {
    let to_transfer = |e: std::io::Error| TaxonError::TransferFailure(format!("{}: {e}", path.display()));
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir).map_err(to_transfer)?;
        }
    }
    std::fs::write(path, bytes).map_err(to_transfer)
}

pub fn run(db: Option<&Path>, output: Option<PathBuf>, format: Option<ExportFormat>) -> Result<()> {
    let settings = load_settings();
    let format = format.unwrap_or(settings.export_format);
    let conn = open_db(db)?;
    let store = CategoryStore::new(SqliteRepository::new(&conn));

    let bytes = SpreadsheetExporter::new(&store).export(format, settings.max_payload_bytes)?;
    let path = output.unwrap_or_else(|| default_output_path(format));
    write_document(&path, &bytes)?;

    println!("Exported categories to {}", path.display());
    Ok(())
}
