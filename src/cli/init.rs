use crate::db;
use crate::error::Result;
use crate::repository::SqliteRepository;
use crate::settings::{load_settings, resolve_dir, save_settings};
use crate::store::CategoryStore;

/// Write settings, create the data and export directories, and make sure
/// the database schema exists. Safe to run again.
pub fn run(data_dir: Option<String>) -> Result<()> {
    let mut settings = load_settings();
    if let Some(dir) = data_dir {
        settings.data_dir = resolve_dir(&dir)?.to_string_lossy().to_string();
    }
    save_settings(&settings)?;

    std::fs::create_dir_all(settings.exports_dir())?;
    let conn = db::open(&settings.db_path())?;
    let existing = CategoryStore::new(SqliteRepository::new(&conn)).list_all()?.len();

    println!("Data dir: {}", settings.data_dir().display());
    println!("Database: {} ({existing} categories)", settings.db_path().display());
    Ok(())
}
