use std::path::Path;

use crate::db;
use crate::error::Result;
use crate::fmt::format_bytes;
use crate::repository::SqliteRepository;
use crate::settings::load_settings;
use crate::store::CategoryStore;

pub fn run(db_override: Option<&Path>) -> Result<()> {
    let settings = load_settings();
    let db_path = db_override
        .map(Path::to_path_buf)
        .unwrap_or_else(|| settings.db_path());

    println!("Data dir:   {}", settings.data_dir().display());
    println!("Database:   {}", db_path.display());
    println!("Max upload: {}", format_bytes(settings.max_payload_bytes));

    if db_path.exists() {
        let size = std::fs::metadata(&db_path)?.len();
        println!("DB size:    {}", format_bytes(size));

        let conn = db::open(&db_path)?;
        let store = CategoryStore::new(SqliteRepository::new(&conn));
        let total = store.list_all()?.len();
        let roots = store.list_roots()?.len();

        println!();
        println!("Categories:  {total}");
        println!("Roots:       {roots}");
    } else {
        println!();
        println!("Database not found. Run `taxon init` to set up.");
    }

    Ok(())
}
