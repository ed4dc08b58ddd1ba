use std::path::Path;

use crate::cli::open_db;
use crate::error::Result;
use crate::render::TreeRenderer;
use crate::repository::SqliteRepository;
use crate::store::CategoryStore;

pub fn run(db: Option<&Path>) -> Result<()> {
    let conn = open_db(db)?;
    let store = CategoryStore::new(SqliteRepository::new(&conn));
    print!("{}", TreeRenderer::new(&store).render_tree()?);
    Ok(())
}
