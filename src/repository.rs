use rusqlite::{Connection, Row};

use crate::error::{Result, TaxonError};
use crate::models::{Category, NewCategory};

// SQLite's default bound-parameter limit is 999 on older builds.
const IN_CLAUSE_CHUNK: usize = 500;

/// Persistence contract the category core is written against. Listing
/// methods return categories in ascending id order.
pub trait CategoryRepository {
    fn save(&self, category: &NewCategory) -> Result<Category>;

    fn save_all(&self, categories: &[NewCategory]) -> Result<Vec<Category>> {
        categories.iter().map(|c| self.save(c)).collect()
    }

    /// Write back name and parent of already-persisted categories.
    fn update_all(&self, categories: &[Category]) -> Result<()>;

    fn delete(&self, category: &Category) -> Result<()>;

    fn find_by_name(&self, name: &str) -> Result<Option<Category>>;

    fn exists_by_name(&self, name: &str) -> Result<bool>;

    fn find_all_by_parent_is_null(&self) -> Result<Vec<Category>>;

    fn find_children(&self, parent_id: i64) -> Result<Vec<Category>>;

    fn find_by_name_in(&self, names: &[String]) -> Result<Vec<Category>>;

    fn find_all(&self) -> Result<Vec<Category>>;

    /// Run `f` as one unit: every write inside becomes visible together on
    /// `Ok`, none of them on `Err`.
    fn atomically<T, F>(&self, f: F) -> Result<T>
    where
        Self: Sized,
        F: FnOnce(&Self) -> Result<T>;
}

pub struct SqliteRepository<'c> {
    conn: &'c Connection,
}

impl<'c> SqliteRepository<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    fn query(&self, sql: &str, params: impl rusqlite::Params) -> Result<Vec<Category>> {
        let mut stmt = self.conn.prepare_cached(sql)?;
        let rows = stmt
            .query_map(params, category_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

fn category_from_row(row: &Row<'_>) -> rusqlite::Result<Category> {
    Ok(Category {
        id: row.get(0)?,
        name: row.get(1)?,
        parent_id: row.get(2)?,
    })
}

impl CategoryRepository for SqliteRepository<'_> {
    fn save(&self, category: &NewCategory) -> Result<Category> {
        let mut stmt = self
            .conn
            .prepare_cached("INSERT INTO categories (name, parent_id) VALUES (?1, ?2)")?;
        stmt.execute(rusqlite::params![category.name, category.parent_id])
            .map_err(|e| match e {
                rusqlite::Error::SqliteFailure(err, _)
                    if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
                {
                    TaxonError::DuplicateName(category.name.clone())
                }
                other => TaxonError::Db(other),
            })?;
        Ok(Category {
            id: self.conn.last_insert_rowid(),
            name: category.name.clone(),
            parent_id: category.parent_id,
        })
    }

    fn update_all(&self, categories: &[Category]) -> Result<()> {
        let mut stmt = self
            .conn
            .prepare_cached("UPDATE categories SET name = ?1, parent_id = ?2 WHERE id = ?3")?;
        for cat in categories {
            let updated = stmt.execute(rusqlite::params![cat.name, cat.parent_id, cat.id])?;
            if updated == 0 {
                return Err(TaxonError::NotFound(cat.name.clone()));
            }
        }
        Ok(())
    }

    fn delete(&self, category: &Category) -> Result<()> {
        let deleted = self
            .conn
            .execute("DELETE FROM categories WHERE id = ?1", [category.id])?;
        if deleted == 0 {
            return Err(TaxonError::NotFound(category.name.clone()));
        }
        Ok(())
    }

    fn find_by_name(&self, name: &str) -> Result<Option<Category>> {
        Ok(self
            .query("SELECT id, name, parent_id FROM categories WHERE name = ?1", [name])?
            .into_iter()
            .next())
    }

    fn exists_by_name(&self, name: &str) -> Result<bool> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT 1 FROM categories WHERE name = ?1")?;
        Ok(stmt.exists([name])?)
    }

    fn find_all_by_parent_is_null(&self) -> Result<Vec<Category>> {
        self.query(
            "SELECT id, name, parent_id FROM categories WHERE parent_id IS NULL ORDER BY id",
            [],
        )
    }

    fn find_children(&self, parent_id: i64) -> Result<Vec<Category>> {
        self.query(
            "SELECT id, name, parent_id FROM categories WHERE parent_id = ?1 ORDER BY id",
            [parent_id],
        )
    }

    fn find_by_name_in(&self, names: &[String]) -> Result<Vec<Category>> {
        let mut found = Vec::new();
        for chunk in names.chunks(IN_CLAUSE_CHUNK) {
            let placeholders = vec!["?"; chunk.len()].join(", ");
            let sql = format!(
                "SELECT id, name, parent_id FROM categories WHERE name IN ({placeholders}) ORDER BY id"
            );
            found.extend(self.query(&sql, rusqlite::params_from_iter(chunk.iter()))?);
        }
        found.sort_by_key(|c| c.id);
        Ok(found)
    }

    fn find_all(&self) -> Result<Vec<Category>> {
        self.query("SELECT id, name, parent_id FROM categories ORDER BY id", [])
    }

    fn atomically<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Self) -> Result<T>,
    {
        // Already inside a transaction: join it rather than nesting.
        if !self.conn.is_autocommit() {
            return f(self);
        }
        let tx = self.conn.unchecked_transaction()?;
        let out = f(self)?;
        tx.commit()?;
        Ok(out)
    }
}
