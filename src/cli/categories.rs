use std::collections::HashMap;
use std::path::Path;

use comfy_table::{Cell, Table};

use crate::cli::open_db;
use crate::error::Result;
use crate::repository::SqliteRepository;
use crate::store::CategoryStore;

pub fn add(db: Option<&Path>, name: &str, child: Option<&str>) -> Result<()> {
    let conn = open_db(db)?;
    let store = CategoryStore::new(SqliteRepository::new(&conn));
    match child {
        Some(child) => {
            let cat = store.add_child(name, child)?;
            println!("Added category: {} (under {})", cat.name, name.trim());
        }
        None => {
            let cat = store.add_root(name)?;
            println!("Added root category: {}", cat.name);
        }
    }
    Ok(())
}

pub fn remove(db: Option<&Path>, name: &str) -> Result<()> {
    let conn = open_db(db)?;
    let store = CategoryStore::new(SqliteRepository::new(&conn));
    let removed = store.remove(name)?;
    let noun = if removed == 1 { "category" } else { "categories" };
    println!("Removed {}: {removed} {noun}", name.trim());
    Ok(())
}

pub fn list(db: Option<&Path>) -> Result<()> {
    let conn = open_db(db)?;
    let store = CategoryStore::new(SqliteRepository::new(&conn));
    let categories = store.list_all()?;
    let names: HashMap<i64, &str> = categories.iter().map(|c| (c.id, c.name.as_str())).collect();

    let mut table = Table::new();
    table.set_header(vec!["ID", "Name", "Parent"]);
    for cat in &categories {
        let parent = if cat.is_root() {
            "(root)"
        } else {
            cat.parent_id
                .and_then(|p| names.get(&p).copied())
                .unwrap_or_default()
        };
        table.add_row(vec![Cell::new(cat.id), Cell::new(&cat.name), Cell::new(parent)]);
    }
    println!("Categories\n{table}");
    Ok(())
}
