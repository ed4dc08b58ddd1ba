/// A persisted node of the category forest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub parent_id: Option<i64>,
}

impl Category {
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// A category staged for insertion; the store assigns the id.
#[derive(Debug, Clone)]
pub struct NewCategory {
    pub name: String,
    pub parent_id: Option<i64>,
}

impl NewCategory {
    pub fn root(name: &str) -> Self {
        Self {
            name: name.to_string(),
            parent_id: None,
        }
    }

    pub fn child(name: &str, parent_id: i64) -> Self {
        Self {
            name: name.to_string(),
            parent_id: Some(parent_id),
        }
    }
}

/// Intermediate representation of one spreadsheet data row before reconciliation.
/// `row_id` is local to the file and unrelated to `Category::id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRow {
    pub row_number: usize,
    pub row_id: i64,
    pub name: String,
    pub parent_row_id: Option<i64>,
}

/// One exported line: `(id, name, parent_id)`, blank parent for roots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRow {
    pub id: i64,
    pub name: String,
    pub parent_id: Option<i64>,
}

impl From<&Category> for ExportRow {
    fn from(cat: &Category) -> Self {
        Self {
            id: cat.id,
            name: cat.name.clone(),
            parent_id: cat.parent_id,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub rows: usize,
    pub created: usize,
    pub reused: usize,
    pub relinked: usize,
}
