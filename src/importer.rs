use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use tracing::{debug, info, warn};

use crate::error::{Result, TaxonError};
use crate::models::{Category, ImportSummary, NewCategory, ParsedRow};
use crate::repository::CategoryRepository;
use crate::store::CategoryStore;

pub const DEFAULT_MAX_PAYLOAD_BYTES: u64 = 50_000_000;

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

// ---------------------------------------------------------------------------
// Sheet reading: CSV or XLSX into a uniform grid of cells
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Number(f64),
    Text(String),
    /// Any other typed cell (boolean, date, formula error); holds a description.
    Other(String),
}

impl Cell {
    fn is_blank(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetFormat {
    Csv,
    Xlsx,
}

/// One physical sheet row; `number` is 1-based, the header being row 1.
#[derive(Debug, Clone)]
pub struct SheetRow {
    pub number: usize,
    pub format: SheetFormat,
    pub cells: Vec<Cell>,
}

impl SheetRow {
    fn cell(&self, idx: usize) -> &Cell {
        self.cells.get(idx).unwrap_or(&Cell::Empty)
    }

    fn is_blank(&self) -> bool {
        self.cells.iter().all(Cell::is_blank)
    }
}

/// Data rows of the first sheet. The header (sheet row 1) is not returned.
pub fn read_sheet(bytes: &[u8]) -> Result<Vec<SheetRow>> {
    if bytes.starts_with(ZIP_MAGIC) {
        read_xlsx(bytes)
    } else {
        read_csv(bytes)
    }
}

fn read_csv(bytes: &[u8]) -> Result<Vec<SheetRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);
    let mut rows = Vec::new();
    for (i, result) in rdr.records().enumerate() {
        let record = result?;
        // Empty lines produce no record, so number rows by source line.
        let number = record.position().map_or(i + 2, |p| p.line() as usize);
        let cells = record
            .iter()
            .map(|field| {
                if field.trim().is_empty() {
                    Cell::Empty
                } else {
                    Cell::Text(field.to_string())
                }
            })
            .collect();
        rows.push(SheetRow {
            number,
            format: SheetFormat::Csv,
            cells,
        });
    }
    Ok(rows)
}

#[cfg(feature = "xlsx")]
fn read_xlsx(bytes: &[u8]) -> Result<Vec<SheetRow>> {
    use calamine::{Data, Reader, Xlsx};

    let mut workbook: Xlsx<_> = Xlsx::new(std::io::Cursor::new(bytes))
        .map_err(|e| TaxonError::Spreadsheet(format!("Failed to open XLSX: {e}")))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| TaxonError::Spreadsheet("workbook has no worksheets".into()))?
        .map_err(|e| TaxonError::Spreadsheet(format!("Failed to read worksheet: {e}")))?;

    // The used range may not start at A1; keep absolute row numbers and
    // column positions.
    let (start_row, start_col) = range
        .start()
        .map(|(r, c)| (r as usize, c as usize))
        .unwrap_or((0, 0));

    let mut rows = Vec::new();
    for (i, row) in range.rows().enumerate() {
        // Row 1 is the header even when it is blank and outside the used range.
        let number = start_row + i + 1;
        if number == 1 {
            continue;
        }
        let mut cells = vec![Cell::Empty; start_col];
        cells.extend(row.iter().map(|data| match data {
            Data::Empty => Cell::Empty,
            Data::Int(n) => Cell::Number(*n as f64),
            Data::Float(f) => Cell::Number(*f),
            Data::String(s) if s.trim().is_empty() => Cell::Empty,
            Data::String(s) => Cell::Text(s.clone()),
            Data::Bool(b) => Cell::Other(format!("boolean {b}")),
            Data::Error(e) => Cell::Other(format!("error {e:?}")),
            other => Cell::Other(format!("{other:?}")),
        }));
        rows.push(SheetRow {
            number,
            format: SheetFormat::Xlsx,
            cells,
        });
    }
    Ok(rows)
}

#[cfg(not(feature = "xlsx"))]
fn read_xlsx(_bytes: &[u8]) -> Result<Vec<SheetRow>> {
    Err(TaxonError::Spreadsheet(
        "built without xlsx support; import a CSV file instead".into(),
    ))
}

// ---------------------------------------------------------------------------
// Row parsing
// ---------------------------------------------------------------------------

fn invalid(row: &SheetRow, reason: impl Into<String>) -> TaxonError {
    TaxonError::InvalidRowFormat {
        row: row.number,
        reason: reason.into(),
    }
}

fn whole_number(f: f64) -> Option<i64> {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

fn parse_id(row: &SheetRow) -> Result<i64> {
    match row.cell(0) {
        Cell::Number(f) => whole_number(*f).ok_or_else(|| invalid(row, format!("id {f} is not a whole number"))),
        Cell::Text(s) if row.format == SheetFormat::Xlsx => Err(invalid(
            row,
            format!("id must be a numeric cell, got text {:?}", s.trim()),
        )),
        Cell::Text(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| invalid(row, format!("id must be numeric, got {:?}", s.trim()))),
        Cell::Empty => Err(invalid(row, "id is missing")),
        Cell::Other(desc) => Err(invalid(row, format!("id must be numeric, got {desc}"))),
    }
}

fn parse_name(row: &SheetRow) -> Result<String> {
    match row.cell(1) {
        Cell::Text(s) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        Cell::Empty | Cell::Text(_) => Err(invalid(row, "name is missing")),
        Cell::Number(f) => Err(invalid(row, format!("name must be text, got number {f}"))),
        Cell::Other(desc) => Err(invalid(row, format!("name must be text, got {desc}"))),
    }
}

/// Blank and zero both mean "no parent".
fn parse_parent(row: &SheetRow) -> Result<Option<i64>> {
    let id = match row.cell(2) {
        Cell::Empty => return Ok(None),
        Cell::Number(f) => whole_number(*f)
            .ok_or_else(|| invalid(row, format!("parent_id {f} is not a whole number")))?,
        Cell::Text(s) => {
            let s = s.trim();
            if s.is_empty() {
                return Ok(None);
            }
            s.parse::<i64>()
                .map_err(|_| invalid(row, format!("parent_id must be numeric, got {s:?}")))?
        }
        Cell::Other(desc) => {
            return Err(invalid(row, format!("parent_id must be numeric, got {desc}")))
        }
    };
    Ok((id != 0).then_some(id))
}

/// Parse one data row; fully blank rows yield `None`.
pub fn parse_row(row: &SheetRow) -> Result<Option<ParsedRow>> {
    if row.is_blank() {
        return Ok(None);
    }
    let parsed = ParsedRow {
        row_number: row.number,
        row_id: parse_id(row)?,
        name: parse_name(row)?,
        parent_row_id: parse_parent(row)?,
    };
    debug!(row = parsed.row_number, row_id = parsed.row_id, category = %parsed.name, parent = ?parsed.parent_row_id, "parsed row");
    Ok(Some(parsed))
}

/// Read every data row. Fails on the first malformed row or on a repeated
/// row id.
pub fn parse_rows(bytes: &[u8]) -> Result<Vec<ParsedRow>> {
    let sheet = read_sheet(bytes)?;
    let mut seen = HashSet::new();
    let mut parsed = Vec::new();
    for row in &sheet {
        let Some(p) = parse_row(row)? else {
            continue;
        };
        if !seen.insert(p.row_id) {
            return Err(invalid(row, format!("duplicate id {}", p.row_id)));
        }
        parsed.push(p);
    }
    Ok(parsed)
}

/// Read a file from disk, refusing anything above `limit` bytes before
/// pulling it into memory.
pub fn read_payload(path: &Path, limit: u64) -> Result<Vec<u8>> {
    let meta = std::fs::metadata(path)
        .map_err(|e| TaxonError::TransferFailure(format!("{}: {e}", path.display())))?;
    if meta.len() > limit {
        return Err(TaxonError::SizeLimitExceeded {
            size: meta.len(),
            limit,
        });
    }
    std::fs::read(path).map_err(|e| TaxonError::TransferFailure(format!("{}: {e}", path.display())))
}

// ---------------------------------------------------------------------------
// Reconciliation
// ---------------------------------------------------------------------------

pub struct SpreadsheetImporter<'s, R> {
    store: &'s CategoryStore<R>,
    max_payload_bytes: u64,
}

impl<'s, R: CategoryRepository> SpreadsheetImporter<'s, R> {
    pub fn new(store: &'s CategoryStore<R>) -> Self {
        Self {
            store,
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
        }
    }

    pub fn with_limit(mut self, max_payload_bytes: u64) -> Self {
        self.max_payload_bytes = max_payload_bytes;
        self
    }

    /// Parse `bytes` and merge the rows into the store as one transaction.
    pub fn import(&self, bytes: &[u8]) -> Result<ImportSummary> {
        let size = bytes.len() as u64;
        if size > self.max_payload_bytes {
            return Err(TaxonError::SizeLimitExceeded {
                size,
                limit: self.max_payload_bytes,
            });
        }
        let rows = parse_rows(bytes)?;
        self.reconcile(&rows)
    }

    /// Merge parsed rows into the live store by name. Existing categories are
    /// reused, missing ones created, and parent links set from the rows'
    /// resolved parent rows. Nothing is written unless every step succeeds.
    pub fn reconcile(&self, rows: &[ParsedRow]) -> Result<ImportSummary> {
        // Arena of rows keyed by their file-local id.
        let arena: BTreeMap<i64, &ParsedRow> = rows.iter().map(|r| (r.row_id, r)).collect();

        let resolved: Vec<(&ParsedRow, Option<&ParsedRow>)> = rows
            .iter()
            .map(|row| {
                let parent = row.parent_row_id.and_then(|pid| {
                    let found = arena.get(&pid).copied();
                    if found.is_none() {
                        warn!(
                            row = row.row_number,
                            category = %row.name,
                            parent_row_id = pid,
                            "parent row not in file; importing as root"
                        );
                    }
                    found
                });
                (row, parent)
            })
            .collect();

        self.store.repository().atomically(|repo| {
            let mut names: Vec<String> = Vec::new();
            let mut seen_names = HashSet::new();
            for row in rows {
                if seen_names.insert(row.name.as_str()) {
                    names.push(row.name.clone());
                }
            }

            let mut entities: HashMap<String, Category> = repo
                .find_by_name_in(&names)?
                .into_iter()
                .map(|c| (c.name.clone(), c))
                .collect();
            let reused = entities.len();

            let staged: Vec<NewCategory> = names
                .iter()
                .filter(|n| !entities.contains_key(n.as_str()))
                .map(|n| NewCategory::root(n))
                .collect();
            let created = repo.save_all(&staged)?;
            let created_count = created.len();
            for cat in created {
                entities.insert(cat.name.clone(), cat);
            }

            // Relink. A name repeated across rows maps to one entity; the
            // last row naming a parent for it wins.
            let mut touched: BTreeMap<i64, String> = BTreeMap::new();
            for (row, parent_row) in &resolved {
                let Some(parent_row) = parent_row else {
                    continue;
                };
                let parent_id = entities
                    .get(&parent_row.name)
                    .map(|c| c.id)
                    .ok_or_else(|| TaxonError::NotFound(parent_row.name.clone()))?;
                let child = entities
                    .get_mut(&row.name)
                    .ok_or_else(|| TaxonError::NotFound(row.name.clone()))?;
                if child.parent_id != Some(parent_id) {
                    debug!(category = %child.name, parent = %parent_row.name, "relinking");
                    child.parent_id = Some(parent_id);
                    touched.insert(child.id, child.name.clone());
                }
            }

            let updates: Vec<Category> = touched
                .values()
                .filter_map(|name| entities.get(name).cloned())
                .collect();
            ensure_acyclic(&repo.find_all()?, &updates)?;
            repo.update_all(&updates)?;

            let summary = ImportSummary {
                rows: rows.len(),
                created: created_count,
                reused,
                relinked: updates.len(),
            };
            info!(
                rows = summary.rows,
                created = summary.created,
                reused = summary.reused,
                relinked = summary.relinked,
                "reconciled spreadsheet import"
            );
            Ok(summary)
        })
    }
}

/// Check that applying `updates` over `current` leaves every parent chain
/// ending at a root.
fn ensure_acyclic(current: &[Category], updates: &[Category]) -> Result<()> {
    let mut parent_of: HashMap<i64, Option<i64>> =
        current.iter().map(|c| (c.id, c.parent_id)).collect();
    for u in updates {
        parent_of.insert(u.id, u.parent_id);
    }

    for start in updates {
        let mut visited = HashSet::new();
        let mut cursor = Some(start.id);
        while let Some(id) = cursor {
            if !visited.insert(id) {
                return Err(TaxonError::CycleDetected(start.name.clone()));
            }
            cursor = parent_of.get(&id).copied().flatten();
        }
    }
    Ok(())
}
