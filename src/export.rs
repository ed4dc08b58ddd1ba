use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Result, TaxonError};
use crate::models::ExportRow;
use crate::repository::CategoryRepository;
use crate::store::CategoryStore;

pub const HEADERS: [&str; 3] = ["id", "name", "parent_id"];
#[cfg(feature = "xlsx")]
pub const SHEET_NAME: &str = "Categories";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Xlsx,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Xlsx => "xlsx",
        }
    }
}

impl Default for ExportFormat {
    fn default() -> Self {
        if cfg!(feature = "xlsx") {
            Self::Xlsx
        } else {
            Self::Csv
        }
    }
}

pub struct SpreadsheetExporter<'s, R> {
    store: &'s CategoryStore<R>,
}

impl<'s, R: CategoryRepository> SpreadsheetExporter<'s, R> {
    pub fn new(store: &'s CategoryStore<R>) -> Self {
        Self { store }
    }

    /// One row per stored category, reachable from a root or not, in
    /// ascending id order.
    pub fn export_rows(&self) -> Result<Vec<ExportRow>> {
        let all = self.store.list_all()?;
        if all.is_empty() {
            return Err(TaxonError::EmptyStore);
        }
        let mut rows: Vec<ExportRow> = all.iter().map(ExportRow::from).collect();
        rows.sort_by_key(|r| r.id);
        Ok(rows)
    }

    /// Serialize the current store and refuse payloads above `limit` bytes.
    pub fn export(&self, format: ExportFormat, limit: u64) -> Result<Vec<u8>> {
        let rows = self.export_rows()?;
        let bytes = match format {
            ExportFormat::Csv => write_csv(&rows)?,
            ExportFormat::Xlsx => write_xlsx(&rows)?,
        };
        let size = bytes.len() as u64;
        if size > limit {
            return Err(TaxonError::SizeLimitExceeded { size, limit });
        }
        info!(rows = rows.len(), bytes = size, format = format.extension(), "exported categories");
        Ok(bytes)
    }
}

fn parent_cell(parent_id: Option<i64>) -> String {
    parent_id.map(|p| p.to_string()).unwrap_or_default()
}

pub fn write_csv(rows: &[ExportRow]) -> Result<Vec<u8>> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record(HEADERS)?;
    for row in rows {
        wtr.write_record([row.id.to_string(), row.name.clone(), parent_cell(row.parent_id)])?;
    }
    wtr.into_inner().map_err(|e| TaxonError::Io(e.into_error()))
}

#[cfg(feature = "xlsx")]
pub fn write_xlsx(rows: &[ExportRow]) -> Result<Vec<u8>> {
    use rust_xlsxwriter::{Format, Workbook, XlsxError};

    fn build(rows: &[ExportRow]) -> std::result::Result<Vec<u8>, XlsxError> {
        let mut workbook = Workbook::new();
        let bold = Format::new().set_bold();
        let sheet = workbook.add_worksheet();
        sheet.set_name(SHEET_NAME)?;
        for (col, header) in HEADERS.iter().enumerate() {
            sheet.write_string_with_format(0, col as u16, *header, &bold)?;
        }
        for (i, row) in rows.iter().enumerate() {
            let r = (i + 1) as u32;
            sheet.write_number(r, 0, row.id as f64)?;
            sheet.write_string(r, 1, &row.name)?;
            // Parent ids go out as text, blank for roots.
            if let Some(parent) = row.parent_id {
                sheet.write_string(r, 2, parent.to_string())?;
            }
        }
        sheet.autofit();
        workbook.save_to_buffer()
    }

    build(rows).map_err(|e| TaxonError::Spreadsheet(e.to_string()))
}

#[cfg(not(feature = "xlsx"))]
pub fn write_xlsx(_rows: &[ExportRow]) -> Result<Vec<u8>> {
    Err(TaxonError::Spreadsheet(
        "built without xlsx support; use --format csv".into(),
    ))
}
