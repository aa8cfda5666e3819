//! FILENAME: core/persistence/src/xlsx_reader.rs

use crate::{PersistenceError, SavedReport, META_SHEET_NAME, REPORT_SHEET_NAME};
use calamine::{open_workbook, Data, Reader, Xlsx};
use dataset::Value;
use hotspot_engine::ReportTable;
use std::path::Path;

/// Loads the document stored in the hidden metadata sheet.
pub fn load_report_xlsx(path: &Path) -> Result<SavedReport, PersistenceError> {
    let mut workbook: Xlsx<_> = open_workbook(path)?;
    if !workbook.sheet_names().iter().any(|n| n == META_SHEET_NAME) {
        return Err(PersistenceError::InvalidFormat(format!(
            "workbook has no '{}' sheet; it was not written by save_report_xlsx",
            META_SHEET_NAME
        )));
    }

    let range = workbook
        .worksheet_range(META_SHEET_NAME)
        .map_err(|e| PersistenceError::InvalidFormat(e.to_string()))?;

    let mut json = String::new();
    for row in range.rows() {
        match row.first() {
            Some(Data::String(s)) => json.push_str(s),
            Some(Data::Empty) | None => {}
            Some(other) => {
                return Err(PersistenceError::InvalidFormat(format!(
                    "unexpected metadata cell {:?}",
                    other
                )))
            }
        }
    }

    SavedReport::from_json(&json)
}

/// Reads the visible report sheet back as a table of plain values.
pub fn read_report_sheet(path: &Path) -> Result<ReportTable, PersistenceError> {
    let mut workbook: Xlsx<_> = open_workbook(path)?;
    if !workbook.sheet_names().iter().any(|n| n == REPORT_SHEET_NAME) {
        return Err(PersistenceError::SheetNotFound(REPORT_SHEET_NAME.to_string()));
    }

    let range = workbook
        .worksheet_range(REPORT_SHEET_NAME)
        .map_err(|e| PersistenceError::InvalidFormat(e.to_string()))?;

    let mut rows = range.rows();
    let columns: Vec<String> = match rows.next() {
        Some(header) => header.iter().map(|c| cell_to_value(c).display_value()).collect(),
        None => return Err(PersistenceError::InvalidFormat("report sheet is empty".to_string())),
    };
    let rows = rows.map(|r| r.iter().map(cell_to_value).collect()).collect();

    Ok(ReportTable { columns, rows })
}

fn cell_to_value(cell: &Data) -> Value {
    match cell {
        Data::Empty => Value::Empty,
        Data::String(s) => Value::Text(s.clone()),
        Data::Float(f) => Value::Number(*f),
        Data::Int(i) => Value::Number(*i as f64),
        Data::Bool(b) => Value::Boolean(*b),
        Data::Error(e) => Value::Text(format!("{:?}", e)),
        Data::DateTime(dt) => Value::Number(dt.as_f64()),
        Data::DateTimeIso(s) => Value::Text(s.clone()),
        Data::DurationIso(s) => Value::Text(s.clone()),
    }
}
