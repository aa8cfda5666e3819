//! FILENAME: core/persistence/src/xlsx_writer.rs

use crate::{PersistenceError, SavedReport, META_SHEET_NAME, REPORT_SHEET_NAME, SKIPPED_SHEET_NAME};
use dataset::Value;
use rust_xlsxwriter::{Format, Workbook as XlsxWorkbook, Worksheet};
use std::path::Path;

/// Longest text Excel accepts in one cell; the metadata JSON is split into
/// chunks below it, one per row.
pub(crate) const META_CHUNK_CHARS: usize = 32_000;

pub fn save_report_xlsx(saved: &SavedReport, path: &Path) -> Result<(), PersistenceError> {
    let mut xlsx = XlsxWorkbook::new();
    let header = Format::new().set_bold();
    let report = &saved.report;

    // Report table
    {
        let table = report.to_table();
        let worksheet = xlsx.add_worksheet();
        worksheet.set_name(REPORT_SHEET_NAME)?;

        for (col, name) in table.columns.iter().enumerate() {
            worksheet.write_string_with_format(0, col as u16, name, &header)?;
        }
        for (i, cells) in table.rows.iter().enumerate() {
            let row = (i + 1) as u32;
            for (col, value) in cells.iter().enumerate() {
                write_value(worksheet, row, col as u16, value)?;
            }
        }

        // The combination label is usually the widest column
        let widest = table
            .rows
            .iter()
            .filter_map(|r| r.first())
            .map(|v| v.display_value().chars().count())
            .max()
            .unwrap_or(0);
        worksheet.set_column_width(0, (widest.max(12) + 2) as f64)?;
    }

    // Skipped slices
    if report.skipped_count() > 0 {
        let worksheet = xlsx.add_worksheet();
        worksheet.set_name(SKIPPED_SHEET_NAME)?;
        for (col, name) in ["combination", "n_rows", "reason"].iter().enumerate() {
            worksheet.write_string_with_format(0, col as u16, *name, &header)?;
        }
        for (i, skipped) in report.skipped().iter().enumerate() {
            let row = (i + 1) as u32;
            worksheet.write_string(row, 0, skipped.combination.label())?;
            worksheet.write_number(row, 1, skipped.n_rows as f64)?;
            worksheet.write_string(row, 2, &skipped.reason)?;
        }
    }

    // Hidden metadata sheet
    {
        let json = serde_json::to_string(saved)?;
        let worksheet = xlsx.add_worksheet();
        worksheet.set_name(META_SHEET_NAME)?;
        worksheet.set_hidden(true);
        let chars: Vec<char> = json.chars().collect();
        for (i, chunk) in chars.chunks(META_CHUNK_CHARS).enumerate() {
            let text: String = chunk.iter().collect();
            worksheet.write_string(i as u32, 0, text)?;
        }
    }

    xlsx.save(path)?;
    Ok(())
}

fn write_value(worksheet: &mut Worksheet, row: u32, col: u16, value: &Value) -> Result<(), PersistenceError> {
    match value {
        Value::Empty => {}
        Value::Number(n) if n.is_finite() => {
            worksheet.write_number(row, col, *n)?;
        }
        // NaN and infinities have no cell representation
        Value::Number(_) => {
            worksheet.write_string(row, col, value.display_value())?;
        }
        Value::Text(s) => {
            worksheet.write_string(row, col, s)?;
        }
        Value::Boolean(b) => {
            worksheet.write_boolean(row, col, *b)?;
        }
    }
    Ok(())
}
