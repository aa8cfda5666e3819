//! FILENAME: core/persistence/src/lib.rs
//! Hot Spot Persistence Module
//!
//! Saves and loads analysis reports. Two formats:
//! - JSON: the `SavedReport` document as is.
//! - XLSX: a readable "Report" sheet (plus "Skipped" when slices were
//!   skipped) and a hidden metadata sheet carrying the same JSON document,
//!   so a workbook can be loaded back without parsing the visible cells.

mod error;
mod xlsx_reader;
mod xlsx_writer;

pub use error::PersistenceError;
pub use xlsx_reader::{load_report_xlsx, read_report_sheet};
pub use xlsx_writer::save_report_xlsx;

use hotspot_engine::{HotSpotDefinition, Report};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

// ============================================================================
// SHEET NAMES
// ============================================================================

/// Visible sheet holding the report table.
pub const REPORT_SHEET_NAME: &str = "Report";

/// Visible sheet listing skipped slices (only written when there are any).
pub const SKIPPED_SHEET_NAME: &str = "Skipped";

/// Hidden metadata sheet name for storing the full document in XLSX files.
/// This sheet is written during save and read back during load.
pub const META_SHEET_NAME: &str = "_hotspot_meta";

/// Current document version. Newer documents are rejected on load.
pub const FORMAT_VERSION: u32 = 1;

// ============================================================================
// SAVED REPORT
// ============================================================================

/// A report together with the definition that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedReport {
    pub version: u32,
    #[serde(default)]
    pub definition: Option<HotSpotDefinition>,
    pub report: Report,
}

impl SavedReport {
    pub fn new(report: Report) -> Self {
        Self {
            version: FORMAT_VERSION,
            definition: None,
            report,
        }
    }

    pub fn with_definition(mut self, definition: HotSpotDefinition) -> Self {
        self.definition = Some(definition);
        self
    }

    pub fn to_json(&self) -> Result<String, PersistenceError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, PersistenceError> {
        let saved: SavedReport = serde_json::from_str(json)?;
        if saved.version > FORMAT_VERSION {
            return Err(PersistenceError::InvalidFormat(format!(
                "report version {} is newer than supported version {}",
                saved.version, FORMAT_VERSION
            )));
        }
        Ok(saved)
    }
}

// ============================================================================
// JSON FILES
// ============================================================================

pub fn save_report_json(saved: &SavedReport, path: &Path) -> Result<(), PersistenceError> {
    fs::write(path, saved.to_json()?)?;
    Ok(())
}

pub fn load_report_json(path: &Path) -> Result<SavedReport, PersistenceError> {
    SavedReport::from_json(&fs::read_to_string(path)?)
}
