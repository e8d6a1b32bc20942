//! Excel import/export for XLSForm workbooks
//!
//! This module provides the spreadsheet side of the conversion:
//! - Import: .xlsx bytes → [`FormSheets`](crate::types::FormSheets)
//! - Export: [`FormSheets`](crate::types::FormSheets) → .xlsx with form-friendly styling

mod exporter;
mod importer;

pub use exporter::ExcelExporter;
pub use importer::ExcelImporter;
