//! Excel importer implementation - XLSForm workbook (.xlsx) → sheets

use crate::core::ordering::SheetKind;
use crate::error::{StructureError, YxfResult};
use crate::types::{FormSheets, Row, Sheet};
use calamine::{Data, Range, Reader, Xlsx};
use std::io::Cursor;
use tracing::debug;

/// Reads the `survey`, `choices` and `settings` sheets of a workbook.
/// Any other sheet is ignored.
pub struct ExcelImporter<'a> {
    bytes: &'a [u8],
}

impl<'a> ExcelImporter<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    /// Import the workbook. `survey` is required, the other two are optional.
    pub fn import(&self) -> YxfResult<FormSheets> {
        let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(self.bytes))?;
        let sheet_names = workbook.sheet_names().to_owned();

        let mut read = |kind: SheetKind| -> YxfResult<Option<Sheet>> {
            let name = kind.sheet_name();
            if !sheet_names.iter().any(|n| n == name) {
                return Ok(None);
            }
            let range = workbook.worksheet_range(name)?;
            Ok(Some(read_sheet(name, &range)?))
        };

        let survey = read(SheetKind::Survey)?
            .ok_or_else(|| StructureError::new("survey", "workbook has no survey sheet"))?;
        let choices = read(SheetKind::Choices)?;
        let settings = read(SheetKind::Settings)?;

        Ok(FormSheets {
            survey,
            choices,
            settings,
        })
    }
}

/// Cell contents as the text a form author typed. Empty cells have none.
fn cell_text(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty => None,
        Data::String(s) if s.is_empty() => None,
        Data::String(s) => Some(s.clone()),
        Data::Int(i) => Some(i.to_string()),
        // Excel stores every number as a float; `3` should not come back as `3.0`
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => Some(format!("{}", *f as i64)),
        Data::Float(f) => Some(f.to_string()),
        Data::Bool(b) => Some(if *b { "TRUE" } else { "FALSE" }.to_string()),
        other => Some(other.to_string()),
    }
}

/// The first row of the used range is the header. Rows keep their spreadsheet
/// row number; fully blank rows are dropped.
fn read_sheet(name: &str, range: &Range<Data>) -> Result<Sheet, StructureError> {
    let Some((first_row, _)) = range.start() else {
        return Ok(Sheet::new(name, Vec::new(), Vec::new()));
    };
    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return Ok(Sheet::new(name, Vec::new(), Vec::new()));
    };
    let header_number = first_row as usize + 1;

    let headers: Vec<Option<String>> = header.iter().map(cell_text).collect();
    let mut columns: Vec<String> = Vec::new();
    for column in headers.iter().flatten() {
        if columns.contains(column) {
            return Err(StructureError::new(name, "duplicate column header")
                .at_row(header_number)
                .at_column(column.as_str()));
        }
        columns.push(column.clone());
    }

    let mut content = Vec::new();
    for (offset, cells) in rows.enumerate() {
        let number = header_number + offset + 1;
        let mut row = Row::numbered(number);
        for (index, cell) in cells.iter().enumerate() {
            let Some(text) = cell_text(cell) else {
                continue;
            };
            match headers.get(index).and_then(Option::as_ref) {
                Some(column) => row.set(column.clone(), text),
                None => {
                    return Err(StructureError::new(
                        name,
                        format!("cell {text:?} has no column header"),
                    )
                    .at_row(number));
                }
            }
        }
        if !row.is_empty() {
            content.push(row);
        }
    }

    debug!(sheet = name, rows = content.len(), columns = columns.len(), "read sheet");
    Ok(Sheet::new(name, columns, content))
}
