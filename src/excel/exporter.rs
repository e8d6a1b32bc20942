//! Excel exporter implementation
//!
//! Writes every cell as text and applies the layout form authors expect:
//! bold frozen header, fitted column widths, monospace code columns, group
//! shading in the comment column and spacer rows between blocks.

use crate::core::ordering::{COMMENT, LIST_NAME, NAME, TYPE};
use crate::core::survey::{Edge, Marker};
use crate::error::YxfResult;
use crate::types::{FormSheets, Row, Sheet};
use rust_xlsxwriter::{Color, Format, Workbook};
use std::path::Path;
use tracing::debug;

/// Columns holding XPath expressions
const CODE_COLUMNS: &[&str] = &[
    "calculation",
    "relevant",
    "constraint",
    "repeat_count",
    "instance_name",
    "choice_filter",
];
const MONOSPACE: &str = "Courier New";
const CODE_COLOR: u32 = 0x19007D;
const NAME_COLOR: u32 = 0xA13B16;
const COMMENT_COLOR: u32 = 0x009C5D;
const NOTE_COLOR: u32 = 0x555555;

const MAX_WIDTH: usize = 60;
const WIDTH_PADDING: usize = 10;
const COMMENT_WIDTH: usize = 2;

/// #c7ffdb; each further top-level group turns the hue by `GROUP_HUE_STEP`
const GROUP_SHADE: Shade = Shade {
    hue: 141.4,
    saturation: 0.22,
    value: 1.0,
};
const GROUP_HUE_STEP: f64 = 20.0;
const NESTED_DARKEN: f64 = 0.05;

/// Excel exporter for XLSForm sheets
pub struct ExcelExporter<'a> {
    sheets: &'a FormSheets,
}

impl<'a> ExcelExporter<'a> {
    pub fn new(sheets: &'a FormSheets) -> Self {
        Self { sheets }
    }

    /// The finished workbook as .xlsx bytes
    pub fn to_bytes(&self) -> YxfResult<Vec<u8>> {
        Ok(self.workbook()?.save_to_buffer()?)
    }

    /// Export the sheets to an Excel .xlsx file
    pub fn export(&self, output_path: &Path) -> YxfResult<()> {
        self.workbook()?.save(output_path)?;
        Ok(())
    }

    fn workbook(&self) -> YxfResult<Workbook> {
        let mut workbook = Workbook::new();
        for sheet in self.sheets.iter() {
            self.export_sheet(&mut workbook, sheet)?;
        }
        Ok(workbook)
    }

    fn export_sheet(&self, workbook: &mut Workbook, sheet: &Sheet) -> YxfResult<()> {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(&sheet.name)?;
        worksheet.set_freeze_panes(1, 0)?;

        let layout = SheetLayout::new(sheet);
        let header = Format::new().set_bold();

        for (index, column) in sheet.columns.iter().enumerate() {
            let col = index as u16;
            let format = if layout.wrap[index] {
                header.clone().set_text_wrap()
            } else {
                header.clone()
            };
            worksheet.write_string_with_format(0, col, column, &format)?;
            if let Some(width) = layout.widths[index] {
                worksheet.set_column_width(col, width as f64)?;
            }
        }

        for (index, row) in sheet.rows.iter().enumerate() {
            let position = layout.positions[index];
            let shade = layout.shades[index];
            for (col, column) in sheet.columns.iter().enumerate() {
                let format = cell_format(column, row, layout.wrap[col], shade);
                match row.get(column).filter(|text| !text.is_empty()) {
                    Some(text) => {
                        worksheet.write_string_with_format(position, col as u16, text, &format)?;
                    }
                    None if column == COMMENT && shade.is_some() => {
                        worksheet.write_blank(position, col as u16, &format)?;
                    }
                    None => {}
                }
            }
        }

        debug!(sheet = %sheet.name, rows = sheet.rows.len(), "wrote sheet");
        Ok(())
    }
}

fn cell_format(column: &str, row: &Row, wrap: bool, shade: Option<Color>) -> Format {
    let mut format = if CODE_COLUMNS.contains(&column) {
        Format::new()
            .set_font_name(MONOSPACE)
            .set_font_color(Color::RGB(CODE_COLOR))
    } else if column == NAME {
        Format::new()
            .set_font_name(MONOSPACE)
            .set_font_color(Color::RGB(NAME_COLOR))
    } else if column == COMMENT {
        Format::new()
            .set_font_name(MONOSPACE)
            .set_font_color(Color::RGB(COMMENT_COLOR))
    } else if row.value(TYPE) == "note" {
        Format::new().set_font_color(Color::RGB(NOTE_COLOR))
    } else {
        Format::new()
    };
    if wrap {
        format = format.set_text_wrap();
    }
    if let (COMMENT, Some(color)) = (column, shade) {
        format = format.set_background_color(color);
    }
    format
}

//==============================================================================
// Layout
//==============================================================================

struct SheetLayout {
    /// Worksheet row (0-based) of each sheet row
    positions: Vec<u32>,
    widths: Vec<Option<usize>>,
    wrap: Vec<bool>,
    /// Comment-column fill of each sheet row
    shades: Vec<Option<Color>>,
}

impl SheetLayout {
    fn new(sheet: &Sheet) -> Self {
        let mut widths = Vec::with_capacity(sheet.columns.len());
        let mut wrap = Vec::with_capacity(sheet.columns.len());
        for column in &sheet.columns {
            let contents = sheet
                .rows
                .iter()
                .filter_map(|row| row.get(column))
                .filter(|text| !text.is_empty())
                .map(|text| text.lines().map(|l| l.chars().count()).max().unwrap_or(0))
                .collect();
            let estimate = column_width(column, contents);
            wrap.push(estimate.is_some_and(|w| w > MAX_WIDTH));
            widths.push(estimate.map(|w| w.min(MAX_WIDTH)));
        }

        let shades = if sheet.columns.iter().any(|c| c == COMMENT) {
            group_shades(&sheet.rows)
        } else {
            vec![None; sheet.rows.len()]
        };

        Self {
            positions: row_positions(&sheet.rows),
            widths,
            wrap,
            shades,
        }
    }
}

/// 75th-percentile content width plus padding; the comment column stays narrow
fn column_width(column: &str, mut widths: Vec<usize>) -> Option<usize> {
    if column == COMMENT {
        return Some(COMMENT_WIDTH);
    }
    if widths.is_empty() {
        return None;
    }
    widths.sort_unstable();
    Some(widths[widths.len() * 3 / 4] + WIDTH_PADDING)
}

fn is_begin(row: &Row) -> bool {
    Marker::parse(row.value(TYPE)).is_some_and(|m| m.edge == Edge::Begin)
}

/// One spacer row before each `begin` row and wherever `list_name` changes,
/// never directly under the header.
fn row_positions(rows: &[Row]) -> Vec<u32> {
    let mut next: u32 = 1;
    let mut list = rows.first().and_then(|r| r.get(LIST_NAME));
    rows.iter()
        .map(|row| {
            let new_list = row.get(LIST_NAME) != list;
            if (is_begin(row) || new_list) && next > 1 {
                next += 1;
            }
            list = row.get(LIST_NAME);
            let position = next;
            next += 1;
            position
        })
        .collect()
}

fn group_shades(rows: &[Row]) -> Vec<Option<Color>> {
    let mut groups = 0u32;
    let mut stack: Vec<Shade> = Vec::new();
    rows.iter()
        .map(|row| {
            let marker = Marker::parse(row.value(TYPE));
            if marker.as_ref().is_some_and(|m| m.edge == Edge::Begin) {
                let shade = match stack.last() {
                    Some(outer) => outer.darker(NESTED_DARKEN),
                    None => {
                        let shade = GROUP_SHADE.rotate(GROUP_HUE_STEP * f64::from(groups));
                        groups += 1;
                        shade
                    }
                };
                stack.push(shade);
            }
            let color = stack.last().map(|s| Color::RGB(s.rgb()));
            if marker.as_ref().is_some_and(|m| m.edge == Edge::End) {
                stack.pop();
            }
            color
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Shade {
    /// Degrees
    hue: f64,
    saturation: f64,
    value: f64,
}

impl Shade {
    fn rotate(self, degrees: f64) -> Self {
        Self {
            hue: (self.hue + degrees) % 360.0,
            ..self
        }
    }

    fn darker(self, amount: f64) -> Self {
        Self {
            value: (self.value - amount).max(0.0),
            ..self
        }
    }

    fn rgb(self) -> u32 {
        let chroma = self.value * self.saturation;
        let sector = self.hue / 60.0;
        let x = chroma * (1.0 - (sector % 2.0 - 1.0).abs());
        let (r, g, b) = match sector as u32 {
            0 => (chroma, x, 0.0),
            1 => (x, chroma, 0.0),
            2 => (0.0, chroma, x),
            3 => (0.0, x, chroma),
            4 => (x, 0.0, chroma),
            _ => (chroma, 0.0, x),
        };
        let m = self.value - chroma;
        let channel = |v: f64| ((v + m) * 255.0).round() as u32;
        (channel(r) << 16) | (channel(g) << 8) | channel(b)
    }
}
