//! Structure Folder and Unfolder for the `survey` sheet.
//!
//! Folding walks the rows once with an explicit stack of open containers;
//! each container owns its children outright, so the result is a plain tree.
//! Unfolding is a pre-order walk that re-synthesizes the `begin`/`end` rows.

use crate::config::FoldOptions;
use crate::core::columns::{unfold_record, ColumnLayout, ColumnPlan, LanguageOrder};
use crate::core::ordering::{SheetKind, NAME, RESERVED_SURVEY_KEYS, TYPE};
use crate::error::StructureError;
use crate::types::{Item, Record, Sheet};
use std::borrow::Cow;
use tracing::debug;

const SHEET: &str = "survey";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Begin,
    End,
}

/// A `begin <kind>` / `end <kind>` type cell, e.g. `begin group`, `end_repeat`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Marker {
    pub edge: Edge,
    pub kind: String,
    /// ' ' or '_', as written after `begin`/`end`
    pub separator: char,
}

impl Marker {
    pub fn parse(type_cell: &str) -> Option<Marker> {
        let cell = type_cell.trim();
        let (edge, rest) = if cell.get(..5).is_some_and(|p| p.eq_ignore_ascii_case("begin")) {
            (Edge::Begin, &cell[5..])
        } else if cell.get(..3).is_some_and(|p| p.eq_ignore_ascii_case("end")) {
            (Edge::End, &cell[3..])
        } else {
            return None;
        };

        let mut chars = rest.chars();
        let separator = chars.next().filter(|c| *c == ' ' || *c == '_')?;
        let kind = chars.as_str().trim();
        if kind.is_empty() {
            return None;
        }
        Some(Marker {
            edge,
            kind: kind.to_string(),
            separator,
        })
    }

    pub fn closes(&self, begin: &Marker) -> bool {
        self.edge == Edge::End && begin.edge == Edge::Begin && self.kind.eq_ignore_ascii_case(&begin.kind)
    }

    /// `end` spelled with the same separator and kind as this marker
    pub fn closing_type(&self) -> String {
        format!("end{}{}", self.separator, self.kind)
    }
}

/// The end row emitted for a container whose own end row was unremarkable:
/// the closing type plus the container's name.
pub fn canonical_end(begin: &Record, marker: &Marker) -> Record {
    let mut end = Record::new().with(TYPE, marker.closing_type());
    if let Some(name) = begin.get(NAME) {
        end.insert(NAME, name.clone());
    }
    end
}

struct OpenContainer {
    item: Item,
    marker: Marker,
    row: usize,
}

fn attach(stack: &mut [OpenContainer], root: &mut Vec<Item>, item: Item) {
    match stack.last_mut() {
        Some(open) => open.item.children.push(item),
        None => root.push(item),
    }
}

/// Fold the survey rows into a tree of items
pub fn fold_survey(sheet: &Sheet, options: &FoldOptions) -> Result<Vec<Item>, StructureError> {
    let layout = ColumnLayout::for_sheet(sheet, options)?;
    if let Some(reserved) = layout
        .attribute_names()
        .find(|name| RESERVED_SURVEY_KEYS.contains(name))
    {
        return Err(StructureError::new(SHEET, "column name is reserved").at_column(reserved));
    }

    let mut root: Vec<Item> = Vec::new();
    let mut stack: Vec<OpenContainer> = Vec::new();

    for (index, row) in sheet.rows.iter().enumerate() {
        let number = row.number.unwrap_or(index + 2);
        let record = layout.fold_row(row);
        let marker = record.text(TYPE).and_then(Marker::parse);

        match marker {
            Some(marker) if marker.edge == Edge::Begin => {
                stack.push(OpenContainer {
                    item: Item::container(record, Vec::new()),
                    marker,
                    row: number,
                });
            }
            Some(marker) => {
                let type_cell = record.text(TYPE).unwrap_or_default().to_string();
                let Some(open) = stack.pop() else {
                    return Err(StructureError::new(
                        SHEET,
                        format!("\"{type_cell}\" without a matching begin {}", marker.kind),
                    )
                    .at_row(number)
                    .at_column(TYPE));
                };
                if !marker.closes(&open.marker) {
                    return Err(StructureError::new(
                        SHEET,
                        format!(
                            "\"{type_cell}\" does not match \"begin {}\" opened at row {}",
                            open.marker.kind, open.row
                        ),
                    )
                    .at_row(number)
                    .at_column(TYPE));
                }
                let mut item = open.item;
                if record != canonical_end(&item.record, &open.marker) {
                    item.end = Some(record);
                }
                attach(&mut stack, &mut root, item);
            }
            None => attach(&mut stack, &mut root, Item::leaf(record)),
        }
    }

    if let Some(open) = stack.pop() {
        let name = open.item.name().unwrap_or("(unnamed)").to_string();
        return Err(StructureError::new(
            SHEET,
            format!("unclosed begin {} \"{name}\"", open.marker.kind),
        )
        .at_row(open.row)
        .at_column(TYPE));
    }

    debug!(rows = sheet.rows.len(), items = root.len(), "folded survey");
    Ok(root)
}

fn describe(item: &Item) -> String {
    match item.name() {
        Some(name) => format!("\"{name}\""),
        None => format!("of type \"{}\"", item.item_type()),
    }
}

fn flatten<'a>(items: &'a [Item], out: &mut Vec<Cow<'a, Record>>) -> Result<(), StructureError> {
    for item in items {
        match item.marker() {
            Some(marker) if marker.edge == Edge::Begin => {
                out.push(Cow::Borrowed(&item.record));
                flatten(&item.children, out)?;
                match &item.end {
                    Some(end) => {
                        let closes = end
                            .text(TYPE)
                            .and_then(Marker::parse)
                            .is_some_and(|m| m.closes(&marker));
                        if !closes {
                            return Err(StructureError::new(
                                SHEET,
                                format!(
                                    "end row of {} must have type \"end {}\"",
                                    describe(item),
                                    marker.kind
                                ),
                            ));
                        }
                        out.push(Cow::Borrowed(end));
                    }
                    None => out.push(Cow::Owned(canonical_end(&item.record, &marker))),
                }
            }
            Some(_) => {
                return Err(StructureError::new(
                    SHEET,
                    format!("stray end item {} in the tree", describe(item)),
                ));
            }
            None => {
                if !item.children.is_empty() || item.end.is_some() {
                    return Err(StructureError::new(
                        SHEET,
                        format!(
                            "item {} has children but its type is not a begin marker",
                            describe(item)
                        ),
                    ));
                }
                out.push(Cow::Borrowed(&item.record));
            }
        }
    }
    Ok(())
}

/// Unfold a tree of items back into survey rows with a canonical column order
pub fn unfold_survey(
    items: &[Item],
    languages: &LanguageOrder,
    options: &FoldOptions,
) -> Result<Sheet, StructureError> {
    let mut records: Vec<Cow<'_, Record>> = Vec::new();
    flatten(items, &mut records)?;

    let plan = ColumnPlan::build(
        SheetKind::Survey,
        records.iter().map(|r| &**r),
        languages,
        options,
    );
    let rows = records
        .iter()
        .map(|record| unfold_record(SHEET, record, options))
        .collect::<Result<Vec<_>, _>>()?;

    debug!(rows = rows.len(), columns = plan.columns.len(), "unfolded survey");
    Ok(Sheet::new(SHEET, plan.columns, rows))
}
