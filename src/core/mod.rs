//! Bidirectional mapping between XLSForm sheets and the nested document
//!
//! - Fold: `survey`/`choices`/`settings` rows → [`Document`]
//! - Unfold: [`Document`] → rows with a canonical column order
//!
//! Both directions are pure functions of their input; nothing is shared
//! between calls, so independent forms can be converted in parallel.

pub mod choices;
pub mod columns;
pub mod ordering;
pub mod settings;
pub mod survey;

pub use columns::{ColumnLayout, ColumnPlan, LanguageOrder};
pub use columns::{empty_columns, normalize_record, restore_empty_columns};
pub use ordering::SheetKind;
pub use survey::{Edge, Marker};

use crate::config::FoldOptions;
use crate::error::StructureError;
use crate::types::{Document, EmptyColumns, FormSheets, Item, Record};
use tracing::info;

/// Fold all three sheets into a document
pub fn fold_sheets(sheets: &FormSheets, options: &FoldOptions) -> Result<Document, StructureError> {
    let survey = survey::fold_survey(&sheets.survey, options)?;
    let choices = match &sheets.choices {
        Some(sheet) => choices::fold_choices(sheet, options)?,
        None => Default::default(),
    };
    let settings = match &sheets.settings {
        Some(sheet) => settings::fold_settings(sheet, options)?,
        None => Record::new(),
    };
    let empty_columns = EmptyColumns {
        survey: empty_columns(&sheets.survey),
        choices: sheets.choices.as_ref().map(empty_columns).unwrap_or_default(),
        settings: sheets.settings.as_ref().map(empty_columns).unwrap_or_default(),
    };

    info!(
        items = survey.len(),
        choice_lists = choices.len(),
        "folded form"
    );
    Ok(Document {
        survey,
        choices,
        settings,
        empty_columns,
    })
}

/// Every record of the document in output order: survey (pre-order, stored
/// end rows included), then choice options, then settings.
pub fn document_records(document: &Document) -> Vec<&Record> {
    let mut records: Vec<&Record> = Vec::new();
    for item in document.items() {
        records.push(&item.record);
        if let Some(end) = &item.end {
            records.push(end);
        }
    }
    for list in document.choices.values() {
        records.extend(list.options.iter());
    }
    records.push(&document.settings);
    records
}

/// Collapse translation maps that hold only the unsuffixed language, as
/// folding a workbook would.
pub fn normalize_document(document: &mut Document, options: &FoldOptions) {
    fn walk(items: &mut [Item], options: &FoldOptions) {
        for item in items {
            normalize_record(&mut item.record, options);
            if let Some(end) = &mut item.end {
                normalize_record(end, options);
            }
            walk(&mut item.children, options);
        }
    }
    walk(&mut document.survey, options);
    for list in document.choices.values_mut() {
        for option in &mut list.options {
            normalize_record(option, options);
        }
    }
    normalize_record(&mut document.settings, options);
}

/// Unfold a document into sheets. Languages are ordered once for the whole
/// document so every sheet lists them the same way.
pub fn unfold_document(
    document: &Document,
    options: &FoldOptions,
) -> Result<FormSheets, StructureError> {
    let languages = LanguageOrder::collect(document_records(document));

    let empty = &document.empty_columns;
    let mut survey = survey::unfold_survey(&document.survey, &languages, options)?;
    restore_empty_columns(&mut survey, &empty.survey);
    let choices = if document.choices.is_empty() && empty.choices.is_empty() {
        None
    } else {
        let mut sheet = choices::unfold_choices(&document.choices, &languages, options)?;
        restore_empty_columns(&mut sheet, &empty.choices);
        Some(sheet)
    };
    let mut settings = settings::unfold_settings(&document.settings, &languages, options)?;
    restore_empty_columns(&mut settings, &empty.settings);

    info!(
        survey_rows = survey.rows.len(),
        languages = languages.languages().len(),
        "unfolded form"
    );
    Ok(FormSheets {
        survey,
        choices,
        settings: Some(settings),
    })
}
