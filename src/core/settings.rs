//! Settings Adapter: the single `settings` row as one flat record.

use crate::config::FoldOptions;
use crate::core::columns::{unfold_record, ColumnLayout, ColumnPlan, LanguageOrder};
use crate::core::ordering::SheetKind;
use crate::error::StructureError;
use crate::types::{Record, Sheet};

const SHEET: &str = "settings";

pub fn fold_settings(sheet: &Sheet, options: &FoldOptions) -> Result<Record, StructureError> {
    let layout = ColumnLayout::for_sheet(sheet, options)?;
    match sheet.rows.as_slice() {
        [] => Ok(Record::new()),
        [row] => Ok(layout.fold_row(row)),
        [_, extra, ..] => Err(StructureError::new(SHEET, "expected a single settings row")
            .at_row(extra.number.unwrap_or(3))),
    }
}

/// Always exactly one row, so an empty settings record still yields a sheet
pub fn unfold_settings(
    settings: &Record,
    languages: &LanguageOrder,
    options: &FoldOptions,
) -> Result<Sheet, StructureError> {
    let plan = ColumnPlan::build(SheetKind::Settings, [settings], languages, options);
    let row = unfold_record(SHEET, settings, options)?;
    Ok(Sheet::new(SHEET, plan.columns, vec![row]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Row, Value};

    #[test]
    fn test_single_row_folds_to_record() {
        let sheet = Sheet::from_rows(
            "settings",
            vec![Row::new().with("form_title", "Household").with("form_id", "hh")],
        );
        let settings = fold_settings(&sheet, &FoldOptions::default()).unwrap();
        assert_eq!(settings.text("form_title"), Some("Household"));
        assert_eq!(settings.text("form_id"), Some("hh"));
    }

    #[test]
    fn test_empty_sheet_folds_to_empty_record() {
        let sheet = Sheet::new("settings", vec!["form_id".to_string()], Vec::new());
        assert!(fold_settings(&sheet, &FoldOptions::default()).unwrap().is_empty());
    }

    #[test]
    fn test_second_row_fails() {
        let sheet = Sheet::from_rows(
            "settings",
            vec![Row::new().with("form_id", "a"), Row::new().with("form_id", "b")],
        );
        let err = fold_settings(&sheet, &FoldOptions::default()).unwrap_err();
        assert_eq!(err.row, Some(3));
    }

    #[test]
    fn test_empty_settings_unfold_to_one_row() {
        let sheet = unfold_settings(&Record::new(), &LanguageOrder::default(), &FoldOptions::default())
            .unwrap();
        assert_eq!(sheet.rows.len(), 1);
        assert!(sheet.rows[0].is_empty());
        assert!(sheet.columns.is_empty());
    }

    #[test]
    fn test_settings_share_translation_folding() {
        let opts = FoldOptions::default().with_translatable(["form_title"]);
        let sheet = Sheet::from_rows(
            "settings",
            vec![Row::new()
                .with("form_title::English", "Visit")
                .with("form_title::Hindi", "दौरा")
                .with("version", "3")],
        );
        let settings = fold_settings(&sheet, &opts).unwrap();
        assert_eq!(
            settings.get("form_title"),
            Some(&Value::translated([("English", "Visit"), ("Hindi", "दौरा")]))
        );

        let languages = LanguageOrder::collect([&settings]);
        let unfolded = unfold_settings(&settings, &languages, &opts).unwrap();
        assert_eq!(
            unfolded.columns,
            vec!["form_title::English", "form_title::Hindi", "version"]
        );
        assert_eq!(unfolded.rows, sheet.rows);
    }
}
