//! Choices Folder and Unfolder: rows grouped by `list_name` into option lists.

use crate::config::FoldOptions;
use crate::core::columns::{unfold_record, ColumnLayout, ColumnPlan, LanguageOrder};
use crate::core::ordering::{SheetKind, LIST_NAME};
use crate::error::StructureError;
use crate::types::{ChoiceList, Record, Sheet, Value};
use indexmap::IndexMap;
use tracing::debug;

const SHEET: &str = "choices";

/// Group rows by `list_name`, keeping first-seen list order and row order
/// within each list.
pub fn fold_choices(
    sheet: &Sheet,
    options: &FoldOptions,
) -> Result<IndexMap<String, ChoiceList>, StructureError> {
    let layout = ColumnLayout::for_sheet(sheet, options)?;
    let mut lists: IndexMap<String, ChoiceList> = IndexMap::new();

    for (index, row) in sheet.rows.iter().enumerate() {
        let number = row.number.unwrap_or(index + 2);
        let mut option = layout.fold_row(row);
        let list_name = match option.attributes.shift_remove(LIST_NAME) {
            Some(Value::Text(name)) if !name.trim().is_empty() => name,
            _ => {
                return Err(StructureError::new(SHEET, "empty list_name")
                    .at_row(number)
                    .at_column(LIST_NAME));
            }
        };
        lists
            .entry(list_name.clone())
            .or_insert_with(|| ChoiceList::new(list_name))
            .options
            .push(option);
    }

    debug!(rows = sheet.rows.len(), lists = lists.len(), "folded choices");
    Ok(lists)
}

/// Flatten option lists back into rows, each prefixed with its `list_name`
pub fn unfold_choices(
    lists: &IndexMap<String, ChoiceList>,
    languages: &LanguageOrder,
    options: &FoldOptions,
) -> Result<Sheet, StructureError> {
    let mut records: Vec<Record> = Vec::new();
    for (name, list) in lists {
        if name.trim().is_empty() {
            return Err(StructureError::new(SHEET, "empty list_name").at_column(LIST_NAME));
        }
        for option in &list.options {
            if option.get(LIST_NAME).is_some() {
                return Err(StructureError::new(
                    SHEET,
                    format!("option in list \"{name}\" repeats its list_name"),
                )
                .at_column(LIST_NAME));
            }
            let mut record = Record::new().with(LIST_NAME, name.as_str());
            record
                .attributes
                .extend(option.attributes.iter().map(|(k, v)| (k.clone(), v.clone())));
            record.comment = option.comment.clone();
            records.push(record);
        }
    }

    let plan = ColumnPlan::build(SheetKind::Choices, &records, languages, options);
    let rows = records
        .iter()
        .map(|record| unfold_record(SHEET, record, options))
        .collect::<Result<Vec<_>, _>>()?;

    debug!(rows = rows.len(), "unfolded choices");
    Ok(Sheet::new(SHEET, plan.columns, rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Row;

    fn choice(list: &str, name: &str, label: &str) -> Row {
        Row::new()
            .with("list_name", list)
            .with("name", name)
            .with("label", label)
    }

    fn sample() -> Sheet {
        Sheet::from_rows(
            "choices",
            vec![
                choice("yesno", "yes", "Yes"),
                choice("yesno", "no", "No"),
                choice("color", "red", "Red"),
            ],
        )
    }

    #[test]
    fn test_rows_group_into_lists() {
        let lists = fold_choices(&sample(), &FoldOptions::default()).unwrap();
        let names: Vec<_> = lists.keys().cloned().collect();
        assert_eq!(names, vec!["yesno", "color"]);

        let yesno = &lists["yesno"];
        assert_eq!(yesno.options.len(), 2);
        assert_eq!(yesno.options[0].text("name"), Some("yes"));
        assert_eq!(yesno.options[1].text("label"), Some("No"));
        assert!(yesno.options[0].get("list_name").is_none());
        assert_eq!(lists["color"].options.len(), 1);
    }

    #[test]
    fn test_lists_unfold_to_original_rows() {
        let opts = FoldOptions::default();
        let sheet = sample();
        let lists = fold_choices(&sheet, &opts).unwrap();
        let unfolded = unfold_choices(&lists, &LanguageOrder::default(), &opts).unwrap();
        assert_eq!(unfolded.columns, vec!["list_name", "name", "label"]);
        assert_eq!(unfolded.rows, sheet.rows);
    }

    #[test]
    fn test_interleaved_lists_merge() {
        let sheet = Sheet::from_rows(
            "choices",
            vec![
                choice("a", "1", "One"),
                choice("b", "x", "Ex"),
                choice("a", "2", "Two"),
            ],
        );
        let lists = fold_choices(&sheet, &FoldOptions::default()).unwrap();
        let a: Vec<_> = lists["a"].options.iter().filter_map(|o| o.text("name")).collect();
        assert_eq!(a, vec!["1", "2"]);
    }

    #[test]
    fn test_translated_option_labels() {
        let opts = FoldOptions::default();
        let sheet = Sheet::from_rows(
            "choices",
            vec![Row::new()
                .with("list_name", "yn")
                .with("name", "y")
                .with("label::English", "Yes")
                .with("label::French", "Oui")
                .with("#", "keep")],
        );
        let lists = fold_choices(&sheet, &opts).unwrap();
        let option = &lists["yn"].options[0];
        assert_eq!(
            option.get("label"),
            Some(&Value::translated([("English", "Yes"), ("French", "Oui")]))
        );
        assert_eq!(option.comment.as_deref(), Some("keep"));

        let languages = LanguageOrder::collect(lists["yn"].options.iter());
        let unfolded = unfold_choices(&lists, &languages, &opts).unwrap();
        assert_eq!(
            unfolded.columns,
            vec!["list_name", "name", "label::English", "label::French", "#"]
        );
        assert_eq!(unfolded.rows, sheet.rows);
    }

    #[test]
    fn test_missing_list_name_fails() {
        let sheet = Sheet::from_rows(
            "choices",
            vec![
                choice("yesno", "yes", "Yes"),
                Row::new().with("name", "orphan").with("label", "Orphan"),
            ],
        );
        let err = fold_choices(&sheet, &FoldOptions::default()).unwrap_err();
        assert_eq!(err.row, Some(3));
        assert_eq!(err.column.as_deref(), Some("list_name"));
    }

    #[test]
    fn test_blank_list_name_fails() {
        let sheet = Sheet::from_rows("choices", vec![choice("  ", "x", "X")]);
        assert!(fold_choices(&sheet, &FoldOptions::default()).is_err());
    }

    #[test]
    fn test_option_repeating_list_name_fails_to_unfold() {
        let mut lists = IndexMap::new();
        let mut list = ChoiceList::new("yn");
        list.options.push(Record::new().with("list_name", "other"));
        lists.insert("yn".to_string(), list);
        assert!(unfold_choices(&lists, &LanguageOrder::default(), &FoldOptions::default()).is_err());
    }
}
