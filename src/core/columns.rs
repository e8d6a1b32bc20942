//! Translation and comment column folding, shared by every sheet.
//!
//! Folding runs in two passes. [`ColumnLayout::plan`] looks only at a sheet's
//! header and decides which columns collapse into one translated attribute;
//! [`ColumnLayout::fold_row`] then applies that decision to each row. A group
//! becomes a `{language → value}` map only when the row fills at least one
//! suffixed column for it, so a lone `label` cell stays a plain value.
//!
//! Header columns that no row fills are kept aside by [`empty_columns`] and
//! put back by [`restore_empty_columns`], so placeholder columns survive.
//!
//! Unfolding is the mirror image: [`LanguageOrder`] fixes one language order
//! for the whole document, [`ColumnPlan`] derives the sheet's columns from the
//! records it will emit, and [`unfold_record`] turns one record into a row.

use crate::config::FoldOptions;
use crate::core::ordering::{order_keys, SheetKind, COMMENT};
use crate::error::StructureError;
use crate::types::{Record, Row, Sheet, Value};
use indexmap::{IndexMap, IndexSet};
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq)]
enum ColumnGroup {
    Plain(String),
    Translated {
        base: String,
        /// (column, language) in header order
        members: Vec<(String, String)>,
    },
}

/// Pass one of folding: how a sheet's columns map onto record attributes
#[derive(Debug, Clone)]
pub struct ColumnLayout {
    groups: Vec<ColumnGroup>,
    has_comment: bool,
    default_language: String,
}

impl ColumnLayout {
    /// Plan the fold for `sheet`. Columns that only appear in rows (not in
    /// the declared header) are appended in first-seen order.
    pub fn for_sheet(sheet: &Sheet, options: &FoldOptions) -> Result<Self, StructureError> {
        let mut columns = sheet.columns.clone();
        for row in &sheet.rows {
            for column in row.columns() {
                if !columns.iter().any(|c| c == column) {
                    columns.push(column.to_string());
                }
            }
        }
        Self::plan(&sheet.name, &columns, options)
    }

    pub fn plan(
        sheet: &str,
        columns: &[String],
        options: &FoldOptions,
    ) -> Result<Self, StructureError> {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut has_comment = false;
        let mut groups: Vec<ColumnGroup> = Vec::new();
        // base -> (index into groups, members with optional language)
        let mut translations: IndexMap<&str, (usize, Vec<(&str, Option<&str>)>)> =
            IndexMap::new();

        for column in columns {
            if !seen.insert(column.as_str()) {
                return Err(StructureError::new(sheet, "duplicate column header").at_column(column));
            }
            if column == COMMENT {
                has_comment = true;
                continue;
            }
            match options.split_column(column) {
                Some((_, Some(""))) => {
                    return Err(StructureError::new(sheet, "empty language tag").at_column(column));
                }
                Some((_, Some(language))) if language == options.default_language => {
                    return Err(StructureError::new(
                        sheet,
                        format!(
                            "language tag \"{language}\" is reserved for the unsuffixed column"
                        ),
                    )
                    .at_column(column));
                }
                Some((base, language)) => {
                    let next_index = groups.len();
                    let entry = translations.entry(base).or_insert_with(|| (next_index, Vec::new()));
                    if entry.0 == next_index && entry.1.is_empty() {
                        // Placeholder, resolved once the whole header is seen
                        groups.push(ColumnGroup::Plain(String::new()));
                    }
                    entry.1.push((column.as_str(), language));
                }
                None => groups.push(ColumnGroup::Plain(column.clone())),
            }
        }

        for (base, (index, members)) in translations {
            groups[index] = match members.as_slice() {
                [(column, None)] => ColumnGroup::Plain(column.to_string()),
                _ => ColumnGroup::Translated {
                    base: base.to_string(),
                    members: members
                        .iter()
                        .map(|(column, language)| {
                            (
                                column.to_string(),
                                language.unwrap_or(options.default_language.as_str()).to_string(),
                            )
                        })
                        .collect(),
                },
            };
        }

        Ok(Self {
            groups,
            has_comment,
            default_language: options.default_language.clone(),
        })
    }

    /// Pass two of folding: apply the layout to one row
    pub fn fold_row(&self, row: &Row) -> Record {
        let mut record = Record::new();
        for group in &self.groups {
            match group {
                ColumnGroup::Plain(column) => {
                    if let Some(value) = row.get(column) {
                        record.insert(column.clone(), value);
                    }
                }
                ColumnGroup::Translated { base, members } => {
                    let values: IndexMap<String, String> = members
                        .iter()
                        .filter_map(|(column, language)| {
                            row.get(column).map(|v| (language.clone(), v.to_string()))
                        })
                        .collect();
                    // Only the unsuffixed cell: the same value a lone column gives.
                    if values.len() == 1 && values.contains_key(&self.default_language) {
                        let text = values.into_values().next().unwrap_or_default();
                        record.insert(base.clone(), text);
                    } else if !values.is_empty() {
                        record.insert(base.clone(), Value::Translated(values));
                    }
                }
            }
        }
        if self.has_comment {
            record.comment = row.get(COMMENT).map(str::to_string);
        }
        record
    }

    /// Attribute names this layout can produce
    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(|g| match g {
            ColumnGroup::Plain(column) => column.as_str(),
            ColumnGroup::Translated { base, .. } => base.as_str(),
        })
    }
}

/// Declared header columns that no row of `sheet` fills, in header order
pub fn empty_columns(sheet: &Sheet) -> Vec<String> {
    sheet
        .columns
        .iter()
        .filter(|column| !sheet.rows.iter().any(|row| row.contains(column)))
        .cloned()
        .collect()
}

/// Append remembered empty columns after the columns the records use
pub fn restore_empty_columns(sheet: &mut Sheet, columns: &[String]) {
    for column in columns {
        if !sheet.columns.contains(column) {
            sheet.columns.push(column.clone());
        }
    }
}

/// A translation map holding only the unsuffixed language is written as a
/// plain value; fold it the same way so text and workbook agree.
pub fn normalize_record(record: &mut Record, options: &FoldOptions) {
    for value in record.attributes.values_mut() {
        if let Value::Translated(map) = value {
            if map.len() == 1 {
                if let Some(text) = map.get(&options.default_language) {
                    *value = Value::Text(text.clone());
                }
            }
        }
    }
}

/// Document-wide language order: first-seen across every translated value
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LanguageOrder(Vec<String>);

impl LanguageOrder {
    pub fn collect<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a Record>,
    {
        let mut languages: IndexSet<String> = IndexSet::new();
        for record in records {
            for value in record.attributes.values() {
                if let Value::Translated(map) = value {
                    for language in map.keys() {
                        if !languages.contains(language) {
                            languages.insert(language.clone());
                        }
                    }
                }
            }
        }
        Self(languages.into_iter().collect())
    }

    pub fn languages(&self) -> &[String] {
        &self.0
    }
}

#[derive(Default)]
struct BaseUsage<'a> {
    plain: bool,
    languages: HashSet<&'a str>,
}

/// Output column order for one sheet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnPlan {
    pub columns: Vec<String>,
}

impl ColumnPlan {
    /// Columns used by `records`: ordered per the sheet's ordering table,
    /// each translated attribute expanded in document language order.
    pub fn build<'a, I>(
        kind: SheetKind,
        records: I,
        languages: &LanguageOrder,
        options: &FoldOptions,
    ) -> Self
    where
        I: IntoIterator<Item = &'a Record>,
    {
        let mut usage: IndexMap<&'a str, BaseUsage<'a>> = IndexMap::new();
        let mut has_comment = false;
        for record in records {
            has_comment |= record.comment.is_some();
            for (key, value) in &record.attributes {
                let entry = usage.entry(key.as_str()).or_default();
                match value {
                    Value::Text(_) => entry.plain = true,
                    Value::Translated(map) => entry.languages.extend(map.keys().map(String::as_str)),
                }
            }
        }

        let keys = usage
            .keys()
            .copied()
            .chain(has_comment.then_some(COMMENT));
        let mut columns: Vec<String> = Vec::new();
        let mut push = |column: String| {
            if !columns.contains(&column) {
                columns.push(column);
            }
        };
        for key in order_keys(kind, keys) {
            let Some(base) = usage.get(key) else {
                push(key.to_string());
                continue;
            };
            if base.plain && !base.languages.contains(options.default_language.as_str()) {
                push(key.to_string());
            }
            for language in languages.languages() {
                if base.languages.contains(language.as_str()) {
                    push(options.column_name(key, language));
                }
            }
        }
        Self { columns }
    }
}

/// Unfold one record into a row, one column per language of each translated
/// attribute.
pub fn unfold_record(
    sheet: &str,
    record: &Record,
    options: &FoldOptions,
) -> Result<Row, StructureError> {
    let describe = || match record.text("name") {
        Some(name) => format!(" of \"{name}\""),
        None => String::new(),
    };
    let mut row = Row::new();
    let put = |row: &mut Row, column: String, value: &str| {
        if row.contains(&column) {
            return Err(StructureError::new(
                sheet,
                format!("two attributes{} unfold to the same column", describe()),
            )
            .at_column(column));
        }
        row.set(column, value);
        Ok(())
    };

    for (key, value) in &record.attributes {
        if key == COMMENT {
            return Err(StructureError::new(
                sheet,
                format!("\"{COMMENT}\" is reserved for comments{}", describe()),
            )
            .at_column(key));
        }
        match value {
            Value::Text(text) => put(&mut row, key.clone(), text)?,
            Value::Translated(map) => {
                if !options.is_translatable(key) {
                    return Err(StructureError::new(
                        sheet,
                        format!("attribute{} is not translatable", describe()),
                    )
                    .at_column(key));
                }
                for (language, text) in map {
                    if language.is_empty() {
                        return Err(StructureError::new(
                            sheet,
                            format!("empty language tag{}", describe()),
                        )
                        .at_column(key));
                    }
                    put(&mut row, options.column_name(key, language), text)?;
                }
            }
        }
    }
    if let Some(comment) = &record.comment {
        row.set(COMMENT, comment.as_str());
    }
    Ok(row)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_translation_group_folds_into_language_map() {
        let opts = FoldOptions::default();
        let layout =
            ColumnLayout::plan("survey", &cols(&["type", "label", "label::French", "label::German"]), &opts)
                .unwrap();
        let row = Row::new()
            .with("type", "text")
            .with("label", "Name")
            .with("label::French", "Nom")
            .with("label::German", "Name (de)");

        let record = layout.fold_row(&row);
        assert_eq!(record.text("type"), Some("text"));
        assert_eq!(
            record.get("label"),
            Some(&Value::translated([
                ("default", "Name"),
                ("French", "Nom"),
                ("German", "Name (de)"),
            ]))
        );
    }

    #[test]
    fn test_translation_group_unfolds_to_original_columns() {
        let opts = FoldOptions::default();
        let record = Record::new().with(
            "label",
            Value::translated([("default", "v0"), ("French", "v1"), ("German", "v2")]),
        );
        let languages = LanguageOrder::collect([&record]);
        let plan = ColumnPlan::build(SheetKind::Survey, [&record], &languages, &opts);
        assert_eq!(plan.columns, cols(&["label", "label::French", "label::German"]));

        let row = unfold_record("survey", &record, &opts).unwrap();
        assert_eq!(
            row,
            Row::new()
                .with("label", "v0")
                .with("label::French", "v1")
                .with("label::German", "v2")
        );
    }

    #[test]
    fn test_lone_untranslated_column_stays_plain() {
        let opts = FoldOptions::default();
        let layout = ColumnLayout::plan("survey", &cols(&["type", "label"]), &opts).unwrap();
        let record = layout.fold_row(&Row::new().with("type", "note").with("label", "Hello"));
        assert_eq!(record.get("label"), Some(&Value::from("Hello")));

        let plan = ColumnPlan::build(
            SheetKind::Survey,
            [&record],
            &LanguageOrder::collect([&record]),
            &opts,
        );
        assert_eq!(plan.columns, cols(&["type", "label"]));
    }

    #[test]
    fn test_row_without_any_translation_cell_has_no_attribute() {
        let opts = FoldOptions::default();
        let layout =
            ColumnLayout::plan("survey", &cols(&["type", "hint", "hint::French"]), &opts).unwrap();
        let record = layout.fold_row(&Row::new().with("type", "text"));
        assert!(record.get("hint").is_none());

        let partial = layout.fold_row(&Row::new().with("hint::French", "Aide"));
        assert_eq!(partial.get("hint"), Some(&Value::translated([("French", "Aide")])));
    }

    #[test]
    fn test_unsuffixed_cell_alone_stays_plain() {
        let opts = FoldOptions::default();
        let layout =
            ColumnLayout::plan("survey", &cols(&["type", "label", "label::French"]), &opts).unwrap();
        let record = layout.fold_row(&Row::new().with("type", "text").with("label", "Name"));
        assert_eq!(record.get("label"), Some(&Value::from("Name")));

        let both = layout.fold_row(&Row::new().with("label", "Name").with("label::French", "Nom"));
        assert_eq!(
            both.get("label"),
            Some(&Value::translated([("default", "Name"), ("French", "Nom")]))
        );
    }

    #[test]
    fn test_empty_columns_are_found_and_restored() {
        let sheet = Sheet::new(
            "survey",
            cols(&["type", "name", "constraint", "label::French"]),
            vec![Row::new().with("type", "text").with("name", "q1")],
        );
        let empty = empty_columns(&sheet);
        assert_eq!(empty, cols(&["constraint", "label::French"]));

        let mut unfolded = Sheet::new("survey", cols(&["type", "name"]), Vec::new());
        restore_empty_columns(&mut unfolded, &empty);
        restore_empty_columns(&mut unfolded, &cols(&["name"]));
        assert_eq!(unfolded.columns, cols(&["type", "name", "constraint", "label::French"]));
    }

    #[test]
    fn test_normalize_collapses_default_only_translations() {
        let opts = FoldOptions::default();
        let mut record = Record::new()
            .with("label", Value::translated([("default", "x")]))
            .with("hint", Value::translated([("French", "y")]));
        normalize_record(&mut record, &opts);
        assert_eq!(record.get("label"), Some(&Value::from("x")));
        assert_eq!(record.get("hint"), Some(&Value::translated([("French", "y")])));
    }

    #[test]
    fn test_comment_column_folds_into_comment_only() {
        let opts = FoldOptions::default();
        let layout = ColumnLayout::plan("survey", &cols(&["#", "type", "name"]), &opts).unwrap();
        let record = layout.fold_row(
            &Row::new()
                .with("#", "check wording")
                .with("type", "text")
                .with("name", "q1"),
        );
        assert_eq!(record.comment.as_deref(), Some("check wording"));
        assert!(record.get("#").is_none());
        assert_eq!(record.attributes.len(), 2);

        let row = unfold_record("survey", &record, &opts).unwrap();
        assert_eq!(row.get("#"), Some("check wording"));
    }

    #[test]
    fn test_comment_column_is_ordered_last() {
        let opts = FoldOptions::default();
        let record = Record::new()
            .with("name", "q1")
            .with("type", "text")
            .with_comment("note");
        let plan = ColumnPlan::build(
            SheetKind::Survey,
            [&record],
            &LanguageOrder::default(),
            &opts,
        );
        assert_eq!(plan.columns, cols(&["type", "name", "#"]));
    }

    #[test]
    fn test_empty_strings_are_preserved() {
        let opts = FoldOptions::default();
        let layout = ColumnLayout::plan("survey", &cols(&["type", "hint"]), &opts).unwrap();
        let record = layout.fold_row(&Row::new().with("type", "text").with("hint", ""));
        assert_eq!(record.text("hint"), Some(""));

        let row = unfold_record("survey", &record, &opts).unwrap();
        assert_eq!(row.get("hint"), Some(""));
    }

    #[test]
    fn test_unlisted_attribute_with_delimiter_stays_plain() {
        let opts = FoldOptions::default();
        let layout =
            ColumnLayout::plan("survey", &cols(&["relevant", "relevant::French"]), &opts).unwrap();
        let names: Vec<_> = layout.attribute_names().collect();
        assert_eq!(names, vec!["relevant", "relevant::French"]);
    }

    #[test]
    fn test_reserved_default_tag_is_rejected() {
        let opts = FoldOptions::default();
        let err = ColumnLayout::plan("survey", &cols(&["label", "label::default"]), &opts)
            .unwrap_err();
        assert_eq!(err.column.as_deref(), Some("label::default"));
    }

    #[test]
    fn test_empty_tag_and_duplicate_header_are_rejected() {
        let opts = FoldOptions::default();
        assert!(ColumnLayout::plan("survey", &cols(&["hint::"]), &opts).is_err());
        let err = ColumnLayout::plan("survey", &cols(&["name", "name"]), &opts).unwrap_err();
        assert!(err.message.contains("duplicate"));
    }

    #[test]
    fn test_translation_group_keeps_position_of_first_member() {
        let opts = FoldOptions::default();
        let layout = ColumnLayout::plan(
            "survey",
            &cols(&["type", "label::French", "name", "label"]),
            &opts,
        )
        .unwrap();
        let names: Vec<_> = layout.attribute_names().collect();
        assert_eq!(names, vec!["type", "label", "name"]);
    }

    #[test]
    fn test_language_order_is_document_wide() {
        let opts = FoldOptions::default();
        let a = Record::new().with("label", Value::translated([("French", "a"), ("German", "b")]));
        let b = Record::new().with("hint", Value::translated([("German", "c"), ("French", "d")]));
        let languages = LanguageOrder::collect([&a, &b]);
        assert_eq!(languages.languages(), &["French".to_string(), "German".to_string()]);

        let plan = ColumnPlan::build(SheetKind::Survey, [&a, &b], &languages, &opts);
        assert_eq!(
            plan.columns,
            cols(&["label::French", "label::German", "hint::French", "hint::German"])
        );
    }

    #[test]
    fn test_plain_and_translated_uses_share_the_base_column() {
        let opts = FoldOptions::default();
        let a = Record::new().with("label", "Plain");
        let b = Record::new().with("label", Value::translated([("Spanish", "Hola")]));
        let plan = ColumnPlan::build(
            SheetKind::Survey,
            [&a, &b],
            &LanguageOrder::collect([&a, &b]),
            &opts,
        );
        assert_eq!(plan.columns, cols(&["label", "label::Spanish"]));
    }

    #[test]
    fn test_unfold_rejects_translations_outside_allow_list() {
        let opts = FoldOptions::default();
        let record = Record::new()
            .with("name", "q1")
            .with("relevant", Value::translated([("French", "x")]));
        let err = unfold_record("survey", &record, &opts).unwrap_err();
        assert_eq!(err.column.as_deref(), Some("relevant"));
        assert!(err.message.contains("\"q1\""));
    }

    #[test]
    fn test_unfold_rejects_column_collisions() {
        let opts = FoldOptions::default();
        let record = Record::new()
            .with("label::French", "a")
            .with("label", Value::translated([("French", "b")]));
        let err = unfold_record("survey", &record, &opts).unwrap_err();
        assert_eq!(err.column.as_deref(), Some("label::French"));
    }
}
