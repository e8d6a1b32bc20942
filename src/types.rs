use crate::core::ordering::SheetKind;
use crate::core::survey::{Edge, Marker};
use indexmap::IndexMap;
use serde::Serialize;

//==============================================================================
// Row Model (tabular side)
//==============================================================================

/// One spreadsheet row: column name → cell value, in column order.
///
/// A missing column renders as an empty cell. An explicitly stored empty
/// string is kept as a cell of its own so placeholder columns survive.
#[derive(Debug, Clone, Default)]
pub struct Row {
    /// Spreadsheet row number (header row = 1), when the row came from a file.
    pub number: Option<usize>,
    cells: IndexMap<String, String>,
}

impl Row {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn numbered(number: usize) -> Self {
        Self {
            number: Some(number),
            cells: IndexMap::new(),
        }
    }

    /// Builder form of [`Row::set`]
    #[must_use]
    pub fn with(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(column, value);
        self
    }

    pub fn set(&mut self, column: impl Into<String>, value: impl Into<String>) {
        self.cells.insert(column.into(), value.into());
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.cells.get(column).map(String::as_str)
    }

    /// Cell value, or "" when the row has no such cell
    pub fn value(&self, column: &str) -> &str {
        self.get(column).unwrap_or("")
    }

    pub fn contains(&self, column: &str) -> bool {
        self.cells.contains_key(column)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.cells.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

// Row numbers are provenance, not content.
impl PartialEq for Row {
    fn eq(&self, other: &Self) -> bool {
        self.cells == other.cells
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut row = Row::new();
        for (column, value) in iter {
            row.set(column, value);
        }
        row
    }
}

/// A named sheet: declared column order plus its rows
#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl Sheet {
    pub fn new(name: impl Into<String>, columns: Vec<String>, rows: Vec<Row>) -> Self {
        Self {
            name: name.into(),
            columns,
            rows,
        }
    }

    /// Build a sheet whose column order is the first-seen union over `rows`
    pub fn from_rows(name: impl Into<String>, rows: Vec<Row>) -> Self {
        let mut columns: Vec<String> = Vec::new();
        for row in &rows {
            for column in row.columns() {
                if !columns.iter().any(|c| c == column) {
                    columns.push(column.to_string());
                }
            }
        }
        Self::new(name, columns, rows)
    }
}

/// The three XLSForm sheets as rows
#[derive(Debug, Clone, PartialEq)]
pub struct FormSheets {
    pub survey: Sheet,
    pub choices: Option<Sheet>,
    pub settings: Option<Sheet>,
}

impl FormSheets {
    pub fn iter(&self) -> impl Iterator<Item = &Sheet> {
        std::iter::once(&self.survey)
            .chain(self.choices.as_ref())
            .chain(self.settings.as_ref())
    }
}

//==============================================================================
// Document Model (nested side)
//==============================================================================

/// An attribute value: a plain cell, or one cell per language
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Text(String),
    Translated(IndexMap<String, String>),
}

impl Value {
    pub fn translated<K, V, I>(entries: I) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        Value::Translated(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            Value::Translated(_) => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

/// A folded row: attributes (translation groups collapsed) plus the `#` comment.
///
/// Attribute equality ignores key order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    pub attributes: IndexMap<String, Value>,
    pub comment: Option<String>,
}

impl Record {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    #[must_use]
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.attributes.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// The attribute's value when it is a plain cell
    pub fn text(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_text)
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty() && self.comment.is_none()
    }
}

/// A folded survey node. Containers (`begin group`, `begin repeat`, ...) own
/// their body; everything else is a leaf.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Item {
    pub record: Record,
    pub children: Vec<Item>,
    /// The closing row, only when it differs from the canonical
    /// `end <kind>` + `name` row.
    pub end: Option<Record>,
}

impl Item {
    pub fn leaf(record: Record) -> Self {
        Self {
            record,
            ..Self::default()
        }
    }

    pub fn container(record: Record, children: Vec<Item>) -> Self {
        Self {
            record,
            children,
            end: None,
        }
    }

    /// The `type` cell, "" when absent (e.g. comment-only rows)
    pub fn item_type(&self) -> &str {
        self.record.text("type").unwrap_or("")
    }

    pub fn name(&self) -> Option<&str> {
        self.record.text("name")
    }

    pub fn label(&self) -> Option<&Value> {
        self.record.get("label")
    }

    pub fn marker(&self) -> Option<Marker> {
        Marker::parse(self.item_type())
    }

    pub fn is_container(&self) -> bool {
        matches!(self.marker(), Some(m) if m.edge == Edge::Begin)
    }

    /// A row holding nothing but a `#` comment
    pub fn is_comment_only(&self) -> bool {
        self.record.attributes.is_empty()
            && self.record.comment.is_some()
            && self.children.is_empty()
            && self.end.is_none()
    }
}

/// A named option list from the `choices` sheet
#[derive(Debug, Clone, PartialEq)]
pub struct ChoiceList {
    pub name: String,
    pub options: Vec<Record>,
}

impl ChoiceList {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            options: Vec::new(),
        }
    }
}

/// Header columns that no row fills, per sheet, in header order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmptyColumns {
    pub survey: Vec<String>,
    pub choices: Vec<String>,
    pub settings: Vec<String>,
}

impl EmptyColumns {
    pub fn get(&self, kind: SheetKind) -> &[String] {
        match kind {
            SheetKind::Survey => &self.survey,
            SheetKind::Choices => &self.choices,
            SheetKind::Settings => &self.settings,
        }
    }

    pub fn get_mut(&mut self, kind: SheetKind) -> &mut Vec<String> {
        match kind {
            SheetKind::Survey => &mut self.survey,
            SheetKind::Choices => &mut self.choices,
            SheetKind::Settings => &mut self.settings,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.survey.is_empty() && self.choices.is_empty() && self.settings.is_empty()
    }
}

/// The unit serialized to and from text
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    pub survey: Vec<Item>,
    pub choices: IndexMap<String, ChoiceList>,
    pub settings: Record,
    /// Placeholder columns to write back even though no row uses them
    pub empty_columns: EmptyColumns,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn choice_list(&self, name: &str) -> Option<&ChoiceList> {
        self.choices.get(name)
    }

    /// Pre-order walk over every survey item
    pub fn items(&self) -> Vec<&Item> {
        fn walk<'a>(items: &'a [Item], out: &mut Vec<&'a Item>) {
            for item in items {
                out.push(item);
                walk(&item.children, out);
            }
        }
        let mut out = Vec::new();
        walk(&self.survey, &mut out);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sheet_from_rows_uses_first_seen_column_order() {
        let rows = vec![
            Row::new().with("type", "text").with("name", "q1"),
            Row::new().with("label", "Q2").with("type", "integer"),
        ];
        let sheet = Sheet::from_rows("survey", rows);
        assert_eq!(sheet.columns, vec!["type", "name", "label"]);
        assert_eq!(sheet.rows[1].value("name"), "");
    }

    #[test]
    fn test_row_equality_ignores_number_and_order() {
        let a = Row::numbered(4).with("name", "q1").with("type", "text");
        let b = Row::new().with("type", "text").with("name", "q1");
        assert_eq!(a, b);
    }

    #[test]
    fn test_item_container_detection() {
        let group = Item::leaf(Record::new().with("type", "begin_group"));
        let note = Item::leaf(Record::new().with("type", "note"));
        assert!(group.is_container());
        assert!(!note.is_container());
        assert_eq!(Item::default().item_type(), "");
    }

    #[test]
    fn test_document_items_is_preorder() {
        let doc = Document {
            survey: vec![
                Item::container(
                    Record::new().with("type", "begin group").with("name", "g1"),
                    vec![Item::leaf(Record::new().with("type", "text").with("name", "q1"))],
                ),
                Item::leaf(Record::new().with("type", "text").with("name", "q2")),
            ],
            ..Document::default()
        };
        let names: Vec<_> = doc.items().iter().filter_map(|i| i.name()).collect();
        assert_eq!(names, vec!["g1", "q1", "q2"]);
    }
}
