//! YAML text form
//!
//! ```yaml
//! survey:
//! - type: begin group
//!   name: household
//!   label:
//!     default: Household
//!     French: Ménage
//!   children:
//!   - type: integer
//!     name: members
//! choices:
//!   yesno:
//!   - name: yes
//!     label: Yes
//! settings:
//!   form_id: household_survey
//! ```
//!
//! `'#'` holds a row's comment; `end` holds a container's closing row when it
//! is not the plain `end <kind>` + `name` row. Header columns that no row
//! fills are listed under `yxf: empty_columns:` so they are written back.

use super::record_keys;
use crate::core::ordering::{
    SheetKind, CHILDREN_KEY, COMMENT, EMPTY_COLUMNS_KEY, END_KEY, META_KEY,
};
use crate::error::{YxfError, YxfResult};
use crate::types::{ChoiceList, Document, EmptyColumns, Item, Record, Value};
use indexmap::IndexMap;
use serde_yaml::{Mapping, Value as YamlValue};

//==============================================================================
// Serialize
//==============================================================================

fn record_mapping(record: &Record, kind: SheetKind) -> YxfResult<Mapping> {
    let mut mapping = Mapping::new();
    for key in record_keys(record, kind) {
        let value = if key == COMMENT {
            YamlValue::String(record.comment.clone().unwrap_or_default())
        } else {
            serde_yaml::to_value(&record.attributes[key])?
        };
        mapping.insert(YamlValue::String(key.to_string()), value);
    }
    Ok(mapping)
}

fn item_value(item: &Item) -> YxfResult<YamlValue> {
    let mut mapping = record_mapping(&item.record, SheetKind::Survey)?;
    if !item.children.is_empty() {
        let children = item
            .children
            .iter()
            .map(item_value)
            .collect::<YxfResult<Vec<_>>>()?;
        mapping.insert(CHILDREN_KEY.into(), YamlValue::Sequence(children));
    }
    if let Some(end) = &item.end {
        mapping.insert(
            END_KEY.into(),
            YamlValue::Mapping(record_mapping(end, SheetKind::Survey)?),
        );
    }
    Ok(YamlValue::Mapping(mapping))
}

/// Serialize a document to YAML
pub fn to_string(document: &Document) -> YxfResult<String> {
    let mut root = Mapping::new();

    let survey = document
        .survey
        .iter()
        .map(item_value)
        .collect::<YxfResult<Vec<_>>>()?;
    root.insert("survey".into(), YamlValue::Sequence(survey));

    if !document.choices.is_empty() {
        let mut lists = Mapping::new();
        for (name, list) in &document.choices {
            let options = list
                .options
                .iter()
                .map(|o| record_mapping(o, SheetKind::Choices).map(YamlValue::Mapping))
                .collect::<YxfResult<Vec<_>>>()?;
            lists.insert(YamlValue::String(name.clone()), YamlValue::Sequence(options));
        }
        root.insert("choices".into(), YamlValue::Mapping(lists));
    }

    if !document.settings.is_empty() {
        root.insert(
            "settings".into(),
            YamlValue::Mapping(record_mapping(&document.settings, SheetKind::Settings)?),
        );
    }

    if !document.empty_columns.is_empty() {
        root.insert(META_KEY.into(), empty_columns_value(&document.empty_columns));
    }

    Ok(serde_yaml::to_string(&YamlValue::Mapping(root))?)
}

fn empty_columns_value(empty: &EmptyColumns) -> YamlValue {
    let mut sheets = Mapping::new();
    for kind in SheetKind::ALL {
        let columns = empty.get(kind);
        if !columns.is_empty() {
            let names = columns.iter().cloned().map(YamlValue::String).collect();
            sheets.insert(kind.sheet_name().into(), YamlValue::Sequence(names));
        }
    }
    let mut meta = Mapping::new();
    meta.insert(EMPTY_COLUMNS_KEY.into(), YamlValue::Mapping(sheets));
    YamlValue::Mapping(meta)
}

//==============================================================================
// Parse
//==============================================================================

fn scalar(value: &YamlValue, context: &str) -> YxfResult<String> {
    match value {
        YamlValue::String(s) => Ok(s.clone()),
        YamlValue::Number(n) => Ok(n.to_string()),
        YamlValue::Bool(b) => Ok(b.to_string()),
        YamlValue::Null => Ok(String::new()),
        _ => Err(YxfError::Parse(format!("{context}: expected a text value"))),
    }
}

fn mapping<'a>(value: &'a YamlValue, context: &str) -> YxfResult<Option<&'a Mapping>> {
    match value {
        YamlValue::Mapping(m) => Ok(Some(m)),
        YamlValue::Null => Ok(None),
        _ => Err(YxfError::Parse(format!("{context}: expected a mapping"))),
    }
}

fn sequence<'a>(value: &'a YamlValue, context: &str) -> YxfResult<&'a [YamlValue]> {
    match value {
        YamlValue::Sequence(s) => Ok(s),
        YamlValue::Null => Ok(&[]),
        _ => Err(YxfError::Parse(format!("{context}: expected a list"))),
    }
}

fn attribute(value: &YamlValue, context: &str) -> YxfResult<Value> {
    match value {
        YamlValue::Mapping(m) => {
            if m.is_empty() {
                return Err(YxfError::Parse(format!("{context}: empty translation")));
            }
            let mut translations = IndexMap::new();
            for (language, text) in m {
                let language = scalar(language, context)?;
                let text = scalar(text, &format!("{context}.{language}"))?;
                translations.insert(language, text);
            }
            Ok(Value::Translated(translations))
        }
        other => scalar(other, context).map(Value::Text),
    }
}

/// Read a record, handing keys the caller claims (e.g. `children`) to `extra`
fn parse_record<F>(map: &Mapping, context: &str, mut extra: F) -> YxfResult<Record>
where
    F: FnMut(&str, &YamlValue) -> YxfResult<bool>,
{
    let mut record = Record::new();
    for (key, value) in map {
        let key = scalar(key, context)?;
        if extra(&key, value)? {
            continue;
        }
        let key_context = format!("{context}.{key}");
        if key == COMMENT {
            record.comment = Some(scalar(value, &key_context)?);
        } else {
            record.insert(key, attribute(value, &key_context)?);
        }
    }
    Ok(record)
}

fn parse_item(value: &YamlValue, context: &str) -> YxfResult<Item> {
    let map = mapping(value, context)?.ok_or_else(|| {
        YxfError::Parse(format!("{context}: expected a mapping"))
    })?;

    let mut children = Vec::new();
    let mut end = None;
    let record = parse_record(map, context, |key, value| match key {
        CHILDREN_KEY => {
            for (index, child) in sequence(value, context)?.iter().enumerate() {
                children.push(parse_item(child, &format!("{context}.children[{index}]"))?);
            }
            Ok(true)
        }
        END_KEY => {
            let end_context = format!("{context}.end");
            let end_map = mapping(value, &end_context)?.cloned().unwrap_or_default();
            end = Some(parse_record(&end_map, &end_context, |_, _| Ok(false))?);
            Ok(true)
        }
        _ => Ok(false),
    })?;

    Ok(Item {
        record,
        children,
        end,
    })
}

fn parse_meta(value: &YamlValue, empty: &mut EmptyColumns) -> YxfResult<()> {
    for (key, value) in mapping(value, META_KEY)?.into_iter().flatten() {
        let key = scalar(key, META_KEY)?;
        if key != EMPTY_COLUMNS_KEY {
            return Err(YxfError::Parse(format!("{META_KEY}: unknown entry {key:?}")));
        }
        let context = format!("{META_KEY}.{EMPTY_COLUMNS_KEY}");
        for (sheet, columns) in mapping(value, &context)?.into_iter().flatten() {
            let sheet = scalar(sheet, &context)?;
            let kind = SheetKind::from_sheet_name(&sheet).ok_or_else(|| {
                YxfError::Parse(format!("{context}: unknown sheet {sheet:?}"))
            })?;
            let sheet_context = format!("{context}.{sheet}");
            *empty.get_mut(kind) = sequence(columns, &sheet_context)?
                .iter()
                .map(|column| scalar(column, &sheet_context))
                .collect::<YxfResult<_>>()?;
        }
    }
    Ok(())
}

/// Parse YAML text into a document
pub fn from_str(text: &str) -> YxfResult<Document> {
    let root: YamlValue = serde_yaml::from_str(text)?;
    let root = mapping(&root, "document")?
        .ok_or_else(|| YxfError::Parse("YAML file is empty".to_string()))?;

    let mut document = Document::new();
    let mut has_survey = false;

    for (key, value) in root {
        let key = scalar(key, "document")?;
        if key == META_KEY {
            parse_meta(value, &mut document.empty_columns)?;
            continue;
        }
        match SheetKind::from_sheet_name(&key) {
            Some(SheetKind::Survey) => {
                has_survey = true;
                for (index, item) in sequence(value, "survey")?.iter().enumerate() {
                    document
                        .survey
                        .push(parse_item(item, &format!("survey[{index}]"))?);
                }
            }
            Some(SheetKind::Choices) => {
                for (name, options) in mapping(value, "choices")?.into_iter().flatten() {
                    let name = scalar(name, "choices")?;
                    let context = format!("choices.{name}");
                    let mut list = ChoiceList::new(name.clone());
                    for (index, option) in sequence(options, &context)?.iter().enumerate() {
                        let option_context = format!("{context}[{index}]");
                        let map = mapping(option, &option_context)?.ok_or_else(|| {
                            YxfError::Parse(format!("{option_context}: expected a mapping"))
                        })?;
                        list.options
                            .push(parse_record(map, &option_context, |_, _| Ok(false))?);
                    }
                    document.choices.insert(name, list);
                }
            }
            Some(SheetKind::Settings) => {
                if let Some(map) = mapping(value, "settings")? {
                    document.settings = parse_record(map, "settings", |_, _| Ok(false))?;
                }
            }
            None => {
                return Err(YxfError::Parse(format!(
                    "Invalid sheet name (must be survey, choices, or settings): {key}"
                )));
            }
        }
    }

    if !has_survey {
        return Err(YxfError::Parse(
            "YAML file must have a \"survey\" entry".to_string(),
        ));
    }
    Ok(document)
}
