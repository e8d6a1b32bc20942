//! Markdown text form
//!
//! ```markdown
//! ## survey
//!
//! Household visit, second round.
//!
//! - `begin group` household
//!   - label:
//!     - default: Household
//!     - French: Ménage
//!   - `integer` members
//!     - constraint: . >= 1
//!     - \#: count everyone present
//!
//! ## choices
//!
//! ### yesno
//!
//! - `yes`
//!   - label: Yes
//!
//! ## settings
//!
//! - form_id: household
//!
//! ## yxf
//!
//! ### survey
//!
//! - `hint::French`
//! ```
//!
//! Item heads carry the type as a code span and the name as plain text.
//! Values that do not fit a head (empty, multi-line, translated) are written
//! as ordinary `key: value` lines instead. A container's stored end row is its
//! last nested item. The `yxf` section lists header columns that no row
//! fills, under one heading per sheet.

use super::record_keys;
use crate::core::ordering::{SheetKind, COMMENT, META_KEY, NAME, TYPE};
use crate::core::survey::Edge;
use crate::error::{YxfError, YxfResult};
use crate::types::{ChoiceList, Document, Item, Record, Value};
use indexmap::IndexMap;
use pulldown_cmark::{Event, HeadingLevel, Parser, Tag, TagEnd};
use std::fmt::Display;
use tracing::warn;

const INDENT: &str = "  ";
/// Head of an item without a type (or an option without a name)
const EMPTY_CODE: &str = "` `";

//==============================================================================
// Escaping
//==============================================================================

/// Backslash-escape everything that could turn plain text into markup.
/// `line_start` adds the block-level markers (`-`, `>`, `1.`, ...).
fn escape(text: &str, line_start: bool) -> String {
    let chars: Vec<char> = text.chars().collect();
    let ordinal = if line_start {
        let digits = chars.iter().take_while(|c| c.is_ascii_digit()).count();
        (digits > 0 && matches!(chars.get(digits), Some('.' | ')'))).then_some(digits)
    } else {
        None
    };

    let mut out = String::with_capacity(text.len());
    for (i, &c) in chars.iter().enumerate() {
        let escaped = match c {
            '\\' | '`' | '*' | '[' | ']' | '<' | '&' | '#' => true,
            '_' => {
                let intraword = i > 0
                    && chars[i - 1].is_alphanumeric()
                    && chars.get(i + 1).is_some_and(|n| n.is_alphanumeric());
                !intraword
            }
            '-' | '+' | '=' | '>' | '~' => line_start && i == 0,
            _ => ordinal == Some(i),
        };
        if escaped {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// A code span that reads back as exactly `text`
fn code_span(text: &str) -> String {
    let longest = text.split(|c| c != '`').map(str::len).max().unwrap_or(0);
    let fence = "`".repeat(longest + 1);
    let pad = text.starts_with('`')
        || text.ends_with('`')
        || (text.starts_with(' ') && text.ends_with(' '));
    if pad {
        format!("{fence} {text} {fence}")
    } else {
        format!("{fence}{text}{fence}")
    }
}

/// Multi-line text as hard line breaks, continuation lines indented to `column`
fn render_text(text: &str, column: usize) -> String {
    let mut out = String::new();
    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            out.push_str("\\\n");
            out.push_str(&" ".repeat(column));
        }
        out.push_str(&escape(line, i > 0));
    }
    out
}

/// Whitespace the Markdown parser would strip on the way back
fn loses_whitespace(text: &str) -> bool {
    text.contains('\r')
        || text.ends_with('\n')
        || text.split('\n').enumerate().any(|(i, line)| {
            line.ends_with([' ', '\t']) || (i > 0 && line.starts_with([' ', '\t']))
        })
}

fn code_head(value: Option<&Value>) -> Option<&str> {
    value
        .and_then(Value::as_text)
        .filter(|s| !s.trim().is_empty() && !s.contains(['\n', '\r']))
}

fn plain_head(value: Option<&Value>) -> Option<&str> {
    value
        .and_then(Value::as_text)
        .filter(|s| !s.is_empty() && s.trim() == *s && !s.contains(['\n', '\r']))
}

fn is_paragraph(item: &Item) -> bool {
    item.is_comment_only()
        && item
            .record
            .comment
            .as_deref()
            .is_some_and(|c| !c.is_empty() && c.trim() == c && !c.contains(['\n', '\r']))
}

//==============================================================================
// Serialize
//==============================================================================

#[derive(Default)]
struct Writer {
    out: String,
}

impl Writer {
    fn line(&mut self, depth: usize, text: &str) {
        for _ in 0..depth {
            self.out.push_str(INDENT);
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn blank(&mut self) {
        if !self.out.is_empty() && !self.out.ends_with("\n\n") {
            self.out.push('\n');
        }
    }

    fn heading(&mut self, level: usize, text: &str) {
        self.blank();
        self.line(0, &format!("{} {}", "#".repeat(level), text));
        self.blank();
    }

    fn text_line(&mut self, depth: usize, key: &str, text: &str) -> YxfResult<()> {
        if key.contains(": ") || key.contains(['\n', '\r']) {
            return Err(YxfError::Markdown(format!("key {key:?} cannot be written")));
        }
        if loses_whitespace(text) || key.starts_with([' ', '\t']) {
            warn!(key, "leading or trailing whitespace will not survive Markdown");
        }
        let key = escape(key, true);
        if text.is_empty() {
            self.line(depth, &format!("- {key}:"));
        } else {
            let column = depth * INDENT.len() + 2;
            self.line(depth, &format!("- {key}: {}", render_text(text, column)));
        }
        Ok(())
    }

    fn attributes<F>(&mut self, record: &Record, kind: SheetKind, depth: usize, skip: F) -> YxfResult<()>
    where
        F: Fn(&str) -> bool,
    {
        for key in record_keys(record, kind) {
            if skip(key) {
                continue;
            }
            if key == COMMENT {
                self.text_line(depth, COMMENT, record.comment.as_deref().unwrap_or(""))?;
                continue;
            }
            match &record.attributes[key] {
                Value::Text(text) => self.text_line(depth, key, text)?,
                Value::Translated(translations) => {
                    if translations.is_empty() {
                        return Err(YxfError::Markdown(format!("{key:?} has no translations")));
                    }
                    self.text_line(depth, key, "")?;
                    for (language, text) in translations {
                        self.text_line(depth + 1, language, text)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn item(&mut self, item: &Item, depth: usize) -> YxfResult<()> {
        let record = &item.record;
        let type_head = code_head(record.get(TYPE));
        let name_head = plain_head(record.get(NAME));

        let mut head = format!("- {}", type_head.map_or_else(|| EMPTY_CODE.to_string(), code_span));
        if let Some(name) = name_head {
            head.push(' ');
            head.push_str(&escape(name, false));
        }
        self.line(depth, &head);

        self.attributes(record, SheetKind::Survey, depth + 1, |key| {
            (key == TYPE && type_head.is_some()) || (key == NAME && name_head.is_some())
        })?;
        for child in &item.children {
            self.item(child, depth + 1)?;
        }
        if let Some(end) = &item.end {
            let closes = Item::leaf(end.clone());
            if !matches!(closes.marker(), Some(m) if m.edge == Edge::End) {
                return Err(YxfError::Markdown(format!(
                    "end row of {:?} has no end type",
                    item.name().unwrap_or_default()
                )));
            }
            self.item(&closes, depth + 1)?;
        }
        Ok(())
    }

    fn option(&mut self, option: &Record) -> YxfResult<()> {
        let name_head = code_head(option.get(NAME));
        self.line(0, &format!("- {}", name_head.map_or_else(|| EMPTY_CODE.to_string(), code_span)));
        self.attributes(option, SheetKind::Choices, 1, |key| {
            key == NAME && name_head.is_some()
        })
    }
}

/// Serialize a document to Markdown
pub fn to_string(document: &Document) -> YxfResult<String> {
    let mut w = Writer::default();

    w.heading(2, "survey");
    let mut after_paragraph = false;
    for item in &document.survey {
        if is_paragraph(item) {
            w.blank();
            w.line(0, &escape(item.record.comment.as_deref().unwrap_or_default(), true));
            after_paragraph = true;
        } else {
            if after_paragraph {
                w.blank();
                after_paragraph = false;
            }
            w.item(item, 0)?;
        }
    }

    if !document.choices.is_empty() {
        w.heading(2, "choices");
        for (name, list) in &document.choices {
            if name.contains(['\n', '\r']) {
                return Err(YxfError::Markdown(format!("list name {name:?} spans lines")));
            }
            w.heading(3, &escape(name, false));
            for option in &list.options {
                w.option(option)?;
            }
        }
    }

    if !document.settings.is_empty() {
        w.heading(2, "settings");
        w.attributes(&document.settings, SheetKind::Settings, 0, |_| false)?;
    }

    if !document.empty_columns.is_empty() {
        w.heading(2, META_KEY);
        for kind in SheetKind::ALL {
            let columns = document.empty_columns.get(kind);
            if columns.is_empty() {
                continue;
            }
            w.heading(3, kind.sheet_name());
            for column in columns {
                if column.trim().is_empty() || column.contains(['\n', '\r']) {
                    return Err(YxfError::Markdown(format!("column {column:?} cannot be written")));
                }
                w.line(0, &format!("- {}", code_span(column)));
            }
        }
    }

    Ok(w.out)
}

//==============================================================================
// Parse: events → blocks
//==============================================================================

#[derive(Debug, Default)]
struct Inline {
    /// A code span opening the text
    code: Option<String>,
    text: String,
}

impl Inline {
    fn push_code(&mut self, code: &str) {
        if self.code.is_none() && self.text.is_empty() {
            self.code = Some(code.to_string());
        } else {
            self.text.push_str(code);
        }
    }

    fn flatten(self) -> String {
        self.code.unwrap_or_default() + &self.text
    }
}

#[derive(Debug)]
struct Entry {
    line: usize,
    head: Inline,
    children: Vec<Entry>,
    /// A nested list has started; no more head text
    closed: bool,
}

#[derive(Debug)]
enum Block {
    Heading {
        level: HeadingLevel,
        text: String,
        line: usize,
    },
    Paragraph {
        text: String,
        line: usize,
    },
    List(Vec<Entry>),
}

struct LineIndex(Vec<usize>);

impl LineIndex {
    fn new(text: &str) -> Self {
        Self(
            std::iter::once(0)
                .chain(text.match_indices('\n').map(|(i, _)| i + 1))
                .collect(),
        )
    }

    fn line(&self, offset: usize) -> usize {
        self.0.partition_point(|&start| start <= offset)
    }
}

fn parse_error(line: usize, message: impl Display) -> YxfError {
    YxfError::Parse(format!("line {line}: {message}"))
}

type Leaf = Option<(Option<HeadingLevel>, Inline)>;

fn inline_target<'a>(leaf: &'a mut Leaf, open: &'a mut [Entry], line: usize) -> YxfResult<&'a mut Inline> {
    if let Some(entry) = open.last_mut() {
        if entry.closed {
            return Err(parse_error(line, "text after a nested list"));
        }
        return Ok(&mut entry.head);
    }
    leaf.as_mut()
        .map(|(_, inline)| inline)
        .ok_or_else(|| parse_error(line, "unexpected content"))
}

fn blocks(text: &str) -> YxfResult<Vec<Block>> {
    let lines = LineIndex::new(text);
    let mut blocks = Vec::new();
    let mut open: Vec<Entry> = Vec::new();
    let mut finished: Vec<Entry> = Vec::new();
    let mut depth = 0usize;
    let mut leaf: Leaf = None;
    let mut leaf_line = 0;

    for (event, range) in Parser::new(text).into_offset_iter() {
        let line = lines.line(range.start);
        match event {
            Event::Start(Tag::Heading { level, .. }) if open.is_empty() => {
                leaf = Some((Some(level), Inline::default()));
                leaf_line = line;
            }
            Event::Start(Tag::Paragraph) if open.is_empty() => {
                leaf = Some((None, Inline::default()));
                leaf_line = line;
            }
            Event::End(TagEnd::Heading(_) | TagEnd::Paragraph) if open.is_empty() => {
                if let Some((level, inline)) = leaf.take() {
                    let text = inline.flatten();
                    blocks.push(match level {
                        Some(level) => Block::Heading {
                            level,
                            text,
                            line: leaf_line,
                        },
                        None => Block::Paragraph {
                            text,
                            line: leaf_line,
                        },
                    });
                }
            }
            Event::Start(Tag::List(_)) => {
                if let Some(entry) = open.last_mut() {
                    entry.closed = true;
                }
                depth += 1;
            }
            Event::End(TagEnd::List(_)) => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    blocks.push(Block::List(std::mem::take(&mut finished)));
                }
            }
            Event::Start(Tag::Item) => open.push(Entry {
                line,
                head: Inline::default(),
                children: Vec::new(),
                closed: false,
            }),
            Event::End(TagEnd::Item) => {
                if let Some(entry) = open.pop() {
                    match open.last_mut() {
                        Some(parent) => parent.children.push(entry),
                        None => finished.push(entry),
                    }
                }
            }
            Event::Text(t) | Event::Html(t) | Event::InlineHtml(t) => {
                inline_target(&mut leaf, &mut open, line)?.text.push_str(&t);
            }
            Event::Code(code) => inline_target(&mut leaf, &mut open, line)?.push_code(&code),
            Event::SoftBreak => inline_target(&mut leaf, &mut open, line)?.text.push(' '),
            Event::HardBreak => inline_target(&mut leaf, &mut open, line)?.text.push('\n'),
            Event::Start(Tag::CodeBlock(_)) | Event::Rule => {
                return Err(parse_error(line, "code blocks and rules are not part of a form"));
            }
            _ => {}
        }
    }
    Ok(blocks)
}

//==============================================================================
// Parse: blocks → document
//==============================================================================

fn split_pair(text: &str, line: usize) -> YxfResult<(String, String)> {
    if let Some((key, value)) = text.split_once(": ") {
        Ok((key.to_string(), value.to_string()))
    } else if let Some(key) = text.strip_suffix(':') {
        Ok((key.to_string(), String::new()))
    } else {
        Err(parse_error(line, format!("expected `key: value`, found {text:?}")))
    }
}

fn parse_attribute(entry: Entry, record: &mut Record) -> YxfResult<()> {
    let Entry {
        line,
        head,
        children,
        ..
    } = entry;
    if head.code.is_some() {
        return Err(parse_error(line, "expected `key: value`, found an item"));
    }
    let (key, value) = split_pair(&head.text, line)?;

    if key == COMMENT {
        if !children.is_empty() || record.comment.is_some() {
            return Err(parse_error(line, "a row has one comment"));
        }
        record.comment = Some(value);
        return Ok(());
    }
    if record.get(&key).is_some() {
        return Err(parse_error(line, format!("duplicate key {key:?}")));
    }

    let value = if children.is_empty() {
        Value::Text(value)
    } else {
        if !value.is_empty() {
            return Err(parse_error(line, format!("{key:?} has both a value and translations")));
        }
        let mut translations = IndexMap::new();
        for child in children {
            if child.head.code.is_some() || !child.children.is_empty() {
                return Err(parse_error(child.line, "expected `language: value`"));
            }
            let (language, text) = split_pair(&child.head.text, child.line)?;
            if translations.insert(language, text).is_some() {
                return Err(parse_error(child.line, format!("duplicate language in {key:?}")));
            }
        }
        Value::Translated(translations)
    };
    record.insert(key, value);
    Ok(())
}

fn parse_item(entry: Entry) -> YxfResult<Item> {
    let Entry {
        line,
        head,
        children,
        ..
    } = entry;
    let code = head
        .code
        .ok_or_else(|| parse_error(line, "expected an item starting with `type`"))?;

    let mut item = Item::default();
    if !code.trim().is_empty() {
        item.record.insert(TYPE, code);
    }
    let name = head.text.trim();
    if !name.is_empty() {
        item.record.insert(NAME, name);
    }

    for child in children {
        let child_line = child.line;
        if item.end.is_some() {
            return Err(parse_error(child_line, "nothing may follow an end row"));
        }
        if child.head.code.is_some() {
            let nested = parse_item(child)?;
            if matches!(nested.marker(), Some(m) if m.edge == Edge::End) {
                if !nested.children.is_empty() || nested.end.is_some() {
                    return Err(parse_error(child_line, "an end row cannot contain items"));
                }
                item.end = Some(nested.record);
            } else {
                item.children.push(nested);
            }
        } else {
            if !item.children.is_empty() {
                return Err(parse_error(child_line, "attributes must come before nested items"));
            }
            parse_attribute(child, &mut item.record)?;
        }
    }
    Ok(item)
}

fn parse_option(entry: Entry) -> YxfResult<Record> {
    let Entry {
        line,
        head,
        children,
        ..
    } = entry;
    let code = head
        .code
        .ok_or_else(|| parse_error(line, "expected an option starting with `name`"))?;
    if !head.text.trim().is_empty() {
        return Err(parse_error(line, "unexpected text after the option name"));
    }

    let mut option = Record::new();
    if !code.trim().is_empty() {
        option.insert(NAME, code);
    }
    for child in children {
        parse_attribute(child, &mut option)?;
    }
    Ok(option)
}

fn parse_column(entry: Entry) -> YxfResult<String> {
    match entry.head.code {
        Some(column) if entry.head.text.trim().is_empty() && entry.children.is_empty() => {
            Ok(column)
        }
        _ => Err(parse_error(entry.line, "expected a `column` name")),
    }
}

/// Where the `yxf` section stands: `None` outside it, then the sheet whose
/// empty columns follow
type MetaSection = Option<Option<SheetKind>>;

/// Parse Markdown text into a document
pub fn from_str(text: &str) -> YxfResult<Document> {
    let mut document = Document::new();
    let mut seen: Vec<SheetKind> = Vec::new();
    let mut section: Option<SheetKind> = None;
    let mut list: Option<String> = None;
    let mut meta: MetaSection = None;
    let mut meta_seen = false;

    for block in blocks(text)? {
        match block {
            Block::Heading {
                level: HeadingLevel::H2,
                text,
                line,
            } if text.trim() == META_KEY => {
                if meta_seen {
                    return Err(parse_error(line, format!("duplicate section {META_KEY:?}")));
                }
                meta_seen = true;
                meta = Some(None);
                section = None;
                list = None;
            }
            Block::Heading {
                level: HeadingLevel::H3,
                text,
                line,
            } if meta.is_some() => {
                let name = text.trim();
                let kind = SheetKind::from_sheet_name(name)
                    .ok_or_else(|| parse_error(line, format!("unknown sheet {name:?}")))?;
                if !document.empty_columns.get(kind).is_empty() {
                    return Err(parse_error(line, format!("duplicate sheet {name:?}")));
                }
                meta = Some(Some(kind));
            }
            Block::List(entries) if meta.is_some() => {
                let line = entries.first().map_or(0, |e| e.line);
                let kind = meta
                    .flatten()
                    .ok_or_else(|| parse_error(line, "columns need a `### sheet` heading"))?;
                for entry in entries {
                    let column = parse_column(entry)?;
                    document.empty_columns.get_mut(kind).push(column);
                }
            }
            Block::Heading {
                level: HeadingLevel::H2,
                text,
                line,
            } => {
                meta = None;
                let name = text.trim();
                let kind = SheetKind::from_sheet_name(name).ok_or_else(|| {
                    parse_error(
                        line,
                        format!("invalid sheet name (must be survey, choices, or settings): {name}"),
                    )
                })?;
                if seen.contains(&kind) {
                    return Err(parse_error(line, format!("duplicate section {name:?}")));
                }
                seen.push(kind);
                section = Some(kind);
                list = None;
            }
            Block::Heading {
                level: HeadingLevel::H3,
                text,
                line,
            } if section == Some(SheetKind::Choices) => {
                let name = text.trim().to_string();
                if name.is_empty() {
                    return Err(parse_error(line, "empty list name"));
                }
                document
                    .choices
                    .entry(name.clone())
                    .or_insert_with(|| ChoiceList::new(name.clone()));
                list = Some(name);
            }
            Block::Heading { line, .. } => {
                return Err(parse_error(line, "unexpected heading"));
            }
            Block::Paragraph { text, line } => {
                if section != Some(SheetKind::Survey) {
                    return Err(parse_error(line, "text outside the survey section"));
                }
                document
                    .survey
                    .push(Item::leaf(Record::new().with_comment(text)));
            }
            Block::List(entries) => {
                let line = entries.first().map_or(0, |e| e.line);
                match (section, &list) {
                    (Some(SheetKind::Survey), _) => {
                        for entry in entries {
                            document.survey.push(parse_item(entry)?);
                        }
                    }
                    (Some(SheetKind::Choices), Some(name)) => {
                        let options = entries
                            .into_iter()
                            .map(parse_option)
                            .collect::<YxfResult<Vec<_>>>()?;
                        document
                            .choices
                            .entry(name.clone())
                            .or_insert_with(|| ChoiceList::new(name.clone()))
                            .options
                            .extend(options);
                    }
                    (Some(SheetKind::Choices), None) => {
                        return Err(parse_error(line, "options need a `### list_name` heading"));
                    }
                    (Some(SheetKind::Settings), _) => {
                        for entry in entries {
                            parse_attribute(entry, &mut document.settings)?;
                        }
                    }
                    (None, _) => {
                        return Err(parse_error(line, "list before the first section"));
                    }
                }
            }
        }
    }

    if !seen.contains(&SheetKind::Survey) {
        return Err(YxfError::Parse(
            "Markdown file must have a \"## survey\" section".to_string(),
        ));
    }
    Ok(document)
}
