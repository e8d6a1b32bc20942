//! Whole conversions: workbook ↔ text, in memory or between files
//!
//! File conversions read the input completely, convert in memory, and only
//! then write the output, so a failed conversion never leaves a partial file.

use crate::codec::{markdown, yaml};
use crate::config::FoldOptions;
use crate::core::ordering::COMMENT;
use crate::core::{fold_sheets, normalize_document, unfold_document};
use crate::error::{YxfError, YxfResult};
use crate::excel::{ExcelExporter, ExcelImporter};
use crate::types::{Document, Item, Record};
use std::fs;
use std::path::Path;
use tracing::info;

/// Start of the comment yxf leaves on the first survey row
pub const NOTICE_PREFIX: &str = "Converted by yxf,";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Xlsx,
    Yaml,
    Markdown,
}

impl Format {
    /// Format implied by a file extension (`.xlsx`, `.yaml`/`.yml`, `.md`)
    pub fn from_path(path: &Path) -> Option<Format> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "xlsx" => Some(Format::Xlsx),
            "yaml" | "yml" => Some(Format::Yaml),
            "md" | "markdown" => Some(Format::Markdown),
            _ => None,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Format::Xlsx => "xlsx",
            Format::Yaml => "yaml",
            Format::Markdown => "md",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Format::Xlsx => "Excel",
            Format::Yaml => "YAML",
            Format::Markdown => "Markdown",
        }
    }
}

/// Make the first survey item a comment pointing readers at the text file.
///
/// An older notice is replaced, never stacked. Empty surveys are left alone.
pub fn ensure_notice(document: &mut Document, source_name: &str, text_format: Format) {
    if document.survey.is_empty() {
        return;
    }
    document.empty_columns.survey.retain(|column| column != COMMENT);
    let notice = format!(
        "{NOTICE_PREFIX} from {source_name}. Edit the {} file instead of the Excel file.",
        text_format.display_name()
    );
    match document.survey.first_mut() {
        Some(first)
            if first
                .record
                .comment
                .as_deref()
                .is_some_and(|c| c.starts_with(NOTICE_PREFIX)) =>
        {
            first.record.comment = Some(notice);
        }
        _ => document
            .survey
            .insert(0, Item::leaf(Record::new().with_comment(notice))),
    }
}

/// Converts forms using one set of fold options
#[derive(Debug, Clone, Default)]
pub struct Converter {
    options: FoldOptions,
}

impl Converter {
    pub fn new(options: FoldOptions) -> Self {
        Self { options }
    }

    pub fn read_xlsx(&self, bytes: &[u8]) -> YxfResult<Document> {
        let sheets = ExcelImporter::new(bytes).import()?;
        Ok(fold_sheets(&sheets, &self.options)?)
    }

    pub fn write_xlsx(&self, document: &Document) -> YxfResult<Vec<u8>> {
        let sheets = unfold_document(document, &self.options)?;
        ExcelExporter::new(&sheets).to_bytes()
    }

    pub fn read_text(&self, text: &str, format: Format) -> YxfResult<Document> {
        let mut document = match format {
            Format::Yaml => yaml::from_str(text)?,
            Format::Markdown => markdown::from_str(text)?,
            Format::Xlsx => {
                return Err(YxfError::Config(
                    "an Excel workbook is not a text format".to_string(),
                ));
            }
        };
        normalize_document(&mut document, &self.options);
        Ok(document)
    }

    pub fn write_text(&self, document: &Document, format: Format) -> YxfResult<String> {
        // Text is only written for documents that unfold back into sheets.
        unfold_document(document, &self.options)?;
        match format {
            Format::Yaml => yaml::to_string(document),
            Format::Markdown => markdown::to_string(document),
            Format::Xlsx => Err(YxfError::Config(
                "an Excel workbook is not a text format".to_string(),
            )),
        }
    }

    /// Workbook bytes → YAML or Markdown text
    pub fn xlsx_to_text(&self, bytes: &[u8], format: Format) -> YxfResult<String> {
        self.write_text(&self.read_xlsx(bytes)?, format)
    }

    /// YAML or Markdown text → workbook bytes
    pub fn text_to_xlsx(&self, text: &str, format: Format) -> YxfResult<Vec<u8>> {
        self.write_xlsx(&self.read_text(text, format)?)
    }

    /// Convert `input` into `output` as `target`, adding the conversion notice.
    /// Exactly one side must be a workbook.
    pub fn convert_file(&self, input: &Path, output: &Path, target: Format) -> YxfResult<()> {
        let source = Format::from_path(input).ok_or_else(|| {
            YxfError::Config(format!("Unrecognized file extension: {}", input.display()))
        })?;
        let text_format = match (source, target) {
            (Format::Xlsx, Format::Yaml | Format::Markdown) => target,
            (Format::Yaml | Format::Markdown, Format::Xlsx) => source,
            _ => {
                return Err(YxfError::Config(format!(
                    "cannot convert {} to {}",
                    source.display_name(),
                    target.display_name()
                )));
            }
        };

        let mut document = match source {
            Format::Xlsx => self.read_xlsx(&fs::read(input)?)?,
            text => self.read_text(&fs::read_to_string(input)?, text)?,
        };

        let source_name = input
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        ensure_notice(&mut document, &source_name, text_format);

        let bytes = match target {
            Format::Xlsx => self.write_xlsx(&document)?,
            text => self.write_text(&document, text)?.into_bytes(),
        };
        fs::write(output, bytes)?;

        info!(
            input = %input.display(),
            output = %output.display(),
            "converted {} to {}",
            source.display_name(),
            target.display_name()
        );
        Ok(())
    }
}
