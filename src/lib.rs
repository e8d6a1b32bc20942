//! yxf - lossless XLSForm conversion between Excel and YAML or Markdown
//!
//! An XLSForm keeps a form's questions in the `survey` sheet, nesting them
//! with `begin group`/`end group` rows, and spreads translations over
//! `label::Language` columns. This crate folds those rows into a nested
//! [`Document`] and back, and writes the document as YAML or Markdown text.
//!
//! # Features
//!
//! - Groups and repeats become nested `children`
//! - Translated columns fold into one mapping per attribute
//! - Choice lists are grouped by `list_name`
//! - Round trips keep every cell, and repeated conversions give the same bytes
//!
//! # Example
//!
//! ```no_run
//! use yxf::convert::{Converter, Format};
//!
//! let converter = Converter::default();
//! let bytes = std::fs::read("form.xlsx")?;
//! let yaml = converter.xlsx_to_text(&bytes, Format::Yaml)?;
//! let workbook = converter.text_to_xlsx(&yaml, Format::Yaml)?;
//! # Ok::<(), yxf::error::YxfError>(())
//! ```

pub mod cli;
pub mod codec;
pub mod config;
pub mod convert;
pub mod core;
pub mod error;
pub mod excel;
pub mod types;

// Re-export commonly used types
pub use config::FoldOptions;
pub use convert::{Converter, Format};
pub use error::{StructureError, YxfError, YxfResult};
pub use types::{
    ChoiceList, Document, EmptyColumns, FormSheets, Item, Record, Row, Sheet, Value,
};
