use thiserror::Error;

pub type YxfResult<T> = Result<T, YxfError>;

#[derive(Error, Debug)]
pub enum YxfError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Excel error: {0}")]
    Excel(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Cannot write Markdown: {0}")]
    Markdown(String),

    #[error("Structure error: {0}")]
    Structure(#[from] StructureError),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<calamine::XlsxError> for YxfError {
    fn from(e: calamine::XlsxError) -> Self {
        YxfError::Excel(format!("Failed to read workbook: {e}"))
    }
}

impl From<rust_xlsxwriter::XlsxError> for YxfError {
    fn from(e: rust_xlsxwriter::XlsxError) -> Self {
        YxfError::Excel(format!("Failed to write workbook: {e}"))
    }
}

/// A form whose rows cannot be mapped between the tabular and nested shapes.
///
/// Always fatal to the conversion that raised it. The location points at the
/// offending sheet, and where known the spreadsheet row number (header = 1)
/// and column.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{}{}: {}", .sheet, location(.row, .column), .message)]
pub struct StructureError {
    pub sheet: String,
    pub row: Option<usize>,
    pub column: Option<String>,
    pub message: String,
}

impl StructureError {
    pub fn new(sheet: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            sheet: sheet.into(),
            row: None,
            column: None,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn at_row(mut self, row: usize) -> Self {
        self.row = Some(row);
        self
    }

    #[must_use]
    pub fn at_column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }
}

fn location(row: &Option<usize>, column: &Option<String>) -> String {
    let mut out = String::new();
    if let Some(row) = row {
        out.push_str(&format!(" row {row}"));
    }
    if let Some(column) = column {
        out.push_str(&format!(" column \"{column}\""));
    }
    out
}
