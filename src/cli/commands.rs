use crate::config::FoldOptions;
use crate::convert::{Converter, Format};
use crate::error::{YxfError, YxfResult};
use colored::Colorize;
use std::path::{Path, PathBuf};

/// Pick the target format and output path for `file`.
///
/// Workbooks become YAML, or Markdown when asked for or when the output
/// ends in `.md`. Text files become workbooks.
pub fn plan(file: &Path, output: Option<PathBuf>, markdown: bool) -> YxfResult<(Format, PathBuf)> {
    let source = Format::from_path(file).ok_or_else(|| {
        YxfError::Config(format!("Unrecognized file extension: {}", file.display()))
    })?;
    let requested = output.as_deref().and_then(Format::from_path);

    let target = match source {
        Format::Xlsx if markdown || requested == Some(Format::Markdown) => Format::Markdown,
        Format::Xlsx => Format::Yaml,
        Format::Yaml | Format::Markdown => Format::Xlsx,
    };
    if let Some(requested) = requested {
        if requested != target {
            return Err(YxfError::Config(format!(
                "{} input converts to {}, not {}",
                source.display_name(),
                target.display_name(),
                requested.display_name()
            )));
        }
    }

    let output = output.unwrap_or_else(|| file.with_extension(target.extension()));
    Ok((target, output))
}

/// Execute the convert command
pub fn convert(
    file: PathBuf,
    output: Option<PathBuf>,
    markdown: bool,
    force: bool,
    verbose: bool,
    options: FoldOptions,
) -> YxfResult<()> {
    let (target, output) = plan(&file, output, markdown)?;

    println!("{}", "📋 yxf - XLSForm conversion".bold().green());
    println!("   Input:  {}", file.display());
    println!("   Output: {}\n", output.display());

    if output.exists() && !force {
        return Err(YxfError::Config(format!(
            "File already exists (use --force to override): {}",
            output.display()
        )));
    }

    if verbose {
        println!(
            "{}",
            format!("🔄 Converting to {}...", target.display_name()).cyan()
        );
        println!("   Translatable columns: {}\n", options.translatable.join(", "));
    }

    Converter::new(options).convert_file(&file, &output, target)?;

    println!("{}", "✅ Conversion Complete!".bold().green());
    println!("   {} file: {}\n", target.display_name(), output.display());

    Ok(())
}
