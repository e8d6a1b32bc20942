use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use yxf::cli;
use yxf::config::FoldOptions;

#[derive(Parser)]
#[command(name = "yxf")]
#[command(about = "Convert XLSForms from Excel to YAML or Markdown and back")]
#[command(long_about = "yxf - Convert XLSForms from Excel to YAML or Markdown and back

The text form nests groups and repeats, folds label::Language columns into
one entry per attribute, and keeps every cell, so forms can live in version
control and be reviewed as plain diffs.

DIRECTION (by input extension):
  form.xlsx            → form.yaml (or form.md with --markdown)
  form.yaml, form.yml  → form.xlsx
  form.md              → form.xlsx

EXAMPLES:
  yxf form.xlsx                   # Write form.yaml
  yxf form.xlsx --markdown        # Write form.md
  yxf form.yaml -o build/form.xlsx --force

ENVIRONMENT:
  YXF_TRANSLATABLE   Extra translatable column names, comma-separated
  YXF_LOG            Log filter, e.g. yxf=debug")]
#[command(version)]
struct Cli {
    /// Form to convert (.xlsx, .yaml/.yml or .md)
    file: PathBuf,

    /// Output file (default: same as input, with extension changed)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Use Markdown instead of YAML when converting from Excel
    #[arg(long)]
    markdown: bool,

    /// Allow overwriting existing output files
    #[arg(short, long)]
    force: bool,

    /// Show conversion steps and debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Additional translatable column names (label, hint, ... are built in)
    #[arg(long, env = "YXF_TRANSLATABLE", value_delimiter = ',')]
    translatable: Vec<String>,
}

fn init_logging(verbose: bool) {
    let fallback = if verbose { "yxf=debug" } else { "yxf=warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_env("YXF_LOG").unwrap_or_else(|_| fallback.into()))
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();
    init_logging(args.verbose);

    let options = FoldOptions::default().with_translatable(args.translatable);
    let file = args.file;
    cli::convert(
        file.clone(),
        args.output,
        args.markdown,
        args.force,
        args.verbose,
        options,
    )
    .with_context(|| format!("Failed to convert {}", file.display()))
}
