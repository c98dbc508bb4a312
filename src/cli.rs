use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::parse::{
    DEFAULT_CORRELATE_TIMEOUT_MS, DEFAULT_MAX_PAGES, DEFAULT_PDF_CODE_PREFIX, SheetFormat,
};

#[derive(Parser, Debug)]
#[command(
    name = "examsheet",
    version,
    about = "Exam answer-sheet ingestion and student result lookup"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Parse a workbook or PDF and store one record per student.
    Ingest(IngestArgs),
    /// Show one student's results by code.
    Lookup(LookupArgs),
    /// List stored students, newest upload first.
    List(ListArgs),
    Status(StatusArgs),
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum FormatChoice {
    Auto,
    Legacy,
    Lisey,
}

impl FormatChoice {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Legacy => "legacy",
            Self::Lisey => "lisey",
        }
    }

    pub fn forced_format(self) -> Option<SheetFormat> {
        match self {
            Self::Auto => None,
            Self::Legacy => Some(SheetFormat::Legacy),
            Self::Lisey => Some(SheetFormat::Lisey),
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct IngestArgs {
    #[arg(long, env = "EXAMSHEET_CACHE_ROOT", default_value = ".cache/examsheet")]
    pub cache_root: PathBuf,

    #[arg(long, env = "EXAMSHEET_DB_PATH")]
    pub db_path: Option<PathBuf>,

    #[arg(long)]
    pub report_path: Option<PathBuf>,

    #[arg(long)]
    pub input: PathBuf,

    #[arg(long, value_enum, default_value_t = FormatChoice::Auto)]
    pub format: FormatChoice,

    /// Additional sheet names to ignore besides the built-in summary sheets.
    #[arg(long = "skip-sheet")]
    pub skip_sheets: Vec<String>,

    #[arg(long, default_value = DEFAULT_PDF_CODE_PREFIX)]
    pub pdf_code_prefix: String,

    #[arg(long, default_value_t = 4)]
    pub pdf_code_min_digits: usize,

    /// Subject titles recognised in PDF text; replaces the defaults when given.
    #[arg(long = "pdf-subject")]
    pub pdf_subjects: Vec<String>,

    #[arg(long, default_value_t = DEFAULT_MAX_PAGES)]
    pub max_pages: usize,

    #[arg(long, default_value_t = DEFAULT_CORRELATE_TIMEOUT_MS)]
    pub correlate_timeout_ms: u64,

    #[arg(long, default_value_t = 5)]
    pub connect_attempts: u32,

    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
}

#[derive(Args, Debug, Clone)]
pub struct LookupArgs {
    #[arg(long, env = "EXAMSHEET_CACHE_ROOT", default_value = ".cache/examsheet")]
    pub cache_root: PathBuf,

    #[arg(long, env = "EXAMSHEET_DB_PATH")]
    pub db_path: Option<PathBuf>,

    #[arg(long)]
    pub code: String,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    #[arg(long, env = "EXAMSHEET_CACHE_ROOT", default_value = ".cache/examsheet")]
    pub cache_root: PathBuf,

    #[arg(long, env = "EXAMSHEET_DB_PATH")]
    pub db_path: Option<PathBuf>,

    #[arg(long, default_value_t = 50)]
    pub limit: usize,
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    #[arg(long, env = "EXAMSHEET_CACHE_ROOT", default_value = ".cache/examsheet")]
    pub cache_root: PathBuf,

    #[arg(long, env = "EXAMSHEET_DB_PATH")]
    pub db_path: Option<PathBuf>,
}

pub fn resolve_db_path(cache_root: &std::path::Path, db_path: Option<&PathBuf>) -> PathBuf {
    db_path
        .cloned()
        .unwrap_or_else(|| cache_root.join("examsheet.sqlite"))
}
