use std::time::Duration;

use regex::Regex;

use super::cell::normalize_label;

pub const DEFAULT_PDF_CODE_PREFIX: &str = "100";
pub const DEFAULT_PDF_CODE_MIN_DIGITS: usize = 4;
pub const DEFAULT_MAX_PAGES: usize = 500;
pub const DEFAULT_CORRELATE_TIMEOUT_MS: u64 = 20_000;

pub const DEFAULT_PDF_SUBJECTS: &[&str] = &["Azərbaycan dili", "Riyaziyyat", "İngilis dili"];
pub const DEFAULT_SKIPPED_SHEETS: &[&str] = &["ümumi", "umumi", "summary", "hesabat"];

/// Which spreadsheet dialect governs a workbook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetFormat {
    Legacy,
    Lisey,
}

impl SheetFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Legacy => "legacy",
            Self::Lisey => "lisey",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Skips format detection when set.
    pub forced_format: Option<SheetFormat>,
    pub skipped_sheet_names: Vec<String>,
    pub pdf_subjects: Vec<String>,
    pub pdf_code_prefix: String,
    pub pdf_code_min_digits: usize,
    pub max_pages: usize,
    pub correlate_timeout: Duration,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            forced_format: None,
            skipped_sheet_names: DEFAULT_SKIPPED_SHEETS
                .iter()
                .map(|name| name.to_string())
                .collect(),
            pdf_subjects: DEFAULT_PDF_SUBJECTS
                .iter()
                .map(|name| name.to_string())
                .collect(),
            pdf_code_prefix: DEFAULT_PDF_CODE_PREFIX.to_string(),
            pdf_code_min_digits: DEFAULT_PDF_CODE_MIN_DIGITS,
            max_pages: DEFAULT_MAX_PAGES,
            correlate_timeout: Duration::from_millis(DEFAULT_CORRELATE_TIMEOUT_MS),
        }
    }
}

impl ParseOptions {
    pub fn is_skipped_sheet(&self, sheet_name: &str) -> bool {
        let normalized = normalize_label(sheet_name);
        self.skipped_sheet_names
            .iter()
            .any(|name| normalize_label(name) == normalized)
    }

    /// Regex matching a student code on a PDF text line: the configured
    /// numeric prefix followed by at least `pdf_code_min_digits` digits.
    pub fn student_code_regex(&self) -> Result<Regex, regex::Error> {
        let pattern = format!(
            r"(?:^|\D)({}\d{{{},}})(?:\D|$)",
            regex::escape(self.pdf_code_prefix.trim()),
            self.pdf_code_min_digits
        );
        Regex::new(&pattern)
    }
}
