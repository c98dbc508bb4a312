mod pdf;
mod run;
mod workbook;

pub use run::run;

use std::path::Path;

use anyhow::{Result, bail};

use crate::util::lowercase_extension;

const WORKBOOK_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xls", "xlsb", "ods"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Workbook,
    Pdf,
}

impl InputKind {
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = lowercase_extension(path);
        if WORKBOOK_EXTENSIONS.contains(&extension.as_str()) {
            return Ok(Self::Workbook);
        }
        if extension == "pdf" {
            return Ok(Self::Pdf);
        }
        bail!(
            "unsupported input type {:?} for {}: expected one of {} or pdf",
            extension,
            path.display(),
            WORKBOOK_EXTENSIONS.join(", ")
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Workbook => "workbook",
            Self::Pdf => "pdf",
        }
    }
}
