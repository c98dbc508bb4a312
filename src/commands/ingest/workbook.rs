use std::path::Path;

use anyhow::{Context, Result};
use calamine::{Data, Range, Reader, open_workbook_auto};
use tracing::{debug, warn};

use crate::parse::{Cell, Row, Sheet, Workbook};

/// Reads every sheet of an Excel/ODS workbook into absolute-coordinate grids.
pub fn load_workbook(path: &Path) -> Result<Workbook> {
    let mut workbook = open_workbook_auto(path)
        .with_context(|| format!("failed to open workbook {}", path.display()))?;
    let sheet_names = workbook.sheet_names().to_owned();

    let mut sheets = Vec::with_capacity(sheet_names.len());
    for name in sheet_names {
        match workbook.worksheet_range(&name) {
            Ok(range) => {
                let rows = range_to_rows(&range);
                debug!(sheet = %name, rows = rows.len(), "loaded sheet");
                sheets.push(Sheet::new(name, rows));
            }
            Err(err) => {
                warn!(sheet = %name, error = %err, "sheet could not be read; skipping");
            }
        }
    }

    if sheets.is_empty() {
        anyhow::bail!("workbook has no readable sheets: {}", path.display());
    }

    Ok(Workbook { sheets })
}

/// Pads the used range back to A1 so row and column indices match the sheet.
pub fn range_to_rows(range: &Range<Data>) -> Vec<Row> {
    let Some((start_row, start_column)) = range.start() else {
        return Vec::new();
    };

    let mut rows = vec![Row::new(); start_row as usize];
    for source_row in range.rows() {
        let mut row = vec![Cell::Empty; start_column as usize];
        row.extend(source_row.iter().map(data_to_cell));
        rows.push(row);
    }
    rows
}

fn data_to_cell(data: &Data) -> Cell {
    match data {
        Data::Empty | Data::Error(_) => Cell::Empty,
        Data::String(text) if text.trim().is_empty() => Cell::Empty,
        Data::String(text) => Cell::text(text.as_str()),
        Data::Float(value) => Cell::Number(*value),
        Data::Int(value) => Cell::Number(*value as f64),
        other => Cell::text(other.to_string()),
    }
}
