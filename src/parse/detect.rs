use tracing::debug;

use super::cell::Workbook;
use super::options::{ParseOptions, SheetFormat};
use super::segment::has_lisey_fingerprint;

/// Picks the spreadsheet dialect. Any non-skipped sheet opening with a Lisey
/// block makes the whole workbook Lisey; everything else is legacy, including
/// workbooks with no recognisable structure at all.
pub fn detect_format(workbook: &Workbook, options: &ParseOptions) -> SheetFormat {
    let lisey_sheet = workbook
        .sheets
        .iter()
        .filter(|sheet| !options.is_skipped_sheet(&sheet.name))
        .find(|sheet| has_lisey_fingerprint(&sheet.rows));

    match lisey_sheet {
        Some(sheet) => {
            debug!(sheet = %sheet.name, "lisey fingerprint matched");
            SheetFormat::Lisey
        }
        None => SheetFormat::Legacy,
    }
}
