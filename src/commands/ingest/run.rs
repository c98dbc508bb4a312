use std::time::Duration;

use anyhow::{Result, bail};
use chrono::{DateTime, Utc};
use tracing::{info, warn};

use super::InputKind;
use super::pdf::extract_pages_with_pdftotext;
use super::workbook::load_workbook;
use crate::cli::{IngestArgs, resolve_db_path};
use crate::model::{UploadCounts, UploadReport};
use crate::parse::{ParseOptions, ParseOutcome, UploadSource, parse_pdf_pages, parse_workbook};
use crate::store::ConnectPolicy;
use crate::util::{
    file_name_string, now_utc_string, rfc3339_utc, sha256_file, utc_compact_millis_string,
    write_json_pretty, write_json_stdout,
};

const REPORT_VERSION: u32 = 1;
const UPLOAD_ID_SHA_PREFIX: usize = 12;

pub fn run(args: IngestArgs) -> Result<()> {
    let started_ts = Utc::now();
    let started_at = rfc3339_utc(started_ts);

    let input_kind = InputKind::from_path(&args.input)?;
    if !args.input.is_file() {
        bail!("input file not found: {}", args.input.display());
    }

    let source_sha256 = sha256_file(&args.input)?;
    let upload_stamp = upload_stamp(started_ts, &source_sha256);
    let upload_id = format!("upload-{upload_stamp}");

    let cache_root = args.cache_root.clone();
    let db_path = resolve_db_path(&cache_root, args.db_path.as_ref());
    let report_path = args.report_path.clone().unwrap_or_else(|| {
        cache_root
            .join("reports")
            .join(format!("upload_{upload_stamp}.json"))
    });

    info!(
        input = %args.input.display(),
        kind = input_kind.as_str(),
        format = args.format.as_str(),
        upload_id = %upload_id,
        "starting ingest"
    );

    let source = UploadSource {
        document_name: file_name_string(&args.input),
        uploaded_at: started_at.clone(),
    };
    let options = parse_options(&args);

    let outcome = match input_kind {
        InputKind::Workbook => {
            let workbook = load_workbook(&args.input)?;
            parse_workbook(&workbook, &source, &options)
        }
        InputKind::Pdf => {
            let pages = extract_pages_with_pdftotext(&args.input)?;
            info!(pages = pages.len(), "extracted pdf text");
            parse_pdf_pages(&pages, &source, &options)
        }
    };

    let mut report = build_report(&upload_id, &started_at, &source, &source_sha256, &outcome);

    if args.dry_run {
        info!("dry run; store left untouched");
        write_json_stdout(&report)?;
        return Ok(());
    }

    let mut store = ConnectPolicy::with_attempts(args.connect_attempts).open(&db_path)?;
    report.counts.students_upserted = store.upsert_records(&outcome.records)?;
    report.db_path = Some(db_path.display().to_string());
    report.updated_at = now_utc_string();
    store.record_upload(&report)?;

    write_json_pretty(&report_path, &report)?;
    info!(path = %report_path.display(), "wrote upload report");

    if !outcome.failures.is_empty() {
        warn!(
            segments_failed = outcome.failures.len(),
            students_failed = outcome.students_failed,
            "some segments produced no result; see the upload report"
        );
    }
    info!(
        students = outcome.records.len(),
        segments_failed = outcome.failures.len(),
        "ingest completed"
    );
    println!("{}", report.message);

    Ok(())
}

/// Millisecond timestamp plus a source hash prefix, so that two uploads in
/// the same instant still get distinct ids and report files.
pub(super) fn upload_stamp(started: DateTime<Utc>, source_sha256: &str) -> String {
    let prefix = source_sha256
        .get(..UPLOAD_ID_SHA_PREFIX)
        .unwrap_or(source_sha256);
    format!("{}-{prefix}", utc_compact_millis_string(started))
}

pub(super) fn parse_options(args: &IngestArgs) -> ParseOptions {
    let mut options = ParseOptions {
        forced_format: args.format.forced_format(),
        pdf_code_prefix: args.pdf_code_prefix.clone(),
        pdf_code_min_digits: args.pdf_code_min_digits,
        max_pages: args.max_pages,
        correlate_timeout: Duration::from_millis(args.correlate_timeout_ms),
        ..ParseOptions::default()
    };
    options
        .skipped_sheet_names
        .extend(args.skip_sheets.iter().cloned());
    if !args.pdf_subjects.is_empty() {
        options.pdf_subjects = args.pdf_subjects.clone();
    }
    options
}

pub(super) fn build_report(
    upload_id: &str,
    started_at: &str,
    source: &UploadSource,
    source_sha256: &str,
    outcome: &ParseOutcome,
) -> UploadReport {
    let status = if outcome.failures.is_empty() {
        "completed"
    } else {
        "completed_with_failures"
    };

    UploadReport {
        report_version: REPORT_VERSION,
        upload_id: upload_id.to_string(),
        status: status.to_string(),
        message: outcome.message(),
        started_at: started_at.to_string(),
        updated_at: now_utc_string(),
        source_document: source.document_name.clone(),
        source_sha256: source_sha256.to_string(),
        document_kind: outcome.kind,
        db_path: None,
        counts: UploadCounts {
            students_processed: outcome.records.len(),
            students_failed: outcome.students_failed,
            subjects_extracted: outcome.subjects_extracted(),
            segments_failed: outcome.failures.len(),
            students_upserted: 0,
            pages_correlated: outcome
                .correlation
                .as_ref()
                .map(|correlation| correlation.pages.len())
                .unwrap_or(0),
        },
        failures: outcome.failures.clone(),
        student_codes: outcome
            .records
            .iter()
            .map(|record| record.student_code.clone())
            .collect(),
    }
}
