use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::cli::{StatusArgs, resolve_db_path};
use crate::model::UploadReport;
use crate::store::Store;

pub fn run(args: StatusArgs) -> Result<()> {
    let db_path = resolve_db_path(&args.cache_root, args.db_path.as_ref());
    let reports_dir = args.cache_root.join("reports");

    info!(cache_root = %args.cache_root.display(), "status requested");

    if db_path.exists() {
        let counts = Store::open_read_only(&db_path)?.counts()?;
        info!(
            path = %db_path.display(),
            schema_version = %counts.schema_version.unwrap_or_default(),
            students = counts.students,
            uploads = counts.uploads,
            last_upload_at = %counts.last_upload_at.unwrap_or_default(),
            "database status"
        );
    } else {
        warn!(path = %db_path.display(), "database file missing");
    }

    match latest_report_path(&reports_dir)? {
        Some(report_path) => {
            let raw = fs::read(&report_path)
                .with_context(|| format!("failed to read {}", report_path.display()))?;
            let report: UploadReport = serde_json::from_slice(&raw)
                .with_context(|| format!("failed to parse {}", report_path.display()))?;
            info!(
                path = %report_path.display(),
                upload_id = %report.upload_id,
                status = %report.status,
                source = %report.source_document,
                kind = report.document_kind.as_str(),
                students_processed = report.counts.students_processed,
                segments_failed = report.counts.segments_failed,
                "latest upload report"
            );
        }
        None => warn!(path = %reports_dir.display(), "no upload reports found"),
    }

    Ok(())
}

/// Report names embed a compact UTC timestamp, so the lexically greatest
/// `upload_*.json` is the newest.
fn latest_report_path(reports_dir: &Path) -> Result<Option<PathBuf>> {
    if !reports_dir.is_dir() {
        return Ok(None);
    }

    let mut latest: Option<PathBuf> = None;
    for entry in fs::read_dir(reports_dir)
        .with_context(|| format!("failed to list {}", reports_dir.display()))?
    {
        let path = entry
            .with_context(|| format!("failed to read entry in {}", reports_dir.display()))?
            .path();
        let is_report = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(|name| name.starts_with("upload_") && name.ends_with(".json"))
            .unwrap_or(false);
        if is_report && latest.as_ref().is_none_or(|current| path > *current) {
            latest = Some(path);
        }
    }
    Ok(latest)
}
