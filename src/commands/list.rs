use std::io::{self, BufWriter, Write};

use anyhow::{Result, bail};
use tracing::info;

use crate::cli::{ListArgs, resolve_db_path};
use crate::store::Store;

pub fn run(args: ListArgs) -> Result<()> {
    let db_path = resolve_db_path(&args.cache_root, args.db_path.as_ref());
    if !db_path.exists() {
        bail!(
            "database not found at {}; run `examsheet ingest` first",
            db_path.display()
        );
    }

    let store = Store::open_read_only(&db_path)?;
    let listings = store.list_students(args.limit)?;
    info!(returned = listings.len(), limit = args.limit, "listed students");

    let mut output = BufWriter::new(io::stdout().lock());
    writeln!(output, "Students: {}", listings.len())?;
    for listing in &listings {
        writeln!(
            output,
            "{}\t{}\tsubjects={}\tscore={}\t{}\t{}",
            listing.student_code,
            listing.student_name.as_deref().unwrap_or("-"),
            listing.subject_count,
            listing
                .total_score
                .map(|score| format!("{score:.2}"))
                .unwrap_or_else(|| "-".to_string()),
            listing.source_document,
            listing.uploaded_at
        )?;
    }
    output.flush()?;
    Ok(())
}
