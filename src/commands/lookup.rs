use std::io::{self, BufWriter, Write};

use anyhow::{Context, Result, bail};
use tracing::info;

use crate::cli::{LookupArgs, resolve_db_path};
use crate::model::StudentAnswerRecord;
use crate::store::Store;
use crate::util::write_json_stdout;

pub fn run(args: LookupArgs) -> Result<()> {
    let db_path = resolve_db_path(&args.cache_root, args.db_path.as_ref());
    if !db_path.exists() {
        bail!(
            "database not found at {}; run `examsheet ingest` first",
            db_path.display()
        );
    }

    let code = args.code.trim();
    info!(student_code = %code, "student lookup");

    let store = Store::open_read_only(&db_path)?;
    let Some(record) = store.load_student(code)? else {
        bail!("no results found for student code {code}");
    };

    if args.json {
        return write_json_stdout(&record);
    }

    let mut output = BufWriter::new(io::stdout().lock());
    write_text_record(&mut output, &record).context("failed to write lookup output")?;
    output.flush()?;
    Ok(())
}

fn format_score(score: Option<f64>) -> String {
    score
        .map(|value| format!("{value:.2}"))
        .unwrap_or_else(|| "-".to_string())
}

fn write_text_record(output: &mut impl Write, record: &StudentAnswerRecord) -> io::Result<()> {
    writeln!(
        output,
        "Student: {} {}",
        record.student_code,
        record.student_name.as_deref().unwrap_or("(name unknown)")
    )?;
    writeln!(
        output,
        "Source: {} [{}]{} uploaded {}",
        record.source_document,
        record.document_kind.as_str(),
        record
            .sheet_name
            .as_deref()
            .map(|sheet| format!(" sheet {sheet}"))
            .unwrap_or_default(),
        record.uploaded_at
    )?;
    if let Some(page) = record.pdf_page_number {
        writeln!(output, "PDF page: {page}")?;
    }

    writeln!(output, "Subjects: {}", record.subjects.len())?;
    for (index, subject) in record.subjects.iter().enumerate() {
        writeln!(
            output,
            "{}.\t{}\tquestions={} correct={} wrong={} rejected={} score={}{}",
            index + 1,
            subject.subject_name,
            subject.total_questions,
            subject.correct_answers,
            subject.wrong_answers,
            subject.rejected_answers,
            format_score(subject.score),
            if subject.counts_from_summary {
                " (summary)"
            } else {
                ""
            }
        )?;
    }

    writeln!(
        output,
        "Totals: questions={} correct={} wrong={} rejected={}",
        record.total_questions, record.correct_answers, record.wrong_answers, record.rejected_answers
    )?;
    writeln!(
        output,
        "Total score: {}",
        format_score(record.total_score.or_else(|| record.summed_subject_score()))
    )?;
    Ok(())
}
