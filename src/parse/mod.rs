//! Exam-sheet parsing core.
//!
//! Takes a materialised workbook or the extracted text of a PDF and rebuilds
//! per-student, per-subject answer comparisons. Nothing in here touches the
//! filesystem or the store; every per-segment problem is folded into
//! [`ParseOutcome::failures`] instead of aborting the document.

mod cell;
mod classify;
mod correlate;
mod detect;
mod extract;
mod layout;
mod options;
mod pdf_text;
mod question_numbers;
mod segment;
mod tokenize;

#[cfg(test)]
mod tests;

use thiserror::Error;
use tracing::{debug, info, warn};

pub use cell::{Cell, Row, Sheet, Workbook};
pub use correlate::PageCorrelation;
pub use options::{
    DEFAULT_CORRELATE_TIMEOUT_MS, DEFAULT_MAX_PAGES, DEFAULT_PDF_CODE_PREFIX, ParseOptions,
    SheetFormat,
};
pub use question_numbers::QuestionNumber;

use crate::model::{DocumentKind, SegmentFailure, StudentAnswerRecord, SubjectResult};
use classify::classify_block;
use correlate::correlate_pages;
use detect::detect_format;
use extract::extract_subject;
use layout::{LayoutAdapter, LegacyLayout, LiseyLayout, PdfLayout, StudentMeta};
use segment::{RawSegment, legacy_segments, lisey_segments};

/// Why one segment produced no subject or student.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SegmentError {
    #[error("no etalon row found")]
    MissingEtalonRow,
    #[error("no student answer row found")]
    MissingStudentRow,
    #[error("neither an etalon row nor a student answer row found")]
    NoAnswerRows,
    #[error("no subject blocks found")]
    NoSubjects,
    #[error("answer rows hold no questions")]
    NoQuestions,
    #[error("no student code found")]
    MissingStudentCode,
    #[error("invalid student code pattern: {0}")]
    InvalidCodePattern(String),
}

/// Provenance stamped on every record of one upload.
#[derive(Debug, Clone)]
pub struct UploadSource {
    pub document_name: String,
    pub uploaded_at: String,
}

#[derive(Debug, Clone)]
pub struct ParseOutcome {
    pub kind: DocumentKind,
    pub records: Vec<StudentAnswerRecord>,
    pub failures: Vec<SegmentFailure>,
    pub students_failed: usize,
    pub correlation: Option<PageCorrelation>,
}

/// Subject segments of one student plus what is known about them.
struct StudentUnit<'a> {
    label: String,
    sheet_name: Option<String>,
    meta: StudentMeta,
    segments: Vec<RawSegment<'a>>,
}

impl ParseOutcome {
    fn new(kind: DocumentKind) -> Self {
        Self {
            kind,
            records: Vec::new(),
            failures: Vec::new(),
            students_failed: 0,
            correlation: None,
        }
    }

    pub fn subjects_extracted(&self) -> usize {
        self.records.iter().map(|record| record.subjects.len()).sum()
    }

    pub fn message(&self) -> String {
        crate::model::upload_message(self.records.len(), self.failures.len())
    }

    fn fail_student(&mut self, segment: String, reason: String) {
        warn!(segment = %segment, reason = %reason, "student segment produced no record");
        self.students_failed += 1;
        self.failures.push(SegmentFailure { segment, reason });
    }

    fn push_student(
        &mut self,
        unit: StudentUnit<'_>,
        layout: &dyn LayoutAdapter,
        source: &UploadSource,
    ) {
        let Some(student_code) = unit.meta.code.clone() else {
            self.fail_student(unit.label, SegmentError::MissingStudentCode.to_string());
            return;
        };

        let mut subjects = Vec::<SubjectResult>::new();
        let mut segment_failures = Vec::<SegmentFailure>::new();
        for segment in &unit.segments {
            let identifier = format!(
                "{}/{} (row {})",
                unit.label,
                segment.subject_name,
                segment.first_row + 1
            );
            let extracted = classify_block(segment.rows)
                .and_then(|block| extract_subject(&block, &segment.subject_name, layout));
            match extracted {
                Ok(subject) => subjects.push(subject),
                Err(SegmentError::NoAnswerRows) => {
                    debug!(segment = %identifier, "block has no answer rows; not a subject");
                }
                Err(err) => {
                    warn!(segment = %identifier, reason = %err, "subject segment skipped");
                    segment_failures.push(SegmentFailure {
                        segment: identifier,
                        reason: err.to_string(),
                    });
                }
            }
        }

        if subjects.is_empty() {
            let reason = if segment_failures.is_empty() {
                SegmentError::NoSubjects.to_string()
            } else {
                segment_failures
                    .iter()
                    .map(|failure| format!("{}: {}", failure.segment, failure.reason))
                    .collect::<Vec<String>>()
                    .join("; ")
            };
            self.fail_student(unit.label, reason);
            return;
        }
        self.failures.extend(segment_failures);

        let mut record = StudentAnswerRecord {
            student_code,
            student_name: unit.meta.name,
            total_score: None,
            total_questions: subjects.iter().map(|subject| subject.total_questions).sum(),
            correct_answers: subjects.iter().map(|subject| subject.correct_answers).sum(),
            wrong_answers: subjects.iter().map(|subject| subject.wrong_answers).sum(),
            rejected_answers: subjects.iter().map(|subject| subject.rejected_answers).sum(),
            subjects,
            document_kind: self.kind,
            source_document: source.document_name.clone(),
            sheet_name: unit.sheet_name,
            uploaded_at: source.uploaded_at.clone(),
            pdf_page_number: None,
        };
        record.total_score = unit.meta.total_score.or_else(|| record.summed_subject_score());

        debug!(
            student_code = %record.student_code,
            subjects = record.subjects.len(),
            correct = record.correct_answers,
            "student parsed"
        );

        match self
            .records
            .iter_mut()
            .find(|existing| existing.student_code == record.student_code)
        {
            Some(existing) => {
                debug!(student_code = %record.student_code, "later segment replaces earlier record");
                *existing = record;
            }
            None => self.records.push(record),
        }
    }
}

/// Parses every non-skipped sheet of a workbook in the detected (or forced)
/// dialect. One sheet is one student in both dialects.
pub fn parse_workbook(
    workbook: &Workbook,
    source: &UploadSource,
    options: &ParseOptions,
) -> ParseOutcome {
    let format = options
        .forced_format
        .unwrap_or_else(|| detect_format(workbook, options));
    let layout: &dyn LayoutAdapter = match format {
        SheetFormat::Legacy => &LegacyLayout,
        SheetFormat::Lisey => &LiseyLayout,
    };
    let kind = match format {
        SheetFormat::Legacy => DocumentKind::LegacyWorkbook,
        SheetFormat::Lisey => DocumentKind::LiseyWorkbook,
    };
    info!(
        document = %source.document_name,
        format = format.as_str(),
        sheets = workbook.sheets.len(),
        "parsing workbook"
    );

    let mut outcome = ParseOutcome::new(kind);
    for sheet in &workbook.sheets {
        if options.is_skipped_sheet(&sheet.name) {
            debug!(sheet = %sheet.name, "skipping summary sheet");
            continue;
        }
        if sheet.rows.iter().all(|row| cell::row_is_blank(row)) {
            debug!(sheet = %sheet.name, "skipping blank sheet");
            continue;
        }

        let segments = match format {
            SheetFormat::Legacy => legacy_segments(&sheet.rows),
            SheetFormat::Lisey => lisey_segments(&sheet.rows),
        };
        let unit = StudentUnit {
            label: sheet.name.clone(),
            sheet_name: Some(sheet.name.clone()),
            meta: layout.student_meta(&sheet.rows, &sheet.name),
            segments,
        };
        outcome.push_student(unit, layout, source);
    }

    info!(
        students = outcome.records.len(),
        failures = outcome.failures.len(),
        "workbook parsed"
    );
    outcome
}

/// Parses a PDF text dump: one student per run of lines opened by a student
/// code, one subject per configured subject title inside it.
pub fn parse_pdf_text(text: &str, source: &UploadSource, options: &ParseOptions) -> ParseOutcome {
    let mut outcome = ParseOutcome::new(DocumentKind::Pdf);
    let code_pattern = match options.student_code_regex() {
        Ok(pattern) => pattern,
        Err(err) => {
            outcome.fail_student(
                source.document_name.clone(),
                SegmentError::InvalidCodePattern(err.to_string()).to_string(),
            );
            return outcome;
        }
    };

    let students = pdf_text::student_segments(text, &code_pattern);
    info!(
        document = %source.document_name,
        students = students.len(),
        "parsing pdf text"
    );

    for student in students {
        let rows = student
            .lines
            .iter()
            .map(|line| pdf_text::line_to_row(line))
            .collect::<Vec<Row>>();
        let segments = pdf_text::subject_sections(&student.lines, &options.pdf_subjects)
            .into_iter()
            .map(|(subject_name, range)| RawSegment {
                subject_name,
                first_row: student.first_line - 1 + range.start,
                rows: &rows[range],
            })
            .collect::<Vec<RawSegment<'_>>>();

        let unit = StudentUnit {
            label: format!("{} (line {})", student.student_code, student.first_line),
            sheet_name: None,
            meta: PdfLayout.student_meta(&rows, &student.student_code),
            segments,
        };
        outcome.push_student(unit, &PdfLayout, source);
    }

    info!(
        students = outcome.records.len(),
        failures = outcome.failures.len(),
        "pdf text parsed"
    );
    outcome
}

/// Parses per-page PDF text and records the first page of every parsed
/// student within the configured page and time budget.
pub fn parse_pdf_pages(
    pages: &[String],
    source: &UploadSource,
    options: &ParseOptions,
) -> ParseOutcome {
    let mut outcome = parse_pdf_text(&pages.join("\n"), source, options);

    let codes = outcome
        .records
        .iter()
        .map(|record| record.student_code.clone())
        .collect::<Vec<String>>();
    let correlation = correlate_pages(pages, &codes, options.max_pages, options.correlate_timeout);
    for record in &mut outcome.records {
        record.pdf_page_number = correlation.pages.get(&record.student_code).copied();
    }
    outcome.correlation = Some(correlation);
    outcome
}
