use serde::{Deserialize, Serialize};

use crate::parse::QuestionNumber;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionAnswer {
    pub question: QuestionNumber,
    pub etalon_answer: String,
    pub student_answer: String,
    pub is_correct: bool,
    pub is_rejected: bool,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectResult {
    pub subject_name: String,
    pub total_questions: u32,
    pub correct_answers: u32,
    pub wrong_answers: u32,
    pub rejected_answers: u32,
    pub answers: Vec<QuestionAnswer>,
    #[serde(alias = "bal")]
    pub score: Option<f64>,
    /// Counts came from a `düz / səhv / imtina` summary row rather than from
    /// tallying `answers`.
    #[serde(default)]
    pub counts_from_summary: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    LegacyWorkbook,
    LiseyWorkbook,
    Pdf,
}

impl DocumentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::LegacyWorkbook => "legacy_workbook",
            Self::LiseyWorkbook => "lisey_workbook",
            Self::Pdf => "pdf",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentAnswerRecord {
    pub student_code: String,
    pub student_name: Option<String>,
    pub total_score: Option<f64>,
    pub subjects: Vec<SubjectResult>,
    pub total_questions: u32,
    pub correct_answers: u32,
    pub wrong_answers: u32,
    pub rejected_answers: u32,
    pub document_kind: DocumentKind,
    pub source_document: String,
    pub sheet_name: Option<String>,
    pub uploaded_at: String,
    pub pdf_page_number: Option<u32>,
}

impl StudentAnswerRecord {
    /// Sums subject scores; the student lookup falls back to this when the
    /// document carried no total.
    pub fn summed_subject_score(&self) -> Option<f64> {
        let scores = self
            .subjects
            .iter()
            .filter_map(|subject| subject.score)
            .collect::<Vec<f64>>();
        if scores.is_empty() {
            None
        } else {
            Some(scores.iter().sum())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentFailure {
    pub segment: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadCounts {
    pub students_processed: usize,
    pub students_failed: usize,
    pub subjects_extracted: usize,
    pub segments_failed: usize,
    pub students_upserted: usize,
    pub pages_correlated: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadReport {
    pub report_version: u32,
    pub upload_id: String,
    pub status: String,
    pub message: String,
    pub started_at: String,
    pub updated_at: String,
    pub source_document: String,
    pub source_sha256: String,
    pub document_kind: DocumentKind,
    pub db_path: Option<String>,
    pub counts: UploadCounts,
    pub failures: Vec<SegmentFailure>,
    pub student_codes: Vec<String>,
}

pub fn upload_message(students_processed: usize, segments_failed: usize) -> String {
    format!("{students_processed} students processed successfully, {segments_failed} segments failed")
}
