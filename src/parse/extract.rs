use tracing::debug;

use super::SegmentError;
use super::cell::{Cell, normalize_label, parse_number};
use super::classify::{ClassifiedBlock, LaneStyle, Lanes, row_lanes};
use super::layout::LayoutAdapter;
use super::question_numbers::{QuestionNumber, parse_question_numbers};
use super::tokenize::tokenize;
use crate::model::{QuestionAnswer, SubjectResult};

/// A rejected answer whose student cell is blank or within this distance of
/// zero counts as wrong instead.
const ZERO_TOLERANCE: f64 = 0.01;

/// Builds one subject result from a classified block. The layout adapter
/// supplies the question row and summary statistics; tokenisation and
/// correctness rules are the same for every layout.
pub fn extract_subject(
    block: &ClassifiedBlock<'_>,
    subject_name: &str,
    layout: &dyn LayoutAdapter,
) -> Result<SubjectResult, SegmentError> {
    let etalon = block.lanes(block.etalon_row);
    let student = block.lanes(block.student_row);
    let markers = block
        .marker_row
        .map(|index| marker_values(&block.lanes(index)));
    let scores = block
        .score_row
        .map(|index| score_values(&block.lanes(index)));

    let question_count = match &markers {
        Some(markers) if !markers.is_empty() => markers.len(),
        _ => lane_count(&etalon).max(lane_count(&student)),
    };
    if question_count == 0 {
        return Err(SegmentError::NoQuestions);
    }

    let etalon = lane_tokens(&etalon, question_count);
    let student = lane_tokens(&student, question_count);
    let markers = markers.map(|values| fit(values, question_count));
    let scores = scores.map(|values| fit(values, question_count));
    let questions = layout
        .question_row(block)
        .map(|index| question_labels(block.row(index), block.lane_style))
        .unwrap_or_default();

    let mut answers = Vec::<QuestionAnswer>::new();
    for position in 0..question_count {
        let etalon_answer = etalon[position].clone();
        let student_answer = student[position].clone();
        let marker = markers
            .as_ref()
            .map(|values| values[position].as_str())
            .unwrap_or("");
        if etalon_answer.is_empty() && student_answer.is_empty() && marker.is_empty() {
            continue;
        }

        let score_value = scores
            .as_ref()
            .and_then(|values| parse_number(&values[position]));
        let (is_correct, is_rejected) = if markers.is_none() && scores.is_none() {
            (answers_match(&etalon_answer, &student_answer), false)
        } else {
            classify_answer(marker, score_value, &student_answer)
        };

        let question = questions
            .get(position)
            .copied()
            .flatten()
            .unwrap_or_else(|| QuestionNumber::whole(position as u32 + 1));

        answers.push(QuestionAnswer {
            question,
            etalon_answer,
            student_answer,
            is_correct,
            is_rejected,
            score: score_value.unwrap_or(if is_correct { 1.0 } else { 0.0 }),
        });
    }

    if answers.is_empty() {
        return Err(SegmentError::NoQuestions);
    }

    let correct = answers.iter().filter(|answer| answer.is_correct).count() as u32;
    let rejected = answers.iter().filter(|answer| answer.is_rejected).count() as u32;
    let wrong = answers.len() as u32 - correct - rejected;

    let mut result = SubjectResult {
        subject_name: subject_name.to_string(),
        total_questions: answers.len() as u32,
        correct_answers: correct,
        wrong_answers: wrong,
        rejected_answers: rejected,
        answers,
        score: None,
        counts_from_summary: false,
    };

    if let Some(summary) = layout.summary(block) {
        debug!(
            subject = subject_name,
            layout = layout.name(),
            correct = summary.correct,
            wrong = summary.wrong,
            rejected = summary.rejected,
            "summary row overrides tallied counts"
        );
        result.correct_answers = summary.correct;
        result.wrong_answers = summary.wrong;
        result.rejected_answers = summary.rejected;
        result.total_questions = summary.correct + summary.wrong + summary.rejected;
        result.score = summary.score;
        result.counts_from_summary = true;
    }

    Ok(result)
}

/// Returns `(is_correct, is_rejected)`. A correct mark wins over a rejection
/// mark, so the two flags never both hold.
pub fn classify_answer(marker: &str, score: Option<f64>, student_answer: &str) -> (bool, bool) {
    let marker = normalize_label(marker);
    let is_correct = marker == "+" || marker == "✓" || score == Some(1.0);
    if is_correct {
        return (true, false);
    }

    let rejection_mark = marker == "i" || marker == "imtina";
    (false, rejection_mark && !is_blank_or_zero(student_answer))
}

fn is_blank_or_zero(answer: &str) -> bool {
    let trimmed = answer.trim();
    trimmed.is_empty()
        || parse_number(trimmed)
            .map(|value| value.abs() <= ZERO_TOLERANCE)
            .unwrap_or(false)
}

fn answers_match(etalon: &str, student: &str) -> bool {
    !etalon.is_empty() && etalon.to_lowercase() == student.to_lowercase()
}

fn lane_count(lanes: &Lanes) -> usize {
    match lanes {
        Lanes::Positional(values) => values.len(),
        Lanes::Condensed(text) => tokenize(text, None).len(),
    }
}

fn lane_tokens(lanes: &Lanes, count: usize) -> Vec<String> {
    match lanes {
        Lanes::Positional(values) => fit(values.clone(), count),
        Lanes::Condensed(text) => fit(tokenize(text, Some(count)), count),
    }
}

fn marker_values(lanes: &Lanes) -> Vec<String> {
    match lanes {
        Lanes::Positional(values) => values.clone(),
        Lanes::Condensed(text) if normalize_label(text) == "imtina" => vec![text.clone()],
        Lanes::Condensed(text) => text.chars().map(String::from).collect(),
    }
}

fn score_values(lanes: &Lanes) -> Vec<String> {
    match lanes {
        Lanes::Positional(values) => values.clone(),
        Lanes::Condensed(text) => text.chars().map(String::from).collect(),
    }
}

fn fit(mut values: Vec<String>, count: usize) -> Vec<String> {
    values.resize(count, String::new());
    values
}

fn question_labels(row: &[Cell], style: LaneStyle) -> Vec<Option<QuestionNumber>> {
    match row_lanes(row, style) {
        Lanes::Positional(values) => values
            .iter()
            .flat_map(|value| {
                if value.contains(char::is_whitespace) {
                    parse_question_numbers(value)
                        .into_iter()
                        .map(Some)
                        .collect::<Vec<Option<QuestionNumber>>>()
                } else {
                    vec![QuestionNumber::parse(value)]
                }
            })
            .collect(),
        Lanes::Condensed(text) => parse_question_numbers(&text)
            .into_iter()
            .map(Some)
            .collect(),
    }
}
