use std::ops::Range;

use regex::Regex;

use super::cell::{Cell, Row, normalize_label};
use super::classify::{RowRole, is_marker_row, label_role};

/// Lines belonging to one student: from a code line up to the next line that
/// carries a different code.
#[derive(Debug, Clone, PartialEq)]
pub struct StudentSegment<'a> {
    pub student_code: String,
    /// 1-based line number of the opening code line.
    pub first_line: usize,
    pub lines: Vec<&'a str>,
}

const LABEL_WORDS: &[&str] = &[
    "etalon", "şagirdin", "cavabı", "cavab", "düz", "səhv", "imtina", "bal", "sual", "kod",
];

/// Splits text into per-student runs of lines. Etalon, student-answer and
/// marker lines never open a segment, since numeric answers can look like
/// student codes.
pub fn student_segments<'a>(text: &'a str, code_pattern: &Regex) -> Vec<StudentSegment<'a>> {
    let mut segments = Vec::<StudentSegment<'a>>::new();
    let mut answers_follow = false;

    for (index, line) in text.split(['\n', '\u{000C}']).enumerate() {
        let line = line.trim_end_matches('\r');
        let row = line_to_row(line);
        let role = label_role(&row);
        let holds_answers = answers_follow
            || matches!(role, RowRole::Etalon | RowRole::StudentAnswer)
            || is_marker_row(&row);
        answers_follow = role == RowRole::StudentLabel;

        let code = if holds_answers {
            None
        } else {
            code_pattern
                .captures(line)
                .and_then(|captures| captures.get(1))
                .map(|found| found.as_str().to_string())
        };

        match code {
            Some(code) => {
                if let Some(current) = segments.last_mut()
                    && current.student_code == code
                {
                    current.lines.push(line);
                } else {
                    segments.push(StudentSegment {
                        student_code: code,
                        first_line: index + 1,
                        lines: vec![line],
                    });
                }
            }
            None => {
                if let Some(current) = segments.last_mut() {
                    current.lines.push(line);
                }
            }
        }
    }

    segments
}

/// Line ranges of each recognised subject inside a student segment. A range
/// starts after the subject title line and ends before the next title.
pub fn subject_sections(lines: &[&str], subjects: &[String]) -> Vec<(String, Range<usize>)> {
    let normalized_subjects = subjects
        .iter()
        .map(|subject| normalize_label(subject))
        .collect::<Vec<String>>();
    let mut seen = vec![false; subjects.len()];
    let mut titles = Vec::<(usize, usize)>::new();

    for (line_index, line) in lines.iter().enumerate() {
        let normalized = normalize_label(line);
        let normalized = normalized.trim_start_matches(|character: char| !character.is_alphabetic());
        let matched = normalized_subjects
            .iter()
            .position(|subject| !subject.is_empty() && normalized.starts_with(subject.as_str()));
        if let Some(subject_index) = matched
            && !seen[subject_index]
        {
            seen[subject_index] = true;
            titles.push((line_index, subject_index));
        }
    }

    titles
        .iter()
        .enumerate()
        .map(|(ordinal, (line_index, subject_index))| {
            let end = titles
                .get(ordinal + 1)
                .map(|(next_line, _)| *next_line)
                .unwrap_or(lines.len());
            (subjects[*subject_index].clone(), line_index + 1..end)
        })
        .collect()
}

fn is_label_word(token: &str) -> bool {
    let word = token.trim_end_matches([':', ',', ';']);
    word.chars().count() >= 2
        && word.chars().all(char::is_alphabetic)
        && (word.chars().any(char::is_lowercase)
            || LABEL_WORDS.contains(&normalize_label(word).as_str()))
}

fn completes_label(label: &str) -> bool {
    let bare = label.trim_end_matches(':');
    label.ends_with(':')
        || bare == "etalon"
        || bare == "sual"
        || ((bare.contains("şagird") || bare.contains("sagird")) && bare.contains("cavab"))
}

/// Turns a text line into a grid row: leading label words form the first
/// cell and every remaining whitespace-separated token is one cell.
pub fn line_to_row(line: &str) -> Row {
    let tokens = line.split_whitespace().collect::<Vec<&str>>();
    let mut label_len = 0usize;
    while label_len < tokens.len() && is_label_word(tokens[label_len]) {
        label_len += 1;
        if completes_label(&normalize_label(&tokens[..label_len].join(" "))) {
            break;
        }
    }

    let mut row = vec![Cell::from(tokens[..label_len].join(" ").as_str())];
    row.extend(tokens[label_len..].iter().map(|token| Cell::from(*token)));
    row
}
