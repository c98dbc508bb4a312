use super::SegmentError;
use super::cell::{Cell, Row, normalize_label};

/// Semantic role of one row inside a subject block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowRole {
    Unclassified,
    QuestionNumbers,
    Etalon,
    /// `Şagirdin cavabı` label without answers; answers follow on the next row.
    StudentLabel,
    StudentAnswer,
    Marker,
    Score,
    Summary,
    SummaryValues,
}

/// The answer-bearing part of a row (every column after the label column).
#[derive(Debug, Clone, PartialEq)]
pub enum Lanes {
    /// One value per column; empty strings keep column positions.
    Positional(Vec<String>),
    /// All answers run together in a single cell, e.g. `"AB42C"`.
    Condensed(String),
}

pub const LABEL_COLUMNS: usize = 1;

const MARKER_CHARS: &[char] = &['+', '-', '✓', '✗', 'i'];

/// Whether a block's answers sit one per column or run together in the
/// first answer column. Decided once per block so that a single filled cell
/// in a positional block keeps its column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaneStyle {
    Positional,
    Condensed,
}

/// Answer cells after the label column, trimmed after the last filled one.
fn lane_values(row: &[Cell]) -> Vec<String> {
    let mut values = row
        .iter()
        .skip(LABEL_COLUMNS)
        .map(Cell::as_text)
        .collect::<Vec<String>>();
    let filled = values
        .iter()
        .rposition(|value| !value.is_empty())
        .map_or(0, |last| last + 1);
    values.truncate(filled);
    values
}

/// The run-together text of a row whose only filled answer cell is the first
/// one, e.g. `["etalon", "AB42C"]`.
fn condensed_text(row: &[Cell]) -> Option<String> {
    let values = lane_values(row);
    let [single] = values.as_slice() else {
        return None;
    };
    let compact = single
        .chars()
        .filter(|character| !character.is_whitespace())
        .collect::<String>();
    (compact.chars().count() > 1 && !compact.contains(['.', ','])).then_some(compact)
}

/// A block is condensed when its etalon row is and its marker row (if any)
/// marks more than one question. A lone marker means the etalon cell is a
/// single multi-character answer.
pub fn lane_style(etalon: &[Cell], marker: Option<&[Cell]>) -> LaneStyle {
    let etalon_condensed = condensed_text(etalon).is_some();
    let marker_agrees = marker.is_none_or(|row| {
        condensed_text(row).is_some()
            || lane_values(row).iter().filter(|value| !value.is_empty()).count() > 1
    });
    if etalon_condensed && marker_agrees {
        LaneStyle::Condensed
    } else {
        LaneStyle::Positional
    }
}

pub fn row_lanes(row: &[Cell], style: LaneStyle) -> Lanes {
    if style == LaneStyle::Condensed
        && let Some(text) = condensed_text(row)
    {
        return Lanes::Condensed(text);
    }
    Lanes::Positional(lane_values(row))
}

fn label_of(row: &[Cell]) -> String {
    row.first()
        .map(Cell::normalized)
        .unwrap_or_default()
        .trim_end_matches(':')
        .trim()
        .to_string()
}

fn is_student_label(text: &str) -> bool {
    (text.contains("şagird") || text.contains("sagird")) && text.contains("cavab")
}

/// `düz`, `səhv`, `imtina` appearing in that order anywhere in the row.
pub fn is_summary_row(row: &[Cell]) -> bool {
    let joined = row
        .iter()
        .map(Cell::normalized)
        .filter(|text| !text.is_empty())
        .collect::<Vec<String>>()
        .join(" ");

    let Some(correct_at) = find_any(&joined, &["düz", "duz"], 0) else {
        return false;
    };
    let Some(wrong_at) = find_any(&joined, &["səhv", "sehv"], correct_at) else {
        return false;
    };
    find_any(&joined, &["imtina"], wrong_at).is_some()
}

pub(crate) fn find_any(haystack: &str, needles: &[&str], from: usize) -> Option<usize> {
    let tail = haystack.get(from..)?;
    needles
        .iter()
        .filter_map(|needle| tail.find(needle).map(|position| from + position + needle.len()))
        .min()
}

fn lane_cells(row: &[Cell]) -> impl Iterator<Item = &Cell> {
    row.iter().skip(LABEL_COLUMNS).filter(|cell| !cell.is_blank())
}

pub fn is_marker_token(text: &str) -> bool {
    let normalized = normalize_label(text);
    if normalized == "imtina" {
        return true;
    }
    !normalized.is_empty()
        && normalized
            .chars()
            .filter(|character| !character.is_whitespace())
            .all(|character| MARKER_CHARS.contains(&character))
}

pub fn is_marker_row(row: &[Cell]) -> bool {
    let mut cells = lane_cells(row).peekable();
    cells.peek().is_some() && cells.all(|cell| is_marker_token(&cell.as_text()))
}

pub fn is_score_row(row: &[Cell]) -> bool {
    let mut cells = lane_cells(row).peekable();
    cells.peek().is_some()
        && cells.all(|cell| matches!(cell.as_number(), Some(value) if value == 0.0 || value == 1.0))
}

pub fn label_role(row: &[Cell]) -> RowRole {
    let label = label_of(row);
    if label == "etalon" {
        return RowRole::Etalon;
    }

    if is_student_label(&label) {
        return if lane_values(row).is_empty() {
            RowRole::StudentLabel
        } else {
            RowRole::StudentAnswer
        };
    }

    let second = row.get(1).map(Cell::normalized).unwrap_or_default();
    if (label.contains("şagird") || label.contains("sagird")) && second.contains("cavab") {
        return RowRole::StudentLabel;
    }

    if is_summary_row(row) {
        return RowRole::Summary;
    }

    RowRole::Unclassified
}

/// Assigns a role to every row of a block. Label-bearing rows are tagged
/// first; positional roles (answers under a bare label, summary values,
/// question numbers above the etalon row, markers, scores) are derived from
/// that first pass.
pub fn classify_rows(rows: &[Row]) -> Vec<RowRole> {
    let mut roles = rows.iter().map(|row| label_role(row)).collect::<Vec<RowRole>>();

    for index in 0..roles.len() {
        let follower = index + 1;
        if follower >= roles.len() || roles[follower] != RowRole::Unclassified {
            continue;
        }
        match roles[index] {
            RowRole::StudentLabel => roles[follower] = RowRole::StudentAnswer,
            RowRole::Summary => roles[follower] = RowRole::SummaryValues,
            _ => {}
        }
    }

    if let Some(etalon) = roles.iter().position(|role| *role == RowRole::Etalon)
        && etalon > 0
        && roles[etalon - 1] == RowRole::Unclassified
        && rows[etalon - 1].get(1).map(Cell::is_numeric).unwrap_or(false)
    {
        roles[etalon - 1] = RowRole::QuestionNumbers;
    }

    if let Some(marker) = (0..rows.len())
        .find(|index| roles[*index] == RowRole::Unclassified && is_marker_row(&rows[*index]))
    {
        roles[marker] = RowRole::Marker;
    }

    if let Some(score) = (0..rows.len())
        .find(|index| roles[*index] == RowRole::Unclassified && is_score_row(&rows[*index]))
    {
        roles[score] = RowRole::Score;
    }

    roles
}

/// Row indices of one classified subject block.
#[derive(Debug, Clone)]
pub struct ClassifiedBlock<'a> {
    pub rows: &'a [Row],
    pub roles: Vec<RowRole>,
    pub etalon_row: usize,
    pub student_row: usize,
    pub marker_row: Option<usize>,
    pub score_row: Option<usize>,
    pub lane_style: LaneStyle,
}

impl<'a> ClassifiedBlock<'a> {
    pub fn first(&self, role: RowRole) -> Option<usize> {
        self.roles.iter().position(|candidate| *candidate == role)
    }

    pub fn row(&self, index: usize) -> &'a [Cell] {
        &self.rows[index]
    }

    pub fn lanes(&self, index: usize) -> Lanes {
        row_lanes(self.row(index), self.lane_style)
    }
}

pub fn classify_block(rows: &[Row]) -> Result<ClassifiedBlock<'_>, SegmentError> {
    let roles = classify_rows(rows);
    let find = |role: RowRole| roles.iter().position(|candidate| *candidate == role);

    let (etalon_row, student_row) = match (find(RowRole::Etalon), find(RowRole::StudentAnswer)) {
        (Some(etalon), Some(student)) => (etalon, student),
        (None, None) => return Err(SegmentError::NoAnswerRows),
        (None, Some(_)) => return Err(SegmentError::MissingEtalonRow),
        (Some(_), None) => return Err(SegmentError::MissingStudentRow),
    };
    let marker_row = find(RowRole::Marker);
    let score_row = find(RowRole::Score);
    let lane_style = lane_style(&rows[etalon_row], marker_row.map(|index| rows[index].as_slice()));

    Ok(ClassifiedBlock {
        rows,
        roles,
        etalon_row,
        student_row,
        marker_row,
        score_row,
        lane_style,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Row {
        cells.iter().map(|cell| Cell::from(*cell)).collect()
    }

    #[test]
    fn classify_rows_tags_every_role_once() {
        let rows = vec![
            vec![Cell::Empty, Cell::from(1), Cell::from(2), Cell::from(3)],
            row(&["etalon", "A", "B", "C"]),
            row(&["Şagirdin cavabı", "A", "X", "C"]),
            row(&["", "+", "-", "+"]),
            vec![Cell::Empty, Cell::from(1), Cell::from(0), Cell::from(1)],
            row(&["", "Düz", "Səhv", "İmtina", "Bal"]),
            vec![Cell::Empty, Cell::from(2), Cell::from(1), Cell::from(0), Cell::from(66.7)],
        ];

        let roles = classify_rows(&rows);
        assert_eq!(
            roles,
            vec![
                RowRole::QuestionNumbers,
                RowRole::Etalon,
                RowRole::StudentAnswer,
                RowRole::Marker,
                RowRole::Score,
                RowRole::Summary,
                RowRole::SummaryValues,
            ]
        );
    }

    #[test]
    fn split_student_label_promotes_following_row() {
        let rows = vec![
            row(&["ETALON", "A", "B"]),
            row(&["Şagirdin", "cavabı"]),
            row(&["", "A", "C"]),
        ];

        let roles = classify_rows(&rows);
        assert_eq!(roles[1], RowRole::StudentLabel);
        assert_eq!(roles[2], RowRole::StudentAnswer);
    }

    #[test]
    fn classify_block_reports_missing_rows() {
        let only_etalon = vec![row(&["etalon", "A"])];
        assert!(matches!(
            classify_block(&only_etalon),
            Err(SegmentError::MissingStudentRow)
        ));

        let only_student = vec![row(&["Şagirdin cavabı", "A"])];
        assert!(matches!(
            classify_block(&only_student),
            Err(SegmentError::MissingEtalonRow)
        ));

        let neither = vec![row(&["Ad", "Əli"])];
        assert!(matches!(
            classify_block(&neither),
            Err(SegmentError::NoAnswerRows)
        ));
    }

    #[test]
    fn row_lanes_detects_condensed_answers() {
        assert_eq!(
            row_lanes(&row(&["etalon", "AB42C"]), LaneStyle::Condensed),
            Lanes::Condensed("AB42C".to_string())
        );
        assert_eq!(
            row_lanes(&row(&["", "+", "", "-"]), LaneStyle::Condensed),
            Lanes::Positional(vec!["+".to_string(), String::new(), "-".to_string()])
        );
        assert_eq!(
            row_lanes(&row(&["etalon", "AB42C"]), LaneStyle::Positional),
            Lanes::Positional(vec!["AB42C".to_string()])
        );
    }

    #[test]
    fn lane_style_follows_etalon_and_marker_rows() {
        let condensed_etalon = row(&["etalon", "AB42C"]);
        assert_eq!(lane_style(&condensed_etalon, None), LaneStyle::Condensed);
        assert_eq!(
            lane_style(&condensed_etalon, Some(row(&["", "+-+-+"]).as_slice())),
            LaneStyle::Condensed
        );
        assert_eq!(
            lane_style(&condensed_etalon, Some(row(&["", "+", "-", "+"]).as_slice())),
            LaneStyle::Condensed
        );
        assert_eq!(
            lane_style(&condensed_etalon, Some(row(&["", "+"]).as_slice())),
            LaneStyle::Positional
        );
        assert_eq!(
            lane_style(&row(&["etalon", "12", "B", "C"]), None),
            LaneStyle::Positional
        );
        assert_eq!(
            lane_style(&row(&["etalon", "", "", "AB"]), None),
            LaneStyle::Positional
        );
    }

    #[test]
    fn marker_tokens_accept_rejection_word() {
        assert!(is_marker_token("İ"));
        assert!(is_marker_token("imtina"));
        assert!(is_marker_token("++-i"));
        assert!(!is_marker_token("A"));
    }
}
