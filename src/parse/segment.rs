use super::cell::{Cell, Row, cell_at, is_alphabet_letter, normalize_label, row_is_blank};

/// One subject block cut out of a sheet.
#[derive(Debug, Clone)]
pub struct RawSegment<'a> {
    pub subject_name: String,
    /// Absolute index of the first row in `rows`.
    pub first_row: usize,
    pub rows: &'a [Row],
}

const RESERVED_WORDS: &[&str] = &[
    "etalon", "şagirdin", "sagirdin", "cavab", "düz", "duz", "səhv", "sehv", "imtina", "sual",
];

fn first_label(row: &[Cell]) -> String {
    cell_at(row, 0).map(Cell::normalized).unwrap_or_default()
}

fn starts_with_reserved_word(label: &str) -> bool {
    label.split_whitespace().any(|word| {
        RESERVED_WORDS
            .iter()
            .any(|reserved| word.trim_matches(':').starts_with(reserved))
    })
}

/// First cell reads like a subject title: text of three or more characters
/// with at least one alphabet letter and none of the answer-block keywords.
pub fn is_subject_title(row: &[Cell]) -> bool {
    let Some(cell) = cell_at(row, 0) else {
        return false;
    };
    if cell.is_blank() || cell.is_numeric() {
        return false;
    }
    let text = cell.as_text();
    text.chars().count() >= 3
        && text.chars().any(is_alphabet_letter)
        && !starts_with_reserved_word(&normalize_label(&text))
}

fn mentions_answer_rows(row: &[Cell]) -> bool {
    row.iter().any(|cell| {
        let text = cell.normalized();
        text.contains("etalon") || text.contains("şagirdin") || text.contains("sagirdin")
    })
}

pub fn is_legacy_header(rows: &[Row], index: usize) -> bool {
    let row = &rows[index];
    if !is_subject_title(row) {
        return false;
    }
    let followed_by_answers = rows
        .get(index + 1)
        .map(|next| mentions_answer_rows(next))
        .unwrap_or(false);
    let stands_alone = row.iter().skip(1).all(Cell::is_blank);
    followed_by_answers || stands_alone
}

/// Splits a legacy sheet at its subject header rows. Each segment spans the
/// rows after one header up to the row before the next.
pub fn legacy_segments(rows: &[Row]) -> Vec<RawSegment<'_>> {
    let headers = (0..rows.len())
        .filter(|index| is_legacy_header(rows, *index))
        .collect::<Vec<usize>>();

    headers
        .iter()
        .enumerate()
        .filter_map(|(ordinal, header)| {
            let start = header + 1;
            let end = headers.get(ordinal + 1).copied().unwrap_or(rows.len());
            if start >= end {
                return None;
            }
            Some(RawSegment {
                subject_name: rows[*header]
                    .first()
                    .map(Cell::as_text)
                    .unwrap_or_default(),
                first_row: start,
                rows: &rows[start..end],
            })
        })
        .collect()
}

fn is_student_answer_text(label: &str) -> bool {
    (label.contains("şagirdin") || label.contains("sagirdin")) && label.contains("cavab")
}

/// `[SS | name + numbers]`, `[etalon]`, `[şagirdin cavabı]` on three rows.
pub fn is_lisey_block(head: &[Cell], etalon: &[Cell], student: &[Cell]) -> bool {
    let head_label = first_label(head);
    let numbered_name = cell_at(head, 0)
        .map(|cell| !cell.is_numeric() && cell.as_text().chars().any(is_alphabet_letter))
        .unwrap_or(false)
        && cell_at(head, 1).map(Cell::is_numeric).unwrap_or(false);

    (head_label == "ss" || numbered_name)
        && first_label(etalon).trim_end_matches(':') == "etalon"
        && is_student_answer_text(&first_label(student))
}

pub fn is_lisey_block_start(rows: &[Row], index: usize) -> bool {
    match (rows.get(index), rows.get(index + 1), rows.get(index + 2)) {
        (Some(head), Some(etalon), Some(student)) => is_lisey_block(head, etalon, student),
        _ => false,
    }
}

/// Leading non-blank rows match the Lisey block pattern.
pub fn has_lisey_fingerprint(rows: &[Row]) -> bool {
    let leading = rows
        .iter()
        .filter(|row| !row_is_blank(row))
        .take(3)
        .collect::<Vec<&Row>>();
    match leading.as_slice() {
        [head, etalon, student] => is_lisey_block(head, etalon, student),
        _ => false,
    }
}

/// Finds every Lisey block on a student sheet. A block runs from its head row
/// to the row before the next head row.
pub fn lisey_segments(rows: &[Row]) -> Vec<RawSegment<'_>> {
    let starts = (0..rows.len())
        .filter(|index| is_lisey_block_start(rows, *index))
        .collect::<Vec<usize>>();

    starts
        .iter()
        .enumerate()
        .map(|(ordinal, start)| {
            let end = starts.get(ordinal + 1).copied().unwrap_or(rows.len());
            RawSegment {
                subject_name: lisey_subject_name(rows, *start, ordinal),
                first_row: *start,
                rows: &rows[*start..end],
            }
        })
        .collect()
}

fn lisey_subject_name(rows: &[Row], start: usize, ordinal: usize) -> String {
    if first_label(&rows[start]) != "ss" {
        return rows[start].first().map(Cell::as_text).unwrap_or_default();
    }
    start
        .checked_sub(1)
        .and_then(|above| rows.get(above))
        .filter(|row| is_subject_title(row))
        .and_then(|row| row.first())
        .map(Cell::as_text)
        .unwrap_or_else(|| format!("Fənn {}", ordinal + 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Row {
        cells.iter().map(|cell| Cell::from(*cell)).collect()
    }

    #[test]
    fn legacy_headers_bound_segments() {
        let rows = vec![
            row(&["Kod", "1004567"]),
            row(&["Riyaziyyat"]),
            row(&["etalon", "A", "B"]),
            row(&["Şagirdin cavabı", "A", "B"]),
            row(&["Fizika", "", ""]),
            row(&["etalon", "C"]),
            row(&["Şagirdin cavabı", "D"]),
        ];

        let segments = legacy_segments(&rows);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].subject_name, "Riyaziyyat");
        assert_eq!(segments[0].first_row, 2);
        assert_eq!(segments[0].rows.len(), 2);
        assert_eq!(segments[1].subject_name, "Fizika");
        assert_eq!(segments[1].rows.len(), 2);
    }

    #[test]
    fn reserved_words_are_never_headers() {
        let rows = vec![
            row(&["Etalon"]),
            row(&["Şagirdin"]),
            row(&["Düz səhv imtina"]),
            row(&["Sual"]),
            row(&["12"]),
            row(&["Ad", "Əli"]),
        ];
        assert!((0..rows.len()).all(|index| !is_legacy_header(&rows, index)));
    }

    #[test]
    fn lisey_blocks_take_name_from_head_row_or_title_above() {
        let rows = vec![
            vec![Cell::from("Riyaziyyat"), Cell::from(1), Cell::from(2)],
            row(&["etalon", "A", "B"]),
            row(&["Şagirdin cavabı", "A", "C"]),
            row(&["Kimya"]),
            row(&["SS", "1", "2"]),
            row(&["Etalon", "C", "D"]),
            row(&["Şagirdin cavabı", "C", "D"]),
            row(&["SS", "1"]),
            row(&["Etalon", "E"]),
            row(&["Şagirdin cavabı", "E"]),
        ];

        let segments = lisey_segments(&rows);
        let names = segments
            .iter()
            .map(|segment| segment.subject_name.as_str())
            .collect::<Vec<&str>>();
        assert_eq!(names, vec!["Riyaziyyat", "Kimya", "Fənn 3"]);
        assert_eq!(segments[0].rows.len(), 4);
        assert!(has_lisey_fingerprint(&rows));
    }

    #[test]
    fn legacy_sheet_has_no_lisey_fingerprint() {
        let rows = vec![
            row(&["Riyaziyyat"]),
            row(&["etalon", "A"]),
            row(&["Şagirdin cavabı", "A"]),
        ];
        assert!(!has_lisey_fingerprint(&rows));
    }
}
