use super::cell::{Cell, Row, looks_like_name, normalize_label};
use super::classify::{ClassifiedBlock, RowRole, find_any};

/// Explicit per-subject statistics found in a `düz / səhv / imtina` row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SummaryStats {
    pub correct: u32,
    pub wrong: u32,
    pub rejected: u32,
    pub score: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StudentMeta {
    pub code: Option<String>,
    pub name: Option<String>,
    pub total_score: Option<f64>,
}

/// The parts of subject extraction that differ between document layouts.
/// Tokenisation and correctness classification are shared.
pub trait LayoutAdapter {
    fn name(&self) -> &'static str;

    fn question_row(&self, block: &ClassifiedBlock<'_>) -> Option<usize>;

    fn summary(&self, block: &ClassifiedBlock<'_>) -> Option<SummaryStats>;

    /// `hint` is the sheet name for workbooks and the detected code for PDFs.
    fn student_meta(&self, rows: &[Row], hint: &str) -> StudentMeta;
}

pub struct LegacyLayout;

pub struct LiseyLayout;

pub struct PdfLayout;

/// Cell holding the authoritative total score on Lisey sheets (0-based,
/// i.e. `AA24`).
pub const LISEY_TOTAL_SCORE_CELL: (usize, usize) = (23, 26);
const LISEY_TRAILING_ROWS: usize = 5;

impl LayoutAdapter for LegacyLayout {
    fn name(&self) -> &'static str {
        "legacy"
    }

    fn question_row(&self, block: &ClassifiedBlock<'_>) -> Option<usize> {
        block.first(RowRole::QuestionNumbers)
    }

    fn summary(&self, block: &ClassifiedBlock<'_>) -> Option<SummaryStats> {
        column_aligned_summary(block)
    }

    fn student_meta(&self, rows: &[Row], hint: &str) -> StudentMeta {
        let code = labelled_value(rows, |label| label == "kod" || label.ends_with(" kodu"))
            .or_else(|| non_empty(hint));
        let name = labelled_value(rows, |label| {
            matches!(label, "ad" | "adı" | "ad soyad" | "soyad, ad" | "ad, soyad" | "şagird")
        })
        .filter(|value| looks_like_name(value));

        StudentMeta {
            code,
            name,
            total_score: None,
        }
    }
}

impl LayoutAdapter for LiseyLayout {
    fn name(&self) -> &'static str {
        "lisey"
    }

    fn question_row(&self, block: &ClassifiedBlock<'_>) -> Option<usize> {
        block.first(RowRole::QuestionNumbers).or_else(|| {
            let above = block.etalon_row.checked_sub(1)?;
            let label = block.row(above).first().map(Cell::normalized)?;
            (label == "ss").then_some(above)
        })
    }

    fn summary(&self, block: &ClassifiedBlock<'_>) -> Option<SummaryStats> {
        column_aligned_summary(block)
    }

    fn student_meta(&self, rows: &[Row], hint: &str) -> StudentMeta {
        let code = non_empty(hint);
        let (name, nearby_score) = code
            .as_deref()
            .map(|code| name_and_score_near_code(rows, code))
            .unwrap_or((None, None));

        let fixed_cell_score = rows
            .get(LISEY_TOTAL_SCORE_CELL.0)
            .and_then(|row| row.get(LISEY_TOTAL_SCORE_CELL.1))
            .and_then(Cell::as_number)
            .filter(|value| is_plausible_score(*value));

        let total_score = fixed_cell_score
            .or(nearby_score)
            .or_else(|| largest_trailing_score(rows));

        StudentMeta {
            code,
            name,
            total_score,
        }
    }
}

impl LayoutAdapter for PdfLayout {
    fn name(&self) -> &'static str {
        "pdf"
    }

    fn question_row(&self, block: &ClassifiedBlock<'_>) -> Option<usize> {
        block
            .rows
            .iter()
            .position(|row| {
                row.first()
                    .map(|cell| cell.normalized().starts_with("sual"))
                    .unwrap_or(false)
            })
            .or_else(|| block.first(RowRole::QuestionNumbers))
    }

    fn summary(&self, block: &ClassifiedBlock<'_>) -> Option<SummaryStats> {
        let summary_row = block.first(RowRole::Summary)?;
        let own_numbers = numbers_in(block.row(summary_row));
        let numbers = if own_numbers.len() >= 3 {
            own_numbers
        } else {
            numbers_in(block.rows.get(summary_row + 1)?)
        };
        if numbers.len() < 3 {
            return None;
        }

        let mentions_score = block
            .row(summary_row)
            .iter()
            .any(|cell| has_word(&cell.normalized(), "bal"));

        Some(SummaryStats {
            correct: as_count(numbers[0]),
            wrong: as_count(numbers[1]),
            rejected: as_count(numbers[2]),
            score: if mentions_score {
                numbers.get(3).copied()
            } else {
                None
            },
        })
    }

    fn student_meta(&self, rows: &[Row], hint: &str) -> StudentMeta {
        let name = rows.first().and_then(|row| {
            let words = row
                .iter()
                .map(Cell::as_text)
                .flat_map(|text| {
                    text.split_whitespace()
                        .map(|word| word.trim_matches([':', ',', ';']).to_string())
                        .collect::<Vec<String>>()
                })
                .filter(|word| hint.is_empty() || !word.contains(hint))
                .filter(|word| !is_meta_label(&normalize_label(word)))
                .filter(|word| word.chars().count() >= 2 && word.chars().all(char::is_alphabetic))
                .collect::<Vec<String>>();
            let joined = words.join(" ");
            looks_like_name(&joined).then_some(joined)
        });

        StudentMeta {
            code: non_empty(hint),
            name,
            total_score: None,
        }
    }
}

fn is_meta_label(word: &str) -> bool {
    matches!(
        word,
        "kod" | "kodu" | "şagird" | "şagirdin" | "ad" | "adı" | "soyad" | "soyadı" | "sinif" | "variant"
    )
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn has_word(text: &str, word: &str) -> bool {
    text.split(|character: char| !character.is_alphanumeric())
        .any(|candidate| candidate == word)
}

fn numbers_in(row: &[Cell]) -> Vec<f64> {
    row.iter().filter_map(Cell::as_number).collect()
}

fn as_count(value: f64) -> u32 {
    if value.is_finite() && value > 0.0 {
        value.round() as u32
    } else {
        0
    }
}

fn is_plausible_score(value: f64) -> bool {
    (0.0..=100.0).contains(&value)
}

/// Reads counts from the row under the summary labels, column by column.
/// Falls back to the numbers in order when the labels share one cell.
fn column_aligned_summary(block: &ClassifiedBlock<'_>) -> Option<SummaryStats> {
    let summary_row = block.first(RowRole::Summary)?;
    let labels = block.row(summary_row);
    let values = block.rows.get(summary_row + 1)?;

    let column_of = |needles: &[&str], after: Option<usize>| {
        labels.iter().enumerate().position(|(column, cell)| {
            after.map(|after| column > after).unwrap_or(true)
                && find_any(&cell.normalized(), needles, 0).is_some()
        })
    };

    let correct_column = column_of(&["düz", "duz"], None);
    let wrong_column = column_of(&["səhv", "sehv"], correct_column);
    let rejected_column = column_of(&["imtina"], wrong_column);

    let (Some(correct_column), Some(wrong_column), Some(rejected_column)) =
        (correct_column, wrong_column, rejected_column)
    else {
        let numbers = numbers_in(values);
        return (numbers.len() >= 3).then(|| SummaryStats {
            correct: as_count(numbers[0]),
            wrong: as_count(numbers[1]),
            rejected: as_count(numbers[2]),
            score: numbers.get(3).copied(),
        });
    };
    if correct_column == wrong_column || wrong_column == rejected_column {
        return None;
    }

    let count_at = |column: usize| {
        values
            .get(column)
            .and_then(Cell::as_number)
            .map(as_count)
            .unwrap_or(0)
    };

    let score = labels
        .iter()
        .enumerate()
        .skip(rejected_column + 1)
        .find(|(_, cell)| has_word(&cell.normalized(), "bal"))
        .and_then(|(column, _)| {
            values.get(column).and_then(Cell::as_number).or_else(|| {
                labels
                    .iter()
                    .skip(column + 1)
                    .find_map(Cell::as_number)
            })
        });

    Some(SummaryStats {
        correct: count_at(correct_column),
        wrong: count_at(wrong_column),
        rejected: count_at(rejected_column),
        score,
    })
}

/// Value of the first non-empty cell to the right of a label matching
/// `predicate`.
fn labelled_value(rows: &[Row], predicate: impl Fn(&str) -> bool) -> Option<String> {
    rows.iter().find_map(|row| {
        row.iter().enumerate().find_map(|(column, cell)| {
            let label = cell.normalized();
            let label = label.trim_end_matches(':').trim();
            if label.is_empty() || !predicate(label) {
                return None;
            }
            row.iter()
                .skip(column + 1)
                .find(|candidate| !candidate.is_blank())
                .map(Cell::as_text)
        })
    })
}

/// Finds the row holding the student code and scans the cells after it (and
/// the row below) for a name followed by a 0..=100 score.
fn name_and_score_near_code(rows: &[Row], code: &str) -> (Option<String>, Option<f64>) {
    let located = rows.iter().enumerate().find_map(|(row_index, row)| {
        row.iter()
            .position(|cell| !cell.is_blank() && cell.as_text().contains(code))
            .map(|column| (row_index, column))
    });
    let Some((row_index, column)) = located else {
        return (None, None);
    };

    let mut candidates = rows[row_index]
        .iter()
        .skip(column + 1)
        .collect::<Vec<&Cell>>();
    if let Some(next_row) = rows.get(row_index + 1) {
        candidates.extend(next_row.iter());
    }

    let mut name = None;
    let mut score = None;
    for cell in candidates.into_iter().filter(|cell| !cell.is_blank()) {
        if name.is_none() {
            let text = cell.as_text();
            if looks_like_name(&text) && !text.contains(code) {
                name = Some(text);
            }
            continue;
        }
        if let Some(value) = cell.as_number().filter(|value| is_plausible_score(*value)) {
            score = Some(value);
            break;
        }
    }

    (name, score)
}

fn largest_trailing_score(rows: &[Row]) -> Option<f64> {
    let start = rows.len().saturating_sub(LISEY_TRAILING_ROWS);
    rows[start..]
        .iter()
        .flat_map(|row| row.iter())
        .filter_map(Cell::as_number)
        .filter(|value| is_plausible_score(*value))
        .fold(None, |best: Option<f64>, value| {
            Some(best.map_or(value, |best| best.max(value)))
        })
}
