/// One spreadsheet cell as the ingestion layer hands it over.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Cell {
    #[default]
    Empty,
    Number(f64),
    Text(String),
}

impl Cell {
    pub fn text(value: impl Into<String>) -> Self {
        Cell::Text(value.into())
    }

    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Number(_) => false,
            Cell::Text(value) => value.trim().is_empty(),
        }
    }

    /// Display text with integral numbers rendered without a fraction.
    pub fn as_text(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Number(value) => format_number(*value),
            Cell::Text(value) => value.trim().to_string(),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Empty => None,
            Cell::Number(value) => Some(*value),
            Cell::Text(value) => parse_number(value),
        }
    }

    pub fn is_numeric(&self) -> bool {
        self.as_number().is_some()
    }

    pub fn normalized(&self) -> String {
        normalize_label(&self.as_text())
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        if value.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(value.to_string())
        }
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Number(value)
    }
}

impl From<i32> for Cell {
    fn from(value: i32) -> Self {
        Cell::Number(f64::from(value))
    }
}

pub type Row = Vec<Cell>;

/// A named worksheet materialised with absolute coordinates (row 0 / column 0
/// is the top-left cell of the sheet, not of the used range).
#[derive(Debug, Clone, Default)]
pub struct Sheet {
    pub name: String,
    pub rows: Vec<Row>,
}

impl Sheet {
    pub fn new(name: impl Into<String>, rows: Vec<Row>) -> Self {
        Self {
            name: name.into(),
            rows,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Workbook {
    pub sheets: Vec<Sheet>,
}

pub fn cell_at(row: &[Cell], column: usize) -> Option<&Cell> {
    row.get(column).filter(|cell| !cell.is_blank())
}

pub fn row_is_blank(row: &[Cell]) -> bool {
    row.iter().all(Cell::is_blank)
}

/// Lowercases with Azerbaijani dotted capital I folded to a plain `i`, strips
/// combining dots and collapses whitespace.
pub fn normalize_label(input: &str) -> String {
    input
        .replace('İ', "i")
        .to_lowercase()
        .replace('\u{0307}', "")
        .split_whitespace()
        .collect::<Vec<&str>>()
        .join(" ")
}

pub fn parse_number(input: &str) -> Option<f64> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed
        .replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

pub fn is_alphabet_letter(character: char) -> bool {
    character.is_ascii_alphabetic() || "əğıöüçşƏĞİÖÜÇŞ".contains(character)
}

/// Plausible person or subject name: letters and spaces only, longer than two
/// characters.
pub fn looks_like_name(input: &str) -> bool {
    let trimmed = input.trim();
    trimmed.chars().count() > 2
        && trimmed.chars().any(char::is_alphabetic)
        && trimmed.chars().all(|character| {
            character.is_alphabetic() || character.is_whitespace() || matches!(character, '.' | '-')
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_label_folds_azerbaijani_capitals() {
        assert_eq!(normalize_label("  İMTİNA "), "imtina");
        assert_eq!(normalize_label("Şagirdin   cavabı"), "şagirdin cavabı");
        assert_eq!(normalize_label("SƏHV"), "səhv");
    }

    #[test]
    fn numeric_cells_render_without_trailing_fraction() {
        assert_eq!(Cell::Number(3.0).as_text(), "3");
        assert_eq!(Cell::Number(4.1).as_text(), "4.1");
        assert_eq!(Cell::text(" 2,5 ").as_number(), Some(2.5));
        assert!(!Cell::text("A").is_numeric());
    }

    #[test]
    fn looks_like_name_rejects_codes_and_short_tokens() {
        assert!(looks_like_name("Əli Məmmədov"));
        assert!(!looks_like_name("Əl"));
        assert!(!looks_like_name("1004567"));
    }
}
