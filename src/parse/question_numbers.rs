use std::fmt;

use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

/// A question label: either a plain integer (`7`) or a sub-question (`4.1`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QuestionNumber {
    pub major: u32,
    pub minor: Option<u32>,
}

impl QuestionNumber {
    pub fn whole(major: u32) -> Self {
        Self { major, minor: None }
    }

    pub fn sub(major: u32, minor: u32) -> Self {
        Self {
            major,
            minor: Some(minor),
        }
    }

    pub fn parse(input: &str) -> Option<Self> {
        let trimmed = input.trim().trim_end_matches(['.', ')']);
        match trimmed.split_once(['.', ',']) {
            Some((major, minor)) => Some(Self::sub(
                parse_digits(major)?,
                parse_digits(minor)?,
            )),
            None => parse_digits(trimmed).map(Self::whole),
        }
    }

    pub fn as_f64(&self) -> f64 {
        self.to_string().parse::<f64>().unwrap_or(f64::from(self.major))
    }
}

impl fmt::Display for QuestionNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.minor {
            Some(minor) => write!(f, "{}.{}", self.major, minor),
            None => write!(f, "{}", self.major),
        }
    }
}

/// Sub-questions serialise as JSON numbers unless the number would not read
/// back as the same label (`4.10` becomes `4.1`); those are written as strings.
impl Serialize for QuestionNumber {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.minor {
            None => serializer.serialize_u32(self.major),
            Some(_) => {
                let value = self.as_f64();
                if value.to_string() == self.to_string() {
                    serializer.serialize_f64(value)
                } else {
                    serializer.collect_str(self)
                }
            }
        }
    }
}

impl<'de> Deserialize<'de> for QuestionNumber {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Whole(u32),
            Decimal(f64),
            Label(String),
        }

        let label = match Raw::deserialize(deserializer)? {
            Raw::Whole(value) => return Ok(Self::whole(value)),
            Raw::Decimal(value) => value.to_string(),
            Raw::Label(value) => value,
        };
        Self::parse(&label)
            .ok_or_else(|| de::Error::custom(format!("invalid question number: {label}")))
    }
}

fn parse_digits(input: &str) -> Option<u32> {
    if input.is_empty() || !input.chars().all(|character| character.is_ascii_digit()) {
        return None;
    }
    input.parse::<u32>().ok()
}

/// Parses a line of question numbers such as `"1 2 3 4.1 4.2 5"`.
///
/// Delimited lines (whitespace or commas) are read token by token. A line
/// without delimiters is scanned character by character: `D.D` is one
/// sub-question, two digits in `10..=99` are one number, anything else is a
/// single digit.
pub fn parse_question_numbers(line: &str) -> Vec<QuestionNumber> {
    let trimmed = line.trim();
    let delimited = trimmed
        .chars()
        .any(|character| character.is_whitespace() || character == ',');

    if delimited {
        return trimmed
            .split(|character: char| character.is_whitespace() || character == ',')
            .filter(|token| !token.is_empty())
            .filter_map(QuestionNumber::parse)
            .collect();
    }

    scan_run_together(trimmed)
}

fn scan_run_together(line: &str) -> Vec<QuestionNumber> {
    let characters = line.chars().collect::<Vec<char>>();
    let digit = |index: usize| characters.get(index).and_then(|value| value.to_digit(10));
    let mut numbers = Vec::<QuestionNumber>::new();
    let mut index = 0usize;

    while index < characters.len() {
        let Some(first) = digit(index) else {
            index += 1;
            continue;
        };

        if characters.get(index + 1) == Some(&'.')
            && let Some(minor) = digit(index + 2)
        {
            numbers.push(QuestionNumber::sub(first, minor));
            index += 3;
            continue;
        }

        if let Some(second) = digit(index + 1) {
            let value = first * 10 + second;
            if (10..=99).contains(&value) {
                numbers.push(QuestionNumber::whole(value));
                index += 2;
                continue;
            }
        }

        numbers.push(QuestionNumber::whole(first));
        index += 1;
    }

    numbers
}
