use super::*;

fn row(cells: &[&str]) -> Row {
    cells.iter().map(|cell| Cell::from(*cell)).collect()
}

fn source() -> UploadSource {
    UploadSource {
        document_name: "netice.xlsx".to_string(),
        uploaded_at: "2026-10-16T09:00:00Z".to_string(),
    }
}

fn riyaziyyat_sheet(name: &str, code: &str) -> Sheet {
    Sheet::new(
        name,
        vec![
            row(&["Kod", code]),
            row(&["Ad", "Əli Məmmədov"]),
            Vec::new(),
            Vec::new(),
            Vec::new(),
            row(&["Riyaziyyat"]),
            vec![Cell::Empty, Cell::from(1), Cell::from(2), Cell::from(3)],
            row(&["etalon", "A", "B", "C"]),
            row(&["Şagirdin cavabı", "A", "X", "C"]),
            row(&["", "+", "-", "+"]),
        ],
    )
}

#[test]
fn legacy_sheet_end_to_end() {
    let workbook = Workbook {
        sheets: vec![riyaziyyat_sheet("Sheet1", "1004567")],
    };

    let outcome = parse_workbook(&workbook, &source(), &ParseOptions::default());
    assert_eq!(outcome.kind, DocumentKind::LegacyWorkbook);
    assert!(outcome.failures.is_empty());
    assert_eq!(outcome.records.len(), 1);

    let record = &outcome.records[0];
    assert_eq!(record.student_code, "1004567");
    assert_eq!(record.student_name.as_deref(), Some("Əli Məmmədov"));
    assert_eq!(record.sheet_name.as_deref(), Some("Sheet1"));
    assert_eq!(record.source_document, "netice.xlsx");
    assert_eq!(record.total_score, None);

    let subject = &record.subjects[0];
    assert_eq!(subject.subject_name, "Riyaziyyat");
    assert_eq!(subject.total_questions, 3);
    assert_eq!(subject.correct_answers, 2);
    assert_eq!(subject.wrong_answers, 1);
    assert_eq!(subject.rejected_answers, 0);

    let answers = subject
        .answers
        .iter()
        .map(|answer| {
            (
                answer.question.to_string(),
                answer.etalon_answer.as_str(),
                answer.student_answer.as_str(),
                answer.is_correct,
            )
        })
        .collect::<Vec<(String, &str, &str, bool)>>();
    assert_eq!(
        answers,
        vec![
            ("1".to_string(), "A", "A", true),
            ("2".to_string(), "B", "X", false),
            ("3".to_string(), "C", "C", true),
        ]
    );
}

#[test]
fn same_code_on_two_sheets_keeps_one_record() {
    let workbook = Workbook {
        sheets: vec![
            riyaziyyat_sheet("Sheet1", "1004567"),
            riyaziyyat_sheet("Sheet2", "1004567"),
        ],
    };

    let outcome = parse_workbook(&workbook, &source(), &ParseOptions::default());
    assert_eq!(outcome.records.len(), 1);
    assert_eq!(outcome.records[0].sheet_name.as_deref(), Some("Sheet2"));
}

#[test]
fn lisey_workbook_end_to_end() {
    let rows = vec![
        vec![
            Cell::from("Riyaziyyat"),
            Cell::from(1),
            Cell::from(2),
            Cell::from(3),
        ],
        row(&["Etalon", "A", "B", "C"]),
        row(&["Şagirdin cavabı", "A", "B", "D"]),
        row(&["", "+", "+", "-"]),
        row(&["", "Düz", "Səhv", "İmtina", "Bal"]),
        vec![
            Cell::Empty,
            Cell::from(2),
            Cell::from(1),
            Cell::from(0),
            Cell::from(66.7),
        ],
        row(&["SS", "1", "2"]),
        row(&["Etalon", "C", "D"]),
        row(&["Şagirdin cavabı", "C", "C"]),
        row(&["", "+", "-"]),
        vec![
            Cell::from("Şagird"),
            Cell::from("1004567"),
            Cell::from("Əli Məmmədov"),
            Cell::from(81),
        ],
    ];
    let workbook = Workbook {
        sheets: vec![
            Sheet::new("Ümumi", vec![row(&["Cəmi", "1"])]),
            Sheet::new("1004567", rows),
        ],
    };

    let outcome = parse_workbook(&workbook, &source(), &ParseOptions::default());
    assert_eq!(outcome.kind, DocumentKind::LiseyWorkbook);
    assert!(outcome.failures.is_empty());
    assert_eq!(outcome.records.len(), 1);

    let record = &outcome.records[0];
    assert_eq!(record.student_code, "1004567");
    assert_eq!(record.student_name.as_deref(), Some("Əli Məmmədov"));
    assert_eq!(record.total_score, Some(81.0));
    assert_eq!(record.subjects.len(), 2);

    let first = &record.subjects[0];
    assert_eq!(first.subject_name, "Riyaziyyat");
    assert!(first.counts_from_summary);
    assert_eq!(first.score, Some(66.7));

    let second = &record.subjects[1];
    assert_eq!(second.subject_name, "Fənn 2");
    assert_eq!(second.correct_answers, 1);
    assert_eq!(second.wrong_answers, 1);
    assert_eq!(record.total_questions, 5);
    assert_eq!(record.correct_answers, 3);
}

#[test]
fn forced_format_skips_detection() {
    let workbook = Workbook {
        sheets: vec![riyaziyyat_sheet("Sheet1", "1004567")],
    };
    let options = ParseOptions {
        forced_format: Some(SheetFormat::Lisey),
        ..ParseOptions::default()
    };

    let outcome = parse_workbook(&workbook, &source(), &options);
    assert_eq!(outcome.kind, DocumentKind::LiseyWorkbook);
    assert!(outcome.records.is_empty());
    assert_eq!(outcome.students_failed, 1);
    assert_eq!(outcome.failures[0].reason, "no subject blocks found");
}

#[test]
fn unrecognised_workbook_reports_zero_processed() {
    let workbook = Workbook {
        sheets: vec![Sheet::new("Boş", Vec::new())],
    };

    let outcome = parse_workbook(&workbook, &source(), &ParseOptions::default());
    assert!(outcome.records.is_empty());
    assert!(outcome.failures.is_empty());
    assert_eq!(
        outcome.message(),
        "0 students processed successfully, 0 segments failed"
    );
}

#[test]
fn partially_malformed_student_keeps_good_subjects() {
    let mut sheet = riyaziyyat_sheet("Sheet1", "1004567");
    sheet.rows.push(row(&["Fizika"]));
    sheet.rows.push(row(&["etalon", "A", "B"]));

    let outcome = parse_workbook(
        &Workbook {
            sheets: vec![sheet],
        },
        &source(),
        &ParseOptions::default(),
    );
    assert_eq!(outcome.records.len(), 1);
    assert_eq!(outcome.records[0].subjects.len(), 1);
    assert_eq!(outcome.students_failed, 0);
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].segment, "Sheet1/Fizika (row 12)");
    assert_eq!(outcome.failures[0].reason, "no student answer row found");
}

fn pdf_student(code: &str, name: &str, with_student_row: bool) -> String {
    let mut lines = vec![
        format!("Kod: {code} {name}"),
        "Riyaziyyat".to_string(),
        "Etalon ABC".to_string(),
    ];
    if with_student_row {
        lines.push("Şagirdin cavabı ABD".to_string());
    }
    lines.push("+ + -".to_string());
    lines.push("İngilis dili".to_string());
    lines.push("Etalon AB".to_string());
    if with_student_row {
        lines.push("Şagirdin cavabı AB".to_string());
    }
    lines.push("Düz: 2 Səhv: 0 İmtina: 0 Bal: 100".to_string());
    lines.join("\n")
}

#[test]
fn malformed_pdf_student_is_isolated() {
    let text = (0..10)
        .map(|index| pdf_student(&format!("100450{index}"), "Nigar Əliyeva", index != 4))
        .collect::<Vec<String>>()
        .join("\n");

    let outcome = parse_pdf_text(&text, &source(), &ParseOptions::default());
    assert_eq!(outcome.kind, DocumentKind::Pdf);
    assert_eq!(outcome.records.len(), 9);
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.students_failed, 1);
    assert!(outcome.failures[0].segment.starts_with("1004504"));
    assert_eq!(
        outcome.message(),
        "9 students processed successfully, 1 segments failed"
    );

    let record = &outcome.records[0];
    assert_eq!(record.student_code, "1004500");
    assert_eq!(record.student_name.as_deref(), Some("Nigar Əliyeva"));
    assert_eq!(record.subjects.len(), 2);
    assert_eq!(record.subjects[0].correct_answers, 2);
    assert_eq!(record.subjects[0].wrong_answers, 1);
    assert_eq!(record.subjects[1].score, Some(100.0));
    assert_eq!(record.total_score, Some(100.0));
}

#[test]
fn numeric_pdf_answers_stay_with_their_student() {
    let text = "Kod: 1004567 Əli Məmmədov\nRiyaziyyat\nEtalon 1003456\nŞagirdin cavabı 1003457\n+++++++-";

    let outcome = parse_pdf_text(text, &source(), &ParseOptions::default());
    assert_eq!(outcome.records.len(), 1);
    assert!(outcome.failures.is_empty());

    let record = &outcome.records[0];
    assert_eq!(record.student_code, "1004567");
    let subject = &record.subjects[0];
    assert_eq!(subject.subject_name, "Riyaziyyat");
    assert_eq!(subject.total_questions, 8);
    assert_eq!(subject.correct_answers, 7);
    assert_eq!(subject.answers[6].etalon_answer, "6");
    assert_eq!(subject.answers[6].student_answer, "7");
}

#[test]
fn pdf_pages_are_correlated_to_students() {
    let pages = vec![
        pdf_student("1004500", "Nigar Əliyeva", true),
        pdf_student("1004501", "Orxan Quliyev", true),
    ];

    let outcome = parse_pdf_pages(&pages, &source(), &ParseOptions::default());
    assert_eq!(outcome.records.len(), 2);
    assert_eq!(outcome.records[0].pdf_page_number, Some(1));
    assert_eq!(outcome.records[1].pdf_page_number, Some(2));
    let correlation = outcome.correlation.expect("pdf pages should be correlated");
    assert_eq!(correlation.pages_scanned, 2);
}

#[test]
fn invalid_code_prefix_fails_the_document_softly() {
    let options = ParseOptions {
        pdf_code_min_digits: u32::MAX as usize + 1,
        ..ParseOptions::default()
    };

    let outcome = parse_pdf_text("Kod: 1004567", &source(), &options);
    assert!(outcome.records.is_empty());
    assert_eq!(outcome.failures.len(), 1);
    assert!(outcome.failures[0].reason.starts_with("invalid student code pattern"));
}

#[test]
fn rejected_answers_respect_blank_and_zero_cells() {
    let workbook = Workbook {
        sheets: vec![Sheet::new(
            "1004567",
            vec![
                row(&["Kimya"]),
                row(&["etalon", "A", "B", "C", "D"]),
                vec![
                    Cell::from("Şagirdin cavabı"),
                    Cell::from("C"),
                    Cell::Empty,
                    Cell::from(0.0),
                    Cell::from("D"),
                ],
                row(&["", "i", "i", "i", "+"]),
            ],
        )],
    };

    let outcome = parse_workbook(&workbook, &source(), &ParseOptions::default());
    let subject = &outcome.records[0].subjects[0];
    assert_eq!(subject.rejected_answers, 1);
    assert_eq!(subject.wrong_answers, 2);
    assert_eq!(subject.correct_answers, 1);
    assert!(
        subject
            .answers
            .iter()
            .all(|answer| !(answer.is_correct && answer.is_rejected))
    );
}
