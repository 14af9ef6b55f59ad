// Exam and credit terms (`/kos/examsTerms.do`).
//
// The terms page lists the student's subjects in a selector. Terms are
// not on the page itself: the search form has to be posted once per
// subject, and every answer holds a table whose rows are either exam
// sittings or credit sessions.

use indexmap::IndexMap;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::Serialize;
use std::fmt;
use std::sync::LazyLock;
use url::Url;

use crate::dom::{self, selector};
use crate::error::{KosError, Result};
use crate::form::{Form, Method};

static SUBJECT_OPTION: LazyLock<Selector> = LazyLock::new(|| selector("select option"));
/// The portal opens the search form directly inside the content table.
static SEARCH_FORM: LazyLock<Selector> = LazyLock::new(|| {
    selector("#main-panel > table > tbody > tr > td:nth-of-type(2) > table form")
});
static TERM_ROW: LazyLock<Selector> =
    LazyLock::new(|| selector(r#"tr[class="tableRow1"], tr[class="tableRow2"]"#));
static CELL: LazyLock<Selector> = LazyLock::new(|| selector("td"));
static LINK: LazyLock<Selector> = LazyLock::new(|| selector("a"));

static SUBJECT_NAME: LazyLock<Regex> = LazyLock::new(|| Regex::new(r" - (.*?) ").expect("valid regex"));
static TERM_ID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"'(.*?)'").expect("valid regex"));

/// Exam sittings are rendered with exactly this many cells; any other row
/// shape is a credit session. Revisit if the portal changes its markup.
pub const EXAM_ROW_CELLS: usize = 20;

const DATE_CELL: usize = 1;
const ROOM_CELL: usize = 6;
const CAPACITY_CELL: usize = 13;
const NOTE_CELL: usize = 15;

pub fn is_exam_row(cell_count: usize) -> bool {
    cell_count == EXAM_ROW_CELLS
}

/// Subjects grouped in enumeration order, terms in table order.
pub type ExamSchedule = IndexMap<String, Vec<ExamTerm>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject {
    /// Value posted as `selSubject`.
    pub code: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ExamTerm {
    Exam {
        subject: String,
        date: String,
        room: String,
        capacity: String,
        note: String,
        id: String,
    },
    Credit {
        subject: String,
        date: String,
        room: String,
        id: String,
    },
}

impl fmt::Display for ExamTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExamTerm::Exam {
                date,
                room,
                capacity,
                note,
                id,
                ..
            } => write!(f, "Exam {date} {room} {capacity} {note} {id}"),
            ExamTerm::Credit { date, room, id, .. } => write!(f, "Credit {date} {room} {id}"),
        }
    }
}

/// Subjects offered in the page's selector.
pub fn parse_subjects(document: &Html) -> Result<Vec<Subject>> {
    document
        .select(&SUBJECT_OPTION)
        .map(|option| {
            let text = dom::text(option);
            let name = SUBJECT_NAME
                .captures(&text)
                .map(|c| c[1].to_string())
                .ok_or_else(|| KosError::mismatch("subject name", text.as_str()))?;
            Ok(Subject {
                code: option.attr("value").unwrap_or_default().to_string(),
                name,
            })
        })
        .collect()
}

/// The term search form, retargeted to post to `action`.
pub fn search_form(document: &Html, page_url: &Url, action: Url) -> Result<Form> {
    Ok(Form::find(document, &SEARCH_FORM, page_url, "exam term search form")?
        .with_action(action)
        .with_method(Method::Post))
}

/// Field values that select all terms of `subject_code`.
pub fn search_fields(subject_code: &str) -> [(&'static str, &str); 6] {
    [
        ("action", "selectTerms"),
        ("selSubject", subject_code),
        ("termId", ""),
        ("examId", ""),
        ("volnaKapacita", ""),
        ("nahradnictviPovoleno", ""),
    ]
}

/// Term rows of one search answer.
pub fn parse_term_rows(document: &Html, subject: &Subject) -> Result<Vec<ExamTerm>> {
    document
        .select(&TERM_ROW)
        .map(|row| parse_term_row(row, &subject.name))
        .collect()
}

fn parse_term_row(row: ElementRef<'_>, subject: &str) -> Result<ExamTerm> {
    let cells: Vec<ElementRef<'_>> = row.select(&CELL).collect();
    let href = cells
        .last()
        .and_then(|c| c.select(&LINK).next())
        .and_then(|a| a.attr("href"))
        .ok_or_else(|| KosError::missing("term link"))?;
    let id = TERM_ID
        .captures(href)
        .map(|c| c[1].to_string())
        .ok_or_else(|| KosError::mismatch("term id", href))?;

    let date = dom::cell(&cells, DATE_CELL, "term date")?;
    let room = dom::cell(&cells, ROOM_CELL, "term room")?;
    if is_exam_row(cells.len()) {
        Ok(ExamTerm::Exam {
            subject: subject.to_string(),
            date,
            room,
            capacity: dom::cell(&cells, CAPACITY_CELL, "term capacity")?,
            note: dom::cell(&cells, NOTE_CELL, "term note")?,
            id,
        })
    } else {
        Ok(ExamTerm::Credit {
            subject: subject.to_string(),
            date,
            room,
            id,
        })
    }
}
