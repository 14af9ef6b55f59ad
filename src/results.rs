// Exam results of the current semester (`/kos/results.do`).

use scraper::{ElementRef, Html, Selector};
use serde::Serialize;
use std::sync::LazyLock;

use crate::dom::{self, selector};
use crate::error::Result;
use crate::semester::Semester;

// Column positions are defined by the live portal and are not validated.
static RESULTS_TABLE: LazyLock<Selector> = LazyLock::new(|| {
    selector(
        "#main-panel > table > tbody > tr > td:nth-of-type(2) > table > tbody > tr:nth-of-type(7) > td > table",
    )
});
static ROW: LazyLock<Selector> = LazyLock::new(|| selector("tr"));
static CELL: LazyLock<Selector> = LazyLock::new(|| selector("td"));

const SEMESTER_COLUMN: usize = 0;
const SUBJECT_COLUMN: usize = 2;
const CLOSED_COLUMN: usize = 8;
const CREDIT_COLUMN: usize = 9;
const GRADE_COLUMN: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultRow {
    pub subject: String,
    pub closed: String,
    pub credited: String,
    pub grade: String,
}

/// `N` and `A` become `No` and `Yes`; anything else is shown as the portal sent it.
pub fn closed_label(code: &str) -> String {
    match code {
        "N" => "No".to_string(),
        "A" => "Yes".to_string(),
        other => other.to_string(),
    }
}

/// `Z` (zapocteno) and `N` become `Yes` and `No`; anything else passes through.
pub fn credited_label(code: &str) -> String {
    match code {
        "Z" => "Yes".to_string(),
        "N" => "No".to_string(),
        other => other.to_string(),
    }
}

/// Rows of the results table belonging to `semester`, in table order.
/// A page without the table yields no rows.
pub fn parse_results(document: &Html, semester: &Semester) -> Result<Vec<ResultRow>> {
    let Some(table) = document.select(&RESULTS_TABLE).next() else {
        return Ok(Vec::new());
    };
    let key = semester.key();

    let mut rows = Vec::new();
    for row in table.select(&ROW) {
        let cells: Vec<ElementRef<'_>> = row.select(&CELL).collect();
        match cells.get(SEMESTER_COLUMN) {
            Some(first) if dom::text(*first) == key => {}
            _ => continue,
        }
        rows.push(ResultRow {
            subject: dom::cell(&cells, SUBJECT_COLUMN, "subject")?,
            closed: closed_label(&dom::cell(&cells, CLOSED_COLUMN, "closed flag")?),
            credited: credited_label(&dom::cell(&cells, CREDIT_COLUMN, "credit flag")?),
            grade: dom::cell(&cells, GRADE_COLUMN, "grade")?,
        });
    }
    Ok(rows)
}
