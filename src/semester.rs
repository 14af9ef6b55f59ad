// Current semester as the portal identifies it.

use regex::Regex;
use scraper::{Html, Selector};
use std::fmt;
use std::sync::LazyLock;

use crate::dom::{self, selector};
use crate::error::{KosError, Result};

/// Cell with the semester label, e.g. `Z 2023/2024`.
static SEMESTER_CELL: LazyLock<Selector> = LazyLock::new(|| {
    selector("table > tbody > tr:nth-of-type(4) > td > table > tbody > tr:nth-of-type(1) > td:nth-of-type(3)")
});
/// Cell with the study plan name; bachelor plans are prefixed with `(B)`.
static PLAN_CELL: LazyLock<Selector> = LazyLock::new(|| {
    selector("table > tbody > tr:nth-of-type(1) > td > table > tbody > tr:nth-of-type(4) > td:nth-of-type(2)")
});
static YEAR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"20(\d{2})/").expect("valid regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SemesterPart {
    Winter,
    Summer,
}

impl SemesterPart {
    pub fn code(self) -> u8 {
        match self {
            SemesterPart::Winter => 1,
            SemesterPart::Summer => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StudyPlan {
    Bachelor,
    Magister,
}

impl StudyPlan {
    pub fn code(self) -> &'static str {
        match self {
            StudyPlan::Bachelor => "B",
            StudyPlan::Magister => "M",
        }
    }
}

/// Resolved once per session and never changed afterwards.
///
/// The `Display` form (`B231` for a bachelor plan in the winter part of
/// 2023/2024) is the key the results table uses in its first column, so it
/// has to match the portal's rendering character for character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Semester {
    pub plan: StudyPlan,
    /// Two-digit academic year, `23` for 2023/2024.
    pub year: u8,
    pub part: SemesterPart,
}

impl Semester {
    pub fn new(plan: StudyPlan, year: u8, part: SemesterPart) -> Self {
        Self { plan, year, part }
    }

    pub fn key(&self) -> String {
        self.to_string()
    }

    /// Read the semester from the welcome frame (`/kos/toWelcomeIFrame.do`).
    pub fn from_welcome_frame(document: &Html) -> Result<Self> {
        let label = dom::text(dom::first(document, &SEMESTER_CELL, "semester cell")?);
        let part = if label.starts_with('Z') {
            SemesterPart::Winter
        } else {
            SemesterPart::Summer
        };
        let year = YEAR
            .captures(&label)
            .and_then(|c| c[1].parse::<u8>().ok())
            .ok_or_else(|| KosError::mismatch("academic year", label.as_str()))?;

        let plan_name = dom::text(dom::first(document, &PLAN_CELL, "study plan cell")?);
        let plan = if plan_name.starts_with("(B)") {
            StudyPlan::Bachelor
        } else {
            StudyPlan::Magister
        };

        Ok(Self { plan, year, part })
    }
}

impl fmt::Display for Semester {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.plan.code(), self.year, self.part.code())
    }
}
