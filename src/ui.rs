// UI layer: sign-in prompt, the action menu and the text renderers.
// Prompts go through the `Prompt` trait so the whole session can be
// driven by a script in tests; the real terminal uses `dialoguer`.

use dialoguer::{Password, Select};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use yansi::Paint;

use crate::api::KosClient;
use crate::config::{Config, OutputFormat};
use crate::error::Result;
use crate::exams::ExamSchedule;
use crate::results::ResultRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    DisplayResults,
    DisplayExams,
    Quit,
}

impl MenuAction {
    pub const ALL: [MenuAction; 3] = [
        MenuAction::DisplayResults,
        MenuAction::DisplayExams,
        MenuAction::Quit,
    ];

    pub fn label(self) -> &'static str {
        match self {
            MenuAction::DisplayResults => "Display results",
            MenuAction::DisplayExams => "Display exams",
            MenuAction::Quit => "Quit",
        }
    }
}

/// Source of interactive input.
pub trait Prompt {
    /// Ask for the password without echoing it.
    fn password(&mut self) -> io::Result<String>;
    fn action(&mut self) -> io::Result<MenuAction>;
}

/// Keyboard-driven prompts on the controlling terminal.
pub struct TerminalPrompt;

impl Prompt for TerminalPrompt {
    fn password(&mut self) -> io::Result<String> {
        Password::new().with_prompt("Password").interact()
    }

    fn action(&mut self) -> io::Result<MenuAction> {
        let labels = MenuAction::ALL.map(MenuAction::label);
        let index = Select::new()
            .with_prompt("What do you want to do?")
            .items(&labels)
            .default(0)
            .interact()?;
        Ok(MenuAction::ALL[index])
    }
}

/// Run one session: sign in, show the account summary and serve menu
/// actions until the user quits. Scraping errors end the session.
pub fn run<P: Prompt, W: Write>(config: &Config, prompt: &mut P, out: &mut W) -> Result<()> {
    section(out, "Signing into CVUT:KOS")?;
    note(out, &format!("Remote server set to {}", config.base_url))?;

    let mut client = KosClient::new(config.base_url.clone())?;
    client.sign_in(&config.username, |attempt| {
        if attempt > 1 {
            warning(&mut *out, "Wrong username or password")?;
        }
        Ok(prompt.password()?)
    })?;
    success(out, "Sign-in successful")?;

    let semester = client.current_semester()?;
    if let Some(days) = client.password_expires_in()? {
        writeln!(out, " Your password expires in {days} days")?;
    }
    writeln!(out, " Current semester: {semester}")?;
    writeln!(out)?;

    loop {
        match prompt.action()? {
            MenuAction::DisplayResults => {
                let rows = client.results(&semester)?;
                match config.output {
                    OutputFormat::Text => write!(out, "{}", render_results(&rows))?,
                    OutputFormat::Json => writeln!(out, "{}", serde_json::to_string_pretty(&rows)?)?,
                }
            }
            MenuAction::DisplayExams => {
                let schedule = client.exam_terms(&progress_bar())?;
                match config.output {
                    OutputFormat::Text => write!(out, "{}", render_exams(&schedule))?,
                    OutputFormat::Json => writeln!(out, "{}", serde_json::to_string_pretty(&schedule)?)?,
                }
            }
            MenuAction::Quit => {
                writeln!(out, " Goodbye.")?;
                return Ok(());
            }
        }
    }
}

fn progress_bar() -> ProgressBar {
    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::with_template("{spinner} {msg} [{bar:30}] {pos}/{len}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    bar
}

const RESULT_HEADERS: [&str; 4] = ["Subject", "Closed", "Credit", "Grade"];

/// Four-column results table.
pub fn render_results(rows: &[ResultRow]) -> String {
    let body: Vec<[&str; 4]> = rows
        .iter()
        .map(|r| [r.subject.as_str(), r.closed.as_str(), r.credited.as_str(), r.grade.as_str()])
        .collect();

    let mut widths = RESULT_HEADERS.map(|h| h.chars().count());
    for row in &body {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let rule = widths
        .iter()
        .map(|w| "-".repeat(w + 2))
        .collect::<Vec<_>>()
        .join(" ");
    let line = |cells: &[&str; 4]| {
        let padded: Vec<String> = cells
            .iter()
            .zip(&widths)
            .map(|(cell, &width)| format!("{cell:<width$}"))
            .collect();
        format!("  {}", padded.join("   ")).trim_end().to_string()
    };

    let mut table = String::new();
    table.push_str(&format!(" {rule}\n"));
    table.push_str(&format!("{}\n", line(&RESULT_HEADERS)));
    table.push_str(&format!(" {rule}\n"));
    for row in &body {
        table.push_str(&format!("{}\n", line(row)));
    }
    table.push_str(&format!(" {rule}\n"));
    table
}

/// One block per subject: header, a line per term, then a separator.
pub fn render_exams(schedule: &ExamSchedule) -> String {
    let mut listing = String::new();
    for (subject, terms) in schedule {
        listing.push_str(&format!(" {subject}\n"));
        if terms.is_empty() {
            listing.push_str("   (no terms)\n");
        }
        for term in terms {
            listing.push_str(&format!("   {term}\n"));
        }
        listing.push_str(&format!(" {}\n", "-".repeat(40)));
    }
    listing
}

fn section<W: Write>(out: &mut W, title: &str) -> io::Result<()> {
    writeln!(out, "{}", title.yellow().bold())?;
    writeln!(out, "{}", "=".repeat(title.chars().count()).yellow())?;
    writeln!(out)
}

fn note<W: Write>(out: &mut W, message: &str) -> io::Result<()> {
    writeln!(out, " {} {message}", "! [NOTE]".yellow())
}

fn success<W: Write>(out: &mut W, message: &str) -> io::Result<()> {
    writeln!(out, " {}", format!("[OK] {message}").green().bold())
}

fn warning<W: Write>(out: &mut W, message: &str) -> io::Result<()> {
    writeln!(out, " {}", format!("[WARNING] {message}").red().bold())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exams::ExamTerm;

    fn row(subject: &str, closed: &str, credited: &str, grade: &str) -> ResultRow {
        ResultRow {
            subject: subject.into(),
            closed: closed.into(),
            credited: credited.into(),
            grade: grade.into(),
        }
    }

    #[test]
    fn results_table_is_aligned() {
        let table = render_results(&[
            row("Algoritmy a grafy 1", "Yes", "Yes", "B"),
            row("Sport", "No", "No", ""),
        ]);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 6);
        assert_eq!(lines[0], " --------------------- -------- -------- -------");
        assert_eq!(lines[1], "  Subject               Closed   Credit   Grade");
        assert_eq!(lines[3], "  Algoritmy a grafy 1   Yes      Yes      B");
        assert_eq!(lines[4], "  Sport                 No       No");
        assert_eq!(lines[5], lines[0]);
    }

    #[test]
    fn empty_results_render_header_only() {
        assert_eq!(render_results(&[]).lines().count(), 4);
    }

    #[test]
    fn exams_grouped_by_subject() {
        let mut schedule = ExamSchedule::new();
        schedule.insert(
            "Algorithms".into(),
            vec![ExamTerm::Credit {
                subject: "Algorithms".into(),
                date: "05.01.2024".into(),
                room: "T9:301".into(),
                id: "4712".into(),
            }],
        );
        schedule.insert("Programming".into(), Vec::new());

        let listing = render_exams(&schedule);
        let lines: Vec<&str> = listing.lines().collect();
        assert_eq!(lines[0], " Algorithms");
        assert_eq!(lines[1], "   Credit 05.01.2024 T9:301 4712");
        assert!(lines[2].starts_with(" ---"));
        assert_eq!(lines[3], " Programming");
        assert_eq!(lines[4], "   (no terms)");
    }

    #[test]
    fn menu_labels() {
        let labels = MenuAction::ALL.map(MenuAction::label);
        assert_eq!(labels, ["Display results", "Display exams", "Quit"]);
    }
}
