// Library root
// ------------
// The binary (`main.rs`) only parses arguments and hands over to `ui::run`.
//
// Module responsibilities:
// - `api`: the portal session (cookies, page token, sign-in) and the
//   requests behind every scraper.
// - `semester`, `results`, `exams`: parsers for the individual pages.
// - `form`, `dom`: HTML form handling and selector helpers.
// - `ui`: prompts, the action menu and output rendering.
// - `config`, `logging`, `error`: the ambient plumbing.
pub mod api;
pub mod config;
mod dom;
pub mod error;
pub mod exams;
pub mod form;
pub mod logging;
pub mod results;
pub mod semester;
pub mod ui;
