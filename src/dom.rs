// Small helpers over `scraper` shared by the page parsers.

use scraper::{ElementRef, Html, Selector};

use crate::error::{KosError, Result};

/// Parse a selector that is a compile-time constant.
pub(crate) fn selector(css: &str) -> Selector {
    Selector::parse(css).unwrap_or_else(|e| panic!("invalid selector {css:?}: {e}"))
}

/// Text content of an element with whitespace runs collapsed and trimmed.
pub(crate) fn text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// First element matching `selector`, or a `MissingElement` error naming `what`.
pub(crate) fn first<'a>(document: &'a Html, selector: &Selector, what: &str) -> Result<ElementRef<'a>> {
    document
        .select(selector)
        .next()
        .ok_or_else(|| KosError::missing(what))
}

/// Cell `index` of an already collected row.
pub(crate) fn cell(cells: &[ElementRef<'_>], index: usize, what: &str) -> Result<String> {
    cells
        .get(index)
        .map(|c| text(*c))
        .ok_or_else(|| KosError::missing(format!("{what} (cell {index})")))
}
