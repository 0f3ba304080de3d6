use std::time::Duration;

use larkcore_index::Dino;
use serde::Serialize;

pub const MIN_HIGHLIGHT_CHARS: usize = 2;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultRow {
    pub dino: Dino,
    pub highlight: bool,
}

impl ResultRow {
    pub fn new(dino: Dino) -> Self {
        Self {
            dino,
            highlight: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HighlightWindow {
    Fast,
    Slow,
}

impl HighlightWindow {
    pub fn delay(self) -> Duration {
        match self {
            HighlightWindow::Fast => Duration::from_millis(10),
            HighlightWindow::Slow => Duration::from_millis(500),
        }
    }
}

/// Marks rows whose name contains the trimmed `text`, case-sensitively.
///
/// Text shorter than two characters clears every mark.
pub fn apply_highlight(rows: &mut [ResultRow], text: &str) {
    let needle = text.trim();

    if needle.chars().count() < MIN_HIGHLIGHT_CHARS {
        for row in rows.iter_mut() {
            row.highlight = false;
        }
        return;
    }

    for row in rows.iter_mut() {
        row.highlight = row
            .dino
            .name
            .as_deref()
            .is_some_and(|name| name.contains(needle));
    }
}
