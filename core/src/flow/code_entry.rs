//! Six-cell verification code collector.

use serde::{Deserialize, Serialize};

use crate::domain::entities::CODE_LENGTH;

/// Render snapshot of the code entry cells
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeEntryView {
    /// Cell contents in entry order
    pub cells: [Option<char>; CODE_LENGTH],
    /// Index of the focused cell, `None` when every cell is filled
    pub focus: Option<usize>,
}

/// Collector for the six single-character code cells
///
/// Characters land in the focused cell and advance focus to the next one.
/// Filling the last cell yields the six-character concatenation exactly
/// once; further characters are ignored until the cells are cleared.
/// Re-focusing an earlier cell clears that cell and everything after it,
/// and `backspace` steps back one cell.
///
/// Invariant: a cell holds a character exactly when its index is below the
/// focus position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeEntry {
    cells: [Option<char>; CODE_LENGTH],
    focus: usize,
}

impl CodeEntry {
    /// Creates an empty collector focused on the first cell
    pub fn new() -> Self {
        Self {
            cells: [None; CODE_LENGTH],
            focus: 0,
        }
    }

    /// Enters a character into the focused cell
    ///
    /// Non-digit characters are ignored, as is input once every cell is
    /// filled. Returns the completed code when this entry filled the last
    /// cell, `None` otherwise.
    pub fn enter(&mut self, ch: char) -> Option<String> {
        if self.focus >= CODE_LENGTH || !ch.is_ascii_digit() {
            return None;
        }

        self.cells[self.focus] = Some(ch);
        self.focus += 1;

        if self.focus == CODE_LENGTH {
            Some(self.cells.iter().flatten().collect())
        } else {
            None
        }
    }

    /// Moves focus back to an earlier cell
    ///
    /// Clears the target cell and every cell after it; the characters there
    /// were typed relative to a prefix the user is abandoning. Indexes at or
    /// past the focus are clamped to it, so focus never skips ahead of the
    /// first empty cell.
    pub fn focus_cell(&mut self, index: usize) {
        let index = index.min(self.focus);
        for cell in self.cells[index..].iter_mut() {
            *cell = None;
        }
        self.focus = index;
    }

    /// Clears the cell behind the focus and steps back to it
    pub fn backspace(&mut self) {
        if self.focus == 0 {
            return;
        }
        self.focus -= 1;
        self.cells[self.focus] = None;
    }

    /// Empties every cell and returns focus to the first one
    pub fn clear(&mut self) {
        self.cells = [None; CODE_LENGTH];
        self.focus = 0;
    }

    /// Snapshot of the cells and focus for rendering
    pub fn view(&self) -> CodeEntryView {
        CodeEntryView {
            cells: self.cells,
            focus: (self.focus < CODE_LENGTH).then_some(self.focus),
        }
    }
}

impl Default for CodeEntry {
    fn default() -> Self {
        Self::new()
    }
}
