//! Six-cell code entry.
//!
//! Mirrors the row of single-digit inputs shown under "Enter the code we
//! emailed you": typing advances focus, backspace on an empty cell steps
//! back, and a paste into the first cell fills the whole row.

use serde::{Deserialize, Serialize};

/// Number of cells in a standard code.
pub const CODE_LENGTH: usize = 6;

/// Cell state of a code entry row.
///
/// Every cell is either empty or holds exactly one ASCII digit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeEntry {
    cells: Vec<Option<char>>,
    focus: usize,
}

impl Default for CodeEntry {
    fn default() -> Self {
        Self::new(CODE_LENGTH)
    }
}

impl CodeEntry {
    /// Creates an empty row of `length` cells with focus on the first one.
    ///
    /// A zero length is treated as one cell.
    pub fn new(length: usize) -> Self {
        Self {
            cells: vec![None; length.max(1)],
            focus: 0,
        }
    }

    /// Number of cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Always false; a row has at least one cell.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Index of the focused cell.
    pub fn focus(&self) -> usize {
        self.focus
    }

    /// Digit held by cell `index`, if any.
    pub fn cell(&self, index: usize) -> Option<char> {
        self.cells.get(index).copied().flatten()
    }

    /// Cells as display strings (`""` for an empty cell).
    pub fn cells(&self) -> Vec<String> {
        self.cells
            .iter()
            .map(|c| c.map(String::from).unwrap_or_default())
            .collect()
    }

    /// Applies a keystroke to cell `index`.
    ///
    /// Only the last character of `raw` is kept. Non-digits are ignored and
    /// leave the row untouched; an empty `raw` clears the cell. Returns true
    /// when the row accepted the edit.
    pub fn set_digit(&mut self, index: usize, raw: &str) -> bool {
        if index >= self.cells.len() {
            return false;
        }

        let Some(ch) = raw.chars().last() else {
            self.cells[index] = None;
            return true;
        };

        if !ch.is_ascii_digit() {
            return false;
        }

        self.cells[index] = Some(ch);
        if index + 1 < self.cells.len() {
            self.focus = index + 1;
        }
        true
    }

    /// Handles backspace pressed on cell `index`.
    ///
    /// Moves focus back only when the cell is already empty. Returns the
    /// focused index afterwards.
    pub fn handle_backspace(&mut self, index: usize) -> usize {
        if index > 0 && index < self.cells.len() && self.cells[index].is_none() {
            self.focus = index - 1;
        }
        self.focus
    }

    /// Distributes pasted text over the row, starting at the first cell.
    ///
    /// Only the first `len()` characters are considered and they must all be
    /// digits, otherwise the paste is rejected and the row is unchanged.
    /// Focus lands on the cell holding the last pasted digit (`"12"` focuses
    /// cell 1), not the cell after it.
    pub fn handle_paste(&mut self, text: &str) -> bool {
        let pasted: Vec<char> = text.chars().take(self.cells.len()).collect();
        if pasted.is_empty() || !pasted.iter().all(|c| c.is_ascii_digit()) {
            return false;
        }

        for (i, cell) in self.cells.iter_mut().enumerate() {
            *cell = pasted.get(i).copied();
        }
        self.focus = pasted.len() - 1;
        true
    }

    /// True iff every cell holds a digit.
    pub fn is_complete(&self) -> bool {
        self.cells.iter().all(Option::is_some)
    }

    /// The digits in order. Only a full code when `is_complete()`.
    pub fn assembled_code(&self) -> String {
        self.cells.iter().flatten().collect()
    }

    /// Empties every cell and focuses the first one.
    pub fn clear(&mut self) {
        self.cells.iter_mut().for_each(|c| *c = None);
        self.focus = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(code: &str) -> CodeEntry {
        let mut entry = CodeEntry::default();
        for (i, ch) in code.chars().enumerate() {
            assert!(entry.set_digit(i, &ch.to_string()));
        }
        entry
    }

    #[test]
    fn test_typing_advances_focus() {
        let mut entry = CodeEntry::default();
        assert!(entry.set_digit(0, "4"));
        assert_eq!(entry.focus(), 1);
        assert!(entry.set_digit(5, "9"));
        assert_eq!(entry.focus(), 1, "last cell does not move focus");
    }

    #[test]
    fn test_non_digit_is_ignored() {
        let mut entry = filled("12");
        assert!(!entry.set_digit(2, "x"));
        assert_eq!(entry.cell(2), None);
        assert_eq!(entry.focus(), 2);
    }

    #[test]
    fn test_multi_char_keeps_last() {
        let mut entry = CodeEntry::default();
        assert!(entry.set_digit(3, "78"));
        assert_eq!(entry.cell(3), Some('8'));
        assert!(!entry.set_digit(3, "7a"));
        assert_eq!(entry.cell(3), Some('8'));
    }

    #[test]
    fn test_empty_input_clears_cell() {
        let mut entry = filled("123");
        assert!(entry.set_digit(1, ""));
        assert_eq!(entry.cells(), vec!["1", "", "3", "", "", ""]);
    }

    #[test]
    fn test_backspace_moves_back_only_from_empty_cell() {
        let mut entry = filled("12");
        assert_eq!(entry.handle_backspace(1), 2, "filled cell keeps focus");
        assert_eq!(entry.handle_backspace(2), 1);
        assert_eq!(entry.cells(), vec!["1", "2", "", "", "", ""]);

        let mut empty = CodeEntry::default();
        assert_eq!(empty.handle_backspace(0), 0);
    }

    #[test]
    fn test_paste_full_code() {
        let mut entry = CodeEntry::default();
        assert!(entry.handle_paste("123456"));
        assert_eq!(entry.cells(), vec!["1", "2", "3", "4", "5", "6"]);
        assert_eq!(entry.focus(), 5);
        assert!(entry.is_complete());
    }

    #[test]
    fn test_paste_partial_code() {
        let mut entry = CodeEntry::default();
        assert!(entry.handle_paste("12"));
        assert_eq!(entry.cells(), vec!["1", "2", "", "", "", ""]);
        assert_eq!(entry.focus(), 1);
        assert!(!entry.is_complete());
    }

    #[test]
    fn test_paste_with_non_digit_rejected() {
        let mut entry = filled("9");
        assert!(!entry.handle_paste("12a4"));
        assert!(!entry.handle_paste(""));
        assert_eq!(entry.cells(), vec!["9", "", "", "", "", ""]);
    }

    #[test]
    fn test_paste_only_reads_first_six() {
        let mut entry = CodeEntry::default();
        assert!(entry.handle_paste("1234567x"));
        assert_eq!(entry.assembled_code(), "123456");
    }

    #[test]
    fn test_completeness_invariant_over_edits() {
        let mut entry = CodeEntry::default();
        let edits: [(usize, &str); 9] = [
            (0, "1"),
            (1, "2"),
            (2, "a"),
            (2, "3"),
            (3, "4"),
            (4, "5"),
            (4, ""),
            (4, "5"),
            (5, "6"),
        ];
        for (i, raw) in edits {
            entry.set_digit(i, raw);
            entry.handle_backspace(i);
            assert_eq!(entry.assembled_code().len() == 6, entry.is_complete());
        }
        assert!(entry.is_complete());
        assert_eq!(entry.assembled_code(), "123456");
    }

    #[test]
    fn test_clear_resets_row() {
        let mut entry = filled("123456");
        entry.clear();
        assert_eq!(entry, CodeEntry::default());
    }
}
