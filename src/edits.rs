//! Pending-edit tracking for the results grid.
//!
//! A sparse map of `(row, col)` → original/new value pairs. An entry exists
//! only while the new value differs from the original under normalized
//! string comparison; committing a round-trip back to the original deletes
//! the entry instead of storing a no-op.

use std::collections::{BTreeMap, HashMap};

use crate::resultset::CellValue;

#[derive(Clone, Debug, PartialEq)]
pub struct EditedCell {
    pub row: usize,
    pub col: usize,
    pub original: CellValue,
    pub new_value: CellValue,
}

/// The one in-progress textual edit. At most one exists at a time; starting
/// a selection drag while this is open commits or cancels it first.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EditingCell {
    pub row: usize,
    pub col: usize,
    pub buffer: String,
    pub cursor: usize,
}

impl EditingCell {
    pub fn new(row: usize, col: usize, initial: String) -> Self {
        let cursor = initial.chars().count();
        Self { row, col, buffer: initial, cursor }
    }

    pub fn insert_char(&mut self, ch: char) {
        let byte = char_to_byte(&self.buffer, self.cursor);
        self.buffer.insert(byte, ch);
        self.cursor += 1;
    }

    pub fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        self.cursor -= 1;
        let byte = char_to_byte(&self.buffer, self.cursor);
        self.buffer.remove(byte);
    }

    pub fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.buffer.chars().count());
    }
}

fn char_to_byte(s: &str, char_pos: usize) -> usize {
    s.char_indices().nth(char_pos).map(|(b, _)| b).unwrap_or(s.len())
}

/// Parse an edit buffer according to the original value's runtime type.
/// Malformed numeric input falls back to a plain string rather than being
/// rejected; the edit path never blocks on a parse error.
pub fn parse_edit_buffer(buffer: &str, original: &CellValue) -> CellValue {
    if buffer.is_empty() || buffer.eq_ignore_ascii_case("null") {
        return CellValue::Null;
    }
    match original {
        CellValue::Number(_) => match buffer.trim().parse::<f64>() {
            Ok(n) => CellValue::Number(n),
            Err(_) => {
                log::debug!("non-numeric edit {:?} kept as text", buffer);
                CellValue::Text(buffer.to_string())
            }
        },
        CellValue::Bool(_) => {
            CellValue::Bool(buffer == "1" || buffer.eq_ignore_ascii_case("true"))
        }
        CellValue::Null | CellValue::Text(_) | CellValue::Bytes(_) => {
            CellValue::Text(buffer.to_string())
        }
    }
}

/// Normalized string form used to decide whether two values are "the same"
/// for dirty tracking. Numbers compare by canonical formatting so "5" and
/// "5.0" revert cleanly.
fn normalized(value: &CellValue) -> String {
    value.plain_text()
}

#[derive(Debug, Default)]
pub struct EditTracker {
    edits: HashMap<(usize, usize), EditedCell>,
}

impl EditTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    pub fn get(&self, row: usize, col: usize) -> Option<&EditedCell> {
        self.edits.get(&(row, col))
    }

    pub fn is_dirty(&self, row: usize, col: usize) -> bool {
        self.edits.contains_key(&(row, col))
    }

    pub fn row_is_dirty(&self, row: usize) -> bool {
        self.edits.keys().any(|&(r, _)| r == row)
    }

    /// The value the grid should show: pending edit if present, else the
    /// original from the result set.
    pub fn effective<'a>(&'a self, row: usize, col: usize, original: &'a CellValue) -> &'a CellValue {
        match self.edits.get(&(row, col)) {
            Some(e) => &e.new_value,
            None => original,
        }
    }

    /// Commit a parsed edit. Compares against the ORIGINAL baseline, not a
    /// previous edit: reverting to the starting value removes the entry.
    pub fn commit(&mut self, row: usize, col: usize, original: &CellValue, buffer: &str) {
        let new_value = parse_edit_buffer(buffer, original);
        if normalized(&new_value) == normalized(original) {
            self.edits.remove(&(row, col));
        } else {
            self.edits.insert(
                (row, col),
                EditedCell { row, col, original: original.clone(), new_value },
            );
        }
    }

    pub fn discard_all(&mut self) {
        self.edits.clear();
    }

    /// Pending edits grouped by row, columns ascending within each row.
    /// Deterministic order so generated UPDATEs are stable.
    pub fn by_row(&self) -> BTreeMap<usize, Vec<&EditedCell>> {
        let mut grouped: BTreeMap<usize, Vec<&EditedCell>> = BTreeMap::new();
        for edit in self.edits.values() {
            grouped.entry(edit.row).or_default().push(edit);
        }
        for edits in grouped.values_mut() {
            edits.sort_by_key(|e| e.col);
        }
        grouped
    }

    pub fn remove_row(&mut self, row: usize) {
        self.edits.retain(|&(r, _), _| r != row);
    }

    pub fn iter(&self) -> impl Iterator<Item = &EditedCell> {
        self.edits.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commit_then_revert_leaves_no_entry() {
        let mut tracker = EditTracker::new();
        let original = CellValue::Number(5.0);

        tracker.commit(0, 1, &original, "7");
        assert!(tracker.is_dirty(0, 1));
        assert_eq!(tracker.get(0, 1).unwrap().new_value, CellValue::Number(7.0));

        tracker.commit(0, 1, &original, "5");
        assert!(!tracker.is_dirty(0, 1));
        assert!(tracker.is_empty());
    }

    #[test]
    fn revert_compares_against_original_not_previous_edit() {
        let mut tracker = EditTracker::new();
        let original = CellValue::Text("alpha".into());
        tracker.commit(2, 0, &original, "beta");
        tracker.commit(2, 0, &original, "gamma");
        assert_eq!(tracker.get(2, 0).unwrap().original, original);
        tracker.commit(2, 0, &original, "alpha");
        assert!(tracker.is_empty());
    }

    #[test]
    fn empty_and_null_text_parse_to_null() {
        let original = CellValue::Text("x".into());
        assert_eq!(parse_edit_buffer("", &original), CellValue::Null);
        assert_eq!(parse_edit_buffer("NULL", &original), CellValue::Null);
        assert_eq!(parse_edit_buffer("null", &original), CellValue::Null);
    }

    #[test]
    fn numeric_parse_falls_back_to_text() {
        let original = CellValue::Number(1.0);
        assert_eq!(parse_edit_buffer("2.5", &original), CellValue::Number(2.5));
        assert_eq!(
            parse_edit_buffer("not a number", &original),
            CellValue::Text("not a number".into())
        );
    }

    #[test]
    fn boolean_parse_accepts_one_and_true() {
        let original = CellValue::Bool(false);
        assert_eq!(parse_edit_buffer("1", &original), CellValue::Bool(true));
        assert_eq!(parse_edit_buffer("TRUE", &original), CellValue::Bool(true));
        assert_eq!(parse_edit_buffer("yes", &original), CellValue::Bool(false));
        assert_eq!(parse_edit_buffer("0", &original), CellValue::Bool(false));
    }

    #[test]
    fn number_revert_tolerates_formatting() {
        let mut tracker = EditTracker::new();
        let original = CellValue::Number(5.0);
        tracker.commit(0, 0, &original, "5.0");
        assert!(tracker.is_empty());
    }

    #[test]
    fn by_row_groups_and_sorts() {
        let mut tracker = EditTracker::new();
        let orig = CellValue::Number(0.0);
        tracker.commit(2, 3, &orig, "1");
        tracker.commit(0, 1, &orig, "2");
        tracker.commit(2, 1, &orig, "3");
        let grouped = tracker.by_row();
        let rows: Vec<usize> = grouped.keys().copied().collect();
        assert_eq!(rows, vec![0, 2]);
        let cols: Vec<usize> = grouped[&2].iter().map(|e| e.col).collect();
        assert_eq!(cols, vec![1, 3]);
    }

    #[test]
    fn editing_cell_buffer_ops() {
        let mut editing = EditingCell::new(0, 0, "ab".into());
        editing.insert_char('c');
        assert_eq!(editing.buffer, "abc");
        editing.move_left();
        editing.backspace();
        assert_eq!(editing.buffer, "ac");
        editing.move_right();
        editing.insert_char('é');
        editing.insert_char('!');
        assert_eq!(editing.buffer, "acé!");
    }
}
