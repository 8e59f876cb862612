//! Cell selection for the results grid.
//!
//! Coordinates are logical (data) indices. Membership is decided in visual
//! space: after the user reorders columns a drag-selected rectangle still
//! has to look contiguous on screen, so the range's column bounds and the
//! queried cell are both mapped through the column order before comparing.

use crate::column_order::ColumnOrder;

/// A rectangular selection anchored where the gesture started. `start` may
/// exceed `end` on either axis; `normalized` takes min/max per axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SelectionRange {
    pub start_row: usize,
    pub start_col: usize,
    pub end_row: usize,
    pub end_col: usize,
}

impl SelectionRange {
    pub fn cell(row: usize, col: usize) -> Self {
        Self { start_row: row, start_col: col, end_row: row, end_col: col }
    }

    pub fn normalized(&self) -> Self {
        Self {
            start_row: self.start_row.min(self.end_row),
            start_col: self.start_col.min(self.end_col),
            end_row: self.start_row.max(self.end_row),
            end_col: self.start_col.max(self.end_col),
        }
    }

    pub fn row_span(&self) -> (usize, usize) {
        (self.start_row.min(self.end_row), self.start_row.max(self.end_row))
    }

    /// Visual span of the (possibly reordered) column bounds.
    pub fn visual_col_span(&self, order: &ColumnOrder) -> (usize, usize) {
        let a = order.to_visual(self.start_col);
        let b = order.to_visual(self.end_col);
        (a.min(b), a.max(b))
    }

    /// True iff the logical cell lies inside the on-screen rectangle.
    pub fn contains(&self, row: usize, col: usize, order: &ColumnOrder) -> bool {
        if col >= order.len() {
            return false;
        }
        let (r0, r1) = self.row_span();
        if row < r0 || row > r1 {
            return false;
        }
        let (v0, v1) = self.visual_col_span(order);
        let v = order.to_visual(col);
        v >= v0 && v <= v1
    }

    /// Logical columns covered by the visual rectangle, in visual order.
    pub fn logical_cols(&self, order: &ColumnOrder) -> Vec<usize> {
        let (v0, v1) = self.visual_col_span(order);
        (v0..=v1).map(|v| order.to_logical(v)).collect()
    }
}

/// Single-cell selection and multi-cell range, tracked as separate optional
/// fields. Every interaction path clears or sets both explicitly; nothing
/// here does it implicitly.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SelectionState {
    pub selected_cell: Option<(usize, usize)>,
    pub selection: Option<SelectionRange>,
}

impl SelectionState {
    pub fn set_selected_cell(&mut self, row: usize, col: usize) {
        self.selected_cell = Some((row, col));
        self.selection = None;
    }

    /// Extend from the last single-selected cell (shift-click / drag).
    /// Without an anchor this degrades to a plain single-cell select.
    pub fn extend_selection(&mut self, to_row: usize, to_col: usize) {
        match self.selected_cell {
            Some((ar, ac)) => {
                self.selection = Some(SelectionRange {
                    start_row: ar,
                    start_col: ac,
                    end_row: to_row,
                    end_col: to_col,
                });
            }
            None => self.set_selected_cell(to_row, to_col),
        }
    }

    /// Span every row and the full visual column extent: first visual
    /// column to last visual column, not logical 0..N.
    pub fn select_all(&mut self, row_count: usize, order: &ColumnOrder) {
        if row_count == 0 || order.is_empty() {
            return;
        }
        self.selection = Some(SelectionRange {
            start_row: 0,
            start_col: order.to_logical(0),
            end_row: row_count - 1,
            end_col: order.to_logical(order.len() - 1),
        });
        self.selected_cell = Some((0, order.to_logical(0)));
    }

    pub fn clear(&mut self) {
        self.selected_cell = None;
        self.selection = None;
    }

    pub fn contains(&self, row: usize, col: usize, order: &ColumnOrder) -> bool {
        if let Some(range) = &self.selection {
            if range.contains(row, col, order) {
                return true;
            }
        }
        self.selected_cell == Some((row, col))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_is_idempotent() {
        let r = SelectionRange { start_row: 9, start_col: 4, end_row: 2, end_col: 7 };
        let once = r.normalized();
        assert_eq!(once, once.normalized());
        assert_eq!(once.start_row, 2);
        assert_eq!(once.end_row, 9);
        assert_eq!(once.start_col, 4);
        assert_eq!(once.end_col, 7);
    }

    #[test]
    fn membership_uses_visual_positions() {
        // Visual order [1, 0, 2]: logical 0 sits at visual 1, logical 1 at
        // visual 0. A range over logical columns 0..1 covers visual 0..1,
        // i.e. exactly logical {1, 0}, and never logical 2.
        let order = ColumnOrder::from_permutation(vec![1, 0, 2]).unwrap();
        let range = SelectionRange { start_row: 0, start_col: 0, end_row: 1, end_col: 1 };

        assert!(range.contains(0, 0, &order));
        assert!(range.contains(0, 1, &order));
        assert!(!range.contains(0, 2, &order));
        assert_eq!(range.logical_cols(&order), vec![1, 0]);
    }

    #[test]
    fn membership_spans_reordered_gap() {
        // Logical 0 and 2 dragged apart: order [0, 2, 1]. A logical 0..2
        // range is visually 0..1 and so excludes logical 1 (visual 2).
        let order = ColumnOrder::from_permutation(vec![0, 2, 1]).unwrap();
        let range = SelectionRange { start_row: 0, start_col: 0, end_row: 0, end_col: 2 };
        assert!(range.contains(0, 0, &order));
        assert!(range.contains(0, 2, &order));
        assert!(!range.contains(0, 1, &order));
    }

    #[test]
    fn membership_respects_row_bounds() {
        let order = ColumnOrder::identity(3);
        let range = SelectionRange { start_row: 5, start_col: 0, end_row: 2, end_col: 2 };
        assert!(range.contains(2, 1, &order));
        assert!(range.contains(5, 1, &order));
        assert!(!range.contains(1, 1, &order));
        assert!(!range.contains(6, 1, &order));
    }

    #[test]
    fn set_selected_cell_clears_range() {
        let mut sel = SelectionState::default();
        sel.set_selected_cell(1, 1);
        sel.extend_selection(4, 2);
        assert!(sel.selection.is_some());
        sel.set_selected_cell(0, 0);
        assert!(sel.selection.is_none());
        assert_eq!(sel.selected_cell, Some((0, 0)));
    }

    #[test]
    fn extend_without_anchor_selects_single_cell() {
        let mut sel = SelectionState::default();
        sel.extend_selection(3, 2);
        assert_eq!(sel.selected_cell, Some((3, 2)));
        assert!(sel.selection.is_none());
    }

    #[test]
    fn select_all_uses_visual_extent() {
        let order = ColumnOrder::from_permutation(vec![2, 0, 1]).unwrap();
        let mut sel = SelectionState::default();
        sel.select_all(10, &order);
        let range = sel.selection.unwrap();
        assert_eq!(range.start_col, 2); // first visual column
        assert_eq!(range.end_col, 1); // last visual column
        assert_eq!((range.start_row, range.end_row), (0, 9));
        for col in 0..3 {
            assert!(range.contains(4, col, &order));
        }
    }

    #[test]
    fn select_all_on_empty_result_is_a_noop() {
        let order = ColumnOrder::identity(3);
        let mut sel = SelectionState::default();
        sel.select_all(0, &order);
        assert_eq!(sel, SelectionState::default());
    }
}
