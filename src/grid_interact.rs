//! Keyboard and mouse handling for the results grid.
//!
//! Free functions over `Grid`, returning a `GridAction` for anything the
//! surrounding workspace has to follow up on (save confirmation, order
//! persistence, status messages). While a cell edit is open, keys go to the
//! edit buffer and nothing else.

use crossterm::event::{
    KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use tui::layout::Rect;

use crate::export::CopyFormat;
use crate::grid::{DragState, Grid, GridAction, GridTab, LastClick, ScrollDirection};
use crate::grid_render::visible_columns_for;
use crate::grid::DOUBLE_CLICK_WINDOW;
use std::time::Instant;

pub fn handle_key(grid: &mut Grid, key: KeyEvent) -> GridAction {
    if grid
        .current()
        .map(|t| t.editing.is_some())
        .unwrap_or(false)
    {
        return handle_editing_key(grid, key);
    }

    let shift = key.modifiers.contains(KeyModifiers::SHIFT);
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    let alt = key.modifiers.contains(KeyModifiers::ALT);

    match key.code {
        KeyCode::Char(']') => {
            if !grid.tabs.is_empty() {
                grid.tab_idx = (grid.tab_idx + 1) % grid.tabs.len();
            }
            return GridAction::None;
        }
        KeyCode::Char('[') => {
            if !grid.tabs.is_empty() {
                grid.tab_idx = (grid.tab_idx + grid.tabs.len() - 1) % grid.tabs.len();
            }
            return GridAction::None;
        }
        KeyCode::Char('a') if ctrl => {
            if let Some(tab) = grid.current_mut() {
                let rows = tab.row_count();
                let order = tab.order.clone();
                tab.selection.select_all(rows, &order);
            }
            return GridAction::None;
        }
        // shift+c arrives as an uppercase char on most terminals
        KeyCode::Char('c') | KeyCode::Char('C') if ctrl => {
            let with_header = shift || key.code == KeyCode::Char('C');
            let format = match grid.current().and_then(|t| t.copy_range()) {
                Some(r) => {
                    let n = r.normalized();
                    let single = n.start_row == n.end_row && n.start_col == n.end_col;
                    match (single, with_header) {
                        (true, false) => CopyFormat::Cell,
                        (true, true) => CopyFormat::CellWithHeader,
                        (false, false) => CopyFormat::TabSeparated,
                        (false, true) => CopyFormat::TabSeparatedWithHeader,
                    }
                }
                None => return GridAction::None,
            };
            return grid.copy_current(format);
        }
        KeyCode::Char('s') if ctrl => return grid.request_save(),
        _ => {}
    }

    let max_rows = grid.max_rows;
    let tab = match grid.current_mut() {
        Some(t) => t,
        None => return GridAction::None,
    };
    if tab.result().is_none() {
        return GridAction::None;
    }

    match key.code {
        KeyCode::Left if alt => return reorder_by_key(tab, -1),
        KeyCode::Right if alt => return reorder_by_key(tab, 1),
        KeyCode::Left => {
            tab.cursor_col = tab.cursor_col.saturating_sub(1);
            tab.scroll_direction = ScrollDirection::Left;
            after_move(tab, shift, max_rows);
        }
        KeyCode::Right => {
            tab.cursor_col = (tab.cursor_col + 1).min(tab.column_count());
            tab.scroll_direction = ScrollDirection::Right;
            after_move(tab, shift, max_rows);
        }
        KeyCode::Up => {
            tab.cursor_row = tab.cursor_row.saturating_sub(1);
            after_move(tab, shift, max_rows);
        }
        KeyCode::Down => {
            tab.cursor_row += 1;
            after_move(tab, shift, max_rows);
        }
        KeyCode::PageUp => {
            tab.cursor_row = tab.cursor_row.saturating_sub(max_rows.max(1));
            tab.view_row = tab.view_row.saturating_sub(max_rows.max(1));
            after_move(tab, shift, max_rows);
        }
        KeyCode::PageDown => {
            tab.cursor_row += max_rows.max(1);
            after_move(tab, shift, max_rows);
        }
        KeyCode::Home if ctrl => {
            tab.cursor_row = 0;
            after_move(tab, shift, max_rows);
        }
        KeyCode::End if ctrl => {
            tab.cursor_row = tab.row_count().saturating_sub(1);
            after_move(tab, shift, max_rows);
        }
        KeyCode::Home => {
            tab.cursor_col = 1.min(tab.column_count());
            tab.scroll_direction = ScrollDirection::Left;
            after_move(tab, shift, max_rows);
        }
        KeyCode::End => {
            tab.cursor_col = tab.column_count();
            tab.scroll_direction = ScrollDirection::Right;
            after_move(tab, shift, max_rows);
        }
        KeyCode::Enter | KeyCode::F(2) => {
            tab.start_edit();
        }
        KeyCode::Esc => {
            tab.selection.clear();
        }
        _ => {}
    }
    GridAction::None
}

/// Clamp after cursor movement, then update the selection: shift extends
/// from the anchor, a plain move re-anchors on the cursor cell.
fn after_move(tab: &mut GridTab, shift: bool, max_rows: usize) {
    tab.nudge_viewport(max_rows);
    let row = tab.cursor_row;
    match tab.cursor_logical_col() {
        Some(col) if shift => tab.selection.extend_selection(row, col),
        Some(col) => tab.selection.set_selected_cell(row, col),
        None => tab.selection.clear(),
    }
}

fn reorder_by_key(tab: &mut GridTab, delta: isize) -> GridAction {
    if tab.cursor_col == 0 {
        return GridAction::None;
    }
    let from = tab.cursor_col - 1;
    let to = from as isize + delta;
    if to < 0 || to as usize >= tab.order.len() {
        return GridAction::None;
    }
    tab.reorder_column(from, to as usize);
    tab.cursor_col = to as usize + 1;
    tab.scroll_direction = if delta < 0 { ScrollDirection::Left } else { ScrollDirection::Right };
    GridAction::PersistOrder
}

fn handle_editing_key(grid: &mut Grid, key: KeyEvent) -> GridAction {
    let tab = match grid.current_mut() {
        Some(t) => t,
        None => return GridAction::None,
    };
    match key.code {
        KeyCode::Enter => tab.commit_edit(),
        KeyCode::Esc => tab.cancel_edit(),
        _ => {
            if let Some(editing) = tab.editing.as_mut() {
                match key.code {
                    KeyCode::Backspace => editing.backspace(),
                    KeyCode::Left => editing.move_left(),
                    KeyCode::Right => editing.move_right(),
                    KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                        editing.insert_char(c)
                    }
                    _ => {}
                }
            }
        }
    }
    GridAction::None
}

/// Mouse handling against the grid's inner area (inside the border): row 0
/// of `inner` is the header, data rows follow.
pub fn handle_mouse(grid: &mut Grid, ev: MouseEvent, inner: Rect) -> GridAction {
    let max_rows = grid.max_rows;
    let tab = match grid.current_mut() {
        Some(t) => t,
        None => return GridAction::None,
    };
    if tab.result().is_none() {
        return GridAction::None;
    }

    let inside = ev.column >= inner.x
        && ev.column < inner.x + inner.width
        && ev.row >= inner.y
        && ev.row < inner.y + inner.height;
    let hit = if inside {
        hit_test(tab, ev.column - inner.x, ev.row - inner.y, inner.width)
    } else {
        None
    };

    match ev.kind {
        MouseEventKind::Down(MouseButton::Left) => {
            match hit {
                Some(Hit::Header { slot }) if slot >= 1 => {
                    tab.drag = DragState::MovingColumn { from_visual: slot - 1 };
                }
                Some(Hit::Cell { row, slot }) => {
                    if tab.editing.is_some() {
                        tab.commit_edit();
                    }
                    tab.cursor_row = row;
                    tab.cursor_col = slot;
                    let logical = match tab.cursor_logical_col() {
                        Some(c) => c,
                        None => {
                            tab.selection.clear();
                            return GridAction::None;
                        }
                    };
                    let shift = ev.modifiers.contains(KeyModifiers::SHIFT);
                    if shift {
                        tab.selection.extend_selection(row, logical);
                        tab.drag = DragState::Selecting { from_row: row, from_col: logical };
                        return GridAction::None;
                    }
                    let now = Instant::now();
                    let double = tab
                        .last_click
                        .map(|c| {
                            c.row == row
                                && c.col == logical
                                && now.duration_since(c.at) <= DOUBLE_CLICK_WINDOW
                        })
                        .unwrap_or(false);
                    tab.last_click = Some(LastClick { at: now, row, col: logical });
                    if double {
                        tab.last_click = None;
                        tab.start_edit();
                    } else {
                        tab.selection.set_selected_cell(row, logical);
                        tab.drag = DragState::Selecting { from_row: row, from_col: logical };
                    }
                }
                _ => {}
            }
        }
        MouseEventKind::Drag(MouseButton::Left) => {
            if let (DragState::Selecting { .. }, Some(Hit::Cell { row, slot })) = (tab.drag, hit) {
                tab.cursor_row = row;
                tab.cursor_col = slot;
                if let Some(logical) = tab.cursor_logical_col() {
                    tab.selection.extend_selection(row, logical);
                }
                tab.nudge_viewport(max_rows);
            }
        }
        MouseEventKind::Up(MouseButton::Left) => {
            let was = tab.drag;
            tab.drag = DragState::Idle;
            if let DragState::MovingColumn { from_visual } = was {
                if let Some(Hit::Header { slot }) = hit {
                    if slot >= 1 && slot - 1 != from_visual {
                        tab.reorder_column(from_visual, slot - 1);
                        tab.cursor_col = slot;
                        return GridAction::PersistOrder;
                    }
                }
            }
        }
        MouseEventKind::Moved => {
            tab.hover_row = match hit {
                Some(Hit::Cell { row, .. }) => Some(row),
                _ => None,
            };
        }
        MouseEventKind::ScrollDown if ev.modifiers.contains(KeyModifiers::CONTROL) => {
            tab.scroll_x = tab.scroll_x.saturating_add(8);
        }
        MouseEventKind::ScrollUp if ev.modifiers.contains(KeyModifiers::CONTROL) => {
            tab.scroll_x = tab.scroll_x.saturating_sub(8);
        }
        MouseEventKind::ScrollDown => {
            let limit = tab.row_count().saturating_sub(1);
            tab.view_row = (tab.view_row + 3).min(limit);
        }
        MouseEventKind::ScrollUp => {
            tab.view_row = tab.view_row.saturating_sub(3);
        }
        _ => {}
    }
    GridAction::None
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Hit {
    Header { slot: usize },
    Cell { row: usize, slot: usize },
}

/// Map viewport-relative coordinates to header or cell. Row 0 is the
/// header line; data rows are offset by the vertical scroll.
fn hit_test(tab: &GridTab, rel_x: u16, rel_y: u16, viewport_width: u16) -> Option<Hit> {
    let visible = visible_columns_for(tab, viewport_width)?;
    let slot = visible.slot_at_x(rel_x)?;
    if rel_y == 0 {
        return Some(Hit::Header { slot });
    }
    let row = tab.view_row + (rel_y - 1) as usize;
    if row >= tab.row_count() {
        return None;
    }
    Some(Hit::Cell { row, slot })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid_render::ColumnWidths;
    use crate::resultset::{CellValue, ColumnMeta, ResultSet};
    use std::time::Duration;

    fn table(rows: usize) -> ResultSet {
        ResultSet::new(
            vec![
                ColumnMeta::new("id", "int"),
                ColumnMeta::new("name", "varchar"),
                ColumnMeta::new("qty", "int"),
            ],
            (0..rows)
                .map(|i| {
                    vec![
                        CellValue::Number(i as f64),
                        CellValue::Text(format!("row {}", i)),
                        CellValue::Number(0.0),
                    ]
                })
                .collect(),
            "select * from t",
        )
    }

    fn grid(rows: usize) -> Grid {
        let mut grid = Grid {
            tabs: Vec::new(),
            tab_idx: 0,
            focus: true,
            max_rows: 10,
            clipboard: None,
            tab_id: 0,
        };
        grid.add_pending_tab("q".into());
        grid.finish_tab(0, Ok(table(rows)), None);
        let tab = grid.current_mut().unwrap();
        tab.widths = Some(ColumnWidths { widths: vec![10, 10, 10] });
        grid
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn key_mod(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    fn mouse(kind: MouseEventKind, column: u16, row: u16) -> MouseEvent {
        MouseEvent { kind, column, row, modifiers: KeyModifiers::NONE }
    }

    const INNER: Rect = Rect { x: 0, y: 0, width: 60, height: 12 };

    #[test]
    fn plain_arrow_reanchors_selection() {
        let mut g = grid(5);
        handle_key(&mut g, key(KeyCode::Down));
        let tab = g.current().unwrap();
        assert_eq!(tab.cursor_row, 1);
        assert_eq!(tab.selection.selected_cell, Some((1, 0)));
        assert!(tab.selection.selection.is_none());
    }

    #[test]
    fn shift_arrow_extends_from_anchor() {
        let mut g = grid(5);
        handle_key(&mut g, key(KeyCode::Down));
        handle_key(&mut g, key_mod(KeyCode::Down, KeyModifiers::SHIFT));
        handle_key(&mut g, key_mod(KeyCode::Right, KeyModifiers::SHIFT));
        let tab = g.current().unwrap();
        let range = tab.selection.selection.unwrap();
        assert_eq!((range.start_row, range.start_col), (1, 0));
        assert_eq!((range.end_row, range.end_col), (3, 1));
    }

    #[test]
    fn ctrl_a_selects_everything() {
        let mut g = grid(4);
        handle_key(&mut g, key_mod(KeyCode::Char('a'), KeyModifiers::CONTROL));
        let range = g.current().unwrap().selection.selection.unwrap();
        assert_eq!((range.start_row, range.end_row), (0, 3));
    }

    #[test]
    fn alt_arrow_reorders_and_requests_persistence() {
        let mut g = grid(3);
        let action = handle_key(&mut g, key_mod(KeyCode::Right, KeyModifiers::ALT));
        assert_eq!(action, GridAction::PersistOrder);
        let tab = g.current().unwrap();
        assert_eq!(tab.order.to_logical(0), 1);
        assert_eq!(tab.order.to_logical(1), 0);
        assert_eq!(tab.cursor_col, 2); // cursor follows the moved column
    }

    #[test]
    fn alt_arrow_at_the_edge_is_a_noop() {
        let mut g = grid(3);
        let action = handle_key(&mut g, key_mod(KeyCode::Left, KeyModifiers::ALT));
        assert_eq!(action, GridAction::None);
        assert!(g.current().unwrap().order.is_identity());
    }

    #[test]
    fn edit_keys_route_to_the_buffer() {
        let mut g = grid(3);
        handle_key(&mut g, key(KeyCode::F(2)));
        assert!(g.current().unwrap().editing.is_some());
        handle_key(&mut g, key(KeyCode::Char('7')));
        // cursor movement must not leave the buffer
        handle_key(&mut g, key(KeyCode::Down));
        assert_eq!(g.current().unwrap().cursor_row, 0);
        handle_key(&mut g, key(KeyCode::Enter));
        let tab = g.current().unwrap();
        assert!(tab.editing.is_none());
        assert!(tab.edits.is_dirty(0, 0));
    }

    #[test]
    fn escape_cancels_an_open_edit() {
        let mut g = grid(3);
        handle_key(&mut g, key(KeyCode::Enter));
        handle_key(&mut g, key(KeyCode::Char('x')));
        handle_key(&mut g, key(KeyCode::Esc));
        let tab = g.current().unwrap();
        assert!(tab.editing.is_none());
        assert!(tab.edits.is_empty());
    }

    #[test]
    fn click_selects_the_hit_cell() {
        let mut g = grid(5);
        // data row 2, second data column (x past index col + first col)
        let ev = mouse(MouseEventKind::Down(MouseButton::Left), 8 + 10 + 2, 3);
        handle_mouse(&mut g, ev, INNER);
        let tab = g.current().unwrap();
        assert_eq!(tab.cursor_row, 2);
        assert_eq!(tab.cursor_col, 2);
        assert_eq!(tab.selection.selected_cell, Some((2, 1)));
    }

    #[test]
    fn quick_second_click_opens_an_edit() {
        let mut g = grid(5);
        let ev = mouse(MouseEventKind::Down(MouseButton::Left), 10, 1);
        handle_mouse(&mut g, ev, INNER);
        assert!(g.current().unwrap().editing.is_none());
        handle_mouse(&mut g, ev, INNER);
        assert!(g.current().unwrap().editing.is_some());
    }

    #[test]
    fn slow_second_click_does_not_open_an_edit() {
        let mut g = grid(5);
        let ev = mouse(MouseEventKind::Down(MouseButton::Left), 10, 1);
        handle_mouse(&mut g, ev, INNER);
        // age the stored click past the window
        let tab = g.current_mut().unwrap();
        let click = tab.last_click.as_mut().unwrap();
        click.at = Instant::now() - DOUBLE_CLICK_WINDOW - Duration::from_millis(50);
        handle_mouse(&mut g, ev, INNER);
        assert!(g.current().unwrap().editing.is_none());
    }

    #[test]
    fn quick_shift_click_extends_instead_of_editing() {
        let mut g = grid(5);
        handle_mouse(&mut g, mouse(MouseEventKind::Down(MouseButton::Left), 10, 1), INNER);
        // second press on the same cell well inside the double-click
        // window, but with shift held
        let shifted = MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            column: 10,
            row: 3,
            modifiers: KeyModifiers::SHIFT,
        };
        handle_mouse(&mut g, shifted, INNER);
        let tab = g.current().unwrap();
        assert!(tab.editing.is_none());
        let range = tab.selection.selection.unwrap();
        assert_eq!((range.start_row, range.start_col), (0, 0));
        assert_eq!((range.end_row, range.end_col), (2, 0));

        // a plain same-cell press right after still must not count the
        // shifted press as the first click of a double-click
        handle_mouse(&mut g, mouse(MouseEventKind::Down(MouseButton::Left), 10, 3), INNER);
        assert!(g.current().unwrap().editing.is_none());
    }

    #[test]
    fn double_click_on_a_different_cell_does_not_count() {
        let mut g = grid(5);
        handle_mouse(&mut g, mouse(MouseEventKind::Down(MouseButton::Left), 10, 1), INNER);
        handle_mouse(&mut g, mouse(MouseEventKind::Down(MouseButton::Left), 10, 2), INNER);
        assert!(g.current().unwrap().editing.is_none());
    }

    #[test]
    fn drag_extends_the_selection() {
        let mut g = grid(5);
        handle_mouse(&mut g, mouse(MouseEventKind::Down(MouseButton::Left), 10, 1), INNER);
        handle_mouse(&mut g, mouse(MouseEventKind::Drag(MouseButton::Left), 20, 3), INNER);
        let tab = g.current().unwrap();
        let range = tab.selection.selection.unwrap();
        assert_eq!((range.start_row, range.start_col), (0, 0));
        assert_eq!((range.end_row, range.end_col), (2, 1));
        handle_mouse(&mut g, mouse(MouseEventKind::Up(MouseButton::Left), 20, 3), INNER);
        assert_eq!(g.current().unwrap().drag, DragState::Idle);
    }

    #[test]
    fn header_drag_reorders_columns() {
        let mut g = grid(5);
        // press on first data header, release on second
        handle_mouse(&mut g, mouse(MouseEventKind::Down(MouseButton::Left), 10, 0), INNER);
        assert_eq!(
            g.current().unwrap().drag,
            DragState::MovingColumn { from_visual: 0 }
        );
        let action =
            handle_mouse(&mut g, mouse(MouseEventKind::Up(MouseButton::Left), 20, 0), INNER);
        assert_eq!(action, GridAction::PersistOrder);
        let tab = g.current().unwrap();
        assert_eq!(tab.order.to_logical(0), 1);
        assert_eq!(tab.order.to_logical(1), 0);
    }

    #[test]
    fn header_release_on_the_same_slot_changes_nothing() {
        let mut g = grid(5);
        handle_mouse(&mut g, mouse(MouseEventKind::Down(MouseButton::Left), 10, 0), INNER);
        let action =
            handle_mouse(&mut g, mouse(MouseEventKind::Up(MouseButton::Left), 12, 0), INNER);
        assert_eq!(action, GridAction::None);
        assert!(g.current().unwrap().order.is_identity());
    }

    #[test]
    fn wheel_scrolls_rows_and_hover_tracks_moves() {
        let mut g = grid(50);
        handle_mouse(&mut g, mouse(MouseEventKind::ScrollDown, 10, 5), INNER);
        assert_eq!(g.current().unwrap().view_row, 3);
        handle_mouse(&mut g, mouse(MouseEventKind::ScrollUp, 10, 5), INNER);
        assert_eq!(g.current().unwrap().view_row, 0);

        handle_mouse(&mut g, mouse(MouseEventKind::Moved, 10, 2), INNER);
        assert_eq!(g.current().unwrap().hover_row, Some(1));
        handle_mouse(&mut g, mouse(MouseEventKind::Moved, 200, 2), INNER);
        assert_eq!(g.current().unwrap().hover_row, None);
    }

    #[test]
    fn tab_cycling_wraps() {
        let mut g = grid(2);
        g.add_pending_tab("q2".into());
        g.finish_tab(1, Ok(table(1)), None);
        g.tab_idx = 1;
        handle_key(&mut g, key(KeyCode::Char(']')));
        assert_eq!(g.tab_idx, 0);
        handle_key(&mut g, key(KeyCode::Char('[')));
        assert_eq!(g.tab_idx, 1);
    }
}
