//! Results-grid state: one `Grid` pane holding a tab per statement result,
//! each tab owning its cursor, selection, column order, pending edits, and
//! render caches. Event interpretation lives in `grid_interact`, drawing in
//! `grid_render`.

use std::time::{Duration, Instant};

use copypasta::ClipboardContext;

use crate::column_order::ColumnOrder;
use crate::edits::{EditTracker, EditingCell};
use crate::export::{self, CopiedMark, CopyFormat};
use crate::grid_render::{ColumnWidths, RowCache};
use crate::resultset::{CellValue, ResultSet};
use crate::selection::{SelectionRange, SelectionState};
use crate::sqlgen::{generate_update_queries, SaveError};

/// Two clicks on the same cell within this window count as a double-click.
pub const DOUBLE_CLICK_WINDOW: Duration = Duration::from_millis(300);

#[derive(Debug)]
pub enum GridContent {
    Table { result: ResultSet },
    Error { message: String },
    Info { message: String },
    Pending,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScrollDirection {
    None,
    Left,
    Right,
}

/// Where a mouse gesture currently stands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DragState {
    Idle,
    /// Button went down on a data cell (logical coords); entering other
    /// cells extends the selection until the button is released.
    Selecting { from_row: usize, from_col: usize },
    /// Button went down on a header cell; releasing over another header
    /// reorders the column.
    MovingColumn { from_visual: usize },
}

/// Timestamp + coordinates of the previous mouse-down, held per grid tab so
/// double-click detection survives re-renders without becoming cross-grid
/// global state.
#[derive(Clone, Copy, Debug)]
pub struct LastClick {
    pub at: Instant,
    pub row: usize,
    pub col: usize,
}

/// What an input handler wants the workspace to do.
#[derive(Debug, PartialEq, Eq)]
pub enum GridAction {
    None,
    /// Show the save confirmation overlay with exactly these statements.
    ConfirmSave(Vec<String>),
    /// The current tab's column order changed; persist it.
    PersistOrder,
    Status(String),
}

pub struct GridTab {
    pub content: GridContent,
    /// Shortened statement text shown on the border.
    pub context: String,
    pub result_index: usize,

    /// Cursor column as a render slot: 0 is the row-index column, data
    /// columns occupy visual positions 1..=column_count.
    pub cursor_row: usize,
    pub cursor_col: usize,
    pub view_row: usize,
    pub scroll_x: u16,
    pub scroll_direction: ScrollDirection,

    pub order: ColumnOrder,
    pub selection: SelectionState,
    pub edits: EditTracker,
    pub editing: Option<EditingCell>,
    pub copied: Option<CopiedMark>,
    pub hover_row: Option<usize>,
    pub drag: DragState,
    pub last_click: Option<LastClick>,

    pub widths: Option<ColumnWidths>,
    pub row_cache: RowCache,
    /// Bumped when the underlying ResultSet identity changes (new result,
    /// post-save patch) — not on per-cell edits, which fingerprint per row.
    pub data_epoch: u64,
    /// Bumped on column order or width changes.
    pub layout_epoch: u64,

    pub running: bool,
    pub run_started: Option<Instant>,
    pub elapsed: Option<Duration>,
}

impl GridTab {
    pub fn new_pending(context: String, result_index: usize) -> Self {
        Self {
            content: GridContent::Pending,
            context,
            result_index,
            cursor_row: 0,
            cursor_col: 1,
            view_row: 0,
            scroll_x: 0,
            scroll_direction: ScrollDirection::None,
            order: ColumnOrder::identity(0),
            selection: SelectionState::default(),
            edits: EditTracker::new(),
            editing: None,
            copied: None,
            hover_row: None,
            drag: DragState::Idle,
            last_click: None,
            widths: None,
            row_cache: RowCache::new(),
            data_epoch: 0,
            layout_epoch: 0,
            running: true,
            run_started: Some(Instant::now()),
            elapsed: None,
        }
    }

    pub fn result(&self) -> Option<&ResultSet> {
        match &self.content {
            GridContent::Table { result } => Some(result),
            _ => None,
        }
    }

    pub fn result_mut(&mut self) -> Option<&mut ResultSet> {
        match &mut self.content {
            GridContent::Table { result } => Some(result),
            _ => None,
        }
    }

    pub fn row_count(&self) -> usize {
        self.result().map(|r| r.row_count()).unwrap_or(0)
    }

    pub fn column_count(&self) -> usize {
        self.result().map(|r| r.column_count()).unwrap_or(0)
    }

    /// Logical column under the cursor, if the cursor is on a data column.
    pub fn cursor_logical_col(&self) -> Option<usize> {
        if self.cursor_col == 0 || self.cursor_col > self.order.len() {
            return None;
        }
        Some(self.order.to_logical(self.cursor_col - 1))
    }

    /// Value the grid shows at (row, logical col): pending edit read-through.
    pub fn effective_value(&self, row: usize, col: usize) -> Option<CellValue> {
        let result = self.result()?;
        let original = result.cell(row, col)?;
        Some(self.edits.effective(row, col, original).clone())
    }

    /// Begin editing the cell under the cursor. Refused (read-only
    /// degradation) when there is nothing editable there.
    pub fn start_edit(&mut self) -> bool {
        if self.column_count() == 0 || self.row_count() == 0 {
            return false;
        }
        let row = self.cursor_row;
        let col = match self.cursor_logical_col() {
            Some(c) => c,
            None => return false,
        };
        let initial = match self.effective_value(row, col) {
            Some(v) => v.plain_text(),
            None => return false,
        };
        self.editing = Some(EditingCell::new(row, col, initial));
        true
    }

    pub fn commit_edit(&mut self) {
        let editing = match self.editing.take() {
            Some(e) => e,
            None => return,
        };
        let original = match self.result().and_then(|r| r.cell(editing.row, editing.col)) {
            Some(v) => v.clone(),
            None => return,
        };
        self.edits.commit(editing.row, editing.col, &original, &editing.buffer);
    }

    pub fn cancel_edit(&mut self) {
        self.editing = None;
    }

    pub fn discard_edits(&mut self) {
        self.editing = None;
        self.edits.discard_all();
    }

    /// Generate the UPDATE batch for the pending edits of this tab.
    pub fn prepare_save(&self) -> Result<Vec<String>, SaveError> {
        match self.result() {
            Some(result) => generate_update_queries(result, &self.edits),
            None => Err(SaveError::NothingToSave),
        }
    }

    /// After every statement of a save batch succeeded: patch the stored
    /// rows with the new values and drop the edit map, so the grid stops
    /// showing edited styling. Partial failures never reach this.
    pub fn apply_saved_edits(&mut self) {
        let patches: Vec<(usize, usize, CellValue)> = self
            .edits
            .iter()
            .map(|e| (e.row, e.col, e.new_value.clone()))
            .collect();
        if let Some(result) = self.result_mut() {
            for (row, col, value) in patches {
                result.patch_cell(row, col, value);
            }
        }
        self.edits.discard_all();
        self.editing = None;
        self.data_epoch += 1;
    }

    /// Move a column between visual positions and invalidate layout.
    pub fn reorder_column(&mut self, from_visual: usize, to_visual: usize) {
        self.order.reorder(from_visual, to_visual);
        self.layout_epoch += 1;
    }

    pub fn reset_column_order(&mut self) {
        self.order = ColumnOrder::identity(self.column_count());
        self.layout_epoch += 1;
    }

    /// The selection to encode for a copy: the multi-cell range when one
    /// exists, else a 1×1 range at the selected cell, else the cursor cell.
    pub fn copy_range(&self) -> Option<SelectionRange> {
        if let Some(range) = self.selection.selection {
            return Some(range);
        }
        if let Some((row, col)) = self.selection.selected_cell {
            return Some(SelectionRange::cell(row, col));
        }
        let col = self.cursor_logical_col()?;
        if self.cursor_row < self.row_count() {
            Some(SelectionRange::cell(self.cursor_row, col))
        } else {
            None
        }
    }

    /// Keep cursor and viewport inside the data after cursor movement.
    pub fn nudge_viewport(&mut self, max_view_rows: usize) {
        let row_count = self.row_count();
        let col_slots = self.column_count(); // slots 1..=col_slots are data
        self.cursor_row = self.cursor_row.min(row_count.saturating_sub(1));
        self.cursor_col = self.cursor_col.min(col_slots);
        if self.cursor_row < self.view_row {
            self.view_row = self.cursor_row;
        }
        if max_view_rows > 0 && self.cursor_row >= self.view_row + max_view_rows {
            self.view_row = self.cursor_row + 1 - max_view_rows;
        }
    }
}

pub struct Grid {
    pub tabs: Vec<GridTab>,
    pub tab_idx: usize,
    pub focus: bool,
    /// Rows the viewport can show; updated by the renderer each frame.
    pub max_rows: usize,
    /// None when no system clipboard is reachable (headless session);
    /// copies then only set the visual marker.
    pub clipboard: Option<ClipboardContext>,
    pub tab_id: usize,
}

impl Grid {
    pub fn new(tab_id: usize) -> Self {
        let clipboard = match ClipboardContext::new() {
            Ok(ctx) => Some(ctx),
            Err(e) => {
                log::warn!("no system clipboard available: {}", e);
                None
            }
        };
        Self {
            tabs: Vec::new(),
            tab_idx: 0,
            focus: false,
            max_rows: 13,
            clipboard,
            tab_id,
        }
    }

    pub fn clear(&mut self) {
        self.tabs.clear();
        self.tab_idx = 0;
    }

    pub fn add_pending_tab(&mut self, context: String) {
        let idx = self.tabs.len();
        self.tabs.push(GridTab::new_pending(context, idx));
        self.tab_idx = idx;
    }

    /// Fill a pending tab once its statement finished. `stored_order` is
    /// the persisted column order for this slot, already validated against
    /// the column count by the store.
    pub fn finish_tab(
        &mut self,
        tab_idx: usize,
        outcome: Result<ResultSet, String>,
        stored_order: Option<ColumnOrder>,
    ) {
        let tab = match self.tabs.get_mut(tab_idx) {
            Some(t) => t,
            None => return,
        };
        tab.elapsed = tab.run_started.map(|s| s.elapsed());
        tab.running = false;
        tab.run_started = None;
        tab.widths = None;
        tab.row_cache = RowCache::new();
        tab.data_epoch += 1;
        tab.layout_epoch += 1;
        tab.selection.clear();
        tab.edits.discard_all();
        tab.editing = None;
        tab.copied = None;
        tab.cursor_row = 0;
        tab.cursor_col = 1;
        tab.view_row = 0;
        tab.scroll_x = 0;
        match outcome {
            Ok(result) => {
                let count = result.column_count();
                tab.order = stored_order.unwrap_or_else(|| ColumnOrder::identity(count));
                tab.order.sync_with_count(count);
                tab.content = GridContent::Table { result };
            }
            Err(message) => {
                tab.order = ColumnOrder::identity(0);
                tab.content = GridContent::Error { message };
            }
        }
    }

    pub fn current(&self) -> Option<&GridTab> {
        self.tabs.get(self.tab_idx)
    }

    pub fn current_mut(&mut self) -> Option<&mut GridTab> {
        self.tabs.get_mut(self.tab_idx)
    }

    /// Encode the active selection and hand it to the clipboard. Clipboard
    /// failure is logged, never fatal; the copied marker only appears on
    /// success.
    pub fn copy_current(&mut self, format: CopyFormat) -> GridAction {
        let tab = match self.tabs.get_mut(self.tab_idx) {
            Some(t) => t,
            None => return GridAction::None,
        };
        let (result, range) = match (tab.result(), tab.copy_range()) {
            (Some(r), Some(range)) => (r, range),
            _ => return GridAction::None,
        };
        let text = export::encode_selection(result, &tab.order, &tab.edits, &range, format);
        if text.is_empty() {
            return GridAction::None;
        }
        let ok = match self.clipboard.as_mut() {
            Some(ctx) => export::copy_to_clipboard(ctx, text),
            None => false,
        };
        if ok {
            tab.copied = Some(CopiedMark::new(range));
            GridAction::None
        } else {
            GridAction::Status("copy failed: clipboard unavailable".to_string())
        }
    }

    /// Ctrl-S entry point: either the confirmation payload or the precise
    /// precondition that blocks saving.
    pub fn request_save(&self) -> GridAction {
        match self.current() {
            Some(tab) => match tab.prepare_save() {
                Ok(statements) => GridAction::ConfirmSave(statements),
                Err(e) => GridAction::Status(e.to_string()),
            },
            None => GridAction::None,
        }
    }
}
