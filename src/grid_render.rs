//! Virtualized rendering for the results grid.
//!
//! Only the rows intersecting the viewport are materialized each frame, and
//! a per-row fingerprint cache skips re-encoding rows whose inputs did not
//! change. Scrolling, hovering, or typing into one cell must not rebuild
//! every other visible row. Column widths are sampled once per result set;
//! later resizes only redo layout, never the per-cell width scan.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use tui::backend::Backend;
use tui::layout::Rect;
use tui::text::{Span, Spans};
use tui::widgets::{Block, Borders, Paragraph, Tabs};
use tui::Frame;

use crate::column_order::ColumnOrder;
use crate::grid::{DragState, Grid, GridContent, GridTab, ScrollDirection};
use crate::resultset::{CellValue, ColumnMeta, ResultSet};
use crate::theme::style;

/// Column width limits (terminal cells).
pub const MIN_COL_WIDTH: u16 = 8;
pub const MAX_COL_WIDTH: u16 = 50;
pub const INDEX_COL_WIDTH: u16 = 8;
/// How many leading rows feed the width heuristic.
pub const WIDTH_SAMPLE_ROWS: usize = 100;

/// Per-logical-column display widths, computed once per result set.
#[derive(Clone, Debug)]
pub struct ColumnWidths {
    /// Indexed by logical column.
    pub widths: Vec<u16>,
}

impl ColumnWidths {
    /// Header width vs sampled cell width, clamped. Samples at most the
    /// first `WIDTH_SAMPLE_ROWS` rows so a 500k-row result costs the same
    /// as a 100-row one.
    pub fn calculate(columns: &[ColumnMeta], rows: &[Vec<CellValue>]) -> Self {
        let mut widths = Vec::with_capacity(columns.len());
        for (col_idx, meta) in columns.iter().enumerate() {
            let mut max_width = meta.name.chars().count() as u16 + 2;
            for row in rows.iter().take(WIDTH_SAMPLE_ROWS) {
                if let Some(cell) = row.get(col_idx) {
                    let display_len = cell
                        .display_text()
                        .chars()
                        .take(MAX_COL_WIDTH as usize)
                        .count();
                    max_width = max_width.max(display_len as u16 + 2);
                }
            }
            widths.push(max_width.clamp(MIN_COL_WIDTH, MAX_COL_WIDTH));
        }
        Self { widths }
    }

    fn width_of_slot(&self, order: &ColumnOrder, slot: usize) -> u16 {
        if slot == 0 {
            INDEX_COL_WIDTH
        } else {
            self.widths[order.to_logical(slot - 1)]
        }
    }

    /// Visible render slots at a fixed horizontal scroll. Slot 0 (the row
    /// index) is always pinned; data slots 1..=n walk the VISUAL order.
    pub fn visible_at_scroll(
        &self,
        order: &ColumnOrder,
        scroll_x: u16,
        viewport_width: u16,
    ) -> VisibleColumns {
        let mut visible = VisibleColumns { columns: Vec::new() };
        visible.columns.push(VisibleColumn {
            slot: 0,
            x: 0,
            visible_width: INDEX_COL_WIDTH.min(viewport_width),
            full_width: INDEX_COL_WIDTH,
            skip_chars: 0,
        });
        if viewport_width <= INDEX_COL_WIDTH {
            return visible;
        }
        let data_viewport = viewport_width - INDEX_COL_WIDTH;

        let mut current_x = 0u16;
        for slot in 1..=order.len() {
            let col_width = self.width_of_slot(order, slot);
            let col_start = current_x;
            let col_end = current_x + col_width;
            current_x = col_end;

            if col_end <= scroll_x {
                continue;
            }
            if col_start >= scroll_x + data_viewport {
                break;
            }

            let visible_start = col_start.max(scroll_x);
            let visible_end = col_end.min(scroll_x + data_viewport);
            visible.columns.push(VisibleColumn {
                slot,
                x: INDEX_COL_WIDTH + visible_start - scroll_x,
                visible_width: visible_end - visible_start,
                full_width: col_width,
                skip_chars: visible_start - col_start,
            });
        }
        visible
    }

    /// Minimal scroll change that brings the cursor slot fully on screen.
    pub fn ensure_cursor_visible(
        &self,
        order: &ColumnOrder,
        cursor_slot: usize,
        current_scroll: u16,
        viewport_width: u16,
    ) -> u16 {
        if cursor_slot == 0 || order.is_empty() || viewport_width <= INDEX_COL_WIDTH {
            return 0;
        }
        let data_viewport = viewport_width - INDEX_COL_WIDTH;
        let mut cursor_start = 0u16;
        for slot in 1..cursor_slot.min(order.len() + 1) {
            cursor_start += self.width_of_slot(order, slot);
        }
        let cursor_end = cursor_start + self.width_of_slot(order, cursor_slot.min(order.len()));

        if cursor_start >= current_scroll && cursor_end <= current_scroll + data_viewport {
            current_scroll
        } else if cursor_start < current_scroll {
            cursor_start
        } else {
            cursor_end.saturating_sub(data_viewport)
        }
    }

    pub fn total_width(&self) -> u16 {
        INDEX_COL_WIDTH + self.widths.iter().sum::<u16>()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VisibleColumn {
    /// 0 = index column, otherwise visual position + 1.
    pub slot: usize,
    pub x: u16,
    pub visible_width: u16,
    pub full_width: u16,
    /// Leading characters clipped off a partially scrolled column.
    pub skip_chars: u16,
}

#[derive(Clone, Debug, Default)]
pub struct VisibleColumns {
    pub columns: Vec<VisibleColumn>,
}

impl VisibleColumns {
    /// Hit-test a viewport-relative x coordinate to a render slot.
    pub fn slot_at_x(&self, rel_x: u16) -> Option<usize> {
        self.columns
            .iter()
            .find(|c| rel_x >= c.x && rel_x < c.x + c.visible_width)
            .map(|c| c.slot)
    }
}

/// Everything that can change how one specific row paints. Two equal
/// fingerprints mean the cached line is still valid.
pub fn row_fingerprint(tab: &GridTab, row: usize, scroll_x: u16, viewport_width: u16) -> u64 {
    let mut h = DefaultHasher::new();
    tab.data_epoch.hash(&mut h);
    tab.layout_epoch.hash(&mut h);
    scroll_x.hash(&mut h);
    viewport_width.hash(&mut h);
    row.hash(&mut h);

    (tab.hover_row == Some(row)).hash(&mut h);

    if tab.cursor_row == row {
        tab.cursor_col.hash(&mut h);
    }
    if let Some((r, c)) = tab.selection.selected_cell {
        if r == row {
            c.hash(&mut h);
        }
    }
    if let Some(range) = &tab.selection.selection {
        let (r0, r1) = range.row_span();
        if row >= r0 && row <= r1 {
            range.visual_col_span(&tab.order).hash(&mut h);
        }
    }
    if let Some(mark) = &tab.copied {
        if mark.is_active() {
            let (r0, r1) = mark.range.row_span();
            if row >= r0 && row <= r1 {
                mark.range.visual_col_span(&tab.order).hash(&mut h);
            }
        }
    }
    if let Some(editing) = &tab.editing {
        if editing.row == row {
            editing.col.hash(&mut h);
            editing.buffer.hash(&mut h);
            editing.cursor.hash(&mut h);
        }
    }
    // sorted by column: the map's iteration order must not leak into the
    // fingerprint, or edits on other rows could rehash it and flip ours
    let mut row_edits: Vec<_> = tab.edits.iter().filter(|e| e.row == row).collect();
    row_edits.sort_by_key(|e| e.col);
    for edit in row_edits {
        edit.col.hash(&mut h);
        edit.new_value.plain_text().hash(&mut h);
    }
    h.finish()
}

/// Cache of encoded row lines keyed by absolute row index.
#[derive(Debug, Default)]
pub struct RowCache {
    entries: HashMap<usize, (u64, Spans<'static>)>,
    pub rebuilds: u64,
}

impl RowCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_build(
        &mut self,
        row: usize,
        fingerprint: u64,
        build: impl FnOnce() -> Spans<'static>,
    ) -> Spans<'static> {
        match self.entries.get(&row) {
            Some((fp, spans)) if *fp == fingerprint => spans.clone(),
            _ => {
                self.rebuilds += 1;
                let spans = build();
                self.entries.insert(row, (fingerprint, spans.clone()));
                spans
            }
        }
    }
}

/// Visible columns for the current tab state; None until widths exist.
pub fn visible_columns_for(tab: &GridTab, viewport_width: u16) -> Option<VisibleColumns> {
    tab.widths
        .as_ref()
        .map(|w| w.visible_at_scroll(&tab.order, tab.scroll_x, viewport_width))
}

fn pad_cell(text: &str, width: u16, skip_chars: u16) -> String {
    let width = width as usize;
    let skipped: String = text.chars().skip(skip_chars as usize).collect();
    let shown: String = if skipped.chars().count() > width {
        let mut s: String = skipped.chars().take(width.saturating_sub(1)).collect();
        s.push('…');
        s
    } else {
        skipped
    };
    format!("{:width$}", shown, width = width)
}

fn grid_block(label: String, focused: bool) -> Block<'static> {
    Block::default()
        .title(Span::styled(label, style::grid_border_focus()))
        .borders(Borders::ALL)
        .border_style(if focused {
            style::grid_border_focus()
        } else {
            style::grid_border()
        })
}

fn border_label(tab: &GridTab) -> String {
    if tab.running {
        format!("{} (running)", tab.context)
    } else if let Some(elapsed) = tab.elapsed {
        format!("{} ({}.{:03}s)", tab.context, elapsed.as_secs(), elapsed.subsec_millis())
    } else {
        tab.context.clone()
    }
}

pub fn render<B: Backend>(grid: &mut Grid, f: &mut Frame<B>, area: Rect, total_queries: usize) {
    // tab strip
    let mut titles: Vec<Spans> = Vec::new();
    for (i, tab) in grid.tabs.iter().enumerate() {
        let name = format!("{}/{}", i + 1, total_queries.max(grid.tabs.len()));
        let label = match &tab.content {
            GridContent::Error { .. } => format!("Error {}", name),
            _ => name,
        };
        if i == grid.tab_idx {
            titles.push(Spans::from(Span::styled(format!("[{}]", label), style::tab_active())));
        } else {
            titles.push(Spans::from(Span::raw(format!(" {} ", label))));
        }
    }
    f.render_widget(
        Tabs::new(titles).select(grid.tab_idx),
        Rect { x: area.x, y: area.y, width: area.width, height: 1 },
    );

    let body = Rect {
        x: area.x,
        y: area.y + 1,
        width: area.width,
        height: area.height.saturating_sub(1),
    };
    if body.height < 3 || body.width < 4 {
        return;
    }
    let focused = grid.focus;
    // inner height minus the header line
    grid.max_rows = (body.height - 2).saturating_sub(1) as usize;
    let max_rows = grid.max_rows;

    let tab = match grid.tabs.get_mut(grid.tab_idx) {
        Some(t) => t,
        None => {
            let p = Paragraph::new("No results").block(grid_block("Results".into(), focused));
            f.render_widget(p, body);
            return;
        }
    };
    let label = border_label(tab);

    match &tab.content {
        GridContent::Pending => {
            let p = Paragraph::new("Running…").block(grid_block(label, focused));
            f.render_widget(p, body);
            return;
        }
        GridContent::Info { message } => {
            let p = Paragraph::new(message.clone())
                .style(style::info())
                .block(grid_block(label, focused));
            f.render_widget(p, body);
            return;
        }
        GridContent::Error { message } => {
            let p = Paragraph::new(message.clone())
                .style(style::error())
                .block(grid_block(label, focused));
            f.render_widget(p, body);
            return;
        }
        GridContent::Table { .. } => {}
    }

    let row_count = tab.row_count();
    if tab.column_count() == 0 || row_count == 0 {
        let p = Paragraph::new("No rows returned (this statement did not produce a table)")
            .style(style::info())
            .block(grid_block(label, focused));
        f.render_widget(p, body);
        return;
    }

    // widths: sampled once per result set
    if tab.widths.is_none() {
        if let Some(result) = tab.result() {
            let widths = ColumnWidths::calculate(&result.columns, &result.rows);
            tab.widths = Some(widths);
            tab.layout_epoch += 1;
        }
    }
    let widths = match tab.widths.clone() {
        Some(w) => w,
        None => return,
    };

    f.render_widget(grid_block(label, focused), body);
    let inner = Rect {
        x: body.x + 1,
        y: body.y + 1,
        width: body.width - 2,
        height: body.height - 2,
    };
    let viewport_width = inner.width;

    tab.view_row = tab.view_row.min(row_count.saturating_sub(1));

    // horizontal scroll upkeep
    if tab.scroll_direction != ScrollDirection::None {
        let new_scroll =
            widths.ensure_cursor_visible(&tab.order, tab.cursor_col, tab.scroll_x, viewport_width);
        if new_scroll != tab.scroll_x {
            tab.scroll_x = new_scroll;
            tab.layout_epoch += 1;
        }
        tab.scroll_direction = ScrollDirection::None;
    }
    let visible = widths.visible_at_scroll(&tab.order, tab.scroll_x, viewport_width);

    // header row
    if let Some(result) = tab.result() {
        let mut header_spans = Vec::with_capacity(visible.columns.len());
        for col in &visible.columns {
            if col.slot == 0 {
                header_spans.push(Span::styled(
                    pad_cell("#", col.visible_width, 0),
                    style::header_row(),
                ));
                continue;
            }
            let logical = tab.order.to_logical(col.slot - 1);
            let mut s = style::header_row();
            if tab.cursor_col == col.slot {
                s = s.patch(style::header_cursor());
            }
            if let DragState::MovingColumn { from_visual } = tab.drag {
                if from_visual + 1 == col.slot {
                    s = s.patch(style::header_moving());
                }
            }
            header_spans.push(Span::styled(
                pad_cell(&result.columns[logical].name, col.visible_width, col.skip_chars),
                s,
            ));
        }
        f.render_widget(
            Paragraph::new(Spans::from(header_spans)),
            Rect { x: inner.x, y: inner.y, width: inner.width, height: 1 },
        );
    }

    // data rows through the fingerprint cache; the cache is detached from
    // the tab for the duration so the builder can borrow the tab shared
    let mut cache = std::mem::take(&mut tab.row_cache);
    let first = tab.view_row;
    let last = (first + max_rows).min(row_count);
    for (offset, row_idx) in (first..last).enumerate() {
        let fp = row_fingerprint(tab, row_idx, tab.scroll_x, viewport_width);
        let spans = cache.get_or_build(row_idx, fp, || build_row(tab, row_idx, &visible));
        f.render_widget(
            Paragraph::new(spans),
            Rect {
                x: inner.x,
                y: inner.y + 1 + offset as u16,
                width: inner.width,
                height: 1,
            },
        );
    }
    tab.row_cache = cache;
}

/// Encode one row into styled spans. Only runs when the row's fingerprint
/// changed since the last frame.
fn build_row(tab: &GridTab, row_idx: usize, visible: &VisibleColumns) -> Spans<'static> {
    let result = match tab.result() {
        Some(r) => r,
        None => return Spans::default(),
    };
    let mut spans = Vec::with_capacity(visible.columns.len());
    for col in &visible.columns {
        spans.push(build_cell(tab, result, row_idx, col));
    }
    Spans::from(spans)
}

fn build_cell(
    tab: &GridTab,
    result: &ResultSet,
    row_idx: usize,
    col: &VisibleColumn,
) -> Span<'static> {
    if col.slot == 0 {
        let mut s = style::index_column();
        if tab.hover_row == Some(row_idx) || tab.cursor_row == row_idx {
            s = s.patch(style::header_cursor());
        }
        return Span::styled(pad_cell(&(row_idx + 1).to_string(), col.visible_width, 0), s);
    }

    let logical = tab.order.to_logical(col.slot - 1);
    let editing_here = tab
        .editing
        .as_ref()
        .filter(|e| e.row == row_idx && e.col == logical);

    let (text, value_is_null) = match editing_here {
        Some(editing) => {
            let mut buf = editing.buffer.clone();
            let byte = buf
                .char_indices()
                .nth(editing.cursor)
                .map(|(b, _)| b)
                .unwrap_or(buf.len());
            buf.insert(byte, '▌');
            (buf, false)
        }
        None => {
            let original = result.cell(row_idx, logical).unwrap_or(&CellValue::Null);
            let value = tab.edits.effective(row_idx, logical, original);
            (value.display_text(), value.is_null())
        }
    };

    let mut s = if value_is_null { style::null_value() } else { style::cell() };
    if tab.selection.contains(row_idx, logical, &tab.order) {
        s = style::selection();
    }
    if tab
        .copied
        .as_ref()
        .map(|m| m.contains(row_idx, logical, &tab.order))
        .unwrap_or(false)
    {
        s = style::copied_cell();
    }
    if tab.edits.is_dirty(row_idx, logical) {
        s = s.patch(style::dirty_cell());
    }
    if editing_here.is_some() {
        s = style::editing_cell();
    } else if tab.cursor_row == row_idx && tab.cursor_col == col.slot {
        s = style::cursor_cell();
    }

    Span::styled(pad_cell(&text, col.visible_width, col.skip_chars), s)
}
