//! The workspace: pane composition, focus routing, and the glue between
//! grid actions, overlays, and the query bridge.

use std::path::PathBuf;
use std::sync::mpsc::{Receiver, Sender, TryRecvError};
use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent};
use tui::backend::Backend;
use tui::layout::{Constraint, Direction, Layout, Rect};
use tui::text::{Span, Spans};
use tui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use tui::Terminal;

use crate::command_palette::{Command, CommandPalette, PaletteAction};
use crate::executor::{start_bridge, BridgeRequest, BridgeResponse, QueryExecutor};
use crate::export::CopyFormat;
use crate::grid::{Grid, GridAction};
use crate::grid_interact;
use crate::grid_render;
use crate::preview::{render_preview, PreviewFormat};
use crate::query_input::QueryInput;
use crate::schema_tree::{SchemaTree, TreeAction, CATALOG_QUERY};
use crate::theme::style;
use crate::uistate::UiStateStore;

const STATUS_TTL: Duration = Duration::from_secs(5);
const DEFAULT_PREVIEW_WIDTH: u16 = 40;
const TREE_WIDTH: u16 = 28;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Focus {
    Input,
    Grid,
    Tree,
}

pub struct Workspace {
    pub input: QueryInput,
    pub tree: SchemaTree,
    pub grid: Grid,
    pub palette: CommandPalette,
    pub uistate: UiStateStore,
    pub focus: Focus,

    pub preview_open: bool,
    pub preview_format: PreviewFormat,
    pub preview_width: u16,

    /// Statements awaiting the user's go-ahead before they run.
    pub save_confirm: Option<Vec<String>>,
    pub status_message: Option<String>,
    pub status_time: Option<Instant>,
    pub running: bool,

    bridge_tx: Sender<BridgeRequest>,
    bridge_rx: Receiver<BridgeResponse>,

    /// Inner grid area from the last render, for mouse hit-testing.
    grid_inner: Rect,
    grid_area: Rect,
}

impl Workspace {
    pub fn new(
        executor: Box<dyn QueryExecutor>,
        database: String,
        data_dir: Option<PathBuf>,
    ) -> Self {
        let (bridge_tx, bridge_rx) = start_bridge(executor, database);
        let uistate = match data_dir.clone() {
            Some(dir) => UiStateStore::open(dir),
            None => UiStateStore::ephemeral(),
        };
        let preview_width = uistate.preview_width().unwrap_or(DEFAULT_PREVIEW_WIDTH);
        Self {
            input: QueryInput::new(),
            tree: SchemaTree::new(data_dir),
            grid: Grid::new(0),
            palette: CommandPalette::new(),
            uistate,
            focus: Focus::Input,
            preview_open: false,
            preview_format: PreviewFormat::Auto,
            preview_width,
            save_confirm: None,
            status_message: None,
            status_time: None,
            running: false,
            bridge_tx,
            bridge_rx,
            grid_inner: Rect::default(),
            grid_area: Rect::default(),
        }
    }

    pub fn set_status(&mut self, msg: impl Into<String>) {
        self.status_message = Some(msg.into());
        self.status_time = Some(Instant::now());
    }

    pub fn run_queries(&mut self) {
        let statements = self.input.statements();
        if statements.is_empty() {
            self.set_status("nothing to run");
            return;
        }
        self.grid.clear();
        for (_, context) in &statements {
            self.grid.add_pending_tab(context.clone());
        }
        self.grid.tab_idx = 0;
        self.running = true;
        self.focus = Focus::Grid;
        if self.bridge_tx.send(BridgeRequest::RunQueries(statements)).is_err() {
            self.set_status("query backend is gone");
            self.running = false;
        }
    }

    pub fn refresh_schema(&mut self) {
        if self
            .bridge_tx
            .send(BridgeRequest::RunSchemaQuery(CATALOG_QUERY.to_string()))
            .is_err()
        {
            self.set_status("query backend is gone");
        } else {
            self.set_status("refreshing schema…");
        }
    }

    /// Drain bridge responses. Returns true when anything changed.
    pub fn poll_bridge(&mut self) -> bool {
        let mut changed = false;
        loop {
            match self.bridge_rx.try_recv() {
                Ok(BridgeResponse::QueryStarted { .. }) => changed = true,
                Ok(BridgeResponse::QueryFinished { query_idx, result, .. }) => {
                    let stored = result.as_ref().ok().and_then(|r| {
                        self.uistate.column_order(
                            self.grid.tab_id,
                            query_idx,
                            r.column_count(),
                        )
                    });
                    self.grid.finish_tab(query_idx, result, stored);
                    self.running = self.grid.tabs.iter().any(|t| t.running);
                    changed = true;
                }
                Ok(BridgeResponse::UpdatesFinished { tab_idx, completed, total, error }) => {
                    match error {
                        None => {
                            if let Some(tab) = self.grid.tabs.get_mut(tab_idx) {
                                tab.apply_saved_edits();
                            }
                            self.set_status(format!(
                                "saved {} change{}",
                                total,
                                if total == 1 { "" } else { "s" }
                            ));
                        }
                        Some(e) => {
                            // edits stay pending; the committed prefix is
                            // reported so the user knows what already ran
                            self.set_status(format!(
                                "save stopped at statement {}/{}: {}",
                                completed + 1,
                                total,
                                e
                            ));
                        }
                    }
                    changed = true;
                }
                Ok(BridgeResponse::SchemaFinished(result)) => {
                    match result {
                        Ok(r) => {
                            self.tree.update_from_result(&r);
                            self.set_status("schema refreshed");
                        }
                        Err(e) => self.set_status(format!("schema refresh failed: {}", e)),
                    }
                    changed = true;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        changed
    }

    fn act_on(&mut self, action: GridAction) {
        match action {
            GridAction::None => {}
            GridAction::ConfirmSave(statements) => self.save_confirm = Some(statements),
            GridAction::PersistOrder => {
                if let Some(tab) = self.grid.current() {
                    self.uistate.set_column_order(
                        self.grid.tab_id,
                        tab.result_index,
                        &tab.order,
                    );
                }
            }
            GridAction::Status(msg) => self.set_status(msg),
        }
    }

    fn confirm_save(&mut self) {
        let statements = match self.save_confirm.take() {
            Some(s) => s,
            None => return,
        };
        let tab_idx = self.grid.tab_idx;
        let count = statements.len();
        if self
            .bridge_tx
            .send(BridgeRequest::RunUpdates { tab_idx, statements })
            .is_err()
        {
            self.set_status("query backend is gone");
        } else {
            self.set_status(format!(
                "running {} update statement{}…",
                count,
                if count == 1 { "" } else { "s" }
            ));
        }
    }

    fn execute_command(&mut self, cmd: Command) -> bool {
        match cmd {
            Command::RunQueries => self.run_queries(),
            Command::SaveEdits => {
                let action = self.grid.request_save();
                self.act_on(action);
            }
            Command::DiscardEdits => {
                if let Some(tab) = self.grid.current_mut() {
                    let n = tab.edits.len();
                    tab.discard_edits();
                    self.set_status(format!(
                        "discarded {} pending edit{}",
                        n,
                        if n == 1 { "" } else { "s" }
                    ));
                }
            }
            Command::ResetColumnOrder => {
                if let Some(tab) = self.grid.current_mut() {
                    tab.reset_column_order();
                }
                self.act_on(GridAction::PersistOrder);
            }
            Command::CopyAsInsert => {
                let action = self.grid.copy_current(CopyFormat::InsertValues);
                self.act_on(action);
            }
            Command::CopyAsInClause => {
                let action = self.grid.copy_current(CopyFormat::InClause);
                self.act_on(action);
            }
            Command::RefreshSchema => self.refresh_schema(),
            Command::TogglePreview => self.preview_open = !self.preview_open,
            Command::CyclePreviewFormat => {
                self.preview_format = self.preview_format.next();
                self.set_status(format!("preview format: {}", self.preview_format.label()));
            }
            Command::Quit => return true,
        }
        false
    }

    /// Returns Ok(true) when the app should exit.
    pub fn handle_key(&mut self, key: KeyEvent) -> Result<bool> {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

        if ctrl && matches!(key.code, KeyCode::Char('q') | KeyCode::Char('Q')) {
            return Ok(true);
        }

        if self.palette.open {
            if let PaletteAction::Execute(cmd) = self.palette.handle_key(key) {
                return Ok(self.execute_command(cmd));
            }
            return Ok(false);
        }

        if self.save_confirm.is_some() {
            match key.code {
                KeyCode::Enter | KeyCode::Char('y') | KeyCode::Char('Y') => self.confirm_save(),
                KeyCode::Esc | KeyCode::Char('n') | KeyCode::Char('N') => {
                    self.save_confirm = None;
                    self.set_status("save cancelled, edits kept");
                }
                _ => {}
            }
            return Ok(false);
        }

        match key.code {
            KeyCode::Char('p') | KeyCode::Char('P') if ctrl => {
                self.palette.show();
                return Ok(false);
            }
            KeyCode::F(5) => {
                self.run_queries();
                return Ok(false);
            }
            KeyCode::Enter if ctrl => {
                self.run_queries();
                return Ok(false);
            }
            KeyCode::Tab if self.editing_closed() => {
                self.focus = match self.focus {
                    Focus::Input => Focus::Grid,
                    Focus::Grid => Focus::Tree,
                    Focus::Tree => Focus::Input,
                };
                return Ok(false);
            }
            KeyCode::Char('{') if self.preview_open && self.focus == Focus::Grid => {
                self.preview_width = self.preview_width.saturating_sub(4).max(16);
                self.uistate.set_preview_width(self.preview_width);
                return Ok(false);
            }
            KeyCode::Char('}') if self.preview_open && self.focus == Focus::Grid => {
                self.preview_width = (self.preview_width + 4).min(120);
                self.uistate.set_preview_width(self.preview_width);
                return Ok(false);
            }
            _ => {}
        }

        match self.focus {
            Focus::Input => self.input.handle_key(key),
            Focus::Grid => {
                let action = grid_interact::handle_key(&mut self.grid, key);
                self.act_on(action);
            }
            Focus::Tree => {
                if let TreeAction::InsertQuery(sql) = self.tree.handle_key(key) {
                    self.input.set_text(sql);
                    self.focus = Focus::Input;
                }
            }
        }
        Ok(false)
    }

    fn editing_closed(&self) -> bool {
        self.grid
            .current()
            .map(|t| t.editing.is_none())
            .unwrap_or(true)
    }

    pub fn handle_mouse(&mut self, ev: MouseEvent) {
        let in_grid = ev.column >= self.grid_area.x
            && ev.column < self.grid_area.x + self.grid_area.width
            && ev.row >= self.grid_area.y
            && ev.row < self.grid_area.y + self.grid_area.height;
        if in_grid {
            if !matches!(ev.kind, crossterm::event::MouseEventKind::Moved) {
                self.focus = Focus::Grid;
            }
            let action = grid_interact::handle_mouse(&mut self.grid, ev, self.grid_inner);
            self.act_on(action);
        } else if let Some(tab) = self.grid.current_mut() {
            tab.hover_row = None;
        }
    }

    /// Periodic housekeeping between events. Returns true when something
    /// visible changed (expired status line or copied marker).
    pub fn update(&mut self) -> bool {
        let mut changed = false;
        if let (Some(_), Some(t)) = (&self.status_message, self.status_time) {
            if t.elapsed() >= STATUS_TTL {
                self.status_message = None;
                self.status_time = None;
                changed = true;
            }
        }
        if let Some(tab) = self.grid.current_mut() {
            if tab.copied.as_ref().map(|m| !m.is_active()).unwrap_or(false) {
                tab.copied = None;
                changed = true;
            }
        }
        changed
    }

    pub fn final_save(&mut self) {
        let _ = self.bridge_tx.send(BridgeRequest::Quit);
    }

    pub fn render<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<()> {
        self.grid.focus = self.focus == Focus::Grid;
        terminal.draw(|f| {
            let size = f.size();
            if size.height <= 4 || size.width <= 12 {
                return;
            }
            f.render_widget(Block::default().style(style::default_bg()), size);

            let rows = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Min(4), Constraint::Length(1)])
                .split(size);
            let status_area = rows[1];

            let with_tree = size.width > TREE_WIDTH + 40;
            let (tree_area, right) = if with_tree {
                let cols = Layout::default()
                    .direction(Direction::Horizontal)
                    .constraints([Constraint::Length(TREE_WIDTH), Constraint::Min(20)])
                    .split(rows[0]);
                (Some(cols[0]), cols[1])
            } else {
                (None, rows[0])
            };

            let input_height = (right.height / 4).clamp(3, 10);
            let panes = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Length(input_height), Constraint::Min(3)])
                .split(right);
            let input_area = panes[0];
            let mut grid_area = panes[1];

            let mut preview_area = None;
            if self.preview_open && grid_area.width > self.preview_width + 20 {
                let split = Layout::default()
                    .direction(Direction::Horizontal)
                    .constraints([
                        Constraint::Min(20),
                        Constraint::Length(self.preview_width),
                    ])
                    .split(grid_area);
                grid_area = split[0];
                preview_area = Some(split[1]);
            }

            if let Some(area) = tree_area {
                self.tree.render(f, area, self.focus == Focus::Tree);
            }
            self.input.render(f, input_area, self.focus == Focus::Input);

            self.grid_area = grid_area;
            self.grid_inner = Rect {
                x: grid_area.x + 1,
                y: grid_area.y + 2,
                width: grid_area.width.saturating_sub(2),
                height: grid_area.height.saturating_sub(3),
            };
            let total = self.grid.tabs.len();
            grid_render::render(&mut self.grid, f, grid_area, total);

            if let Some(area) = preview_area {
                render_preview_pane(self, f, area);
            }

            render_status_line(self, f, status_area);

            if let Some(statements) = &self.save_confirm {
                render_save_confirm(statements, f, size);
            }
            self.palette.render(f, size);
        })?;
        Ok(())
    }
}

fn render_preview_pane<B: Backend>(ws: &Workspace, f: &mut tui::Frame<B>, area: Rect) {
    let title = format!("Preview [{}]", ws.preview_format.label());
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(style::preview_border());

    let preview = ws
        .grid
        .current()
        .and_then(|tab| {
            let col = tab.cursor_logical_col()?;
            tab.effective_value(tab.cursor_row, col)
        })
        .map(|value| render_preview(&value, ws.preview_format));

    let mut lines: Vec<Spans> = Vec::new();
    match preview {
        Some(p) => {
            if let Some(err) = &p.error {
                lines.push(Spans::from(Span::styled(err.clone(), style::error())));
            }
            for line in p.content.lines() {
                lines.push(Spans::from(Span::styled(line.to_string(), style::cell())));
            }
        }
        None => lines.push(Spans::from(Span::styled("no cell", style::null_value()))),
    }
    f.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: false }),
        area,
    );
}

fn render_status_line<B: Backend>(ws: &Workspace, f: &mut tui::Frame<B>, area: Rect) {
    let dirty = ws.grid.current().map(|t| t.edits.len()).unwrap_or(0);
    let text = match &ws.status_message {
        Some(msg) => msg.clone(),
        None if ws.running => "running…".to_string(),
        None if dirty > 0 => format!(
            "{} unsaved edit{} · Ctrl-S to save",
            dirty,
            if dirty == 1 { "" } else { "s" }
        ),
        None => "F5 run · Ctrl-P commands · Tab focus · Ctrl-Q quit".to_string(),
    };
    f.render_widget(Paragraph::new(Span::styled(text, style::status())), area);
}

fn render_save_confirm<B: Backend>(statements: &[String], f: &mut tui::Frame<B>, size: Rect) {
    let width = size.width.saturating_sub(8).min(90);
    let height = (statements.len() as u16 + 4).min(size.height.saturating_sub(4));
    if width < 20 || height < 5 {
        return;
    }
    let popup = Rect {
        x: size.x + (size.width - width) / 2,
        y: size.y + (size.height - height) / 2,
        width,
        height,
    };
    let mut lines: Vec<Spans> = statements
        .iter()
        .map(|s| Spans::from(Span::styled(s.clone(), style::cell())))
        .collect();
    lines.push(Spans::from(Span::raw("")));
    lines.push(Spans::from(Span::styled(
        "Enter/Y run · Esc/N cancel",
        style::status(),
    )));
    f.render_widget(Clear, popup);
    let title = format!("Run {} UPDATE statement(s)?", statements.len());
    let p = Paragraph::new(lines)
        .style(style::overlay_bg())
        .block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .border_style(style::overlay_border()),
        )
        .wrap(Wrap { trim: false });
    f.render_widget(p, popup);
}
