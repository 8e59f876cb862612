//! The schema browser pane: schemas expanding to their tables.
//!
//! The tree is filled from a catalog query routed through the bridge and
//! cached as JSON in the data directory, so the pane is populated on the
//! next start without waiting for the backend.

use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};
use serde::{Deserialize, Serialize};
use tui::backend::Backend;
use tui::layout::Rect;
use tui::text::{Span, Spans};
use tui::widgets::{Block, Borders, Paragraph};
use tui::Frame;

use crate::resultset::ResultSet;
use crate::theme::style;

pub const SNAPSHOT_FILE: &str = "schema.json";

/// Catalog statement the refresh runs; two columns, schema then table.
pub const CATALOG_QUERY: &str =
    "SELECT TABLE_SCHEMA, TABLE_NAME FROM INFORMATION_SCHEMA.TABLES ORDER BY 1, 2";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SchemaEntry {
    pub schema: String,
    pub tables: Vec<String>,
}

/// What a key press in the tree asks the workspace to do.
#[derive(Debug, PartialEq, Eq)]
pub enum TreeAction {
    None,
    /// Put this statement into the query input.
    InsertQuery(String),
}

#[derive(Debug, Default)]
pub struct SchemaTree {
    pub entries: Vec<SchemaEntry>,
    expanded: HashSet<String>,
    pub cursor: usize,
    pub scroll: usize,
    snapshot_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Node {
    Schema(usize),
    Table(usize, usize),
}

impl SchemaTree {
    pub fn new(data_dir: Option<PathBuf>) -> Self {
        let snapshot_path = data_dir.map(|d| d.join(SNAPSHOT_FILE));
        let entries = snapshot_path
            .as_ref()
            .and_then(|p| fs::read_to_string(p).ok())
            .and_then(|content| serde_json::from_str(&content).ok())
            .unwrap_or_default();
        Self { entries, snapshot_path, ..Default::default() }
    }

    /// Rebuild from a catalog result (schema, table per row) and persist
    /// the snapshot.
    pub fn update_from_result(&mut self, result: &ResultSet) {
        let mut entries: Vec<SchemaEntry> = Vec::new();
        for row in &result.rows {
            let (schema, table) = match (row.first(), row.get(1)) {
                (Some(s), Some(t)) => (s.plain_text(), t.plain_text()),
                _ => continue,
            };
            match entries.iter_mut().find(|e| e.schema == schema) {
                Some(entry) => entry.tables.push(table),
                None => entries.push(SchemaEntry { schema, tables: vec![table] }),
            }
        }
        self.entries = entries;
        self.cursor = 0;
        self.scroll = 0;
        if let Err(e) = self.save_snapshot() {
            log::warn!("could not persist schema snapshot: {}", e);
        }
    }

    fn save_snapshot(&self) -> Result<()> {
        let path = match &self.snapshot_path {
            Some(p) => p,
            None => return Ok(()),
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(&self.entries)?)?;
        Ok(())
    }

    fn visible_nodes(&self) -> Vec<Node> {
        let mut nodes = Vec::new();
        for (si, entry) in self.entries.iter().enumerate() {
            nodes.push(Node::Schema(si));
            if self.expanded.contains(&entry.schema) {
                for ti in 0..entry.tables.len() {
                    nodes.push(Node::Table(si, ti));
                }
            }
        }
        nodes
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> TreeAction {
        let nodes = self.visible_nodes();
        if nodes.is_empty() {
            return TreeAction::None;
        }
        self.cursor = self.cursor.min(nodes.len() - 1);
        match key.code {
            KeyCode::Up => self.cursor = self.cursor.saturating_sub(1),
            KeyCode::Down => self.cursor = (self.cursor + 1).min(nodes.len() - 1),
            KeyCode::Left => {
                if let Node::Schema(si) = nodes[self.cursor] {
                    self.expanded.remove(&self.entries[si].schema);
                } else if let Node::Table(si, _) = nodes[self.cursor] {
                    // collapse the parent and land on it
                    self.expanded.remove(&self.entries[si].schema);
                    self.cursor = self
                        .visible_nodes()
                        .iter()
                        .position(|n| *n == Node::Schema(si))
                        .unwrap_or(0);
                }
            }
            KeyCode::Right => {
                if let Node::Schema(si) = nodes[self.cursor] {
                    self.expanded.insert(self.entries[si].schema.clone());
                }
            }
            KeyCode::Enter | KeyCode::Char(' ') => match nodes[self.cursor] {
                Node::Schema(si) => {
                    let schema = self.entries[si].schema.clone();
                    if !self.expanded.remove(&schema) {
                        self.expanded.insert(schema);
                    }
                }
                Node::Table(si, ti) => {
                    let entry = &self.entries[si];
                    return TreeAction::InsertQuery(format!(
                        "SELECT TOP 100 * FROM [{}].[{}]",
                        entry.schema, entry.tables[ti]
                    ));
                }
            },
            _ => {}
        }
        TreeAction::None
    }

    pub fn render<B: Backend>(&mut self, f: &mut Frame<B>, area: Rect, focused: bool) {
        let block = Block::default()
            .title("Schema")
            .borders(Borders::ALL)
            .border_style(if focused {
                style::tree_border_focus()
            } else {
                style::tree_border()
            });
        let inner_height = area.height.saturating_sub(2) as usize;

        let nodes = self.visible_nodes();
        if inner_height > 0 {
            if self.cursor < self.scroll {
                self.scroll = self.cursor;
            }
            if self.cursor >= self.scroll + inner_height {
                self.scroll = self.cursor + 1 - inner_height;
            }
        }

        let mut lines: Vec<Spans> = Vec::new();
        if nodes.is_empty() {
            lines.push(Spans::from(Span::styled(
                "no schema loaded (palette: refresh schema)",
                style::null_value(),
            )));
        }
        for (i, node) in nodes.iter().enumerate().skip(self.scroll).take(inner_height) {
            let text = match node {
                Node::Schema(si) => {
                    let marker = if self.expanded.contains(&self.entries[*si].schema) {
                        "▾"
                    } else {
                        "▸"
                    };
                    format!("{} {}", marker, self.entries[*si].schema)
                }
                Node::Table(si, ti) => format!("    {}", self.entries[*si].tables[*ti]),
            };
            let s = if focused && i == self.cursor {
                style::overlay_selected()
            } else {
                style::cell()
            };
            lines.push(Spans::from(Span::styled(text, s)));
        }
        f.render_widget(Paragraph::new(lines).block(block), area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resultset::{CellValue, ColumnMeta};
    use crossterm::event::KeyModifiers;

    fn catalog() -> ResultSet {
        ResultSet::new(
            vec![
                ColumnMeta::new("TABLE_SCHEMA", "nvarchar"),
                ColumnMeta::new("TABLE_NAME", "nvarchar"),
            ],
            vec![
                vec![CellValue::Text("dbo".into()), CellValue::Text("orders".into())],
                vec![CellValue::Text("dbo".into()), CellValue::Text("widgets".into())],
                vec![CellValue::Text("audit".into()), CellValue::Text("log".into())],
            ],
            CATALOG_QUERY,
        )
    }

    #[test]
    fn groups_catalog_rows_by_schema() {
        let mut tree = SchemaTree::new(None);
        tree.update_from_result(&catalog());
        assert_eq!(tree.entries.len(), 2);
        assert_eq!(tree.entries[0].schema, "dbo");
        assert_eq!(tree.entries[0].tables, vec!["orders", "widgets"]);
        assert_eq!(tree.entries[1].schema, "audit");
    }

    #[test]
    fn enter_on_a_table_yields_a_query() {
        let mut tree = SchemaTree::new(None);
        tree.update_from_result(&catalog());
        let none = tree.handle_key(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE));
        assert_eq!(none, TreeAction::None); // toggled "dbo" open
        tree.handle_key(KeyEvent::new(KeyCode::Down, KeyModifiers::NONE));
        let action = tree.handle_key(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE));
        assert_eq!(
            action,
            TreeAction::InsertQuery("SELECT TOP 100 * FROM [dbo].[orders]".into())
        );
    }

    #[test]
    fn left_from_a_table_collapses_to_the_schema() {
        let mut tree = SchemaTree::new(None);
        tree.update_from_result(&catalog());
        tree.handle_key(KeyEvent::new(KeyCode::Right, KeyModifiers::NONE));
        tree.handle_key(KeyEvent::new(KeyCode::Down, KeyModifiers::NONE));
        tree.handle_key(KeyEvent::new(KeyCode::Down, KeyModifiers::NONE));
        tree.handle_key(KeyEvent::new(KeyCode::Left, KeyModifiers::NONE));
        assert_eq!(tree.cursor, 0);
        // only the two schema rows remain visible
        assert_eq!(tree.visible_nodes().len(), 2);
    }

    #[test]
    fn snapshot_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut tree = SchemaTree::new(Some(dir.path().to_path_buf()));
            tree.update_from_result(&catalog());
        }
        let tree = SchemaTree::new(Some(dir.path().to_path_buf()));
        assert_eq!(tree.entries.len(), 2);
    }
}
