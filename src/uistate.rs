// src/uistate.rs
//
// Durable UI state: column orders per (tab, result) and the preview panel
// width. Stored as one JSON file next to the rest of the app data, loaded
// on startup and written back on every change.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::column_order::ColumnOrder;

#[derive(Serialize, Deserialize, Default)]
pub struct UiState {
    pub column_orders: HashMap<String, ColumnOrder>,
    pub preview_width: Option<u16>,
}

pub struct UiStateStore {
    path: PathBuf,
    state: UiState,
}

fn order_key(tab_id: usize, result_index: usize) -> String {
    format!("{}:{}", tab_id, result_index)
}

impl UiStateStore {
    pub fn open(data_dir: PathBuf) -> Self {
        let path = data_dir.join("uistate.json");
        let state = fs::read_to_string(&path)
            .ok()
            .and_then(|content| serde_json::from_str(&content).ok())
            .unwrap_or_default();
        Self { path, state }
    }

    /// In-memory store for contexts with nowhere to persist (tests, no
    /// data dir). `save` becomes a no-op failure that is only logged.
    pub fn ephemeral() -> Self {
        Self { path: PathBuf::new(), state: UiState::default() }
    }

    fn save(&self) {
        if self.path.as_os_str().is_empty() {
            return;
        }
        if let Err(e) = self.try_save() {
            log::warn!("could not persist ui state: {}", e);
        }
    }

    fn try_save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(&self.state)?)?;
        Ok(())
    }

    /// Stored order for this result slot, or None when nothing was stored
    /// or the stored permutation no longer matches the column count.
    pub fn column_order(&self, tab_id: usize, result_index: usize, column_count: usize) -> Option<ColumnOrder> {
        self.state
            .column_orders
            .get(&order_key(tab_id, result_index))
            .filter(|o| o.len() == column_count)
            .cloned()
    }

    pub fn set_column_order(&mut self, tab_id: usize, result_index: usize, order: &ColumnOrder) {
        if order.is_identity() {
            self.state.column_orders.remove(&order_key(tab_id, result_index));
        } else {
            self.state
                .column_orders
                .insert(order_key(tab_id, result_index), order.clone());
        }
        self.save();
    }

    pub fn preview_width(&self) -> Option<u16> {
        self.state.preview_width
    }

    pub fn set_preview_width(&mut self, width: u16) {
        self.state.preview_width = Some(width);
        self.save();
    }
}
