//! User configuration, read once at startup from `config.toml` in the
//! platform config directory. A missing file yields the defaults; a file
//! that fails to parse is an error the caller reports and then ignores.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Database name handed to the query backend with every statement.
    pub database: String,
    pub colors: ColorConfig,
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = match Self::config_path() {
            Some(p) => p,
            None => return Ok(Self::default()),
        };
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "sleet").map(|d| d.config_dir().join("config.toml"))
    }

    pub fn data_dir() -> Option<PathBuf> {
        ProjectDirs::from("", "", "sleet").map(|d| d.data_dir().to_path_buf())
    }
}

/// Every themable color as an RGB triple, so a user toml can override any
/// subset. Defaults are a dark slate-and-wisteria scheme.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorConfig {
    pub default_bg: [u8; 3],
    pub status_fg: [u8; 3],

    pub grid_border: [u8; 3],
    pub grid_border_focus: [u8; 3],
    pub tab_active: [u8; 3],
    pub header_row: [u8; 3],
    pub header_cursor_bg: [u8; 3],
    pub header_moving_bg: [u8; 3],
    pub index_column: [u8; 3],
    pub cell_fg: [u8; 3],
    pub null_fg: [u8; 3],
    pub selection_fg: [u8; 3],
    pub selection_bg: [u8; 3],
    pub cursor_cell_fg: [u8; 3],
    pub cursor_cell_bg: [u8; 3],
    pub copied_fg: [u8; 3],
    pub copied_bg: [u8; 3],
    pub dirty_fg: [u8; 3],
    pub editing_fg: [u8; 3],
    pub editing_bg: [u8; 3],
    pub info_fg: [u8; 3],
    pub error_fg: [u8; 3],

    pub input_border: [u8; 3],
    pub input_border_focus: [u8; 3],
    pub tree_border: [u8; 3],
    pub tree_border_focus: [u8; 3],
    pub preview_border: [u8; 3],
    pub preview_border_focus: [u8; 3],

    pub overlay_bg: [u8; 3],
    pub overlay_border: [u8; 3],
    pub overlay_selected_fg: [u8; 3],
    pub overlay_selected_bg: [u8; 3],
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self {
            default_bg: [30, 31, 40],
            status_fg: [156, 171, 202],

            grid_border: [84, 84, 109],
            grid_border_focus: [126, 156, 216],
            tab_active: [230, 195, 132],
            header_row: [149, 127, 184],
            header_cursor_bg: [54, 54, 70],
            header_moving_bg: [45, 79, 103],
            index_column: [120, 120, 145],
            cell_fg: [200, 200, 200],
            null_fg: [114, 113, 105],
            selection_fg: [200, 200, 200],
            selection_bg: [34, 50, 73],
            cursor_cell_fg: [22, 22, 22],
            cursor_cell_bg: [126, 156, 216],
            copied_fg: [22, 22, 22],
            copied_bg: [122, 168, 159],
            dirty_fg: [255, 160, 102],
            editing_fg: [22, 22, 22],
            editing_bg: [230, 195, 132],
            info_fg: [152, 187, 108],
            error_fg: [255, 93, 98],

            input_border: [84, 84, 109],
            input_border_focus: [126, 156, 216],
            tree_border: [84, 84, 109],
            tree_border_focus: [126, 156, 216],
            preview_border: [84, 84, 109],
            preview_border_focus: [126, 156, 216],

            overlay_bg: [42, 42, 55],
            overlay_border: [149, 127, 184],
            overlay_selected_fg: [22, 22, 22],
            overlay_selected_bg: [147, 138, 169],
        }
    }
}
