use once_cell::sync::Lazy;
use tui::style::{Color, Modifier, Style};

/// Configured colors, loaded once. A broken config file silently falls back
/// to the defaults here; `main` reports the parse error separately.
pub static CONFIG_COLORS: Lazy<crate::config::ColorConfig> = Lazy::new(|| {
    crate::config::Config::load()
        .map(|c| c.colors)
        .unwrap_or_default()
});

#[inline]
pub fn rgb(arr: [u8; 3]) -> Color {
    Color::Rgb(arr[0], arr[1], arr[2])
}

/// Style shortcuts used throughout the UI. One function per themable
/// surface, all reading `CONFIG_COLORS`.
pub mod style {
    use super::{rgb, Modifier, Style, CONFIG_COLORS};

    fn fg(arr: [u8; 3]) -> Style {
        Style::default().fg(rgb(arr))
    }

    pub fn default_bg() -> Style {
        Style::default().bg(rgb(CONFIG_COLORS.default_bg))
    }
    pub fn status() -> Style {
        fg(CONFIG_COLORS.status_fg)
    }

    /* ─── results grid ─── */
    pub fn grid_border() -> Style {
        fg(CONFIG_COLORS.grid_border)
    }
    pub fn grid_border_focus() -> Style {
        fg(CONFIG_COLORS.grid_border_focus)
    }
    pub fn tab_active() -> Style {
        fg(CONFIG_COLORS.tab_active).add_modifier(Modifier::BOLD)
    }
    pub fn header_row() -> Style {
        fg(CONFIG_COLORS.header_row).add_modifier(Modifier::BOLD)
    }
    pub fn header_cursor() -> Style {
        Style::default().bg(rgb(CONFIG_COLORS.header_cursor_bg))
    }
    pub fn header_moving() -> Style {
        Style::default().bg(rgb(CONFIG_COLORS.header_moving_bg))
    }
    pub fn index_column() -> Style {
        fg(CONFIG_COLORS.index_column)
    }
    pub fn cell() -> Style {
        fg(CONFIG_COLORS.cell_fg)
    }
    pub fn null_value() -> Style {
        fg(CONFIG_COLORS.null_fg).add_modifier(Modifier::ITALIC)
    }
    pub fn selection() -> Style {
        fg(CONFIG_COLORS.selection_fg).bg(rgb(CONFIG_COLORS.selection_bg))
    }
    pub fn cursor_cell() -> Style {
        fg(CONFIG_COLORS.cursor_cell_fg).bg(rgb(CONFIG_COLORS.cursor_cell_bg))
    }
    pub fn copied_cell() -> Style {
        fg(CONFIG_COLORS.copied_fg).bg(rgb(CONFIG_COLORS.copied_bg))
    }
    pub fn dirty_cell() -> Style {
        fg(CONFIG_COLORS.dirty_fg).add_modifier(Modifier::BOLD)
    }
    pub fn editing_cell() -> Style {
        fg(CONFIG_COLORS.editing_fg).bg(rgb(CONFIG_COLORS.editing_bg))
    }
    pub fn info() -> Style {
        fg(CONFIG_COLORS.info_fg)
    }
    pub fn error() -> Style {
        fg(CONFIG_COLORS.error_fg)
    }

    /* ─── query input / schema tree / preview ─── */
    pub fn input_border() -> Style {
        fg(CONFIG_COLORS.input_border)
    }
    pub fn input_border_focus() -> Style {
        fg(CONFIG_COLORS.input_border_focus)
    }
    pub fn tree_border() -> Style {
        fg(CONFIG_COLORS.tree_border)
    }
    pub fn tree_border_focus() -> Style {
        fg(CONFIG_COLORS.tree_border_focus)
    }
    pub fn preview_border() -> Style {
        fg(CONFIG_COLORS.preview_border)
    }
    pub fn preview_border_focus() -> Style {
        fg(CONFIG_COLORS.preview_border_focus)
    }

    /* ─── overlays (palette, save confirmation) ─── */
    pub fn overlay_bg() -> Style {
        Style::default().bg(rgb(CONFIG_COLORS.overlay_bg))
    }
    pub fn overlay_border() -> Style {
        fg(CONFIG_COLORS.overlay_border)
    }
    pub fn overlay_selected() -> Style {
        fg(CONFIG_COLORS.overlay_selected_fg).bg(rgb(CONFIG_COLORS.overlay_selected_bg))
    }
}
