//! Fuzzy command palette overlay.
//!
//! Typed input is fuzzy-matched against the command labels; Enter runs the
//! highlighted command, Esc dismisses. The palette itself never mutates the
//! workspace, it only names the command to run.

use crossterm::event::{KeyCode, KeyEvent};
use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use tui::backend::Backend;
use tui::layout::Rect;
use tui::text::{Span, Spans};
use tui::widgets::{Block, Borders, Clear, Paragraph};
use tui::Frame;

use crate::theme::style;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    RunQueries,
    SaveEdits,
    DiscardEdits,
    ResetColumnOrder,
    CopyAsInsert,
    CopyAsInClause,
    RefreshSchema,
    TogglePreview,
    CyclePreviewFormat,
    Quit,
}

impl Command {
    pub const ALL: [Command; 10] = [
        Command::RunQueries,
        Command::SaveEdits,
        Command::DiscardEdits,
        Command::ResetColumnOrder,
        Command::CopyAsInsert,
        Command::CopyAsInClause,
        Command::RefreshSchema,
        Command::TogglePreview,
        Command::CyclePreviewFormat,
        Command::Quit,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Command::RunQueries => "Run queries",
            Command::SaveEdits => "Save pending edits",
            Command::DiscardEdits => "Discard pending edits",
            Command::ResetColumnOrder => "Reset column order",
            Command::CopyAsInsert => "Copy selection as INSERT VALUES",
            Command::CopyAsInClause => "Copy selection as IN clause",
            Command::RefreshSchema => "Refresh schema tree",
            Command::TogglePreview => "Toggle preview pane",
            Command::CyclePreviewFormat => "Cycle preview format",
            Command::Quit => "Quit",
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum PaletteAction {
    None,
    Close,
    Execute(Command),
}

pub struct CommandPalette {
    pub open: bool,
    pub input: String,
    pub selected: usize,
    matcher: SkimMatcherV2,
}

impl Default for CommandPalette {
    fn default() -> Self {
        Self {
            open: false,
            input: String::new(),
            selected: 0,
            matcher: SkimMatcherV2::default(),
        }
    }
}

impl CommandPalette {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn show(&mut self) {
        self.open = true;
        self.input.clear();
        self.selected = 0;
    }

    /// Commands matching the current input, best score first. An empty
    /// input lists everything in declaration order.
    pub fn filtered(&self) -> Vec<Command> {
        if self.input.is_empty() {
            return Command::ALL.to_vec();
        }
        let mut scored: Vec<(i64, Command)> = Command::ALL
            .iter()
            .filter_map(|c| {
                self.matcher
                    .fuzzy_match(c.label(), &self.input)
                    .map(|score| (score, *c))
            })
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0));
        scored.into_iter().map(|(_, c)| c).collect()
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> PaletteAction {
        match key.code {
            KeyCode::Esc => {
                self.open = false;
                return PaletteAction::Close;
            }
            KeyCode::Enter => {
                let matches = self.filtered();
                if let Some(cmd) = matches.get(self.selected.min(matches.len().saturating_sub(1))) {
                    self.open = false;
                    return PaletteAction::Execute(*cmd);
                }
                return PaletteAction::None;
            }
            KeyCode::Up => self.selected = self.selected.saturating_sub(1),
            KeyCode::Down => {
                let count = self.filtered().len();
                if count > 0 {
                    self.selected = (self.selected + 1).min(count - 1);
                }
            }
            KeyCode::Backspace => {
                self.input.pop();
                self.selected = 0;
            }
            KeyCode::Char(c) => {
                self.input.push(c);
                self.selected = 0;
            }
            _ => {}
        }
        PaletteAction::None
    }

    pub fn render<B: Backend>(&self, f: &mut Frame<B>, area: Rect) {
        if !self.open {
            return;
        }
        let width = 44.min(area.width.saturating_sub(4));
        let matches = self.filtered();
        let height = (matches.len() as u16 + 3).min(area.height.saturating_sub(2));
        if width < 10 || height < 4 {
            return;
        }
        let popup = Rect {
            x: area.x + (area.width - width) / 2,
            y: area.y + 2,
            width,
            height,
        };

        let mut lines = vec![Spans::from(vec![
            Span::styled("> ", style::overlay_border()),
            Span::styled(self.input.clone(), style::cell()),
            Span::styled("▌", style::cursor_cell()),
        ])];
        for (i, cmd) in matches.iter().take(height as usize - 3).enumerate() {
            let s = if i == self.selected {
                style::overlay_selected()
            } else {
                style::cell()
            };
            lines.push(Spans::from(Span::styled(format!(" {}", cmd.label()), s)));
        }

        f.render_widget(Clear, popup);
        let p = Paragraph::new(lines)
            .style(style::overlay_bg())
            .block(
                Block::default()
                    .title("Command")
                    .borders(Borders::ALL)
                    .border_style(style::overlay_border()),
            );
        f.render_widget(p, popup);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn empty_input_lists_all_commands() {
        let palette = CommandPalette::new();
        assert_eq!(palette.filtered().len(), Command::ALL.len());
    }

    #[test]
    fn typing_narrows_and_ranks_matches() {
        let mut palette = CommandPalette::new();
        palette.show();
        for c in "discard".chars() {
            palette.handle_key(key(KeyCode::Char(c)));
        }
        let matches = palette.filtered();
        assert_eq!(matches.first(), Some(&Command::DiscardEdits));
    }

    #[test]
    fn enter_executes_the_highlighted_command() {
        let mut palette = CommandPalette::new();
        palette.show();
        palette.handle_key(key(KeyCode::Down));
        let action = palette.handle_key(key(KeyCode::Enter));
        assert_eq!(action, PaletteAction::Execute(Command::SaveEdits));
        assert!(!palette.open);
    }

    #[test]
    fn escape_closes_without_executing() {
        let mut palette = CommandPalette::new();
        palette.show();
        palette.handle_key(key(KeyCode::Char('q')));
        let action = palette.handle_key(key(KeyCode::Esc));
        assert_eq!(action, PaletteAction::Close);
        assert!(!palette.open);
    }

    #[test]
    fn no_match_enter_is_inert() {
        let mut palette = CommandPalette::new();
        palette.show();
        for c in "zzzzzz".chars() {
            palette.handle_key(key(KeyCode::Char(c)));
        }
        assert!(palette.filtered().is_empty());
        assert_eq!(palette.handle_key(key(KeyCode::Enter)), PaletteAction::None);
    }
}
