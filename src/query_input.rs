//! The SQL input pane: a small multi-line buffer plus statement splitting.
//!
//! Splitting understands single-quoted strings, bracketed identifiers, line
//! and block comments, and both `;` terminators and `GO` separator lines, so
//! a semicolon inside a string never ends a statement.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tui::backend::Backend;
use tui::layout::Rect;
use tui::text::{Span, Spans};
use tui::widgets::{Block, Borders, Paragraph};
use tui::Frame;
use unicode_segmentation::UnicodeSegmentation;

use crate::theme::style;

#[derive(Debug, Default)]
pub struct QueryInput {
    pub buffer: String,
    /// Caret as a grapheme offset into `buffer`.
    pub caret: usize,
    pub scroll_y: u16,
}

impl QueryInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_text(&mut self, text: String) {
        self.caret = text.graphemes(true).count();
        self.buffer = text;
    }

    fn caret_byte(&self) -> usize {
        self.buffer
            .grapheme_indices(true)
            .nth(self.caret)
            .map(|(b, _)| b)
            .unwrap_or(self.buffer.len())
    }

    pub fn insert(&mut self, ch: char) {
        let byte = self.caret_byte();
        self.buffer.insert(byte, ch);
        self.caret += 1;
    }

    pub fn insert_str(&mut self, text: &str) {
        let byte = self.caret_byte();
        self.buffer.insert_str(byte, text);
        self.caret += text.graphemes(true).count();
    }

    pub fn backspace(&mut self) {
        if self.caret == 0 {
            return;
        }
        self.caret -= 1;
        let byte = self.caret_byte();
        let next = self.buffer[byte..]
            .grapheme_indices(true)
            .nth(1)
            .map(|(b, _)| byte + b)
            .unwrap_or(self.buffer.len());
        self.buffer.replace_range(byte..next, "");
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => self.insert(c),
            KeyCode::Enter => self.insert('\n'),
            KeyCode::Tab => self.insert_str("    "),
            KeyCode::Backspace => self.backspace(),
            KeyCode::Left => self.caret = self.caret.saturating_sub(1),
            KeyCode::Right => {
                self.caret = (self.caret + 1).min(self.buffer.graphemes(true).count())
            }
            KeyCode::Home => {
                // start of current line
                while self.caret > 0 && self.grapheme_at(self.caret - 1) != Some("\n") {
                    self.caret -= 1;
                }
            }
            KeyCode::End => {
                let total = self.buffer.graphemes(true).count();
                while self.caret < total && self.grapheme_at(self.caret) != Some("\n") {
                    self.caret += 1;
                }
            }
            KeyCode::Up => self.move_line(-1),
            KeyCode::Down => self.move_line(1),
            _ => {}
        }
    }

    fn grapheme_at(&self, pos: usize) -> Option<&str> {
        self.buffer.graphemes(true).nth(pos)
    }

    fn move_line(&mut self, delta: isize) {
        let graphemes: Vec<&str> = self.buffer.graphemes(true).collect();
        let mut line_starts = vec![0usize];
        for (i, g) in graphemes.iter().enumerate() {
            if *g == "\n" {
                line_starts.push(i + 1);
            }
        }
        let line = line_starts
            .iter()
            .rposition(|&s| s <= self.caret)
            .unwrap_or(0);
        let col = self.caret - line_starts[line];
        let target = line as isize + delta;
        if target < 0 || target as usize >= line_starts.len() {
            return;
        }
        let target = target as usize;
        let line_end = line_starts
            .get(target + 1)
            .map(|&s| s - 1)
            .unwrap_or(graphemes.len());
        self.caret = (line_starts[target] + col).min(line_end);
    }

    /// The statements a run executes, paired with a short display context.
    pub fn statements(&self) -> Vec<(String, String)> {
        split_statements(&self.buffer)
            .into_iter()
            .map(|stmt| {
                let context = shorten(&stmt, 36);
                (stmt, context)
            })
            .collect()
    }

    pub fn render<B: Backend>(&mut self, f: &mut Frame<B>, area: Rect, focused: bool) {
        let block = Block::default()
            .title("Query")
            .borders(Borders::ALL)
            .border_style(if focused {
                style::input_border_focus()
            } else {
                style::input_border()
            });
        let inner_height = area.height.saturating_sub(2);

        // keep the caret line in view
        let caret_line = self
            .buffer
            .graphemes(true)
            .take(self.caret)
            .filter(|g| *g == "\n")
            .count() as u16;
        if caret_line < self.scroll_y {
            self.scroll_y = caret_line;
        }
        if inner_height > 0 && caret_line >= self.scroll_y + inner_height {
            self.scroll_y = caret_line + 1 - inner_height;
        }

        let mut lines: Vec<Spans> = Vec::new();
        let mut seen = 0usize;
        for raw in self.buffer.split('\n') {
            let len = raw.graphemes(true).count();
            if focused && self.caret >= seen && self.caret <= seen + len {
                let col = self.caret - seen;
                let before: String = raw.graphemes(true).take(col).collect();
                let at: String = raw.graphemes(true).nth(col).unwrap_or(" ").to_string();
                let after: String = raw.graphemes(true).skip(col + 1).collect();
                lines.push(Spans::from(vec![
                    Span::styled(before, style::cell()),
                    Span::styled(at, style::cursor_cell()),
                    Span::styled(after, style::cell()),
                ]));
            } else {
                lines.push(Spans::from(Span::styled(raw.to_string(), style::cell())));
            }
            seen += len + 1;
        }

        let p = Paragraph::new(lines).block(block).scroll((self.scroll_y, 0));
        f.render_widget(p, area);
    }
}

fn shorten(stmt: &str, max: usize) -> String {
    let flat: String = stmt.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max {
        flat
    } else {
        let mut s: String = flat.chars().take(max - 1).collect();
        s.push('…');
        s
    }
}

/// Split a script into executable statements. Delimiters inside strings,
/// bracketed identifiers, or comments do not count; empty statements are
/// dropped.
pub fn split_statements(script: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut chars = script.chars().peekable();
    let mut in_string = false;
    let mut in_bracket = false;
    let mut in_line_comment = false;
    let mut in_block_comment = false;

    while let Some(c) = chars.next() {
        if in_line_comment {
            current.push(c);
            if c == '\n' {
                in_line_comment = false;
            }
            continue;
        }
        if in_block_comment {
            current.push(c);
            if c == '*' && chars.peek() == Some(&'/') {
                current.push('/');
                chars.next();
                in_block_comment = false;
            }
            continue;
        }
        if in_string {
            current.push(c);
            if c == '\'' {
                // doubled quote stays inside the string
                if chars.peek() == Some(&'\'') {
                    current.push('\'');
                    chars.next();
                } else {
                    in_string = false;
                }
            }
            continue;
        }
        if in_bracket {
            current.push(c);
            if c == ']' {
                in_bracket = false;
            }
            continue;
        }
        match c {
            '\'' => {
                in_string = true;
                current.push(c);
            }
            '[' => {
                in_bracket = true;
                current.push(c);
            }
            '-' if chars.peek() == Some(&'-') => {
                in_line_comment = true;
                current.push(c);
            }
            '/' if chars.peek() == Some(&'*') => {
                in_block_comment = true;
                current.push(c);
            }
            ';' => {
                push_statement(&mut statements, &mut current);
            }
            '\n' if is_go_line(&current) => {
                strip_go_line(&mut current);
                push_statement(&mut statements, &mut current);
            }
            _ => current.push(c),
        }
    }
    if is_go_line(&current) {
        strip_go_line(&mut current);
    }
    push_statement(&mut statements, &mut current);
    statements
}

fn push_statement(statements: &mut Vec<String>, current: &mut String) {
    let trimmed = current.trim();
    if !trimmed.is_empty() && !is_only_comments(trimmed) {
        statements.push(trimmed.to_string());
    }
    current.clear();
}

/// Did the buffer just finish a line that is exactly `GO`?
fn is_go_line(current: &str) -> bool {
    current
        .rsplit('\n')
        .next()
        .map(|line| line.trim().eq_ignore_ascii_case("go"))
        .unwrap_or(false)
}

fn strip_go_line(current: &mut String) {
    if let Some(pos) = current.rfind('\n') {
        current.truncate(pos);
    } else {
        current.clear();
    }
}

fn is_only_comments(stmt: &str) -> bool {
    stmt.lines().all(|line| {
        let t = line.trim();
        t.is_empty() || t.starts_with("--")
    })
}
