use std::io;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::text::Line;
use ratatui::widgets::Widget;
use unicode_width::UnicodeWidthStr;

use crate::terminal::config::EXIT_COMMAND;

pub const INPUT_STYLE: Style = Style::new().fg(Color::Indexed(253)).bg(Color::Indexed(232));

/// Source of operator key presses.
pub trait KeySource: Send + Sync {
    /// Waits up to `timeout` for a key press.
    fn poll_key(&self, timeout: Duration) -> io::Result<Option<KeyEvent>>;
}

/// Reads keys from the controlling terminal.
#[derive(Debug, Default)]
pub struct TerminalKeys;

impl KeySource for TerminalKeys {
    fn poll_key(&self, timeout: Duration) -> io::Result<Option<KeyEvent>> {
        if !event::poll(timeout)? {
            return Ok(None);
        }
        match event::read()? {
            Event::Key(key) if key.kind != KeyEventKind::Release => Ok(Some(key)),
            _ => Ok(None),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum Edit {
    Pending,
    Submit(String),
}

/// Single-line editor behind the input region.
#[derive(Debug, Default)]
pub struct LineEditor {
    buffer: String,
}

impl LineEditor {
    pub fn text(&self) -> &str {
        &self.buffer
    }

    pub fn handle(&mut self, key: KeyEvent) -> Edit {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('c' | 'd') if ctrl => {
                self.buffer.clear();
                Edit::Submit(EXIT_COMMAND.to_string())
            }
            KeyCode::Char('u') if ctrl => {
                self.buffer.clear();
                Edit::Pending
            }
            KeyCode::Char(ch) if !ctrl => {
                self.buffer.push(ch);
                Edit::Pending
            }
            KeyCode::Backspace => {
                self.buffer.pop();
                Edit::Pending
            }
            KeyCode::Esc => {
                self.buffer.clear();
                Edit::Pending
            }
            KeyCode::Enter => Edit::Submit(std::mem::take(&mut self.buffer)),
            _ => Edit::Pending,
        }
    }

    /// Column of the cursor relative to the start of the line, clamped to
    /// the last visible cell.
    pub fn cursor_column(&self, width: u16) -> u16 {
        let used = UnicodeWidthStr::width(self.buffer.as_str());
        (used.min(usize::from(width.saturating_sub(1)))) as u16
    }
}

pub struct InputWidget<'a> {
    editor: &'a LineEditor,
}

impl<'a> InputWidget<'a> {
    pub fn new(editor: &'a LineEditor) -> Self {
        Self { editor }
    }
}

impl Widget for InputWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        buf.set_style(area, INPUT_STYLE);
        let text = self.editor.text();
        // Keep the end of a long line visible.
        let width = usize::from(area.width.saturating_sub(1));
        let mut start = 0;
        while UnicodeWidthStr::width(&text[start..]) > width {
            start += text[start..].chars().next().map_or(1, char::len_utf8);
        }
        let line = Line::styled(text[start..].to_string(), INPUT_STYLE);
        buf.set_line(area.x, area.y, &line, area.width);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_text(editor: &mut LineEditor, text: &str) {
        for ch in text.chars() {
            assert_eq!(editor.handle(key(KeyCode::Char(ch))), Edit::Pending);
        }
    }

    #[test]
    fn enter_submits_and_clears() {
        let mut editor = LineEditor::default();
        type_text(&mut editor, "observe 12");
        assert_eq!(editor.text(), "observe 12");
        assert_eq!(
            editor.handle(key(KeyCode::Enter)),
            Edit::Submit("observe 12".into())
        );
        assert_eq!(editor.text(), "");
        assert_eq!(editor.handle(key(KeyCode::Enter)), Edit::Submit(String::new()));
    }

    #[test]
    fn backspace_and_escape_edit_the_line() {
        let mut editor = LineEditor::default();
        type_text(&mut editor, "e44");
        editor.handle(key(KeyCode::Backspace));
        assert_eq!(editor.text(), "e4");
        editor.handle(key(KeyCode::Esc));
        assert_eq!(editor.text(), "");
    }

    #[test]
    fn control_keys_request_exit() {
        let mut editor = LineEditor::default();
        type_text(&mut editor, "half typed");
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(editor.handle(ctrl_c), Edit::Submit("quit".into()));
        assert_eq!(editor.text(), "");
    }

    #[test]
    fn long_lines_keep_their_tail_visible() {
        let mut editor = LineEditor::default();
        type_text(&mut editor, "abcdefghij");
        let area = Rect::new(0, 0, 5, 1);
        let mut buf = Buffer::empty(area);
        InputWidget::new(&editor).render(area, &mut buf);

        let shown: String = (0..4).map(|x| buf.content[buf.index_of(x, 0)].symbol()).collect();
        assert_eq!(shown, "ghij");
        assert_eq!(buf.content[buf.index_of(4, 0)].bg, Color::Indexed(232));
        assert_eq!(editor.cursor_column(5), 4);
    }
}
