use std::collections::VecDeque;

use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::text::Line;
use ratatui::widgets::Widget;

/// Lines kept for redraws; older lines scroll away for good.
pub const SCROLLBACK_LINES: usize = 1000;

const NOTICE_PREFIXES: &[&str] = &[
    "{Game ",
    "Game ",
    "    **ANNOUNCEMENT**",
    "Removing game ",
    "Notification: ",
    "Creating: ",
    "No ratings adjustment done.",
    "Your seek matches one",
    "You are now observing",
    "(told ",
    "% ",
];

const CHATTER_MARKERS: &[&str] = &[" tells you: ", " kibitzes: ", "(U)(", "(TD)(", "(C)("];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Highlight {
    Plain,
    /// Game events and server notices.
    Notice,
    /// Tells, kibitzes and channel talk.
    Chatter,
}

impl Highlight {
    pub fn style(self) -> Style {
        match self {
            Highlight::Plain => Style::default(),
            Highlight::Notice => Style::default().fg(Color::Indexed(107)).bg(Color::Indexed(233)),
            Highlight::Chatter => Style::default().fg(Color::Indexed(245)).bg(Color::Indexed(233)),
        }
    }
}

/// Chatter outranks a notice prefix, so a tell that starts like a game
/// notice is still shown as chatter.
pub fn classify(line: &str) -> Highlight {
    if CHATTER_MARKERS.iter().any(|marker| line.contains(marker)) {
        Highlight::Chatter
    } else if NOTICE_PREFIXES.iter().any(|prefix| line.starts_with(prefix)) {
        Highlight::Notice
    } else {
        Highlight::Plain
    }
}

#[derive(Debug)]
pub struct Scrollback {
    lines: VecDeque<String>,
    capacity: usize,
}

impl Default for Scrollback {
    fn default() -> Self {
        Self::with_capacity(SCROLLBACK_LINES)
    }
}

impl Scrollback {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            lines: VecDeque::with_capacity(capacity.min(SCROLLBACK_LINES)),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, line: impl Into<String>) {
        if self.lines.len() == self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(line.into());
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// The newest `rows` lines, oldest first.
    pub fn tail(&self, rows: usize) -> impl Iterator<Item = &str> {
        let skip = self.lines.len().saturating_sub(rows);
        self.lines.iter().skip(skip).map(String::as_str)
    }
}

/// Draws the tail of a [`Scrollback`] so the newest line sits at the bottom.
pub struct LogWidget<'a> {
    scrollback: &'a Scrollback,
}

impl<'a> LogWidget<'a> {
    pub fn new(scrollback: &'a Scrollback) -> Self {
        Self { scrollback }
    }
}

impl Widget for LogWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        buf.set_style(area, Style::reset());
        let rows = area.height as usize;
        let shown = self.scrollback.len().min(rows);
        let top = area.y + (rows - shown) as u16;
        for (idx, text) in self.scrollback.tail(rows).enumerate() {
            let style = classify(text).style();
            let line = Line::styled(text.to_string(), style);
            let y = top + idx as u16;
            if style != Style::default() {
                buf.set_style(Rect::new(area.x, y, area.width, 1), style);
            }
            buf.set_line(area.x, y, &line, area.width);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_notices_and_chatter() {
        assert_eq!(classify("{Game 42 (alice vs. bob) Creating rated blitz match.}"), Highlight::Notice);
        assert_eq!(classify("You are now observing game 42."), Highlight::Notice);
        assert_eq!(classify("% "), Highlight::Notice);
        assert_eq!(classify("bob tells you: hi"), Highlight::Chatter);
        assert_eq!(classify("alice(C)(53): gg"), Highlight::Chatter);
        assert_eq!(classify("Welcome to the Free Internet Chess Server"), Highlight::Plain);
        assert_eq!(classify(" Game 1"), Highlight::Plain);
    }

    #[test]
    fn chatter_wins_over_a_notice_prefix() {
        assert_eq!(classify("Game 12: bob tells you: hi"), Highlight::Chatter);
        assert_eq!(classify("(told alice) (C)(53): hello"), Highlight::Chatter);
        assert_eq!(classify("Game 12: bob moves: e4"), Highlight::Notice);
    }

    #[test]
    fn scrollback_drops_the_oldest_line() {
        let mut scrollback = Scrollback::with_capacity(3);
        for n in 1..=5 {
            scrollback.push(format!("line {n}"));
        }
        assert_eq!(scrollback.len(), 3);
        let tail: Vec<_> = scrollback.tail(2).collect();
        assert_eq!(tail, vec!["line 4", "line 5"]);
        let all: Vec<_> = scrollback.tail(10).collect();
        assert_eq!(all, vec!["line 3", "line 4", "line 5"]);
    }

    #[test]
    fn newest_line_renders_at_the_bottom() {
        let mut scrollback = Scrollback::default();
        scrollback.push("first");
        scrollback.push("Game 7: bob moves: e4");

        let area = Rect::new(0, 0, 30, 4);
        let mut buf = Buffer::empty(area);
        LogWidget::new(&scrollback).render(area, &mut buf);

        assert_eq!(buf.content[buf.index_of(0, 1)].symbol(), " ");
        assert_eq!(buf.content[buf.index_of(0, 2)].symbol(), "f");
        let notice = &buf.content[buf.index_of(0, 3)];
        assert_eq!(notice.symbol(), "G");
        assert_eq!(notice.fg, Color::Indexed(107));
        assert_eq!(buf.content[buf.index_of(29, 3)].bg, Color::Indexed(233));
    }
}
