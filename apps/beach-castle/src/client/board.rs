use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Widget;

use crate::model::{N_COLS, N_ROWS};
use crate::session::{GameView, Player};

const LIGHT_SQUARE: Color = Color::Indexed(229);
const DARK_SQUARE: Color = Color::Indexed(209);
const PIECE_FG: Color = Color::Indexed(16);
const CHANGED_FG: Color = Color::Indexed(1);
const CHANGED_BG: Color = Color::Indexed(52);
const TO_MOVE: &str = "☚";

/// Rows the board region needs: title, game info, opponent, 8 ranks, me.
pub const BOARD_HEIGHT: u16 = 3 + N_ROWS as u16 + 1;

/// Formats a clock in milliseconds as `hh:mm:ss.mmm`. Negative clocks
/// (flagged players) show as zero.
pub fn format_clock(ms: i64) -> String {
    let ms = ms.max(0);
    let hours = ms / 3_600_000;
    let minutes = ms / 60_000 % 60;
    let seconds = ms / 1_000 % 60;
    let millis = ms % 1_000;
    format!("{hours:02}:{minutes:02}:{seconds:02}.{millis:03}")
}

pub fn info_line(view: &GameView) -> String {
    let kind = match &view.game_type {
        Some(kind) => match kind.glyph() {
            Some(glyph) => format!("{glyph} {}", kind.name()),
            None => kind.name().to_string(),
        },
        None => "unknown".to_string(),
    };
    let rated = if view.rated { "rated" } else { "unrated" };
    format!(
        "{} {kind} game #{}, {} +{} {rated}",
        view.mode_label(),
        view.game_number,
        view.initial_time,
        view.increment
    )
}

pub fn player_line(player: &Player, to_move: bool) -> String {
    let mut line = player.name.clone();
    if let Some(rating) = &player.rating {
        line.push_str(&format!(" ({rating})"));
    }
    line.push(' ');
    line.push_str(&format_clock(player.clock_ms));
    if to_move {
        line.push(' ');
        line.push_str(TO_MOVE);
    }
    line
}

/// Draws the status lines and the board of one [`GameView`].
pub struct BoardWidget<'a> {
    view: &'a GameView,
    title: &'a str,
}

impl<'a> BoardWidget<'a> {
    pub fn new(view: &'a GameView, title: &'a str) -> Self {
        Self { view, title }
    }

    fn lines(&self) -> Vec<Line<'static>> {
        let view = self.view;
        let mut lines = Vec::with_capacity(BOARD_HEIGHT as usize);
        lines.push(Line::from(Span::styled(
            self.title.to_string(),
            Style::default().add_modifier(Modifier::BOLD),
        )));
        lines.push(Line::from(info_line(view)));
        lines.push(Line::from(player_line(&view.opponent, !view.my_turn)));
        for row in 0..N_ROWS {
            lines.push(self.rank(row));
        }
        lines.push(Line::from(player_line(&view.me, view.my_turn)));
        lines
    }

    fn rank(&self, row: usize) -> Line<'static> {
        let spans: Vec<Span<'static>> = (0..N_COLS)
            .map(|col| {
                let glyph = self.view.board.get(row, col).map_or(" ", |piece| piece.glyph());
                Span::styled(format!(" {glyph} "), square_style(self.view, row, col))
            })
            .collect();
        Line::from(spans)
    }
}

fn square_style(view: &GameView, row: usize, col: usize) -> Style {
    if view.changed.is_changed(row, col) {
        return Style::default().fg(CHANGED_FG).bg(CHANGED_BG);
    }
    let bg = if (row + col) % 2 == 0 {
        LIGHT_SQUARE
    } else {
        DARK_SQUARE
    };
    Style::default().fg(PIECE_FG).bg(bg)
}

impl Widget for BoardWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        buf.set_style(area, Style::reset());
        for (idx, line) in self.lines().iter().enumerate().take(area.height as usize) {
            buf.set_line(area.x, area.y + idx as u16, line, area.width);
        }
    }
}
