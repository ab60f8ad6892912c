use std::io::{self, Write};
use std::time::Duration;

use parking_lot::Mutex;
use ratatui::backend::{Backend, CrosstermBackend};
use ratatui::layout::Rect;
use ratatui::{Terminal, TerminalOptions, Viewport};
use tracing::trace;

use super::Display;
use super::board::BoardWidget;
use super::input::{Edit, InputWidget, KeySource, LineEditor, TerminalKeys};
use super::log::{LogWidget, Scrollback};
use crate::pipeline::Shutdown;
use crate::session::GameView;
use crate::session::handshake::Geometry;

/// How long one key poll may block before the shutdown token is rechecked.
pub const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Board and status on the top half, scrollback below it, one input row at
/// the bottom.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Regions {
    pub board: Rect,
    pub log: Rect,
    pub input: Rect,
}

impl Regions {
    pub fn split(area: Rect) -> Self {
        let board_height = area.height / 2;
        let input_height = (area.height - board_height).min(1);
        let log_height = area.height - board_height - input_height;
        Self {
            board: Rect::new(area.x, area.y, area.width, board_height),
            log: Rect::new(area.x, area.y + board_height, area.width, log_height),
            input: Rect::new(
                area.x,
                area.y + board_height + log_height,
                area.width,
                input_height,
            ),
        }
    }
}

/// Buffers one region's escape sequences and writes them to stdout in a
/// single locked write on flush, so output from different regions never
/// interleaves mid-sequence.
#[derive(Debug, Default)]
pub struct RegionWriter {
    pending: Vec<u8>,
}

impl Write for RegionWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.pending.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let mut stdout = io::stdout().lock();
        stdout.write_all(&self.pending)?;
        stdout.flush()?;
        self.pending.clear();
        Ok(())
    }
}

struct LogRegion<B: Backend> {
    terminal: Terminal<B>,
    scrollback: Scrollback,
}

impl<B: Backend> LogRegion<B> {
    fn redraw(&mut self) -> io::Result<()> {
        let scrollback = &self.scrollback;
        self.terminal
            .draw(|frame| frame.render_widget(LogWidget::new(scrollback), frame.area()))?;
        Ok(())
    }
}

struct InputRegion<B: Backend> {
    terminal: Terminal<B>,
    editor: LineEditor,
}

impl<B: Backend> InputRegion<B> {
    /// Draws the edit line and leaves the cursor after its text.
    fn redraw(&mut self) -> io::Result<()> {
        let editor = &self.editor;
        self.terminal.draw(|frame| {
            let area = frame.area();
            frame.render_widget(InputWidget::new(editor), area);
            frame.set_cursor_position((area.x + editor.cursor_column(area.width), area.y));
        })?;
        Ok(())
    }
}

/// Three independently locked regions of one terminal.
pub struct Screen<B: Backend, K> {
    regions: Regions,
    title: String,
    board: Mutex<Terminal<B>>,
    log: Mutex<LogRegion<B>>,
    input: Mutex<InputRegion<B>>,
    keys: K,
}

pub type TerminalScreen = Screen<CrosstermBackend<RegionWriter>, TerminalKeys>;

impl TerminalScreen {
    /// Builds a screen covering the whole controlling terminal.
    pub fn stdout(title: impl Into<String>) -> io::Result<Self> {
        let (cols, rows) = crossterm::terminal::size()?;
        Screen::new(
            Rect::new(0, 0, cols, rows),
            title,
            || CrosstermBackend::new(RegionWriter::default()),
            TerminalKeys,
        )
    }
}

impl<B: Backend, K: KeySource> Screen<B, K> {
    pub fn new(
        area: Rect,
        title: impl Into<String>,
        mut backend: impl FnMut() -> B,
        keys: K,
    ) -> io::Result<Self> {
        let regions = Regions::split(area);
        let region = |rect: Rect, backend: B| {
            Terminal::with_options(
                backend,
                TerminalOptions {
                    viewport: Viewport::Fixed(rect),
                },
            )
        };

        let screen = Self {
            regions,
            title: title.into(),
            board: Mutex::new(region(regions.board, backend())?),
            log: Mutex::new(LogRegion {
                terminal: region(regions.log, backend())?,
                scrollback: Scrollback::default(),
            }),
            input: Mutex::new(InputRegion {
                terminal: region(regions.input, backend())?,
                editor: LineEditor::default(),
            }),
            keys,
        };
        screen.log.lock().redraw()?;
        screen.input.lock().redraw()?;
        trace!(target: "castle::screen", ?regions, "screen ready");
        Ok(screen)
    }

    pub fn regions(&self) -> Regions {
        self.regions
    }
}

impl<B, K> Display for Screen<B, K>
where
    B: Backend + Send,
    K: KeySource,
{
    fn log_geometry(&self) -> Geometry {
        Geometry {
            rows: self.regions.log.height,
            cols: self.regions.log.width,
        }
    }

    fn draw_board(&self, view: &GameView) -> io::Result<()> {
        let mut terminal = self.board.lock();
        terminal.draw(|frame| {
            frame.render_widget(BoardWidget::new(view, &self.title), frame.area())
        })?;
        Ok(())
    }

    fn append_log(&self, line: &str) -> io::Result<()> {
        let mut log = self.log.lock();
        log.scrollback.push(line);
        log.redraw()
    }

    fn read_command(&self, shutdown: &Shutdown) -> io::Result<Option<String>> {
        while !shutdown.is_triggered() {
            let Some(key) = self.keys.poll_key(POLL_INTERVAL)? else {
                continue;
            };
            // Held per key so renders can park the cursor between presses.
            let mut input = self.input.lock();
            let edit = input.editor.handle(key);
            input.redraw()?;
            if let Edit::Submit(line) = edit {
                return Ok(Some(line));
            }
        }
        Ok(None)
    }

    fn park_cursor(&self) -> io::Result<()> {
        self.input.lock().redraw()
    }
}
