//! The three-region terminal display.

pub mod board;
pub mod input;
pub mod log;
pub mod screen;

use std::io;

pub use screen::{Regions, Screen, TerminalScreen};

use crate::pipeline::Shutdown;
use crate::session::GameView;
use crate::session::handshake::Geometry;

/// The surface the pipeline renders to and reads operator commands from.
///
/// Implementations are shared between the render and input workers, so
/// every method takes `&self` and serializes per region internally.
pub trait Display: Send + Sync {
    /// Size of the scrollback region, advertised to the server.
    fn log_geometry(&self) -> Geometry;

    fn draw_board(&self, view: &GameView) -> io::Result<()>;

    fn append_log(&self, line: &str) -> io::Result<()>;

    /// Blocks until the operator submits a line. Returns `None` once
    /// `shutdown` is triggered.
    fn read_command(&self, shutdown: &Shutdown) -> io::Result<Option<String>>;

    /// Puts the terminal cursor back on the input line.
    fn park_cursor(&self) -> io::Result<()>;
}
