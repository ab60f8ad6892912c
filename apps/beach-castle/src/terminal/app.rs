use std::io;
use std::sync::Arc;

use crossterm::cursor::Show;
use crossterm::execute;
use crossterm::terminal::{
    Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode,
    enable_raw_mode,
};
use tracing::{debug, info, warn};

use crate::client::TerminalScreen;
use crate::pipeline::Supervisor;
use crate::telemetry::logging;
use crate::terminal::cli::Cli;
use crate::terminal::config::CLIENT_NAME;
use crate::terminal::error::CliError;
use crate::transport::Connection;

pub fn run(cli: Cli) -> Result<(), CliError> {
    let log_config = cli.logging.to_config();
    logging::init(&log_config)?;
    debug!(log_level = ?log_config.level, log_file = ?log_config.file, "logging configured");

    let session = cli.server.to_session_config();
    info!(host = %cli.server.host, port = cli.server.port, "connecting");
    let connection = Connection::connect(&cli.server.host, cli.server.port)?;

    let _guard = ScreenGuard::enter().map_err(CliError::Terminal)?;
    let screen = TerminalScreen::stdout(format!("♜ {CLIENT_NAME}")).map_err(CliError::Terminal)?;
    Supervisor::new(Arc::new(screen), session).run(connection)?;
    Ok(())
}

/// Raw mode on the alternate screen for as long as it lives.
struct ScreenGuard;

impl ScreenGuard {
    fn enter() -> io::Result<Self> {
        enable_raw_mode()?;
        let guard = ScreenGuard;
        execute!(io::stdout(), EnterAlternateScreen, Clear(ClearType::All))?;
        Ok(guard)
    }
}

impl Drop for ScreenGuard {
    fn drop(&mut self) {
        if let Err(err) = execute!(io::stdout(), Show, LeaveAlternateScreen) {
            warn!(error = %err, "failed to leave alternate screen");
        }
        if let Err(err) = disable_raw_mode() {
            warn!(error = %err, "failed to disable raw mode");
        }
    }
}
