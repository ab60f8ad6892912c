use crate::session::handshake::LoginConfig;

/// Longest line the transport keeps, including its delimiter.
pub const MAX_LINE_SIZE: usize = 8192;

/// Operator input starting with this word ends the session.
pub const EXIT_COMMAND: &str = "quit";

/// Sent to the server with `set interface`.
pub const CLIENT_NAME: &str = concat!("beach-castle ", env!("CARGO_PKG_VERSION"));

pub const DEFAULT_HOST: &str = "freechess.org";
pub const DEFAULT_PORT: u16 = 23;

/// What to do with a protocol line that fails to decode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum DecodePolicy {
    /// Log a warning and show the raw line as text.
    #[default]
    Skip,
    /// Stop the session.
    Fatal,
}

/// Everything the pipeline needs besides its transport and display.
#[derive(Clone, Debug, Default)]
pub struct SessionConfig {
    pub login: LoginConfig,
    pub decode_errors: DecodePolicy,
}

pub fn is_exit_command(line: &str) -> bool {
    line.starts_with(EXIT_COMMAND)
}
