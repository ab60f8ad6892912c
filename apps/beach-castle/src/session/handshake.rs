//! Guest login and first-time session configuration.
//!
//! FICS prints a fixed banner before its `login:` prompt and that prompt is
//! never terminated by `\r`, so the reader cannot see it. Instead the
//! sequencer counts lines since the connection opened: the line just
//! before the prompt triggers the login identity, the next one a blank
//! acknowledgment, and the one after that the configuration batch. The
//! ordinals match one specific banner length; if the server banner changes
//! the login desynchronizes silently.

use tracing::{debug, info};

/// Ordinal of the last banner line before the password prompt.
pub const DEFAULT_LOGIN_LINE: u64 = 26;

/// Bare prompt the server prints once `set prompt %` is active.
pub const PROMPT: &str = "%";
const LEGACY_PROMPT: &str = "fics%";
const BELL: char = '\u{7}';

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HandshakeState {
    AwaitingCredentials(u64),
    AwaitingBlankLine,
    SendingConfiguration,
    Streaming,
}

/// Size of the scrollback region, advertised to the server for paging.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Geometry {
    pub rows: u16,
    pub cols: u16,
}

#[derive(Clone, Debug)]
pub struct LoginConfig {
    pub login_line: u64,
    pub identity: String,
    pub interface: String,
}

impl Default for LoginConfig {
    fn default() -> Self {
        Self {
            login_line: DEFAULT_LOGIN_LINE,
            identity: "guest".to_string(),
            interface: crate::terminal::config::CLIENT_NAME.to_string(),
        }
    }
}

/// What to do with one inbound line.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Step {
    /// Messages for the server, in order, each terminated with `\n`.
    pub replies: Vec<String>,
    /// Whether the line should continue to the display.
    pub forward: bool,
}

#[derive(Debug)]
pub struct Handshake {
    config: LoginConfig,
    seen: u64,
    configured: bool,
}

impl Handshake {
    pub fn new(config: LoginConfig) -> Self {
        Self {
            config,
            seen: 0,
            configured: false,
        }
    }

    pub fn state(&self) -> HandshakeState {
        let login = self.config.login_line;
        if self.configured {
            HandshakeState::Streaming
        } else if self.seen < login {
            HandshakeState::AwaitingCredentials(self.seen)
        } else if self.seen == login {
            HandshakeState::AwaitingBlankLine
        } else {
            HandshakeState::SendingConfiguration
        }
    }

    pub fn is_configured(&self) -> bool {
        self.configured
    }

    pub fn lines_seen(&self) -> u64 {
        self.seen
    }

    /// Feeds the next line read from the server.
    pub fn observe(&mut self, line: &str, geometry: Geometry) -> Step {
        self.seen += 1;
        let login = self.config.login_line;

        if !self.configured {
            if self.seen == login {
                info!(target: "castle::handshake", line = self.seen, "sending login identity");
                return Step {
                    replies: vec![format!("{}\n", self.config.identity)],
                    forward: true,
                };
            }
            if self.seen == login + 1 {
                debug!(target: "castle::handshake", line = self.seen, "acknowledging login");
                return Step {
                    replies: vec!["\n\n".to_string()],
                    forward: true,
                };
            }
            if self.seen == login + 2 {
                self.configured = true;
                info!(
                    target: "castle::handshake",
                    line = self.seen,
                    rows = geometry.rows,
                    cols = geometry.cols,
                    "logged in; configuring session"
                );
                return Step {
                    replies: configuration_batch(geometry, &self.config.interface),
                    forward: true,
                };
            }
        }

        Step {
            replies: Vec::new(),
            forward: !is_noise(line),
        }
    }
}

/// Commands sent once after login, in wire order.
pub fn configuration_batch(geometry: Geometry, interface: &str) -> Vec<String> {
    [
        format!("set height {}", geometry.rows),
        format!("set width {}", geometry.cols),
        "iset nowrap 1".to_string(),
        "iset gameinfo 1".to_string(),
        "iset ms 1".to_string(),
        "-channel 53".to_string(),
        format!("set prompt {PROMPT}"),
        "set style 12".to_string(),
        "set seek 0".to_string(),
        "set bell off".to_string(),
        "set provshow 1".to_string(),
        format!("set interface {interface}"),
    ]
    .into_iter()
    .map(|command| command + "\n")
    .collect()
}

/// Bells and empty prompts carry no content.
pub fn is_noise(line: &str) -> bool {
    if line.starts_with(BELL) || line.starts_with("% \u{7}") || line.starts_with("% \n") {
        return true;
    }
    let bare = line.trim_end_matches(['\r', '\n']).trim_end();
    bare == PROMPT || bare == LEGACY_PROMPT
}
