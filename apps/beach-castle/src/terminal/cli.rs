use clap::{Args, Parser};
use std::path::PathBuf;

use crate::session::handshake::{DEFAULT_LOGIN_LINE, LoginConfig};
use crate::telemetry::logging::{LogConfig, LogLevel};
use crate::terminal::config::{
    CLIENT_NAME, DEFAULT_HOST, DEFAULT_PORT, DecodePolicy, SessionConfig,
};

#[derive(Parser, Debug)]
#[command(
    name = "beach-castle",
    about = "♜  Play and observe chess on FICS from the terminal",
    author,
    version
)]
pub struct Cli {
    #[command(flatten)]
    pub server: ServerArgs,

    #[command(flatten)]
    pub logging: LoggingArgs,
}

#[derive(Args, Debug, Clone)]
pub struct ServerArgs {
    #[arg(
        long,
        env = "CASTLE_HOST",
        default_value = DEFAULT_HOST,
        help = "Chess server host name"
    )]
    pub host: String,

    #[arg(
        long,
        env = "CASTLE_PORT",
        default_value_t = DEFAULT_PORT,
        help = "Chess server port"
    )]
    pub port: u16,

    #[arg(
        long,
        env = "CASTLE_HANDLE",
        default_value = "guest",
        help = "Login identity sent at the login prompt"
    )]
    pub handle: String,

    #[arg(
        long = "login-line",
        env = "CASTLE_LOGIN_LINE",
        default_value_t = DEFAULT_LOGIN_LINE,
        value_name = "N",
        value_parser = clap::value_parser!(u64).range(1..),
        help = "Ordinal of the banner line after which the login identity is sent"
    )]
    pub login_line: u64,

    #[arg(
        long = "decode-errors",
        value_enum,
        env = "CASTLE_DECODE_ERRORS",
        default_value_t = DecodePolicy::Skip,
        help = "How to treat protocol lines that fail to decode"
    )]
    pub decode_errors: DecodePolicy,
}

impl ServerArgs {
    pub fn to_session_config(&self) -> SessionConfig {
        SessionConfig {
            login: LoginConfig {
                login_line: self.login_line,
                identity: self.handle.clone(),
                interface: CLIENT_NAME.to_string(),
            },
            decode_errors: self.decode_errors,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct LoggingArgs {
    #[arg(
        long = "log-level",
        value_enum,
        env = "CASTLE_LOG_LEVEL",
        default_value_t = LogLevel::Warn,
        help = "Minimum log level (error, warn, info, debug, trace)"
    )]
    pub level: LogLevel,

    #[arg(
        long = "log-file",
        value_name = "PATH",
        env = "CASTLE_LOG_FILE",
        help = "Write structured logs to the specified file"
    )]
    pub file: Option<PathBuf>,
}

impl LoggingArgs {
    pub fn to_config(&self) -> LogConfig {
        LogConfig {
            level: self.level,
            file: self.file.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn flags_override_defaults() {
        let cli = Cli::try_parse_from([
            "beach-castle",
            "--host",
            "localhost",
            "--port",
            "5000",
            "--handle",
            "alice",
            "--login-line",
            "3",
            "--decode-errors",
            "fatal",
            "--log-level",
            "debug",
        ])
        .expect("parse");

        assert_eq!(cli.server.host, "localhost");
        assert_eq!(cli.server.port, 5000);
        let config = cli.server.to_session_config();
        assert_eq!(config.login.identity, "alice");
        assert_eq!(config.login.login_line, 3);
        assert_eq!(config.decode_errors, DecodePolicy::Fatal);
        assert_eq!(cli.logging.to_config().level, LogLevel::Debug);
        assert!(cli.logging.to_config().file.is_none());
    }

    #[test]
    fn login_line_must_be_positive() {
        let err = Cli::try_parse_from(["beach-castle", "--login-line", "0"])
            .expect_err("zero is rejected");
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
        assert!(Cli::try_parse_from(["beach-castle", "--login-line", "1"]).is_ok());
    }
}
