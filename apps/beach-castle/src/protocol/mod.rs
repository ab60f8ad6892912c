//! Decoder for the two machine-readable FICS record formats.
//!
//! A line starting with [`GAMEINFO_MARKER`] is a GameInfo record and a line
//! starting with [`STYLE12_MARKER`] is a Style12 board update; everything
//! else is plain server text. Decoding is pure and only checks structure.

mod gameinfo;
mod style12;

pub use gameinfo::{GameInfo, PerSide};
pub use style12::{Castling, LastMove, Orientation, Style12};

pub const STYLE12_MARKER: &str = "<12>";
pub const GAMEINFO_MARKER: &str = "<g1>";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Record {
    GameInfo(GameInfo),
    Style12(Box<Style12>),
    Text(String),
}

impl Record {
    pub fn kind(&self) -> &'static str {
        match self {
            Record::GameInfo(_) => "gameinfo",
            Record::Style12(_) => "style12",
            Record::Text(_) => "text",
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("missing field `{field}`")]
    MissingField { field: &'static str },
    #[error("field `{field}` is not a number: {token:?}")]
    InvalidNumber { field: &'static str, token: String },
    #[error("field `{field}` is not a 0/1 flag: {token:?}")]
    InvalidFlag { field: &'static str, token: String },
    #[error("unknown piece letter {letter:?} in row {row}")]
    UnknownPiece { row: usize, letter: char },
    #[error("board row {row} must be 8 squares wide: {token:?}")]
    BadRow { row: usize, token: String },
    #[error("expected `{expected}=` but found {token:?}")]
    UnexpectedKey { expected: &'static str, token: String },
    #[error("side to move must be W or B: {token:?}")]
    BadTurn { token: String },
    #[error("unknown relation code {code}")]
    UnknownRelation { code: i32 },
    #[error("game type is empty")]
    EmptyType,
}

/// Classifies one line read from the server.
pub fn decode(line: &str) -> Result<Record, DecodeError> {
    let line = trim_line(line);
    if let Some(rest) = line.strip_prefix(STYLE12_MARKER) {
        return style12::decode(rest).map(|record| Record::Style12(Box::new(record)));
    }
    if let Some(rest) = line.strip_prefix(GAMEINFO_MARKER) {
        return gameinfo::decode(rest).map(Record::GameInfo);
    }
    Ok(Record::Text(line.to_string()))
}

/// Strips the `\r` / `\n` framing the server wraps around every line.
pub fn trim_line(line: &str) -> &str {
    line.trim_matches(|ch| ch == '\r' || ch == '\n')
}

/// Positional whitespace tokenizer that names the field being pulled so
/// errors point at it.
struct Fields<'a> {
    inner: std::str::SplitAsciiWhitespace<'a>,
}

impl<'a> Fields<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            inner: input.split_ascii_whitespace(),
        }
    }

    fn next(&mut self, field: &'static str) -> Result<&'a str, DecodeError> {
        self.inner
            .next()
            .ok_or(DecodeError::MissingField { field })
    }

    fn optional(&mut self) -> Option<&'a str> {
        self.inner.next()
    }

    fn number<T: std::str::FromStr>(&mut self, field: &'static str) -> Result<T, DecodeError> {
        let token = self.next(field)?;
        parse_number(field, token)
    }

    fn flag(&mut self, field: &'static str) -> Result<bool, DecodeError> {
        let token = self.next(field)?;
        parse_flag(field, token)
    }
}

fn parse_number<T: std::str::FromStr>(field: &'static str, token: &str) -> Result<T, DecodeError> {
    token.parse().map_err(|_| DecodeError::InvalidNumber {
        field,
        token: token.to_string(),
    })
}

fn parse_flag(field: &'static str, token: &str) -> Result<bool, DecodeError> {
    match token {
        "0" => Ok(false),
        "1" => Ok(true),
        _ => Err(DecodeError::InvalidFlag {
            field,
            token: token.to_string(),
        }),
    }
}
