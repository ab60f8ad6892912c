use super::{DecodeError, Fields, parse_flag};
use crate::model::{Board, Color, N_COLS, N_ROWS, Piece, Relation, Square};

const ROW_FIELDS: [&str; N_ROWS] = [
    "row 1", "row 2", "row 3", "row 4", "row 5", "row 6", "row 7", "row 8",
];

/// Which side the server draws at the bottom of the board.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Orientation {
    WhiteAtBottom,
    BlackAtBottom,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Castling {
    pub short: bool,
    pub long: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LastMove {
    pub verbose: String,
    pub elapsed: String,
    pub pretty: String,
}

impl LastMove {
    pub fn is_none(&self) -> bool {
        self.verbose == "none" && self.pretty == "none"
    }
}

/// A decoded `<12>` line, still in the server's white/black terms.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Style12 {
    /// Rows exactly as sent: row 0 is the first row on the wire.
    pub board: Board,
    pub to_move: Color,
    pub double_push_file: Option<u8>,
    pub white_castling: Castling,
    pub black_castling: Castling,
    pub halfmove_clock: u32,
    pub game_number: u32,
    pub white_name: String,
    pub black_name: String,
    pub relation: Relation,
    pub initial_time: u32,
    pub increment: u32,
    pub white_strength: i32,
    pub black_strength: i32,
    pub white_clock: i64,
    pub black_clock: i64,
    pub move_number: u32,
    pub last_move: LastMove,
    pub orientation: Orientation,
    pub clock_ticking: Option<bool>,
    pub lag_ms: Option<u32>,
}

pub(super) fn decode(input: &str) -> Result<Style12, DecodeError> {
    let mut fields = Fields::new(input);

    let mut cells: [[Square; N_COLS]; N_ROWS] = [[None; N_COLS]; N_ROWS];
    for (row, field) in ROW_FIELDS.iter().enumerate() {
        let token = fields.next(field)?;
        cells[row] = decode_row(row, token)?;
    }

    let to_move = match fields.next("side to move")? {
        "W" => Color::White,
        "B" => Color::Black,
        other => {
            return Err(DecodeError::BadTurn {
                token: other.to_string(),
            });
        }
    };
    let double_push: i32 = fields.number("double push file")?;
    let double_push_file = u8::try_from(double_push).ok().filter(|file| *file < 8);

    let white_castling = Castling {
        short: fields.flag("white castle short")?,
        long: fields.flag("white castle long")?,
    };
    let black_castling = Castling {
        short: fields.flag("black castle short")?,
        long: fields.flag("black castle long")?,
    };

    let halfmove_clock = fields.number("irreversible move count")?;
    let game_number = fields.number("game number")?;
    let white_name = fields.next("white name")?.to_string();
    let black_name = fields.next("black name")?.to_string();

    let code: i32 = fields.number("relation")?;
    let relation = Relation::from_code(code).ok_or(DecodeError::UnknownRelation { code })?;

    let initial_time = fields.number("initial time")?;
    let increment = fields.number("increment")?;
    let white_strength = fields.number("white strength")?;
    let black_strength = fields.number("black strength")?;
    let white_clock = fields.number("white clock")?;
    let black_clock = fields.number("black clock")?;
    let move_number = fields.number("move number")?;

    let last_move = LastMove {
        verbose: fields.next("verbose move")?.to_string(),
        elapsed: fields.next("move time")?.to_string(),
        pretty: fields.next("pretty move")?.to_string(),
    };

    let orientation = if fields.flag("flip")? {
        Orientation::BlackAtBottom
    } else {
        Orientation::WhiteAtBottom
    };

    // Newer servers append fields; only read them when they are well formed.
    let clock_ticking = fields
        .optional()
        .and_then(|token| parse_flag("clock ticking", token).ok());
    let lag_ms = fields.optional().and_then(|token| token.parse().ok());

    Ok(Style12 {
        board: Board::from_rows(cells),
        to_move,
        double_push_file,
        white_castling,
        black_castling,
        halfmove_clock,
        game_number,
        white_name,
        black_name,
        relation,
        initial_time,
        increment,
        white_strength,
        black_strength,
        white_clock,
        black_clock,
        move_number,
        last_move,
        orientation,
        clock_ticking,
        lag_ms,
    })
}

fn decode_row(row: usize, token: &str) -> Result<[Square; N_COLS], DecodeError> {
    if token.chars().count() != N_COLS {
        return Err(DecodeError::BadRow {
            row,
            token: token.to_string(),
        });
    }
    let mut squares = [None; N_COLS];
    for (col, letter) in token.chars().enumerate() {
        squares[col] =
            Piece::from_style12(letter).map_err(|letter| DecodeError::UnknownPiece { row, letter })?;
    }
    Ok(squares)
}
