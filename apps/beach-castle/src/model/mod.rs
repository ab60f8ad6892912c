//! Board-level types shared by the decoder, the merger and the renderer.

use std::fmt;

pub const N_ROWS: usize = 8;
pub const N_COLS: usize = 8;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Color {
    White,
    Black,
}

impl Color {
    pub fn opponent(self) -> Self {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PieceKind {
    Pawn,
    Knight,
    Bishop,
    Rook,
    Queen,
    King,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Piece {
    pub kind: PieceKind,
    pub color: Color,
}

impl Piece {
    pub const fn new(kind: PieceKind, color: Color) -> Self {
        Self { kind, color }
    }

    /// Maps a Style12 board letter to a square occupant.
    ///
    /// Uppercase letters are white, lowercase black, `-` is an empty square.
    /// Anything outside that alphabet is handed back as the error.
    pub fn from_style12(ch: char) -> Result<Square, char> {
        let color = if ch.is_ascii_uppercase() {
            Color::White
        } else {
            Color::Black
        };
        let kind = match ch.to_ascii_lowercase() {
            '-' if ch == '-' => return Ok(None),
            'p' => PieceKind::Pawn,
            'n' => PieceKind::Knight,
            'b' => PieceKind::Bishop,
            'r' => PieceKind::Rook,
            'q' => PieceKind::Queen,
            'k' => PieceKind::King,
            _ => return Err(ch),
        };
        Ok(Some(Piece::new(kind, color)))
    }

    pub fn letter(self) -> char {
        let lower = match self.kind {
            PieceKind::Pawn => 'p',
            PieceKind::Knight => 'n',
            PieceKind::Bishop => 'b',
            PieceKind::Rook => 'r',
            PieceKind::Queen => 'q',
            PieceKind::King => 'k',
        };
        match self.color {
            Color::White => lower.to_ascii_uppercase(),
            Color::Black => lower,
        }
    }

    pub fn glyph(self) -> &'static str {
        match (self.color, self.kind) {
            (Color::Black, PieceKind::Rook) => "♜",
            (Color::Black, PieceKind::Knight) => "♞",
            (Color::Black, PieceKind::Bishop) => "♝",
            (Color::Black, PieceKind::Queen) => "♛",
            (Color::Black, PieceKind::King) => "♚",
            (Color::Black, PieceKind::Pawn) => "♟",
            (Color::White, PieceKind::Rook) => "♖",
            (Color::White, PieceKind::Knight) => "♘",
            (Color::White, PieceKind::Bishop) => "♗",
            (Color::White, PieceKind::Queen) => "♕",
            (Color::White, PieceKind::King) => "♔",
            (Color::White, PieceKind::Pawn) => "♙",
        }
    }
}

pub type Square = Option<Piece>;

/// 8x8 grid of squares, row 0 at the top of the display.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Board {
    cells: [[Square; N_COLS]; N_ROWS],
}

impl Board {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_rows(cells: [[Square; N_COLS]; N_ROWS]) -> Self {
        Self { cells }
    }

    pub fn get(&self, row: usize, col: usize) -> Square {
        self.cells[row][col]
    }

    pub fn set(&mut self, row: usize, col: usize, square: Square) {
        self.cells[row][col] = square;
    }

    /// Rotates the board by 180 degrees: reverse the row order, then reverse
    /// every row.
    pub fn rotated(&self) -> Self {
        let mut cells = self.cells;
        cells.reverse();
        for row in cells.iter_mut() {
            row.reverse();
        }
        Self { cells }
    }

    pub fn diff(&self, previous: &Board) -> DiffMask {
        let mut mask = DiffMask::clear();
        for row in 0..N_ROWS {
            for col in 0..N_COLS {
                mask.cells[row][col] = self.cells[row][col] != previous.cells[row][col];
            }
        }
        mask
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, row) in self.cells.iter().enumerate() {
            if idx > 0 {
                f.write_str("/")?;
            }
            for square in row {
                let ch = square.map(Piece::letter).unwrap_or('-');
                write!(f, "{ch}")?;
            }
        }
        Ok(())
    }
}

/// Cells whose occupant changed since the previous board.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DiffMask {
    cells: [[bool; N_COLS]; N_ROWS],
}

impl DiffMask {
    pub fn clear() -> Self {
        Self::default()
    }

    pub fn is_changed(&self, row: usize, col: usize) -> bool {
        self.cells[row][col]
    }

    pub fn is_clear(&self) -> bool {
        self.cells.iter().flatten().all(|changed| !changed)
    }

    pub fn changed(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.cells.iter().enumerate().flat_map(|(row, cols)| {
            cols.iter()
                .enumerate()
                .filter(|(_, changed)| **changed)
                .map(move |(col, _)| (row, col))
        })
    }
}

/// The viewer's relation to the game a Style12 line describes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Relation {
    Isolated,
    ObservingExamination,
    Examining,
    PlayingOpponentsMove,
    PlayingMyMove,
    Observing,
}

impl Relation {
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            -3 => Some(Relation::Isolated),
            -2 => Some(Relation::ObservingExamination),
            2 => Some(Relation::Examining),
            -1 => Some(Relation::PlayingOpponentsMove),
            1 => Some(Relation::PlayingMyMove),
            0 => Some(Relation::Observing),
            _ => None,
        }
    }

    pub fn code(self) -> i32 {
        match self {
            Relation::Isolated => -3,
            Relation::ObservingExamination => -2,
            Relation::Examining => 2,
            Relation::PlayingOpponentsMove => -1,
            Relation::PlayingMyMove => 1,
            Relation::Observing => 0,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Relation::Isolated => "isolated",
            Relation::ObservingExamination => "observing examination",
            Relation::Examining => "examining",
            Relation::PlayingOpponentsMove | Relation::PlayingMyMove => "playing",
            Relation::Observing => "observing",
        }
    }
}

/// The `t=` value of a GameInfo record, kept verbatim. Only the first letter
/// picks a glyph.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GameType {
    name: String,
}

impl GameType {
    pub fn parse(value: &str) -> Option<Self> {
        if value.is_empty() {
            return None;
        }
        Some(Self {
            name: value.to_string(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn glyph(&self) -> Option<&'static str> {
        match self.name.chars().next()? {
            'l' => Some("☇"),
            'b' => Some("⚒"),
            's' => Some("☎"),
            'u' => Some("∞"),
            _ => None,
        }
    }
}
