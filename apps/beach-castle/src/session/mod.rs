//! Merges decoded records into one egocentric view of the current game.
//!
//! GameInfo and Style12 records arrive independently and describe the game
//! in white/black terms. [`SessionState`] folds both into a [`GameView`]
//! where everything is "mine" or "my opponent's", with my pieces drawn at
//! the bottom of the board, so the renderer never branches on color.

pub mod handshake;

use crate::model::{Board, Color, DiffMask, GameType, Relation};
use crate::protocol::{Castling, GameInfo, LastMove, Orientation, PerSide, Record, Style12};
use tracing::trace;

/// One side of the board as seen from the viewer's chair.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Player {
    pub name: String,
    pub castling: Castling,
    pub strength: i32,
    pub clock_ms: i64,
    pub rating: Option<String>,
    pub timeseal: Option<bool>,
    pub registered: Option<bool>,
}

/// The merged, perspective-normalized state of the game being displayed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GameView {
    pub game_number: u32,
    pub me: Player,
    pub opponent: Player,
    pub my_color: Color,
    pub my_turn: bool,
    pub relation: Option<Relation>,
    pub initial_time: u32,
    pub increment: u32,
    pub move_number: u32,
    pub halfmove_clock: u32,
    pub double_push_file: Option<u8>,
    pub last_move: Option<LastMove>,
    pub game_type: Option<GameType>,
    pub rated: bool,
    pub private: bool,
    pub partner_game: Option<u32>,
    /// My pieces are always on rows 6 and 7 at the start of a game.
    pub board: Board,
    pub changed: DiffMask,
}

impl Default for GameView {
    fn default() -> Self {
        Self {
            game_number: 0,
            me: Player::default(),
            opponent: Player::default(),
            my_color: Color::White,
            my_turn: false,
            relation: None,
            initial_time: 0,
            increment: 0,
            move_number: 0,
            halfmove_clock: 0,
            double_push_file: None,
            last_move: None,
            game_type: None,
            rated: false,
            private: false,
            partner_game: None,
            board: Board::empty(),
            changed: DiffMask::clear(),
        }
    }
}

impl GameView {
    pub fn mode_label(&self) -> &'static str {
        self.relation.map(Relation::label).unwrap_or("idle")
    }
}

/// Owner of the single in-flight [`GameView`].
///
/// Only the render worker holds one, so merging never needs a lock.
#[derive(Debug, Default)]
pub struct SessionState {
    view: GameView,
    previous: Board,
    metadata: Option<GameInfo>,
    boards_seen: u64,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> &GameView {
        &self.view
    }

    pub fn previous_board(&self) -> &Board {
        &self.previous
    }

    /// Whether a GameInfo record has been merged yet.
    pub fn has_metadata(&self) -> bool {
        self.metadata.is_some()
    }

    /// The latest GameInfo record, as sent.
    pub fn game_info(&self) -> Option<&GameInfo> {
        self.metadata.as_ref()
    }

    pub fn boards_seen(&self) -> u64 {
        self.boards_seen
    }

    pub fn apply(&mut self, record: &Record) {
        match record {
            Record::GameInfo(info) => self.apply_game_info(info),
            Record::Style12(board) => self.apply_style12(board),
            Record::Text(_) => {}
        }
    }

    pub fn apply_game_info(&mut self, info: &GameInfo) {
        self.view.game_type = Some(info.game_type.clone());
        self.view.rated = info.rated;
        self.view.private = info.private;
        self.view.partner_game = Some(info.partner_game).filter(|game| *game != 0);
        self.metadata = Some(info.clone());
        self.bind_metadata();
        trace!(
            target: "castle::session",
            game = info.game_number,
            white_rating = %info.ratings.white,
            black_rating = %info.ratings.black,
            "merged gameinfo"
        );
    }

    pub fn apply_style12(&mut self, record: &Style12) {
        self.previous = self.view.board;

        let (board, my_color) = match record.orientation {
            Orientation::BlackAtBottom => (record.board.rotated(), Color::Black),
            Orientation::WhiteAtBottom => (record.board, Color::White),
        };

        let (mine, theirs) = split_sides(record, my_color);
        let view = &mut self.view;
        view.board = board;
        view.my_color = my_color;
        view.my_turn = record.to_move == my_color;
        view.me.name = mine.name;
        view.me.castling = mine.castling;
        view.me.strength = mine.strength;
        view.me.clock_ms = mine.clock_ms;
        view.opponent.name = theirs.name;
        view.opponent.castling = theirs.castling;
        view.opponent.strength = theirs.strength;
        view.opponent.clock_ms = theirs.clock_ms;

        view.game_number = record.game_number;
        view.relation = Some(record.relation);
        view.initial_time = record.initial_time;
        view.increment = record.increment;
        view.move_number = record.move_number;
        view.halfmove_clock = record.halfmove_clock;
        view.double_push_file = record.double_push_file;
        view.last_move = Some(record.last_move.clone()).filter(|mv| !mv.is_none());

        // The first board has no baseline; an all-empty default would flag
        // every occupied square.
        view.changed = if self.boards_seen == 0 {
            DiffMask::clear()
        } else {
            view.board.diff(&self.previous)
        };

        self.boards_seen += 1;
        self.bind_metadata();
        trace!(
            target: "castle::session",
            game = record.game_number,
            my_color = ?my_color,
            changed = view_changed_count(&self.view),
            "merged style12"
        );
    }

    fn bind_metadata(&mut self) {
        let Some(info) = &self.metadata else {
            return;
        };
        let my_color = self.view.my_color;
        let (me, opponent) = (&mut self.view.me, &mut self.view.opponent);
        me.rating = Some(for_side(&info.ratings, my_color).clone());
        opponent.rating = Some(for_side(&info.ratings, my_color.opponent()).clone());
        me.timeseal = Some(*for_side(&info.timeseal, my_color));
        opponent.timeseal = Some(*for_side(&info.timeseal, my_color.opponent()));
        me.registered = Some(*for_side(&info.registered, my_color));
        opponent.registered = Some(*for_side(&info.registered, my_color.opponent()));
    }
}

fn for_side<T>(values: &PerSide<T>, color: Color) -> &T {
    match color {
        Color::White => &values.white,
        Color::Black => &values.black,
    }
}

fn split_sides(record: &Style12, my_color: Color) -> (Player, Player) {
    let white = Player {
        name: record.white_name.clone(),
        castling: record.white_castling,
        strength: record.white_strength,
        clock_ms: record.white_clock,
        ..Player::default()
    };
    let black = Player {
        name: record.black_name.clone(),
        castling: record.black_castling,
        strength: record.black_strength,
        clock_ms: record.black_clock,
        ..Player::default()
    };
    match my_color {
        Color::White => (white, black),
        Color::Black => (black, white),
    }
}

fn view_changed_count(view: &GameView) -> usize {
    view.changed.changed().count()
}
