use super::{DecodeError, Fields, parse_flag, parse_number};
use crate::model::GameType;

/// A value the server reports once for white and once for black.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PerSide<T> {
    pub white: T,
    pub black: T,
}

/// A decoded `<g1>` line.
///
/// Example: `<g1> 77 p=0 t=lightning r=1 u=0,0 it=60,0 i=60,0 pt=0 rt=1880,1789 ts=1,1 m=2 n=1`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GameInfo {
    pub game_number: u32,
    pub private: bool,
    pub game_type: GameType,
    pub rated: bool,
    pub registered: PerSide<bool>,
    pub initial_time: PerSide<u32>,
    pub initial_increment: PerSide<u32>,
    pub partner_game: u32,
    /// Kept as sent, since provisional ratings carry a suffix such as `1500P`.
    pub ratings: PerSide<String>,
    pub timeseal: PerSide<bool>,
}

pub(super) fn decode(input: &str) -> Result<GameInfo, DecodeError> {
    let mut fields = Fields::new(input);

    let game_number = fields.number("game number")?;
    let private = parse_flag("p", keyed(&mut fields, "p")?)?;

    let type_value = keyed(&mut fields, "t")?;
    let game_type = GameType::parse(type_value).ok_or(DecodeError::EmptyType)?;

    let rated = parse_flag("r", keyed(&mut fields, "r")?)?;

    let (white, black) = pair(&mut fields, "u")?;
    let registered = PerSide {
        white: parse_flag("u", white)?,
        black: parse_flag("u", black)?,
    };

    let (white, black) = pair(&mut fields, "it")?;
    let initial_time = PerSide {
        white: parse_number("it", white)?,
        black: parse_number("it", black)?,
    };

    let (white, black) = pair(&mut fields, "i")?;
    let initial_increment = PerSide {
        white: parse_number("i", white)?,
        black: parse_number("i", black)?,
    };

    let partner_game = parse_number("pt", keyed(&mut fields, "pt")?)?;

    let (white, black) = pair(&mut fields, "rt")?;
    let ratings = PerSide {
        white: white.to_string(),
        black: black.to_string(),
    };

    let (white, black) = pair(&mut fields, "ts")?;
    let timeseal = PerSide {
        white: parse_flag("ts", white)?,
        black: parse_flag("ts", black)?,
    };

    // Anything after `ts=` is a newer field this client does not use.
    Ok(GameInfo {
        game_number,
        private,
        game_type,
        rated,
        registered,
        initial_time,
        initial_increment,
        partner_game,
        ratings,
        timeseal,
    })
}

/// Pulls the next `key=value` token and returns the value.
fn keyed<'a>(fields: &mut Fields<'a>, key: &'static str) -> Result<&'a str, DecodeError> {
    let token = fields.next(key)?;
    match token.split_once('=') {
        Some((found, value)) if found == key => Ok(value),
        _ => Err(DecodeError::UnexpectedKey {
            expected: key,
            token: token.to_string(),
        }),
    }
}

/// Pulls the next `key=white,black` token.
fn pair<'a>(fields: &mut Fields<'a>, key: &'static str) -> Result<(&'a str, &'a str), DecodeError> {
    let value = keyed(fields, key)?;
    let mut parts = value.split(',');
    let white = parts.next().filter(|part| !part.is_empty());
    let black = parts.next().filter(|part| !part.is_empty());
    match (white, black) {
        (Some(white), Some(black)) => Ok((white, black)),
        _ => Err(DecodeError::MissingField { field: key }),
    }
}
