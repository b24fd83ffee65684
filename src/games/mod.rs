//! Game descriptors shipped with the crate.

mod chess;
mod draughts;
mod klondike;
mod sandbox;

use std::collections::BTreeMap;

pub use chess::Chess;
pub use draughts::Draughts;
pub use klondike::Klondike;
pub use sandbox::Sandbox;

use crate::descriptor::{
    check_seat, DescriptorError, GameState, ParameterContext, ParameterSchema, Parameters, Player,
    Preference,
};

pub(crate) const SIDE: &str = "side";
pub(crate) const SIDES: [&str; 2] = ["white", "black"];

pub(crate) fn locales(titles: &[(&str, &str)]) -> BTreeMap<String, String> {
    titles
        .iter()
        .map(|(lang, title)| (lang.to_string(), title.to_string()))
        .collect()
}

/// Choices of `choices` nobody seated in `game` picked for `name` yet.
pub(crate) fn free_choices<'a>(game: &GameState, name: &str, choices: &[&'a str]) -> Vec<&'a str> {
    let taken = game.taken(name);
    choices
        .iter()
        .copied()
        .filter(|choice| !taken.contains(choice))
        .collect()
}

/// Schema offering the free values of a single choice, `None` once exhausted.
pub(crate) fn choice_schema(
    context: &ParameterContext<'_>,
    name: &str,
    choices: &[&str],
) -> Option<ParameterSchema> {
    if context.game.is_seated(&context.player.id) {
        return None;
    }
    let free = free_choices(context.game, name, choices);
    if free.is_empty() {
        return None;
    }
    Some(ParameterSchema::default().with_choice(
        name,
        free.into_iter().map(str::to_string).collect(),
        false,
    ))
}

/// Value of `name` the joining player asked for, if any; it must be free.
fn requested<'p>(
    game: &GameState,
    parameters: &'p Parameters,
    name: &str,
    choices: &[&str],
) -> Result<Option<&'p str>, DescriptorError> {
    let Some(value) = parameters.get(name) else {
        return Ok(None);
    };
    if !choices.contains(&value.as_str()) || game.taken(name).contains(&value.as_str()) {
        return Err(DescriptorError::InvalidParameter {
            name: name.to_string(),
            value: value.clone(),
        });
    }
    Ok(Some(value))
}

/// Two-sided seating: the requested side if free, else the side opposite to
/// the ones already preferred, else white.
pub(crate) fn seat_with_side(
    mut game: GameState,
    player: &Player,
    parameters: &Parameters,
    max_seats: usize,
) -> Result<GameState, DescriptorError> {
    check_seat(&game, player, max_seats)?;
    let side = match requested(&game, parameters, SIDE, &SIDES)? {
        Some(side) => side.to_string(),
        None => opposite_side(&game).to_string(),
    };
    game.players.push(player.clone());
    game.preferences
        .push(Preference::new(player.id.clone()).with(SIDE, side));
    Ok(game)
}

fn opposite_side(game: &GameState) -> &'static str {
    let taken = game.taken(SIDE);
    match taken.first() {
        Some(&"white") => "black",
        Some(_) => "white",
        None => SIDES[0],
    }
}

/// Seating where each player may pick one of `choices`; the first free one
/// otherwise.
pub(crate) fn seat_with_choice(
    mut game: GameState,
    player: &Player,
    parameters: &Parameters,
    max_seats: usize,
    name: &str,
    choices: &[&str],
) -> Result<GameState, DescriptorError> {
    check_seat(&game, player, max_seats)?;
    let value = match requested(&game, parameters, name, choices)? {
        Some(value) => Some(value.to_string()),
        None => free_choices(&game, name, choices)
            .first()
            .map(|choice| choice.to_string()),
    };
    let mut preference = Preference::new(player.id.clone());
    if let Some(value) = value {
        preference = preference.with(name, value);
    }
    game.players.push(player.clone());
    game.preferences.push(preference);
    Ok(game)
}
