//! Contract between the host and pluggable game descriptors.

use std::collections::BTreeMap;

use glam::Vec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::mesh::MeshSpec;
use crate::stage::{TableSpec, ZoomSpec};

/// Parameter values chosen by a player when joining.
pub type Parameters = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: String,
    pub username: String,
}

impl Player {
    pub fn new(id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
        }
    }
}

/// Attributes a descriptor assigned to a seated player (side, color...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preference {
    pub player_id: String,
    #[serde(flatten)]
    pub values: Parameters,
}

impl Preference {
    pub fn new(player_id: impl Into<String>) -> Self {
        Self {
            player_id: player_id.into(),
            values: Parameters::new(),
        }
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }
}

/// Game-state document shared between the host and the clients.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GameState {
    pub id: String,
    pub kind: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub meshes: Vec<MeshSpec>,
    pub players: Vec<Player>,
    pub preferences: Vec<Preference>,
}

impl GameState {
    pub fn new(id: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            ..Self::default()
        }
    }

    pub fn is_seated(&self, player_id: &str) -> bool {
        self.players.iter().any(|player| player.id == player_id)
    }

    pub fn preference(&self, player_id: &str) -> Option<&Preference> {
        self.preferences
            .iter()
            .find(|preference| preference.player_id == player_id)
    }

    /// Values already taken for a preference, in seating order.
    pub fn taken(&self, name: &str) -> Vec<&str> {
        self.preferences
            .iter()
            .filter_map(|preference| preference.get(name))
            .collect()
    }
}

/// Where a bag's content is laid out when the game starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Slot {
    pub bag: String,
    pub position: Vec3,
    /// Meshes drawn from the bag; everything left when absent.
    #[serde(default)]
    pub count: Option<usize>,
}

/// Initial content produced by [`GameDescriptor::build`].
#[derive(Debug, Clone, Default)]
pub struct GameSetup {
    pub meshes: Vec<MeshSpec>,
    /// Bag name to the ids of the meshes it holds.
    pub bags: BTreeMap<String, Vec<String>>,
    pub slots: Vec<Slot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterProperty {
    pub choices: Vec<String>,
    pub required: bool,
}

/// Choices a joining player must (or may) make.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterSchema {
    pub properties: BTreeMap<String, ParameterProperty>,
}

impl ParameterSchema {
    pub fn with_choice(mut self, name: impl Into<String>, choices: Vec<String>, required: bool) -> Self {
        self.properties
            .insert(name.into(), ParameterProperty { choices, required });
        self
    }
}

pub struct ParameterContext<'a> {
    pub game: &'a GameState,
    pub player: &'a Player,
}

/// Static facts about a game.
#[derive(Debug, Clone, PartialEq)]
pub struct DescriptorMetadata {
    pub min_seats: usize,
    pub max_seats: usize,
    /// Language code to localized title.
    pub locales: BTreeMap<String, String>,
    pub table_spec: TableSpec,
    pub zoom_spec: ZoomSpec,
}

impl DescriptorMetadata {
    pub fn title(&self, lang: &str) -> Option<&str> {
        self.locales.get(lang).map(String::as_str)
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum DescriptorError {
    #[error("all {max} seats are taken")]
    SeatsExhausted { max: usize },
    #[error("player {0} is already seated")]
    AlreadySeated(String),
    #[error("{value} is not a valid {name}")]
    InvalidParameter { name: String, value: String },
    #[error("malformed game: {0}")]
    Malformed(String),
}

/// A pluggable game: initial layout plus seating rules.
pub trait GameDescriptor {
    fn name(&self) -> &str;

    fn metadata(&self) -> DescriptorMetadata;

    fn build(&self) -> Result<GameSetup, DescriptorError>;

    /// Schema of the choices still open to `context.player`, if any.
    fn ask_for_parameters(&self, _context: &ParameterContext<'_>) -> Option<ParameterSchema> {
        None
    }

    /// Seats `player` and returns the updated game.
    fn add_player(
        &self,
        game: GameState,
        player: &Player,
        parameters: &Parameters,
    ) -> Result<GameState, DescriptorError>;
}

/// Checks the preconditions every descriptor shares before seating.
pub fn check_seat(game: &GameState, player: &Player, max_seats: usize) -> Result<(), DescriptorError> {
    if player.id.is_empty() {
        return Err(DescriptorError::Malformed("player without id".into()));
    }
    if game.is_seated(&player.id) {
        return Err(DescriptorError::AlreadySeated(player.id.clone()));
    }
    if game.players.len() >= max_seats {
        return Err(DescriptorError::SeatsExhausted { max: max_seats });
    }
    Ok(())
}
