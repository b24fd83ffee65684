use glam::Vec3;

use super::{choice_schema, locales, seat_with_side, SIDE, SIDES};
use crate::behaviors::BehaviorKind;
use crate::descriptor::{
    DescriptorError, DescriptorMetadata, GameDescriptor, GameSetup, GameState, ParameterContext,
    ParameterSchema, Parameters, Player,
};
use crate::mesh::{MeshKind, MeshSpec};
use crate::stage::{TableSpec, ZoomSpec};

const FILES: [char; 8] = ['a', 'b', 'c', 'd', 'e', 'f', 'g', 'h'];
const BACK_RANK: [&str; 8] = [
    "rook", "knight", "bishop", "queen", "king", "bishop", "knight", "rook",
];

pub struct Chess;

impl GameDescriptor for Chess {
    fn name(&self) -> &str {
        "chess"
    }

    fn metadata(&self) -> DescriptorMetadata {
        DescriptorMetadata {
            min_seats: 2,
            max_seats: 2,
            locales: locales(&[("en", "Chess"), ("fr", "Échecs")]),
            table_spec: TableSpec::default(),
            zoom_spec: ZoomSpec {
                min: 5.0,
                max: 40.0,
                initial: 16.0,
            },
        }
    }

    fn build(&self) -> Result<GameSetup, DescriptorError> {
        let mut board = MeshSpec::new("board", MeshKind::Board).with_texture("chess/board.png");
        board.dimensions = Some(Vec3::new(8.0, 0.1, 8.0));
        let y = 0.05 + MeshKind::Piece.default_dimensions().y / 2.0;

        let mut meshes = vec![board];
        for (side, back, front) in [(SIDES[0], 0, 1), (SIDES[1], 7, 6)] {
            for (file, name) in FILES.iter().zip(BACK_RANK) {
                meshes.push(piece(side, name, *file, back, y));
            }
            for file in FILES {
                meshes.push(piece(side, "pawn", file, front, y));
            }
        }
        Ok(GameSetup {
            meshes,
            ..GameSetup::default()
        })
    }

    fn ask_for_parameters(&self, context: &ParameterContext<'_>) -> Option<ParameterSchema> {
        choice_schema(context, SIDE, &SIDES)
    }

    fn add_player(
        &self,
        game: GameState,
        player: &Player,
        parameters: &Parameters,
    ) -> Result<GameState, DescriptorError> {
        seat_with_side(game, player, parameters, self.metadata().max_seats)
    }
}

fn piece(side: &str, name: &str, file: char, rank: usize, y: f32) -> MeshSpec {
    let column = (file as u8 - b'a') as f32;
    MeshSpec::new(format!("{side}-{name}-{file}"), MeshKind::Piece)
        .with_texture(format!("chess/{side}-{name}.png"))
        .at(Vec3::new(column - 3.5, y, rank as f32 - 3.5))
        .with_default_behaviors(&[BehaviorKind::Movable])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn thirty_two_unique_pieces() {
        let setup = Chess.build().unwrap();
        let ids: HashSet<&str> = setup.meshes.iter().map(|spec| spec.id.as_str()).collect();
        assert_eq!(ids.len(), 33);
        assert!(ids.contains("white-king-e"));
        assert!(ids.contains("black-queen-d"));
        assert!(ids.contains("black-pawn-h"));
    }

    #[test]
    fn requested_side_is_honoured() {
        let mut black = Parameters::new();
        black.insert(SIDE.into(), "black".into());
        let game = Chess
            .add_player(GameState::new("g", "chess"), &Player::new("ann", "Ann"), &black)
            .unwrap();
        let game = Chess
            .add_player(game, &Player::new("bob", "Bob"), &Parameters::new())
            .unwrap();
        assert_eq!(game.preference("ann").unwrap().get(SIDE), Some("black"));
        assert_eq!(game.preference("bob").unwrap().get(SIDE), Some("white"));
    }
}
