use glam::Vec3;

use super::{choice_schema, locales, seat_with_side, SIDE, SIDES};
use crate::behaviors::BehaviorKind;
use crate::descriptor::{
    DescriptorError, DescriptorMetadata, GameDescriptor, GameSetup, GameState, ParameterContext,
    ParameterSchema, Parameters, Player,
};
use crate::mesh::{MeshKind, MeshSpec};
use crate::stage::{TableSpec, ZoomSpec};

const SIZE: usize = 10;
const ROWS_PER_SIDE: usize = 4;

/// International draughts on a 10x10 board.
pub struct Draughts;

impl GameDescriptor for Draughts {
    fn name(&self) -> &str {
        "draughts"
    }

    fn metadata(&self) -> DescriptorMetadata {
        DescriptorMetadata {
            min_seats: 2,
            max_seats: 2,
            locales: locales(&[("en", "Draughts"), ("fr", "Dames")]),
            table_spec: TableSpec {
                texture: Some("textures/wood.png".into()),
                ..TableSpec::default()
            },
            zoom_spec: ZoomSpec {
                min: 5.0,
                max: 40.0,
                initial: 18.0,
            },
        }
    }

    fn build(&self) -> Result<GameSetup, DescriptorError> {
        let board = MeshSpec::new("board", MeshKind::Board).with_texture("draughts/board.png");
        let board_top = MeshKind::Board.default_dimensions().y / 2.0;
        let pawn_height = MeshKind::Pawn.default_dimensions().y;

        let mut meshes = vec![board];
        for (side, rows) in [(SIDES[0], 0..ROWS_PER_SIDE), (SIDES[1], SIZE - ROWS_PER_SIDE..SIZE)] {
            let mut count = 0;
            for row in rows {
                for col in (0..SIZE).filter(|col| (row + col) % 2 == 1) {
                    count += 1;
                    let position = Vec3::new(
                        cell(col),
                        board_top + pawn_height / 2.0,
                        cell(row),
                    );
                    meshes.push(
                        MeshSpec::new(format!("{side}-{count}"), MeshKind::Pawn)
                            .with_texture(format!("draughts/{side}.png"))
                            .at(position)
                            // stacking two pawns crowns them
                            .with_default_behaviors(&[BehaviorKind::Movable, BehaviorKind::Stackable]),
                    );
                }
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

fn cell(index: usize) -> f32 {
    index as f32 - (SIZE as f32 - 1.0) / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn twenty_pawns_per_side() {
        let setup = Draughts.build().unwrap();
        assert_eq!(setup.meshes.len(), 41);
        for side in SIDES {
            let pawns = setup
                .meshes
                .iter()
                .filter(|spec| spec.id.starts_with(side))
                .count();
            assert_eq!(pawns, 20);
        }
        assert!(setup
            .meshes
            .iter()
            .all(|spec| spec.position.x.abs() <= 4.5 && spec.position.z.abs() <= 4.5));
    }

    #[test]
    fn white_then_black() {
        let game = GameState::new("g1", "draughts");
        let none = Parameters::new();
        let mut white = Parameters::new();
        white.insert(SIDE.into(), "white".into());

        let game = Draughts
            .add_player(game, &Player::new("ann", "Ann"), &white)
            .unwrap();
        let bob = Player::new("bob", "Bob");
        let schema = Draughts
            .ask_for_parameters(&ParameterContext {
                game: &game,
                player: &bob,
            })
            .unwrap();
        assert_eq!(schema.properties[SIDE].choices, vec!["black".to_string()]);

        let game = Draughts.add_player(game, &bob, &none).unwrap();
        assert_eq!(game.preference("bob").unwrap().get(SIDE), Some("black"));
        assert_eq!(
            Draughts
                .add_player(game, &Player::new("cid", "Cid"), &none)
                .unwrap_err(),
            DescriptorError::SeatsExhausted { max: 2 }
        );
    }
}
