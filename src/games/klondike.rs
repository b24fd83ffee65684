use std::collections::BTreeMap;
use std::f32::consts::PI;

use glam::Vec3;

use super::locales;
use crate::behaviors::{
    Anchor, AnchorBehavior, Behavior, BehaviorKind, DetailBehavior, FlipBehavior,
};
use crate::descriptor::{
    check_seat, DescriptorError, DescriptorMetadata, GameDescriptor, GameSetup, GameState,
    Parameters, Player, Preference, Slot,
};
use crate::mesh::{MeshKind, MeshSpec};
use crate::stage::{TableSpec, ZoomSpec};

const SUITS: [&str; 4] = ["hearts", "diamonds", "clubs", "spades"];
const COLUMNS: usize = 7;
const SPACING: f32 = 3.5;
const DECK: &str = "cards";

/// Solitaire: a shuffled deck dealt into seven columns and a stock.
pub struct Klondike;

impl GameDescriptor for Klondike {
    fn name(&self) -> &str {
        "klondike"
    }

    fn metadata(&self) -> DescriptorMetadata {
        DescriptorMetadata {
            min_seats: 1,
            max_seats: 1,
            locales: locales(&[("en", "Klondike"), ("fr", "Solitaire")]),
            table_spec: TableSpec::default(),
            zoom_spec: ZoomSpec {
                min: 10.0,
                max: 60.0,
                initial: 30.0,
            },
        }
    }

    fn build(&self) -> Result<GameSetup, DescriptorError> {
        let card = MeshKind::Card.default_dimensions();
        let y = card.y / 2.0;
        let mut meshes = Vec::with_capacity(53);
        let mut deck = Vec::with_capacity(52);

        for suit in SUITS {
            for rank in 1..=13 {
                let id = format!("{suit}-{rank}");
                let mut spec = MeshSpec::new(id.clone(), MeshKind::Card)
                    .with_texture(format!("cards/{id}.png"))
                    .with_default_behaviors(&[
                        BehaviorKind::Movable,
                        BehaviorKind::Rotatable,
                        BehaviorKind::Stackable,
                    ])
                    .with_behavior(Behavior::Flip(FlipBehavior {
                        is_flipped: true,
                        ..FlipBehavior::default()
                    }))
                    .with_behavior(Behavior::Detail(DetailBehavior {
                        front: format!("cards/{id}.png"),
                        back: Some("cards/back.png".into()),
                    }));
                spec.rotation = Vec3::new(0.0, 0.0, PI);
                meshes.push(spec);
                deck.push(id);
            }
        }

        let foundations: Vec<Anchor> = (0..SUITS.len())
            .map(|rank| {
                let offset = Vec3::new((rank as f32 - 1.5) * SPACING, 0.0, 0.0);
                Anchor::new(format!("foundation-{}", rank + 1), offset, card.x, card.z)
            })
            .collect();
        let mut mat = MeshSpec::new("foundations", MeshKind::Board)
            .at(Vec3::new(column(4) + SPACING / 2.0, -0.02, -6.0))
            .with_behavior(Behavior::Anchor(AnchorBehavior {
                anchors: foundations,
            }));
        mat.dimensions = Some(Vec3::new(SPACING * 4.0, 0.01, card.z + 1.0));
        meshes.push(mat);

        let mut slots: Vec<Slot> = (0..COLUMNS)
            .map(|col| Slot {
                bag: DECK.into(),
                position: Vec3::new(column(col), y, 0.0),
                count: Some(col + 1),
            })
            .collect();
        slots.push(Slot {
            bag: DECK.into(),
            position: Vec3::new(column(0), y, -6.0),
            count: None,
        });

        Ok(GameSetup {
            meshes,
            bags: BTreeMap::from([(DECK.to_string(), deck)]),
            slots,
        })
    }

    fn add_player(
        &self,
        mut game: GameState,
        player: &Player,
        _parameters: &Parameters,
    ) -> Result<GameState, DescriptorError> {
        check_seat(&game, player, self.metadata().max_seats)?;
        game.players.push(player.clone());
        game.preferences.push(Preference::new(player.id.clone()));
        Ok(game)
    }
}

fn column(index: usize) -> f32 {
    (index as f32 - (COLUMNS as f32 - 1.0) / 2.0) * SPACING
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::Mesh;

    #[test]
    fn full_deck_in_one_bag() {
        let setup = Klondike.build().unwrap();
        assert_eq!(setup.bags[DECK].len(), 52);
        assert_eq!(setup.slots.len(), COLUMNS + 1);
        let dealt: usize = setup.slots.iter().filter_map(|slot| slot.count).sum();
        assert_eq!(dealt, 28);
    }

    #[test]
    fn cards_start_face_down_and_build_into_meshes() {
        let setup = Klondike.build().unwrap();
        for spec in setup.meshes {
            let mesh = Mesh::from_spec(spec).unwrap();
            if mesh.kind == MeshKind::Card {
                assert!(mesh.behaviors().flip().unwrap().is_flipped);
                assert!(mesh.behaviors().detail().is_some());
            } else {
                assert_eq!(mesh.behaviors().anchors().unwrap().anchors.len(), 4);
            }
        }
    }

    #[test]
    fn single_seat() {
        let game = Klondike
            .add_player(GameState::new("g", "klondike"), &Player::new("a", "A"), &Parameters::new())
            .unwrap();
        assert!(Klondike
            .add_player(game, &Player::new("b", "B"), &Parameters::new())
            .is_err());
    }
}
