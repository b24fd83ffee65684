use anyhow::Result;

use super::{choice_schema, locales, seat_with_choice};
use crate::descriptor::{
    DescriptorError, DescriptorMetadata, GameDescriptor, GameSetup, GameState, ParameterContext,
    ParameterSchema, Parameters, Player,
};
use crate::layout::parse_layout;
use crate::mesh::MeshSpec;
use crate::stage::{TableSpec, ZoomSpec};

const COLOR: &str = "color";
const COLORS: [&str; 8] = [
    "red", "blue", "green", "yellow", "purple", "orange", "cyan", "pink",
];

/// Free-form table whose meshes come from a layout file.
pub struct Sandbox {
    name: String,
    meshes: Vec<MeshSpec>,
}

impl Sandbox {
    pub fn new(name: impl Into<String>, meshes: Vec<MeshSpec>) -> Self {
        Self {
            name: name.into(),
            meshes,
        }
    }

    pub fn from_layout_xml(name: impl Into<String>, xml: &str) -> Result<Self> {
        Ok(Self::new(name, parse_layout(xml)?))
    }
}

impl GameDescriptor for Sandbox {
    fn name(&self) -> &str {
        &self.name
    }

    fn metadata(&self) -> DescriptorMetadata {
        DescriptorMetadata {
            min_seats: 1,
            max_seats: COLORS.len(),
            locales: locales(&[("en", "Sandbox"), ("fr", "Bac à sable")]),
            table_spec: TableSpec::default(),
            zoom_spec: ZoomSpec::default(),
        }
    }

    fn build(&self) -> Result<GameSetup, DescriptorError> {
        Ok(GameSetup {
            meshes: self.meshes.clone(),
            ..GameSetup::default()
        })
    }

    fn ask_for_parameters(&self, context: &ParameterContext<'_>) -> Option<ParameterSchema> {
        choice_schema(context, COLOR, &COLORS)
    }

    fn add_player(
        &self,
        game: GameState,
        player: &Player,
        parameters: &Parameters,
    ) -> Result<GameState, DescriptorError> {
        seat_with_choice(
            game,
            player,
            parameters,
            self.metadata().max_seats,
            COLOR,
            &COLORS,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LAYOUT: &str = r#"
        <layout>
            <mesh><id>die</id><shape>die</shape><behaviors>movable randomizable</behaviors></mesh>
            <mesh><id>token</id><shape>token</shape><position>2 0 0</position></mesh>
        </layout>
    "#;

    #[test]
    fn layout_becomes_the_setup() {
        let sandbox = Sandbox::from_layout_xml("demo", LAYOUT).unwrap();
        assert_eq!(sandbox.name(), "demo");
        let setup = sandbox.build().unwrap();
        assert_eq!(setup.meshes.len(), 2);
        assert!(Sandbox::from_layout_xml("broken", "<layout>").is_err());
    }

    #[test]
    fn colors_are_handed_out_in_order() {
        let sandbox = Sandbox::new("demo", Vec::new());
        let mut pick = Parameters::new();
        pick.insert(COLOR.into(), "blue".into());
        let game = sandbox
            .add_player(GameState::new("g", "demo"), &Player::new("a", "A"), &pick)
            .unwrap();
        let game = sandbox
            .add_player(game, &Player::new("b", "B"), &Parameters::new())
            .unwrap();
        assert_eq!(game.taken(COLOR), vec!["blue", "red"]);

        let c = Player::new("c", "C");
        let schema = sandbox
            .ask_for_parameters(&ParameterContext { game: &game, player: &c })
            .unwrap();
        assert_eq!(schema.properties[COLOR].choices.len(), 6);
        assert!(!schema.properties[COLOR].choices.contains(&"blue".to_string()));
    }
}
