//! Registry of game descriptors and the host side of a running game.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use log::{debug, error, info};
use rand::seq::SliceRandom;
use rand::Rng;
use thiserror::Error;

use crate::descriptor::{
    DescriptorError, DescriptorMetadata, GameDescriptor, GameSetup, GameState, ParameterContext,
    ParameterSchema, Parameters, Player,
};
use crate::games::{Chess, Draughts, Klondike};
use crate::mesh::MeshSpec;
use crate::render_loop::panic_message;

/// Vertical space between meshes dealt onto the same slot.
const SLOT_GAP: f32 = 0.01;

#[derive(Debug, Error, PartialEq)]
pub enum SessionError {
    #[error("no game named {0}")]
    UnknownGame(String),
    #[error("game {game_id} is halted: {reason}")]
    Halted { game_id: String, reason: String },
    #[error(transparent)]
    Descriptor(#[from] DescriptorError),
    #[error("game descriptor panicked: {0}")]
    Panicked(String),
}

#[derive(Default)]
pub struct Catalog {
    descriptors: BTreeMap<String, Arc<dyn GameDescriptor>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog with the games shipped in this crate.
    pub fn builtin() -> Self {
        let mut catalog = Self::new();
        catalog.register(Draughts);
        catalog.register(Chess);
        catalog.register(Klondike);
        catalog
    }

    /// Adds a descriptor, replacing any other one with the same name.
    pub fn register<D: GameDescriptor + 'static>(&mut self, descriptor: D) {
        let name = descriptor.name().to_string();
        if self
            .descriptors
            .insert(name.clone(), Arc::new(descriptor))
            .is_some()
        {
            debug!("replaced game descriptor {name}");
        }
    }

    pub fn names(&self) -> Vec<&str> {
        self.descriptors.keys().map(String::as_str).collect()
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn GameDescriptor>> {
        self.descriptors.get(name).cloned()
    }

    /// Builds a new game of `name` with its bags dealt onto their slots.
    pub fn create_session<R: Rng + ?Sized>(
        &self,
        name: &str,
        rng: &mut R,
    ) -> Result<GameSession, SessionError> {
        let descriptor = self
            .get(name)
            .ok_or_else(|| SessionError::UnknownGame(name.to_string()))?;
        let setup = descriptor.build()?;
        let mut state = GameState::new(format!("{name}-{:08x}", rng.random::<u32>()), name);
        state.meshes = instantiate(setup, rng)?;
        info!("created {} with {} meshes", state.id, state.meshes.len());
        Ok(GameSession::new(descriptor, state))
    }
}

/// Deals every slot from its (shuffled) bag and returns the resulting meshes.
pub fn instantiate<R: Rng + ?Sized>(
    setup: GameSetup,
    rng: &mut R,
) -> Result<Vec<MeshSpec>, DescriptorError> {
    let GameSetup {
        mut meshes,
        bags,
        slots,
    } = setup;
    let index: HashMap<String, usize> = meshes
        .iter()
        .enumerate()
        .map(|(rank, spec)| (spec.id.clone(), rank))
        .collect();
    let mut bags: BTreeMap<String, VecDeque<String>> = bags
        .into_iter()
        .map(|(name, mut ids)| {
            ids.shuffle(&mut *rng);
            (name, VecDeque::from(ids))
        })
        .collect();

    for slot in &slots {
        let bag = bags
            .get_mut(&slot.bag)
            .ok_or_else(|| DescriptorError::Malformed(format!("unknown bag {}", slot.bag)))?;
        let count = slot.count.unwrap_or(bag.len()).min(bag.len());
        let drawn: Vec<usize> = bag
            .drain(..count)
            .map(|id| {
                index.get(&id).copied().ok_or_else(|| {
                    DescriptorError::Malformed(format!("bag {} holds unknown mesh {id}", slot.bag))
                })
            })
            .collect::<Result<_, _>>()?;

        let mut position = slot.position;
        let mut previous_height: Option<f32> = None;
        for &rank in &drawn {
            let spec = &mut meshes[rank];
            let height = spec
                .dimensions
                .unwrap_or_else(|| spec.kind.default_dimensions())
                .y;
            if let Some(previous) = previous_height {
                position.y += (previous + height) / 2.0 + SLOT_GAP;
            }
            spec.position = position;
            previous_height = Some(height);
        }

        if let [base, rest @ ..] = drawn.as_slice() {
            if !rest.is_empty() {
                stack_on(&mut meshes, *base, rest)?;
            }
        }
    }
    Ok(meshes)
}

fn stack_on(meshes: &mut [MeshSpec], base: usize, rest: &[usize]) -> Result<(), DescriptorError> {
    let base_id = meshes[base].id.clone();
    let stacked: Vec<String> = rest.iter().map(|&rank| meshes[rank].id.clone()).collect();
    for &rank in rest {
        let id = meshes[rank].id.clone();
        let stack = meshes[rank]
            .stack_mut()
            .ok_or_else(|| DescriptorError::Malformed(format!("{id} cannot be stacked")))?;
        stack.base_id = Some(base_id.clone());
        stack.stack_ids.clear();
    }
    let stack = meshes[base]
        .stack_mut()
        .ok_or_else(|| DescriptorError::Malformed(format!("{base_id} cannot be stacked")))?;
    stack.base_id = None;
    stack.stack_ids = stacked;
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStatus {
    Active,
    Halted(String),
}

/// One running game, guarded against its own descriptor.
///
/// Any error or panic raised by the descriptor halts this session; other
/// sessions keep going.
pub struct GameSession {
    descriptor: Arc<dyn GameDescriptor>,
    state: GameState,
    status: SessionStatus,
}

impl GameSession {
    pub fn new(descriptor: Arc<dyn GameDescriptor>, state: GameState) -> Self {
        Self {
            descriptor,
            state,
            status: SessionStatus::Active,
        }
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn status(&self) -> &SessionStatus {
        &self.status
    }

    pub fn is_halted(&self) -> bool {
        matches!(self.status, SessionStatus::Halted(_))
    }

    pub fn metadata(&self) -> DescriptorMetadata {
        self.descriptor.metadata()
    }

    pub fn parameters_for(&mut self, player: &Player) -> Result<Option<ParameterSchema>, SessionError> {
        self.guarded(|descriptor, game| Ok(descriptor.ask_for_parameters(&ParameterContext { game, player })))
    }

    pub fn add_player(
        &mut self,
        player: &Player,
        parameters: &Parameters,
    ) -> Result<&GameState, SessionError> {
        let state =
            self.guarded(|descriptor, game| descriptor.add_player(game.clone(), player, parameters))?;
        self.state = state;
        info!(
            "{} joined {} ({}/{} seats)",
            player.username,
            self.state.id,
            self.state.players.len(),
            self.descriptor.metadata().max_seats
        );
        Ok(&self.state)
    }

    fn guarded<T, F>(&mut self, call: F) -> Result<T, SessionError>
    where
        F: FnOnce(&dyn GameDescriptor, &GameState) -> Result<T, DescriptorError>,
    {
        if let SessionStatus::Halted(reason) = &self.status {
            return Err(SessionError::Halted {
                game_id: self.state.id.clone(),
                reason: reason.clone(),
            });
        }
        let descriptor = Arc::clone(&self.descriptor);
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| call(descriptor.as_ref(), &self.state)));
        match outcome {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => {
                self.halt(err.to_string());
                Err(SessionError::Descriptor(err))
            }
            Err(panic) => {
                let message = panic_message(panic);
                self.halt(message.clone());
                Err(SessionError::Panicked(message))
            }
        }
    }

    fn halt(&mut self, reason: String) {
        error!("halting game {}: {reason}", self.state.id);
        self.status = SessionStatus::Halted(reason);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behaviors::{Behavior, BehaviorKind};
    use crate::descriptor::Slot;
    use crate::mesh::MeshKind;
    use crate::stage::{TableSpec, ZoomSpec};
    use glam::Vec3;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    struct Faulty;

    impl GameDescriptor for Faulty {
        fn name(&self) -> &str {
            "faulty"
        }

        fn metadata(&self) -> DescriptorMetadata {
            DescriptorMetadata {
                min_seats: 1,
                max_seats: 4,
                locales: BTreeMap::new(),
                table_spec: TableSpec::default(),
                zoom_spec: ZoomSpec::default(),
            }
        }

        fn build(&self) -> Result<GameSetup, DescriptorError> {
            Ok(GameSetup::default())
        }

        fn add_player(
            &self,
            _game: GameState,
            player: &Player,
            _parameters: &Parameters,
        ) -> Result<GameState, DescriptorError> {
            panic!("cannot seat {}", player.id);
        }
    }

    fn rng() -> StdRng {
        StdRng::seed_from_u64(3)
    }

    #[test]
    fn builtin_games_are_listed() {
        let catalog = Catalog::builtin();
        assert_eq!(catalog.names(), vec!["chess", "draughts", "klondike"]);
        assert!(catalog.get("draughts").is_some());
        assert!(matches!(
            catalog.create_session("go", &mut rng()),
            Err(SessionError::UnknownGame(name)) if name == "go"
        ));
    }

    #[test]
    fn slots_deal_stacks_from_their_bag() {
        let mut setup = GameSetup::default();
        let ids: Vec<String> = (1..=5).map(|n| format!("token-{n}")).collect();
        for id in &ids {
            setup.meshes.push(
                MeshSpec::new(id.clone(), MeshKind::Token)
                    .with_behavior(Behavior::default_for(BehaviorKind::Stackable)),
            );
        }
        setup.bags.insert("pool".into(), ids);
        setup.slots.push(Slot {
            bag: "pool".into(),
            position: Vec3::new(2.0, 0.05, 0.0),
            count: Some(2),
        });
        setup.slots.push(Slot {
            bag: "pool".into(),
            position: Vec3::new(-2.0, 0.05, 0.0),
            count: None,
        });

        let mut meshes = instantiate(setup, &mut rng()).unwrap();
        let bases: Vec<&mut MeshSpec> = meshes
            .iter_mut()
            .filter(|spec| spec.position.y == 0.05)
            .collect();
        assert_eq!(bases.len(), 2);
        let mut sizes: Vec<usize> = bases
            .into_iter()
            .map(|spec| spec.stack_mut().unwrap().stack_ids.len() + 1)
            .collect();
        sizes.sort();
        assert_eq!(sizes, vec![2, 3]);
        let highest = meshes
            .iter()
            .map(|spec| spec.position.y)
            .fold(f32::MIN, f32::max);
        assert!((highest - (0.05 + 2.0 * 0.11)).abs() < 1e-5);
    }

    #[test]
    fn unknown_bags_are_malformed() {
        let mut setup = GameSetup::default();
        setup.slots.push(Slot {
            bag: "nowhere".into(),
            position: Vec3::ZERO,
            count: None,
        });
        assert!(matches!(
            instantiate(setup, &mut rng()),
            Err(DescriptorError::Malformed(_))
        ));
    }

    #[test]
    fn descriptor_errors_halt_only_that_session() {
        let catalog = Catalog::builtin();
        let mut solo = catalog.create_session("klondike", &mut rng()).unwrap();
        let mut other = catalog.create_session("klondike", &mut rng()).unwrap();

        solo.add_player(&Player::new("a", "Ann"), &Parameters::new())
            .unwrap();
        let err = solo
            .add_player(&Player::new("b", "Bob"), &Parameters::new())
            .unwrap_err();
        assert_eq!(err, SessionError::Descriptor(DescriptorError::SeatsExhausted { max: 1 }));
        assert!(solo.is_halted());
        assert!(matches!(
            solo.add_player(&Player::new("c", "Cid"), &Parameters::new()),
            Err(SessionError::Halted { .. })
        ));
        assert_eq!(solo.state().players.len(), 1);

        assert!(other
            .add_player(&Player::new("b", "Bob"), &Parameters::new())
            .is_ok());
        assert!(!other.is_halted());
    }

    #[test]
    fn panicking_descriptors_halt_the_session() {
        let mut catalog = Catalog::new();
        catalog.register(Faulty);
        let mut session = catalog.create_session("faulty", &mut rng()).unwrap();
        let err = session
            .add_player(&Player::new("z", "Zed"), &Parameters::new())
            .unwrap_err();
        assert_eq!(err, SessionError::Panicked("cannot seat z".into()));
        assert_eq!(session.status(), &SessionStatus::Halted("cannot seat z".into()));
        assert!(session.parameters_for(&Player::new("y", "Yan")).is_err());
    }

    #[test]
    fn klondike_deals_tableau_and_stock() {
        let catalog = Catalog::builtin();
        let session = catalog.create_session("klondike", &mut rng()).unwrap();
        let mut meshes = session.state().meshes.clone();
        let mut piles: Vec<usize> = meshes
            .iter_mut()
            .filter_map(|spec| {
                let stack = spec.stack_mut()?;
                stack
                    .base_id
                    .is_none()
                    .then(|| stack.stack_ids.len() + 1)
            })
            .collect();
        piles.sort();
        assert_eq!(piles, vec![1, 2, 3, 4, 5, 6, 7, 24]);
    }
}
