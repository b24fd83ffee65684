use std::time::Duration;

use glam::Vec3;
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::actions::{self, ActionResult, MeshAction};
use crate::behaviors::Detail;
use crate::channel::{ChannelSender, MessageChannel};
use crate::config::EngineConfig;
use crate::descriptor::{DescriptorMetadata, GameState};
use crate::mesh::MeshError;
use crate::peer::{PeerMessage, PeerPointers};
use crate::render_loop::RenderLoop;
use crate::scene::Scene;
use crate::stage::Stage;

const DEFAULT_ASPECT: f32 = 16.0 / 9.0;

/// What happened during one [`Engine::frame`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FrameStats {
    pub messages: usize,
    pub skipped_actions: usize,
    pub animating: usize,
    pub failed_callbacks: usize,
}

/// Everything one table needs: scene, stage, frame callbacks, remote peers.
///
/// Local operations are applied right away and queued in the outbox for the
/// network layer; actions received from peers are replayed without echo.
pub struct Engine {
    config: EngineConfig,
    pub scene: Scene,
    pub stage: Stage,
    pub render_loop: RenderLoop,
    pub pointers: PeerPointers,
    inbox: MessageChannel<PeerMessage>,
    outbox: Vec<MeshAction>,
    rng: StdRng,
}

impl Engine {
    pub fn new(config: EngineConfig, stage: Stage) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let inbox = MessageChannel::new(config.allowed_origins.iter().cloned());
        Self {
            config,
            scene: Scene::new(),
            stage,
            render_loop: RenderLoop::new(),
            pointers: PeerPointers::new(),
            inbox,
            outbox: Vec::new(),
            rng,
        }
    }

    /// Engine whose stage follows the table and zoom of a game.
    pub fn for_game(config: EngineConfig, metadata: &DescriptorMetadata) -> Self {
        let stage = Stage::new(
            metadata.table_spec.clone(),
            metadata.zoom_spec,
            DEFAULT_ASPECT,
        );
        Self::new(config, stage)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn rng_mut(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    /// Handle for network threads to push peer messages.
    pub fn channel_sender(&self) -> ChannelSender<PeerMessage> {
        self.inbox.sender()
    }

    /// Replaces the scene with the meshes of `game`.
    pub fn load(&mut self, game: &GameState) -> Result<usize, MeshError> {
        self.pointers.dispose_all();
        self.outbox.clear();
        let count = self.scene.load(game.meshes.clone())?;
        info!("loaded game {} ({}) with {count} meshes", game.id, game.kind);
        Ok(count)
    }

    /// Runs one frame: peer messages first, then animations, then callbacks.
    pub fn frame(&mut self, elapsed: Duration) -> FrameStats {
        let mut stats = FrameStats::default();
        for envelope in self.inbox.drain() {
            stats.messages += 1;
            match envelope.message {
                PeerMessage::Pointer { peer_id, position } => {
                    self.pointers.update(&peer_id, position);
                }
                PeerMessage::Action { peer_id, action } => {
                    if let Err(err) = actions::apply_action(&mut self.scene, &action, &self.config)
                    {
                        stats.skipped_actions += 1;
                        warn!(
                            "skipping action from {peer_id} ({}): {err}",
                            envelope.origin
                        );
                    }
                }
                PeerMessage::Leave { peer_id } => {
                    if self.pointers.dispose(&peer_id).is_some() {
                        debug!("peer {peer_id} left");
                    }
                }
            }
        }
        stats.animating = self.scene.advance(elapsed);
        stats.failed_callbacks = self.render_loop.run_frame(&mut self.scene, elapsed);
        stats
    }

    /// Takes the actions performed locally since the last call.
    pub fn drain_outbox(&mut self) -> Vec<MeshAction> {
        std::mem::take(&mut self.outbox)
    }

    fn record(&mut self, result: ActionResult<MeshAction>) -> ActionResult<MeshAction> {
        let action = result?;
        self.outbox.push(action.clone());
        Ok(action)
    }

    pub fn move_mesh(&mut self, id: &str, position: Vec3) -> ActionResult<MeshAction> {
        let result = actions::move_mesh(&mut self.scene, id, position, &self.config);
        self.record(result)
    }

    pub fn flip(&mut self, id: &str) -> ActionResult<MeshAction> {
        let result = actions::flip(&mut self.scene, id, &self.config);
        self.record(result)
    }

    pub fn rotate(&mut self, id: &str) -> ActionResult<MeshAction> {
        let result = actions::rotate(&mut self.scene, id, &self.config);
        self.record(result)
    }

    pub fn push(&mut self, base_id: &str, id: &str) -> ActionResult<MeshAction> {
        let result = actions::push(&mut self.scene, base_id, id, &self.config);
        self.record(result)
    }

    pub fn pop(&mut self, base_id: &str, count: usize) -> ActionResult<Vec<String>> {
        let popped = actions::pop(&mut self.scene, base_id, count)?;
        if !popped.is_empty() {
            self.outbox.push(MeshAction::Pop {
                base_id: base_id.to_string(),
                count: popped.len(),
            });
        }
        Ok(popped)
    }

    pub fn shuffle(&mut self, base_id: &str) -> ActionResult<MeshAction> {
        let result = actions::shuffle(&mut self.scene, base_id, &mut self.rng, &self.config);
        self.record(result)
    }

    pub fn snap(&mut self, owner_id: &str, anchor_id: &str, id: &str) -> ActionResult<MeshAction> {
        let result = actions::snap(&mut self.scene, owner_id, anchor_id, id, &self.config);
        self.record(result)
    }

    pub fn unsnap(&mut self, id: &str) -> ActionResult<MeshAction> {
        let result = actions::unsnap(&mut self.scene, id);
        self.record(result)
    }

    pub fn randomize(&mut self, id: &str) -> ActionResult<MeshAction> {
        let result = actions::randomize(&mut self.scene, id, &mut self.rng);
        self.record(result)
    }

    pub fn drop_mesh(&mut self, id: &str, point: Vec3) -> ActionResult<MeshAction> {
        let result = actions::drop_mesh(&mut self.scene, id, point, &self.config);
        self.record(result)
    }

    pub fn detail(&self, id: &str) -> Option<Detail> {
        actions::detail(&self.scene, id)
    }
}
