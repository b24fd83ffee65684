//! Core of a collaborative 3D tabletop.
//!
//! The crate exposes the building blocks of a shared table: meshes with
//! pluggable behaviors (move, flip, stack, snap...), a scene indexed by mesh
//! id, the actions players exchange, and game descriptors that lay out the
//! table and seat players. Drawing the table and carrying peer messages over
//! a transport are left to the host application.

pub mod actions;
pub mod behaviors;
pub mod catalog;
pub mod channel;
pub mod config;
pub mod descriptor;
pub mod engine;
pub mod games;
pub mod layout;
pub mod mesh;
pub mod peer;
pub mod render_loop;
pub mod scene;
pub mod stage;

pub use actions::{apply_action, ActionError, MeshAction};
pub use behaviors::{
    animate_move, get_moveable_behavior, get_targetable_behavior, Behavior, BehaviorKind,
    BehaviorSet,
};
pub use catalog::{Catalog, GameSession, SessionError, SessionStatus};
pub use channel::{ChannelError, ChannelSender, MessageChannel};
pub use config::EngineConfig;
pub use descriptor::{
    DescriptorError, DescriptorMetadata, GameDescriptor, GameSetup, GameState, Parameters, Player,
    Preference,
};
pub use engine::{Engine, FrameStats};
pub use games::{Chess, Draughts, Klondike, Sandbox};
pub use layout::parse_layout;
pub use mesh::{Mesh, MeshError, MeshKind, MeshSpec};
pub use peer::{PeerMessage, PeerPointer, PeerPointers};
pub use render_loop::{CallbackId, RenderLoop};
pub use scene::Scene;
pub use stage::{CameraParams, LightParams, Stage, TableSpec, ZoomSpec};
