use std::collections::hash_map::DefaultHasher;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use anyhow::{Context, Result};
use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::actions::MeshAction;

/// Message exchanged with remote collaborators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum PeerMessage {
    Pointer { peer_id: String, position: Vec3 },
    Action { peer_id: String, action: MeshAction },
    Leave { peer_id: String },
}

impl PeerMessage {
    pub fn peer_id(&self) -> &str {
        match self {
            PeerMessage::Pointer { peer_id, .. }
            | PeerMessage::Action { peer_id, .. }
            | PeerMessage::Leave { peer_id } => peer_id,
        }
    }

    pub fn encode(&self) -> Result<String> {
        serde_json::to_string(self).context("failed to encode peer message")
    }

    pub fn decode(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("failed to decode peer message")
    }
}

/// Visual stand-in for a remote collaborator's cursor.
#[derive(Debug, Clone, PartialEq)]
pub struct PeerPointer {
    pub peer_id: String,
    pub position: Vec3,
    pub color: Vec3,
}

impl PeerPointer {
    pub fn new(peer_id: impl Into<String>) -> Self {
        let peer_id = peer_id.into();
        let color = color_for(&peer_id);
        Self {
            peer_id,
            position: Vec3::ZERO,
            color,
        }
    }
}

/// Pointers of every connected peer. Not part of the game state.
#[derive(Debug, Default)]
pub struct PeerPointers {
    pointers: HashMap<String, PeerPointer>,
}

impl PeerPointers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a fresh pointer for a new connection, replacing any stale one.
    pub fn create(&mut self, peer_id: &str) -> &mut PeerPointer {
        let fresh = PeerPointer::new(peer_id);
        match self.pointers.entry(peer_id.to_string()) {
            Entry::Occupied(mut entry) => {
                entry.insert(fresh);
                entry.into_mut()
            }
            Entry::Vacant(entry) => entry.insert(fresh),
        }
    }

    /// Moves the pointer of `peer_id`, creating it on first sight.
    pub fn update(&mut self, peer_id: &str, position: Vec3) -> &PeerPointer {
        let pointer = self
            .pointers
            .entry(peer_id.to_string())
            .or_insert_with(|| PeerPointer::new(peer_id));
        pointer.position = position;
        pointer
    }

    /// Pointer of `peer_id`, if it was seen.
    pub fn get(&self, peer_id: &str) -> Option<&PeerPointer> {
        self.pointers.get(peer_id)
    }

    /// Forgets the pointer of a peer that left.
    pub fn dispose(&mut self, peer_id: &str) -> Option<PeerPointer> {
        self.pointers.remove(peer_id)
    }

    /// Forgets every pointer.
    pub fn dispose_all(&mut self) {
        self.pointers.clear();
    }

    pub fn len(&self) -> usize {
        self.pointers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pointers.is_empty()
    }

    /// Pointers in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &PeerPointer> {
        self.pointers.values()
    }
}

/// Stable, fairly saturated color picked from the peer id.
fn color_for(peer_id: &str) -> Vec3 {
    let mut hasher = DefaultHasher::new();
    peer_id.hash(&mut hasher);
    let hue = (hasher.finish() % 360) as f32;
    hsv_to_rgb(hue, 0.65, 0.95)
}

fn hsv_to_rgb(hue: f32, saturation: f32, value: f32) -> Vec3 {
    let chroma = value * saturation;
    let sector = hue / 60.0;
    let x = chroma * (1.0 - (sector % 2.0 - 1.0).abs());
    let (r, g, b) = match sector as u32 {
        0 => (chroma, x, 0.0),
        1 => (x, chroma, 0.0),
        2 => (0.0, chroma, x),
        3 => (0.0, x, chroma),
        4 => (x, 0.0, chroma),
        _ => (chroma, 0.0, x),
    };
    let m = value - chroma;
    Vec3::new(r + m, g + m, b + m)
}
