use std::collections::HashMap;
use std::time::Duration;

use glam::Vec3;
use log::debug;

use crate::behaviors::{self, BehaviorKind};
use crate::mesh::{Mesh, MeshError, MeshSpec};

/// Meshes currently on the table, indexed by id.
///
/// Meshes with an empty id are kept in the collection but never indexed, so
/// they cannot be looked up.
#[derive(Debug, Default)]
pub struct Scene {
    meshes: Vec<Mesh>,
    index: HashMap<String, usize>,
    loading: bool,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// True while a game document is being loaded; moves are not animated.
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Starts a bulk update: until [`Scene::end_load`], moves and rotations
    /// are applied at once and their end callbacks run immediately.
    pub fn begin_load(&mut self) {
        self.loading = true;
    }

    pub fn end_load(&mut self) {
        self.loading = false;
    }

    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }

    /// Adds `mesh`, refusing a second mesh with the same non-empty id.
    pub fn add_mesh(&mut self, mesh: Mesh) -> Result<(), MeshError> {
        if !mesh.id().is_empty() {
            if self.index.contains_key(mesh.id()) {
                return Err(MeshError::DuplicateId(mesh.id().to_string()));
            }
            self.index.insert(mesh.id().to_string(), self.meshes.len());
        }
        self.meshes.push(mesh);
        Ok(())
    }

    /// Takes the mesh out of the scene; the last mesh fills its slot.
    pub fn remove_mesh(&mut self, id: &str) -> Option<Mesh> {
        let slot = self.index.remove(id)?;
        let mesh = self.meshes.swap_remove(slot);
        if let Some(moved) = self.meshes.get(slot) {
            if !moved.id().is_empty() {
                self.index.insert(moved.id().to_string(), slot);
            }
        }
        Some(mesh)
    }

    /// Drops every mesh.
    pub fn dispose(&mut self) {
        self.index.clear();
        self.meshes.clear();
    }

    /// Looks a mesh up by id; anonymous meshes are never found.
    pub fn get_mesh_by_id(&self, id: &str) -> Option<&Mesh> {
        self.index.get(id).map(|&slot| &self.meshes[slot])
    }

    pub fn get_mesh_by_id_mut(&mut self, id: &str) -> Option<&mut Mesh> {
        let slot = *self.index.get(id)?;
        self.meshes.get_mut(slot)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn meshes(&self) -> impl Iterator<Item = &Mesh> {
        self.meshes.iter()
    }

    /// Replaces the scene content with the meshes of a game document.
    ///
    /// Returns the number of meshes loaded. On error the scene keeps the
    /// meshes added so far.
    pub fn load(&mut self, specs: Vec<MeshSpec>) -> Result<usize, MeshError> {
        self.dispose();
        self.begin_load();
        let result = specs
            .into_iter()
            .try_for_each(|spec| self.add_mesh(Mesh::from_spec(spec)?));
        self.end_load();
        result?;
        debug!("loaded {} meshes", self.meshes.len());
        Ok(self.meshes.len())
    }

    /// Document form of every mesh, in scene order.
    pub fn snapshot(&self) -> Vec<MeshSpec> {
        self.meshes.iter().map(Mesh::to_spec).collect()
    }

    /// Ids of the meshes players can drag.
    pub fn draggable_ids(&self) -> Vec<&str> {
        self.meshes
            .iter()
            .filter(|mesh| !mesh.id().is_empty() && mesh.has_behavior(BehaviorKind::Movable))
            .map(Mesh::id)
            .collect()
    }

    /// Steps every animation; returns how many meshes are still moving.
    pub fn advance(&mut self, elapsed: Duration) -> usize {
        self.meshes
            .iter_mut()
            .map(|mesh| mesh.advance(elapsed))
            .filter(|animating| *animating)
            .count()
    }

    pub fn is_animating(&self) -> bool {
        self.meshes.iter().any(Mesh::is_animating)
    }

    /// Scene-aware [`behaviors::animate_move`]; returns false for unknown ids.
    pub fn animate_move(
        &mut self,
        id: &str,
        target: Vec3,
        duration: Duration,
        on_end: impl FnOnce() + 'static,
    ) -> bool {
        let loading = self.loading;
        match self.get_mesh_by_id_mut(id) {
            Some(mesh) => {
                behaviors::animate_move(mesh, loading, target, duration, on_end);
                true
            }
            None => false,
        }
    }
}
