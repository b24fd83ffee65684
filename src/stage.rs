use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

use crate::mesh::{Mesh, MeshError, MeshKind};

/// Size and look of the table a game is played on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableSpec {
    pub width: f32,
    pub height: f32,
    pub texture: Option<String>,
}

impl Default for TableSpec {
    fn default() -> Self {
        Self {
            width: 400.0,
            height: 400.0,
            texture: None,
        }
    }
}

/// Camera altitude bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoomSpec {
    pub min: f32,
    pub max: f32,
    pub initial: f32,
}

impl Default for ZoomSpec {
    fn default() -> Self {
        Self {
            min: 5.0,
            max: 80.0,
            initial: 35.0,
        }
    }
}

/// Camera parameters consumed by the renderer's uniform buffer.
#[derive(Clone, Debug)]
pub struct CameraParams {
    pub view_proj: Mat4,
    pub position: Vec3,
    pub target: Vec3,
}

/// Lighting state consumed by the renderer's uniform buffer.
#[derive(Clone, Debug)]
pub struct LightParams {
    pub position: Vec3,
    pub color: Vec3,
    pub intensity: f32,
}

/// Camera, light and table surrounding the game meshes.
#[derive(Debug)]
pub struct Stage {
    pub camera: CameraParams,
    pub light: LightParams,
    pub table: TableSpec,
    zoom: ZoomSpec,
    aspect: f32,
}

impl Stage {
    pub fn new(table: TableSpec, zoom: ZoomSpec, aspect: f32) -> Self {
        let altitude = zoom.initial.clamp(zoom.min, zoom.max);
        Self {
            camera: camera_at(altitude, Vec3::ZERO, aspect),
            light: default_light(&table),
            table,
            zoom,
            aspect,
        }
    }

    pub fn altitude(&self) -> f32 {
        self.camera.position.y - self.camera.target.y
    }

    /// Moves the camera closer (negative) or further (positive), within bounds.
    pub fn zoom(&mut self, delta: f32) -> f32 {
        let altitude = (self.altitude() + delta).clamp(self.zoom.min, self.zoom.max);
        self.camera = camera_at(altitude, self.camera.target, self.aspect);
        altitude
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.aspect = if height == 0 {
            1.0
        } else {
            width as f32 / height as f32
        };
        self.camera = camera_at(self.altitude(), self.camera.target, self.aspect);
    }

    /// Static mesh standing for the table surface.
    pub fn table_mesh(&self) -> Result<Mesh, MeshError> {
        let mut mesh = Mesh::new("table", MeshKind::Board, Vec::new())?;
        mesh.texture = self.table.texture.clone();
        mesh.dimensions = Vec3::new(self.table.width, 0.01, self.table.height);
        mesh.position = Vec3::new(0.0, -0.01, 0.0);
        Ok(mesh)
    }
}

fn camera_at(altitude: f32, target: Vec3, aspect: f32) -> CameraParams {
    // Slightly tilted towards the player so cards keep some perspective.
    let position = target + Vec3::new(0.0, altitude, altitude * 0.25);
    let view = Mat4::look_at_rh(position, target, Vec3::NEG_Z);
    let projection = Mat4::perspective_rh_gl(45f32.to_radians(), aspect.max(0.01), 0.1, 1000.0);
    CameraParams {
        view_proj: projection * view,
        position,
        target,
    }
}

fn default_light(table: &TableSpec) -> LightParams {
    LightParams {
        position: Vec3::new(0.0, table.width.max(table.height) / 4.0, 0.0),
        color: Vec3::splat(1.0),
        intensity: 1.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zoom_is_clamped() {
        let mut stage = Stage::new(
            TableSpec::default(),
            ZoomSpec {
                min: 10.0,
                max: 20.0,
                initial: 15.0,
            },
            16.0 / 9.0,
        );
        assert!((stage.altitude() - 15.0).abs() < 1e-4);
        assert!((stage.zoom(-100.0) - 10.0).abs() < 1e-4);
        assert!((stage.zoom(100.0) - 20.0).abs() < 1e-4);
        assert!((stage.altitude() - 20.0).abs() < 1e-4);
    }

    #[test]
    fn initial_zoom_outside_bounds_is_clamped() {
        let stage = Stage::new(
            TableSpec::default(),
            ZoomSpec {
                min: 10.0,
                max: 20.0,
                initial: 50.0,
            },
            1.0,
        );
        assert!((stage.altitude() - 20.0).abs() < 1e-4);
    }

    #[test]
    fn table_mesh_matches_spec() {
        let stage = Stage::new(
            TableSpec {
                width: 60.0,
                height: 40.0,
                texture: Some("felt.png".into()),
            },
            ZoomSpec::default(),
            1.0,
        );
        let table = stage.table_mesh().unwrap();
        assert_eq!(table.id(), "table");
        assert_eq!(table.dimensions.x, 60.0);
        assert_eq!(table.dimensions.z, 40.0);
        assert!(table.behaviors().is_empty());
        assert_eq!(stage.light.position.y, 15.0);
    }
}
