//! TOML scene files.
//!
//! ```toml
//! [viewpoint]
//! position = [0.0, 1.6, 0.0]
//!
//! [[entity]]
//! name = "LandmarkGaze_Tower"
//! center = [0.0, 10.0, 120.0]
//! size = [8.0, 20.0, 8.0]
//! layer = 8
//! markers = true
//!
//! [[entity]]
//! name = "Sign"
//! parent = "LandmarkGaze_Tower"
//! active = false
//! ```
//!
//! `markers = true` spawns the highlight and outline marker children,
//! inactive. A parent must be declared before its children.

use std::path::Path;

use dwell_core::{Aabb, EntityRegistry, Layer, MarkerNames, Vec3};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Result, SceneError};
use crate::scene::Scene;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SceneFile {
    #[serde(default)]
    pub viewpoint: ViewpointSpec,
    #[serde(default, rename = "entity")]
    pub entities: Vec<EntitySpec>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ViewpointSpec {
    #[serde(default)]
    pub position: Vec3,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EntitySpec {
    pub name: String,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub center: Option<Vec3>,
    #[serde(default)]
    pub size: Option<Vec3>,
    #[serde(default)]
    pub layer: u8,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub markers: bool,
}

fn default_active() -> bool {
    true
}

impl EntitySpec {
    fn collider(&self) -> Result<Option<Aabb>> {
        match (self.center, self.size) {
            (None, None) => Ok(None),
            (Some(center), Some(size)) => {
                if size.x < 0.0 || size.y < 0.0 || size.z < 0.0 {
                    return Err(SceneError::InvalidData(format!(
                        "entity '{}' has a negative collider size",
                        self.name
                    )));
                }
                Ok(Some(Aabb::from_center_size(center, size)))
            }
            _ => Err(SceneError::InvalidData(format!(
                "entity '{}' needs both center and size for a collider",
                self.name
            ))),
        }
    }
}

impl SceneFile {
    pub fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Build the scene graph. Marker children are named after `markers`.
    pub fn build(&self, markers: &MarkerNames) -> Result<Scene> {
        let mut scene = Scene::new();
        scene.set_viewpoint(self.viewpoint.position);

        for spec in &self.entities {
            if spec.layer >= 32 {
                return Err(SceneError::InvalidData(format!(
                    "entity '{}' has layer {} (must be below 32)",
                    spec.name, spec.layer
                )));
            }
            let parent = match &spec.parent {
                Some(p) => Some(scene.find(p).ok_or_else(|| {
                    SceneError::InvalidData(format!(
                        "entity '{}' names unknown parent '{p}'",
                        spec.name
                    ))
                })?),
                None => None,
            };

            let id = scene.spawn(&spec.name, parent)?;
            scene.set_collider(id, spec.collider()?);
            scene.set_layer(id, Layer(spec.layer));
            scene.set_active(id, spec.active);

            if spec.markers {
                for marker in [&markers.highlight, &markers.outline] {
                    let child = scene.spawn_local(marker, id)?;
                    scene.set_active(child, false);
                }
            }
        }
        Ok(scene)
    }
}

pub fn load_scene(path: &Path, markers: &MarkerNames) -> Result<Scene> {
    let text = std::fs::read_to_string(path)?;
    let scene = SceneFile::parse(&text)?.build(markers)?;
    info!(path = %path.display(), entities = scene.len(), "scene loaded");
    Ok(scene)
}
