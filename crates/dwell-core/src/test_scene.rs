//! Minimal box-collider scene for unit tests.

use std::collections::HashMap;

use crate::scene::{EntityId, EntityRegistry, HitRecord, Layer, LayerMask, SceneQuery};
use crate::vector::{Aabb, Vec3};

struct MockEntity {
    name: String,
    children: Vec<EntityId>,
    bounds: Option<Aabb>,
    layer: Layer,
    active: bool,
}

#[derive(Default)]
pub struct MockScene {
    entities: Vec<MockEntity>,
    by_name: HashMap<String, EntityId>,
}

impl MockScene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, name: &str, bounds: Option<Aabb>, layer: u8) -> EntityId {
        let id = EntityId(self.entities.len() as u32);
        self.entities.push(MockEntity {
            name: name.to_string(),
            children: Vec::new(),
            bounds,
            layer: Layer(layer),
            active: true,
        });
        self.by_name.insert(name.to_string(), id);
        id
    }

    /// Unit-ish box centred at `center`.
    pub fn add_box(&mut self, name: &str, center: Vec3, size: f64, layer: u8) -> EntityId {
        self.add(
            name,
            Some(Aabb::from_center_size(center, Vec3::new(size, size, size))),
            layer,
        )
    }

    pub fn add_child(&mut self, parent: EntityId, name: &str, active: bool) -> EntityId {
        let id = self.add(name, None, 0);
        self.entities[id.0 as usize].active = active;
        self.entities[parent.0 as usize].children.push(id);
        id
    }

    /// Landmark with highlight and outline markers, both hidden.
    pub fn add_landmark(&mut self, name: &str, center: Vec3, size: f64, layer: u8) -> EntityId {
        let id = self.add_box(name, center, size, layer);
        self.add_child(id, "Highlight", false);
        self.add_child(id, "Contour", false);
        id
    }

    fn get(&self, id: EntityId) -> Option<&MockEntity> {
        self.entities.get(id.0 as usize)
    }
}

impl SceneQuery for MockScene {
    fn cast_all(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f64,
        filter: LayerMask,
    ) -> Vec<HitRecord> {
        let dir = direction.normalize();
        if dir.is_degenerate() {
            return Vec::new();
        }
        self.entities
            .iter()
            .enumerate()
            .filter(|(_, e)| e.active && filter.contains(e.layer))
            .filter_map(|(i, e)| {
                let t = e.bounds?.ray_intersect(origin, dir)?;
                (t <= max_distance).then(|| HitRecord {
                    entity: EntityId(i as u32),
                    distance: t,
                    point: origin + dir * t,
                })
            })
            .collect()
    }
}

impl EntityRegistry for MockScene {
    fn find(&self, name: &str) -> Option<EntityId> {
        self.by_name.get(name).copied()
    }

    fn name(&self, id: EntityId) -> Option<&str> {
        self.get(id).map(|e| e.name.as_str())
    }

    fn entities(&self) -> Vec<EntityId> {
        (0..self.entities.len() as u32).map(EntityId).collect()
    }

    fn bounds(&self, id: EntityId) -> Option<Aabb> {
        self.get(id)?.bounds
    }

    fn layer(&self, id: EntityId) -> Option<Layer> {
        self.get(id).map(|e| e.layer)
    }

    fn set_layer(&mut self, id: EntityId, layer: Layer) {
        if let Some(e) = self.entities.get_mut(id.0 as usize) {
            e.layer = layer;
        }
    }

    fn children(&self, id: EntityId) -> Vec<EntityId> {
        self.get(id).map(|e| e.children.clone()).unwrap_or_default()
    }

    fn is_active(&self, id: EntityId) -> bool {
        self.get(id).is_some_and(|e| e.active)
    }

    fn set_active(&mut self, id: EntityId, active: bool) {
        if let Some(e) = self.entities.get_mut(id.0 as usize) {
            e.active = active;
        }
    }
}
