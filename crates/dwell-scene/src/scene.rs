//! In-memory entity graph with box colliders.

use std::collections::HashMap;

use dwell_core::{Aabb, EntityId, EntityRegistry, HitRecord, Layer, LayerMask, SceneQuery, Vec3};

use crate::error::{Result, SceneError};

#[derive(Clone, Debug)]
struct Node {
    name: String,
    parent: Option<EntityId>,
    children: Vec<EntityId>,
    collider: Option<Aabb>,
    layer: Layer,
    active: bool,
    alive: bool,
    /// Listed in the flat name map. Local children are only reachable
    /// through their parent.
    global: bool,
}

/// Scene graph the engine can query. Ids are never reused, so a destroyed
/// entity's id stays dead.
///
/// Names given to [`spawn`](Scene::spawn) are unique scene-wide. Names given
/// to [`spawn_local`](Scene::spawn_local) only need to be unique among their
/// siblings, which is how marker children like `Highlight` repeat under
/// every landmark.
#[derive(Clone, Debug, Default)]
pub struct Scene {
    nodes: Vec<Node>,
    by_name: HashMap<String, EntityId>,
    viewpoint: Vec3,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Where the observer stands; default gaze origin for tools.
    pub fn viewpoint(&self) -> Vec3 {
        self.viewpoint
    }

    pub fn set_viewpoint(&mut self, viewpoint: Vec3) {
        self.viewpoint = viewpoint;
    }

    /// Live entity count, local children included.
    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|n| n.alive).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Add an active entity on layer 0 with no collider. The name must be
    /// unique across the scene.
    pub fn spawn(&mut self, name: &str, parent: Option<EntityId>) -> Result<EntityId> {
        if self.by_name.contains_key(name) {
            return Err(SceneError::InvalidData(format!("duplicate entity name '{name}'")));
        }
        let id = self.insert(name, parent, true)?;
        self.by_name.insert(name.to_string(), id);
        Ok(id)
    }

    /// Add a child whose name only has to be unique among its siblings.
    /// It is invisible to [`find`](EntityRegistry::find).
    pub fn spawn_local(&mut self, name: &str, parent: EntityId) -> Result<EntityId> {
        if self.find_child(parent, name).is_some() {
            return Err(SceneError::InvalidData(format!(
                "{parent} already has a child named '{name}'"
            )));
        }
        self.insert(name, Some(parent), false)
    }

    fn insert(&mut self, name: &str, parent: Option<EntityId>, global: bool) -> Result<EntityId> {
        if name.is_empty() {
            return Err(SceneError::InvalidData("entity name must not be empty".into()));
        }
        if let Some(p) = parent
            && !self.is_alive(p)
        {
            return Err(SceneError::InvalidData(format!(
                "parent {p} of '{name}' does not exist"
            )));
        }

        let id = EntityId(self.nodes.len() as u32);
        self.nodes.push(Node {
            name: name.to_string(),
            parent,
            children: Vec::new(),
            collider: None,
            layer: Layer(0),
            active: true,
            alive: true,
            global,
        });
        if let Some(p) = parent {
            self.nodes[p.0 as usize].children.push(id);
        }
        Ok(id)
    }

    pub fn set_collider(&mut self, id: EntityId, collider: Option<Aabb>) {
        if let Some(node) = self.node_mut(id) {
            node.collider = collider;
        }
    }

    pub fn parent(&self, id: EntityId) -> Option<EntityId> {
        self.node(id).and_then(|n| n.parent)
    }

    /// Destroy `id` and everything below it.
    pub fn despawn(&mut self, id: EntityId) -> bool {
        if !self.is_alive(id) {
            return false;
        }
        if let Some(p) = self.parent(id)
            && let Some(parent) = self.node_mut(p)
        {
            parent.children.retain(|c| *c != id);
        }
        for victim in self.subtree(id) {
            if let Some(node) = self.nodes.get_mut(victim.0 as usize) {
                node.alive = false;
                if node.global {
                    self.by_name.remove(&node.name);
                }
            }
        }
        true
    }

    /// Active and every ancestor active.
    pub fn is_active_in_hierarchy(&self, id: EntityId) -> bool {
        let mut cursor = Some(id);
        while let Some(c) = cursor {
            match self.node(c) {
                Some(node) if node.active => cursor = node.parent,
                _ => return false,
            }
        }
        true
    }

    fn is_alive(&self, id: EntityId) -> bool {
        self.node(id).is_some()
    }

    fn node(&self, id: EntityId) -> Option<&Node> {
        self.nodes.get(id.0 as usize).filter(|n| n.alive)
    }

    fn node_mut(&mut self, id: EntityId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0 as usize).filter(|n| n.alive)
    }
}

impl SceneQuery for Scene {
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
        let mut hits: Vec<HitRecord> = self
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.alive && filter.contains(n.layer))
            .filter_map(|(i, n)| {
                let id = EntityId(i as u32);
                let t = n.collider?.ray_intersect(origin, dir)?;
                (t <= max_distance && self.is_active_in_hierarchy(id)).then(|| HitRecord {
                    entity: id,
                    distance: t,
                    point: origin + dir * t,
                })
            })
            .collect();
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits
    }
}

impl EntityRegistry for Scene {
    fn find(&self, name: &str) -> Option<EntityId> {
        self.by_name.get(name).copied()
    }

    fn name(&self, id: EntityId) -> Option<&str> {
        self.node(id).map(|n| n.name.as_str())
    }

    fn entities(&self) -> Vec<EntityId> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.alive)
            .map(|(i, _)| EntityId(i as u32))
            .collect()
    }

    fn bounds(&self, id: EntityId) -> Option<Aabb> {
        self.node(id).and_then(|n| n.collider)
    }

    fn layer(&self, id: EntityId) -> Option<Layer> {
        self.node(id).map(|n| n.layer)
    }

    fn set_layer(&mut self, id: EntityId, layer: Layer) {
        if let Some(node) = self.node_mut(id) {
            node.layer = layer;
        }
    }

    fn children(&self, id: EntityId) -> Vec<EntityId> {
        self.node(id).map(|n| n.children.clone()).unwrap_or_default()
    }

    fn is_active(&self, id: EntityId) -> bool {
        self.node(id).is_some_and(|n| n.active)
    }

    fn set_active(&mut self, id: EntityId, active: bool) {
        if let Some(node) = self.node_mut(id) {
            node.active = active;
        }
    }
}
