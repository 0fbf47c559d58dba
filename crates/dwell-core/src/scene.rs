//! Interfaces the host scene must provide.
//!
//! The engine never owns geometry. It casts rays and flips layers/markers
//! through these two traits, which a game engine binding (or the in-memory
//! `dwell-scene` crate) implements.

use serde::{Deserialize, Serialize};

use crate::vector::{Aabb, Vec3};

/// Opaque handle to a scene entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u32);

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Render/collision category of an entity. Valid values are 0..32.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Layer(pub u8);

/// Set of layers a ray cast may hit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LayerMask(pub u32);

impl LayerMask {
    pub const ALL: LayerMask = LayerMask(u32::MAX);
    pub const NONE: LayerMask = LayerMask(0);

    pub fn of(layers: &[Layer]) -> Self {
        Self(
            layers
                .iter()
                .filter(|l| l.0 < 32)
                .fold(0u32, |acc, l| acc | (1 << l.0)),
        )
    }

    pub fn contains(self, layer: Layer) -> bool {
        layer.0 < 32 && self.0 & (1 << layer.0) != 0
    }
}

/// One ray/collider intersection.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct HitRecord {
    pub entity: EntityId,
    pub distance: f64,
    pub point: Vec3,
}

/// Geometric queries against the scene.
pub trait SceneQuery {
    /// Every collider the ray passes through within `max_distance`.
    ///
    /// Order is unspecified. Implementations must not block or retry; a
    /// failed query yields an empty set.
    fn cast_all(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f64,
        filter: LayerMask,
    ) -> Vec<HitRecord>;

    /// Nearest collider along the ray within `max_distance`.
    fn cast_first(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f64,
        filter: LayerMask,
    ) -> Option<HitRecord> {
        self.cast_all(origin, direction, max_distance, filter)
            .into_iter()
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
    }
}

/// Name lookup and mutable per-entity render state.
///
/// Names are a flat namespace; the host guarantees uniqueness within the
/// active scene.
pub trait EntityRegistry {
    fn find(&self, name: &str) -> Option<EntityId>;

    /// `None` once the entity has been destroyed.
    fn name(&self, id: EntityId) -> Option<&str>;

    /// All live entities.
    fn entities(&self) -> Vec<EntityId>;

    /// World-space collider bounds, if the entity has collision geometry.
    fn bounds(&self, id: EntityId) -> Option<Aabb>;

    fn layer(&self, id: EntityId) -> Option<Layer>;

    fn set_layer(&mut self, id: EntityId, layer: Layer);

    /// Direct children, in declaration order.
    fn children(&self, id: EntityId) -> Vec<EntityId>;

    fn is_active(&self, id: EntityId) -> bool;

    fn set_active(&mut self, id: EntityId, active: bool);

    /// First direct child named `name`.
    fn find_child(&self, parent: EntityId, name: &str) -> Option<EntityId> {
        self.children(parent)
            .into_iter()
            .find(|c| self.name(*c) == Some(name))
    }

    /// `root` and all descendants, depth first, without recursion.
    fn subtree(&self, root: EntityId) -> Vec<EntityId> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            out.push(id);
            let mut kids = self.children(id);
            // Reverse so the first child is visited first
            kids.reverse();
            stack.extend(kids);
        }
        out
    }
}
