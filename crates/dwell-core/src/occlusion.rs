//! Grid-sampled visibility of an entity from a viewpoint.
//!
//! A g×g×g lattice spans the entity's collider bounds. Each lattice point
//! gets a ray from the viewpoint; the point is occluded when the ray hits
//! some *other* collider before reaching it. A lattice rather than random
//! points keeps the ratio reproducible between runs.

use tracing::error;

use crate::constants::EPSILON;
use crate::scene::{EntityId, EntityRegistry, LayerMask, SceneQuery};
use crate::vector::{Aabb, Vec3};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OcclusionEstimator {
    grid: u32,
}

impl OcclusionEstimator {
    pub fn new(grid: u32) -> Self {
        Self { grid: grid.max(1) }
    }

    pub fn grid(&self) -> u32 {
        self.grid
    }

    /// Lattice points across `bounds`. A grid of 1 samples the centre only.
    pub fn lattice(&self, bounds: &Aabb) -> Vec<Vec3> {
        let g = self.grid as usize;
        if g == 1 {
            return vec![bounds.center()];
        }
        let step = 1.0 / (g - 1) as f64;
        let mut points = Vec::with_capacity(g * g * g);
        for x in 0..g {
            for y in 0..g {
                for z in 0..g {
                    let t = Vec3::new(x as f64 * step, y as f64 * step, z as f64 * step);
                    points.push(bounds.lerp_point(t));
                }
            }
        }
        points
    }

    /// Fraction of lattice points hidden behind other geometry, in `[0, 1]`.
    ///
    /// An entity without collider bounds reports 0 (fully visible).
    pub fn occlusion_ratio<S>(&self, scene: &S, viewpoint: Vec3, entity: EntityId) -> f64
    where
        S: SceneQuery + EntityRegistry + ?Sized,
    {
        let Some(bounds) = scene.bounds(entity) else {
            error!(%entity, "no collider bounds; treating entity as fully visible");
            return 0.0;
        };

        let points = self.lattice(&bounds);
        let occluded = points
            .iter()
            .filter(|p| is_point_occluded(scene, viewpoint, **p, entity))
            .count();
        occluded as f64 / points.len() as f64
    }
}

fn is_point_occluded<S>(scene: &S, viewpoint: Vec3, point: Vec3, target: EntityId) -> bool
where
    S: SceneQuery + ?Sized,
{
    let offset = point - viewpoint;
    let distance = offset.length();
    if distance < EPSILON {
        return false;
    }
    match scene.cast_first(viewpoint, offset / distance, distance, LayerMask::ALL) {
        Some(hit) => hit.entity != target,
        None => false,
    }
}
