//! Static ground slab plus loose crates for the walker to push through.

use nalgebra as na;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::StriderConfig;
use crate::error::PhysicsError;
use crate::physics::{BodyDesc, BodyHandle, ColliderDesc, LinkShape, PhysicsAdapter, Pose};

const CRATE_HALF_EXTENT: f32 = 0.35;
const CRATE_RESTITUTION: f32 = 0.25;
const CRATE_FRICTION: f32 = 0.5;
const CRATE_DENSITY: f32 = 1.0;
/// Crates land around the spawn point but never on it.
const SCATTER_SPREAD: f32 = 6.0;
const SPAWN_CLEARANCE: f32 = 1.5;
const DROP_HEIGHT: f32 = 2.0;
const DROP_STACKING: f32 = 0.75;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Obstacle {
    pub center: na::Vector3<f32>,
    pub half_extent: f32,
    /// Display hue in degrees.
    pub hue: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TerrainLayout {
    pub ground_half_extents: na::Vector3<f32>,
    pub obstacles: Vec<Obstacle>,
}

/// Bodies created by [`TerrainLayout::spawn`].
#[derive(Debug, Clone, PartialEq)]
pub struct SpawnedTerrain {
    pub ground: BodyHandle,
    pub ground_shape: LinkShape,
    pub obstacles: Vec<(BodyHandle, LinkShape, f32)>,
}

impl SpawnedTerrain {
    pub fn body_count(&self) -> usize {
        1 + self.obstacles.len()
    }
}

impl Default for TerrainLayout {
    fn default() -> Self {
        Self::flat()
    }
}

impl TerrainLayout {
    pub fn flat() -> Self {
        Self {
            ground_half_extents: na::Vector3::new(20.0, 0.5, 20.0),
            obstacles: Vec::new(),
        }
    }

    /// Flat ground with `count` crates dropped from staggered heights.
    /// The same seed always yields the same layout.
    pub fn scattered(seed: u64, count: usize) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut obstacles = Vec::with_capacity(count);
        for i in 0..count {
            let (x, z) = loop {
                let x = rng.random_range(-SCATTER_SPREAD..SCATTER_SPREAD);
                let z = rng.random_range(-SCATTER_SPREAD..SCATTER_SPREAD);
                if x.hypot(z) >= SPAWN_CLEARANCE {
                    break (x, z);
                }
            };
            obstacles.push(Obstacle {
                center: na::Vector3::new(x, DROP_HEIGHT + i as f32 * DROP_STACKING, z),
                half_extent: CRATE_HALF_EXTENT,
                hue: (180.0 + i as f32 * 3.0) % 360.0,
            });
        }
        Self {
            obstacles,
            ..Self::flat()
        }
    }

    /// Create the ground and every crate. On failure nothing created here is left behind.
    pub fn spawn<P: PhysicsAdapter + ?Sized>(&self, physics: &mut P) -> Result<SpawnedTerrain, PhysicsError> {
        let mut created = Vec::with_capacity(1 + self.obstacles.len());
        let result = self.spawn_parts(physics, &mut created);
        if result.is_err() {
            for body in created {
                physics.remove_body(body);
            }
        }
        result
    }

    fn spawn_parts<P: PhysicsAdapter + ?Sized>(
        &self,
        physics: &mut P,
        created: &mut Vec<BodyHandle>,
    ) -> Result<SpawnedTerrain, PhysicsError> {
        let h = self.ground_half_extents;
        let ground_shape = LinkShape::cuboid(h.x, h.y, h.z);
        let ground = physics.create_body(&BodyDesc::fixed(Pose::at(na::Vector3::new(0.0, -h.y, 0.0))))?;
        created.push(ground);
        physics.create_collider(
            &ColliderDesc::world(ground_shape, CRATE_DENSITY, StriderConfig::GROUND_FRICTION, 0.0),
            ground,
        )?;

        let mut obstacles = Vec::with_capacity(self.obstacles.len());
        for obstacle in &self.obstacles {
            let e = obstacle.half_extent;
            let shape = LinkShape::cuboid(e, e, e);
            let body = physics.create_body(&BodyDesc::prop(Pose::at(obstacle.center)))?;
            created.push(body);
            physics.create_collider(
                &ColliderDesc::world(shape, CRATE_DENSITY, CRATE_FRICTION, CRATE_RESTITUTION),
                body,
            )?;
            obstacles.push((body, shape, obstacle.hue));
        }

        log::info!("Spawned ground and {} crates", obstacles.len());
        Ok(SpawnedTerrain {
            ground,
            ground_shape,
            obstacles,
        })
    }
}
