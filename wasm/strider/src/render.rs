//! Rendering systems for the walker.
//!
//! Primitive meshes mirror every physics body, an optional glTF skin rides on the
//! torso, and the ground gets a gizmo grid.

use std::collections::{HashMap, HashSet};

use bevy::asset::LoadState;
use bevy::pbr::StandardMaterial;
use bevy::prelude::*;

use strider_physics::{BodyHandle, BodyTag, LinkRole, LinkShape, PhysicsAdapter, Pose, RenderAdapter, Variant};

use crate::web_bevy::StriderState;

/// Links a Bevy entity to the physics body it mirrors.
#[derive(Component)]
pub struct PhysicsBody {
    pub body: BodyHandle,
}

/// Entity for every body the simulation told us about.
#[derive(Resource, Default)]
pub struct BodyEntities {
    map: HashMap<BodyHandle, Entity>,
}

impl BodyEntities {
    pub fn get(&self, body: BodyHandle) -> Option<Entity> {
        self.map.get(&body).copied()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

pub fn pose_to_transform(pose: &Pose) -> Transform {
    let t = pose.position;
    let r = pose.orientation;
    Transform {
        translation: Vec3::new(t.x, t.y, t.z),
        rotation: Quat::from_xyzw(r.i, r.j, r.k, r.w),
        scale: Vec3::ONE,
    }
}

fn tag_color(tag: BodyTag) -> Color {
    match tag {
        BodyTag::Robot(LinkRole::Torso) => Color::srgb(0.85, 0.55, 0.2),
        BodyTag::Robot(LinkRole::UpperLeg(_)) => Color::srgb(0.32, 0.36, 0.46),
        BodyTag::Robot(LinkRole::LowerLeg(_)) => Color::srgb(0.22, 0.25, 0.32),
        BodyTag::Ground => Color::srgb(0.58, 0.64, 0.72),
        BodyTag::Crate { hue } => Color::hsl(hue, 0.7, 0.55),
    }
}

/// [`RenderAdapter`] over Bevy commands. Poses are collected and applied after the
/// flush so freshly spawned entities get their first transform too.
struct SceneWriter<'a, 'w, 's> {
    commands: &'a mut Commands<'w, 's>,
    meshes: &'a mut Assets<Mesh>,
    materials: &'a mut Assets<StandardMaterial>,
    entities: &'a mut BodyEntities,
    poses: Vec<(Entity, Transform)>,
}

impl RenderAdapter for SceneWriter<'_, '_, '_> {
    fn add_mesh(&mut self, body: BodyHandle, shape: &LinkShape, tag: BodyTag) {
        let mesh = match *shape {
            LinkShape::Cuboid { half_extents: h } => self.meshes.add(Cuboid::new(2.0 * h.x, 2.0 * h.y, 2.0 * h.z)),
            LinkShape::Ball { radius } => self.meshes.add(Sphere::new(radius)),
        };
        let material = self.materials.add(StandardMaterial {
            base_color: tag_color(tag),
            perceptual_roughness: 0.9,
            ..default()
        });
        let entity = self
            .commands
            .spawn((Mesh3d(mesh), MeshMaterial3d(material), Transform::default(), PhysicsBody { body }))
            .id();
        if let Some(stale) = self.entities.map.insert(body, entity) {
            self.commands.entity(stale).despawn_recursive();
        }
    }

    fn remove_mesh(&mut self, body: BodyHandle) {
        if let Some(entity) = self.entities.map.remove(&body) {
            self.commands.entity(entity).despawn_recursive();
        }
    }

    fn sync_pose(&mut self, body: BodyHandle, pose: &Pose) {
        if let Some(entity) = self.entities.get(body) {
            self.poses.push((entity, pose_to_transform(pose)));
        }
    }
}

/// Draw ground grid using gizmos (reliable on WebGL2, no shader issues)
pub fn draw_ground_grid(mut gizmos: Gizmos) {
    let grid_color = Color::srgb(0.15, 0.15, 0.18);
    let grid_size = 20.0;
    let grid_step = 1.0;
    // Just above the ground slab to avoid z-fighting
    let y = 0.002;

    let steps = (grid_size / grid_step) as i32;
    for i in -steps..=steps {
        let pos = i as f32 * grid_step;
        gizmos.line(Vec3::new(-grid_size, y, pos), Vec3::new(grid_size, y, pos), grid_color);
        gizmos.line(Vec3::new(pos, y, -grid_size), Vec3::new(pos, y, grid_size), grid_color);
    }

    let axis_color = Color::srgb(0.3, 0.3, 0.35);
    gizmos.line(Vec3::new(-grid_size, y, 0.0), Vec3::new(grid_size, y, 0.0), axis_color);
    gizmos.line(Vec3::new(0.0, y, -grid_size), Vec3::new(0.0, y, grid_size), axis_color);
}

/// Apply queued mesh additions/removals and push body poses onto entities
pub fn sync_bodies(
    mut state: ResMut<StriderState>,
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut entities: ResMut<BodyEntities>,
    mut transforms: Query<&mut Transform, With<PhysicsBody>>,
) {
    let mut writer = SceneWriter {
        commands: &mut commands,
        meshes: &mut meshes,
        materials: &mut materials,
        entities: &mut entities,
        poses: Vec::new(),
    };
    state.sim.flush_render(&mut writer);
    let poses = writer.poses;

    for (entity, pose) in poses {
        match transforms.get_mut(entity) {
            Ok(mut transform) => *transform = pose,
            // Spawned this frame; the command queue has not been applied yet.
            Err(_) => {
                commands.entity(entity).insert(pose);
            }
        }
    }
}

/// Optional glTF skin for the active variant.
#[derive(Resource, Default)]
pub struct SkinSlot {
    torso: Option<BodyHandle>,
    pending: Option<Handle<Scene>>,
    spawned: Option<Entity>,
}

/// Skin scene root that follows a physics body.
#[derive(Component)]
pub struct SkinFollower {
    pub body: BodyHandle,
}

pub fn skin_path(variant: Variant) -> &'static str {
    match variant {
        Variant::Quadruped => "skins/quadruped.glb#Scene0",
        Variant::Humanoid => "skins/humanoid.glb#Scene0",
    }
}

/// Load the skin for the current robot. A failed load only logs: the primitive
/// meshes keep rendering and nothing in the simulation changes.
pub fn manage_skin(
    mut commands: Commands,
    asset_server: Res<AssetServer>,
    state: Res<StriderState>,
    entities: Res<BodyEntities>,
    mut slot: ResMut<SkinSlot>,
    mut followers: Query<(&SkinFollower, &mut Transform), Without<PhysicsBody>>,
) {
    let Some(model) = state.sim.model() else {
        return;
    };
    let torso = model.torso();

    if slot.torso != Some(torso) {
        if let Some(old) = slot.spawned.take() {
            commands.entity(old).despawn_recursive();
        }
        slot.torso = Some(torso);
        slot.pending = Some(asset_server.load(skin_path(model.variant())));
    }

    if let Some(handle) = slot.pending.clone() {
        match asset_server.get_load_state(&handle) {
            Some(LoadState::Loaded) => {
                let skin = commands
                    .spawn((SceneRoot(handle), Transform::default(), SkinFollower { body: torso }))
                    .id();
                slot.spawned = Some(skin);
                slot.pending = None;
                if let Some(mesh) = entities.get(torso) {
                    commands.entity(mesh).insert(Visibility::Hidden);
                }
                log::info!("Skin attached for {:?}", model.variant());
            }
            Some(LoadState::Failed(err)) => {
                log::warn!("No skin for {:?}, keeping primitive meshes: {}", model.variant(), err);
                slot.pending = None;
            }
            _ => {}
        }
    }

    if let Some(pose) = state.sim.physics().body_pose(torso) {
        for (follower, mut transform) in &mut followers {
            if follower.body == torso {
                *transform = pose_to_transform(&pose);
            }
        }
    }
}

/// Fix glTF materials for WebGL2 compatibility.
/// WebGL2 doesn't support all PBR features, causing "pink" textures.
/// This clears textures and forces unlit mode.
pub fn fix_materials(
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut fixed: Local<HashSet<AssetId<StandardMaterial>>>,
) {
    for (id, material) in materials.iter_mut() {
        if fixed.contains(&id) {
            continue;
        }

        material.base_color_texture = None;
        material.normal_map_texture = None;
        material.metallic_roughness_texture = None;
        material.occlusion_texture = None;
        material.emissive_texture = None;
        material.depth_map = None;
        material.unlit = true;

        fixed.insert(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra as na;

    #[test]
    fn test_pose_to_transform() {
        let pose = Pose::new(
            na::Vector3::new(1.0, 2.0, 3.0),
            na::UnitQuaternion::from_axis_angle(&na::Vector3::y_axis(), 0.5),
        );
        let t = pose_to_transform(&pose);
        assert_eq!(t.translation, Vec3::new(1.0, 2.0, 3.0));
        let expected = Quat::from_rotation_y(0.5);
        assert!(t.rotation.angle_between(expected) < 1e-5);
    }

    #[test]
    fn test_every_variant_has_a_skin_path() {
        assert_ne!(skin_path(Variant::Quadruped), skin_path(Variant::Humanoid));
    }
}
