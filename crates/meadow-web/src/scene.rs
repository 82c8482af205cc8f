//! 3D scene: camera, lights, ground, grid and axes

use bevy::asset::RenderAssetUsages;
use bevy::core_pipeline::tonemapping::Tonemapping;
use bevy::image::{ImageAddressMode, ImageSampler, ImageSamplerDescriptor};
use bevy::input::mouse::{AccumulatedMouseMotion, AccumulatedMouseScroll, MouseScrollUnit};
use bevy::math::Affine2;
use bevy::prelude::*;
use bevy::render::render_resource::{Extent3d, TextureDimension, TextureFormat};

use meadow_core::config::{CameraConfig, GroundConfig, LightingConfig};
use meadow_core::framing::{orbit_position, CameraState};
use meadow_core::{GrassTexture, LightRig};

use crate::app::{Lighting, ResetView, Session, ViewerSettings, WorldSettings};

/// Ambient brightness per unit of hemisphere intensity
const AMBIENT_SCALE: f32 = 400.0;
/// Illuminance (lux) per unit of directional light intensity
const ILLUMINANCE_SCALE: f32 = 6000.0;
const FILL_POSITION: Vec3 = Vec3::new(10.0, 12.0, 10.0);

pub struct ScenePlugin;

impl Plugin for ScenePlugin {
    fn build(&self, app: &mut App) {
        let camera_config = app
            .world()
            .get_resource::<ViewerSettings>()
            .map(|settings| settings.config.camera.clone())
            .unwrap_or_default();
        let camera = OrbitCamera::from_config(&camera_config);
        app.insert_resource(camera)
            .add_systems(Startup, setup_scene)
            .add_systems(Update, (
                reset_view,
                update_camera,
                update_world_visibility,
                update_lighting,
            ).chain());
    }
}

/// Marker component for the main camera
#[derive(Component)]
pub struct MainCamera;

/// Parent of all grid lines
#[derive(Component)]
pub struct Grid;

/// Parent of the world axes
#[derive(Component)]
pub struct WorldAxes;

/// Light fixed in the sky, no shadows
#[derive(Component)]
pub struct FillLight;

/// Light following the sun-angle slider, casts shadows
#[derive(Component)]
pub struct SunLight;

/// Orbit camera state
#[derive(Debug, Clone, Resource)]
pub struct OrbitCamera {
    pub distance: f32,
    pub target_distance: f32, // For smooth zoom
    pub azimuth: f32,
    pub elevation: f32,
    pub target: Vec3,
    pub near: f32,
    pub far: f32,
    pub sensitivity: f32,
    pub zoom_speed: f32,
    pub smooth_factor: f32,
    pub auto_rotate_speed: f32,
}

impl OrbitCamera {
    pub fn from_config(config: &CameraConfig) -> Self {
        let mut camera = Self {
            distance: 1.0,
            target_distance: 1.0,
            azimuth: 0.0,
            elevation: 0.0,
            target: Vec3::ZERO,
            near: 0.01,
            far: 5000.0,
            sensitivity: config.sensitivity,
            zoom_speed: config.zoom_speed,
            smooth_factor: config.smooth_factor,
            auto_rotate_speed: config.auto_rotate_speed,
        };
        // Start slightly above and to the side of the origin
        camera.apply(&CameraState {
            position: Vec3::new(6.0, 5.0, 8.0),
            target: Vec3::new(0.0, 1.0, 0.0),
            near: 0.01,
            far: 5000.0,
        });
        camera
    }

    /// Jump to a framed or saved pose
    pub fn apply(&mut self, state: &CameraState) {
        let (azimuth, elevation) = state.orbit_angles();
        self.azimuth = azimuth;
        self.elevation = elevation;
        self.distance = state.distance();
        self.target_distance = self.distance;
        self.target = state.target;
        self.near = state.near;
        self.far = state.far;
    }

    pub fn position(&self) -> Vec3 {
        orbit_position(self.target, self.distance, self.azimuth, self.elevation)
    }
}

fn setup_scene(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut images: ResMut<Assets<Image>>,
    settings: Res<ViewerSettings>,
    orbit: Res<OrbitCamera>,
    lighting: Res<Lighting>,
) {
    let config = &settings.config;

    commands.spawn((
        Camera3d::default(),
        Projection::Perspective(PerspectiveProjection {
            fov: config.camera.fov_radians(),
            near: orbit.near,
            far: orbit.far,
            ..default()
        }),
        Tonemapping::AcesFitted,
        Transform::from_translation(orbit.position()).looking_at(orbit.target, Vec3::Y),
        MainCamera,
    ));

    spawn_lights(&mut commands, lighting.0, &config.lighting);
    spawn_ground(&mut commands, &mut meshes, &mut materials, &mut images, &config.ground);
    spawn_grid(&mut commands, &mut meshes, &mut materials, &config.ground);
    spawn_axes(&mut commands, &mut meshes, &mut materials, config.ground.axes_length);
}

fn spawn_lights(commands: &mut Commands, controls: meadow_core::LightingControls, config: &LightingConfig) {
    let rig = LightRig::compute(controls, config);

    // Sky-tinted ambient stands in for the hemisphere light
    commands.insert_resource(AmbientLight {
        color: Color::srgb(0.9, 0.93, 1.0),
        brightness: rig.hemi_intensity * AMBIENT_SCALE,
        ..default()
    });

    commands.spawn((
        DirectionalLight {
            illuminance: rig.fill_intensity * ILLUMINANCE_SCALE,
            shadows_enabled: false,
            ..default()
        },
        Transform::from_translation(FILL_POSITION).looking_at(Vec3::ZERO, Vec3::Y),
        FillLight,
    ));

    commands.spawn((
        DirectionalLight {
            illuminance: rig.sun_intensity * ILLUMINANCE_SCALE,
            shadows_enabled: true,
            ..default()
        },
        Transform::from_translation(rig.sun_position).looking_at(rig.sun_target, Vec3::Y),
        SunLight,
    ));
}

fn spawn_ground(
    commands: &mut Commands,
    meshes: &mut Assets<Mesh>,
    materials: &mut Assets<StandardMaterial>,
    images: &mut Assets<Image>,
    config: &GroundConfig,
) {
    let grass = GrassTexture::generate(config.texture_size, config.seed);
    let mut image = Image::new(
        Extent3d {
            width: grass.size,
            height: grass.size,
            depth_or_array_layers: 1,
        },
        TextureDimension::D2,
        grass.pixels,
        TextureFormat::Rgba8UnormSrgb,
        RenderAssetUsages::default(),
    );
    image.sampler = ImageSampler::Descriptor(ImageSamplerDescriptor {
        address_mode_u: ImageAddressMode::Repeat,
        address_mode_v: ImageAddressMode::Repeat,
        anisotropy_clamp: 16,
        ..ImageSamplerDescriptor::linear()
    });

    commands.spawn((
        Mesh3d(meshes.add(Plane3d::default().mesh().size(config.size, config.size))),
        MeshMaterial3d(materials.add(StandardMaterial {
            base_color_texture: Some(images.add(image)),
            perceptual_roughness: 1.0,
            metallic: 0.0,
            uv_transform: Affine2::from_scale(Vec2::splat(config.texture_repeat)),
            // Push the ground back so coplanar model geometry wins
            depth_bias: -1.0,
            ..default()
        })),
        Transform::IDENTITY,
    ));
}

fn spawn_grid(
    commands: &mut Commands,
    meshes: &mut Assets<Mesh>,
    materials: &mut Assets<StandardMaterial>,
    config: &GroundConfig,
) {
    let divisions = config.grid_divisions.max(1);
    let half = config.size / 2.0;
    let spacing = config.size / divisions as f32;
    let thickness = 0.02;

    let line_material = materials.add(StandardMaterial {
        base_color: Color::srgba(0.53, 0.53, 0.53, 0.25),
        unlit: true,
        alpha_mode: AlphaMode::Blend,
        ..default()
    });
    let line_x = meshes.add(Cuboid::new(config.size, thickness, thickness));
    let line_z = meshes.add(Cuboid::new(thickness, thickness, config.size));

    commands
        .spawn((Transform::from_xyz(0.0, 0.002, 0.0), Visibility::Hidden, Grid))
        .with_children(|parent| {
            for i in 0..=divisions {
                let offset = -half + i as f32 * spacing;
                parent.spawn((
                    Mesh3d(line_x.clone()),
                    MeshMaterial3d(line_material.clone()),
                    Transform::from_xyz(0.0, 0.0, offset),
                ));
                parent.spawn((
                    Mesh3d(line_z.clone()),
                    MeshMaterial3d(line_material.clone()),
                    Transform::from_xyz(offset, 0.0, 0.0),
                ));
            }
        });
}

fn spawn_axes(
    commands: &mut Commands,
    meshes: &mut Assets<Mesh>,
    materials: &mut Assets<StandardMaterial>,
    length: f32,
) {
    let thickness = 0.015;
    let cone_height = thickness * 6.0;
    let cone_radius = thickness * 2.5;
    let shaft = meshes.add(Cylinder::new(thickness, length));
    let tip = meshes.add(Cone::new(cone_radius, cone_height));

    // Cylinders and cones are Y-aligned; rotate them onto each axis
    let axes = [
        (Vec3::X, Quat::from_rotation_z(-std::f32::consts::FRAC_PI_2), Color::srgb(0.9, 0.2, 0.2)),
        (Vec3::Y, Quat::IDENTITY, Color::srgb(0.2, 0.9, 0.2)),
        (Vec3::Z, Quat::from_rotation_x(std::f32::consts::FRAC_PI_2), Color::srgb(0.2, 0.2, 0.9)),
    ];

    commands
        .spawn((Transform::default(), Visibility::Hidden, WorldAxes))
        .with_children(|parent| {
            for (direction, rotation, color) in axes {
                let material = materials.add(StandardMaterial {
                    base_color: color,
                    unlit: true,
                    ..default()
                });
                parent.spawn((
                    Mesh3d(shaft.clone()),
                    MeshMaterial3d(material.clone()),
                    Transform::from_translation(direction * length / 2.0).with_rotation(rotation),
                ));
                parent.spawn((
                    Mesh3d(tip.clone()),
                    MeshMaterial3d(material),
                    Transform::from_translation(direction * (length + cone_height / 2.0))
                        .with_rotation(rotation),
                ));
            }
        });
}

fn reset_view(
    mut events: MessageReader<ResetView>,
    session: Res<Session>,
    mut orbit: ResMut<OrbitCamera>,
) {
    if events.read().count() == 0 {
        return;
    }
    match session.0.default_camera() {
        Some(state) => {
            tracing::debug!("Restoring default camera");
            orbit.apply(state);
        }
        None => tracing::debug!("No default camera to restore"),
    }
}

fn update_camera(
    mut camera_query: Query<(&mut Transform, &mut Projection), With<MainCamera>>,
    mut orbit: ResMut<OrbitCamera>,
    mouse_motion: Res<AccumulatedMouseMotion>,
    mouse_scroll: Res<AccumulatedMouseScroll>,
    mouse_button: Res<ButtonInput<MouseButton>>,
    touch_input: Res<Touches>,
    world: Res<WorldSettings>,
    time: Res<Time>,
    mut contexts: bevy_egui::EguiContexts,
) {
    // Leave the pointer to egui while it is over a panel
    let egui_wants_pointer = contexts
        .ctx_mut()
        .map(|ctx| ctx.wants_pointer_input() || ctx.is_pointer_over_area())
        .unwrap_or(false);

    if !egui_wants_pointer {
        if mouse_button.pressed(MouseButton::Left) {
            let delta = mouse_motion.delta;
            orbit.azimuth += delta.x * orbit.sensitivity;
            orbit.elevation = (orbit.elevation + delta.y * orbit.sensitivity).clamp(-1.5, 1.5);
        }

        let scroll_lines = match mouse_scroll.unit {
            MouseScrollUnit::Line => mouse_scroll.delta.y,
            MouseScrollUnit::Pixel => mouse_scroll.delta.y / 100.0,
        };
        if scroll_lines != 0.0 {
            let zoom_factor = 1.0 - scroll_lines * orbit.zoom_speed;
            let max_distance = orbit.far * 0.5;
            orbit.target_distance = (orbit.target_distance * zoom_factor.max(0.1))
                .clamp(orbit.near * 2.0, max_distance.max(orbit.near * 4.0));
        }

        // One finger orbits, two fingers pinch-zoom
        let touches: Vec<_> = touch_input.iter().collect();
        match touches.as_slice() {
            [touch] => {
                let delta = touch.delta();
                orbit.azimuth += delta.x * orbit.sensitivity;
                orbit.elevation = (orbit.elevation + delta.y * orbit.sensitivity).clamp(-1.5, 1.5);
            }
            [t1, t2] => {
                let current = t1.position().distance(t2.position());
                let previous = (t1.position() - t1.delta()).distance(t2.position() - t2.delta());
                orbit.target_distance *= previous / current.max(1.0);
            }
            _ => {}
        }
    }

    let dt = time.delta_secs();
    if world.auto_rotate {
        orbit.azimuth += orbit.auto_rotate_speed * dt;
    }

    let lerp_factor = 1.0 - (-orbit.smooth_factor * 60.0 * dt).exp();
    orbit.distance += (orbit.target_distance - orbit.distance) * lerp_factor;

    if let Ok((mut transform, mut projection)) = camera_query.single_mut() {
        transform.translation = orbit.position();
        transform.look_at(orbit.target, Vec3::Y);

        let stale = matches!(
            &*projection,
            Projection::Perspective(p) if p.near != orbit.near || p.far != orbit.far
        );
        if stale {
            if let Projection::Perspective(perspective) = projection.as_mut() {
                perspective.near = orbit.near;
                perspective.far = orbit.far;
            }
        }
    }
}

fn update_world_visibility(
    world: Res<WorldSettings>,
    mut grid: Query<&mut Visibility, (With<Grid>, Without<WorldAxes>)>,
    mut axes: Query<&mut Visibility, (With<WorldAxes>, Without<Grid>)>,
) {
    if !world.is_changed() {
        return;
    }

    let visibility = |shown: bool| if shown { Visibility::Visible } else { Visibility::Hidden };
    for mut v in grid.iter_mut() {
        *v = visibility(world.show_grid);
    }
    for mut v in axes.iter_mut() {
        *v = visibility(world.show_axes);
    }
}

fn update_lighting(
    lighting: Res<Lighting>,
    settings: Res<ViewerSettings>,
    mut ambient: ResMut<AmbientLight>,
    mut fill: Query<&mut DirectionalLight, (With<FillLight>, Without<SunLight>)>,
    mut sun: Query<(&mut DirectionalLight, &mut Transform), (With<SunLight>, Without<FillLight>)>,
) {
    if !lighting.is_changed() {
        return;
    }

    let rig = LightRig::compute(lighting.0, &settings.config.lighting);

    ambient.brightness = rig.hemi_intensity * AMBIENT_SCALE;
    for mut light in fill.iter_mut() {
        light.illuminance = rig.fill_intensity * ILLUMINANCE_SCALE;
    }
    for (mut light, mut transform) in sun.iter_mut() {
        light.illuminance = rig.sun_intensity * ILLUMINANCE_SCALE;
        *transform = Transform::from_translation(rig.sun_position).looking_at(rig.sun_target, Vec3::Y);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_restores_pose() {
        let mut camera = OrbitCamera::from_config(&CameraConfig::default());
        let state = CameraState {
            position: Vec3::new(-3.0, 4.0, 12.0),
            target: Vec3::new(1.0, 0.5, 0.0),
            near: 0.2,
            far: 900.0,
        };
        camera.apply(&state);

        assert!((camera.position() - state.position).length() < 1e-4);
        assert_eq!(camera.target_distance, camera.distance);
        assert_eq!(camera.near, 0.2);
        assert_eq!(camera.far, 900.0);
    }
}
