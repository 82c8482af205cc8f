//! Import pipeline: bytes -> glTF asset -> scene root -> arranged model

use bevy::asset::LoadState;
use bevy::ecs::system::SystemParam;
use bevy::gltf::Gltf;
use bevy::light::{NotShadowCaster, NotShadowReceiver};
use bevy::math::Affine3A;
use bevy::prelude::*;
use bevy::scene::{SceneInstance, SceneSpawner};
use std::path::{Path, PathBuf};

use meadow_core::error::ImportError;
use meadow_core::import::{
    gltf_dependencies, is_gltf_json, pick_scene, progress_fraction, ImportOrigin, ImportQueue,
    ImportRequest, ImportSource,
};
use meadow_core::status::StatusMessage;
use meadow_core::{Aabb3, GroundFilter, LoadedModel, MeshTreatment};

use crate::app::{ClearModels, MemoryImports, Session, Status, ViewerSettings, MEMORY_SOURCE};
use crate::file_picker::PendingFiles;
use crate::network::{decode_uri, download_model, download_resources, DownloadEvent, PendingDownloads};
use crate::scene::OrbitCamera;

pub struct ModelsPlugin;

impl Plugin for ModelsPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<ImportPipeline>()
            .add_systems(Update, (
                clear_models,
                enqueue_picked_files,
                start_next_import,
                process_downloads,
                process_parsed_assets,
                finish_spawned_scenes,
            ).chain());
    }
}

/// Root entity of an imported model
#[derive(Component, Debug)]
pub struct ModelRoot {
    pub name: String,
    pub gltf: Handle<Gltf>,
}

/// Sequential import state
#[derive(Resource, Default)]
pub struct ImportPipeline {
    pub queue: ImportQueue,
    in_flight: Option<InFlight>,
    next_ticket: u64,
}

impl ImportPipeline {
    /// Queued plus in-flight imports
    pub fn pending(&self) -> usize {
        self.queue.len() + usize::from(self.in_flight.is_some())
    }
}

struct InFlight {
    ticket: u64,
    name: String,
    /// Set for downloads; sibling resources resolve against it
    url: Option<String>,
    origin: ImportOrigin,
    generation: u64,
    stage: Stage,
}

enum Stage {
    Downloading,
    /// A glTF JSON waiting for the buffers and images it references
    FetchingResources { model: Vec<u8> },
    Parsing { gltf: Handle<Gltf>, paths: Vec<PathBuf> },
    Spawning { root: Entity, gltf: Handle<Gltf> },
}

/// Assets and hierarchy queries needed to inspect or release a model
#[derive(SystemParam)]
pub struct ModelAssets<'w, 's> {
    pub meshes: ResMut<'w, Assets<Mesh>>,
    pub materials: ResMut<'w, Assets<StandardMaterial>>,
    pub images: ResMut<'w, Assets<Image>>,
    pub gltfs: ResMut<'w, Assets<Gltf>>,
    pub children: Query<'w, 's, &'static Children>,
    pub transforms: Query<'w, 's, &'static Transform>,
    pub mesh_query: Query<'w, 's, &'static Mesh3d>,
    pub material_query: Query<'w, 's, &'static MeshMaterial3d<StandardMaterial>>,
}

impl ModelAssets<'_, '_> {
    /// Despawn a model root and free its meshes, materials and textures
    fn dispose(&mut self, commands: &mut Commands, root: Entity, gltf: &Handle<Gltf>) {
        let mut mesh_ids = Vec::new();
        let mut material_ids = Vec::new();

        for entity in std::iter::once(root).chain(self.children.iter_descendants(root)) {
            if let Ok(mesh) = self.mesh_query.get(entity) {
                mesh_ids.push(mesh.0.id());
            }
            if let Ok(material) = self.material_query.get(entity) {
                material_ids.push(material.0.id());
            }
        }

        for id in material_ids {
            if let Some(material) = self.materials.remove(id) {
                let textures = [
                    material.base_color_texture,
                    material.emissive_texture,
                    material.metallic_roughness_texture,
                    material.normal_map_texture,
                    material.occlusion_texture,
                ];
                for texture in textures.into_iter().flatten() {
                    self.images.remove(&texture);
                }
            }
        }

        for id in mesh_ids {
            self.meshes.remove(id);
        }

        commands.entity(root).despawn();
        self.gltfs.remove(gltf);
    }
}

/// Empty the session, dropping queued work from the old session
fn clear_models(
    mut commands: Commands,
    mut events: MessageReader<ClearModels>,
    mut session: ResMut<Session>,
    mut pipeline: ResMut<ImportPipeline>,
    mut status: ResMut<Status>,
    mut assets: ModelAssets,
    roots: Query<&ModelRoot>,
) {
    if events.read().count() == 0 {
        return;
    }

    let removed = session.0.clear();
    for model in &removed {
        if let Ok(root) = roots.get(model.root) {
            assets.dispose(&mut commands, model.root, &root.gltf);
        }
    }

    let dropped = pipeline.queue.discard_stale(session.0.generation());
    if dropped > 0 {
        tracing::info!(dropped, "Queued imports discarded by clear");
    }
    status.0.clear();
}

/// Move files read by the picker or a drop into the import queue
fn enqueue_picked_files(
    pending: Res<PendingFiles>,
    session: Res<Session>,
    mut pipeline: ResMut<ImportPipeline>,
    mut status: ResMut<Status>,
) {
    let files: Vec<_> = match pending.0.lock() {
        Ok(mut queue) => queue.drain(..).collect(),
        Err(_) => return,
    };

    for file in files {
        match file.contents {
            Ok(bytes) => pipeline.queue.push(ImportRequest {
                name: file.name,
                source: ImportSource::Bytes(bytes),
                origin: ImportOrigin::Local,
                generation: session.0.generation(),
            }),
            Err(e) => {
                tracing::error!("{}", e);
                status.0.set(StatusMessage::LoadFailed { name: file.name });
            }
        }
    }
}

fn start_next_import(
    mut pipeline: ResMut<ImportPipeline>,
    mut status: ResMut<Status>,
    imports: Res<MemoryImports>,
    downloads: Res<PendingDownloads>,
    asset_server: Res<AssetServer>,
) {
    if pipeline.in_flight.is_some() {
        return;
    }
    let Some(request) = pipeline.queue.start_next() else { return };

    let ticket = pipeline.next_ticket;
    pipeline.next_ticket += 1;

    let (url, stage) = match request.source {
        ImportSource::Bytes(bytes) => {
            status.0.set(StatusMessage::Importing { name: request.name.clone() });
            (None, begin_parse(&imports, &asset_server, ticket, &request.name, bytes, Vec::new()))
        }
        ImportSource::Url(url) => {
            status.0.set(StatusMessage::Loading {
                name: request.name.clone(),
                percent: None,
            });
            download_model(&url, ticket, &downloads);
            (Some(url), Stage::Downloading)
        }
    };

    pipeline.in_flight = Some(InFlight {
        ticket,
        name: request.name,
        url,
        origin: request.origin,
        generation: request.generation,
        stage,
    });
}

/// Folder of one import in the memory source: `imports/<ticket>`
fn import_dir(ticket: u64) -> PathBuf {
    Path::new("imports").join(ticket.to_string())
}

/// Memory-source path of the model file itself, extension lowercased
fn memory_path(ticket: u64, name: &str) -> PathBuf {
    let sanitized: String = name
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | '#' | ':') { '_' } else { c })
        .collect();
    let file_name = match sanitized.rsplit_once('.') {
        Some((stem, ext)) => format!("{stem}.{}", ext.to_ascii_lowercase()),
        None => sanitized,
    };
    import_dir(ticket).join(file_name)
}

/// Memory-source path of a resource, where the glTF loader will look for it
fn resource_path(ticket: u64, uri: &str) -> PathBuf {
    import_dir(ticket).join(decode_uri(uri))
}

fn begin_parse(
    imports: &MemoryImports,
    asset_server: &AssetServer,
    ticket: u64,
    name: &str,
    bytes: Vec<u8>,
    resources: Vec<(String, Vec<u8>)>,
) -> Stage {
    let mut paths = Vec::with_capacity(resources.len() + 1);
    for (uri, data) in resources {
        let path = resource_path(ticket, &uri);
        imports.0.insert_asset(&path, data);
        paths.push(path);
    }

    let path = memory_path(ticket, name);
    tracing::debug!(path = %path.display(), size = bytes.len(), resources = paths.len(), "Parsing model");
    imports.0.insert_asset(&path, bytes);

    let asset_path = format!("{}://{}", MEMORY_SOURCE, path.to_string_lossy().replace('\\', "/"));
    let gltf = asset_server.load::<Gltf>(asset_path);
    paths.push(path);
    Stage::Parsing { gltf, paths }
}

fn process_downloads(
    mut pipeline: ResMut<ImportPipeline>,
    mut status: ResMut<Status>,
    session: Res<Session>,
    imports: Res<MemoryImports>,
    downloads: Res<PendingDownloads>,
    asset_server: Res<AssetServer>,
) {
    for event in downloads.drain() {
        let Some(in_flight) = pipeline.in_flight.as_mut() else { continue };

        match event {
            DownloadEvent::Progress { ticket, loaded, total } if ticket == in_flight.ticket => {
                if let Some(fraction) = progress_fraction(loaded, total) {
                    status.0.set(StatusMessage::Loading {
                        name: in_flight.name.clone(),
                        percent: Some((fraction * 100.0).round() as u32),
                    });
                }
            }
            DownloadEvent::Finished { ticket, result } if ticket == in_flight.ticket => {
                if !session.0.is_current(in_flight.generation) {
                    tracing::info!(name = %in_flight.name, "Dropping download from a cleared session");
                    finish(&mut pipeline, false);
                    continue;
                }
                let bytes = match result {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        fail(&mut pipeline, &mut status, ImportError::from(e));
                        continue;
                    }
                };

                let resources = if is_gltf_json(&in_flight.name) {
                    gltf_dependencies(&bytes)
                } else {
                    Vec::new()
                };
                match (&in_flight.url, resources.is_empty()) {
                    (Some(url), false) => {
                        tracing::info!(name = %in_flight.name, count = resources.len(), "Fetching glTF resources");
                        download_resources(url, resources, ticket, &downloads);
                        in_flight.stage = Stage::FetchingResources { model: bytes };
                    }
                    _ => {
                        in_flight.stage =
                            begin_parse(&imports, &asset_server, ticket, &in_flight.name, bytes, Vec::new());
                    }
                }
            }
            DownloadEvent::Resources { ticket, result } if ticket == in_flight.ticket => {
                if !session.0.is_current(in_flight.generation) {
                    tracing::info!(name = %in_flight.name, "Dropping resources from a cleared session");
                    finish(&mut pipeline, false);
                    continue;
                }
                let files = match result {
                    Ok(files) => files,
                    Err(e) => {
                        fail(&mut pipeline, &mut status, ImportError::from(e));
                        continue;
                    }
                };
                let Stage::FetchingResources { model } =
                    std::mem::replace(&mut in_flight.stage, Stage::Downloading)
                else {
                    continue;
                };
                in_flight.stage = begin_parse(&imports, &asset_server, ticket, &in_flight.name, model, files);
            }
            _ => {}
        }
    }
}

fn process_parsed_assets(
    mut commands: Commands,
    mut pipeline: ResMut<ImportPipeline>,
    mut status: ResMut<Status>,
    session: Res<Session>,
    imports: Res<MemoryImports>,
    asset_server: Res<AssetServer>,
    mut gltfs: ResMut<Assets<Gltf>>,
) {
    let Some(in_flight) = pipeline.in_flight.as_mut() else { return };
    let Stage::Parsing { gltf, paths } = &in_flight.stage else { return };

    let outcome = match asset_server.get_load_state(gltf.id()) {
        Some(LoadState::Loaded) => match gltfs.get(gltf) {
            Some(asset) => pick_scene(&in_flight.name, asset.default_scene.as_ref(), &asset.scenes),
            None => return,
        },
        Some(LoadState::Failed(e)) => Err(ImportError::Parse {
            name: in_flight.name.clone(),
            reason: e.to_string(),
        }),
        _ => return,
    };

    // The loader holds its own copies from here on
    for path in paths {
        imports.0.remove_asset(path);
    }
    let gltf = gltf.clone();

    if !session.0.is_current(in_flight.generation) {
        tracing::info!(name = %in_flight.name, "Dropping parsed model from a cleared session");
        gltfs.remove(&gltf);
        finish(&mut pipeline, false);
        return;
    }

    match outcome {
        Ok(scene) => {
            let root = commands
                .spawn((
                    SceneRoot(scene),
                    Transform::IDENTITY,
                    // Shown once it has been placed
                    Visibility::Hidden,
                    ModelRoot {
                        name: in_flight.name.clone(),
                        gltf: gltf.clone(),
                    },
                    Name::new(in_flight.name.clone()),
                ))
                .id();
            in_flight.stage = Stage::Spawning { root, gltf };
        }
        Err(e) => {
            gltfs.remove(&gltf);
            fail(&mut pipeline, &mut status, e);
        }
    }
}

/// Suppress embedded ground, measure the model, then re-lay-out the row
fn finish_spawned_scenes(
    mut commands: Commands,
    mut pipeline: ResMut<ImportPipeline>,
    mut status: ResMut<Status>,
    mut session: ResMut<Session>,
    mut orbit: ResMut<OrbitCamera>,
    settings: Res<ViewerSettings>,
    scene_spawner: Res<SceneSpawner>,
    instances: Query<&SceneInstance>,
    mut assets: ModelAssets,
) {
    let Some(in_flight) = pipeline.in_flight.as_ref() else { return };
    let Stage::Spawning { root, gltf } = &in_flight.stage else { return };
    let (root, gltf) = (*root, gltf.clone());

    let Ok(instance) = instances.get(root) else { return };
    if !scene_spawner.instance_is_ready(**instance) {
        return;
    }

    if !session.0.is_current(in_flight.generation) {
        tracing::info!(name = %in_flight.name, "Discarding model spawned for a cleared session");
        assets.dispose(&mut commands, root, &gltf);
        finish(&mut pipeline, false);
        return;
    }

    let config = &settings.config;
    let filter = GroundFilter::from(&config.ground_filter);
    let mut bounds: Option<Aabb3> = None;
    let mut suppressed = 0usize;
    let mut material_ids = Vec::new();

    let mut stack = vec![(root, Affine3A::IDENTITY)];
    while let Some((entity, parent_affine)) = stack.pop() {
        let affine = if entity == root {
            parent_affine
        } else {
            let local = assets
                .transforms
                .get(entity)
                .map(Transform::compute_affine)
                .unwrap_or(Affine3A::IDENTITY);
            parent_affine * local
        };

        if let Ok(mesh) = assets.mesh_query.get(entity) {
            let mesh_bounds = mesh_world_bounds(&assets.meshes, &mesh.0, &affine);

            match mesh_treatment(&filter, mesh_bounds.as_ref()) {
                MeshTreatment::SuppressGround => {
                    commands
                        .entity(entity)
                        .insert((Visibility::Hidden, NotShadowCaster, NotShadowReceiver));
                    suppressed += 1;
                }
                MeshTreatment::Render => {
                    if let Ok(material) = assets.material_query.get(entity) {
                        material_ids.push(material.0.id());
                    }
                }
            }

            if let Some(mesh_bounds) = mesh_bounds {
                bounds = Some(match bounds {
                    Some(b) => b.union(&mesh_bounds),
                    None => mesh_bounds,
                });
            }
        }

        if let Ok(children) = assets.children.get(entity) {
            stack.extend(children.iter().map(|child| (child, affine)));
        }
    }

    for id in material_ids {
        if let Some(material) = assets.materials.get_mut(id) {
            material.double_sided = true;
            material.cull_mode = None;
        }
    }

    if suppressed > 0 {
        tracing::info!(name = %in_flight.name, suppressed, "Hid embedded ground meshes");
    }

    session.0.push(LoadedModel::new(in_flight.name.clone(), root, bounds));

    let framing = config.camera.framing_options(session.0.len());
    if let Some(result) = session.0.arrange(config.layout.gap, &framing) {
        for model in session.0.models() {
            commands
                .entity(model.root)
                .insert(Transform::from_translation(model.offset));
        }
        orbit.apply(&result.camera);
    }
    commands.entity(root).insert(Visibility::Inherited);

    tracing::info!(name = %in_flight.name, count = session.0.len(), "Model added");
    status.0.clear();
    finish(&mut pipeline, false);
}

/// Meshes without measurable positions (quantized or missing) always render
fn mesh_treatment(filter: &GroundFilter, bounds: Option<&Aabb3>) -> MeshTreatment {
    bounds.map_or(MeshTreatment::Render, |b| filter.classify(b))
}

/// World bounds of a mesh's vertex positions
fn mesh_world_bounds(meshes: &Assets<Mesh>, handle: &Handle<Mesh>, affine: &Affine3A) -> Option<Aabb3> {
    let mesh = meshes.get(handle)?;
    let positions = mesh.attribute(Mesh::ATTRIBUTE_POSITION)?.as_float3()?;
    Aabb3::from_points(
        positions
            .iter()
            .map(|p| affine.transform_point3(Vec3::from_array(*p))),
    )
}

fn finish(pipeline: &mut ImportPipeline, failed: bool) {
    if let Some(in_flight) = pipeline.in_flight.take() {
        pipeline.queue.finish(in_flight.origin, failed);
    }
}

fn fail(pipeline: &mut ImportPipeline, status: &mut Status, error: ImportError) {
    let Some(in_flight) = pipeline.in_flight.take() else { return };
    tracing::error!("Import failed: {}", error);
    pipeline.queue.finish(in_flight.origin, true);
    status
        .0
        .set(StatusMessage::for_import_failure(in_flight.origin, &error, in_flight.name));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_path_is_unique_and_loader_friendly() {
        assert_eq!(memory_path(3, "Robot.GLB"), Path::new("imports/3").join("Robot.glb"));
        assert_ne!(memory_path(1, "a.glb"), memory_path(2, "a.glb"));
        assert_eq!(
            memory_path(7, "sub/dir#x.gltf"),
            Path::new("imports/7").join("sub_dir_x.gltf")
        );
    }

    #[test]
    fn test_unmeasured_meshes_render() {
        let filter = GroundFilter::from(&meadow_core::config::GroundFilterConfig::default());
        let slab = Aabb3::new(Vec3::new(-50.0, -0.05, -50.0), Vec3::new(50.0, 0.05, 50.0));

        assert_eq!(mesh_treatment(&filter, Some(&slab)), MeshTreatment::SuppressGround);
        assert_eq!(mesh_treatment(&filter, None), MeshTreatment::Render);
    }

    #[test]
    fn test_resources_share_the_model_folder() {
        let model = memory_path(4, "oak.gltf");
        let buffer = resource_path(4, "oak.bin");
        let texture = resource_path(4, "textures/bark.png");
        assert_eq!(buffer.parent(), model.parent());
        assert_eq!(texture, Path::new("imports/4").join("textures/bark.png"));
    }

    #[test]
    fn test_mesh_world_bounds_applies_transform() {
        let mut meshes = Assets::<Mesh>::default();
        let handle = meshes.add(Cuboid::new(2.0, 2.0, 2.0));
        let affine = Transform::from_xyz(10.0, 0.0, 0.0)
            .with_scale(Vec3::splat(2.0))
            .compute_affine();

        let bounds = mesh_world_bounds(&meshes, &handle, &affine).unwrap();
        assert!((bounds.min - Vec3::new(8.0, -2.0, -2.0)).length() < 1e-5);
        assert!((bounds.max - Vec3::new(12.0, 2.0, 2.0)).length() < 1e-5);
    }
}
