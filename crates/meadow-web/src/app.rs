//! Bevy application setup

use bevy::asset::io::memory::{Dir, MemoryAssetReader};
use bevy::asset::io::AssetSource;
use bevy::prelude::*;
use bevy_egui::EguiPlugin;
use bevy_picking::DefaultPickingPlugins;

use meadow_core::{LightingControls, SessionState, StatusLine, ViewerConfig};

use crate::file_picker::FilePickerPlugin;
use crate::models::ModelsPlugin;
use crate::network::NetworkPlugin;
use crate::scene::ScenePlugin;
use crate::ui::UiPlugin;

/// Asset source holding imported file bytes
pub const MEMORY_SOURCE: &str = "memory";

/// Viewer configuration for this page
#[derive(Debug, Clone, Resource)]
pub struct ViewerSettings {
    pub config: ViewerConfig,
}

/// Viewer config fetched when `?config=` is absent
#[cfg(target_arch = "wasm32")]
pub const DEFAULT_CONFIG_URL: &str = "./viewer.toml";

impl ViewerSettings {
    /// Loaded config with URL query overrides (`?models=<dir>`) applied
    pub fn from_browser(mut config: ViewerConfig) -> Self {
        if let Some(models_dir) = query_param("models").filter(|dir| !dir.is_empty()) {
            tracing::info!("Using models directory from URL parameter: {}", models_dir);
            config.manifest.models_dir = models_dir;
        }
        Self { config }
    }
}

/// Models of the current session, keyed by their scene root entity
#[derive(Debug, Resource, Default)]
pub struct Session(pub SessionState<Entity>);

/// Status line shown under the controls
#[derive(Debug, Resource, Default)]
pub struct Status(pub StatusLine);

/// Grid, axes and auto-rotate toggles
#[derive(Debug, Clone, Resource, Default)]
pub struct WorldSettings {
    pub show_grid: bool,
    pub show_axes: bool,
    pub auto_rotate: bool,
}

/// Lighting slider values
#[derive(Debug, Clone, Resource)]
pub struct Lighting(pub LightingControls);

/// Bytes of imported files, served to the asset server under `memory://`
#[derive(Resource, Clone)]
pub struct MemoryImports(pub Dir);

/// Reset the camera to the session's default pose
#[derive(Message, Debug, Clone, Copy)]
pub struct ResetView;

/// Remove every model and start a new session
#[derive(Message, Debug, Clone, Copy)]
pub struct ClearModels;

/// Read a query parameter from the page URL
#[cfg(target_arch = "wasm32")]
pub fn query_param(name: &str) -> Option<String> {
    let href = web_sys::window()?.location().href().ok()?;
    let url = web_sys::Url::new(&href).ok()?;
    url.search_params().get(name)
}

#[cfg(not(target_arch = "wasm32"))]
pub fn query_param(_name: &str) -> Option<String> {
    None
}

/// Run the Bevy application
pub fn run(config: ViewerConfig) {
    let settings = ViewerSettings::from_browser(config);
    let lighting = Lighting(LightingControls::from(&settings.config.lighting));

    let imports = Dir::default();
    let reader_root = imports.clone();

    App::new()
        .insert_resource(ClearColor(Color::srgb_u8(0x1b, 0x27, 0x42)))
        // Must be registered before AssetPlugin is built
        .register_asset_source(
            MEMORY_SOURCE,
            AssetSource::build().with_reader(move || {
                Box::new(MemoryAssetReader {
                    root: reader_root.clone(),
                })
            }),
        )
        .add_plugins(DefaultPlugins
            .set(WindowPlugin {
                primary_window: Some(Window {
                    title: "Meadow - Model Viewer".to_string(),
                    canvas: Some("#meadow-canvas".to_string()),
                    fit_canvas_to_parent: true,
                    prevent_default_event_handling: false,
                    ..default()
                }),
                ..default()
            })
            .set(AssetPlugin {
                file_path: "".to_string(),
                // Static hosting has no .meta files
                meta_check: bevy::asset::AssetMetaCheck::Never,
                ..default()
            })
        )
        // Picking must come before EguiPlugin so it can detect it
        .add_plugins(DefaultPickingPlugins)
        .add_plugins(EguiPlugin::default())
        .insert_resource(settings)
        .insert_resource(lighting)
        .insert_resource(MemoryImports(imports))
        .init_resource::<Session>()
        .init_resource::<Status>()
        .init_resource::<WorldSettings>()
        .add_message::<ResetView>()
        .add_message::<ClearModels>()
        .add_plugins(NetworkPlugin)
        .add_plugins(FilePickerPlugin)
        .add_plugins(ScenePlugin)
        .add_plugins(ModelsPlugin)
        .add_plugins(UiPlugin)
        .run();
}
