//! Meadow Web - browser viewer for GLB/GLTF models
//!
//! Bevy renders the scene into the page canvas; egui draws the control panel.

mod app;
mod file_picker;
mod models;
mod network;
mod scene;
mod ui;

use wasm_bindgen::prelude::*;

/// Entry point for WASM module
#[wasm_bindgen(start)]
pub fn main() {
    console_error_panic_hook::set_once();

    // `?log=debug` raises verbosity; default keeps wgpu quiet
    let level = app::query_param("log")
        .and_then(|level| level.parse::<tracing::Level>().ok())
        .unwrap_or(tracing::Level::WARN);

    tracing_wasm::set_as_global_default_with_config(
        tracing_wasm::WASMLayerConfigBuilder::new()
            .set_max_level(level)
            .build()
    );

    #[cfg(target_arch = "wasm32")]
    wasm_bindgen_futures::spawn_local(async {
        // The scene is built from the config, so it has to arrive first
        let url = app::query_param("config")
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| app::DEFAULT_CONFIG_URL.to_string());
        let config = network::load_viewer_config(&url).await;
        app::run(config);
    });

    #[cfg(not(target_arch = "wasm32"))]
    app::run(meadow_core::ViewerConfig::default());
}
