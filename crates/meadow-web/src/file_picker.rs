//! Local file import: picker dialog and drag-and-drop
//!
//! Both paths filter the selection to model files, cap the batch and read the
//! files one after another into [`PendingFiles`], which the import pipeline
//! drains every frame.

use bevy::prelude::*;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use meadow_core::error::ImportError;
use meadow_core::config::ImportConfig;

use crate::app::ViewerSettings;

/// File picker plugin
pub struct FilePickerPlugin;

impl Plugin for FilePickerPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<PendingFiles>()
            .init_resource::<DragState>()
            .add_systems(Startup, install_drop_target);
    }
}

/// A file read from the user's machine
#[derive(Debug)]
pub struct PickedFile {
    /// File name without path
    pub name: String,
    pub contents: Result<Vec<u8>, ImportError>,
}

/// Files read by JavaScript callbacks, in selection order
#[derive(Resource, Default, Clone)]
pub struct PendingFiles(pub Arc<Mutex<VecDeque<PickedFile>>>);

/// Set while a drag is hovering over the page
#[derive(Resource, Default, Clone)]
pub struct DragState(pub Arc<AtomicBool>);

impl DragState {
    pub fn is_dragging(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// `accept` attribute for the file input, e.g. `.glb,.gltf`
pub fn accept_string(extensions: &[String]) -> String {
    extensions
        .iter()
        .map(|ext| format!(".{}", ext.trim_start_matches('.')))
        .collect::<Vec<_>>()
        .join(",")
}

/// Open the browser's multi-select file dialog
pub fn open_model_picker(pending: &PendingFiles, config: &ImportConfig) {
    #[cfg(target_arch = "wasm32")]
    js_interop::open_file_picker(pending.clone(), config.clone());

    #[cfg(not(target_arch = "wasm32"))]
    {
        let _ = (pending, config);
        tracing::warn!("File picker not available in native mode");
    }
}

fn install_drop_target(
    settings: Res<ViewerSettings>,
    pending: Res<PendingFiles>,
    drag: Res<DragState>,
) {
    #[cfg(target_arch = "wasm32")]
    js_interop::install_drop_listeners(
        pending.clone(),
        drag.clone(),
        settings.config.import.clone(),
    );

    #[cfg(not(target_arch = "wasm32"))]
    {
        let _ = (settings, pending, drag);
        tracing::info!("Drag-and-drop not available in native mode");
    }
}

// ============================================================================
// JavaScript Interop (WASM only)
// ============================================================================

#[cfg(target_arch = "wasm32")]
mod js_interop {
    use super::*;
    use meadow_core::import::select_batch;
    use wasm_bindgen::prelude::*;
    use wasm_bindgen::JsCast;
    use wasm_bindgen_futures::{spawn_local, JsFuture};
    use web_sys::{DragEvent, File, FileList, HtmlInputElement};

    pub fn open_file_picker(pending: PendingFiles, config: ImportConfig) {
        let Some(document) = web_sys::window().and_then(|w| w.document()) else {
            tracing::error!("open_file_picker: no document object");
            return;
        };

        let input: HtmlInputElement = match document
            .create_element("input")
            .ok()
            .and_then(|el| el.dyn_into::<HtmlInputElement>().ok())
        {
            Some(input) => input,
            None => {
                tracing::error!("open_file_picker: failed to create input element");
                return;
            }
        };

        input.set_type("file");
        input.set_multiple(true);
        input.set_accept(&accept_string(&config.extensions));
        input.style().set_property("display", "none").ok();

        let Some(body) = document.body() else {
            tracing::error!("open_file_picker: no document body");
            return;
        };
        if let Err(e) = body.append_child(&input) {
            tracing::error!("open_file_picker: failed to append input to body: {:?}", e);
            return;
        }

        let input_clone = input.clone();
        let closure = Closure::wrap(Box::new(move |_event: web_sys::Event| {
            match input_clone.files() {
                Some(files) => read_files(files, &pending, &config),
                None => tracing::info!("open_file_picker: no files selected"),
            }

            if let Some(parent) = input_clone.parent_node() {
                parent.remove_child(&input_clone).ok();
            }
        }) as Box<dyn FnMut(_)>);

        input.set_onchange(Some(closure.as_ref().unchecked_ref()));
        closure.forget();

        input.click();
    }

    pub fn install_drop_listeners(pending: PendingFiles, drag: DragState, config: ImportConfig) {
        let Some(window) = web_sys::window() else {
            tracing::error!("install_drop_listeners: no window object");
            return;
        };

        let over_flag = drag.0.clone();
        let on_dragover = Closure::wrap(Box::new(move |event: DragEvent| {
            // Without this the browser opens the file instead of dropping it
            event.prevent_default();
            over_flag.store(true, Ordering::Relaxed);
        }) as Box<dyn FnMut(_)>);

        let leave_flag = drag.0.clone();
        let on_dragleave = Closure::wrap(Box::new(move |_event: DragEvent| {
            leave_flag.store(false, Ordering::Relaxed);
        }) as Box<dyn FnMut(_)>);

        let drop_flag = drag.0;
        let on_drop = Closure::wrap(Box::new(move |event: DragEvent| {
            event.prevent_default();
            drop_flag.store(false, Ordering::Relaxed);
            if let Some(files) = event.data_transfer().and_then(|dt| dt.files()) {
                read_files(files, &pending, &config);
            }
        }) as Box<dyn FnMut(_)>);

        for (name, closure) in [
            ("dragover", &on_dragover),
            ("dragleave", &on_dragleave),
            ("drop", &on_drop),
        ] {
            if let Err(e) =
                window.add_event_listener_with_callback(name, closure.as_ref().unchecked_ref())
            {
                tracing::error!("install_drop_listeners: failed to add {} listener: {:?}", name, e);
            }
        }

        on_dragover.forget();
        on_dragleave.forget();
        on_drop.forget();
    }

    /// Filter and cap the selection, then read the files in order
    fn read_files(list: FileList, pending: &PendingFiles, config: &ImportConfig) {
        let files: Vec<(String, File)> = (0..list.length())
            .filter_map(|i| list.get(i))
            .map(|file| (file.name(), file))
            .collect();
        let total = files.len();
        let files = select_batch(files, |(name, _)| name.as_str(), &config.extensions, config.max_batch);
        tracing::info!(selected = total, accepted = files.len(), "Reading local files");

        if files.is_empty() {
            return;
        }

        let queue = pending.0.clone();
        spawn_local(async move {
            for (name, file) in files {
                let contents = JsFuture::from(file.array_buffer())
                    .await
                    .map(|buffer| js_sys::Uint8Array::new(&buffer).to_vec())
                    .map_err(|e| ImportError::Read {
                        name: name.clone(),
                        reason: format!("{:?}", e),
                    });

                if let Ok(mut q) = queue.lock() {
                    q.push_back(PickedFile { name, contents });
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accept_string() {
        let extensions = vec!["glb".to_string(), ".gltf".to_string()];
        assert_eq!(accept_string(&extensions), ".glb,.gltf");
        assert_eq!(accept_string(&[]), "");
    }

    #[test]
    fn test_drag_state_shared() {
        let drag = DragState::default();
        let handle = drag.clone();
        assert!(!drag.is_dragging());
        handle.0.store(true, Ordering::Relaxed);
        assert!(drag.is_dragging());
    }
}
