//! Manifest and model downloads

use bevy::prelude::*;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use meadow_core::error::{ManifestError, NetworkError};
use meadow_core::import::{sibling_url, ImportOrigin, ImportRequest, ImportSource};
use meadow_core::status::StatusMessage;
use meadow_core::Manifest;

use crate::app::{Session, Status, ViewerSettings};
use crate::models::ImportPipeline;

pub struct NetworkPlugin;

impl Plugin for NetworkPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<PendingManifest>()
            .init_resource::<PendingDownloads>()
            .add_systems(Startup, fetch_manifest)
            .add_systems(Update, process_manifest);
    }
}

/// Manifest result handed over from the fetch task
#[derive(Resource, Default)]
pub struct PendingManifest(pub Arc<Mutex<Option<Result<Manifest, ManifestError>>>>);

/// Progress of a model download
#[derive(Debug)]
pub enum DownloadEvent {
    Progress {
        ticket: u64,
        loaded: u64,
        total: Option<u64>,
    },
    Finished {
        ticket: u64,
        result: Result<Vec<u8>, NetworkError>,
    },
    /// Files a glTF loads from beside it, keyed by their relative URI
    Resources {
        ticket: u64,
        result: Result<Vec<(String, Vec<u8>)>, NetworkError>,
    },
}

/// Download events from fetch tasks, drained once per frame
#[derive(Resource, Default)]
pub struct PendingDownloads(pub Arc<Mutex<VecDeque<DownloadEvent>>>);

impl PendingDownloads {
    pub fn drain(&self) -> Vec<DownloadEvent> {
        if let Ok(mut queue) = self.0.lock() {
            queue.drain(..).collect()
        } else {
            Vec::new()
        }
    }
}

/// Fetch the viewer config; a missing or broken file leaves the defaults
#[cfg(target_arch = "wasm32")]
pub async fn load_viewer_config(url: &str) -> meadow_core::ViewerConfig {
    use meadow_core::ViewerConfig;

    let response = match gloo_net::http::Request::get(url)
        .cache(web_sys::RequestCache::NoStore)
        .send()
        .await
    {
        Ok(response) if response.ok() => response,
        Ok(response) => {
            tracing::info!(%url, status = response.status(), "No viewer config, using defaults");
            return ViewerConfig::default();
        }
        Err(e) => {
            tracing::warn!(%url, "Viewer config fetch failed, using defaults: {}", e);
            return ViewerConfig::default();
        }
    };

    let text = match response.text().await {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!(%url, "Viewer config unreadable, using defaults: {}", e);
            return ViewerConfig::default();
        }
    };

    match ViewerConfig::from_toml_str(&text) {
        Ok(config) => {
            tracing::info!(%url, "Loaded viewer config");
            config
        }
        Err(e) => {
            tracing::warn!(%url, "Invalid viewer config, using defaults: {}", e);
            ViewerConfig::default()
        }
    }
}

/// Fetch `<models_dir>/manifest.json` bypassing the HTTP cache
fn fetch_manifest(settings: Res<ViewerSettings>, pending: Res<PendingManifest>) {
    let url = settings.config.manifest.manifest_url();

    #[cfg(target_arch = "wasm32")]
    {
        use wasm_bindgen_futures::spawn_local;

        let pending = pending.0.clone();

        spawn_local(async move {
            tracing::info!(%url, "Fetching model manifest");
            let result = request_manifest(&url).await;
            if let Ok(mut slot) = pending.lock() {
                *slot = Some(result);
            }
        });
    }

    #[cfg(not(target_arch = "wasm32"))]
    {
        let _ = pending;
        tracing::info!(%url, "Manifest fetch not available in native mode");
    }
}

#[cfg(target_arch = "wasm32")]
async fn request_manifest(url: &str) -> Result<Manifest, ManifestError> {
    let response = gloo_net::http::Request::get(url)
        .cache(web_sys::RequestCache::NoStore)
        .send()
        .await
        .map_err(|e| NetworkError::Fetch {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    if !response.ok() {
        return Err(NetworkError::Status {
            url: url.to_string(),
            status: response.status(),
        }
        .into());
    }

    let text = response.text().await.map_err(|e| NetworkError::Fetch {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    Manifest::parse(&text)
}

/// Queue every manifest entry, or report why loading stopped
fn process_manifest(
    pending: Res<PendingManifest>,
    settings: Res<ViewerSettings>,
    session: Res<Session>,
    mut pipeline: ResMut<ImportPipeline>,
    mut status: ResMut<Status>,
) {
    let result = match pending.0.try_lock() {
        Ok(mut slot) => slot.take(),
        Err(_) => None,
    };
    let Some(result) = result else { return };

    match result {
        Ok(manifest) => {
            let models_dir = &settings.config.manifest.models_dir;
            tracing::info!(count = manifest.models.len(), %models_dir, "Manifest loaded");

            let generation = session.0.generation();
            let requests = manifest
                .entries(models_dir)
                .into_iter()
                .map(|(name, url)| ImportRequest {
                    name,
                    source: ImportSource::Url(url),
                    origin: ImportOrigin::Manifest,
                    generation,
                });
            pipeline.queue.extend(requests);
        }
        Err(e) => {
            tracing::error!("Manifest loading failed: {}", e);
            let message = match e {
                ManifestError::Network(_) => StatusMessage::ManifestUnavailable,
                ManifestError::Parse(_) => StatusMessage::ManifestInvalid,
                ManifestError::Empty => StatusMessage::ManifestEmpty,
            };
            status.0.set(message);
        }
    }
}

/// Download a model, streaming the body so progress can be reported
pub fn download_model(url: &str, ticket: u64, pending: &PendingDownloads) {
    #[cfg(target_arch = "wasm32")]
    {
        use wasm_bindgen_futures::spawn_local;

        let queue = pending.0.clone();
        let url = encode_uri(url);

        spawn_local(async move {
            tracing::info!(%url, "Downloading model");
            let progress_queue = queue.clone();
            let result = stream_body(&url, move |loaded, total| {
                if let Ok(mut q) = progress_queue.lock() {
                    q.push_back(DownloadEvent::Progress {
                        ticket,
                        loaded,
                        total,
                    });
                }
            })
            .await;

            if let Ok(mut q) = queue.lock() {
                q.push_back(DownloadEvent::Finished { ticket, result });
            }
        });
    }

    #[cfg(not(target_arch = "wasm32"))]
    {
        if let Ok(mut q) = pending.0.lock() {
            q.push_back(DownloadEvent::Finished {
                ticket,
                result: Err(NetworkError::Fetch {
                    url: url.to_string(),
                    reason: "downloads not available in native mode".to_string(),
                }),
            });
        }
    }
}

/// Download the files a glTF at `model_url` references, one after another.
///
/// The URIs come from the document and are already URL-encoded.
pub fn download_resources(model_url: &str, uris: Vec<String>, ticket: u64, pending: &PendingDownloads) {
    #[cfg(target_arch = "wasm32")]
    {
        use wasm_bindgen_futures::spawn_local;

        let queue = pending.0.clone();
        let model_url = encode_uri(model_url);

        spawn_local(async move {
            let mut files = Vec::with_capacity(uris.len());
            let mut result = Ok(());
            for uri in uris {
                let url = sibling_url(&model_url, &uri);
                tracing::debug!(%url, "Downloading model resource");
                match stream_body(&url, |_, _| {}).await {
                    Ok(bytes) => files.push((uri, bytes)),
                    Err(e) => {
                        result = Err(e);
                        break;
                    }
                }
            }

            if let Ok(mut q) = queue.lock() {
                q.push_back(DownloadEvent::Resources {
                    ticket,
                    result: result.map(|()| files),
                });
            }
        });
    }

    #[cfg(not(target_arch = "wasm32"))]
    {
        if let Ok(mut q) = pending.0.lock() {
            q.push_back(DownloadEvent::Resources {
                ticket,
                result: Err(NetworkError::Fetch {
                    url: sibling_url(model_url, uris.first().map_or("", String::as_str)),
                    reason: "downloads not available in native mode".to_string(),
                }),
            });
        }
    }
}

/// Undo URL encoding, the way the glTF loader reads relative paths
#[cfg(target_arch = "wasm32")]
pub fn decode_uri(uri: &str) -> String {
    js_sys::decode_uri(uri)
        .map(String::from)
        .unwrap_or_else(|_| uri.to_string())
}

#[cfg(not(target_arch = "wasm32"))]
pub fn decode_uri(uri: &str) -> String {
    uri.to_string()
}

/// Percent-encode like the browser's `encodeURI`
#[cfg(target_arch = "wasm32")]
fn encode_uri(url: &str) -> String {
    String::from(js_sys::encode_uri(url))
}

#[cfg(target_arch = "wasm32")]
async fn stream_body<F>(url: &str, mut on_progress: F) -> Result<Vec<u8>, NetworkError>
where
    F: FnMut(u64, Option<u64>),
{
    use wasm_bindgen::JsCast;
    use wasm_bindgen_futures::JsFuture;

    let fetch_error = |reason: String| NetworkError::Fetch {
        url: url.to_string(),
        reason,
    };

    let response = gloo_net::http::Request::get(url)
        .send()
        .await
        .map_err(|e| fetch_error(e.to_string()))?;

    if !response.ok() {
        return Err(NetworkError::Status {
            url: url.to_string(),
            status: response.status(),
        });
    }

    let total = response
        .headers()
        .get("content-length")
        .and_then(|len| len.trim().parse::<u64>().ok());

    // No readable body (old browsers): fall back to a single read
    let Some(body) = response.body() else {
        let bytes = response
            .binary()
            .await
            .map_err(|e| fetch_error(e.to_string()))?;
        on_progress(bytes.len() as u64, total);
        return Ok(bytes);
    };

    let reader: web_sys::ReadableStreamDefaultReader = body
        .get_reader()
        .dyn_into()
        .map_err(|_| fetch_error("body reader unavailable".to_string()))?;

    let mut bytes = Vec::with_capacity(total.unwrap_or(0) as usize);
    loop {
        let chunk = JsFuture::from(reader.read())
            .await
            .map_err(|e| fetch_error(format!("{:?}", e)))?;

        let done = js_sys::Reflect::get(&chunk, &"done".into())
            .ok()
            .and_then(|v| v.as_bool())
            .unwrap_or(true);
        if done {
            break;
        }

        let value = js_sys::Reflect::get(&chunk, &"value".into())
            .map_err(|e| fetch_error(format!("{:?}", e)))?;
        let array = js_sys::Uint8Array::new(&value);
        let start = bytes.len();
        bytes.resize(start + array.length() as usize, 0);
        array.copy_to(&mut bytes[start..]);

        on_progress(bytes.len() as u64, total);
    }

    Ok(bytes)
}
