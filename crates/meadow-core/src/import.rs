//! Import requests, batch filtering and the sequential import queue

use std::collections::VecDeque;

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::ImportError;

/// Where the bytes of a model come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportSource {
    /// File contents already read from disk
    Bytes(Vec<u8>),
    /// Remote file fetched on demand
    Url(String),
}

/// Who asked for the import
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportOrigin {
    /// Picker or drag-and-drop batch
    Local,
    /// Startup manifest entry
    Manifest,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRequest {
    pub name: String,
    pub source: ImportSource,
    pub origin: ImportOrigin,
    /// Session generation the request was queued under
    pub generation: u64,
}

/// Whether `name` carries one of `extensions` (without dot, any case)
pub fn is_model_file(name: &str, extensions: &[String]) -> bool {
    match name.rsplit_once('.') {
        Some((_, ext)) => extensions
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(ext)),
        None => false,
    }
}

/// Keep the model files of a batch, in order, up to `max_batch` of them
pub fn select_batch<T, F>(items: Vec<T>, name_of: F, extensions: &[String], max_batch: usize) -> Vec<T>
where
    F: Fn(&T) -> &str,
{
    let total = items.len();
    let selected: Vec<T> = items
        .into_iter()
        .filter(|item| is_model_file(name_of(item), extensions))
        .take(max_batch)
        .collect();

    if selected.len() < total {
        debug!(total, kept = selected.len(), "Filtered import batch");
    }
    selected
}

/// Download progress in `[0, 1]`, only when the total size is known
pub fn progress_fraction(loaded: u64, total: Option<u64>) -> Option<f32> {
    match total {
        Some(total) if total > 0 => Some((loaded as f64 / total as f64).min(1.0) as f32),
        _ => None,
    }
}

/// Scene to instantiate from a parsed asset: the default scene, else the first
pub fn pick_scene<T: Clone>(name: &str, default: Option<&T>, scenes: &[T]) -> Result<T, ImportError> {
    default
        .or_else(|| scenes.first())
        .cloned()
        .ok_or_else(|| ImportError::NoScene {
            name: name.to_string(),
        })
}

/// Whether `name` is a JSON glTF, which may point at sibling files
pub fn is_gltf_json(name: &str) -> bool {
    matches!(name.rsplit_once('.'), Some((_, ext)) if ext.eq_ignore_ascii_case("gltf"))
}

/// Relative `uri`s of the buffers and images a JSON glTF loads from beside it.
///
/// Embedded `data:` URIs and absolute URLs are left out, as are paths that
/// climb out of the model's folder. Each URI is listed once, in document
/// order. A document that is not glTF JSON lists nothing; the loader reports
/// it.
pub fn gltf_dependencies(content: &[u8]) -> Vec<String> {
    let Ok(document) = serde_json::from_slice::<Value>(content) else {
        return Vec::new();
    };

    let mut uris: Vec<String> = Vec::new();
    for section in ["buffers", "images"] {
        let Some(Value::Array(entries)) = document.get(section) else { continue };
        for uri in entries.iter().filter_map(|e| e.get("uri")?.as_str()) {
            if uri.is_empty() || uri.starts_with("data:") {
                continue;
            }
            if uri.contains("://") || uri.starts_with('/') || uri.split('/').any(|s| s == "..") {
                warn!(%uri, "Skipping glTF resource outside the model folder");
                continue;
            }
            if !uris.iter().any(|u| u == uri) {
                uris.push(uri.to_string());
            }
        }
    }
    uris
}

/// URL of `uri` resolved against the folder of `model_url`
pub fn sibling_url(model_url: &str, uri: &str) -> String {
    match model_url.rsplit_once('/') {
        Some((base, _)) => format!("{base}/{uri}"),
        None => uri.to_string(),
    }
}

/// FIFO of pending imports, processed strictly one at a time.
///
/// The caller marks the head as in flight with [`ImportQueue::start_next`]
/// and releases it with [`ImportQueue::finish`] whether it succeeded or not.
#[derive(Debug, Default)]
pub struct ImportQueue {
    pending: VecDeque<ImportRequest>,
    busy: bool,
}

impl ImportQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, request: ImportRequest) {
        debug!(name = %request.name, queued = self.pending.len() + 1, "Import queued");
        self.pending.push_back(request);
    }

    pub fn extend(&mut self, requests: impl IntoIterator<Item = ImportRequest>) {
        for request in requests {
            self.push(request);
        }
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Next request to run, or `None` while another import is in flight
    pub fn start_next(&mut self) -> Option<ImportRequest> {
        if self.busy {
            return None;
        }
        let request = self.pending.pop_front()?;
        self.busy = true;
        Some(request)
    }

    /// Release the in-flight slot.
    ///
    /// A failed manifest entry drops every other manifest entry still
    /// waiting; local files keep going.
    pub fn finish(&mut self, origin: ImportOrigin, failed: bool) {
        self.busy = false;
        if failed && origin == ImportOrigin::Manifest {
            let before = self.pending.len();
            self.pending.retain(|r| r.origin != ImportOrigin::Manifest);
            let dropped = before - self.pending.len();
            if dropped > 0 {
                warn!(dropped, "Manifest loading aborted");
            }
        }
    }

    /// Drop every queued request from generations other than `generation`
    pub fn discard_stale(&mut self, generation: u64) -> usize {
        let before = self.pending.len();
        self.pending.retain(|r| r.generation == generation);
        before - self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exts() -> Vec<String> {
        vec!["glb".to_string(), "gltf".to_string()]
    }

    fn request(name: &str, origin: ImportOrigin, generation: u64) -> ImportRequest {
        ImportRequest {
            name: name.to_string(),
            source: ImportSource::Url(format!("./models/{name}")),
            origin,
            generation,
        }
    }

    #[test]
    fn test_extension_filter() {
        let exts = exts();
        assert!(is_model_file("robot.glb", &exts));
        assert!(is_model_file("Robot.GLTF", &exts));
        assert!(is_model_file("a.b.Glb", &exts));
        assert!(!is_model_file("robot.obj", &exts));
        assert!(!is_model_file("glb", &exts));
        assert!(!is_model_file("robot.glb.zip", &exts));
        assert!(!is_model_file("", &exts));
    }

    #[test]
    fn test_batch_truncated_to_first_matches() {
        let mut names: Vec<String> = (0..40).map(|i| format!("m{i}.glb")).collect();
        names.insert(0, "notes.txt".to_string());
        names.insert(5, "photo.png".to_string());

        let batch = select_batch(names, |n| n.as_str(), &exts(), 30);
        assert_eq!(batch.len(), 30);
        assert_eq!(batch.first().map(String::as_str), Some("m0.glb"));
        assert_eq!(batch.last().map(String::as_str), Some("m29.glb"));
    }

    #[test]
    fn test_batch_without_models_is_empty() {
        let batch = select_batch(vec!["a.txt", "b.png"], |n| *n, &exts(), 30);
        assert!(batch.is_empty());
    }

    #[test]
    fn test_progress_fraction() {
        assert_eq!(progress_fraction(50, Some(200)), Some(0.25));
        assert_eq!(progress_fraction(10, None), None);
        assert_eq!(progress_fraction(10, Some(0)), None);
        assert_eq!(progress_fraction(300, Some(200)), Some(1.0));
    }

    #[test]
    fn test_pick_scene() {
        let scenes = vec!["first", "second"];
        assert_eq!(pick_scene("a.glb", Some(&"second"), &scenes), Ok("second"));
        assert_eq!(pick_scene("a.glb", None, &scenes), Ok("first"));
    }

    #[test]
    fn test_zero_scene_asset_is_rejected() {
        let scenes: Vec<u32> = Vec::new();
        let result = pick_scene("empty.glb", None, &scenes);
        assert_eq!(
            result,
            Err(ImportError::NoScene {
                name: "empty.glb".to_string()
            })
        );
    }

    #[test]
    fn test_queue_runs_one_at_a_time() {
        let mut queue = ImportQueue::new();
        queue.push(request("a.glb", ImportOrigin::Local, 0));
        queue.push(request("b.glb", ImportOrigin::Local, 0));

        let first = queue.start_next().unwrap();
        assert_eq!(first.name, "a.glb");
        assert!(queue.start_next().is_none());

        queue.finish(first.origin, true);
        // A local failure keeps the rest of the batch
        assert_eq!(queue.start_next().unwrap().name, "b.glb");
    }

    #[test]
    fn test_manifest_failure_drops_remaining_entries() {
        let mut queue = ImportQueue::new();
        queue.push(request("a.glb", ImportOrigin::Manifest, 0));
        queue.push(request("b.glb", ImportOrigin::Manifest, 0));
        queue.push(request("local.glb", ImportOrigin::Local, 0));
        queue.push(request("c.glb", ImportOrigin::Manifest, 0));

        let first = queue.start_next().unwrap();
        queue.finish(first.origin, true);

        assert_eq!(queue.len(), 1);
        assert_eq!(queue.start_next().unwrap().name, "local.glb");
    }

    #[test]
    fn test_discard_stale_generations() {
        let mut queue = ImportQueue::new();
        queue.push(request("old.glb", ImportOrigin::Local, 0));
        queue.push(request("new.glb", ImportOrigin::Local, 1));

        assert_eq!(queue.discard_stale(1), 1);
        assert_eq!(queue.start_next().unwrap().name, "new.glb");
    }

    #[test]
    fn test_gltf_dependencies() {
        let document = br#"{
            "buffers": [{"uri": "scene.bin"}, {"uri": "data:application/octet-stream;base64,AAAA"}],
            "images": [
                {"uri": "textures/bark%20color.png"},
                {"uri": "scene.bin"},
                {"bufferView": 3},
                {"uri": "https://cdn.example.com/leaf.png"},
                {"uri": "../shared/moss.png"}
            ]
        }"#;
        assert_eq!(
            gltf_dependencies(document),
            vec!["scene.bin", "textures/bark%20color.png"]
        );
        assert!(gltf_dependencies(b"glTF\x02\x00\x00\x00").is_empty());
        assert!(gltf_dependencies(br#"{"asset": {"version": "2.0"}}"#).is_empty());
    }

    #[test]
    fn test_gltf_json_and_sibling_urls() {
        assert!(is_gltf_json("Tree.GLTF"));
        assert!(!is_gltf_json("tree.glb"));
        assert_eq!(sibling_url("models/trees/oak.gltf", "oak.bin"), "models/trees/oak.bin");
        assert_eq!(sibling_url("oak.gltf", "tex/bark.png"), "tex/bark.png");
    }
}
