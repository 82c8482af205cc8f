//! Web server setup and routing

use anyhow::Result;
use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use std::path::PathBuf;
use std::sync::Arc;
use tower::ServiceExt;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use meadow_core::error::ManifestError;
use meadow_core::Manifest;

use crate::catalog::scan_models;
use crate::config::Config;

const MANIFEST_FILE: &str = "manifest.json";

/// Shared handler state
#[derive(Debug)]
pub struct ServeState {
    pub models_dir: PathBuf,
    pub extensions: Vec<String>,
}

impl ServeState {
    pub fn new(config: &Config) -> Self {
        Self {
            models_dir: PathBuf::from(&config.server.models_dir),
            extensions: config.import.extensions.clone(),
        }
    }
}

/// Build the router: `/models/*` from the models directory, everything else
/// from the web root
pub fn router(state: Arc<ServeState>, root: &str) -> Router {
    Router::new()
        .route("/models/{*path}", get(serve_model))
        .fallback_service(ServeDir::new(root))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Run plain HTTP server
pub async fn run(config: &Config) -> Result<()> {
    let state = Arc::new(ServeState::new(config));
    let app = router(state, &config.server.root);

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    info!(
        address = %config.server.bind,
        root = %config.server.root,
        models = %config.server.models_dir,
        "Starting web server"
    );
    axum::serve(listener, app).await?;
    Ok(())
}

/// Serve a file from the models directory. A `manifest.json` that is missing
/// or lists no models is synthesized from the directory listing.
async fn serve_model(State(state): State<Arc<ServeState>>, request: Request<Body>) -> Response {
    let (mut parts, body) = request.into_parts();
    let path = parts
        .uri
        .path()
        .strip_prefix("/models")
        .unwrap_or("/")
        .to_string();

    if path == format!("/{MANIFEST_FILE}") && !has_listed_models(&state).await {
        return synthesized_manifest(&state).await;
    }

    parts.uri = match path.parse::<Uri>() {
        Ok(uri) => uri,
        Err(_) => return StatusCode::BAD_REQUEST.into_response(),
    };

    match ServeDir::new(&state.models_dir)
        .oneshot(Request::from_parts(parts, body))
        .await
    {
        Ok(response) => response.into_response(),
        Err(infallible) => match infallible {},
    }
}

/// True when the manifest file exists and names at least one model. A file
/// that does not parse is served anyway so the viewer reports it.
async fn has_listed_models(state: &ServeState) -> bool {
    match tokio::fs::read_to_string(state.models_dir.join(MANIFEST_FILE)).await {
        Ok(content) => !matches!(Manifest::parse(&content), Err(ManifestError::Empty)),
        Err(_) => false,
    }
}

async fn synthesized_manifest(state: &ServeState) -> Response {
    let dir = state.models_dir.clone();
    let extensions = state.extensions.clone();

    match tokio::task::spawn_blocking(move || scan_models(&dir, &extensions)).await {
        Ok(Ok(manifest)) => {
            info!(count = manifest.models.len(), "Serving synthesized manifest");
            ([(header::CACHE_CONTROL, "no-store")], Json(manifest)).into_response()
        }
        Ok(Err(e)) => {
            error!("Manifest synthesis failed: {:#}", e);
            StatusCode::NOT_FOUND.into_response()
        }
        Err(e) => {
            error!("Manifest task failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use std::fs;

    fn test_router(models_dir: &std::path::Path) -> Router {
        let mut config = Config::default();
        config.server.models_dir = models_dir.display().to_string();
        router(Arc::new(ServeState::new(&config)), &config.server.root)
    }

    async fn get_body(app: Router, uri: &str) -> (StatusCode, Vec<u8>) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, bytes.to_vec())
    }

    #[tokio::test]
    async fn test_manifest_synthesized_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.glb"), b"glb").unwrap();
        fs::write(dir.path().join("a.gltf"), b"{}").unwrap();
        fs::write(dir.path().join("readme.md"), b"").unwrap();

        let (status, body) = get_body(test_router(dir.path()), "/models/manifest.json").await;
        assert_eq!(status, StatusCode::OK);
        let manifest: Manifest = serde_json::from_slice(&body).unwrap();
        assert_eq!(manifest.models, vec!["a.gltf", "b.glb"]);
    }

    #[tokio::test]
    async fn test_manifest_file_served_as_is() {
        let dir = tempfile::tempdir().unwrap();
        let content = r#"{"models": ["only.glb"]}"#;
        fs::write(dir.path().join("manifest.json"), content).unwrap();
        fs::write(dir.path().join("other.glb"), b"glb").unwrap();

        let (status, body) = get_body(test_router(dir.path()), "/models/manifest.json").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, content.as_bytes());
    }

    #[tokio::test]
    async fn test_empty_manifest_file_falls_back_to_listing() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("manifest.json"), r#"{ "models": [] }"#).unwrap();
        fs::write(dir.path().join("robot.glb"), b"glb").unwrap();

        let (status, body) = get_body(test_router(dir.path()), "/models/manifest.json").await;
        assert_eq!(status, StatusCode::OK);
        let manifest: Manifest = serde_json::from_slice(&body).unwrap();
        assert_eq!(manifest.models, vec!["robot.glb"]);
    }

    #[tokio::test]
    async fn test_model_file_served() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("tree.glb"), b"glTF").unwrap();

        let (status, body) = get_body(test_router(dir.path()), "/models/tree.glb").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"glTF");

        let (status, _) = get_body(test_router(dir.path()), "/models/missing.glb").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
