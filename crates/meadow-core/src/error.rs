//! Error taxonomy for imports, fetches and the startup manifest

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NetworkError {
    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },
    #[error("Fetch of {url} failed: {reason}")]
    Fetch { url: String, reason: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ImportError {
    #[error("Invalid model {name}: no scene found")]
    NoScene { name: String },
    #[error("Failed to parse {name}: {reason}")]
    Parse { name: String, reason: String },
    #[error("Failed to read {name}: {reason}")]
    Read { name: String, reason: String },
    #[error(transparent)]
    Network(#[from] NetworkError),
}

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("Manifest unavailable: {0}")]
    Network(#[from] NetworkError),
    #[error("Manifest is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Manifest lists no models")]
    Empty,
}
