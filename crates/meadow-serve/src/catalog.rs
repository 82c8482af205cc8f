//! Models directory listing

use anyhow::{Context, Result};
use meadow_core::Manifest;
use std::path::Path;
use tracing::debug;

/// Manifest of the model files directly inside `dir`, sorted by name
pub fn scan_models(dir: &Path, extensions: &[String]) -> Result<Manifest> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("reading models directory {}", dir.display()))?;

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        // Names that are not valid UTF-8 cannot be put in the manifest
        if let Ok(name) = entry.file_name().into_string() {
            names.push(name);
        }
    }

    let manifest = Manifest::from_file_names(names, extensions);
    debug!(dir = %dir.display(), count = manifest.models.len(), "Scanned models directory");
    Ok(manifest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn extensions() -> Vec<String> {
        vec!["glb".to_string(), "gltf".to_string()]
    }

    #[test]
    fn test_lists_model_files_sorted() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["zebra.glb", "Apple.GLTF", "notes.txt", "mesh.bin"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }
        fs::create_dir(dir.path().join("nested.glb")).unwrap();

        let manifest = scan_models(dir.path(), &extensions()).unwrap();
        assert_eq!(manifest.models, vec!["Apple.GLTF", "zebra.glb"]);
    }

    #[test]
    fn test_empty_directory() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = scan_models(dir.path(), &extensions()).unwrap();
        assert!(manifest.models.is_empty());
    }

    #[test]
    fn test_missing_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(scan_models(&dir.path().join("absent"), &extensions()).is_err());
    }
}
