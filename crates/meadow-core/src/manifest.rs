//! Startup manifest: `{ "models": ["a.glb", ...] }`

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::ManifestError;
use crate::import::is_model_file;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub models: Vec<String>,
}

impl Manifest {
    /// Parse a manifest document.
    ///
    /// Non-string entries are skipped. A document without any usable entry
    /// is [`ManifestError::Empty`].
    pub fn parse(content: &str) -> Result<Self, ManifestError> {
        let value: Value = serde_json::from_str(content)?;

        let entries = match value.get("models") {
            Some(Value::Array(entries)) => entries,
            _ => return Err(ManifestError::Empty),
        };

        let mut models = Vec::with_capacity(entries.len());
        for (index, entry) in entries.iter().enumerate() {
            match entry.as_str() {
                Some(name) if !name.is_empty() => models.push(name.to_string()),
                _ => warn!(index, entry = %entry, "Skipping manifest entry"),
            }
        }

        if models.is_empty() {
            return Err(ManifestError::Empty);
        }
        Ok(Self { models })
    }

    /// Manifest listing the model files among `names`, sorted
    pub fn from_file_names<I, S>(names: I, extensions: &[String]) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut models: Vec<String> = names
            .into_iter()
            .map(Into::into)
            .filter(|name| is_model_file(name, extensions))
            .collect();
        models.sort();
        Self { models }
    }

    /// `(name, url)` for every entry, resolved against `models_dir`
    pub fn entries(&self, models_dir: &str) -> Vec<(String, String)> {
        let base = models_dir.trim_end_matches('/');
        self.models
            .iter()
            .map(|name| (name.clone(), format!("{base}/{name}")))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_lists_models_in_order() {
        let manifest = Manifest::parse(r#"{"models": ["b.glb", "a.gltf"]}"#).unwrap();
        assert_eq!(manifest.models, vec!["b.glb", "a.gltf"]);
    }

    #[test]
    fn test_empty_list_is_an_error() {
        let result = Manifest::parse(r#"{"models": []}"#);
        assert!(matches!(result, Err(ManifestError::Empty)));
    }

    #[test]
    fn test_missing_or_wrong_type_is_empty() {
        assert!(matches!(Manifest::parse("{}"), Err(ManifestError::Empty)));
        assert!(matches!(
            Manifest::parse(r#"{"models": "a.glb"}"#),
            Err(ManifestError::Empty)
        ));
    }

    #[test]
    fn test_non_string_entries_skipped() {
        let manifest = Manifest::parse(r#"{"models": [1, "a.glb", null, {"x": 1}]}"#).unwrap();
        assert_eq!(manifest.models, vec!["a.glb"]);

        let result = Manifest::parse(r#"{"models": [1, 2]}"#);
        assert!(matches!(result, Err(ManifestError::Empty)));
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            Manifest::parse("<html>Not Found</html>"),
            Err(ManifestError::Parse(_))
        ));
    }

    #[test]
    fn test_entries_resolve_against_dir() {
        let manifest = Manifest {
            models: vec!["robot.glb".to_string()],
        };
        assert_eq!(
            manifest.entries("./models/"),
            vec![("robot.glb".to_string(), "./models/robot.glb".to_string())]
        );
    }

    #[test]
    fn test_from_file_names_filters_and_sorts() {
        let exts = vec!["glb".to_string(), "gltf".to_string()];
        let manifest = Manifest::from_file_names(["z.glb", "readme.md", "A.GLTF", "m.glb"], &exts);
        assert_eq!(manifest.models, vec!["A.GLTF", "m.glb", "z.glb"]);

        let json = serde_json::to_string(&manifest).unwrap();
        assert_eq!(Manifest::parse(&json).unwrap(), manifest);
    }
}
